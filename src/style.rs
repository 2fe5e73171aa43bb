use serde::{Deserialize, Serialize};

/// Semantic role of a laid-out feed field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldRole {
    Title,
    Time,
    Body,
}

/// Font selection for one feed field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FontSpec {
    /// Chosen family.
    pub family: String,
    /// Size in device-independent pixels.
    pub size_px: f32,
    /// Numeric weight.
    pub weight: u16,
    /// Italic flag.
    pub italic: bool,
    /// Underline flag.
    pub underline: bool,
}

impl FontSpec {
    /// A regular-weight face at `size_px`.
    pub fn new(family: impl Into<String>, size_px: f32) -> Self {
        Self {
            family: family.into(),
            size_px,
            weight: 400,
            italic: false,
            underline: false,
        }
    }

    /// Nominal line height for this face, the fixed `4/3` heuristic.
    pub fn line_height_px(&self) -> f32 {
        self.size_px * 4.0 / 3.0
    }

    /// True for bold-range weights.
    pub fn is_bold(&self) -> bool {
        self.weight >= 700
    }
}

impl Default for FontSpec {
    fn default() -> Self {
        Self::new("sans-serif", 16.0)
    }
}

/// Packed RGBA color carried through to the renderer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    /// Build a color from channel values.
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

/// Font and color configured for one field role.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RoleStyle {
    pub font: FontSpec,
    pub color: Rgba,
}

impl RoleStyle {
    pub fn new(font: FontSpec, color: Rgba) -> Self {
        Self { font, color }
    }
}

/// Field visibility and per-role styling for paragraph assembly.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeedPrepOptions {
    /// Include item titles.
    pub show_title: bool,
    /// Include item publish timestamps.
    pub show_publish_time: bool,
    /// Include item body segments.
    pub show_body: bool,
    /// Style applied to title paragraphs.
    pub title: RoleStyle,
    /// Style applied to publish-time paragraphs.
    pub time: RoleStyle,
    /// Style applied to body paragraphs.
    pub body: RoleStyle,
}

impl FeedPrepOptions {
    /// Style configured for `role`.
    pub fn role_style(&self, role: FieldRole) -> &RoleStyle {
        match role {
            FieldRole::Title => &self.title,
            FieldRole::Time => &self.time,
            FieldRole::Body => &self.body,
        }
    }

    /// True when at least one field is enabled.
    pub fn any_field_enabled(&self) -> bool {
        self.show_title || self.show_publish_time || self.show_body
    }
}

impl Default for FeedPrepOptions {
    fn default() -> Self {
        let mut title_font = FontSpec::new("sans-serif", 20.0);
        title_font.weight = 700;
        Self {
            show_title: true,
            show_publish_time: true,
            show_body: true,
            title: RoleStyle::new(title_font, Rgba::new(255, 255, 255, 255)),
            time: RoleStyle::new(FontSpec::new("sans-serif", 14.0), Rgba::new(200, 200, 200, 255)),
            body: RoleStyle::new(FontSpec::new("sans-serif", 16.0), Rgba::new(255, 255, 255, 255)),
        }
    }
}
