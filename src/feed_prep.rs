//! Field normalization, word-safe tokenization, and paragraph assembly.

use serde::{Deserialize, Serialize};

use crate::feed::FeedChannel;
use crate::metrics::{GlyphMetrics, MetricsError};
use crate::style::{FeedPrepOptions, FieldRole, FontSpec, Rgba};

/// Smallest layout-atomic unit of text: one non-Latin glyph or one maximal
/// ASCII-letter word run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Token {
    /// Rendered text of this unit.
    pub content: String,
    /// Face the unit is measured and drawn with.
    pub font: FontSpec,
    /// Draw color.
    pub color: Rgba,
    /// Advance width resolved through the glyph-metrics provider.
    pub width_px: f32,
    /// Nominal height derived from the face's line height.
    pub height_px: f32,
}

impl Token {
    fn resolve(
        content: String,
        font: &FontSpec,
        color: Rgba,
        metrics: &dyn GlyphMetrics,
    ) -> Result<Self, MetricsError> {
        let width_px = metrics.advance_width(font, &content)?;
        Ok(Self {
            height_px: font.line_height_px(),
            font: font.clone(),
            color,
            width_px,
            content,
        })
    }
}

/// Ordered tokens from one logical feed field, sharing a font and role.
///
/// Immutable once built; the layout engine only reads it.
#[derive(Clone, Debug, PartialEq)]
pub struct Paragraph {
    tokens: Vec<Token>,
    role: FieldRole,
    font: FontSpec,
}

impl Paragraph {
    /// Tokens in layout order. Never empty.
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Semantic role shared by every token.
    pub fn role(&self) -> FieldRole {
        self.role
    }

    /// Face shared by every token.
    pub fn font(&self) -> &FontSpec {
        &self.font
    }

    /// Nominal line height of the paragraph face.
    pub fn font_height_px(&self) -> f32 {
        self.font.line_height_px()
    }
}

/// Fold typographic punctuation variants to their ASCII equivalents.
///
/// Pure and total; idempotent.
pub fn normalize_text(raw: &str) -> String {
    raw.chars()
        .map(|c| match c {
            '\u{201C}' | '\u{201D}' => '"',
            '\u{2018}' | '\u{2019}' => '\'',
            '\u{FF08}' => '(',
            '\u{FF09}' => ')',
            other => other,
        })
        .collect()
}

/// Split normalized text into layout-atomic tokens.
///
/// Consecutive ASCII letters accumulate into one unbreakable word token so
/// an English word is never split across a line or page boundary; every
/// other code point (digits, punctuation, CJK, emoji) becomes its own
/// token. Each token's width is resolved immediately through `metrics`.
///
/// Returns `Ok(None)` for empty input.
pub fn tokenize(
    text: &str,
    font: &FontSpec,
    color: Rgba,
    role: FieldRole,
    metrics: &dyn GlyphMetrics,
) -> Result<Option<Paragraph>, MetricsError> {
    if text.is_empty() {
        return Ok(None);
    }
    let mut tokens = Vec::new();
    let mut word = String::new();
    for ch in text.chars() {
        if ch.is_ascii_alphabetic() {
            word.push(ch);
            continue;
        }
        if !word.is_empty() {
            tokens.push(Token::resolve(
                core::mem::take(&mut word),
                font,
                color,
                metrics,
            )?);
        }
        tokens.push(Token::resolve(ch.to_string(), font, color, metrics)?);
    }
    if !word.is_empty() {
        tokens.push(Token::resolve(word, font, color, metrics)?);
    }
    Ok(Some(Paragraph {
        font: font.clone(),
        role,
        tokens,
    }))
}

/// Assembles feed items into the ordered paragraph list consumed by layout.
#[derive(Clone, Debug, Default)]
pub struct FeedPrep {
    opts: FeedPrepOptions,
}

impl FeedPrep {
    pub fn new(opts: FeedPrepOptions) -> Self {
        Self { opts }
    }

    pub fn options(&self) -> &FeedPrepOptions {
        &self.opts
    }

    /// Normalize, tokenize, and order every enabled field of every item.
    ///
    /// Field order within an item is fixed: title, publish time, then each
    /// body segment. Absent, disabled, or empty fields contribute nothing.
    pub fn paragraphs(
        &self,
        channel: &FeedChannel,
        metrics: &dyn GlyphMetrics,
    ) -> Result<Vec<Paragraph>, MetricsError> {
        let mut out = Vec::new();
        for (index, item) in channel.items.iter().enumerate() {
            let before = out.len();
            if self.opts.show_title {
                if let Some(title) = item.title.as_deref() {
                    self.push_field(&mut out, title, FieldRole::Title, metrics)?;
                }
            }
            if self.opts.show_publish_time {
                if let Some(pub_date) = item.pub_date.as_deref() {
                    self.push_field(&mut out, pub_date, FieldRole::Time, metrics)?;
                }
            }
            if self.opts.show_body {
                for segment in &item.description {
                    self.push_field(&mut out, segment, FieldRole::Body, metrics)?;
                }
            }
            if out.len() == before {
                log::debug!("feed item {} contributed no paragraphs", index);
            }
        }
        Ok(out)
    }

    fn push_field(
        &self,
        out: &mut Vec<Paragraph>,
        raw: &str,
        role: FieldRole,
        metrics: &dyn GlyphMetrics,
    ) -> Result<(), MetricsError> {
        let style = self.opts.role_style(role);
        let clean = normalize_text(raw);
        if let Some(paragraph) = tokenize(&clean, &style.font, style.color, role, metrics)? {
            out.push(paragraph);
        }
        Ok(())
    }
}
