use core::fmt;

use crate::style::FontSpec;

/// Reference anchor glyph used for shaping-safe width calibration.
pub const MEASURE_ANCHOR: char = '好';

/// External glyph-width measurement service.
///
/// `advance_width` returns the advance of `text` rendered in `font`, in
/// device-independent pixels. Providers must return a positive width for
/// non-empty text; a failed resolution is fatal for the generation request
/// and must never be reported as a zero width.
pub trait GlyphMetrics {
    fn advance_width(&self, font: &FontSpec, text: &str) -> Result<f32, MetricsError>;
}

/// Measurement failure surfaced by a glyph-metrics provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MetricsError {
    /// The provider has no usable face for the requested family.
    FontUnavailable { family: String },
    /// The provider failed while measuring a text run.
    Measure { family: String, detail: String },
}

impl fmt::Display for MetricsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FontUnavailable { family } => {
                write!(f, "no usable face for font family {:?}", family)
            }
            Self::Measure { family, detail } => {
                write!(f, "measurement failed for family {:?}: {}", family, detail)
            }
        }
    }
}

impl std::error::Error for MetricsError {}

/// Adapter reproducing the reference anchor-glyph calibration.
///
/// Measures `anchor + text` and subtracts the anchor's own measured width,
/// so the leading glyph of `text` is shaped mid-run instead of at a run
/// boundary. Wrap rasterizer-backed providers in this adapter for
/// visual-width parity with the reference system.
#[derive(Clone, Copy, Debug, Default)]
pub struct AnchorCalibrated<M> {
    inner: M,
}

impl<M> AnchorCalibrated<M> {
    pub fn new(inner: M) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> M {
        self.inner
    }
}

impl<M: GlyphMetrics> GlyphMetrics for AnchorCalibrated<M> {
    fn advance_width(&self, font: &FontSpec, text: &str) -> Result<f32, MetricsError> {
        if text.is_empty() {
            return Ok(0.0);
        }
        let mut anchored = String::with_capacity(MEASURE_ANCHOR.len_utf8() + text.len());
        anchored.push(MEASURE_ANCHOR);
        anchored.push_str(text);
        let with_anchor = self.inner.advance_width(font, &anchored)?;
        let mut anchor_buf = [0u8; 4];
        let anchor = self
            .inner
            .advance_width(font, MEASURE_ANCHOR.encode_utf8(&mut anchor_buf))?;
        Ok((with_anchor - anchor).max(0.0))
    }
}

/// Per-glyph-class proportional width model.
///
/// Stand-in provider for embedders without a rasterizer-backed measurer;
/// widths are stable across families at the cost of shape accuracy.
#[derive(Clone, Copy, Debug, Default)]
pub struct HeuristicMetrics;

impl GlyphMetrics for HeuristicMetrics {
    fn advance_width(&self, font: &FontSpec, text: &str) -> Result<f32, MetricsError> {
        let mut em_sum = 0.0f32;
        for ch in text.chars() {
            em_sum += glyph_em_width(ch);
        }
        let mut scale = 1.0;
        if font.is_bold() {
            scale += 0.03;
        }
        if font.italic {
            scale += 0.01;
        }
        Ok(em_sum * font.size_px * scale)
    }
}

fn glyph_em_width(ch: char) -> f32 {
    match ch {
        ' ' | '\u{00A0}' => 0.32,
        'i' | 'l' | 'I' | '|' | '!' => 0.24,
        '.' | ',' | ':' | ';' | '\'' | '"' | '`' => 0.23,
        '-' | '\u{2013}' | '\u{2014}' => 0.34,
        '(' | ')' | '[' | ']' | '{' | '}' => 0.30,
        'f' | 't' | 'j' | 'r' => 0.34,
        'm' | 'w' | 'M' | 'W' | '@' | '%' | '&' | '#' => 0.74,
        c if c.is_ascii_digit() => 0.52,
        c if c.is_ascii_uppercase() => 0.64,
        c if c.is_ascii_lowercase() => 0.52,
        c if c.is_whitespace() => 0.32,
        c if c.is_ascii_punctuation() => 0.42,
        // CJK and other full-width glyphs advance a full em.
        _ => 1.0,
    }
}

/// Fixed advance of one em per glyph.
///
/// The reference system's fallback width model; useful for tests and for
/// strictly monospace ticker hardware.
#[derive(Clone, Copy, Debug, Default)]
pub struct FixedAdvance;

impl GlyphMetrics for FixedAdvance {
    fn advance_width(&self, font: &FontSpec, text: &str) -> Result<f32, MetricsError> {
        Ok(font.size_px * text.chars().count() as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct RecordingMetrics;

    impl GlyphMetrics for RecordingMetrics {
        fn advance_width(&self, font: &FontSpec, text: &str) -> Result<f32, MetricsError> {
            // One em per glyph so anchor subtraction is easy to predict.
            FixedAdvance.advance_width(font, text)
        }
    }

    #[test]
    fn anchor_calibration_subtracts_anchor_width() {
        let metrics = AnchorCalibrated::new(RecordingMetrics);
        let font = FontSpec::new("serif", 10.0);
        let width = metrics.advance_width(&font, "ab").unwrap();
        // Anchor + "ab" measures 30, anchor alone 10.
        assert_eq!(width, 20.0);
    }

    #[test]
    fn anchor_calibration_of_empty_text_is_zero() {
        let metrics = AnchorCalibrated::new(RecordingMetrics);
        let font = FontSpec::default();
        assert_eq!(metrics.advance_width(&font, "").unwrap(), 0.0);
    }

    #[test]
    fn heuristic_widths_are_positive_and_weight_sensitive() {
        let regular = FontSpec::new("sans-serif", 16.0);
        let mut bold = regular.clone();
        bold.weight = 700;
        let narrow = HeuristicMetrics.advance_width(&regular, "il").unwrap();
        let wide = HeuristicMetrics.advance_width(&regular, "mw").unwrap();
        assert!(narrow > 0.0);
        assert!(wide > narrow);
        let heavier = HeuristicMetrics.advance_width(&bold, "mw").unwrap();
        assert!(heavier > wide);
    }

    #[test]
    fn fixed_advance_charges_one_em_per_glyph() {
        let font = FontSpec::new("mono", 12.0);
        assert_eq!(FixedAdvance.advance_width(&font, "世界").unwrap(), 24.0);
    }
}
