//! Feed-to-page layout core: text normalization, word-safe tokenization,
//! paragraph assembly, and glyph-metrics interfaces for ticker and paged
//! displays.

#![cfg_attr(
    not(test),
    deny(
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::panic_in_result_fn,
        clippy::todo,
        clippy::unimplemented
    )
)]

mod feed;
mod feed_prep;
mod metrics;
mod style;

pub use feed::{FeedChannel, FeedItem};
pub use feed_prep::{normalize_text, tokenize, FeedPrep, Paragraph, Token};
pub use metrics::{
    AnchorCalibrated, FixedAdvance, GlyphMetrics, HeuristicMetrics, MetricsError, MEASURE_ANCHOR,
};
pub use style::{FeedPrepOptions, FieldRole, FontSpec, RoleStyle, Rgba};
