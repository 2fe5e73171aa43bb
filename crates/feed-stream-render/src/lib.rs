//! Page IR, pagination engine, and generation orchestration for
//! `feed-stream`.

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

mod page_engine;
mod page_ir;
mod page_layout;

pub use feed_stream::FieldRole;
pub use page_engine::{
    CancelToken, ConfigError, GenerationJob, GenerationSummary, NeverCancel, PageEngine,
    PageEngineError, PageEngineOptions,
};
pub use page_ir::{
    Block, FilePageCacheStore, Line, Page, PageCacheStore, PaginationProfileId,
};
pub use page_layout::{DisplayMode, LayoutConfig, LayoutEngine, LayoutSession};
