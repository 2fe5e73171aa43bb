//! Generation orchestration: configuration validation, cancellation, keyed
//! background jobs, and page caching.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;

use feed_stream::{FeedChannel, FeedPrep, FeedPrepOptions, GlyphMetrics, MetricsError};
use serde::{Deserialize, Serialize};

use crate::page_ir::{Page, PageCacheStore, PaginationProfileId};
use crate::page_layout::{LayoutConfig, LayoutEngine};

/// Cancellation hook for long-running generation runs.
pub trait CancelToken {
    fn is_cancelled(&self) -> bool;
}

/// Never-cancel token for default call paths.
#[derive(Clone, Copy, Debug, Default)]
pub struct NeverCancel;

impl CancelToken for NeverCancel {
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Engine options combining paragraph assembly and page layout.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PageEngineOptions {
    /// Field visibility and per-role styling.
    pub prep: FeedPrepOptions,
    /// Page geometry and display policy.
    pub layout: LayoutConfig,
}

impl PageEngineOptions {
    /// Build options for a target page size.
    pub fn for_page(width: i32, height: i32) -> Self {
        Self {
            prep: FeedPrepOptions::default(),
            layout: LayoutConfig::for_page(width, height),
        }
    }
}

/// Configuration violations rejected before pagination begins.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// Page dimensions must both be positive.
    InvalidPageSize { width: i32, height: i32 },
    /// Every `show_*` flag is disabled; the request can never produce
    /// output.
    NoFieldsEnabled,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPageSize { width, height } => {
                write!(f, "page size must be positive (got {}x{})", width, height)
            }
            Self::NoFieldsEnabled => write!(f, "no feed fields are enabled"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Errors surfaced by a generation request.
#[derive(Clone, Debug, PartialEq)]
pub enum PageEngineError {
    /// Configuration was rejected before layout began.
    Config(ConfigError),
    /// Glyph measurement failed; the request produces no pages.
    Metrics(MetricsError),
    /// The run was cancelled.
    Cancelled,
}

impl fmt::Display for PageEngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(err) => write!(f, "configuration rejected: {}", err),
            Self::Metrics(err) => write!(f, "glyph measurement failed: {}", err),
            Self::Cancelled => write!(f, "generation cancelled"),
        }
    }
}

impl std::error::Error for PageEngineError {}

impl From<ConfigError> for PageEngineError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<MetricsError> for PageEngineError {
    fn from(value: MetricsError) -> Self {
        Self::Metrics(value)
    }
}

/// Summary emitted after a generation run completes.
#[derive(Clone, Copy, Debug, Default)]
pub struct GenerationSummary {
    /// Total pages produced by the run.
    pub page_count: usize,
    /// True when the pages came from the cache store.
    pub from_cache: bool,
}

enum JobMessage {
    Page(Page),
    Done(GenerationSummary),
    Error(PageEngineError),
}

struct SharedCancel(Arc<AtomicBool>);

impl CancelToken for SharedCancel {
    fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Feed-to-page generation engine with keyed background jobs.
///
/// Clones share one job registry, so any clone can cancel or replace a job
/// started by another.
#[derive(Clone)]
pub struct PageEngine {
    opts: PageEngineOptions,
    cache: Option<Arc<dyn PageCacheStore + Send + Sync>>,
    jobs: Arc<Mutex<HashMap<String, Arc<AtomicBool>>>>,
}

impl fmt::Debug for PageEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageEngine")
            .field("opts", &self.opts)
            .field("has_cache", &self.cache.is_some())
            .finish()
    }
}

impl PageEngine {
    /// Create an engine for the given options.
    pub fn new(opts: PageEngineOptions) -> Self {
        Self {
            opts,
            cache: None,
            jobs: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Install a shared page cache store consulted by keyed jobs.
    pub fn with_cache_store(mut self, store: Arc<dyn PageCacheStore + Send + Sync>) -> Self {
        self.cache = Some(store);
        self
    }

    pub fn options(&self) -> &PageEngineOptions {
        &self.opts
    }

    /// Reject configuration violations before any layout begins.
    ///
    /// This is deliberately distinct from measurement and runtime errors:
    /// an invalid configuration can never produce output, so the request is
    /// refused up front.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let layout = &self.opts.layout;
        if layout.page_width <= 0 || layout.page_height <= 0 {
            return Err(ConfigError::InvalidPageSize {
                width: layout.page_width,
                height: layout.page_height,
            });
        }
        if !self.opts.prep.any_field_enabled() {
            return Err(ConfigError::NoFieldsEnabled);
        }
        Ok(())
    }

    /// Deterministic pagination profile id over the engine options.
    pub fn pagination_profile_id(&self) -> PaginationProfileId {
        // Serialization of plain option structs cannot fail.
        let bytes = serde_json::to_vec(&self.opts).unwrap_or_default();
        PaginationProfileId::from_bytes(&bytes)
    }

    /// Run one generation request to completion on the caller's thread.
    pub fn generate(
        &self,
        channel: &FeedChannel,
        metrics: &dyn GlyphMetrics,
    ) -> Result<Vec<Page>, PageEngineError> {
        self.generate_with_cancel(channel, metrics, &NeverCancel)
    }

    /// Run one generation request, honoring cancellation at page
    /// boundaries.
    pub fn generate_with_cancel(
        &self,
        channel: &FeedChannel,
        metrics: &dyn GlyphMetrics,
        cancel: &dyn CancelToken,
    ) -> Result<Vec<Page>, PageEngineError> {
        let mut pages = Vec::new();
        self.generate_with(channel, metrics, cancel, |page| pages.push(page))?;
        Ok(pages)
    }

    /// Run one generation request and stream each page as it closes.
    pub fn generate_with<F>(
        &self,
        channel: &FeedChannel,
        metrics: &dyn GlyphMetrics,
        cancel: &dyn CancelToken,
        mut on_page: F,
    ) -> Result<GenerationSummary, PageEngineError>
    where
        F: FnMut(Page),
    {
        self.validate()?;
        if cancel.is_cancelled() {
            return Err(PageEngineError::Cancelled);
        }
        let prep = FeedPrep::new(self.opts.prep.clone());
        let paragraphs = prep.paragraphs(channel, metrics)?;
        let engine = LayoutEngine::new(self.opts.layout);
        let mut session = engine.start_session();
        let mut page_count = 0usize;
        for paragraph in &paragraphs {
            session.push_paragraph(paragraph);
            for page in session.drain_pages() {
                if cancel.is_cancelled() {
                    return Err(PageEngineError::Cancelled);
                }
                page_count += 1;
                on_page(page);
            }
        }
        if cancel.is_cancelled() {
            return Err(PageEngineError::Cancelled);
        }
        for page in session.finish() {
            page_count += 1;
            on_page(page);
        }
        Ok(GenerationSummary {
            page_count,
            from_cache: false,
        })
    }

    /// Start (or replace) the background generation job for `key`.
    ///
    /// A job already in flight for the same key is cancelled and replaced.
    /// Lookup and registration happen under one lock so a racing start and
    /// cancel can never observe a half-updated registry.
    pub fn start_job(
        &self,
        key: &str,
        channel: FeedChannel,
        metrics: Arc<dyn GlyphMetrics + Send + Sync>,
    ) -> Result<GenerationJob, PageEngineError> {
        self.validate()?;
        let cancel = Arc::new(AtomicBool::new(false));
        {
            let mut jobs = lock_jobs(&self.jobs);
            if let Some(previous) = jobs.insert(key.to_string(), cancel.clone()) {
                previous.store(true, Ordering::Relaxed);
                log::debug!("replacing in-flight generation job for {}", key);
            }
        }

        let (tx, rx) = sync_channel(1);
        let engine = self.clone();
        let job_key = key.to_string();
        let job_cancel = cancel.clone();
        thread::spawn(move || {
            engine.run_job(&job_key, &channel, metrics.as_ref(), &job_cancel, tx);
        });

        Ok(GenerationJob {
            key: key.to_string(),
            cancel,
            rx,
            finished: false,
        })
    }

    /// Cancel the in-flight job for `key`. Returns false when no job is
    /// registered under that key.
    pub fn cancel_job(&self, key: &str) -> bool {
        let jobs = lock_jobs(&self.jobs);
        match jobs.get(key) {
            Some(flag) => {
                flag.store(true, Ordering::Relaxed);
                true
            }
            None => false,
        }
    }

    /// Cancel every registered job.
    pub fn shutdown(&self) {
        let jobs = lock_jobs(&self.jobs);
        for flag in jobs.values() {
            flag.store(true, Ordering::Relaxed);
        }
    }

    fn run_job(
        &self,
        key: &str,
        channel: &FeedChannel,
        metrics: &(dyn GlyphMetrics + Send + Sync),
        cancel: &Arc<AtomicBool>,
        tx: SyncSender<JobMessage>,
    ) {
        let token = SharedCancel(cancel.clone());
        let mut receiver_closed = false;
        let result = self.run_job_inner(key, channel, metrics, &token, |page| {
            if receiver_closed {
                return;
            }
            if tx.send(JobMessage::Page(page)).is_err() {
                receiver_closed = true;
            }
        });
        self.unregister_job(key, cancel);
        if receiver_closed {
            return;
        }
        match result {
            Ok(summary) => {
                let _ = tx.send(JobMessage::Done(summary));
            }
            Err(err) => {
                log::warn!("generation job {} failed: {}", key, err);
                let _ = tx.send(JobMessage::Error(err));
            }
        }
    }

    fn run_job_inner<F>(
        &self,
        key: &str,
        channel: &FeedChannel,
        metrics: &dyn GlyphMetrics,
        token: &SharedCancel,
        mut on_page: F,
    ) -> Result<GenerationSummary, PageEngineError>
    where
        F: FnMut(Page),
    {
        let Some(cache) = self.cache.as_deref() else {
            return self.generate_with(channel, metrics, token, on_page);
        };
        let profile = self.pagination_profile_id();
        if let Some(pages) = cache.load_pages(profile, key) {
            log::debug!("page cache hit for {} ({} pages)", key, pages.len());
            let page_count = pages.len();
            for page in pages {
                if token.is_cancelled() {
                    return Err(PageEngineError::Cancelled);
                }
                on_page(page);
            }
            return Ok(GenerationSummary {
                page_count,
                from_cache: true,
            });
        }
        let mut rendered = Vec::new();
        let summary = self.generate_with(channel, metrics, token, |page| {
            rendered.push(page.clone());
            on_page(page);
        })?;
        cache.store_pages(profile, key, &rendered);
        Ok(summary)
    }

    /// Remove this run's registry entry; a replacement entry registered
    /// under the same key is left alone.
    fn unregister_job(&self, key: &str, cancel: &Arc<AtomicBool>) {
        let mut jobs = lock_jobs(&self.jobs);
        if jobs
            .get(key)
            .is_some_and(|current| Arc::ptr_eq(current, cancel))
        {
            jobs.remove(key);
        }
    }
}

fn lock_jobs(
    jobs: &Arc<Mutex<HashMap<String, Arc<AtomicBool>>>>,
) -> MutexGuard<'_, HashMap<String, Arc<AtomicBool>>> {
    jobs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Handle to a keyed background generation job.
///
/// Iterating yields pages as the worker produces them; the stream ends
/// after the worker's final `Done` or `Error` message.
#[derive(Debug)]
pub struct GenerationJob {
    key: String,
    cancel: Arc<AtomicBool>,
    rx: Receiver<JobMessage>,
    finished: bool,
}

impl GenerationJob {
    /// Registry key this job was started under.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Request cooperative cancellation of this job.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    /// Block until the job completes and collect every page.
    pub fn wait(mut self) -> Result<Vec<Page>, PageEngineError> {
        let mut pages = Vec::new();
        for next in &mut self {
            pages.push(next?);
        }
        Ok(pages)
    }
}

impl Iterator for GenerationJob {
    type Item = Result<Page, PageEngineError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.rx.recv() {
            Ok(JobMessage::Page(page)) => Some(Ok(page)),
            Ok(JobMessage::Done(_)) => {
                self.finished = true;
                None
            }
            Ok(JobMessage::Error(err)) => {
                self.finished = true;
                Some(Err(err))
            }
            // Worker dropped without a final message; treat as end of
            // stream.
            Err(_) => {
                self.finished = true;
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page_layout::DisplayMode;
    use feed_stream::{FeedItem, FixedAdvance, FontSpec};

    fn channel_with_title(title: &str) -> FeedChannel {
        FeedChannel::new(vec![FeedItem {
            title: Some(title.to_string()),
            pub_date: None,
            description: Vec::new(),
        }])
    }

    fn scroll_options(width: i32, height: i32) -> PageEngineOptions {
        let mut opts = PageEngineOptions::for_page(width, height);
        opts.layout.mode = DisplayMode::ScrollLeftToRight;
        opts
    }

    struct FailingMetrics;

    impl GlyphMetrics for FailingMetrics {
        fn advance_width(&self, font: &FontSpec, _text: &str) -> Result<f32, MetricsError> {
            Err(MetricsError::FontUnavailable {
                family: font.family.clone(),
            })
        }
    }

    struct AlreadyCancelled;

    impl CancelToken for AlreadyCancelled {
        fn is_cancelled(&self) -> bool {
            true
        }
    }

    #[test]
    fn validate_rejects_non_positive_page_sizes() {
        let engine = PageEngine::new(scroll_options(0, 64));
        assert_eq!(
            engine.validate(),
            Err(ConfigError::InvalidPageSize {
                width: 0,
                height: 64
            })
        );
        let engine = PageEngine::new(scroll_options(64, -1));
        assert!(matches!(
            engine.validate(),
            Err(ConfigError::InvalidPageSize { .. })
        ));
    }

    #[test]
    fn validate_rejects_all_fields_disabled() {
        let mut opts = scroll_options(100, 40);
        opts.prep.show_title = false;
        opts.prep.show_publish_time = false;
        opts.prep.show_body = false;
        let engine = PageEngine::new(opts);
        assert_eq!(engine.validate(), Err(ConfigError::NoFieldsEnabled));
    }

    #[test]
    fn generate_surfaces_config_error_before_layout() {
        let mut opts = scroll_options(100, 40);
        opts.prep.show_title = false;
        opts.prep.show_publish_time = false;
        opts.prep.show_body = false;
        let engine = PageEngine::new(opts);
        let err = engine
            .generate(&channel_with_title("hi"), &FixedAdvance)
            .unwrap_err();
        assert_eq!(
            err,
            PageEngineError::Config(ConfigError::NoFieldsEnabled)
        );
    }

    #[test]
    fn generate_propagates_measurement_failure() {
        let engine = PageEngine::new(scroll_options(100, 40));
        let err = engine
            .generate(&channel_with_title("hi"), &FailingMetrics)
            .unwrap_err();
        assert!(matches!(err, PageEngineError::Metrics(_)));
    }

    #[test]
    fn generate_of_empty_channel_yields_zero_pages() {
        let engine = PageEngine::new(scroll_options(100, 40));
        let pages = engine
            .generate(&FeedChannel::default(), &FixedAdvance)
            .unwrap();
        assert!(pages.is_empty());
    }

    #[test]
    fn generate_honors_pre_cancelled_token() {
        let engine = PageEngine::new(scroll_options(100, 40));
        let err = engine
            .generate_with_cancel(&channel_with_title("hi"), &FixedAdvance, &AlreadyCancelled)
            .unwrap_err();
        assert_eq!(err, PageEngineError::Cancelled);
    }

    #[test]
    fn profile_id_tracks_option_changes() {
        let a = PageEngine::new(scroll_options(100, 40)).pagination_profile_id();
        let b = PageEngine::new(scroll_options(100, 40)).pagination_profile_id();
        let c = PageEngine::new(scroll_options(200, 40)).pagination_profile_id();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn cancel_job_reports_unknown_keys() {
        let engine = PageEngine::new(scroll_options(100, 40));
        assert!(!engine.cancel_job("absent"));
    }
}
