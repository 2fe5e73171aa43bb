//! Pagination policies that pack paragraphs into fixed-size pages.

use feed_stream::Paragraph;
use serde::{Deserialize, Serialize};

use crate::page_ir::{Block, Line, Page};

/// Display policy selected by style configuration.
///
/// The two scrolling variants share one layout algorithm; scroll direction
/// only affects how the renderer presents the finished frames.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisplayMode {
    ScrollLeftToRight,
    ScrollRightToLeft,
    Paged,
}

impl DisplayMode {
    /// True for either scrolling variant.
    pub fn is_scrolling(self) -> bool {
        matches!(self, Self::ScrollLeftToRight | Self::ScrollRightToLeft)
    }
}

/// Page geometry and policy selection for one generation request.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Page width in device pixels. Must be positive.
    pub page_width: i32,
    /// Page height in device pixels. Must be positive.
    pub page_height: i32,
    /// Layout policy.
    pub mode: DisplayMode,
    /// Flow position of the first paged-mode block; the scrolling policy
    /// ignores it.
    pub first_line_top: f32,
}

impl LayoutConfig {
    /// Convenience for a page size with default policy.
    pub fn for_page(width: i32, height: i32) -> Self {
        Self {
            page_width: width,
            page_height: height,
            ..Self::default()
        }
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            page_width: 480,
            page_height: 128,
            mode: DisplayMode::ScrollLeftToRight,
            first_line_top: 0.0,
        }
    }
}

/// Deterministic pagination engine for one layout configuration.
///
/// Single pass, O(total tokens): only the page, line, and block under
/// construction are held as state, and pages already emitted are never
/// re-flowed.
#[derive(Clone, Copy, Debug)]
pub struct LayoutEngine {
    cfg: LayoutConfig,
}

impl LayoutEngine {
    pub fn new(cfg: LayoutConfig) -> Self {
        Self { cfg }
    }

    pub fn config(&self) -> LayoutConfig {
        self.cfg
    }

    /// Pack paragraphs into pages under the configured policy.
    ///
    /// Zero paragraphs produce zero pages. A token wider than the page
    /// still starts its own block and deliberately overflows the right
    /// edge; it is never dropped and layout never loops on it.
    pub fn paginate(&self, paragraphs: &[Paragraph]) -> Vec<Page> {
        let mut session = self.start_session();
        let mut pages = Vec::new();
        for paragraph in paragraphs {
            session.push_paragraph(paragraph);
            pages.append(&mut session.drain_pages());
        }
        pages.extend(session.finish());
        pages
    }

    /// Start an incremental pagination session.
    pub fn start_session(&self) -> LayoutSession {
        LayoutSession {
            st: PaginateState::new(self.cfg),
        }
    }
}

/// Incremental pagination session streaming closed pages.
///
/// Pages close as soon as the policy fills them; callers that need
/// cancellation check it between [`drain_pages`](Self::drain_pages) calls,
/// which is the page-boundary granularity the engine guarantees.
pub struct LayoutSession {
    st: PaginateState,
}

impl LayoutSession {
    /// Lay out one paragraph under the configured policy.
    pub fn push_paragraph(&mut self, paragraph: &Paragraph) {
        if paragraph.tokens().is_empty() {
            return;
        }
        if self.st.cfg.mode.is_scrolling() {
            self.st.scroll_paragraph(paragraph);
        } else {
            self.st.paged_paragraph(paragraph);
        }
    }

    /// Take the pages closed so far, in order.
    pub fn drain_pages(&mut self) -> Vec<Page> {
        core::mem::take(&mut self.st.emitted)
    }

    /// Flush the pending block, line, and page, returning every remaining
    /// closed page.
    pub fn finish(mut self) -> Vec<Page> {
        self.st.flush_pending();
        self.st.emitted
    }
}

struct PaginateState {
    cfg: LayoutConfig,
    width: f32,
    height: f32,
    page: Page,
    line: Line,
    /// The block under construction; `None` until the first paragraph
    /// arrives (the "unstarted block" state).
    block: Option<Block>,
    /// Paged policy only: bottom edge of the last placed block.
    flow_bottom: f32,
    emitted: Vec<Page>,
}

impl PaginateState {
    fn new(cfg: LayoutConfig) -> Self {
        Self {
            cfg,
            width: cfg.page_width as f32,
            height: cfg.page_height as f32,
            page: Page::default(),
            line: Line::default(),
            block: None,
            flow_bottom: cfg.first_line_top,
            emitted: Vec::new(),
        }
    }

    /// Scrolling policy: a single growing line per page, every block
    /// vertically centered in a fixed band above the page midline.
    fn scroll_paragraph(&mut self, paragraph: &Paragraph) {
        let band_bottom = (self.cfg.page_height / 2) as f32;
        let band_top = band_bottom - paragraph.font_height_px();

        // Paragraphs never share a block; the new block continues on the
        // same line at the previous block's right edge.
        let start = match self.block.take() {
            None => 0.0,
            Some(prev) => {
                let right = prev.right;
                self.line.push(prev);
                right
            }
        };
        let mut block = Block::open(
            start,
            band_top,
            start,
            band_bottom,
            paragraph.font().clone(),
            paragraph.role(),
        );

        for token in paragraph.tokens() {
            if block.right + token.width_px < self.width || block.is_empty() {
                block.push_token(token);
                continue;
            }
            // Band is full: this line is a finished ticker frame.
            self.line.push(block);
            self.close_page();
            block = Block::open(
                0.0,
                band_top,
                0.0,
                band_bottom,
                paragraph.font().clone(),
                paragraph.role(),
            );
            block.push_token(token);
        }
        self.block = Some(block);
    }

    /// Paged policy: blocks stack top to bottom, each paragraph opening a
    /// fresh block below the previous one, overflowing onto new pages.
    fn paged_paragraph(&mut self, paragraph: &Paragraph) {
        if let Some(prev) = self.block.take() {
            self.flow_bottom = prev.bottom;
            self.push_block_line(prev);
        }

        let para_height = paragraph.font_height_px();
        let mut block = if self.flow_bottom + para_height < self.height {
            Block::open(
                0.0,
                self.flow_bottom,
                0.0,
                self.flow_bottom + para_height,
                paragraph.font().clone(),
                paragraph.role(),
            )
        } else {
            self.close_page();
            self.flow_bottom = 0.0;
            // Zero-height rect; the first token grows it.
            Block::open(
                0.0,
                0.0,
                0.0,
                0.0,
                paragraph.font().clone(),
                paragraph.role(),
            )
        };

        for token in paragraph.tokens() {
            if block.right + token.width_px < self.width || block.is_empty() {
                block.push_token(token);
                continue;
            }
            // Row is full: flow down within the page when the next block
            // still fits, otherwise start a new page. Note the fit check
            // uses this token's height, not the paragraph font height.
            let next_top = block.bottom;
            self.push_block_line(block);
            if next_top + token.height_px < self.height {
                block = Block::open(
                    0.0,
                    next_top,
                    0.0,
                    next_top + token.height_px,
                    paragraph.font().clone(),
                    paragraph.role(),
                );
            } else {
                self.close_page();
                block = Block::open(
                    0.0,
                    0.0,
                    0.0,
                    0.0,
                    paragraph.font().clone(),
                    paragraph.role(),
                );
            }
            block.push_token(token);
        }
        self.block = Some(block);
    }

    /// Move `block` into its own line and the line into the current page.
    fn push_block_line(&mut self, block: Block) {
        let mut line = core::mem::take(&mut self.line);
        line.push(block);
        self.page.push(line);
    }

    /// Close the current page and start a fresh page and line.
    fn close_page(&mut self) {
        if !self.line.is_empty() {
            let line = core::mem::take(&mut self.line);
            self.page.push(line);
        }
        let page = core::mem::take(&mut self.page);
        if !page.is_empty() {
            self.emitted.push(page);
        }
        self.line = Line::default();
    }

    /// Flush whatever is still under construction. Empty structures are
    /// never emitted, so zero paragraphs produce zero pages.
    fn flush_pending(&mut self) {
        if let Some(block) = self.block.take() {
            if !block.is_empty() {
                self.line.push(block);
            }
        }
        let line = core::mem::take(&mut self.line);
        if !line.is_empty() {
            self.page.push(line);
        }
        let page = core::mem::take(&mut self.page);
        if !page.is_empty() {
            self.emitted.push(page);
        }
    }
}
