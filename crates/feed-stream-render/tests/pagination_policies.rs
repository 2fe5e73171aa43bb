use feed_stream::{
    tokenize, FeedChannel, FeedItem, FeedPrep, FeedPrepOptions, FieldRole, FontSpec, GlyphMetrics,
    MetricsError, Paragraph, Rgba,
};
use feed_stream_render::{DisplayMode, LayoutConfig, LayoutEngine, Page};

struct ConstWidth(f32);

impl GlyphMetrics for ConstWidth {
    fn advance_width(&self, _font: &FontSpec, _text: &str) -> Result<f32, MetricsError> {
        Ok(self.0)
    }
}

fn paragraph(text: &str, size_px: f32, token_width: f32) -> Paragraph {
    let font = FontSpec::new("sans-serif", size_px);
    tokenize(
        text,
        &font,
        Rgba::default(),
        FieldRole::Body,
        &ConstWidth(token_width),
    )
    .unwrap()
    .unwrap()
}

fn engine(mode: DisplayMode, width: i32, height: i32) -> LayoutEngine {
    LayoutEngine::new(LayoutConfig {
        page_width: width,
        page_height: height,
        mode,
        first_line_top: 0.0,
    })
}

fn page_text(page: &Page) -> String {
    page.blocks().map(|b| b.content.as_str()).collect()
}

#[test]
fn both_scroll_directions_share_one_layout() {
    let ltr = engine(DisplayMode::ScrollLeftToRight, 100, 40)
        .paginate(&[paragraph("一二三四五", 12.0, 30.0)]);
    let rtl = engine(DisplayMode::ScrollRightToLeft, 100, 40)
        .paginate(&[paragraph("一二三四五", 12.0, 30.0)]);
    assert_eq!(ltr, rtl);
}

#[test]
fn no_text_is_lost_across_frame_boundaries() {
    let paras = vec![
        paragraph("Breaking news from the wire", 12.0, 22.0),
        paragraph("更新 at 09:00", 12.0, 22.0),
    ];
    for mode in [DisplayMode::ScrollLeftToRight, DisplayMode::Paged] {
        let pages = engine(mode, 90, 60).paginate(&paras);
        let rebuilt: String = pages.iter().map(page_text).collect();
        let expected: String = paras
            .iter()
            .flat_map(|p| p.tokens().iter().map(|t| t.content.as_str()))
            .collect();
        assert_eq!(rebuilt, expected);
    }
}

#[test]
fn words_are_never_split_across_pages() {
    let paras = vec![paragraph("unbreakable words survive pagination", 12.0, 26.0)];
    let pages = engine(DisplayMode::ScrollLeftToRight, 80, 40).paginate(&paras);
    assert!(pages.len() > 1);
    for page in &pages {
        for block in page.blocks() {
            // Every ASCII-letter run in a block is a whole input word.
            for run in block
                .content
                .split(|c: char| !c.is_ascii_alphabetic())
                .filter(|run| !run.is_empty())
            {
                assert!(
                    "unbreakable words survive pagination"
                        .split_whitespace()
                        .any(|word| word == run),
                    "split word fragment {:?}",
                    run
                );
            }
        }
    }
}

#[test]
fn paged_flow_from_assembled_feed_fills_pages_top_to_bottom() {
    let mut opts = FeedPrepOptions::default();
    opts.show_publish_time = false;
    opts.title.font = FontSpec::new("sans-serif", 15.0);
    opts.body.font = FontSpec::new("sans-serif", 15.0);
    let prep = FeedPrep::new(opts);
    let channel = FeedChannel::new(vec![FeedItem {
        title: Some("头条".to_string()),
        pub_date: None,
        description: vec!["正文".to_string(), "结尾".to_string()],
    }]);
    let paragraphs = prep.paragraphs(&channel, &ConstWidth(10.0)).unwrap();
    // Three paragraphs of font height 20 against page height 50.
    let pages = engine(DisplayMode::Paged, 100, 50).paginate(&paragraphs);
    assert_eq!(pages.len(), 2);
    let tops: Vec<f32> = pages[0].blocks().map(|b| b.top).collect();
    assert_eq!(tops, [0.0, 20.0]);
    assert_eq!(pages[1].blocks().next().unwrap().top, 0.0);
}

#[test]
fn disabled_fields_produce_zero_pages_without_error() {
    let opts = FeedPrepOptions {
        show_title: false,
        show_publish_time: false,
        show_body: false,
        ..FeedPrepOptions::default()
    };
    let prep = FeedPrep::new(opts);
    let channel = FeedChannel::new(vec![FeedItem {
        title: Some("ignored".to_string()),
        pub_date: Some("ignored".to_string()),
        description: vec!["ignored".to_string()],
    }]);
    let paragraphs = prep.paragraphs(&channel, &ConstWidth(10.0)).unwrap();
    assert!(paragraphs.is_empty());
    let pages = engine(DisplayMode::Paged, 100, 50).paginate(&paragraphs);
    assert!(pages.is_empty());
}

#[test]
fn block_roles_survive_through_layout() {
    let mut opts = FeedPrepOptions::default();
    opts.title.font = FontSpec::new("sans-serif", 12.0);
    opts.time.font = FontSpec::new("sans-serif", 12.0);
    opts.body.font = FontSpec::new("sans-serif", 12.0);
    let prep = FeedPrep::new(opts);
    let channel = FeedChannel::new(vec![FeedItem {
        title: Some("标".to_string()),
        pub_date: Some("时".to_string()),
        description: vec!["文".to_string()],
    }]);
    let paragraphs = prep.paragraphs(&channel, &ConstWidth(10.0)).unwrap();
    let pages = engine(DisplayMode::ScrollLeftToRight, 400, 40).paginate(&paragraphs);
    let roles: Vec<FieldRole> = pages[0].blocks().map(|b| b.role).collect();
    assert_eq!(roles, [FieldRole::Title, FieldRole::Time, FieldRole::Body]);
}
