use bytes::Bytes;
use guidedoc_engine::{
    nodes_from_fragment, Alignment, Block, BlockSink, BuildSettings, DocBuilder, ImageFetcher, Run,
    StyleContext, EMU_PER_INCH,
};
use pretty_assertions::assert_eq;

// Smallest valid 1x1 PNG.
const TINY_PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F,
    0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x62, 0x00,
    0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49,
    0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
];

/// Serves the tiny PNG for every URL; never touches the network.
struct StubImages;

impl ImageFetcher for StubImages {
    fn fetch(&self, _url: &str) -> Option<Bytes> {
        Some(Bytes::from_static(TINY_PNG))
    }
}

struct NoImages;

impl ImageFetcher for NoImages {
    fn fetch(&self, _url: &str) -> Option<Bytes> {
        None
    }
}

fn build_with(images: &dyn ImageFetcher, html: &str) -> Vec<Block> {
    let settings = BuildSettings::default();
    let mut sink = BlockSink::document();
    let mut builder = DocBuilder::new(&mut sink, images, &settings);
    for node in nodes_from_fragment(html) {
        builder.process(&node, StyleContext::default());
    }
    builder.close_paragraph();
    drop(builder);
    sink.into_blocks()
}

fn build(html: &str) -> Vec<Block> {
    build_with(&NoImages, html)
}

fn runs(block: &Block) -> &[Run] {
    match block {
        Block::Paragraph(paragraph) => &paragraph.runs,
        other => panic!("expected paragraph, got {other:?}"),
    }
}

#[test]
fn nested_tags_accumulate_flags_and_siblings_do_not() {
    let blocks = build("<b>bold<i>both</i></b>after");
    assert_eq!(blocks.len(), 1);
    let runs = runs(&blocks[0]);
    assert_eq!(runs.len(), 3);
    let Run::Text { text, style, .. } = &runs[0] else {
        panic!("expected text run");
    };
    assert_eq!(text, "bold");
    assert!(style.bold && !style.italic);
    let Run::Text { text, style, .. } = &runs[1] else {
        panic!("expected text run");
    };
    assert_eq!(text, "both");
    assert!(style.bold && style.italic);
    let Run::Text { style, .. } = &runs[2] else {
        panic!("expected text run");
    };
    assert_eq!(*style, StyleContext::default());
}

#[test]
fn strike_and_spoiler_come_from_classes() {
    let blocks = build(r#"<span class="bb_strike">gone</span><span class="bb_spoiler">shh</span>"#);
    let runs = runs(&blocks[0]);
    let Run::Text { style, .. } = &runs[0] else {
        panic!("expected text run");
    };
    assert!(style.strike);
    let Run::Text { style, .. } = &runs[1] else {
        panic!("expected text run");
    };
    assert!(style.spoiler);
}

#[test]
fn anchor_with_href_becomes_a_hyperlink_run() {
    let blocks = build(r#"<a href="https://example.com/page">Read this</a>"#);
    assert_eq!(blocks.len(), 1);
    let [Run::Hyperlink { url, text, .. }] = runs(&blocks[0]) else {
        panic!("expected a single hyperlink run");
    };
    assert_eq!(url, "https://example.com/page");
    assert_eq!(text, "Read this");
}

#[test]
fn anchor_without_href_falls_back_to_plain_text() {
    let blocks = build("<a>just text</a>");
    let [Run::Text { text, .. }] = runs(&blocks[0]) else {
        panic!("expected a single text run");
    };
    assert_eq!(text, "just text");
}

#[test]
fn anchor_wrapping_an_image_yields_only_the_image() {
    let blocks = build_with(
        &StubImages,
        r#"<a href="https://example.com"><img src="https://img.example.com/a.png"></a>"#,
    );
    assert_eq!(blocks.len(), 1);
    let Block::Paragraph(paragraph) = &blocks[0] else {
        panic!("expected paragraph");
    };
    assert_eq!(paragraph.options.alignment, Alignment::Center);
    let [Run::Image { width_emu, .. }] = paragraph.runs.as_slice() else {
        panic!("expected a single image run");
    };
    // 1 px wide, kept at natural size: 1/96 inch.
    assert_eq!(*width_emu, EMU_PER_INCH / 96);
}

#[test]
fn unavailable_images_are_skipped_without_breaking_flow() {
    let blocks = build(r#"<p>A</p><img src="https://img.example.com/x.png"><p>B</p>"#);
    assert_eq!(blocks.len(), 2);
    assert!(runs(&blocks[0]).iter().any(|r| matches!(r, Run::Text { text, .. } if text == "A")));
    assert!(runs(&blocks[1]).iter().any(|r| matches!(r, Run::Text { text, .. } if text == "B")));
}

#[test]
fn native_heading_tags_emit_heading_blocks() {
    let blocks = build("<h2>Setup</h2><p>body</p>");
    assert_eq!(blocks.len(), 2);
    assert_eq!(
        blocks[0],
        Block::Heading {
            level: 2,
            text: "Setup".to_string()
        }
    );
}

#[test]
fn steam_heading_classes_map_one_level_down() {
    let blocks = build(r#"<div class="bb_h1">Top</div>"#);
    assert_eq!(
        blocks[0],
        Block::Heading {
            level: 2,
            text: "Top".to_string()
        }
    );
}

#[test]
fn blockquote_is_one_indented_italic_paragraph() {
    let blocks = build("<blockquote>Quoted words</blockquote>");
    assert_eq!(blocks.len(), 1);
    let Block::Paragraph(paragraph) = &blocks[0] else {
        panic!("expected paragraph");
    };
    assert_eq!(paragraph.options.indent_emu, EMU_PER_INCH / 2);
    let [Run::Text { text, style, .. }] = paragraph.runs.as_slice() else {
        panic!("expected a single text run");
    };
    assert_eq!(text, "Quoted words");
    assert!(style.italic);
}

#[test]
fn code_preserves_whitespace_and_closes_its_paragraph() {
    let blocks = build("<code>let x  =  1;</code>after");
    assert_eq!(blocks.len(), 2);
    let [Run::Text { text, style, .. }] = runs(&blocks[0]) else {
        panic!("expected a single text run");
    };
    assert_eq!(text, "let x  =  1;");
    assert!(style.code);
    let [Run::Text { text, style, .. }] = runs(&blocks[1]) else {
        panic!("expected a single text run");
    };
    assert_eq!(text, "after");
    assert!(!style.code);
}
