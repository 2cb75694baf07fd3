use bytes::Bytes;
use guidedoc_engine::{
    nodes_from_fragment, Block, BlockSink, BuildSettings, DocBuilder, ImageFetcher, Run,
    StyleContext,
};
use pretty_assertions::assert_eq;

struct NoImages;

impl ImageFetcher for NoImages {
    fn fetch(&self, _url: &str) -> Option<Bytes> {
        None
    }
}

fn build(html: &str) -> Vec<Block> {
    let settings = BuildSettings::default();
    let mut sink = BlockSink::document();
    let mut builder = DocBuilder::new(&mut sink, &NoImages, &settings);
    for node in nodes_from_fragment(html) {
        builder.process(&node, StyleContext::default());
    }
    builder.close_paragraph();
    drop(builder);
    sink.into_blocks()
}

fn paragraph_text(block: &Block) -> String {
    let Block::Paragraph(paragraph) = block else {
        panic!("expected paragraph, got {block:?}");
    };
    paragraph
        .runs
        .iter()
        .map(|run| match run {
            Run::Text { text, .. } => text.as_str(),
            Run::Hyperlink { text, .. } => text.as_str(),
            Run::Image { .. } => "[image]",
        })
        .collect()
}

fn is_blank_paragraph(block: &Block) -> bool {
    match block {
        Block::Paragraph(paragraph) => matches!(
            paragraph.runs.as_slice(),
            [Run::Text { text, size_pt: Some(11), .. }] if text.is_empty()
        ),
        _ => false,
    }
}

#[test]
fn three_breaks_become_two_blank_lines() {
    let blocks = build("<p>Hello</p><br><br><br><p>World</p>");
    assert_eq!(blocks.len(), 4);
    assert_eq!(paragraph_text(&blocks[0]), "Hello");
    assert!(is_blank_paragraph(&blocks[1]));
    assert!(is_blank_paragraph(&blocks[2]));
    assert_eq!(paragraph_text(&blocks[3]), "World");
}

#[test]
fn a_single_break_only_starts_a_new_paragraph() {
    let blocks = build("A<br>B");
    assert_eq!(blocks.len(), 2);
    assert_eq!(paragraph_text(&blocks[0]), "A");
    assert_eq!(paragraph_text(&blocks[1]), "B");
}

#[test]
fn breaks_with_no_content_produce_nothing() {
    assert!(build("<br><br><br>").is_empty());
}

#[test]
fn empty_blocks_count_as_breaks_after_content() {
    let blocks = build("<p>A</p><div></div><div></div><p>B</p>");
    assert_eq!(blocks.len(), 3);
    assert_eq!(paragraph_text(&blocks[0]), "A");
    assert!(is_blank_paragraph(&blocks[1]));
    assert_eq!(paragraph_text(&blocks[2]), "B");
}

#[test]
fn leading_empty_blocks_are_discarded() {
    let blocks = build("<div></div><div></div><p>Hi</p>");
    assert_eq!(blocks.len(), 1);
    assert_eq!(paragraph_text(&blocks[0]), "Hi");
}

#[test]
fn leading_breaks_are_discarded() {
    let blocks = build("<br><br><p>Hi</p>");
    assert_eq!(blocks.len(), 1);
    assert_eq!(paragraph_text(&blocks[0]), "Hi");
}

#[test]
fn trailing_breaks_are_discarded() {
    let blocks = build("<p>A</p><br><br>");
    assert_eq!(blocks.len(), 1);
    assert_eq!(paragraph_text(&blocks[0]), "A");
}

#[test]
fn blocks_with_only_breaks_inside_count_as_one_break() {
    // <div><br><br></div> is an empty block, not two breaks.
    let blocks = build("<p>A</p><div><br><br></div><div><br></div><p>B</p>");
    assert_eq!(blocks.len(), 3);
    assert!(is_blank_paragraph(&blocks[1]));
}

#[test]
fn nbsp_only_paragraphs_count_as_breaks() {
    let blocks = build("<p>A</p><p>\u{a0}</p><p>\u{a0}</p><p>B</p>");
    assert_eq!(blocks.len(), 3);
    assert_eq!(paragraph_text(&blocks[0]), "A");
    assert!(is_blank_paragraph(&blocks[1]));
    assert_eq!(paragraph_text(&blocks[2]), "B");
}
