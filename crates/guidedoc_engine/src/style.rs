use crate::node::Element;

/// Active inline formatting flags at one position in the tree.
///
/// Copied on descent: a handler that wants different formatting for its
/// children derives a new value, the parent's snapshot is never touched.
/// Flags only accumulate down a path, nested markup never cancels them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StyleContext {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strike: bool,
    pub spoiler: bool,
    pub code: bool,
}

const BOLD_TAGS: &[&str] = &["b", "strong"];
const ITALIC_TAGS: &[&str] = &["i", "em"];
const UNDERLINE_TAGS: &[&str] = &["u", "ins"];
const STRIKE_TAGS: &[&str] = &["s", "strike", "del"];
const CODE_TAGS: &[&str] = &["code", "pre"];

/// Steam's BB-code markup generator emits heading divs with these classes.
/// The class maps to a heading level one below the native `hN` levels.
pub const HEADING_CLASSES: &[(&str, u8)] = &[("bb_h1", 1), ("bb_h2", 2), ("bb_h3", 3)];

/// Derives the style context for an element's children from its parent's.
pub fn child_context(element: &Element, parent: StyleContext) -> StyleContext {
    let mut ctx = parent;
    let tag = element.tag.as_str();
    if BOLD_TAGS.contains(&tag) {
        ctx.bold = true;
    }
    if ITALIC_TAGS.contains(&tag) {
        ctx.italic = true;
    }
    if UNDERLINE_TAGS.contains(&tag) {
        ctx.underline = true;
    }
    if STRIKE_TAGS.contains(&tag) || element.has_class("bb_strike") {
        ctx.strike = true;
    }
    if element.has_class("bb_spoiler") {
        ctx.spoiler = true;
    }
    if CODE_TAGS.contains(&tag) || element.has_class("bb_code") {
        ctx.code = true;
    }
    if HEADING_CLASSES
        .iter()
        .any(|(class, _)| element.has_class(class))
    {
        ctx.bold = true;
    }
    ctx
}

/// Tags that always start a new paragraph-equivalent in the output.
pub fn is_block_tag(tag: &str) -> bool {
    matches!(
        tag,
        "div"
            | "p"
            | "blockquote"
            | "h1"
            | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
            | "table"
            | "ul"
            | "ol"
            | "hr"
            | "pre"
    )
}

pub fn is_code_tag(tag: &str) -> bool {
    CODE_TAGS.contains(&tag)
}

/// Heading level for native `h1`..`h6` tags.
pub fn heading_tag_level(tag: &str) -> Option<u8> {
    match tag {
        "h1" => Some(1),
        "h2" => Some(2),
        "h3" => Some(3),
        "h4" => Some(4),
        "h5" => Some(5),
        "h6" => Some(6),
        _ => None,
    }
}

/// Heading level carried by a `bb_hN` class, if any.
pub fn heading_class_level(element: &Element) -> Option<u8> {
    HEADING_CLASSES
        .iter()
        .find(|(class, _)| element.has_class(class))
        .map(|(_, level)| *level)
}
