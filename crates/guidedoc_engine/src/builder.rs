use guidedoc_logging::{guide_debug, guide_error};

use crate::image::ImageFetcher;
use crate::node::{Element, Node};
use crate::sink::{
    emu_from_inches, Alignment, BlockSink, ListStyle, ParagraphHandle, ParagraphOptions, Run,
    Table, EMU_PER_INCH,
};
use crate::style::{
    child_context, heading_class_level, heading_tag_level, is_block_tag, is_code_tag, StyleContext,
};

const MAX_RECURSION_DEPTH: u32 = 50;
const MAX_LIST_DEPTH: u32 = 10;

/// Images narrower than this keep their intrinsic width instead of being
/// scaled up to the configured maximum.
const SMALL_IMAGE_PX: u32 = 400;
const PX_PER_INCH: i64 = 96;

/// Font size of the zero-width run inside an emitted blank paragraph.
const EMPTY_RUN_SIZE_PT: u8 = 11;

const ROW_CLASSES: &[&str] = &["bb_table_tr"];
const CELL_CLASSES: &[&str] = &["bb_table_td", "bb_table_th"];

/// Image width limits consumed by the builder. Everything else in the
/// application configuration is irrelevant here.
#[derive(Debug, Clone)]
pub struct BuildSettings {
    pub max_image_width_emu: i64,
    pub cell_image_width_emu: i64,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            max_image_width_emu: emu_from_inches(6.0),
            cell_image_width_emu: emu_from_inches(1.8),
        }
    }
}

/// Why a handler dropped a piece of content instead of emitting it.
///
/// None of these stop the walk; the dispatcher logs the reason and moves on.
/// Partial output always beats no output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Skip {
    ListDepthCeiling,
    ImageUnavailable,
    ImageInsert,
    TableMalformed,
}

/// Recursive tree-walk that turns one HTML subtree into sink blocks.
///
/// One builder serves exactly one sink. Table cells get their own builder
/// bound to their own cell sink, so paragraph state, pending breaks, and the
/// depth counters never leak across cell boundaries.
pub struct DocBuilder<'a> {
    sink: &'a mut BlockSink,
    images: &'a dyn ImageFetcher,
    settings: &'a BuildSettings,
    current_paragraph: Option<ParagraphHandle>,
    /// True while the open paragraph has received no run yet; used to strip
    /// leading whitespace from a fresh paragraph.
    paragraph_is_empty: bool,
    /// Consecutive `<br>` markers (and empty blocks) seen since the last
    /// flush. N markers become N-1 blank paragraphs once real content follows.
    pending_breaks: u32,
    /// False until the first real content, so leading blank lines are dropped.
    has_content: bool,
    depth: u32,
    list_depth: u32,
}

impl<'a> DocBuilder<'a> {
    pub fn new(
        sink: &'a mut BlockSink,
        images: &'a dyn ImageFetcher,
        settings: &'a BuildSettings,
    ) -> Self {
        Self {
            sink,
            images,
            settings,
            current_paragraph: None,
            paragraph_is_empty: true,
            pending_breaks: 0,
            has_content: false,
            depth: 0,
            list_depth: 0,
        }
    }

    /// Dispatches one node. The depth counter is balanced on every path out,
    /// and subtrees past the ceiling are dropped without failing.
    pub fn process(&mut self, node: &Node, ctx: StyleContext) {
        self.depth += 1;
        if self.depth > MAX_RECURSION_DEPTH {
            self.depth -= 1;
            guide_debug!("recursion ceiling reached, dropping subtree");
            return;
        }
        match node {
            Node::Text(text) => self.process_text(text, ctx),
            Node::Element(element) => self.process_element(element, ctx),
        }
        self.depth -= 1;
    }

    /// Emits a heading on behalf of the driver (document title, section
    /// titles), honoring the same flush discipline as in-tree headings.
    pub fn add_section_heading(&mut self, text: &str, level: u8) {
        self.flush_pending_breaks();
        self.close_paragraph();
        if let Err(err) = self.sink.add_heading(level.min(9), text) {
            guide_debug!("section heading skipped: {err}");
            return;
        }
        self.has_content = true;
    }

    /// Ends the open paragraph, if any. Later content starts a fresh one.
    pub fn close_paragraph(&mut self) {
        if self.current_paragraph.is_some() {
            self.has_content = true;
        }
        self.current_paragraph = None;
        self.paragraph_is_empty = true;
    }

    fn get_paragraph(&mut self) -> ParagraphHandle {
        self.get_paragraph_with(ParagraphOptions::default())
    }

    fn get_paragraph_with(&mut self, options: ParagraphOptions) -> ParagraphHandle {
        match self.current_paragraph {
            Some(handle) => handle,
            None => {
                let handle = self.sink.add_paragraph(options);
                self.current_paragraph = Some(handle);
                self.paragraph_is_empty = true;
                handle
            }
        }
    }

    fn add_empty_paragraph(&mut self) {
        let handle = self.sink.add_paragraph(ParagraphOptions::default());
        // The zero-width run keeps the document format from collapsing the
        // paragraph into nothing.
        let _ = self.sink.append_run(
            handle,
            Run::Text {
                text: String::new(),
                style: StyleContext::default(),
                size_pt: Some(EMPTY_RUN_SIZE_PT),
            },
        );
    }

    /// Converts accumulated break markers into blank paragraphs.
    ///
    /// One marker alone only moves to a new paragraph; each marker after the
    /// first produces a visible blank line. Markers seen before any real
    /// content are discarded. Called immediately before emitting anything.
    fn flush_pending_breaks(&mut self) {
        if self.pending_breaks == 0 {
            return;
        }
        if !self.has_content {
            self.pending_breaks = 0;
            return;
        }
        for _ in 1..self.pending_breaks {
            self.add_empty_paragraph();
        }
        self.pending_breaks = 0;
    }

    fn process_text(&mut self, raw: &str, ctx: StyleContext) {
        let text = if ctx.code {
            raw.to_string()
        } else {
            collapse_whitespace(raw)
        };
        if text.is_empty() || (!ctx.code && text.chars().all(char::is_whitespace)) {
            return;
        }

        self.flush_pending_breaks();
        let handle = self.get_paragraph();

        // A fresh paragraph never starts with whitespace.
        let text = if self.paragraph_is_empty {
            let trimmed = text.trim_start();
            if trimmed.is_empty() {
                return;
            }
            trimmed.to_string()
        } else {
            text
        };

        if let Err(err) = self.sink.append_run(
            handle,
            Run::Text {
                text,
                style: ctx,
                size_pt: None,
            },
        ) {
            guide_debug!("text run skipped: {err}");
            return;
        }
        self.paragraph_is_empty = false;
        self.has_content = true;
    }

    fn process_element(&mut self, element: &Element, ctx: StyleContext) {
        let tag = element.tag.as_str();

        if tag == "br" {
            self.pending_breaks += 1;
            self.close_paragraph();
            return;
        }

        if is_block_tag(tag) {
            if is_empty_block(element) {
                // Authors lean on empty <div>/<p> for vertical spacing, so an
                // empty block counts as one extra break marker. Before any
                // real content it is noise.
                if self.has_content {
                    self.pending_breaks += 1;
                    self.close_paragraph();
                }
                return;
            }
            self.flush_pending_breaks();
            self.close_paragraph();
        }

        let child_ctx = child_context(element, ctx);

        if let Some(level) = heading_tag_level(tag) {
            self.flush_pending_breaks();
            self.handle_heading(element, level);
            return;
        }

        if let Some(level) = heading_class_level(element) {
            self.flush_pending_breaks();
            self.handle_class_heading(element, level);
            return;
        }

        if tag == "hr" {
            self.flush_pending_breaks();
            self.sink.add_paragraph(ParagraphOptions {
                bottom_rule: true,
                ..Default::default()
            });
            self.close_paragraph();
            self.has_content = true;
            return;
        }

        if tag == "img" {
            if let Some(src) = element.attr("src") {
                if let Err(skip) = self.handle_image(src) {
                    guide_debug!("image skipped ({skip:?}): {src}");
                }
            }
            return;
        }

        if tag == "a" {
            self.flush_pending_breaks();
            self.handle_link(element, child_ctx);
            return;
        }

        if tag == "ul" || tag == "ol" {
            self.flush_pending_breaks();
            if let Err(skip) = self.handle_list(element, tag == "ol", child_ctx) {
                guide_debug!("list skipped ({skip:?})");
            }
            return;
        }

        if tag == "blockquote" {
            self.flush_pending_breaks();
            self.handle_blockquote(element, child_ctx);
            return;
        }

        if element.has_class("bb_table") {
            self.flush_pending_breaks();
            if let Err(skip) = self.handle_table(element) {
                guide_error!("table skipped ({skip:?})");
            }
            return;
        }

        for child in &element.children {
            self.process(child, child_ctx);
        }

        // Code blocks always terminate their own paragraph.
        if child_ctx.code && is_code_tag(tag) {
            self.close_paragraph();
        }
    }

    fn handle_heading(&mut self, element: &Element, level: u8) {
        let text = collapse_whitespace(&element.flattened_text());
        let text = text.trim();
        if text.is_empty() {
            self.close_paragraph();
            return;
        }
        if self.sink.is_cell() {
            // The target format has no nested headings inside table cells;
            // approximate with a bold run scaled by level.
            let handle = self.get_paragraph();
            let size = (14u8.saturating_sub(level)).max(9);
            if let Err(err) = self.sink.append_run(
                handle,
                Run::Text {
                    text: text.to_string(),
                    style: StyleContext {
                        bold: true,
                        ..Default::default()
                    },
                    size_pt: Some(size),
                },
            ) {
                guide_debug!("cell heading run skipped: {err}");
            }
        } else if let Err(err) = self.sink.add_heading(level.min(9), text) {
            guide_debug!("heading skipped: {err}");
        }
        self.close_paragraph();
        self.has_content = true;
    }

    fn handle_class_heading(&mut self, element: &Element, level: u8) {
        let text = collapse_whitespace(&element.flattened_text());
        let text = text.trim();
        if text.is_empty() {
            self.close_paragraph();
            return;
        }
        if self.sink.is_cell() {
            let handle = self.get_paragraph();
            if let Err(err) = self.sink.append_run(
                handle,
                Run::Text {
                    text: text.to_string(),
                    style: StyleContext {
                        bold: true,
                        ..Default::default()
                    },
                    size_pt: Some(11),
                },
            ) {
                guide_debug!("cell heading run skipped: {err}");
            }
        } else if let Err(err) = self.sink.add_heading(level + 1, text) {
            guide_debug!("heading skipped: {err}");
        }
        self.close_paragraph();
        self.has_content = true;
    }

    fn handle_image(&mut self, src: &str) -> Result<(), Skip> {
        self.flush_pending_breaks();
        self.close_paragraph();

        let Some(data) = self.images.fetch(src) else {
            return Err(Skip::ImageUnavailable);
        };

        let max_width = if self.sink.is_cell() {
            self.settings.cell_image_width_emu
        } else {
            self.settings.max_image_width_emu
        };
        // Thumbnails keep their natural size at 96 px/inch; bytes that cannot
        // be decoded for size inspection fall back to the configured maximum.
        let width_emu = match crate::image::intrinsic_width_px(&data) {
            Some(px) if px < SMALL_IMAGE_PX => px as i64 * EMU_PER_INCH / PX_PER_INCH,
            _ => max_width,
        };

        let handle = self.sink.add_paragraph(ParagraphOptions {
            alignment: Alignment::Center,
            space_before_pt: 2,
            space_after_pt: 2,
            ..Default::default()
        });
        let inserted = self.sink.append_run(handle, Run::Image { data, width_emu });
        self.close_paragraph();
        match inserted {
            Ok(()) => {
                self.has_content = true;
                Ok(())
            }
            Err(_) => Err(Skip::ImageInsert),
        }
    }

    fn handle_link(&mut self, element: &Element, ctx: StyleContext) {
        // A link wrapping only an image is shown as the image; the clickable
        // wrapper is dropped.
        if let Some(img) = element.find_descendant("img") {
            if let Some(src) = img.attr("src") {
                if let Err(skip) = self.handle_image(src) {
                    guide_debug!("linked image skipped ({skip:?}): {src}");
                }
            }
            return;
        }

        let text = element.flattened_text();
        let text = text.trim();
        if text.is_empty() {
            // Anchor with no visible text of its own, e.g. a fragment target.
            for child in &element.children {
                self.process(child, ctx);
            }
            return;
        }

        let handle = self.get_paragraph();
        let run = match element.attr("href") {
            Some(href) => Run::Hyperlink {
                url: href.to_string(),
                text: text.to_string(),
                style: ctx,
            },
            None => Run::Text {
                text: text.to_string(),
                style: ctx,
                size_pt: None,
            },
        };
        if let Err(err) = self.sink.append_run(handle, run) {
            guide_debug!("link run skipped: {err}");
            return;
        }
        self.paragraph_is_empty = false;
        self.has_content = true;
    }

    fn handle_list(
        &mut self,
        element: &Element,
        numbered: bool,
        ctx: StyleContext,
    ) -> Result<(), Skip> {
        self.list_depth += 1;
        if self.list_depth > MAX_LIST_DEPTH {
            self.list_depth -= 1;
            return Err(Skip::ListDepthCeiling);
        }

        let style = if numbered {
            ListStyle::Number
        } else {
            ListStyle::Bullet
        };
        // Direct li children only; nested lists surface again when the item's
        // own children are dispatched, at increased list depth.
        for child in &element.children {
            let Node::Element(item) = child else {
                continue;
            };
            if item.tag != "li" {
                continue;
            }
            let indent_emu = if self.list_depth > 1 {
                emu_from_inches(0.25) * self.list_depth as i64
            } else {
                0
            };
            let handle = self.sink.add_paragraph(ParagraphOptions {
                list: Some(style),
                indent_emu,
                ..Default::default()
            });
            self.current_paragraph = Some(handle);
            self.paragraph_is_empty = true;
            for grandchild in &item.children {
                self.process(grandchild, ctx);
            }
            self.close_paragraph();
        }
        self.has_content = true;
        self.list_depth -= 1;
        Ok(())
    }

    fn handle_blockquote(&mut self, element: &Element, ctx: StyleContext) {
        self.close_paragraph();
        let handle = self.sink.add_paragraph(ParagraphOptions {
            indent_emu: emu_from_inches(0.5),
            space_before_pt: 2,
            space_after_pt: 2,
            ..Default::default()
        });
        self.current_paragraph = Some(handle);
        self.paragraph_is_empty = true;
        // Quotes render italic; other active flags carry through.
        let quote_ctx = StyleContext {
            italic: true,
            ..ctx
        };
        for child in &element.children {
            self.process(child, quote_ctx);
        }
        self.close_paragraph();
        self.has_content = true;
    }

    fn handle_table(&mut self, element: &Element) -> Result<(), Skip> {
        self.close_paragraph();

        if self.sink.is_cell() {
            // Tables never nest; inside a cell a placeholder stands in.
            let handle = self.get_paragraph();
            let placed = self.sink.append_run(
                handle,
                Run::Text {
                    text: "[Table]".to_string(),
                    style: StyleContext {
                        italic: true,
                        ..Default::default()
                    },
                    size_pt: None,
                },
            );
            self.close_paragraph();
            return placed.map_err(|_| Skip::TableMalformed);
        }

        let rows = element.find_all_by_class("div", ROW_CLASSES);
        if rows.is_empty() {
            return Err(Skip::TableMalformed);
        }
        // Column count comes from the first row; longer rows are truncated,
        // shorter rows leave trailing cells at the sink default.
        let cols = rows[0].find_all_by_class("div", CELL_CLASSES).len();
        if cols == 0 {
            return Err(Skip::TableMalformed);
        }

        let mut cells = Vec::with_capacity(rows.len());
        for row in &rows {
            let row_cells = row.find_all_by_class("div", CELL_CLASSES);
            let mut built = Vec::with_capacity(cols);
            for cell in row_cells.iter().take(cols) {
                built.push(self.build_cell(cell)?);
            }
            while built.len() < cols {
                built.push(Vec::new());
            }
            cells.push(built);
        }

        let table = Table {
            rows: rows.len(),
            cols,
            cells,
        };
        match self.sink.add_table(table) {
            Ok(()) => {
                self.has_content = true;
                Ok(())
            }
            Err(_) => Err(Skip::TableMalformed),
        }
    }

    /// Fills one table cell with a fresh sink and a fresh builder: formatting
    /// never leaks into the cell and both depth counters restart at zero.
    fn build_cell(&self, cell: &Element) -> Result<Vec<crate::sink::Block>, Skip> {
        let mut cell_sink = BlockSink::cell();
        let mut sub = DocBuilder::new(&mut cell_sink, self.images, self.settings);
        for child in &cell.children {
            sub.process(child, StyleContext::default());
        }
        drop(sub);
        if cell_sink.paragraph_count() == 0 {
            cell_sink.add_paragraph(ParagraphOptions::default());
        }
        cell_sink.zero_paragraph_spacing();
        Ok(cell_sink.into_blocks())
    }
}

/// Shallow emptiness check for a block-level element: only break markers and
/// blank text (ASCII whitespace, NBSP, the literal `&nbsp;`) count as empty.
/// Any other element child makes the block non-empty, even if that child is
/// itself empty; nested empty wrappers intentionally do not collapse.
fn is_empty_block(element: &Element) -> bool {
    for child in &element.children {
        match child {
            Node::Element(el) => {
                if el.tag == "br" {
                    continue;
                }
                return false;
            }
            Node::Text(text) => {
                let trimmed = text.trim().replace('\u{a0}', "").replace("&nbsp;", "");
                if !trimmed.is_empty() {
                    return false;
                }
            }
        }
    }
    true
}

/// Collapses every whitespace run to a single space, HTML-style. Leading and
/// trailing runs stay as one space; paragraph state decides whether they show.
fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;
    for ch in text.chars() {
        if ch.is_whitespace() {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(ch);
            in_space = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{collapse_whitespace, is_empty_block};
    use crate::node::{nodes_from_fragment, Node};

    fn first_element(html: &str) -> crate::node::Element {
        match nodes_from_fragment(html).into_iter().next() {
            Some(Node::Element(el)) => el,
            other => panic!("expected element, got {other:?}"),
        }
    }

    #[test]
    fn whitespace_runs_collapse_to_single_spaces() {
        assert_eq!(collapse_whitespace("a \n\t b"), "a b");
        assert_eq!(collapse_whitespace("  lead"), " lead");
    }

    #[test]
    fn blocks_with_only_breaks_and_blanks_are_empty() {
        assert!(is_empty_block(&first_element("<div></div>")));
        assert!(is_empty_block(&first_element("<div><br><br></div>")));
        assert!(is_empty_block(&first_element("<p> \u{a0} </p>")));
        assert!(is_empty_block(&first_element("<p>&nbsp;</p>")));
    }

    #[test]
    fn any_element_child_makes_a_block_non_empty() {
        // Shallow by contract: the span is empty but still counts as content.
        assert!(!is_empty_block(&first_element("<div><span></span></div>")));
        assert!(!is_empty_block(&first_element("<div>text</div>")));
    }
}
