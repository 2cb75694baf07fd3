use bytes::Bytes;
use thiserror::Error;

use crate::style::StyleContext;

/// English Metric Units per inch, the native length unit of WordprocessingML.
pub const EMU_PER_INCH: i64 = 914_400;

/// Converts inches to EMU, rounding toward zero.
pub fn emu_from_inches(inches: f64) -> i64 {
    (inches * EMU_PER_INCH as f64) as i64
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Alignment {
    #[default]
    Left,
    Center,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListStyle {
    Bullet,
    Number,
}

/// Paragraph-level formatting captured at creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParagraphOptions {
    pub alignment: Alignment,
    pub space_before_pt: u8,
    pub space_after_pt: u8,
    pub indent_emu: i64,
    pub list: Option<ListStyle>,
    /// Renders as a bottom-border-only paragraph, the visual `hr` rule.
    pub bottom_rule: bool,
}

/// One styled run inside a paragraph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Run {
    Text {
        text: String,
        style: StyleContext,
        size_pt: Option<u8>,
    },
    /// Underlined, colored link text bound to a URL.
    Hyperlink {
        url: String,
        text: String,
        style: StyleContext,
    },
    Image {
        data: Bytes,
        width_emu: i64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Paragraph {
    pub options: ParagraphOptions,
    pub runs: Vec<Run>,
}

/// Grid of sub-documents. Every cell holds the block stream its own sink
/// accumulated; `cells` is `rows` long and each row is `cols` long.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub rows: usize,
    pub cols: usize,
    pub cells: Vec<Vec<Vec<Block>>>,
}

/// A semantically typed output block, ready for a concrete document encoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Paragraph(Paragraph),
    Heading { level: u8, text: String },
    Table(Table),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SinkError {
    #[error("handle does not refer to a paragraph")]
    NotAParagraph,
    #[error("operation is not supported inside a table cell")]
    UnsupportedInCell,
}

/// Handle to an open paragraph inside one [`BlockSink`].
///
/// Handles are only meaningful for the sink that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParagraphHandle(usize);

/// Accumulates the ordered block stream for one document or one table cell.
///
/// The builder drives this through a narrow surface and only ever inspects
/// one capability: whether the sink is a table cell. Cell sinks reject
/// native headings and nested tables; the builder substitutes approximations.
#[derive(Debug, Default)]
pub struct BlockSink {
    is_cell: bool,
    blocks: Vec<Block>,
}

impl BlockSink {
    /// Sink for a top-level document.
    pub fn document() -> Self {
        Self {
            is_cell: false,
            blocks: Vec::new(),
        }
    }

    /// Sink for a single table cell sub-document.
    pub fn cell() -> Self {
        Self {
            is_cell: true,
            blocks: Vec::new(),
        }
    }

    pub fn is_cell(&self) -> bool {
        self.is_cell
    }

    pub fn add_paragraph(&mut self, options: ParagraphOptions) -> ParagraphHandle {
        self.blocks.push(Block::Paragraph(Paragraph {
            options,
            runs: Vec::new(),
        }));
        ParagraphHandle(self.blocks.len() - 1)
    }

    pub fn append_run(&mut self, handle: ParagraphHandle, run: Run) -> Result<(), SinkError> {
        match self.blocks.get_mut(handle.0) {
            Some(Block::Paragraph(paragraph)) => {
                paragraph.runs.push(run);
                Ok(())
            }
            _ => Err(SinkError::NotAParagraph),
        }
    }

    pub fn add_heading(&mut self, level: u8, text: impl Into<String>) -> Result<(), SinkError> {
        if self.is_cell {
            return Err(SinkError::UnsupportedInCell);
        }
        self.blocks.push(Block::Heading {
            level,
            text: text.into(),
        });
        Ok(())
    }

    pub fn add_table(&mut self, table: Table) -> Result<(), SinkError> {
        if self.is_cell {
            return Err(SinkError::UnsupportedInCell);
        }
        self.blocks.push(Block::Table(table));
        Ok(())
    }

    pub fn paragraph_count(&self) -> usize {
        self.blocks
            .iter()
            .filter(|block| matches!(block, Block::Paragraph(_)))
            .count()
    }

    /// Forces zero space before and after every paragraph. Applied to filled
    /// table cells so the grid stays compact.
    pub fn zero_paragraph_spacing(&mut self) {
        for block in &mut self.blocks {
            if let Block::Paragraph(paragraph) = block {
                paragraph.options.space_before_pt = 0;
                paragraph.options.space_after_pt = 0;
            }
        }
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn into_blocks(self) -> Vec<Block> {
        self.blocks
    }
}
