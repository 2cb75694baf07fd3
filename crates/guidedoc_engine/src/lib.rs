//! Guidedoc engine: fetches a Steam Community guide and rebuilds it as a
//! structured document tree ready for export.
mod builder;
mod cache;
mod decode;
mod engine;
mod extract;
mod fetch;
mod filename;
mod guide_url;
mod image;
mod node;
mod sink;
mod style;
mod types;

pub use builder::{BuildSettings, DocBuilder, Skip};
pub use cache::{CacheStats, ImageCache};
pub use decode::{decode_page, DecodedPage};
pub use engine::{ConvertHandle, EngineSettings};
pub use extract::{extract_guide, GuidePage, GuideSection};
pub use fetch::{
    ChannelProgressSink, FetchSettings, Fetcher, ProgressSink, ReqwestFetcher, USER_AGENT,
};
pub use filename::document_filename;
pub use guide_url::{extract_guide_id, normalize_guide_url, GuideUrlError};
pub use image::{intrinsic_width_px, ImageFetcher, ImageSettings, ReqwestImageFetcher};
pub use node::{nodes_from_fragment, Element, Node};
pub use sink::{
    emu_from_inches, Alignment, Block, BlockSink, ListStyle, Paragraph, ParagraphHandle,
    ParagraphOptions, Run, SinkError, Table, EMU_PER_INCH,
};
pub use style::{child_context, StyleContext};
pub use types::{
    ConvertEvent, ConvertProgress, FailureKind, FetchError, FetchMetadata, FetchOutput,
    GuideDocument, JobId, Stage,
};
