use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;

use guidedoc_logging::{guide_debug, guide_error, guide_info};

use crate::builder::{BuildSettings, DocBuilder};
use crate::cache::ImageCache;
use crate::decode::decode_page;
use crate::extract::extract_guide;
use crate::fetch::{ChannelProgressSink, FetchSettings, Fetcher, ReqwestFetcher};
use crate::filename::document_filename;
use crate::guide_url::{extract_guide_id, normalize_guide_url};
use crate::image::{ImageSettings, ReqwestImageFetcher};
use crate::sink::BlockSink;
use crate::style::StyleContext;
use crate::types::{ConvertEvent, ConvertProgress, FailureKind, GuideDocument, JobId, Stage};

#[derive(Debug, Clone, Default)]
pub struct EngineSettings {
    pub fetch: FetchSettings,
    pub images: ImageSettings,
    pub build: BuildSettings,
}

enum EngineCommand {
    Convert { job_id: JobId, url: String },
}

/// Drives conversions on a dedicated worker thread.
///
/// One conversion runs start to finish on that thread; progress and
/// completion stream back over a channel. Cancellation is cooperative: the
/// flag is polled between sections, never mid-subtree.
pub struct ConvertHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<ConvertEvent>,
    cancel: Arc<AtomicBool>,
}

impl ConvertHandle {
    pub fn new(settings: EngineSettings) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let cancel = Arc::new(AtomicBool::new(false));
        let worker_cancel = cancel.clone();

        thread::spawn(move || {
            let runtime = match tokio::runtime::Runtime::new() {
                Ok(runtime) => runtime,
                Err(err) => {
                    guide_error!("failed to start conversion runtime: {err}");
                    return;
                }
            };
            let fetcher = ReqwestFetcher::new(settings.fetch.clone());
            while let Ok(EngineCommand::Convert { job_id, url }) = cmd_rx.recv() {
                worker_cancel.store(false, Ordering::Relaxed);
                let result = run_conversion(
                    &runtime,
                    &fetcher,
                    &settings,
                    &worker_cancel,
                    job_id,
                    &url,
                    &event_tx,
                );
                let _ = event_tx.send(ConvertEvent::Completed { job_id, result });
            }
        });

        Self {
            cmd_tx,
            event_rx,
            cancel,
        }
    }

    pub fn enqueue(&self, job_id: JobId, url: impl Into<String>) {
        let _ = self.cmd_tx.send(EngineCommand::Convert {
            job_id,
            url: url.into(),
        });
    }

    /// Requests cooperative cancellation of the running conversion.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    pub fn try_recv(&self) -> Option<ConvertEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Blocks until the next event, or `None` once the worker is gone.
    pub fn recv(&self) -> Option<ConvertEvent> {
        self.event_rx.recv().ok()
    }
}

fn run_conversion(
    runtime: &tokio::runtime::Runtime,
    fetcher: &ReqwestFetcher,
    settings: &EngineSettings,
    cancel: &AtomicBool,
    job_id: JobId,
    url: &str,
    event_tx: &mpsc::Sender<ConvertEvent>,
) -> Result<GuideDocument, FailureKind> {
    let normalized = normalize_guide_url(url).map_err(|err| {
        guide_info!("rejected url '{url}': {err}");
        FailureKind::InvalidUrl
    })?;
    guide_info!("job {job_id}: converting {normalized}");

    let progress = |stage: Stage, section: Option<String>| {
        let _ = event_tx.send(ConvertEvent::Progress(ConvertProgress {
            job_id,
            stage,
            bytes: None,
            section,
        }));
    };

    progress(Stage::Fetching, None);
    let sink = ChannelProgressSink::new(event_tx.clone());
    let output = runtime
        .block_on(fetcher.fetch(job_id, &normalized, &sink))
        .map_err(|err| {
            guide_info!("job {job_id}: fetch failed: {err}");
            err.kind
        })?;

    if cancel.load(Ordering::Relaxed) {
        return Err(FailureKind::Cancelled);
    }

    progress(Stage::Extracting, None);
    let decoded = decode_page(&output.bytes, output.metadata.content_type.as_deref());
    let page = extract_guide(&decoded.html).ok_or(FailureKind::NoContent)?;
    guide_info!(
        "job {job_id}: '{}' with {} section(s), decoded as {}",
        page.title,
        page.sections.len(),
        decoded.encoding_label
    );

    // Every conversion owns its own cache; nothing is shared across jobs.
    let cache = Arc::new(ImageCache::new(settings.images.cache_capacity));
    let images = ReqwestImageFetcher::new(
        runtime.handle().clone(),
        cache.clone(),
        settings.images.clone(),
    )
    .map_err(|err| {
        guide_error!("job {job_id}: image client: {err}");
        err.kind
    })?;

    let mut doc_sink = BlockSink::document();
    let mut builder = DocBuilder::new(&mut doc_sink, &images, &settings.build);
    builder.add_section_heading(&page.title, 0);

    for section in &page.sections {
        if cancel.load(Ordering::Relaxed) {
            guide_info!("job {job_id}: cancelled");
            return Err(FailureKind::Cancelled);
        }
        if let Some(heading) = &section.heading {
            progress(Stage::Building, Some(short_label(heading)));
            builder.add_section_heading(heading, 1);
        } else {
            progress(Stage::Building, None);
        }
        for node in &section.body {
            builder.process(node, StyleContext::default());
        }
        builder.close_paragraph();
    }
    drop(builder);
    guide_debug!("job {job_id}: {}", cache.stats());

    let suggested_filename =
        document_filename(&page.title, extract_guide_id(&normalized).as_deref());
    Ok(GuideDocument {
        title: page.title,
        suggested_filename,
        blocks: doc_sink.into_blocks(),
    })
}

fn short_label(text: &str) -> String {
    const MAX_CHARS: usize = 40;
    if text.chars().count() <= MAX_CHARS {
        text.to_string()
    } else {
        let mut label: String = text.chars().take(MAX_CHARS).collect();
        label.push_str("...");
        label
    }
}
