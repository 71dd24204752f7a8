//! Background regeneration of the series and archive pages.
//!
//! One worker task drains the signal queue. For each signal it composes the
//! page from the current index snapshot, renders it and publishes the result
//! on a watch channel. Readers never wait on a regeneration.

use std::sync::Arc;
use std::time::Instant;

use metrics::histogram;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::application::render::{RenderError, RenderRequest, RenderService, RenderTarget};

use super::compose::{archive_markdown, series_markdown};
use super::events::{RegenerationSignal, SignalReceiver};
use super::state::IndexHandle;

const METRIC_REGENERATION_MS: &str = "quire_page_regeneration_ms";

/// Latest rendered composite pages.
///
/// The version counters start at zero and grow by one per successful render,
/// so a zero version means the page was never generated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedPages {
    pub series: String,
    pub archive: String,
    pub series_version: u64,
    pub archive_version: u64,
}

impl RenderedPages {
    pub fn version(&self, signal: RegenerationSignal) -> u64 {
        match signal {
            RegenerationSignal::Series => self.series_version,
            RegenerationSignal::Archive => self.archive_version,
        }
    }
}

/// Consumer of regeneration signals.
pub struct RegenerationWorker {
    index: Arc<IndexHandle>,
    renderer: Arc<dyn RenderService>,
    pages: Arc<watch::Sender<RenderedPages>>,
    receiver: SignalReceiver,
    archive_compact_threshold: usize,
}

impl RegenerationWorker {
    pub fn new(
        index: Arc<IndexHandle>,
        renderer: Arc<dyn RenderService>,
        pages: Arc<watch::Sender<RenderedPages>>,
        receiver: SignalReceiver,
        archive_compact_threshold: usize,
    ) -> Self {
        Self {
            index,
            renderer,
            pages,
            receiver,
            archive_compact_threshold,
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Process signals until the queue is closed and drained.
    pub async fn run(mut self) {
        info!(target = "quire::cache::worker", "Regeneration worker started");

        while let Some(signal) = self.receiver.recv().await {
            if let Err(err) = self.regenerate(signal) {
                warn!(
                    target = "quire::cache::worker",
                    signal = signal.as_str(),
                    error = %err,
                    "Page regeneration failed; keeping previous page"
                );
            }
        }

        info!(target = "quire::cache::worker", "Regeneration worker stopped");
    }

    fn regenerate(&self, signal: RegenerationSignal) -> Result<(), RenderError> {
        let started_at = Instant::now();
        let snapshot = self.index.snapshot();

        let request = match signal {
            RegenerationSignal::Series => {
                RenderRequest::new(RenderTarget::SeriesPage, series_markdown(&snapshot))
            }
            RegenerationSignal::Archive => RenderRequest::new(
                RenderTarget::ArchivePage,
                archive_markdown(&snapshot, self.archive_compact_threshold),
            ),
        };
        let html = self.renderer.render(&request)?;

        self.pages.send_modify(|pages| match signal {
            RegenerationSignal::Series => {
                pages.series = html;
                pages.series_version += 1;
            }
            RegenerationSignal::Archive => {
                pages.archive = html;
                pages.archive_version += 1;
            }
        });

        let elapsed_ms = started_at.elapsed().as_secs_f64() * 1000.0;
        histogram!(METRIC_REGENERATION_MS, "kind" => signal.as_str()).record(elapsed_ms);
        debug!(
            target = "quire::cache::worker",
            signal = signal.as_str(),
            items = snapshot.len(),
            elapsed_ms,
            "Page regenerated"
        );

        Ok(())
    }
}
