//! Streaming progress for batch AI categorization
//!
//! The batch endpoint answers with a long-lived body of newline-delimited JSON
//! objects, each tagged with a `type`:
//!
//! ```text
//! {"type":"start","total":10}
//! {"type":"progress","categorized":3,"current":3}
//! {"type":"complete","stats":{"categorized":7,"rules_created":1}}
//! ```
//!
//! Reads do not line up with events. [`LineDecoder`] buffers partial lines
//! across chunks and only parses complete ones; [`ProgressState`] folds events
//! in arrival order. The stream is consumed sequentially by a single reader.

use std::time::Duration;

use futures::{Stream, StreamExt};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::models::{CategorizeStats, Notification};
use crate::service::TransactionService;

/// One decoded line of the progress stream
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    Start {
        total: u64,
    },
    Progress {
        #[serde(default)]
        categorized: u64,
        #[serde(default)]
        current: u64,
    },
    Complete {
        #[serde(default)]
        stats: CategorizeStats,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TotalSource {
    Start,
    /// Taken from `current` because no `start` arrived
    Fallback,
}

/// Folded state of one batch job
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressState {
    pub processed: u64,
    pub total: Option<u64>,
    total_source: Option<TotalSource>,
    pub stats: Option<CategorizeStats>,
}

impl ProgressState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one event. `processed` never decreases and a total set by
    /// `start` is never overwritten.
    pub fn apply(&mut self, event: &ProgressEvent) {
        match event {
            ProgressEvent::Start { total } => {
                if self.total_source != Some(TotalSource::Start) {
                    self.total = Some(*total);
                    self.total_source = Some(TotalSource::Start);
                }
            }
            ProgressEvent::Progress {
                categorized,
                current,
            } => {
                self.processed = self.processed.max(*categorized);
                if self.total.is_none() {
                    self.total = Some(*current);
                    self.total_source = Some(TotalSource::Fallback);
                }
            }
            ProgressEvent::Complete { stats } => {
                self.processed = self.processed.max(stats.categorized);
                self.stats = Some(*stats);
            }
        }
    }

    pub fn is_complete(&self) -> bool {
        self.stats.is_some()
    }

    /// Completion as a percentage, when a total is known
    pub fn percent(&self) -> Option<u8> {
        match self.total {
            Some(0) => Some(100),
            Some(total) => Some(((self.processed.min(total) * 100) / total) as u8),
            None => None,
        }
    }
}

/// Longest line kept while waiting for its newline
const MAX_LINE_BYTES: usize = 64 * 1024;

/// Splits a byte stream into complete lines and decodes each as an event
#[derive(Debug, Default)]
pub struct LineDecoder {
    pending: Vec<u8>,
    /// Bytes of `pending` already known to hold no newline
    scanned: usize,
    /// Dropping the rest of an oversized line
    discarding: bool,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk; returns the events completed by it
    pub fn push(&mut self, chunk: &[u8]) -> Vec<ProgressEvent> {
        self.pending.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(offset) = self.pending[self.scanned..].iter().position(|b| *b == b'\n') {
            let end = self.scanned + offset;
            let line: Vec<u8> = self.pending.drain(..=end).collect();
            self.scanned = 0;
            if std::mem::take(&mut self.discarding) {
                continue;
            }
            if let Some(event) = decode_line(&line[..end]) {
                events.push(event);
            }
        }
        self.scanned = self.pending.len();

        if self.pending.len() > MAX_LINE_BYTES {
            warn!(
                "Dropping progress line longer than {} bytes",
                MAX_LINE_BYTES
            );
            self.pending.clear();
            self.scanned = 0;
            self.discarding = true;
        }
        events
    }

    /// Decode a trailing line left without a newline at end of stream
    pub fn finish(&mut self) -> Option<ProgressEvent> {
        let rest = std::mem::take(&mut self.pending);
        self.scanned = 0;
        if std::mem::take(&mut self.discarding) {
            return None;
        }
        decode_line(&rest)
    }

    /// Bytes buffered while waiting for the rest of a line
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

/// Decode one line; blank and malformed lines yield `None`
fn decode_line(line: &[u8]) -> Option<ProgressEvent> {
    let text = match std::str::from_utf8(line) {
        Ok(text) => text.trim(),
        Err(e) => {
            warn!("Skipping non-UTF-8 progress line: {}", e);
            return None;
        }
    };
    if text.is_empty() {
        return None;
    }

    match serde_json::from_str::<ProgressEvent>(text) {
        Ok(event) => Some(event),
        Err(e) => {
            warn!("Skipping malformed progress line {:?}: {}", text, e);
            None
        }
    }
}

/// Sequential reader that folds a progress stream into [`ProgressState`]
#[derive(Debug, Default)]
pub struct ProgressConsumer {
    decoder: LineDecoder,
    state: ProgressState,
}

impl ProgressConsumer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &ProgressState {
        &self.state
    }

    fn apply_all(
        &mut self,
        events: Vec<ProgressEvent>,
        observer: &mut impl FnMut(&ProgressState),
    ) -> Option<CategorizeStats> {
        for event in events {
            debug!("Progress event: {:?}", event);
            self.state.apply(&event);
            observer(&self.state);
            if let ProgressEvent::Complete { stats } = event {
                return Some(stats);
            }
        }
        None
    }

    /// Read until `complete`. The observer sees the state after every event.
    ///
    /// A chunk error aborts the job; a stream ending before `complete` is also
    /// an error.
    pub async fn consume<S>(
        &mut self,
        mut stream: S,
        mut observer: impl FnMut(&ProgressState),
    ) -> Result<CategorizeStats>
    where
        S: Stream<Item = Result<Vec<u8>>> + Unpin,
    {
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| Error::Stream(e.to_string()))?;
            let events = self.decoder.push(&chunk);
            if let Some(stats) = self.apply_all(events, &mut observer) {
                return Ok(stats);
            }
        }

        let trailing: Vec<ProgressEvent> = self.decoder.finish().into_iter().collect();
        if let Some(stats) = self.apply_all(trailing, &mut observer) {
            return Ok(stats);
        }

        Err(Error::Stream(
            "progress stream ended before completion".to_string(),
        ))
    }
}

/// User-facing summary of a finished job
pub fn summarize(stats: &CategorizeStats, dry_run: bool) -> Notification {
    let prefix = if dry_run { "Dry run: " } else { "" };
    if stats.categorized == 0 {
        return Notification::Info(format!("{}No transactions could be categorized", prefix));
    }

    let mut message = format!("{}Categorized {} transactions", prefix, stats.categorized);
    if stats.rules_created > 0 {
        message.push_str(&format!(". Created {} new rules", stats.rules_created));
    }
    Notification::Success(message)
}

/// Result of a completed batch job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutcome {
    pub stats: CategorizeStats,
    pub notification: Notification,
    /// Displayed data changed server-side and should be reloaded
    pub refresh_required: bool,
}

/// Runs one batch categorization job and tracks its visible progress
pub struct BatchCategorizer<'a> {
    service: &'a dyn TransactionService,
    clear_delay: Duration,
    progress: Option<ProgressState>,
}

impl<'a> BatchCategorizer<'a> {
    pub fn new(service: &'a dyn TransactionService, clear_delay: Duration) -> Self {
        Self {
            service,
            clear_delay,
            progress: None,
        }
    }

    /// Progress of the running job; `None` when idle
    pub fn progress(&self) -> Option<&ProgressState> {
        self.progress.as_ref()
    }

    /// Run a job to completion
    ///
    /// Returns as soon as `complete` arrives so the caller can show the
    /// notification while the final state is still visible; call
    /// [`finish`](Self::finish) afterwards to clear it. Failures clear progress
    /// immediately. Categorizations already committed server-side are not
    /// rolled back.
    pub async fn run(
        &mut self,
        limit: u32,
        dry_run: bool,
        mut observer: impl FnMut(&ProgressState),
    ) -> Result<BatchOutcome> {
        self.progress = Some(ProgressState::new());
        info!("Starting batch categorization (limit {}, dry_run {})", limit, dry_run);

        let stream = match self.service.categorize_batch(limit, dry_run).await {
            Ok(stream) => stream,
            Err(e) => {
                self.progress = None;
                return Err(e);
            }
        };

        let mut consumer = ProgressConsumer::new();
        let progress = &mut self.progress;
        let result = consumer
            .consume(stream, |state| {
                *progress = Some(state.clone());
                observer(state);
            })
            .await;

        let stats = match result {
            Ok(stats) => stats,
            Err(e) => {
                warn!("Batch categorization aborted: {}", e);
                self.progress = None;
                return Err(e);
            }
        };

        let notification = summarize(&stats, dry_run);
        info!("{}", notification);

        Ok(BatchOutcome {
            stats,
            notification,
            refresh_required: !dry_run,
        })
    }

    /// Keep the final state visible for the clear delay, then clear it
    ///
    /// Refresh the displayed data after this returns.
    pub async fn finish(&mut self) {
        if self.progress.is_some() {
            tokio::time::sleep(self.clear_delay).await;
            self.progress = None;
        }
    }
}
