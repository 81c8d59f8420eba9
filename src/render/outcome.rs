use crate::tiles::TileAddress;
use std::{
    fmt::Display,
    sync::atomic::{AtomicU64, Ordering},
};

#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum Outcome {
    Rendered,
    AlreadyExists,
    Empty,
    Failed(String),
}

/// Result of processing one tile.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct RenderOutcome {
    pub(crate) address: TileAddress,
    pub(crate) outcome: Outcome,
}

/// Receives every outcome of a run. Called concurrently from all workers.
pub(crate) trait OutcomeSink: Send + Sync {
    fn record(&self, outcome: &RenderOutcome);
}

/// Logs outcomes through `tracing`.
pub(crate) struct TracingSink;

impl OutcomeSink for TracingSink {
    fn record(&self, RenderOutcome { address, outcome }: &RenderOutcome) {
        match outcome {
            Outcome::Rendered => tracing::info!(tile = %address, "rendered"),
            Outcome::AlreadyExists => tracing::debug!(tile = %address, "already exists"),
            Outcome::Empty => tracing::debug!(tile = %address, "empty, removed"),
            Outcome::Failed(reason) => tracing::warn!(tile = %address, %reason, "failed"),
        }
    }
}

#[derive(Default)]
pub(crate) struct RunStats {
    enqueued: AtomicU64,
    rendered: AtomicU64,
    already_exists: AtomicU64,
    empty: AtomicU64,
    failed: AtomicU64,
}

impl RunStats {
    pub(crate) fn enqueued(&self) {
        self.enqueued.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn count(&self, outcome: &Outcome) {
        let counter = match outcome {
            Outcome::Rendered => &self.rendered,
            Outcome::AlreadyExists => &self.already_exists,
            Outcome::Empty => &self.empty,
            Outcome::Failed(_) => &self.failed,
        };

        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn summary(&self, cancelled: bool) -> RunSummary {
        RunSummary {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            rendered: self.rendered.load(Ordering::Relaxed),
            already_exists: self.already_exists.load(Ordering::Relaxed),
            empty: self.empty.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            cancelled,
        }
    }
}

/// Per-kind outcome counts of one run.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub(crate) struct RunSummary {
    pub(crate) enqueued: u64,
    pub(crate) rendered: u64,
    pub(crate) already_exists: u64,
    pub(crate) empty: u64,
    pub(crate) failed: u64,
    pub(crate) cancelled: bool,
}

impl RunSummary {
    /// Tiles that reached a worker. Lower than `enqueued` only after
    /// cancellation.
    pub(crate) fn processed(&self) -> u64 {
        self.rendered + self.already_exists + self.empty + self.failed
    }
}

impl Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} tiles: {} rendered, {} already existed, {} empty, {} failed",
            self.enqueued, self.rendered, self.already_exists, self.empty, self.failed
        )?;

        if self.cancelled {
            write!(f, " (cancelled after {} processed)", self.processed())?;
        }

        Ok(())
    }
}
