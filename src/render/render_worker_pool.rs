use crate::{
    render::{
        outcome::{OutcomeSink, RunStats, RunSummary},
        render_worker::{RenderWorker, RetryPolicy, WorkerPolicy},
        renderer::{RenderError, TileRenderer},
    },
    tiles::{RegionJob, TileAddress, WebMercator},
};
use std::{
    io,
    path::PathBuf,
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicBool, Ordering},
        mpsc as std_mpsc,
    },
    thread::{self, JoinHandle},
};
use tokio::sync::mpsc;

enum QueueItem {
    Tile(TileAddress),
    Stop,
}

#[derive(Clone, Debug)]
pub(crate) struct PoolConfig {
    pub(crate) worker_count: usize,
    pub(crate) queue_capacity: usize,
    pub(crate) output_root: PathBuf,
    pub(crate) delete_empty: bool,
    pub(crate) retry: RetryPolicy,
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum PoolError {
    #[error("render worker {worker} failed to start: {reason}")]
    RendererInit { worker: usize, reason: String },

    #[error("{0} render worker(s) panicked")]
    WorkerPanicked(usize),

    #[error("error spawning render worker: {0}")]
    Spawn(#[source] io::Error),
}

/// Fixed set of render threads draining one bounded queue of tiles.
///
/// Each thread builds its own renderer through the factory, so renderers
/// need not be `Send` or `Sync`.
pub(crate) struct RenderWorkerPool<F> {
    config: PoolConfig,
    projection: Arc<WebMercator>,
    factory: Arc<F>,
    sink: Arc<dyn OutcomeSink>,
    cancel: Arc<AtomicBool>,
}

impl<F, R> RenderWorkerPool<F>
where
    F: Fn(usize) -> Result<R, RenderError> + Send + Sync + 'static,
    R: TileRenderer + 'static,
{
    pub(crate) fn new(
        config: PoolConfig,
        projection: Arc<WebMercator>,
        factory: F,
        sink: Arc<dyn OutcomeSink>,
    ) -> Self {
        Self {
            config,
            projection,
            factory: Arc::new(factory),
            sink,
            cancel: Arc::default(),
        }
    }

    /// Once set, no further tiles are enqueued and workers stop after their
    /// current tile.
    pub(crate) fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    /// Renders every tile of `jobs` and returns after all workers have exited.
    ///
    /// Per-tile failures are reported to the sink and counted; only failures
    /// of the pool itself are returned as errors.
    pub(crate) fn run(&self, jobs: &[RegionJob]) -> Result<RunSummary, PoolError> {
        let worker_count = self.config.worker_count.max(1);

        let (tx, rx) = mpsc::channel(self.config.queue_capacity.max(1));
        let rx = Arc::new(Mutex::new(rx));
        let (ready_tx, ready_rx) = std_mpsc::channel();

        let stats = Arc::new(RunStats::default());

        let policy = Arc::new(WorkerPolicy {
            output_root: self.config.output_root.clone(),
            delete_empty: self.config.delete_empty,
            retry: self.config.retry,
        });

        let mut workers = Vec::with_capacity(worker_count);

        for worker_id in 0..worker_count {
            let rx = rx.clone();
            let ready_tx = ready_tx.clone();
            let factory = self.factory.clone();
            let projection = self.projection.clone();
            let policy = policy.clone();
            let sink = self.sink.clone();
            let stats = stats.clone();
            let cancel = self.cancel.clone();

            let handle = thread::Builder::new()
                .name(format!("render-worker-{worker_id}"))
                .spawn(move || {
                    let renderer = match factory(worker_id) {
                        Ok(renderer) => renderer,
                        Err(err) => {
                            let _ = ready_tx.send((worker_id, Err(err.to_string())));
                            return;
                        }
                    };

                    let _ = ready_tx.send((worker_id, Ok(())));
                    drop(ready_tx);

                    let mut worker = RenderWorker::new(renderer, projection, policy);

                    loop {
                        let item = {
                            let mut guard = rx.lock().unwrap_or_else(PoisonError::into_inner);
                            guard.blocking_recv()
                        };

                        let Some(QueueItem::Tile(address)) = item else {
                            break;
                        };

                        let outcome = worker.process(address);

                        stats.count(&outcome.outcome);
                        sink.record(&outcome);

                        if cancel.load(Ordering::Relaxed) {
                            break;
                        }
                    }
                });

            match handle {
                Ok(handle) => workers.push(handle),
                Err(err) => {
                    drop(tx);
                    join_all(workers);
                    return Err(PoolError::Spawn(err));
                }
            }
        }

        drop(rx);
        drop(ready_tx);

        if let Err(err) = await_ready(&ready_rx, worker_count) {
            drop(tx);
            join_all(workers);
            return Err(err);
        }

        let mut cancelled = false;

        'jobs: for job in jobs {
            let tiles = job.tiles(&self.projection);

            tracing::info!(
                region = %job.region,
                bbox = %job.bbox,
                min_zoom = job.zooms.min(),
                max_zoom = job.zooms.max(),
                tiles = tiles.total(),
                "rendering region"
            );

            for address in tiles {
                if self.cancel.load(Ordering::Relaxed) {
                    cancelled = true;
                    break 'jobs;
                }

                // fails only once every worker has exited
                if tx.blocking_send(QueueItem::Tile(address)).is_err() {
                    break 'jobs;
                }

                stats.enqueued();
            }
        }

        for _ in 0..worker_count {
            if tx.blocking_send(QueueItem::Stop).is_err() {
                break;
            }
        }

        drop(tx);

        let panicked = join_all(workers);

        if panicked > 0 {
            return Err(PoolError::WorkerPanicked(panicked));
        }

        Ok(stats.summary(cancelled || self.cancel.load(Ordering::Relaxed)))
    }
}

/// Waits until every worker has built its renderer or one has failed to.
fn await_ready(
    ready_rx: &std_mpsc::Receiver<(usize, Result<(), String>)>,
    worker_count: usize,
) -> Result<(), PoolError> {
    let mut ready = vec![false; worker_count];

    for _ in 0..worker_count {
        match ready_rx.recv() {
            Ok((worker, Ok(()))) => ready[worker] = true,
            Ok((worker, Err(reason))) => return Err(PoolError::RendererInit { worker, reason }),
            Err(_) => {
                // a worker panicked inside the factory
                let worker = ready.iter().position(|ready| !ready).unwrap_or_default();

                return Err(PoolError::RendererInit {
                    worker,
                    reason: "worker exited during start-up".to_string(),
                });
            }
        }
    }

    Ok(())
}

/// Returns the number of workers that panicked.
fn join_all(workers: Vec<JoinHandle<()>>) -> usize {
    workers
        .into_iter()
        .map(JoinHandle::join)
        .filter(Result::is_err)
        .count()
}
