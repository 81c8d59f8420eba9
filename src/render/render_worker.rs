use crate::{
    render::{
        outcome::{Outcome, RenderOutcome},
        renderer::{RenderError, TileRenderer},
    },
    tiles::{GeoBox, TileAddress, WebMercator},
};
use std::{
    any::Any,
    fs,
    panic::{self, AssertUnwindSafe},
    path::{Path, PathBuf},
    sync::Arc,
    thread,
    time::Duration,
};

/// Extra attempts for transient I/O failures.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct RetryPolicy {
    pub(crate) retries: u32,
    pub(crate) delay: Duration,
}

impl RetryPolicy {
    pub(crate) const NONE: Self = Self {
        retries: 0,
        delay: Duration::ZERO,
    };
}

#[derive(Clone, Debug)]
pub(crate) struct WorkerPolicy {
    pub(crate) output_root: PathBuf,
    pub(crate) delete_empty: bool,
    pub(crate) retry: RetryPolicy,
}

/// Turns tile addresses into files using a renderer it owns exclusively.
pub(crate) struct RenderWorker<R> {
    renderer: R,
    projection: Arc<WebMercator>,
    policy: Arc<WorkerPolicy>,
}

impl<R: TileRenderer> RenderWorker<R> {
    pub(crate) fn new(
        renderer: R,
        projection: Arc<WebMercator>,
        policy: Arc<WorkerPolicy>,
    ) -> Self {
        Self {
            renderer,
            projection,
            policy,
        }
    }

    /// Never fails; errors are reported as [`Outcome::Failed`].
    pub(crate) fn process(&mut self, address: TileAddress) -> RenderOutcome {
        let outcome = self
            .try_process(&address)
            .unwrap_or_else(|err| Outcome::Failed(err.to_string()));

        RenderOutcome { address, outcome }
    }

    fn try_process(&mut self, address: &TileAddress) -> Result<Outcome, RenderError> {
        let path = address.path(&self.policy.output_root);

        if path.try_exists().map_err(|err| RenderError::io(&path, err))? {
            return Ok(Outcome::AlreadyExists);
        }

        if let Some(parent) = path.parent() {
            // tolerates concurrent creation of the same directory
            fs::create_dir_all(parent).map_err(|err| RenderError::io(parent, err))?;
        }

        let bbox = self.projection.tile_bounds(address.xyz());

        if let Err(err) = self.render_with_retry(bbox, &path) {
            // no other worker owns this path, so anything left there is ours
            let _ = fs::remove_file(&path);

            return Err(err);
        }

        if !self.policy.delete_empty {
            return Ok(Outcome::Rendered);
        }

        let Some(empty_size) = self.renderer.empty_tile_size() else {
            return Ok(Outcome::Rendered);
        };

        let size = fs::metadata(&path)
            .map_err(|err| RenderError::io(&path, err))?
            .len();

        if size != empty_size {
            return Ok(Outcome::Rendered);
        }

        fs::remove_file(&path).map_err(|err| RenderError::io(&path, err))?;

        Ok(Outcome::Empty)
    }

    fn render_with_retry(&mut self, bbox: GeoBox, path: &Path) -> Result<(), RenderError> {
        let RetryPolicy { retries, delay } = self.policy.retry;

        let mut attempt = 0;

        loop {
            match self.render_once(bbox, path) {
                Err(err) if err.is_transient() && attempt < retries => {
                    attempt += 1;

                    tracing::debug!(
                        path = %path.display(),
                        attempt,
                        error = %err,
                        "retrying render"
                    );

                    thread::sleep(delay);
                }
                result => return result,
            }
        }
    }

    fn render_once(&mut self, bbox: GeoBox, path: &Path) -> Result<(), RenderError> {
        let size = self.projection.tile_size();

        panic::catch_unwind(AssertUnwindSafe(|| {
            self.renderer.render_tile_to_file(bbox, size, size, path)
        }))
        .unwrap_or_else(|payload| Err(RenderError::Panicked(panic_message(payload.as_ref()))))
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
