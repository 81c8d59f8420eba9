use crate::{
    render::{
        outcome::{OutcomeSink, RenderOutcome},
        renderer::{RenderError, TileRenderer},
    },
    tiles::GeoBox,
};
use std::{
    fs, io,
    path::Path,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

pub(crate) const CONTENT: &[u8] = b"\x89PNG tile with something on it";
pub(crate) const EMPTY: &[u8] = b"\x89PNG blank";

#[derive(Clone, Copy, Debug)]
pub(crate) enum FakeMode {
    Content,
    Empty,
    Fail,
    Panic,
    /// Fails with an interrupted write this many times, then succeeds.
    TransientThenOk(u32),
}

/// Writes fixed bytes instead of rasterizing anything.
pub(crate) struct FakeRenderer {
    mode: FakeMode,
    plan: Option<fn(&Path) -> FakeMode>,
    calls: Arc<AtomicUsize>,
    transient_failures: u32,
}

impl FakeRenderer {
    pub(crate) fn new(mode: FakeMode) -> Self {
        Self {
            mode,
            plan: None,
            calls: Arc::default(),
            transient_failures: 0,
        }
    }

    /// Chooses the behavior per destination path.
    pub(crate) fn planned(plan: fn(&Path) -> FakeMode) -> Self {
        Self {
            plan: Some(plan),
            ..Self::new(FakeMode::Content)
        }
    }

    pub(crate) fn with_calls(mut self, calls: Arc<AtomicUsize>) -> Self {
        self.calls = calls;
        self
    }

    fn mode_for(&self, path: &Path) -> FakeMode {
        self.plan.map_or(self.mode, |plan| plan(path))
    }
}

impl TileRenderer for FakeRenderer {
    fn render_tile_to_file(
        &mut self,
        _bbox: GeoBox,
        _width: u32,
        _height: u32,
        path: &Path,
    ) -> Result<(), RenderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let data = match self.mode_for(path) {
            FakeMode::Content => CONTENT,
            FakeMode::Empty => EMPTY,
            FakeMode::Fail => {
                return Err(RenderError::io(
                    path,
                    io::Error::new(io::ErrorKind::InvalidData, "bad geometry"),
                ));
            }
            FakeMode::Panic => panic!("renderer blew up"),
            FakeMode::TransientThenOk(failures) => {
                if self.transient_failures < failures {
                    self.transient_failures += 1;

                    return Err(RenderError::io(
                        path,
                        io::Error::from(io::ErrorKind::Interrupted),
                    ));
                }

                CONTENT
            }
        };

        fs::write(path, data).map_err(|err| RenderError::io(path, err))
    }

    fn empty_tile_size(&self) -> Option<u64> {
        Some(EMPTY.len() as u64)
    }
}

/// Keeps every outcome for later inspection.
#[derive(Default)]
pub(crate) struct CollectingSink(Mutex<Vec<RenderOutcome>>);

impl CollectingSink {
    pub(crate) fn take(&self) -> Vec<RenderOutcome> {
        std::mem::take(&mut *self.0.lock().unwrap())
    }
}

impl OutcomeSink for CollectingSink {
    fn record(&self, outcome: &RenderOutcome) {
        self.0.lock().unwrap().push(outcome.clone());
    }
}
