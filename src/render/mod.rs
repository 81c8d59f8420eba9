pub(crate) use outcome::TracingSink;
pub(crate) use render::CairoRenderer;
pub(crate) use render_worker::RetryPolicy;
pub(crate) use render_worker_pool::{PoolConfig, PoolError, RenderWorkerPool};
pub(crate) use renderer::{RenderError, TileRenderer};
pub(crate) use style::{Style, StyleError};

mod colors;
mod draw;
mod outcome;
mod projectable;
mod render;
mod render_worker;
mod render_worker_pool;
mod renderer;
mod size;
mod style;
#[cfg(test)]
mod test_support;
