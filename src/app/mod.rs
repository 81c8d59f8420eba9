pub(super) use start::start;

mod cli;
mod jobs;
mod logging;
mod start;
