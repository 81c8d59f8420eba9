mod app;
mod render;
mod tiles;

use std::process::ExitCode;

fn main() -> ExitCode {
    app::start()
}
