use crate::{
    app::{
        cli::{Cli, Command, ImageArgs, TilesArgs},
        jobs::{self, JobError, JobSpec},
        logging,
    },
    render::{
        CairoRenderer, PoolConfig, PoolError, RenderError, RenderWorkerPool, RetryPolicy, Style,
        StyleError, TileRenderer, TracingSink,
    },
    tiles::{DEFAULT_TILE_SIZE, GeoBox, WebMercator},
};
use dotenvy::dotenv;
use std::{
    fs, io,
    path::PathBuf,
    process::ExitCode,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::{Duration, Instant},
};
use tokio::signal;
#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal as unix_signal};

#[derive(Debug, thiserror::Error)]
enum StartError {
    #[error(transparent)]
    Jobs(#[from] JobError),

    #[error("error loading style: {0}")]
    Style(#[from] StyleError),

    #[error("error creating output root {path}: {source}")]
    OutputRoot {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("error building signal runtime: {0}")]
    Runtime(#[source] io::Error),

    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error(transparent)]
    Render(#[from] RenderError),
}

pub(crate) fn start() -> ExitCode {
    dotenv().ok();

    let cli = Cli::parse_checked();

    logging::init();

    tracy_client::Client::start();

    let result = match cli.command {
        Command::Tiles(args) => render_tiles(args),
        Command::Image(args) => render_image(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn render_tiles(args: TilesArgs) -> Result<(), StartError> {
    let mut specs = match &args.jobs {
        Some(path) => jobs::read_job_file(path)?,
        None => Vec::new(),
    };

    if let Some(bbox) = args.bbox {
        specs.push(JobSpec {
            name: args.name.clone(),
            corners: bbox.0,
            zooms: (args.zooms.0, args.zooms.1),
            tms: args.tms,
        });
    }

    let projection = Arc::new(WebMercator::new(args.max_zoom, args.tile_size));

    let jobs = jobs::validate_all(&specs, projection.max_zoom())?;

    fs::create_dir_all(&args.tile_dir).map_err(|source| StartError::OutputRoot {
        path: args.tile_dir.clone(),
        source,
    })?;

    let style = Arc::new(Style::load(&args.style)?);

    let cancel = Arc::new(AtomicBool::new(false));

    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .thread_name("signal")
        .enable_all()
        .build()
        .map_err(StartError::Runtime)?;

    rt.spawn({
        let cancel = cancel.clone();

        async move {
            shutdown_signal().await;

            tracing::warn!("Shutdown requested, finishing tiles in progress");

            cancel.store(true, Ordering::Relaxed);
        }
    });

    let tile_size = args.tile_size;

    let pool = RenderWorkerPool::new(
        PoolConfig {
            worker_count: args.worker_count,
            queue_capacity: args.queue_capacity,
            output_root: args.tile_dir.clone(),
            delete_empty: args.delete_empty,
            retry: RetryPolicy {
                retries: args.retry_attempts,
                delay: Duration::from_millis(args.retry_delay_ms),
            },
        },
        projection,
        move |_worker: usize| CairoRenderer::new(style.clone(), tile_size),
        Arc::new(TracingSink),
    )
    .with_cancel_flag(cancel);

    tracing::info!(
        jobs = jobs.len(),
        workers = args.worker_count,
        output = %args.tile_dir.display(),
        "Starting render"
    );

    let started = Instant::now();

    let summary = pool.run(&jobs)?;

    tracing::info!(elapsed = ?started.elapsed(), "Finished: {summary}");

    rt.shutdown_background();

    Ok(())
}

fn render_image(args: ImageArgs) -> Result<(), StartError> {
    let style = Arc::new(Style::load(&args.style)?);

    let mut renderer = CairoRenderer::new(style, DEFAULT_TILE_SIZE)?;

    let [lon0, lat0, lon1, lat1] = args.bbox.0;

    let bbox = GeoBox::from_corners(lon0, lat0, lon1, lat1);

    renderer.render_tile_to_file(bbox, args.width, args.height, &args.output)?;

    tracing::info!(%bbox, output = %args.output.display(), "Rendered image");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!("Error installing Ctrl+C handler: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match unix_signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!("Error installing SIGTERM handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
