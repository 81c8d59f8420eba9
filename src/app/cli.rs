use crate::tiles::{DEFAULT_TILE_SIZE, ZOOM_LIMIT, check_corners};
use clap::{Args, Parser, Subcommand, error::ErrorKind};
use std::{num::NonZeroUsize, path::PathBuf, str::FromStr, thread};

/// `west,south,east,north` in degrees. Corners may come in any order.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BboxArg(pub [f64; 4]);

impl FromStr for BboxArg {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let parts = value
            .split(',')
            .map(|part| {
                part.trim()
                    .parse::<f64>()
                    .map_err(|err| format!("invalid coordinate '{}': {err}", part.trim()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        <[f64; 4]>::try_from(parts)
            .map(Self)
            .map_err(|parts| format!("expected 4 comma separated values, got {}", parts.len()))
    }
}

/// Inclusive `min,max` zoom range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ZoomsArg(pub u8, pub u8);

impl FromStr for ZoomsArg {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let Some((min, max)) = value.split_once(',') else {
            return Err(format!("expected min,max: {value}"));
        };

        let parse = |zoom: &str| {
            zoom.trim()
                .parse::<u8>()
                .map_err(|err| format!("invalid zoom '{}': {err}", zoom.trim()))
        };

        Ok(Self(parse(min)?, parse(max)?))
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Render a tile pyramid for a list of region jobs.
    Tiles(TilesArgs),

    /// Render one bounding box into a single PNG.
    Image(ImageArgs),
}

#[derive(Args, Debug)]
pub struct TilesArgs {
    /// Style YAML.
    #[arg(long, env = "TILEGEN_STYLE")]
    pub style: PathBuf,

    /// Output root; tiles are written to <region>/<zoom>/<x>/<y>.png below it.
    #[arg(long, env = "TILEGEN_TILE_DIR")]
    pub tile_dir: PathBuf,

    /// Job file (.yaml, .yml, .json or a legacy .py zone script).
    #[arg(long, env = "TILEGEN_JOBS")]
    pub jobs: Option<PathBuf>,

    /// Ad-hoc job bounding box (w,s,e,n).
    #[arg(long, env = "TILEGEN_BBOX", allow_hyphen_values = true)]
    pub bbox: Option<BboxArg>,

    /// Zoom range of the ad-hoc job (min,max).
    #[arg(long, env = "TILEGEN_ZOOMS", default_value = "1,18")]
    pub zooms: ZoomsArg,

    /// Region name of the ad-hoc job.
    #[arg(long, env = "TILEGEN_NAME", default_value = "unknown")]
    pub name: String,

    /// Number the rows of the ad-hoc job bottom-up.
    #[arg(long, env = "TILEGEN_TMS")]
    pub tms: bool,

    /// Number of rendering worker threads.
    #[arg(long, env = "TILEGEN_WORKER_COUNT", default_value_t = default_worker_count())]
    pub worker_count: usize,

    /// Capacity of the tile queue between enumeration and workers.
    #[arg(long, env = "TILEGEN_QUEUE_CAPACITY", default_value_t = 32)]
    pub queue_capacity: usize,

    /// Highest zoom the projection tables are built for.
    #[arg(long, env = "TILEGEN_MAX_ZOOM", default_value_t = 18)]
    pub max_zoom: u8,

    /// Tile edge length in pixels.
    #[arg(long, env = "TILEGEN_TILE_SIZE", default_value_t = DEFAULT_TILE_SIZE)]
    pub tile_size: u32,

    /// Remove tiles with nothing drawn on them.
    #[arg(
        long,
        env = "TILEGEN_DELETE_EMPTY",
        default_value_t = true,
        action = clap::ArgAction::Set
    )]
    pub delete_empty: bool,

    /// Extra attempts after a transient write failure.
    #[arg(long, env = "TILEGEN_RETRY_ATTEMPTS", default_value_t = 2)]
    pub retry_attempts: u32,

    /// Pause before each retry.
    #[arg(long, env = "TILEGEN_RETRY_DELAY_MS", default_value_t = 50)]
    pub retry_delay_ms: u64,
}

#[derive(Args, Debug)]
pub struct ImageArgs {
    /// Style YAML.
    #[arg(long, env = "TILEGEN_STYLE")]
    pub style: PathBuf,

    /// Bounding box to render (w,s,e,n).
    #[arg(long, allow_hyphen_values = true)]
    pub bbox: BboxArg,

    #[arg(long, default_value_t = DEFAULT_TILE_SIZE)]
    pub width: u32,

    #[arg(long, default_value_t = DEFAULT_TILE_SIZE)]
    pub height: u32,

    /// Destination PNG.
    #[arg(long)]
    pub output: PathBuf,
}

fn default_worker_count() -> usize {
    thread::available_parallelism().map_or(1, NonZeroUsize::get)
}

impl Cli {
    pub fn parse_checked() -> Self {
        let cli = Self::parse();

        if let Err(err) = cli.validate() {
            clap::Error::raw(ErrorKind::ValueValidation, err).exit();
        }

        cli
    }

    fn validate(&self) -> Result<(), String> {
        match &self.command {
            Command::Tiles(args) => args.validate(),
            Command::Image(args) => args.validate(),
        }
    }
}

impl TilesArgs {
    fn validate(&self) -> Result<(), String> {
        if self.jobs.is_none() && self.bbox.is_none() {
            return Err("either --jobs or --bbox is required".into());
        }

        if self.worker_count == 0 {
            return Err("--worker-count must be at least 1".into());
        }

        if self.queue_capacity == 0 {
            return Err("--queue-capacity must be at least 1".into());
        }

        if self.max_zoom > ZOOM_LIMIT {
            return Err(format!("--max-zoom must not exceed {ZOOM_LIMIT}"));
        }

        if self.tile_size == 0 {
            return Err("--tile-size must be positive".into());
        }

        Ok(())
    }
}

impl ImageArgs {
    fn validate(&self) -> Result<(), String> {
        if self.width == 0 || self.height == 0 {
            return Err("--width and --height must be positive".into());
        }

        check_corners(self.bbox.0).map_err(|err| format!("--bbox: {err}"))?;

        let [lon0, lat0, lon1, lat1] = self.bbox.0;

        if lon0 == lon1 || lat0 == lat1 {
            return Err("--bbox must span some longitude and latitude".into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiles(args: &[&str]) -> Result<TilesArgs, String> {
        let argv = ["tilegen", "tiles", "--style", "s.yaml", "--tile-dir", "out"]
            .into_iter()
            .chain(args.iter().copied());

        let cli = Cli::try_parse_from(argv).map_err(|err| err.to_string())?;

        let Command::Tiles(args) = cli.command else {
            unreachable!();
        };

        args.validate()?;

        Ok(args)
    }

    fn image(args: &[&str]) -> Result<ImageArgs, String> {
        let argv = ["tilegen", "image", "--style", "s.yaml", "--output", "out.png"]
            .into_iter()
            .chain(args.iter().copied());

        let cli = Cli::try_parse_from(argv).map_err(|err| err.to_string())?;

        let Command::Image(args) = cli.command else {
            unreachable!();
        };

        args.validate()?;

        Ok(args)
    }

    #[test]
    fn parses_bbox_and_zooms() {
        assert_eq!(
            "-97.37286, 25.84012,-97.42264,25.84038".parse::<BboxArg>(),
            Ok(BboxArg([-97.37286, 25.84012, -97.42264, 25.84038]))
        );
        assert_eq!("0,11".parse::<ZoomsArg>(), Ok(ZoomsArg(0, 11)));

        assert!("1,2,3".parse::<BboxArg>().is_err());
        assert!("1,2,3,x".parse::<BboxArg>().is_err());
        assert!("11".parse::<ZoomsArg>().is_err());
        assert!("0,300".parse::<ZoomsArg>().is_err());
    }

    #[test]
    fn ad_hoc_job_defaults() {
        let args = tiles(&["--bbox", "-1,-1,1,1"]).unwrap();

        assert_eq!(args.bbox, Some(BboxArg([-1.0, -1.0, 1.0, 1.0])));
        assert_eq!(args.zooms, ZoomsArg(1, 18));
        assert_eq!(args.name, "unknown");
        assert!(!args.tms);
        assert!(args.delete_empty);
        assert_eq!(args.queue_capacity, 32);
        assert_eq!(args.max_zoom, 18);
        assert!(args.worker_count >= 1);
    }

    #[test]
    fn delete_empty_takes_a_value() {
        let args = tiles(&["--jobs", "jobs.yaml", "--delete-empty", "false"]).unwrap();

        assert!(!args.delete_empty);
    }

    #[test]
    fn requires_some_job_source() {
        assert!(tiles(&[]).unwrap_err().contains("--jobs or --bbox"));
    }

    #[test]
    fn rejects_out_of_range_settings() {
        assert!(tiles(&["--bbox", "0,0,1,1", "--max-zoom", "31"]).is_err());
        assert!(tiles(&["--bbox", "0,0,1,1", "--worker-count", "0"]).is_err());
        assert!(tiles(&["--bbox", "0,0,1,1", "--queue-capacity", "0"]).is_err());
    }

    #[test]
    fn image_bbox_must_have_area() {
        assert!(image(&["--bbox", "-1,-1,1,1"]).is_ok());

        assert!(image(&["--bbox", "0,-1,0,1"]).unwrap_err().contains("latitude"));
        assert!(image(&["--bbox", "-1,5,1,5"]).unwrap_err().contains("latitude"));
    }

    #[test]
    fn image_bbox_must_be_in_range() {
        assert!(image(&["--bbox", "-1,-1,1,95"]).unwrap_err().contains("latitude 95"));
        assert!(image(&["--bbox", "-181,-1,1,1"]).unwrap_err().contains("longitude -181"));
    }
}
