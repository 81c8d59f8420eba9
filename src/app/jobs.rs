use crate::tiles::{InvalidJob, RegionJob, TileScheme};
use regex::Regex;
use serde::Deserialize;
use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::LazyLock,
};

#[derive(Debug, thiserror::Error)]
pub(crate) enum JobError {
    #[error("read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("parse YAML {path}: {message}")]
    Yaml { path: PathBuf, message: String },

    #[error("parse JSON {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("unsupported job file {0}; expected .yaml, .yml, .json or .py")]
    UnsupportedFormat(PathBuf),

    #[error("invalid job for region '{region}': {source}")]
    Invalid {
        region: String,
        #[source]
        source: InvalidJob,
    },

    #[error("no jobs to render")]
    Empty,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct JobFile {
    regions: Vec<RegionDef>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RegionDef {
    name: String,
    zooms: (u8, u8),
    #[serde(default)]
    tms: bool,
    boxes: Vec<[f64; 4]>,
}

/// One unvalidated job as read from any input format.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct JobSpec {
    pub(crate) name: String,
    pub(crate) corners: [f64; 4],
    pub(crate) zooms: (u8, u8),
    pub(crate) tms: bool,
}

impl JobSpec {
    pub(crate) fn validate(&self, zoom_limit: u8) -> Result<RegionJob, JobError> {
        RegionJob::new(
            &self.name,
            self.corners,
            self.zooms,
            TileScheme::from_tms_flag(self.tms),
            zoom_limit,
        )
        .map_err(|source| JobError::Invalid {
            region: self.name.clone(),
            source,
        })
    }
}

/// Reads a job file, choosing the format by extension.
pub(crate) fn read_job_file(path: &Path) -> Result<Vec<JobSpec>, JobError> {
    let text = fs::read_to_string(path).map_err(|source| JobError::Io {
        path: path.to_owned(),
        source,
    })?;

    match path.extension().and_then(|ext| ext.to_str()) {
        Some("yaml" | "yml") => {
            let file: JobFile = serde_saphyr::from_str(&text).map_err(|err| JobError::Yaml {
                path: path.to_owned(),
                message: err.to_string(),
            })?;

            Ok(flatten(file))
        }
        Some("json") => {
            let file: JobFile = serde_json::from_str(&text).map_err(|source| JobError::Json {
                path: path.to_owned(),
                source,
            })?;

            Ok(flatten(file))
        }
        Some("py") => Ok(parse_zone_script(&text)),
        _ => Err(JobError::UnsupportedFormat(path.to_owned())),
    }
}

/// Validates every job, failing on the first invalid one or on an empty list.
pub(crate) fn validate_all(specs: &[JobSpec], zoom_limit: u8) -> Result<Vec<RegionJob>, JobError> {
    if specs.is_empty() {
        return Err(JobError::Empty);
    }

    specs.iter().map(|spec| spec.validate(zoom_limit)).collect()
}

fn flatten(file: JobFile) -> Vec<JobSpec> {
    file.regions
        .into_iter()
        .flat_map(|region| {
            let RegionDef {
                name,
                zooms,
                tms,
                boxes,
            } = region;

            boxes.into_iter().map(move |corners| JobSpec {
                name: name.clone(),
                corners,
                zooms,
                tms,
            })
        })
        .collect()
}

static RENDER_TILES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^\s*render_tiles\(\s*\(([^()]*)\)\s*,[^,]*,[^,]*,\s*(\d+)\s*,\s*(\d+)\s*(?:,\s*(?:name\s*=\s*)?"([^"]*)")?(.*)\)\s*$"#,
    )
    .expect("regex")
});

static TMS_FLAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:tms_scheme\s*=\s*)?\bTrue\b").expect("regex"));

/// Extracts literal `render_tiles((lon0,lat0,lon1,lat1), mapfile, tile_dir,
/// zmin, zmax, "name")` calls from a zone script. Anything else is ignored.
pub(crate) fn parse_zone_script(text: &str) -> Vec<JobSpec> {
    text.lines()
        .filter(|line| !line.trim_start().starts_with('#'))
        .filter_map(|line| {
            let captures = RENDER_TILES.captures(line)?;

            let corners = captures[1]
                .split(',')
                .map(|value| value.trim().parse::<f64>().ok())
                .collect::<Option<Vec<_>>>()?;

            Some(JobSpec {
                name: captures
                    .get(4)
                    .map_or_else(|| "unknown".to_string(), |name| name.as_str().to_string()),
                corners: corners.try_into().ok()?,
                zooms: (captures[2].parse().ok()?, captures[3].parse().ok()?),
                tms: TMS_FLAG.is_match(&captures[5]),
            })
        })
        .collect()
}
