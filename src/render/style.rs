use crate::{render::colors::Color, tiles::lon_lat_to_mercator};
use geo::{BoundingRect, Geometry, MapCoordsInPlace, Rect};
use geojson::GeoJson;
use serde::Deserialize;
use std::{
    fs::File,
    io::{self, BufReader},
    path::{Path, PathBuf},
};

#[derive(Debug, thiserror::Error)]
pub(crate) enum StyleError {
    #[error("open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("parse style {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("parse GeoJSON {path}: {source}")]
    GeoJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("convert {path} to geometry: {message}")]
    Geometry { path: PathBuf, message: String },

    #[error("layer '{0}' has neither fill nor stroke")]
    Invisible(String),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct StyleDef {
    #[serde(default)]
    background: Option<Color>,
    #[serde(default)]
    layers: Vec<LayerDef>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct LayerDef {
    name: String,
    source: PathBuf,
    #[serde(default)]
    fill: Option<Color>,
    #[serde(default)]
    stroke: Option<Color>,
    #[serde(default = "default_stroke_width")]
    stroke_width: f64,
    #[serde(default = "default_point_radius")]
    point_radius: f64,
    #[serde(default)]
    min_zoom: u8,
    #[serde(default = "default_max_zoom")]
    max_zoom: u8,
}

fn default_stroke_width() -> f64 {
    1.0
}

fn default_point_radius() -> f64 {
    2.0
}

fn default_max_zoom() -> u8 {
    u8::MAX
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct Paint {
    pub(crate) fill: Option<Color>,
    pub(crate) stroke: Option<Color>,
    pub(crate) stroke_width: f64,
    pub(crate) point_radius: f64,
}

/// A geometry in spherical mercator metres with its precomputed extent.
#[derive(Debug)]
pub(crate) struct Shape {
    pub(crate) bounds: Rect<f64>,
    pub(crate) geometry: Geometry,
}

#[derive(Debug)]
pub(crate) struct Layer {
    pub(crate) paint: Paint,
    pub(crate) min_zoom: u8,
    pub(crate) max_zoom: u8,
    pub(crate) shapes: Vec<Shape>,
}

impl Layer {
    pub(crate) fn visible_at(&self, zoom: f64) -> bool {
        const EPS: f64 = 1e-6;

        zoom + EPS >= f64::from(self.min_zoom) && zoom - EPS <= f64::from(self.max_zoom)
    }
}

/// Loaded cartographic style: background plus layers of vector data.
///
/// Immutable once loaded, so one instance is shared by all render workers.
#[derive(Debug)]
pub(crate) struct Style {
    pub(crate) background: Option<Color>,
    pub(crate) layers: Vec<Layer>,
}

impl Style {
    /// Reads the style YAML; layer sources are resolved relative to its
    /// directory.
    pub(crate) fn load(path: &Path) -> Result<Self, StyleError> {
        let file = File::open(path).map_err(|source| StyleError::Open {
            path: path.to_owned(),
            source,
        })?;

        let def: StyleDef =
            serde_saphyr::from_reader(BufReader::new(file)).map_err(|err| StyleError::Parse {
                path: path.to_owned(),
                message: err.to_string(),
            })?;

        let base = path.parent().unwrap_or(Path::new(""));

        let mut layers = Vec::with_capacity(def.layers.len());

        for layer in def.layers {
            if layer.fill.is_none() && layer.stroke.is_none() {
                return Err(StyleError::Invisible(layer.name));
            }

            let shapes = load_shapes(&base.join(&layer.source))?;

            tracing::debug!(layer = %layer.name, shapes = shapes.len(), "loaded style layer");

            layers.push(Layer {
                paint: Paint {
                    fill: layer.fill,
                    stroke: layer.stroke,
                    stroke_width: layer.stroke_width,
                    point_radius: layer.point_radius,
                },
                min_zoom: layer.min_zoom,
                max_zoom: layer.max_zoom,
                shapes,
            });
        }

        Ok(Self {
            background: def.background,
            layers,
        })
    }
}

/// Loads a lon/lat GeoJSON file, projects it to mercator metres and splits
/// collections so each part can be culled on its own.
fn load_shapes(path: &Path) -> Result<Vec<Shape>, StyleError> {
    let file = File::open(path).map_err(|source| StyleError::Open {
        path: path.to_owned(),
        source,
    })?;

    let geojson: GeoJson =
        serde_json::from_reader(BufReader::new(file)).map_err(|source| StyleError::GeoJson {
            path: path.to_owned(),
            source,
        })?;

    let mut geometry = Geometry::try_from(geojson).map_err(|err| StyleError::Geometry {
        path: path.to_owned(),
        message: err.to_string(),
    })?;

    geometry.map_coords_in_place(lon_lat_to_mercator);

    let mut shapes = Vec::new();

    flatten(geometry, &mut shapes);

    Ok(shapes)
}

fn flatten(geometry: Geometry, out: &mut Vec<Shape>) {
    if let Geometry::GeometryCollection(collection) = geometry {
        for geometry in collection {
            flatten(geometry, out);
        }

        return;
    }

    if let Some(bounds) = geometry.bounding_rect() {
        out.push(Shape { bounds, geometry });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const SQUARE: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": {},
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[0, 0], [10, 0], [10, 10], [0, 10], [0, 0]]]
                }
            },
            {
                "type": "Feature",
                "properties": {},
                "geometry": { "type": "Point", "coordinates": [-20, 5] }
            }
        ]
    }"#;

    fn write_style(dir: &Path, style: &str) -> PathBuf {
        fs::create_dir_all(dir.join("data")).unwrap();
        fs::write(dir.join("data/square.geojson"), SQUARE).unwrap();

        let path = dir.join("style.yaml");
        fs::write(&path, style).unwrap();
        path
    }

    #[test]
    fn loads_layers_relative_to_style() {
        let dir = tempfile::tempdir().unwrap();

        let path = write_style(
            dir.path(),
            "background: \"#ffffff\"\n\
             layers:\n\
             \x20 - name: land\n\
             \x20   source: data/square.geojson\n\
             \x20   fill: \"#00ff00\"\n\
             \x20   min_zoom: 2\n\
             \x20   max_zoom: 12\n",
        );

        let style = Style::load(&path).unwrap();

        assert_eq!(style.background.unwrap().a, 1.0);
        assert_eq!(style.layers.len(), 1);

        let layer = &style.layers[0];

        assert_eq!(layer.shapes.len(), 2);
        assert!(layer.paint.stroke.is_none());
        assert_eq!(layer.paint.stroke_width, 1.0);
        assert!(layer.visible_at(2.0));
        assert!(layer.visible_at(12.0));
        assert!(!layer.visible_at(1.5));
        assert!(!layer.visible_at(13.0));

        let square = &layer.shapes[0].bounds;

        assert!(square.min().x.abs() < 1e-6);
        assert!((square.max().x - 1_113_194.9).abs() < 1.0);
    }

    #[test]
    fn layer_without_paint_is_rejected() {
        let dir = tempfile::tempdir().unwrap();

        let path = write_style(
            dir.path(),
            "layers:\n\
             \x20 - name: ghost\n\
             \x20   source: data/square.geojson\n",
        );

        assert!(matches!(
            Style::load(&path),
            Err(StyleError::Invisible(name)) if name == "ghost"
        ));
    }

    #[test]
    fn bad_color_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();

        let path = write_style(dir.path(), "background: \"white\"\n");

        assert!(matches!(Style::load(&path), Err(StyleError::Parse { .. })));
    }

    #[test]
    fn missing_source_is_reported() {
        let dir = tempfile::tempdir().unwrap();

        let path = write_style(
            dir.path(),
            "layers:\n\
             \x20 - name: water\n\
             \x20   source: data/missing.geojson\n\
             \x20   stroke: \"#0000ff\"\n",
        );

        assert!(matches!(Style::load(&path), Err(StyleError::Open { .. })));
    }
}
