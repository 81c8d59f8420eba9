use crate::tiles::{
    geo_box::GeoBox, projection::WebMercator, tile_coord::TileScheme,
    tile_enumerator::TileEnumerator,
};
use std::{ops::RangeInclusive, sync::Arc};

#[derive(Debug, thiserror::Error, PartialEq)]
pub(crate) enum InvalidJob {
    #[error("region name is empty")]
    EmptyName,

    #[error("region name '{0}' is not a single path component")]
    UnsafeName(String),

    #[error("coordinate {0} is not finite")]
    NonFinite(f64),

    #[error("longitude {0} is outside [-180, 180]")]
    Longitude(f64),

    #[error("latitude {0} is outside [-90, 90]")]
    Latitude(f64),

    #[error("min zoom {min} is greater than max zoom {max}")]
    ZoomOrder { min: u8, max: u8 },

    #[error("max zoom {max} exceeds the configured limit {limit}")]
    ZoomLimit { max: u8, limit: u8 },
}

/// Inclusive zoom interval.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct ZoomRange {
    min: u8,
    max: u8,
}

impl ZoomRange {
    pub(crate) fn new(min: u8, max: u8, limit: u8) -> Result<Self, InvalidJob> {
        if min > max {
            return Err(InvalidJob::ZoomOrder { min, max });
        }

        if max > limit {
            return Err(InvalidJob::ZoomLimit { max, limit });
        }

        Ok(Self { min, max })
    }

    pub(crate) fn min(&self) -> u8 {
        self.min
    }

    pub(crate) fn max(&self) -> u8 {
        self.max
    }

    pub(crate) fn levels(&self) -> RangeInclusive<u8> {
        self.min..=self.max
    }
}

/// Checks that `(lon0, lat0, lon1, lat1)` are finite degrees within range.
pub(crate) fn check_corners(corners: [f64; 4]) -> Result<(), InvalidJob> {
    if let Some(value) = corners.iter().find(|value| !value.is_finite()) {
        return Err(InvalidJob::NonFinite(*value));
    }

    let [lon0, lat0, lon1, lat1] = corners;

    for lon in [lon0, lon1] {
        if !(-180.0..=180.0).contains(&lon) {
            return Err(InvalidJob::Longitude(lon));
        }
    }

    for lat in [lat0, lat1] {
        if !(-90.0..=90.0).contains(&lat) {
            return Err(InvalidJob::Latitude(lat));
        }
    }

    Ok(())
}

/// A bounding box to render for one region over a zoom range.
#[derive(Clone, Debug)]
pub(crate) struct RegionJob {
    pub(crate) region: Arc<str>,
    pub(crate) bbox: GeoBox,
    pub(crate) zooms: ZoomRange,
    pub(crate) scheme: TileScheme,
}

impl RegionJob {
    /// Validates raw job input. `corners` is `(lon0, lat0, lon1, lat1)` in
    /// any corner order.
    pub(crate) fn new(
        region: &str,
        corners: [f64; 4],
        zooms: (u8, u8),
        scheme: TileScheme,
        zoom_limit: u8,
    ) -> Result<Self, InvalidJob> {
        let region = region.trim();

        if region.is_empty() {
            return Err(InvalidJob::EmptyName);
        }

        if region == "." || region == ".." || region.contains(['/', '\\']) {
            return Err(InvalidJob::UnsafeName(region.to_string()));
        }

        check_corners(corners)?;

        let [lon0, lat0, lon1, lat1] = corners;

        Ok(Self {
            region: Arc::from(region),
            bbox: GeoBox::from_corners(lon0, lat0, lon1, lat1),
            zooms: ZoomRange::new(zooms.0, zooms.1, zoom_limit)?,
            scheme,
        })
    }

    /// Lazily enumerates every tile of the job. Each call starts over and
    /// yields the same sequence.
    pub(crate) fn tiles<'a>(&self, projection: &'a WebMercator) -> TileEnumerator<'a> {
        TileEnumerator::new(
            projection,
            self.region.clone(),
            self.bbox,
            self.zooms,
            self.scheme,
        )
    }
}
