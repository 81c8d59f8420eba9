use crate::tiles::{geo_box::GeoBox, tile_coord::TileCoord};
use geo::Coord;
use std::f64::consts::PI;

pub(crate) const DEFAULT_TILE_SIZE: u32 = 256;

/// Highest zoom whose tile indices still fit into `u32`.
pub(crate) const ZOOM_LIMIT: u8 = 30;

const EARTH_RADIUS: f64 = 6_378_137.0;

/// Mercator blows up at the poles, so `sin(lat)` is kept inside this bound.
const SIN_LAT_LIMIT: f64 = 0.9999;

#[derive(Clone, Copy, Debug)]
struct ZoomLevel {
    px_per_degree: f64,
    px_per_radian: f64,
    origin: f64,
}

/// Spherical ("Google") web mercator between lon/lat degrees, global pixel
/// space and tile indices.
///
/// Per-zoom constants are computed once for `0..=max_zoom` and shared by every
/// lookup of a run.
#[derive(Debug)]
pub(crate) struct WebMercator {
    tile_size: u32,
    levels: Vec<ZoomLevel>,
}

impl WebMercator {
    pub(crate) fn new(max_zoom: u8, tile_size: u32) -> Self {
        let max_zoom = max_zoom.min(ZOOM_LIMIT);

        let levels = (0..=max_zoom)
            .map(|zoom| {
                let canvas = tile_size as f64 * f64::from(zoom).exp2();

                ZoomLevel {
                    px_per_degree: canvas / 360.0,
                    px_per_radian: canvas / (2.0 * PI),
                    origin: canvas / 2.0,
                }
            })
            .collect();

        Self { tile_size, levels }
    }

    pub(crate) fn tile_size(&self) -> u32 {
        self.tile_size
    }

    pub(crate) fn max_zoom(&self) -> u8 {
        (self.levels.len() - 1) as u8
    }

    /// # Panics
    ///
    /// If `zoom` is above [`Self::max_zoom`]. Jobs are validated against the
    /// table size before enumeration starts.
    #[inline]
    fn level(&self, zoom: u8) -> &ZoomLevel {
        &self.levels[zoom as usize]
    }

    /// Pixel position of lon=0, lat=0.
    pub(crate) fn pixel_origin(&self, zoom: u8) -> f64 {
        self.level(zoom).origin
    }

    pub(crate) fn lon_lat_to_pixel(&self, lon_lat: Coord, zoom: u8) -> Coord {
        let level = self.level(zoom);

        let sin_lat = (lon_lat.y * PI / 180.0)
            .sin()
            .clamp(-SIN_LAT_LIMIT, SIN_LAT_LIMIT);

        Coord {
            x: lon_lat.x.mul_add(level.px_per_degree, level.origin),
            y: (0.5 * ((1.0 + sin_lat) / (1.0 - sin_lat)).ln())
                .mul_add(-level.px_per_radian, level.origin),
        }
    }

    pub(crate) fn pixel_to_lon_lat(&self, pixel: Coord, zoom: u8) -> Coord {
        let level = self.level(zoom);
        let origin = self.pixel_origin(zoom);

        let g = (pixel.y - origin) / -level.px_per_radian;

        Coord {
            x: (pixel.x - origin) / level.px_per_degree,
            y: (2.0 * g.exp().atan() - 0.5 * PI).to_degrees(),
        }
    }

    /// Floor division of a global pixel position by the tile size. Results may
    /// fall outside `[0, 2^zoom)` when the pixel lies off the canvas.
    pub(crate) fn tile_index_of(&self, pixel: Coord) -> (i64, i64) {
        let size = self.tile_size as f64;

        (
            (pixel.x / size).floor() as i64,
            (pixel.y / size).floor() as i64,
        )
    }

    /// Geographic extent of an XYZ tile.
    pub(crate) fn tile_bounds(&self, coord: TileCoord) -> GeoBox {
        let size = self.tile_size as f64;

        let top_left = Coord {
            x: coord.x as f64 * size,
            y: coord.y as f64 * size,
        };

        let bottom_right = Coord {
            x: (coord.x as f64 + 1.0) * size,
            y: (coord.y as f64 + 1.0) * size,
        };

        GeoBox::from_coords(
            self.pixel_to_lon_lat(top_left, coord.zoom),
            self.pixel_to_lon_lat(bottom_right, coord.zoom),
        )
    }
}

/// Spherical mercator metres (EPSG:3857 units), clamped like
/// [`WebMercator::lon_lat_to_pixel`].
pub(crate) fn lon_lat_to_mercator(lon_lat: Coord) -> Coord {
    let sin_lat = lon_lat
        .y
        .to_radians()
        .sin()
        .clamp(-SIN_LAT_LIMIT, SIN_LAT_LIMIT);

    Coord {
        x: lon_lat.x.to_radians() * EARTH_RADIUS,
        y: 0.5 * ((1.0 + sin_lat) / (1.0 - sin_lat)).ln() * EARTH_RADIUS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const EPS: f64 = 1e-6;

    #[test]
    fn origin_is_half_the_canvas() {
        let projection = WebMercator::new(18, 256);

        assert_eq!(projection.pixel_origin(0), 128.0);
        assert_eq!(projection.pixel_origin(1), 256.0);
        assert_eq!(projection.pixel_origin(18), 256.0 * 2f64.powi(17));
    }

    #[test]
    fn null_island_maps_to_origin() {
        let projection = WebMercator::new(18, 256);

        for zoom in 0..=18 {
            let px = projection.lon_lat_to_pixel(Coord { x: 0.0, y: 0.0 }, zoom);

            assert!((px.x - projection.pixel_origin(zoom)).abs() < EPS);
            assert!((px.y - projection.pixel_origin(zoom)).abs() < EPS);
        }
    }

    #[test]
    fn north_is_up() {
        let projection = WebMercator::new(5, 256);

        let north = projection.lon_lat_to_pixel(Coord { x: 10.0, y: 50.0 }, 3);
        let south = projection.lon_lat_to_pixel(Coord { x: 10.0, y: -50.0 }, 3);

        assert!(north.y < south.y);
    }

    #[test]
    fn poles_are_clamped_to_finite_pixels() {
        let projection = WebMercator::new(4, 256);

        let north = projection.lon_lat_to_pixel(Coord { x: 0.0, y: 90.0 }, 4);
        let south = projection.lon_lat_to_pixel(Coord { x: 0.0, y: -90.0 }, 4);

        assert!(north.y.is_finite());
        assert!(south.y.is_finite());
        assert!((north.y + south.y - 2.0 * projection.pixel_origin(4)).abs() < EPS);
    }

    #[test]
    fn round_trip_on_grid() {
        let projection = WebMercator::new(18, 256);

        for zoom in 0..=18 {
            for lon in (-180..=180).step_by(15) {
                for lat in (-84..=84).step_by(6) {
                    let lon_lat = Coord {
                        x: lon as f64,
                        y: lat as f64,
                    };

                    let back = projection
                        .pixel_to_lon_lat(projection.lon_lat_to_pixel(lon_lat, zoom), zoom);

                    assert!((back.x - lon_lat.x).abs() < EPS, "lon {lon} z{zoom}");
                    assert!((back.y - lon_lat.y).abs() < EPS, "lat {lat} z{zoom}");
                }
            }
        }
    }

    #[test]
    fn tile_index_floors_negative_pixels() {
        let projection = WebMercator::new(2, 256);

        assert_eq!(
            projection.tile_index_of(Coord { x: -0.5, y: 255.9 }),
            (-1, 0)
        );
        assert_eq!(
            projection.tile_index_of(Coord { x: 512.0, y: -256.0 }),
            (2, -1)
        );
    }

    #[test]
    fn world_tile_bounds() {
        let projection = WebMercator::new(2, 256);

        let bounds = projection.tile_bounds(TileCoord {
            zoom: 0,
            x: 0,
            y: 0,
        });

        assert!((bounds.west() + 180.0).abs() < EPS);
        assert!((bounds.east() - 180.0).abs() < EPS);
        assert!((bounds.north() - 85.051_128_78).abs() < 1e-6);
        assert!((bounds.south() + 85.051_128_78).abs() < 1e-6);
    }

    #[test]
    fn quadrant_tile_bounds_meet_at_null_island() {
        let projection = WebMercator::new(2, 256);

        let bounds = projection.tile_bounds(TileCoord {
            zoom: 1,
            x: 1,
            y: 1,
        });

        assert!(bounds.west().abs() < EPS);
        assert!(bounds.north().abs() < EPS);
    }

    #[test]
    fn table_is_capped() {
        assert_eq!(WebMercator::new(40, 256).max_zoom(), ZOOM_LIMIT);
    }

    #[test]
    fn mercator_metres_at_known_points() {
        let origin = lon_lat_to_mercator(Coord { x: 0.0, y: 0.0 });
        assert!(origin.x.abs() < EPS && origin.y.abs() < EPS);

        let east = lon_lat_to_mercator(Coord { x: 180.0, y: 0.0 });
        assert!((east.x - PI * EARTH_RADIUS).abs() < 1e-3);
    }

    proptest! {
        #[test]
        fn round_trip_within_tolerance(
            lon in -180.0f64..180.0,
            lat in -85.0f64..85.0,
            zoom in 0u8..=18,
        ) {
            let projection = WebMercator::new(18, 256);

            let back = projection.pixel_to_lon_lat(
                projection.lon_lat_to_pixel(Coord { x: lon, y: lat }, zoom),
                zoom,
            );

            prop_assert!((back.x - lon).abs() < EPS);
            prop_assert!((back.y - lat).abs() < EPS);
        }

        #[test]
        fn tile_index_stays_on_the_grid(
            lon in -180.0f64..180.0,
            lat in -84.999f64..84.999,
            zoom in 0u8..=18,
        ) {
            let projection = WebMercator::new(18, 256);

            let (x, y) = projection.tile_index_of(
                projection.lon_lat_to_pixel(Coord { x: lon, y: lat }, zoom),
            );

            let side = 1i64 << zoom;

            prop_assert!((0..side).contains(&x));
            prop_assert!((0..side).contains(&y));
        }
    }
}
