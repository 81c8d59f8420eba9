use crate::tiles::{
    geo_box::GeoBox,
    projection::WebMercator,
    region_job::ZoomRange,
    tile_address::TileAddress,
    tile_coord::{TileCoord, TileScheme},
};
use std::{ops::RangeInclusive, sync::Arc};

/// Tiles of one zoom level touched by a box, already clipped to the grid.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct TileSpan {
    pub(crate) zoom: u8,
    pub(crate) min_x: u32,
    pub(crate) max_x: u32,
    pub(crate) min_y: u32,
    pub(crate) max_y: u32,
}

impl TileSpan {
    /// Returns `None` when the box lies entirely off the grid.
    pub(crate) fn of(projection: &WebMercator, bbox: &GeoBox, zoom: u8) -> Option<Self> {
        let top_left = projection.lon_lat_to_pixel(bbox.north_west(), zoom);
        let bottom_right = projection.lon_lat_to_pixel(bbox.south_east(), zoom);

        let (x0, y0) = projection.tile_index_of(top_left);
        let (x1, y1) = projection.tile_index_of(bottom_right);

        let last = (TileCoord::side(zoom) - 1) as i64;

        let min_x = x0.min(x1).max(0);
        let max_x = x0.max(x1).min(last);
        let min_y = y0.min(y1).max(0);
        let max_y = y0.max(y1).min(last);

        if min_x > max_x || min_y > max_y {
            return None;
        }

        Some(Self {
            zoom,
            min_x: min_x as u32,
            max_x: max_x as u32,
            min_y: min_y as u32,
            max_y: max_y as u32,
        })
    }

    pub(crate) fn len(&self) -> u64 {
        u64::from(self.max_x - self.min_x + 1) * u64::from(self.max_y - self.min_y + 1)
    }
}

struct Cursor {
    span: TileSpan,
    x: u32,
    y: u32,
}

/// Lazy walk over every tile a box touches, zoom by zoom, column by column,
/// top to bottom within a column.
pub(crate) struct TileEnumerator<'a> {
    projection: &'a WebMercator,
    region: Arc<str>,
    bbox: GeoBox,
    scheme: TileScheme,
    zooms: RangeInclusive<u8>,
    cursor: Option<Cursor>,
}

impl<'a> TileEnumerator<'a> {
    pub(crate) fn new(
        projection: &'a WebMercator,
        region: Arc<str>,
        bbox: GeoBox,
        zooms: ZoomRange,
        scheme: TileScheme,
    ) -> Self {
        Self {
            projection,
            region,
            bbox,
            scheme,
            zooms: zooms.levels(),
            cursor: None,
        }
    }

    /// Total number of tiles the enumeration yields, without walking it.
    pub(crate) fn total(&self) -> u64 {
        self.zooms
            .clone()
            .filter_map(|zoom| TileSpan::of(self.projection, &self.bbox, zoom))
            .map(|span| span.len())
            .sum()
    }
}

impl Iterator for TileEnumerator<'_> {
    type Item = TileAddress;

    fn next(&mut self) -> Option<Self::Item> {
        while self.cursor.is_none() {
            let zoom = self.zooms.next()?;

            self.cursor = TileSpan::of(self.projection, &self.bbox, zoom).map(|span| Cursor {
                span,
                x: span.min_x,
                y: span.min_y,
            });
        }

        let cursor = self.cursor.as_mut()?;

        let coord = TileCoord {
            zoom: cursor.span.zoom,
            x: cursor.x,
            y: cursor.y,
        };

        debug_assert!(coord.is_valid(), "{coord} is off the grid");

        if cursor.y < cursor.span.max_y {
            cursor.y += 1;
        } else if cursor.x < cursor.span.max_x {
            cursor.y = cursor.span.min_y;
            cursor.x += 1;
        } else {
            self.cursor = None;
        }

        Some(TileAddress {
            region: self.region.clone(),
            coord: self.scheme.apply(coord),
            scheme: self.scheme,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tiles::region_job::RegionJob;
    use geo::Coord;
    use std::collections::HashSet;

    fn job(corners: [f64; 4], zooms: (u8, u8), tms: bool) -> RegionJob {
        RegionJob::new(
            "test",
            corners,
            zooms,
            TileScheme::from_tms_flag(tms),
            18,
        )
        .unwrap()
    }

    fn coords(job: &RegionJob, projection: &WebMercator) -> Vec<(u8, u32, u32)> {
        job.tiles(projection)
            .map(|address| (address.coord.zoom, address.coord.x, address.coord.y))
            .collect()
    }

    #[test]
    fn null_island_box_xyz() {
        let projection = WebMercator::new(18, 256);

        let job = job([-1.0, -1.0, 1.0, 1.0], (0, 1), false);

        assert_eq!(
            coords(&job, &projection),
            vec![(0, 0, 0), (1, 0, 0), (1, 0, 1), (1, 1, 0), (1, 1, 1)]
        );
    }

    #[test]
    fn null_island_box_tms() {
        let projection = WebMercator::new(18, 256);

        let job = job([-1.0, -1.0, 1.0, 1.0], (0, 1), true);

        assert_eq!(
            coords(&job, &projection),
            vec![(0, 0, 0), (1, 0, 1), (1, 0, 0), (1, 1, 1), (1, 1, 0)]
        );
    }

    #[test]
    fn tms_addresses_project_back_to_xyz_rows() {
        let projection = WebMercator::new(18, 256);

        let xyz = job([5.0, 40.0, 25.0, 55.0], (3, 6), false);
        let tms = job([5.0, 40.0, 25.0, 55.0], (3, 6), true);

        let xyz_coords: Vec<_> = xyz.tiles(&projection).map(|a| a.xyz()).collect();
        let tms_coords: Vec<_> = tms.tiles(&projection).map(|a| a.xyz()).collect();

        assert_eq!(xyz_coords, tms_coords);
    }

    #[test]
    fn world_box_is_clipped_to_grid() {
        let projection = WebMercator::new(18, 256);

        let job = job([-180.0, -90.0, 180.0, 90.0], (0, 3), false);

        let tiles = coords(&job, &projection);

        assert_eq!(tiles.len(), 1 + 4 + 16 + 64);
        assert!(tiles.iter().all(|&(z, x, y)| {
            TileCoord { zoom: z, x, y }.is_valid()
        }));
    }

    #[test]
    fn enumeration_is_restartable() {
        let projection = WebMercator::new(18, 256);

        let job = job([-97.42264, 25.84012, -97.37286, 25.84038], (0, 11), false);

        assert_eq!(coords(&job, &projection), coords(&job, &projection));
    }

    #[test]
    fn total_matches_enumeration() {
        let projection = WebMercator::new(18, 256);

        for job in [
            job([-1.0, -1.0, 1.0, 1.0], (0, 1), false),
            job([-180.0, -90.0, 180.0, 90.0], (0, 4), true),
            job([14.0, 47.7, 22.6, 49.7], (5, 12), false),
        ] {
            let enumerator = job.tiles(&projection);

            assert_eq!(enumerator.total(), job.tiles(&projection).count() as u64);
        }
    }

    #[test]
    fn zoom_then_column_then_row_order() {
        let projection = WebMercator::new(18, 256);

        let job = job([14.0, 47.7, 22.6, 49.7], (6, 8), false);

        let tiles = coords(&job, &projection);

        let mut sorted = tiles.clone();
        sorted.sort();

        assert_eq!(tiles, sorted);
    }

    #[test]
    fn covers_the_box_without_spurious_tiles() {
        let projection = WebMercator::new(18, 256);

        let bbox_corners = [16.8, 47.7, 22.6, 49.6];
        let job = job(bbox_corners, (4, 10), false);

        let tiles: HashSet<_> = job.tiles(&projection).map(|a| a.coord).collect();

        for coord in &tiles {
            assert!(
                projection.tile_bounds(*coord).intersects(&job.bbox),
                "{coord} lies outside the box"
            );
        }

        for zoom in 4..=10 {
            for i in 0..=20 {
                for j in 0..=20 {
                    let lon_lat = Coord {
                        x: job.bbox.west() + job.bbox.width() * i as f64 / 20.0,
                        y: job.bbox.south()
                            + (job.bbox.north() - job.bbox.south()) * j as f64 / 20.0,
                    };

                    let (x, y) =
                        projection.tile_index_of(projection.lon_lat_to_pixel(lon_lat, zoom));

                    assert!(tiles.contains(&TileCoord {
                        zoom,
                        x: x as u32,
                        y: y as u32,
                    }));
                }
            }
        }
    }

    #[test]
    fn degenerate_box_yields_one_tile_per_zoom() {
        let projection = WebMercator::new(18, 256);

        let job = job([-100.00039, 35.42236, -100.00039, 35.42236], (0, 11), false);

        assert_eq!(job.tiles(&projection).count(), 12);
    }
}
