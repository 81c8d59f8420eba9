use crate::render::size::Size;
use geo::{Coord, MapCoords, Rect};

/// Maps spherical mercator coordinates into the pixel space of one image,
/// y pointing down.
pub(crate) struct TileProjector {
    min_x: f64,
    min_y: f64,
    scale_x: f64,
    scale_y: f64,
    height: f64,
}

impl TileProjector {
    pub(crate) fn new(bbox: Rect<f64>, size: Size<u32>) -> Self {
        let min = bbox.min();

        Self {
            min_x: min.x,
            min_y: min.y,
            scale_x: size.width as f64 / bbox.width(),
            scale_y: size.height as f64 / bbox.height(),
            height: size.height as f64,
        }
    }

    #[inline]
    pub(crate) fn project_coord(&self, coord: Coord) -> Coord {
        Coord {
            x: (coord.x - self.min_x) * self.scale_x,
            y: (coord.y - self.min_y).mul_add(-self.scale_y, self.height),
        }
    }

    pub(crate) fn project<G>(&self, geometry: &G) -> G::Output
    where
        G: MapCoords<f64, f64>,
    {
        geometry.map_coords(|coord| self.project_coord(coord))
    }
}
