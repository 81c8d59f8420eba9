use geo::{Coord, Rect};
use std::fmt::{self, Display};

/// Geographic bounding box in lon/lat degrees.
///
/// Corners may be supplied in any order; they are always stored as
/// (west, south)–(east, north). A box is never wrapped across the
/// antimeridian: corners `170` and `-170` describe the 340° wide box between
/// them.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct GeoBox(Rect<f64>);

impl GeoBox {
    /// Builds a box from two opposite corners given as `(lon0, lat0, lon1, lat1)`.
    pub(crate) fn from_corners(lon0: f64, lat0: f64, lon1: f64, lat1: f64) -> Self {
        Self::from_coords(Coord { x: lon0, y: lat0 }, Coord { x: lon1, y: lat1 })
    }

    pub(crate) fn from_coords(a: Coord, b: Coord) -> Self {
        // Rect::new sorts both axes independently.
        Self(Rect::new(a, b))
    }

    pub(crate) fn west(&self) -> f64 {
        self.0.min().x
    }

    pub(crate) fn south(&self) -> f64 {
        self.0.min().y
    }

    pub(crate) fn east(&self) -> f64 {
        self.0.max().x
    }

    pub(crate) fn north(&self) -> f64 {
        self.0.max().y
    }

    pub(crate) fn north_west(&self) -> Coord {
        Coord {
            x: self.west(),
            y: self.north(),
        }
    }

    pub(crate) fn south_east(&self) -> Coord {
        Coord {
            x: self.east(),
            y: self.south(),
        }
    }

    pub(crate) fn width(&self) -> f64 {
        self.0.width()
    }

    /// Closed-interval overlap; boxes sharing only an edge intersect.
    #[cfg(test)]
    pub(crate) fn intersects(&self, other: &Self) -> bool {
        use geo::Intersects;

        self.0.intersects(&other.0)
    }
}

impl Display for GeoBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}, {})",
            self.west(),
            self.south(),
            self.east(),
            self.north()
        )
    }
}
