use std::fmt::Display;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Ord, PartialOrd)]
pub(crate) struct TileCoord {
    pub(crate) zoom: u8,
    pub(crate) x: u32,
    pub(crate) y: u32,
}

impl TileCoord {
    /// Number of tiles along one side of the grid at `zoom`.
    pub(crate) fn side(zoom: u8) -> u64 {
        1u64 << zoom
    }

    pub(crate) fn is_valid(self) -> bool {
        let side = Self::side(self.zoom);

        u64::from(self.x) < side && u64::from(self.y) < side
    }

    /// Mirrors the row index vertically (XYZ <-> TMS). Applying it twice
    /// yields the original coordinate.
    pub(crate) fn flip_y(self) -> Self {
        Self {
            y: (Self::side(self.zoom) - 1 - u64::from(self.y)) as u32,
            ..self
        }
    }
}

impl Display for TileCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.x, self.y)
    }
}

/// Row numbering convention of the written pyramid.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub(crate) enum TileScheme {
    /// Rows counted from the top (Google/OSM style).
    #[default]
    Xyz,
    /// Rows counted from the bottom (OSGeo TMS).
    Tms,
}

impl TileScheme {
    pub(crate) fn from_tms_flag(tms: bool) -> Self {
        if tms { Self::Tms } else { Self::Xyz }
    }

    /// Converts an XYZ coordinate into this scheme. The mapping is its own
    /// inverse, so it also converts back.
    pub(crate) fn apply(self, coord: TileCoord) -> TileCoord {
        match self {
            Self::Xyz => coord,
            Self::Tms => coord.flip_y(),
        }
    }
}
