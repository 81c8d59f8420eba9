use crate::tiles::tile_coord::{TileCoord, TileScheme};
use std::{
    fmt::Display,
    path::{Path, PathBuf},
    sync::Arc,
};

/// One renderable tile of a region.
///
/// `coord` is expressed in the region's output scheme, so for TMS regions its
/// `y` is the flipped row that names the file on disk.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub(crate) struct TileAddress {
    pub(crate) region: Arc<str>,
    pub(crate) coord: TileCoord,
    pub(crate) scheme: TileScheme,
}

impl TileAddress {
    /// The same tile in top-down (XYZ) row numbering, used for projection.
    pub(crate) fn xyz(&self) -> TileCoord {
        self.scheme.apply(self.coord)
    }

    /// `<root>/<region>/<zoom>/<x>/<y>.png`
    pub(crate) fn path(&self, root: &Path) -> PathBuf {
        let mut path = root.to_owned();
        path.push(&*self.region);
        path.push(self.coord.zoom.to_string());
        path.push(self.coord.x.to_string());
        path.push(format!("{}.png", self.coord.y));
        path
    }
}

impl Display for TileAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.region, self.coord)
    }
}
