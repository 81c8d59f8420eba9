pub(crate) use geo_box::GeoBox;
pub(crate) use projection::{DEFAULT_TILE_SIZE, WebMercator, ZOOM_LIMIT, lon_lat_to_mercator};
pub(crate) use region_job::{InvalidJob, RegionJob, check_corners};
pub(crate) use tile_address::TileAddress;
#[cfg(test)]
pub(crate) use tile_coord::TileCoord;
pub(crate) use tile_coord::TileScheme;

mod geo_box;
mod projection;
mod region_job;
mod tile_address;
mod tile_coord;
mod tile_enumerator;
