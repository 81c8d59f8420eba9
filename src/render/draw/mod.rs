pub(crate) mod path_geom;
