use cairo::Context;
use geo::{Coord, Geometry, LineString, Polygon};
use std::f64::consts::PI;

pub(crate) fn path_line_string(context: &Context, line_string: &LineString) {
    let mut coords = line_string.coords();

    let Some(first) = coords.next() else {
        return;
    };

    context.move_to(first.x, first.y);

    for coord in coords {
        context.line_to(coord.x, coord.y);
    }
}

pub(crate) fn path_polygon(context: &Context, polygon: &Polygon) {
    for ring in std::iter::once(polygon.exterior()).chain(polygon.interiors()) {
        if ring.0.is_empty() {
            continue;
        }

        path_line_string(context, ring);

        context.close_path();
    }
}

fn path_disc(context: &Context, center: Coord, radius: f64) {
    context.new_sub_path();
    context.arc(center.x, center.y, radius, 0.0, 2.0 * PI);
    context.close_path();
}

/// Appends `geom` to the current path. Points become discs of `point_radius`.
pub(crate) fn path_geometry(context: &Context, geom: &Geometry, point_radius: f64) {
    match geom {
        Geometry::Point(point) => path_disc(context, point.0, point_radius),
        Geometry::MultiPoint(points) => {
            for point in points {
                path_disc(context, point.0, point_radius);
            }
        }
        Geometry::Line(line) => {
            context.move_to(line.start.x, line.start.y);
            context.line_to(line.end.x, line.end.y);
        }
        Geometry::LineString(line_string) => path_line_string(context, line_string),
        Geometry::MultiLineString(line_strings) => {
            for line_string in line_strings {
                path_line_string(context, line_string);
            }
        }
        Geometry::Polygon(polygon) => path_polygon(context, polygon),
        Geometry::MultiPolygon(polygons) => {
            for polygon in polygons {
                path_polygon(context, polygon);
            }
        }
        Geometry::Rect(rect) => path_polygon(context, &rect.to_polygon()),
        Geometry::Triangle(triangle) => path_polygon(context, &triangle.to_polygon()),
        Geometry::GeometryCollection(collection) => {
            for geom in collection {
                path_geometry(context, geom, point_radius);
            }
        }
    }
}

/// Whether the geometry encloses an area that a fill applies to.
pub(crate) fn is_areal(geom: &Geometry) -> bool {
    match geom {
        Geometry::Point(_)
        | Geometry::MultiPoint(_)
        | Geometry::Polygon(_)
        | Geometry::MultiPolygon(_)
        | Geometry::Rect(_)
        | Geometry::Triangle(_) => true,
        Geometry::Line(_) | Geometry::LineString(_) | Geometry::MultiLineString(_) => false,
        Geometry::GeometryCollection(collection) => collection.iter().any(is_areal),
    }
}
