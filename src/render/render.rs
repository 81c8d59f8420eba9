use crate::{
    render::{
        colors::ContextExt,
        draw::path_geom::{is_areal, path_geometry},
        projectable::TileProjector,
        renderer::{RenderError, TileRenderer},
        size::Size,
        style::{Paint, Style},
    },
    tiles::{GeoBox, lon_lat_to_mercator},
};
use cairo::{Context, Format, ImageSurface, LineCap, LineJoin};
use geo::{Geometry, Intersects, Rect};
use std::{fs, io, path::Path, sync::Arc};

/// Renders a [`Style`] with cairo into PNG files.
pub(crate) struct CairoRenderer {
    style: Arc<Style>,
    tile_size: u32,
    empty_tile_size: u64,
}

impl CairoRenderer {
    /// `tile_size` is the pyramid's tile edge length. It sets the size of the
    /// empty-tile signature and the zoom that layer limits are checked against.
    pub(crate) fn new(style: Arc<Style>, tile_size: u32) -> Result<Self, RenderError> {
        let blank = encode_png(&style, None, tile_size, tile_size, tile_size)?;

        Ok(Self {
            style,
            tile_size,
            empty_tile_size: blank.len() as u64,
        })
    }

    pub(crate) fn render_png(
        &self,
        bbox: GeoBox,
        width: u32,
        height: u32,
    ) -> Result<Vec<u8>, RenderError> {
        encode_png(&self.style, Some(bbox), self.tile_size, width, height)
    }
}

impl TileRenderer for CairoRenderer {
    fn render_tile_to_file(
        &mut self,
        bbox: GeoBox,
        width: u32,
        height: u32,
        path: &Path,
    ) -> Result<(), RenderError> {
        let _span = tracy_client::span!("render_tile");

        let data = self.render_png(bbox, width, height)?;

        write_file(path, &data)
    }

    fn empty_tile_size(&self) -> Option<u64> {
        Some(self.empty_tile_size)
    }
}

/// Zoom level whose `tile_size` tiles show `bbox` at the given pixel width.
fn zoom_of(bbox: &GeoBox, width: u32, tile_size: u32) -> f64 {
    (360.0 * width as f64 / (tile_size as f64 * bbox.width())).log2()
}

/// Encodes `style` clipped to `bbox`. Without a box only the background is
/// painted.
fn encode_png(
    style: &Style,
    bbox: Option<GeoBox>,
    tile_size: u32,
    width: u32,
    height: u32,
) -> Result<Vec<u8>, RenderError> {
    let (Ok(w), Ok(h)) = (i32::try_from(width), i32::try_from(height)) else {
        return Err(RenderError::InvalidSize { width, height });
    };

    if w == 0 || h == 0 {
        return Err(RenderError::InvalidSize { width, height });
    }

    let surface = ImageSurface::create(Format::ARgb32, w, h)?;

    {
        let context = Context::new(&surface)?;

        if let Some(background) = style.background {
            context.set_source_color(background);
            context.paint()?;
        }

        if let Some(bbox) = bbox {
            let zoom = zoom_of(&bbox, width, tile_size);

            draw_layers(&context, style, bbox, zoom, Size { width, height })?;
        }
    }

    surface.flush();

    let _span = tracy_client::span!("render_tile::write_to_png");

    let mut buffer = Vec::new();

    surface
        .write_to_png(&mut buffer)
        .map_err(|err| RenderError::ImageEncoding(Box::new(err)))?;

    Ok(buffer)
}

fn draw_layers(
    context: &Context,
    style: &Style,
    bbox: GeoBox,
    zoom: f64,
    size: Size<u32>,
) -> Result<(), RenderError> {
    let extent = Rect::new(
        lon_lat_to_mercator(bbox.north_west()),
        lon_lat_to_mercator(bbox.south_east()),
    );

    let projector = TileProjector::new(extent, size);

    context.set_line_join(LineJoin::Round);
    context.set_line_cap(LineCap::Round);

    for layer in style.layers.iter().filter(|layer| layer.visible_at(zoom)) {
        let _span = tracy_client::span!("draw_layer");

        for shape in &layer.shapes {
            if !shape.bounds.intersects(&extent) {
                continue;
            }

            draw_geometry(context, &projector.project(&shape.geometry), &layer.paint)?;
        }
    }

    Ok(())
}

fn draw_geometry(context: &Context, geom: &Geometry, paint: &Paint) -> Result<(), RenderError> {
    context.new_path();

    path_geometry(context, geom, paint.point_radius);

    if let Some(fill) = paint.fill
        && is_areal(geom)
    {
        context.set_source_color(fill);
        context.fill_preserve()?;
    }

    if let Some(stroke) = paint.stroke {
        context.set_source_color(stroke);
        context.set_line_width(paint.stroke_width);
        context.stroke_preserve()?;
    }

    context.new_path();

    Ok(())
}

/// Writes through a sibling temp file; `path` only ever holds a complete
/// image.
fn write_file(path: &Path, data: &[u8]) -> Result<(), RenderError> {
    write_via_tmp(path, |tmp| fs::write(tmp, data))
}

fn write_via_tmp(
    path: &Path,
    write: impl FnOnce(&Path) -> io::Result<()>,
) -> Result<(), RenderError> {
    let tmp = path.with_extension("png.tmp");

    // a failed write may leave a partial temp file behind
    write(&tmp).map_err(|err| {
        let _ = fs::remove_file(&tmp);

        RenderError::io(&tmp, err)
    })?;

    fs::rename(&tmp, path).map_err(|err| {
        let _ = fs::remove_file(&tmp);

        RenderError::io(path, err)
    })
}
