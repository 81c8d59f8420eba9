use crate::tiles::GeoBox;
use std::{io, path::Path};

#[derive(Debug, thiserror::Error)]
pub(crate) enum RenderError {
    #[error(transparent)]
    Cairo(#[from] cairo::Error),

    #[error("error encoding image: {0}")]
    ImageEncoding(Box<dyn std::error::Error + Send + Sync>),

    #[error("error writing {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("invalid image size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },

    #[error("renderer panicked: {0}")]
    Panicked(String),
}

impl RenderError {
    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }

    /// Contention-style I/O failures that may succeed when tried again.
    /// Everything else is deterministic and retrying would only repeat it.
    pub(crate) fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Io { source, .. } if matches!(
                source.kind(),
                io::ErrorKind::Interrupted
                    | io::ErrorKind::WouldBlock
                    | io::ErrorKind::TimedOut
                    | io::ErrorKind::ResourceBusy
            )
        )
    }
}

/// Rasterizes one geographic box into an image file.
///
/// Instances are not assumed to be thread-safe; every worker builds its own.
pub(crate) trait TileRenderer {
    /// Must leave a complete image at `path` or return an error.
    fn render_tile_to_file(
        &mut self,
        bbox: GeoBox,
        width: u32,
        height: u32,
        path: &Path,
    ) -> Result<(), RenderError>;

    /// Byte size of a tile with nothing drawn on it, if the output format has
    /// such a signature.
    fn empty_tile_size(&self) -> Option<u64>;
}
