// THEORY:
// Every way a caller can hand the engine bad input is described here, once.
// The traversal itself cannot fail after its inputs are accepted: all runtime
// checks happen in the `pipeline` entry points before any engine state is
// allocated, so an `IterError` always means "nothing was computed".

use thiserror::Error;

/// Errors returned by the pipeline entry points and the image helper.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IterError {
    /// Width or height is below the 2x2 seed block.
    #[error("Invalid dimensions: {width}x{height} (both must be at least 2)")]
    InvalidDimensions {
        /// The rejected width.
        width: u32,
        /// The rejected height.
        height: u32,
    },

    /// The pixel or index buffer does not hold exactly width*height entries.
    #[error("Buffer holds {actual} entries, expected {expected}")]
    BufferSizeMismatch {
        /// width * height.
        expected: usize,
        /// The length actually supplied.
        actual: usize,
    },

    /// Palette mode supports at most 256 colors.
    #[error("Palette has {0} colors, at most 256 are supported")]
    PaletteTooLarge(usize),

    /// An empty palette cannot be indexed.
    #[error("Palette is empty")]
    EmptyPalette,

    /// An index buffer entry points past the end of the palette.
    #[error("Index {index} at offset {offset} is outside a palette of {palette_len} colors")]
    IndexOutOfPalette {
        /// Pixel offset holding the bad index.
        offset: usize,
        /// The bad index.
        index: u8,
        /// Number of palette entries.
        palette_len: usize,
    },

    /// The image has more distinct colors than palette mode allows.
    #[error("Image has more than {0} distinct colors")]
    TooManyColors(usize),

    /// Decoding or encoding an image file failed.
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Filesystem access failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, IterError>;
