use thiserror::Error;

pub type Result<T> = std::result::Result<T, GlitchError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GlitchError {
    /// Interval counts must lie in `[1, domain length]`.
    #[error("cannot split {domain} indices into {count} intervals")]
    BadIntervalCount { count: usize, domain: usize },

    #[error("index domain is empty")]
    EmptyDomain,

    /// A scan block placed at this origin would read or write past the raster edge.
    #[error("{width}x{width} block at ({x}, {y}) exceeds the {raster_width}x{raster_height} raster")]
    BlockOutOfBounds {
        width: usize,
        x: usize,
        y: usize,
        raster_width: usize,
        raster_height: usize,
    },

    #[error("buffer holds {got} pixels, scan covers {expected}")]
    BufferMismatch { got: usize, expected: usize },

    #[error("hilbert depth {0} out of range (must be in 1..=12)")]
    BadDepth(u32),

    #[error("zigzag order {0} out of range (must be at least 1)")]
    BadOrder(usize),

    #[error("swap weight {0} out of range (must be positive and finite)")]
    BadSwapWeight(f32),

    #[error("break point {0} out of range (must be in (0, 999])")]
    BadBreakPoint(f32),

    /// A shell gap sequence only shrinks back to zero for ratios of 2 or more.
    #[error("shell gaps ({ratio}, {divisor}) out of range (need ratio >= 2, divisor >= 1)")]
    BadShellParams { ratio: usize, divisor: usize },

    /// Statistics need at least one value; inverted bounds count as empty.
    #[error("statistics requested over an empty range")]
    EmptyStats,

    #[error("band ({lower}, {upper}) exceeds spectrum of {spec_size} bins")]
    BandOutOfRange {
        lower: usize,
        upper: usize,
        spec_size: usize,
    },

    #[error("cannot lay out {octaves} octaves of {bands_per_octave} bands each")]
    BadBandLayout {
        octaves: usize,
        bands_per_octave: usize,
    },

    #[error("transform size {0} is not a power of two")]
    BadFftSize(usize),

    #[error("raster length {len} does not match {width}x{height}")]
    RasterMismatch {
        len: usize,
        width: usize,
        height: usize,
    },
}
