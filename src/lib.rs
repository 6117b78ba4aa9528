pub mod bands;
pub mod color;
pub mod effects;
pub mod error;
pub mod fft;
pub mod range;
pub mod scan;
pub mod sorting;

pub use self::effects::Raster;
pub use self::error::{GlitchError, Result};
