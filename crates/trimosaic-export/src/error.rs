/// Errors raised while serializing frames.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// The `image` crate failed to encode a raster or GIF frame.
    #[error("failed to encode image: {0}")]
    Encode(#[from] image::ImageError),

    /// Writing to the output sink failed.
    #[error("failed to write output: {0}")]
    Io(#[from] std::io::Error),

    /// The requested output canvas has no pixels.
    #[error("output canvas {width}x{height} has no pixels; check the scale")]
    EmptyCanvas {
        /// Requested canvas width.
        width: u32,
        /// Requested canvas height.
        height: u32,
    },
}
