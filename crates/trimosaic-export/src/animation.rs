//! Looping GIF assembly from rendered frames.

use std::io::Write;

use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, RgbaImage};

use crate::error::ExportError;

/// Default delay between frames in milliseconds.
pub const DEFAULT_FRAME_DELAY_MS: u32 = 100;

/// Streams frames into an infinitely looping GIF.
///
/// Frames are encoded in the order they are pushed.  When a final hold
/// is configured, [`finish`](Self::finish) repeats the last frame once
/// with the hold as its delay.
pub struct GifAssembler<W: Write> {
    encoder: GifEncoder<W>,
    frame_delay_ms: u32,
    final_hold_ms: Option<u32>,
    last: Option<RgbaImage>,
    frames: usize,
}

impl<W: Write> GifAssembler<W> {
    /// Start a GIF in `sink` that shows each frame for `frame_delay_ms`.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::Encode`] if the loop extension cannot be
    /// written.
    pub fn new(sink: W, frame_delay_ms: u32) -> Result<Self, ExportError> {
        let mut encoder = GifEncoder::new(sink);
        encoder.set_repeat(Repeat::Infinite)?;
        Ok(Self {
            encoder,
            frame_delay_ms,
            final_hold_ms: None,
            last: None,
            frames: 0,
        })
    }

    /// Hold the last frame for `hold_ms` before the loop restarts.
    #[must_use]
    pub fn with_final_hold(mut self, hold_ms: u32) -> Self {
        self.final_hold_ms = Some(hold_ms);
        self
    }

    /// Frames encoded so far, not counting the final hold.
    #[must_use]
    pub const fn frame_count(&self) -> usize {
        self.frames
    }

    /// Encode the next frame.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::Encode`] if the frame cannot be encoded.
    pub fn push(&mut self, image: RgbaImage) -> Result<(), ExportError> {
        let keep = self.final_hold_ms.map(|_| image.clone());
        self.encode(image, self.frame_delay_ms)?;
        self.last = keep;
        self.frames += 1;
        Ok(())
    }

    /// Append the final hold, if any, and write the GIF trailer.
    ///
    /// Returns the number of frames pushed.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::Encode`] if the hold frame cannot be
    /// encoded.
    pub fn finish(mut self) -> Result<usize, ExportError> {
        if let (Some(hold), Some(last)) = (self.final_hold_ms, self.last.take()) {
            self.encode(last, hold)?;
        }
        tracing::debug!(frames = self.frames, "gif assembled");
        // The encoder writes the trailer when dropped.
        Ok(self.frames)
    }

    fn encode(&mut self, image: RgbaImage, delay_ms: u32) -> Result<(), ExportError> {
        let frame = image::Frame::from_parts(image, 0, 0, Delay::from_numer_denom_ms(delay_ms, 1));
        self.encoder.encode_frame(frame)?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use image::AnimationDecoder;
    use image::codecs::gif::GifDecoder;
    use std::io::Cursor;

    fn solid(rgb: [u8; 3]) -> RgbaImage {
        RgbaImage::from_pixel(6, 4, image::Rgba([rgb[0], rgb[1], rgb[2], 255]))
    }

    fn decode_frames(bytes: &[u8]) -> Vec<image::Frame> {
        GifDecoder::new(Cursor::new(bytes))
            .unwrap()
            .into_frames()
            .collect_frames()
            .unwrap()
    }

    #[test]
    fn one_frame_per_push() {
        let mut buf = Vec::new();
        let mut gif = GifAssembler::new(&mut buf, 80).unwrap();
        gif.push(solid([255, 0, 0])).unwrap();
        gif.push(solid([0, 255, 0])).unwrap();
        gif.push(solid([0, 0, 255])).unwrap();
        assert_eq!(gif.finish().unwrap(), 3);

        assert_eq!(&buf[..6], b"GIF89a");
        let frames = decode_frames(&buf);
        assert_eq!(frames.len(), 3);
        for frame in &frames {
            assert_eq!(frame.delay().numer_denom_ms(), (80, 1));
        }
    }

    #[test]
    fn final_hold_repeats_the_last_frame() {
        let mut buf = Vec::new();
        let mut gif = GifAssembler::new(&mut buf, 50)
            .unwrap()
            .with_final_hold(2_000);
        gif.push(solid([10, 10, 10])).unwrap();
        gif.push(solid([200, 200, 200])).unwrap();
        assert_eq!(gif.finish().unwrap(), 2);

        let frames = decode_frames(&buf);
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[2].delay().numer_denom_ms(), (2_000, 1));
        assert_eq!(frames[1].buffer(), frames[2].buffer());
    }

    #[test]
    fn frames_keep_push_order() {
        let mut buf = Vec::new();
        let mut gif = GifAssembler::new(&mut buf, 10).unwrap();
        gif.push(solid([0, 0, 0])).unwrap();
        gif.push(solid([255, 255, 255])).unwrap();
        gif.finish().unwrap();

        let frames = decode_frames(&buf);
        assert_eq!(frames[0].buffer().get_pixel(0, 0)[0], 0);
        assert_eq!(frames[1].buffer().get_pixel(0, 0)[0], 255);
    }

    #[test]
    fn empty_assembly_has_no_frames() {
        let mut buf = Vec::new();
        let gif = GifAssembler::new(&mut buf, 10).unwrap().with_final_hold(500);
        assert_eq!(gif.frame_count(), 0);
        assert_eq!(gif.finish().unwrap(), 0);
    }
}
