mod webcam;

pub use webcam::WebcamSource;

use anyhow::Result;
use image::RgbImage;

/// A serialized source of raw camera frames.
pub trait FrameSource {
    /// Block until the next frame is available.
    fn next_frame(&mut self) -> Result<RgbImage>;

    /// Actual capture resolution, which may differ from the requested one.
    fn resolution(&self) -> (u32, u32);
}
