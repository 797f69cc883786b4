use super::FrameSource;
use anyhow::{Context, Result};
use image::RgbImage;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType};
use nokhwa::Camera;

/// Webcam frame source over nokhwa.
pub struct WebcamSource {
    camera: Camera,
    width: u32,
    height: u32,
}

impl WebcamSource {
    /// Open device `index` asking for the closest format to the requested
    /// resolution and frame rate; the actual resolution the driver settles
    /// on is reported by `resolution()`.
    pub fn new(index: u32, width: u32, height: u32, fps: u32) -> Result<Self> {
        tracing::info!("Opening camera {} requesting {}x{}@{}", index, width, height, fps);

        let wanted = CameraFormat::new_from(width, height, FrameFormat::MJPEG, fps);
        let requested =
            RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(wanted));

        let mut camera =
            Camera::new(CameraIndex::Index(index), requested).context("Failed to open camera")?;
        camera
            .open_stream()
            .context("Failed to open camera stream")?;

        let actual = camera.resolution();
        tracing::info!("Camera streaming at {}x{}", actual.width(), actual.height());

        Ok(Self {
            camera,
            width: actual.width(),
            height: actual.height(),
        })
    }
}

impl FrameSource for WebcamSource {
    fn next_frame(&mut self) -> Result<RgbImage> {
        let buffer = self.camera.frame().context("Failed to capture frame")?;
        buffer
            .decode_image::<RgbFormat>()
            .context("Failed to decode frame")
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}
