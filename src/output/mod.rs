mod loopback;

pub use loopback::LoopbackSink;

use anyhow::Result;
use image::RgbImage;

/// A destination for processed frames.
pub trait FrameSink {
    /// Write one frame, converting/resizing to the sink's native format.
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()>;

    /// The resolution frames are emitted at.
    fn resolution(&self) -> (u32, u32);
}
