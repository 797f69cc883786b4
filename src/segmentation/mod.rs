mod preprocess;
mod rvm;

pub use preprocess::Preprocessor;
pub use rvm::RobustVideoMatting;

use anyhow::{ensure, Result};
use image::RgbImage;

/// Per-pixel foreground probability aligned to a source frame's extent.
///
/// Values are in [0, 1] where 1.0 means person/foreground. The extent is
/// carried alongside the samples so callers can check alignment against the
/// frame the mask was produced for.
#[derive(Debug, Clone, PartialEq)]
pub struct Mask {
    width: u32,
    height: u32,
    data: Vec<f32>,
}

impl Mask {
    pub fn new(width: u32, height: u32, data: Vec<f32>) -> Result<Self> {
        ensure!(
            data.len() == (width as usize) * (height as usize),
            "mask buffer has {} samples, extent {}x{} needs {}",
            data.len(),
            width,
            height,
            (width as usize) * (height as usize)
        );
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Build a mask by evaluating `f` at every pixel.
    pub fn from_fn<F: FnMut(u32, u32) -> f32>(width: u32, height: u32, mut f: F) -> Self {
        let mut data = Vec::with_capacity((width as usize) * (height as usize));
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y).clamp(0.0, 1.0));
            }
        }
        Self {
            width,
            height,
            data,
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Foreground probability at (x, y). Row-major, no bounds slack.
    #[inline]
    pub fn get(&self, x: u32, y: u32) -> f32 {
        self.data[(y * self.width + x) as usize]
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn matches_extent(&self, frame: &RgbImage) -> bool {
        (self.width, self.height) == frame.dimensions()
    }

    /// Mirror the mask left-to-right, matching a horizontally flipped frame.
    pub fn flipped_horizontal(&self) -> Mask {
        Mask::from_fn(self.width, self.height, |x, y| {
            self.get(self.width - 1 - x, y)
        })
    }
}

/// Capability contract for foreground/person segmentation.
///
/// `Ok(None)` is an expected outcome (the provider had no result for this
/// frame) and must make mask-dependent stages degrade to pass-through; it is
/// not an error.
pub trait SegmentationProvider {
    /// Segment one frame into a foreground mask aligned to its extent.
    fn segment(&mut self, frame: &RgbImage) -> Result<Option<Mask>>;

    /// Drop any temporal state. Called on camera switches or scene cuts;
    /// stateless providers keep the default no-op.
    fn reset(&mut self) {}
}

/// Create the default ONNX-backed provider (RobustVideoMatting).
pub fn create_default_provider(model_path: &str) -> Result<Box<dyn SegmentationProvider>> {
    let model = RobustVideoMatting::new(model_path)?;
    Ok(Box::new(model))
}
