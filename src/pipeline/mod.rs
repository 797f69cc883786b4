mod background;
mod color;
mod smoothing;

pub use background::BackgroundCompositor;

use crate::segmentation::{Mask, SegmentationProvider};
use crate::settings::{BackgroundMode, Settings};
use image::{imageops, RgbImage};
use thiserror::Error;

/// Why a stage produced no output for a frame.
///
/// None of these fail the frame: the pipeline degrades the stage to
/// pass-through and keeps going. The variants exist so a designed no-op and
/// an unexpected failure stay distinguishable in the logs.
#[derive(Debug, Error)]
pub enum StageError {
    /// No segmentation mask was available for this frame.
    #[error("no segmentation mask available")]
    SegmentationUnavailable,
    /// The selected mode needs a replacement image that is not loaded.
    #[error("background mode {0} has no image loaded")]
    BackgroundAssetMissing(BackgroundMode),
    /// A transform primitive could not be built or produced no output.
    #[error("stage produced no output: {0}")]
    StageConstructionFailure(String),
}

/// Per-frame effects pipeline: segmentation, mirroring, skin smoothing,
/// background compositing and color adjustment in a fixed order.
///
/// One instance serves one caller with one frame in flight at a time; the
/// only state carried across calls is the compositor's derived-background
/// cache, invalidated here whenever the active mode changes.
pub struct EffectPipeline {
    segmentation: Option<Box<dyn SegmentationProvider>>,
    compositor: BackgroundCompositor,
    active_mode: Option<BackgroundMode>,
}

impl Default for EffectPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl EffectPipeline {
    /// A pipeline without segmentation. Mask-dependent stages degrade to
    /// pass-through.
    pub fn new() -> Self {
        Self {
            segmentation: None,
            compositor: BackgroundCompositor::new(),
            active_mode: None,
        }
    }

    pub fn with_segmentation(provider: Box<dyn SegmentationProvider>) -> Self {
        Self {
            segmentation: Some(provider),
            compositor: BackgroundCompositor::new(),
            active_mode: None,
        }
    }

    /// Register the replacement image for an image-backed background mode.
    pub fn set_background_image(&mut self, mode: BackgroundMode, image: RgbImage) {
        self.compositor.set_background_image(mode, image);
    }

    pub fn clear_background_image(&mut self, mode: BackgroundMode) {
        self.compositor.clear_background_image(mode);
    }

    /// Drop temporal segmentation state, e.g. after a camera switch.
    pub fn reset_segmentation(&mut self) {
        if let Some(provider) = self.segmentation.as_mut() {
            provider.reset();
        }
    }

    /// Process one frame under one settings snapshot.
    ///
    /// Never fails: every stage degrades to pass-through on error, so the
    /// worst case is the input frame coming back unchanged. The output
    /// extent always equals the input extent.
    pub fn process(&mut self, frame: &RgbImage, settings: &Settings) -> RgbImage {
        let (width, height) = frame.dimensions();
        let _span = tracing::debug_span!("process_frame", width, height).entered();

        if self.active_mode != Some(settings.background_mode) {
            // The cached derived background belongs to the previous mode.
            self.compositor.invalidate_cache();
            self.active_mode = Some(settings.background_mode);
        }

        // Segmentation is only requested when an effect will consume it.
        let mut mask = if settings.background_mode == BackgroundMode::None {
            None
        } else {
            self.request_mask(frame)
        };

        // Frame and mask mirror together so they stay spatially aligned
        // through every later stage.
        let mut working = if settings.mirror_video {
            mask = mask.map(|m| m.flipped_horizontal());
            imageops::flip_horizontal(frame)
        } else {
            frame.clone()
        };

        working = smoothing::apply(&working, settings.skin_smoothing_amount, mask.as_ref());

        if settings.background_mode != BackgroundMode::None {
            match self
                .compositor
                .apply(&working, settings.background_mode, mask.as_ref())
            {
                Ok(composited) => working = composited,
                Err(StageError::SegmentationUnavailable) => {
                    tracing::debug!("Background compositing skipped: no mask this frame");
                }
                Err(err) => {
                    tracing::warn!("Background compositing degraded to pass-through: {err}");
                }
            }
        }

        working = color::apply(&working, settings);

        restore_extent(working, width, height)
    }

    fn request_mask(&mut self, frame: &RgbImage) -> Option<Mask> {
        let provider = self.segmentation.as_mut()?;
        match provider.segment(frame) {
            Ok(Some(mask)) if mask.matches_extent(frame) => Some(mask),
            Ok(Some(mask)) => {
                tracing::warn!(
                    "Discarding mask with extent {:?} for frame {:?}",
                    mask.dimensions(),
                    frame.dimensions()
                );
                None
            }
            Ok(None) => None,
            Err(err) => {
                tracing::warn!("Segmentation failed, masked stages pass through: {err:#}");
                None
            }
        }
    }
}

/// Crop back to the input extent. Upstream transforms may expand the
/// working canvas; the output contract is extent-preserving.
fn restore_extent(frame: RgbImage, width: u32, height: u32) -> RgbImage {
    let (w, h) = frame.dimensions();
    if (w, h) == (width, height) {
        return frame;
    }
    imageops::crop_imm(&frame, 0, 0, width.min(w), height.min(h)).to_image()
}
