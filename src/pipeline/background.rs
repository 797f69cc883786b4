use super::StageError;
use crate::segmentation::Mask;
use crate::settings::BackgroundMode;
use image::{imageops, Rgb, RgbImage};
use std::collections::HashMap;

const LIGHT_BLUR_SIGMA: f32 = 10.0;
const STRONG_BLUR_SIGMA: f32 = 20.0;

/// Cover-fit result for one (mode, extent) pair. Valid until the mode
/// changes, the extent changes or the source image is replaced.
struct FittedBackground {
    mode: BackgroundMode,
    width: u32,
    height: u32,
    image: RgbImage,
}

/// Blends the source frame against a derived background using the
/// foreground mask.
///
/// Replacement images are registered by the caller; the compositor never
/// does file I/O. A missing mask or a missing replacement image degrades to
/// pass-through at the pipeline level via the returned error.
pub struct BackgroundCompositor {
    images: HashMap<BackgroundMode, RgbImage>,
    fitted: Option<FittedBackground>,
}

impl Default for BackgroundCompositor {
    fn default() -> Self {
        Self::new()
    }
}

impl BackgroundCompositor {
    pub fn new() -> Self {
        Self {
            images: HashMap::new(),
            fitted: None,
        }
    }

    /// Register the replacement image for an image-backed mode.
    pub fn set_background_image(&mut self, mode: BackgroundMode, image: RgbImage) {
        if !mode.needs_image() {
            tracing::warn!("Ignoring background image for mode {}", mode);
            return;
        }
        if self.fitted.as_ref().is_some_and(|f| f.mode == mode) {
            self.fitted = None;
        }
        self.images.insert(mode, image);
    }

    pub fn clear_background_image(&mut self, mode: BackgroundMode) {
        if self.fitted.as_ref().is_some_and(|f| f.mode == mode) {
            self.fitted = None;
        }
        self.images.remove(&mode);
    }

    /// Drop the derived background. Called when the active mode changes;
    /// the cached fit is only valid for the mode it was derived for.
    pub fn invalidate_cache(&mut self) {
        self.fitted = None;
    }

    /// Composite `frame` over the background for `mode`:
    /// `mask * frame + (1 - mask) * background` per pixel.
    pub(crate) fn apply(
        &mut self,
        frame: &RgbImage,
        mode: BackgroundMode,
        mask: Option<&Mask>,
    ) -> Result<RgbImage, StageError> {
        let mask = mask.ok_or(StageError::SegmentationUnavailable)?;
        if !mask.matches_extent(frame) {
            return Err(StageError::StageConstructionFailure(format!(
                "mask extent {:?} does not match frame extent {:?}",
                mask.dimensions(),
                frame.dimensions()
            )));
        }

        let _span = tracing::debug_span!("background_composite").entered();
        let background = self.background_for(frame, mode)?;
        Ok(blend(frame, &background, mask))
    }

    fn background_for(
        &mut self,
        frame: &RgbImage,
        mode: BackgroundMode,
    ) -> Result<RgbImage, StageError> {
        match mode {
            BackgroundMode::None => Err(StageError::StageConstructionFailure(
                "no background is defined for mode none".into(),
            )),
            BackgroundMode::LightBlur => Ok(imageops::blur(frame, LIGHT_BLUR_SIGMA)),
            BackgroundMode::StrongBlur => Ok(imageops::blur(frame, STRONG_BLUR_SIGMA)),
            BackgroundMode::Custom
            | BackgroundMode::Included1
            | BackgroundMode::Included2
            | BackgroundMode::Included3 => self.fitted_image(mode, frame.dimensions()),
        }
    }

    fn fitted_image(
        &mut self,
        mode: BackgroundMode,
        (width, height): (u32, u32),
    ) -> Result<RgbImage, StageError> {
        if let Some(fitted) = &self.fitted {
            if fitted.mode == mode && (fitted.width, fitted.height) == (width, height) {
                return Ok(fitted.image.clone());
            }
        }

        let source = self
            .images
            .get(&mode)
            .ok_or(StageError::BackgroundAssetMissing(mode))?;
        let image = cover_fit(source, width, height);
        self.fitted = Some(FittedBackground {
            mode,
            width,
            height,
            image: image.clone(),
        });
        Ok(image)
    }
}

/// Uniform scale plus center crop so `image` exactly fills the target
/// extent without distortion.
fn cover_fit(image: &RgbImage, target_width: u32, target_height: u32) -> RgbImage {
    let (width, height) = image.dimensions();
    let scale = (target_width as f32 / width as f32).max(target_height as f32 / height as f32);
    let scaled_width = ((width as f32 * scale).ceil() as u32).max(target_width);
    let scaled_height = ((height as f32 * scale).ceil() as u32).max(target_height);

    let scaled = imageops::resize(
        image,
        scaled_width,
        scaled_height,
        imageops::FilterType::Lanczos3,
    );
    let x = (scaled_width - target_width) / 2;
    let y = (scaled_height - target_height) / 2;
    imageops::crop_imm(&scaled, x, y, target_width, target_height).to_image()
}

fn blend(source: &RgbImage, background: &RgbImage, mask: &Mask) -> RgbImage {
    let (width, height) = source.dimensions();
    RgbImage::from_fn(width, height, |x, y| {
        let alpha = mask.get(x, y);
        let fg = source.get_pixel(x, y);
        let bg = background.get_pixel(x, y);
        let mut out = [0u8; 3];
        for c in 0..3 {
            let value = alpha * fg[c] as f32 + (1.0 - alpha) * bg[c] as f32;
            out[c] = value.round().clamp(0.0, 255.0) as u8;
        }
        Rgb(out)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(level: u8) -> RgbImage {
        RgbImage::from_pixel(16, 16, Rgb([level, level, level]))
    }

    #[test]
    fn test_full_mask_keeps_source() {
        let mut compositor = BackgroundCompositor::new();
        let source = frame(200);
        let mask = Mask::from_fn(16, 16, |_, _| 1.0);
        let out = compositor
            .apply(&source, BackgroundMode::StrongBlur, Some(&mask))
            .unwrap();
        assert_eq!(out, source);
    }

    #[test]
    fn test_zero_mask_shows_background() {
        let mut compositor = BackgroundCompositor::new();
        compositor.set_background_image(BackgroundMode::Custom, frame(10));
        let source = frame(200);
        let mask = Mask::from_fn(16, 16, |_, _| 0.0);
        let out = compositor
            .apply(&source, BackgroundMode::Custom, Some(&mask))
            .unwrap();
        assert_eq!(out, frame(10));
    }

    #[test]
    fn test_half_mask_blends() {
        let mut compositor = BackgroundCompositor::new();
        compositor.set_background_image(BackgroundMode::Custom, frame(0));
        let source = frame(200);
        let mask = Mask::from_fn(16, 16, |_, _| 0.5);
        let out = compositor
            .apply(&source, BackgroundMode::Custom, Some(&mask))
            .unwrap();
        assert_eq!(out.get_pixel(8, 8)[0], 100);
    }

    #[test]
    fn test_missing_mask_is_segmentation_unavailable() {
        let mut compositor = BackgroundCompositor::new();
        let err = compositor
            .apply(&frame(100), BackgroundMode::LightBlur, None)
            .unwrap_err();
        assert!(matches!(err, StageError::SegmentationUnavailable));
    }

    #[test]
    fn test_missing_image_is_background_asset_missing() {
        let mut compositor = BackgroundCompositor::new();
        let mask = Mask::from_fn(16, 16, |_, _| 0.5);
        let err = compositor
            .apply(&frame(100), BackgroundMode::Custom, Some(&mask))
            .unwrap_err();
        assert!(matches!(
            err,
            StageError::BackgroundAssetMissing(BackgroundMode::Custom)
        ));
    }

    #[test]
    fn test_mismatched_mask_extent_is_rejected() {
        let mut compositor = BackgroundCompositor::new();
        let mask = Mask::from_fn(8, 8, |_, _| 0.5);
        let err = compositor
            .apply(&frame(100), BackgroundMode::LightBlur, Some(&mask))
            .unwrap_err();
        assert!(matches!(err, StageError::StageConstructionFailure(_)));
    }

    #[test]
    fn test_cover_fit_fills_target_extent() {
        // 32x8 source into a 16x16 target: scale by 2 vertically, crop the
        // horizontal overshoot in the middle.
        let wide = RgbImage::from_fn(32, 8, |x, _| {
            if x < 16 {
                Rgb([255, 0, 0])
            } else {
                Rgb([0, 0, 255])
            }
        });
        let fitted = cover_fit(&wide, 16, 16);
        assert_eq!(fitted.dimensions(), (16, 16));
        // The center crop straddles the color boundary.
        assert!(fitted.get_pixel(1, 8)[0] > fitted.get_pixel(1, 8)[2]);
        assert!(fitted.get_pixel(14, 8)[2] > fitted.get_pixel(14, 8)[0]);
    }

    #[test]
    fn test_replacing_image_invalidates_fit() {
        let mut compositor = BackgroundCompositor::new();
        compositor.set_background_image(BackgroundMode::Custom, frame(10));
        let mask = Mask::from_fn(16, 16, |_, _| 0.0);
        let source = frame(200);

        let first = compositor
            .apply(&source, BackgroundMode::Custom, Some(&mask))
            .unwrap();
        assert_eq!(first.get_pixel(0, 0)[0], 10);

        compositor.set_background_image(BackgroundMode::Custom, frame(90));
        let second = compositor
            .apply(&source, BackgroundMode::Custom, Some(&mask))
            .unwrap();
        assert_eq!(second.get_pixel(0, 0)[0], 90);
    }
}
