use super::color::luma;
use crate::segmentation::Mask;
use image::{imageops, Rgb, RgbImage};

// Blur radii as multiples of the intensity slider.
const COARSE_RADIUS_SCALE: f32 = 8.0;
const FINE_RADIUS_SCALE: f32 = 2.0;

// Contrast boosts for the two luminance masks. The edge mask is steep so
// real edges stay sharp; the detail mask is milder and only pulls fine
// texture back in.
const EDGE_BOOST: f32 = 4.0;
const DETAIL_BOOST: f32 = 1.5;

/// Edge-preserving skin smoothing.
///
/// Two gaussian passes at different radii are combined under a
/// luminance-derived edge mask, then a milder detail mask blends the result
/// back toward the original. When a foreground mask is supplied the
/// smoothed result only lands inside the foreground; without one it applies
/// to the whole frame.
pub(crate) fn apply(frame: &RgbImage, intensity: f32, mask: Option<&Mask>) -> RgbImage {
    // Checked before any blur is attempted.
    if intensity <= 0.0 {
        return frame.clone();
    }
    let intensity = intensity.min(1.0);

    let _span = tracing::debug_span!("skin_smoothing").entered();

    // Coarse pass removes large blemishes, fine pass keeps skin texture.
    let coarse = imageops::blur(frame, intensity * COARSE_RADIUS_SCALE);
    let fine = imageops::blur(frame, intensity * FINE_RADIUS_SCALE);

    let (width, height) = frame.dimensions();
    RgbImage::from_fn(width, height, |x, y| {
        let original = frame.get_pixel(x, y);
        let coarse_px = coarse.get_pixel(x, y);
        let fine_px = fine.get_pixel(x, y);

        // Local contrast of the luminance plane, boosted and clamped.
        let contrast = (luma(original) - luma(coarse_px)).abs() / 255.0;
        let edge = (contrast * EDGE_BOOST).clamp(0.0, 1.0);
        let detail = (contrast * DETAIL_BOOST).clamp(0.0, 1.0);

        let gate = mask.map_or(1.0, |m| m.get(x, y));

        let mut out = [0u8; 3];
        for c in 0..3 {
            // High-contrast pixels keep the fine blur, flat ones the coarse.
            let combined =
                edge * fine_px[c] as f32 + (1.0 - edge) * coarse_px[c] as f32;
            let retained = detail * original[c] as f32 + (1.0 - detail) * combined;
            let gated = gate * retained + (1.0 - gate) * original[c] as f32;
            out[c] = gated.round().clamp(0.0, 255.0) as u8;
        }
        Rgb(out)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checkerboard(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            if (x + y) % 2 == 0 {
                Rgb([255, 255, 255])
            } else {
                Rgb([0, 0, 0])
            }
        })
    }

    #[test]
    fn test_zero_intensity_is_pass_through() {
        let frame = checkerboard(16, 16);
        assert_eq!(apply(&frame, 0.0, None), frame);
    }

    #[test]
    fn test_extent_is_preserved() {
        let frame = checkerboard(33, 17);
        assert_eq!(apply(&frame, 0.7, None).dimensions(), (33, 17));
    }

    #[test]
    fn test_flat_frame_stays_flat() {
        let frame = RgbImage::from_pixel(16, 16, Rgb([120, 120, 120]));
        let out = apply(&frame, 1.0, None);
        for pixel in out.pixels() {
            for c in 0..3 {
                assert!((pixel[c] as i16 - 120).abs() <= 1);
            }
        }
    }

    #[test]
    fn test_smoothing_reduces_local_contrast() {
        let frame = checkerboard(32, 32);
        let out = apply(&frame, 1.0, None);
        // Away from the borders, the harsh 0/255 alternation must have
        // moved toward the mean.
        let p = out.get_pixel(16, 16)[0] as i16;
        let q = out.get_pixel(17, 16)[0] as i16;
        assert!((p - q).abs() < 255);
    }

    #[test]
    fn test_zero_mask_leaves_frame_untouched() {
        let frame = checkerboard(16, 16);
        let mask = Mask::from_fn(16, 16, |_, _| 0.0);
        assert_eq!(apply(&frame, 1.0, Some(&mask)), frame);
    }

    #[test]
    fn test_full_mask_matches_global_smoothing() {
        let frame = checkerboard(16, 16);
        let mask = Mask::from_fn(16, 16, |_, _| 1.0);
        assert_eq!(apply(&frame, 1.0, Some(&mask)), apply(&frame, 1.0, None));
    }

    #[test]
    fn test_mask_gates_smoothing_to_foreground() {
        let frame = checkerboard(32, 16);
        // Foreground on the left half only.
        let mask = Mask::from_fn(32, 16, |x, _| if x < 16 { 1.0 } else { 0.0 });
        let out = apply(&frame, 1.0, Some(&mask));
        // Right half is untouched.
        for y in 0..16 {
            for x in 16..32 {
                assert_eq!(out.get_pixel(x, y), frame.get_pixel(x, y));
            }
        }
        // Left half changed somewhere.
        let changed = (0..16)
            .flat_map(|y| (0..16u32).map(move |x| (x, y)))
            .any(|(x, y)| out.get_pixel(x, y) != frame.get_pixel(x, y));
        assert!(changed);
    }
}
