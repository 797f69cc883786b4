use crate::settings::Settings;
use image::{imageops, GrayImage, Luma, Rgb, RgbImage};

// BT.709 luma weights, shared with the smoothing stage.
pub(crate) const LUMA_WEIGHTS: [f32; 3] = [0.2126, 0.7152, 0.0722];

const BASELINE_KELVIN: f32 = 6500.0;
const WARMTH_KELVIN_RANGE: f32 = 1000.0;

/// The closed set of color operations, applied in `STAGE_ORDER`.
///
/// The order is part of the stage contract: brightness and contrast run on
/// the raw channels, saturation and warmth on the result, sharpness last on
/// the final luminance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColorOp {
    Brightness,
    Contrast,
    Saturation,
    Warmth,
    Sharpness,
}

const STAGE_ORDER: [ColorOp; 5] = [
    ColorOp::Brightness,
    ColorOp::Contrast,
    ColorOp::Saturation,
    ColorOp::Warmth,
    ColorOp::Sharpness,
];

impl ColorOp {
    /// An op at its neutral parameter is skipped; this runs once per
    /// captured frame and neutral sliders are the common case.
    fn is_neutral(self, settings: &Settings) -> bool {
        match self {
            ColorOp::Brightness => settings.brightness == 0.0,
            ColorOp::Contrast => settings.contrast == 1.0,
            ColorOp::Saturation => settings.saturation == 1.0,
            ColorOp::Warmth => settings.warmth == 0.0,
            ColorOp::Sharpness => settings.sharpness == 0.0,
        }
    }

    fn apply(self, frame: &RgbImage, settings: &Settings) -> RgbImage {
        match self {
            ColorOp::Brightness => {
                let offset = settings.brightness * 255.0;
                map_channels(frame, |v| v + offset)
            }
            ColorOp::Contrast => {
                let scale = settings.contrast;
                map_channels(frame, |v| (v - 128.0) * scale + 128.0)
            }
            ColorOp::Saturation => saturate(frame, settings.saturation),
            ColorOp::Warmth => shift_temperature(frame, settings.warmth),
            ColorOp::Sharpness => sharpen(frame, settings.sharpness),
        }
    }
}

/// Apply all non-neutral color adjustments in their fixed order.
pub(crate) fn apply(frame: &RgbImage, settings: &Settings) -> RgbImage {
    let mut out = frame.clone();
    for op in STAGE_ORDER {
        if !op.is_neutral(settings) {
            out = op.apply(&out, settings);
        }
    }
    out
}

#[inline]
pub(crate) fn luma(pixel: &Rgb<u8>) -> f32 {
    LUMA_WEIGHTS[0] * pixel[0] as f32
        + LUMA_WEIGHTS[1] * pixel[1] as f32
        + LUMA_WEIGHTS[2] * pixel[2] as f32
}

#[inline]
fn to_u8(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

fn map_channels<F: Fn(f32) -> f32>(frame: &RgbImage, f: F) -> RgbImage {
    let (width, height) = frame.dimensions();
    RgbImage::from_fn(width, height, |x, y| {
        let p = frame.get_pixel(x, y);
        Rgb([
            to_u8(f(p[0] as f32)),
            to_u8(f(p[1] as f32)),
            to_u8(f(p[2] as f32)),
        ])
    })
}

fn saturate(frame: &RgbImage, amount: f32) -> RgbImage {
    let (width, height) = frame.dimensions();
    RgbImage::from_fn(width, height, |x, y| {
        let p = frame.get_pixel(x, y);
        let l = luma(p);
        Rgb([
            to_u8(l + (p[0] as f32 - l) * amount),
            to_u8(l + (p[1] as f32 - l) * amount),
            to_u8(l + (p[2] as f32 - l) * amount),
        ])
    })
}

/// Blackbody color for a temperature in Kelvin (Tanner Helland's
/// approximation), as 0-255 channel intensities.
fn kelvin_to_rgb(kelvin: f32) -> [f32; 3] {
    let t = kelvin / 100.0;
    let r = if t <= 66.0 {
        255.0
    } else {
        329.698727446 * (t - 60.0).powf(-0.1332047592)
    };
    let g = if t <= 66.0 {
        99.4708025861 * t.ln() - 161.1195681661
    } else {
        288.1221695283 * (t - 60.0).powf(-0.0755148492)
    };
    let b = if t >= 66.0 {
        255.0
    } else if t <= 19.0 {
        0.0
    } else {
        138.5177312231 * (t - 10.0).ln() - 305.0447927307
    };
    [
        r.clamp(0.0, 255.0),
        g.clamp(0.0, 255.0),
        b.clamp(0.0, 255.0),
    ]
}

/// White-balance shift: positive warmth compensates toward a higher-Kelvin
/// illuminant, which renders the frame warmer; negative renders it cooler.
fn shift_temperature(frame: &RgbImage, warmth: f32) -> RgbImage {
    let target = BASELINE_KELVIN + warmth * WARMTH_KELVIN_RANGE;
    let base = kelvin_to_rgb(BASELINE_KELVIN);
    let illuminant = kelvin_to_rgb(target);

    // Gains normalized on green so overall exposure stays put.
    let green_ratio = base[1] / illuminant[1];
    let gains = [
        (base[0] / illuminant[0]) / green_ratio,
        1.0,
        (base[2] / illuminant[2]) / green_ratio,
    ];

    let (width, height) = frame.dimensions();
    RgbImage::from_fn(width, height, |x, y| {
        let p = frame.get_pixel(x, y);
        Rgb([
            to_u8(p[0] as f32 * gains[0]),
            to_u8(p[1] as f32 * gains[1]),
            to_u8(p[2] as f32 * gains[2]),
        ])
    })
}

/// Unsharp enhancement in the luminance domain: the difference between the
/// luma plane and its gaussian blur is added back to every channel, so
/// chroma noise is not amplified.
fn sharpen(frame: &RgbImage, amount: f32) -> RgbImage {
    let (width, height) = frame.dimensions();
    let gray = GrayImage::from_fn(width, height, |x, y| {
        Luma([to_u8(luma(frame.get_pixel(x, y)))])
    });
    let blurred = imageops::blur(&gray, 1.0);

    RgbImage::from_fn(width, height, |x, y| {
        let p = frame.get_pixel(x, y);
        let delta = gray.get_pixel(x, y)[0] as f32 - blurred.get_pixel(x, y)[0] as f32;
        let boost = delta * amount;
        Rgb([
            to_u8(p[0] as f32 + boost),
            to_u8(p[1] as f32 + boost),
            to_u8(p[2] as f32 + boost),
        ])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gray_frame(width: u32, height: u32, level: u8) -> RgbImage {
        RgbImage::from_pixel(width, height, Rgb([level, level, level]))
    }

    #[test]
    fn test_all_neutral_is_pixel_identical() {
        let frame = RgbImage::from_fn(16, 16, |x, y| Rgb([x as u8 * 10, y as u8 * 10, 77]));
        let out = apply(&frame, &Settings::default());
        assert_eq!(out, frame);
    }

    #[test]
    fn test_brightness_offsets_uniformly() {
        let frame = gray_frame(100, 100, 128);
        let settings = Settings {
            brightness: 0.2,
            ..Settings::default()
        };
        let out = apply(&frame, &settings);
        assert_eq!(out.dimensions(), (100, 100));
        let expected = (128.0 + 0.2 * 255.0_f32).round() as u8;
        for pixel in out.pixels() {
            assert_eq!(pixel.0, [expected; 3]);
        }
    }

    #[test]
    fn test_contrast_scales_around_midpoint() {
        let mut frame = gray_frame(4, 1, 128);
        frame.put_pixel(0, 0, Rgb([64, 64, 64]));
        frame.put_pixel(1, 0, Rgb([192, 192, 192]));
        let settings = Settings {
            contrast: 1.5,
            ..Settings::default()
        };
        let out = apply(&frame, &settings);
        assert_eq!(out.get_pixel(0, 0)[0], 32); // (64-128)*1.5+128
        assert_eq!(out.get_pixel(1, 0)[0], 224);
        assert_eq!(out.get_pixel(2, 0)[0], 128); // midpoint is a fixpoint
    }

    #[test]
    fn test_zero_saturation_removes_chroma() {
        let frame = RgbImage::from_pixel(4, 4, Rgb([200, 40, 90]));
        let settings = Settings {
            saturation: 0.0,
            ..Settings::default()
        };
        let out = apply(&frame, &settings);
        let p = out.get_pixel(0, 0);
        assert_eq!(p[0], p[1]);
        assert_eq!(p[1], p[2]);
    }

    #[test]
    fn test_positive_warmth_raises_red_over_blue() {
        let frame = gray_frame(4, 4, 128);
        let settings = Settings {
            warmth: 1.0,
            ..Settings::default()
        };
        let out = apply(&frame, &settings);
        let p = out.get_pixel(0, 0);
        assert!(p[0] > p[2], "expected warm shift, got {:?}", p);
    }

    #[test]
    fn test_negative_warmth_raises_blue_over_red() {
        let frame = gray_frame(4, 4, 128);
        let settings = Settings {
            warmth: -1.0,
            ..Settings::default()
        };
        let out = apply(&frame, &settings);
        let p = out.get_pixel(0, 0);
        assert!(p[2] > p[0], "expected cool shift, got {:?}", p);
    }

    #[test]
    fn test_sharpness_on_flat_frame_is_identity() {
        let frame = gray_frame(8, 8, 90);
        let settings = Settings {
            sharpness: 1.0,
            ..Settings::default()
        };
        let out = apply(&frame, &settings);
        assert_eq!(out, frame);
    }

    #[test]
    fn test_sharpness_increases_edge_contrast() {
        let mut frame = gray_frame(16, 16, 60);
        for y in 0..16 {
            for x in 8..16 {
                frame.put_pixel(x, y, Rgb([180, 180, 180]));
            }
        }
        let settings = Settings {
            sharpness: 1.0,
            ..Settings::default()
        };
        let out = apply(&frame, &settings);
        // The bright side of the edge overshoots, the dark side undershoots.
        assert!(out.get_pixel(8, 8)[0] >= 180);
        assert!(out.get_pixel(7, 8)[0] <= 60);
        assert!(out.get_pixel(8, 8)[0] > out.get_pixel(15, 8)[0] || out.get_pixel(7, 8)[0] < out.get_pixel(0, 8)[0]);
    }
}
