use super::Mask;
use image::{imageops, GrayImage, Luma, RgbImage};
use ndarray::Array4;

/// Converts frames to model input tensors and model output back to masks.
pub struct Preprocessor {
    model_width: u32,
    model_height: u32,
}

impl Preprocessor {
    pub fn new(model_width: u32, model_height: u32) -> Self {
        Self {
            model_width,
            model_height,
        }
    }

    /// Resize a frame to the model resolution and lay it out as a
    /// normalized NCHW tensor with shape [1, 3, H, W].
    pub fn to_tensor(&self, frame: &RgbImage) -> Array4<f32> {
        let _span = tracing::debug_span!("preprocess").entered();

        let resized;
        let input = if frame.dimensions() == (self.model_width, self.model_height) {
            frame
        } else {
            resized = imageops::resize(
                frame,
                self.model_width,
                self.model_height,
                imageops::FilterType::Lanczos3,
            );
            &resized
        };

        let (width, height) = input.dimensions();
        let mut tensor = Array4::<f32>::zeros((1, 3, height as usize, width as usize));
        for (x, y, pixel) in input.enumerate_pixels() {
            for channel in 0..3 {
                tensor[[0, channel, y as usize, x as usize]] = pixel[channel] as f32 / 255.0;
            }
        }
        tensor
    }

    /// Resize a flat matte produced at model resolution back to the frame
    /// extent it belongs to.
    pub fn resize_matte(
        matte: &[f32],
        matte_width: u32,
        matte_height: u32,
        frame_width: u32,
        frame_height: u32,
    ) -> anyhow::Result<Mask> {
        let _span = tracing::debug_span!("postprocess").entered();

        if (matte_width, matte_height) == (frame_width, frame_height) {
            return Mask::new(frame_width, frame_height, matte.to_vec());
        }

        // Resample through an 8-bit gray plane; matte precision beyond
        // 1/255 carries no visible information.
        let gray = GrayImage::from_fn(matte_width, matte_height, |x, y| {
            let value = matte[(y * matte_width + x) as usize];
            Luma([(value * 255.0).clamp(0.0, 255.0) as u8])
        });
        let resized = imageops::resize(
            &gray,
            frame_width,
            frame_height,
            imageops::FilterType::Lanczos3,
        );

        let data: Vec<f32> = resized.pixels().map(|p| p[0] as f32 / 255.0).collect();
        Mask::new(frame_width, frame_height, data)
    }

    /// Render a mask as a grayscale frame for diagnostics.
    pub fn mask_to_rgb(mask: &Mask) -> RgbImage {
        let (width, height) = mask.dimensions();
        RgbImage::from_fn(width, height, |x, y| {
            let value = (mask.get(x, y) * 255.0).clamp(0.0, 255.0) as u8;
            image::Rgb([value, value, value])
        })
    }
}
