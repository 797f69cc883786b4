use super::FrameSink;
use anyhow::{Context, Result};
use image::{imageops, RgbImage};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use v4l::video::Output;
use v4l::{Device, Format, FourCC};

/// Virtual camera sink over a v4l2loopback device.
///
/// The format is negotiated through the v4l2 API, then raw YUYV frames are
/// written to the device file.
pub struct LoopbackSink {
    file: File,
    width: u32,
    height: u32,
}

impl LoopbackSink {
    pub fn new<P: AsRef<Path>>(device_path: P, width: u32, height: u32) -> Result<Self> {
        let path = device_path.as_ref();
        tracing::info!(
            "Opening v4l2loopback device {} at {}x{} YUYV",
            path.display(),
            width,
            height
        );

        {
            let device = Device::with_path(path).with_context(|| {
                format!("Failed to open v4l2loopback device {}", path.display())
            })?;
            let format = Format::new(width, height, FourCC::new(b"YUYV"));
            Output::set_format(&device, &format).with_context(|| {
                format!("Failed to set output format on {}", path.display())
            })?;
        }

        let file = File::options()
            .write(true)
            .open(path)
            .with_context(|| format!("Failed to open {} for writing", path.display()))?;

        Ok(Self {
            file,
            width,
            height,
        })
    }
}

impl FrameSink for LoopbackSink {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()> {
        let resized;
        let frame = if frame.dimensions() == (self.width, self.height) {
            frame
        } else {
            resized = imageops::resize(
                frame,
                self.width,
                self.height,
                imageops::FilterType::Lanczos3,
            );
            &resized
        };

        let yuyv = encode_yuyv(frame);
        self.file
            .write_all(&yuyv)
            .context("Failed to write frame to v4l2loopback device")?;
        Ok(())
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Pack an RGB frame as YUYV 4:2:2. Chroma is averaged over each
/// horizontal pixel pair; an odd trailing pixel pairs with itself.
fn encode_yuyv(frame: &RgbImage) -> Vec<u8> {
    let (width, height) = frame.dimensions();
    let mut out = Vec::with_capacity((width as usize + width as usize % 2) * height as usize * 2);

    for y in 0..height {
        let mut x = 0;
        while x < width {
            let first = frame.get_pixel(x, y);
            let second = frame.get_pixel((x + 1).min(width - 1), y);

            let (y0, u0, v0) = rgb_to_yuv(first[0], first[1], first[2]);
            let (y1, u1, v1) = rgb_to_yuv(second[0], second[1], second[2]);

            out.push(y0);
            out.push(((u0 as u16 + u1 as u16) / 2) as u8);
            out.push(y1);
            out.push(((v0 as u16 + v1 as u16) / 2) as u8);

            x += 2;
        }
    }

    out
}

/// BT.601 RGB to YUV.
fn rgb_to_yuv(r: u8, g: u8, b: u8) -> (u8, u8, u8) {
    let (r, g, b) = (r as f32, g as f32, b as f32);
    let y = (0.299 * r + 0.587 * g + 0.114 * b).clamp(0.0, 255.0) as u8;
    let u = ((-0.147 * r - 0.289 * g + 0.436 * b) + 128.0).clamp(0.0, 255.0) as u8;
    let v = ((0.615 * r - 0.515 * g - 0.100 * b) + 128.0).clamp(0.0, 255.0) as u8;
    (y, u, v)
}
