use super::preprocess::Preprocessor;
use super::{Mask, SegmentationProvider};
use anyhow::{Context, Result};
use image::RgbImage;
use ndarray::Array4;
use ort::{GraphOptimizationLevel, Session};
use std::path::Path;

/// Recurrent hidden state carried between frames.
///
/// RVM feeds four feature maps from each inference back into the next one
/// for temporally stable mattes.
struct RecurrentState {
    r1: Array4<f32>,
    r2: Array4<f32>,
    r3: Array4<f32>,
    r4: Array4<f32>,
}

impl RecurrentState {
    fn zeroed(model_width: u32, model_height: u32, downsample_ratio: f32) -> Self {
        let h = (model_height as f32 * downsample_ratio) as usize;
        let w = (model_width as f32 * downsample_ratio) as usize;
        tracing::debug!("Initializing recurrent state at {}x{}", w, h);
        Self {
            r1: Array4::zeros((1, 16, h, w)),
            r2: Array4::zeros((1, 20, h / 2, w / 2)),
            r3: Array4::zeros((1, 24, h / 4, w / 4)),
            r4: Array4::zeros((1, 28, h / 8, w / 8)),
        }
    }
}

/// RobustVideoMatting person segmentation over ONNX Runtime.
pub struct RobustVideoMatting {
    session: Session,
    preprocessor: Preprocessor,
    model_width: u32,
    model_height: u32,
    downsample_ratio: f32,
    state: Option<RecurrentState>,
}

impl RobustVideoMatting {
    /// Load an RVM ONNX model. Inference runs at 512x512 with hidden
    /// states at a quarter of that resolution, a reasonable quality and
    /// latency balance for webcam frames.
    pub fn new<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        let path = model_path.as_ref();
        tracing::info!("Loading RVM model from {}", path.display());

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(4)?
            .commit_from_file(path)
            .with_context(|| format!("Failed to load model from {}", path.display()))?;

        tracing::info!("RVM model loaded");

        let (model_width, model_height) = (512, 512);
        Ok(Self {
            session,
            preprocessor: Preprocessor::new(model_width, model_height),
            model_width,
            model_height,
            downsample_ratio: 0.25,
            state: None,
        })
    }

    fn take_state(&mut self) -> RecurrentState {
        self.state.take().unwrap_or_else(|| {
            RecurrentState::zeroed(self.model_width, self.model_height, self.downsample_ratio)
        })
    }
}

impl SegmentationProvider for RobustVideoMatting {
    fn segment(&mut self, frame: &RgbImage) -> Result<Option<Mask>> {
        let _span = tracing::debug_span!("rvm_segment").entered();

        let input = self.preprocessor.to_tensor(frame);
        let state = self.take_state();

        // Model I/O contract: inputs (src, r1..r4), outputs
        // (fgr, pha, r1..r4). Only pha and the updated state are used.
        let outputs = {
            let _infer = tracing::debug_span!("inference").entered();
            self.session
                .run(ort::inputs![
                    input.view(),
                    state.r1.view(),
                    state.r2.view(),
                    state.r3.view(),
                    state.r4.view()
                ]?)
                .context("Failed to run inference")?
        };

        let pha = outputs[1].try_extract_tensor::<f32>()?.view().to_owned();

        self.state = Some(RecurrentState {
            r1: outputs[2]
                .try_extract_tensor::<f32>()?
                .view()
                .to_owned()
                .into_dimensionality()?,
            r2: outputs[3]
                .try_extract_tensor::<f32>()?
                .view()
                .to_owned()
                .into_dimensionality()?,
            r3: outputs[4]
                .try_extract_tensor::<f32>()?
                .view()
                .to_owned()
                .into_dimensionality()?,
            r4: outputs[5]
                .try_extract_tensor::<f32>()?
                .view()
                .to_owned()
                .into_dimensionality()?,
        });

        // pha has shape [1, 1, H, W]
        let shape = pha.shape();
        let (matte_height, matte_width) = (shape[2] as u32, shape[3] as u32);
        let matte: Vec<f32> = pha.iter().copied().collect();

        let (frame_width, frame_height) = frame.dimensions();
        let mask = Preprocessor::resize_matte(
            &matte,
            matte_width,
            matte_height,
            frame_width,
            frame_height,
        )?;

        Ok(Some(mask))
    }

    fn reset(&mut self) {
        tracing::info!("Resetting RVM recurrent state");
        self.state = None;
    }
}
