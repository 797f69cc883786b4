pub mod capture;
pub mod output;
pub mod pipeline;
pub mod segmentation;
pub mod settings;

pub use pipeline::{EffectPipeline, StageError};
pub use segmentation::{Mask, SegmentationProvider};
pub use settings::{BackgroundMode, Preset, PresetStore, Settings, SettingsTransition};
