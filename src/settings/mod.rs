mod preset;
mod store;
mod transition;

pub use preset::Preset;
pub use store::PresetStore;
pub use transition::SettingsTransition;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Background treatment applied behind the segmented person.
///
/// `Custom` and the `Included*` slots both resolve to a replacement image
/// registered on the pipeline by the caller; the pixel data itself is never
/// part of the settings value or the persisted record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BackgroundMode {
    None,
    LightBlur,
    StrongBlur,
    Custom,
    Included1,
    Included2,
    Included3,
}

impl BackgroundMode {
    /// Whether this mode needs a replacement image to be registered.
    pub fn needs_image(self) -> bool {
        matches!(
            self,
            BackgroundMode::Custom
                | BackgroundMode::Included1
                | BackgroundMode::Included2
                | BackgroundMode::Included3
        )
    }
}

impl fmt::Display for BackgroundMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BackgroundMode::None => "none",
            BackgroundMode::LightBlur => "light-blur",
            BackgroundMode::StrongBlur => "strong-blur",
            BackgroundMode::Custom => "custom",
            BackgroundMode::Included1 => "included-1",
            BackgroundMode::Included2 => "included-2",
            BackgroundMode::Included3 => "included-3",
        };
        f.write_str(name)
    }
}

impl FromStr for BackgroundMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(BackgroundMode::None),
            "light-blur" => Ok(BackgroundMode::LightBlur),
            "strong-blur" => Ok(BackgroundMode::StrongBlur),
            "custom" => Ok(BackgroundMode::Custom),
            "included-1" => Ok(BackgroundMode::Included1),
            "included-2" => Ok(BackgroundMode::Included2),
            "included-3" => Ok(BackgroundMode::Included3),
            other => Err(format!("unknown background mode '{}'", other)),
        }
    }
}

/// One snapshot of every user-adjustable effect parameter.
///
/// Settings are plain values: the pipeline consumes one snapshot per frame
/// and never mutates it. Equality is structural over the scalar fields, the
/// background mode and the mirror flag, which is exactly what the persisted
/// record covers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Skin smoothing strength, 0.0 (off) to 1.0.
    pub skin_smoothing_amount: f32,
    /// Additive brightness, -1.0 to 1.0, neutral 0.0.
    pub brightness: f32,
    /// Contrast scale around the midpoint, 0.0 to 2.0, neutral 1.0.
    pub contrast: f32,
    /// Chroma scale, 0.0 (grayscale) to 2.0, neutral 1.0.
    pub saturation: f32,
    /// Color temperature shift, -1.0 (cool) to 1.0 (warm), neutral 0.0.
    pub warmth: f32,
    /// Unsharp enhancement strength, 0.0 (off) to 1.0.
    pub sharpness: f32,
    #[serde(rename = "backgroundPreset")]
    pub background_mode: BackgroundMode,
    pub mirror_video: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            skin_smoothing_amount: 0.0,
            brightness: 0.0,
            contrast: 1.0,
            saturation: 1.0,
            warmth: 0.0,
            sharpness: 0.0,
            background_mode: BackgroundMode::None,
            mirror_video: false,
        }
    }
}

impl Settings {
    /// Clamp every scalar to its documented range.
    ///
    /// Persisted records and CLI flags go through this before reaching the
    /// pipeline, so the stages can assume in-range parameters.
    pub fn clamped(mut self) -> Self {
        self.skin_smoothing_amount = self.skin_smoothing_amount.clamp(0.0, 1.0);
        self.brightness = self.brightness.clamp(-1.0, 1.0);
        self.contrast = self.contrast.clamp(0.0, 2.0);
        self.saturation = self.saturation.clamp(0.0, 2.0);
        self.warmth = self.warmth.clamp(-1.0, 1.0);
        self.sharpness = self.sharpness.clamp(0.0, 1.0);
        self
    }
}
