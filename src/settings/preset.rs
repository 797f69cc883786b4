use super::{BackgroundMode, Settings};
use serde::{Deserialize, Serialize};

/// A named, persisted bundle of a background mode and a full settings
/// snapshot.
///
/// `image_path` points at the replacement image for image-backed modes; the
/// caller resolves it to pixels and registers the result on the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preset {
    pub name: String,
    #[serde(rename = "type")]
    pub mode: BackgroundMode,
    pub settings: Settings,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
}

impl Preset {
    pub fn new(name: impl Into<String>, settings: Settings) -> Self {
        Self {
            name: name.into(),
            mode: settings.background_mode,
            settings,
            image_path: None,
        }
    }

    pub fn with_image_path(mut self, path: impl Into<String>) -> Self {
        self.image_path = Some(path.into());
        self
    }
}
