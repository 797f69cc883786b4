use super::Preset;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Preset catalog backed by a single JSON file.
///
/// The store is loaded once at startup and handed to whoever needs it; every
/// mutation writes the file back immediately, so there is no separate save
/// step to forget and no global shared state.
pub struct PresetStore {
    path: PathBuf,
    presets: Vec<Preset>,
}

impl PresetStore {
    /// Load the catalog from `path`. A missing file yields an empty store;
    /// a present but unreadable or malformed file is an error.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let presets = if path.exists() {
            let raw = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read preset file {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("Failed to parse preset file {}", path.display()))?
        } else {
            tracing::info!("No preset file at {}, starting empty", path.display());
            Vec::new()
        };

        Ok(Self { path, presets })
    }

    pub fn get(&self, name: &str) -> Option<&Preset> {
        self.presets.iter().find(|p| p.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.presets.iter().map(|p| p.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }

    /// Insert or replace a preset by name and flush the catalog to disk.
    pub fn upsert(&mut self, preset: Preset) -> Result<()> {
        match self.presets.iter_mut().find(|p| p.name == preset.name) {
            Some(existing) => *existing = preset,
            None => self.presets.push(preset),
        }
        self.flush()
    }

    /// Remove a preset by name and flush. Removing an unknown name is a
    /// no-op that still returns Ok.
    pub fn remove(&mut self, name: &str) -> Result<()> {
        let before = self.presets.len();
        self.presets.retain(|p| p.name != name);
        if self.presets.len() == before {
            return Ok(());
        }
        self.flush()
    }

    fn flush(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create preset directory {}", parent.display())
                })?;
            }
        }
        let raw = serde_json::to_string_pretty(&self.presets)?;
        fs::write(&self.path, raw)
            .with_context(|| format!("Failed to write preset file {}", self.path.display()))?;
        tracing::debug!("Flushed {} presets to {}", self.presets.len(), self.path.display());
        Ok(())
    }
}
