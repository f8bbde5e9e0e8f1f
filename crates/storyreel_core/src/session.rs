use crate::error::{CoreError, Result};
use crate::importer::import_scenes;
use crate::types::{ClipEntry, SceneSuggestion};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::Path;
use tracing::info;
use uuid::Uuid;

/// Everything one editing session carries between steps and invocations:
/// the wizard inputs, the pasted AI storyboard, the suggestions not yet
/// paired with a file, and the timeline itself.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub id: Uuid,
    #[serde(default)]
    pub video_script: Option<String>,
    #[serde(default)]
    pub audio_duration: Option<f64>,
    /// Raw pasted text, kept so an import can be re-run or inspected.
    #[serde(default)]
    pub visual_timeline: Option<String>,
    /// Suggestions waiting for an upload, in pairing order.
    #[serde(default)]
    pub pending_scenes: VecDeque<SceneSuggestion>,
    #[serde(default)]
    pub timeline: Vec<ClipEntry>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            video_script: None,
            audio_duration: None,
            visual_timeline: None,
            pending_scenes: VecDeque::new(),
            timeline: vec![],
        }
    }

    /// Parse pasted AI text and, only if that succeeds, replace the cached
    /// text and the pending suggestions. Returns how many scenes were found.
    pub fn import_visual_timeline(&mut self, text: &str) -> Result<usize> {
        let scenes = import_scenes(text)?;
        let count = scenes.len();
        self.visual_timeline = Some(text.to_string());
        self.pending_scenes = scenes.into();
        info!(count, "imported scene suggestions");
        Ok(count)
    }

    /// Save session to a file as pretty-printed JSON.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load a session from a JSON file.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        let session: Session = serde_json::from_str(&data)?;
        Ok(session)
    }

    /// Like `load_from_file`, but a missing file starts a fresh session.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        match Self::load_from_file(path) {
            Err(CoreError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::new()),
            other => other,
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
