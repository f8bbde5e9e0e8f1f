use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use storyreel_core::history::History;
use storyreel_core::limits::EditorLimits;
use storyreel_core::session::Session;
use storyreel_core::timeline::Timeline;
use tracing::debug;

/// The single owner of the session's timeline and history. Components get
/// borrowed access to these for the duration of one operation.
pub struct EditorState {
    pub session: Session,
    pub timeline: Timeline,
    pub history: History,
    path: PathBuf,
}

impl EditorState {
    pub fn load(path: impl Into<PathBuf>, limits: EditorLimits) -> Result<Self> {
        let path = path.into();
        let mut session = Session::load_or_default(&path)
            .with_context(|| format!("could not read session {}", path.display()))?;
        let timeline = Timeline::with_clips(std::mem::take(&mut session.timeline), limits)
            .with_context(|| format!("session {} has invalid clips", path.display()))?;
        debug!(path = %path.display(), clips = timeline.len(), "session loaded");
        Ok(Self {
            session,
            timeline,
            history: History::default(),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&mut self) -> Result<()> {
        self.session.timeline = self.timeline.clips().to_vec();
        self.session
            .save_to_file(&self.path)
            .with_context(|| format!("could not write session {}", self.path.display()))?;
        debug!(path = %self.path.display(), "session saved");
        Ok(())
    }
}
