//! Inline preview of a single timeline clip.
//!
//! The controller owns whatever is currently on screen and always clears it
//! before showing the next clip. Failures never escape: they are logged and
//! the caller gets a placeholder status instead.

use crate::error::{PreviewError, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::path::{Path, PathBuf};
use storyreel_core::timeline::Timeline;
use storyreel_core::types::{ClipEntry, MediaKind};
use tracing::{debug, warn};
use uuid::Uuid;

/// Something that can put one piece of media on screen at a time.
pub trait PreviewSurface {
    /// Show a still image, removing it after `duration` seconds.
    fn show_image(&mut self, path: &Path, duration: f64) -> Result<()>;

    /// Play a video or animated gif with native playback.
    fn play(&mut self, path: &Path) -> Result<()>;

    /// Remove whatever is currently shown. Must succeed when nothing is.
    fn teardown(&mut self) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum PreviewStatus {
    Showing { index: usize, kind: MediaKind },
    /// Nothing could be shown; the UI should display a placeholder.
    Placeholder,
}

#[derive(Debug)]
struct ActivePreview {
    index: usize,
    /// Decoded inline data, deleted on teardown.
    scratch: Option<PathBuf>,
}

pub struct PreviewController<S: PreviewSurface> {
    surface: S,
    media_dir: PathBuf,
    active: Option<ActivePreview>,
}

impl<S: PreviewSurface> PreviewController<S> {
    /// `media_dir` is where uploaded files are looked up when a clip has no
    /// inline data.
    pub fn new(surface: S, media_dir: impl Into<PathBuf>) -> Self {
        Self {
            surface,
            media_dir: media_dir.into(),
            active: None,
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn active_index(&self) -> Option<usize> {
        self.active.as_ref().map(|a| a.index)
    }

    /// Preview the clip at `index`, replacing any current preview.
    pub fn preview(&mut self, timeline: &Timeline, index: usize) -> PreviewStatus {
        self.clear();

        match self.show(timeline, index) {
            Ok(kind) => PreviewStatus::Showing { index, kind },
            Err(e) => {
                warn!(index, error = %e, "preview failed");
                PreviewStatus::Placeholder
            }
        }
    }

    /// Tear down the current preview, if any.
    pub fn clear(&mut self) {
        if let Err(e) = self.surface.teardown() {
            warn!(error = %e, "preview teardown failed");
        }
        if let Some(active) = self.active.take() {
            if let Some(scratch) = active.scratch {
                if let Err(e) = std::fs::remove_file(&scratch) {
                    debug!(path = %scratch.display(), error = %e, "could not remove scratch file");
                }
            }
        }
    }

    fn show(&mut self, timeline: &Timeline, index: usize) -> Result<MediaKind> {
        let clip = timeline.get(index).ok_or(PreviewError::IndexOutOfRange {
            index,
            len: timeline.len(),
        })?;
        let kind = clip.media_kind();

        let (path, scratch) = match clip.file_data.as_deref() {
            Some(data) if !data.is_empty() => {
                let path = decode_to_scratch(clip, data)?;
                (path.clone(), Some(path))
            }
            _ => (self.resolve(&clip.filename)?, None),
        };

        // Register before showing so a failed show still cleans up.
        self.active = Some(ActivePreview { index, scratch });

        debug!(index, kind = kind.as_str(), path = %path.display(), "showing preview");
        match kind {
            MediaKind::Image => self.surface.show_image(&path, clip.duration)?,
            MediaKind::Video | MediaKind::Gif => self.surface.play(&path)?,
        }
        Ok(kind)
    }

    fn resolve(&self, filename: &str) -> Result<PathBuf> {
        let path = self.media_dir.join(filename);
        if path.is_file() {
            Ok(path)
        } else {
            Err(PreviewError::MediaNotFound(path))
        }
    }
}

impl<S: PreviewSurface> Drop for PreviewController<S> {
    fn drop(&mut self) {
        self.clear();
    }
}

/// Decode base64 (optionally wrapped in a `data:` URL) into a temp file that
/// keeps the clip's extension so the player can sniff the format.
fn decode_to_scratch(clip: &ClipEntry, data: &str) -> Result<PathBuf> {
    let payload = match data.split_once(";base64,") {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => data,
    };
    let bytes = STANDARD.decode(payload.trim())?;

    let ext = Path::new(&clip.filename)
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| "bin".into());
    let path = std::env::temp_dir().join(format!("storyreel-preview-{}.{ext}", Uuid::new_v4()));
    std::fs::write(&path, bytes)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Image(PathBuf, f64),
        Play(PathBuf),
        Teardown,
    }

    #[derive(Default)]
    struct FakeSurface {
        calls: Vec<Call>,
        fail_play: bool,
    }

    impl PreviewSurface for FakeSurface {
        fn show_image(&mut self, path: &Path, duration: f64) -> Result<()> {
            self.calls.push(Call::Image(path.to_path_buf(), duration));
            Ok(())
        }

        fn play(&mut self, path: &Path) -> Result<()> {
            if self.fail_play {
                return Err(PreviewError::Player("codec missing".into()));
            }
            self.calls.push(Call::Play(path.to_path_buf()));
            Ok(())
        }

        fn teardown(&mut self) -> Result<()> {
            self.calls.push(Call::Teardown);
            Ok(())
        }
    }

    fn setup(files: &[&str]) -> (TempDir, Timeline) {
        let dir = TempDir::new().unwrap();
        let mut tl = Timeline::default();
        for name in files {
            std::fs::write(dir.path().join(name), b"media").unwrap();
            tl.append(ClipEntry::new(*name)).unwrap();
        }
        (dir, tl)
    }

    #[test]
    fn image_is_shown_for_its_duration() {
        let (dir, tl) = setup(&["logo.png"]);
        let mut ctl = PreviewController::new(FakeSurface::default(), dir.path());

        let status = ctl.preview(&tl, 0);
        assert_eq!(
            status,
            PreviewStatus::Showing {
                index: 0,
                kind: MediaKind::Image
            }
        );
        assert_eq!(
            ctl.surface().calls,
            vec![Call::Teardown, Call::Image(dir.path().join("logo.png"), 5.0)]
        );
        assert_eq!(ctl.active_index(), Some(0));
    }

    #[test]
    fn previous_preview_is_torn_down_first() {
        let (dir, tl) = setup(&["a.png", "b.mp4", "c.gif"]);
        let mut ctl = PreviewController::new(FakeSurface::default(), dir.path());

        ctl.preview(&tl, 0);
        ctl.preview(&tl, 1);
        assert_eq!(
            ctl.preview(&tl, 2),
            PreviewStatus::Showing {
                index: 2,
                kind: MediaKind::Gif
            }
        );
        let calls = &ctl.surface().calls;
        assert_eq!(calls.len(), 6);
        assert_eq!(calls[2], Call::Teardown);
        assert_eq!(calls[3], Call::Play(dir.path().join("b.mp4")));
        assert_eq!(calls[4], Call::Teardown);
        assert_eq!(calls[5], Call::Play(dir.path().join("c.gif")));
    }

    #[test]
    fn failures_become_placeholders() {
        let (dir, tl) = setup(&["a.mp4"]);
        let surface = FakeSurface {
            fail_play: true,
            ..Default::default()
        };
        let mut ctl = PreviewController::new(surface, dir.path());
        assert_eq!(ctl.preview(&tl, 0), PreviewStatus::Placeholder);
        assert_eq!(ctl.preview(&tl, 9), PreviewStatus::Placeholder);
        assert_eq!(ctl.active_index(), None);
    }

    #[test]
    fn missing_media_is_a_placeholder() {
        let dir = TempDir::new().unwrap();
        let mut tl = Timeline::default();
        tl.append(ClipEntry::new("gone.png")).unwrap();
        let mut ctl = PreviewController::new(FakeSurface::default(), dir.path());
        assert_eq!(ctl.preview(&tl, 0), PreviewStatus::Placeholder);
        assert_eq!(ctl.surface().calls, vec![Call::Teardown]);
    }

    #[test]
    fn inline_data_is_decoded_and_cleaned_up() {
        let dir = TempDir::new().unwrap();
        let mut tl = Timeline::default();
        tl.append(ClipEntry {
            file_data: Some(format!("data:image/png;base64,{}", STANDARD.encode(b"pixels"))),
            ..ClipEntry::new("20240101_logo.png")
        })
        .unwrap();
        let mut ctl = PreviewController::new(FakeSurface::default(), dir.path());

        ctl.preview(&tl, 0);
        let Call::Image(path, _) = ctl.surface().calls[1].clone() else {
            panic!("expected an image preview");
        };
        assert_eq!(path.extension().unwrap(), "png");
        assert_eq!(std::fs::read(&path).unwrap(), b"pixels");

        ctl.clear();
        assert!(!path.exists());
    }

    #[test]
    fn bad_inline_data_is_a_placeholder() {
        let dir = TempDir::new().unwrap();
        let mut tl = Timeline::default();
        tl.append(ClipEntry {
            file_data: Some("%%% not base64 %%%".into()),
            ..ClipEntry::new("x.png")
        })
        .unwrap();
        let mut ctl = PreviewController::new(FakeSurface::default(), dir.path());
        assert_eq!(ctl.preview(&tl, 0), PreviewStatus::Placeholder);
    }
}
