use crate::error::{RenderError, Result};
use crate::service::{RenderService, UploadResponse};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use storyreel_core::limits::EditorLimits;
use storyreel_core::timeline::Timeline;
use storyreel_core::types::{ClipEntry, SceneSuggestion};
use tracing::{debug, info, warn};

// ---------------------------------------------------------------------------
// LocalMedia
// ---------------------------------------------------------------------------

/// A file picked for upload, inspected but not yet read.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalMedia {
    pub path: PathBuf,
    pub file_name: String,
    pub size: u64,
    /// `None` when the extension is not an accepted media type.
    pub mime_type: Option<&'static str>,
}

impl LocalMedia {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let metadata = match std::fs::metadata(path) {
            Ok(m) if m.is_file() => m,
            Ok(_) => return Err(RenderError::FileNotFound(path.to_path_buf())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(RenderError::FileNotFound(path.to_path_buf()))
            }
            Err(e) => return Err(e.into()),
        };

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "unknown".to_string());

        Ok(Self {
            path: path.to_path_buf(),
            mime_type: mime_for(&file_name),
            file_name,
            size: metadata.len(),
        })
    }
}

/// MIME type for the accepted extensions.
pub fn mime_for(file_name: &str) -> Option<&'static str> {
    let ext = Path::new(file_name)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())?;
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "mp4" => Some("video/mp4"),
        _ => None,
    }
}

/// Size is checked before type.
pub fn validate(media: &LocalMedia, limits: &EditorLimits) -> Result<()> {
    if media.size > limits.max_upload_bytes {
        return Err(RenderError::FileTooLarge {
            name: media.file_name.clone(),
            size: media.size,
            max: limits.max_upload_bytes,
        });
    }
    if media.mime_type.is_none() {
        return Err(RenderError::UnsupportedMediaType(media.file_name.clone()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Batch results
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum UploadOutcome {
    /// Uploaded and appended to the timeline at `index`.
    Added { path: PathBuf, index: usize },
    Failed { path: PathBuf, error: RenderError },
}

impl UploadOutcome {
    pub fn path(&self) -> &Path {
        match self {
            UploadOutcome::Added { path, .. } | UploadOutcome::Failed { path, .. } => path,
        }
    }

    pub fn is_added(&self) -> bool {
        matches!(self, UploadOutcome::Added { .. })
    }
}

/// One outcome per submitted file, in submission order.
#[derive(Debug, Default)]
pub struct UploadReport {
    pub outcomes: Vec<UploadOutcome>,
}

impl UploadReport {
    pub fn added(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_added()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.added()
    }

    pub fn failures(&self) -> impl Iterator<Item = (&Path, &RenderError)> {
        self.outcomes.iter().filter_map(|o| match o {
            UploadOutcome::Failed { path, error } => Some((path.as_path(), error)),
            UploadOutcome::Added { .. } => None,
        })
    }
}

// ---------------------------------------------------------------------------
// UploadCoordinator
// ---------------------------------------------------------------------------

/// Validates, uploads, and pairs files with pending scene suggestions.
pub struct UploadCoordinator<'a, S: RenderService + ?Sized> {
    service: &'a S,
    limits: EditorLimits,
}

impl<'a, S: RenderService + ?Sized> UploadCoordinator<'a, S> {
    pub fn new(service: &'a S, limits: EditorLimits) -> Self {
        Self { service, limits }
    }

    /// Validate and upload a single file. Returns the stored name and the
    /// optional inline data from the server.
    pub async fn upload_one(&self, path: &Path) -> Result<(String, Option<String>)> {
        let media = LocalMedia::from_path(path)?;
        validate(&media, &self.limits)?;

        debug!(file = %media.file_name, size = media.size, "upload starting");
        let UploadResponse {
            success,
            filename,
            file_data,
            error,
        } = self.service.upload(&media).await?;

        match (success, filename) {
            (true, Some(filename)) => Ok((filename, file_data)),
            (true, None) => Err(RenderError::Rejected(
                "upload response is missing the stored filename".to_string(),
            )),
            (false, _) => Err(RenderError::Rejected(
                error.unwrap_or_else(|| "upload failed".to_string()),
            )),
        }
    }

    /// Upload `paths` one after another. Each success is paired with the
    /// front of `scenes` (or defaults when none remain) and appended to
    /// `timeline`. A failed file is reported and the batch continues.
    pub async fn upload_batch(
        &self,
        paths: &[PathBuf],
        scenes: &mut VecDeque<SceneSuggestion>,
        timeline: &mut Timeline,
    ) -> UploadReport {
        let mut report = UploadReport::default();

        for path in paths {
            let outcome = match self.upload_and_append(path, scenes, timeline).await {
                Ok(index) => UploadOutcome::Added {
                    path: path.clone(),
                    index,
                },
                Err(error) => {
                    warn!(path = %path.display(), %error, "upload failed");
                    UploadOutcome::Failed {
                        path: path.clone(),
                        error,
                    }
                }
            };
            report.outcomes.push(outcome);
        }

        info!(
            added = report.added(),
            failed = report.failed(),
            "upload batch finished"
        );
        report
    }

    async fn upload_and_append(
        &self,
        path: &Path,
        scenes: &mut VecDeque<SceneSuggestion>,
        timeline: &mut Timeline,
    ) -> Result<usize> {
        let (filename, file_data) = self.upload_one(path).await?;

        let mut clip = match scenes.front() {
            Some(scene) => {
                debug!(%filename, timestamp = %scene.timestamp, "pairing upload with scene");
                ClipEntry::from_scene(filename, file_data, scene)
            }
            None => {
                debug!(%filename, "no scene left, using clip defaults");
                ClipEntry {
                    file_data,
                    ..ClipEntry::new(filename)
                }
            }
        };

        if clip.duration > self.limits.max_clip_duration {
            debug!(
                file = %clip.filename,
                suggested = clip.duration,
                max = self.limits.max_clip_duration,
                "clamping suggested duration"
            );
            clip.duration = self.limits.max_clip_duration;
        }

        let index = timeline.append(clip)?;
        // The suggestion is spent only once the clip is in the timeline.
        scenes.pop_front();
        Ok(index)
    }
}
