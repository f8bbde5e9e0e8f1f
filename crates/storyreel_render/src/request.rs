use crate::error::{RenderError, Result};
use crate::service::{ProcessResponse, RenderService};
use serde::{Deserialize, Serialize};
use storyreel_core::timeline::Timeline;
use storyreel_core::types::ClipEntry;
use tracing::info;

/// Output size override. Both dimensions or neither.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Combine separately supplied dimensions. One without the other is an
    /// error; neither means no override.
    pub fn from_parts(width: Option<u32>, height: Option<u32>) -> Result<Option<Self>> {
        match (width, height) {
            (Some(width), Some(height)) => Ok(Some(Self { width, height })),
            (None, None) => Ok(None),
            (Some(_), None) => Err(RenderError::InvalidResolution(
                "height is required when width is set".into(),
            )),
            (None, Some(_)) => Err(RenderError::InvalidResolution(
                "width is required when height is set".into(),
            )),
        }
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Body of `POST /process`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RenderRequest {
    pub timeline: Vec<ClipEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<Resolution>,
}

impl RenderRequest {
    /// Snapshot `timeline` into a request, checking in order: not empty,
    /// total duration within limits, resolution within bounds.
    pub fn build(timeline: &Timeline, resolution: Option<Resolution>) -> Result<Self> {
        if timeline.is_empty() {
            return Err(RenderError::EmptyTimeline);
        }

        let limits = timeline.limits();
        let total = timeline.total_duration();
        if total > limits.max_total_duration {
            return Err(RenderError::DurationLimitExceeded {
                total,
                max: limits.max_total_duration,
            });
        }

        if let Some(res) = resolution {
            if !limits.accepts_resolution(res.width, res.height) {
                return Err(RenderError::InvalidResolution(format!(
                    "{res} is outside {}x{} to {}x{}",
                    limits.min_width, limits.min_height, limits.max_width, limits.max_height
                )));
            }
        }

        Ok(Self {
            timeline: timeline.clips().to_vec(),
            resolution,
        })
    }
}

/// A finished render fetched from the server.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOutput {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Validate, submit, and download a render of `timeline`. Nothing reaches
/// the server if validation fails, and the timeline is never modified.
pub async fn export<S: RenderService + ?Sized>(
    service: &S,
    timeline: &Timeline,
    resolution: Option<Resolution>,
) -> Result<RenderOutput> {
    let request = RenderRequest::build(timeline, resolution)?;
    info!(
        clips = request.timeline.len(),
        total_secs = timeline.total_duration(),
        resolution = ?request.resolution,
        "render requested"
    );

    let ProcessResponse {
        success,
        output,
        error,
    } = service.process(&request).await?;

    let name = match (success, output) {
        (true, Some(name)) => name,
        (true, None) => {
            return Err(RenderError::Rejected(
                "render response is missing the output name".into(),
            ))
        }
        (false, _) => {
            return Err(RenderError::Rejected(
                error.unwrap_or_else(|| "render failed".into()),
            ))
        }
    };

    let bytes = service.download(&name).await?;
    info!(%name, bytes = bytes.len(), "render downloaded");
    Ok(RenderOutput { name, bytes })
}
