use crate::error::{CoreError, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Duration given to clips and scenes that do not carry a usable one.
pub const DEFAULT_CLIP_DURATION: f64 = 5.0;

// ---------------------------------------------------------------------------
// Transition
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Transition {
    None,
    FadeIn,
    FadeOut,
    DissolveIn,
    DissolveOut,
    WipeRight,
    WipeLeft,
    SlideRight,
    SlideLeft,
    RotateIn,
    RotateOut,
    ZoomIn,
    ZoomOut,
    BlurIn,
    BlurOut,
    RippleIn,
    RippleOut,
    SpiralIn,
    SpiralOut,
    MatrixIn,
    MatrixOut,
    HeartIn,
    HeartOut,
    ShatterIn,
    ShatterOut,
}

impl Transition {
    pub const DEFAULT_START: Self = Transition::FadeIn;
    pub const DEFAULT_END: Self = Transition::FadeOut;

    pub const ALL: &'static [Transition] = &[
        Transition::None,
        Transition::FadeIn,
        Transition::FadeOut,
        Transition::DissolveIn,
        Transition::DissolveOut,
        Transition::WipeRight,
        Transition::WipeLeft,
        Transition::SlideRight,
        Transition::SlideLeft,
        Transition::RotateIn,
        Transition::RotateOut,
        Transition::ZoomIn,
        Transition::ZoomOut,
        Transition::BlurIn,
        Transition::BlurOut,
        Transition::RippleIn,
        Transition::RippleOut,
        Transition::SpiralIn,
        Transition::SpiralOut,
        Transition::MatrixIn,
        Transition::MatrixOut,
        Transition::HeartIn,
        Transition::HeartOut,
        Transition::ShatterIn,
        Transition::ShatterOut,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Transition::None => "none",
            Transition::FadeIn => "fade-in",
            Transition::FadeOut => "fade-out",
            Transition::DissolveIn => "dissolve-in",
            Transition::DissolveOut => "dissolve-out",
            Transition::WipeRight => "wipe-right",
            Transition::WipeLeft => "wipe-left",
            Transition::SlideRight => "slide-right",
            Transition::SlideLeft => "slide-left",
            Transition::RotateIn => "rotate-in",
            Transition::RotateOut => "rotate-out",
            Transition::ZoomIn => "zoom-in",
            Transition::ZoomOut => "zoom-out",
            Transition::BlurIn => "blur-in",
            Transition::BlurOut => "blur-out",
            Transition::RippleIn => "ripple-in",
            Transition::RippleOut => "ripple-out",
            Transition::SpiralIn => "spiral-in",
            Transition::SpiralOut => "spiral-out",
            Transition::MatrixIn => "matrix-in",
            Transition::MatrixOut => "matrix-out",
            Transition::HeartIn => "heart-in",
            Transition::HeartOut => "heart-out",
            Transition::ShatterIn => "shatter-in",
            Transition::ShatterOut => "shatter-out",
        }
    }

    /// Look up a tag, ignoring case and surrounding whitespace.
    pub fn parse_tag(tag: &str) -> Option<Self> {
        let tag = tag.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(tag))
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Filter
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Filter {
    #[default]
    None,
    Grayscale,
    Sepia,
    Blur,
    Sharpen,
    Bright,
    Dark,
    Contrast,
    Mirror,
    Invert,
    Cartoon,
    OilPainting,
    Rainbow,
    Neon,
    Thermal,
    PencilSketch,
}

impl Filter {
    pub const ALL: &'static [Filter] = &[
        Filter::None,
        Filter::Grayscale,
        Filter::Sepia,
        Filter::Blur,
        Filter::Sharpen,
        Filter::Bright,
        Filter::Dark,
        Filter::Contrast,
        Filter::Mirror,
        Filter::Invert,
        Filter::Cartoon,
        Filter::OilPainting,
        Filter::Rainbow,
        Filter::Neon,
        Filter::Thermal,
        Filter::PencilSketch,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Filter::None => "none",
            Filter::Grayscale => "grayscale",
            Filter::Sepia => "sepia",
            Filter::Blur => "blur",
            Filter::Sharpen => "sharpen",
            Filter::Bright => "bright",
            Filter::Dark => "dark",
            Filter::Contrast => "contrast",
            Filter::Mirror => "mirror",
            Filter::Invert => "invert",
            Filter::Cartoon => "cartoon",
            Filter::OilPainting => "oil_painting",
            Filter::Rainbow => "rainbow",
            Filter::Neon => "neon",
            Filter::Thermal => "thermal",
            Filter::PencilSketch => "pencil_sketch",
        }
    }

    pub fn parse_tag(tag: &str) -> Option<Self> {
        let tag = tag.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.as_str().eq_ignore_ascii_case(tag))
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// MediaKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    #[default]
    Image,
    Video,
    Gif,
}

impl MediaKind {
    pub fn parse_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "image" => Some(MediaKind::Image),
            "video" => Some(MediaKind::Video),
            "gif" => Some(MediaKind::Gif),
            _ => None,
        }
    }

    /// Infer the kind from a filename extension. Anything that is not a
    /// known still image or gif is played as video.
    pub fn from_filename(filename: &str) -> Self {
        let ext = filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "jpg" | "jpeg" | "png" => MediaKind::Image,
            "gif" => MediaKind::Gif,
            _ => MediaKind::Video,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
            MediaKind::Gif => "gif",
        }
    }
}

// ---------------------------------------------------------------------------
// ClipEntry
// ---------------------------------------------------------------------------

/// One clip on the timeline, in the shape the render server expects.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClipEntry {
    pub filename: String,
    /// Inline encoded payload returned by the upload endpoint, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_data: Option<String>,
    pub duration: f64,
    #[serde(rename = "keepAudio", default = "default_keep_audio")]
    pub keep_audio: bool,
    #[serde(
        rename = "startTransition",
        default = "default_start_transition",
        deserialize_with = "lenient_start_transition"
    )]
    pub start_transition: Transition,
    #[serde(
        rename = "endTransition",
        default = "default_end_transition",
        deserialize_with = "lenient_end_transition"
    )]
    pub end_transition: Transition,
    #[serde(default, deserialize_with = "lenient_filter")]
    pub filter: Filter,
}

impl ClipEntry {
    /// A clip with every metadata field at its default.
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            file_data: None,
            duration: DEFAULT_CLIP_DURATION,
            keep_audio: true,
            start_transition: Transition::DEFAULT_START,
            end_transition: Transition::DEFAULT_END,
            filter: Filter::None,
        }
    }

    /// Build a clip from an uploaded file and the scene it was paired with.
    pub fn from_scene(
        filename: impl Into<String>,
        file_data: Option<String>,
        scene: &SceneSuggestion,
    ) -> Self {
        Self {
            filename: filename.into(),
            file_data,
            duration: scene.duration,
            keep_audio: true,
            start_transition: scene.start_transition,
            end_transition: scene.end_transition,
            filter: scene.filter,
        }
    }

    pub fn media_kind(&self) -> MediaKind {
        MediaKind::from_filename(&self.filename)
    }
}

fn default_keep_audio() -> bool {
    true
}

fn default_start_transition() -> Transition {
    Transition::DEFAULT_START
}

fn default_end_transition() -> Transition {
    Transition::DEFAULT_END
}

fn lenient_start_transition<'de, D: Deserializer<'de>>(
    d: D,
) -> std::result::Result<Transition, D::Error> {
    let tag = Option::<String>::deserialize(d)?;
    Ok(tag
        .as_deref()
        .and_then(Transition::parse_tag)
        .unwrap_or(Transition::DEFAULT_START))
}

fn lenient_end_transition<'de, D: Deserializer<'de>>(
    d: D,
) -> std::result::Result<Transition, D::Error> {
    let tag = Option::<String>::deserialize(d)?;
    Ok(tag
        .as_deref()
        .and_then(Transition::parse_tag)
        .unwrap_or(Transition::DEFAULT_END))
}

fn lenient_filter<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Filter, D::Error> {
    let tag = Option::<String>::deserialize(d)?;
    Ok(tag.as_deref().and_then(Filter::parse_tag).unwrap_or_default())
}

// ---------------------------------------------------------------------------
// ClipField
// ---------------------------------------------------------------------------

/// A single editable field of a clip together with its new value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClipField {
    Duration(f64),
    KeepAudio(bool),
    StartTransition(Transition),
    EndTransition(Transition),
    Filter(Filter),
}

impl ClipField {
    /// Parse a field name and raw value as typed by a user.
    ///
    /// Unknown transition or filter tags fall back to the slot default.
    /// A duration that does not parse becomes NaN and is rejected by the
    /// timeline's range check.
    pub fn parse(field: &str, value: &str) -> Result<Self> {
        let value = value.trim();
        match field.trim() {
            "duration" => Ok(ClipField::Duration(value.parse().unwrap_or(f64::NAN))),
            "keepAudio" | "keep_audio" | "audio" => Ok(ClipField::KeepAudio(matches!(
                value.to_ascii_lowercase().as_str(),
                "true" | "yes" | "on" | "1"
            ))),
            "startTransition" | "start_transition" | "start" => Ok(ClipField::StartTransition(
                Transition::parse_tag(value).unwrap_or(Transition::DEFAULT_START),
            )),
            "endTransition" | "end_transition" | "end" => Ok(ClipField::EndTransition(
                Transition::parse_tag(value).unwrap_or(Transition::DEFAULT_END),
            )),
            "filter" => Ok(ClipField::Filter(Filter::parse_tag(value).unwrap_or_default())),
            other => Err(CoreError::UnknownField(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ClipField::Duration(_) => "duration",
            ClipField::KeepAudio(_) => "keepAudio",
            ClipField::StartTransition(_) => "startTransition",
            ClipField::EndTransition(_) => "endTransition",
            ClipField::Filter(_) => "filter",
        }
    }

    /// Read the current value of the same field from `clip`.
    pub fn current(&self, clip: &ClipEntry) -> Self {
        match self {
            ClipField::Duration(_) => ClipField::Duration(clip.duration),
            ClipField::KeepAudio(_) => ClipField::KeepAudio(clip.keep_audio),
            ClipField::StartTransition(_) => ClipField::StartTransition(clip.start_transition),
            ClipField::EndTransition(_) => ClipField::EndTransition(clip.end_transition),
            ClipField::Filter(_) => ClipField::Filter(clip.filter),
        }
    }

    pub(crate) fn apply(&self, clip: &mut ClipEntry) {
        match *self {
            ClipField::Duration(d) => clip.duration = d,
            ClipField::KeepAudio(keep) => clip.keep_audio = keep,
            ClipField::StartTransition(t) => clip.start_transition = t,
            ClipField::EndTransition(t) => clip.end_transition = t,
            ClipField::Filter(f) => clip.filter = f,
        }
    }
}

// ---------------------------------------------------------------------------
// SceneSuggestion
// ---------------------------------------------------------------------------

/// A proposed clip produced by the importer, waiting to be paired with an
/// uploaded file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SceneSuggestion {
    pub timestamp: String,
    pub duration: f64,
    #[serde(rename = "type")]
    pub kind: MediaKind,
    pub description: String,
    pub source: String,
    pub start_transition: Transition,
    pub end_transition: Transition,
    pub filter: Filter,
}

impl Default for SceneSuggestion {
    fn default() -> Self {
        Self {
            timestamp: "0:00".to_string(),
            duration: DEFAULT_CLIP_DURATION,
            kind: MediaKind::Image,
            description: String::new(),
            source: String::new(),
            start_transition: Transition::DEFAULT_START,
            end_transition: Transition::DEFAULT_END,
            filter: Filter::None,
        }
    }
}

impl SceneSuggestion {
    /// The timestamp in seconds. `m:ss` and `h:mm:ss` are understood; an
    /// unparseable timestamp counts as zero.
    pub fn timestamp_seconds(&self) -> f64 {
        parse_timestamp(&self.timestamp).unwrap_or(0.0)
    }
}

fn parse_timestamp(s: &str) -> Option<f64> {
    let parts: Vec<f64> = s
        .trim()
        .split(':')
        .map(|p| p.trim().parse::<f64>().ok())
        .collect::<Option<Vec<_>>>()?;
    let secs = match parts.as_slice() {
        [s] => *s,
        [m, s] => m * 60.0 + s,
        [h, m, s] => h * 3600.0 + m * 60.0 + s,
        _ => return None,
    };
    secs.is_finite().then_some(secs)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
