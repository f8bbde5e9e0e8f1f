use std::fmt::Write;
use storyreel_core::types::{ClipEntry, MediaKind, SceneSuggestion};

pub fn timeline_table(clips: &[ClipEntry]) -> String {
    if clips.is_empty() {
        return "timeline is empty\n".to_string();
    }

    let mut out = String::new();
    let mut start = 0.0;
    for (i, clip) in clips.iter().enumerate() {
        let audio = match clip.media_kind() {
            MediaKind::Video if clip.keep_audio => " audio",
            MediaKind::Video => " muted",
            _ => "",
        };
        let _ = writeln!(
            out,
            "{i:>3}  {start:>6.1}s  {:<32} {:>5.1}s  {} -> {}  filter={}{audio}",
            clip.filename, clip.duration, clip.start_transition, clip.end_transition, clip.filter,
        );
        start += clip.duration;
    }
    let _ = writeln!(out, "     total {start:.1}s");
    out
}

pub fn scene_list(scenes: &[&SceneSuggestion]) -> String {
    if scenes.is_empty() {
        return "no pending scenes\n".to_string();
    }

    let mut out = String::new();
    for (i, s) in scenes.iter().enumerate() {
        let _ = writeln!(
            out,
            "{i:>3}  [{}] {:.1}s {}  {}",
            s.timestamp,
            s.duration,
            s.kind.as_str(),
            if s.description.is_empty() { "-" } else { &s.description }
        );
        if !s.source.is_empty() {
            let _ = writeln!(out, "       source: {}", s.source);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_lists_start_times_and_total() {
        let clips = vec![
            ClipEntry::new("a.png"),
            ClipEntry {
                duration: 2.5,
                keep_audio: false,
                ..ClipEntry::new("b.mp4")
            },
        ];
        let table = timeline_table(&clips);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("0.0s"));
        assert!(lines[0].contains("fade-in -> fade-out"));
        assert!(lines[1].contains("5.0s"));
        assert!(lines[1].ends_with("muted"));
        assert!(lines[2].contains("total 7.5s"));
    }

    #[test]
    fn empty_views() {
        assert_eq!(timeline_table(&[]), "timeline is empty\n");
        assert_eq!(scene_list(&[]), "no pending scenes\n");
    }

    #[test]
    fn scenes_show_source_when_present() {
        let scene = SceneSuggestion {
            description: "Logo".into(),
            source: "Upload logo".into(),
            ..Default::default()
        };
        let out = scene_list(&[&scene]);
        assert!(out.contains("[0:00] 5.0s image  Logo"));
        assert!(out.contains("source: Upload logo"));
    }
}
