use serde::{Deserialize, Serialize};

/// Render progress as reported by the server's event stream.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct RenderProgress {
    pub percent: f64,
}

impl RenderProgress {
    pub fn is_complete(&self) -> bool {
        self.percent >= 100.0
    }
}

/// Parse one server-sent-event line of the form `data: <percent>`.
///
/// Returns `None` for comments, other fields, and non-numeric payloads.
pub fn parse_sse_line(line: &str) -> Option<RenderProgress> {
    let payload = line.trim_end_matches('\r').strip_prefix("data:")?.trim();
    let percent: f64 = payload.parse().ok()?;
    if !percent.is_finite() {
        return None;
    }
    Some(RenderProgress {
        percent: percent.clamp(0.0, 100.0),
    })
}

/// Reassembles lines from arbitrarily split response chunks.
#[derive(Debug, Default)]
pub struct ProgressParser {
    pending: Vec<u8>,
}

impl ProgressParser {
    /// Feed a chunk and collect the progress updates from every line it
    /// completes. A trailing partial line is kept for the next chunk.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<RenderProgress> {
        self.pending.extend_from_slice(chunk);
        let mut updates = Vec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line[..line.len() - 1]);
            if let Some(progress) = parse_sse_line(&line) {
                updates.push(progress);
            }
        }
        updates
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_sse_line_reads_percent() {
        assert_eq!(parse_sse_line("data: 42").unwrap().percent, 42.0);
        assert_eq!(parse_sse_line("data:7.5\r").unwrap().percent, 7.5);
    }

    #[test]
    fn parse_sse_line_clamps() {
        assert_eq!(parse_sse_line("data: 140").unwrap().percent, 100.0);
        assert_eq!(parse_sse_line("data: -3").unwrap().percent, 0.0);
    }

    #[test]
    fn parse_sse_line_ignores_other_lines() {
        assert!(parse_sse_line("").is_none());
        assert!(parse_sse_line(": keep-alive").is_none());
        assert!(parse_sse_line("event: progress").is_none());
        assert!(parse_sse_line("data: rendering").is_none());
        assert!(parse_sse_line("data: NaN").is_none());
    }

    #[test]
    fn parser_handles_split_chunks() {
        let mut parser = ProgressParser::default();
        assert!(parser.feed(b"data: 1").is_empty());
        let updates = parser.feed(b"0\n\ndata: 55\n\ndata: 9");
        let percents: Vec<f64> = updates.iter().map(|p| p.percent).collect();
        assert_eq!(percents, vec![10.0, 55.0]);
        let last = parser.feed(b"9\n");
        assert_eq!(last[0].percent, 99.0);
        assert!(!last[0].is_complete());
        assert!(parser.feed(b"data: 100\n")[0].is_complete());
    }
}
