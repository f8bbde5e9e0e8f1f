use crate::error::{PreviewError, Result};
use crate::preview::PreviewSurface;
use serde_json::{json, Value};
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::Duration;
use tracing::{debug, info};

/// A preview window backed by an mpv process, driven over its JSON IPC
/// socket. The process is started on first use and kept idle between clips.
pub struct MpvSurface {
    process: Option<Child>,
    socket_path: PathBuf,
}

impl MpvSurface {
    pub fn new() -> Self {
        let socket_path =
            std::env::temp_dir().join(format!("storyreel-mpv-{}", std::process::id()));
        Self {
            process: None,
            socket_path,
        }
    }

    pub fn is_running(&self) -> bool {
        self.process.is_some()
    }

    fn ensure_started(&mut self) -> Result<()> {
        if let Some(child) = self.process.as_mut() {
            match child.try_wait() {
                Ok(None) => return Ok(()),
                _ => {
                    debug!("mpv exited, restarting");
                    self.stop();
                }
            }
        }

        let child = Command::new("mpv")
            .args([
                "--idle=yes",
                "--force-window=yes",
                "--keep-open=no",
                "--osd-level=0",
                "--title=storyreel-preview",
                &format!("--input-ipc-server={}", self.socket_path.display()),
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| PreviewError::Player(format!("failed to start mpv: {e}")))?;
        info!(pid = child.id(), "mpv started");
        self.process = Some(child);

        for _ in 0..50 {
            if self.socket_path.exists() {
                return Ok(());
            }
            std::thread::sleep(Duration::from_millis(100));
        }
        self.stop();
        Err(PreviewError::Player("mpv socket did not appear".into()))
    }

    fn send_command(&self, command: Value) -> Result<Value> {
        let mut stream = UnixStream::connect(&self.socket_path)?;
        stream.set_read_timeout(Some(Duration::from_secs(2)))?;
        stream.write_all(format!("{command}\n").as_bytes())?;

        // mpv interleaves events with replies; skip to the first reply.
        let mut reader = BufReader::new(stream);
        loop {
            let mut line = String::new();
            if reader.read_line(&mut line)? == 0 {
                return Err(PreviewError::Player("mpv closed the socket".into()));
            }
            let reply: Value = serde_json::from_str(&line)?;
            if reply.get("event").is_some() {
                continue;
            }
            return match reply.get("error").and_then(Value::as_str) {
                Some("success") | None => Ok(reply),
                Some(err) => Err(PreviewError::Player(err.to_string())),
            };
        }
    }

    fn load(&mut self, path: &Path, image_duration: Value) -> Result<()> {
        self.ensure_started()?;
        self.send_command(json!({
            "command": ["set_property", "image-display-duration", image_duration]
        }))?;
        self.send_command(json!({ "command": ["loadfile", path.to_string_lossy()] }))?;
        Ok(())
    }

    pub fn stop(&mut self) {
        if let Some(mut child) = self.process.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
        let _ = std::fs::remove_file(&self.socket_path);
    }
}

impl PreviewSurface for MpvSurface {
    fn show_image(&mut self, path: &Path, duration: f64) -> Result<()> {
        self.load(path, json!(duration))
    }

    fn play(&mut self, path: &Path) -> Result<()> {
        self.load(path, json!("inf"))
    }

    fn teardown(&mut self) -> Result<()> {
        if !self.is_running() {
            return Ok(());
        }
        self.send_command(json!({ "command": ["stop"] }))?;
        Ok(())
    }
}

impl Default for MpvSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for MpvSurface {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn teardown_without_process_is_a_no_op() {
        let mut surface = MpvSurface::new();
        assert!(!surface.is_running());
        assert!(surface.teardown().is_ok());
    }
}
