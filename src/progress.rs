//! Progress indicators for provctl.
//!
//! Terraform runs for minutes. By default a spinner shows the latest line it
//! printed; with `-v` the full output is streamed to stderr instead.

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::time::Duration;

use crate::ui;

/// Longest tool output line shown next to the spinner
const MESSAGE_WIDTH: usize = 60;

/// Start a spinner with `msg` as its prefix.
pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} {prefix:.bold} {msg:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_prefix(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Replace the spinner with a success line.
///
/// Goes to stderr so stdout stays clean for the populated plan.
pub fn finish_success(pb: &ProgressBar, msg: &str) {
    pb.finish_and_clear();
    eprintln!("{} {}", "✓".green(), msg);
}

/// Replace the spinner with a failure line.
pub fn finish_error(pb: &ProgressBar, msg: &str) {
    pb.finish_and_clear();
    eprintln!("{} {}", "✗".red(), msg);
}

// ============================================================================
// Tool Output
// ============================================================================

/// Sink for Terraform's output while a spinner is running.
pub struct ToolOutput {
    pb: ProgressBar,
    stream: bool,
    pending: Vec<u8>,
}

impl ToolOutput {
    /// `stream` prints every line to stderr; otherwise lines only update
    /// the spinner message.
    pub fn new(pb: ProgressBar, stream: bool) -> Self {
        Self {
            pb,
            stream,
            pending: Vec::new(),
        }
    }

    fn emit(&self, line: &[u8]) {
        let line = String::from_utf8_lossy(line);
        let line = line.trim_end_matches('\r');
        if self.stream {
            self.pb.suspend(|| eprintln!("{line}"));
        } else if !line.trim().is_empty() {
            self.pb.set_message(ui::truncate_line(line, MESSAGE_WIDTH));
        }
    }
}

impl Write for ToolOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pending.extend_from_slice(buf);
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            self.emit(&line[..line.len() - 1]);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if !self.pending.is_empty() {
            let line = std::mem::take(&mut self.pending);
            self.emit(&line);
        }
        Ok(())
    }
}

impl Drop for ToolOutput {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}
