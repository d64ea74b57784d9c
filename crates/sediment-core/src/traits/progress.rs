//! Line-oriented progress output for long-running operations.

/// Receives one human-readable line per step (operation label + outcome).
///
/// Purely observational: nothing a reporter does may affect migration results.
pub trait ProgressReporter {
    fn line(&mut self, line: &str);
}

/// Emits every progress line as a `tracing` info event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingProgress;

impl ProgressReporter for TracingProgress {
    fn line(&mut self, line: &str) {
        tracing::info!(target: "sediment::progress", "{line}");
    }
}

/// Keeps progress lines in memory.
#[derive(Debug, Default, Clone)]
pub struct RecordingProgress {
    lines: Vec<String>,
}

impl RecordingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }
}

impl ProgressReporter for RecordingProgress {
    fn line(&mut self, line: &str) {
        self.lines.push(line.to_string());
    }
}
