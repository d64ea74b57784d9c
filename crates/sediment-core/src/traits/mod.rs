//! Seams between the engine and its collaborators.

pub mod progress;
pub mod project_config;

pub use progress::{ProgressReporter, RecordingProgress, TracingProgress};
pub use project_config::ProjectConfig;
