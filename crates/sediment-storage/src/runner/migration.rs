//! The migration contract and the collaborators handed to each step.

use rusqlite::Connection;
use sediment_core::config::ContentConfig;
use sediment_core::errors::MigrationError;
use sediment_core::traits::{ProgressReporter, ProjectConfig};

use crate::content::{ContentRefactor, ElementLabels};
use crate::executor::Executor;
use crate::schema::SchemaInspector;

/// One named, ordered schema/content change.
///
/// `up` must be written defensively (check before create/alter): on
/// backends without transactional DDL a failed attempt can leave part of
/// its work behind, and the retry must not trip over it. Returning
/// `MigrationError::Refused` is the explicit "did not apply" outcome.
pub trait Migration {
    /// `m<YYMMDD>_<HHMMSS>_<description>`.
    fn name(&self) -> &str;

    fn up(&self, ctx: &mut MigrationContext<'_>) -> Result<(), MigrationError>;

    fn down(&self, _ctx: &mut MigrationContext<'_>) -> Result<(), MigrationError> {
        Err(MigrationError::Irreversible {
            name: self.name().to_string(),
        })
    }
}

/// Everything a migration may touch, passed in explicitly.
pub struct MigrationContext<'a> {
    conn: &'a Connection,
    project_config: &'a mut dyn ProjectConfig,
    progress: &'a mut dyn ProgressReporter,
    content_config: &'a ContentConfig,
    labels: &'a ElementLabels,
}

impl<'a> MigrationContext<'a> {
    pub fn new(
        conn: &'a Connection,
        project_config: &'a mut dyn ProjectConfig,
        progress: &'a mut dyn ProgressReporter,
        content_config: &'a ContentConfig,
        labels: &'a ElementLabels,
    ) -> Self {
        Self {
            conn,
            project_config,
            progress,
            content_config,
            labels,
        }
    }

    pub fn db(&self) -> Executor<'a> {
        Executor::new(self.conn)
    }

    pub fn schema(&self) -> SchemaInspector<'a> {
        SchemaInspector::new(self.conn)
    }

    pub fn project_config(&mut self) -> &mut dyn ProjectConfig {
        &mut *self.project_config
    }

    pub fn progress(&mut self) -> &mut dyn ProgressReporter {
        &mut *self.progress
    }

    /// The content refactor engine, bound to this migration's connection.
    pub fn content(&mut self) -> ContentRefactor<'_> {
        ContentRefactor::new(self.conn, self.content_config, self.labels, &mut *self.progress)
    }
}
