//! Migration Runner: applies pending migrations per owner scope, in name
//! order, one transactional scope per migration, halting at the first
//! failure.

pub mod migration;
pub mod registry;

use std::time::{Duration, Instant};

use chrono::Utc;
use rusqlite::Connection;
use sediment_core::config::{ContentConfig, MigrationConfig};
use sediment_core::errors::{ErrorCode, MigrationError};
use sediment_core::traits::{ProgressReporter, ProjectConfig};
use sediment_core::types::{MigrationRecord, OwnerScope};

pub use self::migration::{Migration, MigrationContext};
pub use self::registry::{MigrationDescriptor, MigrationSet};

use crate::connection::writer::with_immediate_transaction;
use crate::content::ElementLabels;
use crate::dialect::Dialect;
use crate::records::MigrationRecordStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunnerOptions {
    /// Run each migration (and its record) in one transaction.
    pub transactional: bool,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            transactional: Dialect::Sqlite.supports_transactional_ddl(),
        }
    }
}

impl RunnerOptions {
    pub fn from_config(config: &MigrationConfig) -> Self {
        Self {
            transactional: config
                .effective_transactional(Dialect::Sqlite.supports_transactional_ddl()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedMigration {
    pub name: String,
    pub elapsed: Duration,
}

/// What one `up` call applied, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub owner: OwnerScope,
    pub applied: Vec<AppliedMigration>,
}

impl RunReport {
    pub fn names(&self) -> Vec<&str> {
        self.applied.iter().map(|m| m.name.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.applied.is_empty()
    }
}

pub struct MigrationRunner<'a> {
    conn: &'a Connection,
    migrations: &'a MigrationSet,
    project_config: &'a mut dyn ProjectConfig,
    progress: &'a mut dyn ProgressReporter,
    content_config: ContentConfig,
    labels: ElementLabels,
    options: RunnerOptions,
}

impl<'a> MigrationRunner<'a> {
    pub fn new(
        conn: &'a Connection,
        migrations: &'a MigrationSet,
        project_config: &'a mut dyn ProjectConfig,
        progress: &'a mut dyn ProgressReporter,
    ) -> Self {
        Self {
            conn,
            migrations,
            project_config,
            progress,
            content_config: ContentConfig::default(),
            labels: ElementLabels::default(),
            options: RunnerOptions::default(),
        }
    }

    pub fn with_options(mut self, options: RunnerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_content_config(mut self, config: ContentConfig) -> Self {
        self.content_config = config;
        self
    }

    pub fn with_labels(mut self, labels: ElementLabels) -> Self {
        self.labels = labels;
        self
    }

    pub fn options(&self) -> RunnerOptions {
        self.options
    }

    fn records(&self) -> MigrationRecordStore<'a> {
        MigrationRecordStore::new(self.conn)
    }

    /// Registered migrations for `owner` that have no record yet, in name order.
    pub fn pending(&self, owner: &OwnerScope) -> Result<Vec<MigrationDescriptor>, MigrationError> {
        let applied = self.records().all_run(owner)?;
        Ok(self
            .migrations
            .discover(owner)
            .into_iter()
            .filter(|d| !applied.contains(d.name.as_str()))
            .collect())
    }

    /// Apply every pending migration for `owner`.
    pub fn up(&mut self, owner: &OwnerScope) -> Result<RunReport, MigrationError> {
        self.up_to(owner, None)
    }

    /// Apply at most `limit` pending migrations for `owner`.
    ///
    /// Stops at the first failure; migrations after it are not attempted
    /// and the failed one stays pending.
    pub fn up_to(
        &mut self,
        owner: &OwnerScope,
        limit: Option<usize>,
    ) -> Result<RunReport, MigrationError> {
        let mut pending = self.pending(owner)?;
        if let Some(limit) = limit {
            pending.truncate(limit);
        }
        if pending.is_empty() {
            tracing::debug!(owner = %owner, "no pending migrations");
        }

        let mut report = RunReport {
            owner: owner.clone(),
            applied: Vec::with_capacity(pending.len()),
        };
        for descriptor in pending {
            let name = descriptor.name.as_str();
            self.progress.line(&format!("*** applying {name}"));
            let start = Instant::now();
            let outcome = self.apply_one(owner, name);
            let elapsed = start.elapsed();

            match outcome {
                Ok(()) => {
                    self.progress
                        .line(&format!("*** applied {name} (time: {:.3}s)", elapsed.as_secs_f64()));
                    tracing::info!(
                        owner = %owner,
                        migration = name,
                        elapsed_ms = elapsed.as_millis() as u64,
                        "migration applied"
                    );
                    report.applied.push(AppliedMigration {
                        name: name.to_string(),
                        elapsed,
                    });
                }
                Err(err) => {
                    self.progress.line(&format!(
                        "*** failed to apply {name} (time: {:.3}s)",
                        elapsed.as_secs_f64()
                    ));
                    let err = match err {
                        MigrationError::Failed { .. } => err,
                        other => MigrationError::failed(name, &other),
                    };
                    tracing::error!(
                        owner = %owner,
                        migration = name,
                        elapsed_ms = elapsed.as_millis() as u64,
                        error = %err.display_code(),
                        "migration failed"
                    );
                    return Err(err);
                }
            }
        }
        Ok(report)
    }

    fn apply_one(&mut self, owner: &OwnerScope, name: &str) -> Result<(), MigrationError> {
        let migrations = self.migrations;
        let migration = migrations
            .get(owner, name)
            .ok_or_else(|| MigrationError::UnknownMigration {
                owner: owner.to_string(),
                name: name.to_string(),
            })?;

        if self.options.transactional {
            let project_config = &mut *self.project_config;
            let progress = &mut *self.progress;
            let content_config = &self.content_config;
            let labels = &self.labels;
            with_immediate_transaction(self.conn, |tx| {
                let mut ctx =
                    MigrationContext::new(tx, project_config, progress, content_config, labels);
                migration.up(&mut ctx)?;
                MigrationRecordStore::new(tx).record_run(owner, name, Utc::now())?;
                Ok(())
            })
        } else {
            let mut ctx = MigrationContext::new(
                self.conn,
                &mut *self.project_config,
                &mut *self.progress,
                &self.content_config,
                &self.labels,
            );
            migration.up(&mut ctx)?;
            self.records().record_run(owner, name, Utc::now())?;
            Ok(())
        }
    }

    /// Record pending migrations as applied without running them.
    ///
    /// With `name`, marks every pending migration up to and including it;
    /// without, marks all pending. Returns the names marked.
    pub fn mark_applied(
        &mut self,
        owner: &OwnerScope,
        name: Option<&str>,
    ) -> Result<Vec<String>, MigrationError> {
        if let Some(name) = name {
            if self.migrations.get(owner, name).is_none() {
                return Err(MigrationError::UnknownMigration {
                    owner: owner.to_string(),
                    name: name.to_string(),
                });
            }
        }

        let marked: Vec<String> = self
            .pending(owner)?
            .into_iter()
            .map(|d| d.name.to_string())
            .filter(|n| name.map_or(true, |upto| n.as_str() <= upto))
            .collect();

        with_immediate_transaction(self.conn, |tx| {
            let records = MigrationRecordStore::new(tx);
            for name in &marked {
                records.record_run(owner, name, Utc::now())?;
            }
            Ok::<_, MigrationError>(())
        })?;

        for name in &marked {
            self.progress.line(&format!("*** marked {name} as applied"));
        }
        tracing::info!(owner = %owner, marked = marked.len(), "migrations marked as applied");
        Ok(marked)
    }

    /// Revert the `limit` most recently applied migrations, newest first.
    ///
    /// Each successful `down` removes its record. Stops at the first
    /// migration that refuses or fails; its record is kept.
    pub fn revert(&mut self, owner: &OwnerScope, limit: usize) -> Result<Vec<String>, MigrationError> {
        let history = self.records().history(owner, Some(limit))?;
        let migrations = self.migrations;
        let mut reverted = Vec::with_capacity(history.len());

        for record in history {
            let name = record.name.as_str();
            let migration = migrations
                .get(owner, name)
                .ok_or_else(|| MigrationError::UnknownMigration {
                    owner: owner.to_string(),
                    name: name.to_string(),
                })?;

            self.progress.line(&format!("*** reverting {name}"));
            let start = Instant::now();
            let project_config = &mut *self.project_config;
            let progress = &mut *self.progress;
            let content_config = &self.content_config;
            let labels = &self.labels;
            let mut run_down = |conn: &Connection| -> Result<(), MigrationError> {
                let mut ctx =
                    MigrationContext::new(conn, project_config, progress, content_config, labels);
                migration.down(&mut ctx)?;
                MigrationRecordStore::new(conn).remove(owner, name)?;
                Ok(())
            };
            let outcome = if self.options.transactional {
                with_immediate_transaction(self.conn, |tx| run_down(tx))
            } else {
                run_down(self.conn)
            };
            let elapsed = start.elapsed();

            if let Err(err) = outcome {
                self.progress.line(&format!(
                    "*** failed to revert {name} (time: {:.3}s)",
                    elapsed.as_secs_f64()
                ));
                let err = match err {
                    MigrationError::Irreversible { .. } | MigrationError::Failed { .. } => err,
                    other => MigrationError::failed(name, &other),
                };
                tracing::error!(
                    owner = %owner,
                    migration = name,
                    error = %err.display_code(),
                    "migration revert failed"
                );
                return Err(err);
            }

            self.progress
                .line(&format!("*** reverted {name} (time: {:.3}s)", elapsed.as_secs_f64()));
            tracing::info!(
                owner = %owner,
                migration = name,
                elapsed_ms = elapsed.as_millis() as u64,
                "migration reverted"
            );
            reverted.push(record.name);
        }
        Ok(reverted)
    }

    /// Applied migrations for `owner`, newest first.
    pub fn history(
        &self,
        owner: &OwnerScope,
        limit: Option<usize>,
    ) -> Result<Vec<MigrationRecord>, MigrationError> {
        Ok(self.records().history(owner, limit)?)
    }
}
