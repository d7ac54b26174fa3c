//! The cleanup pipeline: scan, analyze, confirm, back up, delete.
//!
//! [`CleanupExecutor`] walks a fixed sequence of states:
//!
//! ```text
//! Scanning -> Analyzed -> AwaitingConfirmation -> BackingUp -> Deleting -> Completed
//!     |           |                |                  |
//!     v           v                v                  v
//! DirectoryNotFound  Completed   Aborted         BackupFailed
//! ```
//!
//! Confirmation is an input to the machine, not a prompt inside it: callers
//! either drive it step by step with [`CleanupExecutor::analyze`] and
//! [`CleanupExecutor::resolve`], or hand [`CleanupExecutor::run`] a [`Confirm`]
//! implementation. Nothing is deleted before the backup and its manifest exist.

use std::path::PathBuf;

use chrono::Local;
use tracing::{debug, info, warn};

use crate::config::CleanupConfig;
use crate::error::CleanupError;
use crate::operations::{self, DeleteReport};
use crate::plugin::BackupManifest;
use crate::registry::{self, CleanupPlan};

/// Where the executor currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupState {
    Scanning,
    Analyzed,
    AwaitingConfirmation,
    BackingUp,
    Deleting,
    Completed,
    Aborted,
    BackupFailed,
    DirectoryNotFound,
}

impl CleanupState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            CleanupState::Completed
                | CleanupState::Aborted
                | CleanupState::BackupFailed
                | CleanupState::DirectoryNotFound
        )
    }
}

/// The operator's answer to the deletion plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Proceed,
    Abort,
}

impl Decision {
    /// Interpret an operator's typed answer. Only `y` or `yes` proceed.
    pub fn from_answer(answer: &str) -> Decision {
        let answer = answer.trim().to_ascii_lowercase();
        Decision::from(answer == "y" || answer == "yes")
    }
}

impl From<bool> for Decision {
    fn from(proceed: bool) -> Self {
        if proceed {
            Decision::Proceed
        } else {
            Decision::Abort
        }
    }
}

/// Supplies the decision for a plan awaiting confirmation.
pub trait Confirm {
    fn confirm(&mut self, plan: &CleanupPlan) -> Decision;
}

impl<F> Confirm for F
where
    F: FnMut(&CleanupPlan) -> Decision,
{
    fn confirm(&mut self, plan: &CleanupPlan) -> Decision {
        self(plan)
    }
}

/// Approves every plan.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&mut self, _plan: &CleanupPlan) -> Decision {
        Decision::Proceed
    }
}

/// Rejects every plan.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssumeNo;

impl Confirm for AssumeNo {
    fn confirm(&mut self, _plan: &CleanupPlan) -> Decision {
        Decision::Abort
    }
}

/// How a run ended.
#[derive(Debug)]
pub enum CleanupOutcome {
    /// No plugin has more than one version.
    NothingToDo,
    /// Preview-only run; `planned` entries would have been deleted.
    Previewed { planned: usize },
    Completed {
        backup_dir: PathBuf,
        manifest: BackupManifest,
        report: DeleteReport,
    },
    Aborted,
    BackupFailed(CleanupError),
    DirectoryNotFound(PathBuf),
    /// `resolve` was called before `analyze`; nothing was done.
    NotAnalyzed,
    /// The run already ended in this terminal state; nothing was done.
    Finished(CleanupState),
}

impl CleanupOutcome {
    /// Process exit status for this outcome.
    pub fn exit_code(&self) -> u8 {
        match self {
            CleanupOutcome::NothingToDo | CleanupOutcome::Previewed { .. } => 0,
            CleanupOutcome::Completed { report, .. } if report.is_complete() => 0,
            CleanupOutcome::Completed { .. } => 4,
            CleanupOutcome::Aborted => 1,
            CleanupOutcome::BackupFailed(_) => 2,
            CleanupOutcome::DirectoryNotFound(_) => 3,
            CleanupOutcome::NotAnalyzed => 5,
            CleanupOutcome::Finished(state) => match state {
                CleanupState::Completed => 0,
                CleanupState::Aborted => 1,
                CleanupState::BackupFailed => 2,
                CleanupState::DirectoryNotFound => 3,
                _ => 5,
            },
        }
    }

    pub fn is_success(&self) -> bool {
        self.exit_code() == 0
    }
}

/// Drives one cleanup run over a plugin directory.
#[derive(Debug)]
pub struct CleanupExecutor {
    config: CleanupConfig,
    state: CleanupState,
    plan: Option<CleanupPlan>,
    /// Canonical plugin directory, known once the scan succeeded.
    source_dir: Option<PathBuf>,
    /// Set once `resolve` has produced the run's outcome.
    resolved: bool,
}

impl CleanupExecutor {
    pub fn new(config: CleanupConfig) -> Self {
        CleanupExecutor {
            config,
            state: CleanupState::Scanning,
            plan: None,
            source_dir: None,
            resolved: false,
        }
    }

    pub fn state(&self) -> CleanupState {
        self.state
    }

    pub fn plan(&self) -> Option<&CleanupPlan> {
        self.plan.as_ref()
    }

    pub fn config(&self) -> &CleanupConfig {
        &self.config
    }

    /// Scan and analyze the plugin directory.
    ///
    /// Leaves the executor in `AwaitingConfirmation` when there is something to
    /// delete, in `Completed` when there is not (or when running preview-only), and
    /// in `DirectoryNotFound` when the directory is missing or cannot be read.
    /// Calling it again returns the existing plan without rescanning.
    pub fn analyze(&mut self) -> Result<&CleanupPlan, CleanupError> {
        if self.state != CleanupState::Scanning {
            return match self.plan.as_ref() {
                Some(plan) => Ok(plan),
                None => Err(CleanupError::DirectoryNotFound(
                    self.config.plugin_dir.clone(),
                )),
            };
        }

        let scanned = match registry::scan(&self.config.plugin_dir, &self.config.scan) {
            Ok(scanned) => scanned,
            Err(err) => {
                self.transition(CleanupState::DirectoryNotFound);
                return Err(err);
            }
        };
        self.source_dir = Some(scanned.root);
        self.transition(CleanupState::Analyzed);

        let plan = registry::analyze(scanned.entries);
        info!(
            plugins = plan.plugin_count(),
            delete = plan.delete().len(),
            "analysis complete"
        );

        if plan.is_empty() || self.config.preview_only {
            self.transition(CleanupState::Completed);
        } else {
            self.transition(CleanupState::AwaitingConfirmation);
        }

        Ok(self.plan.insert(plan))
    }

    /// Apply the operator's decision to an analyzed plan.
    ///
    /// Only a plan awaiting confirmation can be backed up and deleted. Once the
    /// run has an outcome, further calls report `Finished` and touch nothing.
    pub fn resolve(&mut self, decision: Decision) -> CleanupOutcome {
        if self.resolved {
            return CleanupOutcome::Finished(self.state);
        }

        match self.state {
            CleanupState::AwaitingConfirmation => {}
            CleanupState::Completed => {
                self.resolved = true;
                let planned = self.plan.as_ref().map_or(0, |plan| plan.delete().len());
                return if planned == 0 {
                    CleanupOutcome::NothingToDo
                } else {
                    CleanupOutcome::Previewed { planned }
                };
            }
            CleanupState::DirectoryNotFound => {
                self.resolved = true;
                return CleanupOutcome::DirectoryNotFound(self.config.plugin_dir.clone());
            }
            _ => return CleanupOutcome::NotAnalyzed,
        }

        let (Some(plan), Some(source_dir)) = (self.plan.take(), self.source_dir.clone()) else {
            return CleanupOutcome::NotAnalyzed;
        };
        self.resolved = true;

        if decision == Decision::Abort {
            info!("cleanup aborted by operator");
            self.plan = Some(plan);
            self.transition(CleanupState::Aborted);
            return CleanupOutcome::Aborted;
        }

        self.transition(CleanupState::BackingUp);
        let backup_dir = match &self.config.backup_dir {
            Some(dir) => dir.clone(),
            None => operations::fresh_backup_dir(&source_dir, Local::now()),
        };
        let manifest = match operations::backup(plan.delete(), &backup_dir, &source_dir) {
            Ok(manifest) => manifest,
            Err(err) => {
                warn!("{err}; nothing was deleted");
                self.plan = Some(plan);
                self.transition(CleanupState::BackupFailed);
                return CleanupOutcome::BackupFailed(err);
            }
        };

        self.transition(CleanupState::Deleting);
        let report = operations::delete_entries(plan.delete());
        info!(
            deleted = report.success_count(),
            total = report.total(),
            "cleanup finished"
        );

        self.plan = Some(plan);
        self.transition(CleanupState::Completed);
        CleanupOutcome::Completed {
            backup_dir,
            manifest,
            report,
        }
    }

    /// Run the whole pipeline, asking `confirm` when a decision is needed.
    pub fn run<C: Confirm + ?Sized>(&mut self, confirm: &mut C) -> CleanupOutcome {
        if self.resolved {
            return CleanupOutcome::Finished(self.state);
        }
        let preview_only = self.config.preview_only;
        let analyzed = self.analyze().map(|plan| {
            if plan.is_empty() || preview_only {
                None
            } else {
                Some(confirm.confirm(plan))
            }
        });

        let decision = match analyzed {
            Ok(decision) => decision.unwrap_or(Decision::Abort),
            Err(err) => {
                if !matches!(err, CleanupError::DirectoryNotFound(_)) {
                    warn!("{err}");
                }
                Decision::Abort
            }
        };
        self.resolve(decision)
    }

    fn transition(&mut self, next: CleanupState) {
        debug!(from = ?self.state, to = ?next, "state change");
        self.state = next;
    }
}
