use std::collections::BTreeMap;
use std::path::Path;

use camino::Utf8Path;
use serde::Serialize;
use tempfile::TempPath;
use tracing::{debug, info, warn};

use crate::classify::{FieldClass, classify_name};
use crate::edit::WriteInstructionSet;
use crate::error::MetaError;
use crate::exiftool::TagTool;
use crate::store::ManagedStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitState {
    Idle,
    Staged,
    Cleared,
    Rewritten,
    Committed,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommitReport {
    pub file_id: String,
    pub state: CommitState,
    pub applied: usize,
}

/// Applies a write instruction set to one managed file. All tool operations
/// run against a staging copy; the target is only replaced by the final
/// rename, so any earlier failure leaves it byte-identical.
pub struct CommitPipeline<'a, T: TagTool> {
    store: &'a ManagedStore,
    tool: &'a T,
}

struct Transaction {
    file_id: String,
    state: CommitState,
    staging: Option<TempPath>,
    argfile: Option<TempPath>,
}

impl Transaction {
    fn advance(&mut self, next: CommitState) {
        debug!(file = %self.file_id, from = ?self.state, to = ?next, "commit state");
        self.state = next;
    }

    fn cleanup(&mut self) {
        for artifact in [self.staging.take(), self.argfile.take()].into_iter().flatten() {
            let path = artifact.to_path_buf();
            if !path.exists() {
                let _ = artifact.keep();
                continue;
            }
            if let Err(err) = artifact.close() {
                warn!(path = %path.display(), error = %err, "failed to remove temp artifact");
            }
        }
    }
}

impl<'a, T: TagTool> CommitPipeline<'a, T> {
    pub fn new(store: &'a ManagedStore, tool: &'a T) -> Self {
        Self { store, tool }
    }

    pub fn commit(
        &self,
        file_id: &str,
        instructions: &WriteInstructionSet,
    ) -> Result<CommitReport, MetaError> {
        if !instructions.clear_all {
            return Err(MetaError::Validation(
                "commits must clear all tags before rewriting".to_string(),
            ));
        }
        let target = self.store.resolve_existing(file_id)?;
        let directives = instruction_lines(&instructions.assignments);

        let mut tx = Transaction {
            file_id: file_id.to_string(),
            state: CommitState::Idle,
            staging: None,
            argfile: None,
        };
        let outcome = self.run(&mut tx, &target, &directives);
        tx.cleanup();

        match outcome {
            Ok(()) => {
                info!(file = %file_id, applied = directives.len(), "metadata committed");
                Ok(CommitReport {
                    file_id: file_id.to_string(),
                    state: tx.state,
                    applied: directives.len(),
                })
            }
            Err(err) => {
                warn!(file = %file_id, at = ?tx.state, error = %err, "commit failed");
                tx.advance(CommitState::Failed);
                Err(err)
            }
        }
    }

    pub fn delete_all(&self, file_id: &str) -> Result<CommitReport, MetaError> {
        self.commit(file_id, &WriteInstructionSet::strip_all())
    }

    fn run(
        &self,
        tx: &mut Transaction,
        target: &Utf8Path,
        directives: &[String],
    ) -> Result<(), MetaError> {
        let staging = self.store.create_staging(target)?;
        let staging_path = staging.to_path_buf();
        tx.staging = Some(staging);
        ManagedStore::copy(target.as_std_path(), &staging_path)?;
        tx.advance(CommitState::Staged);

        self.store.ensure_inside(&staging_path)?;
        self.tool.clear_all(&staging_path)?;
        tx.advance(CommitState::Cleared);

        if !directives.is_empty() {
            let argfile = self.store.write_argfile(directives)?;
            let argfile_path = argfile.to_path_buf();
            tx.argfile = Some(argfile);
            self.store.ensure_inside(&staging_path)?;
            self.tool.apply_instructions(&staging_path, &argfile_path)?;
            tx.advance(CommitState::Rewritten);
        }

        self.store.ensure_inside(target.as_std_path())?;
        self.swap_into_place(tx, target.as_std_path())?;
        tx.advance(CommitState::Committed);
        Ok(())
    }

    fn swap_into_place(&self, tx: &mut Transaction, target: &Path) -> Result<(), MetaError> {
        let Some(staging) = tx.staging.take() else {
            return Err(MetaError::Io("staging file missing before commit".to_string()));
        };
        staging.persist(target).map_err(|err| {
            let message = format!("replace {}: {}", target.display(), err.error);
            tx.staging = Some(err.path);
            MetaError::Io(message)
        })
    }
}

/// One `-Name=value` line per assignment. Names outside the editable policy
/// and blank values are skipped; line breaks inside a value become spaces so
/// a value cannot start a new directive.
pub fn instruction_lines(assignments: &BTreeMap<String, String>) -> Vec<String> {
    assignments
        .iter()
        .filter_map(|(name, value)| {
            if classify_name(name) != FieldClass::Editable {
                warn!(tag = %name, "dropping write to read-only tag");
                return None;
            }
            if value.trim().is_empty() {
                return None;
            }
            let value = value.replace(['\r', '\n'], " ");
            Some(format!("-{name}={value}"))
        })
        .collect()
}
