// State management module
//
// This module provides the StateManager which wraps RunState with thread-safe access
// using Arc<RwLock<T>> and emits change events to whoever reports on a run.

use crate::error::SkipReason;
use crate::models::{ProcessReport, RunState};
use camino::Utf8PathBuf;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::broadcast;

/// Change events emitted when run state is modified
#[derive(Clone, Debug, PartialEq)]
pub enum RunChange {
    /// A run has started
    RunStarted { total_files: usize, dry_run: bool },

    /// A file was rewritten (or would have been, on a dry run)
    FileProcessed {
        path: Utf8PathBuf,
        replace_count: usize,
    },

    /// A file was skipped because of an I/O failure
    FileFailed { reason: SkipReason },

    /// A block or rule inside a file was skipped
    BlockSkipped { reason: SkipReason },

    /// The run has finished
    RunFinished {
        files_processed: usize,
        files_failed: usize,
        total_replace_count: usize,
    },
}

/// Thread-safe run state with event emission.
///
/// This is the reporter the tagging service is handed: it never reaches for
/// process-wide state. Mutations go through [`update()`](Self::update), which
/// diffs the state and broadcasts the resulting [`RunChange`] events.
pub struct StateManager {
    state: Arc<RwLock<RunState>>,
    state_tx: broadcast::Sender<RunChange>,
}

impl StateManager {
    /// Create a new StateManager with a broadcast buffer of 100 events
    pub fn new() -> Self {
        let (state_tx, _) = broadcast::channel(100);
        Self {
            state: Arc::new(RwLock::new(RunState::default())),
            state_tx,
        }
    }

    /// Clone of the current state
    pub fn snapshot(&self) -> RunState {
        self.state.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Execute a function with read access to the state
    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&RunState) -> R,
    {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        f(&state)
    }

    /// Update the state and emit change events.
    ///
    /// Returns the events that were emitted.
    pub fn update<F>(&self, update_fn: F) -> Vec<RunChange>
    where
        F: FnOnce(&mut RunState),
    {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let old_state = state.clone();

        update_fn(&mut state);

        let changes = Self::detect_changes(&old_state, &state);
        for change in &changes {
            // No subscribers is fine
            let _ = self.state_tx.send(change.clone());
        }
        changes
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RunChange> {
        self.state_tx.subscribe()
    }

    fn detect_changes(old: &RunState, new: &RunState) -> Vec<RunChange> {
        let mut changes = Vec::new();

        if !old.is_running && new.is_running {
            changes.push(RunChange::RunStarted {
                total_files: new.total_files,
                dry_run: new.dry_run,
            });
        }

        for (path, replace_count) in new.processed_files.iter().skip(old.processed_files.len()) {
            changes.push(RunChange::FileProcessed {
                path: path.clone(),
                replace_count: *replace_count,
            });
        }

        for reason in new.failed_files.iter().skip(old.failed_files.len()) {
            changes.push(RunChange::FileFailed {
                reason: reason.clone(),
            });
        }

        for reason in new.skipped.iter().skip(old.skipped.len()) {
            changes.push(RunChange::BlockSkipped {
                reason: reason.clone(),
            });
        }

        if old.is_running && !new.is_running {
            changes.push(RunChange::RunFinished {
                files_processed: new.processed_files.len(),
                files_failed: new.failed_files.len(),
                total_replace_count: new.total_replace_count,
            });
        }

        changes
    }

    // Convenience methods for the tagging service

    /// Record the inputs of a run
    pub fn set_inputs(&self, target: Utf8PathBuf, definition: Utf8PathBuf, rule_count: usize) -> Vec<RunChange> {
        self.update(|state| {
            state.target_path = Some(target);
            state.definition_path = Some(definition);
            state.rule_count = rule_count;
        })
    }

    /// Start a run over `total_files` files
    pub fn start_run(&self, total_files: usize, dry_run: bool) -> Vec<RunChange> {
        self.update(|state| {
            state.reset_run_state();
            state.is_running = true;
            state.total_files = total_files;
            state.dry_run = dry_run;
        })
    }

    pub fn set_current_file(&self, path: Option<Utf8PathBuf>) -> Vec<RunChange> {
        self.update(|state| state.current_file = path)
    }

    /// Record a processed file together with the skips found inside it
    pub fn record_file(&self, path: Utf8PathBuf, replace_count: usize, skipped: Vec<SkipReason>) -> Vec<RunChange> {
        self.update(|state| {
            for reason in skipped {
                state.record_skip(reason);
            }
            state.record_file(path, replace_count);
        })
    }

    pub fn record_failure(&self, reason: SkipReason) -> Vec<RunChange> {
        self.update(|state| state.record_failure(reason))
    }

    pub fn finish_run(&self) -> Vec<RunChange> {
        self.update(|state| {
            state.is_running = false;
            state.current_file = None;
        })
    }

    /// Final report for the most recent run
    pub fn report(&self) -> ProcessReport {
        self.read(RunState::to_report)
    }

    /// Shared handle to the state for use in worker threads
    pub fn state_arc(&self) -> Arc<RwLock<RunState>> {
        Arc::clone(&self.state)
    }
}

impl Default for StateManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for StateManager {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            state_tx: self.state_tx.clone(),
        }
    }
}
