use crate::error::{SkipReason, SkipTarget};
use camino::Utf8PathBuf;
use indexmap::IndexMap;
use std::fmt::Write as _;

/// Single source of truth for the progress and results of one tagging run.
///
/// `RunState` is wrapped in `Arc<RwLock<RunState>>` by
/// [`crate::state::StateManager`]; mutate it through
/// [`update()`](crate::state::StateManager::update) so change events go out.
#[derive(Clone, Debug, Default)]
pub struct RunState {
    // Inputs
    pub target_path: Option<Utf8PathBuf>,
    pub definition_path: Option<Utf8PathBuf>,
    pub rule_count: usize,
    pub dry_run: bool,

    // Runtime state
    pub is_running: bool,
    pub current_file: Option<Utf8PathBuf>,
    pub progress: usize,
    pub total_files: usize,

    // Results, in processing order
    pub processed_files: IndexMap<Utf8PathBuf, usize>,
    pub failed_files: Vec<SkipReason>,
    pub skipped: Vec<SkipReason>,
    pub total_replace_count: usize,
}

impl RunState {
    /// Clear results from a previous run, keeping the inputs
    pub fn reset_run_state(&mut self) {
        self.is_running = false;
        self.current_file = None;
        self.progress = 0;
        self.total_files = 0;
        self.processed_files.clear();
        self.failed_files.clear();
        self.skipped.clear();
        self.total_replace_count = 0;
    }

    /// Record a file that was processed (and written unless dry-running)
    pub fn record_file(&mut self, path: Utf8PathBuf, replace_count: usize) {
        self.total_replace_count += replace_count;
        self.processed_files.insert(path, replace_count);
        self.progress += 1;
    }

    pub fn record_failure(&mut self, reason: SkipReason) {
        self.failed_files.push(reason);
        self.progress += 1;
    }

    pub fn record_skip(&mut self, reason: SkipReason) {
        self.skipped.push(reason);
    }

    pub fn to_report(&self) -> ProcessReport {
        ProcessReport {
            files_processed: self.processed_files.len(),
            total_tags_changed: self.total_replace_count,
            replacements_by_file: self.processed_files.clone(),
            skipped_files: self.failed_files.clone(),
            skipped_entries: self.skipped.clone(),
            dry_run: self.dry_run,
        }
    }
}

/// Final summary handed back to the caller after a run
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProcessReport {
    pub files_processed: usize,
    pub total_tags_changed: usize,
    pub replacements_by_file: IndexMap<Utf8PathBuf, usize>,
    pub skipped_files: Vec<SkipReason>,
    /// Skipped blocks and rules
    pub skipped_entries: Vec<SkipReason>,
    pub dry_run: bool,
}

impl ProcessReport {
    /// True when every file was processed without a per-file failure
    pub fn is_success(&self) -> bool {
        self.skipped_files.is_empty()
    }

    pub fn skipped_blocks(&self) -> impl Iterator<Item = &SkipReason> {
        self.skipped_entries
            .iter()
            .filter(|reason| matches!(reason.target, SkipTarget::Block { .. }))
    }

    pub fn summary(&self) -> String {
        let mut out = format!(
            "{} file(s) processed, {} tag(s) changed",
            self.files_processed, self.total_tags_changed
        );
        if self.dry_run {
            out.push_str(" (dry run, nothing written)");
        }
        if !self.skipped_files.is_empty() {
            let _ = write!(out, "\nSkipped files ({}):", self.skipped_files.len());
            for reason in &self.skipped_files {
                let _ = write!(out, "\n  - {}", reason);
            }
        }
        if !self.skipped_entries.is_empty() {
            let _ = write!(out, "\nSkipped blocks/rules ({}):", self.skipped_entries.len());
            for reason in &self.skipped_entries {
                let _ = write!(out, "\n  - {}", reason);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_default_state() {
        let state = RunState::default();
        assert!(!state.is_running);
        assert_eq!(state.total_replace_count, 0);
        assert!(state.processed_files.is_empty());
    }

    #[test]
    fn test_record_file_accumulates() {
        let mut state = RunState::default();
        state.record_file(Utf8PathBuf::from("A.java"), 3);
        state.record_file(Utf8PathBuf::from("B.java"), 0);

        assert_eq!(state.total_replace_count, 3);
        assert_eq!(state.progress, 2);
        let files: Vec<&str> = state.processed_files.keys().map(|p| p.as_str()).collect();
        assert_eq!(files, vec!["A.java", "B.java"]);
    }

    #[test]
    fn test_failures_do_not_count_replacements() {
        let mut state = RunState::default();
        state.record_file(Utf8PathBuf::from("A.java"), 2);
        state.record_failure(SkipReason::file(Utf8PathBuf::from("B.java"), "unreadable"));

        let report = state.to_report();
        assert_eq!(report.files_processed, 1);
        assert_eq!(report.total_tags_changed, 2);
        assert!(!report.is_success());
    }

    #[test]
    fn test_reset_run_state_keeps_inputs() {
        let mut state = RunState {
            target_path: Some(Utf8PathBuf::from("src")),
            rule_count: 4,
            ..RunState::default()
        };
        state.record_file(Utf8PathBuf::from("A.java"), 1);
        state.reset_run_state();

        assert_eq!(state.target_path, Some(Utf8PathBuf::from("src")));
        assert_eq!(state.rule_count, 4);
        assert_eq!(state.total_replace_count, 0);
        assert_eq!(state.progress, 0);
    }

    #[test]
    fn test_report_summary_lists_skips() {
        let mut state = RunState::default();
        state.record_file(Utf8PathBuf::from("A.java"), 1);
        state.record_skip(SkipReason::block(
            Utf8PathBuf::from("A.java"),
            Uuid::new_v4(),
            "Foo",
            "unterminated comment",
        ));

        let report = state.to_report();
        assert_eq!(report.skipped_blocks().count(), 1);
        let summary = report.summary();
        assert!(summary.contains("1 file(s) processed, 1 tag(s) changed"));
        assert!(summary.contains("A.java [Foo]: unterminated comment"));
    }
}
