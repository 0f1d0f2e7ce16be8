//! Orchestration: enumerate target files and rewrite each one.
//!
//! Fatal errors (unreadable definition, missing target) surface from
//! [`TaggingService::initialize`] before any file is touched. Once a run is
//! under way every failure is confined to its file: the file is recorded as
//! skipped and the run moves on. A file is written whole or not at all.

use crate::config::{ConfigManager, Settings};
use crate::error::{SkipReason, SkipTarget, TaggerError};
use crate::metrics::Metrics;
use crate::models::{ConfigsModel, ProcessReport};
use crate::services::code_model::{CodeModel, FileRewrite};
use crate::state::StateManager;
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::HashSet;
use std::fs;
use std::sync::Arc;
use std::time::Instant;
use walkdir::WalkDir;

/// Whole-file source access.
#[cfg_attr(test, mockall::automock)]
pub trait SourceStore: Send + Sync {
    fn read_to_string(&self, path: &Utf8Path) -> std::io::Result<String>;

    /// Replace the file's contents entirely
    fn write(&self, path: &Utf8Path, contents: &str) -> std::io::Result<()>;
}

/// [`SourceStore`] backed by the local file system.
///
/// Writes go to a sibling temporary file that is then renamed over the
/// target, so a failed write never leaves a truncated source file.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsSourceStore;

impl SourceStore for FsSourceStore {
    fn read_to_string(&self, path: &Utf8Path) -> std::io::Result<String> {
        fs::read_to_string(path)
    }

    fn write(&self, path: &Utf8Path, contents: &str) -> std::io::Result<()> {
        let file_name = path.file_name().unwrap_or("source");
        let temp_path = path.with_file_name(format!(".{}.doctagger.tmp", file_name));
        fs::write(&temp_path, contents)?;
        fs::rename(&temp_path, path).inspect_err(|_| {
            let _ = fs::remove_file(&temp_path);
        })
    }
}

/// Drives the code model over every target file
pub struct TaggingService<S: SourceStore = FsSourceStore> {
    store: S,
    settings: Settings,
    state: StateManager,
    metrics: Arc<Metrics>,
    target: Utf8PathBuf,
    configs_model: ConfigsModel,
}

impl TaggingService<FsSourceStore> {
    /// Validate `target` and load the rules from `definition`.
    pub fn initialize(
        target: &Utf8Path,
        definition: &Utf8Path,
        settings: Settings,
        state: StateManager,
    ) -> Result<Self, TaggerError> {
        Self::initialize_with_store(FsSourceStore, target, definition, settings, state)
    }
}

impl<S: SourceStore> TaggingService<S> {
    /// Same as [`TaggingService::initialize`] with a custom [`SourceStore`]
    pub fn initialize_with_store(
        store: S,
        target: &Utf8Path,
        definition: &Utf8Path,
        settings: Settings,
        state: StateManager,
    ) -> Result<Self, TaggerError> {
        let configs_model = ConfigManager::default().load_definition(definition)?;
        let service = Self::with_rules(store, target, configs_model, settings, state)?;
        service
            .state
            .set_inputs(target.to_owned(), definition.to_owned(), service.configs_model.len());
        Ok(service)
    }

    /// Build a service from an in-memory rule list.
    pub fn with_rules(
        store: S,
        target: &Utf8Path,
        configs_model: ConfigsModel,
        settings: Settings,
        state: StateManager,
    ) -> Result<Self, TaggerError> {
        if !target.exists() {
            return Err(TaggerError::TargetNotFound(target.to_owned()));
        }

        Ok(Self {
            store,
            settings,
            state,
            metrics: Arc::new(Metrics::new()),
            target: target.to_owned(),
            configs_model,
        })
    }

    /// Share a metrics instance with other drivers
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    pub fn state(&self) -> &StateManager {
        &self.state
    }

    pub fn configs_model(&self) -> &ConfigsModel {
        &self.configs_model
    }

    /// Files to process, in a stable order.
    ///
    /// A file target is used as is. A directory is walked recursively and
    /// filtered by the configured extension. Entries that cannot be read are
    /// returned as skips.
    pub fn collect_targets(&self) -> (Vec<Utf8PathBuf>, Vec<SkipReason>) {
        if self.target.is_file() {
            return (vec![self.target.clone()], Vec::new());
        }

        let extension = self.settings.extension.trim_start_matches('.');
        let mut files = Vec::new();
        let mut skipped = Vec::new();
        for entry in WalkDir::new(&self.target).follow_links(false).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e
                        .path()
                        .and_then(|p| Utf8Path::from_path(p))
                        .map_or_else(|| self.target.clone(), Utf8Path::to_owned);
                    tracing::warn!("Skipping unreadable entry {}: {}", path, e);
                    skipped.push(SkipReason::file(path, e.to_string()));
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(path) = Utf8Path::from_path(entry.path()) else {
                tracing::warn!("Skipping non UTF-8 path {}", entry.path().display());
                continue;
            };
            if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case(extension)) {
                files.push(path.to_owned());
            }
        }
        (files, skipped)
    }

    /// Rewrite every target file.
    pub fn process(&self) -> ProcessReport {
        let (files, walk_failures) = self.collect_targets();
        let dry_run = self.settings.dry_run;
        self.state.start_run(files.len(), dry_run);
        tracing::info!(
            "Processing {} file(s) under {} with {} rule(s){}",
            files.len(),
            self.target,
            self.configs_model.len(),
            if dry_run { " (dry run)" } else { "" }
        );

        for reason in walk_failures {
            self.metrics.record_file_failed();
            self.state.record_failure(reason);
        }

        // Rule skips repeat in every file; the first one stands for the run
        let mut reported_rules = HashSet::new();
        for path in files {
            self.state.set_current_file(Some(path.clone()));
            let start = Instant::now();
            match self.process_file(&path) {
                Ok(mut rewrite) => {
                    rewrite.skipped.retain(|reason| match &reason.target {
                        SkipTarget::Rule { tag } => reported_rules.insert(tag.clone()),
                        _ => true,
                    });
                    self.metrics.record_processing_time(start.elapsed());
                    self.metrics.record_file_processed(
                        rewrite.blocks_rewritten,
                        rewrite.blocks_skipped(),
                        rewrite.replace_count,
                    );
                    self.state.record_file(path, rewrite.replace_count, rewrite.skipped);
                }
                Err(e) => {
                    tracing::warn!("Skipping {}: {}", path, e);
                    self.metrics.record_file_failed();
                    self.state.record_failure(SkipReason::file(path, e.to_string()));
                }
            }
        }

        self.state.finish_run();
        let report = self.state.report();
        tracing::info!("{}", report.summary());
        report
    }

    /// Read, rewrite and (unless dry-running) write back one file.
    pub fn process_file(&self, path: &Utf8Path) -> Result<FileRewrite, TaggerError> {
        let source = self.store.read_to_string(path).map_err(|source| TaggerError::FileIo {
            path: path.to_owned(),
            source,
        })?;

        let mut model = CodeModel::parse(&source);
        let rewrite = model.rewrite(&self.configs_model, path);
        if rewrite.blocks_rewritten == 0 {
            tracing::debug!("No changes for {}", path);
            return Ok(rewrite);
        }

        let output = model.render();
        if self.settings.dry_run {
            tracing::info!("Would update {} ({} tag(s) changed)", path, rewrite.replace_count);
        } else {
            self.store.write(path, &output).map_err(|source| TaggerError::FileIo {
                path: path.to_owned(),
                source,
            })?;
            tracing::info!("Updated {} ({} tag(s) changed)", path, rewrite.replace_count);
        }
        Ok(rewrite)
    }

    /// Tags changed across successfully processed files of the last run
    pub fn total_replace_count(&self) -> usize {
        self.state.read(|state| state.total_replace_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{InsertPosition, OverwritePolicy, TagConfigModel, TagName};
    use crate::state::RunChange;
    use std::io;
    use tempfile::TempDir;

    const CLASS: &str = "/** Widget. */\npublic class Widget {\n}\n";

    fn rules() -> ConfigsModel {
        ConfigsModel::new(vec![
            TagConfigModel::new(TagName::Since, "1.0")
                .with_position(InsertPosition::Beginning)
                .with_overwrite(OverwritePolicy::Always),
        ])
    }

    fn utf8(dir: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap()
    }

    #[test]
    fn test_missing_target_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let missing = utf8(&temp_dir).join("nope");

        let result = TaggingService::with_rules(
            FsSourceStore,
            &missing,
            rules(),
            Settings::default(),
            StateManager::new(),
        );
        assert!(matches!(result, Err(TaggerError::TargetNotFound(_))));
    }

    #[test]
    fn test_read_failure_is_recorded_and_run_continues() {
        let temp_dir = TempDir::new().unwrap();
        let root = utf8(&temp_dir);
        fs::write(root.join("A.java"), CLASS).unwrap();
        fs::write(root.join("B.java"), CLASS).unwrap();

        let mut store = MockSourceStore::new();
        store
            .expect_read_to_string()
            .withf(|path| path.file_name() == Some("A.java"))
            .returning(|_| Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied")));
        store
            .expect_read_to_string()
            .withf(|path| path.file_name() == Some("B.java"))
            .returning(|_| Ok(CLASS.to_string()));
        store.expect_write().times(1).returning(|_, _| Ok(()));

        let service =
            TaggingService::with_rules(store, &root, rules(), Settings::default(), StateManager::new()).unwrap();
        let report = service.process();

        assert_eq!(report.files_processed, 1);
        assert_eq!(report.skipped_files.len(), 1);
        assert!(report.skipped_files[0].path.ends_with("A.java"));
        assert_eq!(report.total_tags_changed, 1);
        assert_eq!(service.total_replace_count(), 1);
    }

    #[test]
    fn test_write_failure_does_not_count_replacements() {
        let temp_dir = TempDir::new().unwrap();
        let file = utf8(&temp_dir).join("A.java");
        fs::write(&file, CLASS).unwrap();

        let mut store = MockSourceStore::new();
        store
            .expect_read_to_string()
            .returning(|_| Ok(CLASS.to_string()));
        store
            .expect_write()
            .returning(|_, _| Err(io::Error::other("disk full")));

        let service =
            TaggingService::with_rules(store, &file, rules(), Settings::default(), StateManager::new()).unwrap();
        let report = service.process();

        assert_eq!(report.files_processed, 0);
        assert_eq!(report.total_tags_changed, 0);
        assert!(!report.is_success());
        assert_eq!(service.metrics().files_failed.load(std::sync::atomic::Ordering::Relaxed), 1);
    }

    #[test]
    fn test_dry_run_never_writes() {
        let temp_dir = TempDir::new().unwrap();
        let file = utf8(&temp_dir).join("A.java");
        fs::write(&file, CLASS).unwrap();

        let mut store = MockSourceStore::new();
        let expected = file.clone();
        store
            .expect_read_to_string()
            .withf(move |path| path.as_str() == expected.as_str())
            .returning(|_| Ok(CLASS.to_string()));
        store.expect_write().never();

        let settings = Settings {
            dry_run: true,
            ..Settings::default()
        };
        let service = TaggingService::with_rules(store, &file, rules(), settings, StateManager::new()).unwrap();
        let report = service.process();

        assert!(report.dry_run);
        assert_eq!(report.total_tags_changed, 1);
    }

    #[test]
    fn test_unchanged_file_is_not_written() {
        let temp_dir = TempDir::new().unwrap();
        let file = utf8(&temp_dir).join("A.java");

        let mut store = MockSourceStore::new();
        store
            .expect_read_to_string()
            .returning(|_| Ok("/**\n * @since 1.0\n * Widget.\n */\nclass Widget {\n".to_string()));
        store.expect_write().never();
        fs::write(&file, "").unwrap();

        let service = TaggingService::with_rules(store, &file, rules(), Settings::default(), StateManager::new()).unwrap();
        let report = service.process();
        assert_eq!(report.files_processed, 1);
        assert_eq!(report.total_tags_changed, 0);
    }

    #[test]
    fn test_unknown_rule_reported_once_per_run() {
        let temp_dir = TempDir::new().unwrap();
        let root = utf8(&temp_dir);
        let two_blocks = "/** Widget. */\npublic class Widget {\n    /** Size. */\n    int size;\n}\n";
        fs::write(root.join("A.java"), two_blocks).unwrap();
        fs::write(root.join("B.java"), two_blocks).unwrap();

        let configs = ConfigsModel::new(vec![
            TagConfigModel::new(TagName::Custom("madeUp".to_string()), "x"),
            TagConfigModel::new(TagName::Since, "1.0"),
        ]);
        let service =
            TaggingService::with_rules(FsSourceStore, &root, configs, Settings::default(), StateManager::new()).unwrap();
        let report = service.process();

        let rule_skips: Vec<&SkipReason> = report
            .skipped_entries
            .iter()
            .filter(|reason| matches!(reason.target, SkipTarget::Rule { .. }))
            .collect();
        assert_eq!(rule_skips.len(), 1);
        assert!(rule_skips[0].path.ends_with("A.java"));
        assert_eq!(report.total_tags_changed, 4);
    }

    #[test]
    fn test_collect_targets_filters_extension() {
        let temp_dir = TempDir::new().unwrap();
        let root = utf8(&temp_dir);
        fs::create_dir_all(root.join("pkg/sub")).unwrap();
        fs::write(root.join("pkg/B.java"), CLASS).unwrap();
        fs::write(root.join("pkg/sub/A.java"), CLASS).unwrap();
        fs::write(root.join("pkg/notes.txt"), "text").unwrap();

        let service =
            TaggingService::with_rules(FsSourceStore, &root, rules(), Settings::default(), StateManager::new()).unwrap();
        let (files, skipped) = service.collect_targets();

        assert!(skipped.is_empty());
        let names: Vec<&str> = files.iter().filter_map(|p| p.file_name()).collect();
        assert_eq!(names, vec!["B.java", "A.java"]);
    }

    #[test]
    fn test_events_are_emitted_in_order() {
        let temp_dir = TempDir::new().unwrap();
        let file = utf8(&temp_dir).join("A.java");
        fs::write(&file, CLASS).unwrap();

        let state = StateManager::new();
        let mut rx = state.subscribe();
        let service = TaggingService::with_rules(FsSourceStore, &file, rules(), Settings::default(), state).unwrap();
        service.process();

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        assert!(matches!(events.first(), Some(RunChange::RunStarted { total_files: 1, .. })));
        assert!(events.iter().any(|e| matches!(e, RunChange::FileProcessed { replace_count: 1, .. })));
        assert!(matches!(events.last(), Some(RunChange::RunFinished { files_processed: 1, .. })));
    }

    #[test]
    fn test_fs_store_writes_whole_file() {
        let temp_dir = TempDir::new().unwrap();
        let file = utf8(&temp_dir).join("A.java");
        fs::write(&file, "old").unwrap();

        FsSourceStore.write(&file, "new contents").unwrap();

        assert_eq!(fs::read_to_string(&file).unwrap(), "new contents");
        let leftovers: Vec<_> = fs::read_dir(temp_dir.path()).unwrap().collect();
        assert_eq!(leftovers.len(), 1);
    }
}
