//! Error types shared by the tagging pipeline.
//!
//! Fatal errors ([`TaggerError::ConfigurationLoad`], [`TaggerError::TargetNotFound`])
//! abort a run before any file is touched. Per-block and per-file errors are
//! recorded as [`SkipReason`] entries and surfaced in the final report.

use camino::Utf8PathBuf;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur while loading definitions or rewriting files
#[derive(Error, Debug)]
pub enum TaggerError {
    #[error("Failed to load tag definition {path}: {reason}")]
    ConfigurationLoad { path: Utf8PathBuf, reason: String },

    #[error("Target not found: {0}")]
    TargetNotFound(Utf8PathBuf),

    #[error("Failed to parse block {block_id} ({element}): {reason}")]
    BlockParse {
        block_id: Uuid,
        element: String,
        reason: String,
    },

    #[error("I/O error on {path}: {source}")]
    FileIo {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl TaggerError {
    /// Whether this error must abort the whole run
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            TaggerError::ConfigurationLoad { .. } | TaggerError::TargetNotFound(_)
        )
    }
}

/// What was skipped during a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipTarget {
    File,
    Block { block_id: Uuid, element: String },
    Rule { tag: String },
}

/// A skipped file, block or rule together with the reason it was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkipReason {
    pub path: Utf8PathBuf,
    pub target: SkipTarget,
    pub message: String,
}

impl SkipReason {
    pub fn file(path: Utf8PathBuf, message: impl Into<String>) -> Self {
        Self {
            path,
            target: SkipTarget::File,
            message: message.into(),
        }
    }

    pub fn block(path: Utf8PathBuf, block_id: Uuid, element: &str, message: impl Into<String>) -> Self {
        Self {
            path,
            target: SkipTarget::Block {
                block_id,
                element: element.to_string(),
            },
            message: message.into(),
        }
    }

    pub fn rule(path: Utf8PathBuf, tag: &str, message: impl Into<String>) -> Self {
        Self {
            path,
            target: SkipTarget::Rule {
                tag: tag.to_string(),
            },
            message: message.into(),
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target {
            SkipTarget::File => write!(f, "{}: {}", self.path, self.message),
            SkipTarget::Block { element, .. } => {
                let element = if element.is_empty() { "<unnamed>" } else { element };
                write!(f, "{} [{}]: {}", self.path, element, self.message)
            }
            SkipTarget::Rule { tag } => write!(f, "{} [rule {}]: {}", self.path, tag, self.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        let fatal = TaggerError::TargetNotFound(Utf8PathBuf::from("missing"));
        assert!(fatal.is_fatal());

        let per_block = TaggerError::BlockParse {
            block_id: Uuid::new_v4(),
            element: "Foo".to_string(),
            reason: "unterminated comment".to_string(),
        };
        assert!(!per_block.is_fatal());
    }

    #[test]
    fn test_skip_reason_display() {
        let reason = SkipReason::block(
            Utf8PathBuf::from("src/Foo.java"),
            Uuid::new_v4(),
            "",
            "unterminated comment",
        );
        assert_eq!(reason.to_string(), "src/Foo.java [<unnamed>]: unterminated comment");

        let reason = SkipReason::file(Utf8PathBuf::from("src/Bar.java"), "permission denied");
        assert_eq!(reason.to_string(), "src/Bar.java: permission denied");
    }
}
