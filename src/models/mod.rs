//! Data models for doctagger.
//!
//! - [`TagsDocument`] / [`Tag`]: a documentation comment parsed into ordered tags
//! - [`ConfigsModel`] / [`TagConfigModel`]: the ordered tag rules loaded from a definition
//! - [`DeclarationBlock`]: one declaration unit with its comment, annotations and kind
//! - [`RunState`] / [`ProcessReport`]: progress and results of a run
//!
//! All rule models derive `Serialize`/`Deserialize` so definitions can be
//! read from and written to YAML.

pub mod block;
pub mod config;
pub mod run_state;
pub mod tag;

pub use block::{DeclarationBlock, DeclarationKind, detect_newline};
pub use config::{
    ConfigsModel, InsertPosition, LocationConfig, LocationMode, OverwritePolicy, TagConfigModel,
};
pub use run_state::{ProcessReport, RunState};
pub use tag::{DocEntry, Tag, TagName, TagsDocument};
