// doctagger - policy-driven tag governance for documentation comments
//
// This is the library crate containing the tagging pipeline and its data structures.
// The binary crate (main.rs) is a thin command line shell around it.

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod services;
pub mod state;

// Re-export commonly used types for convenience
pub use config::{ConfigManager, Settings};
pub use error::{SkipReason, TaggerError};
pub use models::{ConfigsModel, ProcessReport, TagConfigModel, TagsDocument};
pub use services::{CodeModel, TaggingService};
pub use state::{RunChange, StateManager};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
