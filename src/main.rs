//! doctagger - command line entry point.
//!
//! Resolves settings, initializes logging, loads the tag definition and runs
//! the tagging service over the target. The summary goes to stdout; the
//! process exits non-zero when any file failed or the run could not start.

use anyhow::Result;
use camino::Utf8PathBuf;
use clap::Parser;
use doctagger::{APP_NAME, ConfigManager, StateManager, TaggingService, VERSION};
use std::process::ExitCode;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Source file or directory to rewrite
    target: Utf8PathBuf,

    /// YAML tag definition listing the rules in evaluation order
    definition: Utf8PathBuf,

    /// Optional YAML settings file
    #[arg(short, long)]
    settings: Option<Utf8PathBuf>,

    /// Extension of files to process when the target is a directory
    #[arg(short, long)]
    extension: Option<String>,

    /// Report what would change without writing anything
    #[arg(long)]
    dry_run: bool,

    /// Log per-block and per-rule decisions
    #[arg(long)]
    debug: bool,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let mut settings = ConfigManager::new(cli.settings.clone()).load_settings()?;
    if let Some(extension) = cli.extension {
        settings.extension = extension;
    }
    settings.dry_run |= cli.dry_run;
    settings.debug |= cli.debug;

    let _guard = doctagger::logging::setup_logging_with_console(
        &settings.log_dir,
        &settings.log_prefix,
        settings.debug,
        settings.debug,
    )?;
    tracing::info!("Starting {} v{}", APP_NAME, VERSION);

    let service = match TaggingService::initialize(
        &cli.target,
        &cli.definition,
        settings,
        StateManager::new(),
    ) {
        Ok(service) => service,
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("error: {}", e);
            return Ok(ExitCode::FAILURE);
        }
    };

    let report = service.process();
    service.metrics().log_summary();
    println!("{}", report.summary());

    Ok(if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_parses_flags() {
        let cli = Cli::parse_from(["doctagger", "src", "rules.yaml", "--dry-run", "-e", "kt"]);
        assert_eq!(cli.target, Utf8PathBuf::from("src"));
        assert_eq!(cli.definition, Utf8PathBuf::from("rules.yaml"));
        assert!(cli.dry_run);
        assert!(!cli.debug);
        assert_eq!(cli.extension.as_deref(), Some("kt"));
    }
}
