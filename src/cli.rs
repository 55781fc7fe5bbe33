//! Command-line interface definitions for the schedule scraper.
//!
//! This module defines the CLI arguments and subcommands using the `clap`
//! crate. The config path can also be supplied through the environment.

use clap::{Parser, Subcommand};
use kitis_schedule::models::SourceKind;
use std::path::PathBuf;

/// Command-line arguments for the schedule scraper.
///
/// # Examples
///
/// ```sh
/// # Check that the site is up
/// kitis_schedule status
///
/// # List the known groups
/// kitis_schedule catalog --kind group
///
/// # Print a group's schedule and keep the parsed data
/// kitis_schedule schedule --kind group --source ИС-21 --json ./out/is21.json
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to config.yaml file
    #[arg(short, long, env = "KITIS_SCHEDULE_CONFIG", default_value = "config.yaml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Time a request to the site's landing page
    Status,

    /// List the sources found on the index pages
    Catalog {
        /// Only list this kind
        #[arg(short, long, value_enum)]
        kind: Option<SourceKind>,
    },

    /// Render the schedule of one source
    Schedule {
        #[arg(short, long, value_enum)]
        kind: SourceKind,

        /// Display name as listed by `catalog`
        #[arg(short, long)]
        source: String,

        /// Lesson name length cap; 0 or less disables it
        #[arg(short, long, allow_negative_numbers = true)]
        truncate: Option<i32>,

        /// Also write the parsed schedule to this JSON file
        #[arg(short, long)]
        json: Option<PathBuf>,
    },

    /// Render the lesson-accounting records of one source
    Records {
        #[arg(short, long, value_enum)]
        kind: SourceKind,

        #[arg(short, long)]
        source: String,
    },

    /// Save a page as UTF-8 text, e.g. to capture a parser fixture
    Dump {
        #[arg(short, long)]
        url: String,

        #[arg(short, long)]
        out: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_schedule_parsing() {
        let cli = Cli::parse_from([
            "kitis_schedule",
            "--config",
            "/etc/kitis.yaml",
            "schedule",
            "--kind",
            "lecturer",
            "--source",
            "Иванов И.И.",
            "--truncate",
            "40",
        ]);

        assert_eq!(cli.config, PathBuf::from("/etc/kitis.yaml"));
        assert_eq!(
            cli.command,
            Command::Schedule {
                kind: SourceKind::Lecturer,
                source: "Иванов И.И.".to_string(),
                truncate: Some(40),
                json: None,
            }
        );
    }

    #[test]
    fn test_cli_short_flags() {
        let cli = Cli::parse_from([
            "kitis_schedule",
            "records",
            "-k",
            "group",
            "-s",
            "ИС-21",
        ]);

        assert_eq!(
            cli.command,
            Command::Records {
                kind: SourceKind::Group,
                source: "ИС-21".to_string(),
            }
        );
    }

    #[test]
    fn test_cli_negative_truncate() {
        let cli = Cli::parse_from([
            "kitis_schedule",
            "schedule",
            "-k",
            "room",
            "-s",
            "301",
            "-t",
            "-1",
        ]);
        let Command::Schedule { truncate, .. } = cli.command else {
            panic!("expected schedule command");
        };
        assert_eq!(truncate, Some(-1));
    }

    #[test]
    fn test_cli_catalog_without_kind() {
        let cli = Cli::parse_from(["kitis_schedule", "catalog"]);
        assert_eq!(cli.command, Command::Catalog { kind: None });
    }

    #[test]
    fn test_cli_rejects_unknown_kind() {
        let result = Cli::try_parse_from(["kitis_schedule", "catalog", "--kind", "faculty"]);
        assert!(result.is_err());
    }
}
