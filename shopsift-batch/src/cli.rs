//! Command-line arguments.

use clap::{ArgAction, Parser};
use shopsift_core::ConfigError;
use shopsift_storage::FIRST_DATA_ROW;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Parser)]
#[command(
    name = "shopsift",
    version,
    about = "Resumable catalog search over a sheet of shopper queries"
)]
pub struct CliArgs {
    /// Configuration file (.yaml, .toml or .json)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// First sheet row to process
    #[arg(long, default_value_t = FIRST_DATA_ROW, value_parser = parse_row)]
    pub start_row: usize,

    /// Last sheet row to process, inclusive
    #[arg(long, value_parser = parse_row)]
    pub end_row: Option<usize>,

    /// Reprocess rows that already have output
    #[arg(long = "no-skip-processed", action = ArgAction::SetFalse)]
    pub skip_processed: bool,

    /// Run connectivity checks and exit
    #[arg(long)]
    pub test: bool,

    /// Append items from this file to the sheet and exit
    #[arg(long, value_name = "PATH")]
    pub import: Option<PathBuf>,
}

fn parse_row(value: &str) -> Result<usize, String> {
    match value.trim().parse::<usize>() {
        Ok(row) if row >= FIRST_DATA_ROW => Ok(row),
        _ => Err(format!("expected a row number >= {}", FIRST_DATA_ROW)),
    }
}

impl CliArgs {
    /// Checks that span several flags.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.end_row {
            Some(end) if end < self.start_row => Err(ConfigError::InvalidValue {
                field: "--end-row".to_string(),
                value: end.to_string(),
                reason: format!("end row is before start row {}", self.start_row),
            }),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    fn args(list: &[&str]) -> Result<CliArgs, clap::Error> {
        CliArgs::try_parse_from(std::iter::once("shopsift").chain(list.iter().copied()))
    }

    #[test]
    fn test_defaults() {
        let parsed = args(&[]).unwrap();
        assert_eq!(parsed.config, None);
        assert_eq!(parsed.start_row, 2);
        assert_eq!(parsed.end_row, None);
        assert!(parsed.skip_processed);
        assert!(!parsed.test);
        assert_eq!(parsed.import, None);
        assert!(parsed.validate().is_ok());
    }

    #[test]
    fn test_all_flags() {
        let parsed = args(&[
            "--config",
            "conf.toml",
            "--start-row",
            "5",
            "--end-row",
            "9",
            "--no-skip-processed",
            "--test",
            "--import",
            "queries.csv",
        ])
        .unwrap();
        assert_eq!(parsed.config, Some(PathBuf::from("conf.toml")));
        assert_eq!(parsed.start_row, 5);
        assert_eq!(parsed.end_row, Some(9));
        assert!(!parsed.skip_processed);
        assert!(parsed.test);
        assert_eq!(parsed.import, Some(PathBuf::from("queries.csv")));
        assert!(parsed.validate().is_ok());
    }

    #[test]
    fn test_bad_values() {
        assert_eq!(args(&["--start-row", "abc"]).unwrap_err().kind(), ErrorKind::ValueValidation);
        assert_eq!(args(&["--start-row", "1"]).unwrap_err().kind(), ErrorKind::ValueValidation);
        assert_eq!(args(&["--end-row", "0"]).unwrap_err().kind(), ErrorKind::ValueValidation);
        assert!(args(&["--config"]).is_err());
        assert_eq!(args(&["--verbose"]).unwrap_err().kind(), ErrorKind::UnknownArgument);
    }

    #[test]
    fn test_end_before_start_rejected() {
        let parsed = args(&["--start-row", "8", "--end-row", "4"]).unwrap();
        assert!(matches!(
            parsed.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "--end-row"
        ));
        assert!(args(&["--start-row", "4", "--end-row", "4"]).unwrap().validate().is_ok());
    }

    #[test]
    fn test_help_and_version_are_generated() {
        assert_eq!(args(&["--help"]).unwrap_err().kind(), ErrorKind::DisplayHelp);
        assert_eq!(args(&["--version"]).unwrap_err().kind(), ErrorKind::DisplayVersion);
    }

    #[test]
    fn test_command_definition_is_consistent() {
        use clap::CommandFactory;
        CliArgs::command().debug_assert();
    }
}
