//! Command-line flags shared by every Propulsor application, plus usage output.

use std::env;
use std::fmt::Write as _;

use clap::{ArgAction, CommandFactory, Parser};

use crate::error::BootError;

/// Usage width used when `COLUMNS` is absent or unparsable.
pub const DEFAULT_USAGE_WIDTH: usize = 100;

const USAGE: &str = "$0 [OPTIONS]";

/// Flags understood by [`crate::BootOptions::parse_args`].
#[derive(Debug, Clone, Default, Parser)]
#[command(
    name = "propulsor",
    override_usage = USAGE,
    disable_help_flag = true,
    disable_version_flag = true
)]
pub struct BootArgs {
    /// Print this and exit
    #[arg(short = 'h', long = "help", action = ArgAction::SetTrue)]
    pub help: bool,
    /// Specify the configuration file
    #[arg(short = 'f', long = "config", value_name = "FILE")]
    pub config: Option<String>,
}

/// Usage width for the current terminal, taken from `COLUMNS`.
#[must_use]
pub fn usage_width() -> usize {
    usage_width_from(env::var("COLUMNS").ok().as_deref())
}

pub(crate) fn usage_width_from(columns: Option<&str>) -> usize {
    columns
        .and_then(|value| value.trim().parse::<usize>().ok())
        .filter(|width| *width > 0)
        .unwrap_or(DEFAULT_USAGE_WIDTH)
}

/// Render usage text, prefixed with the parse error when one is supplied.
#[must_use]
pub fn render_usage(error: Option<&BootError>, width: usize) -> String {
    let mut out = String::new();
    if let Some(error) = error {
        let detail = match error {
            BootError::ArgumentParse { source } => source
                .to_string()
                .lines()
                .next()
                .unwrap_or_default()
                .trim_start_matches("error: ")
                .to_string(),
            other => other.to_string(),
        };
        let _ = writeln!(out, "Invalid option(s): {detail}");
        let _ = writeln!(out);
    }

    let mut command = BootArgs::command().term_width(width);
    let _ = write!(out, "{}", command.render_help());
    let _ = writeln!(out);
    out
}

/// Print usage to standard error.
pub fn print_usage(error: Option<&BootError>) {
    eprint!("{}", render_usage(error, usage_width()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_width_prefers_columns() {
        assert_eq!(usage_width_from(Some("132")), 132);
        assert_eq!(usage_width_from(Some(" 80 ")), 80);
        assert_eq!(usage_width_from(Some("wide")), DEFAULT_USAGE_WIDTH);
        assert_eq!(usage_width_from(Some("0")), DEFAULT_USAGE_WIDTH);
        assert_eq!(usage_width_from(None), DEFAULT_USAGE_WIDTH);
    }

    #[test]
    fn usage_lists_boot_flags() {
        let usage = render_usage(None, 100);
        assert!(usage.contains("--help"));
        assert!(usage.contains("--config"));
        assert!(usage.contains("Specify the configuration file"));
        assert!(!usage.contains("Invalid option(s)"));
    }

    #[test]
    fn usage_reports_parse_errors() {
        let Err(source) = BootArgs::try_parse_from(["propulsor", "--bogus"]) else {
            panic!("unknown flag should fail");
        };
        let usage = render_usage(Some(&BootError::ArgumentParse { source }), 100);
        assert!(usage.starts_with("Invalid option(s): "));
    }

    #[test]
    fn command_definition_is_consistent() {
        BootArgs::command().debug_assert();
    }
}
