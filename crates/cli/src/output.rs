//! Command output.
//!
//! Reports go to stdout, as a text table or as JSON. Logs go to stderr
//! through `tracing`, so piping JSON output stays clean.

use std::io::Write;

use clap::ValueEnum;
use serde::Serialize;

use crate::error::CliError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// A report that can be printed as text.
pub trait Render: Serialize {
    /// Write the human-readable form.
    ///
    /// # Errors
    ///
    /// Returns any error from the writer.
    fn render_text(&self, out: &mut dyn Write) -> std::io::Result<()>;
}

/// Write a report in the chosen format.
///
/// # Errors
///
/// Returns `CliError` if encoding or writing fails.
pub fn write_report<R: Render>(
    format: OutputFormat,
    report: &R,
    out: &mut dyn Write,
) -> Result<(), CliError> {
    match format {
        OutputFormat::Text => report.render_text(out)?,
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, report)?;
            writeln!(out)?;
        }
    }
    out.flush()?;
    Ok(())
}

/// Write a report to stdout.
///
/// # Errors
///
/// Returns `CliError` if encoding or writing fails.
pub fn emit<R: Render>(format: OutputFormat, report: &R) -> Result<(), CliError> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    write_report(format, report, &mut out)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Greeting {
        name: &'static str,
    }

    impl Render for Greeting {
        fn render_text(&self, out: &mut dyn Write) -> std::io::Result<()> {
            writeln!(out, "hello {}", self.name)
        }
    }

    #[test]
    fn test_text_and_json() {
        let report = Greeting { name: "amox" };

        let mut text = Vec::new();
        write_report(OutputFormat::Text, &report, &mut text).unwrap();
        assert_eq!(String::from_utf8(text).unwrap(), "hello amox\n");

        let mut json = Vec::new();
        write_report(OutputFormat::Json, &report, &mut json).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&json).unwrap();
        assert_eq!(value["name"], "amox");
    }
}
