//! Writing conversion results to the terminal.

use std::io::{self, Write};

use colored::Colorize;
use log::debug;

use crate::types::{ConvertResult, FileStatus};

/// Print the per-file outcomes of a conversion batch.
///
/// Converted files that were not written back in place carry their
/// transformed text, emitted under a dimmed header naming the source file.
/// Written-back files get a one-line status. Unchanged files are only
/// logged.
pub fn print_outcomes<W: Write>(writer: &mut W, result: &ConvertResult) -> io::Result<()> {
    debug!("Printing {} file outcomes", result.outcomes.len());
    for outcome in &result.outcomes {
        match &outcome.status {
            FileStatus::Converted => {
                if let Some(text) = &outcome.output {
                    writeln!(writer, "{}", format!("// {}", outcome.path.display()).dimmed())?;
                    write!(writer, "{}", text)?;
                } else {
                    writeln!(writer, "{} {}", "converted".green(), outcome.path.display())?;
                }
            }
            FileStatus::Unchanged => {
                debug!("Unchanged: {}", outcome.path.display());
            }
            FileStatus::Failed(err) => {
                writeln!(writer, "{} {}: {}", "failed".red().bold(), outcome.path.display(), err)?;
            }
        }
    }
    Ok(())
}

pub fn print_summary<W: Write>(
    writer: &mut W,
    result: &ConvertResult,
    elapsed_ms: u128,
) -> io::Result<()> {
    writeln!(
        writer,
        "\n{} Converted {} files ({} unchanged, {} failed) in {}ms.",
        "●".bright_blue(),
        result.files_converted.to_string().green(),
        result.files_unchanged.to_string().cyan(),
        result.files_failed.to_string().red(),
        elapsed_ms.to_string().cyan()
    )?;
    writer.flush()?;
    Ok(())
}
