use anyhow::Result;
use clap::{Parser, Subcommand};
use esmify_convert::{Config, print_outcomes, print_summary, run_convert};
use log::{debug, info};
use std::io::BufWriter;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "esmify")]
#[command(about = "Convert CommonJS modules to ES module syntax", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Rewrite require/module.exports into import/export syntax
    Convert(Config),
}

fn main() -> Result<()> {
    env_logger::init();

    // stdio is blocked by LineWriter, use a BufWriter to reduce syscalls.
    // See https://github.com/rust-lang/rust/issues/60673
    let mut stdout = BufWriter::new(std::io::stdout());

    let cli = Cli::parse();
    debug!("Parsed CLI arguments: {:?}", cli.command);

    let start = Instant::now();

    match cli.command {
        Commands::Convert(cfg) => {
            info!("Running conversion (write: {}, exports: {})", cfg.write, cfg.exports);
            debug!("Config: root={:?}, entry_glob={:?}", cfg.root, cfg.entry_glob);

            let result = run_convert(cfg)?;
            debug!(
                "Converted {} files, {} failed",
                result.files_converted, result.files_failed
            );

            print_outcomes(&mut stdout, &result)?;

            let elapsed_ms = start.elapsed().as_millis();
            print_summary(&mut stdout, &result, elapsed_ms)?;

            if result.files_failed > 0 {
                // Non-zero exit to fail CI
                std::process::exit(1);
            }

            Ok(())
        }
    }
}
