#![cfg(feature = "cli")]

use std::path::PathBuf;
use std::process;

use clap::Parser;
use hwdb_compiler::{build, BuildConfig, MatchPolicy};

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Input hwdb text files to compile, in insertion order.
    #[arg(required = true)]
    input_files: Vec<PathBuf>,

    /// Path the compiled binary index is written to.
    #[arg(short, long)]
    output: PathBuf,

    /// Only honor a record's first match line, matching the reference
    /// tool's single-slot match buffer instead of the corrected default.
    #[arg(long, default_value_t = false)]
    first_match_only: bool,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let config = BuildConfig {
        match_policy: if cli.first_match_only {
            MatchPolicy::FirstMatchOnly
        } else {
            MatchPolicy::AllMatches
        },
        ..BuildConfig::default()
    };

    match build(&cli.input_files, &cli.output, &config) {
        Ok(stats) => {
            log::info!("wrote '{}'\n{stats}", cli.output.display());
        }
        Err(e) => {
            eprintln!("hwdb-compile: {e}");
            process::exit(1);
        }
    }
}
