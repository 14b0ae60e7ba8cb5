use std::io::Write;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// iondg - inspect and normalize binary datagrams
#[derive(Parser, Debug)]
#[command(name = "iondg")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the values of a datagram
    Dump {
        file: PathBuf,

        /// Show the system view, bookkeeping values included
        #[arg(long)]
        system: bool,

        /// Render user values as JSON
        #[arg(long, conflicts_with = "system")]
        json: bool,
    },
    /// Summarize a datagram
    Stats { file: PathBuf },
    /// Write the synchronized encoding of a datagram
    Normalize { input: PathBuf, output: PathBuf },
}

fn main() {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(args.command) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(command: Command) -> iondg_cli::commands::Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match command {
        Command::Dump { file, system, json } => iondg_cli::dump(&file, system, json, &mut out),
        Command::Stats { file } => {
            let stats = iondg_cli::stats(&file)?;
            serde_json::to_writer_pretty(&mut out, &stats)?;
            writeln!(out)?;
            Ok(())
        }
        Command::Normalize { input, output } => {
            iondg_cli::normalize(&input, &output)?;
            Ok(())
        }
    }
}
