use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use fast5dump::{batch, DataKind, ExtractOptions, Fast5Error};

/// fast5dump CLI
#[derive(Parser)]
#[command(name = "fast5dump")]
#[command(version = fast5dump::VERSION)]
#[command(about = "Extract event tables and base calls from ONT fast5 files", long_about = None)]
struct Cli {
    /// Verbosity level (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Do not write the CSV header line
    #[arg(long)]
    no_header: bool,

    /// File name suffix picked up when PATH is a directory
    #[arg(long, default_value = fast5dump::DEFAULT_SUFFIX)]
    suffix: String,

    /// One of fastq, fasta, event, raw
    data_type: String,

    /// A fast5 file, or a directory searched recursively
    path: PathBuf,
}

fn print_usage() {
    let mut cmd = Cli::command();
    eprintln!("{}", cmd.render_usage());
    eprintln!("  where <DATA_TYPE> is one of {{fastq, fasta, event, raw}}");
}

fn run(cli: &Cli, kind: DataKind) -> anyhow::Result<()> {
    let opts = ExtractOptions { kind, header: !cli.no_header, suffix: cli.suffix.clone() };
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let stderr = io::stderr();
    let mut diag = stderr.lock();

    let summary = batch::run(&cli.path, &opts, &mut out, &mut diag)
        .with_context(|| format!("extracting {} from {}", kind, cli.path.display()))?;
    out.flush()?;
    log::info!(
        "{} files processed, {} skipped, {} records written",
        summary.processed,
        summary.skipped,
        summary.records
    );
    Ok(())
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => {
            let _ = e.print();
            return ExitCode::from(1);
        }
    };

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();
    log::debug!("fast5dump {}", fast5dump::VERSION);

    let kind = match cli.data_type.parse::<DataKind>() {
        Ok(k) => k,
        Err(_) => {
            eprintln!("Error: Incorrect dataType\n");
            print_usage();
            return ExitCode::from(1);
        }
    };

    match run(&cli, kind) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if let Some(Fast5Error::Usage(msg)) = e.downcast_ref::<Fast5Error>() {
                eprintln!("Error: {msg}\n");
                print_usage();
            } else {
                eprintln!("fast5dump: {e:#}");
            }
            ExitCode::from(1)
        }
    }
}
