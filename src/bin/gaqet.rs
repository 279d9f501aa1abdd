use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::Parser;
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use gaqet::app::{App, RunOptions};
use gaqet::command::SystemRunner;
use gaqet::config::ToolConfigLoader;
use gaqet::error::GaqetError;
use gaqet::manifest::Manifest;
use gaqet::output::{ConsoleOutput, JsonOutput, OutputMode};

#[derive(Parser)]
#[command(name = "gaqet")]
#[command(about = "Genome annotation quality evaluation over a manifest of samples")]
#[command(version, author)]
struct Cli {
    #[arg(short, long, help = "Tab-separated sample manifest")]
    input: PathBuf,

    #[arg(short, long, help = "Output root; one subdirectory per sample")]
    output: Utf8PathBuf,

    #[arg(short, long, default_value = "1", help = "Threads passed to BUSCO, LTR tools and StringTie")]
    threads: NonZeroUsize,

    #[arg(long, help = "Tool configuration (defaults to ./gaqet.json when present)")]
    tools: Option<String>,

    #[arg(long, help = "Print the run report as JSON")]
    json: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(gaqet) = report.downcast_ref::<GaqetError>() {
            return ExitCode::from(map_exit_code(gaqet));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &GaqetError) -> u8 {
    match error {
        error if error.is_config_error() => 2,
        GaqetError::StageFailed { .. } => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Human
    };

    let tools = ToolConfigLoader::resolve(cli.tools.as_deref())?;
    let manifest = Manifest::load(&cli.input)?;
    let app = App::new(SystemRunner::new(), tools);
    let options = RunOptions {
        output: cli.output,
        threads: cli.threads,
    };
    match output_mode {
        OutputMode::Json => {
            app.missing_tools(&JsonOutput);
            let report = app.run(&manifest, &options, &JsonOutput)?;
            JsonOutput::print_report(&report).into_diagnostic()?;
        }
        OutputMode::Human => {
            app.missing_tools(&ConsoleOutput);
            let report = app.run(&manifest, &options, &ConsoleOutput)?;
            ConsoleOutput::print_report(&report);
        }
    }
    Ok(())
}
