use std::io::{self, Write};

use serde::Serialize;

use crate::app::{ProgressEvent, ProgressSink, RunReport};
use crate::stage::StageStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_report(report: &RunReport) -> io::Result<()> {
        Self::print_json(report)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}

/// Progress lines on stderr, final summary on stdout.
pub struct ConsoleOutput;

impl ProgressSink for ConsoleOutput {
    fn event(&self, event: ProgressEvent) {
        match event.elapsed {
            Some(elapsed) => eprintln!("{} ({:.1}s)", event.message, elapsed.as_secs_f64()),
            None => eprintln!("{}", event.message),
        }
    }
}

impl ConsoleOutput {
    pub fn print_report(report: &RunReport) {
        let green = "\x1b[32m";
        let yellow = "\x1b[33m";
        let cyan = "\x1b[36m";
        let red = "\x1b[31m";
        let reset = "\x1b[0m";

        let failures = report
            .samples
            .iter()
            .flat_map(|sample| &sample.stages)
            .filter(|stage| stage.status.is_failure())
            .count();

        println!("{cyan}GAQET summary{reset}");
        println!(
            "{green}Samples in summary: {}/{}{reset}",
            report.rows_written,
            report.samples.len()
        );
        println!("{yellow}Failed stages: {failures}{reset}");

        for sample in &report.samples {
            let color = if sample.in_summary() { green } else { yellow };
            println!("{color}{} ({}){reset}", sample.name, sample.dir);
            for stage in &sample.stages {
                let color = match stage.status {
                    StageStatus::AlreadyDone => green,
                    StageStatus::Succeeded => cyan,
                    StageStatus::Failed { .. } => red,
                };
                println!("{color}   {}: {}{reset}", stage.stage.label(), stage.status);
                if stage.status.is_failure() {
                    println!("{red}      {}{reset}", stage.message);
                }
            }
            if let Some(metric) = &sample.missing_metric {
                println!("{yellow}   left out of summary, missing {metric}{reset}");
            }
        }
        println!("{cyan}Summary: {}{reset}", report.summary_path);
    }
}
