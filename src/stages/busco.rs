use std::num::NonZeroUsize;
use std::sync::LazyLock;

use camino::{Utf8Path, Utf8PathBuf};
use regex::Regex;

use crate::command::Invocation;
use crate::config::ToolConfig;
use crate::domain::{BuscoMode, Lineage};
use crate::error::GaqetError;
use crate::layout::SampleLayout;
use crate::manifest::SampleRecord;
use crate::report::{MetricValue, Metrics};
use crate::stage::{Stage, StageId, Staging};
use crate::stages::read_report;

pub const COMPLETENESS_COLUMNS: [&str; 6] = [
    "BUSCO Complete (%)",
    "BUSCO Single (%)",
    "BUSCO Duplicated (%)",
    "BUSCO Fragmented (%)",
    "BUSCO Missing (%)",
    "BUSCO Groups (N)",
];

static SUMMARY_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"C:\s*([\d.]+)%\s*\[\s*S:\s*([\d.]+)%\s*,\s*D:\s*([\d.]+)%\s*\]\s*,\s*F:\s*([\d.]+)%\s*,\s*M:\s*([\d.]+)%\s*,\s*n:\s*(\d+)",
    )
    .expect("BUSCO summary pattern is valid")
});

/// `gffread` extraction of the sequences BUSCO scores: translated CDS in
/// protein mode, spliced transcripts in transcriptome mode.
#[derive(Debug, Clone)]
pub struct SequenceExtraction {
    program: String,
    assembly: Utf8PathBuf,
    annotation: Utf8PathBuf,
    mode: BuscoMode,
    fasta: Utf8PathBuf,
}

impl SequenceExtraction {
    /// `None` in genome mode, where BUSCO reads the assembly directly.
    pub fn new(tools: &ToolConfig, sample: &SampleRecord, layout: &SampleLayout) -> Option<Self> {
        let fasta = match sample.busco_mode {
            BuscoMode::Proteins => layout.proteins(),
            BuscoMode::Transcriptome => layout.cdna(),
            BuscoMode::Genome => return None,
        };
        Some(Self {
            program: tools.gffread.clone(),
            assembly: sample.assembly.clone(),
            annotation: sample.annotation.clone(),
            mode: sample.busco_mode,
            fasta,
        })
    }
}

impl Stage for SequenceExtraction {
    fn id(&self) -> StageId {
        StageId::Gffread
    }

    fn output(&self) -> Utf8PathBuf {
        self.fasta.clone()
    }

    fn invocation(&self, target: &Utf8Path) -> Invocation {
        let flag = match self.mode {
            BuscoMode::Transcriptome => "-w",
            _ => "-y",
        };
        Invocation::new(&self.program)
            .arg(flag)
            .path_arg(target)
            .arg("-g")
            .path_arg(&self.assembly)
            .path_arg(&self.annotation)
    }

    fn staging(&self) -> Staging {
        Staging::Atomic
    }
}

#[derive(Debug, Clone)]
pub struct BuscoAssessment {
    program: String,
    input: Utf8PathBuf,
    lineage: Lineage,
    mode: BuscoMode,
    threads: NonZeroUsize,
    out_path: Utf8PathBuf,
    run_name: String,
    run_dir: Utf8PathBuf,
    summary: Utf8PathBuf,
}

impl BuscoAssessment {
    /// `input` is the extracted FASTA, or the assembly in genome mode.
    pub fn new(
        tools: &ToolConfig,
        sample: &SampleRecord,
        layout: &SampleLayout,
        input: Utf8PathBuf,
        threads: NonZeroUsize,
    ) -> Self {
        Self {
            program: tools.busco.clone(),
            input,
            lineage: sample.lineage.clone(),
            mode: sample.busco_mode,
            threads,
            out_path: layout.busco_dir(),
            run_name: layout.busco_run_name().to_string(),
            run_dir: layout.busco_run_dir(),
            summary: layout.busco_summary(),
        }
    }
}

impl Stage for BuscoAssessment {
    fn id(&self) -> StageId {
        StageId::Busco
    }

    fn output(&self) -> Utf8PathBuf {
        self.run_dir.clone()
    }

    fn marker(&self) -> Utf8PathBuf {
        self.summary.clone()
    }

    fn invocation(&self, _target: &Utf8Path) -> Invocation {
        Invocation::new(&self.program)
            .arg("-i")
            .path_arg(&self.input)
            .arg("-c")
            .arg(self.threads.to_string())
            .arg("-l")
            .arg(self.lineage.as_str())
            .arg("-m")
            .arg(self.mode.to_string())
            .arg("-o")
            .arg(&self.run_name)
            .arg("--out_path")
            .path_arg(&self.out_path)
            .arg("-f")
    }
}

pub fn read_busco_summary(path: &Utf8Path) -> Result<Metrics, GaqetError> {
    Ok(parse_busco_summary(&read_report(path)?))
}

/// Reads the one-line `C:..%[S:..%,D:..%],F:..%,M:..%,n:..` score. Empty when
/// no such line parses.
pub fn parse_busco_summary(text: &str) -> Metrics {
    let mut metrics = Metrics::new();
    for line in text.lines() {
        let Some(caps) = SUMMARY_LINE.captures(line) else {
            continue;
        };
        let percentages = (1..=5)
            .map(|idx| caps[idx].parse::<f64>().ok())
            .collect::<Option<Vec<_>>>();
        let groups = caps[6].parse::<i64>().ok();
        let (Some(percentages), Some(groups)) = (percentages, groups) else {
            continue;
        };
        for (column, value) in COMPLETENESS_COLUMNS.iter().zip(percentages) {
            metrics.insert(column.to_string(), MetricValue::Decimal(value));
        }
        metrics.insert(COMPLETENESS_COLUMNS[5].to_string(), MetricValue::Integer(groups));
        break;
    }
    metrics
}
