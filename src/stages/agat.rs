use camino::{Utf8Path, Utf8PathBuf};

use crate::command::Invocation;
use crate::config::ToolConfig;
use crate::error::GaqetError;
use crate::layout::SampleLayout;
use crate::manifest::SampleRecord;
use crate::report::{MetricValue, Metrics};
use crate::stage::{Stage, StageId, Staging};
use crate::stages::read_report;

pub const GENE_MODEL_COLUMNS: [&str; 20] = [
    "Gene_Models (N)",
    "Transcript_Models (N)",
    "CDS_Models (N)",
    "Exons (N)",
    "UTR5' (N)",
    "UTR3' (N)",
    "Overlapping_Gene_Models (N)",
    "Single Exon Gene Models (N)",
    "Single Exon Transcripts (N)",
    "Total Gene Space (Mb)",
    "Mean Gene Model Length (bp)",
    "Mean CDS Model Length (bp)",
    "Mean Exon Length (bp)",
    "Mean Intron Length (bp)",
    "Longest Gene Model Length (bp)",
    "Longest CDS Model Length (bp)",
    "Longest Intron Length (bp)",
    "Shortest Gene Model Length (bp)",
    "Shortest CDS Model Length (bp)",
    "Shortest Intron Length (bp)",
];

const TOTAL_GENE_SPACE: &str = "Total Gene Space (Mb)";

/// AGAT report label to summary column.
const LABELS: [(&str, &str); 20] = [
    ("Number of gene", "Gene_Models (N)"),
    ("Number of mrna", "Transcript_Models (N)"),
    ("Number of cds", "CDS_Models (N)"),
    ("Number of exon", "Exons (N)"),
    ("Number of five_prime_utr", "UTR5' (N)"),
    ("Number of three_prime_utr", "UTR3' (N)"),
    ("Number gene overlapping", "Overlapping_Gene_Models (N)"),
    ("Number of single exon gene", "Single Exon Gene Models (N)"),
    ("Number of single exon mrna", "Single Exon Transcripts (N)"),
    ("Total gene length (bp)", TOTAL_GENE_SPACE),
    ("mean gene length (bp)", "Mean Gene Model Length (bp)"),
    ("mean cds length (bp)", "Mean CDS Model Length (bp)"),
    ("mean exon length (bp)", "Mean Exon Length (bp)"),
    ("mean intron in cds length (bp)", "Mean Intron Length (bp)"),
    ("Longest gene (bp)", "Longest Gene Model Length (bp)"),
    ("Longest cds (bp)", "Longest CDS Model Length (bp)"),
    ("Longest intron into cds part (bp)", "Longest Intron Length (bp)"),
    ("Shortest gene (bp)", "Shortest Gene Model Length (bp)"),
    ("Shortest cds piece (bp)", "Shortest CDS Model Length (bp)"),
    ("Shortest intron into cds part (bp)", "Shortest Intron Length (bp)"),
];

#[derive(Debug, Clone)]
pub struct AgatStatistics {
    program: String,
    annotation: Utf8PathBuf,
    report: Utf8PathBuf,
}

impl AgatStatistics {
    pub fn new(tools: &ToolConfig, sample: &SampleRecord, layout: &SampleLayout) -> Self {
        Self {
            program: tools.agat.clone(),
            annotation: sample.annotation.clone(),
            report: layout.agat_report(),
        }
    }
}

impl Stage for AgatStatistics {
    fn id(&self) -> StageId {
        StageId::Agat
    }

    fn output(&self) -> Utf8PathBuf {
        self.report.clone()
    }

    fn invocation(&self, target: &Utf8Path) -> Invocation {
        Invocation::new(&self.program)
            .arg("--gff")
            .path_arg(&self.annotation)
            .arg("-o")
            .path_arg(target)
    }

    fn staging(&self) -> Staging {
        Staging::Atomic
    }
}

pub fn read_agat_report(path: &Utf8Path) -> Result<Metrics, GaqetError> {
    Ok(parse_agat_report(&read_report(path)?))
}

/// Every gene-model column is present in the result, zero unless the report
/// provides it. Scanning stops at the first line containing a colon, which
/// closes the leading block of counts.
pub fn parse_agat_report(text: &str) -> Metrics {
    let mut metrics = GENE_MODEL_COLUMNS
        .iter()
        .map(|column| (column.to_string(), MetricValue::Integer(0)))
        .collect::<Metrics>();

    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }
        if line.contains(':') {
            break;
        }
        let Some((label, value)) = line.trim().rsplit_once(char::is_whitespace) else {
            continue;
        };
        let Ok(value) = value.trim().parse::<i64>() else {
            continue;
        };
        let Some((_, column)) = LABELS.iter().find(|(known, _)| *known == label.trim()) else {
            continue;
        };
        let value = if *column == TOTAL_GENE_SPACE {
            MetricValue::Decimal(round2(value as f64 / 1_000_000.0))
        } else {
            MetricValue::Integer(value)
        };
        metrics.insert(column.to_string(), value);
    }
    metrics
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
