use std::num::NonZeroUsize;

use camino::{Utf8Path, Utf8PathBuf};

use crate::command::Invocation;
use crate::config::ToolConfig;
use crate::error::GaqetError;
use crate::layout::SampleLayout;
use crate::manifest::SampleRecord;
use crate::report::{MetricValue, Metrics};
use crate::stage::{Stage, StageId, Staging};
use crate::stages::read_report;

pub const TRANSCRIPT_SUPPORT_COLUMNS: [&str; 4] = [
    "Transcript level_f1",
    "Locus level_f1",
    "Matching transcripts",
    "Matching loci",
];

/// Section lines carrying sensitivity and precision, and the F1 column each
/// one feeds.
const F1_SECTIONS: [(&str, &str); 2] = [
    ("Transcript level:", "Transcript level_f1"),
    ("Locus level:", "Locus level_f1"),
];

const MATCH_COUNTS: [(&str, &str); 2] = [
    ("Matching transcripts:", "Matching transcripts"),
    ("Matching loci:", "Matching loci"),
];

#[derive(Debug, Clone)]
pub struct TranscriptAssembly {
    program: String,
    alignments: Utf8PathBuf,
    threads: NonZeroUsize,
    gtf: Utf8PathBuf,
}

impl TranscriptAssembly {
    pub fn new(
        tools: &ToolConfig,
        sample: &SampleRecord,
        layout: &SampleLayout,
        threads: NonZeroUsize,
    ) -> Self {
        Self {
            program: tools.stringtie.clone(),
            alignments: sample.alignments.clone(),
            threads,
            gtf: layout.assembled_transcripts(),
        }
    }
}

impl Stage for TranscriptAssembly {
    fn id(&self) -> StageId {
        StageId::Stringtie
    }

    fn output(&self) -> Utf8PathBuf {
        self.gtf.clone()
    }

    fn invocation(&self, target: &Utf8Path) -> Invocation {
        Invocation::new(&self.program)
            .arg("-o")
            .path_arg(target)
            .arg("-p")
            .arg(self.threads.to_string())
            .path_arg(&self.alignments)
    }

    fn staging(&self) -> Staging {
        Staging::Atomic
    }
}

#[derive(Debug, Clone)]
pub struct TranscriptComparison {
    program: String,
    reference: Utf8PathBuf,
    gtf: Utf8PathBuf,
    stats: Utf8PathBuf,
}

impl TranscriptComparison {
    /// `gtf` is the StringTie output of the same sample.
    pub fn new(
        tools: &ToolConfig,
        sample: &SampleRecord,
        layout: &SampleLayout,
        gtf: Utf8PathBuf,
    ) -> Self {
        Self {
            program: tools.gffcompare.clone(),
            reference: sample.annotation.clone(),
            gtf,
            stats: layout.comparison_stats(),
        }
    }
}

impl Stage for TranscriptComparison {
    fn id(&self) -> StageId {
        StageId::Gffcompare
    }

    fn output(&self) -> Utf8PathBuf {
        self.stats.clone()
    }

    fn invocation(&self, _target: &Utf8Path) -> Invocation {
        Invocation::new(&self.program)
            .arg("-r")
            .path_arg(&self.reference)
            .path_arg(&self.gtf)
            .arg("-o")
            .path_arg(&self.stats)
    }
}

/// Harmonic mean of sensitivity and precision; zero when both are zero.
pub fn f1_score(sensitivity: f64, precision: f64) -> f64 {
    let sum = sensitivity + precision;
    if sum == 0.0 {
        return 0.0;
    }
    2.0 * sensitivity * precision / sum
}

pub fn read_comparison_stats(path: &Utf8Path) -> Result<Metrics, GaqetError> {
    Ok(parse_comparison_stats(&read_report(path)?))
}

pub fn parse_comparison_stats(text: &str) -> Metrics {
    let mut metrics = Metrics::new();
    for line in text.lines() {
        let tokens = line.split_whitespace().collect::<Vec<_>>();

        if let Some((_, column)) = F1_SECTIONS.iter().find(|(label, _)| line.contains(label)) {
            let sensitivity = tokens.get(2).and_then(|token| token.parse::<f64>().ok());
            let precision = tokens.get(4).and_then(|token| token.parse::<f64>().ok());
            if let (Some(sensitivity), Some(precision)) = (sensitivity, precision) {
                metrics.insert(
                    column.to_string(),
                    MetricValue::Decimal(f1_score(sensitivity, precision)),
                );
            }
            continue;
        }

        if let Some((_, column)) = MATCH_COUNTS.iter().find(|(label, _)| line.contains(label)) {
            if let Some(count) = tokens.last().and_then(|token| token.parse::<i64>().ok()) {
                metrics.insert(column.to_string(), MetricValue::Integer(count));
            }
        }
    }
    metrics
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATS: &str = "\
# gffcompare v0.12.6 | Command line was:
#gffcompare -r ref.gff3 leaf.gtf -o leaf.stats
#

#= Summary for dataset: leaf.gtf
#     Query mRNAs :   31200 in   21000 loci  (25000 multi-exon transcripts)
#--------------------|   Sn   |  Pr   |
        Base level:    78.9     |    85.2    |
        Exon level:    70.1     |    74.0    |
      Intron level:    88.0     |    93.1    |
Intron chain level:    60.2     |    55.0    |
  Transcript level:    40.0     |    60.0    |
       Locus level:    50.0     |    50.0    |

     Matching intron chains:   14000
       Matching transcripts:   15321
              Matching loci:   12876
";

    #[test]
    fn f1_of_equal_scores_is_that_score() {
        assert_eq!(f1_score(50.0, 50.0), 50.0);
    }

    #[test]
    fn f1_of_zero_scores_is_zero() {
        assert_eq!(f1_score(0.0, 0.0), 0.0);
    }

    #[test]
    fn parse_stats_sections() {
        let metrics = parse_comparison_stats(STATS);
        assert_eq!(metrics["Transcript level_f1"], MetricValue::Decimal(48.0));
        assert_eq!(metrics["Locus level_f1"], MetricValue::Decimal(50.0));
        assert_eq!(metrics["Matching transcripts"], MetricValue::Integer(15321));
        assert_eq!(metrics["Matching loci"], MetricValue::Integer(12876));
        assert_eq!(metrics.len(), 4);
    }

    #[test]
    fn parse_skips_unparsable_section_lines() {
        let metrics = parse_comparison_stats("  Transcript level:  n/a | n/a |\n       Locus level:  0.0 | 0.0 |\n");
        assert!(!metrics.contains_key("Transcript level_f1"));
        assert_eq!(metrics["Locus level_f1"], MetricValue::Decimal(0.0));
    }
}
