use std::num::NonZeroUsize;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use tracing::{info, warn};

use crate::command::{CommandRunner, find_in_path};
use crate::config::ToolConfig;
use crate::domain::SampleName;
use crate::error::GaqetError;
use crate::layout::{OutputLayout, SampleLayout, ensure_dir, write_bytes_atomic};
use crate::manifest::{Manifest, SampleRecord};
use crate::report::{MetricFamily, Metrics, MetricsTable, summary_columns};
use crate::stage::{Stage, StagePolicy, StageResult, run_stage};
use crate::stages::agat::{AgatStatistics, read_agat_report};
use crate::stages::busco::{BuscoAssessment, SequenceExtraction, read_busco_summary};
use crate::stages::lai::{
    LaiContext, LaiScore, LtrFinder, LtrHarvest, LtrRetriever, MergeCandidates, SuffixArrayIndex,
    prepare_lai_dir, read_lai_report,
};
use crate::stages::rnaseq::{TranscriptAssembly, TranscriptComparison, read_comparison_stats};

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub output: Utf8PathBuf,
    pub threads: NonZeroUsize,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

#[derive(Debug, Clone, Serialize)]
pub struct SampleReport {
    pub name: String,
    pub dir: Utf8PathBuf,
    pub stages: Vec<StageResult>,
    pub families: Vec<MetricFamily>,
    /// Set when the sample's row was left out of the summary.
    pub missing_metric: Option<String>,
}

impl SampleReport {
    pub fn in_summary(&self) -> bool {
        self.missing_metric.is_none()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: String,
    pub finished_at: String,
    pub manifest: String,
    pub output: Utf8PathBuf,
    pub threads: usize,
    pub summary_path: Utf8PathBuf,
    pub rows_written: usize,
    pub samples: Vec<SampleReport>,
    pub metrics: MetricsTable,
}

pub struct App<R: CommandRunner> {
    runner: R,
    tools: ToolConfig,
}

impl<R: CommandRunner> App<R> {
    pub fn new(runner: R, tools: ToolConfig) -> Self {
        Self { runner, tools }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Configured programs that cannot be found; reported, never fatal.
    pub fn missing_tools(&self, sink: &dyn ProgressSink) -> Vec<String> {
        let missing = self
            .tools
            .programs()
            .into_iter()
            .filter(|program| find_in_path(program).is_none())
            .map(str::to_string)
            .collect::<Vec<_>>();
        for program in &missing {
            warn!(program = %program, "tool not found on PATH");
            sink.event(ProgressEvent {
                message: format!("tool={program}; not found on PATH"),
                elapsed: None,
            });
        }
        missing
    }

    pub fn run(
        &self,
        manifest: &Manifest,
        options: &RunOptions,
        sink: &dyn ProgressSink,
    ) -> Result<RunReport, GaqetError> {
        let started_at = now();
        let layout = OutputLayout::new(options.output.clone());
        layout.ensure_root()?;

        let mut table = MetricsTable::new();
        let mut samples = Vec::with_capacity(manifest.len());
        for sample in manifest.samples() {
            sink.event(ProgressEvent {
                message: format!("sample={}; starting", sample.name),
                elapsed: None,
            });
            info!(sample = %sample.name, "processing sample");
            let sample_layout = layout.sample(sample);
            samples.push(self.run_sample(sample, &sample_layout, options.threads, &mut table, sink)?);
        }

        let columns = summary_columns();
        let mut summary = MetricsTable::header(&columns);
        summary.push('\n');
        let mut rows_written = 0;
        for report in &mut samples {
            match table.row(&report.name, &columns) {
                Ok(row) => {
                    summary.push_str(&row);
                    summary.push('\n');
                    rows_written += 1;
                }
                Err(GaqetError::MissingMetric { sample, metric }) => {
                    warn!(sample = %sample, metric = %metric, "sample left out of summary");
                    report.missing_metric = Some(metric);
                }
                Err(err) => return Err(err),
            }
        }

        let summary_path = layout.summary_path();
        write_bytes_atomic(&summary_path, summary.as_bytes())?;
        sink.event(ProgressEvent {
            message: format!("summary={summary_path}; rows={rows_written}"),
            elapsed: None,
        });

        let report = RunReport {
            started_at,
            finished_at: now(),
            manifest: manifest.path().display().to_string(),
            output: options.output.clone(),
            threads: options.threads.get(),
            summary_path,
            rows_written,
            samples,
            metrics: table,
        };
        let json = serde_json::to_vec_pretty(&report)
            .map_err(|err| GaqetError::Filesystem(err.to_string()))?;
        write_bytes_atomic(&layout.run_report_path(), &json)?;
        Ok(report)
    }

    fn run_sample(
        &self,
        sample: &SampleRecord,
        layout: &SampleLayout,
        threads: NonZeroUsize,
        table: &mut MetricsTable,
        sink: &dyn ProgressSink,
    ) -> Result<SampleReport, GaqetError> {
        ensure_dir(layout.dir())?;
        table.add_sample(sample.name.as_str());
        let mut report = SampleReport {
            name: sample.name.to_string(),
            dir: layout.dir().to_path_buf(),
            stages: Vec::new(),
            families: Vec::new(),
            missing_metric: None,
        };

        let agat = self.execute(&sample.name, &AgatStatistics::new(&self.tools, sample, layout), &mut report, sink)?;
        self.collect(&agat, &agat.output, MetricFamily::GeneModels, read_agat_report, table, &mut report);

        let busco_input = match SequenceExtraction::new(&self.tools, sample, layout) {
            Some(extraction) => self.execute(&sample.name, &extraction, &mut report, sink)?.output,
            None => sample.assembly.clone(),
        };
        let busco = BuscoAssessment::new(&self.tools, sample, layout, busco_input, threads);
        let result = self.execute(&sample.name, &busco, &mut report, sink)?;
        self.collect(&result, &busco.marker(), MetricFamily::Completeness, read_busco_summary, table, &mut report);

        prepare_lai_dir(sample, layout)?;
        let ctx = LaiContext::new(sample, layout, threads);
        let lai_stages: [&dyn Stage; 6] = [
            &SuffixArrayIndex::new(&self.tools, &ctx),
            &LtrHarvest::new(&self.tools, &ctx),
            &LtrFinder::new(&self.tools, &ctx),
            &MergeCandidates::new(&self.tools, &ctx),
            &LtrRetriever::new(&self.tools, &ctx),
            &LaiScore::new(&self.tools, &ctx),
        ];
        let mut last = None;
        for stage in lai_stages {
            last = Some(self.execute(&sample.name, stage, &mut report, sink)?);
        }
        if let Some(lai) = last {
            self.collect(&lai, &lai.output, MetricFamily::AssemblyIndex, read_lai_report, table, &mut report);
        }

        let assembly = self.execute(
            &sample.name,
            &TranscriptAssembly::new(&self.tools, sample, layout, threads),
            &mut report,
            sink,
        )?;
        let comparison = self.execute(
            &sample.name,
            &TranscriptComparison::new(&self.tools, sample, layout, assembly.output.clone()),
            &mut report,
            sink,
        )?;
        self.collect(
            &comparison,
            &comparison.output,
            MetricFamily::TranscriptSupport,
            read_comparison_stats,
            table,
            &mut report,
        );

        Ok(report)
    }

    fn execute(
        &self,
        sample: &SampleName,
        stage: &dyn Stage,
        report: &mut SampleReport,
        sink: &dyn ProgressSink,
    ) -> Result<StageResult, GaqetError> {
        let result = run_stage(stage, &self.runner, sink)?;
        report.stages.push(result.clone());
        if result.status.is_failure() && stage.policy() == StagePolicy::Fatal {
            return Err(GaqetError::StageFailed {
                sample: sample.to_string(),
                stage: result.stage.to_string(),
                code: result.status.to_string(),
                message: result.message,
            });
        }
        Ok(result)
    }

    fn collect(
        &self,
        result: &StageResult,
        path: &Utf8Path,
        family: MetricFamily,
        extract: fn(&Utf8Path) -> Result<Metrics, GaqetError>,
        table: &mut MetricsTable,
        report: &mut SampleReport,
    ) {
        if result.status.is_failure() {
            warn!(sample = %report.name, stage = %result.stage, "stage failed; skipping extraction");
            return;
        }
        match extract(path) {
            Ok(metrics) => {
                table.extend(&report.name, metrics);
                report.families.push(family);
            }
            Err(err) => {
                warn!(sample = %report.name, stage = %result.stage, "{err}");
            }
        }
    }
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}
