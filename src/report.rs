use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::error::GaqetError;
use crate::stages::{agat, busco, lai, rnaseq};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetricValue {
    Integer(i64),
    Decimal(f64),
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Integer(value) => write!(f, "{value}"),
            MetricValue::Decimal(value) => write!(f, "{value:.2}"),
        }
    }
}

/// Metric name to value, as produced by one extractor.
pub type Metrics = BTreeMap<String, MetricValue>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricFamily {
    GeneModels,
    Completeness,
    AssemblyIndex,
    TranscriptSupport,
}

pub const FAMILIES: [MetricFamily; 4] = [
    MetricFamily::GeneModels,
    MetricFamily::Completeness,
    MetricFamily::AssemblyIndex,
    MetricFamily::TranscriptSupport,
];

impl MetricFamily {
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            MetricFamily::GeneModels => &agat::GENE_MODEL_COLUMNS,
            MetricFamily::Completeness => &busco::COMPLETENESS_COLUMNS,
            MetricFamily::AssemblyIndex => &lai::ASSEMBLY_INDEX_COLUMNS,
            MetricFamily::TranscriptSupport => &rnaseq::TRANSCRIPT_SUPPORT_COLUMNS,
        }
    }
}

/// All declared columns in summary order.
pub fn summary_columns() -> Vec<&'static str> {
    FAMILIES
        .iter()
        .flat_map(|family| family.columns().iter().copied())
        .collect()
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MetricsTable {
    rows: Vec<(String, Metrics)>,
}

impl MetricsTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a sample with no metrics yet; keeps first-seen order.
    pub fn add_sample(&mut self, sample: &str) {
        if self.metrics(sample).is_none() {
            self.rows.push((sample.to_string(), Metrics::new()));
        }
    }

    pub fn insert(&mut self, sample: &str, metric: &str, value: MetricValue) {
        self.add_sample(sample);
        if let Some((_, metrics)) = self.rows.iter_mut().find(|(name, _)| name == sample) {
            metrics.insert(metric.to_string(), value);
        }
    }

    pub fn extend(&mut self, sample: &str, metrics: Metrics) {
        self.add_sample(sample);
        for (metric, value) in metrics {
            self.insert(sample, &metric, value);
        }
    }

    pub fn metrics(&self, sample: &str) -> Option<&Metrics> {
        self.rows
            .iter()
            .find(|(name, _)| name == sample)
            .map(|(_, metrics)| metrics)
    }

    pub fn samples(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn header(columns: &[&str]) -> String {
        let mut fields = Vec::with_capacity(columns.len() + 1);
        fields.push("Name");
        fields.extend_from_slice(columns);
        fields.join("\t")
    }

    /// One TSV row for `sample`; every declared column must be present.
    pub fn row(&self, sample: &str, columns: &[&str]) -> Result<String, GaqetError> {
        let metrics = self.metrics(sample);
        let mut fields = Vec::with_capacity(columns.len() + 1);
        fields.push(sample.to_string());
        for column in columns {
            let value = metrics
                .and_then(|metrics| metrics.get(*column))
                .ok_or_else(|| GaqetError::MissingMetric {
                    sample: sample.to_string(),
                    metric: column.to_string(),
                })?;
            fields.push(value.to_string());
        }
        Ok(fields.join("\t"))
    }

    pub fn render_tsv(&self, columns: &[&str]) -> Result<String, GaqetError> {
        let mut out = Self::header(columns);
        out.push('\n');
        for sample in self.samples() {
            out.push_str(&self.row(sample, columns)?);
            out.push('\n');
        }
        Ok(out)
    }
}
