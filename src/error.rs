use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum GaqetError {
    #[error("manifest not found: {0}")]
    ManifestNotFound(PathBuf),

    #[error("failed to read manifest at {path}: {message}")]
    ManifestRead { path: PathBuf, message: String },

    #[error("manifest header is missing required column(s): {0}")]
    ManifestHeader(String),

    #[error("manifest line {line}: {message}")]
    ManifestRow { line: usize, message: String },

    #[error("duplicate sample name in manifest: {0}")]
    DuplicateSample(String),

    #[error("invalid sample name: {0:?}")]
    InvalidSampleName(String),

    #[error("sample {sample}: {column} file does not exist: {path}")]
    MissingInput {
        sample: String,
        column: String,
        path: PathBuf,
    },

    #[error("failed to read tool config at {0}")]
    ToolConfigRead(PathBuf),

    #[error("failed to parse tool config: {0}")]
    ToolConfigParse(String),

    #[error("sample {sample}: stage {stage} failed ({code}): {message}")]
    StageFailed {
        sample: String,
        stage: String,
        code: String,
        message: String,
    },

    #[error("failed to read report {path}: {message}")]
    ReportRead { path: PathBuf, message: String },

    #[error("sample {sample} is missing metric {metric:?}")]
    MissingMetric { sample: String, metric: String },

    #[error("filesystem error: {0}")]
    Filesystem(String),
}

impl GaqetError {
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            GaqetError::ManifestNotFound(_)
                | GaqetError::ManifestRead { .. }
                | GaqetError::ManifestHeader(_)
                | GaqetError::ManifestRow { .. }
                | GaqetError::DuplicateSample(_)
                | GaqetError::InvalidSampleName(_)
                | GaqetError::MissingInput { .. }
                | GaqetError::ToolConfigRead(_)
                | GaqetError::ToolConfigParse(_)
        )
    }
}
