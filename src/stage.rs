use std::fmt;
use std::time::{Duration, Instant};

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::app::{ProgressEvent, ProgressSink};
use crate::command::{CommandRunner, Invocation};
use crate::error::GaqetError;
use crate::layout::{discard_staged, ensure_dir, promote_staged, staging_path};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageId {
    Agat,
    Gffread,
    Busco,
    Suffixerator,
    LtrHarvest,
    LtrFinder,
    MergeCandidates,
    LtrRetriever,
    Lai,
    Stringtie,
    Gffcompare,
}

impl StageId {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageId::Agat => "agat",
            StageId::Gffread => "gffread",
            StageId::Busco => "busco",
            StageId::Suffixerator => "suffixerator",
            StageId::LtrHarvest => "ltrharvest",
            StageId::LtrFinder => "ltr_finder",
            StageId::MergeCandidates => "merge_candidates",
            StageId::LtrRetriever => "ltr_retriever",
            StageId::Lai => "lai",
            StageId::Stringtie => "stringtie",
            StageId::Gffcompare => "gffcompare",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            StageId::Agat => "AGAT",
            StageId::Gffread => "gffread",
            StageId::Busco => "BUSCO",
            StageId::Suffixerator => "suffixerator",
            StageId::LtrHarvest => "HARVEST",
            StageId::LtrFinder => "FINDER",
            StageId::MergeCandidates => "Concatenation of Harvest and Finder output",
            StageId::LtrRetriever => "LTR_retriever",
            StageId::Lai => "LAI",
            StageId::Stringtie => "stringtie",
            StageId::Gffcompare => "gffcompare",
        }
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What a failed stage means for the rest of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StagePolicy {
    Fatal,
    ContinueWithWarning,
}

/// Whether the tool can be pointed at a scratch path that is renamed into
/// place on success. Only possible when the stage's single output file is
/// also its completion marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Staging {
    Atomic,
    InPlace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum StageStatus {
    AlreadyDone,
    Succeeded,
    Failed { code: Option<i32> },
}

impl StageStatus {
    pub fn is_failure(&self) -> bool {
        matches!(self, StageStatus::Failed { .. })
    }

    /// Process exit code; `None` when nothing ran or no code was reported.
    pub fn code(&self) -> Option<i32> {
        match self {
            StageStatus::AlreadyDone => None,
            StageStatus::Succeeded => Some(0),
            StageStatus::Failed { code } => *code,
        }
    }
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageStatus::AlreadyDone => write!(f, "already done"),
            StageStatus::Succeeded => write!(f, "exit 0"),
            StageStatus::Failed { code: Some(code) } => write!(f, "exit {code}"),
            StageStatus::Failed { code: None } => write!(f, "no exit code"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StageResult {
    pub stage: StageId,
    pub command: String,
    pub message: String,
    pub output: Utf8PathBuf,
    pub status: StageStatus,
    pub elapsed_ms: u64,
}

pub trait Stage {
    fn id(&self) -> StageId;

    /// Path handed to the next stage or to a result extractor.
    fn output(&self) -> Utf8PathBuf;

    /// File whose existence means the stage has already completed.
    fn marker(&self) -> Utf8PathBuf {
        self.output()
    }

    /// Builds the command, writing to `target` (either the output itself or
    /// its staging path).
    fn invocation(&self, target: &Utf8Path) -> Invocation;

    fn staging(&self) -> Staging {
        Staging::InPlace
    }

    fn policy(&self) -> StagePolicy {
        StagePolicy::ContinueWithWarning
    }
}

pub fn run_stage(
    stage: &dyn Stage,
    runner: &dyn CommandRunner,
    sink: &dyn ProgressSink,
) -> Result<StageResult, GaqetError> {
    let id = stage.id();
    let output = stage.output();
    let staging = stage.staging();
    let target = match staging {
        Staging::Atomic => staging_path(&output),
        Staging::InPlace => output.clone(),
    };
    let invocation = stage.invocation(&target);
    let command = invocation.to_string();

    if stage.marker().as_std_path().exists() {
        let message = format!("{} already done", id.label());
        info!(stage = %id, output = %output, "{message}");
        sink.event(ProgressEvent {
            message: format!("stage={id}; {message}"),
            elapsed: None,
        });
        return Ok(StageResult {
            stage: id,
            command,
            message,
            output,
            status: StageStatus::AlreadyDone,
            elapsed_ms: 0,
        });
    }

    if let Some(parent) = output.parent() {
        ensure_dir(parent)?;
    }
    if let Some(cwd) = &invocation.cwd {
        ensure_dir(cwd)?;
    }
    // Leftover from an interrupted run; must never be promoted.
    if staging == Staging::Atomic {
        discard_staged(&target)?;
    }

    sink.event(ProgressEvent {
        message: format!("stage={id}; running {command}"),
        elapsed: None,
    });
    debug!(stage = %id, command = %command, "running stage");

    let started = Instant::now();
    let outcome = runner.run(&invocation);
    let elapsed = started.elapsed();

    let (status, message) = match outcome {
        Ok(outcome) if outcome.success() => {
            if staging == Staging::Atomic {
                if target.as_std_path().exists() {
                    promote_staged(&target, &output)?;
                    (StageStatus::Succeeded, format!("{} ran successfully", id.label()))
                } else {
                    (
                        StageStatus::Failed { code: Some(0) },
                        format!("{} exited successfully but wrote no output", id.label()),
                    )
                }
            } else {
                (StageStatus::Succeeded, format!("{} ran successfully", id.label()))
            }
        }
        Ok(outcome) => {
            if staging == Staging::Atomic {
                discard_staged(&target)?;
            }
            (
                StageStatus::Failed { code: outcome.code },
                format!("{} failed: {}", id.label(), outcome.stderr),
            )
        }
        Err(err) => {
            if staging == Staging::Atomic {
                discard_staged(&target)?;
            }
            (
                StageStatus::Failed { code: None },
                format!("{} could not be launched: {err}", id.label()),
            )
        }
    };

    if status.is_failure() {
        warn!(stage = %id, status = %status, "{message}");
    } else {
        info!(stage = %id, elapsed_ms = duration_ms(elapsed), "{message}");
    }
    let event = if status.is_failure() {
        format!("stage={id}; {status}; {message}")
    } else {
        format!("stage={id}; {status}")
    };
    sink.event(ProgressEvent {
        message: event,
        elapsed: Some(elapsed),
    });

    Ok(StageResult {
        stage: id,
        command,
        message,
        output,
        status,
        elapsed_ms: duration_ms(elapsed),
    })
}

fn duration_ms(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}
