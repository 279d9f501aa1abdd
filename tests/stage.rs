use std::fs;
use std::io;
use std::sync::Mutex;

use camino::{Utf8Path, Utf8PathBuf};

use gaqet::app::{ProgressEvent, ProgressSink};
use gaqet::command::{CommandRunner, ExitOutcome, Invocation};
use gaqet::layout::staging_path;
use gaqet::stage::{Stage, StageId, StageStatus, Staging, run_stage};

struct WriteStage {
    output: Utf8PathBuf,
    staging: Staging,
    cwd: Option<Utf8PathBuf>,
}

impl Stage for WriteStage {
    fn id(&self) -> StageId {
        StageId::Stringtie
    }

    fn output(&self) -> Utf8PathBuf {
        self.output.clone()
    }

    fn invocation(&self, target: &Utf8Path) -> Invocation {
        let invocation = Invocation::new("write").path_arg(target);
        match &self.cwd {
            Some(cwd) => invocation.current_dir(cwd),
            None => invocation,
        }
    }

    fn staging(&self) -> Staging {
        self.staging
    }
}

/// Writes its first argument (when asked to) and exits with a fixed code;
/// `None` simulates a program that cannot be launched.
struct ScriptedRunner {
    code: Option<i32>,
    writes: bool,
    calls: Mutex<Vec<Invocation>>,
}

impl ScriptedRunner {
    fn new(code: Option<i32>, writes: bool) -> Self {
        Self {
            code,
            writes,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, invocation: &Invocation) -> io::Result<ExitOutcome> {
        self.calls.lock().unwrap().push(invocation.clone());
        if let Some(cwd) = &invocation.cwd {
            assert!(cwd.is_dir(), "working directory must exist before launch");
        }
        if self.writes {
            fs::write(&invocation.args[0], "partial or complete")?;
        }
        match self.code {
            Some(code) => Ok(ExitOutcome {
                code: Some(code),
                stderr: "tool says no".to_string(),
            }),
            None => Err(io::Error::new(io::ErrorKind::NotFound, "no such program")),
        }
    }
}

#[derive(Default)]
struct RecordingSink {
    events: Mutex<Vec<String>>,
}

impl ProgressSink for RecordingSink {
    fn event(&self, event: ProgressEvent) {
        self.events.lock().unwrap().push(event.message);
    }
}

fn temp_root() -> (tempfile::TempDir, Utf8PathBuf) {
    let temp = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    (temp, root)
}

fn atomic(output: Utf8PathBuf) -> WriteStage {
    WriteStage {
        output,
        staging: Staging::Atomic,
        cwd: None,
    }
}

#[test]
fn existing_marker_skips_every_call() {
    let (_temp, root) = temp_root();
    let output = root.join("sample/RNASeqCheck/reads.gtf");
    fs::create_dir_all(output.parent().unwrap()).unwrap();
    fs::write(&output, "done").unwrap();
    let stage = atomic(output.clone());
    let runner = ScriptedRunner::new(Some(0), true);
    let sink = RecordingSink::default();

    for _ in 0..2 {
        let result = run_stage(&stage, &runner, &sink).unwrap();
        assert_eq!(result.status, StageStatus::AlreadyDone);
        assert_eq!(result.message, "stringtie already done");
        assert_eq!(result.output, output);
    }
    assert_eq!(runner.calls(), 0);
    assert_eq!(fs::read_to_string(&output).unwrap(), "done");
    assert_eq!(sink.events.lock().unwrap().len(), 2);
}

#[test]
fn atomic_success_promotes_staged_output() {
    let (_temp, root) = temp_root();
    let output = root.join("sample/RNASeqCheck/reads.gtf");
    let runner = ScriptedRunner::new(Some(0), true);

    let result = run_stage(&atomic(output.clone()), &runner, &RecordingSink::default()).unwrap();

    assert_eq!(result.status, StageStatus::Succeeded);
    assert!(output.is_file());
    assert!(!staging_path(&output).exists());
    let calls = runner.calls.lock().unwrap();
    assert_eq!(calls[0].args[0], staging_path(&output).as_str());
}

#[test]
fn atomic_failure_leaves_nothing_behind() {
    let (_temp, root) = temp_root();
    let output = root.join("sample/RNASeqCheck/reads.gtf");
    let runner = ScriptedRunner::new(Some(2), true);

    let result = run_stage(&atomic(output.clone()), &runner, &RecordingSink::default()).unwrap();

    assert_eq!(result.status, StageStatus::Failed { code: Some(2) });
    assert_eq!(result.message, "stringtie failed: tool says no");
    assert!(!output.exists());
    assert!(!staging_path(&output).exists());
}

#[test]
fn atomic_success_without_output_is_a_failure() {
    let (_temp, root) = temp_root();
    let output = root.join("reads.gtf");
    let runner = ScriptedRunner::new(Some(0), false);

    let result = run_stage(&atomic(output.clone()), &runner, &RecordingSink::default()).unwrap();

    assert_eq!(result.status, StageStatus::Failed { code: Some(0) });
    assert!(!output.exists());
}

#[test]
fn launch_error_is_reported_without_exit_code() {
    let (_temp, root) = temp_root();
    let output = root.join("reads.gtf");
    let runner = ScriptedRunner::new(None, false);

    let result = run_stage(&atomic(output), &runner, &RecordingSink::default()).unwrap();

    assert_eq!(result.status, StageStatus::Failed { code: None });
    assert!(result.message.starts_with("stringtie could not be launched"));
}

#[test]
fn in_place_stage_runs_inside_its_directory() {
    let (_temp, root) = temp_root();
    let dir = root.join("sample/LAICompleteness");
    let stage = WriteStage {
        output: dir.join("genome.fa.mod.out.LAI"),
        staging: Staging::InPlace,
        cwd: Some(dir.clone()),
    };
    let runner = ScriptedRunner::new(Some(0), true);

    let result = run_stage(&stage, &runner, &RecordingSink::default()).unwrap();

    assert_eq!(result.status, StageStatus::Succeeded);
    assert!(dir.join("genome.fa.mod.out.LAI").is_file());
    assert!(result.command.starts_with("(cd "));
}

#[test]
fn leftover_partial_is_not_promoted() {
    let (_temp, root) = temp_root();
    let output = root.join("sample/RNASeqCheck/reads.gtf");
    let staged = staging_path(&output);
    fs::create_dir_all(output.parent().unwrap()).unwrap();
    fs::write(&staged, "stale half-written gtf").unwrap();
    let runner = ScriptedRunner::new(Some(0), false);

    let result = run_stage(&atomic(output.clone()), &runner, &RecordingSink::default()).unwrap();

    assert_eq!(result.status, StageStatus::Failed { code: Some(0) });
    assert!(!output.exists());
    assert!(!staged.exists());
}

#[test]
fn failure_reason_reaches_progress_events() {
    let (_temp, root) = temp_root();
    let runner = ScriptedRunner::new(Some(2), false);
    let sink = RecordingSink::default();

    run_stage(&atomic(root.join("reads.gtf")), &runner, &sink).unwrap();

    let events = sink.events.lock().unwrap();
    assert_eq!(events.last().unwrap(), "stage=stringtie; exit 2; stringtie failed: tool says no");
}
