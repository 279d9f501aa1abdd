use std::fmt;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use camino::{Utf8Path, Utf8PathBuf};

/// A fully built external command: program, arguments, the directory the
/// child runs in and an optional file that receives its stdout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<Utf8PathBuf>,
    pub stdout: Option<Utf8PathBuf>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            stdout: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn path_arg(self, path: &Utf8Path) -> Self {
        self.arg(path.as_str())
    }

    pub fn current_dir(mut self, dir: &Utf8Path) -> Self {
        self.cwd = Some(dir.to_path_buf());
        self
    }

    pub fn stdout_to(mut self, path: &Utf8Path) -> Self {
        self.stdout = Some(path.to_path_buf());
        self
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(cwd) = &self.cwd {
            write!(f, "(cd {} && ", quote(cwd.as_str()))?;
        }
        write!(f, "{}", quote(&self.program))?;
        for arg in &self.args {
            write!(f, " {}", quote(arg))?;
        }
        if let Some(stdout) = &self.stdout {
            write!(f, " > {}", quote(stdout.as_str()))?;
        }
        if self.cwd.is_some() {
            write!(f, ")")?;
        }
        Ok(())
    }
}

fn quote(value: &str) -> String {
    let plain = !value.is_empty()
        && value
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || "-_./=:,+%@".contains(ch));
    if plain {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', r"'\''"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitOutcome {
    /// `None` when the child was terminated by a signal.
    pub code: Option<i32>,
    pub stderr: String,
}

impl ExitOutcome {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

pub trait CommandRunner {
    /// Runs the invocation to completion. An `Err` means the process could
    /// not be launched at all.
    fn run(&self, invocation: &Invocation) -> io::Result<ExitOutcome>;
}

#[derive(Debug, Clone, Default)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> io::Result<ExitOutcome> {
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args).stdin(Stdio::null());
        if let Some(dir) = &invocation.cwd {
            cmd.current_dir(dir.as_std_path());
        }
        match &invocation.stdout {
            Some(path) => {
                cmd.stdout(File::create(path.as_std_path())?);
            }
            None => {
                cmd.stdout(Stdio::piped());
            }
        }
        let output = cmd.output()?;
        let mut stderr = tail_lines(&String::from_utf8_lossy(&output.stderr), DIAGNOSTIC_LINES);
        if stderr.is_empty() {
            stderr = tail_lines(&String::from_utf8_lossy(&output.stdout), DIAGNOSTIC_LINES);
        }
        Ok(ExitOutcome {
            code: output.status.code(),
            stderr,
        })
    }
}

/// Lines of child output kept for the stage message.
const DIAGNOSTIC_LINES: usize = 20;

fn tail_lines(text: &str, limit: usize) -> String {
    let lines = text.trim().lines().collect::<Vec<_>>();
    let start = lines.len().saturating_sub(limit);
    lines[start..].join("\n")
}

pub fn find_in_path(name: &str) -> Option<PathBuf> {
    let candidate = PathBuf::from(name);
    if candidate.components().count() > 1 {
        return candidate.exists().then_some(candidate);
    }
    let path_var = std::env::var_os("PATH")?;
    for path in std::env::split_paths(&path_var) {
        let exe = path.join(format!("{name}.exe"));
        if exe.exists() {
            return Some(exe);
        }
        let plain = path.join(name);
        if plain.exists() {
            return Some(plain);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_renders_shell_like_command() {
        let invocation = Invocation::new("gt")
            .args(["ltrharvest", "-index"])
            .path_arg(Utf8Path::new("/out/genome.fa"))
            .stdout_to(Utf8Path::new("/out/genome.fa.harvest.scn"));
        assert_eq!(
            invocation.to_string(),
            "gt ltrharvest -index /out/genome.fa > /out/genome.fa.harvest.scn"
        );
    }

    #[test]
    fn display_quotes_and_wraps_cwd() {
        let invocation = Invocation::new("LAI")
            .arg("my genome.fa")
            .current_dir(Utf8Path::new("/out/LAI"));
        assert_eq!(invocation.to_string(), "(cd /out/LAI && LAI 'my genome.fa')");
    }

    #[test]
    fn tail_lines_keeps_the_end_of_long_logs() {
        let log = (1..=100).map(|idx| format!("line {idx}")).collect::<Vec<_>>().join("\n");
        let tail = tail_lines(&log, DIAGNOSTIC_LINES);
        assert_eq!(tail.lines().count(), 20);
        assert!(tail.starts_with("line 81\n"));
        assert!(tail.ends_with("line 100"));
        assert_eq!(tail_lines("  only error\n", 20), "only error");
    }

    #[test]
    fn find_in_path_accepts_explicit_paths() {
        let temp = tempfile::tempdir().unwrap();
        let tool = temp.path().join("tool");
        std::fs::write(&tool, b"").unwrap();
        assert_eq!(find_in_path(tool.to_str().unwrap()), Some(tool));
        assert_eq!(find_in_path("/definitely/not/here/tool"), None);
    }
}
