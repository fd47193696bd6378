#![allow(dead_code)]

pub mod git;

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;

use qx_core::config::CopyOptions;
use qx_core::copy::{CopyEngine, CopyReport};
use qx_core::error::CommandFailed;
use qx_core::git::{ExecResult, Vcs};
use qx_core::runner::{BumpFlags, TaskRunner, VersionBumper};

/// Tests that change the process working directory must hold this.
static CWD_LOCK: Mutex<()> = Mutex::new(());

pub fn cwd_lock() -> MutexGuard<'static, ()> {
    CWD_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Ordered record of every collaborator call, shared between mocks.
#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn push(&self, event: impl Into<String>) {
        self.0.lock().unwrap().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn contains(&self, event: &str) -> bool {
        self.events().iter().any(|e| e == event)
    }

    pub fn position(&self, event: &str) -> Option<usize> {
        self.events().iter().position(|e| e == event)
    }
}

fn dir_label(dir: &Path) -> String {
    dir.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Records `git[<dir name>] <args>` for every call. Trees are clean unless
/// marked dirty by directory name.
pub struct RecordingVcs {
    log: EventLog,
    dirty: HashSet<String>,
    heads: HashMap<String, String>,
    fail_on: Option<(String, i32)>,
}

impl RecordingVcs {
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            dirty: HashSet::new(),
            heads: HashMap::new(),
            fail_on: None,
        }
    }

    pub fn with_dirty(mut self, dir_name: &str) -> Self {
        self.dirty.insert(dir_name.to_string());
        self
    }

    pub fn with_head(mut self, dir_name: &str, commit: &str) -> Self {
        self.heads.insert(dir_name.to_string(), commit.to_string());
        self
    }

    /// Fail the first git subcommand named `subcommand` with `code`.
    pub fn failing_on(mut self, subcommand: &str, code: i32) -> Self {
        self.fail_on = Some((subcommand.to_string(), code));
        self
    }
}

impl Vcs for RecordingVcs {
    fn run(&self, cwd: &Path, args: &[&str]) -> anyhow::Result<ExecResult> {
        let command = args.join(" ");
        self.log.push(format!("git[{}] {}", dir_label(cwd), command));
        if let Some((subcommand, code)) = &self.fail_on
            && args.first() == Some(&subcommand.as_str())
        {
            return Err(CommandFailed {
                command: format!("git {}", command),
                code: *code,
                stderr: "remote rejected".to_string(),
            }
            .into());
        }
        Ok(ExecResult {
            stdout: String::new(),
            stderr: String::new(),
            status: 0,
        })
    }

    fn is_clean(&self, cwd: &Path) -> anyhow::Result<bool> {
        let label = dir_label(cwd);
        self.log.push(format!("is_clean[{}]", label));
        Ok(!self.dirty.contains(&label))
    }

    fn head_commit(&self, cwd: &Path) -> anyhow::Result<String> {
        let label = dir_label(cwd);
        self.log.push(format!("head[{}]", label));
        Ok(self
            .heads
            .get(&label)
            .cloned()
            .unwrap_or_else(|| "0000000000000000000000000000000000000000".to_string()))
    }
}

pub struct RecordingRunner {
    log: EventLog,
    fail_with: Option<i32>,
}

impl RecordingRunner {
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            fail_with: None,
        }
    }

    pub fn failing(log: EventLog, code: i32) -> Self {
        Self {
            log,
            fail_with: Some(code),
        }
    }
}

impl TaskRunner for RecordingRunner {
    fn run_script(&self, cwd: &Path, script: &str) -> anyhow::Result<()> {
        self.log.push(format!("run[{}] {}", dir_label(cwd), script));
        match self.fail_with {
            Some(code) => Err(CommandFailed {
                command: format!("npm run {}", script),
                code,
                stderr: String::new(),
            }
            .into()),
            None => Ok(()),
        }
    }
}

pub struct RecordingBumper {
    log: EventLog,
    pub flags: Mutex<Vec<BumpFlags>>,
}

impl RecordingBumper {
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            flags: Mutex::new(Vec::new()),
        }
    }
}

impl VersionBumper for RecordingBumper {
    fn bump(&self, cwd: &Path, flags: &BumpFlags) -> anyhow::Result<()> {
        self.log.push(format!("bump[{}]", dir_label(cwd)));
        self.flags.lock().unwrap().push(flags.clone());
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyCall {
    pub pattern: String,
    pub dest: PathBuf,
    pub options: CopyOptions,
}

/// Copy engine that records calls and optionally fails patterns containing
/// a marker.
#[derive(Default)]
pub struct RecordingCopyEngine {
    pub calls: Mutex<Vec<CopyCall>>,
    fail_marker: Option<String>,
}

impl RecordingCopyEngine {
    pub fn failing_on(marker: &str) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_marker: Some(marker.to_string()),
        }
    }

    pub fn calls(&self) -> Vec<CopyCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl CopyEngine for RecordingCopyEngine {
    fn copy(
        &self,
        pattern: &str,
        dest: &Path,
        options: &CopyOptions,
    ) -> anyhow::Result<CopyReport> {
        self.calls.lock().unwrap().push(CopyCall {
            pattern: pattern.to_string(),
            dest: dest.to_path_buf(),
            options: *options,
        });
        if let Some(marker) = &self.fail_marker
            && pattern.contains(marker.as_str())
        {
            anyhow::bail!("copy failed for {}", pattern);
        }
        Ok(CopyReport {
            files: 1,
            ..CopyReport::default()
        })
    }
}

pub fn write_file(path: &Path, content: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

/// Write `qxjs.config.json` into `dir`.
pub fn write_config(dir: &Path, config: Value) {
    write_file(
        &dir.join("qxjs.config.json"),
        &serde_json::to_string_pretty(&config).unwrap(),
    );
}
