#![allow(dead_code)]
use assert_cmd::{Command, cargo_bin_cmd};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

pub fn rcl() -> Command {
    cargo_bin_cmd!("rclockin")
}

/// A private data directory, also used as the working directory of each run.
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("temp dir"),
        }
    }

    /// `rclockin --dir <workspace>` running inside the workspace.
    pub fn cmd(&self) -> Command {
        let mut cmd = rcl();
        cmd.arg("--dir").arg(self.dir.path());
        cmd.current_dir(self.dir.path());
        cmd.env_remove("RUST_LOG");
        cmd
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn read(&self, name: &str) -> String {
        fs::read_to_string(self.path(name)).unwrap_or_default()
    }

    /// `init` followed by one recorded session for `task`.
    pub fn with_session(task: &str) -> Self {
        let ws = Self::new();
        ws.cmd().arg("init").assert().success();
        ws.cmd().args(["in", task]).assert().success();
        ws.cmd().arg("out").assert().success();
        ws
    }
}
