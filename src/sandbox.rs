//! Throwaway repository used as a three-way merge engine.
//!
//! The sandbox never touches the real repository. It lives in a temporary
//! directory that is removed by [`SandboxRepo::close`] or, failing that, when
//! the value is dropped.

use std::{fs, path::Path};

use tempfile::TempDir;
use tracing::{debug, info};

use crate::{
    error::{GitError, TtbMergeError},
    extract::Version,
    git::{self, Identity},
};

/// Name of the working file inside the sandbox.
pub const SANDBOX_FILE: &str = "timetable.ttb";

/// Branch the sandbox starts on; the target branch's content is committed here.
pub const BASE_BRANCH: &str = "master";

/// Branch carrying the run branch's content.
pub const DEV_BRANCH: &str = "dev";

/// Placeholder identity for sandbox commits.
pub fn sandbox_identity() -> Identity {
    Identity::new("TTB Sandbox", "sandbox@ttb-merge.invalid")
}

/// An ephemeral repository holding one working file.
pub struct SandboxRepo {
    dir: TempDir,
}

impl SandboxRepo {
    /// Creates a fresh directory and initialises an empty repository in it.
    pub fn open() -> Result<Self, TtbMergeError> {
        let dir = tempfile::Builder::new()
            .prefix("ttb-merge-")
            .tempdir()
            .map_err(|source| TtbMergeError::Io {
                path: std::env::temp_dir(),
                source,
            })?;
        let sandbox = Self { dir };
        let identity = sandbox_identity();

        let head = format!("refs/heads/{}", BASE_BRANCH);
        sandbox.git(["init", "--quiet"])?;
        sandbox.git(["symbolic-ref", "HEAD", head.as_str()])?;
        sandbox.git(["config", "user.name", identity.name.as_str()])?;
        sandbox.git(["config", "user.email", identity.email.as_str()])?;
        sandbox.git(["config", "core.autocrlf", "false"])?;
        sandbox.git(["config", "commit.gpgsign", "false"])?;

        debug!(path = %sandbox.path().display(), "Sandbox repository initialised");
        Ok(sandbox)
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    fn git<const N: usize>(&self, args: [&str; N]) -> Result<String, GitError> {
        git::run(self.path(), args)
    }

    /// Replaces the working file with `version`'s text and commits it on the
    /// current branch.
    pub fn commit_version(&self, version: &Version, message: &str) -> Result<(), TtbMergeError> {
        let file = self.path().join(SANDBOX_FILE);
        fs::write(&file, &version.text).map_err(|source| TtbMergeError::Io { path: file, source })?;

        self.git(["add", "--", SANDBOX_FILE])?;
        // Identical versions on two sides must still produce a commit
        self.git(["commit", "--quiet", "--allow-empty", "-m", message])?;
        debug!(label = %version.label, message = %message, "Committed version to sandbox");
        Ok(())
    }

    /// Checks out `name` inside the sandbox, creating it first when `create` is set.
    pub fn switch_branch(&self, name: &str, create: bool) -> Result<(), GitError> {
        if create {
            self.git(["checkout", "--quiet", "-b", name])?;
        } else {
            self.git(["checkout", "--quiet", name])?;
        }
        Ok(())
    }

    /// Merges `branch` into the checked-out branch.
    ///
    /// The exit status is only logged; inspect [`SandboxRepo::get_result`]
    /// for conflict markers to classify the outcome.
    pub fn merge(&self, branch: &str) -> Result<(), GitError> {
        let output = git::run_raw(
            self.path(),
            [
                "-c",
                "merge.conflictStyle=merge",
                "merge",
                "--no-edit",
                "--no-ff",
                branch,
            ],
        )?;
        debug!(
            branch = %branch,
            status = ?output.status.code(),
            stdout = %String::from_utf8_lossy(&output.stdout).trim(),
            "Sandbox merge finished"
        );
        Ok(())
    }

    /// Current content of the working file.
    pub fn get_result(&self) -> Result<String, TtbMergeError> {
        let file = self.path().join(SANDBOX_FILE);
        fs::read_to_string(&file).map_err(|source| TtbMergeError::Io { path: file, source })
    }

    /// Builds the fork / dev / target diamond, merges dev into the target
    /// side and returns the merged working file.
    pub fn run_diamond(
        &self,
        fork: &Version,
        dev: &Version,
        target: &Version,
    ) -> Result<String, TtbMergeError> {
        self.commit_version(fork, "Initial version before divergence")?;

        self.switch_branch(DEV_BRANCH, true)?;
        self.commit_version(dev, "Development updates applied")?;

        self.switch_branch(BASE_BRANCH, false)?;
        self.commit_version(target, "Master branch updates applied")?;

        self.merge(DEV_BRANCH)?;
        self.get_result()
    }

    /// Removes the sandbox directory, reporting any removal failure.
    pub fn close(self) -> Result<(), TtbMergeError> {
        let path = self.path().to_path_buf();
        self.dir
            .close()
            .map_err(|source| TtbMergeError::Io { path: path.clone(), source })?;
        info!(path = %path.display(), "Sandbox removed");
        Ok(())
    }
}
