//! Git subprocess plumbing for the real repository.
//!
//! Every call runs with an explicit working directory taken from a
//! [`GitContext`]; nothing here changes the process's current directory.

use std::{
    ffi::OsStr,
    path::{Path, PathBuf},
    process::{Command, Output},
};

use tracing::{debug, warn};

use crate::error::{GitError, TtbMergeError};

/// Name and email recorded on commits made by this tool.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Identity {
    pub name: String,
    pub email: String,
}

impl Identity {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }
}

/// Runs git in `dir` and returns the raw process output, whatever the exit status.
pub(crate) fn run_raw<I, S>(dir: &Path, args: I) -> Result<Output, GitError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let args: Vec<S> = args.into_iter().collect();
    let command = describe(&args);
    debug!(dir = %dir.display(), %command, "Running git");

    Command::new("git")
        .current_dir(dir)
        .args(&args)
        .output()
        .map_err(|e| GitError::Spawn {
            command,
            message: e.to_string(),
        })
}

/// Runs git in `dir` and returns trimmed stdout, failing on a non-zero exit.
pub(crate) fn run<I, S>(dir: &Path, args: I) -> Result<String, GitError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let args: Vec<S> = args.into_iter().collect();
    let output = run_raw(dir, &args)?;

    if !output.status.success() {
        return Err(GitError::CommandFailed {
            command: describe(&args),
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

fn describe<S: AsRef<OsStr>>(args: &[S]) -> String {
    let mut command = String::from("git");
    for arg in args {
        command.push(' ');
        command.push_str(&arg.as_ref().to_string_lossy());
    }
    command
}

/// The real repository a run operates on.
///
/// Holds the repository root and the ref that was checked out when the run
/// started; every branch switch made through [`CheckoutGuard`] returns here.
#[derive(Debug, Clone)]
pub struct GitContext {
    root: PathBuf,
    original_ref: String,
}

impl GitContext {
    /// Opens the repository containing `path` and records its current checkout.
    pub fn open(path: &Path) -> Result<Self, GitError> {
        let output = run_raw(path, ["rev-parse", "--show-toplevel"])?;
        if !output.status.success() {
            return Err(GitError::NotARepository {
                path: path.to_path_buf(),
            });
        }
        let root = PathBuf::from(String::from_utf8_lossy(&output.stdout).trim());

        let original_ref = current_ref(&root)?;
        debug!(root = %root.display(), original_ref = %original_ref, "Opened repository");

        Ok(Self { root, original_ref })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Branch name (or commit sha, when detached) checked out at open time.
    pub fn original_ref(&self) -> &str {
        &self.original_ref
    }

    /// Latest common ancestor of two revisions, `None` when histories are unrelated.
    pub fn merge_base(&self, a: &str, b: &str) -> Result<Option<String>, GitError> {
        let output = run_raw(&self.root, ["merge-base", a, b])?;

        // merge-base exits 1 with empty output when there is no common ancestor
        match output.status.code() {
            Some(0) => Ok(Some(
                String::from_utf8_lossy(&output.stdout).trim().to_string(),
            )),
            Some(1) if output.stderr.is_empty() => Ok(None),
            _ => Err(GitError::CommandFailed {
                command: format!("git merge-base {} {}", a, b),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }),
        }
    }

    pub fn checkout(&self, reference: &str) -> Result<(), GitError> {
        run(&self.root, ["checkout", "--quiet", reference]).map(|_| ())
    }

    /// Author name of the commit at HEAD.
    pub fn last_commit_author(&self) -> Result<String, GitError> {
        run(&self.root, ["log", "-1", "--pretty=format:%an", "HEAD"])
    }

    /// Writes `identity` into the repository-local config.
    pub fn configure_identity(&self, identity: &Identity) -> Result<(), GitError> {
        run(&self.root, ["config", "user.name", identity.name.as_str()])?;
        run(&self.root, ["config", "user.email", identity.email.as_str()])?;
        Ok(())
    }

    pub fn stage(&self, file: &Path) -> Result<(), GitError> {
        run(&self.root, [OsStr::new("add"), OsStr::new("--"), file.as_os_str()]).map(|_| ())
    }

    /// Whether `file` differs between the index and HEAD.
    pub fn has_staged_changes(&self, file: &Path) -> Result<bool, GitError> {
        let output = run_raw(
            &self.root,
            [
                OsStr::new("diff"),
                OsStr::new("--cached"),
                OsStr::new("--quiet"),
                OsStr::new("--"),
                file.as_os_str(),
            ],
        )?;

        match output.status.code() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(GitError::CommandFailed {
                command: format!("git diff --cached --quiet -- {}", file.display()),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }),
        }
    }

    /// Commits `file` alone, leaving anything else in the index untouched.
    /// Returns the new commit's sha.
    pub fn commit(&self, message: &str, file: &Path) -> Result<String, GitError> {
        run(
            &self.root,
            [
                OsStr::new("commit"),
                OsStr::new("--quiet"),
                OsStr::new("-m"),
                OsStr::new(message),
                OsStr::new("--"),
                file.as_os_str(),
            ],
        )?;
        run(&self.root, ["rev-parse", "HEAD"])
    }

    /// Pushes HEAD to `branch` on `remote`.
    pub fn push(&self, remote: &str, branch: &str) -> Result<(), GitError> {
        let refspec = format!("HEAD:refs/heads/{}", branch);
        run(&self.root, ["push", "--quiet", remote, refspec.as_str()]).map(|_| ())
    }
}

/// Branch checked out in `dir`, or the commit sha when HEAD is detached.
fn current_ref(dir: &Path) -> Result<String, GitError> {
    let branch = run(dir, ["rev-parse", "--abbrev-ref", "HEAD"])?;
    if branch == "HEAD" {
        return run(dir, ["rev-parse", "HEAD"]);
    }
    Ok(branch)
}

/// Scoped switch of the real repository's checkout.
///
/// Call [`CheckoutGuard::restore`] to go back and observe failures. A guard
/// dropped without `restore` (early return, panic) still switches back and
/// logs any error.
#[must_use = "dropping the guard immediately switches the checkout back"]
pub struct CheckoutGuard<'a> {
    ctx: &'a GitContext,
    restored: bool,
}

impl<'a> CheckoutGuard<'a> {
    /// Checks out `reference`, returning a guard that restores the original ref.
    pub fn switch(ctx: &'a GitContext, reference: &str) -> Result<Self, GitError> {
        debug!(reference = %reference, "Switching checkout");
        ctx.checkout(reference)?;
        Ok(Self {
            ctx,
            restored: false,
        })
    }

    /// Switches back to the context's original ref.
    pub fn restore(mut self) -> Result<(), TtbMergeError> {
        self.restored = true;
        self.ctx
            .checkout(self.ctx.original_ref())
            .map_err(|e| TtbMergeError::CheckoutRestoration {
                branch: self.ctx.original_ref().to_string(),
                message: e.to_string(),
            })
    }
}

impl Drop for CheckoutGuard<'_> {
    fn drop(&mut self) {
        if self.restored {
            return;
        }
        if let Err(e) = self.ctx.checkout(self.ctx.original_ref()) {
            warn!(
                branch = %self.ctx.original_ref(),
                error = %e,
                "Failed to restore checkout"
            );
        }
    }
}
