//! Per-file merge state machine and batch driver.
//!
//! A file moves through `GuardChecked → DivergenceResolved →
//! VersionsCollected → SandboxMerged` and ends either clean or conflicted.
//! Every file gets its own sandbox; the real repository is only touched
//! through [`GitContext`].

use std::{
    fmt, fs,
    path::{Path, PathBuf},
};

use serde::Serialize;
use tracing::{info, warn};

use crate::{
    codec,
    conflict::{self, ConflictSection, MergeOutcome},
    error::{ConfigError, GitError, TtbMergeError},
    extract::{Version, VersionExtractor},
    git::{GitContext, Identity},
    sandbox::SandboxRepo,
};

use super::report::{BatchReport, FileReport, ProgressEvent};

/// Default glob used to find timetable files.
pub const DEFAULT_PATTERN: &str = "**/*.ttb";

/// Settings for one run of the orchestrator.
#[derive(Debug, Clone)]
pub struct MergeOptions {
    /// Branch the run was triggered for; also the push target.
    pub origin_branch: String,
    /// Protected branch merged into the run's branch.
    pub target_branch: String,
    /// Automation identity used for commits and the loop guard.
    pub identity: Identity,
    pub remote: String,
    /// Write clean results back to the real file (off in soft mode).
    pub write_back: bool,
    /// Push write-back commits to `remote`.
    pub push: bool,
}

/// Why a run was skipped without merging anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardReason {
    /// The run's branch is the target branch.
    ProtectedBranch,
    /// HEAD was authored by the automation identity.
    AutomatedCommit,
}

impl fmt::Display for GuardReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GuardReason::ProtectedBranch => write!(f, "branch is the protected target branch"),
            GuardReason::AutomatedCommit => write!(f, "latest commit was made by the automation"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardStatus {
    Proceed,
    Skip(GuardReason),
}

/// Result of merging one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FileOutcome {
    /// A guard stopped the merge before anything was read.
    Skipped { reason: GuardReason },
    /// The merge had no conflicts.
    ///
    /// `written` is false in soft mode and when the result already matches
    /// the file on disk. `commit` holds the sha of the write-back commit.
    Clean {
        written: bool,
        commit: Option<String>,
    },
    /// The merge left conflicts; the real file was not touched.
    Conflicted { sections: Vec<ConflictSection> },
}

/// Drives merges of timetable files against the real repository.
pub struct MergeOrchestrator<'a> {
    ctx: &'a GitContext,
    options: MergeOptions,
}

impl<'a> MergeOrchestrator<'a> {
    pub fn new(ctx: &'a GitContext, options: MergeOptions) -> Self {
        Self { ctx, options }
    }

    /// Evaluates the no-op guards for this run.
    pub fn check_guards(&self) -> Result<GuardStatus, GitError> {
        if self.options.origin_branch == self.options.target_branch {
            info!(
                branch = %self.options.origin_branch,
                "Run branch is the target branch, nothing to merge"
            );
            return Ok(GuardStatus::Skip(GuardReason::ProtectedBranch));
        }

        let author = self.ctx.last_commit_author()?;
        if author == self.options.identity.name {
            info!(author = %author, "Latest commit is an automated merge, skipping");
            return Ok(GuardStatus::Skip(GuardReason::AutomatedCommit));
        }

        Ok(GuardStatus::Proceed)
    }

    /// Merges `file` under a guard status obtained from [`check_guards`].
    ///
    /// Guards are evaluated once per run, not per file: after the first
    /// write-back HEAD is the automation's own commit, so re-checking would
    /// skip every later file.
    ///
    /// [`check_guards`]: Self::check_guards
    pub fn merge_file(&self, file: &Path, guards: GuardStatus) -> Result<FileOutcome, TtbMergeError> {
        if let GuardStatus::Skip(reason) = guards {
            return Ok(FileOutcome::Skipped { reason });
        }

        let origin = self.options.origin_branch.as_str();
        let target = self.options.target_branch.as_str();

        let fork_commit =
            self.ctx
                .merge_base(target, "HEAD")?
                .ok_or_else(|| TtbMergeError::NoCommonAncestor {
                    branch: origin.to_string(),
                    target: target.to_string(),
                })?;
        info!(file = %file.display(), fork = %fork_commit, "Divergence point resolved");

        let extractor = VersionExtractor::new(self.ctx);
        let target_version = extractor.get_version(file, Some(target), target)?;
        let dev_version = extractor.get_version(file, None, origin)?;
        let fork_version = extractor.get_version(file, Some(&fork_commit), "fork")?;
        info!(file = %file.display(), "Versions collected");

        match self.merge_in_sandbox(&fork_version, &dev_version, &target_version)? {
            MergeOutcome::Conflicted { sections } => {
                info!(file = %file.display(), sections = sections.len(), "Merge has conflicts");
                Ok(FileOutcome::Conflicted { sections })
            }
            MergeOutcome::Clean { resolved } => {
                info!(file = %file.display(), "Merge is clean");
                self.write_back(file, &resolved)
            }
        }
    }

    fn merge_in_sandbox(
        &self,
        fork: &Version,
        dev: &Version,
        target: &Version,
    ) -> Result<MergeOutcome, TtbMergeError> {
        let sandbox = SandboxRepo::open()?;
        let merged = sandbox.run_diamond(fork, dev, target);

        if let Err(e) = sandbox.close() {
            warn!(error = %e, "Failed to remove sandbox directory");
        }

        Ok(conflict::analyze(&merged?)?)
    }

    fn write_back(&self, file: &Path, resolved: &str) -> Result<FileOutcome, TtbMergeError> {
        if !self.options.write_back {
            info!(file = %file.display(), "Soft mode, leaving file untouched");
            return Ok(FileOutcome::Clean {
                written: false,
                commit: None,
            });
        }

        let bytes = codec::decode(resolved)?;
        let path = self.ctx.root().join(file);
        let current = fs::read(&path).map_err(|source| TtbMergeError::Io {
            path: path.clone(),
            source,
        })?;
        if current == bytes {
            info!(file = %file.display(), "File already up to date");
            return Ok(FileOutcome::Clean {
                written: false,
                commit: None,
            });
        }

        fs::write(&path, &bytes).map_err(|source| TtbMergeError::Io { path, source })?;
        self.ctx.stage(file)?;

        // The working tree may have held uncommitted edits equal to the result
        if !self.ctx.has_staged_changes(file)? {
            info!(file = %file.display(), "Result matches HEAD, nothing to commit");
            return Ok(FileOutcome::Clean {
                written: true,
                commit: None,
            });
        }

        self.ctx.configure_identity(&self.options.identity)?;
        let sha = self.ctx.commit(&commit_message(file, &self.options.origin_branch), file)?;
        info!(file = %file.display(), commit = %sha, "Committed merge result");

        if self.options.push {
            self.ctx
                .push(&self.options.remote, &self.options.origin_branch)?;
            info!(
                remote = %self.options.remote,
                branch = %self.options.origin_branch,
                "Pushed merge result"
            );
        }

        Ok(FileOutcome::Clean {
            written: true,
            commit: Some(sha),
        })
    }

    /// Merges every file in `files`, reporting progress through `on_event`.
    ///
    /// Guards are evaluated once for the whole batch. A failure on one file
    /// does not stop the others unless it leaves the checkout in an unknown
    /// state.
    pub fn run_batch<F>(&self, files: &[PathBuf], mut on_event: F) -> Result<BatchReport, GitError>
    where
        F: FnMut(&ProgressEvent),
    {
        let mut report = BatchReport::new(&self.options.origin_branch, &self.options.target_branch);

        on_event(&ProgressEvent::Start {
            origin_branch: self.options.origin_branch.clone(),
            target_branch: self.options.target_branch.clone(),
            total_files: files.len(),
        });

        if let GuardStatus::Skip(reason) = self.check_guards()? {
            report.skipped = Some(reason);
            on_event(&ProgressEvent::Skipped { reason });
            return Ok(report);
        }

        for (index, file) in files.iter().enumerate() {
            on_event(&ProgressEvent::FileStart {
                file: file.clone(),
                index,
                total: files.len(),
            });

            let (file_report, abort) = match self.merge_file(file, GuardStatus::Proceed) {
                Ok(outcome) => (FileReport::outcome(file.clone(), outcome), false),
                Err(e) => {
                    warn!(file = %file.display(), error = %e, "Merge failed");
                    (FileReport::failed(file.clone(), &e), e.aborts_batch())
                }
            };

            on_event(&ProgressEvent::FileDone {
                report: file_report.clone(),
            });
            report.files.push(file_report);

            if abort {
                warn!("Checkout could not be restored, aborting remaining files");
                report.aborted = true;
                break;
            }
        }

        on_event(&ProgressEvent::Complete {
            counts: report.counts(),
        });
        Ok(report)
    }
}

/// Commit message recorded for a write-back.
pub fn commit_message(file: &Path, branch: &str) -> String {
    format!(
        "Automated Commit: Merge of file '{}' from branch '{}'",
        file.display(),
        branch
    )
}

/// Turns a `--ttb-path` value into a glob relative to `root`.
///
/// A value ending in `.ttb` that is not a directory is used as-is. Anything
/// else names a location (itself possibly a glob such as `*`) and gets
/// `*.ttb` appended.
pub fn file_glob(root: &Path, location: &str) -> String {
    let location = location.trim_end_matches('/');
    if location.is_empty() || location == "." {
        return "*.ttb".to_string();
    }
    if location.ends_with(".ttb") && !root.join(location).is_dir() {
        return location.to_string();
    }
    format!("{}/*.ttb", location)
}

/// Expands `location` under `root`, returning sorted repository-relative paths.
///
/// See [`file_glob`] for how the location becomes a glob. Anything inside
/// `.git` is ignored.
pub fn discover_files(root: &Path, location: &str) -> Result<Vec<PathBuf>, ConfigError> {
    let full = format!(
        "{}/{}",
        glob::Pattern::escape(&root.to_string_lossy()),
        file_glob(root, location)
    );
    let entries = glob::glob(&full).map_err(|e| ConfigError::InvalidValue {
        field: "pattern".to_string(),
        message: e.to_string(),
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let path = match entry {
            Ok(path) => path,
            Err(e) => {
                warn!(error = %e, "Skipping unreadable path");
                continue;
            }
        };
        if !path.is_file() {
            continue;
        }
        let Ok(relative) = path.strip_prefix(root) else {
            continue;
        };
        if relative.components().any(|c| c.as_os_str() == ".git") {
            continue;
        }
        files.push(relative.to_path_buf());
    }

    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::test_support::*;

    fn options(origin: &str) -> MergeOptions {
        MergeOptions {
            origin_branch: origin.to_string(),
            target_branch: "master".to_string(),
            identity: Identity::new("Automated Commit: ROS CI", "noreply@unreal-email.com"),
            remote: "origin".to_string(),
            write_back: true,
            push: false,
        }
    }

    /// Builds master with `fork`, branches `feature` with `dev`, moves master
    /// to `target` and leaves `feature` checked out.
    fn diverged_repo(fork: &[u8], dev: &[u8], target: &[u8]) -> (tempfile::TempDir, PathBuf) {
        let (temp_dir, repo_path) = setup_test_repo();
        commit_file(&repo_path, "day.ttb", fork, "Fork");
        git(&repo_path, &["checkout", "--quiet", "-b", "feature"]);
        commit_file(&repo_path, "day.ttb", dev, "Feature change");
        git(&repo_path, &["checkout", "--quiet", "master"]);
        commit_file(&repo_path, "day.ttb", target, "Master change");
        git(&repo_path, &["checkout", "--quiet", "feature"]);
        (temp_dir, repo_path)
    }

    /// # Protected Branch Guard
    ///
    /// Verifies a run on the target branch is skipped.
    ///
    /// ## Test Scenario
    /// - origin_branch equals target_branch
    ///
    /// ## Expected Outcome
    /// - Skip(ProtectedBranch), and merge_file reports Skipped
    #[test]
    fn test_guard_protected_branch() {
        let (_temp_dir, repo_path) = setup_test_repo();
        commit_file(&repo_path, "day.ttb", b"1,2", "Initial");
        let ctx = GitContext::open(&repo_path).unwrap();
        let orchestrator = MergeOrchestrator::new(&ctx, options("master"));

        assert_eq!(
            orchestrator.check_guards().unwrap(),
            GuardStatus::Skip(GuardReason::ProtectedBranch)
        );
        let guards = orchestrator.check_guards().unwrap();
        assert_eq!(
            orchestrator.merge_file(Path::new("day.ttb"), guards).unwrap(),
            FileOutcome::Skipped {
                reason: GuardReason::ProtectedBranch
            }
        );
    }

    /// # Automated Commit Guard
    ///
    /// Verifies a run whose HEAD was authored by the automation is skipped.
    ///
    /// ## Test Scenario
    /// - Commits on feature with the automation's name as author
    ///
    /// ## Expected Outcome
    /// - Skip(AutomatedCommit)
    #[test]
    fn test_guard_automated_commit() {
        let (_temp_dir, repo_path) = diverged_repo(b"1,2", b"1,3", b"1,2");
        git(
            &repo_path,
            &[
                "-c",
                "user.name=Automated Commit: ROS CI",
                "commit",
                "--quiet",
                "--allow-empty",
                "-m",
                "Automated",
            ],
        );
        let ctx = GitContext::open(&repo_path).unwrap();

        assert_eq!(
            MergeOrchestrator::new(&ctx, options("feature"))
                .check_guards()
                .unwrap(),
            GuardStatus::Skip(GuardReason::AutomatedCommit)
        );
    }

    /// # Clean Merge Already Up to Date
    ///
    /// Verifies a one-sided dev change merges to the dev version and needs
    /// no write-back.
    ///
    /// ## Test Scenario
    /// - fork "1,2", dev "1,3", master "1,2"
    ///
    /// ## Expected Outcome
    /// - Clean, nothing written, no commit
    #[test]
    fn test_merge_file_clean_up_to_date() {
        let (_temp_dir, repo_path) = diverged_repo(b"1,2", b"1,3", b"1,2");
        let ctx = GitContext::open(&repo_path).unwrap();
        let outcome = MergeOrchestrator::new(&ctx, options("feature"))
            .merge_file(Path::new("day.ttb"), GuardStatus::Proceed)
            .unwrap();

        assert_eq!(
            outcome,
            FileOutcome::Clean {
                written: false,
                commit: None
            }
        );
        assert_eq!(fs::read(repo_path.join("day.ttb")).unwrap(), b"1,3");
    }

    /// # Clean Merge With Write-Back
    ///
    /// Verifies independent field changes are combined, written and committed.
    ///
    /// ## Test Scenario
    /// - fork "a,b,c", dev "A,b,c", master "a,b,C"; push disabled
    ///
    /// ## Expected Outcome
    /// - File holds "A,b,C", a commit by the automation identity with the
    ///   expected message, feature still checked out
    #[test]
    fn test_merge_file_write_back() {
        let (_temp_dir, repo_path) = diverged_repo(b"a,b,c", b"A,b,c", b"a,b,C");
        let ctx = GitContext::open(&repo_path).unwrap();
        let outcome = MergeOrchestrator::new(&ctx, options("feature"))
            .merge_file(Path::new("day.ttb"), GuardStatus::Proceed)
            .unwrap();

        let FileOutcome::Clean {
            written: true,
            commit: Some(sha),
        } = outcome
        else {
            panic!("expected committed clean outcome, got {:?}", outcome);
        };

        assert_eq!(fs::read(repo_path.join("day.ttb")).unwrap(), b"A,b,C");
        assert_eq!(git(&repo_path, &["rev-parse", "HEAD"]), sha);
        assert_eq!(
            git(&repo_path, &["log", "-1", "--pretty=format:%an|%s"]),
            "Automated Commit: ROS CI|Automated Commit: Merge of file 'day.ttb' from branch 'feature'"
        );
        assert_eq!(
            git(&repo_path, &["rev-parse", "--abbrev-ref", "HEAD"]),
            "feature"
        );
    }

    /// # Soft Mode
    ///
    /// Verifies soft mode reports a clean merge without touching the file.
    ///
    /// ## Test Scenario
    /// - Same divergence as the write-back test with write_back disabled
    ///
    /// ## Expected Outcome
    /// - Clean with nothing written; the file and HEAD are unchanged
    #[test]
    fn test_merge_file_soft_mode() {
        let (_temp_dir, repo_path) = diverged_repo(b"a,b,c", b"A,b,c", b"a,b,C");
        let head = git(&repo_path, &["rev-parse", "HEAD"]);
        let ctx = GitContext::open(&repo_path).unwrap();
        let mut opts = options("feature");
        opts.write_back = false;

        let outcome = MergeOrchestrator::new(&ctx, opts)
            .merge_file(Path::new("day.ttb"), GuardStatus::Proceed)
            .unwrap();

        assert_eq!(
            outcome,
            FileOutcome::Clean {
                written: false,
                commit: None
            }
        );
        assert_eq!(fs::read(repo_path.join("day.ttb")).unwrap(), b"A,b,c");
        assert_eq!(git(&repo_path, &["rev-parse", "HEAD"]), head);
    }

    /// # Conflicting Merge
    ///
    /// Verifies the same subfield changed on both sides is a conflict.
    ///
    /// ## Test Scenario
    /// - fork "1,2", dev "1,3", master "1,4"
    ///
    /// ## Expected Outcome
    /// - One section, ours is master's "4", theirs is the run branch's "3"
    /// - The real file is unchanged
    #[test]
    fn test_merge_file_conflict() {
        let (_temp_dir, repo_path) = diverged_repo(b"1,2", b"1,3", b"1,4");
        let ctx = GitContext::open(&repo_path).unwrap();
        let outcome = MergeOrchestrator::new(&ctx, options("feature"))
            .merge_file(Path::new("day.ttb"), GuardStatus::Proceed)
            .unwrap();

        assert_eq!(
            outcome,
            FileOutcome::Conflicted {
                sections: vec![ConflictSection {
                    ours: "4".to_string(),
                    theirs: "3".to_string(),
                }]
            }
        );
        assert_eq!(fs::read(repo_path.join("day.ttb")).unwrap(), b"1,3");
    }

    /// # No Common Ancestor
    ///
    /// Verifies unrelated histories are a fatal error for the file.
    ///
    /// ## Test Scenario
    /// - Run branch is an orphan branch
    ///
    /// ## Expected Outcome
    /// - NoCommonAncestor naming both branches
    #[test]
    fn test_merge_file_no_common_ancestor() {
        let (_temp_dir, repo_path) = setup_test_repo();
        commit_file(&repo_path, "day.ttb", b"1,2", "Initial");
        git(&repo_path, &["checkout", "--quiet", "--orphan", "lonely"]);
        commit_file(&repo_path, "day.ttb", b"9,9", "Unrelated");

        let ctx = GitContext::open(&repo_path).unwrap();
        let result = MergeOrchestrator::new(&ctx, options("lonely"))
            .merge_file(Path::new("day.ttb"), GuardStatus::Proceed);

        match result {
            Err(TtbMergeError::NoCommonAncestor { branch, target }) => {
                assert_eq!(branch, "lonely");
                assert_eq!(target, "master");
            }
            other => panic!("expected NoCommonAncestor, got {:?}", other),
        }
    }

    /// # Batch Continues After a Missing File
    ///
    /// Verifies a file missing on the target branch fails alone.
    ///
    /// ## Test Scenario
    /// - new.ttb only exists on feature, day.ttb exists on both
    ///
    /// ## Expected Outcome
    /// - day.ttb is merged, new.ttb fails naming master, batch not aborted
    /// - Events are emitted for start, each file and completion
    #[test]
    fn test_run_batch_missing_file_continues() {
        let (_temp_dir, repo_path) = diverged_repo(b"1,2", b"1,3", b"1,2");
        commit_file(&repo_path, "new.ttb", b"5,5", "Add new timetable");
        let ctx = GitContext::open(&repo_path).unwrap();
        let orchestrator = MergeOrchestrator::new(&ctx, options("feature"));

        let files = vec![PathBuf::from("day.ttb"), PathBuf::from("new.ttb")];
        let mut events = Vec::new();
        let report = orchestrator
            .run_batch(&files, |event| events.push(event.clone()))
            .unwrap();

        assert!(!report.aborted);
        assert_eq!(report.files.len(), 2);
        assert!(report.files[0].error.is_none());
        let error = report.files[1].error.as_deref().unwrap();
        assert!(error.contains("new.ttb"));
        assert!(error.contains("master"));

        assert!(matches!(events.first(), Some(ProgressEvent::Start { total_files: 2, .. })));
        assert!(matches!(events.last(), Some(ProgressEvent::Complete { .. })));
        assert_eq!(events.len(), 6);
    }

    /// # Batch Skipped by Guard
    ///
    /// Verifies a guarded batch processes no file.
    ///
    /// ## Test Scenario
    /// - Runs a batch on the target branch
    ///
    /// ## Expected Outcome
    /// - Report carries the skip reason and no file reports
    #[test]
    fn test_run_batch_skipped() {
        let (_temp_dir, repo_path) = setup_test_repo();
        commit_file(&repo_path, "day.ttb", b"1,2", "Initial");
        let ctx = GitContext::open(&repo_path).unwrap();

        let report = MergeOrchestrator::new(&ctx, options("master"))
            .run_batch(&[PathBuf::from("day.ttb")], |_| {})
            .unwrap();

        assert_eq!(report.skipped, Some(GuardReason::ProtectedBranch));
        assert!(report.files.is_empty());
    }

    /// # Batch Skipped After an Automated Commit
    ///
    /// Verifies a run whose HEAD is the automation's own merge commit does
    /// nothing, so a pushed write-back cannot trigger another merge.
    ///
    /// ## Test Scenario
    /// - A diverged file that would otherwise be written back
    /// - HEAD authored by the automation identity
    ///
    /// ## Expected Outcome
    /// - Report skipped with AutomatedCommit, no file reports, exit code 0
    /// - The file and HEAD are unchanged
    #[test]
    fn test_run_batch_skipped_after_automated_commit() {
        let (_temp_dir, repo_path) = diverged_repo(b"a,b,c", b"A,b,c", b"a,b,C");
        git(
            &repo_path,
            &[
                "-c",
                "user.name=Automated Commit: ROS CI",
                "commit",
                "--quiet",
                "--allow-empty",
                "-m",
                "Automated",
            ],
        );
        let head = git(&repo_path, &["rev-parse", "HEAD"]);
        let ctx = GitContext::open(&repo_path).unwrap();

        let mut events = Vec::new();
        let report = MergeOrchestrator::new(&ctx, options("feature"))
            .run_batch(&[PathBuf::from("day.ttb")], |event| events.push(event.clone()))
            .unwrap();

        assert_eq!(report.skipped, Some(GuardReason::AutomatedCommit));
        assert!(report.files.is_empty());
        assert_eq!(report.exit_code(), crate::core::ExitCode::Success);
        assert!(matches!(
            events.last(),
            Some(ProgressEvent::Skipped {
                reason: GuardReason::AutomatedCommit
            })
        ));
        assert_eq!(fs::read(repo_path.join("day.ttb")).unwrap(), b"A,b,c");
        assert_eq!(git(&repo_path, &["rev-parse", "HEAD"]), head);
    }

    /// # Sequential Files Share One Guard Check
    ///
    /// Verifies merging files one after another keeps merging after the
    /// first write-back commit.
    ///
    /// ## Test Scenario
    /// - a.ttb and b.ttb both carry independent edits on each branch
    /// - Guards checked once, then merge_file called for each file
    ///
    /// ## Expected Outcome
    /// - Both files are committed with the combined edits
    #[test]
    fn test_merge_file_sequential_files() {
        let (_temp_dir, repo_path) = setup_test_repo();
        commit_file(&repo_path, "a.ttb", b"a,b,c", "Fork a");
        commit_file(&repo_path, "b.ttb", b"a,b,c", "Fork b");
        git(&repo_path, &["checkout", "--quiet", "-b", "feature"]);
        commit_file(&repo_path, "a.ttb", b"A,b,c", "Feature a");
        commit_file(&repo_path, "b.ttb", b"A,b,c", "Feature b");
        git(&repo_path, &["checkout", "--quiet", "master"]);
        commit_file(&repo_path, "a.ttb", b"a,b,C", "Master a");
        commit_file(&repo_path, "b.ttb", b"a,b,C", "Master b");
        git(&repo_path, &["checkout", "--quiet", "feature"]);

        let ctx = GitContext::open(&repo_path).unwrap();
        let orchestrator = MergeOrchestrator::new(&ctx, options("feature"));
        let guards = orchestrator.check_guards().unwrap();
        assert_eq!(guards, GuardStatus::Proceed);

        for file in ["a.ttb", "b.ttb"] {
            let outcome = orchestrator.merge_file(Path::new(file), guards).unwrap();
            assert!(
                matches!(
                    outcome,
                    FileOutcome::Clean {
                        written: true,
                        commit: Some(_)
                    }
                ),
                "{}: {:?}",
                file,
                outcome
            );
            assert_eq!(fs::read(repo_path.join(file)).unwrap(), b"A,b,C");
        }
    }

    /// # File Discovery
    ///
    /// Verifies the glob expands to sorted, relative timetable paths.
    ///
    /// ## Test Scenario
    /// - Files at the root, in a subdirectory and a non-matching file
    ///
    /// ## Expected Outcome
    /// - Only .ttb files, relative to the root, sorted
    #[test]
    fn test_discover_files() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("lines/north")).unwrap();
        fs::write(root.join("b.ttb"), b"").unwrap();
        fs::write(root.join("lines/north/a.ttb"), b"").unwrap();
        fs::write(root.join("notes.txt"), b"").unwrap();

        let files = discover_files(root, DEFAULT_PATTERN).unwrap();
        assert_eq!(
            files,
            vec![PathBuf::from("b.ttb"), PathBuf::from("lines/north/a.ttb")]
        );

        let files = discover_files(root, "*/*/*.ttb").unwrap();
        assert_eq!(files, vec![PathBuf::from("lines/north/a.ttb")]);
    }

    /// # Discovery From a Location
    ///
    /// Verifies a directory or a location glob gets `*.ttb` appended.
    ///
    /// ## Test Scenario
    /// - Program_Timetables/day.ttb and a stray file on disk
    /// - Locations "Program_Timetables", "Program_Timetables/" and "*"
    ///
    /// ## Expected Outcome
    /// - Each finds Program_Timetables/day.ttb only
    #[test]
    fn test_discover_files_from_location() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("Program_Timetables")).unwrap();
        fs::write(root.join("Program_Timetables/day.ttb"), b"").unwrap();
        fs::write(root.join("Program_Timetables/readme.md"), b"").unwrap();

        let expected = vec![PathBuf::from("Program_Timetables/day.ttb")];
        assert_eq!(discover_files(root, "Program_Timetables").unwrap(), expected);
        assert_eq!(discover_files(root, "Program_Timetables/").unwrap(), expected);
        assert_eq!(discover_files(root, "*").unwrap(), expected);
    }

    /// # Location to Glob
    ///
    /// Verifies how a `--ttb-path` value becomes a glob.
    ///
    /// ## Test Scenario
    /// - Full globs, plain locations, the root and a directory named like a file
    ///
    /// ## Expected Outcome
    /// - Only values ending in .ttb that are not directories pass through
    #[test]
    fn test_file_glob() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("odd.ttb")).unwrap();

        assert_eq!(file_glob(root, DEFAULT_PATTERN), "**/*.ttb");
        assert_eq!(file_glob(root, "lines/day.ttb"), "lines/day.ttb");
        assert_eq!(file_glob(root, "lines"), "lines/*.ttb");
        assert_eq!(file_glob(root, "*"), "*/*.ttb");
        assert_eq!(file_glob(root, "."), "*.ttb");
        assert_eq!(file_glob(root, ""), "*.ttb");
        assert_eq!(file_glob(root, "odd.ttb"), "odd.ttb/*.ttb");
    }

    /// # Invalid Pattern
    ///
    /// Verifies a malformed glob is a configuration error.
    ///
    /// ## Test Scenario
    /// - Pattern with an unclosed character class
    ///
    /// ## Expected Outcome
    /// - ConfigError::InvalidValue for the pattern field
    #[test]
    fn test_discover_files_invalid_pattern() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let result = discover_files(temp_dir.path(), "[*.ttb");
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "pattern"
        ));
    }
}
