//! Per-branch retrieval of the timetable file.

use std::{fs, io, path::Path};

use tracing::debug;

use crate::{
    codec,
    error::TtbMergeError,
    git::{CheckoutGuard, GitContext},
};

/// One side of the merge: a label and the file's encoded text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
    pub label: String,
    pub text: String,
}

/// Reads the timetable file at a given revision of the real repository.
pub struct VersionExtractor<'a> {
    ctx: &'a GitContext,
}

impl<'a> VersionExtractor<'a> {
    pub fn new(ctx: &'a GitContext) -> Self {
        Self { ctx }
    }

    /// Returns the encoded content of `file` at `reference`, or in the current
    /// working tree when `reference` is `None`.
    ///
    /// A switched checkout is restored before returning, including when the
    /// file is missing. A failed restore takes precedence over a read error.
    pub fn get_version(
        &self,
        file: &Path,
        reference: Option<&str>,
        label: &str,
    ) -> Result<Version, TtbMergeError> {
        let Some(reference) = reference else {
            return self.read(file, self.ctx.original_ref(), label);
        };

        let guard = CheckoutGuard::switch(self.ctx, reference)?;
        let version = self.read(file, reference, label);
        guard.restore()?;
        version
    }

    fn read(&self, file: &Path, branch: &str, label: &str) -> Result<Version, TtbMergeError> {
        let path = self.ctx.root().join(file);
        let raw = fs::read(&path).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => TtbMergeError::MissingFile {
                file: file.to_path_buf(),
                branch: branch.to_string(),
            },
            _ => TtbMergeError::Io { path, source },
        })?;

        debug!(file = %file.display(), branch = %branch, bytes = raw.len(), "Read timetable version");
        Ok(Version {
            label: label.to_string(),
            text: codec::encode(&raw),
        })
    }
}
