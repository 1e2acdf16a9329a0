//! Path containment and write quota enforcement
//!
//! Two checks stand between a request and the filesystem:
//!
//! * [`resolve_within`] maps a client-supplied filename onto a path that is
//!   guaranteed to lie inside a served directory, symbolic links included.
//! * [`QuotaGuard`] keeps the write directory within its storage budget.
//!   Size is recomputed from disk each time; the check and the commit that
//!   follows it run under one lock, so concurrent writers cannot jointly
//!   overshoot the budget.
// (c) 2026 tftpd contributors

use std::{
    io::{self, Write as _},
    path::{Component, Path, PathBuf},
    sync::Arc,
};

use tempfile::NamedTempFile;
use tokio::sync::Mutex;

use crate::util::dir_size;

/// Reasons the guard refused an operation
#[allow(clippy::module_name_repetitions)]
#[derive(Debug, thiserror::Error)]
pub enum GuardError {
    /// The requested name resolves to somewhere outside the root
    #[error("path {0:?} escapes the served directory")]
    Escapes(String),
    /// Storing the candidate would exceed the budget
    #[error("quota exceeded: {size} bytes requested, {used} of {limit} in use")]
    QuotaExceeded {
        /// Bytes we were asked to store
        size: u64,
        /// Bytes already present under the root
        used: u64,
        /// Configured budget
        limit: u64,
    },
    /// The target appeared before we could create it
    #[error("target already exists")]
    AlreadyExists,
    /// Underlying filesystem error
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Resolves `filename` against `root`, refusing anything that would land outside it.
///
/// `root` must already be canonical. The name is first normalised lexically
/// (a leading `/` is taken as relative to the root, `..` may not climb above it),
/// then the deepest part of the result that exists on disk is canonicalised
/// so that symbolic links pointing out of the root are caught too.
///
/// The returned path need not exist.
pub fn resolve_within(root: &Path, filename: &str) -> Result<PathBuf, GuardError> {
    let escapes = || GuardError::Escapes(filename.to_string());

    let mut relative = PathBuf::new();
    for component in Path::new(filename).components() {
        match component {
            Component::RootDir | Component::CurDir => (),
            Component::Prefix(_) => return Err(escapes()),
            Component::ParentDir => {
                if !relative.pop() {
                    return Err(escapes());
                }
            }
            Component::Normal(part) => relative.push(part),
        }
    }

    let candidate = root.join(relative);
    let mut existing = candidate.as_path();
    loop {
        match existing.canonicalize() {
            Ok(real) => {
                if !real.starts_with(root) {
                    return Err(escapes());
                }
                break;
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                existing = existing.parent().ok_or_else(escapes)?;
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(candidate)
}

/// Checks that `path` can be created, by creating it and removing it again.
pub async fn probe_create(path: &Path) -> io::Result<()> {
    let file = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await?;
    drop(file);
    tokio::fs::remove_file(path).await
}

/// Storage budget for a write directory.
///
/// Cloning is cheap; all clones share the same commit lock.
#[allow(clippy::module_name_repetitions)]
#[derive(Debug, Clone)]
pub struct QuotaGuard {
    root: PathBuf,
    limit: u64,
    lock: Arc<Mutex<()>>,
}

impl QuotaGuard {
    /// Constructor
    #[must_use]
    pub fn new(root: PathBuf, limit: u64) -> Self {
        Self {
            root,
            limit,
            lock: Arc::new(Mutex::new(())),
        }
    }

    /// The directory this guard accounts for
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The budget in bytes
    #[must_use]
    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Checks whether `candidate` more bytes would fit, given what is on disk now.
    ///
    /// Returns the number of bytes currently in use.
    /// This is advisory only; [`QuotaGuard::commit`] repeats it under the lock.
    pub fn check(&self, candidate: u64) -> Result<u64, GuardError> {
        let used = dir_size(&self.root)?;
        if used.saturating_add(candidate) > self.limit {
            return Err(GuardError::QuotaExceeded {
                size: candidate,
                used,
                limit: self.limit,
            });
        }
        Ok(used)
    }

    /// Stores `data` at `target` if it fits in the budget.
    ///
    /// The data goes to a temporary file beside the target which is then
    /// renamed into place, never replacing an existing file.
    /// Returns the number of bytes written.
    pub async fn commit(&self, target: PathBuf, data: Vec<u8>) -> Result<u64, GuardError> {
        let _held = self.lock.lock().await;
        let guard = self.clone();
        tokio::task::spawn_blocking(move || guard.commit_blocking(&target, &data))
            .await
            .map_err(io::Error::other)?
    }

    fn commit_blocking(&self, target: &Path, data: &[u8]) -> Result<u64, GuardError> {
        let size = u64::try_from(data.len()).map_err(io::Error::other)?;
        let _ = self.check(size)?;
        let parent = target
            .parent()
            .ok_or_else(|| GuardError::Escapes(target.display().to_string()))?;

        let mut file = NamedTempFile::new_in(parent)?;
        file.write_all(data)?;
        file.as_file().sync_all()?;
        let _ = file.persist_noclobber(target).map_err(|e| {
            if e.error.kind() == io::ErrorKind::AlreadyExists {
                GuardError::AlreadyExists
            } else {
                GuardError::Io(e.error)
            }
        })?;
        Ok(size)
    }
}
