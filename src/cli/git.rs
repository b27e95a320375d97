//! HEAD commit discovery
//!
//! Also compiled into the build script, so it depends on git2 and std only.

use std::path::{Path, PathBuf};

/// The commit HEAD points at and the files whose change moves it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadCommit {
    /// Full 40-character hash.
    pub hash: String,
    pub watched: Vec<PathBuf>,
}

/// HEAD of the repository containing `start`. `None` outside a repository or
/// on an unborn branch.
pub fn head_commit(start: &Path) -> Option<HeadCommit> {
    let repo = git2::Repository::discover(start).ok()?;
    let head = repo.head().ok()?;
    let hash = head.target()?.to_string();

    let git_dir = repo.path();
    let mut watched = vec![git_dir.join("HEAD")];
    if let Some(name) = head.name() {
        watched.push(git_dir.join(name));
    }
    watched.push(git_dir.join("packed-refs"));
    watched.retain(|path| path.exists());

    Some(HeadCommit { hash, watched })
}

pub fn git_commit_hash(start: &Path) -> Option<String> {
    head_commit(start).map(|head| head.hash)
}
