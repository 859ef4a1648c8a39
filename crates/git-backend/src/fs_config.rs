//! Persisting a single config write back to the scope's on-disk file.
//!
//! Reads are handled directly in `fs_backend.rs` via `config_service()`
//! (fresh-from-disk, no cache); this module covers the one mutating path.

use std::path::PathBuf;

use crate::error::GitError;
use crate::fs_backend::FsGitBackend;
use crate::repo::{ConfigScope, GitBackend as _};

pub fn set_config(
    repo: &FsGitBackend,
    path: &str,
    value: &str,
    scope: ConfigScope,
    append: bool,
) -> Result<(), GitError> {
    let target = scope_path(repo, scope)?;
    let mut svc = repo.config_service();
    svc.set(&crate::repo::ConfigPath::parse(path), value, scope, append);
    let text = svc.serialize_scope(scope);
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent).map_err(GitError::Io)?;
    }
    std::fs::write(&target, text).map_err(GitError::Io)
}

fn scope_path(repo: &FsGitBackend, scope: ConfigScope) -> Result<PathBuf, GitError> {
    match scope {
        ConfigScope::System => Ok(PathBuf::from("/etc/gitconfig")),
        ConfigScope::Global => std::env::var_os("HOME")
            .map(|h| PathBuf::from(h).join(".gitconfig"))
            .ok_or_else(|| GitError::MissingParameter {
                name: "HOME".to_owned(),
            }),
        ConfigScope::Local => Ok(repo.gitdir().join("config")),
        ConfigScope::Worktree => Ok(repo.gitdir().join("config.worktree")),
    }
}
