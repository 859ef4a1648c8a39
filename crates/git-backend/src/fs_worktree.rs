//! Linked-worktree lifecycle, built directly from the documented on-disk
//! git worktree format (gix has no high-level worktree-lifecycle API):
//!
//! ```text
//! <main-gitdir>/worktrees/<name>/
//!     gitdir      -- absolute path to <worktree-path>/.git
//!     commondir   -- relative path back to <main-gitdir>
//!     HEAD        -- detached OID or "ref: refs/heads/<branch>"
//! <worktree-path>/.git   -- file containing "gitdir: <main-gitdir>/worktrees/<name>"
//! ```
//!
//! Checking out `target`'s tree into the new worktree is the `checkout`
//! crate's job (it composes [`crate::GitBackend`] with a `WorktreeBackend`);
//! this module only establishes the admin-dir bookkeeping and HEAD.

use std::path::Path;

use crate::error::GitError;
use crate::fs_backend::FsGitBackend;
use crate::repo::GitBackend as _;
use crate::types::{GitOid, WorktreeInfo};

pub fn worktree_add(repo: &FsGitBackend, name: &str, target: GitOid, path: &Path) -> Result<(), GitError> {
    let admin_dir = repo.gitdir().join("worktrees").join(name);
    if admin_dir.exists() {
        return Err(GitError::AlreadyExists {
            kind: "worktree".to_owned(),
            name: name.to_owned(),
        });
    }
    std::fs::create_dir_all(&admin_dir).map_err(GitError::Io)?;
    std::fs::create_dir_all(path).map_err(GitError::Io)?;

    let dot_git_file = path.join(".git");
    std::fs::write(&dot_git_file, format!("gitdir: {}\n", admin_dir.display()))
        .map_err(GitError::Io)?;
    std::fs::write(admin_dir.join("gitdir"), format!("{}\n", dot_git_file.display()))
        .map_err(GitError::Io)?;

    // admin_dir is always `<gitdir>/worktrees/<name>`, so the common dir is
    // exactly two levels up.
    std::fs::write(admin_dir.join("commondir"), "../..\n").map_err(GitError::Io)?;

    std::fs::write(admin_dir.join("HEAD"), format!("{target}\n")).map_err(GitError::Io)?;

    Ok(())
}

pub fn worktree_remove(repo: &FsGitBackend, name: &str) -> Result<(), GitError> {
    let admin_dir = repo.gitdir().join("worktrees").join(name);
    let gitdir_file = admin_dir.join("gitdir");
    if let Ok(contents) = std::fs::read_to_string(&gitdir_file) {
        if let Some(dot_git_path) = contents.lines().next() {
            if let Some(worktree_root) = Path::new(dot_git_path).parent() {
                let _ = std::fs::remove_dir_all(worktree_root);
            }
        }
    }
    std::fs::remove_dir_all(&admin_dir).map_err(GitError::Io)
}

pub fn worktree_list(repo: &FsGitBackend) -> Result<Vec<WorktreeInfo>, GitError> {
    let format = repo.object_format()?;
    let mut out = vec![main_worktree_info(repo, format)?];

    let worktrees_dir = repo.gitdir().join("worktrees");
    let Ok(read_dir) = std::fs::read_dir(&worktrees_dir) else {
        return Ok(out);
    };
    for entry in read_dir {
        let entry = entry.map_err(GitError::Io)?;
        if !entry.file_type().map_err(GitError::Io)?.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        let admin_dir = entry.path();
        let gitdir_path = std::fs::read_to_string(admin_dir.join("gitdir")).unwrap_or_default();
        let worktree_path = gitdir_path
            .lines()
            .next()
            .and_then(|p| Path::new(p).parent())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| admin_dir.clone());

        let head_text = std::fs::read_to_string(admin_dir.join("HEAD")).unwrap_or_default();
        let (head_oid, is_detached) = parse_head(format, head_text.trim());

        out.push(WorktreeInfo {
            name,
            path: worktree_path,
            head_oid,
            is_detached,
        });
    }
    out.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(out)
}

fn main_worktree_info(repo: &FsGitBackend, format: crate::types::ObjectFormat) -> Result<WorktreeInfo, GitError> {
    let head_text = std::fs::read_to_string(repo.gitdir().join("HEAD")).unwrap_or_default();
    let (head_oid, is_detached) = parse_head(format, head_text.trim());
    let path = repo
        .repo
        .workdir()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| repo.gitdir().to_path_buf());
    Ok(WorktreeInfo {
        name: "main".to_owned(),
        path,
        head_oid,
        is_detached,
    })
}

fn parse_head(format: crate::types::ObjectFormat, text: &str) -> (Option<GitOid>, bool) {
    if let Some(target) = text.strip_prefix("ref: ") {
        let _ = target;
        (None, false)
    } else if let Ok(oid) = text.parse::<GitOid>() {
        let _ = format;
        (Some(oid), true)
    } else {
        (None, false)
    }
}
