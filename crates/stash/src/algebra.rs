//! The stash algebra (§4.6): push (stash), apply, pop, and drop, built over
//! `GitBackend`/`WorktreeBackend` with the index and working directory
//! reconciled entirely through commits and `TreeEdit`s — never by shelling
//! out to a real `git stash`.

use std::path::PathBuf;

use git_backend::{EntryMode, GitBackend, GitOid, RefName};
use worktree_backend::{FileMode, WorktreeBackend};

use crate::error::StashError;
use crate::tree_diff::{diff_maps, walk_tree, walk_working_dir, PathMap};

const STASH_REF: &str = "refs/stash";

fn stash_ref() -> RefName {
    RefName::new(STASH_REF).expect("refs/stash is a valid ref name")
}

fn reflog_path(git: &dyn GitBackend) -> PathBuf {
    git.gitdir().join("logs").join("refs").join("stash")
}

fn ref_path(git: &dyn GitBackend) -> PathBuf {
    git.gitdir().join("refs").join("stash")
}

fn check_identity(git: &dyn GitBackend) -> Result<(), StashError> {
    let name = git.get_config("user.name")?;
    let email = git.get_config("user.email")?;
    if name.is_none() || email.is_none() {
        return Err(StashError::MissingName);
    }
    Ok(())
}

fn check_no_unmerged(git: &dyn GitBackend) -> Result<(), StashError> {
    let bytes = git.read_index()?;
    let format = git.object_format()?;
    let entries = git_backend::index::parse_index(format, &bytes)?;
    let unmerged: Vec<String> = entries
        .iter()
        .filter(|e| e.stage != 0)
        .map(|e| e.path.clone())
        .collect();
    if !unmerged.is_empty() {
        return Err(StashError::UnmergedPaths { paths: unmerged });
    }
    Ok(())
}

/// Resolve `HEAD` to a commit OID. A fresh repository with no commits has
/// no `HEAD` to resolve at all — this surfaces as `NotFound("HEAD")` rather
/// than `NothingToStash`, since the latter presumes a base commit exists to
/// diff against (§8 boundary: fresh repo, no staged changes).
fn head_commit(git: &dyn GitBackend) -> Result<GitOid, StashError> {
    git.rev_parse_opt("HEAD")?.ok_or_else(|| {
        StashError::Git(git_backend::GitError::NotFound {
            what: "HEAD".to_owned(),
        })
    })
}

fn branch_name(git: &dyn GitBackend) -> Result<String, StashError> {
    let head_ref = RefName::new("HEAD").expect("HEAD is a well-known ref");
    match git.read_ref_target(&head_ref)? {
        Some(git_backend::RefTarget::Symbolic(target)) => Ok(target
            .as_str()
            .strip_prefix("refs/heads/")
            .unwrap_or(target.as_str())
            .to_owned()),
        _ => {
            let oid = head_commit(git)?;
            Ok(format!("(detached {:.7}...)", oid.to_string()))
        }
    }
}

fn index_entries(git: &dyn GitBackend) -> Result<Vec<git_backend::IndexEntry>, StashError> {
    let bytes = git.read_index()?;
    let format = git.object_format()?;
    Ok(git_backend::index::parse_index(format, &bytes)?)
}

fn index_path_map(entries: &[git_backend::IndexEntry]) -> PathMap {
    entries
        .iter()
        .filter(|e| e.stage == 0)
        .map(|e| (e.path.clone(), (e.oid, e.mode)))
        .collect()
}

/// Compute the tree resulting from applying the staged (HEAD-vs-index)
/// changes, or `None` if the index matches HEAD exactly.
fn compute_index_tree(
    git: &dyn GitBackend,
    head_tree: GitOid,
    entries: &[git_backend::IndexEntry],
) -> Result<Option<GitOid>, StashError> {
    let head_map = walk_tree(git, head_tree)?;
    let idx_map = index_path_map(entries);
    let edits = diff_maps(&head_map, &idx_map);
    if edits.is_empty() {
        Ok(None)
    } else {
        Ok(Some(git.edit_tree(head_tree, &edits)?))
    }
}

/// Compute the tree resulting from applying the working-directory-vs-base
/// changes, or `None` if the working directory matches `base` exactly.
fn compute_worktree_tree(
    git: &dyn GitBackend,
    worktree: &dyn WorktreeBackend,
    base_tree: GitOid,
) -> Result<Option<GitOid>, StashError> {
    let base_map = walk_tree(git, base_tree)?;
    let wd_map = walk_working_dir(git, worktree)?;
    let edits = diff_maps(&base_map, &wd_map);
    if edits.is_empty() {
        Ok(None)
    } else {
        Ok(Some(git.edit_tree(base_tree, &edits)?))
    }
}

/// Stash the current worktree (and, if distinct, index) state on top of
/// HEAD, reset the worktree and index to HEAD, and return the new stash
/// commit's OID.
///
/// # Errors
/// [`StashError::MissingName`] if no committer identity is configured,
/// [`StashError::UnmergedPaths`] if the index has conflicts,
/// [`StashError::NothingToStash`] if there is nothing to save.
pub fn stash_push(
    git: &dyn GitBackend,
    worktree: &dyn WorktreeBackend,
    message: Option<&str>,
) -> Result<GitOid, StashError> {
    check_identity(git)?;
    check_no_unmerged(git)?;

    let head = head_commit(git)?;
    let head_info = git.read_commit(head)?;
    let entries = index_entries(git)?;

    let index_tree = compute_index_tree(git, head_info.tree_oid, &entries)?;
    let worktree_base = index_tree.unwrap_or(head_info.tree_oid);
    let worktree_tree = compute_worktree_tree(git, worktree, worktree_base)?;

    if index_tree.is_none() && worktree_tree.is_none() {
        return Err(StashError::NothingToStash);
    }

    let branch = branch_name(git)?;

    let index_commit = if let Some(tree) = index_tree {
        Some(git.create_commit(tree, &[head], &format!("index on {branch}"), None)?)
    } else {
        None
    };

    let mut parents = vec![head];
    if let Some(idx) = index_commit {
        parents.push(idx);
    }
    let final_tree = worktree_tree.or(index_tree).unwrap_or(head_info.tree_oid);

    let head_short: String = head.to_string().chars().take(7).collect();
    let head_summary = head_info.message.lines().next().unwrap_or_default();
    let summary = message.map_or_else(
        || format!("WIP on {branch}: {head_short} {head_summary}"),
        |m| format!("{m}: {head_short} {head_summary}"),
    );

    let stash_oid = git.create_commit(final_tree, &parents, &summary, None)?;
    git.write_ref(&stash_ref(), stash_oid, &summary)?;

    reset_to_head(git, worktree, head_info.tree_oid, &entries)?;

    Ok(stash_oid)
}

/// Reset the index and working directory back to `head_tree` after a
/// successful stash.
fn reset_to_head(
    git: &dyn GitBackend,
    worktree: &dyn WorktreeBackend,
    head_tree: GitOid,
    prior_entries: &[git_backend::IndexEntry],
) -> Result<(), StashError> {
    let head_map = walk_tree(git, head_tree)?;
    let prior_map = index_path_map(prior_entries);

    for path in prior_map.keys() {
        if !head_map.contains_key(path) {
            worktree.rm(path)?;
        }
    }
    let mut new_entries = Vec::with_capacity(head_map.len());
    for (path, (oid, mode)) in &head_map {
        materialize(git, worktree, path, *oid, *mode)?;
        new_entries.push(git_backend::IndexEntry::new(path.clone(), *mode, *oid));
    }
    let wd_files = worktree.readdir_deep("")?;
    for path in wd_files {
        if !head_map.contains_key(&path) {
            worktree.rm(&path)?;
        }
    }

    let format = git.object_format()?;
    let bytes = git_backend::index::serialize_index(format, &new_entries);
    git.write_index(&bytes)?;
    Ok(())
}

fn materialize(
    git: &dyn GitBackend,
    worktree: &dyn WorktreeBackend,
    path: &str,
    oid: GitOid,
    mode: EntryMode,
) -> Result<(), StashError> {
    if let Some(parent) = path.rfind('/').map(|i| &path[..i]) {
        worktree.mkdir(parent)?;
    }
    let content = git.read_object(oid, git_backend::ObjectForm::ContentOnly)?;
    match mode {
        EntryMode::Link => {
            let target = String::from_utf8_lossy(&content.bytes).into_owned();
            if worktree.write_link(path, &target).is_err() {
                worktree.write(path, target.as_bytes(), FileMode::Regular)?;
            }
        }
        EntryMode::BlobExecutable => {
            worktree.write(path, &content.bytes, FileMode::Executable)?;
        }
        EntryMode::Commit => {
            worktree.mkdir(path)?;
        }
        _ => {
            worktree.write(path, &content.bytes, FileMode::Regular)?;
        }
    }
    Ok(())
}

/// Apply a stash commit's changes to the index and working directory
/// without removing it from the stash list.
///
/// # Errors
/// [`StashError::UnmergedPaths`] if the index currently has conflicts.
pub fn stash_apply(
    git: &dyn GitBackend,
    worktree: &dyn WorktreeBackend,
    stash_oid: GitOid,
) -> Result<(), StashError> {
    check_no_unmerged(git)?;

    let stash_info = git.read_commit(stash_oid)?;
    let head_parent = *stash_info
        .parents
        .first()
        .ok_or_else(|| StashError::Git(git_backend::GitError::Internal {
            reason: "stash commit has no parent".to_owned(),
        }))?;
    let head_info = git.read_commit(head_parent)?;
    let index_commit = stash_info.parents.get(1).copied();

    let mut entries = index_entries(git)?;

    if let Some(index_oid) = index_commit {
        let index_info = git.read_commit(index_oid)?;
        let diff = git.diff_trees(Some(head_info.tree_oid), index_info.tree_oid)?;
        apply_diff_to_index(git, &mut entries, &diff)?;
        let format = git.object_format()?;
        let bytes = git_backend::index::serialize_index(format, &entries);
        git.write_index(&bytes)?;
    }

    let workdir_base = match index_commit {
        Some(oid) => git.read_commit(oid)?.tree_oid,
        None => head_info.tree_oid,
    };
    let diff = git.diff_trees(Some(workdir_base), stash_info.tree_oid)?;
    apply_diff_to_workdir(git, worktree, &diff)?;

    Ok(())
}

fn apply_diff_to_index(
    git: &dyn GitBackend,
    entries: &mut Vec<git_backend::IndexEntry>,
    diff: &[git_backend::DiffEntry],
) -> Result<(), StashError> {
    let _ = git;
    for change in diff {
        entries.retain(|e| e.path != change.path);
        if !matches!(change.change_type, git_backend::ChangeType::Deleted) {
            if let Some(mode) = change.new_mode {
                entries.push(git_backend::IndexEntry::new(
                    change.path.clone(),
                    mode,
                    change.new_oid,
                ));
            }
        }
    }
    Ok(())
}

fn apply_diff_to_workdir(
    git: &dyn GitBackend,
    worktree: &dyn WorktreeBackend,
    diff: &[git_backend::DiffEntry],
) -> Result<(), StashError> {
    for change in diff {
        if matches!(change.change_type, git_backend::ChangeType::Deleted) {
            worktree.rm(&change.path)?;
        } else if let Some(mode) = change.new_mode {
            materialize(git, worktree, &change.path, change.new_oid, mode)?;
        }
    }
    Ok(())
}

/// Apply the stash, then drop it (§4.6 `Pop = Apply followed by Drop`).
///
/// # Errors
/// Same as [`stash_apply`] and [`stash_drop`].
pub fn stash_pop(
    git: &dyn GitBackend,
    worktree: &dyn WorktreeBackend,
    index: usize,
) -> Result<(), StashError> {
    let entries = list(git)?;
    let stash_oid = *entries
        .get(index)
        .map(|e| &e.new_oid)
        .ok_or(StashError::NotFound { index })?;
    stash_apply(git, worktree, stash_oid)?;
    stash_drop(git, index)
}

/// List stash entries, newest (`stash@{0}`) first.
///
/// # Errors
/// Propagates [`git_backend::GitError`] from the underlying reflog read.
pub fn list(git: &dyn GitBackend) -> Result<Vec<git_backend::ReflogEntry>, StashError> {
    Ok(git.read_reflog(&stash_ref())?)
}

/// Remove `stash@{index}`, rewriting the reflog and repointing `refs/stash`
/// at the new top entry (or deleting it if the stash is now empty).
///
/// # Errors
/// [`StashError::NotFound`] if `index` is out of range.
pub fn stash_drop(git: &dyn GitBackend, index: usize) -> Result<(), StashError> {
    let mut entries = list(git)?;
    if index >= entries.len() {
        return Err(StashError::NotFound { index });
    }
    entries.remove(index);

    if entries.is_empty() {
        let _ = std::fs::remove_file(ref_path(git));
        let _ = std::fs::remove_file(reflog_path(git));
        return Ok(());
    }

    let text = git_backend::reflog::serialize_reflog(&entries);
    std::fs::write(reflog_path(git), text)?;
    std::fs::write(ref_path(git), format!("{}\n", entries[0].new_oid))?;
    Ok(())
}
