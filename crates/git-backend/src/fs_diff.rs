//! Tree-to-tree diffing via recursive comparison of [`read_tree`] results.
//!
//! Deliberately does not pull in an additional gix diff feature: the object
//! layer already exposes `read_tree`, and a two-tree recursive walk is enough
//! to produce the flat, path-keyed [`DiffEntry`] list the rest of the crate
//! needs. Rename detection is out of scope — renames surface as a delete plus
//! an add, matching [`crate::types::ChangeType`]'s non-rename variants.

use std::collections::BTreeMap;

use crate::error::GitError;
use crate::fs_backend::FsGitBackend;
use crate::fs_objects::read_tree;
use crate::repo::GitBackend as _;
use crate::types::{ChangeType, DiffEntry, EntryMode, GitOid};

pub fn diff_trees(repo: &FsGitBackend, old: Option<GitOid>, new: GitOid) -> Result<Vec<DiffEntry>, GitError> {
    let format = repo.object_format()?;
    let mut old_files = BTreeMap::new();
    if let Some(old_oid) = old {
        walk(repo, &old_oid, "", &mut old_files)?;
    }
    let mut new_files = BTreeMap::new();
    walk(repo, &new, "", &mut new_files)?;

    let mut entries = Vec::new();
    for (path, (new_mode, new_oid)) in &new_files {
        match old_files.get(path) {
            None => entries.push(DiffEntry {
                path: path.clone(),
                change_type: ChangeType::Added,
                old_oid: GitOid::zero(format),
                new_oid: *new_oid,
                old_mode: None,
                new_mode: Some(*new_mode),
            }),
            Some((old_mode, old_oid)) => {
                if old_oid != new_oid || old_mode != new_mode {
                    entries.push(DiffEntry {
                        path: path.clone(),
                        change_type: ChangeType::Modified,
                        old_oid: *old_oid,
                        new_oid: *new_oid,
                        old_mode: Some(*old_mode),
                        new_mode: Some(*new_mode),
                    });
                }
            }
        }
    }
    for (path, (old_mode, old_oid)) in &old_files {
        if !new_files.contains_key(path) {
            entries.push(DiffEntry {
                path: path.clone(),
                change_type: ChangeType::Deleted,
                old_oid: *old_oid,
                new_oid: GitOid::zero(format),
                old_mode: Some(*old_mode),
                new_mode: None,
            });
        }
    }

    entries.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(entries)
}

fn walk(
    repo: &FsGitBackend,
    tree_oid: &GitOid,
    prefix: &str,
    out: &mut BTreeMap<String, (EntryMode, GitOid)>,
) -> Result<(), GitError> {
    for entry in read_tree(repo, *tree_oid)? {
        let path = if prefix.is_empty() {
            entry.name.clone()
        } else {
            format!("{prefix}/{}", entry.name)
        };
        if matches!(entry.mode, EntryMode::Tree) {
            walk(repo, &entry.oid, &path, out)?;
        } else {
            out.insert(path, (entry.mode, entry.oid));
        }
    }
    Ok(())
}
