//! Shared helpers for building the two trees the stash algebra needs: a
//! tree walker and a map-to-map differ that produces [`TreeEdit`]s, plus a
//! working-directory blob writer. Grounded on the same walk/hash shape the
//! checkout engine uses, written independently here since `stash` does not
//! depend on the `checkout` crate (§9 dependency ordering).

use std::collections::BTreeMap;

use git_backend::{EntryMode, GitBackend, GitOid, ObjectKind, TreeEdit};
use worktree_backend::WorktreeBackend;

use crate::error::StashError;

pub type PathMap = BTreeMap<String, (GitOid, EntryMode)>;

/// Walk every blob/link/gitlink leaf under `root`, keyed by full path.
pub fn walk_tree(git: &dyn GitBackend, root: GitOid) -> Result<PathMap, StashError> {
    let mut out = BTreeMap::new();
    walk_tree_rec(git, root, "", &mut out)?;
    Ok(out)
}

fn walk_tree_rec(
    git: &dyn GitBackend,
    tree: GitOid,
    prefix: &str,
    out: &mut PathMap,
) -> Result<(), StashError> {
    for entry in git.read_tree(tree)? {
        let path = if prefix.is_empty() {
            entry.name.clone()
        } else {
            format!("{prefix}/{}", entry.name)
        };
        if matches!(entry.mode, EntryMode::Tree) {
            walk_tree_rec(git, entry.oid, &path, out)?;
        } else {
            out.insert(path, (entry.oid, entry.mode));
        }
    }
    Ok(())
}

/// Diff two path maps into the [`TreeEdit`] list that turns `from` into `to`.
pub fn diff_maps(from: &PathMap, to: &PathMap) -> Vec<TreeEdit> {
    let mut edits = Vec::new();
    for (path, (oid, mode)) in to {
        match from.get(path) {
            Some((old_oid, old_mode)) if old_oid == oid && old_mode == mode => {}
            _ => edits.push(TreeEdit::Upsert {
                path: path.clone(),
                mode: *mode,
                oid: *oid,
            }),
        }
    }
    for path in from.keys() {
        if !to.contains_key(path) {
            edits.push(TreeEdit::Remove { path: path.clone() });
        }
    }
    edits
}

/// Hash and persist `bytes` as a blob, returning its OID. Unlike the
/// checkout engine's analysis phase, the stash algebra builds real commits,
/// so its tree construction writes blobs for real.
pub fn write_blob(git: &dyn GitBackend, bytes: &[u8]) -> Result<GitOid, StashError> {
    Ok(git.write_object(ObjectKind::Blob, bytes)?)
}

/// Snapshot the working directory into a path map of freshly written blob
/// OIDs, restricted to files/symlinks actually present on disk.
pub fn walk_working_dir(
    git: &dyn GitBackend,
    worktree: &dyn WorktreeBackend,
) -> Result<PathMap, StashError> {
    let mut out = BTreeMap::new();
    for path in worktree.readdir_deep("")? {
        let Some(meta) = worktree.lstat(&path)? else {
            continue;
        };
        if meta.is_symlink {
            if let Some(target) = worktree.read_link(&path)? {
                let oid = write_blob(git, target.as_bytes())?;
                out.insert(path, (oid, EntryMode::Link));
            }
        } else if meta.is_file {
            if let Some(bytes) = worktree.read(&path)? {
                let oid = write_blob(git, &bytes)?;
                let mode = if meta.executable {
                    EntryMode::BlobExecutable
                } else {
                    EntryMode::Blob
                };
                out.insert(path, (oid, mode));
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oid(n: u8) -> GitOid {
        GitOid::from_sha1([n; 20])
    }

    #[test]
    fn diff_maps_detects_add_modify_remove() {
        let mut from = PathMap::new();
        from.insert("kept".to_owned(), (oid(1), EntryMode::Blob));
        from.insert("changed".to_owned(), (oid(2), EntryMode::Blob));
        from.insert("removed".to_owned(), (oid(3), EntryMode::Blob));

        let mut to = PathMap::new();
        to.insert("kept".to_owned(), (oid(1), EntryMode::Blob));
        to.insert("changed".to_owned(), (oid(4), EntryMode::Blob));
        to.insert("added".to_owned(), (oid(5), EntryMode::Blob));

        let edits = diff_maps(&from, &to);
        assert_eq!(edits.len(), 3);
        let want_changed = oid(4);
        assert!(edits.iter().any(|e| matches!(
            e,
            TreeEdit::Upsert { path, oid, .. } if path == "changed" && *oid == want_changed
        )));
        assert!(edits
            .iter()
            .any(|e| matches!(e, TreeEdit::Upsert { path, .. } if path == "added")));
        assert!(edits
            .iter()
            .any(|e| matches!(e, TreeEdit::Remove { path } if path == "removed")));
    }

    #[test]
    fn diff_maps_empty_when_identical() {
        let mut map = PathMap::new();
        map.insert("a".to_owned(), (oid(1), EntryMode::Blob));
        assert!(diff_maps(&map, &map.clone()).is_empty());
    }
}
