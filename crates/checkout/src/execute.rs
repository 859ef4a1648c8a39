//! `execute_checkout`: applies an [`Operation`] list to the working
//! directory and rebuilds the index (§4.3.4).
//!
//! The index is cleared in memory before any operation runs; every
//! surviving entry is re-added from the operations themselves, so the index
//! after execution is solely a function of the emitted operations — never
//! of whatever state it held before.

use git_backend::{EntryMode, GitBackend, IndexEntry};
use worktree_backend::{FileMode, WorktreeBackend};

use crate::error::CheckoutError;
use crate::operation::Operation;

/// Apply `ops` (as produced by [`crate::analyze_checkout`]) to `worktree`
/// and return the rebuilt index entries. Callers persist the result via
/// [`GitBackend::write_index`] (through `git_backend::index::serialize_index`).
///
/// # Errors
/// Individual symlink-creation and directory-removal failures are handled
/// per §4.3.5 (fallback or best-effort); other I/O failures propagate.
pub fn execute_checkout(
    git: &dyn GitBackend,
    worktree: &dyn WorktreeBackend,
    ops: &[Operation],
) -> Result<Vec<IndexEntry>, CheckoutError> {
    let conflicts: Vec<String> = ops
        .iter()
        .filter_map(|op| match op {
            Operation::Conflict { path } => Some(path.clone()),
            _ => None,
        })
        .collect();
    if !conflicts.is_empty() {
        return Err(CheckoutError::Conflict { paths: conflicts });
    }

    let mut entries = Vec::new();

    for op in ops {
        match op {
            Operation::Update { path, oid, mode } => {
                apply_update(git, worktree, path, *oid, *mode)?;
                entries.push(IndexEntry::new(path.clone(), *mode, *oid));
            }
            Operation::Keep { path, oid, mode, stat } => {
                let mut entry = IndexEntry::new(path.clone(), *mode, *oid);
                entry.size = stat.size;
                entry.mtime = stat.mtime;
                entries.push(entry);
            }
            Operation::Delete { path } => {
                if let Err(e) = worktree.rm(path) {
                    tracing::warn!(path, error = %e, "checkout: best-effort delete failed");
                }
            }
            Operation::DeleteIndex { .. } => {
                // No-op: the index was cleared; simply don't reinsert.
            }
            Operation::Mkdir { path } => {
                worktree.mkdir(path)?;
            }
            Operation::Conflict { .. } => unreachable!("conflicts are checked above"),
        }
    }

    Ok(entries)
}

fn apply_update(
    git: &dyn GitBackend,
    worktree: &dyn WorktreeBackend,
    path: &str,
    oid: git_backend::GitOid,
    mode: EntryMode,
) -> Result<(), CheckoutError> {
    if let Some(parent) = parent_dir(path) {
        worktree.mkdir(parent)?;
    }

    match mode {
        EntryMode::Commit => {
            // Gitlink: only the submodule directory is materialized here;
            // submodule init/clone policy is an external collaborator.
            worktree.mkdir(path)?;
        }
        EntryMode::Link => {
            let content = git.read_object(oid, git_backend::ObjectForm::ContentOnly)?;
            let target = String::from_utf8_lossy(&content.bytes).into_owned();
            if let Err(e) = worktree.write_link(path, &target) {
                tracing::warn!(path, error = %e, "checkout: symlink unsupported, falling back to regular file");
                worktree.write(path, target.as_bytes(), FileMode::Regular)?;
            }
        }
        EntryMode::Blob | EntryMode::BlobExecutable => {
            let content = git.read_object(oid, git_backend::ObjectForm::ContentOnly)?;
            let bytes = smudge_lfs(&content.bytes);
            let file_mode = if matches!(mode, EntryMode::BlobExecutable) {
                FileMode::Executable
            } else {
                FileMode::Regular
            };
            worktree.write(path, &bytes, file_mode)?;
        }
        EntryMode::Tree => {
            return Err(CheckoutError::Git(git_backend::GitError::Internal {
                reason: format!("tree mode entry at leaf path `{path}`"),
            }));
        }
    }
    Ok(())
}

/// LFS smudging is an external collaborator (§1 "Out of scope"); this
/// engine only defines the fallback contract — on any smudge failure, the
/// raw blob passes through unchanged (§4.3.5). With no LFS filter wired in,
/// every blob takes this path.
fn smudge_lfs(raw: &[u8]) -> Vec<u8> {
    raw.to_vec()
}

fn parent_dir(path: &str) -> Option<&str> {
    path.rfind('/').map(|i| &path[..i])
}

#[cfg(test)]
mod tests {
    use git_backend::{GitOid, ObjectFormat};
    use worktree_backend::InMemoryWorktreeBackend;

    use super::*;

    fn oid(n: u8) -> GitOid {
        GitOid::from_sha1([n; 20])
    }

    #[test]
    fn conflicts_prevent_any_mutation() {
        let worktree = InMemoryWorktreeBackend::default();
        worktree.write("file", b"existing", FileMode::Regular).unwrap();
        let ops = vec![Operation::Conflict {
            path: "file".to_owned(),
        }];
        let err = execute_checkout(&NoopGit, &worktree, &ops).unwrap_err();
        assert!(matches!(err, CheckoutError::Conflict { .. }));
        assert_eq!(worktree.read("file").unwrap(), Some(b"existing".to_vec()));
    }

    #[test]
    fn delete_index_drops_without_filesystem_effect() {
        let worktree = InMemoryWorktreeBackend::default();
        let ops = vec![Operation::DeleteIndex {
            path: "gone".to_owned(),
        }];
        let entries = execute_checkout(&NoopGit, &worktree, &ops).unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn keep_reinserts_recorded_stat() {
        let worktree = InMemoryWorktreeBackend::default();
        let stat = crate::operation::CachedStat {
            size: 42,
            mtime: (100, 0),
        };
        let ops = vec![Operation::Keep {
            path: "a.txt".to_owned(),
            oid: oid(1),
            mode: EntryMode::Blob,
            stat,
        }];
        let entries = execute_checkout(&NoopGit, &worktree, &ops).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].size, 42);
    }

    /// A [`GitBackend`] stub for tests that never reach object reads.
    struct NoopGit;
    impl GitBackend for NoopGit {
        fn gitdir(&self) -> &std::path::Path {
            std::path::Path::new("/dev/null")
        }
        fn object_format(&self) -> Result<ObjectFormat, git_backend::GitError> {
            Ok(ObjectFormat::Sha1)
        }
        fn read_ref(&self, _: &git_backend::RefName) -> Result<Option<GitOid>, git_backend::GitError> {
            Ok(None)
        }
        fn read_ref_target(
            &self,
            _: &git_backend::RefName,
        ) -> Result<Option<git_backend::RefTarget>, git_backend::GitError> {
            Ok(None)
        }
        fn write_ref(&self, _: &git_backend::RefName, _: GitOid, _: &str) -> Result<(), git_backend::GitError> {
            Ok(())
        }
        fn write_symbolic_ref(
            &self,
            _: &git_backend::RefName,
            _: &git_backend::RefName,
        ) -> Result<(), git_backend::GitError> {
            Ok(())
        }
        fn delete_ref(&self, _: &git_backend::RefName) -> Result<(), git_backend::GitError> {
            Ok(())
        }
        fn atomic_ref_update(&self, _: &[git_backend::RefEdit]) -> Result<(), git_backend::GitError> {
            Ok(())
        }
        fn list_refs(&self, _: &str) -> Result<Vec<(git_backend::RefName, GitOid)>, git_backend::GitError> {
            Ok(Vec::new())
        }
        fn read_reflog(
            &self,
            _: &git_backend::RefName,
        ) -> Result<Vec<git_backend::ReflogEntry>, git_backend::GitError> {
            Ok(Vec::new())
        }
        fn rev_parse(&self, _: &str) -> Result<GitOid, git_backend::GitError> {
            Err(git_backend::GitError::NotFound {
                what: "rev".to_owned(),
            })
        }
        fn rev_parse_opt(&self, _: &str) -> Result<Option<GitOid>, git_backend::GitError> {
            Ok(None)
        }
        fn read_object(
            &self,
            _: GitOid,
            _: git_backend::ObjectForm,
        ) -> Result<git_backend::ObjectData, git_backend::GitError> {
            Ok(git_backend::ObjectData {
                kind: git_backend::ObjectKind::Blob,
                bytes: Vec::new(),
            })
        }
        fn write_object(&self, _: git_backend::ObjectKind, _: &[u8]) -> Result<GitOid, git_backend::GitError> {
            Ok(oid(0))
        }
        fn read_tree(&self, _: GitOid) -> Result<Vec<git_backend::TreeEntry>, git_backend::GitError> {
            Ok(Vec::new())
        }
        fn write_tree(&self, _: &[git_backend::TreeEntry]) -> Result<GitOid, git_backend::GitError> {
            Ok(oid(0))
        }
        fn read_commit(&self, _: GitOid) -> Result<git_backend::CommitInfo, git_backend::GitError> {
            Err(git_backend::GitError::NotFound {
                what: "commit".to_owned(),
            })
        }
        fn create_commit(
            &self,
            _: GitOid,
            _: &[GitOid],
            _: &str,
            _: Option<&git_backend::RefName>,
        ) -> Result<GitOid, git_backend::GitError> {
            Ok(oid(0))
        }
        fn edit_tree(&self, base: GitOid, _: &[git_backend::TreeEdit]) -> Result<GitOid, git_backend::GitError> {
            Ok(base)
        }
        fn diff_trees(
            &self,
            _: Option<GitOid>,
            _: GitOid,
        ) -> Result<Vec<git_backend::DiffEntry>, git_backend::GitError> {
            Ok(Vec::new())
        }
        fn is_ancestor(&self, _: GitOid, _: GitOid) -> Result<bool, git_backend::GitError> {
            Ok(false)
        }
        fn merge_base(&self, _: GitOid, _: GitOid) -> Result<Option<GitOid>, git_backend::GitError> {
            Ok(None)
        }
        fn read_index(&self) -> Result<Vec<u8>, git_backend::GitError> {
            Ok(Vec::new())
        }
        fn write_index(&self, _: &[u8]) -> Result<(), git_backend::GitError> {
            Ok(())
        }
        fn get_config(&self, _: &str) -> Result<Option<String>, git_backend::GitError> {
            Ok(None)
        }
        fn get_all_config(&self, _: &str) -> Result<Vec<String>, git_backend::GitError> {
            Ok(Vec::new())
        }
        fn set_config(
            &self,
            _: &str,
            _: &str,
            _: git_backend::ConfigScope,
            _: bool,
        ) -> Result<(), git_backend::GitError> {
            Ok(())
        }
        fn get_config_subsections(&self, _: &str) -> Result<Vec<String>, git_backend::GitError> {
            Ok(Vec::new())
        }
        fn get_config_sections(&self) -> Result<Vec<String>, git_backend::GitError> {
            Ok(Vec::new())
        }
        fn reload_config(&self) -> Result<(), git_backend::GitError> {
            Ok(())
        }
        fn list_submodules(&self, _: GitOid) -> Result<Vec<git_backend::SubmoduleMeta>, git_backend::GitError> {
            Ok(Vec::new())
        }
        fn worktree_add(&self, _: &str, _: GitOid, _: &std::path::Path) -> Result<(), git_backend::GitError> {
            Ok(())
        }
        fn worktree_remove(&self, _: &str) -> Result<(), git_backend::GitError> {
            Ok(())
        }
        fn worktree_list(&self) -> Result<Vec<git_backend::WorktreeInfo>, git_backend::GitError> {
            Ok(Vec::new())
        }
    }
}
