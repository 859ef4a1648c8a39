//! [`FsGitBackend`]: the default [`GitBackend`](crate::GitBackend) implementation,
//! operating over an on-disk `.git` directory. Storage (loose objects,
//! packfiles, the ODB's object lookup) is delegated to `gix`; ref mutation,
//! config merging, index encoding, and submodule parsing are implemented in
//! this crate's own small modules (`crate::config`, `crate::index`,
//! `crate::objects`, `crate::reflog`) so they stay storage-engine-agnostic.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::error::GitError;
use crate::repo::{ConfigPath, ConfigScope, GitBackend, ReflogEntry};
use crate::types::{
    CommitInfo, DiffEntry, GitOid, ObjectData, ObjectForm, ObjectFormat, ObjectKind, RefEdit,
    RefName, RefTarget, SubmoduleMeta, TreeEdit, TreeEntry, WorktreeInfo,
};

/// The gix-backed filesystem [`GitBackend`](crate::GitBackend).
///
/// Construct via [`FsGitBackend::open`] (discovers the gitdir by walking up
/// from `path`) or [`FsGitBackend::open_at`] (exact path, no discovery).
pub struct FsGitBackend {
    pub(crate) repo: gix::Repository,
    gitdir: PathBuf,
    object_format: OnceLock<ObjectFormat>,
}

impl FsGitBackend {
    /// Open the git repository at or above `path`.
    pub fn open(path: &Path) -> Result<Self, GitError> {
        let repo = gix::open(path).map_err(|e| GitError::NotFound {
            what: format!("git repository at or above {}: {e}", path.display()),
        })?;
        Self::from_repo(repo)
    }

    /// Open a git repository at exactly `path` (no parent discovery).
    pub fn open_at(path: &Path) -> Result<Self, GitError> {
        let repo = gix::open_opts(path, gix::open::Options::isolated()).map_err(|e| {
            GitError::NotFound {
                what: format!("git repository at {}: {e}", path.display()),
            }
        })?;
        Self::from_repo(repo)
    }

    /// Initialize a new repository at `path` and open it.
    pub fn init(path: &Path, bare: bool) -> Result<Self, GitError> {
        let repo = if bare {
            gix::init_bare(path)
        } else {
            gix::init(path)
        }
        .map_err(|e| GitError::Internal {
            reason: format!("failed to initialize repository at {}: {e}", path.display()),
        })?;
        Self::from_repo(repo)
    }

    fn from_repo(repo: gix::Repository) -> Result<Self, GitError> {
        let gitdir = repo.path().to_path_buf();
        Ok(Self {
            repo,
            gitdir,
            object_format: OnceLock::new(),
        })
    }

    fn config_paths(&self) -> (Option<PathBuf>, Option<PathBuf>, PathBuf, Option<PathBuf>) {
        let system = Some(PathBuf::from("/etc/gitconfig")).filter(|p| p.is_file());
        let global = std::env::var_os("HOME")
            .map(|h| PathBuf::from(h).join(".gitconfig"))
            .filter(|p| p.is_file());
        let local = self.gitdir.join("config");
        let worktree_cfg = self.gitdir.join("config.worktree");
        let worktree = worktree_cfg.is_file().then_some(worktree_cfg);
        (system, global, local, worktree)
    }

    pub(crate) fn config_service(&self) -> crate::config::ConfigService {
        let (system, global, local, worktree) = self.config_paths();
        let read = |p: Option<PathBuf>| p.and_then(|p| std::fs::read_to_string(p).ok()).unwrap_or_default();
        crate::config::ConfigService::from_scopes(&read(system), &read(global), &read(local), &read(worktree))
    }
}

impl GitBackend for FsGitBackend {
    fn gitdir(&self) -> &Path {
        &self.gitdir
    }

    fn object_format(&self) -> Result<ObjectFormat, GitError> {
        if let Some(f) = self.object_format.get() {
            return Ok(*f);
        }
        let svc = self.config_service();
        let value = svc.get(&ConfigPath::parse("extensions.objectformat"));
        let format = match value.as_deref() {
            Some("sha256") => ObjectFormat::Sha256,
            _ => ObjectFormat::Sha1,
        };
        let _ = self.object_format.set(format);
        Ok(format)
    }

    // --- refs ---

    fn read_ref(&self, name: &RefName) -> Result<Option<GitOid>, GitError> {
        crate::fs_refs::read_ref(self, name)
    }

    fn read_ref_target(&self, name: &RefName) -> Result<Option<RefTarget>, GitError> {
        crate::fs_refs::read_ref_target(self, name)
    }

    fn write_ref(&self, name: &RefName, oid: GitOid, log_message: &str) -> Result<(), GitError> {
        crate::fs_refs::write_ref(self, name, oid, log_message)
    }

    fn write_symbolic_ref(&self, name: &RefName, target: &RefName) -> Result<(), GitError> {
        crate::fs_refs::write_symbolic_ref(self, name, target)
    }

    fn delete_ref(&self, name: &RefName) -> Result<(), GitError> {
        crate::fs_refs::delete_ref(self, name)
    }

    fn atomic_ref_update(&self, edits: &[RefEdit]) -> Result<(), GitError> {
        crate::fs_refs::atomic_ref_update(self, edits)
    }

    fn list_refs(&self, prefix: &str) -> Result<Vec<(RefName, GitOid)>, GitError> {
        crate::fs_refs::list_refs(self, prefix)
    }

    fn read_reflog(&self, name: &RefName) -> Result<Vec<ReflogEntry>, GitError> {
        let path = self.gitdir.join("logs").join(name.as_str());
        let text = std::fs::read_to_string(&path).unwrap_or_default();
        crate::reflog::parse_reflog(self.object_format()?, &text)
    }

    // --- rev-parse / ancestry ---

    fn rev_parse(&self, spec: &str) -> Result<GitOid, GitError> {
        crate::fs_refs::rev_parse(self, spec)
    }

    fn rev_parse_opt(&self, spec: &str) -> Result<Option<GitOid>, GitError> {
        crate::fs_refs::rev_parse_opt(self, spec)
    }

    fn is_ancestor(&self, ancestor: GitOid, descendant: GitOid) -> Result<bool, GitError> {
        crate::fs_refs::is_ancestor(self, ancestor, descendant)
    }

    fn merge_base(&self, a: GitOid, b: GitOid) -> Result<Option<GitOid>, GitError> {
        crate::fs_refs::merge_base(self, a, b)
    }

    // --- objects ---

    fn read_object(&self, oid: GitOid, form: ObjectForm) -> Result<ObjectData, GitError> {
        crate::fs_objects::read_object(self, oid, form)
    }

    fn write_object(&self, kind: ObjectKind, content: &[u8]) -> Result<GitOid, GitError> {
        crate::fs_objects::write_object(self, kind, content)
    }

    fn read_tree(&self, oid: GitOid) -> Result<Vec<TreeEntry>, GitError> {
        crate::fs_objects::read_tree(self, oid)
    }

    fn write_tree(&self, entries: &[TreeEntry]) -> Result<GitOid, GitError> {
        crate::fs_objects::write_tree(self, entries)
    }

    fn read_commit(&self, oid: GitOid) -> Result<CommitInfo, GitError> {
        crate::fs_objects::read_commit(self, oid)
    }

    fn create_commit(
        &self,
        tree: GitOid,
        parents: &[GitOid],
        message: &str,
        update_ref: Option<&RefName>,
    ) -> Result<GitOid, GitError> {
        crate::fs_objects::create_commit(self, tree, parents, message, update_ref)
    }

    fn edit_tree(&self, base: GitOid, edits: &[TreeEdit]) -> Result<GitOid, GitError> {
        crate::fs_objects::edit_tree(self, base, edits)
    }

    fn diff_trees(&self, old: Option<GitOid>, new: GitOid) -> Result<Vec<DiffEntry>, GitError> {
        crate::fs_diff::diff_trees(self, old, new)
    }

    // --- index ---

    fn read_index(&self) -> Result<Vec<u8>, GitError> {
        let path = self.gitdir.join("index");
        match std::fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Ok(crate::index::serialize_index(self.object_format()?, &[]))
            }
            Err(e) => Err(GitError::Io(e)),
        }
    }

    fn write_index(&self, bytes: &[u8]) -> Result<(), GitError> {
        let path = self.gitdir.join("index");
        std::fs::write(path, bytes).map_err(GitError::Io)
    }

    // --- config ---

    fn get_config(&self, path: &str) -> Result<Option<String>, GitError> {
        Ok(self.config_service().get(&ConfigPath::parse(path)))
    }

    fn get_all_config(&self, path: &str) -> Result<Vec<String>, GitError> {
        Ok(self.config_service().get_all(&ConfigPath::parse(path)))
    }

    fn set_config(
        &self,
        path: &str,
        value: &str,
        scope: ConfigScope,
        append: bool,
    ) -> Result<(), GitError> {
        crate::fs_config::set_config(self, path, value, scope, append)
    }

    fn get_config_subsections(&self, section: &str) -> Result<Vec<String>, GitError> {
        Ok(self.config_service().subsections(section))
    }

    fn get_config_sections(&self) -> Result<Vec<String>, GitError> {
        Ok(self.config_service().sections())
    }

    fn reload_config(&self) -> Result<(), GitError> {
        // This backend reads every config scope fresh from disk on each
        // call, so there is no cache to invalidate beyond the memoized
        // object-format probe.
        tracing::debug!("reload_config: no-op, config is read fresh on every call");
        Ok(())
    }

    // --- submodules ---

    fn list_submodules(&self, tree: GitOid) -> Result<Vec<SubmoduleMeta>, GitError> {
        crate::fs_submodule::list_submodules(self, tree)
    }

    // --- linked worktrees ---

    fn worktree_add(&self, name: &str, target: GitOid, path: &Path) -> Result<(), GitError> {
        crate::fs_worktree::worktree_add(self, name, target, path)
    }

    fn worktree_remove(&self, name: &str) -> Result<(), GitError> {
        crate::fs_worktree::worktree_remove(self, name)
    }

    fn worktree_list(&self) -> Result<Vec<WorktreeInfo>, GitError> {
        crate::fs_worktree::worktree_list(self)
    }
}
