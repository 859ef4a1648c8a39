//! [`Repository`]: the façade tying a [`GitBackend`] and an optional
//! [`WorktreeBackend`] together behind the public, backend-agnostic API.
//!
//! `git` uses `Rc` — the trait carries no `Send`/`Sync` bound, matching §5's
//! single-threaded-cooperative scheduling model; a caller sharing a
//! `Repository` across threads must synchronize externally, same as the
//! original. `worktree` uses `Arc` because `WorktreeBackend` itself requires
//! `Send + Sync` (submodule delegation hands the same `Arc` to nested
//! backends, §9 "Cyclic references").

use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;
use std::sync::Arc;

use git_backend::{
    ConfigScope, EntryMode, FsGitBackend, GitBackend, GitOid, IndexEntry, ObjectFormat, RefName,
    RefTarget, TreeEdit,
};
use worktree_backend::{FsWorktreeBackend, WorktreeBackend};

use crate::config::RepoConfig;
use crate::error::GitPortError;
use crate::remote::{NullRemote, RemoteBackend};

/// Where a checkout's target state comes from: a revision spec resolved
/// through this repository's own `GitBackend`, or another worktree backend
/// entirely.
pub enum CheckoutTarget<'a> {
    /// Resolve `spec` (branch, tag, OID, `HEAD~n`, ...) via `rev_parse`.
    Ref(&'a str),
    /// Check out into a caller-supplied worktree backend instead of this
    /// repository's own.
    Worktree(Arc<dyn WorktreeBackend>),
}

/// Options controlling a single [`Repository::checkout`] call.
#[derive(Default)]
pub struct CheckoutOptions<'a> {
    /// Restrict the operation set to these paths.
    pub filters: Option<&'a [String]>,
    /// Allow overwriting local modifications without a conflict.
    pub force: bool,
}

/// The three `reset` modes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResetMode {
    /// Move the branch ref only; index and worktree untouched.
    Soft,
    /// Move the branch ref and reset the index to match; worktree untouched.
    Mixed,
    /// Move the branch ref, reset the index, and force-checkout the worktree.
    Hard,
}

/// One row of [`Repository::status_matrix`]: HEAD/workdir/stage presence
/// coded as isomorphic-git's `statusMatrix` does (0 = absent, 1 = present
/// and matching, 2 = present and differing from HEAD, 3 = present, staged,
/// and differing from the working tree).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusMatrixEntry {
    /// Repo-root-relative path.
    pub path: String,
    /// 0 if absent from HEAD, 1 if present.
    pub head: u8,
    /// 0 if absent from the working directory, 1 if present and matching
    /// the index entry's recorded OID, 2 if present and differing.
    pub workdir: u8,
    /// 0 if absent from the index, 1 if present and matching HEAD, 2 if
    /// present and differing from HEAD, 3 if present and differing from the
    /// working directory as well.
    pub stage: u8,
}

struct RepoCache {
    is_bare: Option<bool>,
    object_format: Option<ObjectFormat>,
    remotes: HashMap<String, Rc<dyn RemoteBackend>>,
    submodules: HashMap<String, Repository>,
    worker_pool: Option<Rc<workers::WorkerPool>>,
}

impl Default for RepoCache {
    fn default() -> Self {
        Self {
            is_bare: None,
            object_format: None,
            remotes: HashMap::new(),
            submodules: HashMap::new(),
            worker_pool: None,
        }
    }
}

/// A thin orchestration object over a [`GitBackend`] and an optional
/// [`WorktreeBackend`]. Cheap to clone: the backend handles
/// and the cache are reference-counted, so every clone observes the same
/// underlying state.
#[derive(Clone)]
pub struct Repository {
    git: Rc<dyn GitBackend>,
    worktree: Option<Arc<dyn WorktreeBackend>>,
    cache: Rc<std::cell::RefCell<RepoCache>>,
}

impl Repository {
    /// Build a façade directly over a backend pair. The entry point for
    /// hosts supplying their own [`GitBackend`]/[`WorktreeBackend`]
    /// implementations (in-memory, blob store, SQL).
    #[must_use]
    pub fn from_backends(git: Rc<dyn GitBackend>, worktree: Option<Arc<dyn WorktreeBackend>>) -> Self {
        Self {
            git,
            worktree,
            cache: Rc::new(std::cell::RefCell::new(RepoCache::default())),
        }
    }

    /// Open the git repository at or above `path`, with a worktree unless
    /// the repository is bare.
    ///
    /// # Errors
    /// [`GitPortError::Git`] if no repository is found.
    pub fn open(path: &Path) -> Result<Self, GitPortError> {
        let git: Rc<dyn GitBackend> = Rc::new(FsGitBackend::open(path)?);
        Self::with_discovered_worktree(git, path)
    }

    /// Open the git repository at exactly `path` (no parent discovery).
    ///
    /// # Errors
    /// [`GitPortError::Git`] if `path` is not a git repository.
    pub fn open_at(path: &Path) -> Result<Self, GitPortError> {
        let git: Rc<dyn GitBackend> = Rc::new(FsGitBackend::open_at(path)?);
        Self::with_discovered_worktree(git, path)
    }

    /// Initialize a new repository at `path` and open it.
    ///
    /// # Errors
    /// [`GitPortError::Git`] if initialization fails.
    pub fn init(path: &Path, bare: bool) -> Result<Self, GitPortError> {
        let git: Rc<dyn GitBackend> = Rc::new(FsGitBackend::init(path, bare)?);
        let worktree: Option<Arc<dyn WorktreeBackend>> = if bare {
            None
        } else {
            Some(Arc::new(FsWorktreeBackend::new(path.to_path_buf())))
        };
        Ok(Self::from_backends(git, worktree))
    }

    fn with_discovered_worktree(git: Rc<dyn GitBackend>, path: &Path) -> Result<Self, GitPortError> {
        let bare = git
            .get_config("core.bare")?
            .is_some_and(|v| v == "true" || v == "yes" || v == "1");
        let worktree: Option<Arc<dyn WorktreeBackend>> = if bare {
            None
        } else {
            Some(Arc::new(FsWorktreeBackend::new(path.to_path_buf())))
        };
        Ok(Self::from_backends(git, worktree))
    }

    fn require_worktree(&self) -> Result<&Arc<dyn WorktreeBackend>, GitPortError> {
        self.worktree.as_ref().ok_or(GitPortError::BareRepository)
    }

    /// The directory this repository's backend persists state under
    ///
    #[must_use]
    pub fn get_gitdir(&self) -> &Path {
        self.git.gitdir()
    }

    /// A merged read/write config view spanning every scope.
    #[must_use]
    pub fn get_config(&self) -> RepoConfig {
        RepoConfig::new(Rc::clone(&self.git))
    }

    /// `true` if `core.bare` is set; cached after first probe.
    ///
    /// # Errors
    /// Propagates [`git_backend::GitError`] from the underlying config read.
    pub fn is_bare(&self) -> Result<bool, GitPortError> {
        if let Some(bare) = self.cache.borrow().is_bare {
            return Ok(bare);
        }
        let bare = self
            .git
            .get_config("core.bare")?
            .is_some_and(|v| v == "true" || v == "yes" || v == "1");
        self.cache.borrow_mut().is_bare = Some(bare);
        Ok(bare)
    }

    /// The repository's object hash algorithm; probed once via
    /// [`GitBackend::object_format`] and cached.
    ///
    /// # Errors
    /// Propagates [`git_backend::GitError`] from the underlying probe.
    pub fn get_object_format(&self) -> Result<ObjectFormat, GitPortError> {
        if let Some(format) = self.cache.borrow().object_format {
            return Ok(format);
        }
        let format = self.git.object_format()?;
        self.cache.borrow_mut().object_format = Some(format);
        Ok(format)
    }

    /// Resolve `name` to an OID, following any chain of symbolic refs
    ///
    ///
    /// # Errors
    /// [`GitPortError::Git`] if `name` is not a valid ref name.
    pub fn resolve_ref(&self, name: &str) -> Result<Option<GitOid>, GitPortError> {
        let ref_name = RefName::new(name).map_err(git_backend::GitError::from)?;
        Ok(self.git.read_ref(&ref_name)?)
    }

    /// Expand a short ref name (`"main"`) to its full form
    /// (`"refs/heads/main"`), trying heads, tags, then remotes in that order
    ///
    ///
    /// # Errors
    /// [`GitPortError::NotFound`] if no candidate resolves.
    pub fn expand_ref(&self, name: &str) -> Result<RefName, GitPortError> {
        if name == "HEAD" || name.starts_with("refs/") {
            return Ok(RefName::new(name).map_err(git_backend::GitError::from)?);
        }
        for prefix in ["refs/heads/", "refs/tags/", "refs/remotes/"] {
            let candidate = format!("{prefix}{name}");
            let Ok(ref_name) = RefName::new(&candidate) else {
                continue;
            };
            if self.git.read_ref(&ref_name)?.is_some() {
                return Ok(ref_name);
            }
        }
        Err(GitPortError::NotFound {
            what: format!("ref matching '{name}'"),
        })
    }

    /// Read a ref's immediate target without following symbolic chains
    ///
    ///
    /// # Errors
    /// [`GitPortError::Git`] if `name` is not a valid ref name.
    pub fn read_symbolic_ref(&self, name: &str) -> Result<Option<RefTarget>, GitPortError> {
        let ref_name = RefName::new(name).map_err(git_backend::GitError::from)?;
        Ok(self.git.read_ref_target(&ref_name)?)
    }

    /// Create or overwrite a direct ref.
    ///
    /// # Errors
    /// [`GitPortError::Git`] if `name` is not a valid ref name.
    pub fn write_ref(&self, name: &str, oid: GitOid) -> Result<(), GitPortError> {
        let ref_name = RefName::new(name).map_err(git_backend::GitError::from)?;
        Ok(self.git.write_ref(&ref_name, oid, "")?)
    }

    /// Lazily resolve `remote.<name>.url` into a [`RemoteBackend`]; cached
    /// until [`invalidate_remote_cache`](Self::invalidate_remote_cache)
    ///
    ///
    /// # Errors
    /// [`GitPortError::NotFound`] if no such remote is configured.
    pub fn get_remote(&self, name: &str) -> Result<Rc<dyn RemoteBackend>, GitPortError> {
        if let Some(remote) = self.cache.borrow().remotes.get(name) {
            return Ok(Rc::clone(remote));
        }
        let url = self
            .git
            .get_config(&format!("remote.{name}.url"))?
            .ok_or_else(|| GitPortError::NotFound {
                what: format!("remote '{name}'"),
            })?;
        let remote: Rc<dyn RemoteBackend> = Rc::new(NullRemote::new(name.to_owned(), url));
        self.cache
            .borrow_mut()
            .remotes
            .insert(name.to_owned(), Rc::clone(&remote));
        Ok(remote)
    }

    /// Configure a new remote, failing with [`GitPortError::AlreadyExists`]
    /// unless `force` is set.
    ///
    /// # Errors
    /// [`GitPortError::AlreadyExists`] if the remote is already configured
    /// and `force` is `false`.
    pub fn add_remote(&self, name: &str, url: &str, force: bool) -> Result<(), GitPortError> {
        if !force && self.git.get_config(&format!("remote.{name}.url"))?.is_some() {
            return Err(GitPortError::AlreadyExists {
                kind: "remote".to_owned(),
                name: name.to_owned(),
            });
        }
        self.git
            .set_config(&format!("remote.{name}.url"), url, ConfigScope::Local, false)?;
        self.invalidate_remote_cache(name);
        Ok(())
    }

    /// Drop a remote's cached [`RemoteBackend`] so the next
    /// [`get_remote`](Self::get_remote) re-reads its config.
    pub fn invalidate_remote_cache(&self, name: &str) {
        self.cache.borrow_mut().remotes.remove(name);
    }

    /// Reconcile `target` with the current index and working directory
    ///
    ///
    /// # Errors
    /// [`GitPortError::BareRepository`] if checking out into this
    /// repository's own worktree and none is configured; propagates
    /// [`checkout::CheckoutError`] otherwise.
    pub fn checkout(
        &self,
        target: CheckoutTarget<'_>,
        options: CheckoutOptions<'_>,
    ) -> Result<Vec<IndexEntry>, GitPortError> {
        let (worktree, spec): (Arc<dyn WorktreeBackend>, String) = match target {
            CheckoutTarget::Ref(spec) => (Arc::clone(self.require_worktree()?), spec.to_owned()),
            CheckoutTarget::Worktree(backend) => (backend, "HEAD".to_owned()),
        };
        let commit_oid = self.git.rev_parse(&spec)?;
        let commit_info = self.git.read_commit(commit_oid)?;

        let index_bytes = self.git.read_index()?;
        let format = self.get_object_format()?;
        let index = git_backend::index::parse_index(format, &index_bytes)?;

        let sparse = self.load_sparse_config()?;
        let (patterns, cone_mode) = sparse.as_ref().map_or((Vec::new(), false), |s| {
            (s.patterns.clone(), s.cone_mode)
        });

        let inputs = checkout::AnalyzeInputs {
            target_tree: commit_info.tree_oid,
            index: &index,
            filters: options.filters,
            sparse: Some(checkout::SparseConfig {
                patterns: &patterns,
                cone_mode,
            }),
            force: options.force,
        };
        let ops = checkout::analyze_checkout(self.git.as_ref(), worktree.as_ref(), &inputs)?;
        let new_entries = checkout::execute_checkout(self.git.as_ref(), worktree.as_ref(), &ops)?;

        let bytes = git_backend::index::serialize_index(format, &new_entries);
        self.git.write_index(&bytes)?;
        Ok(new_entries)
    }

    /// Load `core.sparseCheckout`/`core.sparseCheckoutCone` and
    /// `info/sparse-checkout`, if sparse checkout is enabled. `GitBackend`
    /// has no dedicated accessor for an arbitrary gitdir file, so this reads
    /// `info/sparse-checkout` directly off disk — the same precedent the
    /// `stash` crate sets for `refs/stash` and its reflog (gitdir-internal
    /// bookkeeping the trait does not abstract over).
    fn load_sparse_config(&self) -> Result<Option<LoadedSparse>, GitPortError> {
        let enabled = self
            .git
            .get_config("core.sparseCheckout")?
            .is_some_and(|v| v == "true" || v == "1");
        if !enabled {
            return Ok(None);
        }
        let cone_mode = self
            .git
            .get_config("core.sparseCheckoutCone")?
            .is_none_or(|v| v == "true" || v == "1");
        let path = self.git.gitdir().join("info").join("sparse-checkout");
        let text = std::fs::read_to_string(&path).unwrap_or_default();
        let patterns = checkout::parse_sparse_file(&text);
        Ok(Some(LoadedSparse { patterns, cone_mode }))
    }

    /// Stage `paths`: hash each file's current content as a blob, write it
    /// to the object database, and upsert the index entry.
    ///
    /// # Errors
    /// [`GitPortError::BareRepository`] if no worktree is configured.
    pub fn add(&self, paths: &[String]) -> Result<(), GitPortError> {
        let worktree = Arc::clone(self.require_worktree()?);
        let format = self.get_object_format()?;
        let index_bytes = self.git.read_index()?;
        let mut entries = git_backend::index::parse_index(format, &index_bytes)?;

        for path in paths {
            let meta = worktree
                .lstat(path)?
                .ok_or_else(|| GitPortError::NotFound { what: path.clone() })?;
            let (content, mode) = if meta.is_symlink {
                let target = worktree.read_link(path)?.unwrap_or_default();
                (target.into_bytes(), EntryMode::Link)
            } else if meta.executable {
                (worktree.read(path)?.unwrap_or_default(), EntryMode::BlobExecutable)
            } else {
                (worktree.read(path)?.unwrap_or_default(), EntryMode::Blob)
            };
            let oid = self.git.write_object(git_backend::ObjectKind::Blob, &content)?;
            let mut entry = IndexEntry::new(path.clone(), mode, oid);
            entry.size = u32::try_from(meta.len).unwrap_or(u32::MAX);
            entry.mtime = meta.mtime;
            entries.retain(|e| e.path != *path);
            entries.push(entry);
        }
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        let bytes = git_backend::index::serialize_index(format, &entries);
        self.git.write_index(&bytes)?;
        Ok(())
    }

    /// Remove `paths` from the index and, unless `keep_worktree`, from the
    /// working directory too.
    ///
    /// # Errors
    /// [`GitPortError::BareRepository`] if removing worktree files and no
    /// worktree is configured.
    pub fn remove(&self, paths: &[String], keep_worktree: bool) -> Result<(), GitPortError> {
        let format = self.get_object_format()?;
        let index_bytes = self.git.read_index()?;
        let mut entries = git_backend::index::parse_index(format, &index_bytes)?;
        entries.retain(|e| !paths.contains(&e.path));
        let bytes = git_backend::index::serialize_index(format, &entries);
        self.git.write_index(&bytes)?;

        if !keep_worktree {
            let worktree = self.require_worktree()?;
            for path in paths {
                worktree.rm(path)?;
            }
        }
        Ok(())
    }

    /// Create a commit from the current index on top of HEAD, advancing the
    /// current branch (or `HEAD` directly, if detached).
    ///
    /// # Errors
    /// [`GitPortError::Git`] with kind `MissingName` if no committer
    /// identity is configured.
    pub fn commit(&self, message: &str) -> Result<GitOid, GitPortError> {
        if self.git.get_config("user.name")?.is_none()
            || self.git.get_config("user.email")?.is_none()
        {
            return Err(git_backend::GitError::MissingName.into());
        }

        let format = self.get_object_format()?;
        let index_bytes = self.git.read_index()?;
        let entries = git_backend::index::parse_index(format, &index_bytes)?;

        let parent = self.git.rev_parse_opt("HEAD")?;
        let base_tree = match parent {
            Some(oid) => self.git.read_commit(oid)?.tree_oid,
            None => self.git.write_tree(&[])?,
        };
        let staged: HashMap<&str, &IndexEntry> = entries
            .iter()
            .filter(|e| e.stage == 0)
            .map(|e| (e.path.as_str(), e))
            .collect();
        let mut edits: Vec<TreeEdit> = staged
            .values()
            .map(|e| TreeEdit::Upsert {
                path: e.path.clone(),
                mode: e.mode,
                oid: e.oid,
            })
            .collect();
        for path in walk_tree_flat(self.git.as_ref(), base_tree, "")?.keys() {
            if !staged.contains_key(path.as_str()) {
                edits.push(TreeEdit::Remove { path: path.clone() });
            }
        }
        let tree = if edits.is_empty() {
            base_tree
        } else {
            self.git.edit_tree(base_tree, &edits)?
        };

        let parents: Vec<GitOid> = parent.into_iter().collect();
        let head_ref = RefName::new("HEAD").expect("HEAD is a well-known ref");
        let update_ref = match self.git.read_ref_target(&head_ref)? {
            Some(RefTarget::Symbolic(branch)) => Some(branch),
            _ => None,
        };
        let commit_oid = self
            .git
            .create_commit(tree, &parents, message, update_ref.as_ref())?;
        if update_ref.is_none() {
            self.git.write_ref(&head_ref, commit_oid, message)?;
        }
        Ok(commit_oid)
    }

    /// File-level status relative to HEAD.
    ///
    /// # Errors
    /// [`GitPortError::BareRepository`] if no worktree is configured.
    pub fn status(&self) -> Result<Vec<git_backend::StatusEntry>, GitPortError> {
        let worktree = self.require_worktree()?;
        let format = self.get_object_format()?;
        let index_bytes = self.git.read_index()?;
        let entries = git_backend::index::parse_index(format, &index_bytes)?;

        let mut out = Vec::new();
        for entry in &entries {
            if entry.stage != 0 {
                continue;
            }
            let current = worktree.lstat(&entry.path)?;
            match current {
                None => out.push(git_backend::StatusEntry {
                    path: entry.path.clone(),
                    status: git_backend::FileStatus::Deleted,
                }),
                Some(_) => {
                    let bytes = worktree.read(&entry.path)?.unwrap_or_default();
                    let oid = self.hash_blob(&bytes)?;
                    if oid != entry.oid {
                        out.push(git_backend::StatusEntry {
                            path: entry.path.clone(),
                            status: git_backend::FileStatus::Modified,
                        });
                    }
                }
            }
        }
        let tracked: std::collections::HashSet<&str> =
            entries.iter().map(|e| e.path.as_str()).collect();
        for path in worktree.readdir_deep("")? {
            if !tracked.contains(path.as_str()) {
                out.push(git_backend::StatusEntry {
                    path,
                    status: git_backend::FileStatus::Untracked,
                });
            }
        }
        Ok(out)
    }

    /// HEAD/workdir/stage coded status matrix, isomorphic-git's
    /// `statusMatrix` shape — every path present in HEAD, the index, or
    /// the working directory gets one row.
    ///
    /// # Errors
    /// [`GitPortError::BareRepository`] if no worktree is configured.
    pub fn status_matrix(&self) -> Result<Vec<StatusMatrixEntry>, GitPortError> {
        let worktree = self.require_worktree()?;
        let format = self.get_object_format()?;
        let index_bytes = self.git.read_index()?;
        let entries = git_backend::index::parse_index(format, &index_bytes)?;
        let index_map: HashMap<&str, &IndexEntry> =
            entries.iter().filter(|e| e.stage == 0).map(|e| (e.path.as_str(), e)).collect();

        let head_map: HashMap<String, (GitOid, EntryMode)> = match self.git.rev_parse_opt("HEAD")? {
            Some(oid) => {
                let tree = self.git.read_commit(oid)?.tree_oid;
                walk_tree_flat(self.git.as_ref(), tree, "")?
            }
            None => HashMap::new(),
        };

        let mut paths: Vec<String> = head_map.keys().cloned().collect();
        paths.extend(index_map.keys().map(|p| (*p).to_owned()));
        paths.extend(worktree.readdir_deep("")?);
        paths.sort();
        paths.dedup();

        let mut rows = Vec::with_capacity(paths.len());
        for path in paths {
            let head_oid = head_map.get(&path).map(|(oid, _)| *oid);
            let index_entry = index_map.get(path.as_str()).copied();
            let wd_present = worktree.lstat(&path)?.is_some();

            let head = u8::from(head_oid.is_some());
            let stage = match (head_oid, index_entry) {
                (None, None) => 0,
                (None, Some(_)) => 2,
                (Some(h), Some(e)) if e.oid == h => 1,
                (Some(_), Some(_)) => 3,
                (Some(_), None) => 0,
            };
            let workdir = if !wd_present {
                0
            } else {
                let bytes = worktree.read(&path)?.unwrap_or_default();
                let current_oid = self.hash_blob(&bytes)?;
                let reference = index_entry.map_or(head_oid, |e| Some(e.oid));
                u8::from(reference != Some(current_oid)) + 1
            };

            rows.push(StatusMatrixEntry {
                path,
                head,
                workdir,
                stage,
            });
        }
        Ok(rows)
    }

    fn hash_blob(&self, bytes: &[u8]) -> Result<GitOid, GitPortError> {
        use sha1::{Digest as _, Sha1};
        use sha2::Sha256;

        let header = format!("blob {}\0", bytes.len());
        let oid = match self.get_object_format()? {
            ObjectFormat::Sha1 => {
                let mut hasher = Sha1::new();
                hasher.update(header.as_bytes());
                hasher.update(bytes);
                let digest: [u8; 20] = hasher.finalize().into();
                GitOid::from_sha1(digest)
            }
            ObjectFormat::Sha256 => {
                let mut hasher = Sha256::new();
                hasher.update(header.as_bytes());
                hasher.update(bytes);
                let digest: [u8; 32] = hasher.finalize().into();
                GitOid::from_sha256(digest)
            }
        };
        Ok(oid)
    }

    /// Reset the current branch to `target` (HEAD if unspecified), per
    /// `mode`.
    ///
    /// # Errors
    /// [`GitPortError::BareRepository`] for [`ResetMode::Hard`] if no
    /// worktree is configured.
    pub fn reset(&self, mode: ResetMode, target: Option<&str>) -> Result<(), GitPortError> {
        let target_oid = self.git.rev_parse(target.unwrap_or("HEAD"))?;
        let head_ref = RefName::new("HEAD").expect("HEAD is a well-known ref");
        if let Some(RefTarget::Symbolic(branch)) = self.git.read_ref_target(&head_ref)? {
            self.git.write_ref(&branch, target_oid, "reset")?;
        } else {
            self.git.write_ref(&head_ref, target_oid, "reset")?;
        }

        if matches!(mode, ResetMode::Soft) {
            return Ok(());
        }

        let tree = self.git.read_commit(target_oid)?.tree_oid;
        let map = walk_tree_flat(self.git.as_ref(), tree, "")?;
        let format = self.get_object_format()?;
        let entries: Vec<IndexEntry> = map
            .iter()
            .map(|(path, (oid, mode))| IndexEntry::new(path.clone(), *mode, *oid))
            .collect();
        let bytes = git_backend::index::serialize_index(format, &entries);
        self.git.write_index(&bytes)?;

        if matches!(mode, ResetMode::Hard) {
            self.checkout(
                CheckoutTarget::Ref(&target_oid.to_string()),
                CheckoutOptions {
                    filters: None,
                    force: true,
                },
            )?;
        }
        Ok(())
    }

    /// Fetch from `remote`; delegates to the configured [`RemoteBackend`] —
    /// wire transports are out of scope for this crate.
    ///
    /// # Errors
    /// [`GitPortError::NoTransport`] unless a host-supplied remote is
    /// configured.
    pub fn fetch(&self, remote: &str) -> Result<(), GitPortError> {
        self.get_remote(remote)?.fetch()
    }

    /// Push to `remote`.
    ///
    /// # Errors
    /// [`GitPortError::NoTransport`] unless a host-supplied remote is
    /// configured.
    pub fn push(&self, remote: &str) -> Result<(), GitPortError> {
        self.get_remote(remote)?.push()
    }

    /// Fetch from `remote`, then fast-forward the current branch to its
    /// remote-tracking ref if the history is a strict descendant. Three-way
    /// merge is explicitly out of scope.
    ///
    /// # Errors
    /// [`GitPortError::Git`] with kind `MergeConflict` if the local branch
    /// has diverged and a fast-forward is not possible.
    pub fn pull(&self, remote: &str) -> Result<(), GitPortError> {
        self.fetch(remote)?;

        let head_ref = RefName::new("HEAD").expect("HEAD is a well-known ref");
        let Some(RefTarget::Symbolic(branch)) = self.git.read_ref_target(&head_ref)? else {
            return Ok(());
        };
        let branch_short = branch
            .as_str()
            .strip_prefix("refs/heads/")
            .unwrap_or(branch.as_str());
        let tracking = RefName::new(&format!("refs/remotes/{remote}/{branch_short}"))
            .map_err(git_backend::GitError::from)?;
        let Some(remote_oid) = self.git.read_ref(&tracking)? else {
            return Ok(());
        };
        let Some(local_oid) = self.git.read_ref(&branch)? else {
            self.git.write_ref(&branch, remote_oid, &format!("pull: fast-forward to {remote_oid}"))?;
            return Ok(());
        };
        if local_oid == remote_oid {
            return Ok(());
        }
        if !self.git.is_ancestor(local_oid, remote_oid)? {
            return Err(git_backend::GitError::MergeConflict {
                details: format!("{branch_short} has diverged from {remote}/{branch_short}; fast-forward not possible"),
            }
            .into());
        }
        self.git
            .write_ref(&branch, remote_oid, &format!("pull: fast-forward to {remote_oid}"))?;
        if self.worktree.is_some() {
            self.checkout(
                CheckoutTarget::Ref(&remote_oid.to_string()),
                CheckoutOptions {
                    filters: None,
                    force: false,
                },
            )?;
        }
        Ok(())
    }

    /// Construct a bounded worker pool for parallel sparse checkout
    /// A worker is a closure run on the pool's own threads, not a
    /// separately loaded script file.
    ///
    /// # Errors
    /// Propagates [`workers::WorkerError`] if the underlying thread pool
    /// fails to start.
    pub fn enable_workers(&self, max_workers: usize) -> Result<(), GitPortError> {
        let pool = workers::WorkerPool::new(max_workers)?;
        self.cache.borrow_mut().worker_pool = Some(Rc::new(pool));
        Ok(())
    }

    /// Release the worker pool's handles. Worker pools and transports
    /// require explicit cleanup rather than relying on `Drop`.
    pub fn cleanup_workers(&self) {
        if let Some(pool) = self.cache.borrow().worker_pool.as_ref() {
            pool.terminate_all();
        }
        self.cache.borrow_mut().worker_pool = None;
    }

    /// Run a multi-worker sparse checkout against `target_ref` using the
    /// pool constructed by [`enable_workers`](Self::enable_workers).
    ///
    /// # Errors
    /// [`GitPortError::MissingParameter`] if workers were never enabled;
    /// propagates [`workers::WorkerError`] otherwise.
    pub fn checkout_parallel(&self, target_ref: &str) -> Result<Vec<IndexEntry>, GitPortError> {
        let pool = self
            .cache
            .borrow()
            .worker_pool
            .clone()
            .ok_or_else(|| GitPortError::MissingParameter {
                name: "worker_pool (call enable_workers first)".to_owned(),
            })?;
        let sparse = self.load_sparse_config()?;
        let (patterns, cone_mode) = sparse.map_or((Vec::new(), false), |s| (s.patterns, s.cone_mode));

        let gitdir = self.git.gitdir().to_path_buf();
        let worktree_root = self.require_worktree()?;
        let worktree_root = worktree_root.root().to_path_buf();
        let factory: workers::RepoFactory = Arc::new(move || {
            let git: Box<dyn GitBackend> =
                Box::new(FsGitBackend::open_at(&gitdir).map_err(workers::WorkerError::Git)?);
            let worktree: Box<dyn WorktreeBackend> =
                Box::new(FsWorktreeBackend::new(worktree_root.clone()));
            Ok((git, worktree))
        });

        let entries = workers::run_parallel_checkout(
            self.git.as_ref(),
            &pool,
            factory,
            target_ref,
            &patterns,
            cone_mode,
            workers::DEFAULT_WORKER_TIMEOUT,
        )?;
        Ok(entries)
    }

    /// Open the submodule at `path_or_name` as its own [`Repository`]
    ///
    ///
    /// # Errors
    /// [`GitPortError::NotFound`] if no matching entry exists in
    /// `.gitmodules`, or its gitdir has not been initialized under
    /// `<parent>/modules/<path>`.
    pub fn get_submodule(&self, path_or_name: &str) -> Result<Repository, GitPortError> {
        if let Some(repo) = self.cache.borrow().submodules.get(path_or_name) {
            return Ok(repo.clone());
        }

        let head = self
            .git
            .rev_parse_opt("HEAD")?
            .ok_or_else(|| GitPortError::NotFound {
                what: "HEAD (no commits yet, so no .gitmodules to read)".to_owned(),
            })?;
        let tree = self.git.read_commit(head)?.tree_oid;
        let submodules = self.git.list_submodules(tree)?;
        let meta = submodules
            .into_iter()
            .find(|s| s.name == path_or_name || s.path == path_or_name)
            .ok_or_else(|| GitPortError::NotFound {
                what: format!("submodule '{path_or_name}'"),
            })?;

        let sub_gitdir = self.git.gitdir().join("modules").join(&meta.path);
        if !sub_gitdir.is_dir() {
            return Err(GitPortError::NotFound {
                what: format!("submodule gitdir at {}", sub_gitdir.display()),
            });
        }
        let sub_git: Rc<dyn GitBackend> = Rc::new(FsGitBackend::open_at(&sub_gitdir)?);
        let sub_worktree_root = self.require_worktree()?.root().join(&meta.path);
        let sub_worktree: Arc<dyn WorktreeBackend> =
            Arc::new(FsWorktreeBackend::new(sub_worktree_root));
        self.require_worktree()?.register_submodule(&meta.path, Arc::clone(&sub_worktree));

        let repo = Repository::from_backends(sub_git, Some(sub_worktree));
        self.cache
            .borrow_mut()
            .submodules
            .insert(path_or_name.to_owned(), repo.clone());
        Ok(repo)
    }
}

struct LoadedSparse {
    patterns: Vec<checkout::Pattern>,
    cone_mode: bool,
}

fn walk_tree_flat(
    git: &dyn GitBackend,
    root: GitOid,
    prefix: &str,
) -> Result<HashMap<String, (GitOid, EntryMode)>, GitPortError> {
    let mut out = HashMap::new();
    walk_tree_flat_rec(git, root, prefix, &mut out)?;
    Ok(out)
}

fn walk_tree_flat_rec(
    git: &dyn GitBackend,
    tree: GitOid,
    prefix: &str,
    out: &mut HashMap<String, (GitOid, EntryMode)>,
) -> Result<(), GitPortError> {
    for entry in git.read_tree(tree)? {
        let path = if prefix.is_empty() {
            entry.name.clone()
        } else {
            format!("{prefix}/{}", entry.name)
        };
        if matches!(entry.mode, EntryMode::Tree) {
            walk_tree_flat_rec(git, entry.oid, &path, out)?;
        } else {
            out.insert(path, (entry.oid, entry.mode));
        }
    }
    Ok(())
}
