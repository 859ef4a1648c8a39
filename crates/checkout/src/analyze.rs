//! `analyze_checkout`: the pure half of the checkout engine (§4.3.3). Walks
//! the target tree, diffs it against the current index and working
//! directory, and returns the [`Operation`] list the executor applies.
//!
//! Pure function of its inputs (§8): given the same tree, index snapshot,
//! working-directory hashes, patterns, filters, and `force` flag, always
//! produces the same operations. No I/O is hidden behind a cache here —
//! every read goes through the backend references passed in, so a caller
//! can swap in a fixture backend for property tests.

use std::collections::BTreeMap;

use git_backend::{EntryMode, GitBackend, GitOid, IndexEntry};
use worktree_backend::WorktreeBackend;

use crate::error::CheckoutError;
use crate::matcher::{should_descend, sparse_match, Pattern};
use crate::operation::{CachedStat, Operation};

/// Sparse-checkout configuration for a single analyze/execute pass.
#[derive(Clone, Copy, Debug)]
pub struct SparseConfig<'a> {
    /// The active patterns (already parsed via
    /// [`crate::matcher::parse_sparse_file`]).
    pub patterns: &'a [Pattern],
    /// `true` for cone mode, `false` for gitignore-style non-cone mode.
    pub cone_mode: bool,
}

/// Inputs to [`analyze_checkout`].
pub struct AnalyzeInputs<'a> {
    /// The target tree OID.
    pub target_tree: GitOid,
    /// The current index, read-only — `analyze_checkout` never mutates it.
    pub index: &'a [IndexEntry],
    /// Restrict the operation set to these paths (and anything nested under
    /// a directory path in this list), if set.
    pub filters: Option<&'a [String]>,
    /// Active sparse-checkout configuration, if any.
    pub sparse: Option<SparseConfig<'a>>,
    /// Whether to allow overwriting local modifications without a conflict.
    pub force: bool,
}

/// Walk `target_tree` and diff it against `inputs.index` and the working
/// directory read through `worktree`, producing the operation list
/// [`crate::execute_checkout`] applies.
///
/// # Errors
/// Propagates [`git_backend::GitError`]/[`worktree_backend::WorktreeError`]
/// failures from tree reads or working-directory stats.
pub fn analyze_checkout(
    git: &dyn GitBackend,
    worktree: &dyn WorktreeBackend,
    inputs: &AnalyzeInputs<'_>,
) -> Result<Vec<Operation>, CheckoutError> {
    let empty_patterns: Vec<Pattern> = Vec::new();
    let (patterns, cone_mode) = match inputs.sparse {
        Some(cfg) => (cfg.patterns, cfg.cone_mode),
        None => (empty_patterns.as_slice(), false),
    };

    let target_map = walk_target_tree(git, inputs.target_tree, patterns, cone_mode)?;

    let mut universe: BTreeMap<String, ()> = BTreeMap::new();
    for path in target_map.keys() {
        universe.insert(path.clone(), ());
    }
    for entry in inputs.index {
        if entry.stage == 0 {
            universe.insert(entry.path.clone(), ());
        }
    }
    if let Some(filters) = inputs.filters {
        universe.retain(|path, ()| path_matches_filters(path, filters));
    }

    let mut ops = Vec::with_capacity(universe.len());
    for path in universe.keys() {
        let index_entry = inputs
            .index
            .iter()
            .find(|e| e.stage == 0 && e.path == *path);

        if let Some((target_oid, target_mode)) = target_map.get(path) {
            ops.push(analyze_one_path(
                worktree,
                git,
                path,
                *target_oid,
                *target_mode,
                index_entry,
                inputs.force,
            )?);
        } else {
            if index_entry.is_some() {
                ops.push(Operation::DeleteIndex { path: path.clone() });
            }
            if worktree.lstat(path)?.is_some() {
                ops.push(Operation::Delete { path: path.clone() });
            }
        }
    }

    Ok(ops)
}

#[allow(clippy::too_many_arguments)]
fn analyze_one_path(
    worktree: &dyn WorktreeBackend,
    git: &dyn GitBackend,
    path: &str,
    target_oid: GitOid,
    target_mode: EntryMode,
    index_entry: Option<&IndexEntry>,
    force: bool,
) -> Result<Operation, CheckoutError> {
    if matches!(target_mode, EntryMode::Commit) {
        // Gitlinks never have working-directory content to diff; the
        // executor only ensures the submodule directory exists.
        return Ok(Operation::Update {
            path: path.to_owned(),
            oid: target_oid,
            mode: target_mode,
        });
    }

    let wd_oid = hash_working_dir_entry(worktree, git, path, target_mode)?;
    let mode_matches_wd = wd_oid.is_some();
    let matches_target = mode_matches_wd && wd_oid == Some(target_oid);

    if matches_target {
        let stat = worktree.lstat(path)?.map_or(
            CachedStat {
                size: 0,
                mtime: (0, 0),
            },
            |m| CachedStat {
                size: u32::try_from(m.len).unwrap_or(u32::MAX),
                mtime: m.mtime,
            },
        );
        return Ok(Operation::Keep {
            path: path.to_owned(),
            oid: target_oid,
            mode: target_mode,
            stat,
        });
    }

    let matches_index = match (index_entry, wd_oid) {
        (Some(entry), Some(wd)) => entry.oid == wd,
        (None, None) => true,
        _ => false,
    };

    if !force && wd_oid.is_some() && !matches_index {
        Ok(Operation::Conflict {
            path: path.to_owned(),
        })
    } else {
        Ok(Operation::Update {
            path: path.to_owned(),
            oid: target_oid,
            mode: target_mode,
        })
    }
}

/// Hash the working-directory content at `path` as a git blob, returning
/// `None` if the path does not currently exist as the expected kind of
/// entry (regular/executable file or symlink).
fn hash_working_dir_entry(
    worktree: &dyn WorktreeBackend,
    git: &dyn GitBackend,
    path: &str,
    target_mode: EntryMode,
) -> Result<Option<GitOid>, CheckoutError> {
    let Some(meta) = worktree.lstat(path)? else {
        return Ok(None);
    };

    let bytes = if matches!(target_mode, EntryMode::Link) {
        if !meta.is_symlink {
            return Ok(None);
        }
        worktree.read_link(path)?.map(String::into_bytes)
    } else {
        if meta.is_symlink || meta.is_dir {
            return Ok(None);
        }
        worktree.read(path)?
    };

    let Some(bytes) = bytes else {
        return Ok(None);
    };
    Ok(Some(hash_blob(git, &bytes)?))
}

/// Hash `bytes` as a loose blob object would hash, without writing anything
/// to the object database — `analyze_checkout` only compares OIDs, it never
/// mutates storage (that is `execute_checkout`'s job).
fn hash_blob(git: &dyn GitBackend, bytes: &[u8]) -> Result<GitOid, CheckoutError> {
    use sha1::{Digest as _, Sha1};
    use sha2::Sha256;

    let header = format!("blob {}\0", bytes.len());
    let format = git.object_format()?;
    let oid = match format {
        git_backend::ObjectFormat::Sha1 => {
            let mut hasher = Sha1::new();
            hasher.update(header.as_bytes());
            hasher.update(bytes);
            let digest: [u8; 20] = hasher.finalize().into();
            GitOid::from_sha1(digest)
        }
        git_backend::ObjectFormat::Sha256 => {
            let mut hasher = Sha256::new();
            hasher.update(header.as_bytes());
            hasher.update(bytes);
            let digest: [u8; 32] = hasher.finalize().into();
            GitOid::from_sha256(digest)
        }
    };
    Ok(oid)
}

/// `true` if `path` is itself a filter, sits under a directory filter, or a
/// file filter sits under `path` treated as a directory prefix.
fn path_matches_filters(path: &str, filters: &[String]) -> bool {
    filters.iter().any(|f| {
        path == f
            || path.starts_with(&format!("{f}/"))
            || f.starts_with(&format!("{path}/"))
    })
}

type TargetMap = BTreeMap<String, (GitOid, EntryMode)>;

fn walk_target_tree(
    git: &dyn GitBackend,
    root: GitOid,
    patterns: &[Pattern],
    cone_mode: bool,
) -> Result<TargetMap, CheckoutError> {
    let mut out = BTreeMap::new();
    walk_tree_rec(git, root, "", patterns, cone_mode, &mut out)?;
    Ok(out)
}

fn walk_tree_rec(
    git: &dyn GitBackend,
    tree: GitOid,
    prefix: &str,
    patterns: &[Pattern],
    cone_mode: bool,
    out: &mut TargetMap,
) -> Result<(), CheckoutError> {
    for entry in git.read_tree(tree)? {
        let path = if prefix.is_empty() {
            entry.name.clone()
        } else {
            format!("{prefix}/{}", entry.name)
        };
        if matches!(entry.mode, EntryMode::Tree) {
            if should_descend(&path, patterns, cone_mode) {
                walk_tree_rec(git, entry.oid, &path, patterns, cone_mode, out)?;
            }
        } else if sparse_match(&path, patterns, cone_mode) {
            out.insert(path, (entry.oid, entry.mode));
        }
    }
    Ok(())
}
