//! The multi-worker sparse-checkout coordinator (§4.5.3): resolves a ref to
//! a tree, discovers per-directory tasks via the sparse matcher, distributes
//! them round-robin across worker handles, and merges the resulting index
//! entries single-writer.

use std::sync::Arc;
use std::time::Duration;

use checkout::{should_descend, sparse_match, Pattern};
use crossbeam_channel as chan;
use git_backend::{EntryMode, GitBackend, GitOid, IndexEntry, ObjectForm};
use worktree_backend::{FileMode, WorktreeBackend};

use crate::error::WorkerError;
use crate::pool::WorkerPool;

/// Default per-worker call timeout (§4.5.3 step 6).
pub const DEFAULT_WORKER_TIMEOUT: Duration = Duration::from_secs(60);

/// A single blob to materialize, as discovered from the target tree.
#[derive(Clone, Debug)]
pub struct FileTask {
    /// Repo-root-relative path.
    pub path: String,
    /// Blob OID.
    pub oid: GitOid,
    /// File mode.
    pub mode: EntryMode,
}

/// A unit of work assigned to one worker: every matching file directly
/// inside one qualifying directory.
#[derive(Clone, Debug)]
pub struct Task {
    /// Repo-root-relative directory path (`""` for files at the root).
    pub directory_path: String,
    /// The tree OID this directory's entries were read from.
    pub tree_oid: GitOid,
    /// The files to materialize under this directory.
    pub files: Vec<FileTask>,
}

/// A worker's own view onto the repository: opened once per worker thread
/// so workers share no mutable state with the coordinator other than the
/// result records they return (§4.5.3 ordering guarantees).
pub type RepoFactory =
    Arc<dyn Fn() -> Result<(Box<dyn GitBackend>, Box<dyn WorktreeBackend>), WorkerError> + Send + Sync>;

/// What one worker reports back: accumulated index entries plus per-path
/// failures.
#[derive(Default)]
struct WorkerResult {
    entries: Vec<IndexEntry>,
    errors: Vec<(String, String)>,
}

/// Walk `root` once, grouping matching leaf entries into one [`Task`] per
/// qualifying directory (§4.5.3 step 2).
///
/// # Errors
/// Propagates [`git_backend::GitError`] from tree reads.
pub fn discover_tasks(
    git: &dyn GitBackend,
    root: GitOid,
    patterns: &[Pattern],
    cone_mode: bool,
) -> Result<Vec<Task>, WorkerError> {
    let mut tasks = Vec::new();
    walk_dir(git, "", root, patterns, cone_mode, &mut tasks)?;
    Ok(tasks)
}

fn walk_dir(
    git: &dyn GitBackend,
    dir_path: &str,
    dir_tree: GitOid,
    patterns: &[Pattern],
    cone_mode: bool,
    tasks: &mut Vec<Task>,
) -> Result<(), WorkerError> {
    let mut files = Vec::new();
    for entry in git.read_tree(dir_tree)? {
        let path = if dir_path.is_empty() {
            entry.name.clone()
        } else {
            format!("{dir_path}/{}", entry.name)
        };
        if matches!(entry.mode, EntryMode::Tree) {
            if should_descend(&path, patterns, cone_mode) {
                walk_dir(git, &path, entry.oid, patterns, cone_mode, tasks)?;
            }
        } else if sparse_match(&path, patterns, cone_mode) {
            files.push(FileTask {
                path,
                oid: entry.oid,
                mode: entry.mode,
            });
        }
    }
    if !files.is_empty() {
        tasks.push(Task {
            directory_path: dir_path.to_owned(),
            tree_oid: dir_tree,
            files,
        });
    }
    Ok(())
}

/// Round-robin task distribution across `worker_count` buckets (§4.5.3
/// step 3).
#[must_use]
pub fn distribute(tasks: Vec<Task>, worker_count: usize) -> Vec<Vec<Task>> {
    let n = worker_count.max(1);
    let mut buckets: Vec<Vec<Task>> = (0..n).map(|_| Vec::new()).collect();
    for (i, task) in tasks.into_iter().enumerate() {
        buckets[i % n].push(task);
    }
    buckets
}

fn process_file(
    git: &dyn GitBackend,
    worktree: &dyn WorktreeBackend,
    file: &FileTask,
) -> Result<IndexEntry, WorkerError> {
    let content = git.read_object(file.oid, ObjectForm::ContentOnly)?;
    match file.mode {
        EntryMode::Link => {
            let target = String::from_utf8_lossy(&content.bytes).into_owned();
            if worktree.write_link(&file.path, &target).is_err() {
                worktree.write(&file.path, target.as_bytes(), FileMode::Regular)?;
            }
        }
        EntryMode::BlobExecutable => {
            worktree.write(&file.path, &content.bytes, FileMode::Executable)?;
        }
        EntryMode::Commit => {
            worktree.mkdir(&file.path)?;
        }
        _ => {
            worktree.write(&file.path, &content.bytes, FileMode::Regular)?;
        }
    }
    let mut entry = IndexEntry::new(file.path.clone(), file.mode, file.oid);
    if let Some(meta) = worktree.lstat(&file.path)? {
        entry.size = u32::try_from(meta.len).unwrap_or(u32::MAX);
        entry.mtime = meta.mtime;
    }
    Ok(entry)
}

fn run_worker(factory: &RepoFactory, tasks: &[Task]) -> WorkerResult {
    let (git, worktree) = match factory() {
        Ok(pair) => pair,
        Err(e) => {
            return WorkerResult {
                entries: Vec::new(),
                errors: vec![("<factory>".to_owned(), e.to_string())],
            };
        }
    };

    let mut result = WorkerResult::default();
    for task in tasks {
        if let Err(e) = worktree.mkdir(&task.directory_path) {
            result.errors.push((task.directory_path.clone(), e.to_string()));
            continue;
        }
        for file in &task.files {
            match process_file(git.as_ref(), worktree.as_ref(), file) {
                Ok(entry) => result.entries.push(entry),
                Err(e) => result.errors.push((file.path.clone(), e.to_string())),
            }
        }
    }
    result
}

/// Run the full multi-worker sparse-checkout algorithm (§4.5.3) against
/// `target_ref`, using `pool` for scheduling and `factory` to give each
/// worker its own backend handles.
///
/// # Errors
/// [`WorkerError::Aggregate`] if any worker reported per-path failures or
/// timed out; lower-level backend errors from resolving the ref or merging
/// the index.
pub fn run_parallel_checkout(
    coordinator_git: &dyn GitBackend,
    pool: &WorkerPool,
    factory: RepoFactory,
    target_ref: &str,
    patterns: &[Pattern],
    cone_mode: bool,
    timeout: Duration,
) -> Result<Vec<IndexEntry>, WorkerError> {
    let commit_oid = coordinator_git.rev_parse(target_ref)?;
    let commit_info = coordinator_git.read_commit(commit_oid)?;
    let tasks = discover_tasks(coordinator_git, commit_info.tree_oid, patterns, cone_mode)?;

    let worker_count = pool.capacity();
    let buckets = distribute(tasks, worker_count);

    let mut all_entries = Vec::new();
    let mut all_errors = Vec::new();

    for (worker_id, bucket) in buckets.into_iter().enumerate() {
        if bucket.is_empty() {
            continue;
        }
        let (tx, rx) = chan::bounded(1);
        let factory = Arc::clone(&factory);
        pool.spawn(move || {
            let result = run_worker(&factory, &bucket);
            let _ = tx.send(result);
        });

        match rx.recv_timeout(timeout) {
            Ok(result) => {
                all_entries.extend(result.entries);
                all_errors.extend(result.errors);
            }
            Err(chan::RecvTimeoutError::Timeout) => {
                tracing::warn!(worker_id, "parallel checkout: worker timed out");
                all_errors.push((format!("worker {worker_id}"), "timed out".to_owned()));
            }
            Err(chan::RecvTimeoutError::Disconnected) => {
                all_errors.push((
                    format!("worker {worker_id}"),
                    "worker thread panicked".to_owned(),
                ));
            }
        }
    }

    merge_index(coordinator_git, &all_entries)?;

    if all_errors.is_empty() {
        Ok(all_entries)
    } else {
        Err(WorkerError::Aggregate { failures: all_errors })
    }
}

/// Single-writer merge: read the current index, upsert every accumulated
/// entry by path, write it back (§4.5.3 step 5, §5 ordering guarantees).
fn merge_index(git: &dyn GitBackend, new_entries: &[IndexEntry]) -> Result<(), WorkerError> {
    let format = git.object_format()?;
    let bytes = git.read_index()?;
    let mut entries = git_backend::index::parse_index(format, &bytes)?;

    for entry in new_entries {
        entries.retain(|e| e.path != entry.path);
        entries.push(entry.clone());
    }

    let bytes = git_backend::index::serialize_index(format, &entries);
    git.write_index(&bytes)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oid(n: u8) -> GitOid {
        GitOid::from_sha1([n; 20])
    }

    #[test]
    fn distribute_is_round_robin() {
        let tasks = (0..5)
            .map(|i| Task {
                directory_path: format!("d{i}"),
                tree_oid: oid(i as u8),
                files: Vec::new(),
            })
            .collect();
        let buckets = distribute(tasks, 2);
        assert_eq!(buckets[0].len(), 3);
        assert_eq!(buckets[1].len(), 2);
        assert_eq!(buckets[0][0].directory_path, "d0");
        assert_eq!(buckets[1][0].directory_path, "d1");
    }

    #[test]
    fn distribute_handles_zero_workers_as_one_bucket() {
        let tasks = vec![Task {
            directory_path: "d".to_owned(),
            tree_oid: oid(0),
            files: Vec::new(),
        }];
        let buckets = distribute(tasks, 0);
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].len(), 1);
    }
}
