use tempfile::TempDir;

use checkout::{analyze_checkout, execute_checkout, AnalyzeInputs, Operation, Pattern, SparseConfig};
use git_backend::{EntryMode, FsGitBackend, GitBackend, GitOid};
use worktree_backend::FsWorktreeBackend;

fn setup_repo() -> (TempDir, FsGitBackend, FsWorktreeBackend) {
    let dir = TempDir::new().unwrap();
    std::process::Command::new("git")
        .args(["init", dir.path().to_str().unwrap()])
        .output()
        .unwrap();
    let git = FsGitBackend::open(dir.path()).unwrap();
    let worktree = FsWorktreeBackend::new(dir.path().to_path_buf());
    (dir, git, worktree)
}

fn blob(git: &FsGitBackend, content: &[u8]) -> GitOid {
    git.write_object(git_backend::ObjectKind::Blob, content).unwrap()
}

fn write_tree_entries(git: &FsGitBackend, entries: &[(&str, EntryMode, GitOid)]) -> GitOid {
    // Builds a flat or nested tree from path -> (mode, oid) triples via
    // `edit_tree`, starting from an empty tree.
    let empty = git
        .write_tree(&[])
        .unwrap();
    let mut tree = empty;
    let edits: Vec<git_backend::TreeEdit> = entries
        .iter()
        .map(|(path, mode, oid)| git_backend::TreeEdit::Upsert {
            path: (*path).to_owned(),
            mode: *mode,
            oid: *oid,
        })
        .collect();
    tree = git.edit_tree(tree, &edits).unwrap();
    tree
}

#[test]
fn round_trip_checkout_of_simple_tree() {
    let (_dir, git, worktree) = setup_repo();
    let a = blob(&git, b"A");
    let b = blob(&git, b"B");
    let tree = write_tree_entries(
        &git,
        &[("a.txt", EntryMode::Blob, a), ("dir/b.txt", EntryMode::Blob, b)],
    );

    let inputs = AnalyzeInputs {
        target_tree: tree,
        index: &[],
        filters: None,
        sparse: None,
        force: true,
    };
    let ops = analyze_checkout(&git, &worktree, &inputs).unwrap();
    let entries = execute_checkout(&git, &worktree, &ops).unwrap();

    assert_eq!(worktree.read("a.txt").unwrap(), Some(b"A".to_vec()));
    assert_eq!(worktree.read("dir/b.txt").unwrap(), Some(b"B".to_vec()));

    let mut paths: Vec<&str> = entries.iter().map(|e| e.path.as_str()).collect();
    paths.sort_unstable();
    assert_eq!(paths, vec!["a.txt", "dir/b.txt"]);
}

#[test]
fn cone_sparse_pattern_excludes_sibling_prefix_directory() {
    let (_dir, git, worktree) = setup_repo();
    let a = blob(&git, b"a");
    let b = blob(&git, b"b");
    let c = blob(&git, b"c");
    let readme = blob(&git, b"r");
    let tree = write_tree_entries(
        &git,
        &[
            ("src/a", EntryMode::Blob, a),
            ("src/b", EntryMode::Blob, b),
            ("src-backup/c", EntryMode::Blob, c),
            ("README", EntryMode::Blob, readme),
        ],
    );

    let patterns = vec![Pattern {
        negated: false,
        text: "src".to_owned(),
        dir_only: true,
    }];
    let sparse = SparseConfig {
        patterns: &patterns,
        cone_mode: true,
    };
    let inputs = AnalyzeInputs {
        target_tree: tree,
        index: &[],
        filters: None,
        sparse: Some(sparse),
        force: true,
    };
    let ops = analyze_checkout(&git, &worktree, &inputs).unwrap();
    execute_checkout(&git, &worktree, &ops).unwrap();

    assert_eq!(worktree.read("src/a").unwrap(), Some(b"a".to_vec()));
    assert_eq!(worktree.read("src/b").unwrap(), Some(b"b".to_vec()));
    assert_eq!(worktree.read("src-backup/c").unwrap(), None);
    // README is root-level and cone mode excludes root files absent a
    // wildcard inclusion pattern.
    assert_eq!(worktree.read("README").unwrap(), None);
}

#[test]
fn conflict_detected_when_workdir_and_index_both_diverge_from_target() {
    let (_dir, git, worktree) = setup_repo();
    let target_blob = blob(&git, b"T");
    let workdir_blob = blob(&git, b"W");
    let tree = write_tree_entries(&git, &[("file", EntryMode::Blob, target_blob)]);

    worktree
        .write("file", b"W", worktree_backend::FileMode::Regular)
        .unwrap();
    let index = vec![git_backend::IndexEntry::new(
        "file".to_owned(),
        EntryMode::Blob,
        workdir_blob,
    )];

    let inputs = AnalyzeInputs {
        target_tree: tree,
        index: &index,
        filters: None,
        sparse: None,
        force: false,
    };
    let ops = analyze_checkout(&git, &worktree, &inputs).unwrap();
    assert_eq!(ops.len(), 1);
    assert!(matches!(&ops[0], Operation::Conflict { path } if path == "file"));

    let err = execute_checkout(&git, &worktree, &ops).unwrap_err();
    assert!(matches!(err, checkout::CheckoutError::Conflict { .. }));
    assert_eq!(worktree.read("file").unwrap(), Some(b"W".to_vec()));
}

#[test]
fn force_checkout_overwrites_dirty_workdir() {
    let (_dir, git, worktree) = setup_repo();
    let target_blob = blob(&git, b"T");
    let tree = write_tree_entries(&git, &[("file", EntryMode::Blob, target_blob)]);
    worktree
        .write("file", b"dirty", worktree_backend::FileMode::Regular)
        .unwrap();

    let inputs = AnalyzeInputs {
        target_tree: tree,
        index: &[],
        filters: None,
        sparse: None,
        force: true,
    };
    let ops = analyze_checkout(&git, &worktree, &inputs).unwrap();
    execute_checkout(&git, &worktree, &ops).unwrap();
    assert_eq!(worktree.read("file").unwrap(), Some(b"T".to_vec()));
}

#[test]
fn checkout_is_idempotent() {
    let (_dir, git, worktree) = setup_repo();
    let a = blob(&git, b"A");
    let tree = write_tree_entries(&git, &[("a.txt", EntryMode::Blob, a)]);

    let inputs = AnalyzeInputs {
        target_tree: tree,
        index: &[],
        filters: None,
        sparse: None,
        force: true,
    };
    let ops1 = analyze_checkout(&git, &worktree, &inputs).unwrap();
    let entries1 = execute_checkout(&git, &worktree, &ops1).unwrap();

    let inputs2 = AnalyzeInputs {
        target_tree: tree,
        index: &entries1,
        filters: None,
        sparse: None,
        force: true,
    };
    let ops2 = analyze_checkout(&git, &worktree, &inputs2).unwrap();
    // Second pass should be all `Keep`, never `Update`.
    assert!(ops2.iter().all(|op| matches!(op, Operation::Keep { .. })));
}
