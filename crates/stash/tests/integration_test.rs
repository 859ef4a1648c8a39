use tempfile::TempDir;

use git_backend::{EntryMode, FsGitBackend, GitBackend, GitOid, ObjectKind, RefName, TreeEntry};
use worktree_backend::{FileMode, FsWorktreeBackend, WorktreeBackend};

fn setup_repo_with_commit() -> (TempDir, FsGitBackend, FsWorktreeBackend, GitOid) {
    let dir = TempDir::new().unwrap();
    std::process::Command::new("git")
        .args(["init", dir.path().to_str().unwrap()])
        .output()
        .unwrap();
    std::process::Command::new("git")
        .args(["config", "user.email", "test@test.com"])
        .current_dir(dir.path())
        .output()
        .unwrap();
    std::process::Command::new("git")
        .args(["config", "user.name", "Test User"])
        .current_dir(dir.path())
        .output()
        .unwrap();

    let git = FsGitBackend::open(dir.path()).unwrap();
    let worktree = FsWorktreeBackend::new(dir.path().to_path_buf());

    let blob = git.write_object(ObjectKind::Blob, b"hello\n").unwrap();
    let tree = git
        .write_tree(&[TreeEntry {
            name: "a.txt".to_owned(),
            mode: EntryMode::Blob,
            oid: blob,
        }])
        .unwrap();
    let head_ref = RefName::new("refs/heads/main").unwrap();
    let commit = git
        .create_commit(tree, &[], "initial commit", Some(&head_ref))
        .unwrap();
    std::process::Command::new("git")
        .args(["symbolic-ref", "HEAD", "refs/heads/main"])
        .current_dir(dir.path())
        .output()
        .unwrap();

    worktree.write("a.txt", b"hello\n", FileMode::Regular).unwrap();
    let format = git.object_format().unwrap();
    let entries = vec![git_backend::IndexEntry::new(
        "a.txt".to_owned(),
        EntryMode::Blob,
        blob,
    )];
    let bytes = git_backend::index::serialize_index(format, &entries);
    git.write_index(&bytes).unwrap();

    (dir, git, worktree, commit)
}

#[test]
fn stash_push_saves_dirty_workdir_and_resets_to_head() {
    let (_dir, git, worktree, _head) = setup_repo_with_commit();
    worktree.write("a.txt", b"changed\n", FileMode::Regular).unwrap();

    let stash_oid = stash::stash_push(&git, &worktree, None).unwrap();
    assert_ne!(stash_oid, GitOid::zero(git.object_format().unwrap()));

    assert_eq!(worktree.read("a.txt").unwrap(), Some(b"hello\n".to_vec()));

    let entries = stash::list(&git).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].new_oid, stash_oid);
}

#[test]
fn stash_push_with_no_changes_fails() {
    let (_dir, git, worktree, _head) = setup_repo_with_commit();
    let err = stash::stash_push(&git, &worktree, None).unwrap_err();
    assert!(matches!(err, stash::StashError::NothingToStash));
}

#[test]
fn stash_pop_restores_and_drops() {
    let (_dir, git, worktree, _head) = setup_repo_with_commit();
    worktree.write("a.txt", b"changed\n", FileMode::Regular).unwrap();
    stash::stash_push(&git, &worktree, Some("my work")).unwrap();
    assert_eq!(worktree.read("a.txt").unwrap(), Some(b"hello\n".to_vec()));

    stash::stash_pop(&git, &worktree, 0).unwrap();
    assert_eq!(worktree.read("a.txt").unwrap(), Some(b"changed\n".to_vec()));
    assert!(stash::list(&git).unwrap().is_empty());
}

#[test]
fn stash_drop_removes_only_named_entry() {
    let (_dir, git, worktree, _head) = setup_repo_with_commit();
    worktree.write("a.txt", b"first\n", FileMode::Regular).unwrap();
    let first = stash::stash_push(&git, &worktree, None).unwrap();

    worktree.write("a.txt", b"second\n", FileMode::Regular).unwrap();
    let second = stash::stash_push(&git, &worktree, None).unwrap();

    let entries = stash::list(&git).unwrap();
    assert_eq!(entries[0].new_oid, second);
    assert_eq!(entries[1].new_oid, first);

    stash::stash_drop(&git, 0).unwrap();
    let remaining = stash::list(&git).unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].new_oid, first);
}

#[test]
fn stash_push_on_fresh_repo_fails_with_head_not_found() {
    let dir = TempDir::new().unwrap();
    std::process::Command::new("git")
        .args(["init", dir.path().to_str().unwrap()])
        .output()
        .unwrap();
    std::process::Command::new("git")
        .args(["config", "user.email", "test@test.com"])
        .current_dir(dir.path())
        .output()
        .unwrap();
    std::process::Command::new("git")
        .args(["config", "user.name", "Test User"])
        .current_dir(dir.path())
        .output()
        .unwrap();

    let git = FsGitBackend::open(dir.path()).unwrap();
    let worktree = FsWorktreeBackend::new(dir.path().to_path_buf());

    let err = stash::stash_push(&git, &worktree, None).unwrap_err();
    match err {
        stash::StashError::Git(git_backend::GitError::NotFound { what }) => {
            assert_eq!(what, "HEAD");
        }
        other => panic!("expected NotFound(\"HEAD\"), got {other:?}"),
    }
}
