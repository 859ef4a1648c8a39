use serde::{Deserialize, Serialize};
use tempfile::TempDir;

use gitport::{CheckoutOptions, CheckoutTarget, RemoteBackend, ResetMode};
use gitport::Repository;

fn setup_repo() -> (TempDir, Repository) {
    let dir = TempDir::new().unwrap();
    let repo = Repository::init(dir.path(), false).unwrap();
    repo.get_config()
        .set(
            "user.name",
            "Test User",
            gitport::git_backend::ConfigScope::Local,
            false,
        )
        .unwrap();
    repo.get_config()
        .set(
            "user.email",
            "test@test.com",
            gitport::git_backend::ConfigScope::Local,
            false,
        )
        .unwrap();
    (dir, repo)
}

#[test]
fn init_creates_a_non_bare_repository_with_a_worktree() {
    let (dir, repo) = setup_repo();
    assert!(!repo.is_bare().unwrap());
    assert_eq!(repo.get_gitdir(), dir.path().join(".git"));
}

#[test]
fn init_bare_has_no_worktree_so_checkout_fails() {
    let dir = TempDir::new().unwrap();
    let repo = Repository::init(dir.path(), true).unwrap();
    assert!(repo.is_bare().unwrap());

    let err = repo
        .checkout(CheckoutTarget::Ref("HEAD"), CheckoutOptions::default())
        .unwrap_err();
    assert!(matches!(err, gitport::GitPortError::BareRepository));
}

#[test]
fn add_then_commit_then_status_round_trips() {
    let (dir, repo) = setup_repo();
    std::fs::write(dir.path().join("a.txt"), "hello\n").unwrap();

    repo.add(&["a.txt".to_owned()]).unwrap();
    let commit_oid = repo.commit("initial commit").unwrap();
    assert!(!commit_oid.is_zero());

    let status = repo.status().unwrap();
    assert!(status.is_empty(), "clean tree should report no status entries");

    std::fs::write(dir.path().join("a.txt"), "hello again\n").unwrap();
    let status = repo.status().unwrap();
    assert_eq!(status.len(), 1);
    assert_eq!(status[0].path, "a.txt");
    assert_eq!(status[0].status, gitport::git_backend::FileStatus::Modified);
}

#[test]
fn status_matrix_reports_untracked_then_staged_then_clean() {
    let (dir, repo) = setup_repo();
    std::fs::write(dir.path().join("a.txt"), "hello\n").unwrap();

    let rows = repo.status_matrix().unwrap();
    let row = rows.iter().find(|r| r.path == "a.txt").unwrap();
    assert_eq!((row.head, row.stage, row.workdir), (0, 0, 2));

    repo.add(&["a.txt".to_owned()]).unwrap();
    let rows = repo.status_matrix().unwrap();
    let row = rows.iter().find(|r| r.path == "a.txt").unwrap();
    assert_eq!(row.stage, 2, "staged but not yet in HEAD");

    repo.commit("add a.txt").unwrap();
    let rows = repo.status_matrix().unwrap();
    let row = rows.iter().find(|r| r.path == "a.txt").unwrap();
    assert_eq!((row.head, row.stage, row.workdir), (1, 1, 1));
}

#[test]
fn reset_hard_restores_the_working_directory() {
    let (dir, repo) = setup_repo();
    std::fs::write(dir.path().join("a.txt"), "v1\n").unwrap();
    repo.add(&["a.txt".to_owned()]).unwrap();
    let first = repo.commit("v1").unwrap();

    std::fs::write(dir.path().join("a.txt"), "v2\n").unwrap();
    repo.add(&["a.txt".to_owned()]).unwrap();
    repo.commit("v2").unwrap();

    repo.reset(ResetMode::Hard, Some(&first.to_string())).unwrap();
    let content = std::fs::read_to_string(dir.path().join("a.txt")).unwrap();
    assert_eq!(content, "v1\n");
}

#[cfg(unix)]
#[test]
fn reset_mixed_preserves_executable_mode_in_the_rebuilt_index() {
    use std::os::unix::fs::PermissionsExt as _;

    let (dir, repo) = setup_repo();
    let script_path = dir.path().join("run.sh");
    std::fs::write(&script_path, "#!/bin/sh\necho hi\n").unwrap();
    std::fs::set_permissions(&script_path, std::fs::Permissions::from_mode(0o755)).unwrap();
    repo.add(&["run.sh".to_owned()]).unwrap();
    repo.commit("add executable script").unwrap();

    repo.reset(ResetMode::Mixed, None).unwrap();

    let format = repo.get_object_format().unwrap();
    let bytes = std::fs::read(repo.get_gitdir().join("index")).unwrap();
    let entries = gitport::git_backend::index::parse_index(format, &bytes).unwrap();
    let entry = entries.iter().find(|e| e.path == "run.sh").unwrap();
    assert_eq!(entry.mode, gitport::git_backend::EntryMode::BlobExecutable);
}

#[test]
fn remote_without_a_transport_reports_no_transport() {
    let (_dir, repo) = setup_repo();
    repo.add_remote("origin", "https://example.invalid/repo.git", false)
        .unwrap();

    let err = repo.fetch("origin").unwrap_err();
    assert!(matches!(err, gitport::GitPortError::NoTransport { .. }));
}

#[test]
fn add_remote_twice_without_force_fails() {
    let (_dir, repo) = setup_repo();
    repo.add_remote("origin", "https://example.invalid/repo.git", false)
        .unwrap();
    let err = repo
        .add_remote("origin", "https://example.invalid/other.git", false)
        .unwrap_err();
    assert!(matches!(err, gitport::GitPortError::AlreadyExists { .. }));

    repo.add_remote("origin", "https://example.invalid/other.git", true)
        .unwrap();
    assert_eq!(repo.get_remote("origin").unwrap().url(), "https://example.invalid/other.git");
}

#[test]
fn expand_ref_finds_branches_by_short_name() {
    let (dir, repo) = setup_repo();
    std::fs::write(dir.path().join("a.txt"), "hello\n").unwrap();
    repo.add(&["a.txt".to_owned()]).unwrap();
    repo.commit("initial").unwrap();

    let expanded = repo.expand_ref("main").or_else(|_| repo.expand_ref("master"));
    assert!(expanded.is_ok(), "the default branch should expand from its short name");
}

/// A flattened, serializable snapshot of one `status_matrix` row, used to
/// stash expected fixtures as TOML rather than re-deriving them by hand.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug)]
struct StatusSnapshotRow {
    path: String,
    head: u8,
    stage: u8,
    workdir: u8,
}

/// TOML requires a table at the document root, so the row list is nested
/// under a named field rather than serialized bare.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug)]
struct StatusSnapshot {
    rows: Vec<StatusSnapshotRow>,
}

#[test]
fn status_matrix_snapshot_round_trips_through_toml() {
    let (dir, repo) = setup_repo();
    std::fs::write(dir.path().join("a.txt"), "hello\n").unwrap();
    repo.add(&["a.txt".to_owned()]).unwrap();
    repo.commit("initial").unwrap();

    let rows = StatusSnapshot {
        rows: repo
            .status_matrix()
            .unwrap()
            .into_iter()
            .map(|r| StatusSnapshotRow {
                path: r.path,
                head: r.head,
                stage: r.stage,
                workdir: r.workdir,
            })
            .collect(),
    };

    let snapshot = toml::to_string(&rows).expect("serialize status snapshot");
    let restored: StatusSnapshot = toml::from_str(&snapshot).expect("parse status snapshot");
    assert_eq!(rows, restored);
}
