use tempfile::TempDir;

use git_backend::{
    ChangeType, EntryMode, FsGitBackend, GitBackend, GitOid, ObjectForm, ObjectKind, RefEdit,
    RefName, TreeEdit, TreeEntry,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn setup_repo() -> (TempDir, FsGitBackend) {
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
    let repo = FsGitBackend::open(dir.path()).unwrap();
    (dir, repo)
}

/// Create an initial commit with a single file so HEAD exists.
fn setup_repo_with_commit() -> (TempDir, FsGitBackend, GitOid, GitOid) {
    let (dir, repo) = setup_repo();
    let blob_oid = repo.write_object(ObjectKind::Blob, b"hello world\n").unwrap();
    let tree_oid = repo
        .write_tree(&[TreeEntry {
            name: "hello.txt".to_string(),
            mode: EntryMode::Blob,
            oid: blob_oid,
        }])
        .unwrap();
    let head_ref = RefName::new("refs/heads/main").unwrap();
    let commit_oid = repo
        .create_commit(tree_oid, &[], "initial commit", Some(&head_ref))
        .unwrap();
    std::process::Command::new("git")
        .args(["symbolic-ref", "HEAD", "refs/heads/main"])
        .current_dir(dir.path())
        .output()
        .unwrap();
    (dir, repo, commit_oid, tree_oid)
}

// ===========================================================================
// 1. Basic repo operations
// ===========================================================================

#[test]
fn open_repo() {
    let (_dir, _repo) = setup_repo();
}

#[test]
fn rev_parse_head() {
    let (_dir, repo, commit_oid, _tree_oid) = setup_repo_with_commit();
    let parsed = repo.rev_parse("HEAD").unwrap();
    assert_eq!(parsed, commit_oid);
}

#[test]
fn rev_parse_opt_missing() {
    let (_dir, repo) = setup_repo();
    let result = repo.rev_parse_opt("HEAD").unwrap();
    assert!(result.is_none());
}

#[test]
fn blob_roundtrip() {
    let (_dir, repo) = setup_repo();
    let data = b"some blob content";
    let oid = repo.write_object(ObjectKind::Blob, data).unwrap();
    let read_back = repo.read_object(oid, ObjectForm::ContentOnly).unwrap();
    assert_eq!(read_back.bytes, data);
    assert_eq!(read_back.kind, ObjectKind::Blob);
}

#[test]
fn tree_roundtrip() {
    let (_dir, repo) = setup_repo();
    let blob_oid = repo.write_object(ObjectKind::Blob, b"content").unwrap();
    let entries = vec![TreeEntry {
        name: "file.txt".to_string(),
        mode: EntryMode::Blob,
        oid: blob_oid,
    }];
    let tree_oid = repo.write_tree(&entries).unwrap();
    let read_back = repo.read_tree(tree_oid).unwrap();
    assert_eq!(read_back.len(), 1);
    assert_eq!(read_back[0].name, "file.txt");
    assert_eq!(read_back[0].mode, EntryMode::Blob);
    assert_eq!(read_back[0].oid, blob_oid);
}

#[test]
fn commit_roundtrip() {
    let (_dir, repo, commit_oid, tree_oid) = setup_repo_with_commit();
    let info = repo.read_commit(commit_oid).unwrap();
    assert_eq!(info.tree_oid, tree_oid);
    assert!(info.parents.is_empty());
    assert_eq!(info.message, "initial commit");
    assert!(info.author.contains("Test User"));
}

// ===========================================================================
// 2. Ref operations
// ===========================================================================

#[test]
fn write_read_ref_roundtrip() {
    let (_dir, repo, commit_oid, _) = setup_repo_with_commit();
    let refname = RefName::new("refs/heads/feature").unwrap();
    repo.write_ref(&refname, commit_oid, "create feature branch")
        .unwrap();
    let read_back = repo.read_ref(&refname).unwrap();
    assert_eq!(read_back, Some(commit_oid));
}

#[test]
fn read_ref_nonexistent() {
    let (_dir, repo) = setup_repo();
    let refname = RefName::new("refs/heads/nope").unwrap();
    let result = repo.read_ref(&refname).unwrap();
    assert_eq!(result, None);
}

#[test]
fn delete_ref() {
    let (_dir, repo, commit_oid, _) = setup_repo_with_commit();
    let refname = RefName::new("refs/heads/to-delete").unwrap();
    repo.write_ref(&refname, commit_oid, "temp").unwrap();
    assert!(repo.read_ref(&refname).unwrap().is_some());
    repo.delete_ref(&refname).unwrap();
    assert!(repo.read_ref(&refname).unwrap().is_none());
}

#[test]
fn list_refs_with_prefix() {
    let (_dir, repo, commit_oid, _) = setup_repo_with_commit();
    let r1 = RefName::new("refs/heads/alpha").unwrap();
    let r2 = RefName::new("refs/heads/beta").unwrap();
    let r3 = RefName::new("refs/tags/v1").unwrap();
    repo.write_ref(&r1, commit_oid, "a").unwrap();
    repo.write_ref(&r2, commit_oid, "b").unwrap();
    repo.write_ref(&r3, commit_oid, "t").unwrap();
    let heads = repo.list_refs("refs/heads/").unwrap();
    let head_names: Vec<&str> = heads.iter().map(|(r, _)| r.as_str()).collect();
    assert!(head_names.contains(&"refs/heads/alpha"));
    assert!(head_names.contains(&"refs/heads/beta"));
    assert!(head_names.contains(&"refs/heads/main"));
    assert!(!head_names.contains(&"refs/tags/v1"));
}

#[test]
fn atomic_ref_update_success() {
    let (_dir, repo, commit_oid, _) = setup_repo_with_commit();
    let format = repo.object_format().unwrap();
    let refname = RefName::new("refs/heads/atomic-test").unwrap();
    let edits = vec![RefEdit {
        name: refname.clone(),
        new_oid: commit_oid,
        expected_old_oid: GitOid::zero(format),
    }];
    repo.atomic_ref_update(&edits).unwrap();
    assert_eq!(repo.read_ref(&refname).unwrap(), Some(commit_oid));
}

// ===========================================================================
// 3. Object operations
// ===========================================================================

#[test]
fn write_tree_multiple_entries() {
    let (_dir, repo) = setup_repo();
    let b1 = repo.write_object(ObjectKind::Blob, b"aaa").unwrap();
    let b2 = repo.write_object(ObjectKind::Blob, b"bbb").unwrap();
    let entries = vec![
        TreeEntry {
            name: "a.txt".to_string(),
            mode: EntryMode::Blob,
            oid: b1,
        },
        TreeEntry {
            name: "b.txt".to_string(),
            mode: EntryMode::Blob,
            oid: b2,
        },
    ];
    let tree_oid = repo.write_tree(&entries).unwrap();
    let read_back = repo.read_tree(tree_oid).unwrap();
    assert_eq!(read_back.len(), 2);
    let names: Vec<&str> = read_back.iter().map(|e| e.name.as_str()).collect();
    assert!(names.contains(&"a.txt"));
    assert!(names.contains(&"b.txt"));
}

#[test]
fn edit_tree_add_entry() {
    let (_dir, repo, _, tree_oid) = setup_repo_with_commit();
    let new_blob = repo.write_object(ObjectKind::Blob, b"new file").unwrap();
    let new_tree = repo
        .edit_tree(
            tree_oid,
            &[TreeEdit::Upsert {
                path: "new.txt".to_string(),
                mode: EntryMode::Blob,
                oid: new_blob,
            }],
        )
        .unwrap();
    let entries = repo.read_tree(new_tree).unwrap();
    let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
    assert!(names.contains(&"hello.txt"));
    assert!(names.contains(&"new.txt"));
}

#[test]
fn edit_tree_modify_entry() {
    let (_dir, repo, _, tree_oid) = setup_repo_with_commit();
    let updated_blob = repo.write_object(ObjectKind::Blob, b"updated content").unwrap();
    let new_tree = repo
        .edit_tree(
            tree_oid,
            &[TreeEdit::Upsert {
                path: "hello.txt".to_string(),
                mode: EntryMode::Blob,
                oid: updated_blob,
            }],
        )
        .unwrap();
    let entries = repo.read_tree(new_tree).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].oid, updated_blob);
}

#[test]
fn edit_tree_remove_entry() {
    let (_dir, repo, _, tree_oid) = setup_repo_with_commit();
    let new_tree = repo
        .edit_tree(
            tree_oid,
            &[TreeEdit::Remove {
                path: "hello.txt".to_string(),
            }],
        )
        .unwrap();
    let entries = repo.read_tree(new_tree).unwrap();
    assert!(entries.is_empty());
}

#[test]
fn create_commit_with_parent() {
    let (_dir, repo, first_commit, _) = setup_repo_with_commit();
    let blob = repo.write_object(ObjectKind::Blob, b"second").unwrap();
    let tree = repo
        .write_tree(&[TreeEntry {
            name: "second.txt".to_string(),
            mode: EntryMode::Blob,
            oid: blob,
        }])
        .unwrap();
    let head_ref = RefName::new("refs/heads/main").unwrap();
    let second_commit = repo
        .create_commit(tree, &[first_commit], "second commit", Some(&head_ref))
        .unwrap();
    let info = repo.read_commit(second_commit).unwrap();
    assert_eq!(info.parents, vec![first_commit]);
    assert_eq!(info.message, "second commit");
}

// ===========================================================================
// 4. Index
// ===========================================================================

#[test]
fn read_index_fresh_repo() {
    let (_dir, repo) = setup_repo();
    let format = repo.object_format().unwrap();
    let bytes = repo.read_index().unwrap();
    let entries = git_backend::index::parse_index(format, &bytes).unwrap();
    assert!(entries.is_empty());
}

#[test]
fn write_read_index_roundtrip() {
    let (_dir, repo) = setup_repo();
    let format = repo.object_format().unwrap();
    let blob_oid = repo.write_object(ObjectKind::Blob, b"indexed content").unwrap();
    let entries = vec![git_backend::IndexEntry::new(
        "indexed.txt".to_string(),
        EntryMode::Blob,
        blob_oid,
    )];
    repo.write_index(&git_backend::index::serialize_index(format, &entries))
        .unwrap();
    let bytes = repo.read_index().unwrap();
    let read_back = git_backend::index::parse_index(format, &bytes).unwrap();
    assert_eq!(read_back.len(), 1);
    assert_eq!(read_back[0].path, "indexed.txt");
    assert_eq!(read_back[0].oid, blob_oid);
}

// ===========================================================================
// 5. Diff
// ===========================================================================

#[test]
fn diff_trees_shows_changes() {
    let (_dir, repo, _, tree1) = setup_repo_with_commit();
    let new_blob = repo.write_object(ObjectKind::Blob, b"changed\n").unwrap();
    let tree2 = repo
        .write_tree(&[TreeEntry {
            name: "hello.txt".to_string(),
            mode: EntryMode::Blob,
            oid: new_blob,
        }])
        .unwrap();
    let diff = repo.diff_trees(Some(tree1), tree2).unwrap();
    assert!(!diff.is_empty());
    let entry = diff.iter().find(|e| e.path == "hello.txt").unwrap();
    assert_eq!(entry.change_type, ChangeType::Modified);
}

#[test]
fn diff_trees_addition() {
    let (_dir, repo) = setup_repo();
    let empty_tree = repo.write_tree(&[]).unwrap();
    let blob = repo.write_object(ObjectKind::Blob, b"new").unwrap();
    let tree_with_file = repo
        .write_tree(&[TreeEntry {
            name: "added.txt".to_string(),
            mode: EntryMode::Blob,
            oid: blob,
        }])
        .unwrap();
    let diff = repo.diff_trees(Some(empty_tree), tree_with_file).unwrap();
    assert_eq!(diff.len(), 1);
    assert_eq!(diff[0].path, "added.txt");
    assert_eq!(diff[0].change_type, ChangeType::Added);
}

#[test]
fn diff_trees_deletion() {
    let (_dir, repo, _, tree1) = setup_repo_with_commit();
    let empty_tree = repo.write_tree(&[]).unwrap();
    let diff = repo.diff_trees(Some(tree1), empty_tree).unwrap();
    assert_eq!(diff.len(), 1);
    assert_eq!(diff[0].path, "hello.txt");
    assert_eq!(diff[0].change_type, ChangeType::Deleted);
}

#[test]
fn diff_trees_none_as_old() {
    let (_dir, repo, _, tree_oid) = setup_repo_with_commit();
    let diff = repo.diff_trees(None, tree_oid).unwrap();
    assert_eq!(diff.len(), 1);
    assert_eq!(diff[0].path, "hello.txt");
    assert_eq!(diff[0].change_type, ChangeType::Added);
}

// ===========================================================================
// 6. Config
// ===========================================================================

#[test]
fn write_read_config_roundtrip() {
    let (dir, repo) = setup_repo();
    repo.set_config("test.mykey", "myvalue", git_backend::ConfigScope::Local, false)
        .unwrap();
    let repo = FsGitBackend::open(dir.path()).unwrap();
    let val = repo.get_config("test.mykey").unwrap();
    assert_eq!(val.as_deref(), Some("myvalue"));
}

#[test]
fn read_config_nonexistent() {
    let (_dir, repo) = setup_repo();
    let val = repo.get_config("test.no-such-key").unwrap();
    assert_eq!(val, None);
}

// ===========================================================================
// 7. Worktree lifecycle (gitdir metadata only — working-directory checkout
// is the `checkout` crate's responsibility)
// ===========================================================================

#[test]
fn worktree_add_list_remove() {
    let (dir, repo, commit_oid, _) = setup_repo_with_commit();
    let wt_path = dir.path().join("wt-test");

    repo.worktree_add("wt-test", commit_oid, &wt_path).unwrap();
    assert!(wt_path.exists(), "worktree directory should exist");

    let list = repo.worktree_list().unwrap();
    let names: Vec<&str> = list.iter().map(|w| w.name.as_str()).collect();
    assert!(
        names.contains(&"wt-test"),
        "worktree_list should include 'wt-test', got: {names:?}"
    );

    repo.worktree_remove("wt-test").unwrap();
    let list_after = repo.worktree_list().unwrap();
    let names_after: Vec<&str> = list_after.iter().map(|w| w.name.as_str()).collect();
    assert!(
        !names_after.contains(&"wt-test"),
        "worktree_list should not include 'wt-test' after removal"
    );
}

// ===========================================================================
// 8. Ancestry
// ===========================================================================

#[test]
fn is_ancestor_parent_of_child() {
    let (_dir, repo, first_commit, _) = setup_repo_with_commit();
    let blob = repo.write_object(ObjectKind::Blob, b"child").unwrap();
    let tree = repo
        .write_tree(&[TreeEntry {
            name: "child.txt".to_string(),
            mode: EntryMode::Blob,
            oid: blob,
        }])
        .unwrap();
    let child_commit = repo
        .create_commit(tree, &[first_commit], "child commit", None)
        .unwrap();

    assert!(repo.is_ancestor(first_commit, child_commit).unwrap());
}

#[test]
fn is_ancestor_child_not_ancestor_of_parent() {
    let (_dir, repo, first_commit, _) = setup_repo_with_commit();
    let blob = repo.write_object(ObjectKind::Blob, b"child").unwrap();
    let tree = repo
        .write_tree(&[TreeEntry {
            name: "child.txt".to_string(),
            mode: EntryMode::Blob,
            oid: blob,
        }])
        .unwrap();
    let child_commit = repo
        .create_commit(tree, &[first_commit], "child commit", None)
        .unwrap();

    assert!(!repo.is_ancestor(child_commit, first_commit).unwrap());
}

#[test]
fn merge_base_of_divergent_branches() {
    let (_dir, repo, root_commit, _) = setup_repo_with_commit();
    let blob_a = repo.write_object(ObjectKind::Blob, b"branch a").unwrap();
    let tree_a = repo
        .write_tree(&[TreeEntry {
            name: "a.txt".to_string(),
            mode: EntryMode::Blob,
            oid: blob_a,
        }])
        .unwrap();
    let commit_a = repo
        .create_commit(tree_a, &[root_commit], "branch a", None)
        .unwrap();

    let blob_b = repo.write_object(ObjectKind::Blob, b"branch b").unwrap();
    let tree_b = repo
        .write_tree(&[TreeEntry {
            name: "b.txt".to_string(),
            mode: EntryMode::Blob,
            oid: blob_b,
        }])
        .unwrap();
    let commit_b = repo
        .create_commit(tree_b, &[root_commit], "branch b", None)
        .unwrap();

    let base = repo.merge_base(commit_a, commit_b).unwrap();
    assert_eq!(base, Some(root_commit));
}

#[test]
fn merge_base_same_commit() {
    let (_dir, repo, commit_oid, _) = setup_repo_with_commit();
    let base = repo.merge_base(commit_oid, commit_oid).unwrap();
    assert_eq!(base, Some(commit_oid));
}
