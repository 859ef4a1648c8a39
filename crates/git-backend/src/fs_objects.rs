//! gix-backed object read/write and tree-editing operations for
//! [`FsGitBackend`]. Follows the same gix-delegation shape as `fs_refs.rs`;
//! semantic (de)serialization of commit/tree/tag headers lives in
//! `crate::objects` so it stays independent of gix's own object types.

use crate::error::GitError;
use crate::fs_backend::FsGitBackend;
use crate::fs_refs::{from_gix_oid, to_gix_oid};
use crate::repo::GitBackend as _;
use crate::types::{
    CommitInfo, EntryMode, GitOid, ObjectData, ObjectForm, ObjectKind, RefName, TreeEdit,
    TreeEntry,
};

fn from_gix_entry_mode(mode: gix::objs::tree::EntryMode) -> EntryMode {
    match mode.kind() {
        gix::objs::tree::EntryKind::Tree => EntryMode::Tree,
        gix::objs::tree::EntryKind::Blob => EntryMode::Blob,
        gix::objs::tree::EntryKind::BlobExecutable => EntryMode::BlobExecutable,
        gix::objs::tree::EntryKind::Link => EntryMode::Link,
        gix::objs::tree::EntryKind::Commit => EntryMode::Commit,
    }
}

fn to_gix_entry_kind(mode: EntryMode) -> gix::objs::tree::EntryKind {
    match mode {
        EntryMode::Blob => gix::objs::tree::EntryKind::Blob,
        EntryMode::BlobExecutable => gix::objs::tree::EntryKind::BlobExecutable,
        EntryMode::Tree => gix::objs::tree::EntryKind::Tree,
        EntryMode::Link => gix::objs::tree::EntryKind::Link,
        EntryMode::Commit => gix::objs::tree::EntryKind::Commit,
    }
}

pub fn read_object(repo: &FsGitBackend, oid: GitOid, form: ObjectForm) -> Result<ObjectData, GitError> {
    let gix_oid = to_gix_oid(oid);
    let object = repo
        .repo
        .find_object(gix_oid)
        .map_err(|e| GitError::NotFound {
            what: format!("object {oid}: {e}"),
        })?;

    let kind = match object.kind {
        gix::object::Kind::Commit => ObjectKind::Commit,
        gix::object::Kind::Tree => ObjectKind::Tree,
        gix::object::Kind::Blob => ObjectKind::Blob,
        gix::object::Kind::Tag => ObjectKind::Tag,
    };

    let bytes = match form {
        ObjectForm::ContentOnly => object.data.clone(),
        ObjectForm::Raw => {
            let mut out = format!("{} {}\0", kind.as_str(), object.data.len()).into_bytes();
            out.extend_from_slice(&object.data);
            out
        }
        ObjectForm::Wrapped => {
            use std::io::Write as _;
            let mut header = format!("{} {}\0", kind.as_str(), object.data.len()).into_bytes();
            header.extend_from_slice(&object.data);
            let mut encoder =
                flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
            encoder.write_all(&header).map_err(GitError::Io)?;
            encoder.finish().map_err(GitError::Io)?
        }
    };

    Ok(ObjectData { kind, bytes })
}

pub fn write_object(repo: &FsGitBackend, kind: ObjectKind, content: &[u8]) -> Result<GitOid, GitError> {
    let gix_kind = match kind {
        ObjectKind::Commit => gix::object::Kind::Commit,
        ObjectKind::Tree => gix::object::Kind::Tree,
        ObjectKind::Blob => gix::object::Kind::Blob,
        ObjectKind::Tag => gix::object::Kind::Tag,
    };
    let id = repo
        .repo
        .write_object_if_new(gix_kind, content)
        .or_else(|_| repo.repo.write_blob(content))
        .map_err(|e| GitError::Internal {
            reason: format!("failed to write {} object: {e}", kind.as_str()),
        })?;
    Ok(from_gix_oid(repo.object_format()?, id.detach()))
}

pub fn read_tree(repo: &FsGitBackend, oid: GitOid) -> Result<Vec<TreeEntry>, GitError> {
    let format = repo.object_format()?;
    let gix_oid = to_gix_oid(oid);
    let tree = repo
        .repo
        .find_tree(gix_oid)
        .map_err(|e| GitError::NotFound {
            what: format!("tree {oid}: {e}"),
        })?;

    let mut entries = Vec::new();
    for result in tree.iter() {
        let entry = result.map_err(|e| GitError::Internal {
            reason: format!("failed to decode tree entry: {e}"),
        })?;
        entries.push(TreeEntry {
            name: entry.inner.filename.to_string(),
            mode: from_gix_entry_mode(entry.inner.mode),
            oid: from_gix_oid(format, entry.inner.oid),
        });
    }
    Ok(entries)
}

pub fn write_tree(repo: &FsGitBackend, entries: &[TreeEntry]) -> Result<GitOid, GitError> {
    let format = repo.object_format()?;
    let tree = gix::objs::Tree {
        entries: entries
            .iter()
            .map(|e| gix::objs::tree::Entry {
                mode: to_gix_entry_kind(e.mode).into(),
                filename: e.name.as_str().into(),
                oid: to_gix_oid(e.oid),
            })
            .collect(),
    };
    let id = repo
        .repo
        .write_object(&tree)
        .map_err(|e| GitError::Internal {
            reason: format!("failed to write tree: {e}"),
        })?;
    Ok(from_gix_oid(format, id.detach()))
}

pub fn read_commit(repo: &FsGitBackend, oid: GitOid) -> Result<CommitInfo, GitError> {
    let format = repo.object_format()?;
    let gix_oid = to_gix_oid(oid);
    let commit = repo
        .repo
        .find_commit(gix_oid)
        .map_err(|e| GitError::NotFound {
            what: format!("commit {oid}: {e}"),
        })?;

    let decoded = commit.decode().map_err(|e| GitError::Internal {
        reason: format!("failed to decode commit {oid}: {e}"),
    })?;

    let tree_oid = from_gix_oid(format, decoded.tree());
    let parents = decoded.parents().map(|id| from_gix_oid(format, id)).collect();
    let message = decoded.message.to_string();

    let author_sig = decoded.author();
    let committer_sig = decoded.committer();
    let author = format!("{} <{}>", author_sig.name, author_sig.email);
    let committer = format!("{} <{}>", committer_sig.name, committer_sig.email);

    Ok(CommitInfo {
        tree_oid,
        parents,
        message,
        author,
        committer,
    })
}

pub fn create_commit(
    repo: &FsGitBackend,
    tree: GitOid,
    parents: &[GitOid],
    message: &str,
    update_ref: Option<&RefName>,
) -> Result<GitOid, GitError> {
    let format = repo.object_format()?;
    let tree_oid = to_gix_oid(tree);
    let parent_oids: Vec<gix::ObjectId> = parents.iter().map(|p| to_gix_oid(*p)).collect();

    let author_sig = repo
        .repo
        .author()
        .ok_or_else(|| GitError::MissingName)?
        .map_err(|e| GitError::Internal {
            reason: format!("failed to read author identity: {e}"),
        })?;

    let committer_sig = repo
        .repo
        .committer()
        .ok_or_else(|| GitError::MissingName)?
        .map_err(|e| GitError::Internal {
            reason: format!("failed to read committer identity: {e}"),
        })?;

    match update_ref {
        Some(ref_name) => {
            let id = repo
                .repo
                .commit_as(
                    committer_sig,
                    author_sig,
                    ref_name.as_str(),
                    message,
                    tree_oid,
                    parent_oids,
                )
                .map_err(|e| GitError::Internal {
                    reason: format!("failed to create commit: {e}"),
                })?;
            Ok(from_gix_oid(format, id.detach()))
        }
        None => {
            let commit = gix::objs::Commit {
                message: message.into(),
                tree: tree_oid,
                author: author_sig.into(),
                committer: committer_sig.into(),
                encoding: None,
                parents: parent_oids.into_iter().collect(),
                extra_headers: Vec::new(),
            };
            let id = repo
                .repo
                .write_object(&commit)
                .map_err(|e| GitError::Internal {
                    reason: format!("failed to write commit object: {e}"),
                })?;
            Ok(from_gix_oid(format, id.detach()))
        }
    }
}

pub fn edit_tree(repo: &FsGitBackend, base: GitOid, edits: &[TreeEdit]) -> Result<GitOid, GitError> {
    let format = repo.object_format()?;
    let gix_oid = to_gix_oid(base);
    let tree = repo
        .repo
        .find_tree(gix_oid)
        .map_err(|e| GitError::NotFound {
            what: format!("base tree {base}: {e}"),
        })?;

    let mut editor = tree.edit().map_err(|e| GitError::Internal {
        reason: format!("failed to create tree editor: {e}"),
    })?;

    for edit in edits {
        match edit {
            TreeEdit::Upsert { path, mode, oid } => {
                let kind = to_gix_entry_kind(*mode);
                let gix_oid = to_gix_oid(*oid);
                editor
                    .upsert(path.as_str(), kind, gix_oid)
                    .map_err(|e| GitError::Internal {
                        reason: format!("tree edit upsert '{path}': {e}"),
                    })?;
            }
            TreeEdit::Remove { path } => {
                editor.remove(path.as_str()).map_err(|e| GitError::Internal {
                    reason: format!("tree edit remove '{path}': {e}"),
                })?;
            }
        }
    }

    let new_id = editor.write().map_err(|e| GitError::Internal {
        reason: format!("failed to write edited tree: {e}"),
    })?;
    Ok(from_gix_oid(format, new_id.detach()))
}
