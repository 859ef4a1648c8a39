//! `.gitmodules` parsing: submodules are recorded as a blob at the tree root
//! using the same INI-ish grammar as config files, so this reuses
//! `crate::config::ConfigFile` rather than a bespoke parser.

use crate::config::ConfigFile;
use crate::error::GitError;
use crate::fs_backend::FsGitBackend;
use crate::fs_objects::read_tree;
use crate::repo::GitBackend as _;
use crate::types::{EntryMode, GitOid, ObjectForm, SubmoduleMeta};

pub fn list_submodules(repo: &FsGitBackend, tree: GitOid) -> Result<Vec<SubmoduleMeta>, GitError> {
    let entries = read_tree(repo, tree)?;
    let Some(entry) = entries
        .iter()
        .find(|e| e.name == ".gitmodules" && matches!(e.mode, EntryMode::Blob | EntryMode::BlobExecutable))
    else {
        return Ok(Vec::new());
    };

    let data = repo.read_object(entry.oid, ObjectForm::ContentOnly)?;
    let text = std::str::from_utf8(&data.bytes).map_err(|e| GitError::Internal {
        reason: format!(".gitmodules is not valid UTF-8: {e}"),
    })?;
    let config = ConfigFile::parse(text);

    let mut out = Vec::new();
    for name in config.subsections("submodule") {
        let path = config
            .get_path("submodule", Some(&name), "path")
            .into_iter()
            .next_back()
            .unwrap_or_default()
            .to_owned();
        let url = config
            .get_path("submodule", Some(&name), "url")
            .into_iter()
            .next_back()
            .unwrap_or_default()
            .to_owned();
        out.push(SubmoduleMeta { name, path, url });
    }
    out.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(out)
}
