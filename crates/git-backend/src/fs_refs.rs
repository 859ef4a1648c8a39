//! gix-backed ref, rev-parse, and ancestry operations for [`FsGitBackend`].

use crate::error::GitError;
use crate::fs_backend::FsGitBackend;
use crate::repo::GitBackend as _;
use crate::types::{GitOid, RefEdit, RefName, RefTarget};

pub(crate) fn to_gix_oid(oid: GitOid) -> gix::ObjectId {
    gix::ObjectId::from_bytes_or_panic(oid.as_bytes())
}

pub(crate) fn from_gix_oid(format: crate::types::ObjectFormat, oid: gix::ObjectId) -> GitOid {
    GitOid::from_bytes(format, oid.as_bytes()).unwrap_or_else(|_| GitOid::zero(format))
}

pub fn read_ref(repo: &FsGitBackend, name: &RefName) -> Result<Option<GitOid>, GitError> {
    let format = repo.object_format()?;
    let found = repo
        .repo
        .try_find_reference(name.as_str())
        .map_err(|e| GitError::Internal {
            reason: format!("reading ref '{name}': {e}"),
        })?;
    let Some(mut reference) = found else {
        return Ok(None);
    };
    let id = reference
        .peel_to_id_in_place()
        .map_err(|e| GitError::Internal {
            reason: format!("resolving ref '{name}': {e}"),
        })?;
    Ok(Some(from_gix_oid(format, id.detach())))
}

pub fn read_ref_target(repo: &FsGitBackend, name: &RefName) -> Result<Option<RefTarget>, GitError> {
    let format = repo.object_format()?;
    let found = repo
        .repo
        .try_find_reference(name.as_str())
        .map_err(|e| GitError::Internal {
            reason: format!("reading ref '{name}': {e}"),
        })?;
    let Some(reference) = found else {
        return Ok(None);
    };
    Ok(Some(match reference.target() {
        gix::refs::TargetRef::Object(id) => RefTarget::Direct(from_gix_oid(format, id.into())),
        gix::refs::TargetRef::Symbolic(full_name) => {
            RefTarget::Symbolic(RefName::new(full_name.as_bstr().to_string().as_str())?)
        }
    }))
}

pub fn write_ref(
    repo: &FsGitBackend,
    name: &RefName,
    oid: GitOid,
    log_message: &str,
) -> Result<(), GitError> {
    repo.repo
        .reference(
            name.as_str(),
            to_gix_oid(oid),
            gix::refs::transaction::PreviousValue::Any,
            log_message,
        )
        .map_err(|e| GitError::Internal {
            reason: format!("writing ref '{name}': {e}"),
        })?;
    Ok(())
}

pub fn write_symbolic_ref(
    repo: &FsGitBackend,
    name: &RefName,
    target: &RefName,
) -> Result<(), GitError> {
    use gix::refs::transaction::{Change, LogChange, RefEdit as GixRefEdit, RefLog};
    let full_target = gix::refs::FullName::try_from(target.as_str()).map_err(|e| {
        GitError::InvalidRefName {
            ref_name: target.as_str().to_owned(),
            suggestion: Some(e.to_string()),
        }
    })?;
    let edit = GixRefEdit {
        change: Change::Update {
            log: LogChange {
                mode: RefLog::AndReference,
                force_create_reflog: false,
                message: format!("checkout: {target}").into(),
            },
            expected: gix::refs::transaction::PreviousValue::Any,
            new: gix::refs::Target::Symbolic(full_target),
        },
        name: gix::refs::FullName::try_from(name.as_str()).map_err(|e| GitError::InvalidRefName {
            ref_name: name.as_str().to_owned(),
            suggestion: Some(e.to_string()),
        })?,
        deref: false,
    };
    repo.repo
        .edit_reference(edit)
        .map_err(|e| GitError::Internal {
            reason: format!("writing symbolic ref '{name}' -> '{target}': {e}"),
        })?;
    Ok(())
}

pub fn delete_ref(repo: &FsGitBackend, name: &RefName) -> Result<(), GitError> {
    if let Some(reference) = repo
        .repo
        .try_find_reference(name.as_str())
        .map_err(|e| GitError::Internal {
            reason: format!("reading ref '{name}' before delete: {e}"),
        })?
    {
        reference.delete().map_err(|e| GitError::Internal {
            reason: format!("deleting ref '{name}': {e}"),
        })?;
    }
    Ok(())
}

pub fn atomic_ref_update(repo: &FsGitBackend, edits: &[RefEdit]) -> Result<(), GitError> {
    use gix::refs::transaction::{Change, LogChange, PreviousValue, RefEdit as GixRefEdit, RefLog};

    let gix_edits: Vec<GixRefEdit> = edits
        .iter()
        .map(|edit| -> Result<GixRefEdit, GitError> {
            let expected = if edit.expected_old_oid.is_zero() {
                PreviousValue::MustNotExist
            } else {
                PreviousValue::MustExistAndMatch(gix::refs::Target::Object(to_gix_oid(
                    edit.expected_old_oid,
                )))
            };
            Ok(GixRefEdit {
                change: Change::Update {
                    log: LogChange {
                        mode: RefLog::AndReference,
                        force_create_reflog: false,
                        message: "atomic ref update".into(),
                    },
                    expected,
                    new: gix::refs::Target::Object(to_gix_oid(edit.new_oid)),
                },
                name: gix::refs::FullName::try_from(edit.name.as_str()).map_err(|e| {
                    GitError::InvalidRefName {
                        ref_name: edit.name.as_str().to_owned(),
                        suggestion: Some(e.to_string()),
                    }
                })?,
                deref: false,
            })
        })
        .collect::<Result<_, _>>()?;

    repo.repo
        .edit_references(gix_edits)
        .map_err(|e| GitError::NotFound {
            what: format!("atomic ref update failed (CAS mismatch or missing ref): {e}"),
        })?;
    Ok(())
}

pub fn list_refs(repo: &FsGitBackend, prefix: &str) -> Result<Vec<(RefName, GitOid)>, GitError> {
    let format = repo.object_format()?;
    let platform = repo.repo.references().map_err(|e| GitError::Internal {
        reason: format!("listing refs: {e}"),
    })?;
    let iter = platform
        .prefixed(prefix)
        .map_err(|e| GitError::Internal {
            reason: format!("listing refs under '{prefix}': {e}"),
        })?;

    let mut out = Vec::new();
    for result in iter {
        let mut reference = result.map_err(|e| GitError::Internal {
            reason: format!("iterating refs: {e}"),
        })?;
        let name = RefName::new(reference.name().as_bstr().to_string().as_str())?;
        let id = reference
            .peel_to_id_in_place()
            .map_err(|e| GitError::Internal {
                reason: format!("resolving ref '{name}': {e}"),
            })?;
        out.push((name, from_gix_oid(format, id.detach())));
    }
    out.sort_by(|a, b| a.0.as_str().cmp(b.0.as_str()));
    Ok(out)
}

pub fn rev_parse(repo: &FsGitBackend, spec: &str) -> Result<GitOid, GitError> {
    let format = repo.object_format()?;
    let id = repo
        .repo
        .rev_parse_single(spec)
        .map_err(|e| GitError::NotFound {
            what: format!("revision '{spec}': {e}"),
        })?;
    Ok(from_gix_oid(format, id.detach()))
}

pub fn rev_parse_opt(repo: &FsGitBackend, spec: &str) -> Result<Option<GitOid>, GitError> {
    match rev_parse(repo, spec) {
        Ok(oid) => Ok(Some(oid)),
        Err(GitError::NotFound { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

pub fn is_ancestor(repo: &FsGitBackend, ancestor: GitOid, descendant: GitOid) -> Result<bool, GitError> {
    Ok(merge_base(repo, ancestor, descendant)?.is_some_and(|base| base == ancestor))
}

pub fn merge_base(repo: &FsGitBackend, a: GitOid, b: GitOid) -> Result<Option<GitOid>, GitError> {
    let format = repo.object_format()?;
    let a_id = to_gix_oid(a);
    let b_id = to_gix_oid(b);
    let mut cache = repo.repo.commit_graph_if_enabled().ok().flatten();
    let _ = &mut cache;
    match repo.repo.merge_base(a_id, b_id) {
        Ok(id) => Ok(Some(from_gix_oid(format, id.detach()))),
        Err(gix::repository::merge_base::Error::NotFound { .. }) => Ok(None),
        Err(e) => Err(GitError::Internal {
            reason: format!("computing merge base of {a} and {b}: {e}"),
        }),
    }
}
