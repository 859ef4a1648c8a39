//! [`RemoteBackend`]: the façade's contract for fetch/push/pull collaborators.
//!
//! Wire transports (smart HTTP, SSH, TCP) are explicitly out of scope for
//! this crate (spec.md §1 "Out of scope": "packfile wire protocol and
//! fetch/push transports"). [`Repository::get_remote`](crate::Repository::get_remote)
//! still needs a concrete type to return, so this trait is the seam a host
//! plugs a real transport into; [`NullRemote`] is the default, which
//! surfaces [`GitPortError::NoTransport`] from every network operation.

use crate::error::GitPortError;

/// A single configured remote, lazily resolved from `remote.<name>.url`
/// (spec.md §4.1 `get_remote`).
pub trait RemoteBackend {
    /// The remote's configured name.
    fn name(&self) -> &str;

    /// The remote's configured URL.
    fn url(&self) -> &str;

    /// Fetch refs/objects from this remote into the local object database.
    ///
    /// # Errors
    /// [`GitPortError::NoTransport`] unless a host supplies a transport-
    /// carrying implementation.
    fn fetch(&self) -> Result<(), GitPortError>;

    /// Push local refs/objects to this remote.
    ///
    /// # Errors
    /// [`GitPortError::NoTransport`] unless a host supplies a transport-
    /// carrying implementation.
    fn push(&self) -> Result<(), GitPortError>;
}

/// The default [`RemoteBackend`]: knows its name and URL (read from config)
/// but has no wire transport, so `fetch`/`push` always fail with
/// [`GitPortError::NoTransport`].
pub struct NullRemote {
    name: String,
    url: String,
}

impl NullRemote {
    pub(crate) fn new(name: String, url: String) -> Self {
        Self { name, url }
    }
}

impl RemoteBackend for NullRemote {
    fn name(&self) -> &str {
        &self.name
    }

    fn url(&self) -> &str {
        &self.url
    }

    fn fetch(&self) -> Result<(), GitPortError> {
        Err(GitPortError::NoTransport {
            name: self.name.clone(),
        })
    }

    fn push(&self) -> Result<(), GitPortError> {
        Err(GitPortError::NoTransport {
            name: self.name.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_remote_reports_no_transport() {
        let remote = NullRemote::new("origin".to_owned(), "https://example.invalid/repo.git".to_owned());
        assert_eq!(remote.name(), "origin");
        assert!(matches!(remote.fetch(), Err(GitPortError::NoTransport { .. })));
        assert!(matches!(remote.push(), Err(GitPortError::NoTransport { .. })));
    }
}
