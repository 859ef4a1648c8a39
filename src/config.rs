//! [`RepoConfig`]: the façade's read/write config view (spec.md §4.1
//! `get_config`). `git_backend::GitBackend`'s own `get_config`/`set_config`
//! family already performs the four-scope merge (system < global < local <
//! worktree, spec.md §3 "Configuration"), so this is a thin, dotted-path
//! wrapper rather than a second merge implementation.

use std::rc::Rc;

use git_backend::{ConfigScope, GitBackend};

use crate::error::GitPortError;

/// A merged, scope-aware view over a repository's configuration.
#[derive(Clone)]
pub struct RepoConfig {
    git: Rc<dyn GitBackend>,
}

impl RepoConfig {
    pub(crate) fn new(git: Rc<dyn GitBackend>) -> Self {
        Self { git }
    }

    /// The highest-precedence value for a dotted path (`"core.bare"`,
    /// `"remote.origin.url"`), or `None` if unset in any scope.
    ///
    /// # Errors
    /// Propagates [`git_backend::GitError`] from the underlying read.
    pub fn get(&self, path: &str) -> Result<Option<String>, GitPortError> {
        Ok(self.git.get_config(path)?)
    }

    /// Every value for a multi-valued key, local then worktree scope, in
    /// insertion order.
    ///
    /// # Errors
    /// Propagates [`git_backend::GitError`] from the underlying read.
    pub fn get_all(&self, path: &str) -> Result<Vec<String>, GitPortError> {
        Ok(self.git.get_all_config(path)?)
    }

    /// Set a value in the given scope; `append` adds another value for a
    /// multi-valued key instead of replacing it.
    ///
    /// # Errors
    /// Propagates [`git_backend::GitError`] from the underlying write.
    pub fn set(
        &self,
        path: &str,
        value: &str,
        scope: ConfigScope,
        append: bool,
    ) -> Result<(), GitPortError> {
        Ok(self.git.set_config(path, value, scope, append)?)
    }

    /// Distinct subsection names under a section (e.g. every configured
    /// remote name under `remote`).
    ///
    /// # Errors
    /// Propagates [`git_backend::GitError`] from the underlying read.
    pub fn subsections(&self, section: &str) -> Result<Vec<String>, GitPortError> {
        Ok(self.git.get_config_subsections(section)?)
    }

    /// Distinct section names present in the merged config.
    ///
    /// # Errors
    /// Propagates [`git_backend::GitError`] from the underlying read.
    pub fn sections(&self) -> Result<Vec<String>, GitPortError> {
        Ok(self.git.get_config_sections()?)
    }

    /// Re-read all config scopes from storage, discarding any cached view.
    ///
    /// # Errors
    /// Propagates [`git_backend::GitError`] from the underlying read.
    pub fn reload(&self) -> Result<(), GitPortError> {
        Ok(self.git.reload_config()?)
    }
}
