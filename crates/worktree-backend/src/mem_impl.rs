//! [`InMemoryWorktreeBackend`]: a [`WorktreeBackend`] over an in-memory file
//! tree, used for hosts with no real filesystem (browser, sandboxed
//! embedders) and for fast tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::error::WorktreeError;
use crate::repo::WorktreeBackend;
use crate::types::{normalize, DirEntry, FileMode, Metadata, ResolvedPath};

#[derive(Clone, Debug)]
enum Node {
    File { contents: Vec<u8>, executable: bool },
    Symlink { target: String },
    Dir,
}

/// The in-memory [`WorktreeBackend`]. Directories are implicit: any prefix
/// of a file path is considered a directory, plus any path explicitly
/// created via [`mkdir`](WorktreeBackend::mkdir).
pub struct InMemoryWorktreeBackend {
    synthetic_root: PathBuf,
    nodes: Mutex<HashMap<String, Node>>,
    submodules: Mutex<HashMap<String, Arc<dyn WorktreeBackend>>>,
}

impl InMemoryWorktreeBackend {
    /// Build an empty backend. `label` becomes the synthetic root path
    /// returned by [`WorktreeBackend::root`].
    #[must_use]
    pub fn new(label: &str) -> Self {
        Self {
            synthetic_root: PathBuf::from(format!("memory://{label}")),
            nodes: Mutex::new(HashMap::new()),
            submodules: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Node>>, WorktreeError> {
        self.nodes.lock().map_err(|_| WorktreeError::Internal {
            reason: "in-memory worktree lock poisoned".to_owned(),
        })
    }

    fn is_under(path: &str, dir: &str) -> bool {
        if dir.is_empty() {
            return !path.is_empty();
        }
        path.strip_prefix(dir).is_some_and(|rest| rest.starts_with('/'))
    }
}

impl Default for InMemoryWorktreeBackend {
    fn default() -> Self {
        Self::new("default")
    }
}

impl WorktreeBackend for InMemoryWorktreeBackend {
    fn root(&self) -> &Path {
        &self.synthetic_root
    }

    fn resolve_path(&self, path: &str) -> Result<ResolvedPath, WorktreeError> {
        let normalized = normalize(path);
        let submodules = self
            .submodules
            .lock()
            .map_err(|_| WorktreeError::Internal {
                reason: "submodule registry lock poisoned".to_owned(),
            })?;
        for (sub_path, backend) in submodules.iter() {
            if normalized == *sub_path {
                return Ok(ResolvedPath::Submodule {
                    backend: Arc::clone(backend),
                    submodule_path: sub_path.clone(),
                    relative_path: String::new(),
                });
            }
            if let Some(rest) = normalized.strip_prefix(&format!("{sub_path}/")) {
                return Ok(ResolvedPath::Submodule {
                    backend: Arc::clone(backend),
                    submodule_path: sub_path.clone(),
                    relative_path: rest.to_owned(),
                });
            }
        }
        Ok(ResolvedPath::Local {
            relative_path: normalized,
        })
    }

    fn register_submodule(&self, path: &str, backend: Arc<dyn WorktreeBackend>) {
        if let Ok(mut submodules) = self.submodules.lock() {
            submodules.insert(normalize(path), backend);
        }
    }

    fn read(&self, path: &str) -> Result<Option<Vec<u8>>, WorktreeError> {
        let nodes = self.lock()?;
        Ok(match nodes.get(&normalize(path)) {
            Some(Node::File { contents, .. }) => Some(contents.clone()),
            _ => None,
        })
    }

    fn write(&self, path: &str, contents: &[u8], mode: FileMode) -> Result<(), WorktreeError> {
        let key = normalize(path);
        let mut nodes = self.lock()?;
        nodes.insert(
            key,
            Node::File {
                contents: contents.to_vec(),
                executable: matches!(mode, FileMode::Executable),
            },
        );
        Ok(())
    }

    fn mkdir(&self, path: &str) -> Result<(), WorktreeError> {
        let key = normalize(path);
        if key.is_empty() {
            return Ok(());
        }
        self.lock()?.insert(key, Node::Dir);
        Ok(())
    }

    fn rmdir(&self, path: &str) -> Result<(), WorktreeError> {
        let key = normalize(path);
        let mut nodes = self.lock()?;
        nodes.retain(|p, _| *p != key && !Self::is_under(p, &key));
        Ok(())
    }

    fn rm(&self, path: &str) -> Result<(), WorktreeError> {
        self.lock()?.remove(&normalize(path));
        Ok(())
    }

    fn readdir(&self, path: &str) -> Result<Vec<DirEntry>, WorktreeError> {
        let dir = normalize(path);
        let nodes = self.lock()?;
        let mut seen = HashMap::new();
        for (p, node) in nodes.iter() {
            if !Self::is_under(p, &dir) {
                continue;
            }
            let rest = if dir.is_empty() { p.as_str() } else { &p[dir.len() + 1..] };
            let name = rest.split('/').next().unwrap_or(rest);
            let is_nested = rest.contains('/');
            let is_dir = is_nested || matches!(node, Node::Dir);
            let is_symlink = !is_nested && matches!(node, Node::Symlink { .. });
            seen.insert(name.to_owned(), (is_dir, is_symlink));
        }
        Ok(seen
            .into_iter()
            .map(|(name, (is_dir, is_symlink))| DirEntry {
                name,
                is_dir,
                is_symlink,
            })
            .collect())
    }

    fn readdir_deep(&self, path: &str) -> Result<Vec<String>, WorktreeError> {
        let dir = normalize(path);
        let nodes = self.lock()?;
        Ok(nodes
            .iter()
            .filter(|(p, node)| {
                matches!(node, Node::File { .. } | Node::Symlink { .. })
                    && (dir.is_empty() || Self::is_under(p, &dir) || **p == dir)
            })
            .map(|(p, _)| p.clone())
            .collect())
    }

    fn stat(&self, path: &str) -> Result<Option<Metadata>, WorktreeError> {
        let key = normalize(path);
        let nodes = self.lock()?;
        match nodes.get(&key) {
            Some(Node::File { contents, executable }) => Ok(Some(Metadata {
                is_file: true,
                is_dir: false,
                is_symlink: false,
                len: contents.len() as u64,
                mtime: (0, 0),
                executable: *executable,
            })),
            Some(Node::Symlink { target }) => {
                // `stat` follows the link; resolve one hop within this tree.
                drop(nodes);
                self.stat(target)
            }
            Some(Node::Dir) => Ok(Some(Metadata {
                is_file: false,
                is_dir: true,
                is_symlink: false,
                len: 0,
                mtime: (0, 0),
                executable: false,
            })),
            None => Ok(None),
        }
    }

    fn lstat(&self, path: &str) -> Result<Option<Metadata>, WorktreeError> {
        let nodes = self.lock()?;
        Ok(match nodes.get(&normalize(path)) {
            Some(Node::File { contents, executable }) => Some(Metadata {
                is_file: true,
                is_dir: false,
                is_symlink: false,
                len: contents.len() as u64,
                mtime: (0, 0),
                executable: *executable,
            }),
            Some(Node::Symlink { target }) => Some(Metadata {
                is_file: false,
                is_dir: false,
                is_symlink: true,
                len: target.len() as u64,
                mtime: (0, 0),
                executable: false,
            }),
            Some(Node::Dir) => Some(Metadata {
                is_file: false,
                is_dir: true,
                is_symlink: false,
                len: 0,
                mtime: (0, 0),
                executable: false,
            }),
            None => None,
        })
    }

    fn read_link(&self, path: &str) -> Result<Option<String>, WorktreeError> {
        let nodes = self.lock()?;
        Ok(match nodes.get(&normalize(path)) {
            Some(Node::Symlink { target }) => Some(target.clone()),
            _ => None,
        })
    }

    fn write_link(&self, path: &str, target: &str) -> Result<(), WorktreeError> {
        self.lock()?.insert(
            normalize(path),
            Node::Symlink {
                target: target.to_owned(),
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_round_trips() {
        let backend = InMemoryWorktreeBackend::default();
        backend.write("a.txt", b"hello", FileMode::Regular).unwrap();
        assert_eq!(backend.read("a.txt").unwrap(), Some(b"hello".to_vec()));
    }

    #[test]
    fn rmdir_removes_nested_files() {
        let backend = InMemoryWorktreeBackend::default();
        backend.write("dir/a.txt", b"x", FileMode::Regular).unwrap();
        backend.write("dir/b.txt", b"y", FileMode::Regular).unwrap();
        backend.rmdir("dir").unwrap();
        assert_eq!(backend.read("dir/a.txt").unwrap(), None);
        assert_eq!(backend.read("dir/b.txt").unwrap(), None);
    }

    #[test]
    fn readdir_deep_lists_files_only() {
        let backend = InMemoryWorktreeBackend::default();
        backend.write("dir/a.txt", b"x", FileMode::Regular).unwrap();
        backend.mkdir("dir/empty").unwrap();
        let mut files = backend.readdir_deep("").unwrap();
        files.sort();
        assert_eq!(files, vec!["dir/a.txt".to_owned()]);
    }

    #[test]
    fn symlink_round_trips() {
        let backend = InMemoryWorktreeBackend::default();
        backend.write_link("link", "target.txt").unwrap();
        assert_eq!(backend.read_link("link").unwrap(), Some("target.txt".to_owned()));
        let meta = backend.lstat("link").unwrap().unwrap();
        assert!(meta.is_symlink);
    }

    #[test]
    fn readdir_lists_immediate_children_only() {
        let backend = InMemoryWorktreeBackend::default();
        backend.write("a.txt", b"1", FileMode::Regular).unwrap();
        backend.write("dir/b.txt", b"2", FileMode::Regular).unwrap();
        let mut names: Vec<String> = backend.readdir("").unwrap().into_iter().map(|e| e.name).collect();
        names.sort();
        assert_eq!(names, vec!["a.txt".to_owned(), "dir".to_owned()]);
    }
}
