//! [`FsWorktreeBackend`]: the default [`WorktreeBackend`] implementation,
//! operating over a real working directory on disk.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::UNIX_EPOCH;

use crate::error::WorktreeError;
use crate::repo::WorktreeBackend;
use crate::types::{normalize, DirEntry, FileMode, Metadata, ResolvedPath};

/// The filesystem-backed [`WorktreeBackend`].
pub struct FsWorktreeBackend {
    root: PathBuf,
    submodules: Mutex<HashMap<String, Arc<dyn WorktreeBackend>>>,
}

impl FsWorktreeBackend {
    /// Build a backend rooted at `root`. Does not require `root` to already
    /// exist.
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            submodules: Mutex::new(HashMap::new()),
        }
    }

    fn abs(&self, relative: &str) -> PathBuf {
        if relative.is_empty() {
            self.root.clone()
        } else {
            self.root.join(relative)
        }
    }
}

impl WorktreeBackend for FsWorktreeBackend {
    fn root(&self) -> &Path {
        &self.root
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
        match fs::read(self.abs(&normalize(path))) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, path: &str, contents: &[u8], mode: FileMode) -> Result<(), WorktreeError> {
        let abs = self.abs(&normalize(path));
        if abs.is_symlink() || abs.is_dir() {
            let _ = fs::remove_file(&abs).or_else(|_| fs::remove_dir_all(&abs));
        }
        fs::write(&abs, contents)?;
        set_executable(&abs, matches!(mode, FileMode::Executable))?;
        Ok(())
    }

    fn mkdir(&self, path: &str) -> Result<(), WorktreeError> {
        fs::create_dir_all(self.abs(&normalize(path)))?;
        Ok(())
    }

    fn rmdir(&self, path: &str) -> Result<(), WorktreeError> {
        match fs::remove_dir_all(self.abs(&normalize(path))) {
            Ok(()) | Err(_) if !self.abs(&normalize(path)).exists() => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn rm(&self, path: &str) -> Result<(), WorktreeError> {
        let abs = self.abs(&normalize(path));
        match fs::remove_file(&abs) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn readdir(&self, path: &str) -> Result<Vec<DirEntry>, WorktreeError> {
        let abs = self.abs(&normalize(path));
        let Ok(read_dir) = fs::read_dir(&abs) else {
            return Ok(Vec::new());
        };
        let mut out = Vec::new();
        for entry in read_dir {
            let entry = entry?;
            let meta = entry.metadata()?;
            out.push(DirEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                is_dir: meta.is_dir(),
                is_symlink: entry.path().is_symlink(),
            });
        }
        Ok(out)
    }

    fn readdir_deep(&self, path: &str) -> Result<Vec<String>, WorktreeError> {
        let normalized = normalize(path);
        let mut out = Vec::new();
        walk(&self.root, &self.abs(&normalized), &mut out)?;
        Ok(out)
    }

    fn stat(&self, path: &str) -> Result<Option<Metadata>, WorktreeError> {
        match fs::metadata(self.abs(&normalize(path))) {
            Ok(meta) => Ok(Some(to_metadata(&meta, false))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn lstat(&self, path: &str) -> Result<Option<Metadata>, WorktreeError> {
        match fs::symlink_metadata(self.abs(&normalize(path))) {
            Ok(meta) => Ok(Some(to_metadata(&meta, meta.is_symlink()))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn read_link(&self, path: &str) -> Result<Option<String>, WorktreeError> {
        match fs::read_link(self.abs(&normalize(path))) {
            Ok(target) => Ok(Some(target.to_string_lossy().into_owned())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(_) => Ok(None),
        }
    }

    fn write_link(&self, path: &str, target: &str) -> Result<(), WorktreeError> {
        let abs = self.abs(&normalize(path));
        if abs.exists() || abs.is_symlink() {
            let _ = fs::remove_file(&abs).or_else(|_| fs::remove_dir_all(&abs));
        }
        symlink(target, &abs).map_err(|_| WorktreeError::SymlinkUnsupported {
            path: path.to_owned(),
        })
    }
}

fn walk(root: &Path, dir: &Path, out: &mut Vec<String>) -> Result<(), WorktreeError> {
    let Ok(read_dir) = fs::read_dir(dir) else {
        return Ok(());
    };
    for entry in read_dir {
        let entry = entry?;
        let path = entry.path();
        if path.is_symlink() || path.is_file() {
            if let Ok(rel) = path.strip_prefix(root) {
                out.push(rel.to_string_lossy().replace('\\', "/"));
            }
        } else if path.is_dir() {
            walk(root, &path, out)?;
        }
    }
    Ok(())
}

fn to_metadata(meta: &fs::Metadata, is_symlink: bool) -> Metadata {
    let mtime = meta
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map_or((0, 0), |d| (d.as_secs() as u32, d.subsec_nanos()));
    Metadata {
        is_file: meta.is_file(),
        is_dir: meta.is_dir(),
        is_symlink,
        len: meta.len(),
        mtime,
        executable: is_executable(meta),
    }
}

#[cfg(unix)]
fn is_executable(meta: &fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt as _;
    meta.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_meta: &fs::Metadata) -> bool {
    false
}

#[cfg(unix)]
fn set_executable(path: &Path, executable: bool) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt as _;
    let mut perms = fs::metadata(path)?.permissions();
    let mode = if executable { 0o755 } else { 0o644 };
    perms.set_mode(mode);
    fs::set_permissions(path, perms)
}

#[cfg(not(unix))]
fn set_executable(_path: &Path, _executable: bool) -> std::io::Result<()> {
    Ok(())
}

#[cfg(unix)]
fn symlink(target: &str, link: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(not(unix))]
fn symlink(_target: &str, _link: &Path) -> std::io::Result<()> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "symlinks unsupported on this platform",
    ))
}
