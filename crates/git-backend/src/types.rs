//! Core value types for the git abstraction layer.
//!
//! These types form the vocabulary shared between the [`GitBackend`](crate::GitBackend)
//! trait and every crate built on top of it. They contain no gix (or libgit2)
//! types — the storage engine is an implementation detail confined to
//! [`crate::fs_backend`].

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// ObjectFormat
// ---------------------------------------------------------------------------

/// The hash algorithm a repository's object database is keyed by.
///
/// Repository-wide and discoverable from `extensions.objectFormat`
/// (defaults to [`ObjectFormat::Sha1`] when unset).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ObjectFormat {
    /// 20-byte / 40-hex-char SHA-1, the historical default.
    Sha1,
    /// 32-byte / 64-hex-char SHA-256.
    Sha256,
}

impl ObjectFormat {
    /// Number of raw bytes an OID occupies under this format.
    #[must_use]
    pub const fn byte_len(self) -> usize {
        match self {
            Self::Sha1 => 20,
            Self::Sha256 => 32,
        }
    }

    /// Number of hex characters an OID's text form occupies under this format.
    #[must_use]
    pub const fn hex_len(self) -> usize {
        self.byte_len() * 2
    }

    /// Infer the format implied by a hex string's length.
    #[must_use]
    pub const fn from_hex_len(len: usize) -> Option<Self> {
        match len {
            40 => Some(Self::Sha1),
            64 => Some(Self::Sha256),
            _ => None,
        }
    }
}

impl fmt::Display for ObjectFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
        })
    }
}

// ---------------------------------------------------------------------------
// GitOid
// ---------------------------------------------------------------------------

/// A git object identifier: SHA-1 (20 bytes) or SHA-256 (32 bytes).
///
/// Backed by a fixed 32-byte buffer so the type stays `Copy`; only the first
/// `format.byte_len()` bytes are meaningful.
#[derive(Clone, Copy, Eq)]
pub struct GitOid {
    format: ObjectFormat,
    bytes: [u8; 32],
}

impl GitOid {
    /// The zero OID under the given format — used as a sentinel for "ref does
    /// not exist" in compare-and-swap ref updates.
    #[must_use]
    pub const fn zero(format: ObjectFormat) -> Self {
        Self {
            format,
            bytes: [0; 32],
        }
    }

    /// Build a SHA-1 `GitOid` from its 20 raw bytes.
    #[must_use]
    pub const fn from_sha1(bytes: [u8; 20]) -> Self {
        let mut full = [0u8; 32];
        let mut i = 0;
        while i < 20 {
            full[i] = bytes[i];
            i += 1;
        }
        Self {
            format: ObjectFormat::Sha1,
            bytes: full,
        }
    }

    /// Build a SHA-256 `GitOid` from its 32 raw bytes.
    #[must_use]
    pub const fn from_sha256(bytes: [u8; 32]) -> Self {
        Self {
            format: ObjectFormat::Sha256,
            bytes,
        }
    }

    /// Build a `GitOid` from a byte slice, inferring the format from its length.
    pub fn from_bytes(format: ObjectFormat, bytes: &[u8]) -> Result<Self, OidParseError> {
        if bytes.len() != format.byte_len() {
            return Err(OidParseError {
                value: format!("{bytes:?}"),
                reason: format!(
                    "expected {} bytes for {format}, got {}",
                    format.byte_len(),
                    bytes.len()
                ),
            });
        }
        let mut full = [0u8; 32];
        full[..bytes.len()].copy_from_slice(bytes);
        Ok(Self {
            format,
            bytes: full,
        })
    }

    /// The hash algorithm this OID was computed under.
    #[must_use]
    pub const fn format(&self) -> ObjectFormat {
        self.format
    }

    /// The valid byte slice (20 or 32 bytes depending on format).
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.format.byte_len()]
    }

    /// `true` if every valid byte is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.as_bytes().iter().all(|b| *b == 0)
    }
}

impl PartialEq for GitOid {
    fn eq(&self, other: &Self) -> bool {
        self.format == other.format && self.as_bytes() == other.as_bytes()
    }
}

impl std::hash::Hash for GitOid {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.format.hash(state);
        self.as_bytes().hash(state);
    }
}

impl PartialOrd for GitOid {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for GitOid {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.format as u8, self.as_bytes()).cmp(&(other.format as u8, other.as_bytes()))
    }
}

impl fmt::Display for GitOid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.as_bytes() {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for GitOid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GitOid({self})")
    }
}

impl FromStr for GitOid {
    type Err = OidParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let format = ObjectFormat::from_hex_len(s.len()).ok_or_else(|| OidParseError {
            value: s.to_owned(),
            reason: format!(
                "expected 40 (sha1) or 64 (sha256) hex characters, got {}",
                s.len()
            ),
        })?;
        let mut bytes = [0u8; 32];
        for (i, chunk) in s.as_bytes().chunks(2).enumerate() {
            let hi = hex_digit(chunk[0]).ok_or_else(|| OidParseError {
                value: s.to_owned(),
                reason: format!("invalid hex digit '{}'", chunk[0] as char),
            })?;
            let lo = hex_digit(chunk[1]).ok_or_else(|| OidParseError {
                value: s.to_owned(),
                reason: format!("invalid hex digit '{}'", chunk[1] as char),
            })?;
            bytes[i] = (hi << 4) | lo;
        }
        Ok(Self { format, bytes })
    }
}

/// Error from parsing a hex string into a [`GitOid`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OidParseError {
    /// The raw value that failed.
    pub value: String,
    /// Why it failed.
    pub reason: String,
}

impl fmt::Display for OidParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid OID {:?}: {}", self.value, self.reason)
    }
}

impl std::error::Error for OidParseError {}

fn hex_digit(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// RefName
// ---------------------------------------------------------------------------

/// A validated git ref name.
///
/// Must start with `refs/` or be one of the well-known bare names (`HEAD`,
/// `FETCH_HEAD`, `MERGE_HEAD`, etc.).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RefName(String);

/// Well-known bare ref names that don't start with `refs/`.
const BARE_REFS: &[&str] = &["HEAD", "FETCH_HEAD", "MERGE_HEAD", "ORIG_HEAD", "CHERRY_PICK_HEAD"];

impl RefName {
    /// Create a new `RefName`, validating that it looks like a git ref.
    ///
    /// # Errors
    /// Returns an error if the name is empty, doesn't start with `refs/`,
    /// and isn't a well-known bare ref.
    pub fn new(name: &str) -> Result<Self, RefNameError> {
        Self::validate(name)?;
        Ok(Self(name.to_owned()))
    }

    /// Return the ref name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `true` if this is one of the well-known bare refs (`HEAD`, ...).
    #[must_use]
    pub fn is_bare(&self) -> bool {
        BARE_REFS.contains(&self.0.as_str())
    }

    fn validate(name: &str) -> Result<(), RefNameError> {
        if name.is_empty() {
            return Err(RefNameError {
                value: name.to_owned(),
                reason: "ref name must not be empty".to_owned(),
            });
        }
        if name.starts_with("refs/") || BARE_REFS.contains(&name) {
            Ok(())
        } else {
            Err(RefNameError {
                value: name.to_owned(),
                reason: "ref name must start with 'refs/' or be a well-known ref (HEAD, etc.)"
                    .to_owned(),
            })
        }
    }
}

impl fmt::Display for RefName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RefName {
    type Err = RefNameError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Error from validating a [`RefName`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RefNameError {
    /// The invalid value.
    pub value: String,
    /// Why it was rejected.
    pub reason: String,
}

impl fmt::Display for RefNameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid ref name {:?}: {}", self.value, self.reason)
    }
}

impl std::error::Error for RefNameError {}

/// The value a ref resolves to: either a direct OID or a symbolic pointer to
/// another ref name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RefTarget {
    /// A direct reference to an object.
    Direct(GitOid),
    /// A symbolic reference to another ref name (e.g. `HEAD` -> `refs/heads/main`).
    Symbolic(RefName),
}

// ---------------------------------------------------------------------------
// RefEdit
// ---------------------------------------------------------------------------

/// A single ref update for use in atomic ref transactions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RefEdit {
    /// The ref to update.
    pub name: RefName,
    /// The new OID to set the ref to.
    pub new_oid: GitOid,
    /// The expected current OID (for CAS). Use a zero OID to assert that the
    /// ref must not already exist.
    pub expected_old_oid: GitOid,
}

// ---------------------------------------------------------------------------
// Object kinds / opaque object data
// ---------------------------------------------------------------------------

/// The four object kinds the object database stores.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    /// A commit object.
    Commit,
    /// A tree object.
    Tree,
    /// A blob (file content) object.
    Blob,
    /// An annotated tag object.
    Tag,
}

impl ObjectKind {
    /// The lowercase type name as it appears in the loose-object header
    /// (`"<type> <len>\0"`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Commit => "commit",
            Self::Tree => "tree",
            Self::Blob => "blob",
            Self::Tag => "tag",
        }
    }
}

impl FromStr for ObjectKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "commit" => Ok(Self::Commit),
            "tree" => Ok(Self::Tree),
            "blob" => Ok(Self::Blob),
            "tag" => Ok(Self::Tag),
            other => Err(format!("unknown object kind '{other}'")),
        }
    }
}

/// Which representation [`GitBackend::read_object`](crate::GitBackend::read_object)
/// should return.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ObjectForm {
    /// The raw loose-object bytes (`"<type> <len>\0<content>"`).
    Raw,
    /// The zlib-wrapped on-disk representation.
    Wrapped,
    /// Only the object's content, with the type/length header stripped.
    ContentOnly,
}

/// An object read back from the object database.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectData {
    /// The object's kind.
    pub kind: ObjectKind,
    /// The bytes, in the form requested by the caller.
    pub bytes: Vec<u8>,
}

// ---------------------------------------------------------------------------
// Tree types
// ---------------------------------------------------------------------------

/// The file mode of a tree entry (analogous to `git ls-tree` mode column).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntryMode {
    /// Regular file (`100644`).
    Blob,
    /// Executable file (`100755`).
    BlobExecutable,
    /// Subdirectory (`040000`).
    Tree,
    /// Symbolic link (`120000`).
    Link,
    /// Gitlink / submodule (`160000`).
    Commit,
}

impl EntryMode {
    /// The octal mode string as it appears in tree object encoding.
    #[must_use]
    pub const fn as_octal_str(self) -> &'static str {
        match self {
            Self::Blob => "100644",
            Self::BlobExecutable => "100755",
            Self::Tree => "40000",
            Self::Link => "120000",
            Self::Commit => "160000",
        }
    }

    /// Parse a tree-entry mode from its octal string form.
    #[must_use]
    pub fn from_octal_str(s: &str) -> Option<Self> {
        match s {
            "100644" | "644" => Some(Self::Blob),
            "100755" | "755" => Some(Self::BlobExecutable),
            "40000" | "040000" => Some(Self::Tree),
            "120000" => Some(Self::Link),
            "160000" => Some(Self::Commit),
            _ => None,
        }
    }
}

/// A single entry in a git tree object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeEntry {
    /// File or directory name (just the basename, not a full path).
    pub name: String,
    /// The entry mode.
    pub mode: EntryMode,
    /// The OID of the blob, tree, or commit this entry points to.
    pub oid: GitOid,
}

/// An edit operation on a tree, used to build a new tree from an existing one
/// by inserting, updating, or removing entries at arbitrary (possibly nested)
/// paths.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TreeEdit {
    /// Insert or update an entry. Intermediate trees are created automatically.
    Upsert {
        /// Slash-separated path relative to tree root (e.g., `"src/main.rs"`).
        path: String,
        /// File mode for the entry.
        mode: EntryMode,
        /// OID of the object to store at this path.
        oid: GitOid,
    },
    /// Remove an entry. No-op if the path does not exist.
    Remove {
        /// Slash-separated path relative to tree root.
        path: String,
    },
}

// ---------------------------------------------------------------------------
// Diff types
// ---------------------------------------------------------------------------

/// The kind of change detected between two trees.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChangeType {
    /// File was added.
    Added,
    /// File content or mode was modified.
    Modified,
    /// File was deleted.
    Deleted,
    /// File was renamed (may also be modified).
    Renamed {
        /// The original path before the rename.
        from: String,
    },
}

/// A single file-level change between two trees.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiffEntry {
    /// Path of the file (in the new tree, or the old tree for deletions).
    pub path: String,
    /// What kind of change occurred.
    pub change_type: ChangeType,
    /// OID of the old blob (zero OID for additions).
    pub old_oid: GitOid,
    /// OID of the new blob (zero OID for deletions).
    pub new_oid: GitOid,
    /// File mode in the old tree.
    pub old_mode: Option<EntryMode>,
    /// File mode in the new tree.
    pub new_mode: Option<EntryMode>,
}

// ---------------------------------------------------------------------------
// Status types
// ---------------------------------------------------------------------------

/// The status of a single file in the working tree relative to HEAD.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FileStatus {
    /// File content differs from HEAD.
    Modified,
    /// File is tracked in the index but not in HEAD.
    Added,
    /// File is in HEAD but missing from the working tree.
    Deleted,
    /// File exists in the working tree but is not tracked.
    Untracked,
    /// File was renamed.
    Renamed,
}

/// A single status entry, pairing a file path with its status.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusEntry {
    /// Path relative to the repository root.
    pub path: String,
    /// The status of the file.
    pub status: FileStatus,
}

// ---------------------------------------------------------------------------
// Index types
// ---------------------------------------------------------------------------

/// A single entry in the git index (staging area).
///
/// Stage 0 is the normal case; stages 1/2/3 hold unmerged base/ours/theirs
/// content during a conflicted merge. At most one stage-0 entry exists per
/// path, and a path has either a stage-0 entry or stage 1-3 entries, never
/// both.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexEntry {
    /// Path relative to the repository root, forward-slash separated.
    pub path: String,
    /// The file mode.
    pub mode: EntryMode,
    /// OID of the blob recorded in the index.
    pub oid: GitOid,
    /// Merge stage: 0 for normal entries, 1-3 for unmerged base/ours/theirs.
    pub stage: u8,
    /// Cached file size from the last stat, if known.
    pub size: u32,
    /// Cached modification time (seconds, nanoseconds) from the last stat.
    pub mtime: (u32, u32),
}

impl IndexEntry {
    /// Build a fresh stage-0 entry with zeroed stat info (used when the
    /// underlying file was not actually stat'd, e.g. gitlinks).
    #[must_use]
    pub fn new(path: String, mode: EntryMode, oid: GitOid) -> Self {
        Self {
            path,
            mode,
            oid,
            stage: 0,
            size: 0,
            mtime: (0, 0),
        }
    }
}

// ---------------------------------------------------------------------------
// Worktree types
// ---------------------------------------------------------------------------

/// Information about a git worktree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorktreeInfo {
    /// The worktree name (for linked worktrees) or `"main"` for the main worktree.
    pub name: String,
    /// Absolute path to the worktree root directory.
    pub path: PathBuf,
    /// The OID that HEAD points to in this worktree.
    pub head_oid: Option<GitOid>,
    /// `true` if HEAD is detached (not on a branch).
    pub is_detached: bool,
}

// ---------------------------------------------------------------------------
// Commit / tag types
// ---------------------------------------------------------------------------

/// Information about a commit object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitInfo {
    /// OID of the tree this commit points to.
    pub tree_oid: GitOid,
    /// OIDs of parent commits (empty for root commits).
    pub parents: Vec<GitOid>,
    /// The commit message.
    pub message: String,
    /// Author identity string (e.g., `"Alice <alice@example.com> 1700000000 +0000"`).
    pub author: String,
    /// Committer identity string, same shape as `author`.
    pub committer: String,
}

/// Information about an annotated tag object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagInfo {
    /// OID of the object the tag points to.
    pub target_oid: GitOid,
    /// Kind of the tagged object.
    pub target_kind: ObjectKind,
    /// The tag name (without `refs/tags/` prefix).
    pub tag_name: String,
    /// Tagger identity string.
    pub tagger: String,
    /// The tag message.
    pub message: String,
}

// ---------------------------------------------------------------------------
// Submodule types
// ---------------------------------------------------------------------------

/// A single `.gitmodules` entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmoduleMeta {
    /// The subsection name in `.gitmodules` (`submodule.<name>`).
    pub name: String,
    /// Worktree-relative path of the submodule (gitlink location).
    pub path: String,
    /// The configured remote URL.
    pub url: String,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
