//! The canonical Git index (v2) binary format: parser and serializer.
//!
//! [`crate::GitBackend::read_index`]/[`crate::GitBackend::write_index`] only
//! exchange opaque bytes; this module is where those bytes get a shape, so
//! the `checkout` and `stash` crates can work with [`IndexEntry`] values
//! without knowing the on-disk encoding.
//!
//! Ordering: the data model's design notes fix entries as sorted by
//! byte-wise path order before serialization — the source this spec was
//! distilled from depended on incidental map iteration order, which this
//! implementation does not replicate.

use sha1::{Digest as _, Sha1};
use sha2::Sha256;

use crate::error::GitError;
use crate::types::{EntryMode, GitOid, IndexEntry, ObjectFormat};

const SIGNATURE: &[u8; 4] = b"DIRC";
const VERSION: u32 = 2;

/// Parse canonical index-v2-format bytes into entries, sorted by path.
///
/// # Errors
/// Returns [`GitError::Internal`] if the header, an entry, or the trailing
/// checksum is malformed.
pub fn parse_index(format: ObjectFormat, bytes: &[u8]) -> Result<Vec<IndexEntry>, GitError> {
    if bytes.len() < 12 {
        return Err(GitError::Internal {
            reason: "index shorter than header".to_owned(),
        });
    }
    if &bytes[0..4] != SIGNATURE {
        return Err(GitError::Internal {
            reason: "index missing DIRC signature".to_owned(),
        });
    }
    let version = u32::from_be_bytes(bytes[4..8].try_into().expect("4 bytes"));
    if version != VERSION {
        return Err(GitError::Internal {
            reason: format!("unsupported index version {version}"),
        });
    }
    let entry_count = u32::from_be_bytes(bytes[8..12].try_into().expect("4 bytes"));

    let oid_len = format.byte_len();
    let checksum_len = oid_len;
    if bytes.len() < 12 + checksum_len {
        return Err(GitError::Internal {
            reason: "index shorter than trailer".to_owned(),
        });
    }

    let mut offset = 12;
    let mut entries = Vec::with_capacity(entry_count as usize);

    for _ in 0..entry_count {
        let entry_start = offset;
        if bytes.len() < offset + 62 - 20 + oid_len {
            return Err(GitError::Internal {
                reason: "index entry truncated".to_owned(),
            });
        }
        let ctime_sec = read_u32(bytes, offset);
        let _ctime_ns = read_u32(bytes, offset + 4);
        let mtime_sec = read_u32(bytes, offset + 8);
        let mtime_ns = read_u32(bytes, offset + 12);
        let _dev = read_u32(bytes, offset + 16);
        let _ino = read_u32(bytes, offset + 20);
        let mode_bits = read_u32(bytes, offset + 24);
        let _uid = read_u32(bytes, offset + 28);
        let _gid = read_u32(bytes, offset + 32);
        let size = read_u32(bytes, offset + 36);
        let oid_start = offset + 40;
        let oid = GitOid::from_bytes(format, &bytes[oid_start..oid_start + oid_len])?;
        let flags_start = oid_start + oid_len;
        let flags = u16::from_be_bytes(
            bytes[flags_start..flags_start + 2]
                .try_into()
                .expect("2 bytes"),
        );
        let stage = ((flags >> 12) & 0b11) as u8;
        let name_len = (flags & 0x0FFF) as usize;
        let extended = flags & 0x4000 != 0;
        let mut name_start = flags_start + 2;
        if extended {
            name_start += 2; // skip extended-flags field
        }
        let name_end = name_start + name_len;
        if bytes.len() < name_end {
            return Err(GitError::Internal {
                reason: "index entry name truncated".to_owned(),
            });
        }
        let path = std::str::from_utf8(&bytes[name_start..name_end])
            .map_err(|e| GitError::Internal {
                reason: format!("index entry path is not valid UTF-8: {e}"),
            })?
            .to_owned();

        // Entries are NUL-padded so the whole record is a multiple of 8
        // bytes relative to `entry_start`.
        let unpadded_len = name_end - entry_start;
        let padded_len = unpadded_len.div_ceil(8) * 8;
        offset = entry_start + padded_len;

        let mode = mode_from_bits(mode_bits)?;
        let _ = ctime_sec; // stat field kept for format fidelity only

        entries.push(IndexEntry {
            path,
            mode,
            oid,
            stage,
            size,
            mtime: (mtime_sec, mtime_ns),
        });
    }

    Ok(entries)
}

/// Serialize entries to canonical index-v2-format bytes. Entries are sorted
/// by byte-wise path order (and then by stage) before encoding, regardless
/// of input order.
#[must_use]
pub fn serialize_index(format: ObjectFormat, entries: &[IndexEntry]) -> Vec<u8> {
    let mut sorted: Vec<&IndexEntry> = entries.iter().collect();
    sorted.sort_by(|a, b| a.path.as_bytes().cmp(b.path.as_bytes()).then(a.stage.cmp(&b.stage)));

    let mut out = Vec::new();
    out.extend_from_slice(SIGNATURE);
    out.extend_from_slice(&VERSION.to_be_bytes());
    out.extend_from_slice(&(u32::try_from(sorted.len()).unwrap_or(u32::MAX)).to_be_bytes());

    for entry in sorted {
        let entry_start = out.len();
        out.extend_from_slice(&0u32.to_be_bytes()); // ctime sec
        out.extend_from_slice(&0u32.to_be_bytes()); // ctime ns
        out.extend_from_slice(&entry.mtime.0.to_be_bytes());
        out.extend_from_slice(&entry.mtime.1.to_be_bytes());
        out.extend_from_slice(&0u32.to_be_bytes()); // dev
        out.extend_from_slice(&0u32.to_be_bytes()); // ino
        out.extend_from_slice(&mode_to_bits(entry.mode).to_be_bytes());
        out.extend_from_slice(&0u32.to_be_bytes()); // uid
        out.extend_from_slice(&0u32.to_be_bytes()); // gid
        out.extend_from_slice(&entry.size.to_be_bytes());
        out.extend_from_slice(entry.oid.as_bytes());

        let name_bytes = entry.path.as_bytes();
        let name_len = name_bytes.len().min(0x0FFF) as u16;
        let flags = (u16::from(entry.stage) << 12) | name_len;
        out.extend_from_slice(&flags.to_be_bytes());
        out.extend_from_slice(name_bytes);

        let unpadded_len = out.len() - entry_start;
        let padded_len = unpadded_len.div_ceil(8) * 8;
        out.resize(entry_start + padded_len, 0);
    }

    let checksum = checksum_for(format, &out);
    out.extend_from_slice(&checksum);
    out
}

fn checksum_for(format: ObjectFormat, bytes: &[u8]) -> Vec<u8> {
    match format {
        ObjectFormat::Sha1 => Sha1::digest(bytes).to_vec(),
        ObjectFormat::Sha256 => Sha256::digest(bytes).to_vec(),
    }
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes(bytes[offset..offset + 4].try_into().expect("4 bytes"))
}

fn mode_from_bits(bits: u32) -> Result<EntryMode, GitError> {
    match bits {
        0o100644 => Ok(EntryMode::Blob),
        0o100755 => Ok(EntryMode::BlobExecutable),
        0o120000 => Ok(EntryMode::Link),
        0o160000 => Ok(EntryMode::Commit),
        other => Err(GitError::Internal {
            reason: format!("unrecognized index entry mode {other:o}"),
        }),
    }
}

fn mode_to_bits(mode: EntryMode) -> u32 {
    match mode {
        EntryMode::Blob => 0o100644,
        EntryMode::BlobExecutable => 0o100755,
        EntryMode::Link => 0o120000,
        EntryMode::Commit => 0o160000,
        // Trees never appear in the index; encode as a regular file so a
        // round trip still produces a well-formed (if semantically odd)
        // index rather than panicking.
        EntryMode::Tree => 0o100644,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oid(n: u8) -> GitOid {
        GitOid::from_sha1([n; 20])
    }

    #[test]
    fn empty_index_round_trips() {
        let bytes = serialize_index(ObjectFormat::Sha1, &[]);
        let parsed = parse_index(ObjectFormat::Sha1, &bytes).unwrap();
        assert!(parsed.is_empty());
    }

    #[test]
    fn entries_round_trip_sorted() {
        let entries = vec![
            IndexEntry::new("b.txt".to_owned(), EntryMode::Blob, oid(2)),
            IndexEntry::new("a.txt".to_owned(), EntryMode::BlobExecutable, oid(1)),
        ];
        let bytes = serialize_index(ObjectFormat::Sha1, &entries);
        let parsed = parse_index(ObjectFormat::Sha1, &bytes).unwrap();
        let paths: Vec<&str> = parsed.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["a.txt", "b.txt"]);
    }

    #[test]
    fn sha256_format_round_trips() {
        let entries = vec![IndexEntry::new(
            "dir/file".to_owned(),
            EntryMode::Blob,
            GitOid::from_sha256([7; 32]),
        )];
        let bytes = serialize_index(ObjectFormat::Sha256, &entries);
        let parsed = parse_index(ObjectFormat::Sha256, &bytes).unwrap();
        assert_eq!(parsed, entries);
    }

    #[test]
    fn unsorted_input_is_sorted_on_serialize() {
        let entries = vec![
            IndexEntry::new("z".to_owned(), EntryMode::Blob, oid(1)),
            IndexEntry::new("a".to_owned(), EntryMode::Blob, oid(2)),
            IndexEntry::new("m".to_owned(), EntryMode::Blob, oid(3)),
        ];
        let bytes = serialize_index(ObjectFormat::Sha1, &entries);
        let parsed = parse_index(ObjectFormat::Sha1, &bytes).unwrap();
        let paths: Vec<&str> = parsed.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["a", "m", "z"]);
    }
}
