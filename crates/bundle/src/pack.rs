//! Packfile framing: the `PACK` magic, object count, and a sequence of
//! type+size headers each followed by zlib-compressed content (spec.md §6
//! "packfile starting with PACK").
//!
//! Object storage and delta compression are the `GitBackend` ODB's concern
//! (spec.md §3 "Object kinds"); this module only frames whatever object
//! bytes the caller already has. Per the packfile Open Question recorded in
//! `DESIGN.md`, every object entry here is non-deltified — each is its own
//! zlib stream, with no `OFS_DELTA`/`REF_DELTA` base reference — which keeps
//! the format bit-valid PACK v2 while staying independent of the ODB's
//! internal delta representation.

use std::io::{Read as _, Write as _};

use git_backend::{ObjectFormat, ObjectKind};
use sha1::{Digest as _, Sha1};
use sha2::Sha256;

use crate::error::BundleError;

const PACK_MAGIC: &[u8; 4] = b"PACK";
const PACK_VERSION: u32 = 2;

fn type_code(kind: ObjectKind) -> u8 {
    match kind {
        ObjectKind::Commit => 1,
        ObjectKind::Tree => 2,
        ObjectKind::Blob => 3,
        ObjectKind::Tag => 4,
    }
}

fn kind_from_code(code: u8) -> Result<ObjectKind, BundleError> {
    match code {
        1 => Ok(ObjectKind::Commit),
        2 => Ok(ObjectKind::Tree),
        3 => Ok(ObjectKind::Blob),
        4 => Ok(ObjectKind::Tag),
        other => Err(BundleError::UnknownObjectType { code: other }),
    }
}

/// Encode a pack object header: a continuation-bit varint carrying the 3-bit
/// type code in its first byte and the size in 4-then-7-bit groups.
fn encode_header(kind: ObjectKind, size: usize) -> Vec<u8> {
    let mut out = Vec::new();
    let mut rest = size >> 4;
    let mut byte = (type_code(kind) << 4) | u8::try_from(size & 0x0f).unwrap_or(0);
    while rest > 0 {
        out.push(byte | 0x80);
        byte = u8::try_from(rest & 0x7f).unwrap_or(0);
        rest >>= 7;
    }
    out.push(byte);
    out
}

/// Decode one pack object header starting at `bytes[0]`, returning the
/// type, the declared decompressed size, and the number of bytes consumed.
fn decode_header(bytes: &[u8]) -> Result<(ObjectKind, usize, usize), BundleError> {
    let first = *bytes.first().ok_or_else(|| BundleError::CorruptPack {
        reason: "object header truncated".to_owned(),
    })?;
    let kind = kind_from_code((first >> 4) & 0x7)?;
    let mut size = usize::from(first & 0x0f);
    let mut shift = 4;
    let mut consumed = 1;
    let mut cont = first & 0x80 != 0;
    while cont {
        let byte = *bytes.get(consumed).ok_or_else(|| BundleError::CorruptPack {
            reason: "object header truncated".to_owned(),
        })?;
        size |= usize::from(byte & 0x7f) << shift;
        shift += 7;
        consumed += 1;
        cont = byte & 0x80 != 0;
    }
    Ok((kind, size, consumed))
}

fn checksum(format: ObjectFormat, bytes: &[u8]) -> Vec<u8> {
    match format {
        ObjectFormat::Sha1 => {
            let mut hasher = Sha1::new();
            hasher.update(bytes);
            hasher.finalize().to_vec()
        }
        ObjectFormat::Sha256 => {
            let mut hasher = Sha256::new();
            hasher.update(bytes);
            hasher.finalize().to_vec()
        }
    }
}

/// Frame `objects` as a complete PACK v2 stream, each entry individually
/// zlib-compressed, trailed by a whole-file checksum under `format`.
///
/// # Panics
/// Never under normal conditions: the in-memory zlib encoder only fails on
/// I/O error, which cannot occur writing to a `Vec`.
#[must_use]
pub fn write_pack(objects: &[(ObjectKind, Vec<u8>)], format: ObjectFormat) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(PACK_MAGIC);
    out.extend_from_slice(&PACK_VERSION.to_be_bytes());
    out.extend_from_slice(&u32::try_from(objects.len()).unwrap_or(u32::MAX).to_be_bytes());

    for (kind, content) in objects {
        out.extend(encode_header(*kind, content.len()));
        let mut encoder =
            flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        encoder
            .write_all(content)
            .expect("writing to an in-memory buffer cannot fail");
        out.extend(
            encoder
                .finish()
                .expect("flushing an in-memory buffer cannot fail"),
        );
    }

    let trailer = checksum(format, &out);
    out.extend(trailer);
    out
}

/// Parse a PACK v2 stream produced by [`write_pack`] (or any non-deltified
/// PACK v2 file), verifying its trailing checksum.
///
/// # Errors
/// [`BundleError::CorruptPack`]/[`BundleError::UnsupportedPackVersion`]/
/// [`BundleError::UnknownObjectType`]/[`BundleError::ChecksumMismatch`] as
/// appropriate; [`BundleError::Io`] if zlib decompression fails.
pub fn parse_pack(bytes: &[u8], format: ObjectFormat) -> Result<Vec<(ObjectKind, Vec<u8>)>, BundleError> {
    let trailer_len = format.byte_len();
    if bytes.len() < 12 + trailer_len {
        return Err(BundleError::CorruptPack {
            reason: "packfile shorter than its fixed header and checksum".to_owned(),
        });
    }
    if &bytes[..4] != PACK_MAGIC {
        return Err(BundleError::CorruptPack {
            reason: "missing PACK magic".to_owned(),
        });
    }
    let version = u32::from_be_bytes(bytes[4..8].try_into().unwrap_or_default());
    if version != PACK_VERSION {
        return Err(BundleError::UnsupportedPackVersion { version });
    }
    let count = u32::from_be_bytes(bytes[8..12].try_into().unwrap_or_default()) as usize;

    let body_end = bytes.len() - trailer_len;
    let computed = checksum(format, &bytes[..body_end]);
    if computed != bytes[body_end..] {
        return Err(BundleError::ChecksumMismatch);
    }

    let mut pos = 12;
    let mut objects = Vec::with_capacity(count);
    for _ in 0..count {
        let (kind, size, header_len) = decode_header(&bytes[pos..body_end])?;
        pos += header_len;

        let mut decoder = flate2::read::ZlibDecoder::new(&bytes[pos..body_end]);
        let mut content = Vec::with_capacity(size);
        decoder.read_to_end(&mut content)?;
        if content.len() != size {
            return Err(BundleError::CorruptPack {
                reason: format!("object declared size {size} but decompressed to {}", content.len()),
            });
        }
        pos += usize::try_from(decoder.total_in()).unwrap_or(0);
        objects.push((kind, content));
    }

    Ok(objects)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_single_blob() {
        let objects = vec![(ObjectKind::Blob, b"hello world".to_vec())];
        let packed = write_pack(&objects, ObjectFormat::Sha1);
        assert!(packed.starts_with(PACK_MAGIC));
        let parsed = parse_pack(&packed, ObjectFormat::Sha1).unwrap();
        assert_eq!(parsed, objects);
    }

    #[test]
    fn round_trip_multiple_object_kinds() {
        let objects = vec![
            (ObjectKind::Commit, b"commit body".to_vec()),
            (ObjectKind::Tree, b"tree body".to_vec()),
            (ObjectKind::Blob, Vec::new()),
            (ObjectKind::Tag, b"tag body".to_vec()),
        ];
        let packed = write_pack(&objects, ObjectFormat::Sha256);
        let parsed = parse_pack(&packed, ObjectFormat::Sha256).unwrap();
        assert_eq!(parsed, objects);
    }

    #[test]
    fn corrupted_checksum_is_rejected() {
        let objects = vec![(ObjectKind::Blob, b"data".to_vec())];
        let mut packed = write_pack(&objects, ObjectFormat::Sha1);
        let last = packed.len() - 1;
        packed[last] ^= 0xff;
        assert!(matches!(
            parse_pack(&packed, ObjectFormat::Sha1),
            Err(BundleError::ChecksumMismatch)
        ));
    }

    #[test]
    fn header_varint_round_trips_across_size_boundaries() {
        for size in [0usize, 15, 16, 2047, 2048, 1 << 20] {
            let header = encode_header(ObjectKind::Blob, size);
            let (kind, decoded_size, consumed) = decode_header(&header).unwrap();
            assert_eq!(kind, ObjectKind::Blob);
            assert_eq!(decoded_size, size);
            assert_eq!(consumed, header.len());
        }
    }
}
