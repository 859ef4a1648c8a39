//! The bundle container itself (spec.md §6 "Bundle format v2/v3"): the
//! `# v<n> git bundle` signature line, an optional v3 capability block, a
//! prerequisite list, a ref advertisement, and the packfile — assembled and
//! parsed as a whole so [`write_bundle`] and [`parse_bundle`] form the
//! round-trip law in spec.md §8.

use git_backend::GitOid;

use crate::error::BundleError;
use crate::pktline;

/// A bundle's version, selecting whether a capability block precedes the
/// prerequisite/ref lines.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BundleVersion {
    /// `# v2 git bundle`.
    V2,
    /// `# v3 git bundle`, adds the `@key[=value]` capability block.
    V3,
}

impl BundleVersion {
    const fn as_u8(self) -> u8 {
        match self {
            Self::V2 => 2,
            Self::V3 => 3,
        }
    }

    const fn from_u8(n: u8) -> Option<Self> {
        match n {
            2 => Some(Self::V2),
            3 => Some(Self::V3),
            _ => None,
        }
    }
}

/// A `@key[=value]` capability line, v3 only.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Capability {
    /// The capability name.
    pub key: String,
    /// Its value, if the line carried an `=`.
    pub value: Option<String>,
}

/// A `-<oid> <comment>` line: an object the bundle assumes the receiver
/// already has, so the packfile need not repeat its ancestry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Prerequisite {
    /// The assumed-present commit.
    pub oid: GitOid,
    /// Free-text annotation (commonly the commit's subject line).
    pub comment: String,
}

/// A `<oid> <refname>` line: one ref this bundle carries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BundleRef {
    /// The ref's current target.
    pub oid: GitOid,
    /// The full ref name, e.g. `refs/heads/main`.
    pub name: String,
}

/// A fully assembled (or parsed) bundle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bundle {
    /// `v2` or `v3`.
    pub version: BundleVersion,
    /// v3 capability lines; empty for v2.
    pub capabilities: Vec<Capability>,
    /// Assumed-present commits.
    pub prerequisites: Vec<Prerequisite>,
    /// Refs this bundle carries.
    pub refs: Vec<BundleRef>,
    /// The raw packfile bytes, starting with `PACK`.
    pub pack: Vec<u8>,
}

/// Serialize `bundle` to its on-disk byte form.
///
/// # Errors
/// [`BundleError::PktLineTooLarge`] if a single advertisement line (an
/// implausibly long ref name or comment) would not fit in one pkt-line.
pub fn write_bundle(bundle: &Bundle) -> Result<Vec<u8>, BundleError> {
    let mut out = format!("# v{} git bundle\n", bundle.version.as_u8()).into_bytes();

    if bundle.version == BundleVersion::V3 {
        for cap in &bundle.capabilities {
            let line = cap.value.as_ref().map_or_else(
                || format!("@{}\n", cap.key),
                |value| format!("@{}={value}\n", cap.key),
            );
            out.extend(pktline::encode(line.as_bytes())?);
        }
    }
    for prereq in &bundle.prerequisites {
        out.extend(pktline::encode(format!("-{} {}\n", prereq.oid, prereq.comment).as_bytes())?);
    }
    for r in &bundle.refs {
        out.extend(pktline::encode(format!("{} {}\n", r.oid, r.name).as_bytes())?);
    }
    out.extend(pktline::encode_flush());
    out.extend_from_slice(&bundle.pack);
    Ok(out)
}

/// Parse a bundle from its on-disk byte form.
///
/// # Errors
/// [`BundleError::MalformedHeader`] if the signature line is missing or
/// names an unsupported version; [`BundleError::MalformedAdvertisement`] if
/// a capability/prerequisite/ref line cannot be parsed;
/// [`BundleError::MissingPackfile`] if no `PACK`-prefixed data follows the
/// advertisement; propagates [`pktline::decode`]'s errors for a malformed
/// pkt-line stream.
pub fn parse_bundle(bytes: &[u8]) -> Result<Bundle, BundleError> {
    let header_end = bytes
        .iter()
        .position(|&b| b == b'\n')
        .ok_or(BundleError::MalformedHeader)?
        + 1;
    let header = std::str::from_utf8(&bytes[..header_end]).map_err(|_| BundleError::MalformedHeader)?;
    let version = parse_signature(header)?;

    let (lines, pos) = pktline::decode_until_flush(bytes, header_end)?;

    let mut capabilities = Vec::new();
    let mut prerequisites = Vec::new();
    let mut refs = Vec::new();
    for payload in lines {
        let text = std::str::from_utf8(&payload).map_err(|_| BundleError::MalformedAdvertisement {
            reason: "line is not valid UTF-8".to_owned(),
        })?;
        let text = text.strip_suffix('\n').unwrap_or(text);
        if let Some(rest) = text.strip_prefix('@') {
            let mut parts = rest.splitn(2, '=');
            let key = parts.next().unwrap_or_default().to_owned();
            let value = parts.next().map(str::to_owned);
            capabilities.push(Capability { key, value });
        } else if let Some(rest) = text.strip_prefix('-') {
            let (oid_str, comment) = rest.split_once(' ').unwrap_or((rest, ""));
            let oid = oid_str.parse().map_err(|_| BundleError::MalformedAdvertisement {
                reason: format!("prerequisite line names an invalid oid: '{oid_str}'"),
            })?;
            prerequisites.push(Prerequisite {
                oid,
                comment: comment.to_owned(),
            });
        } else {
            let (oid_str, name) = text.split_once(' ').ok_or_else(|| BundleError::MalformedAdvertisement {
                reason: format!("ref line has no oid/name separator: '{text}'"),
            })?;
            let oid = oid_str.parse().map_err(|_| BundleError::MalformedAdvertisement {
                reason: format!("ref line names an invalid oid: '{oid_str}'"),
            })?;
            refs.push(BundleRef {
                oid,
                name: name.to_owned(),
            });
        }
    }

    let pack = bytes[pos..].to_vec();
    if !pack.starts_with(b"PACK") {
        return Err(BundleError::MissingPackfile);
    }

    Ok(Bundle {
        version,
        capabilities,
        prerequisites,
        refs,
        pack,
    })
}

fn parse_signature(line: &str) -> Result<BundleVersion, BundleError> {
    let trimmed = line.strip_suffix('\n').unwrap_or(line);
    let rest = trimmed.strip_prefix("# v").ok_or(BundleError::MalformedHeader)?;
    let rest = rest.strip_suffix(" git bundle").ok_or(BundleError::MalformedHeader)?;
    let n: u8 = rest.parse().map_err(|_| BundleError::MalformedHeader)?;
    BundleVersion::from_u8(n).ok_or(BundleError::MalformedHeader)
}

#[cfg(test)]
mod tests {
    use super::*;
    use git_backend::ObjectFormat;

    fn sample_oid(format: ObjectFormat) -> GitOid {
        match format {
            ObjectFormat::Sha1 => GitOid::from_sha1([0xab; 20]),
            ObjectFormat::Sha256 => GitOid::from_sha256([0xcd; 32]),
        }
    }

    #[test]
    fn round_trip_v2_with_refs_and_prerequisites() {
        let bundle = Bundle {
            version: BundleVersion::V2,
            capabilities: Vec::new(),
            prerequisites: vec![Prerequisite {
                oid: sample_oid(ObjectFormat::Sha1),
                comment: "base commit".to_owned(),
            }],
            refs: vec![
                BundleRef {
                    oid: sample_oid(ObjectFormat::Sha1),
                    name: "refs/heads/main".to_owned(),
                },
                BundleRef {
                    oid: GitOid::from_sha1([0x11; 20]),
                    name: "refs/tags/v1".to_owned(),
                },
            ],
            pack: crate::pack::write_pack(
                &[(git_backend::ObjectKind::Blob, b"payload".to_vec())],
                ObjectFormat::Sha1,
            ),
        };
        let bytes = write_bundle(&bundle).unwrap();
        assert!(bytes.starts_with(b"# v2 git bundle\n"));
        let parsed = parse_bundle(&bytes).unwrap();
        assert_eq!(parsed, bundle);
    }

    #[test]
    fn round_trip_v3_with_capabilities() {
        let bundle = Bundle {
            version: BundleVersion::V3,
            capabilities: vec![
                Capability {
                    key: "object-format".to_owned(),
                    value: Some("sha256".to_owned()),
                },
                Capability {
                    key: "filter".to_owned(),
                    value: None,
                },
            ],
            prerequisites: Vec::new(),
            refs: vec![BundleRef {
                oid: sample_oid(ObjectFormat::Sha256),
                name: "refs/heads/main".to_owned(),
            }],
            pack: crate::pack::write_pack(&[], ObjectFormat::Sha256),
        };
        let bytes = write_bundle(&bundle).unwrap();
        let parsed = parse_bundle(&bytes).unwrap();
        assert_eq!(parsed, bundle);
    }

    #[test]
    fn empty_bundle_round_trips() {
        let bundle = Bundle {
            version: BundleVersion::V2,
            capabilities: Vec::new(),
            prerequisites: Vec::new(),
            refs: Vec::new(),
            pack: crate::pack::write_pack(&[], ObjectFormat::Sha1),
        };
        let bytes = write_bundle(&bundle).unwrap();
        let parsed = parse_bundle(&bytes).unwrap();
        assert_eq!(parsed, bundle);
    }

    #[test]
    fn unsupported_version_is_rejected() {
        let mut bytes = b"# v9 git bundle\n".to_vec();
        bytes.extend(pktline::encode_flush());
        bytes.extend(b"PACK");
        assert!(matches!(parse_bundle(&bytes), Err(BundleError::MalformedHeader)));
    }

    #[test]
    fn missing_packfile_is_rejected() {
        let mut bytes = b"# v2 git bundle\n".to_vec();
        bytes.extend(pktline::encode_flush());
        assert!(matches!(parse_bundle(&bytes), Err(BundleError::MissingPackfile)));
    }
}
