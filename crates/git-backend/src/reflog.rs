//! Reflog line format shared by ordinary ref updates and the stash algebra:
//! `<old_oid> <new_oid> <who> <timestamp> <tz>\t<message>\n`, stored
//! oldest-first on disk but always presented newest-first to callers.

use crate::error::GitError;
use crate::repo::ReflogEntry;
use crate::types::{GitOid, ObjectFormat};

/// Parse a reflog file's contents (oldest entry first, as stored on disk)
/// into entries ordered newest-first.
///
/// # Errors
/// Returns [`GitError::Internal`] if a line is malformed.
pub fn parse_reflog(format: ObjectFormat, text: &str) -> Result<Vec<ReflogEntry>, GitError> {
    let mut entries = Vec::new();
    for line in text.lines().filter(|l| !l.is_empty()) {
        entries.push(parse_line(format, line)?);
    }
    entries.reverse();
    Ok(entries)
}

fn parse_line(format: ObjectFormat, line: &str) -> Result<ReflogEntry, GitError> {
    let (header, message) = line.split_once('\t').ok_or_else(|| GitError::Internal {
        reason: format!("reflog line missing tab-separated message: {line:?}"),
    })?;
    let hex_len = format.hex_len();
    if header.len() < hex_len * 2 + 2 {
        return Err(GitError::Internal {
            reason: format!("reflog line too short: {line:?}"),
        });
    }
    let old_oid: GitOid = header[..hex_len].parse()?;
    let new_oid: GitOid = header[hex_len + 1..hex_len * 2 + 1].parse()?;
    let rest = header[hex_len * 2 + 2..].trim_end();
    let (who, ts_tz) = rest.rsplit_once(' ').and_then(|(who, tz)| {
        who.rsplit_once(' ').map(|(w, ts)| (w, format!("{ts} {tz}")))
    }).ok_or_else(|| GitError::Internal {
        reason: format!("reflog line missing timestamp/timezone: {line:?}"),
    })?;
    let mut parts = ts_tz.split_whitespace();
    let timestamp: i64 = parts
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| GitError::Internal {
            reason: format!("reflog line has invalid timestamp: {line:?}"),
        })?;
    let tz = parts.next().unwrap_or("+0000").to_owned();

    Ok(ReflogEntry {
        old_oid,
        new_oid,
        who: who.to_owned(),
        timestamp,
        tz,
        message: message.to_owned(),
    })
}

/// Format a single reflog line (without trailing newline).
#[must_use]
pub fn format_line(entry: &ReflogEntry) -> String {
    format!(
        "{} {} {} {} {}\t{}",
        entry.old_oid, entry.new_oid, entry.who, entry.timestamp, entry.tz, entry.message
    )
}

/// Serialize entries (given newest-first) back to oldest-first on-disk text.
#[must_use]
pub fn serialize_reflog(entries: &[ReflogEntry]) -> String {
    let mut out = String::new();
    for entry in entries.iter().rev() {
        out.push_str(&format_line(entry));
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oid(n: u8) -> GitOid {
        GitOid::from_sha1([n; 20])
    }

    #[test]
    fn round_trips_newest_first() {
        let entries = vec![
            ReflogEntry {
                old_oid: oid(1),
                new_oid: oid(2),
                who: "A U Thor <a@example.com>".to_owned(),
                timestamp: 1_700_000_001,
                tz: "+0000".to_owned(),
                message: "second".to_owned(),
            },
            ReflogEntry {
                old_oid: oid(0),
                new_oid: oid(1),
                who: "A U Thor <a@example.com>".to_owned(),
                timestamp: 1_700_000_000,
                tz: "+0000".to_owned(),
                message: "first".to_owned(),
            },
        ];
        let text = serialize_reflog(&entries);
        let parsed = parse_reflog(ObjectFormat::Sha1, &text).unwrap();
        assert_eq!(parsed, entries);
        assert_eq!(parsed[0].message, "second");
    }
}
