//! Pkt-line framing (spec.md §6 "Bundle format v2/v3"): a 4-byte hex length
//! prefix (itself included in the count) followed by that many payload
//! bytes, or the 4-byte flush packet `0000` standing alone.

use crate::error::BundleError;

/// The flush packet: an empty pkt-line that terminates a stream of them.
pub const FLUSH: &[u8] = b"0000";

/// The largest payload a single pkt-line can carry — a 4-digit hex length
/// prefix tops out at `0xffff`, four of which are the prefix itself.
pub const MAX_PAYLOAD: usize = 0xffff - 4;

/// One decoded pkt-line: either a flush packet or a data line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PktLine {
    /// `0000`.
    Flush,
    /// A framed payload, length prefix already stripped.
    Data(Vec<u8>),
}

/// Frame `payload` as a single pkt-line.
///
/// # Errors
/// [`BundleError::PktLineTooLarge`] if `payload` plus the 4-byte prefix
/// would not fit in a 4-hex-digit length.
pub fn encode(payload: &[u8]) -> Result<Vec<u8>, BundleError> {
    let len = payload.len() + 4;
    if payload.len() > MAX_PAYLOAD {
        return Err(BundleError::PktLineTooLarge { len });
    }
    let mut out = format!("{len:04x}").into_bytes();
    out.extend_from_slice(payload);
    Ok(out)
}

/// The flush packet's bytes, for callers assembling a stream by hand.
#[must_use]
pub fn encode_flush() -> Vec<u8> {
    FLUSH.to_vec()
}

/// Read one pkt-line starting at `pos`, returning it and the offset of the
/// byte after it.
///
/// # Errors
/// [`BundleError::Truncated`] if fewer than 4 bytes remain, or the declared
/// length runs past the end of `bytes`. [`BundleError::MalformedPktLine`] if
/// the length prefix is not valid hex, or declares a length between 1 and 3
/// (too short to be a well-formed line).
pub fn decode(bytes: &[u8], pos: usize) -> Result<(PktLine, usize), BundleError> {
    if pos + 4 > bytes.len() {
        return Err(BundleError::Truncated);
    }
    let prefix =
        std::str::from_utf8(&bytes[pos..pos + 4]).map_err(|_| BundleError::MalformedPktLine)?;
    let len = usize::from_str_radix(prefix, 16).map_err(|_| BundleError::MalformedPktLine)?;
    if len == 0 {
        return Ok((PktLine::Flush, pos + 4));
    }
    if len < 4 {
        return Err(BundleError::MalformedPktLine);
    }
    let end = pos + len;
    if end > bytes.len() {
        return Err(BundleError::Truncated);
    }
    Ok((PktLine::Data(bytes[pos + 4..end].to_vec()), end))
}

/// Decode a full run of pkt-lines starting at `pos`, stopping at (and
/// consuming) the first flush packet.
///
/// # Errors
/// Propagates [`decode`]'s errors; [`BundleError::Truncated`] if the stream
/// ends without a flush packet.
pub fn decode_until_flush(bytes: &[u8], mut pos: usize) -> Result<(Vec<Vec<u8>>, usize), BundleError> {
    let mut lines = Vec::new();
    loop {
        let (line, next) = decode(bytes, pos)?;
        pos = next;
        match line {
            PktLine::Flush => return Ok((lines, pos)),
            PktLine::Data(payload) => lines.push(payload),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flush_packet_round_trips() {
        let stream = encode_flush();
        let (line, pos) = decode(&stream, 0).unwrap();
        assert_eq!(line, PktLine::Flush);
        assert_eq!(pos, 4);
    }

    #[test]
    fn data_line_round_trips() {
        let encoded = encode(b"hello\n").unwrap();
        assert_eq!(&encoded, b"000ahello\n");
        let (line, pos) = decode(&encoded, 0).unwrap();
        assert_eq!(line, PktLine::Data(b"hello\n".to_vec()));
        assert_eq!(pos, encoded.len());
    }

    #[test]
    fn decode_until_flush_collects_every_line() {
        let mut stream = encode(b"one\n").unwrap();
        stream.extend(encode(b"two\n").unwrap());
        stream.extend(encode_flush());
        let (lines, pos) = decode_until_flush(&stream, 0).unwrap();
        assert_eq!(lines, vec![b"one\n".to_vec(), b"two\n".to_vec()]);
        assert_eq!(pos, stream.len());
    }

    #[test]
    fn truncated_stream_without_flush_errors() {
        let stream = encode(b"one\n").unwrap();
        assert!(matches!(
            decode_until_flush(&stream, 0),
            Err(BundleError::Truncated)
        ));
    }

    #[test]
    fn oversize_payload_is_rejected() {
        let payload = vec![0u8; MAX_PAYLOAD + 1];
        assert!(matches!(
            encode(&payload),
            Err(BundleError::PktLineTooLarge { .. })
        ));
    }
}
