//! Bounded ZIP central-directory parser (§4.12).
//!
//! Tolerates preamble bytes ahead of the central directory (CRX
//! headers, self-extracting stubs) by retrying the central-directory
//! offset relative to the first local file header when the EOCD's
//! stated offset doesn't validate.

use crate::bytes::{find, read_u16_le, read_u32_le};
use crate::parsers::inflate;

const EOCD_SIGNATURE: [u8; 4] = [0x50, 0x4B, 0x05, 0x06];
const CD_SIGNATURE: [u8; 4] = [0x50, 0x4B, 0x01, 0x02];
const LFH_SIGNATURE: [u8; 4] = [0x50, 0x4B, 0x03, 0x04];

/// Maximum bytes of an individual ZIP EOCD search window.
const EOCD_SEARCH_WINDOW: usize = 65558;

#[derive(Clone, Debug)]
pub struct ZipCentralEntry {
    pub name: String,
    pub flags: u16,
    pub compression_method: u16,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
    pub local_header_offset: u64,
}

#[derive(Clone, Debug, Default)]
pub struct ZipParseResult {
    pub entries: Vec<ZipCentralEntry>,
    /// True if the first 4 bytes of the file are a recognized ZIP
    /// local/empty/spanned signature.
    pub has_zip_signature: bool,
    /// True if the parser had to stop early: EOCD not found, central
    /// directory truncated, or a record's signature didn't validate
    /// (§4.12, §3.3).
    pub metadata_partial: bool,
}

fn has_leading_zip_signature(bytes: &[u8]) -> bool {
    if bytes.len() < 4 {
        return false;
    }
    matches!(
        &bytes[0..4],
        [0x50, 0x4B, 0x03, 0x04] // local file header
            | [0x50, 0x4B, 0x05, 0x06] // empty archive
            | [0x50, 0x4B, 0x07, 0x08] // spanned archive marker
    )
}

/// Parse the ZIP central directory from full file `bytes`.
pub fn parse(bytes: &[u8]) -> ZipParseResult {
    let mut result = ZipParseResult {
        has_zip_signature: has_leading_zip_signature(bytes),
        ..Default::default()
    };

    let window_start = bytes.len().saturating_sub(EOCD_SEARCH_WINDOW);
    let window = &bytes[window_start..];
    let eocd_rel = match find_last(window, &EOCD_SIGNATURE) {
        Some(pos) => pos,
        None => {
            result.metadata_partial = true;
            return result;
        }
    };
    let eocd_offset = window_start + eocd_rel;

    let total_entries = match read_u16_le(bytes, eocd_offset + 10) {
        Some(v) => v as usize,
        None => {
            result.metadata_partial = true;
            return result;
        }
    };
    let cd_offset_raw = match read_u32_le(bytes, eocd_offset + 16) {
        Some(v) => v as usize,
        None => {
            result.metadata_partial = true;
            return result;
        }
    };

    let mut cd_offset = cd_offset_raw;
    if bytes.get(cd_offset..cd_offset + 4) != Some(&CD_SIGNATURE[..]) {
        if let Some(first_lfh) = find(bytes, &LFH_SIGNATURE) {
            let retry_offset = first_lfh + cd_offset_raw;
            if bytes.get(retry_offset..retry_offset + 4) == Some(&CD_SIGNATURE[..]) {
                cd_offset = retry_offset;
            }
        }
    }

    let mut offset = cd_offset;
    for _ in 0..total_entries {
        match parse_one_record(bytes, offset) {
            Some((entry, record_len)) => {
                result.entries.push(entry);
                offset += record_len;
            }
            None => {
                result.metadata_partial = true;
                break;
            }
        }
    }

    dedup_by_canonical_path(&mut result.entries);
    result
}

fn parse_one_record(bytes: &[u8], offset: usize) -> Option<(ZipCentralEntry, usize)> {
    if bytes.get(offset..offset + 4)? != &CD_SIGNATURE[..] {
        return None;
    }
    let flags = read_u16_le(bytes, offset + 8)?;
    let compression_method = read_u16_le(bytes, offset + 10)?;
    let compressed_size = read_u32_le(bytes, offset + 20)? as u64;
    let uncompressed_size = read_u32_le(bytes, offset + 24)? as u64;
    let name_len = read_u16_le(bytes, offset + 28)? as usize;
    let extra_len = read_u16_le(bytes, offset + 30)? as usize;
    let comment_len = read_u16_le(bytes, offset + 32)? as usize;
    let local_header_offset = read_u32_le(bytes, offset + 42)? as u64;

    let name_start = offset + 46;
    let name_bytes = bytes.get(name_start..name_start + name_len)?;
    let name = String::from_utf8_lossy(name_bytes).into_owned();

    let record_len = 46 + name_len + extra_len + comment_len;
    Some((
        ZipCentralEntry {
            name,
            flags,
            compression_method,
            compressed_size,
            uncompressed_size,
            local_header_offset,
        },
        record_len,
    ))
}

fn find_last(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .enumerate()
        .filter(|(_, w)| *w == needle)
        .map(|(i, _)| i)
        .last()
}

/// Collapse entries sharing the same canonical (normalized) path,
/// keeping the first occurrence by local header offset (§4.12).
fn dedup_by_canonical_path(entries: &mut Vec<ZipCentralEntry>) {
    let mut by_offset = entries.clone();
    by_offset.sort_by_key(|e| e.local_header_offset);
    let mut seen = std::collections::HashSet::new();
    let mut kept = Vec::new();
    for entry in by_offset {
        let canonical = adapter_serde::normalize_path(&entry.name);
        if seen.insert(canonical) {
            kept.push(entry);
        }
    }
    *entries = kept;
}

pub const MAX_TEXT_EXTRACT_BYTES: usize = 256 * 1024;
pub const MAX_TEXT_EXTRACT_ENTRIES: usize = 32;

/// Bounded text extraction for one ZIP entry: validates the local
/// file header signature, supports stored (0) and deflate (8), caps
/// output at `MAX_TEXT_EXTRACT_BYTES` (§4.12).
pub fn extract_entry_text(bytes: &[u8], entry: &ZipCentralEntry) -> Option<String> {
    let lfh_offset = entry.local_header_offset as usize;
    if bytes.get(lfh_offset..lfh_offset + 4)? != &LFH_SIGNATURE[..] {
        return None;
    }
    let name_len = read_u16_le(bytes, lfh_offset + 26)? as usize;
    let extra_len = read_u16_le(bytes, lfh_offset + 28)? as usize;
    let data_start = lfh_offset + 30 + name_len + extra_len;

    let compressed_len = (entry.compressed_size as usize).min(bytes.len().saturating_sub(data_start));
    let data = bytes.get(data_start..data_start + compressed_len)?;

    let raw = match entry.compression_method {
        0 => data.get(..data.len().min(MAX_TEXT_EXTRACT_BYTES))?.to_vec(),
        8 => inflate::inflate(data, MAX_TEXT_EXTRACT_BYTES).ok()?,
        _ => return None,
    };
    Some(String::from_utf8_lossy(&raw).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_minimal_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut out = Vec::new();
        let mut central = Vec::new();
        let mut local_offsets = Vec::new();

        for (name, data) in entries {
            local_offsets.push(out.len() as u32);
            out.extend_from_slice(&LFH_SIGNATURE);
            out.extend_from_slice(&20u16.to_le_bytes()); // version needed
            out.extend_from_slice(&0u16.to_le_bytes()); // flags
            out.extend_from_slice(&0u16.to_le_bytes()); // method: stored
            out.extend_from_slice(&0u16.to_le_bytes()); // mod time
            out.extend_from_slice(&0u16.to_le_bytes()); // mod date
            out.extend_from_slice(&0u32.to_le_bytes()); // crc32
            out.extend_from_slice(&(data.len() as u32).to_le_bytes());
            out.extend_from_slice(&(data.len() as u32).to_le_bytes());
            out.extend_from_slice(&(name.len() as u16).to_le_bytes());
            out.extend_from_slice(&0u16.to_le_bytes()); // extra len
            out.extend_from_slice(name.as_bytes());
            out.extend_from_slice(data);
        }

        let cd_offset = out.len() as u32;
        for (i, (name, data)) in entries.iter().enumerate() {
            central.extend_from_slice(&CD_SIGNATURE);
            central.extend_from_slice(&0u16.to_le_bytes()); // version made by
            central.extend_from_slice(&20u16.to_le_bytes()); // version needed
            central.extend_from_slice(&0u16.to_le_bytes()); // flags
            central.extend_from_slice(&0u16.to_le_bytes()); // method
            central.extend_from_slice(&0u16.to_le_bytes()); // time
            central.extend_from_slice(&0u16.to_le_bytes()); // date
            central.extend_from_slice(&0u32.to_le_bytes()); // crc32
            central.extend_from_slice(&(data.len() as u32).to_le_bytes());
            central.extend_from_slice(&(data.len() as u32).to_le_bytes());
            central.extend_from_slice(&(name.len() as u16).to_le_bytes());
            central.extend_from_slice(&0u16.to_le_bytes()); // extra len
            central.extend_from_slice(&0u16.to_le_bytes()); // comment len
            central.extend_from_slice(&0u16.to_le_bytes()); // disk start
            central.extend_from_slice(&0u16.to_le_bytes()); // internal attrs
            central.extend_from_slice(&0u32.to_le_bytes()); // external attrs
            central.extend_from_slice(&local_offsets[i].to_le_bytes());
            central.extend_from_slice(name.as_bytes());
        }
        out.extend_from_slice(&central);

        out.extend_from_slice(&EOCD_SIGNATURE);
        out.extend_from_slice(&0u16.to_le_bytes()); // disk number
        out.extend_from_slice(&0u16.to_le_bytes()); // cd start disk
        out.extend_from_slice(&(entries.len() as u16).to_le_bytes());
        out.extend_from_slice(&(entries.len() as u16).to_le_bytes());
        out.extend_from_slice(&(central.len() as u32).to_le_bytes());
        out.extend_from_slice(&cd_offset.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes()); // comment len
        out
    }

    #[test]
    fn parses_two_stored_entries() {
        let zip = build_minimal_zip(&[("a.txt", b"hi"), ("b/c.txt", b"there")]);
        let result = parse(&zip);
        assert!(result.has_zip_signature);
        assert!(!result.metadata_partial);
        assert_eq!(result.entries.len(), 2);
        assert_eq!(result.entries[0].name, "a.txt");
        assert_eq!(result.entries[1].name, "b/c.txt");
    }

    #[test]
    fn extracts_stored_text() {
        let zip = build_minimal_zip(&[("manifest.json", b"{\"a\":1}")]);
        let result = parse(&zip);
        let text = extract_entry_text(&zip, &result.entries[0]).unwrap();
        assert_eq!(text, "{\"a\":1}");
    }

    #[test]
    fn tolerates_preamble_bytes() {
        let zip = build_minimal_zip(&[("manifest.json", b"{}")]);
        let mut with_preamble = vec![0u8; 12];
        with_preamble.extend_from_slice(&zip);
        let result = parse(&with_preamble);
        assert!(!result.metadata_partial);
        assert_eq!(result.entries.len(), 1);
    }

    #[test]
    fn missing_eocd_marks_partial() {
        let result = parse(b"not a zip file");
        assert!(result.metadata_partial);
        assert!(result.entries.is_empty());
    }
}
