//! USTAR (TAR) block parser (§4.13).

use crate::bytes::parse_octal_ascii;

const BLOCK_SIZE: usize = 512;

#[derive(Clone, Debug)]
pub struct TarEntry {
    pub name: String,
    pub size: u64,
    pub data_offset: usize,
}

#[derive(Clone, Debug, Default)]
pub struct TarParseResult {
    pub entries: Vec<TarEntry>,
    /// Set when the checksum doesn't match, the size field isn't
    /// octal, a data region would overshoot the file, or trailing
    /// bytes after the terminator aren't all zero (§4.13).
    pub metadata_partial: bool,
}

fn header_checksum_matches(block: &[u8]) -> bool {
    let stored = match parse_octal_ascii(&block[148..156]) {
        Some(v) => v,
        None => return false,
    };
    let mut sum: u64 = 0;
    for (i, &b) in block.iter().enumerate() {
        sum += if (148..156).contains(&i) { b' ' as u64 } else { b as u64 };
    }
    sum == stored
}

fn header_name(block: &[u8]) -> String {
    let name = ascii_cstr(&block[0..100]);
    let prefix = ascii_cstr(&block[345..500]);
    if prefix.is_empty() {
        name
    } else {
        format!("{prefix}/{name}")
    }
}

fn ascii_cstr(field: &[u8]) -> String {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end]).into_owned()
}

/// Parse USTAR blocks from full file `bytes`.
pub fn parse(bytes: &[u8]) -> TarParseResult {
    let mut result = TarParseResult::default();
    let mut offset = 0usize;

    loop {
        if offset + BLOCK_SIZE > bytes.len() {
            break;
        }
        let block = &bytes[offset..offset + BLOCK_SIZE];
        if block.iter().all(|&b| b == 0) {
            // Terminator: two consecutive zero blocks expected.
            let trailing = &bytes[offset..];
            if !trailing.iter().all(|&b| b == 0) {
                result.metadata_partial = true;
            }
            break;
        }

        if !header_checksum_matches(block) {
            result.metadata_partial = true;
            break;
        }

        let size = match parse_octal_ascii(&block[124..136]) {
            Some(v) => v,
            None => {
                result.metadata_partial = true;
                break;
            }
        };

        let data_offset = offset + BLOCK_SIZE;
        let data_blocks = (size as usize).div_ceil(BLOCK_SIZE);
        let next_offset = data_offset + data_blocks * BLOCK_SIZE;
        if next_offset > bytes.len() {
            result.metadata_partial = true;
            break;
        }

        result.entries.push(TarEntry {
            name: header_name(block),
            size,
            data_offset,
        });
        offset = next_offset;
    }

    result
}

pub const MAX_TEXT_EXTRACT_BYTES: usize = 256 * 1024;
pub const MAX_TEXT_EXTRACT_ENTRIES: usize = 32;

/// Bounded text extraction by basename: returns the entry's text if
/// its basename matches `basename`, capped at 256 KiB (§4.13).
pub fn extract_entry_text<'a>(bytes: &'a [u8], entry: &TarEntry) -> Option<(&'a [u8], bool)> {
    let len = (entry.size as usize).min(bytes.len().saturating_sub(entry.data_offset));
    let capped = len.min(MAX_TEXT_EXTRACT_BYTES);
    let truncated = len > MAX_TEXT_EXTRACT_BYTES;
    bytes
        .get(entry.data_offset..entry.data_offset + capped)
        .map(|slice| (slice, truncated))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checksum(block: &mut [u8; 512]) {
        let mut sum: u64 = 0;
        for (i, &b) in block.iter().enumerate() {
            sum += if (148..156).contains(&i) { b' ' as u64 } else { b as u64 };
        }
        let field = format!("{sum:06o}\0 ");
        block[148..156].copy_from_slice(field.as_bytes());
    }

    fn build_entry(name: &str, data: &[u8]) -> Vec<u8> {
        let mut block = [0u8; 512];
        block[0..name.len()].copy_from_slice(name.as_bytes());
        let size_field = format!("{:011o}\0", data.len());
        block[124..136].copy_from_slice(size_field.as_bytes());
        checksum(&mut block);

        let mut out = block.to_vec();
        out.extend_from_slice(data);
        let pad = (512 - (data.len() % 512)) % 512;
        out.extend(std::iter::repeat(0u8).take(pad));
        out
    }

    #[test]
    fn parses_single_entry_and_terminator() {
        let mut bytes = build_entry("hello.txt", b"hi there");
        bytes.extend(std::iter::repeat(0u8).take(1024)); // two zero blocks
        let result = parse(&bytes);
        assert!(!result.metadata_partial);
        assert_eq!(result.entries.len(), 1);
        assert_eq!(result.entries[0].name, "hello.txt");
        assert_eq!(result.entries[0].size, 8);
    }

    #[test]
    fn bad_checksum_marks_partial() {
        let mut bytes = build_entry("hello.txt", b"hi");
        bytes[148] = b'9'; // corrupt checksum field
        let result = parse(&bytes);
        assert!(result.metadata_partial);
    }
}
