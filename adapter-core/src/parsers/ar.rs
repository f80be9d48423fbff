//! Unix `ar` archive parser, used for Debian `.deb` packages (§4.14).

use crate::bytes::parse_decimal_ascii;

const MAGIC: &[u8; 8] = b"!<arch>\n";
const HEADER_SIZE: usize = 60;

/// Bound on how many bytes of an `.deb`-style AR archive this parser
/// will ever scan (§4.14, §3.3).
pub const MAX_AR_SCAN_BYTES: usize = 8 * 1024 * 1024;
pub const MAX_LIST_ITEMS: usize = 20_000;

#[derive(Clone, Debug)]
pub struct ArEntry {
    pub name: String,
    pub size: u64,
    pub data_offset: usize,
}

#[derive(Clone, Debug, Default)]
pub struct ArParseResult {
    pub entries: Vec<ArEntry>,
    pub has_magic: bool,
    pub metadata_partial: bool,
    pub truncated: bool,
}

/// Parse an AR archive from full file `bytes`, scanning at most
/// `MAX_AR_SCAN_BYTES`.
pub fn parse(bytes: &[u8]) -> ArParseResult {
    let mut result = ArParseResult::default();

    if bytes.len() < MAGIC.len() || &bytes[..MAGIC.len()] != MAGIC {
        return result;
    }
    result.has_magic = true;

    let scan_limit = bytes.len().min(MAX_AR_SCAN_BYTES);
    if bytes.len() > MAX_AR_SCAN_BYTES {
        result.truncated = true;
    }

    let mut offset = MAGIC.len();
    while offset + HEADER_SIZE <= scan_limit {
        if result.entries.len() >= MAX_LIST_ITEMS {
            result.truncated = true;
            break;
        }
        let header = &bytes[offset..offset + HEADER_SIZE];
        if &header[58..60] != b"\x60\x0A" {
            result.metadata_partial = true;
            break;
        }
        let name = String::from_utf8_lossy(&header[0..16])
            .trim_end()
            .to_string();
        let size = match parse_decimal_ascii(&header[48..58]) {
            Some(v) => v,
            None => {
                result.metadata_partial = true;
                break;
            }
        };

        let data_offset = offset + HEADER_SIZE;
        let padded_size = size as usize + (size as usize % 2);
        let next_offset = data_offset + padded_size;
        if data_offset > bytes.len() {
            result.metadata_partial = true;
            break;
        }

        result.entries.push(ArEntry { name, size, data_offset });

        if next_offset > bytes.len() {
            result.metadata_partial = true;
            break;
        }
        offset = next_offset;
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_ar(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut out = MAGIC.to_vec();
        for (name, data) in entries {
            let mut header = vec![b' '; HEADER_SIZE];
            header[0..name.len()].copy_from_slice(name.as_bytes());
            let size_field = format!("{:<10}", data.len());
            header[48..58].copy_from_slice(size_field.as_bytes());
            header[58] = 0x60;
            header[59] = 0x0A;
            out.extend_from_slice(&header);
            out.extend_from_slice(data);
            if data.len() % 2 == 1 {
                out.push(b'\n');
            }
        }
        out
    }

    #[test]
    fn parses_debian_binary_control_data_order() {
        let ar = build_ar(&[
            ("debian-binary", b"2.0\n"),
            ("control.tar.gz", b"x"),
            ("data.tar.gz", b"y"),
        ]);
        let result = parse(&ar);
        assert!(result.has_magic);
        assert!(!result.metadata_partial);
        let names: Vec<_> = result.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["debian-binary", "control.tar.gz", "data.tar.gz"]);
    }

    #[test]
    fn missing_magic_is_not_partial() {
        let result = parse(b"not an ar file at all");
        assert!(!result.has_magic);
        assert!(!result.metadata_partial);
    }
}
