//! RPM lead + header magic check, and a textual signing-evidence scan
//! (§4.4). Signing detection is a documented lower bound: textual
//! markers in the first 128 KiB may miss signatures placed later in
//! large headers (§9 open questions) — this is intentional, not a gap
//! to "improve" without a new reason code.

const LEAD_MAGIC: [u8; 4] = [0xED, 0xAB, 0xEE, 0xDB];
const HEADER_MAGIC: [u8; 3] = [0x8E, 0xAD, 0xE8];
const HEADER_MAGIC_OFFSET: usize = 96;
const SIGNING_SCAN_WINDOW: usize = 128 * 1024;

#[derive(Clone, Debug, Default)]
pub struct RpmParseResult {
    pub has_lead_magic: bool,
    pub has_header_magic: bool,
}

impl RpmParseResult {
    pub fn structurally_valid(&self) -> bool {
        self.has_lead_magic && self.has_header_magic
    }
}

pub fn parse(bytes: &[u8]) -> RpmParseResult {
    let mut result = RpmParseResult::default();
    result.has_lead_magic = bytes.len() >= 4 && bytes[0..4] == LEAD_MAGIC;
    result.has_header_magic = bytes.len() >= HEADER_MAGIC_OFFSET + 3
        && bytes[HEADER_MAGIC_OFFSET..HEADER_MAGIC_OFFSET + 3] == HEADER_MAGIC;
    result
}

/// True if any of `gpgsig`, `pgp`, `rpmsig` appear (case-insensitive)
/// in the first 128 KiB of the file.
pub fn has_signing_markers(head: &[u8]) -> bool {
    let window = &head[..head.len().min(SIGNING_SCAN_WINDOW)];
    let text = String::from_utf8_lossy(window).to_ascii_lowercase();
    text.contains("gpgsig") || text.contains("pgp") || text.contains("rpmsig")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_lead_and_header() {
        let mut bytes = vec![0u8; 200];
        bytes[0..4].copy_from_slice(&LEAD_MAGIC);
        bytes[96..99].copy_from_slice(&HEADER_MAGIC);
        let result = parse(&bytes);
        assert!(result.structurally_valid());
    }

    #[test]
    fn signing_marker_detected() {
        let data = b"random header bytes GPGSIG present here";
        assert!(has_signing_markers(data));
    }
}
