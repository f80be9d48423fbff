//! CRX2/CRX3 header stripping, yielding the embedded ZIP payload
//! offset (§4.5).

use crate::bytes::read_u32_le;

const MAGIC: &[u8; 4] = b"Cr24";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CrxVersion {
    V2,
    V3,
}

#[derive(Clone, Debug)]
pub struct CrxParseResult {
    pub version: CrxVersion,
    pub payload_offset: usize,
}

/// Strip a CRX2 or CRX3 header from `bytes`, returning the offset the
/// embedded ZIP payload begins at. Returns `None` if the magic or
/// declared version is not recognized.
pub fn parse(bytes: &[u8]) -> Option<CrxParseResult> {
    if bytes.len() < 12 || &bytes[0..4] != MAGIC {
        return None;
    }
    let version = read_u32_le(bytes, 4)?;
    match version {
        2 => {
            let pubkey_len = read_u32_le(bytes, 8)? as usize;
            let sig_len = read_u32_le(bytes, 12)? as usize;
            let payload_offset = 16 + pubkey_len + sig_len;
            Some(CrxParseResult { version: CrxVersion::V2, payload_offset })
        }
        3 => {
            let header_len = read_u32_le(bytes, 8)? as usize;
            let payload_offset = 12 + header_len;
            Some(CrxParseResult { version: CrxVersion::V3, payload_offset })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_crx3_header() {
        let mut bytes = MAGIC.to_vec();
        bytes.extend_from_slice(&3u32.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes()); // header length 0
        assert_eq!(
            parse(&bytes).map(|r| (r.version, r.payload_offset)),
            Some((CrxVersion::V3, 12))
        );
    }

    #[test]
    fn parses_crx2_header() {
        let mut bytes = MAGIC.to_vec();
        bytes.extend_from_slice(&2u32.to_le_bytes());
        bytes.extend_from_slice(&4u32.to_le_bytes()); // pubkey len
        bytes.extend_from_slice(&8u32.to_le_bytes()); // sig len
        assert_eq!(
            parse(&bytes).map(|r| r.payload_offset),
            Some(16 + 4 + 8)
        );
    }
}
