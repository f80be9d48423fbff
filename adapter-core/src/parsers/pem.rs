//! PEM envelope / DER SEQUENCE / OID-needle checks for the signature
//! analyzer (§4.10).

const CMS_SIGNED_DATA_OID: &[u8] = &[0x06, 0x09, 0x2A, 0x86, 0x48, 0x86, 0xF7, 0x0D, 0x01, 0x07, 0x02];
const TIMESTAMPING_EKU_OID: &[u8] = &[0x06, 0x08, 0x2B, 0x06, 0x01, 0x05, 0x05, 0x07, 0x03, 0x08];
const X509_NAME_ATTRIBUTE_OID_PREFIX: &[u8] = &[0x06, 0x03, 0x55, 0x04];

pub const OID_SCAN_WINDOW: usize = 256 * 1024;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PemLabel {
    Certificate,
    Pkcs7,
    Signature,
}

impl PemLabel {
    fn as_str(self) -> &'static str {
        match self {
            PemLabel::Certificate => "CERTIFICATE",
            PemLabel::Pkcs7 => "PKCS7",
            PemLabel::Signature => "SIGNATURE",
        }
    }
}

#[derive(Clone, Debug)]
pub struct PemEnvelope {
    pub label: PemLabel,
    pub decodes_to_der_sequence: bool,
}

fn is_base64_alphabet(s: &str) -> bool {
    s.bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'+' || b == b'/' || b == b'=')
}

/// Decode a base64 payload whose alphabet and padding have already
/// been validated by the caller. Returns `None` on malformed input;
/// callers treat that as an invalid envelope.
fn base64_decode(payload: &str) -> Option<Vec<u8>> {
    fn value(byte: u8) -> Option<u8> {
        match byte {
            b'A'..=b'Z' => Some(byte - b'A'),
            b'a'..=b'z' => Some(byte - b'a' + 26),
            b'0'..=b'9' => Some(byte - b'0' + 52),
            b'+' => Some(62),
            b'/' => Some(63),
            _ => None,
        }
    }

    let bytes = payload.as_bytes();
    let mut out = Vec::with_capacity(bytes.len() / 4 * 3);
    let mut chunk = [0u8; 4];
    let mut chunk_len = 0;
    for &b in bytes {
        if b == b'=' {
            break;
        }
        chunk[chunk_len] = value(b)?;
        chunk_len += 1;
        if chunk_len == 4 {
            out.push((chunk[0] << 2) | (chunk[1] >> 4));
            out.push((chunk[1] << 4) | (chunk[2] >> 2));
            out.push((chunk[2] << 6) | chunk[3]);
            chunk_len = 0;
        }
    }
    match chunk_len {
        0 => {}
        2 => out.push((chunk[0] << 2) | (chunk[1] >> 4)),
        3 => {
            out.push((chunk[0] << 2) | (chunk[1] >> 4));
            out.push((chunk[1] << 4) | (chunk[2] >> 2));
        }
        _ => return None,
    }
    Some(out)
}

/// Scan `text` for `-----BEGIN <label>-----` / `-----END <label>-----`
/// envelopes of the given kind, validating the payload per §4.10.
pub fn scan_envelopes(text: &str, label: PemLabel) -> (Vec<PemEnvelope>, usize) {
    let begin_marker = format!("-----BEGIN {}-----", label.as_str());
    let end_marker = format!("-----END {}-----", label.as_str());
    let mut envelopes = Vec::new();
    let mut invalid_count = 0;

    let mut search_from = 0;
    while let Some(begin_rel) = text[search_from..].find(&begin_marker) {
        let begin = search_from + begin_rel;
        let payload_start = begin + begin_marker.len();
        let Some(end_rel) = text[payload_start..].find(&end_marker) else {
            break;
        };
        let end = payload_start + end_rel;
        let payload: String = text[payload_start..end].chars().filter(|c| !c.is_whitespace()).collect();
        search_from = end + end_marker.len();

        let valid_shape = !payload.is_empty() && payload.len() % 4 == 0 && is_base64_alphabet(&payload);
        let decodes_to_der_sequence = valid_shape
            .then(|| base64_decode(&payload))
            .flatten()
            .map(|decoded| decoded.first() == Some(&0x30))
            .unwrap_or(false);

        if decodes_to_der_sequence {
            envelopes.push(PemEnvelope {
                label,
                decodes_to_der_sequence: true,
            });
        } else {
            invalid_count += 1;
        }
    }

    (envelopes, invalid_count)
}

/// §4.10 DER scan: first byte `0x30`, declared length (short- or
/// long-form, lengthOfLength in [1,4]) fits within `file_size`.
pub fn is_strong_der_sequence(bytes: &[u8], file_size: u64) -> bool {
    if bytes.is_empty() || bytes[0] != 0x30 {
        return false;
    }
    let Some(&length_byte) = bytes.get(1) else {
        return false;
    };
    if length_byte < 0x80 {
        let declared = 2 + length_byte as u64;
        return declared <= file_size;
    }
    let length_of_length = (length_byte & 0x7F) as usize;
    if !(1..=4).contains(&length_of_length) {
        return false;
    }
    let Some(length_bytes) = bytes.get(2..2 + length_of_length) else {
        return false;
    };
    let mut value: u64 = 0;
    for &b in length_bytes {
        value = (value << 8) | b as u64;
    }
    if value < 128 {
        return false;
    }
    let declared = 2 + length_of_length as u64 + value;
    declared <= file_size
}

fn contains_oid(haystack: &[u8], needle: &[u8]) -> bool {
    crate::bytes::find(haystack, needle).is_some()
}

#[derive(Clone, Debug, Default)]
pub struct OidScanResult {
    pub cms_signed_data: bool,
    pub timestamping_eku: bool,
    pub x509_name_attribute_count: usize,
}

/// Search the first `OID_SCAN_WINDOW` bytes of the head for the three
/// named OID needles (§4.10). Counts non-overlapping occurrences of
/// the X.509 name-attribute prefix since callers need `>0` counts.
pub fn scan_oids(head: &[u8]) -> OidScanResult {
    let window = &head[..head.len().min(OID_SCAN_WINDOW)];
    OidScanResult {
        cms_signed_data: contains_oid(window, CMS_SIGNED_DATA_OID),
        timestamping_eku: contains_oid(window, TIMESTAMPING_EKU_OID),
        x509_name_attribute_count: crate::bytes::count_occurrences(window, X509_NAME_ATTRIBUTE_OID_PREFIX),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pem_wrap(label: &str, der: &[u8]) -> String {
        use std::fmt::Write;
        let mut b64 = String::new();
        const TABLE: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
        for chunk in der.chunks(3) {
            let b0 = chunk[0];
            let b1 = *chunk.get(1).unwrap_or(&0);
            let b2 = *chunk.get(2).unwrap_or(&0);
            let n = (b0 as u32) << 16 | (b1 as u32) << 8 | b2 as u32;
            let chars = [
                TABLE[(n >> 18 & 0x3F) as usize],
                TABLE[(n >> 12 & 0x3F) as usize],
                TABLE[(n >> 6 & 0x3F) as usize],
                TABLE[(n & 0x3F) as usize],
            ];
            match chunk.len() {
                1 => write!(b64, "{}{}==", chars[0] as char, chars[1] as char).unwrap(),
                2 => write!(b64, "{}{}{}=", chars[0] as char, chars[1] as char, chars[2] as char).unwrap(),
                _ => b64.push_str(&chars.iter().map(|&c| c as char).collect::<String>()),
            }
        }
        format!("-----BEGIN {label}-----\n{b64}\n-----END {label}-----\n")
    }

    #[test]
    fn valid_certificate_envelope_decodes_to_sequence() {
        let der = [0x30, 0x03, 0x02, 0x01, 0x05];
        let text = pem_wrap("CERTIFICATE", &der);
        let (envelopes, invalid) = scan_envelopes(&text, PemLabel::Certificate);
        assert_eq!(envelopes.len(), 1);
        assert_eq!(invalid, 0);
    }

    #[test]
    fn envelope_not_starting_with_sequence_is_invalid() {
        let der = [0x02, 0x01, 0x05, 0x00];
        let text = pem_wrap("SIGNATURE", &der);
        let (envelopes, invalid) = scan_envelopes(&text, PemLabel::Signature);
        assert!(envelopes.is_empty());
        assert_eq!(invalid, 1);
    }

    #[test]
    fn der_short_form_length_within_bounds() {
        let bytes = [0x30, 0x03, 0x02, 0x01, 0x05];
        assert!(is_strong_der_sequence(&bytes, bytes.len() as u64));
    }

    #[test]
    fn der_long_form_length_matches_spec_example() {
        let mut bytes = vec![0x30, 0x81, 0x8C];
        bytes.extend(std::iter::repeat(0u8).take(0x8C));
        assert!(is_strong_der_sequence(&bytes, bytes.len() as u64));
    }

    #[test]
    fn oid_scan_finds_x509_name_attribute() {
        let mut head = vec![0u8; 20];
        head.extend_from_slice(&[0x06, 0x03, 0x55, 0x04, 0x03]);
        let result = scan_oids(&head);
        assert_eq!(result.x509_name_attribute_count, 1);
        assert!(!result.cms_signed_data);
    }
}
