//! Code-signing material analyzer (§4.10): `.cer, .crt, .pem, .p7b, .sig`.

use adapter_serde::{AdapterFindings, AdapterMeta, AdapterMode, AdapterSummary, FailCode, RunResult};

use crate::bytes::read_head;
use crate::context::AnalyzeContext;
use crate::parsers::pem::{is_strong_der_sequence, scan_envelopes, scan_oids, PemLabel};
use crate::text::{bounded_text, contains_ci};

const ADAPTER_ID: &str = "signature_adapter_v1";
const HEAD_WINDOW: usize = 256 * 1024;

fn fail(code: FailCode, message: &str) -> RunResult {
    RunResult::fail(code, message)
}

struct Evidence {
    cert_envelopes: usize,
    pkcs7_envelopes: usize,
    signature_envelopes: usize,
    invalid_envelopes: usize,
    der_strong: bool,
    cms_signed_data: bool,
    timestamping_eku: bool,
    x509_name_attribute_count: usize,
    timestamp_hint: bool,
    chain_hint: bool,
}

fn gather(head: &[u8], file_size: u64) -> Evidence {
    let (text, _) = bounded_text(head);
    let (cert_envelopes, cert_invalid) = scan_envelopes(&text, PemLabel::Certificate);
    let (pkcs7_envelopes, pkcs7_invalid) = scan_envelopes(&text, PemLabel::Pkcs7);
    let (signature_envelopes, signature_invalid) = scan_envelopes(&text, PemLabel::Signature);
    let oids = scan_oids(head);
    let der_strong = is_strong_der_sequence(head, file_size);

    Evidence {
        cert_envelopes: cert_envelopes.len(),
        pkcs7_envelopes: pkcs7_envelopes.len(),
        signature_envelopes: signature_envelopes.len(),
        invalid_envelopes: cert_invalid + pkcs7_invalid + signature_invalid,
        der_strong,
        cms_signed_data: oids.cms_signed_data,
        timestamping_eku: oids.timestamping_eku,
        x509_name_attribute_count: oids.x509_name_attribute_count,
        timestamp_hint: contains_ci(&text, "timestamp") || contains_ci(&text, "tsa") || contains_ci(&text, "countersignature"),
        chain_hint: contains_ci(&text, "certificate-chain") || contains_ci(&text, "intermediate") || contains_ci(&text, "root-ca"),
    }
}

fn evidence_satisfies(ctx_ext: &str, ev: &Evidence, file_size: u64) -> bool {
    match ctx_ext {
        ".cer" | ".crt" => {
            ev.cert_envelopes > 0 || (ev.der_strong && ev.x509_name_attribute_count > 0 && file_size >= 128)
        }
        ".p7b" => ev.pkcs7_envelopes > 0 || ev.cms_signed_data,
        ".sig" => ev.signature_envelopes > 0 || ev.cms_signed_data,
        _ => ev.cert_envelopes > 0 || ev.pkcs7_envelopes > 0 || ev.signature_envelopes > 0 || ev.der_strong || ev.cms_signed_data,
    }
}

fn build_result(ctx: &AnalyzeContext, ev: &Evidence) -> RunResult {
    let mut summary = AdapterSummary::new(ADAPTER_ID, "signature", ctx.ext.clone(), AdapterMode::BuiltIn)
        .with_count("pemCertificateCount", ev.cert_envelopes as u64)
        .with_count("pemPkcs7Count", ev.pkcs7_envelopes as u64)
        .with_count("pemSignatureCount", ev.signature_envelopes as u64)
        .with_count("pemEnvelopeInvalidCount", ev.invalid_envelopes as u64)
        .with_count("derStrongSequence", ev.der_strong as u64)
        .with_count("x509NameOidCount", ev.x509_name_attribute_count as u64);
    summary.add_reason("SIGNATURE_EVIDENCE_V1");

    let signer_present = ev.cert_envelopes + ev.pkcs7_envelopes + ev.signature_envelopes > 0 || ev.der_strong;
    if signer_present {
        summary.add_reason("SIGNER_PRESENT");
    }
    let chain_present = ev.cert_envelopes >= 2 || ev.chain_hint;
    if chain_present {
        summary.add_reason("CHAIN_PRESENT");
    }
    let timestamp_present = ev.timestamping_eku || ev.timestamp_hint;
    if timestamp_present {
        summary.add_reason("TIMESTAMP_PRESENT");
    }

    let mut findings = AdapterFindings::new(ADAPTER_ID, "signature");
    if ev.invalid_envelopes > 0 {
        findings.add_finding("SIGNATURE_ENVELOPE_INVALID", ev.invalid_envelopes as u64);
    }
    findings.markers = summary.markers.clone();

    RunResult::Ok {
        reason_codes: summary.reason_codes.clone(),
        adapter: AdapterMeta {
            adapter_id: ADAPTER_ID.to_string(),
            source_format: ctx.ext.clone(),
            mode: AdapterMode::BuiltIn,
            reason_codes: summary.reason_codes.clone(),
        },
        summary,
        findings,
        signals: Vec::new(),
    }
}

pub fn analyze(ctx: &AnalyzeContext) -> RunResult {
    if !matches!(ctx.ext.as_str(), ".cer" | ".crt" | ".pem" | ".p7b" | ".sig") {
        return if ctx.strict {
            fail(FailCode::SignatureUnsupportedFormat, "input extension is not a supported signature format")
        } else {
            RunResult::noop()
        };
    }

    let file_size = std::fs::metadata(ctx.path).map(|m| m.len()).unwrap_or(0);
    let Ok(head) = read_head(ctx.path, HEAD_WINDOW) else {
        return fail(FailCode::SignatureFormatMismatch, "could not read input");
    };
    let ev = gather(&head, file_size);

    if ctx.strict && !evidence_satisfies(ctx.ext.as_str(), &ev, file_size) {
        return fail(FailCode::SignatureFormatMismatch, "input does not carry sufficient signature evidence for its extension");
    }

    build_result(ctx, &ev)
}

#[cfg(test)]
mod tests {
    use super::*;
    use adapter_serde::{CaptureTree, EnabledPlugins};
    use std::io::Write;

    fn ctx_for<'a>(path: &'a std::path::Path, capture: &'a CaptureTree, plugins: &'a EnabledPlugins, strict: bool) -> AnalyzeContext<'a> {
        AnalyzeContext {
            path,
            capture,
            strict,
            plugins,
            ext: crate::extension::normalize(path),
        }
    }

    fn pem_wrap(label: &str, der: &[u8]) -> String {
        use std::fmt::Write as _;
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
    fn bare_der_certificate_satisfies_crt_route() {
        let mut der = vec![0x30, 0x81, 0x84];
        der.extend(std::iter::repeat(0u8).take(0x14));
        der.extend_from_slice(&[0x06, 0x03, 0x55, 0x04, 0x03]);
        der.extend(std::iter::repeat(0u8).take(0x84 - 0x14 - 5));
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cert.crt");
        std::fs::File::create(&path).unwrap().write_all(&der).unwrap();
        let capture = CaptureTree::empty();
        let plugins = EnabledPlugins::normalize(Vec::<String>::new()).unwrap();
        let ctx = ctx_for(&path, &capture, &plugins, true);
        assert!(analyze(&ctx).is_ok());
    }

    #[test]
    fn pem_certificate_envelope_satisfies_crt_route() {
        let der = [0x30, 0x03, 0x02, 0x01, 0x05];
        let text = pem_wrap("CERTIFICATE", &der);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cert.crt");
        std::fs::File::create(&path).unwrap().write_all(text.as_bytes()).unwrap();
        let capture = CaptureTree::empty();
        let plugins = EnabledPlugins::normalize(Vec::<String>::new()).unwrap();
        let ctx = ctx_for(&path, &capture, &plugins, true);
        match analyze(&ctx) {
            RunResult::Ok { summary, .. } => assert_eq!(summary.counts.get("pemCertificateCount"), Some(&1)),
            RunResult::Fail { fail_code, .. } => panic!("expected Ok, got {fail_code:?}"),
        }
    }

    #[test]
    fn plain_text_keywords_are_not_sufficient_evidence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cert.crt");
        std::fs::File::create(&path).unwrap().write_all(b"this is a certificate-chain with root-ca mentions").unwrap();
        let capture = CaptureTree::empty();
        let plugins = EnabledPlugins::normalize(Vec::<String>::new()).unwrap();
        let ctx = ctx_for(&path, &capture, &plugins, true);
        match analyze(&ctx) {
            RunResult::Fail { fail_code, .. } => assert_eq!(fail_code, FailCode::SignatureFormatMismatch),
            RunResult::Ok { .. } => panic!("expected Fail"),
        }
    }
}
