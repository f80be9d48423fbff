//! Browser/WebExtension analyzer (§4.5): `.crx, .vsix, .xpi`, or any
//! directory whose root carries a `manifest.json`.

use serde_json::Value;

use adapter_serde::{AdapterFindings, AdapterMeta, AdapterMode, AdapterSummary, FailCode, RunResult};

use crate::bytes;
use crate::canon::has_case_collision;
use crate::context::AnalyzeContext;
use crate::parsers::{crx, zip};
use crate::text::first_url_host;

const ADAPTER_ID: &str = "extension_adapter_v1";

fn fail(code: FailCode, message: &str) -> RunResult {
    RunResult::fail(code, message)
}

struct ManifestCounts {
    permission_count: u64,
    content_script_count: u64,
    host_match_count: u64,
    external_domain_count: u64,
}

fn inspect_manifest(manifest: &Value) -> Result<ManifestCounts, ()> {
    let obj = manifest.as_object().ok_or(())?;
    let manifest_version = obj.get("manifest_version").and_then(Value::as_u64).ok_or(())?;
    if !(2..=3).contains(&manifest_version) {
        return Err(());
    }
    let name_ok = obj.get("name").and_then(Value::as_str).map(|s| !s.is_empty()).unwrap_or(false);
    let version_ok = obj.get("version").and_then(Value::as_str).map(|s| !s.is_empty()).unwrap_or(false);
    if !name_ok || !version_ok {
        return Err(());
    }

    let permissions_len = obj.get("permissions").and_then(Value::as_array).map(Vec::len).unwrap_or(0);
    let host_permissions = obj.get("host_permissions").and_then(Value::as_array);
    let host_permissions_len = host_permissions.map(Vec::len).unwrap_or(0);
    let host_permission_strings = host_permissions
        .map(|arr| arr.iter().filter(|v| v.is_string()).count())
        .unwrap_or(0);

    let content_scripts = obj.get("content_scripts").and_then(Value::as_array);
    let content_script_count = content_scripts.map(Vec::len).unwrap_or(0);
    let content_script_matches: usize = content_scripts
        .map(|scripts| {
            scripts
                .iter()
                .filter_map(|s| s.get("matches").and_then(Value::as_array))
                .map(Vec::len)
                .sum()
        })
        .unwrap_or(0);

    let external_domain_count = obj
        .get("update_url")
        .and_then(Value::as_str)
        .and_then(first_url_host)
        .map(|_| 1)
        .unwrap_or(0);

    Ok(ManifestCounts {
        permission_count: (permissions_len + host_permissions_len) as u64,
        content_script_count: content_script_count as u64,
        host_match_count: (host_permission_strings + content_script_matches) as u64,
        external_domain_count,
    })
}

fn build_result(ctx: &AnalyzeContext, mode: AdapterMode, manifest_found: bool, counts: Option<ManifestCounts>, markers: &[&str]) -> RunResult {
    let mut summary = AdapterSummary::new(ADAPTER_ID, "extension", ctx.ext.clone(), mode)
        .with_count("manifestFound", manifest_found as u64);
    if let Some(c) = &counts {
        summary = summary
            .with_count("permissionCount", c.permission_count)
            .with_count("contentScriptCount", c.content_script_count)
            .with_count("hostMatchCount", c.host_match_count)
            .with_count("externalDomainCount", c.external_domain_count);
    }
    summary.add_reason("EXTENSION_ADAPTER_V1");
    for marker in markers {
        summary.add_marker(*marker);
    }
    if ctx.capture.truncated {
        summary.add_marker("EXTENSION_TRUNCATED");
    }

    let mut findings = AdapterFindings::new(ADAPTER_ID, "extension");
    if let Some(c) = &counts {
        if c.permission_count > 0 {
            findings.add_finding("EXTENSION_PERMISSION_PRESENT", c.permission_count);
        }
    }
    findings.markers = summary.markers.clone();

    RunResult::Ok {
        reason_codes: summary.reason_codes.clone(),
        adapter: AdapterMeta {
            adapter_id: ADAPTER_ID.to_string(),
            source_format: ctx.ext.clone(),
            mode,
            reason_codes: summary.reason_codes.clone(),
        },
        summary,
        findings,
        signals: Vec::new(),
    }
}

fn evaluate_zip_entries(ctx: &AnalyzeContext, zip_bytes: &[u8], parsed: &zip::ZipParseResult) -> RunResult {
    let paths: Vec<String> = parsed.entries.iter().map(|e| adapter_serde::normalize_path(&e.name)).collect();
    if ctx.strict && has_case_collision(paths.iter().map(|s| s.as_str())) {
        return fail(FailCode::ExtensionFormatMismatch, "extension package contains case-colliding entry paths");
    }

    let root_manifests: Vec<&zip::ZipCentralEntry> = parsed
        .entries
        .iter()
        .filter(|e| adapter_serde::normalize_path(&e.name) == "manifest.json")
        .collect();

    if root_manifests.len() > 1 {
        return fail(FailCode::ExtensionFormatMismatch, "extension package contains duplicate root manifest.json entries");
    }
    let Some(manifest_entry) = root_manifests.first() else {
        if ctx.strict {
            return fail(FailCode::ExtensionManifestMissing, "extension package has no root manifest.json");
        }
        return build_result(ctx, AdapterMode::BuiltIn, false, None, &[]);
    };

    let Some(text) = zip::extract_entry_text(zip_bytes, manifest_entry) else {
        return fail(FailCode::ExtensionManifestInvalid, "manifest.json could not be read from the package");
    };
    let manifest: Value = match serde_json::from_str(&text) {
        Ok(v) => v,
        Err(_) => return fail(FailCode::ExtensionManifestInvalid, "manifest.json is not valid JSON"),
    };
    match inspect_manifest(&manifest) {
        Ok(counts) => build_result(ctx, AdapterMode::BuiltIn, true, Some(counts), &[]),
        Err(()) => fail(FailCode::ExtensionManifestInvalid, "manifest.json is missing required fields"),
    }
}

fn analyze_crx_like(ctx: &AnalyzeContext) -> RunResult {
    let bytes = match bytes::read_full(ctx.path) {
        Ok(b) => b,
        Err(_) => return fail(FailCode::ExtensionFormatMismatch, "could not read package bytes"),
    };

    let (payload, is_crx) = if ctx.ext == ".crx" {
        match crx::parse(&bytes) {
            Some(parsed) => (bytes.get(parsed.payload_offset..).unwrap_or(&[]).to_vec(), true),
            None => {
                if ctx.strict {
                    return fail(FailCode::ExtensionFormatMismatch, "CRX header could not be parsed");
                }
                return RunResult::noop();
            }
        }
    } else {
        (bytes, false)
    };
    let _ = is_crx;

    let parsed = zip::parse(&payload);
    if ctx.strict && (!parsed.has_zip_signature || parsed.metadata_partial) {
        return fail(FailCode::ExtensionFormatMismatch, "embedded package is not a well-formed ZIP container");
    }
    evaluate_zip_entries(ctx, &payload, &parsed)
}

fn analyze_directory(ctx: &AnalyzeContext) -> RunResult {
    let manifest_path = ctx.path.join("manifest.json");
    let text = match std::fs::read_to_string(&manifest_path) {
        Ok(t) => t,
        Err(_) => {
            return if ctx.strict {
                fail(FailCode::ExtensionManifestMissing, "directory has no root manifest.json")
            } else {
                build_result(ctx, AdapterMode::BuiltIn, false, None, &[])
            };
        }
    };
    let manifest: Value = match serde_json::from_str(&text) {
        Ok(v) => v,
        Err(_) => return fail(FailCode::ExtensionManifestInvalid, "manifest.json is not valid JSON"),
    };
    match inspect_manifest(&manifest) {
        Ok(counts) => build_result(ctx, AdapterMode::BuiltIn, true, Some(counts), &[]),
        Err(()) => fail(FailCode::ExtensionManifestInvalid, "manifest.json is missing required fields"),
    }
}

pub fn analyze(ctx: &AnalyzeContext) -> RunResult {
    if ctx.is_directory() {
        return analyze_directory(ctx);
    }
    match ctx.ext.as_str() {
        ".crx" | ".vsix" | ".xpi" => analyze_crx_like(ctx),
        _ => {
            if ctx.strict {
                fail(FailCode::ExtensionUnsupportedFormat, "input extension is not a supported extension package format")
            } else {
                RunResult::noop()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adapter_serde::{CaptureTree, EnabledPlugins};
    use std::io::Write;

    fn build_minimal_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
        const LFH: [u8; 4] = [0x50, 0x4B, 0x03, 0x04];
        const CD: [u8; 4] = [0x50, 0x4B, 0x01, 0x02];
        const EOCD: [u8; 4] = [0x50, 0x4B, 0x05, 0x06];
        let mut out = Vec::new();
        let mut central = Vec::new();
        let mut offsets = Vec::new();
        for (name, data) in entries {
            offsets.push(out.len() as u32);
            out.extend_from_slice(&LFH);
            out.extend_from_slice(&[0u8; 2]);
            out.extend_from_slice(&[0u8; 2]);
            out.extend_from_slice(&[0u8; 2]);
            out.extend_from_slice(&[0u8; 4]);
            out.extend_from_slice(&[0u8; 4]);
            out.extend_from_slice(&(data.len() as u32).to_le_bytes());
            out.extend_from_slice(&(data.len() as u32).to_le_bytes());
            out.extend_from_slice(&(name.len() as u16).to_le_bytes());
            out.extend_from_slice(&0u16.to_le_bytes());
            out.extend_from_slice(name.as_bytes());
            out.extend_from_slice(data);
        }
        let cd_offset = out.len() as u32;
        for (i, (name, data)) in entries.iter().enumerate() {
            central.extend_from_slice(&CD);
            central.extend_from_slice(&[0u8; 4]);
            central.extend_from_slice(&[0u8; 2]);
            central.extend_from_slice(&[0u8; 2]);
            central.extend_from_slice(&[0u8; 4]);
            central.extend_from_slice(&[0u8; 4]);
            central.extend_from_slice(&(data.len() as u32).to_le_bytes());
            central.extend_from_slice(&(data.len() as u32).to_le_bytes());
            central.extend_from_slice(&(name.len() as u16).to_le_bytes());
            central.extend_from_slice(&[0u8; 6]);
            central.extend_from_slice(&[0u8; 4]);
            central.extend_from_slice(&offsets[i].to_le_bytes());
            central.extend_from_slice(name.as_bytes());
        }
        out.extend_from_slice(&central);
        out.extend_from_slice(&EOCD);
        out.extend_from_slice(&[0u8; 4]);
        out.extend_from_slice(&(entries.len() as u16).to_le_bytes());
        out.extend_from_slice(&(entries.len() as u16).to_le_bytes());
        out.extend_from_slice(&(central.len() as u32).to_le_bytes());
        out.extend_from_slice(&cd_offset.to_le_bytes());
        out.extend_from_slice(&[0u8; 2]);
        out
    }

    #[test]
    fn crx_unwrap_extracts_manifest_permissions() {
        let manifest = br#"{"manifest_version":3,"name":"demo","version":"1.0.0","permissions":["storage"]}"#;
        let zip = build_minimal_zip(&[("manifest.json", manifest)]);
        let mut crx_header = b"Cr24".to_vec();
        crx_header.extend_from_slice(&3u32.to_le_bytes());
        crx_header.extend_from_slice(&0u32.to_le_bytes());
        let mut file_bytes = crx_header;
        file_bytes.extend_from_slice(&zip);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ext.crx");
        std::fs::File::create(&path).unwrap().write_all(&file_bytes).unwrap();

        let capture = CaptureTree::empty();
        let plugins = EnabledPlugins::normalize(Vec::<String>::new()).unwrap();
        let ctx = AnalyzeContext {
            path: &path,
            capture: &capture,
            strict: true,
            plugins: &plugins,
            ext: crate::extension::normalize(&path),
        };
        let result = analyze(&ctx);
        match result {
            RunResult::Ok { summary, .. } => {
                assert_eq!(summary.source_class, "extension");
                assert_eq!(summary.counts.get("permissionCount"), Some(&1));
            }
            RunResult::Fail { fail_code, .. } => panic!("expected Ok, got {fail_code:?}"),
        }
    }

    #[test]
    fn duplicate_root_manifest_is_format_mismatch() {
        let zip = build_minimal_zip(&[("manifest.json", b"{}"), ("MANIFEST.JSON", b"{}")]);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ext.xpi");
        std::fs::File::create(&path).unwrap().write_all(&zip).unwrap();

        let capture = CaptureTree::empty();
        let plugins = EnabledPlugins::normalize(Vec::<String>::new()).unwrap();
        let ctx = AnalyzeContext {
            path: &path,
            capture: &capture,
            strict: true,
            plugins: &plugins,
            ext: crate::extension::normalize(&path),
        };
        assert!(!analyze(&ctx).is_ok());
    }
}
