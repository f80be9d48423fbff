//! Container analyzer (§4.8): OCI directories/tarballs, Docker image
//! tarballs, Compose files, and SBOM JSON documents.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use adapter_serde::{normalize_path, AdapterFindings, AdapterMeta, AdapterMode, AdapterSummary, FailCode, RunResult};

use crate::bytes::read_full;
use crate::context::AnalyzeContext;
use crate::parsers::{docker, oci, tar};
use crate::text::bounded_text;

const ADAPTER_ID: &str = "container_adapter_v1";

fn fail(code: FailCode, message: &str) -> RunResult {
    RunResult::fail(code, message)
}

fn entry_text<'a>(bytes: &'a [u8], entry: &tar::TarEntry) -> Option<String> {
    let start = entry.data_offset;
    let end = start.checked_add(entry.size as usize)?;
    if end > bytes.len() {
        return None;
    }
    let (text, _) = bounded_text(&bytes[start..end]);
    Some(text)
}

fn file_name_lower(ctx: &AnalyzeContext) -> String {
    ctx.path.file_name().and_then(|n| n.to_str()).unwrap_or("").to_ascii_lowercase()
}

struct Counters {
    counts: std::collections::BTreeMap<&'static str, u64>,
}

impl Counters {
    fn new() -> Counters {
        Counters { counts: std::collections::BTreeMap::new() }
    }
    fn set(&mut self, key: &'static str, value: u64) {
        self.counts.insert(key, value);
    }
    fn bump(&mut self, key: &'static str, delta: u64) {
        *self.counts.entry(key).or_insert(0) += delta;
    }
}

fn build_result(ctx: &AnalyzeContext, counters: Counters, reasons: &[&str], markers: &[&str]) -> RunResult {
    let mut summary = AdapterSummary::new(ADAPTER_ID, "container", ctx.ext.clone(), AdapterMode::BuiltIn);
    for (key, value) in counters.counts {
        summary = summary.with_count(key, value);
    }
    for reason in reasons {
        summary.add_reason(*reason);
    }
    for marker in markers {
        summary.add_marker(*marker);
    }

    let findings = AdapterFindings::new(ADAPTER_ID, "container");
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

fn analyze_oci_dir(ctx: &AnalyzeContext) -> RunResult {
    let layout_path = ctx.path.join("oci-layout");
    let index_path = ctx.path.join("index.json");
    let (Ok(layout_text), Ok(index_text)) = (std::fs::read_to_string(&layout_path), std::fs::read_to_string(&index_path)) else {
        return fail(FailCode::ContainerLayoutInvalid, "oci-layout or index.json could not be read");
    };

    let layout_valid = oci::parse_oci_layout(&layout_text);
    if ctx.strict && !layout_valid {
        return fail(FailCode::ContainerLayoutInvalid, "oci-layout does not carry imageLayoutVersion");
    }

    let index = oci::parse_index(&index_text);
    if ctx.strict && !index.index_is_valid_shape {
        return fail(FailCode::ContainerIndexInvalid, "index.json manifests is missing or empty");
    }

    let mut resolved = 0u64;
    let mut digest_refs = 0u64;
    for manifest in &index.manifests {
        if let Some(hex) = &manifest.digest_hex {
            digest_refs += 1;
            if ctx.path.join("blobs").join("sha256").join(hex).is_file() {
                resolved += 1;
            }
        }
    }
    if ctx.strict && digest_refs != resolved {
        return fail(FailCode::ContainerIndexInvalid, "a manifest digest did not resolve to a blob in the capture");
    }

    let mut counters = Counters::new();
    counters.set("ociLayoutPresent", 1);
    counters.set("ociManifestCount", index.manifests.len() as u64);
    counters.set("ociManifestDigestRefCount", digest_refs);
    counters.set("ociManifestDigestResolvedCount", resolved);
    build_result(ctx, counters, &["CONTAINER_OCI_LAYOUT"], &[])
}

fn analyze_tar_shape(ctx: &AnalyzeContext) -> RunResult {
    let Ok(bytes) = read_full(ctx.path) else {
        return fail(FailCode::ContainerFormatMismatch, "could not read input");
    };
    let parsed = tar::parse(&bytes);
    let paths: Vec<String> = parsed.entries.iter().map(|e| normalize_path(&e.name)).collect();

    let has_oci_layout = paths.iter().any(|p| p == "oci-layout");
    let has_index = paths.iter().any(|p| p == "index.json");
    let has_blobs = paths.iter().any(|p| p.starts_with("blobs/sha256/"));

    if has_oci_layout && has_index && has_blobs {
        return analyze_oci_tar(ctx, &bytes, &parsed, &paths);
    }

    let has_manifest = paths.iter().any(|p| p == "manifest.json");
    let has_repositories = paths.iter().any(|p| p == "repositories");
    if has_manifest && has_repositories {
        return analyze_docker_tar(ctx, &bytes, &parsed, &paths);
    }

    if ctx.strict {
        fail(FailCode::ContainerFormatMismatch, "tarball does not match the OCI or Docker container shape")
    } else {
        RunResult::noop()
    }
}

fn analyze_oci_tar(ctx: &AnalyzeContext, bytes: &[u8], parsed: &tar::TarParseResult, paths: &[String]) -> RunResult {
    let layout_entry = parsed.entries.iter().find(|e| normalize_path(&e.name) == "oci-layout");
    let index_entry = parsed.entries.iter().find(|e| normalize_path(&e.name) == "index.json");
    let (Some(layout_entry), Some(index_entry)) = (layout_entry, index_entry) else {
        return fail(FailCode::ContainerLayoutInvalid, "oci-layout or index.json entry could not be located");
    };
    let (Some(layout_text), Some(index_text)) = (entry_text(bytes, layout_entry), entry_text(bytes, index_entry)) else {
        return fail(FailCode::ContainerLayoutInvalid, "oci-layout or index.json entry could not be read");
    };

    let layout_valid = oci::parse_oci_layout(&layout_text);
    if ctx.strict && !layout_valid {
        return fail(FailCode::ContainerLayoutInvalid, "oci-layout does not carry imageLayoutVersion");
    }
    let index = oci::parse_index(&index_text);
    if ctx.strict && !index.index_is_valid_shape {
        return fail(FailCode::ContainerIndexInvalid, "index.json manifests is missing or empty");
    }

    let blob_paths: std::collections::HashSet<&String> = paths.iter().filter(|p| p.starts_with("blobs/sha256/")).collect();
    let mut resolved = 0u64;
    let mut digest_refs = 0u64;
    for manifest in &index.manifests {
        if let Some(hex) = &manifest.digest_hex {
            digest_refs += 1;
            let expected = format!("blobs/sha256/{hex}");
            if blob_paths.contains(&expected) {
                resolved += 1;
            }
        }
    }
    if ctx.strict && digest_refs != resolved {
        return fail(FailCode::ContainerIndexInvalid, "a manifest digest did not resolve to a blob entry in the tar");
    }

    let mut counters = Counters::new();
    counters.set("ociTarballPresent", 1);
    counters.set("tarballScanPresent", 1);
    counters.set("tarEntryCount", parsed.entries.len() as u64);
    counters.set("ociBlobCount", blob_paths.len() as u64);
    counters.set("ociManifestCount", index.manifests.len() as u64);
    counters.set("ociManifestDigestRefCount", digest_refs);
    counters.set("ociManifestDigestResolvedCount", resolved);
    build_result(ctx, counters, &["CONTAINER_TARBALL_SCAN"], &[])
}

fn analyze_docker_tar(ctx: &AnalyzeContext, bytes: &[u8], parsed: &tar::TarParseResult, paths: &[String]) -> RunResult {
    let manifest_entry = parsed.entries.iter().find(|e| normalize_path(&e.name) == "manifest.json");
    let repositories_entry = parsed.entries.iter().find(|e| normalize_path(&e.name) == "repositories");
    let (Some(manifest_entry), Some(repositories_entry)) = (manifest_entry, repositories_entry) else {
        return fail(FailCode::ContainerFormatMismatch, "manifest.json or repositories entry could not be located");
    };
    let (Some(manifest_text), Some(repositories_text)) = (entry_text(bytes, manifest_entry), entry_text(bytes, repositories_entry)) else {
        return fail(FailCode::ContainerFormatMismatch, "manifest.json or repositories entry could not be read");
    };

    let manifest = docker::parse_manifest(&manifest_text);
    let repositories_valid = docker::parse_repositories(&repositories_text);

    let layer_entries: u64 = paths.iter().filter(|p| p.ends_with("layer.tar")).count() as u64;
    let has_layer_tar = layer_entries > 0;

    let top_level: std::collections::HashSet<&String> = paths.iter().collect();
    let mut layer_ref_count: u64 = 0;
    let mut layer_resolved_count: u64 = 0;
    let mut config_unresolved = false;
    for entry in &manifest.entries {
        if let Some(config) = &entry.config {
            if !top_level.contains(config) {
                config_unresolved = true;
            }
        }
        for layer in &entry.layers {
            layer_ref_count += 1;
            if top_level.contains(layer) {
                layer_resolved_count += 1;
            }
        }
    }

    if ctx.strict {
        if !manifest.is_valid_shape || !repositories_valid || !has_layer_tar {
            return fail(FailCode::ContainerFormatMismatch, "manifest.json/repositories/layer.tar did not satisfy the Docker tarball structural gate");
        }
        if config_unresolved || layer_resolved_count != layer_ref_count {
            return fail(FailCode::ContainerFormatMismatch, "manifest.json Config or Layers entry did not resolve to a top-level tar entry");
        }
    }

    let mut counters = Counters::new();
    counters.set("tarballScanPresent", 1);
    counters.set("tarEntryCount", parsed.entries.len() as u64);
    counters.set("dockerLayerEntryCount", layer_entries);
    counters.set("dockerManifestLayerRefCount", layer_ref_count);
    counters.set("dockerManifestLayerResolvedCount", layer_resolved_count);
    counters.set("dockerManifestJsonValid", manifest.is_valid_shape as u64);
    counters.set("dockerRepositoriesJsonValid", repositories_valid as u64);
    build_result(ctx, counters, &["CONTAINER_TARBALL_SCAN"], &[])
}

fn services_block_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^services:\s*$").expect("static regex"))
}

fn service_key_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^  [A-Za-z0-9_.-]+:\s*$").expect("static regex"))
}

fn image_ref_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^\s*image:\s*\S+").expect("static regex"))
}

fn build_hint_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^\s*build:").expect("static regex"))
}

fn analyze_compose(ctx: &AnalyzeContext) -> RunResult {
    let Ok(bytes) = read_full(ctx.path) else {
        return fail(FailCode::ContainerFormatMismatch, "could not read input");
    };
    let (text, _) = bounded_text(&bytes);

    let services_blocks = services_block_re().find_iter(&text).count() as u64;
    if ctx.strict && services_blocks == 0 {
        return fail(FailCode::ContainerFormatMismatch, "compose file has no services: block");
    }

    let service_keys = service_key_re().find_iter(&text).count() as u64;
    let image_refs = image_ref_re().find_iter(&text).count() as u64;
    let build_hints = build_hint_re().find_iter(&text).count() as u64;
    let with_image_or_build = if services_blocks > 0 { image_refs.min(service_keys).max(build_hints.min(service_keys)) } else { 0 };

    let mut counters = Counters::new();
    counters.set("composeHintPresent", 1);
    counters.set("composeServicesBlockCount", services_blocks);
    counters.set("composeServiceHintCount", service_keys);
    counters.set("composeImageRefCount", image_refs);
    counters.set("composeBuildHintCount", build_hints);
    counters.set("composeServiceWithImageOrBuildCount", with_image_or_build);
    build_result(ctx, counters, &[], &[])
}

fn analyze_sbom(ctx: &AnalyzeContext) -> RunResult {
    let Ok(bytes) = read_full(ctx.path) else {
        return fail(FailCode::ContainerFormatMismatch, "could not read input");
    };
    let (text, _) = bounded_text(&bytes);
    let value: Value = match serde_json::from_str(&text) {
        Ok(v) => v,
        Err(_) => {
            return if ctx.strict {
                fail(FailCode::ContainerSbomInvalid, "SBOM file is not valid JSON")
            } else {
                RunResult::noop()
            };
        }
    };

    let packages = value.get("packages").and_then(Value::as_array);
    let components = value.get("components").and_then(Value::as_array);
    let populated = |arr: &Vec<Value>| arr.iter().any(|v| v.as_object().map(|o| !o.is_empty()).unwrap_or(false));
    let package_count = packages.map(|arr| arr.len()).unwrap_or(0) + components.map(|arr| arr.len()).unwrap_or(0);
    let has_populated = packages.map(populated).unwrap_or(false) || components.map(populated).unwrap_or(false);

    if ctx.strict && !has_populated {
        return fail(FailCode::ContainerSbomInvalid, "SBOM has no meaningfully populated packages or components array");
    }

    let mut counters = Counters::new();
    counters.set("sbomPresent", 1);
    counters.set("sbomPackageCount", package_count as u64);
    build_result(ctx, counters, &["CONTAINER_SBOM_PRESENT"], &[])
}

pub fn analyze(ctx: &AnalyzeContext) -> RunResult {
    if ctx.is_directory() {
        if ctx.path.join("oci-layout").is_file() && ctx.path.join("index.json").is_file() {
            return analyze_oci_dir(ctx);
        }
        return if ctx.strict {
            fail(FailCode::ContainerFormatMismatch, "directory does not contain an OCI layout")
        } else {
            RunResult::noop()
        };
    }

    if ctx.ext == ".tar" {
        return analyze_tar_shape(ctx);
    }

    let name = file_name_lower(ctx);
    if name == "docker-compose.yml" || name == "docker-compose.yaml" || name == "compose.yml" || name == "compose.yaml" {
        return analyze_compose(ctx);
    }
    if ctx.ext == ".json" && (name.contains("sbom") || name.contains("spdx") || name.contains("cyclonedx") || name.contains("bom")) {
        return analyze_sbom(ctx);
    }

    if ctx.strict {
        fail(FailCode::ContainerUnsupportedFormat, "input does not match a recognized container shape")
    } else {
        RunResult::noop()
    }
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

    #[test]
    fn compose_requires_services_block_in_strict_mode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docker-compose.yml");
        std::fs::File::create(&path).unwrap().write_all(b"version: \"3\"\n").unwrap();
        let capture = CaptureTree::empty();
        let plugins = EnabledPlugins::normalize(Vec::<String>::new()).unwrap();
        let ctx = ctx_for(&path, &capture, &plugins, true);
        match analyze(&ctx) {
            RunResult::Fail { fail_code, .. } => assert_eq!(fail_code, FailCode::ContainerFormatMismatch),
            RunResult::Ok { .. } => panic!("expected Fail"),
        }
    }

    #[test]
    fn sbom_with_empty_packages_fails_strict() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.sbom.json");
        std::fs::File::create(&path).unwrap().write_all(br#"{"packages":[]}"#).unwrap();
        let capture = CaptureTree::empty();
        let plugins = EnabledPlugins::normalize(Vec::<String>::new()).unwrap();
        let ctx = ctx_for(&path, &capture, &plugins, true);
        match analyze(&ctx) {
            RunResult::Fail { fail_code, .. } => assert_eq!(fail_code, FailCode::ContainerSbomInvalid),
            RunResult::Ok { .. } => panic!("expected Fail"),
        }
    }
}
