//! Archive analyzer (§4.3): `.zip, .tar, .tar.gz, .tar.bz2, .tar.xz,
//! .tgz, .txz, .7z`.

use std::path::Path;

use adapter_serde::{AdapterFindings, AdapterMeta, AdapterMode, AdapterSummary, FailCode, Plugin, RunResult};

use crate::bytes;
use crate::canon::has_case_collision;
use crate::context::AnalyzeContext;
use crate::external::{self, ENUMERATION_TIMEOUT};
use crate::parsers::{tar, zip};

const ADAPTER_ID: &str = "archive_adapter_v1";
const ARCHIVE_EXTS: &[&str] = &[".zip", ".tar", ".tar.gz", ".tar.bz2", ".tar.xz", ".tgz", ".txz", ".7z"];

fn path_depth(path: &str) -> u64 {
    path.split('/').filter(|s| !s.is_empty()).count() as u64
}

fn is_archive_ext(name: &str) -> bool {
    let ext = crate::extension::normalize(Path::new(name));
    ARCHIVE_EXTS.contains(&ext.as_str())
}

struct EntryStats {
    entry_count: u64,
    nested_archive_count: u64,
    max_depth: u64,
    truncated: bool,
}

fn stats_for(paths: &[String]) -> EntryStats {
    EntryStats {
        entry_count: paths.len() as u64,
        nested_archive_count: paths.iter().filter(|p| is_archive_ext(p)).count() as u64,
        max_depth: paths.iter().map(|p| path_depth(p)).max().unwrap_or(0),
        truncated: paths.len() > crate::canon::MAX_LIST_ITEMS,
    }
}

fn build_ok(ctx: &AnalyzeContext, stats: EntryStats, mode: AdapterMode, extra_markers: &[&str]) -> RunResult {
    let mut summary = AdapterSummary::new(ADAPTER_ID, "archive", ctx.ext.clone(), mode)
        .with_count("entryCount", stats.entry_count)
        .with_count("nestedArchiveCount", stats.nested_archive_count)
        .with_count("maxDepth", stats.max_depth);
    summary.add_reason("ARCHIVE_ADAPTER_V1");
    if stats.truncated || ctx.capture.truncated {
        summary.add_marker("ARCHIVE_TRUNCATED");
    }
    for marker in extra_markers {
        summary.add_marker(*marker);
    }

    let mut findings = AdapterFindings::new(ADAPTER_ID, "archive");
    if stats.nested_archive_count > 0 {
        findings.add_finding("ARCHIVE_NESTED_ENTRY", stats.nested_archive_count);
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

fn fail(code: FailCode, message: &str) -> RunResult {
    RunResult::fail(code, message)
}

pub fn analyze(ctx: &AnalyzeContext) -> RunResult {
    match ctx.ext.as_str() {
        ".zip" => analyze_zip(ctx),
        ".tar" => analyze_tar(ctx),
        ".tar.gz" | ".tar.bz2" | ".tar.xz" | ".tgz" | ".txz" => analyze_plugin_tar(ctx),
        ".7z" => analyze_seven_zip(ctx),
        _ => {
            if ctx.strict {
                fail(FailCode::ArchiveUnsupportedFormat, "input extension is not a supported archive format")
            } else {
                RunResult::noop()
            }
        }
    }
}

fn analyze_zip(ctx: &AnalyzeContext) -> RunResult {
    let bytes = match bytes::read_full(ctx.path) {
        Ok(b) => b,
        Err(_) => return fail_or_noop(ctx, FailCode::ArchiveFormatMismatch, "could not read archive bytes"),
    };
    let parsed = zip::parse(&bytes);

    if ctx.strict && !parsed.has_zip_signature {
        return fail(FailCode::ArchiveFormatMismatch, "input does not begin with a recognized ZIP signature");
    }
    if ctx.strict && parsed.metadata_partial {
        return fail(FailCode::ArchiveFormatMismatch, "ZIP central directory could not be fully parsed");
    }

    let paths: Vec<String> = parsed.entries.iter().map(|e| adapter_serde::normalize_path(&e.name)).collect();
    if ctx.strict && has_case_collision(paths.iter().map(|s| s.as_str())) {
        return fail(FailCode::ArchiveFormatMismatch, "archive contains case-colliding entry paths");
    }

    let stats = stats_for(&paths);
    let mut markers: Vec<&str> = Vec::new();
    if !parsed.has_zip_signature {
        markers.push("ARCHIVE_FORMAT_MISMATCH");
    }
    if parsed.metadata_partial {
        markers.push("ARCHIVE_METADATA_PARTIAL");
    }
    build_ok(ctx, stats, AdapterMode::BuiltIn, &markers)
}

fn analyze_tar(ctx: &AnalyzeContext) -> RunResult {
    let bytes = match bytes::read_full(ctx.path) {
        Ok(b) => b,
        Err(_) => return fail_or_noop(ctx, FailCode::ArchiveFormatMismatch, "could not read archive bytes"),
    };
    let parsed = tar::parse(&bytes);
    if ctx.strict && parsed.metadata_partial {
        return fail(FailCode::ArchiveFormatMismatch, "TAR blocks could not be fully parsed");
    }

    let paths: Vec<String> = parsed.entries.iter().map(|e| adapter_serde::normalize_path(&e.name)).collect();
    if ctx.strict && has_case_collision(paths.iter().map(|s| s.as_str())) {
        return fail(FailCode::ArchiveFormatMismatch, "archive contains case-colliding entry paths");
    }

    let stats = stats_for(&paths);
    let markers: &[&str] = if parsed.metadata_partial { &["ARCHIVE_METADATA_PARTIAL"] } else { &[] };
    build_ok(ctx, stats, AdapterMode::BuiltIn, markers)
}

fn analyze_plugin_tar(ctx: &AnalyzeContext) -> RunResult {
    if !ctx.plugins.contains(Plugin::Tar) {
        return fail_or_noop(ctx, FailCode::ArchivePluginRequired, "tar plugin is required to enumerate this archive");
    }
    let path_str = ctx.path.to_string_lossy().into_owned();
    let outcome = external::run_bounded("tar", &["-tf", &path_str], ENUMERATION_TIMEOUT);
    if !outcome.succeeded() {
        return fail_or_noop(ctx, FailCode::ArchivePluginUnavailable, "tar is unavailable or failed to enumerate this archive");
    }

    let paths: Vec<String> = outcome
        .stdout_text()
        .lines()
        .map(|l| adapter_serde::normalize_path(l.trim()))
        .filter(|l| !l.is_empty())
        .collect();
    if ctx.strict && has_case_collision(paths.iter().map(|s| s.as_str())) {
        return fail(FailCode::ArchiveFormatMismatch, "archive contains case-colliding entry paths");
    }

    let stats = stats_for(&paths);
    build_ok(ctx, stats, AdapterMode::Plugin, &[])
}

fn analyze_seven_zip(ctx: &AnalyzeContext) -> RunResult {
    if !ctx.plugins.contains(Plugin::SevenZip) {
        return fail_or_noop(ctx, FailCode::ArchivePluginRequired, "7z plugin is required to enumerate this archive");
    }
    let path_str = ctx.path.to_string_lossy().into_owned();
    let outcome = external::run_bounded("7z", &["l", "-slt", &path_str], ENUMERATION_TIMEOUT);
    if !outcome.succeeded() {
        return fail_or_noop(ctx, FailCode::ArchivePluginUnavailable, "7z is unavailable or failed to enumerate this archive");
    }

    let paths: Vec<String> = outcome
        .stdout_text()
        .lines()
        .filter_map(|l| l.strip_prefix("Path = "))
        .map(adapter_serde::normalize_path)
        .filter(|l| !l.is_empty())
        .collect();
    if ctx.strict && has_case_collision(paths.iter().map(|s| s.as_str())) {
        return fail(FailCode::ArchiveFormatMismatch, "archive contains case-colliding entry paths");
    }

    let stats = stats_for(&paths);
    build_ok(ctx, stats, AdapterMode::Plugin, &[])
}

fn fail_or_noop(ctx: &AnalyzeContext, code: FailCode, message: &str) -> RunResult {
    if ctx.strict {
        fail(code, message)
    } else {
        let mut summary = AdapterSummary::new(ADAPTER_ID, "archive", ctx.ext.clone(), AdapterMode::BuiltIn);
        summary.add_reason("ARCHIVE_ADAPTER_V1");
        summary.add_marker(code.as_str());
        let mut findings = AdapterFindings::new(ADAPTER_ID, "archive");
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
}

#[cfg(test)]
mod tests {
    use super::*;
    use adapter_serde::{CaptureTree, EnabledPlugins, Selection};
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
            out.extend_from_slice(&[0u8; 2]); // version
            out.extend_from_slice(&[0u8; 2]); // flags
            out.extend_from_slice(&[0u8; 2]); // method
            out.extend_from_slice(&[0u8; 4]); // time+date
            out.extend_from_slice(&[0u8; 4]); // crc
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
            central.extend_from_slice(&[0u8; 4]); // version made by + needed
            central.extend_from_slice(&[0u8; 2]); // flags
            central.extend_from_slice(&[0u8; 2]); // method
            central.extend_from_slice(&[0u8; 4]); // time+date
            central.extend_from_slice(&[0u8; 4]); // crc
            central.extend_from_slice(&(data.len() as u32).to_le_bytes());
            central.extend_from_slice(&(data.len() as u32).to_le_bytes());
            central.extend_from_slice(&(name.len() as u16).to_le_bytes());
            central.extend_from_slice(&[0u8; 6]); // extra+comment+disk
            central.extend_from_slice(&[0u8; 4]); // attrs
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
    fn zip_determinism_matches_seed_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seed.zip");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(&build_minimal_zip(&[("a.txt", b"x"), ("b/c.txt", b"y")])).unwrap();

        let capture = CaptureTree::empty();
        let plugins = EnabledPlugins::normalize(Vec::<String>::new()).unwrap();
        let ctx = AnalyzeContext {
            path: &path,
            capture: &capture,
            strict: Selection::Archive.is_strict(),
            plugins: &plugins,
            ext: crate::extension::normalize(&path),
        };

        let first = analyze(&ctx);
        let second = analyze(&ctx);
        let first_json = serde_json::to_string(&first).unwrap();
        let second_json = serde_json::to_string(&second).unwrap();
        assert_eq!(first_json, second_json);

        match first {
            RunResult::Ok { summary, .. } => {
                assert_eq!(summary.adapter_id, ADAPTER_ID);
                assert_eq!(summary.counts.get("entryCount"), Some(&2));
                assert_eq!(summary.counts.get("maxDepth"), Some(&2));
                assert_eq!(summary.counts.get("nestedArchiveCount"), Some(&0));
            }
            RunResult::Fail { .. } => panic!("expected Ok"),
        }
    }
}
