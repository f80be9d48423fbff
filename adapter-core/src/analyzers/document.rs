//! Document analyzer (§4.7): `.pdf, .docm, .xlsm, .rtf, .chm`.

use std::sync::OnceLock;

use regex::Regex;

use adapter_serde::{normalize_path, AdapterFindings, AdapterMeta, AdapterMode, AdapterSummary, FailCode, RunResult};

use crate::bytes::{read_full, read_head, read_tail};
use crate::canon::has_case_collision;
use crate::context::AnalyzeContext;
use crate::parsers::ooxml::{self, OoxmlKind};
use crate::parsers::pdf_rtf_chm::{check_chm, check_pdf, check_rtf};
use crate::parsers::zip;
use crate::text::bounded_text;

const ADAPTER_ID: &str = "document_adapter_v1";
const HEAD_WINDOW: usize = 4096;
const TAIL_WINDOW: usize = 4096;

fn fail(code: FailCode, message: &str) -> RunResult {
    RunResult::fail(code, message)
}

fn active_content_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)vba|macro|autoopen|autorun|javascript").expect("static regex"))
}

fn embedded_object_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"EmbeddedFile|ObjStm|/Object|Ole").expect("static regex"))
}

fn external_link_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"https?://|TargetMode\s*=\s*"External""#).expect("static regex"))
}

struct Counts {
    active_content: u64,
    embedded_object: u64,
    external_link: u64,
}

fn count_over(text: &str) -> Counts {
    Counts {
        active_content: active_content_re().find_iter(text).count() as u64,
        embedded_object: embedded_object_re().find_iter(text).count() as u64,
        external_link: external_link_re().find_iter(text).count() as u64,
    }
}

fn merge(a: Counts, b: Counts) -> Counts {
    Counts {
        active_content: a.active_content + b.active_content,
        embedded_object: a.embedded_object + b.embedded_object,
        external_link: a.external_link + b.external_link,
    }
}

fn build_result(ctx: &AnalyzeContext, counts: Counts) -> RunResult {
    let mut summary = AdapterSummary::new(ADAPTER_ID, "document", ctx.ext.clone(), AdapterMode::BuiltIn)
        .with_count("activeContentCount", counts.active_content)
        .with_count("embeddedObjectCount", counts.embedded_object)
        .with_count("externalLinkCount", counts.external_link);
    summary.add_reason("DOCUMENT_ADAPTER_V1");

    let mut findings = AdapterFindings::new(ADAPTER_ID, "document");
    if counts.active_content > 0 {
        findings.add_finding("DOC_ACTIVE_CONTENT", counts.active_content);
    }
    if counts.embedded_object > 0 {
        findings.add_finding("DOC_EMBEDDED_OBJECT", counts.embedded_object);
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

fn analyze_pdf(ctx: &AnalyzeContext) -> RunResult {
    let Ok(head) = read_head(ctx.path, HEAD_WINDOW) else {
        return fail(FailCode::DocFormatMismatch, "could not read input");
    };
    let Ok(tail) = read_tail(ctx.path, TAIL_WINDOW) else {
        return fail(FailCode::DocFormatMismatch, "could not read input");
    };
    let check = check_pdf(&head, &tail);
    if ctx.strict && !check.is_structurally_valid() {
        return fail(FailCode::DocFormatMismatch, "input does not satisfy the PDF structural gate");
    }
    let (head_text, _) = bounded_text(&head);
    let (tail_text, _) = bounded_text(&tail);
    build_result(ctx, merge(count_over(&head_text), count_over(&tail_text)))
}

fn analyze_rtf(ctx: &AnalyzeContext) -> RunResult {
    let Ok(head) = read_head(ctx.path, HEAD_WINDOW) else {
        return fail(FailCode::DocFormatMismatch, "could not read input");
    };
    let Ok(tail) = read_tail(ctx.path, TAIL_WINDOW) else {
        return fail(FailCode::DocFormatMismatch, "could not read input");
    };
    let check = check_rtf(&head, &tail);
    if ctx.strict && !check.is_structurally_valid() {
        return fail(FailCode::DocFormatMismatch, "input does not satisfy the RTF structural gate");
    }
    let (head_text, _) = bounded_text(&head);
    build_result(ctx, count_over(&head_text))
}

fn analyze_chm(ctx: &AnalyzeContext) -> RunResult {
    let Ok(bytes) = read_full(ctx.path) else {
        return fail(FailCode::DocFormatMismatch, "could not read input");
    };
    let check = check_chm(&bytes, bytes.len() as u64);
    if ctx.strict && !check.is_structurally_valid() {
        return fail(FailCode::DocFormatMismatch, "input does not satisfy the CHM structural gate");
    }
    let (text, _) = bounded_text(&bytes);
    build_result(ctx, count_over(&text))
}

fn analyze_ooxml(ctx: &AnalyzeContext, kind: OoxmlKind) -> RunResult {
    let Ok(bytes) = read_full(ctx.path) else {
        return fail(FailCode::DocFormatMismatch, "could not read input");
    };
    let parsed = zip::parse(&bytes);
    if ctx.strict && !parsed.has_zip_signature {
        return fail(FailCode::DocFormatMismatch, "input is not a well-formed ZIP container");
    }

    let paths: Vec<String> = parsed.entries.iter().map(|e| normalize_path(&e.name)).collect();
    if ctx.strict && has_case_collision(paths.iter().map(|s| s.as_str())) {
        return fail(FailCode::DocFormatMismatch, "package contains case-colliding entry paths");
    }

    let content_types_count = paths.iter().filter(|p| p.as_str() == "[Content_Types].xml").count();
    let primary_part_count = paths.iter().filter(|p| p.as_str() == kind.primary_part()).count();
    if ctx.strict && (content_types_count > 1 || primary_part_count > 1) {
        return fail(FailCode::DocFormatMismatch, "package contains duplicate structural markers");
    }

    let structural = ooxml::check(kind, &paths);
    if ctx.strict && !structural.is_structurally_valid() {
        return fail(FailCode::DocFormatMismatch, "package does not satisfy the OOXML structural gate");
    }

    let mut counts = Counts { active_content: 0, embedded_object: 0, external_link: 0 };
    for entry in &parsed.entries {
        let path = normalize_path(&entry.name);
        if !path.ends_with(".xml") && !path.ends_with(".rels") {
            continue;
        }
        if let Some(text) = zip::extract_entry_text(&bytes, entry) {
            let relationship_external = if path.ends_with(".rels") {
                text.matches("TargetMode=\"External\"").count() as u64
            } else {
                0
            };
            let scanned = count_over(&text);
            counts.active_content += scanned.active_content;
            counts.embedded_object += scanned.embedded_object;
            counts.external_link += scanned.external_link + relationship_external;
        }
    }
    build_result(ctx, counts)
}

pub fn analyze(ctx: &AnalyzeContext) -> RunResult {
    match ctx.ext.as_str() {
        ".pdf" => analyze_pdf(ctx),
        ".rtf" => analyze_rtf(ctx),
        ".chm" => analyze_chm(ctx),
        ".docm" => analyze_ooxml(ctx, OoxmlKind::Docm),
        ".xlsm" => analyze_ooxml(ctx, OoxmlKind::Xlsm),
        _ => {
            if ctx.strict {
                fail(FailCode::DocUnsupportedFormat, "input extension is not a supported document format")
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
    fn minimal_pdf_passes_strict_gate() {
        let content = b"%PDF-1.4\n1 0 obj\n<< /Type /Catalog >>\nendobj\nxref\n0 1\ntrailer\n<< >>\nstartxref\n0\n%%EOF";
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.pdf");
        std::fs::File::create(&path).unwrap().write_all(content).unwrap();
        let capture = CaptureTree::empty();
        let plugins = EnabledPlugins::normalize(Vec::<String>::new()).unwrap();
        let ctx = ctx_for(&path, &capture, &plugins, true);
        assert!(analyze(&ctx).is_ok());
    }

    #[test]
    fn truncated_pdf_fails_strict_gate() {
        let content = b"%PDF-1.4\nhello world, not a real pdf body";
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.pdf");
        std::fs::File::create(&path).unwrap().write_all(content).unwrap();
        let capture = CaptureTree::empty();
        let plugins = EnabledPlugins::normalize(Vec::<String>::new()).unwrap();
        let ctx = ctx_for(&path, &capture, &plugins, true);
        match analyze(&ctx) {
            RunResult::Fail { fail_code, .. } => assert_eq!(fail_code, FailCode::DocFormatMismatch),
            RunResult::Ok { .. } => panic!("expected Fail"),
        }
    }
}
