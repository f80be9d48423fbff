//! Disk/optical image analyzer (§4.9): `.iso, .vhd, .vhdx, .vmdk, .qcow2`.

use adapter_serde::{AdapterFindings, AdapterMeta, AdapterMode, AdapterSummary, FailCode, RunResult};

use crate::bytes::{read_head, read_tail};
use crate::context::AnalyzeContext;
use crate::parsers::disk_image::{check_qcow2, check_vhd, check_vhdx, check_vmdk};
use crate::parsers::iso9660;

const ADAPTER_ID: &str = "image_adapter_v1";
const HEAD_WINDOW: usize = 64 * 1024;
const TAIL_WINDOW: usize = 1024;

fn fail(code: FailCode, message: &str) -> RunResult {
    RunResult::fail(code, message)
}

fn file_size(path: &std::path::Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

fn build_result(ctx: &AnalyzeContext, valid: bool, markers: &[&str]) -> RunResult {
    let mut summary = AdapterSummary::new(ADAPTER_ID, "image", ctx.ext.clone(), AdapterMode::BuiltIn)
        .with_count("structurallyValid", valid as u64);
    summary.add_reason("IMAGE_ADAPTER_V1");
    for marker in markers {
        summary.add_marker(*marker);
    }

    let findings = AdapterFindings::new(ADAPTER_ID, "image");
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

fn analyze_iso(ctx: &AnalyzeContext) -> RunResult {
    let Ok(head) = read_head(ctx.path, HEAD_WINDOW) else {
        return fail(FailCode::ImageFormatMismatch, "could not read input");
    };
    let check = iso9660::check(&head);
    if ctx.strict && !check.is_structurally_valid() {
        return fail(FailCode::ImageFormatMismatch, "input lacks a valid ISO 9660 primary volume descriptor and terminator");
    }
    build_result(ctx, check.is_structurally_valid(), &[])
}

fn analyze_vhd(ctx: &AnalyzeContext) -> RunResult {
    let size = file_size(ctx.path);
    let Ok(tail) = read_tail(ctx.path, 512) else {
        return fail(FailCode::ImageFormatMismatch, "could not read input");
    };
    let check = check_vhd(&tail, size);
    if ctx.strict && !check.is_structurally_valid() {
        return fail(FailCode::ImageFormatMismatch, "input lacks a valid VHD footer or is below the minimum size");
    }
    build_result(ctx, check.is_structurally_valid(), &[])
}

fn analyze_vhdx(ctx: &AnalyzeContext) -> RunResult {
    let size = file_size(ctx.path);
    let Ok(head) = read_head(ctx.path, HEAD_WINDOW) else {
        return fail(FailCode::ImageFormatMismatch, "could not read input");
    };
    let check = check_vhdx(&head, size);
    if ctx.strict && !check.is_structurally_valid() {
        return fail(FailCode::ImageFormatMismatch, "input lacks the vhdxfile signature or is below the minimum size");
    }
    build_result(ctx, check.is_structurally_valid(), &[])
}

fn analyze_qcow2(ctx: &AnalyzeContext) -> RunResult {
    let size = file_size(ctx.path);
    let Ok(head) = read_head(ctx.path, HEAD_WINDOW) else {
        return fail(FailCode::ImageFormatMismatch, "could not read input");
    };
    let check = check_qcow2(&head, size);
    if ctx.strict && !check.is_structurally_valid() {
        return fail(FailCode::ImageFormatMismatch, "input lacks the QFI\\xFB magic or a supported version");
    }
    build_result(ctx, check.is_structurally_valid(), &[])
}

fn analyze_vmdk(ctx: &AnalyzeContext) -> RunResult {
    let size = file_size(ctx.path);
    let Ok(head) = read_head(ctx.path, HEAD_WINDOW) else {
        return fail(FailCode::ImageFormatMismatch, "could not read input");
    };
    let check = check_vmdk(&head, size);
    if ctx.strict && !check.is_structurally_valid() {
        return fail(FailCode::ImageFormatMismatch, "input lacks VMDK descriptor markers or a sparse KDMV magic");
    }
    build_result(ctx, check.is_structurally_valid(), &[])
}

pub fn analyze(ctx: &AnalyzeContext) -> RunResult {
    match ctx.ext.as_str() {
        ".iso" => analyze_iso(ctx),
        ".vhd" => analyze_vhd(ctx),
        ".vhdx" => analyze_vhdx(ctx),
        ".qcow2" => analyze_qcow2(ctx),
        ".vmdk" => analyze_vmdk(ctx),
        _ => {
            if ctx.strict {
                fail(FailCode::ImageUnsupportedFormat, "input extension is not a supported disk image format")
            } else {
                RunResult::noop()
            }
        }
    }
}
