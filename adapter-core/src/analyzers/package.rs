//! Package analyzer (§4.4): installer/package formats across ZIP,
//! AR, RPM, AppImage, XAR, DMG, CFB, and PE/COFF containers.

use adapter_serde::{AdapterFindings, AdapterMeta, AdapterMode, AdapterSummary, FailCode, RunResult};

use crate::bytes;
use crate::canon::has_case_collision;
use crate::context::AnalyzeContext;
use crate::parsers::{ar, cfb, dmg, pe, rpm, xar, zip};
use crate::text::contains_ci;

const ADAPTER_ID: &str = "package_adapter_v1";

const MANIFEST_INDICATORS: &[&str] = &[
    "package.json", "manifest.json", "appxmanifest.xml", "nuspec", "metadata", "pkg-info",
    "manifest.mf", "pom.xml", "setup.py", "debian-binary", "control.tar", "data.tar",
];
const SCRIPT_INDICATORS: &[&str] = &[
    "preinstall", "postinstall", "install.ps1", "setup.py", "scripts/", "preinst", "postinst", "prerm", "postrm",
];
const PERMISSION_INDICATORS: &[&str] = &["permission", "capability", "policy", "selinux", "apparmor"];
const MSIX_SIGNATURE_SUFFIXES: &[&str] = &[".sig", ".asc", ".p7s", ".p7x"];

struct PackageOutcome {
    source_format: String,
    mode: AdapterMode,
    counts: Vec<(&'static str, u64)>,
    reasons: Vec<&'static str>,
    markers: Vec<&'static str>,
}

fn hint_counts(paths: &[String]) -> (u64, u64, u64) {
    let manifest = paths.iter().filter(|p| MANIFEST_INDICATORS.iter().any(|i| contains_ci(p, i))).count() as u64;
    let script = paths.iter().filter(|p| SCRIPT_INDICATORS.iter().any(|i| contains_ci(p, i))).count() as u64;
    let permission = paths.iter().filter(|p| PERMISSION_INDICATORS.iter().any(|i| contains_ci(p, i))).count() as u64;
    (manifest, script, permission)
}

fn is_installer_ext(ext: &str) -> bool {
    matches!(ext, ".msi" | ".msix" | ".exe" | ".deb" | ".rpm" | ".appimage" | ".pkg" | ".dmg")
}

fn build_result(ctx: &AnalyzeContext, outcome: PackageOutcome) -> RunResult {
    let mut summary = AdapterSummary::new(ADAPTER_ID, "package", outcome.source_format.clone(), outcome.mode);
    for (key, value) in &outcome.counts {
        summary = summary.with_count(*key, *value);
    }
    summary.add_reason("PACKAGE_ADAPTER_V1");
    if is_installer_ext(&ctx.ext) {
        summary.add_reason("EXECUTION_WITHHELD_INSTALLER");
    }
    for reason in &outcome.reasons {
        summary.add_reason(*reason);
    }
    for marker in &outcome.markers {
        summary.add_marker(*marker);
    }
    if ctx.capture.truncated {
        summary.add_marker("PACKAGE_TRUNCATED");
    }

    let mut findings = AdapterFindings::new(ADAPTER_ID, "package");
    findings.markers = summary.markers.clone();

    RunResult::Ok {
        reason_codes: summary.reason_codes.clone(),
        adapter: AdapterMeta {
            adapter_id: ADAPTER_ID.to_string(),
            source_format: outcome.source_format,
            mode: outcome.mode,
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
        ".msix" | ".nupkg" | ".whl" | ".jar" => analyze_zip_package(ctx),
        ".deb" => analyze_deb(ctx),
        ".rpm" => analyze_rpm(ctx),
        ".appimage" => analyze_appimage(ctx),
        ".pkg" => analyze_pkg(ctx),
        ".dmg" => analyze_dmg(ctx),
        ".msi" => analyze_msi(ctx),
        ".exe" => analyze_exe(ctx),
        ".tar.gz" | ".tar.xz" | ".tgz" | ".txz" => analyze_plugin_tar_package(ctx),
        _ => {
            if ctx.strict {
                fail(FailCode::PackageUnsupportedFormat, "input extension is not a supported package format")
            } else {
                RunResult::noop()
            }
        }
    }
}

#[derive(Clone, Copy, Eq, PartialEq)]
enum ZipPackageKind {
    Msix,
    Nupkg,
    Whl,
    Jar,
}

fn zip_package_kind(ext: &str) -> Option<(ZipPackageKind, u64)> {
    match ext {
        ".msix" => Some((ZipPackageKind::Msix, 512)),
        ".nupkg" => Some((ZipPackageKind::Nupkg, 256)),
        ".whl" => Some((ZipPackageKind::Whl, 0)),
        ".jar" => Some((ZipPackageKind::Jar, 256)),
        _ => None,
    }
}

fn analyze_zip_package(ctx: &AnalyzeContext) -> RunResult {
    let (kind, min_size) = zip_package_kind(&ctx.ext).expect("dispatched only for known zip package exts");
    let bytes = match bytes::read_full(ctx.path) {
        Ok(b) => b,
        Err(_) => return fail(FailCode::PackageFormatMismatch, "could not read package bytes"),
    };
    if ctx.strict && (bytes.len() as u64) < min_size {
        return fail(FailCode::PackageFormatMismatch, "package is smaller than the structural minimum for its format");
    }
    let parsed = zip::parse(&bytes);
    if ctx.strict && (!parsed.has_zip_signature || parsed.metadata_partial) {
        return fail(FailCode::PackageFormatMismatch, "package is not a well-formed ZIP container");
    }

    let paths: Vec<String> = parsed.entries.iter().map(|e| adapter_serde::normalize_path(&e.name)).collect();
    if ctx.strict && has_case_collision(paths.iter().map(|s| s.as_str())) {
        return fail(FailCode::PackageFormatMismatch, "package contains case-colliding entry paths");
    }

    let root_has = |name: &str| paths.iter().any(|p| p == name && !p.contains('/'));
    let root_has_suffix = |suffix: &str| paths.iter().any(|p| !p.contains('/') && p.ends_with(suffix));

    let format_ok = match kind {
        ZipPackageKind::Msix => {
            (root_has("AppxManifest.xml") || root_has("AppxBundleManifest.xml")) && root_has("[Content_Types].xml")
        }
        ZipPackageKind::Nupkg => paths.iter().filter(|p| !p.contains('/') && p.ends_with(".nuspec")).count() == 1,
        ZipPackageKind::Whl => {
            let has_record = root_has_suffix(".dist-info/RECORD") || paths.iter().any(|p| p.ends_with(".dist-info/RECORD"));
            let has_wheel = paths.iter().any(|p| p.ends_with(".dist-info/WHEEL"));
            let has_metadata = paths.iter().any(|p| p.ends_with(".dist-info/METADATA"));
            has_record && has_wheel && has_metadata
        }
        ZipPackageKind::Jar => root_has("META-INF/MANIFEST.MF") || paths.iter().any(|p| p == "META-INF/MANIFEST.MF"),
    };
    if ctx.strict && !format_ok {
        return fail(FailCode::PackageFormatMismatch, "package is missing its format-specific root manifest");
    }

    let (manifest_count, script_count, permission_count) = hint_counts(&paths);
    let signing_present = match kind {
        ZipPackageKind::Msix => paths.iter().any(|p| {
            MSIX_SIGNATURE_SUFFIXES.iter().any(|s| p.ends_with(s)) || p == "AppxSignature.p7x"
        }),
        _ => false,
    };

    let mut reasons = Vec::new();
    if signing_present {
        reasons.push("PACKAGE_SIGNING_INFO_PRESENT");
    } else if is_installer_ext(&ctx.ext) {
        reasons.push("PACKAGE_SIGNING_INFO_UNAVAILABLE");
    }

    build_result(
        ctx,
        PackageOutcome {
            source_format: ctx.ext.clone(),
            mode: AdapterMode::BuiltIn,
            counts: vec![
                ("entryCount", paths.len() as u64),
                ("manifestCount", manifest_count),
                ("scriptHintCount", script_count),
                ("permissionHintCount", permission_count),
            ],
            reasons,
            markers: if parsed.metadata_partial { vec!["PACKAGE_METADATA_PARTIAL"] } else { vec![] },
        },
    )
}

fn analyze_deb(ctx: &AnalyzeContext) -> RunResult {
    let bytes = match bytes::read_full(ctx.path) {
        Ok(b) => b,
        Err(_) => return fail(FailCode::PackageFormatMismatch, "could not read package bytes"),
    };
    if ctx.strict && (bytes.len() as u64) < 256 {
        return fail(FailCode::PackageFormatMismatch, "package is smaller than the structural minimum for .deb");
    }
    let parsed = ar::parse(&bytes);
    if ctx.strict && !parsed.has_magic {
        return fail(FailCode::PackageFormatMismatch, "input is not a well-formed AR archive");
    }
    if ctx.strict {
        let names: Vec<&str> = parsed.entries.iter().map(|e| e.name.as_str()).collect();
        let ordered_ok = names.len() >= 3
            && names[0] == "debian-binary"
            && names[1].starts_with("control.tar")
            && names[2].starts_with("data.tar");
        if !ordered_ok {
            return fail(FailCode::PackageFormatMismatch, "package entries are not in the required debian-binary/control/data order");
        }
    }

    let paths: Vec<String> = parsed.entries.iter().map(|e| e.name.clone()).collect();
    let (manifest_count, script_count, permission_count) = hint_counts(&paths);

    build_result(
        ctx,
        PackageOutcome {
            source_format: ctx.ext.clone(),
            mode: AdapterMode::BuiltIn,
            counts: vec![
                ("entryCount", paths.len() as u64),
                ("manifestCount", manifest_count),
                ("scriptHintCount", script_count),
                ("permissionHintCount", permission_count),
            ],
            reasons: vec!["PACKAGE_SIGNING_INFO_UNAVAILABLE"],
            markers: if parsed.metadata_partial { vec!["PACKAGE_METADATA_PARTIAL"] } else { vec![] },
        },
    )
}

fn analyze_rpm(ctx: &AnalyzeContext) -> RunResult {
    let head = match bytes::read_head(ctx.path, 256 * 1024) {
        Ok(h) => h,
        Err(_) => return fail(FailCode::PackageFormatMismatch, "could not read package bytes"),
    };
    let parsed = rpm::parse(&head);
    if ctx.strict && !parsed.structurally_valid() {
        return fail(FailCode::PackageFormatMismatch, "RPM lead/header magic did not validate");
    }
    let signed = rpm::has_signing_markers(&head);
    build_result(
        ctx,
        PackageOutcome {
            source_format: ctx.ext.clone(),
            mode: AdapterMode::BuiltIn,
            counts: vec![("signingMarkerPresent", signed as u64)],
            reasons: if signed { vec!["PACKAGE_SIGNING_INFO_PRESENT"] } else { vec!["PACKAGE_SIGNING_INFO_UNAVAILABLE"] },
            markers: vec![],
        },
    )
}

fn analyze_appimage(ctx: &AnalyzeContext) -> RunResult {
    let head = match bytes::read_head(ctx.path, 64 * 1024) {
        Ok(h) => h,
        Err(_) => return fail(FailCode::PackageFormatMismatch, "could not read package bytes"),
    };
    let parsed = crate::parsers::appimage::parse(&head);
    if ctx.strict && !parsed.structurally_valid() {
        return fail(FailCode::PackageFormatMismatch, "AppImage ELF+runtime marker did not validate");
    }
    build_result(
        ctx,
        PackageOutcome {
            source_format: ctx.ext.clone(),
            mode: AdapterMode::BuiltIn,
            counts: vec![],
            reasons: vec!["PACKAGE_SIGNING_INFO_UNAVAILABLE"],
            markers: vec![],
        },
    )
}

fn analyze_pkg(ctx: &AnalyzeContext) -> RunResult {
    let head = match bytes::read_head(ctx.path, 64 * 1024) {
        Ok(h) => h,
        Err(_) => return fail(FailCode::PackageFormatMismatch, "could not read package bytes"),
    };
    let parsed = xar::parse(&head);
    if ctx.strict && !parsed.structurally_valid() {
        return fail(FailCode::PackageFormatMismatch, "XAR header did not validate");
    }
    build_result(
        ctx,
        PackageOutcome {
            source_format: ctx.ext.clone(),
            mode: AdapterMode::BuiltIn,
            counts: vec![],
            reasons: vec!["PACKAGE_SIGNING_INFO_UNAVAILABLE"],
            markers: vec![],
        },
    )
}

fn analyze_dmg(ctx: &AnalyzeContext) -> RunResult {
    let tail = match bytes::read_tail(ctx.path, 512) {
        Ok(t) => t,
        Err(_) => return fail(FailCode::PackageFormatMismatch, "could not read package bytes"),
    };
    let has_trailer = dmg::has_koly_trailer(&tail);
    if ctx.strict && !has_trailer {
        return fail(FailCode::PackageFormatMismatch, "DMG koly trailer not found in final 512-byte block");
    }
    build_result(
        ctx,
        PackageOutcome {
            source_format: ctx.ext.clone(),
            mode: AdapterMode::BuiltIn,
            counts: vec![],
            reasons: vec!["PACKAGE_SIGNING_INFO_UNAVAILABLE"],
            markers: vec![],
        },
    )
}

fn analyze_msi(ctx: &AnalyzeContext) -> RunResult {
    let bytes = match bytes::read_full(ctx.path) {
        Ok(b) => b,
        Err(_) => return fail(FailCode::PackageFormatMismatch, "could not read package bytes"),
    };
    if ctx.strict && bytes.len() < 512 {
        return fail(FailCode::PackageFormatMismatch, "MSI is smaller than the structural minimum");
    }
    let parsed = cfb::parse(&bytes);
    if ctx.strict && !parsed.structurally_valid() {
        return fail(FailCode::PackageFormatMismatch, "CFB/MSI header did not validate");
    }
    build_result(
        ctx,
        PackageOutcome {
            source_format: ctx.ext.clone(),
            mode: AdapterMode::BuiltIn,
            counts: vec![],
            reasons: vec!["PACKAGE_SIGNING_INFO_UNAVAILABLE"],
            markers: vec![],
        },
    )
}

fn analyze_exe(ctx: &AnalyzeContext) -> RunResult {
    let bytes = match bytes::read_full(ctx.path) {
        Ok(b) => b,
        Err(_) => return fail(FailCode::PackageFormatMismatch, "could not read package bytes"),
    };
    let parsed = pe::parse(&bytes);
    if ctx.strict && (parsed.metadata_partial || !parsed.has_pe_signature) {
        return fail(FailCode::PackageFormatMismatch, "PE/COFF header did not validate");
    }
    let signed = parsed.signature_present();
    build_result(
        ctx,
        PackageOutcome {
            source_format: ctx.ext.clone(),
            mode: AdapterMode::BuiltIn,
            counts: vec![("peSignaturePresent", signed as u64)],
            reasons: if signed { vec!["PACKAGE_SIGNING_INFO_PRESENT"] } else { vec!["PACKAGE_SIGNING_INFO_UNAVAILABLE"] },
            markers: vec![],
        },
    )
}

fn analyze_plugin_tar_package(ctx: &AnalyzeContext) -> RunResult {
    use adapter_serde::Plugin;
    if !ctx.plugins.contains(Plugin::Tar) {
        return fail(FailCode::PackagePluginRequired, "tar plugin is required to enumerate this package");
    }
    let path_str = ctx.path.to_string_lossy().into_owned();
    let outcome = crate::external::run_bounded("tar", &["-tf", &path_str], crate::external::ENUMERATION_TIMEOUT);
    if !outcome.succeeded() {
        return fail(FailCode::PackagePluginUnavailable, "tar is unavailable or failed to enumerate this package");
    }
    let paths: Vec<String> = outcome.stdout_text().lines().map(str::to_string).collect();
    let (manifest_count, script_count, permission_count) = hint_counts(&paths);
    build_result(
        ctx,
        PackageOutcome {
            source_format: ctx.ext.clone(),
            mode: AdapterMode::Plugin,
            counts: vec![
                ("entryCount", paths.len() as u64),
                ("manifestCount", manifest_count),
                ("scriptHintCount", script_count),
                ("permissionHintCount", permission_count),
            ],
            reasons: vec![],
            markers: vec![],
        },
    )
}
