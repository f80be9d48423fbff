//! Dispatcher & plugin gate (§4.1): the single entry point that
//! resolves `(selection, enabled_plugins, input_path, capture)` to one
//! class analyzer and shapes its `RunResult`.

use std::path::Path;

use adapter_serde::{CaptureTree, EnabledPlugins, FailCode, Plugin, RunResult, Selection};

use crate::analyzers::{archive, container, document, extension, iac_cicd, image, package, scm, signature};
use crate::context::AnalyzeContext;
use crate::extension::normalize;

const PACKAGE_EXTS: &[&str] = &[
    ".msix", ".nupkg", ".whl", ".jar", ".deb", ".rpm", ".appimage", ".pkg", ".dmg", ".msi", ".exe", ".tar.gz", ".tar.xz", ".tgz", ".txz",
];
const ARCHIVE_EXTS: &[&str] = &[".zip", ".tar", ".tar.gz", ".tar.bz2", ".tar.xz", ".tgz", ".txz", ".7z"];
const IAC_EXTS: &[&str] = &[".tf", ".tfvars", ".hcl", ".yaml", ".yml", ".json", ".bicep", ".template"];
const DOCUMENT_EXTS: &[&str] = &[".pdf", ".docm", ".xlsm", ".rtf", ".chm"];
const SIGNATURE_EXTS: &[&str] = &[".cer", ".crt", ".pem", ".p7b", ".sig"];
const IMAGE_EXTS: &[&str] = &[".iso", ".vhd", ".vhdx", ".vmdk", ".qcow2"];

fn fail(code: FailCode, message: &str) -> RunResult {
    RunResult::fail(code, message)
}

fn file_name_lower(path: &Path) -> String {
    path.file_name().and_then(|n| n.to_str()).unwrap_or("").to_ascii_lowercase()
}

fn is_compose_filename(name: &str) -> bool {
    matches!(name, "docker-compose.yml" | "docker-compose.yaml" | "compose.yml" | "compose.yaml")
}

fn is_sbom_filename(name: &str) -> bool {
    name.contains("sbom") || name.contains("spdx") || name.contains("cyclonedx") || name.contains("bom")
}

fn is_cicd_path_hint(path: &Path) -> bool {
    let path_str = path.to_string_lossy().replace('\\', "/");
    path_str.contains(".github/workflows/")
        || file_name_lower(path).starts_with(".gitlab-ci")
        || file_name_lower(path).starts_with("azure-pipelines")
}

fn has_extension_directory_indicator(path: &Path) -> bool {
    path.is_dir() && path.join("manifest.json").is_file()
}

fn has_dot_git(path: &Path) -> bool {
    path.is_dir() && path.join(".git").exists()
}

fn has_oci_directory_indicator(path: &Path) -> bool {
    path.is_dir() && path.join("oci-layout").is_file() && path.join("index.json").is_file()
}

/// §4.1 `autoSelectClass`: first match wins, in the literal order the
/// spec lists.
fn auto_select_class(path: &Path, ext: &str) -> Option<&'static str> {
    if has_extension_directory_indicator(path) {
        return Some("extension");
    }
    if PACKAGE_EXTS.contains(&ext) {
        return Some("package");
    }
    if ARCHIVE_EXTS.contains(&ext) {
        return Some("archive");
    }
    if is_cicd_path_hint(path) {
        return Some("cicd");
    }
    if IAC_EXTS.contains(&ext) {
        return Some("iac");
    }
    if DOCUMENT_EXTS.contains(&ext) {
        return Some("document");
    }
    if SIGNATURE_EXTS.contains(&ext) {
        return Some("signature");
    }
    if has_dot_git(path) {
        return Some("scm");
    }
    let name = file_name_lower(path);
    if is_compose_filename(&name) || (ext == ".json" && is_sbom_filename(&name)) || has_oci_directory_indicator(path) {
        return Some("container");
    }
    if IMAGE_EXTS.contains(&ext) {
        return Some("image");
    }
    None
}

/// The extensions the `archive` class's plugin route accepts per
/// plugin (§4.1 step 7: "plugins include names not in the class's
/// allowed set for the detected extension").
fn plugin_allowed_for_ext(plugin: Plugin, ext: &str) -> bool {
    match plugin {
        Plugin::Tar => matches!(ext, ".tar.gz" | ".tar.bz2" | ".tar.xz" | ".tgz" | ".txz"),
        Plugin::SevenZip => ext == ".7z",
    }
}

fn run_class(class: &str, ctx: &AnalyzeContext) -> RunResult {
    match class {
        "archive" => archive::analyze(ctx),
        "package" => package::analyze(ctx),
        "extension" => extension::analyze(ctx),
        "iac" => iac_cicd::analyze(ctx, Some(iac_cicd::ForcedClass::Iac)),
        "cicd" => iac_cicd::analyze(ctx, Some(iac_cicd::ForcedClass::Cicd)),
        "document" => document::analyze(ctx),
        "container" => container::analyze(ctx),
        "image" => image::analyze(ctx),
        "scm" => scm::analyze(ctx),
        "signature" => signature::analyze(ctx),
        _ => fail(FailCode::AdapterUnsupported, "resolved adapter class has no implementation"),
    }
}

fn run_auto_class(class: &str, ctx: &AnalyzeContext) -> RunResult {
    match class {
        "iac" | "cicd" => iac_cicd::analyze(ctx, None),
        other => run_class(other, ctx),
    }
}

/// `run_adapter(selection, enabled_plugins, input_path, capture_tree) -> RunResult` (§6).
///
/// `plugin_names` are raw, un-normalized strings as supplied by the
/// caller; normalization (lowercase, trim, unknown/duplicate
/// rejection) is this function's first step (§4.1 steps 1-3).
pub fn run_adapter(selection: Selection, plugin_names: &[String], input_path: &Path, capture: &CaptureTree) -> RunResult {
    let plugins = match EnabledPlugins::normalize(plugin_names) {
        Ok(p) => p,
        Err(adapter_serde::PluginGateError::Unknown(_)) => {
            return fail(FailCode::AdapterPluginUnknown, "an enabled plugin name is outside the supported vocabulary");
        }
        Err(adapter_serde::PluginGateError::Duplicate(_)) => {
            return fail(FailCode::AdapterPluginDuplicate, "an enabled plugin name was requested more than once");
        }
    };

    if matches!(selection, Selection::None) {
        return if !plugins.is_empty() {
            fail(FailCode::AdapterPluginUnused, "plugins were requested with selection=none")
        } else {
            RunResult::noop()
        };
    }

    let ext = normalize(input_path);

    let resolved_class: Option<&'static str> = match selection {
        Selection::Auto => auto_select_class(input_path, &ext),
        other => other.as_class_name(),
    };

    let Some(class) = resolved_class else {
        return if !plugins.is_empty() {
            fail(FailCode::AdapterPluginUnused, "no adapter class could be resolved for this input")
        } else {
            RunResult::noop()
        };
    };

    if !plugins.is_empty() {
        if class != "archive" {
            return fail(FailCode::AdapterPluginUnused, "plugins were requested for a non-archive adapter class");
        }
        for plugin in plugins.iter() {
            if !plugin_allowed_for_ext(plugin, &ext) {
                return fail(FailCode::AdapterPluginUnused, "a requested plugin is not applicable to this input's extension");
            }
        }
    }

    let ctx = AnalyzeContext {
        path: input_path,
        capture,
        strict: selection.is_strict(),
        plugins: &plugins,
        ext,
    };

    if selection.is_strict() {
        run_class(class, &ctx)
    } else {
        run_auto_class(class, &ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn unknown_plugin_fails_regardless_of_input() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("anything.bin");
        std::fs::File::create(&path).unwrap().write_all(b"irrelevant").unwrap();
        let capture = CaptureTree::empty();
        let result = run_adapter(
            Selection::Archive,
            &["tar".to_string(), "unknown_plugin_name".to_string()],
            &path,
            &capture,
        );
        match result {
            RunResult::Fail { fail_code, .. } => assert_eq!(fail_code, FailCode::AdapterPluginUnknown),
            RunResult::Ok { .. } => panic!("expected Fail"),
        }
    }

    #[test]
    fn none_selection_with_plugins_is_unused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("anything.bin");
        std::fs::File::create(&path).unwrap().write_all(b"irrelevant").unwrap();
        let capture = CaptureTree::empty();
        let result = run_adapter(Selection::None, &["tar".to_string()], &path, &capture);
        match result {
            RunResult::Fail { fail_code, .. } => assert_eq!(fail_code, FailCode::AdapterPluginUnused),
            RunResult::Ok { .. } => panic!("expected Fail"),
        }
    }

    #[test]
    fn none_selection_without_plugins_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("anything.bin");
        std::fs::File::create(&path).unwrap().write_all(b"irrelevant").unwrap();
        let capture = CaptureTree::empty();
        let result = run_adapter(Selection::None, &[], &path, &capture);
        assert!(result.is_ok());
    }

    #[test]
    fn duplicate_plugin_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("anything.7z");
        std::fs::File::create(&path).unwrap().write_all(b"irrelevant").unwrap();
        let capture = CaptureTree::empty();
        let result = run_adapter(Selection::Archive, &["7z".to_string(), "7z".to_string()], &path, &capture);
        match result {
            RunResult::Fail { fail_code, .. } => assert_eq!(fail_code, FailCode::AdapterPluginDuplicate),
            RunResult::Ok { .. } => panic!("expected Fail"),
        }
    }

    #[test]
    fn strict_cicd_without_signals_fails_closed() {
        let dir = tempfile::tempdir().unwrap();
        let workflows = dir.path().join(".github/workflows");
        std::fs::create_dir_all(&workflows).unwrap();
        let path = workflows.join("placeholder.yml");
        std::fs::File::create(&path).unwrap().write_all(b"title: hello\nmessage: plain text\n").unwrap();
        let capture = CaptureTree::empty();
        let result = run_adapter(Selection::Cicd, &[], &path, &capture);
        match result {
            RunResult::Fail { fail_code, .. } => assert_eq!(fail_code, FailCode::CicdUnsupportedFormat),
            RunResult::Ok { .. } => panic!("expected Fail"),
        }
    }
}
