//! Capability listing (§6): `list_adapters()` enumerates every class,
//! its mode, its plugins (with live availability probes), and the
//! formats it recognizes.

use adapter_serde::{AdapterCapability, AdapterListReport, AdapterMode, Plugin, PluginAvailability};

use crate::external::probe_available;

fn probe_args(plugin: Plugin) -> &'static [&'static str] {
    match plugin {
        Plugin::Tar => &["--help"],
        // `7z` has no `--help` flag; a bare invocation prints its
        // banner and usage and exits non-zero, which `run_bounded`
        // still reports as `Ran`, sufficient to prove it's on PATH.
        Plugin::SevenZip => &[],
    }
}

fn plugin_row(plugin: Plugin) -> PluginAvailability {
    PluginAvailability {
        name: plugin.as_str().to_string(),
        available: probe_available(plugin.command(), probe_args(plugin)),
    }
}

fn strings(exts: &[&str]) -> Vec<String> {
    exts.iter().map(|s| s.to_string()).collect()
}

/// `list_adapters() -> AdapterListReport` (§6). Rows are built in a
/// fixed order and re-sorted by `(adapter, format, plugin.name)` so
/// output is deterministic regardless of host plugin availability.
pub fn list_adapters() -> AdapterListReport {
    let mut adapters = vec![
        AdapterCapability {
            adapter: "archive".to_string(),
            mode: AdapterMode::Mixed,
            plugins: vec![plugin_row(Plugin::Tar), plugin_row(Plugin::SevenZip)],
            formats: strings(&[".zip", ".tar", ".tar.gz", ".tar.bz2", ".tar.xz", ".tgz", ".txz", ".7z"]),
        },
        AdapterCapability {
            adapter: "package".to_string(),
            mode: AdapterMode::Mixed,
            plugins: vec![plugin_row(Plugin::Tar)],
            formats: strings(&[
                ".msix", ".nupkg", ".whl", ".jar", ".deb", ".rpm", ".appimage", ".pkg", ".dmg", ".msi", ".exe", ".tar.gz", ".tar.xz",
                ".tgz", ".txz",
            ]),
        },
        AdapterCapability {
            adapter: "extension".to_string(),
            mode: AdapterMode::BuiltIn,
            plugins: Vec::new(),
            formats: strings(&[".crx", ".vsix", ".xpi", "<directory>"]),
        },
        AdapterCapability {
            adapter: "iac".to_string(),
            mode: AdapterMode::BuiltIn,
            plugins: Vec::new(),
            formats: strings(&[".tf", ".tfvars", ".hcl", ".yaml", ".yml", ".json", ".bicep", ".template"]),
        },
        AdapterCapability {
            adapter: "cicd".to_string(),
            mode: AdapterMode::BuiltIn,
            plugins: Vec::new(),
            formats: strings(&[".yaml", ".yml", "<.github/workflows>", "<.gitlab-ci>", "<azure-pipelines>"]),
        },
        AdapterCapability {
            adapter: "document".to_string(),
            mode: AdapterMode::BuiltIn,
            plugins: Vec::new(),
            formats: strings(&[".pdf", ".docm", ".xlsm", ".rtf", ".chm"]),
        },
        AdapterCapability {
            adapter: "container".to_string(),
            mode: AdapterMode::BuiltIn,
            plugins: Vec::new(),
            formats: strings(&[".tar", ".json", "<directory>", "docker-compose.yml", "compose.yml"]),
        },
        AdapterCapability {
            adapter: "image".to_string(),
            mode: AdapterMode::BuiltIn,
            plugins: Vec::new(),
            formats: strings(&[".iso", ".vhd", ".vhdx", ".vmdk", ".qcow2"]),
        },
        AdapterCapability {
            adapter: "scm".to_string(),
            mode: AdapterMode::Mixed,
            plugins: Vec::new(),
            formats: strings(&["<directory>"]),
        },
        AdapterCapability {
            adapter: "signature".to_string(),
            mode: AdapterMode::BuiltIn,
            plugins: Vec::new(),
            formats: strings(&[".cer", ".crt", ".pem", ".p7b", ".sig"]),
        },
    ];

    adapters.sort_by(|a, b| a.adapter.cmp(&b.adapter));
    for capability in &mut adapters {
        capability.formats.sort();
        capability.plugins.sort();
    }

    AdapterListReport { adapters }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_is_sorted_by_adapter_name() {
        let report = list_adapters();
        let mut names: Vec<&str> = report.adapters.iter().map(|a| a.adapter.as_str()).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
        names.dedup();
        assert_eq!(names.len(), report.adapters.len());
    }

    #[test]
    fn archive_and_scm_are_the_only_mixed_mode_rows() {
        let report = list_adapters();
        for capability in &report.adapters {
            if matches!(capability.mode, AdapterMode::Mixed) {
                assert!(capability.adapter == "archive" || capability.adapter == "package" || capability.adapter == "scm");
            }
        }
    }
}
