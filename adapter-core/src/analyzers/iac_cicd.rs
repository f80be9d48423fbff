//! IaC / CI-CD analyzer (§4.6): a single text file or a directory tree
//! restricted to the IaC/CI-CD text extensions, classified into the
//! `iac` or `cicd` adapter class.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use walkdir::WalkDir;

use adapter_serde::{AdapterFindings, AdapterMeta, AdapterMode, AdapterSummary, FailCode, RunResult};

use crate::canon::has_case_collision;
use crate::context::AnalyzeContext;
use crate::text::bounded_text;

const ADAPTER_ID: &str = "iac_cicd_adapter_v1";
const MAX_FILES: usize = 256;

const TEXT_EXTS: &[&str] = &[".tf", ".tfvars", ".hcl", ".yaml", ".yml", ".json", ".bicep", ".template"];

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum ForcedClass {
    Iac,
    Cicd,
}

fn fail(code: FailCode, message: &str) -> RunResult {
    RunResult::fail(code, message)
}

fn is_text_ext(ext: &str) -> bool {
    TEXT_EXTS.contains(&ext)
}

fn collect_files(ctx: &AnalyzeContext) -> (Vec<PathBuf>, bool) {
    if ctx.is_directory() {
        let mut files = Vec::new();
        let mut truncated = false;
        for entry in WalkDir::new(ctx.path).sort_by_file_name() {
            let Ok(entry) = entry else { continue };
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let ext = crate::extension::normalize(path);
            if !is_text_ext(&ext) {
                continue;
            }
            if files.len() >= MAX_FILES {
                truncated = true;
                break;
            }
            files.push(path.to_path_buf());
        }
        (files, truncated)
    } else {
        (vec![ctx.path.to_path_buf()], false)
    }
}

fn relative_path(root: &Path, file: &Path) -> String {
    file.strip_prefix(root).unwrap_or(file).to_string_lossy().replace('\\', "/")
}

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static RE: OnceLock<Regex> = OnceLock::new();
            RE.get_or_init(|| Regex::new($pat).expect("static regex"))
        }
    };
}

re!(structural_iac_re, r"(?m)^\s*(terraform|provider|resource|module|variable|output)\b|^\s*(apiVersion|kind):|AWSTemplateFormatVersion|\"resources\"\s*:|^\s*services:");
re!(privileged_re, r"privileged:\s*true|allowPrivilegeEscalation:\s*true|host(Network|PID|IPC):\s*true|runAsUser:\s*0|sys_admin|net_admin");
re!(secret_kv_re, r"(?i)(password|secret|token|api[_-]?key)\s*[:=]\s*\S+");
re!(remote_module_re, r#"source\s*=\s*"(git::|https?://|github\.com/|git@)|(chart|repository|module)\s*:\s*(https?://|oci://)"#);
re!(cicd_structural_re, r"(?m)^\s*(on|jobs|steps|runs-on|stages|script):|^\s*-\s*(uses|run):");
re!(uses_value_re, r"(?m)^\s*-?\s*uses:\s*(\S+)");
re!(secret_usage_re, r"\$\{\{\s*secrets\.|CI_[A-Z0-9_]+");
re!(external_runner_re, r"runs-on:\s*self-hosted|docker://");
re!(pinned_sha_re, r"^[A-Fa-f0-9]{40}$");
re!(pinned_sha256_re, r"^sha256:[A-Fa-f0-9]{64}$");

struct Counters {
    structural_iac: u64,
    privileged: u64,
    secrets: u64,
    remote_modules: u64,
    cicd_structural: u64,
    action_ref_count: u64,
    action_ref_pinned: u64,
    action_ref_unpinned: u64,
    secret_usage: u64,
    external_runner: u64,
}

impl Counters {
    fn new() -> Counters {
        Counters {
            structural_iac: 0,
            privileged: 0,
            secrets: 0,
            remote_modules: 0,
            cicd_structural: 0,
            action_ref_count: 0,
            action_ref_pinned: 0,
            action_ref_unpinned: 0,
            secret_usage: 0,
            external_runner: 0,
        }
    }

    fn scan(&mut self, text: &str) {
        self.structural_iac += structural_iac_re().find_iter(text).count() as u64;
        self.privileged += privileged_re().find_iter(text).count() as u64;
        self.secrets += secret_kv_re().find_iter(text).count() as u64;
        self.remote_modules += remote_module_re().find_iter(text).count() as u64;
        self.cicd_structural += cicd_structural_re().find_iter(text).count() as u64;
        self.secret_usage += secret_usage_re().find_iter(text).count() as u64;
        self.external_runner += external_runner_re().find_iter(text).count() as u64;

        for cap in uses_value_re().captures_iter(text) {
            self.action_ref_count += 1;
            let value = &cap[1];
            match value.rsplit_once('@') {
                Some((path, suffix)) if path.starts_with("./") || path.starts_with("../") => {
                    let _ = suffix;
                }
                Some((_, suffix)) => {
                    if pinned_sha_re().is_match(suffix) || pinned_sha256_re().is_match(suffix) {
                        self.action_ref_pinned += 1;
                    } else {
                        self.action_ref_unpinned += 1;
                    }
                }
                None => {}
            }
        }
    }
}

fn build_result(ctx: &AnalyzeContext, class: &str, counters: &Counters, truncated: bool) -> RunResult {
    let mut summary = AdapterSummary::new(ADAPTER_ID, class, ctx.ext.clone(), AdapterMode::BuiltIn)
        .with_count("structuralIacCount", counters.structural_iac)
        .with_count("privilegedCount", counters.privileged)
        .with_count("secretCount", counters.secrets)
        .with_count("remoteModuleCount", counters.remote_modules)
        .with_count("cicdStructuralCount", counters.cicd_structural)
        .with_count("actionRefCount", counters.action_ref_count)
        .with_count("actionRefPinnedCount", counters.action_ref_pinned)
        .with_count("actionRefUnpinnedCount", counters.action_ref_unpinned)
        .with_count("secretUsageCount", counters.secret_usage)
        .with_count("externalRunnerCount", counters.external_runner);
    summary.add_reason("IAC_CICD_ADAPTER_V1");
    if truncated {
        summary.add_marker("IAC_CICD_FILE_LIST_TRUNCATED");
    }

    let mut findings = AdapterFindings::new(ADAPTER_ID, class);
    if counters.action_ref_unpinned > 0 {
        findings.add_finding("CICD_ACTION_REF_UNPINNED", counters.action_ref_unpinned);
    }
    if counters.privileged > 0 {
        findings.add_finding("IAC_PRIVILEGED_EVIDENCE", counters.privileged);
    }
    if counters.secrets > 0 {
        findings.add_finding("IAC_SECRET_EVIDENCE", counters.secrets);
    }
    if counters.external_runner > 0 {
        findings.add_finding("CICD_EXTERNAL_RUNNER", counters.external_runner);
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

pub fn analyze(ctx: &AnalyzeContext, forced: Option<ForcedClass>) -> RunResult {
    let (files, truncated) = collect_files(ctx);

    if ctx.is_directory() {
        let paths: Vec<String> = files.iter().map(|p| relative_path(ctx.path, p)).collect();
        if ctx.strict && has_case_collision(paths.iter().map(|s| s.as_str())) {
            let code = match forced {
                Some(ForcedClass::Cicd) => FailCode::CicdUnsupportedFormat,
                _ => FailCode::IacUnsupportedFormat,
            };
            return fail(code, "tree contains case-colliding entry paths");
        }
    }

    let mut counters = Counters::new();
    for file in &files {
        let Ok(bytes) = std::fs::read(file) else { continue };
        let (text, _) = bounded_text(&bytes);
        counters.scan(&text);
    }

    let has_cicd_signal = counters.cicd_structural > 0 || counters.action_ref_count > 0 || counters.secret_usage > 0 || counters.external_runner > 0;
    let has_iac_evidence = counters.structural_iac > 0 || counters.privileged > 0 || counters.remote_modules > 0;

    let class = match forced {
        Some(ForcedClass::Cicd) => {
            if ctx.strict && !has_cicd_signal {
                return fail(FailCode::CicdUnsupportedFormat, "no CI/CD structural signals were found");
            }
            "cicd"
        }
        Some(ForcedClass::Iac) => {
            if ctx.strict && !has_iac_evidence {
                return fail(FailCode::IacUnsupportedFormat, "no IaC structural, privileged, or remote-module evidence was found");
            }
            "iac"
        }
        None => {
            if has_cicd_signal {
                "cicd"
            } else {
                "iac"
            }
        }
    };

    build_result(ctx, class, &counters, truncated)
}
