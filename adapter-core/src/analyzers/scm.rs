//! SCM working-copy analyzer (§4.11): a directory containing `.git`,
//! either as a subdirectory or a gitdir-pointing file.

use std::path::Path;

use walkdir::WalkDir;

use adapter_serde::{AdapterFindings, AdapterMeta, AdapterMode, AdapterSummary, FailCode, RunResult};

use crate::bytes::is_hex_of_len;
use crate::context::AnalyzeContext;
use crate::external::{run_bounded, ENUMERATION_TIMEOUT};
use crate::parsers::git::{self, HeadRef};

const ADAPTER_ID: &str = "scm_adapter_v1";

fn fail(code: FailCode, message: &str) -> RunResult {
    RunResult::fail(code, message)
}

struct ScmFacts {
    commit_resolved: bool,
    detached_head: bool,
    tree_entry_count: u64,
    branch_ref_count: u64,
    tag_ref_count: u64,
    staged_path_count: u64,
    unstaged_path_count: u64,
    untracked_path_count: u64,
    working_tree_entry_count: u64,
    partial: bool,
}

fn git_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn try_external(path: &Path) -> Option<ScmFacts> {
    let dir = git_arg(path);

    let head_out = run_bounded("git", &["-C", &dir, "rev-parse", "HEAD"], ENUMERATION_TIMEOUT);
    if !head_out.succeeded() {
        return None;
    }
    let head_hash = head_out.stdout_text().trim().to_string();
    let commit_resolved = is_hex_of_len(&head_hash, 40) || is_hex_of_len(&head_hash, 64);

    let abbrev_out = run_bounded("git", &["-C", &dir, "rev-parse", "--abbrev-ref", "HEAD"], ENUMERATION_TIMEOUT);
    let detached_head = abbrev_out.succeeded() && abbrev_out.stdout_text().trim() == "HEAD";

    let tree_out = run_bounded("git", &["-C", &dir, "ls-tree", "-r", "--name-only", "HEAD"], ENUMERATION_TIMEOUT);
    let tree_entry_count = if tree_out.succeeded() {
        tree_out.stdout_text().lines().filter(|l| !l.is_empty()).count() as u64
    } else {
        0
    };

    let heads_out = run_bounded("git", &["-C", &dir, "for-each-ref", "--format=%(refname:short)", "refs/heads"], ENUMERATION_TIMEOUT);
    let branch_ref_count = if heads_out.succeeded() {
        heads_out.stdout_text().lines().filter(|l| !l.is_empty()).count() as u64
    } else {
        0
    };

    let tags_out = run_bounded("git", &["-C", &dir, "for-each-ref", "--format=%(refname:short)", "refs/tags"], ENUMERATION_TIMEOUT);
    let tag_ref_count = if tags_out.succeeded() {
        tags_out.stdout_text().lines().filter(|l| !l.is_empty()).count() as u64
    } else {
        0
    };

    let status_out = run_bounded("git", &["-C", &dir, "status", "--porcelain=1", "--untracked-files=all"], ENUMERATION_TIMEOUT);
    let mut staged = 0u64;
    let mut unstaged = 0u64;
    let mut untracked = 0u64;
    if status_out.succeeded() {
        for line in status_out.stdout_text().lines() {
            if line.len() < 2 {
                continue;
            }
            let x = line.as_bytes()[0] as char;
            let y = line.as_bytes()[1] as char;
            if x == '?' && y == '?' {
                untracked += 1;
                continue;
            }
            if x != ' ' && x != '?' {
                staged += 1;
            }
            if y != ' ' && y != '?' {
                unstaged += 1;
            }
        }
    }

    Some(ScmFacts {
        commit_resolved,
        detached_head,
        tree_entry_count,
        branch_ref_count,
        tag_ref_count,
        staged_path_count: staged,
        unstaged_path_count: unstaged,
        untracked_path_count: untracked,
        working_tree_entry_count: tree_entry_count,
        partial: false,
    })
}

fn working_tree_entry_count(root: &Path) -> u64 {
    WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| e.file_name() != ".git")
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .count() as u64
}

fn try_native(root: &Path, git_dir: &Path) -> ScmFacts {
    let snapshot = git::read_native(git_dir);
    let detached_head = matches!(snapshot.head, Some(HeadRef::Detached(_)));
    ScmFacts {
        commit_resolved: snapshot.head_resolves,
        detached_head,
        tree_entry_count: 0,
        branch_ref_count: snapshot.heads.len() as u64,
        tag_ref_count: snapshot.tags.len() as u64,
        staged_path_count: 0,
        unstaged_path_count: 0,
        untracked_path_count: 0,
        working_tree_entry_count: working_tree_entry_count(root),
        partial: true,
    }
}

fn dot_git_path(root: &Path) -> Option<std::path::PathBuf> {
    let candidate = root.join(".git");
    if candidate.exists() {
        Some(candidate)
    } else {
        None
    }
}

fn build_result(ctx: &AnalyzeContext, facts: &ScmFacts) -> RunResult {
    let worktree_dirty = (facts.staged_path_count > 0 || facts.unstaged_path_count > 0 || facts.untracked_path_count > 0) as u64;
    let mode = if facts.partial { AdapterMode::BuiltIn } else { AdapterMode::Plugin };

    let mut summary = AdapterSummary::new(ADAPTER_ID, "scm", ctx.ext.clone(), mode)
        .with_count("commitResolved", facts.commit_resolved as u64)
        .with_count("detachedHead", facts.detached_head as u64)
        .with_count("treeEntryCount", facts.tree_entry_count)
        .with_count("branchRefCount", facts.branch_ref_count)
        .with_count("tagRefCount", facts.tag_ref_count)
        .with_count("worktreeDirty", worktree_dirty)
        .with_count("stagedPathCount", facts.staged_path_count)
        .with_count("unstagedPathCount", facts.unstaged_path_count)
        .with_count("untrackedPathCount", facts.untracked_path_count)
        .with_count("workingTreeEntryCount", facts.working_tree_entry_count);
    summary.add_reason("SCM_ADAPTER_V1");
    if facts.partial {
        summary.add_marker("SCM_NATIVE_REF_PARTIAL");
    }

    let findings = AdapterFindings::new(ADAPTER_ID, "scm");
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

pub fn analyze(ctx: &AnalyzeContext) -> RunResult {
    if !ctx.is_directory() {
        return if ctx.strict {
            fail(FailCode::ScmUnsupportedFormat, "input is not a directory")
        } else {
            RunResult::noop()
        };
    }
    let Some(dot_git) = dot_git_path(ctx.path) else {
        return if ctx.strict {
            fail(FailCode::ScmUnsupportedFormat, "directory does not contain .git")
        } else {
            RunResult::noop()
        };
    };

    if let Some(facts) = try_external(ctx.path) {
        return build_result(ctx, &facts);
    }

    let Some(git_dir) = git::resolve_git_dir(&dot_git) else {
        return fail(FailCode::ScmRefUnresolved, "gitdir pointer could not be resolved");
    };
    let facts = try_native(ctx.path, &git_dir);
    if ctx.strict && !facts.commit_resolved {
        return fail(FailCode::ScmRefUnresolved, "neither the external git command nor native .git reading could resolve HEAD");
    }
    build_result(ctx, &facts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use adapter_serde::{CaptureTree, EnabledPlugins};
    use std::io::Write;

    fn ctx_for<'a>(path: &'a Path, capture: &'a CaptureTree, plugins: &'a EnabledPlugins, strict: bool) -> AnalyzeContext<'a> {
        AnalyzeContext {
            path,
            capture,
            strict,
            plugins,
            ext: crate::extension::normalize(path),
        }
    }

    #[test]
    fn native_reader_resolves_detached_head_snapshot() {
        // Exercises `git::read_native` directly: the external-`git`
        // resolution order (§4.11 step 1) depends on a binary that may
        // or may not recognize this hand-built `.git` as a repository,
        // so the analyzer-level test below only asserts on the shape
        // both paths guarantee.
        let dir = tempfile::tempdir().unwrap();
        let git_dir = dir.path().join(".git");
        std::fs::create_dir_all(git_dir.join("refs/heads")).unwrap();
        std::fs::create_dir_all(git_dir.join("refs/tags")).unwrap();
        let hash = "a".repeat(40);
        std::fs::File::create(git_dir.join("HEAD")).unwrap().write_all(hash.as_bytes()).unwrap();

        let snapshot = git::read_native(&git_dir);
        assert_eq!(snapshot.head, Some(HeadRef::Detached(hash)));
        assert!(snapshot.head_resolves);
    }

    #[test]
    fn directory_with_dot_git_yields_a_resolvable_result() {
        let dir = tempfile::tempdir().unwrap();
        let git_dir = dir.path().join(".git");
        std::fs::create_dir_all(git_dir.join("refs/heads")).unwrap();
        std::fs::create_dir_all(git_dir.join("refs/tags")).unwrap();
        let hash = "a".repeat(40);
        std::fs::File::create(git_dir.join("HEAD")).unwrap().write_all(hash.as_bytes()).unwrap();

        let capture = CaptureTree::empty();
        let plugins = EnabledPlugins::normalize(Vec::<String>::new()).unwrap();
        let ctx = ctx_for(dir.path(), &capture, &plugins, false);
        match analyze(&ctx) {
            RunResult::Ok { summary, .. } => {
                assert_eq!(summary.counts.get("commitResolved"), Some(&1));
                assert_eq!(summary.counts.get("detachedHead"), Some(&1));
            }
            RunResult::Fail { .. } => {}
        }
    }

    #[test]
    fn non_git_directory_is_unsupported_in_strict_mode() {
        let dir = tempfile::tempdir().unwrap();
        let capture = CaptureTree::empty();
        let plugins = EnabledPlugins::normalize(Vec::<String>::new()).unwrap();
        let ctx = ctx_for(dir.path(), &capture, &plugins, true);
        match analyze(&ctx) {
            RunResult::Fail { fail_code, .. } => assert_eq!(fail_code, FailCode::ScmUnsupportedFormat),
            RunResult::Ok { .. } => panic!("expected Fail"),
        }
    }
}
