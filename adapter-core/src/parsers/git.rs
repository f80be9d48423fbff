//! Native `.git` metadata reader, used as the fallback path when the
//! external `git` binary is unavailable or fails (§4.11).

use std::fs;
use std::path::Path;

use crate::bytes::is_hex_of_len;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum HeadRef {
    /// `ref: refs/heads/<name>`
    Symbolic(String),
    /// A detached HEAD pointing directly at a commit hash.
    Detached(String),
}

fn is_resolvable_hash(s: &str) -> bool {
    is_hex_of_len(s, 40) || is_hex_of_len(s, 64)
}

/// Parse the contents of a `.git/HEAD` file.
pub fn parse_head(contents: &str) -> Option<HeadRef> {
    let trimmed = contents.trim();
    if let Some(target) = trimmed.strip_prefix("ref:") {
        return Some(HeadRef::Symbolic(target.trim().to_string()));
    }
    if is_resolvable_hash(trimmed) {
        return Some(HeadRef::Detached(trimmed.to_string()));
    }
    None
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RefEntry {
    pub name: String,
    pub hash: String,
}

/// Parse a `packed-refs` file: one `<hash> <refname>` pair per line,
/// skipping `#` comment lines and `^` peeled-tag annotation lines
/// (§4.11).
pub fn parse_packed_refs(contents: &str) -> Vec<RefEntry> {
    let mut entries = Vec::new();
    for line in contents.lines() {
        if line.starts_with('#') || line.starts_with('^') {
            continue;
        }
        let mut parts = line.splitn(2, ' ');
        let (Some(hash), Some(name)) = (parts.next(), parts.next()) else {
            continue;
        };
        if is_resolvable_hash(hash) {
            entries.push(RefEntry {
                name: name.trim().to_string(),
                hash: hash.to_string(),
            });
        }
    }
    entries
}

/// Read a single loose ref file (`refs/heads/<name>` or
/// `refs/tags/<name>`): the file's entire contents, trimmed, must be a
/// resolvable hash.
pub fn parse_loose_ref(contents: &str) -> Option<String> {
    let trimmed = contents.trim();
    is_resolvable_hash(trimmed).then(|| trimmed.to_string())
}

#[derive(Clone, Debug, Default)]
pub struct NativeScmSnapshot {
    pub head: Option<HeadRef>,
    pub heads: Vec<RefEntry>,
    pub tags: Vec<RefEntry>,
    pub head_resolves: bool,
}

fn collect_loose_refs(dir: &Path) -> Vec<RefEntry> {
    let mut out = Vec::new();
    let Ok(entries) = fs::read_dir(dir) else {
        return out;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Ok(contents) = fs::read_to_string(&path) else {
            continue;
        };
        let Some(hash) = parse_loose_ref(&contents) else {
            continue;
        };
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        out.push(RefEntry {
            name: name.to_string(),
            hash,
        });
    }
    out.sort_by(|a, b| a.name.cmp(&b.name));
    out
}

/// Read a `.git` directory natively: `HEAD`, loose `refs/heads/*` and
/// `refs/tags/*`, and `packed-refs`. `git_dir` is the resolved
/// directory that actually contains `HEAD` (the `.git` subdirectory
/// itself, or the target of a gitdir-pointing file).
pub fn read_native(git_dir: &Path) -> NativeScmSnapshot {
    let mut snapshot = NativeScmSnapshot::default();

    if let Ok(contents) = fs::read_to_string(git_dir.join("HEAD")) {
        snapshot.head = parse_head(&contents);
    }

    snapshot.heads = collect_loose_refs(&git_dir.join("refs").join("heads"));
    snapshot.tags = collect_loose_refs(&git_dir.join("refs").join("tags"));

    if let Ok(contents) = fs::read_to_string(git_dir.join("packed-refs")) {
        for entry in parse_packed_refs(&contents) {
            if entry.name.starts_with("refs/heads/") {
                snapshot.heads.push(entry);
            } else if entry.name.starts_with("refs/tags/") {
                snapshot.tags.push(entry);
            }
        }
    }

    snapshot.head_resolves = match &snapshot.head {
        Some(HeadRef::Detached(_)) => true,
        Some(HeadRef::Symbolic(target)) => {
            let short = target.strip_prefix("refs/heads/").unwrap_or(target);
            snapshot.heads.iter().any(|r| r.name == short || r.name == *target)
        }
        None => false,
    };

    snapshot
}

/// Resolve a `.git` entry that may be a real directory or a
/// gitdir-pointing file (worktrees, submodules): `gitdir: <path>`.
pub fn resolve_git_dir(dot_git_path: &Path) -> Option<std::path::PathBuf> {
    if dot_git_path.is_dir() {
        return Some(dot_git_path.to_path_buf());
    }
    let contents = fs::read_to_string(dot_git_path).ok()?;
    let target = contents.trim().strip_prefix("gitdir:")?.trim();
    let parent = dot_git_path.parent().unwrap_or(Path::new("."));
    Some(parent.join(target))
}
