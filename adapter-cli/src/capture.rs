//! Builds the `CaptureTree` snapshot `run_adapter` expects, by walking
//! the real filesystem at `input`. This is CLI-side glue: the core
//! never walks a filesystem itself, it only consumes this shape.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use adapter_core::canon::MAX_LIST_ITEMS;
use adapter_serde::{CaptureEntry, CaptureKind, CaptureTree};
use sha2::{Digest, Sha256};
use walkdir::WalkDir;

const READ_CHUNK: usize = 64 * 1024;

fn digest_of(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; READ_CHUNK];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("sha256:{:x}", hasher.finalize()))
}

/// Build a `CaptureTree` for `input`. Directories are walked in full;
/// files and zip archives are captured as a single entry. Entry
/// enumeration is capped at `MAX_LIST_ITEMS`; anything beyond that is
/// dropped and `truncated` is set, matching the core's own list cap
/// (§3.3) so the capture tree never promises more than the core will
/// actually examine.
pub fn build(input: &Path) -> CaptureTree {
    let mut entries = Vec::new();
    let mut issues = Vec::new();
    let mut truncated = false;

    let kind = if input.is_dir() {
        Some(CaptureKind::Dir)
    } else if input.is_file() {
        let ext = adapter_core::extension::normalize(input);
        if ext == ".zip" {
            Some(CaptureKind::Zip)
        } else {
            Some(CaptureKind::File)
        }
    } else {
        issues.push(format!("input path does not resolve to a file or directory: {}", input.display()));
        None
    };

    if input.is_dir() {
        for entry in WalkDir::new(input).into_iter().filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }
            if entries.len() >= MAX_LIST_ITEMS {
                truncated = true;
                break;
            }
            let relative = entry.path().strip_prefix(input).unwrap_or(entry.path());
            let rel_str = adapter_serde::normalize_path(&relative.to_string_lossy());
            let bytes = entry.metadata().map(|m| m.len()).unwrap_or(0);
            let digest = digest_of(entry.path()).unwrap_or_else(|e| {
                issues.push(format!("{}: {e}", entry.path().display()));
                String::new()
            });
            entries.push(CaptureEntry { path: rel_str, bytes, digest });
        }
    } else if input.is_file() {
        let bytes = std::fs::metadata(input).map(|m| m.len()).unwrap_or(0);
        let digest = digest_of(input).unwrap_or_else(|e| {
            issues.push(format!("{}: {e}", input.display()));
            String::new()
        });
        let name = input.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        entries.push(CaptureEntry { path: name, bytes, digest });
    }

    CaptureTree { kind, entries, truncated, issues }
}
