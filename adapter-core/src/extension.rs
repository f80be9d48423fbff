//! Canonical extension normalization (§4.2): the single helper that
//! maps a path to the closed extension vocabulary used for dispatch,
//! per-format `match` arms, and error messages.

use std::path::Path;

const COMPOUND_SUFFIXES: &[&str] = &[".tar.gz", ".tar.bz2", ".tar.xz"];

/// Normalize `path`'s extension to one of `.tar.gz | .tar.bz2 | .tar.xz
/// | .tgz | .txz | <single .ext>` (§4.2). `.tgz`/`.txz` are kept as
/// their own canonical forms rather than folded into the long-form
/// compound spelling, matching the closed alphabet §4.2 names; callers
/// that treat compressed tar uniformly match on all four.
pub fn normalize(path: &Path) -> String {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    for suffix in COMPOUND_SUFFIXES {
        if name.ends_with(suffix) {
            return (*suffix).to_string();
        }
    }
    match name.rfind('.') {
        Some(idx) if idx > 0 => name[idx..].to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::path::PathBuf;

    #[test]
    fn canonicalizes_compound_tar_suffixes() {
        assert_eq!(normalize(&PathBuf::from("a/b.tar.gz")), ".tar.gz");
        assert_eq!(normalize(&PathBuf::from("a/b.tar.bz2")), ".tar.bz2");
    }

    #[test]
    fn shorthand_compressed_tar_suffixes_stay_distinct() {
        assert_eq!(normalize(&PathBuf::from("a.tgz")), ".tgz");
        assert_eq!(normalize(&PathBuf::from("a.txz")), ".txz");
    }

    #[test]
    fn single_extension_is_lowercased() {
        assert_eq!(normalize(&PathBuf::from("Archive.ZIP")), ".zip");
    }

    #[test]
    fn no_extension_yields_empty_string() {
        assert_eq!(normalize(&PathBuf::from("README")), "");
    }

    #[rstest]
    #[case("bundle.tar.gz", ".tar.gz")]
    #[case("bundle.tgz", ".tgz")]
    #[case("bundle.tar.bz2", ".tar.bz2")]
    #[case("bundle.tar.xz", ".tar.xz")]
    #[case("bundle.txz", ".txz")]
    #[case("bundle.7Z", ".7z")]
    #[case("manifest.JSON", ".json")]
    #[case("no_dot_at_all", "")]
    #[case(".hidden", "")]
    fn normalize_matches_expected_for_each_case(#[case] name: &str, #[case] expected: &str) {
        assert_eq!(normalize(&PathBuf::from(name)), expected);
    }
}
