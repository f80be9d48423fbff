//! The per-call context every class analyzer receives (§3.1, §5).
//!
//! Analyzers are pure functions of this context: they open the input
//! path themselves (read-only), consult `capture` only as auxiliary
//! evidence, and never retain state across calls.

use std::path::Path;

use adapter_serde::{CaptureTree, EnabledPlugins};

pub struct AnalyzeContext<'a> {
    pub path: &'a Path,
    pub capture: &'a CaptureTree,
    /// `true` iff the caller's selection was anything but `auto`
    /// (§3.3 "fail-closed on strict route").
    pub strict: bool,
    pub plugins: &'a EnabledPlugins,
    /// The canonical extension computed by `extension::normalize`
    /// (§4.2) — the single vocabulary every analyzer's per-format
    /// `match` switches on.
    pub ext: String,
}

impl<'a> AnalyzeContext<'a> {
    pub fn is_directory(&self) -> bool {
        self.path.is_dir()
    }
}
