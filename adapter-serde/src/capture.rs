use serde::{Deserialize, Serialize};

/// The shape of the externally-supplied input snapshot (§3.1). The
/// capture tree is produced by the host's filesystem walker; this
/// core only ever reads it, never re-derives it from scratch except
/// where a strict-route parser is required to re-verify structural
/// markers directly from bytes.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureKind {
    File,
    Zip,
    Dir,
}

/// A single entry inside the capture tree.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct CaptureEntry {
    /// Path relative to the input root. Always forward-slash
    /// separated by the time it reaches this core.
    pub path: String,
    pub bytes: u64,
    pub digest: String,
}

/// The externally produced snapshot handed to `run_adapter`.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct CaptureTree {
    pub kind: Option<CaptureKind>,
    pub entries: Vec<CaptureEntry>,
    pub truncated: bool,
    pub issues: Vec<String>,
}

impl CaptureTree {
    pub fn empty() -> CaptureTree {
        CaptureTree::default()
    }

    /// Canonicalized entry paths: backslashes normalized, a leading
    /// `./` stripped (§3.3 path hygiene).
    pub fn normalized_paths(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|e| normalize_path(&e.path))
            .collect()
    }
}

/// `\` -> `/`, strip a leading `./`. Shared by every container-format
/// analyzer that needs to compare internal path strings.
pub fn normalize_path(path: &str) -> String {
    let replaced = path.replace('\\', "/");
    replaced
        .strip_prefix("./")
        .map(str::to_owned)
        .unwrap_or(replaced)
}
