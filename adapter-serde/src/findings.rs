use crate::SCHEMA_VERSION;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Maximum number of findings a single `AdapterFindings` record may
/// carry (§3.2, §8 boundedness).
pub const MAX_FINDING_CODES: usize = 128;

/// A single categorical finding: a code and how many times its
/// evidence was observed.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct Finding {
    pub code: String,
    pub count: u64,
}

/// The bounded findings histogram an adapter emits alongside its
/// summary (§3.2). `findings` is sorted by `(code, count)` and capped
/// at `MAX_FINDING_CODES` entries; `markers` mirrors the summary's
/// marker set.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct AdapterFindings {
    pub schema: String,
    #[serde(rename = "schemaVersion")]
    pub schema_version: u32,
    #[serde(rename = "adapterId")]
    pub adapter_id: String,
    #[serde(rename = "sourceClass")]
    pub source_class: String,
    pub findings: Vec<Finding>,
    pub markers: BTreeSet<String>,
}

impl AdapterFindings {
    pub fn new(adapter_id: impl Into<String>, source_class: impl Into<String>) -> AdapterFindings {
        AdapterFindings {
            schema: "adapter_findings".to_string(),
            schema_version: SCHEMA_VERSION,
            adapter_id: adapter_id.into(),
            source_class: source_class.into(),
            findings: Vec::new(),
            markers: BTreeSet::new(),
        }
    }

    /// Insert a finding, keeping the vector sorted by `(code, count)`
    /// and capped at `MAX_FINDING_CODES` (§3.2).
    pub fn add_finding(&mut self, code: impl Into<String>, count: u64) {
        if self.findings.len() >= MAX_FINDING_CODES {
            return;
        }
        let finding = Finding { code: code.into(), count };
        let pos = self.findings.partition_point(|f| f < &finding);
        self.findings.insert(pos, finding);
    }

    pub fn add_marker(&mut self, marker: impl Into<String>) {
        self.markers.insert(marker.into());
    }
}
