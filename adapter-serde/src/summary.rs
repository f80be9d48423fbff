use crate::meta::AdapterMode;
use crate::SCHEMA_VERSION;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// The bounded structural summary an adapter emits on success (§3.2).
///
/// `counts` keys are sorted lexicographically by construction
/// (`BTreeMap`); `markers` and `reasonCodes` are sorted and deduped by
/// construction (`BTreeSet`) — canonical JSON output falls out of the
/// type rather than a post-processing pass.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct AdapterSummary {
    pub schema: String,
    #[serde(rename = "schemaVersion")]
    pub schema_version: u32,
    #[serde(rename = "adapterId")]
    pub adapter_id: String,
    #[serde(rename = "sourceClass")]
    pub source_class: String,
    #[serde(rename = "sourceFormat")]
    pub source_format: String,
    pub mode: AdapterMode,
    pub counts: BTreeMap<String, u64>,
    pub markers: BTreeSet<String>,
    #[serde(rename = "reasonCodes")]
    pub reason_codes: BTreeSet<String>,
}

impl AdapterSummary {
    pub fn new(adapter_id: impl Into<String>, source_class: impl Into<String>, source_format: impl Into<String>, mode: AdapterMode) -> AdapterSummary {
        AdapterSummary {
            schema: "adapter_summary".to_string(),
            schema_version: SCHEMA_VERSION,
            adapter_id: adapter_id.into(),
            source_class: source_class.into(),
            source_format: source_format.into(),
            mode,
            counts: BTreeMap::new(),
            markers: BTreeSet::new(),
            reason_codes: BTreeSet::new(),
        }
    }

    pub fn with_count(mut self, key: impl Into<String>, value: u64) -> AdapterSummary {
        self.counts.insert(key.into(), value);
        self
    }

    pub fn add_marker(&mut self, marker: impl Into<String>) {
        self.markers.insert(marker.into());
    }

    pub fn add_reason(&mut self, reason: impl Into<String>) {
        self.reason_codes.insert(reason.into());
    }
}
