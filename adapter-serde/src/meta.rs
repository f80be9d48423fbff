use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Whether an adapter resolved its result using only built-in parsers
/// or by delegating (at least in part) to an external plugin tool.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterMode {
    BuiltIn,
    Plugin,
    /// A class that is sometimes built-in and sometimes plugin-backed
    /// depending on the concrete format matched, used only in
    /// `list_adapters` capability rows (§6), never in a single run's
    /// `AdapterSummary.mode`.
    Mixed,
}

/// The small metadata record accompanying a `RunResult::Ok` (§3.2).
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct AdapterMeta {
    #[serde(rename = "adapterId")]
    pub adapter_id: String,
    #[serde(rename = "sourceFormat")]
    pub source_format: String,
    pub mode: AdapterMode,
    #[serde(rename = "reasonCodes")]
    pub reason_codes: BTreeSet<String>,
}

/// One external tool a class's analyzer may invoke, and whether it
/// was observed available on this host (§6).
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct PluginAvailability {
    pub name: String,
    pub available: bool,
}

/// One row of the capability listing: an adapter class, its mode, its
/// plugins (if any) and the formats it recognizes (§6).
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct AdapterCapability {
    pub adapter: String,
    pub mode: AdapterMode,
    pub plugins: Vec<PluginAvailability>,
    pub formats: Vec<String>,
}

/// `list_adapters()`'s full result: every adapter class, sorted by
/// `(adapter, format, plugin.name)` as specified in §6.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct AdapterListReport {
    pub adapters: Vec<AdapterCapability>,
}
