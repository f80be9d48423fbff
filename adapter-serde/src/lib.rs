//! adapter-serde ☢
//! ===============
//!
//! Wire types shared by the safe-run adapter core and its callers:
//! the bounded summary/findings/meta records an adapter emits, the
//! selection and plugin vocabulary a caller provides, and the capture
//! tree snapshot the host filesystem walker hands in.
//!
//! These types carry no behavior beyond canonical (sorted, deduped)
//! serialization — the analysis logic that fills them in lives in
//! `adapter-core`.

#![forbid(unsafe_code)]

mod capture;
mod fail_code;
mod findings;
mod meta;
mod plugin;
mod run_result;
mod selection;
mod summary;

pub use capture::{normalize_path, CaptureEntry, CaptureKind, CaptureTree};
pub use fail_code::FailCode;
pub use findings::{AdapterFindings, Finding};
pub use meta::{AdapterCapability, AdapterListReport, AdapterMeta, AdapterMode, PluginAvailability};
pub use plugin::{EnabledPlugins, Plugin, PluginGateError};
pub use run_result::RunResult;
pub use selection::Selection;
pub use summary::AdapterSummary;

/// Schema version carried by every summary and findings record.
///
/// Bumped only if the wire shape changes in a way callers must branch
/// on; adding new, optional reason codes or markers does not require
/// a bump.
pub const SCHEMA_VERSION: u32 = 0;
