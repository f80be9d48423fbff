//! adapter-core ☢
//! ==============
//!
//! The deterministic, analysis-only CORE of the safe-run artifact
//! inspection engine: bounded structural parsers and per-class
//! analyzers that turn an untrusted artifact into a `RunResult`
//! without ever executing or mutating it.
//!
//! `run_adapter` is the single entry point. It never opens a network
//! socket, never writes outside of what the caller's capture tree
//! already captured, and never shells out to anything beyond the
//! closed `{tar, 7z, git}` enumeration vocabulary under a hard
//! timeout (`external::run_bounded`).

#![forbid(unsafe_code)]

pub mod analyzers;
pub mod bytes;
pub mod canon;
pub mod capability;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod extension;
pub mod external;
pub mod parsers;
pub mod text;

pub use adapter_serde::{
    AdapterCapability, AdapterFindings, AdapterListReport, AdapterMeta, AdapterMode, AdapterSummary, CaptureEntry, CaptureKind,
    CaptureTree, EnabledPlugins, FailCode, Finding, Plugin, PluginAvailability, PluginGateError, RunResult, Selection,
};

pub use capability::list_adapters;
pub use context::AnalyzeContext;
pub use dispatch::run_adapter;
pub use error::AdapterError;
