//! Per-class analyzers (§4.3–§4.11). Each module exposes a single
//! `analyze(&AnalyzeContext, ..) -> RunResult` entry point; the
//! dispatcher (`crate::dispatch`) is the only caller.

pub mod archive;
pub mod container;
pub mod document;
pub mod extension;
pub mod iac_cicd;
pub mod image;
pub mod package;
pub mod scm;
pub mod signature;
