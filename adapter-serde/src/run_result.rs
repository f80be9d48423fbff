use crate::{AdapterFindings, AdapterMeta, AdapterSummary, FailCode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The single result type `run_adapter` produces (§3.2). Exactly one
/// of its two shapes is ever returned: a no-op/downgraded/successful
/// analysis, or a fail-closed rejection on the strict route.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunResult {
    Ok {
        #[serde(rename = "reasonCodes")]
        reason_codes: BTreeSet<String>,
        adapter: AdapterMeta,
        summary: AdapterSummary,
        findings: AdapterFindings,
        /// Non-authoritative signal strings surfaced for host-side
        /// aggregation; never gates pass/fail on its own.
        signals: Vec<String>,
    },
    Fail {
        #[serde(rename = "failCode")]
        fail_code: FailCode,
        #[serde(rename = "failMessage")]
        fail_message: String,
        #[serde(rename = "reasonCodes")]
        reason_codes: BTreeSet<String>,
    },
}

impl RunResult {
    /// The no-op result returned whenever dispatch resolves to "do
    /// nothing" (unsupported input on the auto route, `selection=none`
    /// with no plugins requested) per §4.1.
    pub fn noop() -> RunResult {
        RunResult::Ok {
            reason_codes: BTreeSet::new(),
            adapter: AdapterMeta {
                adapter_id: "noop_adapter_v1".to_string(),
                source_format: "none".to_string(),
                mode: crate::AdapterMode::BuiltIn,
                reason_codes: BTreeSet::new(),
            },
            summary: AdapterSummary::new("noop_adapter_v1", "none", "none", crate::AdapterMode::BuiltIn),
            findings: AdapterFindings::new("noop_adapter_v1", "none"),
            signals: Vec::new(),
        }
    }

    pub fn fail(code: FailCode, message: impl Into<String>) -> RunResult {
        RunResult::Fail {
            fail_code: code,
            fail_message: message.into(),
            reason_codes: BTreeSet::from([code.as_str().to_string()]),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, RunResult::Ok { .. })
    }
}
