use std::fmt;
use std::io;

/// Errors internal to a parser or analyzer. These never cross the
/// `run_adapter` boundary directly — the dispatcher maps them to
/// either a marker (auto route) or a `FailCode` (strict route) per
/// §7's propagation policy.
#[derive(Debug)]
pub enum AdapterError {
    Io(io::Error),
    /// A parser could not make sense of the structure it was asked to
    /// read; the caller decides whether this is a mismatch or partial
    /// metadata based on route.
    Malformed(&'static str),
    /// An invariant that should be impossible given the calling
    /// analyzer's own checks was violated; maps to `ADAPTER_UNSUPPORTED`
    /// in release builds per §7.
    Invariant(&'static str),
}

impl fmt::Display for AdapterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdapterError::Io(e) => write!(f, "i/o error: {e}"),
            AdapterError::Malformed(what) => write!(f, "malformed input: {what}"),
            AdapterError::Invariant(what) => write!(f, "internal invariant violated: {what}"),
        }
    }
}

impl std::error::Error for AdapterError {}

impl From<io::Error> for AdapterError {
    fn from(e: io::Error) -> Self {
        AdapterError::Io(e)
    }
}

/// Debug builds panic on an `Invariant` error surfaced this way (§7);
/// release builds fall through to `ADAPTER_UNSUPPORTED`. Centralizing
/// the check here keeps the `debug_assert!`-style behavior out of
/// every call site.
pub fn assert_invariant(condition: bool, what: &'static str) -> Result<(), AdapterError> {
    if condition {
        Ok(())
    } else {
        debug_assert!(condition, "{what}");
        Err(AdapterError::Invariant(what))
    }
}
