//! Top-level orchestrator errors.

use thiserror::Error;

use crate::ledger::LedgerError;
use crate::lock::LockError;

/// Errors surfaced by orchestrator operations.
///
/// Per-record failures never appear here; they are isolated inside the
/// acquisition paths and reported through counters and alerts. This type
/// covers operations that fail as a whole (a subscription that cannot be
/// established, a counters read that fails).
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// A ledger operation failed.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// The lock service failed.
    #[error(transparent)]
    Lock(#[from] LockError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ledger_errors_convert() {
        let err: OrchestratorError = LedgerError::StaleBlockReference.into();
        assert!(matches!(err, OrchestratorError::Ledger(_)));
        assert_eq!(err.to_string(), "stale block reference");
    }
}
