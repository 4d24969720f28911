// =============================================================================
// Error taxonomy — kinds, not exhaustive types (spec §7)
// =============================================================================
//
// `CoreError` is the typed core of the error taxonomy; call sites wrap it in
// `anyhow::Error` via `?` the same way the rest of this codebase wraps broker
// errors. Matching on `CoreError` (or `.downcast_ref::<CoreError>()`) lets a
// service decide retry-vs-skip-vs-fatal without string-sniffing messages.
// =============================================================================

use thiserror::Error;

/// The error kinds from spec §7. Each variant's doc comment states its
/// propagation policy; callers enforce the policy, this type only classifies.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Missing/invalid credentials or config values. Fatal at startup.
    #[error("config error: {0}")]
    Config(String),

    /// Rate limit, 5xx, network blip. Retry with backoff up to 3 attempts,
    /// then surface as a cycle skip.
    #[error("transient broker error: {0}")]
    BrokerTransient(String),

    /// Rejected order, unknown symbol, insufficient buying power. Logged,
    /// signal discarded, no retry.
    #[error("permanent broker error: {0}")]
    BrokerPermanent(String),

    /// Malformed or missing bars/quote. Per-symbol skip, not fatal.
    #[error("data error for {symbol}: {reason}")]
    Data { symbol: String, reason: String },

    /// Lock timeout, JSON parse failure, schema mismatch. The affected file
    /// is quarantined and reinitialized empty.
    #[error("state error on {path}: {reason}")]
    State { path: String, reason: String },

    /// Stale PID, crashed child. Handled by the Orchestrator.
    #[error("lifecycle error: {0}")]
    Lifecycle(String),
}

impl CoreError {
    /// Whether a `BrokerTransient` attempt counter should keep retrying.
    /// Mirrors the "retried with exponential backoff up to 3 attempts" policy
    /// in spec §7 — callers pass the attempt number they're about to make.
    /// Driven by `AlpacaClient::request_with_retry` and `cancel_order`.
    pub fn should_retry_transient(attempt: u32) -> bool {
        attempt < 3
    }
}
