use thiserror::Error;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Structured error hierarchy for promptgate.
///
/// Each subsystem defines its own error variant. The HTTP layer matches on
/// these to pick a status code; internal code continues to use
/// `anyhow::Result` for ad-hoc context chains.
#[derive(Debug, Error)]
pub enum GateError {
    // ── Config ───────────────────────────────────────────────────────────
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    // ── Generation backend ──────────────────────────────────────────────
    #[error("llm: {0}")]
    Llm(#[from] LlmError),

    // ── Session store ───────────────────────────────────────────────────
    #[error("store: {0}")]
    Store(#[from] StoreError),

    // ── Session query ───────────────────────────────────────────────────
    #[error("session: {0}")]
    Session(#[from] SessionError),

    // ── Request validation ──────────────────────────────────────────────
    #[error("{0}")]
    Validation(String),

    // ── Generic fallthrough (wraps anyhow for interop) ──────────────────
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

// ─── Generation backend errors ──────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("backend {backend} request failed: {message}")]
    Request { backend: String, message: String },

    #[error("backend {backend} timed out after {secs}s")]
    Timeout { backend: String, secs: u64 },
}

// ─── Session store errors ───────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("backend not available: {0}")]
    Unavailable(String),

    #[error("backend request failed: {0}")]
    Backend(String),
}

// ─── Session query errors ───────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("record {session_id} has malformed timestamp '{value}'")]
    MalformedRecord { session_id: String, value: String },
}

// ─── Convenience re-exports ─────────────────────────────────────────────────

/// Shorthand result type for the crate.
pub type Result<T> = std::result::Result<T, GateError>;
