//! Public-facing error type (§7.1). Transport-level and codec-level errors
//! never reach the caller directly (§7's "errors delivered to application
//! sinks" policy) — `FaceError` covers only the synchronous,
//! immediately-checkable entry points.

use std::fmt;

#[derive(Debug)]
pub struct TransportError(pub String);

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for TransportError {}

#[derive(Debug, thiserror::Error)]
pub enum FaceError {
    #[error("face is not open")]
    NotOpen,
}
