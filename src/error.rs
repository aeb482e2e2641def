//! Runtime error taxonomy.
//!
//! ERROR HANDLING
//! ==============
//! Every failure is scoped to the task that produced it. Callers log the
//! error and move on; nothing here is fatal to the observer, loader or router.
//! Application-level errors reported by the server (`{"error": ...}`) are not
//! represented here; they are a [`crate::dispatch::DispatchOutcome::Error`].

/// Errors surfaced by runtime operations.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// The server answered with a non-success HTTP status.
    #[error("HTTP error {status} from {url}")]
    Status { url: String, status: u16 },
    /// The request never produced a response (network down, CORS, aborted).
    #[error("network error: {0}")]
    Network(String),
    /// A placeholder's `data-props` attribute is not valid JSON.
    #[error("malformed props for component `{link}`: {source}")]
    MalformedProps {
        link: String,
        #[source]
        source: serde_json::Error,
    },
    /// A JSON body could not be encoded or decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// A platform call failed (missing window, socket refused, ...).
    #[error("host error: {0}")]
    Host(String),
}

impl RuntimeError {
    /// Whether this is a transport failure (status or network).
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Status { .. } | Self::Network(_))
    }
}
