use thiserror::Error;

#[derive(Debug, Error)]
pub enum BrowserError {
    /// Node.js browser server failed to spawn
    #[error("Failed to spawn {script} (is Node.js installed?): {source}")]
    SubprocessSpawn {
        script: String,
        #[source]
        source: std::io::Error,
    },

    /// JSON parsing failed (server output)
    #[error("JSON parse error ({context}): {source}")]
    JsonParse {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// JSON serialization failed (request to the server)
    #[error("JSON serialize error ({context}): {source}")]
    JsonSerialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// Reading or writing the server pipes failed, or the server died
    #[error("Browser session I/O error: {0}")]
    SessionIO(String),

    /// The server answered a command with ok=false
    #[error("Browser command '{command}' failed: {error}")]
    SessionProtocol { command: String, error: String },

    /// A wait exceeded its deadline
    #[error("Timed out after {timeout_ms}ms waiting for {what}")]
    Timeout { what: String, timeout_ms: u64 },

    /// An element handle from before the last navigation was used
    #[error("Element handle {handle} is stale (page navigated)")]
    StaleElement { handle: String },

    /// An element operation was rejected (e.g. no such option)
    #[error("{operation} failed: {reason}")]
    ElementOperation { operation: String, reason: String },
}

impl BrowserError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, BrowserError::Timeout { .. })
    }

    /// Errors that mean the page handle itself is gone.
    pub fn is_session_lost(&self) -> bool {
        matches!(self, BrowserError::SessionIO(_) | BrowserError::SubprocessSpawn { .. })
    }
}
