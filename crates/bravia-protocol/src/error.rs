//! Request and wire-format errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("HTTP status {status}{}", suffix(.detail))]
    HttpStatus { status: u16, detail: Option<String> },

    #[error("device reported error: {message}")]
    Application { code: Option<i64>, message: String },

    #[error("malformed response ({context}): {body}")]
    MalformedResponse { context: String, body: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn suffix(detail: &Option<String>) -> String {
    detail.as_deref().map(|d| format!(": {d}")).unwrap_or_default()
}

impl ProtocolError {
    pub fn malformed(context: impl Into<String>, body: impl Into<String>) -> Self {
        Self::MalformedResponse {
            context: context.into(),
            body: body.into(),
        }
    }

    /// Whether the device could not be reached at all.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Timeout { .. })
    }
}
