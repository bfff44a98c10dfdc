//! JSON-RPC service namespaces exposed under `/sony/{namespace}`.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A named group of remote methods that are versioned and invoked together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Namespace {
    AccessControl,
    AppControl,
    Audio,
    AvContent,
    Browser,
    Cec,
    Encryption,
    Guide,
    Recording,
    System,
    VideoScreen,
}

impl Namespace {
    /// Every namespace a session exposes.
    pub const ALL: [Namespace; 11] = [
        Self::AccessControl,
        Self::AppControl,
        Self::Audio,
        Self::AvContent,
        Self::Browser,
        Self::Cec,
        Self::Encryption,
        Self::Guide,
        Self::Recording,
        Self::System,
        Self::VideoScreen,
    ];

    /// Name used in the endpoint path.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AccessControl => "accessControl",
            Self::AppControl => "appControl",
            Self::Audio => "audio",
            Self::AvContent => "avContent",
            Self::Browser => "browser",
            Self::Cec => "cec",
            Self::Encryption => "encryption",
            Self::Guide => "guide",
            Self::Recording => "recording",
            Self::System => "system",
            Self::VideoScreen => "videoScreen",
        }
    }

    /// Request path relative to the `/sony` root.
    #[must_use]
    pub fn path(self) -> String {
        format!("/{}", self.as_str())
    }
}

impl std::fmt::Display for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown namespace: {0}")]
pub struct ParseNamespaceError(pub String);

impl FromStr for Namespace {
    type Err = ParseNamespaceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|ns| ns.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseNamespaceError(s.to_string()))
    }
}
