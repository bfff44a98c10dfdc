//! IRCC remote-control codes and command identifiers.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Device-native IRCC code: `AAAAA` prefix, 13 base64 characters and `==` padding.
static RAW_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^AAAAA[A-Za-z0-9+/]{13}==$").expect("raw code pattern is valid"));

/// One entry of the device's remote-controller code table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteCode {
    /// Symbolic key name, e.g. `VolumeUp`.
    pub name: String,
    /// Raw IRCC code sent to the device.
    pub value: String,
}

/// A caller-supplied command, classified before dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandId {
    /// Pre-encoded IRCC code, sent as-is.
    Raw(String),
    /// Human-readable name that must be looked up in the code table.
    Symbolic(String),
}

impl CommandId {
    /// Classify an identifier as a raw code or a symbolic name.
    pub fn classify(id: impl Into<String>) -> Self {
        let id = id.into();
        if is_raw_code(&id) {
            Self::Raw(id)
        } else {
            Self::Symbolic(id)
        }
    }

    /// The identifier as the caller supplied it.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Raw(s) | Self::Symbolic(s) => s,
        }
    }
}

impl From<&str> for CommandId {
    fn from(value: &str) -> Self {
        Self::classify(value)
    }
}

impl From<String> for CommandId {
    fn from(value: String) -> Self {
        Self::classify(value)
    }
}

impl std::fmt::Display for CommandId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether `s` is a pre-encoded IRCC code.
#[must_use]
pub fn is_raw_code(s: &str) -> bool {
    RAW_CODE.is_match(s)
}
