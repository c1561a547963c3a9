//! Error classification and recovery hints.

use serde::{Deserialize, Serialize};

/// Broad error category for routing recovery logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Connection,
    Timeout,
    Protocol,
    Api,
    Authentication,
    Configuration,
    Io,
    Unknown,
}

impl ErrorCategory {
    /// Suggest recovery actions for errors of this category.
    pub fn recovery_suggestion(self) -> RecoverySuggestion {
        match self {
            Self::Connection => RecoverySuggestion::CheckServerRunning,
            Self::Timeout => RecoverySuggestion::IncreaseTimeout,
            Self::Authentication => RecoverySuggestion::CheckCredentials,
            Self::Configuration => RecoverySuggestion::CheckConfiguration,
            Self::Protocol => RecoverySuggestion::TryAnotherModel,
            Self::Api => RecoverySuggestion::CheckModelName,
            Self::Io | Self::Unknown => RecoverySuggestion::InspectLogs,
        }
    }
}

/// Suggested recovery action, shown next to the error by the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoverySuggestion {
    CheckServerRunning,
    IncreaseTimeout,
    CheckCredentials,
    CheckConfiguration,
    CheckModelName,
    TryAnotherModel,
    InspectLogs,
}

impl RecoverySuggestion {
    /// Human-readable hint.
    pub fn hint(&self) -> &'static str {
        match self {
            Self::CheckServerRunning => {
                "Make sure the model server is running and the host/base URL is correct"
            }
            Self::IncreaseTimeout => "The server is slow to answer; try a smaller model or retry later",
            Self::CheckCredentials => "Check the API key",
            Self::CheckConfiguration => "Check the provider settings and model names",
            Self::CheckModelName => "Check that the model name exists on the server",
            Self::TryAnotherModel => "The server answered in an unexpected shape; try another model",
            Self::InspectLogs => "Inspect the logs for details",
        }
    }
}
