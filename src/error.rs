//! Error types with fix suggestions
//!
//! Only whole-run failures live here. Per-event problems (a screenshot that
//! could not be grabbed, a vision call that failed) are degraded where they
//! happen and never surface as a `StepdocError`.

use std::path::PathBuf;

use thiserror::Error;

/// Trait for errors that provide fix suggestions
pub trait FixSuggestion {
    fn fix_suggestion(&self) -> Option<&str>;
}

pub type Result<T> = std::result::Result<T, StepdocError>;

#[derive(Error, Debug)]
pub enum StepdocError {
    #[error("No session log found at '{}'", path.display())]
    MissingSession { path: PathBuf },

    #[error("Session log '{}' is not valid: {source}", path.display())]
    SessionParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode session log: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to replace '{}': {reason}", path.display())]
    Persist { path: PathBuf, reason: String },

    #[error("Config error: {reason}")]
    Config { reason: String },

    #[error("Invalid config value for '{field}': {reason}")]
    InvalidConfig { field: String, reason: String },

    #[error("Unknown provider: '{name}'")]
    UnknownProvider { name: String },

    #[error("Capture error: {reason}")]
    Capture { reason: String },

    #[error("Desktop capture is not available in this build")]
    CaptureUnavailable,
}

impl FixSuggestion for StepdocError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            StepdocError::MissingSession { .. } => {
                Some("Record a session first with: stepdoc --record")
            }
            StepdocError::SessionParse { .. } => {
                Some("The log must be a JSON array of events; re-record the session")
            }
            StepdocError::Serialize(_) => None,
            StepdocError::Io(_) => Some("Check file path and permissions"),
            StepdocError::Persist { .. } => {
                Some("Check that the session directory is writable")
            }
            StepdocError::Config { .. } => Some("Check YAML syntax in stepdoc.yaml"),
            StepdocError::InvalidConfig { .. } => {
                Some("Fix the value in stepdoc.yaml, the environment or the CLI flag")
            }
            StepdocError::UnknownProvider { .. } => Some("Available providers: ollama, mock"),
            StepdocError::Capture { .. } => {
                Some("Grant input-monitoring / accessibility permission to the terminal")
            }
            StepdocError::CaptureUnavailable => {
                Some("Rebuild with: cargo install stepdoc --features desktop")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_session_names_path_and_suggests_record() {
        let err = StepdocError::MissingSession {
            path: PathBuf::from("session_data/log.json"),
        };
        assert_eq!(
            err.to_string(),
            "No session log found at 'session_data/log.json'"
        );
        assert!(err.fix_suggestion().unwrap().contains("--record"));
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: StepdocError = io.into();
        assert!(matches!(err, StepdocError::Io(_)));
        assert!(err.to_string().contains("denied"));
    }

    #[test]
    fn unknown_provider_lists_choices() {
        let err = StepdocError::UnknownProvider {
            name: "gpt".to_string(),
        };
        assert!(err.fix_suggestion().unwrap().contains("ollama"));
    }
}
