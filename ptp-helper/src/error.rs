//! Helper error kinds and their D-Bus mapping

use ptp_common::theme::ThemeError;
use thiserror::Error;
use zbus::fdo;

#[derive(Debug, Error)]
pub enum HelperError {
    #[error("not authorized to perform {0}")]
    NotAuthorized(String),

    #[error(transparent)]
    Theme(#[from] ThemeError),

    #[error("another plymouth operation is already running")]
    Busy,

    #[error("{command} failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("failed to run {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("plymouthd did not become ready after {0} attempts")]
    DaemonNotReady(u32),

    #[error("D-Bus error: {0}")]
    Bus(#[from] zbus::Error),
}

impl From<HelperError> for fdo::Error {
    fn from(err: HelperError) -> Self {
        match err {
            HelperError::NotAuthorized(_) => fdo::Error::AccessDenied(err.to_string()),
            HelperError::Theme(_) => fdo::Error::InvalidArgs(err.to_string()),
            _ => fdo::Error::Failed(err.to_string()),
        }
    }
}
