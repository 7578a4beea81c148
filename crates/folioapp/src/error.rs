use crate::model::FailureKind;
use thiserror::Error;

/// Error surface of the remote file-storage and roster collaborators.
///
/// `status` is the HTTP-style status code; `None` means the service could
/// not be reached at all (network failure, DNS, timeout).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}", describe(.status, .message))]
pub struct RemoteError {
    pub status: Option<u16>,
    pub message: String,
}

fn describe(status: &Option<u16>, message: &str) -> String {
    match status {
        Some(code) => format!("remote error {}: {}", code, message),
        None => format!("remote unreachable: {}", message),
    }
}

impl RemoteError {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }

    pub fn unreachable(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }

    pub fn not_found(id: &str) -> Self {
        Self::new(404, format!("file not found: {}", id))
    }

    pub fn forbidden(id: &str) -> Self {
        Self::new(403, format!("insufficient permission for file: {}", id))
    }

    /// Classifies the error into the per-file failure taxonomy.
    pub fn kind(&self) -> FailureKind {
        match self.status {
            Some(403) => FailureKind::Permission,
            Some(404) => FailureKind::NotFound,
            Some(code) if code >= 500 => FailureKind::Transient,
            Some(_) => FailureKind::Rejected,
            None => FailureKind::Transient,
        }
    }
}

#[derive(Error, Debug)]
pub enum FolioError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Store error: {0}")]
    Store(String),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Api Error: {0}")]
    Api(String),
}

pub type Result<T> = std::result::Result<T, FolioError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_status_codes() {
        assert_eq!(RemoteError::forbidden("a").kind(), FailureKind::Permission);
        assert_eq!(RemoteError::not_found("a").kind(), FailureKind::NotFound);
        assert_eq!(RemoteError::new(503, "busy").kind(), FailureKind::Transient);
        assert_eq!(RemoteError::new(400, "bad").kind(), FailureKind::Rejected);
        assert_eq!(
            RemoteError::unreachable("dns").kind(),
            FailureKind::Transient
        );
    }

    #[test]
    fn display_includes_status() {
        let err = RemoteError::new(403, "nope");
        assert_eq!(err.to_string(), "remote error 403: nope");
        let err = RemoteError::unreachable("timeout");
        assert_eq!(err.to_string(), "remote unreachable: timeout");
    }
}
