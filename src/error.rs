use std::path::PathBuf;
use thiserror::Error;

/// Why a request produced no classifiable HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkFailure {
    /// The connection was never established (DNS, refused, TLS handshake).
    ConnectionNotEstablished,
    /// Something came back, but too little of it to read a status line.
    IncompleteResponse,
    /// The redirect chain did not end within the allowed number of hops.
    TooManyRedirects,
}

impl NetworkFailure {
    /// Hint shown to the user under the error message.
    pub fn hint(self) -> &'static str {
        match self {
            Self::ConnectionNotEstablished => "check your connection and try again",
            Self::IncompleteResponse => "the server response was too short to classify",
            Self::TooManyRedirects => "the server redirected too many times",
        }
    }
}

/// Failures raised by the installer components.
#[derive(Debug, Error)]
pub enum InstallerError {
    #[error("malformed version '{input}': {reason}")]
    MalformedVersion { input: String, reason: String },

    #[error("refusing to contact non-HTTPS URL: {url}")]
    InsecureUrl { url: String },

    #[error("network error for {url}: {}", failure.hint())]
    Network {
        url: String,
        failure: NetworkFailure,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("client error {status} for {url}")]
    ClientError { url: String, status: u16 },

    #[error("server error {status} for {url}")]
    ServerError { url: String, status: u16 },

    #[error("unexpected response {status} for {url}")]
    UnknownResponse { url: String, status: u16 },

    #[error("no published checksum matches {}", file.display())]
    ChecksumNotFound { file: PathBuf },

    #[error("published checksum for {name} does not match {}", file.display())]
    ChecksumMismatch { file: PathBuf, name: String },

    #[error("not a regular file: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("failed to hash {}", path.display())]
    HashComputation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{message}")]
    Filesystem {
        message: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to extract {}: {message}", archive.display())]
    Extraction { archive: PathBuf, message: String },

    #[error("unsupported architecture '{arch}' (supported: x86_64, i386/i686)")]
    UnsupportedArchitecture { arch: String },

    #[error("could not determine the home directory (HOME is unset)")]
    MissingHome,
}

impl InstallerError {
    /// Builds a [`InstallerError::Filesystem`] with a formatted message.
    pub fn filesystem(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Filesystem {
            message: message.into(),
            source,
        }
    }
}

pub type InstallerResult<T> = std::result::Result<T, InstallerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_error_mentions_hint() {
        let err = InstallerError::Network {
            url: "https://go.dev/dl/".to_string(),
            failure: NetworkFailure::ConnectionNotEstablished,
            source: None,
        };
        let message = err.to_string();
        assert!(message.contains("https://go.dev/dl/"));
        assert!(message.contains("check your connection"));
    }

    #[test]
    fn test_client_error_display() {
        let err = InstallerError::ClientError {
            url: "https://go.dev/x".to_string(),
            status: 404,
        };
        assert_eq!(err.to_string(), "client error 404 for https://go.dev/x");
    }
}
