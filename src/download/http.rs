use crate::download::Transport;
use crate::error::{InstallerError, InstallerResult, NetworkFailure};
use std::fs;
use std::io::{Read, Write};
use std::path::Path;
use tracing::debug;

const MAX_REDIRECTS: u32 = 10;

/// Reject anything that is not an https:// URL before a request is built
pub fn ensure_https(url: &str) -> InstallerResult<()> {
    let is_https = url
        .get(..8)
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case("https://"));
    if is_https {
        Ok(())
    } else {
        Err(InstallerError::InsecureUrl {
            url: url.to_string(),
        })
    }
}

/// Classify a response by status-code class.
///
/// Status `0` is the "no response" sentinel; `response_lines` tells apart a
/// connection that never came up (at most one captured line) from a reply
/// too short to carry a status.
pub fn classify_status(url: &str, status: u16, response_lines: usize) -> InstallerResult<()> {
    match status {
        0 => Err(InstallerError::Network {
            url: url.to_string(),
            failure: if response_lines <= 1 {
                NetworkFailure::ConnectionNotEstablished
            } else {
                NetworkFailure::IncompleteResponse
            },
            source: None,
        }),
        200..=399 => Ok(()),
        400..=499 => Err(InstallerError::ClientError {
            url: url.to_string(),
            status,
        }),
        500..=599 => Err(InstallerError::ServerError {
            url: url.to_string(),
            status,
        }),
        // 1xx is never final for this flow
        _ => Err(InstallerError::UnknownResponse {
            url: url.to_string(),
            status,
        }),
    }
}

/// Blocking HTTPS transport backed by a ureq agent
pub struct HttpTransport {
    agent: ureq::Agent,
}

impl HttpTransport {
    pub fn new(user_agent: &str) -> Self {
        // rustls negotiates TLS 1.2 or 1.3 only
        let agent = ureq::AgentBuilder::new()
            .https_only(true)
            .redirects(MAX_REDIRECTS)
            .user_agent(user_agent)
            .build();
        Self { agent }
    }

    fn call(&self, method: &str, url: &str) -> InstallerResult<ureq::Response> {
        ensure_https(url)?;
        debug!(method, url, "sending request");

        match self.agent.request(method, url).call() {
            Ok(response) => {
                debug!(status = response.status(), url, "response received");
                classify_status(url, response.status(), 1)?;
                Ok(response)
            }
            Err(ureq::Error::Status(status, _)) => {
                classify_status(url, status, 1)?;
                Err(InstallerError::UnknownResponse {
                    url: url.to_string(),
                    status,
                })
            }
            Err(ureq::Error::Transport(transport)) => Err(map_transport_error(url, transport)),
        }
    }
}

/// None means the request was refused for being insecure
fn network_failure(kind: ureq::ErrorKind) -> Option<NetworkFailure> {
    use ureq::ErrorKind;

    match kind {
        ErrorKind::InsecureRequestHttpsOnly | ErrorKind::UnknownScheme => None,
        ErrorKind::Dns
        | ErrorKind::ConnectionFailed
        | ErrorKind::InvalidProxyUrl
        | ErrorKind::ProxyConnect
        | ErrorKind::ProxyUnauthorized => Some(NetworkFailure::ConnectionNotEstablished),
        ErrorKind::TooManyRedirects => Some(NetworkFailure::TooManyRedirects),
        _ => Some(NetworkFailure::IncompleteResponse),
    }
}

fn map_transport_error(url: &str, transport: ureq::Transport) -> InstallerError {
    let Some(failure) = network_failure(transport.kind()) else {
        return InstallerError::InsecureUrl {
            url: transport
                .url()
                .map_or_else(|| url.to_string(), |u| u.to_string()),
        };
    };

    InstallerError::Network {
        url: url.to_string(),
        failure,
        source: Some(Box::new(transport)),
    }
}

impl Transport for HttpTransport {
    fn probe(&self, url: &str) -> InstallerResult<()> {
        self.call("HEAD", url).map(|_| ())
    }

    fn fetch_text(&self, url: &str) -> InstallerResult<String> {
        let response = self.call("GET", url)?;
        let mut body = String::new();
        response
            .into_reader()
            .read_to_string(&mut body)
            .map_err(|e| InstallerError::Network {
                url: url.to_string(),
                failure: NetworkFailure::IncompleteResponse,
                source: Some(Box::new(e)),
            })?;
        Ok(body)
    }

    fn download(&self, url: &str, dest: &Path) -> InstallerResult<u64> {
        let response = self.call("GET", url)?;
        let expected_len = response
            .header("Content-Length")
            .and_then(|len| len.parse::<u64>().ok());

        let temp_path = dest.with_extension(format!(
            "{}.tmp",
            dest.extension()
                .and_then(|ext| ext.to_str())
                .unwrap_or("download")
        ));

        let written = stream_to_file(url, response.into_reader(), &temp_path).inspect_err(|_| {
            let _ = fs::remove_file(&temp_path);
        })?;

        if let Some(expected) = expected_len
            && expected != written
        {
            let _ = fs::remove_file(&temp_path);
            return Err(InstallerError::Network {
                url: url.to_string(),
                failure: NetworkFailure::IncompleteResponse,
                source: Some(
                    format!("expected {expected} bytes, received {written}").into(),
                ),
            });
        }

        fs::rename(&temp_path, dest).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            InstallerError::filesystem(
                format!(
                    "Failed to move temporary file to final location: {} -> {}",
                    temp_path.display(),
                    dest.display()
                ),
                e,
            )
        })?;

        debug!(path = %dest.display(), bytes = written, "download complete");
        Ok(written)
    }
}

/// Copy the body into an owner-only file; read errors are network failures,
/// write errors are filesystem failures
fn stream_to_file(url: &str, mut reader: impl Read, path: &Path) -> InstallerResult<u64> {
    let mut file = create_private_file(path).map_err(|e| {
        InstallerError::filesystem(
            format!("Failed to create temporary file: {}", path.display()),
            e,
        )
    })?;

    let mut buffer = [0u8; 64 * 1024];
    let mut written = 0u64;
    loop {
        let read = reader.read(&mut buffer).map_err(|e| InstallerError::Network {
            url: url.to_string(),
            failure: NetworkFailure::IncompleteResponse,
            source: Some(Box::new(e)),
        })?;
        if read == 0 {
            break;
        }
        file.write_all(&buffer[..read]).map_err(|e| {
            InstallerError::filesystem(format!("Failed to write to {}", path.display()), e)
        })?;
        written += read as u64;
    }

    file.sync_all().map_err(|e| {
        InstallerError::filesystem(format!("Failed to sync {}", path.display()), e)
    })?;
    Ok(written)
}

#[cfg(unix)]
fn create_private_file(path: &Path) -> std::io::Result<fs::File> {
    use std::os::unix::fs::OpenOptionsExt;
    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn create_private_file(path: &Path) -> std::io::Result<fs::File> {
    fs::File::create(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const URL: &str = "https://go.dev/dl/";

    #[test]
    fn test_classify_success_codes() {
        assert!(classify_status(URL, 200, 1).is_ok());
        assert!(classify_status(URL, 204, 1).is_ok());
        assert!(classify_status(URL, 302, 1).is_ok());
    }

    #[test]
    fn test_classify_404_is_client_error() {
        assert!(matches!(
            classify_status(URL, 404, 1),
            Err(InstallerError::ClientError { status: 404, .. })
        ));
    }

    #[test]
    fn test_classify_5xx_is_server_error() {
        assert!(matches!(
            classify_status(URL, 503, 1),
            Err(InstallerError::ServerError { status: 503, .. })
        ));
    }

    #[test]
    fn test_classify_1xx_is_unknown_response() {
        assert!(matches!(
            classify_status(URL, 101, 1),
            Err(InstallerError::UnknownResponse { status: 101, .. })
        ));
        assert!(classify_status(URL, 600, 1).is_err());
    }

    #[test]
    fn test_classify_sentinel_connection_failure() {
        let err = classify_status(URL, 0, 1).unwrap_err();
        assert!(matches!(
            err,
            InstallerError::Network {
                failure: NetworkFailure::ConnectionNotEstablished,
                ..
            }
        ));
        assert!(err.to_string().contains("check your connection"));
    }

    #[test]
    fn test_classify_sentinel_incomplete_response() {
        assert!(matches!(
            classify_status(URL, 0, 3),
            Err(InstallerError::Network {
                failure: NetworkFailure::IncompleteResponse,
                ..
            })
        ));
    }

    #[test]
    fn test_ensure_https() {
        assert!(ensure_https("https://go.dev/VERSION?m=text").is_ok());
        assert!(ensure_https("HTTPS://go.dev/").is_ok());
        assert!(matches!(
            ensure_https("http://go.dev/"),
            Err(InstallerError::InsecureUrl { .. })
        ));
        assert!(ensure_https("ftp://go.dev/").is_err());
        assert!(ensure_https("go.dev").is_err());
    }

    #[test]
    fn test_plain_http_rejected_before_any_request() {
        let transport = HttpTransport::new("go-installer-test");
        // Port 9 (discard) would fail to connect; the scheme check fires first
        assert!(matches!(
            transport.probe("http://127.0.0.1:9/"),
            Err(InstallerError::InsecureUrl { .. })
        ));
        assert!(matches!(
            transport.fetch_text("http://127.0.0.1:9/"),
            Err(InstallerError::InsecureUrl { .. })
        ));
    }

    #[test]
    fn test_transport_error_kinds() {
        use ureq::ErrorKind;

        assert_eq!(network_failure(ErrorKind::InsecureRequestHttpsOnly), None);
        assert_eq!(
            network_failure(ErrorKind::Dns),
            Some(NetworkFailure::ConnectionNotEstablished)
        );
        assert_eq!(
            network_failure(ErrorKind::ConnectionFailed),
            Some(NetworkFailure::ConnectionNotEstablished)
        );
        assert_eq!(
            network_failure(ErrorKind::TooManyRedirects),
            Some(NetworkFailure::TooManyRedirects)
        );
        assert_eq!(
            network_failure(ErrorKind::BadStatus),
            Some(NetworkFailure::IncompleteResponse)
        );
    }

    #[test]
    fn test_refused_connection_is_not_established() {
        let transport = HttpTransport::new("go-installer-test");
        let err = transport.probe("https://127.0.0.1:9/").unwrap_err();

        assert!(matches!(
            err,
            InstallerError::Network {
                failure: NetworkFailure::ConnectionNotEstablished,
                ..
            }
        ));
        assert!(err.to_string().contains("check your connection"));
    }

    #[test]
    fn test_stream_to_file_writes_all_bytes() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("archive.tar.gz.tmp");
        let data = vec![7u8; 200_000];

        let written = stream_to_file(URL, data.as_slice(), &path).unwrap();
        assert_eq!(written, 200_000);
        assert_eq!(fs::read(&path).unwrap(), data);
    }

    #[cfg(unix)]
    #[test]
    fn test_stream_to_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let path = temp.path().join("archive.tmp");
        stream_to_file(URL, &b"abc"[..], &path).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
