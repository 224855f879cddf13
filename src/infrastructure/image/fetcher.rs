//! HTTP image fetcher used on a full cache miss.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use tracing::{debug, warn};

use crate::domain::errors::{CacheError, CacheResult};
use crate::domain::ports::ImageFetcherPort;

/// Default connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default read timeout.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(10);

const USER_AGENT: &str = concat!("webimage/", env!("CARGO_PKG_VERSION"));

/// Transport-security overrides for the fetcher.
#[derive(Debug, Clone, Default)]
pub struct TlsConfig {
    /// PEM files with extra trusted root certificates.
    pub root_certificates: Vec<PathBuf>,
    /// Skip certificate verification entirely. Only for testing.
    pub accept_invalid_certs: bool,
}

/// Configuration for [`HttpImageFetcher`].
#[derive(Debug, Clone)]
pub struct HttpFetcherConfig {
    /// Time allowed to establish a connection.
    pub connect_timeout: Duration,
    /// Time allowed between reads of the response.
    pub read_timeout: Duration,
    /// TLS overrides.
    pub tls: TlsConfig,
    /// Honour `HTTP_PROXY`/`HTTPS_PROXY` from the environment.
    pub use_system_proxy: bool,
}

impl Default for HttpFetcherConfig {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            tls: TlsConfig::default(),
            use_system_proxy: true,
        }
    }
}

/// Downloads and decodes images over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpImageFetcher {
    client: Client,
}

impl HttpImageFetcher {
    /// Creates a fetcher with the given configuration.
    ///
    /// # Errors
    /// Returns error if a certificate cannot be loaded or the HTTP client
    /// cannot be built.
    pub fn new(config: &HttpFetcherConfig) -> CacheResult<Self> {
        let mut builder = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.read_timeout);

        for path in &config.tls.root_certificates {
            let pem = std::fs::read(path).map_err(|e| {
                CacheError::io(format!("failed to read certificate {}: {e}", path.display()))
            })?;
            let cert = reqwest::Certificate::from_pem(&pem).map_err(|e| {
                CacheError::fetch(format!("invalid certificate {}: {e}", path.display()))
            })?;
            builder = builder.add_root_certificate(cert);
        }

        if !config.use_system_proxy {
            builder = builder.no_proxy();
        }

        if config.tls.accept_invalid_certs {
            warn!("TLS certificate verification disabled");
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder
            .build()
            .map_err(|e| CacheError::fetch(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { client })
    }

    /// Creates a fetcher with default timeouts and TLS settings.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built.
    pub fn with_defaults() -> CacheResult<Self> {
        Self::new(&HttpFetcherConfig::default())
    }
}

#[async_trait]
impl ImageFetcherPort for HttpImageFetcher {
    async fn fetch(&self, identifier: &str) -> CacheResult<image::DynamicImage> {
        let url = Url::parse(identifier)
            .map_err(|e| CacheError::fetch(format!("invalid URL {identifier:?}: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(CacheError::fetch(format!(
                "unsupported scheme {:?}",
                url.scheme()
            )));
        }

        debug!(url = %url, "Downloading image from network");

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                CacheError::fetch("request timed out")
            } else if e.is_connect() {
                CacheError::fetch(format!("failed to connect: {e}"))
            } else {
                CacheError::fetch(format!("request failed: {e}"))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(CacheError::fetch(format!(
                "HTTP {}: {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| CacheError::fetch(format!("failed to read body: {e}")))?;

        tokio::task::spawn_blocking(move || image::load_from_memory(&bytes))
            .await
            .map_err(|e| CacheError::decode(format!("decode task panicked: {e}")))?
            .map_err(|e| CacheError::decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serves a single canned HTTP response and returns the URL to hit.
    async fn serve_once(status_line: &'static str, body: Vec<u8>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];
            while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
            }
            let head = format!(
                "{status_line}\r\nContent-Type: image/png\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            socket.write_all(head.as_bytes()).await.unwrap();
            socket.write_all(&body).await.unwrap();
            socket.shutdown().await.unwrap();
        });

        format!("http://{addr}/a.png")
    }

    fn local_fetcher() -> HttpImageFetcher {
        HttpImageFetcher::new(&HttpFetcherConfig {
            use_system_proxy: false,
            ..HttpFetcherConfig::default()
        })
        .unwrap()
    }

    fn png_bytes(img: &image::DynamicImage) -> Vec<u8> {
        let mut cursor = std::io::Cursor::new(Vec::new());
        img.write_to(&mut cursor, image::ImageFormat::Png).unwrap();
        cursor.into_inner()
    }

    #[tokio::test]
    async fn test_fetch_decodes_png() {
        let img = image::DynamicImage::new_rgba8(5, 3);
        let url = serve_once("HTTP/1.1 200 OK", png_bytes(&img)).await;

        let fetcher = local_fetcher();
        let fetched = fetcher.fetch(&url).await.unwrap();

        assert_eq!(fetched, img);
    }

    #[tokio::test]
    async fn test_fetch_rejects_error_status() {
        let url = serve_once("HTTP/1.1 404 Not Found", Vec::new()).await;

        let fetcher = local_fetcher();
        let err = fetcher.fetch(&url).await.unwrap_err();

        assert!(matches!(err, CacheError::Fetch { .. }));
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn test_fetch_reports_undecodable_body() {
        let url = serve_once("HTTP/1.1 200 OK", b"definitely not a png".to_vec()).await;

        let fetcher = local_fetcher();
        let err = fetcher.fetch(&url).await.unwrap_err();

        assert!(matches!(err, CacheError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_fetch_rejects_invalid_url() {
        let fetcher = HttpImageFetcher::with_defaults().unwrap();

        assert!(matches!(
            fetcher.fetch("not a url").await,
            Err(CacheError::Fetch { .. })
        ));
        assert!(matches!(
            fetcher.fetch("file:///etc/passwd").await,
            Err(CacheError::Fetch { .. })
        ));
    }

    #[test]
    fn test_missing_certificate_file() {
        let config = HttpFetcherConfig {
            tls: TlsConfig {
                root_certificates: vec![PathBuf::from("/nonexistent/ca.pem")],
                accept_invalid_certs: false,
            },
            ..HttpFetcherConfig::default()
        };

        assert!(matches!(
            HttpImageFetcher::new(&config),
            Err(CacheError::Io { .. })
        ));
    }

    #[test]
    fn test_default_timeouts() {
        let config = HttpFetcherConfig::default();
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.read_timeout, Duration::from_secs(10));
    }
}
