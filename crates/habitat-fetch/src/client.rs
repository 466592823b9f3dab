//! Blocking HTTP client shared by the soil, climate and elevation pipelines.

use crate::{FetchError, Result};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::cookie::Jar;
use reqwest::header::{CONTENT_TYPE, LOCATION};
use reqwest::redirect::Policy;
use serde::de::DeserializeOwned;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Domains that may receive credentials after a cross-host redirect.
///
/// Earthdata data hosts bounce through `urs.earthdata.nasa.gov` for login.
pub const DEFAULT_AUTH_DOMAINS: &[&str] = &["earthdata.nasa.gov"];

/// Redirect hops followed for an authenticated request.
const MAX_REDIRECTS: usize = 10;

/// Callback for download progress messages.
pub type DownloadCallback = Box<dyn Fn(&str) + Send + Sync>;

/// Download statistics for the fetcher.
#[derive(Debug, Clone, Copy, Default)]
pub struct DownloadStats {
    /// Number of files downloaded this session.
    pub files_downloaded: usize,
    /// Total bytes downloaded this session.
    pub bytes_downloaded: u64,
}

/// Credentials attached to a request.
#[derive(Clone)]
pub enum Credentials {
    /// Bearer token.
    Token(String),
    /// Username and password.
    Basic {
        /// Account name.
        username: String,
        /// Account password.
        password: String,
    },
}

impl Credentials {
    fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            Credentials::Token(token) => request.bearer_auth(token),
            Credentials::Basic { username, password } => {
                request.basic_auth(username, Some(password))
            }
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::Token(_) => f.write_str("Credentials::Token(***)"),
            Credentials::Basic { username, .. } => f
                .debug_struct("Credentials::Basic")
                .field("username", username)
                .field("password", &"***")
                .finish(),
        }
    }
}

/// HTTP fetcher with one timeout for every request. No retries.
///
/// Both clients share one cookie jar, so a session cookie set during a login
/// redirect is sent on the hops that follow.
pub struct HttpFetcher {
    client: Client,
    /// Redirects disabled; authenticated requests follow them by hand.
    auth_client: Client,
    auth_domains: Vec<String>,
    timeout: Duration,
    callback: Option<DownloadCallback>,
    files_downloaded: AtomicUsize,
    bytes_downloaded: AtomicU64,
}

impl std::fmt::Debug for HttpFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpFetcher")
            .field("timeout", &self.timeout)
            .field("auth_domains", &self.auth_domains)
            .field("stats", &self.download_stats())
            .finish()
    }
}

impl HttpFetcher {
    /// Create a fetcher with the default timeout.
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Create a fetcher with a specific request timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let jar = Arc::new(Jar::default());
        let client = Client::builder()
            .timeout(timeout)
            .cookie_provider(Arc::clone(&jar))
            .build()?;
        let auth_client = Client::builder()
            .timeout(timeout)
            .cookie_provider(jar)
            .redirect(Policy::none())
            .build()?;

        Ok(Self {
            client,
            auth_client,
            auth_domains: DEFAULT_AUTH_DOMAINS.iter().map(|d| d.to_string()).collect(),
            timeout,
            callback: None,
            files_downloaded: AtomicUsize::new(0),
            bytes_downloaded: AtomicU64::new(0),
        })
    }

    /// Report each completed download through `callback`.
    pub fn with_callback(mut self, callback: DownloadCallback) -> Self {
        self.callback = Some(callback);
        self
    }

    /// Also send credentials to `domain` (and its subdomains) after a redirect.
    pub fn with_auth_domain(mut self, domain: &str) -> Self {
        self.auth_domains.push(domain.to_string());
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Get download statistics for this session.
    pub fn download_stats(&self) -> DownloadStats {
        DownloadStats {
            files_downloaded: self.files_downloaded.load(Ordering::Relaxed),
            bytes_downloaded: self.bytes_downloaded.load(Ordering::Relaxed),
        }
    }

    /// Reset download statistics.
    pub fn reset_download_stats(&self) {
        self.files_downloaded.store(0, Ordering::Relaxed);
        self.bytes_downloaded.store(0, Ordering::Relaxed);
    }

    /// GET a URL and return the body.
    pub fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        self.fetch(url, None)
    }

    /// GET a JSON document with query parameters.
    pub fn get_json<T: DeserializeOwned>(&self, url: &str, query: &[(&str, String)]) -> Result<T> {
        debug!("Querying {} {:?}", url, query);
        let response = self.client.get(url).query(query).send()?;
        let response = check_status(response, url)?;
        Ok(response.json()?)
    }

    /// Download a zip archive into `path`, returning the number of bytes
    /// written.
    ///
    /// The body must start with the zip signature. Anything else, typically
    /// a login page, is rejected before the file is created.
    pub fn download_archive(
        &self,
        url: &str,
        path: &Path,
        credentials: Option<&Credentials>,
    ) -> Result<u64> {
        let bytes = self.fetch(url, credentials)?;
        if !is_zip(&bytes) {
            return Err(FetchError::UnexpectedContent {
                url: url.to_string(),
                reason: "body is not a zip archive".to_string(),
            });
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = fs::File::create(path)?;
        file.write_all(&bytes)?;

        Ok(bytes.len() as u64)
    }

    fn fetch(&self, url: &str, credentials: Option<&Credentials>) -> Result<Vec<u8>> {
        let response = match credentials {
            Some(credentials) => self.send_authenticated(url, credentials)?,
            None => self.client.get(url).send()?,
        };
        let response = check_status(response, url)?;

        if credentials.is_some() && is_html(&response) {
            return Err(FetchError::UnexpectedContent {
                url: url.to_string(),
                reason: "HTML page instead of data (login failed?)".to_string(),
            });
        }
        let bytes = response.bytes()?;

        // Update download statistics
        self.files_downloaded.fetch_add(1, Ordering::Relaxed);
        self.bytes_downloaded
            .fetch_add(bytes.len() as u64, Ordering::Relaxed);

        if let Some(cb) = &self.callback {
            cb(&format!("Downloaded {} ({} bytes)", url, bytes.len()));
        }

        Ok(bytes.to_vec())
    }

    /// Follow redirects by hand so credentials reach the login host.
    ///
    /// Credentials go to the original host and to [`Self::with_auth_domain`]
    /// domains only.
    fn send_authenticated(&self, url: &str, credentials: &Credentials) -> Result<Response> {
        let origin = Url::parse(url)?;
        let mut current = origin.clone();

        for _ in 0..=MAX_REDIRECTS {
            let mut request = self.auth_client.get(current.clone());
            if self.may_authenticate(&origin, &current) {
                request = credentials.apply(request);
            } else {
                debug!("Not sending credentials to {}", current);
            }

            let response = request.send()?;
            if !response.status().is_redirection() {
                return Ok(response);
            }
            let location = response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .ok_or_else(|| FetchError::UnexpectedContent {
                    url: current.to_string(),
                    reason: format!("HTTP {} without a Location header", response.status()),
                })?;
            let next = current.join(location)?;
            debug!("{} redirected to {}", current, next);
            current = next;
        }

        Err(FetchError::UnexpectedContent {
            url: url.to_string(),
            reason: format!("more than {} redirects", MAX_REDIRECTS),
        })
    }

    fn may_authenticate(&self, origin: &Url, target: &Url) -> bool {
        let Some(host) = target.host_str() else {
            return false;
        };
        origin.host_str() == Some(host)
            || self
                .auth_domains
                .iter()
                .any(|d| host == d || host.ends_with(&format!(".{}", d)))
    }
}

/// Zip local-file or empty-archive signature.
pub(crate) fn is_zip(bytes: &[u8]) -> bool {
    bytes.starts_with(b"PK\x03\x04") || bytes.starts_with(b"PK\x05\x06")
}

fn is_html(response: &Response) -> bool {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.trim_start().starts_with("text/html"))
}

fn check_status(response: Response, url: &str) -> Result<Response> {
    if !response.status().is_success() {
        return Err(FetchError::HttpStatus {
            url: url.to_string(),
            status: response.status(),
        });
    }
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timeout() {
        let fetcher = HttpFetcher::new().unwrap();
        assert_eq!(fetcher.timeout(), Duration::from_secs(120));
        let stats = fetcher.download_stats();
        assert_eq!(stats.files_downloaded, 0);
        assert_eq!(stats.bytes_downloaded, 0);
    }

    #[test]
    fn test_auth_domains() {
        let fetcher = HttpFetcher::new().unwrap().with_auth_domain("localhost");
        let origin = Url::parse("https://e4ftl01.cr.usgs.gov/SRTMGL1.003/a.zip").unwrap();
        let allowed = |target: &str| fetcher.may_authenticate(&origin, &Url::parse(target).unwrap());

        assert!(allowed("https://e4ftl01.cr.usgs.gov/login?code=1"));
        assert!(allowed("https://urs.earthdata.nasa.gov/oauth/authorize"));
        assert!(allowed("http://localhost:8080/oauth"));
        assert!(!allowed("https://evil-earthdata.nasa.gov.example.com/"));
        assert!(!allowed("https://example.com/"));
    }

    #[test]
    fn test_zip_signature() {
        assert!(is_zip(b"PK\x03\x04rest"));
        assert!(is_zip(b"PK\x05\x06"));
        assert!(!is_zip(b"<html>login</html>"));
        assert!(!is_zip(b""));
    }

    #[test]
    fn test_credentials_debug_hides_secrets() {
        let token = Credentials::Token("abc123".to_string());
        assert!(!format!("{:?}", token).contains("abc123"));

        let basic = Credentials::Basic {
            username: "ranger".to_string(),
            password: "hunter2".to_string(),
        };
        let shown = format!("{:?}", basic);
        assert!(shown.contains("ranger"));
        assert!(!shown.contains("hunter2"));
    }
}
