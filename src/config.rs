use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const DEFAULT_UPLOADS_URL: &str = "https://uploads.github.com";
/// Per-request timeout when resolving container image digests.
pub const DEFAULT_REGISTRY_TIMEOUT: Duration = Duration::from_secs(60);

/// Tunables for talking to the release service.
///
/// # Examples
///
/// ```
/// use slsa_provenance::config::ReleaseClientConfig;
/// use std::time::Duration;
///
/// let config = ReleaseClientConfig::default();
/// assert_eq!(config.releases_per_page, 25);
/// assert_eq!(config.download_timeout, Duration::from_secs(120));
/// ```
#[derive(Debug, Clone)]
pub struct ReleaseClientConfig {
    pub api_url: String,
    pub uploads_url: String,
    pub releases_per_page: u32,
    pub assets_per_page: u32,
    /// Deadline for one complete listing, covering every page.
    pub list_timeout: Duration,
    pub download_timeout: Duration,
    pub upload_timeout: Duration,
}

impl Default for ReleaseClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            uploads_url: DEFAULT_UPLOADS_URL.to_string(),
            releases_per_page: 25,
            assets_per_page: 10,
            list_timeout: Duration::from_secs(60),
            download_timeout: Duration::from_secs(120),
            upload_timeout: Duration::from_secs(120),
        }
    }
}
