//! Release service transport.
//!
//! [`ReleaseApi`] is the single-request surface the [`ReleaseClient`](super::releases::ReleaseClient)
//! builds pagination, downloads and uploads on. [`GitHubApi`] implements it
//! against the GitHub REST API with a blocking reqwest client.

use crate::config::ReleaseClientConfig;
use crate::error::{Error, Result};
use crate::github::context::RequestContext;

use log::debug;
use reqwest::Url;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{ACCEPT, CONTENT_TYPE, LINK};
use serde::{Deserialize, Serialize};
use std::io::{ErrorKind, Read, Write};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub id: i64,
    pub tag_name: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseAsset {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub browser_download_url: Option<String>,
}

/// Page selection for list calls. `page == 0` requests the first page.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ListOptions {
    pub page: u32,
    pub per_page: u32,
}

impl ListOptions {
    pub fn per_page(per_page: u32) -> Self {
        Self { page: 0, per_page }
    }
}

/// One page of results and the number of the page after it, if any.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_page: Option<u32>,
}

pub trait ReleaseApi {
    fn list_releases(
        &self,
        ctx: &RequestContext,
        owner: &str,
        repo: &str,
        opts: &ListOptions,
    ) -> Result<Page<Release>>;

    fn list_release_assets(
        &self,
        ctx: &RequestContext,
        owner: &str,
        repo: &str,
        release_id: i64,
        opts: &ListOptions,
    ) -> Result<Page<ReleaseAsset>>;

    /// Streams the asset's binary content into `dest`, returning the byte count.
    fn download_release_asset(
        &self,
        ctx: &RequestContext,
        owner: &str,
        repo: &str,
        asset_id: i64,
        dest: &mut dyn Write,
    ) -> Result<u64>;

    #[allow(clippy::too_many_arguments)]
    fn upload_release_asset(
        &self,
        ctx: &RequestContext,
        owner: &str,
        repo: &str,
        release_id: i64,
        name: &str,
        media_type: &str,
        content: Vec<u8>,
    ) -> Result<ReleaseAsset>;
}

/// GitHub REST implementation of [`ReleaseApi`].
pub struct GitHubApi {
    client: Client,
    api_url: String,
    uploads_url: String,
    token: Option<String>,
}

impl GitHubApi {
    pub fn new(token: Option<String>, config: &ReleaseClientConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            uploads_url: config.uploads_url.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()),
        })
    }

    fn get(&self, ctx: &RequestContext, url: &str, accept: &str) -> Result<RequestBuilder> {
        ctx.check()?;
        debug!("GET: {url}");

        Ok(self.authorize(ctx, self.client.get(url).header(ACCEPT, accept)))
    }

    fn authorize(&self, ctx: &RequestContext, mut request: RequestBuilder) -> RequestBuilder {
        request = request.header("X-GitHub-Api-Version", "2022-11-28");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        if let Some(left) = ctx.remaining() {
            request = request.timeout(left);
        }
        request
    }

    fn list_page<T: for<'de> Deserialize<'de>>(
        &self,
        ctx: &RequestContext,
        url: &str,
        opts: &ListOptions,
    ) -> Result<Page<T>> {
        let mut query = vec![("per_page", opts.per_page)];
        if opts.page > 0 {
            query.push(("page", opts.page));
        }

        let response = send(
            self.get(ctx, url, "application/vnd.github+json")?
                .query(&query),
        )?;
        let next_page = response
            .headers()
            .get(LINK)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_next_page);

        let items = response
            .json()
            .map_err(|e| Error::Transport(format!("failed to decode response from {url}: {e}")))?;

        Ok(Page { items, next_page })
    }
}

impl ReleaseApi for GitHubApi {
    fn list_releases(
        &self,
        ctx: &RequestContext,
        owner: &str,
        repo: &str,
        opts: &ListOptions,
    ) -> Result<Page<Release>> {
        let url = format!("{}/repos/{owner}/{repo}/releases", self.api_url);
        self.list_page(ctx, &url, opts)
    }

    fn list_release_assets(
        &self,
        ctx: &RequestContext,
        owner: &str,
        repo: &str,
        release_id: i64,
        opts: &ListOptions,
    ) -> Result<Page<ReleaseAsset>> {
        let url = format!(
            "{}/repos/{owner}/{repo}/releases/{release_id}/assets",
            self.api_url
        );
        self.list_page(ctx, &url, opts)
    }

    fn download_release_asset(
        &self,
        ctx: &RequestContext,
        owner: &str,
        repo: &str,
        asset_id: i64,
        dest: &mut dyn Write,
    ) -> Result<u64> {
        let url = format!(
            "{}/repos/{owner}/{repo}/releases/assets/{asset_id}",
            self.api_url
        );

        // The API answers with a redirect to the storage backend, which reqwest follows.
        let mut response = send(self.get(ctx, &url, "application/octet-stream")?)?;
        copy_body(&mut response, dest, asset_id)
    }

    fn upload_release_asset(
        &self,
        ctx: &RequestContext,
        owner: &str,
        repo: &str,
        release_id: i64,
        name: &str,
        media_type: &str,
        content: Vec<u8>,
    ) -> Result<ReleaseAsset> {
        ctx.check()?;
        let url = Url::parse_with_params(
            &format!(
                "{}/repos/{owner}/{repo}/releases/{release_id}/assets",
                self.uploads_url
            ),
            &[("name", name)],
        )
        .map_err(|e| Error::Transport(format!("invalid upload URL: {e}")))?;
        debug!("POST: {url}");

        let request = self
            .client
            .post(url.clone())
            .header(ACCEPT, "application/vnd.github+json")
            .header(CONTENT_TYPE, media_type)
            .body(content);

        send(self.authorize(ctx, request))?
            .json()
            .map_err(|e| Error::Transport(format!("failed to decode response from {url}: {e}")))
    }
}

/// Streams a response body into `dest`. Read failures are reported against
/// the asset, write failures come back as [`Error::Io`] for the caller to
/// attach its path to.
fn copy_body(body: &mut impl Read, dest: &mut dyn Write, asset_id: i64) -> Result<u64> {
    let mut buf = [0u8; 8192];
    let mut written = 0u64;
    loop {
        let n = match body.read(&mut buf) {
            Ok(0) => return Ok(written),
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) if is_timeout(&e) => {
                return Err(Error::Timeout(format!("downloading asset {asset_id}: {e}")));
            }
            Err(e) => {
                return Err(Error::Transport(format!("downloading asset {asset_id}: {e}")));
            }
        };
        dest.write_all(&buf[..n])?;
        written += n as u64;
    }
}

fn is_timeout(e: &std::io::Error) -> bool {
    e.kind() == ErrorKind::TimedOut
        || e.get_ref()
            .and_then(|inner| inner.downcast_ref::<reqwest::Error>())
            .is_some_and(reqwest::Error::is_timeout)
}

fn send(request: RequestBuilder) -> Result<Response> {
    let response = request.send().map_err(|e| {
        if e.is_timeout() {
            Error::Timeout(e.to_string())
        } else {
            Error::Transport(e.to_string())
        }
    })?;

    let status = response.status();
    if !status.is_success() {
        let url = response.url().clone();
        let body = response.text().unwrap_or_default();
        return Err(Error::Transport(format!("{url}: {status} {body}")));
    }

    Ok(response)
}

/// Extracts the `page` query parameter of the `rel="next"` entry of a Link header.
pub fn parse_next_page(link: &str) -> Option<u32> {
    link.split(',').find_map(|entry| {
        let (target, params) = entry.split_once(';')?;
        if !params.split(';').any(|p| p.trim() == r#"rel="next""#) {
            return None;
        }

        let target = target.trim().trim_start_matches('<').trim_end_matches('>');
        let url = Url::parse(target).ok()?;
        url.query_pairs()
            .find(|(key, _)| key == "page")
            .and_then(|(_, value)| value.parse().ok())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_next_page() {
        let link = r#"<https://api.github.com/repositories/1/releases?per_page=25&page=2>; rel="next", <https://api.github.com/repositories/1/releases?per_page=25&page=4>; rel="last""#;
        assert_eq!(parse_next_page(link), Some(2));
    }

    #[test]
    fn test_parse_next_page_last_page() {
        let link = r#"<https://api.github.com/repositories/1/releases?page=1>; rel="first", <https://api.github.com/repositories/1/releases?page=3>; rel="prev""#;
        assert_eq!(parse_next_page(link), None);
        assert_eq!(parse_next_page(""), None);
    }

    #[test]
    fn test_release_decodes_github_payload() {
        let json = r#"{
            "id": 51517953,
            "tag_name": "v0.1.1",
            "name": "v0.1.1",
            "draft": false,
            "assets": [
                {"id": 1, "name": "checksums.txt", "content_type": "text/plain", "size": 10, "uploader": {"login": "bot"}}
            ]
        }"#;

        let release: Release = serde_json::from_str(json).unwrap();
        assert_eq!(release.id, 51517953);
        assert_eq!(release.tag_name, "v0.1.1");
        assert_eq!(release.assets[0].name, "checksums.txt");
    }

    #[test]
    fn test_new_strips_trailing_slash_and_empty_token() {
        let config = ReleaseClientConfig {
            api_url: "http://localhost:8080/".to_string(),
            ..Default::default()
        };
        let api = GitHubApi::new(Some(String::new()), &config).unwrap();

        assert_eq!(api.api_url, "http://localhost:8080");
        assert!(api.token.is_none());
    }

    struct StalledBody {
        sent: bool,
    }

    impl Read for StalledBody {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.sent {
                return Err(std::io::Error::new(ErrorKind::TimedOut, "operation timed out"));
            }
            self.sent = true;
            buf[..4].copy_from_slice(b"part");
            Ok(4)
        }
    }

    struct FullDisk;

    impl Write for FullDisk {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("no space left on device"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_copy_body() {
        let mut dest = Vec::new();
        let written = copy_body(&mut &b"asset bytes"[..], &mut dest, 7).unwrap();

        assert_eq!(written, 11);
        assert_eq!(dest, b"asset bytes");
    }

    #[test]
    fn test_copy_body_read_timeout() {
        let mut dest = Vec::new();

        match copy_body(&mut StalledBody { sent: false }, &mut dest, 7) {
            Err(Error::Timeout(msg)) => assert!(msg.contains("asset 7")),
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(dest, b"part");
    }

    #[test]
    fn test_copy_body_write_failure_is_io() {
        let result = copy_body(&mut &b"asset bytes"[..], &mut FullDisk, 7);
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_cancelled_context_issues_no_request() {
        let api = GitHubApi::new(None, &ReleaseClientConfig::default()).unwrap();
        let ctx = RequestContext::background();
        ctx.cancel();

        let result = api.list_releases(&ctx, "org", "repo", &ListOptions::per_page(25));
        assert!(matches!(result, Err(Error::Cancelled)));
    }
}
