use crate::error::{Error, Result};
use crate::github::Context;
use crate::github::api::{ListOptions, Page, Release, ReleaseApi, ReleaseAsset};
use crate::github::context::RequestContext;
use crate::oci::DigestResolver;
use std::collections::HashMap;
use std::io::Write;
use std::sync::Mutex;

pub fn release(id: i64, tag: &str) -> Release {
    Release {
        id,
        tag_name: tag.to_string(),
        name: Some(tag.to_string()),
        assets: Vec::new(),
    }
}

pub fn asset(id: i64, name: &str) -> ReleaseAsset {
    ReleaseAsset {
        id,
        name: name.to_string(),
        content_type: Some("application/octet-stream".to_string()),
        size: 0,
        browser_download_url: None,
    }
}

/// A `${github}` context as seen on a tag push of this project.
pub fn github_context() -> Context {
    Context {
        action: "__philips-labs_slsa-provenance-action".to_string(),
        actor: "marcofranssen".to_string(),
        event_name: "push".to_string(),
        git_ref: "refs/tags/v0.1.0".to_string(),
        repository: "philips-labs/slsa-provenance-action".to_string(),
        repository_owner: "philips-labs".to_string(),
        run_id: "1029384756".to_string(),
        run_number: "42".to_string(),
        sha: "849fb987efc0c0fc72e26a38f63f0c00225132be".to_string(),
        workflow: "Integration test file provenance".to_string(),
        ..Default::default()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Upload {
    pub release_id: i64,
    pub name: String,
    pub media_type: String,
    pub content: Vec<u8>,
}

/// In-memory release service. Pages are 1-based; page 0 means the first page.
#[derive(Default)]
pub struct FakeReleaseApi {
    releases: Vec<Release>,
    assets: HashMap<i64, Vec<ReleaseAsset>>,
    contents: HashMap<i64, Vec<u8>>,
    failing_downloads: Vec<i64>,
    failing_writes: Vec<i64>,
    fail_listing: bool,
    cancel_after: Option<(usize, RequestContext)>,
    list_release_calls: Mutex<usize>,
    list_asset_calls: Mutex<usize>,
    uploads: Mutex<Vec<Upload>>,
}

impl FakeReleaseApi {
    pub fn new(releases: Vec<Release>) -> Self {
        Self {
            releases,
            ..Default::default()
        }
    }

    pub fn with_assets(mut self, release_id: i64, assets: Vec<ReleaseAsset>) -> Self {
        self.assets.insert(release_id, assets);
        self
    }

    pub fn with_content(mut self, asset_id: i64, content: &[u8]) -> Self {
        self.contents.insert(asset_id, content.to_vec());
        self
    }

    pub fn fail_download(mut self, asset_id: i64) -> Self {
        self.failing_downloads.push(asset_id);
        self
    }

    /// Fails the write of `asset_id` into its destination, as a full disk would.
    pub fn fail_write(mut self, asset_id: i64) -> Self {
        self.failing_writes.push(asset_id);
        self
    }

    pub fn fail_listing(mut self) -> Self {
        self.fail_listing = true;
        self
    }

    /// Cancels `ctx` once `calls` release pages have been served.
    pub fn cancel_after_list_calls(mut self, calls: usize, ctx: RequestContext) -> Self {
        self.cancel_after = Some((calls, ctx));
        self
    }

    pub fn list_release_calls(&self) -> usize {
        *self.list_release_calls.lock().unwrap()
    }

    pub fn list_asset_calls(&self) -> usize {
        *self.list_asset_calls.lock().unwrap()
    }

    pub fn uploads(&self) -> Vec<Upload> {
        self.uploads.lock().unwrap().clone()
    }
}

fn page_of<T: Clone>(items: &[T], opts: &ListOptions) -> Page<T> {
    let per_page = opts.per_page.max(1) as usize;
    let page = opts.page.max(1) as usize;
    let start = ((page - 1) * per_page).min(items.len());
    let end = (start + per_page).min(items.len());

    Page {
        items: items[start..end].to_vec(),
        next_page: (end < items.len()).then(|| page as u32 + 1),
    }
}

impl ReleaseApi for FakeReleaseApi {
    fn list_releases(
        &self,
        _ctx: &RequestContext,
        _owner: &str,
        _repo: &str,
        opts: &ListOptions,
    ) -> Result<Page<Release>> {
        let mut calls = self.list_release_calls.lock().unwrap();
        *calls += 1;

        if self.fail_listing {
            return Err(Error::Transport("502 Bad Gateway".to_string()));
        }
        if let Some((after, ctx)) = &self.cancel_after {
            if *calls >= *after {
                ctx.cancel();
            }
        }

        Ok(page_of(&self.releases, opts))
    }

    fn list_release_assets(
        &self,
        _ctx: &RequestContext,
        _owner: &str,
        _repo: &str,
        release_id: i64,
        opts: &ListOptions,
    ) -> Result<Page<ReleaseAsset>> {
        *self.list_asset_calls.lock().unwrap() += 1;

        if self.fail_listing {
            return Err(Error::Transport("502 Bad Gateway".to_string()));
        }

        let assets = self.assets.get(&release_id).cloned().unwrap_or_default();
        Ok(page_of(&assets, opts))
    }

    fn download_release_asset(
        &self,
        _ctx: &RequestContext,
        _owner: &str,
        _repo: &str,
        asset_id: i64,
        dest: &mut dyn Write,
    ) -> Result<u64> {
        if self.failing_downloads.contains(&asset_id) {
            return Err(Error::Transport(format!("asset {asset_id}: 500 Internal Server Error")));
        }

        let content = self
            .contents
            .get(&asset_id)
            .ok_or_else(|| Error::Transport(format!("asset {asset_id}: 404 Not Found")))?;
        if self.failing_writes.contains(&asset_id) {
            return Err(Error::Io(std::io::Error::other("no space left on device")));
        }
        dest.write_all(content)?;
        Ok(content.len() as u64)
    }

    fn upload_release_asset(
        &self,
        _ctx: &RequestContext,
        _owner: &str,
        _repo: &str,
        release_id: i64,
        name: &str,
        media_type: &str,
        content: Vec<u8>,
    ) -> Result<ReleaseAsset> {
        let mut uploads = self.uploads.lock().unwrap();
        uploads.push(Upload {
            release_id,
            name: name.to_string(),
            media_type: media_type.to_string(),
            content,
        });

        Ok(asset(1000 + uploads.len() as i64, name))
    }
}

/// Resolves references from a fixed table.
#[derive(Default)]
pub struct FakeDigestResolver {
    digests: HashMap<String, String>,
}

impl FakeDigestResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, reference: &str, digest: &str) -> Self {
        self.digests.insert(reference.to_string(), digest.to_string());
        self
    }
}

impl DigestResolver for FakeDigestResolver {
    fn digest(&self, reference: &str) -> Result<String> {
        self.digests
            .get(reference)
            .cloned()
            .ok_or_else(|| Error::Registry(format!("{reference}: MANIFEST_UNKNOWN")))
    }
}
