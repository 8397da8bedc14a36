use crate::config::ReleaseClientConfig;
use crate::error::{Error, Result};
use crate::github::api::{ListOptions, Page, Release, ReleaseApi, ReleaseAsset};
use crate::github::context::RequestContext;

use log::{debug, info};
use std::fs::{self, File};
use std::path::Path;

/// Media type used when attaching provenance to a release.
pub const PROVENANCE_MEDIA_TYPE: &str = "application/json; charset=utf-8";

/// Release operations on top of a [`ReleaseApi`]: pagination, lookup by tag,
/// asset download and upload. Every remote call runs under its own deadline
/// derived from the caller's context.
pub struct ReleaseClient<A> {
    api: A,
    config: ReleaseClientConfig,
}

impl<A: ReleaseApi> ReleaseClient<A> {
    pub fn new(api: A, config: ReleaseClientConfig) -> Self {
        Self { api, config }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn config(&self) -> &ReleaseClientConfig {
        &self.config
    }

    /// Retrieves every release, following pages until none remain.
    pub fn list_releases(
        &self,
        ctx: &RequestContext,
        owner: &str,
        repo: &str,
        opts: ListOptions,
    ) -> Result<Vec<Release>> {
        paginate(
            ctx,
            opts,
            |opts| self.api.list_releases(ctx, owner, repo, opts),
            |_| false,
        )
        .map_err(|e| wrap("failed to list releases", e))
    }

    /// Retrieves every asset of a release, following pages until none remain.
    pub fn list_release_assets(
        &self,
        ctx: &RequestContext,
        owner: &str,
        repo: &str,
        release_id: i64,
        opts: ListOptions,
    ) -> Result<Vec<ReleaseAsset>> {
        paginate(
            ctx,
            opts,
            |opts| {
                self.api
                    .list_release_assets(ctx, owner, repo, release_id, opts)
            },
            |_| false,
        )
        .map_err(|e| wrap("failed to list release assets", e))
    }

    /// Finds the release tagged `tag_name`, stopping at the first page that has it.
    ///
    /// Returns `Ok(None)` when no release carries the tag.
    pub fn fetch_release(
        &self,
        ctx: &RequestContext,
        owner: &str,
        repo: &str,
        tag_name: &str,
    ) -> Result<Option<Release>> {
        let list_ctx = ctx.with_timeout(self.config.list_timeout);
        let releases = paginate(
            &list_ctx,
            ListOptions::per_page(self.config.releases_per_page),
            |opts| self.api.list_releases(&list_ctx, owner, repo, opts),
            |page| page.iter().any(|r| r.tag_name == tag_name),
        )
        .map_err(|e| wrap("failed to list releases", e))?;

        Ok(releases.into_iter().find(|r| r.tag_name == tag_name))
    }

    /// Downloads every asset of a release into `dest`, creating it if needed.
    ///
    /// The first failing asset aborts the run. Files already written stay on disk.
    pub fn download_release_assets(
        &self,
        ctx: &RequestContext,
        owner: &str,
        repo: &str,
        release_id: i64,
        dest: &Path,
    ) -> Result<Vec<ReleaseAsset>> {
        let list_ctx = ctx.with_timeout(self.config.list_timeout);
        let assets = self.list_release_assets(
            &list_ctx,
            owner,
            repo,
            release_id,
            ListOptions::per_page(self.config.assets_per_page),
        )?;

        fs::create_dir_all(dest).map_err(|e| Error::file_io("failed to create", dest, e))?;

        for asset in &assets {
            let path = asset_path(dest, &asset.name)?;
            let mut file =
                File::create(&path).map_err(|e| Error::file_io("failed to create", &path, e))?;

            let download_ctx = ctx.with_timeout(self.config.download_timeout);
            let written = self
                .api
                .download_release_asset(&download_ctx, owner, repo, asset.id, &mut file)
                .map_err(|e| match e {
                    Error::Io(source) => Error::file_io("failed to write", &path, source),
                    other => other,
                })?;
            info!("downloaded {} ({written} bytes)", path.display());
        }

        Ok(assets)
    }

    /// Uploads `file` to the release under its base name.
    pub fn upload_release_asset(
        &self,
        ctx: &RequestContext,
        owner: &str,
        repo: &str,
        release_id: i64,
        file: &Path,
    ) -> Result<ReleaseAsset> {
        let name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| Error::Validation(format!("{} has no file name", file.display())))?;
        let content = fs::read(file).map_err(|e| Error::file_io("failed to read", file, e))?;

        let upload_ctx = ctx.with_timeout(self.config.upload_timeout);
        let asset = self.api.upload_release_asset(
            &upload_ctx,
            owner,
            repo,
            release_id,
            &name,
            PROVENANCE_MEDIA_TYPE,
            content,
        )?;
        info!("uploaded {name} to release {release_id} as asset {}", asset.id);

        Ok(asset)
    }
}

/// Requests pages in order until the backend reports no next page or `done`
/// returns true for the latest page. The context is checked before every request.
fn paginate<T>(
    ctx: &RequestContext,
    mut opts: ListOptions,
    mut fetch: impl FnMut(&ListOptions) -> Result<Page<T>>,
    mut done: impl FnMut(&[T]) -> bool,
) -> Result<Vec<T>> {
    let mut all = Vec::new();

    loop {
        ctx.check()?;
        debug!("requesting page {} (per_page={})", opts.page, opts.per_page);

        let page = fetch(&opts)?;
        let stop = done(&page.items);
        all.extend(page.items);

        match page.next_page {
            Some(next) if !stop => opts.page = next,
            _ => break,
        }
    }

    Ok(all)
}

fn wrap(context: &str, err: Error) -> Error {
    match err {
        Error::Transport(msg) => Error::Transport(format!("{context}: {msg}")),
        other => other,
    }
}

fn asset_path(dest: &Path, name: &str) -> Result<std::path::PathBuf> {
    let candidate = Path::new(name);
    match candidate.file_name() {
        Some(file_name) if file_name == candidate.as_os_str() => Ok(dest.join(file_name)),
        _ => Err(Error::Validation(format!("invalid release asset name: {name}"))),
    }
}

/// Fails unless `path` is a directory with no entries.
pub fn ensure_empty_directory(path: &Path) -> Result<()> {
    let mut entries =
        fs::read_dir(path).map_err(|e| Error::file_io("failed to read directory", path, e))?;

    if entries.next().is_some() {
        return Err(Error::Validation(format!(
            "artifact path {} must be an empty directory",
            path.display()
        )));
    }

    Ok(())
}
