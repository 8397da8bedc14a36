use crate::error::{Error, Result};
use crate::github::api::ReleaseApi;
use crate::github::context::RequestContext;
use crate::github::releases::{ReleaseClient, ensure_empty_directory};
use crate::github::{
    AnyEvent, BUILD_TYPE, Context, RunnerContext, builder_id, repository_name, repository_uri,
};
use crate::in_toto::{DigestSet, Item, Statement, StatementBuilder, Subjecter};
use crate::storage;

use log::{debug, info};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Generates and persists provenance for one kind of build environment.
pub trait Provenancer {
    fn generate_provenance_statement(
        &mut self,
        ctx: &RequestContext,
        subjecter: &dyn Subjecter,
        materials: Vec<Item>,
    ) -> Result<Statement>;

    fn persist_provenance_statement(
        &mut self,
        ctx: &RequestContext,
        stmt: &Statement,
        path: &Path,
    ) -> Result<()>;
}

/// A workflow run whose artifacts are already available to the subjecter.
#[derive(Clone, Debug)]
pub struct Environment {
    pub context: Context,
    pub runner: RunnerContext,
    /// Whether the run executes on a GitHub hosted runner.
    pub hosted: bool,
}

impl Environment {
    pub fn new(context: Context, runner: RunnerContext, hosted: bool) -> Self {
        Self {
            context,
            runner,
            hosted,
        }
    }

    fn event(&self) -> Result<AnyEvent> {
        if self.context.event.is_null() {
            return Ok(AnyEvent::default());
        }
        AnyEvent::deserialize(&self.context.event).map_err(|e| {
            Error::Serialization(format!("failed to unmarshal github context event json: {e}"))
        })
    }
}

impl Provenancer for Environment {
    fn generate_provenance_statement(
        &mut self,
        _ctx: &RequestContext,
        subjecter: &dyn Subjecter,
        materials: Vec<Item>,
    ) -> Result<Statement> {
        let subjects = subjecter.subjects()?;
        debug!("resolved {} subjects", subjects.len());

        let repo_uri = repository_uri(&self.context.repository);
        let event = self.event()?;
        let source = Item::new(
            format!("git+{repo_uri}"),
            DigestSet::from([("sha1".to_string(), self.context.sha.clone())]),
        );

        // Run ids are reused by re-runs, so this is not unique per attempt.
        let stmt = StatementBuilder::new()
            .with_subject(subjects)
            .with_builder(builder_id(&repo_uri, self.hosted))
            .with_metadata(format!("{repo_uri}/actions/runs/{}", self.context.run_id))
            .with_invocation(
                BUILD_TYPE,
                self.context.workflow.clone(),
                None,
                event.inputs,
                vec![source],
            )?
            .with_materials(materials)
            .build();

        Ok(stmt)
    }

    fn persist_provenance_statement(
        &mut self,
        _ctx: &RequestContext,
        stmt: &Statement,
        path: &Path,
    ) -> Result<()> {
        storage::persist(stmt, path)?;
        info!("provenance written to {}", path.display());
        Ok(())
    }
}

/// A workflow run whose artifacts are the assets of a GitHub release.
///
/// Assets are downloaded into `artifact_path` before the statement is built,
/// and the persisted statement is uploaded back to the same release.
pub struct ReleaseEnvironment<A> {
    env: Environment,
    client: ReleaseClient<A>,
    tag_name: String,
    release_id: Option<i64>,
    artifact_path: PathBuf,
}

impl<A: ReleaseApi> ReleaseEnvironment<A> {
    pub fn new(
        env: Environment,
        client: ReleaseClient<A>,
        tag_name: impl Into<String>,
        artifact_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            env,
            client,
            tag_name: tag_name.into(),
            release_id: None,
            artifact_path: artifact_path.into(),
        }
    }

    pub fn client(&self) -> &ReleaseClient<A> {
        &self.client
    }

    pub fn artifact_path(&self) -> &Path {
        &self.artifact_path
    }

    fn owner_and_repo(&self) -> (&str, &str) {
        (
            &self.env.context.repository_owner,
            repository_name(&self.env.context.repository),
        )
    }

    /// The id of the release tagged `tag_name`, looked up once per environment.
    pub fn release_id(&mut self, ctx: &RequestContext) -> Result<i64> {
        if let Some(id) = self.release_id {
            return Ok(id);
        }

        let (owner, repo) = self.owner_and_repo();
        let release = self
            .client
            .fetch_release(ctx, owner, repo, &self.tag_name)?
            .ok_or_else(|| {
                Error::NotFound(format!(
                    "release {} in {owner}/{repo}",
                    self.tag_name
                ))
            })?;
        debug!("release {} has id {}", self.tag_name, release.id);

        self.release_id = Some(release.id);
        Ok(release.id)
    }
}

impl<A: ReleaseApi> Provenancer for ReleaseEnvironment<A> {
    fn generate_provenance_statement(
        &mut self,
        ctx: &RequestContext,
        subjecter: &dyn Subjecter,
        materials: Vec<Item>,
    ) -> Result<Statement> {
        fs::create_dir_all(&self.artifact_path)
            .map_err(|e| Error::file_io("failed to create", &self.artifact_path, e))?;
        ensure_empty_directory(&self.artifact_path)?;

        let release_id = self.release_id(ctx)?;
        let (owner, repo) = self.owner_and_repo();
        let assets = self.client.download_release_assets(
            ctx,
            owner,
            repo,
            release_id,
            &self.artifact_path,
        )?;
        info!(
            "downloaded {} assets of release {} to {}",
            assets.len(),
            self.tag_name,
            self.artifact_path.display()
        );

        self.env.generate_provenance_statement(ctx, subjecter, materials)
    }

    fn persist_provenance_statement(
        &mut self,
        ctx: &RequestContext,
        stmt: &Statement,
        path: &Path,
    ) -> Result<()> {
        self.env.persist_provenance_statement(ctx, stmt, path)?;

        let release_id = self.release_id(ctx)?;
        let (owner, repo) = self.owner_and_repo();
        self.client
            .upload_release_asset(ctx, owner, repo, release_id, path)
            .map_err(|e| match e {
                Error::Transport(msg) => {
                    Error::Transport(format!("failed to upload provenance to release: {msg}"))
                }
                other => other,
            })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::in_toto::{FilePathSubjecter, SLSA_PREDICATE_TYPE, STATEMENT_TYPE, Subject};
    use crate::config::ReleaseClientConfig;
    use crate::tests::common::{FakeReleaseApi, asset, github_context, release};
    use serde_json::json;
    use tempfile::tempdir;

    struct FixedSubjecter(Vec<Subject>);

    impl Subjecter for FixedSubjecter {
        fn subjects(&self) -> Result<Vec<Subject>> {
            Ok(self.0.clone())
        }
    }

    fn subject() -> Subject {
        Subject::new(
            "app.bin",
            DigestSet::from([("sha256".to_string(), "ab".repeat(32))]),
        )
    }

    #[test]
    fn test_generate_from_ci_context() -> Result<()> {
        let mut ctx = github_context();
        ctx.event = json!({"inputs": {"release": "true"}});
        let mut env = Environment::new(ctx.clone(), RunnerContext::default(), true);
        let extra = Item::new(
            "pkg:cargo/serde@1.0.0",
            DigestSet::from([("sha256".to_string(), "cd".repeat(32))]),
        );

        let stmt = env.generate_provenance_statement(
            &RequestContext::background(),
            &FixedSubjecter(vec![subject()]),
            vec![extra.clone()],
        )?;

        let repo_uri = "https://github.com/philips-labs/slsa-provenance-action";
        assert_eq!(stmt.statement_type, STATEMENT_TYPE);
        assert_eq!(stmt.predicate_type, SLSA_PREDICATE_TYPE);
        assert_eq!(stmt.subject, vec![subject()]);
        assert_eq!(
            stmt.predicate.builder.id,
            format!("{repo_uri}/Attestations/GitHubHostedActions@v1")
        );
        assert_eq!(stmt.predicate.build_type, BUILD_TYPE);
        assert_eq!(
            stmt.predicate.metadata.build_invocation_id,
            format!("{repo_uri}/actions/runs/{}", ctx.run_id)
        );

        let invocation = &stmt.predicate.invocation;
        assert_eq!(invocation.config_source.entry_point, ctx.workflow);
        assert_eq!(invocation.config_source.uri, format!("git+{repo_uri}"));
        assert_eq!(invocation.config_source.digest["sha1"], ctx.sha);
        assert_eq!(invocation.parameters, Some(json!({"release": "true"})));
        assert!(invocation.environment.is_none());

        assert_eq!(stmt.predicate.materials.len(), 2);
        assert_eq!(stmt.predicate.materials[0].uri, format!("git+{repo_uri}"));
        assert_eq!(stmt.predicate.materials[1], extra);
        Ok(())
    }

    #[test]
    fn test_self_hosted_builder() -> Result<()> {
        let mut env = Environment::new(github_context(), RunnerContext::default(), false);

        let stmt = env.generate_provenance_statement(
            &RequestContext::background(),
            &FixedSubjecter(vec![subject()]),
            vec![],
        )?;

        assert!(stmt.predicate.builder.id.ends_with("/Attestations/SelfHostedActions@v1"));
        assert!(stmt.predicate.invocation.parameters.is_none());
        Ok(())
    }

    #[test]
    fn test_malformed_event() {
        let mut ctx = github_context();
        ctx.event = json!("not an object");
        let mut env = Environment::new(ctx, RunnerContext::default(), true);

        match env.generate_provenance_statement(
            &RequestContext::background(),
            &FixedSubjecter(vec![subject()]),
            vec![],
        ) {
            Err(Error::Serialization(msg)) => {
                assert!(msg.contains("failed to unmarshal github context event json"))
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_subjecter_error_propagates() -> Result<()> {
        let dir = tempdir()?;
        let mut env = Environment::new(github_context(), RunnerContext::default(), true);

        let result = env.generate_provenance_statement(
            &RequestContext::background(),
            &FilePathSubjecter::new(dir.path().join("missing")),
            vec![],
        );

        assert!(matches!(result, Err(Error::NotFound(_))));
        Ok(())
    }

    fn release_env(api: FakeReleaseApi, artifacts: &Path) -> ReleaseEnvironment<FakeReleaseApi> {
        ReleaseEnvironment::new(
            Environment::new(github_context(), RunnerContext::default(), true),
            ReleaseClient::new(api, ReleaseClientConfig::default()),
            "v0.1.0",
            artifacts,
        )
    }

    #[test]
    fn test_release_id_is_memoized() -> Result<()> {
        let dir = tempdir()?;
        let mut env = release_env(
            FakeReleaseApi::new(vec![release(7, "v0.0.9"), release(8, "v0.1.0")]),
            dir.path(),
        );
        let ctx = RequestContext::background();

        assert_eq!(env.release_id(&ctx)?, 8);
        assert_eq!(env.release_id(&ctx)?, 8);
        assert_eq!(env.client().api().list_release_calls(), 1);
        Ok(())
    }

    #[test]
    fn test_missing_release_is_not_found() -> Result<()> {
        let dir = tempdir()?;
        let mut env = release_env(FakeReleaseApi::new(vec![release(7, "v0.0.9")]), dir.path());

        match env.release_id(&RequestContext::background()) {
            Err(Error::NotFound(msg)) => assert!(msg.contains("v0.1.0")),
            other => panic!("unexpected result: {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn test_non_empty_artifact_path_downloads_nothing() -> Result<()> {
        let dir = tempdir()?;
        fs::write(dir.path().join("stale.bin"), b"old")?;
        let api = FakeReleaseApi::new(vec![release(8, "v0.1.0")])
            .with_assets(8, vec![asset(1, "app.bin")])
            .with_content(1, b"app");
        let mut env = release_env(api, dir.path());

        let result = env.generate_provenance_statement(
            &RequestContext::background(),
            &FilePathSubjecter::new(dir.path()),
            vec![],
        );

        match result {
            Err(Error::Validation(msg)) => assert!(msg.contains("must be an empty directory")),
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(env.client().api().list_release_calls(), 0);
        assert!(!dir.path().join("app.bin").exists());
        Ok(())
    }

    #[test]
    fn test_release_run_downloads_then_uploads() -> Result<()> {
        let dir = tempdir()?;
        let artifacts = dir.path().join("artifacts");
        let output = dir.path().join("provenance.json");
        let api = FakeReleaseApi::new(vec![release(8, "v0.1.0")])
            .with_assets(8, vec![asset(1, "app.bin"), asset(2, "checksums.txt")])
            .with_content(1, b"app")
            .with_content(2, b"sums");
        let mut env = release_env(api, &artifacts);
        let ctx = RequestContext::background();

        let stmt = env.generate_provenance_statement(
            &ctx,
            &FilePathSubjecter::new(&artifacts),
            vec![],
        )?;
        let names: Vec<&str> = stmt.subject.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["app.bin", "checksums.txt"]);
        assert_eq!(
            stmt.subject[0].digest["sha256"],
            crate::hash::calculate_hash(b"app")
        );

        env.persist_provenance_statement(&ctx, &stmt, &output)?;

        assert_eq!(storage::read_statement(&output)?, stmt);
        let uploads = env.client().api().uploads();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].release_id, 8);
        assert_eq!(uploads[0].name, "provenance.json");
        assert_eq!(uploads[0].content, fs::read(&output)?);
        assert_eq!(env.client().api().list_release_calls(), 1);
        Ok(())
    }
}
