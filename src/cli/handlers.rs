use crate::error::{Error, Result};

use super::commands::{GenerateArgs, GenerateCommands, SignArgs};
use crate::config::{DEFAULT_REGISTRY_TIMEOUT, ReleaseClientConfig};
use crate::github::api::GitHubApi;
use crate::github::context::RequestContext;
use crate::github::{
    Context, Environment, Provenancer, ReleaseClient, ReleaseEnvironment, RunnerContext,
};
use crate::in_toto::{FilePathSubjecter, Subjecter, load_materials};
use crate::oci::{ContainerSubjecter, RegistryClient, RegistryCredentials};
use crate::signing::load_private_key;
use crate::signing::signable::Signable;
use crate::storage::{persist, read_statement};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;
use serde::de::DeserializeOwned;

pub fn handle_generate_command(cmd: GenerateCommands) -> Result<()> {
    let ctx = RequestContext::background();

    match cmd {
        GenerateCommands::Files {
            common,
            artifact_path,
        } => {
            let mut env = environment(&common)?;
            let subjecter = FilePathSubjecter::new(artifact_path);
            generate(&ctx, &mut env, &subjecter, &common)
        }
        GenerateCommands::Container {
            common,
            repository,
            digest,
            tags,
            allow_insecure,
            docker_username,
            docker_password,
        } => {
            let mut env = environment(&common)?;
            let credentials = docker_username.map(|username| RegistryCredentials {
                username,
                password: docker_password.unwrap_or_default(),
            });
            let registry =
                RegistryClient::new(credentials, allow_insecure, DEFAULT_REGISTRY_TIMEOUT)?;
            let subjecter = ContainerSubjecter::new(registry, repository, digest, tags);
            generate(&ctx, &mut env, &subjecter, &common)
        }
        GenerateCommands::GithubRelease {
            common,
            artifact_path,
            tag_name,
            github_token,
        } => {
            let token = github_token.filter(|t| !t.is_empty()).ok_or_else(|| {
                Error::Validation("GITHUB_TOKEN environment variable not set".to_string())
            })?;

            let config = ReleaseClientConfig::default();
            let client = ReleaseClient::new(GitHubApi::new(Some(token), &config)?, config);
            let subjecter = FilePathSubjecter::new(&artifact_path);
            let mut env =
                ReleaseEnvironment::new(environment(&common)?, client, tag_name, artifact_path);
            generate(&ctx, &mut env, &subjecter, &common)
        }
    }
}

fn environment(args: &GenerateArgs) -> Result<Environment> {
    let context: Context = decode_context("github-context", &args.github_context)?;
    let runner: RunnerContext = decode_context("runner-context", &args.runner_context)?;
    Ok(Environment::new(context, runner, args.hosted))
}

fn generate(
    ctx: &RequestContext,
    provenancer: &mut dyn Provenancer,
    subjecter: &dyn Subjecter,
    args: &GenerateArgs,
) -> Result<()> {
    let materials = load_materials(&args.extra_materials)?;
    let stmt = provenancer.generate_provenance_statement(ctx, subjecter, materials)?;

    println!("Saving provenance to {}", args.output_path.display());
    provenancer.persist_provenance_statement(ctx, &stmt, &args.output_path)
}

/// Decodes a base64 encoded JSON workflow context passed as `--<flag>`.
pub fn decode_context<T: DeserializeOwned>(flag: &str, value: &str) -> Result<T> {
    if value.is_empty() {
        return Err(Error::Validation(format!("required flag \"{flag}\" not set")));
    }

    let decoded = STANDARD
        .decode(value.trim())
        .map_err(|e| Error::Serialization(format!("failed to decode {flag}: {e}")))?;

    serde_json::from_slice(&decoded)
        .map_err(|e| Error::Serialization(format!("failed to unmarshal {flag} json: {e}")))
}

pub fn handle_sign_command(args: SignArgs) -> Result<()> {
    let stmt = read_statement(&args.provenance_path)?;
    let key = load_private_key(args.key.as_deref(), args.key_path.as_deref())?;
    let envelope = stmt.sign(&key)?;

    println!("Saving signed provenance to {}", args.output_path.display());
    persist(&envelope, &args.output_path)
}

#[derive(Debug, Serialize)]
pub struct VersionInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub platform: String,
}

impl VersionInfo {
    pub fn current() -> Self {
        Self {
            name: super::CLI_NAME,
            version: super::CLI_VERSION,
            platform: format!("{}/{}", std::env::consts::OS, std::env::consts::ARCH),
        }
    }
}

pub fn handle_version_command(json: bool) -> Result<()> {
    let info = VersionInfo::current();
    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        println!("Name:      {}", info.name);
        println!("Version:   {}", info.version);
        println!("Platform:  {}", info.platform);
    }
    Ok(())
}
