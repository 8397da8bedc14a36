//! GitHub Actions provenance.
//!
//! The `${github}` and `${runner}` workflow contexts are modelled here, along
//! with the builder identity derived from them. Generation itself lives in
//! [`provenance`]; the release service in [`api`] and [`releases`].

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

pub mod api;
pub mod context;
pub mod provenance;
pub mod releases;

pub use context::RequestContext;
pub use provenance::{Environment, Provenancer, ReleaseEnvironment};
pub use releases::ReleaseClient;

/// Builder id suffix for GitHub hosted runners.
pub const HOSTED_ID_SUFFIX: &str = "/Attestations/GitHubHostedActions@v1";
/// Builder id suffix for self hosted runners.
pub const SELF_HOSTED_ID_SUFFIX: &str = "/Attestations/SelfHostedActions@v1";
/// Determines the meaning of invocation and materials in the predicate.
pub const BUILD_TYPE: &str = "https://github.com/Attestations/GitHubActionsWorkflow@v1";

const GITHUB_URL: &str = "https://github.com/";

/// Builder identity for a repository, depending on where the workflow ran.
pub fn builder_id(repo_uri: &str, hosted: bool) -> String {
    let suffix = if hosted {
        HOSTED_ID_SUFFIX
    } else {
        SELF_HOSTED_ID_SUFFIX
    };
    format!("{repo_uri}{suffix}")
}

/// `https://github.com/<owner>/<repo>`.
pub fn repository_uri(repository: &str) -> String {
    format!("{GITHUB_URL}{repository}")
}

/// The repository name without its owner: the last `/` segment.
pub fn repository_name(repository: &str) -> &str {
    repository.rsplit('/').next().unwrap_or(repository)
}

/// The `${github}` context of a workflow run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Context {
    pub action: String,
    pub action_path: String,
    pub actor: String,
    pub base_ref: String,
    /// Raw payload of the triggering event.
    pub event: Value,
    pub event_name: String,
    pub event_path: String,
    pub head_ref: String,
    pub job: String,
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub repository: String,
    pub repository_owner: String,
    pub run_id: String,
    pub run_number: String,
    pub sha: String,
    pub token: Token,
    pub workflow: String,
    pub workspace: String,
}

/// The workflow token. Never serialized or printed in clear.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Token(String);

impl Token {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

impl Serialize for Token {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("***")
    }
}

impl<'de> Deserialize<'de> for Token {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Self(String::deserialize(deserializer)?))
    }
}

/// The `${runner}` context of a workflow run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerContext {
    pub os: String,
    pub temp: String,
    pub tool_cache: String,
}

/// The part of an event payload that ends up in the provenance.
///
/// Only `workflow_dispatch` carries user supplied inputs; other events leave
/// this empty.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct AnyEvent {
    #[serde(default)]
    pub inputs: Option<Value>,
}
