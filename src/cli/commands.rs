use clap::{Args, Subcommand};
use std::path::PathBuf;

/// Flags shared by every `generate` subcommand.
#[derive(Debug, Clone, Args)]
pub struct GenerateArgs {
    /// The '${github}' context value, base64 encoded JSON
    #[arg(long = "github-context")]
    pub github_context: String,

    /// The '${runner}' context value, base64 encoded JSON
    #[arg(long = "runner-context")]
    pub runner_context: String,

    /// The path to which the generated provenance should be written
    #[arg(long = "output-path", default_value = "provenance.json")]
    pub output_path: PathBuf,

    /// JSON files with additional materials (comma-separated)
    #[arg(short = 'm', long = "extra-materials", value_delimiter = ',')]
    pub extra_materials: Vec<PathBuf>,

    /// Set when running on a GitHub hosted runner
    #[arg(long = "hosted", env = "GITHUB_ACTIONS")]
    pub hosted: bool,
}

#[derive(Debug, Subcommand)]
pub enum GenerateCommands {
    /// Generate provenance on file assets
    Files {
        #[command(flatten)]
        common: GenerateArgs,

        /// The file or directory of artifacts to include in provenance
        #[arg(long = "artifact-path")]
        artifact_path: PathBuf,
    },
    /// Generate provenance on container images
    Container {
        #[command(flatten)]
        common: GenerateArgs,

        /// The image repository, e.g. ghcr.io/org/app
        #[arg(long = "repository")]
        repository: String,

        /// Expected digest every tag must resolve to
        #[arg(long = "digest")]
        digest: Option<String>,

        /// Image tags to include (comma-separated, default: latest)
        #[arg(long = "tags", value_delimiter = ',')]
        tags: Vec<String>,

        /// Accept invalid registry TLS certificates (testing only)
        #[arg(long = "allow-insecure")]
        allow_insecure: bool,

        #[arg(long = "docker-username", env = "DOCKER_USERNAME", hide_env_values = true)]
        docker_username: Option<String>,

        #[arg(long = "docker-password", env = "DOCKER_PASSWORD", hide_env_values = true)]
        docker_password: Option<String>,
    },
    /// Generate provenance on GitHub release assets
    GithubRelease {
        #[command(flatten)]
        common: GenerateArgs,

        /// Empty directory the release assets are downloaded to
        #[arg(long = "artifact-path")]
        artifact_path: PathBuf,

        /// The release tag to generate provenance on; the provenance is
        /// uploaded to it as an additional asset
        #[arg(long = "tag-name")]
        tag_name: String,

        #[arg(long = "github-token", env = "GITHUB_TOKEN", hide_env_values = true)]
        github_token: Option<String>,
    },
}

#[derive(Debug, Clone, Args)]
pub struct SignArgs {
    /// The provenance statement to sign
    #[arg(long = "provenance-path", default_value = "provenance.json")]
    pub provenance_path: PathBuf,

    /// Hex encoded Ed25519 private key seed
    #[arg(long = "key")]
    pub key: Option<String>,

    /// File holding the hex encoded Ed25519 private key seed
    #[arg(long = "key-path")]
    pub key_path: Option<PathBuf>,

    /// Where to write the signed envelope
    #[arg(long = "output-path", default_value = "provenance.signed.json")]
    pub output_path: PathBuf,
}
