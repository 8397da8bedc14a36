//! # slsa-provenance
//!
//! Generates SLSA build provenance for artifacts produced in GitHub Actions.
//!
//! Provenance is an in-toto Statement carrying a SLSA v0.2 predicate. The
//! subjects come from files on disk, container image tags, or the assets of
//! a GitHub release. Statements can be signed into a DSSE envelope with an
//! Ed25519 key.
//!
//! ## Quick Start
//!
//! Generate provenance for a build directory:
//! ```bash
//! slsa-provenance generate files \
//!     --artifact-path=dist/ \
//!     --github-context="$(echo "$GITHUB_CONTEXT" | base64 -w0)" \
//!     --runner-context="$(echo "$RUNNER_CONTEXT" | base64 -w0)" \
//!     --output-path=provenance.json
//! ```
//!
//! Sign it:
//! ```bash
//! slsa-provenance sign --key-path=signing.key --output-path=provenance.signed.json
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod github;
pub mod hash;
pub mod in_toto;
pub mod oci;
pub mod signing;
pub mod storage;
#[cfg(test)]
mod tests;

// Re-export error types
pub use error::{Error, Result};

/// Initialize logging for the CLI
///
/// `RUST_LOG` takes precedence; otherwise the level is `info`, or `debug`
/// when `verbose` is set.
///
/// # Examples
///
/// ```
/// use slsa_provenance::init_logging;
///
/// // Initialize with default settings
/// let result = init_logging(false);
/// // Note: This might fail if already initialized
/// assert!(result.is_ok() || result.is_err());
/// ```
pub fn init_logging(verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .try_init()
        .map_err(|e| Error::InitializationError(e.to_string()))
}

// Re-export commonly used types and traits
pub use in_toto::{Statement, StatementBuilder, Subjecter};
pub use signing::signable::Signable;
