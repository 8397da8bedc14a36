//! Container image subjects.
//!
//! Each `repository:tag` is resolved to the manifest digest the registry
//! serves for it. When an expected digest is supplied, every tag must
//! resolve to exactly that digest.

use crate::error::{Error, Result};
use crate::in_toto::{DigestSet, Subject, Subjecter};

use log::debug;

pub mod registry;

pub use registry::{ImageReference, RegistryClient, RegistryCredentials};

/// Resolves an image reference such as `ghcr.io/org/app:v1` to an
/// `algorithm:hex` manifest digest.
pub trait DigestResolver {
    fn digest(&self, reference: &str) -> Result<String>;
}

/// Tag used when no tags are given.
pub const DEFAULT_TAG: &str = "latest";

pub struct ContainerSubjecter<R> {
    resolver: R,
    repository: String,
    digest: Option<String>,
    tags: Vec<String>,
}

impl<R: DigestResolver> ContainerSubjecter<R> {
    pub fn new(
        resolver: R,
        repository: impl Into<String>,
        digest: Option<String>,
        tags: Vec<String>,
    ) -> Self {
        Self {
            resolver,
            repository: repository.into(),
            digest: digest.filter(|d| !d.is_empty()),
            tags,
        }
    }

    fn tags(&self) -> Vec<String> {
        if self.tags.is_empty() {
            vec![DEFAULT_TAG.to_string()]
        } else {
            self.tags.clone()
        }
    }
}

impl<R: DigestResolver> Subjecter for ContainerSubjecter<R> {
    fn subjects(&self) -> Result<Vec<Subject>> {
        let mut subjects = Vec::new();

        for tag in self.tags() {
            let reference = format!("{}:{}", self.repository, tag);
            let digest = self.resolver.digest(&reference)?;
            debug!("{reference} resolved to {digest}");

            if let Some(expected) = &self.digest {
                if *expected != digest {
                    return Err(Error::Validation(format!(
                        "did not get expected digest, got {digest}, expected {expected}"
                    )));
                }
            }

            let (algorithm, hex) = digest.split_once(':').ok_or_else(|| {
                Error::Registry(format!("malformed digest {digest} for {reference}"))
            })?;

            subjects.push(Subject::new(
                reference,
                DigestSet::from([(algorithm.to_string(), hex.to_string())]),
            ));
        }

        Ok(subjects)
    }
}
