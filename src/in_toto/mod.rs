//! # in-toto Statement Library
//!
//! This module holds the in-toto v0.1 Statement carrying a SLSA v0.2 provenance
//! predicate, together with the pieces needed to produce one:
//!
//! - [`statement`]: the [`StatementBuilder`] used to assemble a Statement
//! - [`subjects`]: the [`Subjecter`] capability and its file-system implementation
//! - [`materials`]: loading extra materials from JSON files
//! - [`dsse`]: wrapping a Statement in a signed DSSE envelope
//!
//! ## Examples
//!
//! ```
//! use slsa_provenance::in_toto::{DigestSet, Item, StatementBuilder};
//!
//! let source = Item::new("git+https://github.com/org/repo", DigestSet::from([
//!     ("sha1".to_string(), "abc".to_string()),
//! ]));
//!
//! let stmt = StatementBuilder::new()
//!     .with_builder("https://github.com/org/repo/Attestations/SelfHostedActions@v1")
//!     .with_invocation("build/v1", "ci.yaml:build", None, None, vec![source])
//!     .unwrap()
//!     .build();
//!
//! assert_eq!(stmt.predicate.build_type, "build/v1");
//! assert_eq!(stmt.predicate.materials.len(), 1);
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub mod dsse;
pub mod materials;
pub mod statement;
pub mod subjects;

pub use materials::{load_materials, read_materials};
pub use statement::StatementBuilder;
pub use subjects::{FilePathSubjecter, Subjecter};

/// The `_type` of every Statement this crate emits.
pub const STATEMENT_TYPE: &str = "https://in-toto.io/Statement/v0.1";

/// The predicate type for SLSA v0.2 provenance.
pub const SLSA_PREDICATE_TYPE: &str = "https://slsa.dev/provenance/v0.2";

/// Content type recorded in DSSE envelopes wrapping a Statement.
pub const PAYLOAD_TYPE: &str = "application/vnd.in-toto+json";

/// Collection of cryptographic digests keyed by lowercase algorithm name.
///
/// A `BTreeMap` keeps serialization order stable, which the signed payload
/// depends on.
pub type DigestSet = BTreeMap<String, String>;

/// The middle layer of the attestation, binding a predicate to its subjects.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    #[serde(rename = "_type")]
    pub statement_type: String,
    pub subject: Vec<Subject>,
    #[serde(rename = "predicateType")]
    pub predicate_type: String,
    pub predicate: Predicate,
}

/// A software artifact the attestation applies to.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub name: String,
    pub digest: DigestSet,
}

impl Subject {
    pub fn new(name: impl Into<String>, digest: DigestSet) -> Self {
        Self {
            name: name.into(),
            digest,
        }
    }
}

/// SLSA v0.2 provenance predicate.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    pub builder: Builder,
    #[serde(rename = "buildType")]
    pub build_type: String,
    pub invocation: Invocation,
    pub metadata: Metadata,
    pub materials: Vec<Item>,
}

/// Identifies the trusted entity that executed the build.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Builder {
    pub id: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Invocation {
    #[serde(rename = "configSource")]
    pub config_source: ConfigSource,
    /// Opaque JSON, stored verbatim. `None` serializes as `null`.
    pub parameters: Option<Value>,
    pub environment: Option<Value>,
}

/// Where the build configuration came from, borrowed from the first material.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigSource {
    #[serde(rename = "entryPoint")]
    pub entry_point: String,
    pub uri: String,
    pub digest: DigestSet,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(rename = "buildInvocationId")]
    pub build_invocation_id: String,
    /// RFC 3339 UTC timestamp, second precision.
    #[serde(rename = "buildFinishedOn")]
    pub build_finished_on: String,
    pub completeness: Completeness,
    pub reproducible: bool,
}

/// Which parts of the predicate the builder claims are complete.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completeness {
    pub parameters: bool,
    pub environment: bool,
    pub materials: bool,
}

/// A material used as input while producing the subjects.
///
/// Both fields default when absent so that loading can report a missing
/// field as a validation failure rather than a decode failure.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub digest: DigestSet,
}

impl Item {
    pub fn new(uri: impl Into<String>, digest: DigestSet) -> Self {
        Self {
            uri: uri.into(),
            digest,
        }
    }
}
