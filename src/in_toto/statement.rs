//! Composable construction of SLSA provenance Statements.
//!
//! Setters are applied in call order. Single-valued fields are replaced by a
//! later call; `materials` is append-only. Nothing here validates the result,
//! callers decide what a complete Statement needs.

use crate::error::{Error, Result};
use crate::in_toto::{
    Builder, Completeness, ConfigSource, Invocation, Item, Metadata, SLSA_PREDICATE_TYPE,
    STATEMENT_TYPE, Statement, Subject,
};

use chrono::{SecondsFormat, Utc};
use serde_json::Value;

/// Builds a [`Statement`] seeded with the in-toto and SLSA type constants.
#[derive(Debug, Clone)]
pub struct StatementBuilder {
    stmt: Statement,
}

impl Default for StatementBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl StatementBuilder {
    pub fn new() -> Self {
        Self {
            stmt: Statement {
                statement_type: STATEMENT_TYPE.to_string(),
                predicate_type: SLSA_PREDICATE_TYPE.to_string(),
                ..Default::default()
            },
        }
    }

    /// Replaces the subject list.
    pub fn with_subject(mut self, subjects: Vec<Subject>) -> Self {
        self.stmt.subject = subjects;
        self
    }

    pub fn with_builder(mut self, id: impl Into<String>) -> Self {
        self.stmt.predicate.builder = Builder { id: id.into() };
        self
    }

    /// Stamps build metadata, recording the current UTC time as `buildFinishedOn`.
    pub fn with_metadata(mut self, build_invocation_id: impl Into<String>) -> Self {
        self.stmt.predicate.metadata = Metadata {
            build_invocation_id: build_invocation_id.into(),
            build_finished_on: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            completeness: Completeness {
                parameters: true,
                environment: false,
                materials: false,
            },
            reproducible: false,
        };
        self
    }

    /// Sets the build type and invocation, and appends `materials`.
    ///
    /// The config source is taken from `materials[0]`, which describes where
    /// the build definition lives.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` if `materials` is empty.
    pub fn with_invocation(
        mut self,
        build_type: impl Into<String>,
        entry_point: impl Into<String>,
        environment: Option<Value>,
        parameters: Option<Value>,
        materials: Vec<Item>,
    ) -> Result<Self> {
        let source = materials.first().ok_or_else(|| {
            Error::Validation("invocation requires at least one material".to_string())
        })?;

        self.stmt.predicate.build_type = build_type.into();
        self.stmt.predicate.invocation = Invocation {
            config_source: ConfigSource {
                entry_point: entry_point.into(),
                uri: source.uri.clone(),
                digest: source.digest.clone(),
            },
            parameters,
            environment,
        };
        self.stmt.predicate.materials.extend(materials);

        Ok(self)
    }

    /// Appends materials without touching the invocation.
    pub fn with_materials(mut self, materials: Vec<Item>) -> Self {
        self.stmt.predicate.materials.extend(materials);
        self
    }

    pub fn build(self) -> Statement {
        self.stmt
    }
}
