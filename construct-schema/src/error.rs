//! Error types for schema resolution, generation and enforcement

use std::path::PathBuf;

use thiserror::Error;

use crate::catalog::CatalogError;
use crate::types::FieldType;
use crate::violation::Violation;

/// Result type for schema operations
pub type Result<T> = std::result::Result<T, SchemaError>;

/// Errors raised by the resolvers, the engine and generated instances.
///
/// Conformance problems found by `validate` are not errors; they come back
/// as violations. Everything here is fatal to the call that raised it.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// No definition is registered under the namespace
    #[error("invalid-definition-namespace ({namespace})")]
    InvalidDefinitionNamespace { namespace: String },

    /// No template is registered under the namespace
    #[error("invalid-template-namespace ({namespace})")]
    InvalidTemplateNamespace { namespace: String },

    /// No validator is registered under the namespace
    #[error("invalid-validator-namespace ({namespace})")]
    InvalidValidatorNamespace { namespace: String },

    /// The registered validator is not a pattern, predicate or enumeration
    #[error("invalid-validator ({shape})")]
    InvalidValidator { shape: String },

    /// A nested field leads back to a definition already being resolved
    #[error("recursive-definition ({chain})")]
    RecursiveDefinition { chain: String },

    /// Nested definitions go deeper than the configured limit
    #[error("definition-too-deep ({namespace}, max {max_depth})")]
    DefinitionTooDeep { namespace: String, max_depth: usize },

    /// A field spec is unusable as declared
    #[error("invalid-field-spec ({field}): {reason}")]
    InvalidFieldSpec { field: String, reason: String },

    /// Generation found violations; every one is listed
    #[error("invalid-target ({namespace}){}", render_violations(.violations))]
    InvalidTarget {
        namespace: String,
        violations: Vec<Violation>,
    },

    /// The instance's definition has no such field
    #[error("unknown-property ({property})")]
    UnknownProperty { property: String },

    /// The field cannot be assigned or removed
    #[error("readonly-property ({property})")]
    ReadonlyProperty { property: String },

    /// Required fields cannot be removed from an instance
    #[error("required-property-deletion ({property})")]
    RequiredPropertyDeletion { property: String },

    /// An instance's base template is fixed at generation
    #[error("prototype-locked ({namespace})")]
    PrototypeLocked { namespace: String },

    /// An assignment failed the field's checks; nothing was stored
    #[error("rejected-value: {violation}")]
    RejectedValue { violation: Box<Violation> },

    /// The backing catalog failed
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Configuration could not be loaded
    #[error("configuration error: {0}")]
    Config(Box<figment::Error>),

    /// Configuration file extension is not toml, yaml, yml or json
    #[error("unsupported configuration format: {path}")]
    UnsupportedConfigFormat { path: PathBuf },
}

impl SchemaError {
    /// Stable kebab-case code for the error.
    pub fn code(&self) -> &'static str {
        match self {
            SchemaError::InvalidDefinitionNamespace { .. } => "invalid-definition-namespace",
            SchemaError::InvalidTemplateNamespace { .. } => "invalid-template-namespace",
            SchemaError::InvalidValidatorNamespace { .. } => "invalid-validator-namespace",
            SchemaError::InvalidValidator { .. } => "invalid-validator",
            SchemaError::RecursiveDefinition { .. } => "recursive-definition",
            SchemaError::DefinitionTooDeep { .. } => "definition-too-deep",
            SchemaError::InvalidFieldSpec { .. } => "invalid-field-spec",
            SchemaError::InvalidTarget { .. } => "invalid-target",
            SchemaError::UnknownProperty { .. } => "unknown-property",
            SchemaError::ReadonlyProperty { .. } => "readonly-property",
            SchemaError::RequiredPropertyDeletion { .. } => "required-property-deletion",
            SchemaError::PrototypeLocked { .. } => "prototype-locked",
            SchemaError::RejectedValue { .. } => "rejected-value",
            SchemaError::Catalog(_) => "catalog",
            SchemaError::Config(_) => "config",
            SchemaError::UnsupportedConfigFormat { .. } => "unsupported-config-format",
        }
    }

    /// The violations carried by an `InvalidTarget` or `RejectedValue`.
    pub fn violations(&self) -> &[Violation] {
        match self {
            SchemaError::InvalidTarget { violations, .. } => violations,
            SchemaError::RejectedValue { violation } => std::slice::from_ref(violation.as_ref()),
            _ => &[],
        }
    }
}

impl From<figment::Error> for SchemaError {
    fn from(error: figment::Error) -> Self {
        SchemaError::Config(Box::new(error))
    }
}

fn render_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| format!("\n  - {v}"))
        .collect()
}

/// Why a value could not be converted to a field type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoerceError {
    #[error("Invalid Number")]
    InvalidNumber,

    #[error("Invalid Date")]
    InvalidDate,

    /// Big integer conversion failed; carries the conversion message
    #[error("{message}")]
    InvalidBigInt { message: String },

    #[error("cannot coerce to {target}")]
    Unsupported { target: FieldType },
}
