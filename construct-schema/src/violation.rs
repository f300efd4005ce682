//! Structured records of how a target fails to conform to a definition.

use std::fmt;

use serde::Serialize;

/// Why a field failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViolationKind {
    /// A required field without a default is absent.
    MissingRequiredProperty,
    /// The value could not be converted to the declared type.
    FailedCoerce,
    /// A validator rejected the value, or could not be applied.
    FailedValidator,
}

impl ViolationKind {
    pub fn code(&self) -> &'static str {
        match self {
            ViolationKind::MissingRequiredProperty => "missing-required-property",
            ViolationKind::FailedCoerce => "failed-coerce",
            ViolationKind::FailedValidator => "failed-validator",
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// One failed field. `path` runs from the outermost field down to the
/// failing one, so nested failures keep their context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub path: Vec<String>,
    pub kind: ViolationKind,
    pub detail: String,
}

impl Violation {
    pub fn new(path: Vec<String>, kind: ViolationKind, detail: impl Into<String>) -> Self {
        Self {
            path,
            kind,
            detail: detail.into(),
        }
    }

    pub fn missing_required(path: Vec<String>) -> Self {
        Self::new(path, ViolationKind::MissingRequiredProperty, "")
    }

    pub fn failed_coerce(path: Vec<String>, detail: impl Into<String>) -> Self {
        Self::new(path, ViolationKind::FailedCoerce, detail)
    }

    pub fn failed_validator(path: Vec<String>, detail: impl Into<String>) -> Self {
        Self::new(path, ViolationKind::FailedValidator, detail)
    }

    /// The name of the failing field itself.
    pub fn field(&self) -> &str {
        self.path.last().map_or("", String::as_str)
    }

    /// Dotted path, e.g. `physicality.weightKg`.
    pub fn path_string(&self) -> String {
        self.path.join(".")
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.kind, self.path_string())?;
        if !self.detail.is_empty() {
            write!(f, ": {}", self.detail)?;
        }
        Ok(())
    }
}

/// Result of validating a target. Valid iff there are no violations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    pub fn from_violations(violations: Vec<Violation>) -> Self {
        Self {
            is_valid: violations.is_empty(),
            violations,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    /// Violations of a given kind, in report order.
    pub fn of_kind(&self, kind: ViolationKind) -> impl Iterator<Item = &Violation> {
        self.violations.iter().filter(move |v| v.kind == kind)
    }

    /// The first violation for the field at dotted `path`.
    pub fn find(&self, path: &str) -> Option<&Violation> {
        self.violations.iter().find(|v| v.path_string() == path)
    }
}
