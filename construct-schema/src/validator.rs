//! Validator resolution and evaluation.
//!
//! A validator name resolves to a pattern, a predicate, or an enumeration of
//! allowed values. A list of names passes only when every validator passes.

use std::sync::Arc;

use futures::future::try_join_all;
use tracing::trace;

use crate::catalog::{Catalog, LookupOptions, ValidatorPayload};
use crate::error::{Result, SchemaError};
use crate::types::Names;
use crate::value::Value;

/// Outcome of checking a value, with the failure reason when there is one.
#[derive(Debug)]
pub struct ValidatorVerdict {
    pub is_valid: bool,
    pub error: Option<SchemaError>,
}

/// Resolves validator namespaces and applies them to values.
pub struct ValidatorResolver {
    catalog: Arc<dyn Catalog<ValidatorPayload>>,
}

impl ValidatorResolver {
    pub fn new(catalog: Arc<dyn Catalog<ValidatorPayload>>) -> Self {
        Self { catalog }
    }

    /// Apply the validator(s) at `names` to `value`.
    ///
    /// Multiple validators are resolved and evaluated concurrently; the
    /// result is true only if all of them pass. Any resolution failure fails
    /// the whole call.
    pub async fn apply(&self, names: &Names, value: &Value) -> Result<bool> {
        match names {
            Names::One(name) => self.execute(name, value).await,
            Names::Many(names) => {
                let results =
                    try_join_all(names.iter().map(|name| self.execute(name, value))).await?;
                Ok(results.into_iter().all(|passed| passed))
            }
        }
    }

    /// Like [`apply`](Self::apply), but folds resolution failures into the
    /// verdict instead of returning them.
    pub async fn check(&self, names: &Names, value: &Value) -> ValidatorVerdict {
        match self.apply(names, value).await {
            Ok(is_valid) => ValidatorVerdict {
                is_valid,
                error: None,
            },
            Err(error) => ValidatorVerdict {
                is_valid: false,
                error: Some(error),
            },
        }
    }

    /// Look up the payload registered under `name`.
    pub async fn resolve(&self, name: &str) -> Result<Arc<ValidatorPayload>> {
        self.catalog
            .lookup(name, LookupOptions::quiet())
            .await?
            .ok_or_else(|| SchemaError::InvalidValidatorNamespace {
                namespace: name.to_string(),
            })
    }

    async fn execute(&self, name: &str, value: &Value) -> Result<bool> {
        let payload = self.resolve(name).await?;
        let passed = evaluate(&payload, value)?;
        trace!(validator = name, passed, "validator applied");
        Ok(passed)
    }
}

/// Evaluate a single payload against a value.
pub fn evaluate(payload: &ValidatorPayload, value: &Value) -> Result<bool> {
    match payload {
        ValidatorPayload::Pattern(re) => Ok(re.is_match(&value.to_string())),
        ValidatorPayload::Predicate(f) => Ok(f(value)),
        ValidatorPayload::Enumeration(allowed) => Ok(allowed.contains(value)),
        ValidatorPayload::Unsupported(_) => Err(SchemaError::InvalidValidator {
            shape: payload.shape(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;
    use std::collections::HashMap;

    fn resolver() -> ValidatorResolver {
        let mut validators: HashMap<String, Arc<ValidatorPayload>> = HashMap::new();
        validators.insert(
            "regexp1".into(),
            Arc::new(ValidatorPayload::Pattern(Regex::new("(?i)test").unwrap())),
        );
        validators.insert(
            "func1".into(),
            Arc::new(ValidatorPayload::predicate(|v| v.as_str() == Some("test"))),
        );
        validators.insert(
            "list1".into(),
            Arc::new(ValidatorPayload::enumeration(["test1", "test2", "TEST3"])),
        );
        validators.insert(
            "broken".into(),
            Arc::new(ValidatorPayload::Unsupported(Value::from(42))),
        );
        ValidatorResolver::new(Arc::new(validators))
    }

    #[tokio::test]
    async fn single_pattern_passes() {
        let passed = resolver()
            .apply(&Names::from("regexp1"), &Value::from("test"))
            .await
            .unwrap();
        assert!(passed);
    }

    #[tokio::test]
    async fn every_validator_must_pass() {
        let passed = resolver()
            .apply(&Names::from(["regexp1", "func1"]), &Value::from("test1"))
            .await
            .unwrap();
        assert!(!passed);
    }

    #[tokio::test]
    async fn enumeration_and_pattern_both_pass() {
        let passed = resolver()
            .apply(&Names::from(["list1", "regexp1"]), &Value::from("test1"))
            .await
            .unwrap();
        assert!(passed);
    }

    #[tokio::test]
    async fn enumeration_requires_exact_match() {
        let r = resolver();
        assert!(!r
            .apply(&Names::from("list1"), &Value::from("test3"))
            .await
            .unwrap());
        assert!(r
            .apply(&Names::from("list1"), &Value::from("TEST3"))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn pattern_tests_stringified_value() {
        let mut validators: HashMap<String, Arc<ValidatorPayload>> = HashMap::new();
        validators.insert(
            "digits".into(),
            Arc::new(ValidatorPayload::Pattern(Regex::new(r"^\d+$").unwrap())),
        );
        let r = ValidatorResolver::new(Arc::new(validators));
        assert!(r.apply(&Names::from("digits"), &Value::from(180)).await.unwrap());
        assert!(!r.apply(&Names::from("digits"), &Value::from(1.5)).await.unwrap());
    }

    #[tokio::test]
    async fn missing_namespace_errors() {
        let err = resolver()
            .apply(&Names::from("nope"), &Value::from("x"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "invalid-validator-namespace (nope)");
    }

    #[tokio::test]
    async fn missing_namespace_in_list_fails_the_list() {
        let err = resolver()
            .apply(&Names::from(["regexp1", "nope"]), &Value::from("test"))
            .await
            .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidValidatorNamespace { .. }));
    }

    #[tokio::test]
    async fn unsupported_payload_is_invalid_validator() {
        let err = resolver()
            .apply(&Names::from("broken"), &Value::from("x"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "invalid-validator (number)");
    }

    #[tokio::test]
    async fn check_folds_errors_into_verdict() {
        let verdict = resolver()
            .check(&Names::from("nope"), &Value::from("x"))
            .await;
        assert!(!verdict.is_valid);
        assert!(verdict.error.is_some());

        let verdict = resolver()
            .check(&Names::from("regexp1"), &Value::from("TeSt"))
            .await;
        assert!(verdict.is_valid);
        assert!(verdict.error.is_none());
    }
}
