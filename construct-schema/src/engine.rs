//! The schema engine: lookup, validation and generation over three catalogs.

use std::sync::Arc;

use futures::future::{try_join_all, BoxFuture, FutureExt};
use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::catalog::Catalogs;
use crate::check::{check_value, child_path};
use crate::config::EngineConfig;
use crate::definition::DefinitionResolver;
use crate::error::{Result, SchemaError};
use crate::instance::Instance;
use crate::prototype::TemplateResolver;
use crate::types::{Definition, FieldSpec, Names};
use crate::validator::ValidatorResolver;
use crate::value::{Object, Value};
use crate::violation::{ValidationReport, Violation};

/// Outcome of assembling one object: the instance, or every violation found.
type Assembly = std::result::Result<Instance, Vec<Violation>>;

enum FieldOutcome {
    Absent,
    Value(Value),
    Nested(Instance),
    Rejected(Vec<Violation>),
}

/// Entry point for schema lookup, validation and instance generation.
///
/// The engine owns one resolver per catalog. Definitions resolved through it
/// are frozen in its cache, so two engines over the same catalogs do not
/// share resolved definitions.
pub struct SchemaEngine {
    definitions: DefinitionResolver,
    templates: TemplateResolver,
    validators: Arc<ValidatorResolver>,
    config: EngineConfig,
}

impl SchemaEngine {
    pub fn new(catalogs: Catalogs) -> Self {
        Self::with_config(catalogs, EngineConfig::default())
    }

    pub fn with_config(catalogs: Catalogs, config: EngineConfig) -> Self {
        Self {
            definitions: DefinitionResolver::with_max_depth(catalogs.definitions, config.max_depth),
            templates: TemplateResolver::new(catalogs.templates),
            validators: Arc::new(ValidatorResolver::new(catalogs.validators)),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn definitions(&self) -> &DefinitionResolver {
        &self.definitions
    }

    pub fn templates(&self) -> &TemplateResolver {
        &self.templates
    }

    pub fn validators(&self) -> &ValidatorResolver {
        &self.validators
    }

    /// Resolve the definition for one namespace or a combination of them.
    pub async fn lookup(&self, names: impl Into<Names>) -> Result<Arc<Definition>> {
        let names = names.into();
        self.definitions.resolve(&names).await
    }

    /// Check `target` against a definition without building anything.
    ///
    /// Conformance problems, including validators that cannot be applied,
    /// are reported in the returned report. Definition and template
    /// resolution failures are returned as errors.
    pub async fn validate(
        &self,
        names: impl Into<Names>,
        target: &Object,
    ) -> Result<ValidationReport> {
        let names = names.into();
        let definition = self.lookup(&names).await?;
        let violations = self.validate_object(&definition, target, Vec::new()).await?;
        let report = ValidationReport::from_violations(violations);
        debug!(
            namespace = %names,
            is_valid = report.is_valid,
            violations = report.violations.len(),
            "validated target"
        );
        Ok(report)
    }

    /// Build an enforced instance from `target`.
    ///
    /// The target is copied, never aliased. Missing fields take their
    /// defaults, values are coerced to their declared types and validated,
    /// and nested objects are generated recursively. Every violation found is
    /// reported together in a single `invalid-target` error.
    pub async fn generate(
        &self,
        names: impl Into<Names>,
        target: Option<&Object>,
    ) -> Result<Instance> {
        let names = names.into();
        let working = target.cloned().unwrap_or_default();
        let definition = self.lookup(&names).await?;

        match self.assemble(definition, &working, Vec::new()).await? {
            Ok(instance) => {
                debug!(namespace = %names, fields = instance.len(), "generated instance");
                Ok(instance)
            }
            Err(violations) => {
                if self.config.log_rejections {
                    for violation in &violations {
                        warn!(namespace = %names, %violation, "target rejected");
                    }
                }
                Err(SchemaError::InvalidTarget {
                    namespace: names.to_string(),
                    violations,
                })
            }
        }
    }

    /// The definition an instance was generated from.
    pub fn definition(&self, instance: &Instance) -> Arc<Definition> {
        Arc::clone(instance.definition())
    }

    fn validate_object<'a>(
        &'a self,
        definition: &'a Definition,
        target: &'a Object,
        path: Vec<String>,
    ) -> BoxFuture<'a, Result<Vec<Violation>>> {
        async move {
            let checks = definition.properties.iter().map(|(field, spec)| {
                let path = child_path(&path, field);
                async move {
                    let Some(value) = target.get(field.as_str()) else {
                        if spec.requires_value() {
                            return Ok(vec![Violation::missing_required(path)]);
                        }
                        return Ok(Vec::new());
                    };

                    if spec.is_nested() {
                        let nested = nested_definition(field, spec)?;
                        return match value {
                            Value::Object(inner) => self.validate_object(nested, inner, path).await,
                            other => Ok(vec![not_an_object(path, other)]),
                        };
                    }

                    Ok(check_value(&self.validators, &path, spec, value)
                        .await
                        .err()
                        .into_iter()
                        .collect())
                }
            });

            let per_field = try_join_all(checks).await?;
            Ok(per_field.into_iter().flatten().collect())
        }
        .boxed()
    }

    fn assemble<'a>(
        &'a self,
        definition: Arc<Definition>,
        working: &'a Object,
        path: Vec<String>,
    ) -> BoxFuture<'a, Result<Assembly>> {
        async move {
            let prototype = match &definition.prototype {
                Some(names) => Some(self.templates.resolve(names).await?),
                None => None,
            };

            let outcomes = try_join_all(definition.properties.iter().map(|(field, spec)| {
                self.assemble_field(child_path(&path, field), spec, working.get(field.as_str()))
            }))
            .await?;

            let mut values = Object::new();
            let mut nested = IndexMap::new();
            let mut violations = Vec::new();
            for (field, outcome) in definition.properties.keys().zip(outcomes) {
                match outcome {
                    FieldOutcome::Absent => {}
                    FieldOutcome::Value(value) => {
                        values.insert(field.clone(), value);
                    }
                    FieldOutcome::Nested(child) => {
                        nested.insert(field.clone(), child);
                    }
                    FieldOutcome::Rejected(mut rejected) => violations.append(&mut rejected),
                }
            }

            if !violations.is_empty() {
                return Ok(Err(violations));
            }
            Ok(Ok(Instance::new(
                definition,
                prototype,
                values,
                nested,
                Arc::clone(&self.validators),
            )))
        }
        .boxed()
    }

    async fn assemble_field(
        &self,
        path: Vec<String>,
        spec: &FieldSpec,
        supplied: Option<&Value>,
    ) -> Result<FieldOutcome> {
        let value = match (supplied, &spec.default) {
            (Some(value), _) => value,
            (None, Some(default)) => default,
            (None, None) if spec.required => {
                return Ok(FieldOutcome::Rejected(vec![Violation::missing_required(path)]))
            }
            (None, None) => return Ok(FieldOutcome::Absent),
        };

        if spec.is_nested() {
            let field = path.last().map(String::as_str).unwrap_or_default();
            let nested = Arc::clone(nested_definition(field, spec)?);
            return match value {
                Value::Object(inner) => Ok(match self.assemble(nested, inner, path).await? {
                    Ok(child) => FieldOutcome::Nested(child),
                    Err(violations) => FieldOutcome::Rejected(violations),
                }),
                other => Ok(FieldOutcome::Rejected(vec![not_an_object(path, other)])),
            };
        }

        Ok(match check_value(&self.validators, &path, spec, value).await {
            Ok(coerced) => FieldOutcome::Value(coerced),
            Err(violation) => FieldOutcome::Rejected(vec![violation]),
        })
    }
}

fn nested_definition<'a>(field: &str, spec: &'a FieldSpec) -> Result<&'a Arc<Definition>> {
    spec.definition()
        .ok_or_else(|| SchemaError::InvalidFieldSpec {
            field: field.to_string(),
            reason: "nested definition was not resolved".to_string(),
        })
}

fn not_an_object(path: Vec<String>, value: &Value) -> Violation {
    Violation::failed_coerce(path, format!("expected object, observed {}", value.kind()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ValidatorPayload;
    use crate::types::{FieldType, Template};
    use crate::violation::ViolationKind;
    use regex::Regex;
    use serde_json::json;
    use std::collections::HashMap;

    fn catalogs() -> Catalogs {
        let mut definitions: HashMap<String, Arc<Definition>> = HashMap::new();
        definitions.insert(
            "person".into(),
            Arc::new(
                Definition::new()
                    .with_prototype("animal")
                    .field("fname", FieldSpec::new(FieldType::String).required())
                    .field("lname", FieldSpec::new(FieldType::String))
                    .field(
                        "role",
                        FieldSpec::new(FieldType::String).with_default("user"),
                    )
                    .field("dob", FieldSpec::new(FieldType::Date))
                    .field(
                        "email",
                        FieldSpec::new(FieldType::String).with_validator("email"),
                    )
                    .field("physicality", FieldSpec::nested("physicality")),
            ),
        );
        definitions.insert(
            "physicality".into(),
            Arc::new(
                Definition::new()
                    .field("heightCm", FieldSpec::new(FieldType::Number).required())
                    .field("weightKg", FieldSpec::new(FieldType::Number)),
            ),
        );
        definitions.insert(
            "broken".into(),
            Arc::new(
                Definition::new()
                    .field("x", FieldSpec::new(FieldType::String).with_validator("nope")),
            ),
        );

        let mut templates: HashMap<String, Arc<Template>> = HashMap::new();
        templates.insert(
            "animal".into(),
            Arc::new(Template::new().with_member("kingdom", "animalia")),
        );

        let mut validators: HashMap<String, Arc<ValidatorPayload>> = HashMap::new();
        validators.insert(
            "email".into(),
            Arc::new(ValidatorPayload::Pattern(Regex::new(r"^[^@\s]+@[^@\s]+$").unwrap())),
        );

        Catalogs::new(
            Arc::new(definitions),
            Arc::new(templates),
            Arc::new(validators),
        )
    }

    fn object(value: serde_json::Value) -> Object {
        match Value::from(value) {
            Value::Object(o) => o,
            other => panic!("expected object, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn generates_with_coercion_defaults_and_nesting() {
        let engine = SchemaEngine::new(catalogs());
        let target = object(json!({
            "fname": "Ada",
            "dob": "1815-12-10",
            "physicality": {"heightCm": "180"}
        }));
        let person = engine.generate("person", Some(&target)).await.unwrap();

        assert_eq!(person.get("fname"), Some(&Value::from("Ada")));
        assert_eq!(person.get("role"), Some(&Value::from("user")));
        assert_eq!(person.get("kingdom"), Some(&Value::from("animalia")));
        assert_eq!(person.get("dob").map(Value::kind), Some(crate::ValueKind::Date));
        assert!(!person.contains("lname"));
        let physicality = person.nested("physicality").unwrap();
        assert_eq!(physicality.get("heightCm"), Some(&Value::Number(180.0)));

        // the caller's object is untouched
        assert_eq!(target.get("physicality"), Some(&Value::from(json!({"heightCm": "180"}))));
    }

    #[test_log::test(tokio::test)]
    async fn generation_collects_every_violation() {
        let engine = SchemaEngine::new(catalogs());
        let target = object(json!({
            "dob": "wrong date",
            "email": "not-an-email",
            "physicality": {"weightKg": "81x"}
        }));
        let err = engine.generate("person", Some(&target)).await.unwrap_err();
        assert_eq!(err.code(), "invalid-target");

        let found: Vec<_> = err
            .violations()
            .iter()
            .map(|v| (v.path_string(), v.kind))
            .collect();
        assert_eq!(
            found,
            vec![
                ("fname".to_string(), ViolationKind::MissingRequiredProperty),
                ("dob".to_string(), ViolationKind::FailedCoerce),
                ("email".to_string(), ViolationKind::FailedValidator),
                (
                    "physicality.heightCm".to_string(),
                    ViolationKind::MissingRequiredProperty
                ),
                (
                    "physicality.weightKg".to_string(),
                    ViolationKind::FailedCoerce
                ),
            ]
        );
        assert!(err.to_string().contains("Invalid Date"));
    }

    #[tokio::test]
    async fn generation_drops_unknown_fields() {
        let engine = SchemaEngine::new(catalogs());
        let target = object(json!({"fname": "Ada", "nickname": "countess"}));
        let person = engine.generate("person", Some(&target)).await.unwrap();
        assert_eq!(person.get("nickname"), None);
        assert_eq!(person.keys().collect::<Vec<_>>(), vec!["fname", "role"]);
    }

    #[tokio::test]
    async fn generation_without_target_uses_defaults() {
        let engine = SchemaEngine::new(catalogs());
        let err = engine.generate("person", None).await.unwrap_err();
        assert_eq!(err.violations().len(), 1);
        assert_eq!(err.violations()[0].field(), "fname");

        let engine = SchemaEngine::new(catalogs());
        let target = object(json!({"heightCm": 1}));
        let physicality = engine.generate("physicality", Some(&target)).await.unwrap();
        assert!(physicality.prototype().is_none());
    }

    #[tokio::test]
    async fn nested_field_requires_an_object() {
        let engine = SchemaEngine::new(catalogs());
        let target = object(json!({"fname": "Ada", "physicality": 12}));
        let err = engine.generate("person", Some(&target)).await.unwrap_err();
        assert_eq!(err.violations()[0].detail, "expected object, observed number");
    }

    #[tokio::test]
    async fn validate_reports_without_building() {
        let engine = SchemaEngine::new(catalogs());
        let report = engine
            .validate(
                "person",
                &object(json!({"fname": "Ada", "physicality": {"heightCm": "tall"}})),
            )
            .await
            .unwrap();
        assert!(!report.is_valid());
        assert_eq!(report.violations.len(), 1);
        let violation = report.find("physicality.heightCm").unwrap();
        assert_eq!(violation.kind, ViolationKind::FailedCoerce);

        let report = engine
            .validate("person", &object(json!({"fname": "Ada"})))
            .await
            .unwrap();
        assert!(report.is_valid());
    }

    #[tokio::test]
    async fn missing_validator_is_a_violation() {
        let engine = SchemaEngine::new(catalogs());
        let report = engine
            .validate("broken", &object(json!({"x": "y"})))
            .await
            .unwrap();
        let violation = report.find("x").unwrap();
        assert_eq!(violation.kind, ViolationKind::FailedValidator);
        assert_eq!(violation.detail, "invalid-validator-namespace (nope)");
    }

    #[tokio::test]
    async fn unknown_namespace_is_an_error() {
        let engine = SchemaEngine::new(catalogs());
        let err = engine.validate("robot", &Object::new()).await.unwrap_err();
        assert!(matches!(err, SchemaError::InvalidDefinitionNamespace { .. }));
        let err = engine.generate("robot", None).await.unwrap_err();
        assert_eq!(err.code(), "invalid-definition-namespace");
    }

    #[tokio::test]
    async fn lookup_is_idempotent_and_definition_is_shared() {
        let engine = SchemaEngine::new(catalogs());
        let first = engine.lookup("person").await.unwrap();
        let second = engine.lookup("person").await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let person = engine
            .generate("person", Some(&object(json!({"fname": "Ada"}))))
            .await
            .unwrap();
        assert!(Arc::ptr_eq(&engine.definition(&person), &first));
    }

    #[test_log::test(tokio::test)]
    async fn config_depth_limit_is_applied() {
        let config = EngineConfig {
            max_depth: 1,
            log_rejections: false,
        };
        let engine = SchemaEngine::with_config(catalogs(), config);
        assert_eq!(engine.config().max_depth, 1);
        let err = engine.lookup("person").await.unwrap_err();
        assert_eq!(err.code(), "definition-too-deep");
        assert!(engine.lookup("physicality").await.is_ok());
    }
}
