//! The per-field check shared by validation, generation and assignment.

use tracing::trace;

use crate::coerce::coerce;
use crate::types::FieldSpec;
use crate::validator::ValidatorResolver;
use crate::value::Value;
use crate::violation::Violation;

/// Coerce `value` to the field's type, then run the field's validator.
///
/// Returns the coerced value, or the violation explaining why the value is
/// not acceptable. Must not be called for `interface` fields.
pub(crate) async fn check_value(
    validators: &ValidatorResolver,
    path: &[String],
    spec: &FieldSpec,
    value: &Value,
) -> Result<Value, Violation> {
    let coerced = if spec.type_.accepts(value.kind()) {
        value.clone()
    } else {
        let coerced = coerce(value, spec.type_)
            .map_err(|e| Violation::failed_coerce(path.to_vec(), e.to_string()))?;
        if !spec.type_.accepts(coerced.kind()) {
            return Err(Violation::failed_coerce(
                path.to_vec(),
                format!("expected {}, observed {}", spec.type_, coerced.kind()),
            ));
        }
        trace!(
            field = %path.join("."),
            from = %value.kind(),
            to = %spec.type_,
            "coerced value"
        );
        coerced
    };

    if let Some(names) = &spec.validator {
        let verdict = validators.check(names, &coerced).await;
        if !verdict.is_valid {
            let detail = verdict
                .error
                .map_or_else(|| format!("rejected by {names}"), |e| e.to_string());
            return Err(Violation::failed_validator(path.to_vec(), detail));
        }
    }

    Ok(coerced)
}

/// Extend `path` with one more field name.
pub(crate) fn child_path(path: &[String], field: &str) -> Vec<String> {
    let mut child = path.to_vec();
    child.push(field.to_string());
    child
}
