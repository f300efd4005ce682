//! Generated instances and their mutation enforcement.
//!
//! An [`Instance`] is the façade over a generated object. It holds the
//! field values, the nested child instances, a shared handle to the
//! definition it was generated from, and its base template. Every mutation
//! goes through the same per-field check generation uses, so an instance
//! stays conformant for its whole lifetime.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use tracing::trace;

use crate::check::check_value;
use crate::error::{Result, SchemaError};
use crate::types::{Definition, FieldSpec, Template};
use crate::validator::ValidatorResolver;
use crate::value::{Object, Value};

#[derive(Clone)]
pub struct Instance {
    definition: Arc<Definition>,
    prototype: Option<Arc<Template>>,
    values: Object,
    nested: IndexMap<String, Instance>,
    validators: Arc<ValidatorResolver>,
}

impl Instance {
    pub(crate) fn new(
        definition: Arc<Definition>,
        prototype: Option<Arc<Template>>,
        values: Object,
        nested: IndexMap<String, Instance>,
        validators: Arc<ValidatorResolver>,
    ) -> Self {
        Self {
            definition,
            prototype,
            values,
            nested,
            validators,
        }
    }

    /// The definition this instance was generated from. Shared, not copied.
    pub fn definition(&self) -> &Arc<Definition> {
        &self.definition
    }

    /// The base template, if the definition declares one.
    pub fn prototype(&self) -> Option<&Template> {
        self.prototype.as_deref()
    }

    /// A scalar field's value. Names the definition doesn't declare fall
    /// back to the base template's members.
    ///
    /// Nested fields are `None` here even when present; use
    /// [`nested`](Self::nested) for those.
    pub fn get(&self, field: &str) -> Option<&Value> {
        if self.definition.properties.contains_key(field) {
            return self.values.get(field);
        }
        self.prototype.as_ref().and_then(|template| template.get(field))
    }

    /// The child instance of a nested field.
    pub fn nested(&self, field: &str) -> Option<&Instance> {
        self.nested.get(field)
    }

    /// Mutable access to a nested child, whose own fields are enforced by
    /// its own definition.
    pub fn nested_mut(&mut self, field: &str) -> Option<&mut Instance> {
        self.nested.get_mut(field)
    }

    /// Whether the field currently holds a value or a child instance.
    pub fn contains(&self, field: &str) -> bool {
        self.values.contains_key(field) || self.nested.contains_key(field)
    }

    /// Names of the fields currently present, in declaration order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.definition
            .properties
            .keys()
            .filter(|field| self.contains(field))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len() + self.nested.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Assign a field.
    ///
    /// The value is coerced to the field's type and run through its
    /// validator. A value that fails is rejected and the field keeps its
    /// previous value.
    pub async fn set(&mut self, field: &str, value: impl Into<Value>) -> Result<()> {
        let spec = self.spec(field)?;
        if spec.readonly || spec.is_nested() {
            return Err(SchemaError::ReadonlyProperty {
                property: field.to_string(),
            });
        }

        let value = value.into();
        let path = [field.to_string()];
        let coerced = check_value(&self.validators, &path, &spec, &value)
            .await
            .map_err(|violation| SchemaError::RejectedValue {
                violation: Box::new(violation),
            })?;

        trace!(field, kind = %coerced.kind(), "field assigned");
        self.values.insert(field.to_string(), coerced);
        Ok(())
    }

    /// Remove an optional scalar field, returning what it held.
    ///
    /// Nested fields are read-only on the parent: they can be neither
    /// assigned nor removed.
    pub fn delete(&mut self, field: &str) -> Result<Option<Value>> {
        let spec = self.spec(field)?;
        if spec.required {
            return Err(SchemaError::RequiredPropertyDeletion {
                property: field.to_string(),
            });
        }
        if spec.readonly || spec.is_nested() {
            return Err(SchemaError::ReadonlyProperty {
                property: field.to_string(),
            });
        }

        trace!(field, "field deleted");
        Ok(self.values.shift_remove(field))
    }

    /// The base template is fixed when the instance is generated; replacing
    /// it always fails.
    pub fn replace_prototype(&mut self, _template: Template) -> Result<()> {
        Err(SchemaError::PrototypeLocked {
            namespace: self.definition.label(),
        })
    }

    /// The visible fields as a plain object, children included.
    pub fn to_object(&self) -> Object {
        let mut object = Object::new();
        for field in self.definition.properties.keys() {
            if let Some(value) = self.values.get(field) {
                object.insert(field.clone(), value.clone());
            } else if let Some(child) = self.nested.get(field) {
                object.insert(field.clone(), Value::Object(child.to_object()));
            }
        }
        object
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.to_object())
    }

    fn spec(&self, field: &str) -> Result<Arc<FieldSpec>> {
        self.definition
            .properties
            .get(field)
            .cloned()
            .ok_or_else(|| SchemaError::UnknownProperty {
                property: field.to_string(),
            })
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("definition", &self.definition.label())
            .field("fields", &self.to_object())
            .finish_non_exhaustive()
    }
}

impl Serialize for Instance {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}
