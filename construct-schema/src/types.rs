//! Core definition and template types.
//!
//! All types serialize to/from YAML or JSON via serde. A [`Definition`]
//! describes the shape of an object: its fields and an optional reference to
//! the base [`Template`] generated instances inherit from.

use std::fmt;
use std::sync::{Arc, OnceLock};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::value::{Object, Value, ValueKind};

/// One namespace or an ordered list of namespaces.
///
/// Every resolver accepts either form: a single name resolves to the
/// registered payload, a list resolves each name and combines the results.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Names {
    One(String),
    Many(Vec<String>),
}

impl Names {
    pub fn is_many(&self) -> bool {
        matches!(self, Names::Many(_))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        let names: &[String] = match self {
            Names::One(name) => std::slice::from_ref(name),
            Names::Many(names) => names,
        };
        names.iter().map(String::as_str)
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.iter().map(str::to_string).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.iter().any(|n| n == name)
    }
}

impl fmt::Display for Names {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Names::One(name) => f.write_str(name),
            Names::Many(names) => write!(f, "[{}]", names.join(", ")),
        }
    }
}

impl From<&str> for Names {
    fn from(name: &str) -> Self {
        Names::One(name.to_string())
    }
}

impl From<String> for Names {
    fn from(name: String) -> Self {
        Names::One(name)
    }
}

impl From<&String> for Names {
    fn from(name: &String) -> Self {
        Names::One(name.clone())
    }
}

impl From<Vec<String>> for Names {
    fn from(names: Vec<String>) -> Self {
        Names::Many(names)
    }
}

impl From<Vec<&str>> for Names {
    fn from(names: Vec<&str>) -> Self {
        Names::Many(names.into_iter().map(str::to_string).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Names {
    fn from(names: [&str; N]) -> Self {
        Names::Many(names.iter().map(|n| n.to_string()).collect())
    }
}

impl From<&Names> for Names {
    fn from(names: &Names) -> Self {
        names.clone()
    }
}

/// The declared type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    BigInt,
    Date,
    #[serde(alias = "boolean")]
    Bool,
    /// A nested object conforming to another definition.
    #[serde(alias = "schema")]
    Interface,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::BigInt => "bigint",
            FieldType::Date => "date",
            FieldType::Bool => "bool",
            FieldType::Interface => "interface",
        }
    }

    /// Whether a value of runtime type `kind` already satisfies this type.
    pub fn accepts(&self, kind: ValueKind) -> bool {
        matches!(
            (self, kind),
            (FieldType::String, ValueKind::String)
                | (FieldType::Number, ValueKind::Number)
                | (FieldType::BigInt, ValueKind::BigInt)
                | (FieldType::Date, ValueKind::Date)
                | (FieldType::Bool, ValueKind::Bool)
                | (FieldType::Interface, ValueKind::Object)
        )
    }

    pub fn is_nested(&self) -> bool {
        matches!(self, FieldType::Interface)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The schema for a single named field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    #[serde(rename = "type")]
    pub type_: FieldType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub readonly: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validator: Option<Names>,
    /// Definition namespace(s) of an `interface` field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<Names>,
    /// Nested definition, filled in once by the definition resolver.
    #[serde(skip)]
    definition: OnceLock<Arc<Definition>>,
}

impl FieldSpec {
    pub fn new(type_: FieldType) -> Self {
        Self {
            type_,
            default: None,
            required: false,
            readonly: false,
            validator: None,
            namespace: None,
            definition: OnceLock::new(),
        }
    }

    /// A nested field whose value conforms to the definition(s) at `namespace`.
    pub fn nested(namespace: impl Into<Names>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            ..Self::new(FieldType::Interface)
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn readonly(mut self) -> Self {
        self.readonly = true;
        self
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn with_validator(mut self, validator: impl Into<Names>) -> Self {
        self.validator = Some(validator.into());
        self
    }

    pub fn is_nested(&self) -> bool {
        self.type_.is_nested()
    }

    /// A field that must be supplied because nothing can stand in for it.
    pub fn requires_value(&self) -> bool {
        self.required && self.default.is_none()
    }

    /// The resolved nested definition, once the resolver has filled it in.
    pub fn definition(&self) -> Option<&Arc<Definition>> {
        self.definition.get()
    }

    /// A copy with no nested definition cached.
    pub(crate) fn detached(&self) -> Self {
        Self {
            definition: OnceLock::new(),
            ..self.clone()
        }
    }

    /// Stores the resolved nested definition. Later writes are ignored; the
    /// value computed by a racing resolution is identical.
    pub(crate) fn cache_definition(&self, definition: Arc<Definition>) -> &Arc<Definition> {
        self.definition.get_or_init(|| definition)
    }
}

/// A definition: a field map plus an optional base template reference.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Definition {
    /// Stamped by the resolver; for combined definitions, the source names.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<Names>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prototype: Option<Names>,
    #[serde(default)]
    pub properties: IndexMap<String, Arc<FieldSpec>>,
}

impl Definition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prototype(mut self, prototype: impl Into<Names>) -> Self {
        self.prototype = Some(prototype.into());
        self
    }

    /// Add (or replace) a field.
    pub fn field(mut self, name: impl Into<String>, spec: FieldSpec) -> Self {
        self.properties.insert(name.into(), Arc::new(spec));
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<FieldSpec>> {
        self.properties.get(name)
    }

    pub fn is_combined(&self) -> bool {
        self.namespace.as_ref().is_some_and(Names::is_many)
    }

    /// Display label used in logs and error messages.
    pub fn label(&self) -> String {
        self.namespace
            .as_ref()
            .map_or_else(|| "<anonymous>".to_string(), Names::to_string)
    }
}

/// A base template: the members an instance inherits before its own fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Template {
    members: Object,
}

impl Template {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_member(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.members.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.members.get(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.members.insert(name.into(), value.into())
    }

    pub fn members(&self) -> &Object {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Copy every member of `other` onto this template, replacing members
    /// that share a name.
    pub fn overlay(&mut self, other: &Template) {
        for (name, value) in &other.members {
            self.members.insert(name.clone(), value.clone());
        }
    }
}

impl From<Object> for Template {
    fn from(members: Object) -> Self {
        Self { members }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_deserialize_from_string_or_list() {
        let one: Names = serde_json::from_str(r#""person""#).unwrap();
        assert_eq!(one, Names::from("person"));
        let many: Names = serde_json::from_str(r#"["a", "b"]"#).unwrap();
        assert_eq!(many, Names::from(["a", "b"]));
        assert_eq!(many.to_string(), "[a, b]");
        assert_eq!(many.iter().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn field_type_accepts_aliases() {
        let t: FieldType = serde_json::from_str(r#""boolean""#).unwrap();
        assert_eq!(t, FieldType::Bool);
        let t: FieldType = serde_json::from_str(r#""bigint""#).unwrap();
        assert_eq!(t, FieldType::BigInt);
        let t: FieldType = serde_json::from_str(r#""schema""#).unwrap();
        assert_eq!(t, FieldType::Interface);
    }

    #[test]
    fn field_spec_from_json() {
        let spec: FieldSpec = serde_json::from_str(
            r#"{"type": "string", "default": "user", "required": true, "validator": "app.auth.accessLevels"}"#,
        )
        .unwrap();
        assert_eq!(spec.type_, FieldType::String);
        assert_eq!(spec.default, Some(Value::from("user")));
        assert!(spec.required);
        assert!(!spec.readonly);
        assert!(!spec.requires_value());
        assert_eq!(spec.validator, Some(Names::from("app.auth.accessLevels")));
        assert!(spec.definition().is_none());
    }

    #[test]
    fn definition_keeps_field_declaration_order() {
        let def: Definition = serde_json::from_str(
            r#"{"prototype": "animal", "properties": {
                "fname": {"type": "string", "required": true},
                "physicality": {"type": "interface", "namespace": "physicality"},
                "accessLevel": {"type": "string", "default": "user"}
            }}"#,
        )
        .unwrap();
        let names: Vec<_> = def.properties.keys().cloned().collect();
        assert_eq!(names, vec!["fname", "physicality", "accessLevel"]);
        assert_eq!(def.prototype, Some(Names::from("animal")));
        assert!(def.get("physicality").unwrap().is_nested());
        assert!(def.namespace.is_none());
    }

    #[test]
    fn cached_nested_definition_is_written_once() {
        let spec = FieldSpec::nested("physicality");
        let first = Arc::new(Definition::new().field("a", FieldSpec::new(FieldType::Number)));
        let second = Arc::new(Definition::new());
        spec.cache_definition(first.clone());
        spec.cache_definition(second);
        assert!(Arc::ptr_eq(spec.definition().unwrap(), &first));
    }

    #[test]
    fn template_overlay_last_wins() {
        let mut base = Template::new().with_member("legs", 4).with_member("sound", "none");
        base.overlay(&Template::new().with_member("sound", "bark"));
        assert_eq!(base.get("sound"), Some(&Value::from("bark")));
        assert_eq!(base.get("legs"), Some(&Value::from(4)));
        assert_eq!(base.len(), 2);
    }
}
