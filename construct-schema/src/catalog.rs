//! The namespace catalog contract consumed by the resolvers.
//!
//! A catalog maps a namespace to a payload: a [`Definition`], a
//! [`Template`], or a [`ValidatorPayload`]. Lookups are asynchronous because
//! the backing store may be remote or lazily loaded. The resolvers always
//! look up quietly and turn an absent payload into their own typed error.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;
use thiserror::Error;

use crate::types::{Definition, Template};
use crate::value::Value;

/// Options passed with every lookup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LookupOptions {
    /// When set, a missing name yields `Ok(None)` instead of an error.
    pub quiet: bool,
}

impl LookupOptions {
    pub fn quiet() -> Self {
        Self { quiet: true }
    }

    pub fn strict() -> Self {
        Self { quiet: false }
    }
}

/// Errors raised by a catalog implementation.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Missing name on a non-quiet lookup
    #[error("namespace not found: {namespace}")]
    NotFound { namespace: String },

    /// The backing store failed
    #[error("catalog backend failure: {message}")]
    Backend { message: String },
}

impl CatalogError {
    pub fn not_found(namespace: impl Into<String>) -> Self {
        Self::NotFound {
            namespace: namespace.into(),
        }
    }

    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }
}

/// A name → payload registry.
#[async_trait]
pub trait Catalog<P>: Send + Sync
where
    P: Send + Sync + 'static,
{
    /// Look up `name`. With `options.quiet` a missing name is `Ok(None)`;
    /// otherwise it is `CatalogError::NotFound`.
    async fn lookup(
        &self,
        name: &str,
        options: LookupOptions,
    ) -> Result<Option<Arc<P>>, CatalogError>;
}

/// Any map of shared payloads is a catalog.
#[async_trait]
impl<P> Catalog<P> for HashMap<String, Arc<P>>
where
    P: Send + Sync + 'static,
{
    async fn lookup(
        &self,
        name: &str,
        options: LookupOptions,
    ) -> Result<Option<Arc<P>>, CatalogError> {
        match self.get(name) {
            Some(payload) => Ok(Some(Arc::clone(payload))),
            None if options.quiet => Ok(None),
            None => Err(CatalogError::not_found(name)),
        }
    }
}

/// A predicate validator.
pub type PredicateFn = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// A registered validator.
#[derive(Clone)]
pub enum ValidatorPayload {
    /// Passes when the stringified value matches.
    Pattern(Regex),
    /// Passes when the function returns true.
    Predicate(PredicateFn),
    /// Passes when the value equals one of the listed values.
    Enumeration(Vec<Value>),
    /// Something registered under a validator name that is none of the
    /// above. Applying it is an `invalid-validator` error.
    Unsupported(Value),
}

impl ValidatorPayload {
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        ValidatorPayload::Predicate(Arc::new(f))
    }

    pub fn enumeration<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        ValidatorPayload::Enumeration(values.into_iter().map(Into::into).collect())
    }

    /// Short name of the payload's shape, used in error messages.
    pub fn shape(&self) -> String {
        match self {
            ValidatorPayload::Pattern(_) => "pattern".to_string(),
            ValidatorPayload::Predicate(_) => "predicate".to_string(),
            ValidatorPayload::Enumeration(_) => "enumeration".to_string(),
            ValidatorPayload::Unsupported(value) => value.kind().to_string(),
        }
    }
}

impl fmt::Debug for ValidatorPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidatorPayload::Pattern(re) => f.debug_tuple("Pattern").field(&re.as_str()).finish(),
            ValidatorPayload::Predicate(_) => f.write_str("Predicate(..)"),
            ValidatorPayload::Enumeration(values) => {
                f.debug_tuple("Enumeration").field(values).finish()
            }
            ValidatorPayload::Unsupported(value) => {
                f.debug_tuple("Unsupported").field(value).finish()
            }
        }
    }
}

/// The three catalogs the engine resolves against.
#[derive(Clone)]
pub struct Catalogs {
    pub definitions: Arc<dyn Catalog<Definition>>,
    pub templates: Arc<dyn Catalog<Template>>,
    pub validators: Arc<dyn Catalog<ValidatorPayload>>,
}

impl Catalogs {
    pub fn new(
        definitions: Arc<dyn Catalog<Definition>>,
        templates: Arc<dyn Catalog<Template>>,
        validators: Arc<dyn Catalog<ValidatorPayload>>,
    ) -> Self {
        Self {
            definitions,
            templates,
            validators,
        }
    }

    /// Use one catalog that serves all three payload kinds.
    pub fn shared<C>(catalog: Arc<C>) -> Self
    where
        C: Catalog<Definition> + Catalog<Template> + Catalog<ValidatorPayload> + 'static,
    {
        Self {
            definitions: catalog.clone(),
            templates: catalog.clone(),
            validators: catalog,
        }
    }
}

impl fmt::Debug for Catalogs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Catalogs").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map() -> HashMap<String, Arc<Template>> {
        let mut map = HashMap::new();
        map.insert(
            "animal".to_string(),
            Arc::new(Template::new().with_member("legs", 4)),
        );
        map
    }

    #[tokio::test]
    async fn quiet_lookup_of_missing_name_is_none() {
        let catalog = map();
        let found = catalog
            .lookup("plant", LookupOptions::quiet())
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn strict_lookup_of_missing_name_errors() {
        let catalog = map();
        let err = catalog
            .lookup("plant", LookupOptions::strict())
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::NotFound { namespace } if namespace == "plant"));
    }

    #[tokio::test]
    async fn lookup_shares_the_registered_payload() {
        let catalog = map();
        let a = catalog.lookup("animal", LookupOptions::quiet()).await.unwrap().unwrap();
        let b = catalog.lookup("animal", LookupOptions::quiet()).await.unwrap().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn payload_shapes() {
        assert_eq!(ValidatorPayload::enumeration(["a", "b"]).shape(), "enumeration");
        assert_eq!(ValidatorPayload::predicate(|_| true).shape(), "predicate");
        assert_eq!(ValidatorPayload::Unsupported(Value::from(3)).shape(), "number");
    }
}
