//! In-memory catalog.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use construct_schema::{
    Catalog, CatalogError, Catalogs, Definition, LookupOptions, Template, Value,
    ValidatorPayload,
};
use dashmap::DashMap;
use regex::Regex;

/// A thread-safe name → payload registry serving definitions, templates and
/// validators.
///
/// Entries can be added or removed while engines hold the catalog. An
/// engine's frozen definitions are not affected by later changes.
#[derive(Default)]
pub struct MemoryCatalog {
    definitions: DashMap<String, Arc<Definition>>,
    templates: DashMap<String, Arc<Template>>,
    validators: DashMap<String, Arc<ValidatorPayload>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_definition(self, name: impl Into<String>, definition: Definition) -> Self {
        self.insert_definition(name, definition);
        self
    }

    pub fn with_template(self, name: impl Into<String>, template: Template) -> Self {
        self.insert_template(name, template);
        self
    }

    pub fn with_validator(self, name: impl Into<String>, validator: ValidatorPayload) -> Self {
        self.insert_validator(name, validator);
        self
    }

    pub fn with_pattern(self, name: impl Into<String>, pattern: Regex) -> Self {
        self.with_validator(name, ValidatorPayload::Pattern(pattern))
    }

    pub fn with_predicate<F>(self, name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.with_validator(name, ValidatorPayload::predicate(predicate))
    }

    pub fn with_enumeration<I, V>(self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.with_validator(name, ValidatorPayload::enumeration(values))
    }

    pub fn insert_definition(
        &self,
        name: impl Into<String>,
        definition: Definition,
    ) -> Option<Arc<Definition>> {
        self.definitions.insert(name.into(), Arc::new(definition))
    }

    pub fn insert_template(
        &self,
        name: impl Into<String>,
        template: Template,
    ) -> Option<Arc<Template>> {
        self.templates.insert(name.into(), Arc::new(template))
    }

    pub fn insert_validator(
        &self,
        name: impl Into<String>,
        validator: ValidatorPayload,
    ) -> Option<Arc<ValidatorPayload>> {
        self.validators.insert(name.into(), Arc::new(validator))
    }

    pub fn remove_definition(&self, name: &str) -> Option<Arc<Definition>> {
        self.definitions.remove(name).map(|(_, v)| v)
    }

    pub fn remove_template(&self, name: &str) -> Option<Arc<Template>> {
        self.templates.remove(name).map(|(_, v)| v)
    }

    pub fn remove_validator(&self, name: &str) -> Option<Arc<ValidatorPayload>> {
        self.validators.remove(name).map(|(_, v)| v)
    }

    /// Total number of registered payloads of all kinds.
    pub fn len(&self) -> usize {
        self.definitions.len() + self.templates.len() + self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn definition_count(&self) -> usize {
        self.definitions.len()
    }

    pub fn template_count(&self) -> usize {
        self.templates.len()
    }

    pub fn validator_count(&self) -> usize {
        self.validators.len()
    }

    /// Hand the catalog to an engine as all three catalogs at once.
    pub fn into_catalogs(self) -> Catalogs {
        Catalogs::shared(Arc::new(self))
    }
}

impl fmt::Debug for MemoryCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryCatalog")
            .field("definitions", &self.definitions.len())
            .field("templates", &self.templates.len())
            .field("validators", &self.validators.len())
            .finish()
    }
}

fn lookup_in<P>(
    map: &DashMap<String, Arc<P>>,
    name: &str,
    options: LookupOptions,
) -> Result<Option<Arc<P>>, CatalogError> {
    match map.get(name) {
        Some(entry) => Ok(Some(Arc::clone(entry.value()))),
        None if options.quiet => Ok(None),
        None => Err(CatalogError::not_found(name)),
    }
}

#[async_trait]
impl Catalog<Definition> for MemoryCatalog {
    async fn lookup(
        &self,
        name: &str,
        options: LookupOptions,
    ) -> Result<Option<Arc<Definition>>, CatalogError> {
        lookup_in(&self.definitions, name, options)
    }
}

#[async_trait]
impl Catalog<Template> for MemoryCatalog {
    async fn lookup(
        &self,
        name: &str,
        options: LookupOptions,
    ) -> Result<Option<Arc<Template>>, CatalogError> {
        lookup_in(&self.templates, name, options)
    }
}

#[async_trait]
impl Catalog<ValidatorPayload> for MemoryCatalog {
    async fn lookup(
        &self,
        name: &str,
        options: LookupOptions,
    ) -> Result<Option<Arc<ValidatorPayload>>, CatalogError> {
        lookup_in(&self.validators, name, options)
    }
}
