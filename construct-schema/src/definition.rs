//! Definition resolution.
//!
//! A single namespace resolves to the catalog's definition, stamped with its
//! namespace and frozen: the first resolution is cached and every later
//! resolution of that name returns the same shared definition. A list of
//! namespaces resolves each one and combines them into a fresh, uncached
//! definition.
//!
//! After either, every `interface` field is resolved recursively and the
//! nested definition is cached on the field spec.

use std::sync::Arc;

use dashmap::DashMap;
use futures::future::{try_join_all, BoxFuture, FutureExt};
use tracing::{debug, trace};

use crate::catalog::{Catalog, LookupOptions};
use crate::config::DEFAULT_MAX_DEPTH;
use crate::error::{Result, SchemaError};
use crate::types::{Definition, Names};

/// Resolves definition namespaces into definitions.
pub struct DefinitionResolver {
    catalog: Arc<dyn Catalog<Definition>>,
    frozen: DashMap<String, Arc<Definition>>,
    max_depth: usize,
}

impl DefinitionResolver {
    pub fn new(catalog: Arc<dyn Catalog<Definition>>) -> Self {
        Self::with_max_depth(catalog, DEFAULT_MAX_DEPTH)
    }

    pub fn with_max_depth(catalog: Arc<dyn Catalog<Definition>>, max_depth: usize) -> Self {
        Self {
            catalog,
            frozen: DashMap::new(),
            max_depth,
        }
    }

    /// Resolve `names` and every nested definition below it.
    pub async fn resolve(&self, names: &Names) -> Result<Arc<Definition>> {
        self.resolve_within(names, Vec::new()).await
    }

    /// Number of frozen single-namespace definitions.
    pub fn frozen_count(&self) -> usize {
        self.frozen.len()
    }

    /// `chain` holds the namespaces of the enclosing nested fields.
    fn resolve_within<'a>(
        &'a self,
        names: &'a Names,
        chain: Vec<String>,
    ) -> BoxFuture<'a, Result<Arc<Definition>>> {
        async move {
            let label = names.to_string();
            if chain.len() >= self.max_depth {
                return Err(SchemaError::DefinitionTooDeep {
                    namespace: label,
                    max_depth: self.max_depth,
                });
            }

            let definition = match names {
                Names::One(name) => self.resolve_namespace(name).await?,
                Names::Many(names) => {
                    let sources =
                        try_join_all(names.iter().map(|name| self.resolve_namespace(name)))
                            .await?;
                    let combined = combine(&sources);
                    debug!(
                        namespace = %label,
                        fields = combined.properties.len(),
                        "combined definitions"
                    );
                    Arc::new(combined)
                }
            };

            let mut chain = chain;
            chain.push(label);
            self.resolve_nested(&definition, &chain).await?;
            Ok(definition)
        }
        .boxed()
    }

    async fn resolve_nested(&self, definition: &Definition, chain: &[String]) -> Result<()> {
        let nested_fields = definition
            .properties
            .iter()
            .filter(|(_, spec)| spec.is_nested());

        try_join_all(nested_fields.map(|(field, spec)| async move {
            let namespace = spec.namespace.as_ref().ok_or_else(|| {
                SchemaError::InvalidFieldSpec {
                    field: field.clone(),
                    reason: "interface field declares no namespace".to_string(),
                }
            })?;
            let label = namespace.to_string();
            if chain.contains(&label) {
                let mut cycle = chain.to_vec();
                cycle.push(label);
                return Err(SchemaError::RecursiveDefinition {
                    chain: cycle.join(" -> "),
                });
            }
            // Already resolved under another parent; its depth still counts here.
            if let Some(cached) = spec.definition() {
                return self.check_depth(&label, cached, chain.len());
            }
            let nested = self.resolve_within(namespace, chain.to_vec()).await?;
            spec.cache_definition(nested);
            trace!(field = %field, namespace = %namespace, "nested definition resolved");
            Ok::<_, SchemaError>(())
        }))
        .await?;
        Ok(())
    }

    /// Walk an already resolved subtree rooted at nesting level `depth`.
    fn check_depth(&self, label: &str, definition: &Definition, depth: usize) -> Result<()> {
        if depth >= self.max_depth {
            return Err(SchemaError::DefinitionTooDeep {
                namespace: label.to_string(),
                max_depth: self.max_depth,
            });
        }
        for spec in definition.properties.values() {
            if let (Some(nested), Some(namespace)) = (spec.definition(), &spec.namespace) {
                self.check_depth(&namespace.to_string(), nested, depth + 1)?;
            }
        }
        Ok(())
    }

    async fn resolve_namespace(&self, name: &str) -> Result<Arc<Definition>> {
        if let Some(frozen) = self.frozen.get(name).map(|entry| Arc::clone(entry.value())) {
            trace!(namespace = name, "definition cache hit");
            return Ok(frozen);
        }

        let raw = self
            .catalog
            .lookup(name, LookupOptions::quiet())
            .await?
            .ok_or_else(|| SchemaError::InvalidDefinitionNamespace {
                namespace: name.to_string(),
            })?;

        // Field specs are copied so nested caches belong to this resolver.
        let stamped = Arc::new(Definition {
            namespace: raw
                .namespace
                .clone()
                .or_else(|| Some(Names::One(name.to_string()))),
            prototype: raw.prototype.clone(),
            properties: raw
                .properties
                .iter()
                .map(|(field, spec)| (field.clone(), Arc::new(spec.detached())))
                .collect(),
        });

        // A concurrent first resolution may have won; keep its value.
        let frozen = Arc::clone(
            self.frozen
                .entry(name.to_string())
                .or_insert(stamped)
                .value(),
        );
        debug!(
            namespace = name,
            fields = frozen.properties.len(),
            "definition frozen"
        );
        Ok(frozen)
    }
}

/// Combine definitions in order. Namespaces and template references are
/// concatenated; fields are copied so a later definition's field replaces
/// an earlier one of the same name.
pub fn combine(definitions: &[Arc<Definition>]) -> Definition {
    let mut namespace = Vec::new();
    let mut prototype = Vec::new();
    let mut combined = Definition::new();

    for definition in definitions {
        if let Some(names) = &definition.namespace {
            namespace.extend(names.to_vec());
        }
        if let Some(names) = &definition.prototype {
            prototype.extend(names.to_vec());
        }
        for (field, spec) in &definition.properties {
            combined.properties.insert(field.clone(), Arc::clone(spec));
        }
    }

    combined.namespace = Some(Names::Many(namespace));
    if !prototype.is_empty() {
        combined.prototype = Some(Names::Many(prototype));
    }
    combined
}
