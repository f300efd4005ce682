//! Template resolution.
//!
//! A single name resolves to the template registered in the catalog, shared
//! as-is. A list of names resolves each template and folds them, in list
//! order, into a fresh template: members of later templates replace members
//! of earlier ones.

use std::sync::Arc;

use futures::future::try_join_all;
use tracing::debug;

use crate::catalog::{Catalog, LookupOptions};
use crate::error::{Result, SchemaError};
use crate::types::{Names, Template};

/// Resolves template namespaces into base templates.
pub struct TemplateResolver {
    catalog: Arc<dyn Catalog<Template>>,
}

impl TemplateResolver {
    pub fn new(catalog: Arc<dyn Catalog<Template>>) -> Self {
        Self { catalog }
    }

    pub async fn resolve(&self, names: &Names) -> Result<Arc<Template>> {
        match names {
            Names::One(name) => self.resolve_namespace(name).await,
            Names::Many(names) => {
                let templates =
                    try_join_all(names.iter().map(|name| self.resolve_namespace(name))).await?;
                let combined = combine(&templates);
                debug!(
                    namespaces = %names.join(", "),
                    members = combined.len(),
                    "combined templates"
                );
                Ok(Arc::new(combined))
            }
        }
    }

    pub async fn resolve_namespace(&self, name: &str) -> Result<Arc<Template>> {
        self.catalog
            .lookup(name, LookupOptions::quiet())
            .await?
            .ok_or_else(|| SchemaError::InvalidTemplateNamespace {
                namespace: name.to_string(),
            })
    }
}

/// Fold templates in order into a new one, last-listed wins.
pub fn combine(templates: &[Arc<Template>]) -> Template {
    templates
        .iter()
        .fold(Template::new(), |mut combined, template| {
            combined.overlay(template);
            combined
        })
}
