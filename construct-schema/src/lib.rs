//! Runtime schema resolution and schema-enforced object generation
//!
//! `construct-schema` resolves three kinds of named things from pluggable
//! catalogs and uses them to build objects that stay conformant:
//!
//! - **Definitions**: field specs keyed by name, resolved recursively through
//!   nested `interface` fields and frozen per namespace
//! - **Templates**: base objects that supply fallback members to instances
//! - **Validators**: regex patterns, predicates or enumerations applied to
//!   coerced field values
//!
//! # Architecture
//!
//! - **Catalog-agnostic**: resolution goes through the async [`Catalog`] trait;
//!   `construct-catalog` provides in-memory and on-disk implementations
//! - **Shared, not copied**: resolved definitions are `Arc`s; instances point
//!   back at the definition they came from
//! - **Enforced instances**: [`Instance`] checks every assignment and deletion
//!   against its definition
//!
//! ```no_run
//! # async fn demo(catalogs: construct_schema::Catalogs) -> construct_schema::Result<()> {
//! use construct_schema::{Object, SchemaEngine};
//!
//! let engine = SchemaEngine::new(catalogs);
//! let mut target = Object::new();
//! target.insert("fname".into(), "Ada".into());
//! let mut person = engine.generate("person", Some(&target)).await?;
//! person.set("lname", "Lovelace").await?;
//! # Ok(())
//! # }
//! ```

pub mod catalog;
mod check;
pub mod coerce;
pub mod config;
pub mod definition;
pub mod engine;
pub mod error;
pub mod instance;
pub mod prototype;
pub mod types;
pub mod validator;
pub mod value;
pub mod violation;

pub use catalog::{Catalog, CatalogError, Catalogs, LookupOptions, PredicateFn, ValidatorPayload};
pub use coerce::coerce;
pub use config::EngineConfig;
pub use definition::DefinitionResolver;
pub use engine::SchemaEngine;
pub use error::{CoerceError, Result, SchemaError};
pub use instance::Instance;
pub use prototype::TemplateResolver;
pub use types::{Definition, FieldSpec, FieldType, Names, Template};
pub use validator::{ValidatorResolver, ValidatorVerdict};
pub use value::{Object, Value, ValueKind};
pub use violation::{ValidationReport, Violation, ViolationKind};
