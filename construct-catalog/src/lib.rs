//! Namespace catalogs for `construct-schema`
//!
//! - [`MemoryCatalog`]: a concurrent in-memory registry serving definitions,
//!   templates and validators through the `Catalog` trait
//! - [`DirectoryCatalog`]: loads one YAML or JSON file per namespace from a
//!   directory tree into a `MemoryCatalog`

pub mod directory;
pub mod error;
pub mod memory;

pub use directory::DirectoryCatalog;
pub use error::{CatalogLoadError, Result};
pub use memory::MemoryCatalog;
