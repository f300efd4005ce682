//! Catalog loading from a directory tree.
//!
//! ```text
//! <root>/
//!   definitions/<namespace>.yaml|yml|json
//!   templates/<namespace>.yaml|yml|json
//!   validators/<namespace>.yaml|yml|json
//! ```
//!
//! The namespace is the file stem. Validator files hold either
//! `pattern: <regex>` (with optional `flags`, e.g. `i`) or `enum: [...]`.

use std::path::{Path, PathBuf};

use construct_schema::{Definition, Template, ValidatorPayload, Value};
use regex::Regex;
use serde::de::DeserializeOwned;
use tokio::fs;
use tracing::{debug, warn};

use crate::error::{CatalogLoadError, Result};
use crate::memory::MemoryCatalog;

pub const DEFINITIONS_DIR: &str = "definitions";
pub const TEMPLATES_DIR: &str = "templates";
pub const VALIDATORS_DIR: &str = "validators";

/// Reads catalog files from a root directory into a [`MemoryCatalog`].
#[derive(Debug, Clone)]
pub struct DirectoryCatalog {
    root: PathBuf,
}

impl DirectoryCatalog {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Load `root` into a fresh catalog.
    pub async fn open(root: impl Into<PathBuf>) -> Result<MemoryCatalog> {
        Self::new(root).load().await
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn load(&self) -> Result<MemoryCatalog> {
        let catalog = MemoryCatalog::new();
        self.load_into(&catalog).await?;
        Ok(catalog)
    }

    /// Load every file under the root into `catalog`, replacing entries of
    /// the same name. Returns how many payloads were loaded.
    pub async fn load_into(&self, catalog: &MemoryCatalog) -> Result<usize> {
        match fs::metadata(&self.root).await {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                return Err(CatalogLoadError::NotADirectory {
                    path: self.root.clone(),
                })
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CatalogLoadError::NotADirectory {
                    path: self.root.clone(),
                })
            }
            Err(e) => return Err(CatalogLoadError::io(&self.root, e)),
        }

        let mut loaded = 0;
        for (name, definition) in self.read_kind::<Definition>(DEFINITIONS_DIR).await? {
            catalog.insert_definition(name, definition);
            loaded += 1;
        }
        for (name, template) in self.read_kind::<Template>(TEMPLATES_DIR).await? {
            catalog.insert_template(name, template);
            loaded += 1;
        }
        for (name, raw) in self.read_kind::<Value>(VALIDATORS_DIR).await? {
            match validator_from(raw) {
                Ok(validator) => {
                    catalog.insert_validator(name, validator);
                    loaded += 1;
                }
                Err(e) => {
                    warn!(validator = %name, %e, "skipping invalid validator");
                }
            }
        }

        debug!(root = %self.root.display(), loaded, "catalog directory loaded");
        Ok(loaded)
    }

    /// Parse every supported file in one sub-directory, in path order.
    async fn read_kind<T: DeserializeOwned>(&self, kind: &str) -> Result<Vec<(String, T)>> {
        let dir = self.root.join(kind);
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(CatalogLoadError::io(&dir, e)),
        };

        let mut paths = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| CatalogLoadError::io(&dir, e))?
        {
            paths.push(entry.path());
        }
        paths.sort();

        let mut parsed = Vec::new();
        for path in paths {
            let Some(format) = Format::of(&path) else {
                continue;
            };
            let Some(name) = path.file_stem().and_then(|s| s.to_str()).map(str::to_string) else {
                continue;
            };
            let content = fs::read_to_string(&path)
                .await
                .map_err(|e| CatalogLoadError::io(&path, e))?;
            match format.parse::<T>(&content) {
                Ok(payload) => parsed.push((name, payload)),
                Err(e) => {
                    warn!(?path, %e, "skipping invalid {kind} file");
                }
            }
        }
        Ok(parsed)
    }
}

#[derive(Debug, Clone, Copy)]
enum Format {
    Yaml,
    Json,
}

impl Format {
    fn of(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Some(Format::Yaml),
            Some("json") => Some(Format::Json),
            _ => None,
        }
    }

    fn parse<T: DeserializeOwned>(self, content: &str) -> std::result::Result<T, String> {
        match self {
            Format::Yaml => serde_yaml_ng::from_str(content).map_err(|e| e.to_string()),
            Format::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
        }
    }
}

/// Build a validator from its file contents. Shapes other than a pattern or
/// an enumeration load as `Unsupported`; a pattern that does not compile is
/// an error.
fn validator_from(raw: Value) -> std::result::Result<ValidatorPayload, regex::Error> {
    let Value::Object(members) = &raw else {
        return Ok(ValidatorPayload::Unsupported(raw));
    };

    if let Some(Value::String(pattern)) = members.get("pattern") {
        let flags = members.get("flags").and_then(Value::as_str).unwrap_or("");
        let source = if flags.is_empty() {
            pattern.clone()
        } else {
            format!("(?{flags}){pattern}")
        };
        return Regex::new(&source).map(ValidatorPayload::Pattern);
    }
    if let Some(Value::Array(values)) = members.get("enum") {
        return Ok(ValidatorPayload::Enumeration(values.clone()));
    }
    Ok(ValidatorPayload::Unsupported(raw))
}
