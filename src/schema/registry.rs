//! Schema Registry
//!
//! In-memory set of named schemas with one active default. Schemas are
//! stored behind `Arc` so documents can be validated without holding any
//! lock on the registry.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use super::types::{Heuristics, Pricing, Schema, TagDef};
use crate::config::Config;

/// Suffix identifying schema files in a schema directory
pub const SCHEMA_FILE_SUFFIX: &str = ".ssml-schema.toml";

/// Name of the schema compiled into the binary
pub const EMBEDDED_SCHEMA_NAME: &str = "polly";

const EMBEDDED_POLLY_TOML: &str = include_str!("../../resources/schemas/polly.ssml-schema.toml");

/// Compile the embedded Amazon Polly schema
pub fn embedded_polly_schema() -> Result<Schema> {
    Schema::from_toml_str(EMBEDDED_POLLY_TOML).context("Failed to parse embedded Polly schema")
}

/// Raw TOML of the embedded schema, for writing it out as a user template
pub fn embedded_polly_toml() -> &'static str {
    EMBEDDED_POLLY_TOML
}

/// Simple in-memory schema registry
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    schemas: HashMap<String, Arc<Schema>>,
    active_schema: Option<String>,
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self {
            schemas: HashMap::new(),
            active_schema: None,
        }
    }

    /// Build the registry described by a configuration.
    ///
    /// Loading priority: embedded < schema directories in configured order.
    /// The effective schema becomes active, falling back to the embedded
    /// one when it is unknown.
    pub fn from_config(config: &Config) -> Self {
        let mut registry = Self::new();
        registry.add_embedded_polly_schema();

        for dir in &config.schema_dirs {
            if let Err(e) = registry.load_schema_dir(dir) {
                log::warn!("Failed to load schemas from {:?}: {:#}", dir, e);
            }
        }

        let requested = config.get_effective_schema();
        let active = requested.as_deref().unwrap_or(EMBEDDED_SCHEMA_NAME);
        if !registry.set_active_schema(active) {
            log::warn!(
                "Schema '{}' not found, falling back to '{}'",
                active,
                EMBEDDED_SCHEMA_NAME
            );
            registry.set_active_schema(EMBEDDED_SCHEMA_NAME);
        }

        registry
    }

    /// Add a schema, replacing any schema with the same name
    pub fn add_schema(&mut self, schema: Schema) {
        log::debug!("Registering schema '{}'", schema.name);
        self.schemas.insert(schema.name.clone(), Arc::new(schema));
    }

    /// Set the active schema
    pub fn set_active_schema(&mut self, name: &str) -> bool {
        if self.schemas.contains_key(name) {
            self.active_schema = Some(name.to_string());
            true
        } else {
            false
        }
    }

    /// Get the currently active schema
    pub fn get_active_schema(&self) -> Option<&Arc<Schema>> {
        self.active_schema
            .as_ref()
            .and_then(|name| self.schemas.get(name))
    }

    pub fn get_schema(&self, name: &str) -> Option<&Arc<Schema>> {
        self.schemas.get(name)
    }

    /// List all available schemas, sorted by name
    pub fn list_schemas(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.schemas.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Get a tag definition from the active schema
    pub fn get_tag(&self, name: &str) -> Option<&TagDef> {
        self.get_active_schema()?.tag(name)
    }

    /// Schema for a document: its modeline if it names a registered schema,
    /// otherwise the active schema
    pub fn schema_for_document(&self, content: &str) -> Option<Arc<Schema>> {
        self.detect_modeline_schema(content)
            .and_then(|name| self.schemas.get(&name))
            .or_else(|| self.get_active_schema())
            .cloned()
    }

    /// Add the embedded Polly schema
    pub fn add_embedded_polly_schema(&mut self) {
        match embedded_polly_schema() {
            Ok(schema) => self.add_schema(schema),
            Err(e) => {
                log::warn!(
                    "Failed to parse embedded Polly schema: {:#}. Using minimal fallback.",
                    e
                );
                self.add_minimal_polly_schema();
            }
        }
    }

    /// Minimal fallback: the Polly tag names with no attribute rules
    fn add_minimal_polly_schema(&mut self) {
        let tags = [
            "speak", "break", "emphasis", "lang", "mark", "p", "s", "phoneme", "prosody",
            "say-as", "sub", "w",
        ]
        .into_iter()
        .map(|name| {
            (
                name.to_string(),
                TagDef {
                    name: name.to_string(),
                    description: None,
                    required: Vec::new(),
                    attributes: Vec::new(),
                },
            )
        })
        .collect();

        self.add_schema(Schema {
            name: EMBEDDED_SCHEMA_NAME.to_string(),
            version: Some("minimal-fallback".to_string()),
            description: Some("Minimal fallback Polly schema".to_string()),
            root: "speak".to_string(),
            pricing: Pricing::default(),
            heuristics: Heuristics::default(),
            tags,
        });
    }

    /// Load every schema file in a directory.
    ///
    /// Files that fail to parse are logged and skipped. A missing directory
    /// is not an error. Returns the number of schemas loaded.
    pub fn load_schema_dir(&mut self, dir: &Path) -> Result<usize> {
        if !dir.is_dir() {
            log::debug!("Schema directory {:?} does not exist, skipping", dir);
            return Ok(0);
        }

        let mut paths = Vec::new();
        for entry in
            fs::read_dir(dir).with_context(|| format!("Failed to read schema directory {:?}", dir))?
        {
            let path = entry?.path();
            let is_schema = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.ends_with(SCHEMA_FILE_SUFFIX));
            if is_schema && path.is_file() {
                paths.push(path);
            }
        }
        // Deterministic override order within a directory
        paths.sort();

        let mut loaded = 0;
        for path in paths {
            match load_schema_file(&path) {
                Ok(schema) => {
                    log::info!("Loaded schema '{}' from {:?}", schema.name, path);
                    self.add_schema(schema);
                    loaded += 1;
                }
                Err(e) => log::warn!("Skipping schema file {:?}: {:#}", path, e),
            }
        }

        Ok(loaded)
    }

    /// Detect schema from a modeline comment in document content
    pub fn detect_modeline_schema(&self, content: &str) -> Option<String> {
        // Check first and last few lines for modeline
        let lines: Vec<&str> = content.lines().collect();
        let check_lines: Vec<&str> = if lines.len() <= 10 {
            lines
        } else {
            let mut check = Vec::new();
            check.extend_from_slice(&lines[0..5]);
            check.extend_from_slice(&lines[lines.len() - 5..]);
            check
        };

        for line in check_lines {
            // Look for patterns like:
            // <!-- ssml-schema=polly -->
            // <!-- vim: ssml-schema=polly -->
            if let Some(schema_name) = extract_schema_from_modeline(line) {
                if self.schemas.contains_key(&schema_name) {
                    return Some(schema_name);
                }
            }
        }

        None
    }
}

/// Read and compile one schema file
pub fn load_schema_file(path: &Path) -> Result<Schema> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
    Schema::from_toml_str(&content)
}

/// Extract schema name from a modeline comment
fn extract_schema_from_modeline(line: &str) -> Option<String> {
    const KEY: &str = "ssml-schema=";

    let comment_start = line.find("<!--")?;
    let comment = &line[comment_start..];
    let start = comment.find(KEY)? + KEY.len();
    let schema_part = &comment[start..];
    let end = schema_part
        .find(|c: char| !(c.is_alphanumeric() || c == '_' || c == '-'))
        .unwrap_or(schema_part.len());
    // "-->" may directly follow the name
    let schema_name = schema_part[..end].trim_end_matches('-');

    if schema_name.is_empty() {
        None
    } else {
        Some(schema_name.to_string())
    }
}
