//! Schema Types
//!
//! A schema describes what a target speech engine accepts: its root element,
//! supported tags, required attributes and legal attribute values. Schemas
//! are written as TOML files (`SchemaFile`) and compiled into an immutable
//! runtime `Schema` optimized for lookups.

use std::collections::HashMap;
use std::fmt;

use anyhow::{bail, Context, Result};
use regex::Regex;
use serde::Deserialize;

/// Root schema file structure (matches TOML)
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SchemaFile {
    pub schema: SchemaMeta,
    #[serde(default)]
    pub pricing: Pricing,
    #[serde(default)]
    pub heuristics: Heuristics,
    #[serde(default)]
    pub tags: Vec<TagEntry>,
}

/// Schema metadata
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SchemaMeta {
    pub name: String,
    pub version: Option<String>,
    pub description: Option<String>,
    #[serde(default = "default_root")]
    pub root: String,
}

/// Per-character synthesis prices in USD per million characters
#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
pub struct Pricing {
    #[serde(default = "default_standard_rate")]
    pub standard_per_million: f64,
    #[serde(default = "default_neural_rate")]
    pub neural_per_million: f64,
}

/// Thresholds for the advisory quality checks
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Heuristics {
    #[serde(default = "default_max_segment_chars")]
    pub max_segment_chars: usize,
    #[serde(default = "default_max_nesting_depth")]
    pub max_nesting_depth: usize,
    /// Self-closing tags that split the text into segments
    #[serde(default = "default_segment_break_tags")]
    pub segment_break_tags: Vec<String>,
}

/// Tag definition as written in a schema file
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TagEntry {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub required: Vec<String>,
    #[serde(default)]
    pub attributes: Vec<AttributeEntry>,
}

/// Attribute definition as written in a schema file
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AttributeEntry {
    pub name: String,
    pub description: Option<String>,
    /// Literal legal values
    #[serde(default)]
    pub values: Vec<String>,
    /// Regular expressions a legal value must match in full
    #[serde(default)]
    pub patterns: Vec<String>,
}

fn default_root() -> String {
    "speak".to_string()
}

fn default_standard_rate() -> f64 {
    4.0
}

fn default_neural_rate() -> f64 {
    16.0
}

fn default_max_segment_chars() -> usize {
    500
}

fn default_max_nesting_depth() -> usize {
    5
}

fn default_segment_break_tags() -> Vec<String> {
    vec!["break".to_string()]
}

impl Default for Pricing {
    fn default() -> Self {
        Self {
            standard_per_million: default_standard_rate(),
            neural_per_million: default_neural_rate(),
        }
    }
}

impl Default for Heuristics {
    fn default() -> Self {
        Self {
            max_segment_chars: default_max_segment_chars(),
            max_nesting_depth: default_max_nesting_depth(),
            segment_break_tags: default_segment_break_tags(),
        }
    }
}

/// Legal values for an attribute
#[derive(Debug, Clone)]
pub enum Constraint {
    /// Value must equal one of the literals
    OneOf(Vec<String>),
    /// Value must match the whole pattern
    Pattern { source: String, regex: Regex },
    /// Value must satisfy at least one alternative
    Any(Vec<Constraint>),
}

impl Constraint {
    /// Compile a full-string pattern constraint
    pub fn pattern(source: &str) -> Result<Self, regex::Error> {
        let regex = Regex::new(&format!("^(?:{source})$"))?;
        Ok(Self::Pattern {
            source: source.to_string(),
            regex,
        })
    }

    /// Build the constraint for a schema attribute entry, if it declares any
    fn from_entry(entry: &AttributeEntry) -> Result<Option<Self>, regex::Error> {
        let mut alternatives = Vec::new();

        if !entry.values.is_empty() {
            alternatives.push(Self::OneOf(entry.values.clone()));
        }
        for pattern in &entry.patterns {
            alternatives.push(Self::pattern(pattern)?);
        }

        Ok(match alternatives.len() {
            0 => None,
            1 => alternatives.pop(),
            _ => Some(Self::Any(alternatives)),
        })
    }

    /// Check whether a value satisfies this constraint
    pub fn allows(&self, value: &str) -> bool {
        match self {
            Self::OneOf(values) => values.iter().any(|v| v == value),
            Self::Pattern { regex, .. } => regex.is_match(value),
            Self::Any(alternatives) => alternatives.iter().any(|c| c.allows(value)),
        }
    }

    /// Enumerated literal values, ignoring patterns
    pub fn literals(&self) -> Vec<&str> {
        match self {
            Self::OneOf(values) => values.iter().map(String::as_str).collect(),
            Self::Pattern { .. } => Vec::new(),
            Self::Any(alternatives) => alternatives.iter().flat_map(|c| c.literals()).collect(),
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OneOf(values) => write!(f, "{}", values.join(" | ")),
            Self::Pattern { source, .. } => write!(f, "/{source}/"),
            Self::Any(alternatives) => {
                for (i, alternative) in alternatives.iter().enumerate() {
                    if i > 0 {
                        write!(f, " | ")?;
                    }
                    write!(f, "{alternative}")?;
                }
                Ok(())
            }
        }
    }
}

/// Runtime attribute definition
#[derive(Debug, Clone)]
pub struct AttributeDef {
    pub name: String,
    pub description: Option<String>,
    pub constraint: Option<Constraint>,
}

/// Runtime tag definition
#[derive(Debug, Clone)]
pub struct TagDef {
    pub name: String,
    pub description: Option<String>,
    /// Attributes every opening instance must carry, in schema order
    pub required: Vec<String>,
    pub attributes: Vec<AttributeDef>,
}

impl TagDef {
    /// Find an attribute definition by name
    pub fn attribute(&self, name: &str) -> Option<&AttributeDef> {
        self.attributes.iter().find(|attr| attr.name == name)
    }

    /// Constraint on an attribute's value, if the schema declares one
    pub fn constraint(&self, attribute: &str) -> Option<&Constraint> {
        self.attribute(attribute)?.constraint.as_ref()
    }

    pub fn is_required(&self, attribute: &str) -> bool {
        self.required.iter().any(|r| r == attribute)
    }
}

/// Runtime schema (immutable once built, shared read-only)
#[derive(Debug, Clone)]
pub struct Schema {
    pub name: String,
    pub version: Option<String>,
    pub description: Option<String>,
    /// Name of the single mandatory top-level element
    pub root: String,
    pub pricing: Pricing,
    pub heuristics: Heuristics,
    pub tags: HashMap<String, TagDef>,
}

impl Schema {
    /// Parse and compile a schema from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: SchemaFile = toml::from_str(content).context("Invalid schema file")?;
        Self::try_from(file)
    }

    /// Whether the target engine recognizes a tag
    pub fn supports(&self, tag: &str) -> bool {
        self.tags.contains_key(tag)
    }

    pub fn tag(&self, name: &str) -> Option<&TagDef> {
        self.tags.get(name)
    }

    /// Required attributes of a tag (empty for unknown tags)
    pub fn required_attributes(&self, tag: &str) -> &[String] {
        self.tags
            .get(tag)
            .map(|def| def.required.as_slice())
            .unwrap_or_default()
    }

    pub fn constraint(&self, tag: &str, attribute: &str) -> Option<&Constraint> {
        self.tags.get(tag)?.constraint(attribute)
    }

    /// Whether a tag splits text into segments for the long-segment check
    pub fn is_segment_break(&self, tag: &str) -> bool {
        self.heuristics
            .segment_break_tags
            .iter()
            .any(|name| name == tag)
    }

    /// Supported tag names in alphabetical order
    pub fn tag_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tags.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl TryFrom<SchemaFile> for Schema {
    type Error = anyhow::Error;

    fn try_from(file: SchemaFile) -> Result<Self> {
        if file.schema.root.trim().is_empty() {
            bail!("Schema '{}' has an empty root element name", file.schema.name);
        }

        let mut tags = HashMap::with_capacity(file.tags.len());
        for entry in file.tags {
            let mut attributes = Vec::with_capacity(entry.attributes.len());
            for attr in &entry.attributes {
                let constraint = Constraint::from_entry(attr).with_context(|| {
                    format!(
                        "Invalid pattern for attribute '{}' of tag <{}>",
                        attr.name, entry.name
                    )
                })?;
                attributes.push(AttributeDef {
                    name: attr.name.clone(),
                    description: attr.description.clone(),
                    constraint,
                });
            }

            let tag = TagDef {
                name: entry.name,
                description: entry.description,
                required: entry.required,
                attributes,
            };
            if tags.insert(tag.name.clone(), tag).is_some() {
                log::warn!(
                    "Schema '{}' defines a tag more than once; keeping the last definition",
                    file.schema.name
                );
            }
        }

        Ok(Self {
            name: file.schema.name,
            version: file.schema.version,
            description: file.schema.description,
            root: file.schema.root,
            pricing: file.pricing,
            heuristics: file.heuristics,
            tags,
        })
    }
}
