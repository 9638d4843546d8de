//! Source descriptors and the source catalog.
//!
//! A [`Catalog`] is an ordered, validated list of [`SourceDescriptor`]s.
//! Insertion order is significant: selection uses it as a tie-break.
//! Runs never see a catalog change underneath them; [`CatalogHandle`] hands
//! out `Arc` snapshots and swaps the whole catalog on update.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::{Attribute, DataType, EntityType, HttpMethod, SignalKind};
use crate::errors::CoreError;
use crate::report::FactKind;

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

/// Three-tier category tag: data type / entity type / attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct Category {
    pub data_type: DataType,
    pub entity_type: EntityType,
    pub attribute: Attribute,
}

impl Category {
    #[must_use]
    pub const fn new(data_type: DataType, entity_type: EntityType, attribute: Attribute) -> Self {
        Self {
            data_type,
            entity_type,
            attribute,
        }
    }

    /// Number of tiers (0-3) that are equal between two categories.
    ///
    /// Tiers are compared independently: a source may agree on the attribute
    /// without agreeing on the data type.
    #[must_use]
    pub fn matching_tiers(&self, other: &Self) -> u8 {
        u8::from(self.data_type == other.data_type)
            + u8::from(self.entity_type == other.entity_type)
            + u8::from(self.attribute == other.attribute)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.data_type, self.entity_type, self.attribute)
    }
}

// ---------------------------------------------------------------------------
// Access descriptor
// ---------------------------------------------------------------------------

/// How a source authenticates. Secrets are referenced by name and resolved
/// at dispatch time; descriptors never hold credentials.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthDescriptor {
    #[default]
    None,
    /// Secret sent as a request header, e.g. `Key: <secret>`.
    Header { name: String, secret: String },
    /// Secret sent as a query parameter, e.g. `?api_key=<secret>`.
    Query { param: String, secret: String },
    /// Secret sent as `Authorization: Bearer <secret>`.
    Bearer { secret: String },
}

impl AuthDescriptor {
    /// Name of the secret this descriptor needs, if any.
    #[must_use]
    pub fn secret_name(&self) -> Option<&str> {
        match self {
            Self::None => None,
            Self::Header { secret, .. } | Self::Query { secret, .. } | Self::Bearer { secret } => {
                Some(secret)
            }
        }
    }
}

const fn default_required() -> bool {
    true
}

/// Binds one request parameter to a signal kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ParamBinding {
    /// Request parameter name (also a `{placeholder}` in the endpoint template).
    pub param: String,
    pub signal: SignalKind,
    #[serde(default = "default_required")]
    pub required: bool,
}

/// Where a fact lives in a source's JSON response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FieldHint {
    /// JSON pointer relative to the response root.
    pub pointer: String,
    pub label: String,
    pub kind: FactKind,
    #[serde(default)]
    pub unit: Option<String>,
}

/// Describes the shape of a source's response for the generic adapter.
///
/// With no fields, the generic adapter flattens every scalar leaf under
/// `root` into a fact labelled by its path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ResponseHint {
    /// JSON pointer to the data root (e.g. `/data`).
    #[serde(default)]
    pub root: Option<String>,
    #[serde(default)]
    pub fields: Vec<FieldHint>,
}

// ---------------------------------------------------------------------------
// SourceDescriptor
// ---------------------------------------------------------------------------

/// A registered external data API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SourceDescriptor {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: Category,
    /// URL with `{param}` placeholders, e.g. `https://emailrep.io/query/{email}`.
    pub endpoint_template: String,
    #[serde(default)]
    pub http_method: HttpMethod,
    #[serde(default)]
    pub auth: AuthDescriptor,
    #[serde(default)]
    pub param_mapping: Vec<ParamBinding>,
    /// Fixed parameters sent with every request.
    #[serde(default)]
    pub static_params: BTreeMap<String, String>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub response_hint: ResponseHint,
    #[serde(default)]
    pub priority: i32,
}

impl SourceDescriptor {
    /// Bindings for the given signal kind.
    pub fn bindings_for(&self, kind: SignalKind) -> impl Iterator<Item = &ParamBinding> {
        self.param_mapping.iter().filter(move |b| b.signal == kind)
    }

    /// Validate the descriptor's shape.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] naming the first problem found.
    pub fn validate(&self) -> Result<(), CoreError> {
        let invalid = |msg: String| Err(CoreError::Validation(format!("source '{}': {msg}", self.id)));

        if self.id.is_empty()
            || !self
                .id
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | '-'))
        {
            return invalid("id must be non-empty lowercase [a-z0-9_-]".to_string());
        }
        if self.name.trim().is_empty() {
            return invalid("name must not be empty".to_string());
        }
        if !(self.endpoint_template.starts_with("http://")
            || self.endpoint_template.starts_with("https://"))
        {
            return invalid(format!(
                "endpoint_template must be an http(s) URL, got '{}'",
                self.endpoint_template
            ));
        }

        let mut seen = HashSet::new();
        for binding in &self.param_mapping {
            if binding.param.is_empty() {
                return invalid("param_mapping entry with empty param".to_string());
            }
            if !seen.insert(binding.param.as_str()) {
                return invalid(format!("param '{}' bound twice", binding.param));
            }
        }

        let placeholders = template_placeholders(&self.endpoint_template)?;
        for placeholder in placeholders {
            if !seen.contains(placeholder) && !self.static_params.contains_key(placeholder) {
                return invalid(format!("placeholder '{{{placeholder}}}' has no binding"));
            }
        }

        if let Some(secret) = self.auth.secret_name() {
            if secret.trim().is_empty() {
                return invalid("auth secret name must not be empty".to_string());
            }
        }

        let pointers = self
            .response_hint
            .root
            .iter()
            .chain(self.response_hint.fields.iter().map(|f| &f.pointer));
        for pointer in pointers {
            if !pointer.is_empty() && !pointer.starts_with('/') {
                return invalid(format!("'{pointer}' is not a JSON pointer"));
            }
        }

        Ok(())
    }
}

/// Placeholder names in an endpoint template, in order of appearance.
///
/// # Errors
///
/// Returns [`CoreError::Validation`] for an unclosed or empty `{}`.
pub fn template_placeholders(template: &str) -> Result<Vec<&str>, CoreError> {
    let mut names = Vec::new();
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        let after = &rest[open + 1..];
        let close = after
            .find('}')
            .ok_or_else(|| CoreError::Validation(format!("unclosed '{{' in '{template}'")))?;
        let name = &after[..close];
        if name.is_empty() {
            return Err(CoreError::Validation(format!(
                "empty placeholder in '{template}'"
            )));
        }
        names.push(name);
        rest = &after[close + 1..];
    }
    Ok(names)
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct CatalogFile {
    #[serde(default, rename = "source")]
    sources: Vec<SourceDescriptor>,
}

/// Ordered, validated set of sources.
///
/// Serialized as a list of `[[source]]` tables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CatalogFile")]
pub struct Catalog {
    #[serde(rename = "source")]
    sources: Vec<SourceDescriptor>,
}

impl TryFrom<CatalogFile> for Catalog {
    type Error = CoreError;

    fn try_from(file: CatalogFile) -> Result<Self, Self::Error> {
        Self::new(file.sources)
    }
}

impl Catalog {
    /// Build a catalog, validating every descriptor and id uniqueness.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] on the first invalid descriptor or
    /// duplicated id.
    pub fn new(sources: Vec<SourceDescriptor>) -> Result<Self, CoreError> {
        let mut ids = HashSet::new();
        for source in &sources {
            source.validate()?;
            if !ids.insert(source.id.as_str()) {
                return Err(CoreError::Validation(format!(
                    "duplicate source id '{}'",
                    source.id
                )));
            }
        }
        Ok(Self { sources })
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&SourceDescriptor> {
        self.sources.iter().find(|s| s.id == id)
    }

    /// Catalog insertion index of a source.
    #[must_use]
    pub fn position(&self, id: &str) -> Option<usize> {
        self.sources.iter().position(|s| s.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SourceDescriptor> {
        self.sources.iter()
    }

    #[must_use]
    pub fn sources(&self) -> &[SourceDescriptor] {
        &self.sources
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Add or replace a source. A replaced source keeps its position.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] if the descriptor is invalid.
    pub fn upsert(&mut self, source: SourceDescriptor) -> Result<(), CoreError> {
        source.validate()?;
        match self.sources.iter_mut().find(|s| s.id == source.id) {
            Some(existing) => *existing = source,
            None => self.sources.push(source),
        }
        Ok(())
    }

    /// Remove a source by id.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] if no source has that id.
    pub fn remove(&mut self, id: &str) -> Result<SourceDescriptor, CoreError> {
        let index = self.position(id).ok_or_else(|| CoreError::NotFound {
            entity_type: "source".to_string(),
            id: id.to_string(),
        })?;
        Ok(self.sources.remove(index))
    }
}

/// Shared, swappable catalog. Readers take an `Arc` snapshot per run.
#[derive(Debug, Default)]
pub struct CatalogHandle {
    current: RwLock<Arc<Catalog>>,
}

impl CatalogHandle {
    #[must_use]
    pub fn new(catalog: Catalog) -> Self {
        Self {
            current: RwLock::new(Arc::new(catalog)),
        }
    }

    /// The catalog as of now. Later updates do not affect the snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<Catalog> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Replace the catalog for subsequent snapshots.
    pub fn replace(&self, catalog: Catalog) {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Arc::new(catalog);
        tracing::debug!(sources = guard.len(), "catalog replaced");
    }
}
