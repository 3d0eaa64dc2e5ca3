use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Deserializer, Serialize};

use super::id::DocumentKey;
use super::merge::Overlay;
use super::validate::{self, ValidationError};

/// Discriminator stored in the `type` field of every document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Site,
    Page,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Site => "site",
            DocumentKind::Page => "page",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lowercase and trim a document path.
pub fn normalize_path(path: &str) -> String {
    path.trim().to_lowercase()
}

/// Resource-specific optional fields of a document.
///
/// Implemented once per resource kind; the generic document resource
/// is parameterized by it.
pub trait Attributes:
    Serialize + DeserializeOwned + Default + Clone + fmt::Debug + Send + Sync + 'static
{
    /// Value forced into the `type` field.
    const KIND: DocumentKind;

    /// Overlay every field present in `changes` onto `self`.
    fn overlay(&mut self, changes: Self);

    /// Business-key guard applied before a create is persisted.
    fn validate_create(path: &str, attributes: &Self) -> Result<(), ValidationError>;

    /// Server-side defaults stamped onto a new document.
    fn prepare_create(&mut self) {}
}

/// A persisted document: well-known fields plus resource attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document<A> {
    pub id: String,
    pub version: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: DocumentKind,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub attributes: A,
}

impl<A> Document<A> {
    pub fn key(&self) -> DocumentKey {
        DocumentKey::new(self.id.clone(), self.version.clone())
    }
}

/// Client-supplied document body, used for both create and partial update.
///
/// Only `path` and the resource attributes are read; identity and
/// provenance fields in the body are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocumentInput<A> {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(flatten)]
    pub attributes: A,
}

impl<A: Attributes> DocumentInput<A> {
    /// Parse a raw request body.
    pub fn from_json(body: &[u8]) -> Result<Self, ValidationError> {
        serde_json::from_slice(body).map_err(|e| ValidationError::MalformedBody(e.to_string()))
    }

    /// The path with surrounding whitespace removed, if any is left.
    pub fn non_blank_path(&self) -> Option<&str> {
        self.path
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }
}

/// Projection returned by list queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSummary {
    pub id: String,
    pub version: String,
    pub path: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl DocumentSummary {
    /// Field names the list projection is restricted to.
    pub const FIELDS: &'static [&'static str] =
        &["id", "version", "path", "createdAt", "updatedAt", "name"];
}

/// Publication state of a site. Written as its name; read from either the
/// name or the legacy integer code (`0` unpublished, `1` published).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum SiteStatus {
    #[default]
    Unpublished,
    Published,
}

impl<'de> Deserialize<'de> for SiteStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Code(u64),
            Name(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Code(0) => Ok(SiteStatus::Unpublished),
            Repr::Code(1) => Ok(SiteStatus::Published),
            Repr::Code(code) => Err(de::Error::invalid_value(
                de::Unexpected::Unsigned(code),
                &"0 or 1",
            )),
            Repr::Name(name) => match name.as_str() {
                "Unpublished" => Ok(SiteStatus::Unpublished),
                "Published" => Ok(SiteStatus::Published),
                other => Err(de::Error::unknown_variant(other, &["Unpublished", "Published"])),
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SiteAttributes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<SiteStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag_manager_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_image_url: Option<String>,
}

impl Attributes for SiteAttributes {
    const KIND: DocumentKind = DocumentKind::Site;

    fn overlay(&mut self, changes: Self) {
        self.status.overlay(changes.status);
        self.name.overlay(changes.name);
        self.description.overlay(changes.description);
        self.keywords.overlay(changes.keywords);
        self.url.overlay(changes.url);
        self.tag_manager_id.overlay(changes.tag_manager_id);
        self.card_image_url.overlay(changes.card_image_url);
    }

    fn validate_create(path: &str, attributes: &Self) -> Result<(), ValidationError> {
        validate::require_non_blank("path", Some(path))?;
        validate::require_non_blank("name", attributes.name.as_deref())
    }

    fn prepare_create(&mut self) {
        self.status = Some(SiteStatus::Unpublished);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PageAttributes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

impl Attributes for PageAttributes {
    const KIND: DocumentKind = DocumentKind::Page;

    fn overlay(&mut self, changes: Self) {
        self.name.overlay(changes.name);
        self.description.overlay(changes.description);
        self.keywords.overlay(changes.keywords);
        self.author.overlay(changes.author);
    }

    fn validate_create(path: &str, _attributes: &Self) -> Result<(), ValidationError> {
        validate::require_non_blank("path", Some(path))
    }
}

pub type Site = Document<SiteAttributes>;
pub type Page = Document<PageAttributes>;
