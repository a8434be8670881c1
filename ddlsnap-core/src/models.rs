//! Core data models for catalog objects, extraction results and history.
//!
//! Everything here is a plain value. Catalog-side types are produced by a
//! [`crate::catalog::CatalogSession`]; history-side types are produced by a
//! [`crate::vcs::VersionControl`] implementation and are read-only.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Object types whose definitions are extracted. Anything else is ignored.
pub const TRACKED_OBJECT_TYPES: &[&str] = &[
    "TABLE",
    "TRIGGER",
    "INDEX",
    "SYNONYM",
    "SEQUENCE",
    "VIEW",
    "FUNCTION",
    "PROCEDURE",
    "PACKAGE",
    "PACKAGE_BODY",
    "TYPE",
    "TYPE_BODY",
];

/// Returns true when objects of this (normalized) type are extracted.
pub fn is_tracked_type(object_type: &str) -> bool {
    TRACKED_OBJECT_TYPES.contains(&object_type)
}

/// chrono format of the sortable timestamp that prefixes sync commit messages.
pub const WATERMARK_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Character length of a formatted watermark.
pub const WATERMARK_LEN: usize = 19;

/// Cutoff used when no previous synchronization can be found.
///
/// Old enough that the next sync behaves as a full extraction.
pub fn sentinel_cutoff() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2000, 1, 1)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .unwrap_or(NaiveDateTime::MIN)
}

/// Formats a watermark for use as a commit message.
pub fn format_watermark(at: NaiveDateTime) -> String {
    at.format(WATERMARK_FORMAT).to_string()
}

/// Drops sub-second precision so a watermark round-trips through its text form.
pub fn truncate_to_seconds(at: NaiveDateTime) -> NaiveDateTime {
    at.with_nanosecond(0).unwrap_or(at)
}

/// A named schema entity tracked by the catalog.
///
/// Identity is the `(owner, name, object_type)` triple. The type is
/// normalized on construction so it can be used as a path segment; the
/// fields are private so every value, deserialized ones included, goes
/// through [`CatalogObject::new`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "CatalogObjectFields")]
pub struct CatalogObject {
    owner: String,
    name: String,
    object_type: String,
}

#[derive(Deserialize)]
struct CatalogObjectFields {
    owner: String,
    name: String,
    object_type: String,
}

impl From<CatalogObjectFields> for CatalogObject {
    fn from(fields: CatalogObjectFields) -> Self {
        Self::new(fields.owner, fields.name, fields.object_type)
    }
}

impl CatalogObject {
    /// Creates a catalog object, replacing whitespace runs in the type with `_`.
    pub fn new(
        owner: impl Into<String>,
        name: impl Into<String>,
        object_type: impl AsRef<str>,
    ) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            object_type: normalize_object_type(object_type.as_ref()),
        }
    }

    /// Schema that owns the object.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Object name as stored in the catalog.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Normalized type, e.g. `PACKAGE_BODY`.
    pub fn object_type(&self) -> &str {
        &self.object_type
    }

    /// Returns true when this object's type is in the tracked set.
    pub fn is_tracked(&self) -> bool {
        is_tracked_type(&self.object_type)
    }
}

impl std::fmt::Display for CatalogObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}.{}", self.object_type, self.owner, self.name)
    }
}

fn normalize_object_type(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join("_")
}

/// Owners whose objects are synchronized.
///
/// An empty allow-list matches nothing. There is deliberately no wildcard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaAllowlist {
    owners: BTreeSet<String>,
}

impl SchemaAllowlist {
    /// An allow-list that matches no schema.
    pub fn none() -> Self {
        Self::default()
    }

    /// Builds an allow-list from owner names, dropping blanks and duplicates.
    pub fn new<I, S>(owners: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            owners: owners
                .into_iter()
                .map(|o| o.as_ref().trim().to_string())
                .filter(|o| !o.is_empty())
                .collect(),
        }
    }

    /// Returns true if the owner is allowed.
    pub fn contains(&self, owner: &str) -> bool {
        self.owners.contains(owner)
    }

    /// Returns true if no owner is allowed.
    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    /// Number of allowed owners.
    pub fn len(&self) -> usize {
        self.owners.len()
    }

    /// Allowed owners in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.owners.iter().map(String::as_str)
    }
}

/// Outcome of one definition extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Extraction {
    /// Definition text, possibly empty.
    Extracted(String),
    /// The object no longer exists; expected under concurrent catalog changes.
    Skipped,
    /// The definition call returned NULL for an object that was listed.
    Undefined,
}

impl Extraction {
    /// Definition text to persist, if any.
    pub fn ddl(&self) -> Option<&str> {
        match self {
            Extraction::Extracted(text) => Some(text),
            Extraction::Skipped | Extraction::Undefined => None,
        }
    }
}

/// A commit as reported by the version-control backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    pub id: String,
    pub parent_ids: Vec<String>,
    pub author_name: String,
    pub author_email: String,
    pub author_time: DateTime<FixedOffset>,
    pub message: String,
}

impl CommitRecord {
    /// Abbreviated commit id.
    pub fn short_id(&self) -> &str {
        short_id(&self.id)
    }

    /// True for commits with more than one parent.
    pub fn is_merge(&self) -> bool {
        self.parent_ids.len() > 1
    }
}

/// Abbreviates an object id to seven characters.
pub fn short_id(id: &str) -> &str {
    id.get(..7).unwrap_or(id)
}

/// A tag and the commit it ultimately points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRecord {
    pub name: String,
    pub target_id: String,
}
