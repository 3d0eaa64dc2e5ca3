use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generate a fresh, globally unique opaque identifier.
pub fn new_identity() -> String {
    Uuid::new_v4().to_string()
}

/// Composite primary key of a stored document.
///
/// Both halves are opaque 128-bit random identifiers, assigned once at
/// creation and never changed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentKey {
    pub id: String,
    pub version: String,
}

impl DocumentKey {
    pub fn new(id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: version.into(),
        }
    }

    /// Mint a key for a brand new document.
    pub fn generate() -> Self {
        Self::new(new_identity(), new_identity())
    }
}

impl fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.version)
    }
}
