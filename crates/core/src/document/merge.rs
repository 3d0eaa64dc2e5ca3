use chrono::{DateTime, Duration, Utc};

use super::model::{normalize_path, Attributes, Document, DocumentInput};

/// Overlay a partial value onto a complete one.
pub trait Overlay {
    fn overlay(&mut self, changes: Self);
}

impl<T> Overlay for Option<T> {
    fn overlay(&mut self, changes: Self) {
        if let Some(value) = changes {
            *self = Some(value);
        }
    }
}

/// Timestamp for a refresh of `previous`, strictly later than it.
pub fn next_updated_at(previous: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    let floor = previous + Duration::microseconds(1);
    now.max(floor)
}

/// Merge `changes` into `original`, stamping `updatedAt` from `now`.
///
/// A field absent from the changes keeps the stored value; a field present
/// in the changes replaces it. `id`, `version`, `type` and `createdAt`
/// always come from the stored document.
pub fn merge<A: Attributes>(
    original: Document<A>,
    changes: DocumentInput<A>,
    now: DateTime<Utc>,
) -> Document<A> {
    // Blank paths are backfilled, never overlaid.
    let path = match changes.non_blank_path() {
        Some(p) => normalize_path(p),
        None => original.path,
    };

    let mut attributes = original.attributes;
    attributes.overlay(changes.attributes);

    Document {
        id: original.id,
        version: original.version,
        path,
        kind: A::KIND,
        created_at: original.created_at,
        updated_at: next_updated_at(original.updated_at, now),
        attributes,
    }
}
