pub mod id;
pub mod merge;
pub mod model;
pub mod validate;

pub use id::{new_identity, DocumentKey};
pub use merge::merge;
pub use model::{
    normalize_path, Attributes, Document, DocumentInput, DocumentKind, DocumentSummary, Page,
    PageAttributes, Site, SiteAttributes, SiteStatus,
};
pub use validate::ValidationError;
