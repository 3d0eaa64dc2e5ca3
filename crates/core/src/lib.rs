pub mod document;
pub mod error;
pub mod resource;
pub mod store;

pub use error::{DocumentError, DocumentResult};
pub use resource::{DocumentResource, ResourceSettings, VersionPolicy};
