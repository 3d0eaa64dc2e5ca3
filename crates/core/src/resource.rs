use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::document::{
    merge, normalize_path, Attributes, Document, DocumentInput, DocumentKey, DocumentSummary,
};
use crate::error::{DocumentError, DocumentResult};
use crate::store::{
    DocumentStore, KeyCondition, Lookup, Projection, PutCondition, QueryRequest, Record,
};

/// How an update write treats a concurrent writer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VersionPolicy {
    /// Unconditional upsert; last write wins.
    #[default]
    Overwrite,
    /// Write only if the stored `updatedAt` is still the one that was read.
    CompareAndSwap,
}

impl FromStr for VersionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "overwrite" => Ok(VersionPolicy::Overwrite),
            "compare-and-swap" | "cas" => Ok(VersionPolicy::CompareAndSwap),
            other => Err(format!("unknown version policy {other:?}")),
        }
    }
}

impl fmt::Display for VersionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionPolicy::Overwrite => f.write_str("overwrite"),
            VersionPolicy::CompareAndSwap => f.write_str("compare-and-swap"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceSettings {
    /// Secondary index over `(type, path)` used by list queries.
    pub index_name: String,
    pub version_policy: VersionPolicy,
}

/// Create, get, update, delete and list for one resource kind.
pub struct DocumentResource<A> {
    store: Arc<dyn DocumentStore>,
    settings: ResourceSettings,
    _attributes: PhantomData<fn() -> A>,
}

impl<A> Clone for DocumentResource<A> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            settings: self.settings.clone(),
            _attributes: PhantomData,
        }
    }
}

impl<A: Attributes> DocumentResource<A> {
    pub fn new(store: Arc<dyn DocumentStore>, settings: ResourceSettings) -> Self {
        Self {
            store,
            settings,
            _attributes: PhantomData,
        }
    }

    /// Create a document from a client body, stamping identity and timestamps.
    pub async fn create(&self, body: &[u8], now: DateTime<Utc>) -> DocumentResult<Document<A>> {
        let input = DocumentInput::<A>::from_json(body)?;
        let path = normalize_path(input.path.as_deref().unwrap_or_default());
        A::validate_create(&path, &input.attributes)?;

        let mut attributes = input.attributes;
        attributes.prepare_create();

        let key = DocumentKey::generate();
        let document = Document {
            id: key.id,
            version: key.version,
            path,
            kind: A::KIND,
            created_at: now,
            updated_at: now,
            attributes,
        };

        self.store
            .put(Record::from_document(&document)?, PutCondition::Always)
            .await?;

        tracing::info!(kind = %A::KIND, id = %document.id, path = %document.path, "document created");
        Ok(document)
    }

    pub async fn get(&self, key: &DocumentKey) -> DocumentResult<Document<A>> {
        let document = self
            .fetch(key)
            .await?
            .ok_or_else(|| DocumentError::NotFound(A::KIND, key.clone()))?;

        tracing::debug!(kind = %A::KIND, %key, "document fetched");
        Ok(document)
    }

    /// Read, merge the client body over the stored document, write back.
    pub async fn update(
        &self,
        key: &DocumentKey,
        body: &[u8],
        now: DateTime<Utc>,
    ) -> DocumentResult<Document<A>> {
        let original = self.get(key).await?;
        let changes = DocumentInput::<A>::from_json(body)?;

        let condition = match self.settings.version_policy {
            VersionPolicy::Overwrite => PutCondition::Always,
            VersionPolicy::CompareAndSwap => PutCondition::UpdatedAtEquals(original.updated_at),
        };

        let updated = merge(original, changes, now);
        self.store
            .put(Record::from_document(&updated)?, condition)
            .await?;

        tracing::info!(kind = %A::KIND, %key, path = %updated.path, "document updated");
        Ok(updated)
    }

    pub async fn delete(&self, key: &DocumentKey) -> DocumentResult<()> {
        self.store.delete(key).await?;
        tracing::info!(kind = %A::KIND, %key, "document deleted");
        Ok(())
    }

    /// Every document of this kind whose path begins with `prefix`.
    pub async fn list(&self, prefix: &str) -> DocumentResult<Vec<DocumentSummary>> {
        let request = QueryRequest {
            index_name: self.settings.index_name.clone(),
            condition: KeyCondition::path_prefix(A::KIND, normalize_path(prefix)),
            projection: Projection::Fields(DocumentSummary::FIELDS),
        };

        let items = self.store.query(&request).await?;
        let summaries = items
            .into_iter()
            .map(|item| serde_json::from_value(Value::Object(item)))
            .collect::<Result<Vec<DocumentSummary>, _>>()?;

        tracing::debug!(kind = %A::KIND, condition = %request.condition, count = summaries.len(), "documents listed");
        Ok(summaries)
    }

    /// Items stored under `key` that belong to another kind count as missing.
    async fn fetch(&self, key: &DocumentKey) -> DocumentResult<Option<Document<A>>> {
        let item = match self.store.get(key).await? {
            Lookup::Found(item) => item,
            Lookup::NotFound => return Ok(None),
        };

        let document: Document<A> = serde_json::from_value(Value::Object(item))?;
        if document.kind != A::KIND {
            return Ok(None);
        }
        Ok(Some(document))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{PageAttributes, SiteAttributes, SiteStatus};
    use crate::store::{Item, MemoryStore, StoreError};
    use async_trait::async_trait;
    use chrono::Duration;

    fn settings(version_policy: VersionPolicy) -> ResourceSettings {
        ResourceSettings {
            index_name: "type-path-index".into(),
            version_policy,
        }
    }

    fn pages(store: Arc<MemoryStore>) -> DocumentResource<PageAttributes> {
        DocumentResource::new(store, settings(VersionPolicy::Overwrite))
    }

    #[tokio::test]
    async fn create_page_stamps_identity() {
        let store = Arc::new(MemoryStore::new());
        let now = Utc::now();
        let page = pages(store.clone())
            .create(br#"{"path":"About","type":"site","id":"mine"}"#, now)
            .await
            .unwrap();

        assert!(!page.id.is_empty());
        assert_ne!(page.id, "mine");
        assert!(!page.version.is_empty());
        assert_eq!(page.path, "about");
        assert_eq!(page.kind, crate::document::DocumentKind::Page);
        assert_eq!(page.created_at, page.updated_at);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn create_page_without_path_persists_nothing() {
        let store = Arc::new(MemoryStore::new());
        let resource = pages(store.clone());

        let bodies: [&[u8]; 4] = [br#"{"path":"  "}"#, br#"{"name":"x"}"#, b"[1,2", b"null"];
        for body in bodies {
            let err = resource.create(body, Utc::now()).await.unwrap_err();
            assert!(matches!(err, DocumentError::Validation(_)), "{err:?}");
        }
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn create_site_forces_unpublished() {
        let store = Arc::new(MemoryStore::new());
        let sites: DocumentResource<SiteAttributes> =
            DocumentResource::new(store, settings(VersionPolicy::Overwrite));

        let site = sites
            .create(br#"{"path":"Acme","name":"Acme","status":"Published"}"#, Utc::now())
            .await
            .unwrap();
        assert_eq!(site.attributes.status, Some(SiteStatus::Unpublished));
        assert_eq!(site.path, "acme");

        let err = sites.create(br#"{"path":"acme"}"#, Utc::now()).await.unwrap_err();
        assert!(matches!(err, DocumentError::Validation(_)));
    }

    #[tokio::test]
    async fn get_missing_is_not_found() {
        let resource = pages(Arc::new(MemoryStore::new()));
        let err = resource.get(&DocumentKey::new("nope", "v")).await.unwrap_err();
        assert!(matches!(err, DocumentError::NotFound(..)));
    }

    #[tokio::test]
    async fn get_with_other_kind_is_not_found() {
        let store = Arc::new(MemoryStore::new());
        let sites: DocumentResource<SiteAttributes> =
            DocumentResource::new(store.clone(), settings(VersionPolicy::Overwrite));
        let site = sites
            .create(br#"{"path":"acme","name":"Acme"}"#, Utc::now())
            .await
            .unwrap();

        let err = pages(store).get(&site.key()).await.unwrap_err();
        assert!(matches!(err, DocumentError::NotFound(..)));
    }

    #[tokio::test]
    async fn update_merges_and_refreshes_updated_at() {
        let store = Arc::new(MemoryStore::new());
        let resource = pages(store);
        let created_at = Utc::now() - Duration::minutes(1);
        let page = resource
            .create(br#"{"path":"about","name":"Old","author":"ann"}"#, created_at)
            .await
            .unwrap();

        let updated = resource
            .update(&page.key(), br#"{"name":"New"}"#, Utc::now())
            .await
            .unwrap();
        assert_eq!(updated.path, "about");
        assert_eq!(updated.attributes.name.as_deref(), Some("New"));
        assert_eq!(updated.attributes.author.as_deref(), Some("ann"));
        assert_eq!(updated.created_at, page.created_at);
        assert!(updated.updated_at > page.updated_at);

        let stored = resource.get(&page.key()).await.unwrap();
        assert_eq!(stored, updated);
    }

    #[tokio::test]
    async fn update_missing_is_not_found_before_parsing_body() {
        let resource = pages(Arc::new(MemoryStore::new()));
        let err = resource
            .update(&DocumentKey::new("nope", "v"), b"not json", Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, DocumentError::NotFound(..)));
    }

    #[tokio::test]
    async fn update_with_malformed_body_leaves_store_untouched() {
        let resource = pages(Arc::new(MemoryStore::new()));
        let page = resource.create(br#"{"path":"about"}"#, Utc::now()).await.unwrap();

        let err = resource.update(&page.key(), b"{", Utc::now()).await.unwrap_err();
        assert!(matches!(err, DocumentError::Validation(_)));
        assert_eq!(resource.get(&page.key()).await.unwrap(), page);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let resource = pages(Arc::new(MemoryStore::new()));
        let page = resource.create(br#"{"path":"about"}"#, Utc::now()).await.unwrap();

        resource.delete(&page.key()).await.unwrap();
        resource.delete(&page.key()).await.unwrap();
        assert!(matches!(
            resource.get(&page.key()).await,
            Err(DocumentError::NotFound(..))
        ));
    }

    #[tokio::test]
    async fn list_scopes_to_site_prefix() {
        let store = Arc::new(MemoryStore::new());
        let resource = pages(store.clone());
        for path in ["acme/home", "acme/about", "other/home"] {
            resource
                .create(format!(r#"{{"path":"{path}","author":"ann"}}"#).as_bytes(), Utc::now())
                .await
                .unwrap();
        }
        DocumentResource::<SiteAttributes>::new(store, settings(VersionPolicy::Overwrite))
            .create(br#"{"path":"acme","name":"Acme"}"#, Utc::now())
            .await
            .unwrap();

        let listed = resource.list("ACME").await.unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed.iter().all(|p| p.path.starts_with("acme")));

        assert!(resource.list("nobody").await.unwrap().is_empty());
    }

    /// Store whose item changes between the read and the write of an update.
    struct RacingStore {
        inner: MemoryStore,
    }

    #[async_trait]
    impl DocumentStore for RacingStore {
        async fn get(&self, key: &DocumentKey) -> Result<Lookup<Item>, StoreError> {
            let found = self.inner.get(key).await?;
            if let Lookup::Found(item) = &found {
                let mut bumped = item.clone();
                bumped.insert(
                    "updatedAt".into(),
                    serde_json::to_value(Utc::now() + Duration::hours(1))?,
                );
                let record = Record {
                    key: key.clone(),
                    kind: crate::document::DocumentKind::Page,
                    path: bumped["path"].as_str().unwrap_or_default().to_string(),
                    body: bumped,
                };
                self.inner.put(record, PutCondition::Always).await?;
            }
            Ok(found)
        }

        async fn put(&self, record: Record, condition: PutCondition) -> Result<(), StoreError> {
            self.inner.put(record, condition).await
        }

        async fn delete(&self, key: &DocumentKey) -> Result<(), StoreError> {
            self.inner.delete(key).await
        }

        async fn query(&self, request: &QueryRequest) -> Result<Vec<Item>, StoreError> {
            self.inner.query(request).await
        }

        async fn ping(&self) -> Result<(), StoreError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn compare_and_swap_rejects_lost_update() {
        let store = Arc::new(RacingStore {
            inner: MemoryStore::new(),
        });
        let seeded = pages(Arc::new(MemoryStore::new()))
            .create(br#"{"path":"about"}"#, Utc::now())
            .await
            .unwrap();
        store
            .inner
            .put(Record::from_document(&seeded).unwrap(), PutCondition::Always)
            .await
            .unwrap();

        let strict: DocumentResource<PageAttributes> =
            DocumentResource::new(store.clone(), settings(VersionPolicy::CompareAndSwap));
        let err = strict
            .update(&seeded.key(), br#"{"name":"New"}"#, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, DocumentError::Conflict(_)));

        let lenient: DocumentResource<PageAttributes> =
            DocumentResource::new(store, settings(VersionPolicy::Overwrite));
        assert!(lenient
            .update(&seeded.key(), br#"{"name":"New"}"#, Utc::now())
            .await
            .is_ok());
    }

    #[test]
    fn version_policy_parses() {
        assert_eq!("overwrite".parse::<VersionPolicy>(), Ok(VersionPolicy::Overwrite));
        assert_eq!(
            "Compare-And-Swap".parse::<VersionPolicy>(),
            Ok(VersionPolicy::CompareAndSwap)
        );
        assert_eq!("cas".parse::<VersionPolicy>(), Ok(VersionPolicy::CompareAndSwap));
        assert!("sometimes".parse::<VersionPolicy>().is_err());
    }
}
