use crate::content::{Content, ContentDraft, ContentStatus, ContentUpdate};
use crate::product::{
    CompletionMetadata, ProductDocument, ProductDraft, ProductSummary, ProductUpdate,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redcrew_core::StateError;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;
use uuid::Uuid;

/// Filters for content listings.
#[derive(Debug, Clone, Default)]
pub struct ContentFilter {
    /// Restrict to one account.
    pub account_id: Option<String>,
    /// Restrict to one category.
    pub category: Option<String>,
    /// Restrict to one status.
    pub status: Option<ContentStatus>,
    /// Restrict to one platform.
    pub platform: Option<String>,
    /// Maximum number of records returned (most recently updated first).
    pub limit: Option<usize>,
}

/// Aggregated engagement statistics for one account.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct AccountContentStats {
    /// Total content records for the account.
    pub total_content: usize,
    /// Record count per status.
    pub status_breakdown: BTreeMap<String, usize>,
    /// Record count per category ("other" when unset).
    pub category_breakdown: BTreeMap<String, usize>,
    /// Sum of the `views` stat across records.
    pub total_views: u64,
    /// Sum of the `likes` stat across records.
    pub total_likes: u64,
}

/// Store operations for content records. Every write is atomic per id;
/// `get` is read-only and idempotent.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Persists a new record with status draft.
    async fn create(&self, draft: ContentDraft) -> Result<Content, StateError>;

    /// Fetches a record by id.
    async fn get(&self, id: &str) -> Result<Content, StateError>;

    /// Applies a partial update.
    async fn update(&self, id: &str, patch: ContentUpdate) -> Result<Content, StateError>;

    /// Transitions draft → scheduled.
    async fn schedule(&self, id: &str, at: DateTime<Utc>) -> Result<Content, StateError>;

    /// Transitions draft/scheduled → published.
    async fn publish(&self, id: &str) -> Result<Content, StateError>;

    /// Lists records matching the filter, most recently updated first.
    async fn list(&self, filter: ContentFilter) -> Result<Vec<Content>, StateError>;

    /// Aggregates engagement statistics for one account.
    async fn account_stats(&self, account_id: &str) -> Result<AccountContentStats, StateError>;
}

/// Store operations for product documents. Every write is atomic per id.
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Persists a new document with status processing.
    async fn create(&self, draft: ProductDraft) -> Result<ProductDocument, StateError>;

    /// Fetches a document by id.
    async fn get(&self, id: &str) -> Result<ProductDocument, StateError>;

    /// Applies a partial update.
    async fn update(&self, id: &str, patch: ProductUpdate)
        -> Result<ProductDocument, StateError>;

    /// Transitions processing → completed with the aggregated document.
    async fn complete(
        &self,
        id: &str,
        document_content: String,
        metadata: CompletionMetadata,
    ) -> Result<ProductDocument, StateError>;

    /// Transitions processing → failed.
    async fn fail(&self, id: &str, reason: String) -> Result<ProductDocument, StateError>;

    /// Lists one user's documents, newest first.
    async fn list(&self, user_id: &str, limit: Option<usize>)
        -> Result<Vec<ProductSummary>, StateError>;

    /// Documents whose product name contains `needle`.
    async fn search_by_name(
        &self,
        needle: &str,
        user_id: &str,
    ) -> Result<Vec<ProductSummary>, StateError>;

    /// Documents tagged with `tag`.
    async fn search_by_tag(
        &self,
        tag: &str,
        user_id: &str,
    ) -> Result<Vec<ProductSummary>, StateError>;

    /// Documents whose brand name contains `needle`.
    async fn search_by_brand(
        &self,
        needle: &str,
        user_id: &str,
    ) -> Result<Vec<ProductSummary>, StateError>;
}

/// In-memory backend.
///
/// Each entity sits behind its own `Mutex`, so writes to one artifact are
/// totally ordered while unrelated artifacts proceed in parallel. The
/// outer maps are read-locked on the hot path and write-locked only on
/// insert.
#[derive(Default)]
pub struct MemoryStore {
    contents: RwLock<HashMap<String, Arc<Mutex<Content>>>>,
    products: RwLock<HashMap<String, Arc<Mutex<ProductDocument>>>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-inserts a previously persisted content record (backend reload).
    pub(crate) async fn restore_content(&self, content: Content) {
        self.contents
            .write()
            .await
            .insert(content.id.clone(), Arc::new(Mutex::new(content)));
    }

    /// Re-inserts a previously persisted document (backend reload).
    pub(crate) async fn restore_product(&self, doc: ProductDocument) {
        self.products
            .write()
            .await
            .insert(doc.id.clone(), Arc::new(Mutex::new(doc)));
    }

    /// Snapshot of every content record (backend rewrite).
    pub(crate) async fn dump_contents(&self) -> Vec<Content> {
        let entries: Vec<Arc<Mutex<Content>>> =
            self.contents.read().await.values().cloned().collect();
        let mut out = Vec::with_capacity(entries.len());
        for entry in entries {
            out.push(entry.lock().await.clone());
        }
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        out
    }

    /// Snapshot of every product document (backend rewrite).
    pub(crate) async fn dump_products(&self) -> Vec<ProductDocument> {
        let entries: Vec<Arc<Mutex<ProductDocument>>> =
            self.products.read().await.values().cloned().collect();
        let mut out = Vec::with_capacity(entries.len());
        for entry in entries {
            out.push(entry.lock().await.clone());
        }
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        out
    }

    async fn with_content<T>(
        &self,
        id: &str,
        f: impl FnOnce(&mut Content) -> Result<T, StateError>,
    ) -> Result<T, StateError> {
        let entry = self
            .contents
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| StateError::NotFound {
                entity: "content",
                id: id.to_string(),
            })?;
        let mut guard = entry.lock().await;
        f(&mut guard)
    }

    async fn with_product<T>(
        &self,
        id: &str,
        f: impl FnOnce(&mut ProductDocument) -> Result<T, StateError>,
    ) -> Result<T, StateError> {
        let entry = self
            .products
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| StateError::NotFound {
                entity: "product_document",
                id: id.to_string(),
            })?;
        let mut guard = entry.lock().await;
        f(&mut guard)
    }

    async fn product_summaries(
        &self,
        user_id: &str,
        pred: impl Fn(&ProductDocument) -> bool,
    ) -> Vec<ProductSummary> {
        let docs = self.dump_products().await;
        let mut out: Vec<ProductSummary> = docs
            .iter()
            .filter(|d| d.user_id == user_id && pred(d))
            .map(ProductDocument::summary_view)
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        out
    }
}

/// Short opaque id in the shape the upstream system used for content.
fn short_id() -> String {
    let id = Uuid::new_v4().simple().to_string();
    id[..8].to_string()
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn create(&self, draft: ContentDraft) -> Result<Content, StateError> {
        let content = Content::from_draft(short_id(), draft);
        debug!(id = %content.id, account_id = %content.account_id, "content created");
        self.contents
            .write()
            .await
            .insert(content.id.clone(), Arc::new(Mutex::new(content.clone())));
        Ok(content)
    }

    async fn get(&self, id: &str) -> Result<Content, StateError> {
        self.with_content(id, |c| Ok(c.clone())).await
    }

    async fn update(&self, id: &str, patch: ContentUpdate) -> Result<Content, StateError> {
        self.with_content(id, |c| {
            c.apply(patch)?;
            Ok(c.clone())
        })
        .await
    }

    async fn schedule(&self, id: &str, at: DateTime<Utc>) -> Result<Content, StateError> {
        self.with_content(id, |c| {
            c.schedule(at)?;
            debug!(id = %c.id, "content scheduled");
            Ok(c.clone())
        })
        .await
    }

    async fn publish(&self, id: &str) -> Result<Content, StateError> {
        self.with_content(id, |c| {
            c.publish()?;
            debug!(id = %c.id, "content published");
            Ok(c.clone())
        })
        .await
    }

    async fn list(&self, filter: ContentFilter) -> Result<Vec<Content>, StateError> {
        let mut out: Vec<Content> = self
            .dump_contents()
            .await
            .into_iter()
            .filter(|c| {
                filter
                    .account_id
                    .as_deref()
                    .map_or(true, |a| c.account_id == a)
                    && filter
                        .category
                        .as_deref()
                        .map_or(true, |v| c.category.as_deref() == Some(v))
                    && filter.status.map_or(true, |s| c.status == s)
                    && filter
                        .platform
                        .as_deref()
                        .map_or(true, |p| c.platform == p)
            })
            .collect();
        out.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        if let Some(limit) = filter.limit {
            out.truncate(limit);
        }
        Ok(out)
    }

    async fn account_stats(&self, account_id: &str) -> Result<AccountContentStats, StateError> {
        let mut stats = AccountContentStats::default();
        for content in self.dump_contents().await {
            if content.account_id != account_id {
                continue;
            }
            stats.total_content += 1;
            *stats
                .status_breakdown
                .entry(content.status.to_string())
                .or_default() += 1;
            let category = content.category.as_deref().unwrap_or("other").to_string();
            *stats.category_breakdown.entry(category).or_default() += 1;
            stats.total_views += metric(&content.stats, "views");
            stats.total_likes += metric(&content.stats, "likes");
        }
        Ok(stats)
    }
}

fn metric(stats: &BTreeMap<String, serde_json::Value>, key: &str) -> u64 {
    stats.get(key).and_then(serde_json::Value::as_u64).unwrap_or(0)
}

#[async_trait]
impl ProductStore for MemoryStore {
    async fn create(&self, draft: ProductDraft) -> Result<ProductDocument, StateError> {
        let doc = ProductDocument::from_draft(Uuid::new_v4().to_string(), draft);
        debug!(id = %doc.id, product = %doc.product_name, "product document created");
        self.products
            .write()
            .await
            .insert(doc.id.clone(), Arc::new(Mutex::new(doc.clone())));
        Ok(doc)
    }

    async fn get(&self, id: &str) -> Result<ProductDocument, StateError> {
        self.with_product(id, |d| Ok(d.clone())).await
    }

    async fn update(
        &self,
        id: &str,
        patch: ProductUpdate,
    ) -> Result<ProductDocument, StateError> {
        self.with_product(id, |d| {
            d.apply(patch)?;
            Ok(d.clone())
        })
        .await
    }

    async fn complete(
        &self,
        id: &str,
        document_content: String,
        metadata: CompletionMetadata,
    ) -> Result<ProductDocument, StateError> {
        self.with_product(id, |d| {
            d.complete(document_content, metadata)?;
            debug!(id = %d.id, "product document completed");
            Ok(d.clone())
        })
        .await
    }

    async fn fail(&self, id: &str, reason: String) -> Result<ProductDocument, StateError> {
        self.with_product(id, |d| {
            d.fail(reason)?;
            debug!(id = %d.id, "product document failed");
            Ok(d.clone())
        })
        .await
    }

    async fn list(
        &self,
        user_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<ProductSummary>, StateError> {
        let mut out = self.product_summaries(user_id, |_| true).await;
        if let Some(limit) = limit {
            out.truncate(limit);
        }
        Ok(out)
    }

    async fn search_by_name(
        &self,
        needle: &str,
        user_id: &str,
    ) -> Result<Vec<ProductSummary>, StateError> {
        Ok(self
            .product_summaries(user_id, |d| d.product_name.contains(needle))
            .await)
    }

    async fn search_by_tag(
        &self,
        tag: &str,
        user_id: &str,
    ) -> Result<Vec<ProductSummary>, StateError> {
        Ok(self
            .product_summaries(user_id, |d| d.tags.contains(tag))
            .await)
    }

    async fn search_by_brand(
        &self,
        needle: &str,
        user_id: &str,
    ) -> Result<Vec<ProductSummary>, StateError> {
        Ok(self
            .product_summaries(user_id, |d| {
                d.brand_name.as_deref().is_some_and(|b| b.contains(needle))
            })
            .await)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::product::DEFAULT_USER;
    use crate::ProductStatus;
    use serde_json::json;

    #[tokio::test]
    async fn test_create_and_get_idempotent() {
        let store = MemoryStore::new();
        let created = ContentStore::create(&store, ContentDraft::new("T", "acct1"))
            .await
            .unwrap();
        let a = ContentStore::get(&store, &created.id).await.unwrap();
        let b = ContentStore::get(&store, &created.id).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.status, ContentStatus::Draft);
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let store = MemoryStore::new();
        let err = ContentStore::get(&store, "nope").await.unwrap_err();
        assert!(matches!(err, StateError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_schedule_and_publish_through_store() {
        let store = MemoryStore::new();
        let created = ContentStore::create(&store, ContentDraft::new("T", "acct1"))
            .await
            .unwrap();
        let scheduled = store.schedule(&created.id, Utc::now()).await.unwrap();
        assert_eq!(scheduled.status, ContentStatus::Scheduled);
        let published = store.publish(&created.id).await.unwrap();
        assert_eq!(published.status, ContentStatus::Published);
        assert!(published.scheduled_at.is_none());
        assert!(published.published_at.is_some());
    }

    #[tokio::test]
    async fn test_concurrent_publish_exactly_one_wins() {
        let store = Arc::new(MemoryStore::new());
        let created = ContentStore::create(&*store, ContentDraft::new("T", "acct1"))
            .await
            .unwrap();

        let mut handles = Vec::new();
        for _ in 0..2 {
            let store = Arc::clone(&store);
            let id = created.id.clone();
            handles.push(tokio::spawn(async move { store.publish(&id).await }));
        }
        let mut oks = 0;
        let mut errs = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => oks += 1,
                Err(StateError::InvalidTransition { .. }) => errs += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!((oks, errs), (1, 1));

        let final_state = ContentStore::get(&*store, &created.id).await.unwrap();
        assert_eq!(final_state.status, ContentStatus::Published);
        assert!(final_state.published_at.is_some());
    }

    #[tokio::test]
    async fn test_list_filters_and_limit() {
        let store = MemoryStore::new();
        for i in 0..3 {
            let draft = ContentDraft::new(format!("T{i}"), "acct1").with_category("review");
            ContentStore::create(&store, draft).await.unwrap();
        }
        ContentStore::create(&store, ContentDraft::new("Other", "acct2"))
            .await
            .unwrap();

        let filter = ContentFilter {
            account_id: Some("acct1".into()),
            category: Some("review".into()),
            limit: Some(2),
            ..Default::default()
        };
        let listed = ContentStore::list(&store, filter).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed.iter().all(|c| c.account_id == "acct1"));
    }

    #[tokio::test]
    async fn test_account_stats_breakdown() {
        let store = MemoryStore::new();
        let mut draft = ContentDraft::new("A", "acct1").with_category("review");
        draft.stats.insert("views".into(), json!(120));
        draft.stats.insert("likes".into(), json!(30));
        let a = ContentStore::create(&store, draft).await.unwrap();
        store.publish(&a.id).await.unwrap();

        ContentStore::create(&store, ContentDraft::new("B", "acct1"))
            .await
            .unwrap();

        let stats = store.account_stats("acct1").await.unwrap();
        assert_eq!(stats.total_content, 2);
        assert_eq!(stats.status_breakdown["published"], 1);
        assert_eq!(stats.status_breakdown["draft"], 1);
        assert_eq!(stats.category_breakdown["review"], 1);
        assert_eq!(stats.category_breakdown["other"], 1);
        assert_eq!(stats.total_views, 120);
        assert_eq!(stats.total_likes, 30);
    }

    #[tokio::test]
    async fn test_product_lifecycle_through_store() {
        let store = MemoryStore::new();
        let doc = ProductStore::create(&store, ProductDraft::new("Hydra Cream"))
            .await
            .unwrap();
        assert_eq!(doc.status, ProductStatus::Processing);

        let done = store
            .complete(&doc.id, "document".into(), CompletionMetadata::default())
            .await
            .unwrap();
        assert_eq!(done.status, ProductStatus::Completed);
        assert!(done.completed_at.is_some());

        // terminal: a late fail is rejected and the stored state is unchanged
        assert!(store.fail(&doc.id, "late".into()).await.is_err());
        let fetched = ProductStore::get(&store, &doc.id).await.unwrap();
        assert_eq!(fetched.status, ProductStatus::Completed);
    }

    #[tokio::test]
    async fn test_product_search() {
        let store = MemoryStore::new();
        let mut draft = ProductDraft::new("Hydra Cream").with_brand("GlowLab");
        draft.tags.insert("skincare".into());
        ProductStore::create(&store, draft).await.unwrap();
        ProductStore::create(&store, ProductDraft::new("Matte Lipstick"))
            .await
            .unwrap();

        let by_name = store.search_by_name("Hydra", DEFAULT_USER).await.unwrap();
        assert_eq!(by_name.len(), 1);
        let by_tag = store.search_by_tag("skincare", DEFAULT_USER).await.unwrap();
        assert_eq!(by_tag.len(), 1);
        let by_brand = store.search_by_brand("Glow", DEFAULT_USER).await.unwrap();
        assert_eq!(by_brand.len(), 1);
        let all = ProductStore::list(&store, DEFAULT_USER, None).await.unwrap();
        assert_eq!(all.len(), 2);
    }
}
