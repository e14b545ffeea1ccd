use crate::content::{Content, ContentDraft, ContentUpdate};
use crate::product::{
    CompletionMetadata, ProductDocument, ProductDraft, ProductSummary, ProductUpdate,
};
use crate::store::{AccountContentStats, ContentFilter, ContentStore, MemoryStore, ProductStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redcrew_core::StateError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// File-backed store persisting entities as JSONL, one file per entity
/// kind. Loads everything into a [`MemoryStore`] on open, appends on
/// create, and rewrites the affected file on mutation. Suitable for
/// single-process deployments; a relational backend would implement the
/// same traits.
pub struct JsonlStore {
    contents_path: PathBuf,
    products_path: PathBuf,
    inner: MemoryStore,
}

impl JsonlStore {
    /// Opens (or initializes) a store rooted at `dir`.
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self, StateError> {
        let dir = dir.as_ref();
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| StateError::Storage(format!("create {}: {e}", dir.display())))?;

        let store = Self {
            contents_path: dir.join("contents.jsonl"),
            products_path: dir.join("products.jsonl"),
            inner: MemoryStore::new(),
        };

        for content in read_lines::<Content>(&store.contents_path).await? {
            store.inner.restore_content(content).await;
        }
        for doc in read_lines::<ProductDocument>(&store.products_path).await? {
            store.inner.restore_product(doc).await;
        }

        info!(dir = %dir.display(), "opened jsonl store");
        Ok(store)
    }

    async fn rewrite_contents(&self) -> Result<(), StateError> {
        write_lines(&self.contents_path, &self.inner.dump_contents().await).await
    }

    async fn rewrite_products(&self) -> Result<(), StateError> {
        write_lines(&self.products_path, &self.inner.dump_products().await).await
    }
}

async fn read_lines<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, StateError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let data = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| StateError::Storage(format!("read {}: {e}", path.display())))?;
    let mut out = Vec::new();
    for line in data.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let record: T = serde_json::from_str(line)
            .map_err(|e| StateError::Storage(format!("invalid jsonl record: {e}")))?;
        out.push(record);
    }
    Ok(out)
}

async fn write_lines<T: Serialize>(path: &Path, records: &[T]) -> Result<(), StateError> {
    let mut data = String::new();
    for record in records {
        let line = serde_json::to_string(record)
            .map_err(|e| StateError::Storage(format!("serialize record: {e}")))?;
        data.push_str(&line);
        data.push('\n');
    }
    tokio::fs::write(path, data.as_bytes())
        .await
        .map_err(|e| StateError::Storage(format!("write {}: {e}", path.display())))
}

async fn append_line<T: Serialize>(path: &Path, record: &T) -> Result<(), StateError> {
    use tokio::io::AsyncWriteExt;
    let mut line = serde_json::to_string(record)
        .map_err(|e| StateError::Storage(format!("serialize record: {e}")))?;
    line.push('\n');
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .map_err(|e| StateError::Storage(format!("open {}: {e}", path.display())))?;
    file.write_all(line.as_bytes())
        .await
        .map_err(|e| StateError::Storage(format!("append {}: {e}", path.display())))
}

#[async_trait]
impl ContentStore for JsonlStore {
    async fn create(&self, draft: ContentDraft) -> Result<Content, StateError> {
        let content = ContentStore::create(&self.inner, draft).await?;
        append_line(&self.contents_path, &content).await?;
        Ok(content)
    }

    async fn get(&self, id: &str) -> Result<Content, StateError> {
        ContentStore::get(&self.inner, id).await
    }

    async fn update(&self, id: &str, patch: ContentUpdate) -> Result<Content, StateError> {
        let content = ContentStore::update(&self.inner, id, patch).await?;
        self.rewrite_contents().await?;
        Ok(content)
    }

    async fn schedule(&self, id: &str, at: DateTime<Utc>) -> Result<Content, StateError> {
        let content = self.inner.schedule(id, at).await?;
        self.rewrite_contents().await?;
        Ok(content)
    }

    async fn publish(&self, id: &str) -> Result<Content, StateError> {
        let content = self.inner.publish(id).await?;
        self.rewrite_contents().await?;
        Ok(content)
    }

    async fn list(&self, filter: ContentFilter) -> Result<Vec<Content>, StateError> {
        ContentStore::list(&self.inner, filter).await
    }

    async fn account_stats(&self, account_id: &str) -> Result<AccountContentStats, StateError> {
        self.inner.account_stats(account_id).await
    }
}

#[async_trait]
impl ProductStore for JsonlStore {
    async fn create(&self, draft: ProductDraft) -> Result<ProductDocument, StateError> {
        let doc = ProductStore::create(&self.inner, draft).await?;
        append_line(&self.products_path, &doc).await?;
        Ok(doc)
    }

    async fn get(&self, id: &str) -> Result<ProductDocument, StateError> {
        ProductStore::get(&self.inner, id).await
    }

    async fn update(
        &self,
        id: &str,
        patch: ProductUpdate,
    ) -> Result<ProductDocument, StateError> {
        let doc = ProductStore::update(&self.inner, id, patch).await?;
        self.rewrite_products().await?;
        Ok(doc)
    }

    async fn complete(
        &self,
        id: &str,
        document_content: String,
        metadata: CompletionMetadata,
    ) -> Result<ProductDocument, StateError> {
        let doc = self.inner.complete(id, document_content, metadata).await?;
        self.rewrite_products().await?;
        Ok(doc)
    }

    async fn fail(&self, id: &str, reason: String) -> Result<ProductDocument, StateError> {
        let doc = self.inner.fail(id, reason).await?;
        self.rewrite_products().await?;
        Ok(doc)
    }

    async fn list(
        &self,
        user_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<ProductSummary>, StateError> {
        ProductStore::list(&self.inner, user_id, limit).await
    }

    async fn search_by_name(
        &self,
        needle: &str,
        user_id: &str,
    ) -> Result<Vec<ProductSummary>, StateError> {
        self.inner.search_by_name(needle, user_id).await
    }

    async fn search_by_tag(
        &self,
        tag: &str,
        user_id: &str,
    ) -> Result<Vec<ProductSummary>, StateError> {
        self.inner.search_by_tag(tag, user_id).await
    }

    async fn search_by_brand(
        &self,
        needle: &str,
        user_id: &str,
    ) -> Result<Vec<ProductSummary>, StateError> {
        self.inner.search_by_brand(needle, user_id).await
    }
}
