use chrono::{DateTime, Utc};
use redcrew_core::StateError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Owner assigned to product documents when none is given.
pub const DEFAULT_USER: &str = "default_user";

/// Lifecycle status of a product document. Completed and failed are
/// terminal: no transition leaves either.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    /// Generation flow in progress.
    Processing,
    /// All specialist outputs aggregated into the final document.
    Completed,
    /// A required delegation failed unrecoverably.
    Failed,
}

impl std::fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProductStatus::Processing => write!(f, "processing"),
            ProductStatus::Completed => write!(f, "completed"),
            ProductStatus::Failed => write!(f, "failed"),
        }
    }
}

/// A product-brand penetration document.
///
/// Invariant maintained by the transition methods: `completed_at` is set
/// iff status is completed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductDocument {
    /// Store-assigned opaque id.
    pub id: String,
    /// Product name.
    pub product_name: String,
    /// Full penetration document text. Empty while processing.
    pub document_content: String,
    /// Brand name.
    pub brand_name: Option<String>,
    /// Product category.
    pub product_category: Option<String>,
    /// Price range.
    pub price_range: Option<String>,
    /// Target audience description.
    pub target_audience: Option<String>,
    /// Tag set.
    pub tags: BTreeSet<String>,
    /// Short summary.
    pub summary: Option<String>,
    /// Owning user.
    pub user_id: String,
    /// Lifecycle status.
    pub status: ProductStatus,
    /// Why the flow failed; set only when status is failed.
    pub failure_reason: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last mutation time.
    pub updated_at: DateTime<Utc>,
    /// Completion time; set iff status is completed.
    pub completed_at: Option<DateTime<Utc>>,
}

/// Writable fields accepted when a document-generation flow starts.
/// Status always starts at processing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductDraft {
    /// Product name (required).
    pub product_name: String,
    /// Initial document text, when the caller already has one.
    #[serde(default)]
    pub document_content: Option<String>,
    /// Brand name.
    #[serde(default)]
    pub brand_name: Option<String>,
    /// Product category.
    #[serde(default)]
    pub product_category: Option<String>,
    /// Price range.
    #[serde(default)]
    pub price_range: Option<String>,
    /// Target audience.
    #[serde(default)]
    pub target_audience: Option<String>,
    /// Tag set.
    #[serde(default)]
    pub tags: BTreeSet<String>,
    /// Short summary.
    #[serde(default)]
    pub summary: Option<String>,
    /// Owning user; defaults to [`DEFAULT_USER`].
    #[serde(default)]
    pub user_id: Option<String>,
}

impl ProductDraft {
    /// Creates a draft for the named product.
    pub fn new(product_name: impl Into<String>) -> Self {
        Self {
            product_name: product_name.into(),
            document_content: None,
            brand_name: None,
            product_category: None,
            price_range: None,
            target_audience: None,
            tags: BTreeSet::new(),
            summary: None,
            user_id: None,
        }
    }

    /// Sets the brand name.
    pub fn with_brand(mut self, brand_name: impl Into<String>) -> Self {
        self.brand_name = Some(brand_name.into());
        self
    }

    /// Sets the product category.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.product_category = Some(category.into());
        self
    }
}

/// Partial update of mutable document fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductUpdate {
    /// New product name.
    #[serde(default)]
    pub product_name: Option<String>,
    /// New document text.
    #[serde(default)]
    pub document_content: Option<String>,
    /// New brand name.
    #[serde(default)]
    pub brand_name: Option<String>,
    /// New category.
    #[serde(default)]
    pub product_category: Option<String>,
    /// New price range.
    #[serde(default)]
    pub price_range: Option<String>,
    /// New target audience.
    #[serde(default)]
    pub target_audience: Option<String>,
    /// Replacement tag set.
    #[serde(default)]
    pub tags: Option<BTreeSet<String>>,
    /// New summary.
    #[serde(default)]
    pub summary: Option<String>,
}

/// Metadata the manager aggregates from specialist outputs when
/// completing a document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompletionMetadata {
    /// Brand name, when a specialist surfaced one.
    #[serde(default)]
    pub brand_name: Option<String>,
    /// Product category.
    #[serde(default)]
    pub product_category: Option<String>,
    /// Price range.
    #[serde(default)]
    pub price_range: Option<String>,
    /// Target audience.
    #[serde(default)]
    pub target_audience: Option<String>,
    /// Short summary of the document.
    #[serde(default)]
    pub summary: Option<String>,
    /// Tags to merge into the document's tag set.
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

/// Lightweight projection of a document for listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductSummary {
    /// Document id.
    pub id: String,
    /// Product name.
    pub product_name: String,
    /// Brand name.
    pub brand_name: Option<String>,
    /// Product category.
    pub product_category: Option<String>,
    /// Price range.
    pub price_range: Option<String>,
    /// Target audience.
    pub target_audience: Option<String>,
    /// Short summary.
    pub summary: Option<String>,
    /// Tag set.
    pub tags: BTreeSet<String>,
    /// Lifecycle status.
    pub status: ProductStatus,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last mutation time.
    pub updated_at: DateTime<Utc>,
}

impl ProductDocument {
    /// Materializes a draft into a stored entity.
    pub(crate) fn from_draft(id: String, draft: ProductDraft) -> Self {
        let now = Utc::now();
        Self {
            id,
            product_name: draft.product_name,
            document_content: draft.document_content.unwrap_or_default(),
            brand_name: draft.brand_name,
            product_category: draft.product_category,
            price_range: draft.price_range,
            target_audience: draft.target_audience,
            tags: draft.tags,
            summary: draft.summary,
            user_id: draft.user_id.unwrap_or_else(|| DEFAULT_USER.to_string()),
            status: ProductStatus::Processing,
            failure_reason: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    /// Completes the document with the aggregated text and metadata.
    /// Requires processing; stamps `completed_at`.
    pub fn complete(
        &mut self,
        document_content: String,
        metadata: CompletionMetadata,
    ) -> Result<(), StateError> {
        if self.status != ProductStatus::Processing {
            return Err(self.invalid("complete"));
        }
        let now = Utc::now();
        self.document_content = document_content;
        if metadata.brand_name.is_some() {
            self.brand_name = metadata.brand_name;
        }
        if metadata.product_category.is_some() {
            self.product_category = metadata.product_category;
        }
        if metadata.price_range.is_some() {
            self.price_range = metadata.price_range;
        }
        if metadata.target_audience.is_some() {
            self.target_audience = metadata.target_audience;
        }
        if metadata.summary.is_some() {
            self.summary = metadata.summary;
        }
        self.tags.extend(metadata.tags);
        self.status = ProductStatus::Completed;
        self.completed_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Fails the document. Requires processing; `completed_at` stays unset.
    pub fn fail(&mut self, reason: impl Into<String>) -> Result<(), StateError> {
        if self.status != ProductStatus::Processing {
            return Err(self.invalid("fail"));
        }
        self.status = ProductStatus::Failed;
        self.failure_reason = Some(reason.into());
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Applies a partial update. Permitted while processing or after
    /// completion (editing a finished document); a failed document is
    /// read-only. Never changes status or `completed_at`.
    pub fn apply(&mut self, update: ProductUpdate) -> Result<(), StateError> {
        if self.status == ProductStatus::Failed {
            return Err(self.invalid("update"));
        }
        if let Some(product_name) = update.product_name {
            self.product_name = product_name;
        }
        if let Some(document_content) = update.document_content {
            self.document_content = document_content;
        }
        if let Some(brand_name) = update.brand_name {
            self.brand_name = Some(brand_name);
        }
        if let Some(product_category) = update.product_category {
            self.product_category = Some(product_category);
        }
        if let Some(price_range) = update.price_range {
            self.price_range = Some(price_range);
        }
        if let Some(target_audience) = update.target_audience {
            self.target_audience = Some(target_audience);
        }
        if let Some(tags) = update.tags {
            self.tags = tags;
        }
        if let Some(summary) = update.summary {
            self.summary = Some(summary);
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Listing projection without the full document text.
    pub fn summary_view(&self) -> ProductSummary {
        ProductSummary {
            id: self.id.clone(),
            product_name: self.product_name.clone(),
            brand_name: self.brand_name.clone(),
            product_category: self.product_category.clone(),
            price_range: self.price_range.clone(),
            target_audience: self.target_audience.clone(),
            summary: self.summary.clone(),
            tags: self.tags.clone(),
            status: self.status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    fn invalid(&self, attempted: &str) -> StateError {
        StateError::InvalidTransition {
            entity: "product_document",
            id: self.id.clone(),
            from: self.status.to_string(),
            attempted: attempted.to_string(),
        }
    }
}
