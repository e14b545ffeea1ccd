use chrono::{DateTime, Utc};
use redcrew_core::StateError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Platform a content record targets when none is given.
pub const DEFAULT_PLATFORM: &str = "xiaohongshu";

/// Lifecycle status of a content record.
///
/// Transitions are monotonic: draft → scheduled → published, or draft →
/// published directly. Nothing ever goes back to draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentStatus {
    /// Created, not yet queued for publishing.
    Draft,
    /// Queued with a target publish time.
    Scheduled,
    /// Live on the platform.
    Published,
}

impl std::fmt::Display for ContentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContentStatus::Draft => write!(f, "draft"),
            ContentStatus::Scheduled => write!(f, "scheduled"),
            ContentStatus::Published => write!(f, "published"),
        }
    }
}

/// A publishable content record.
///
/// Invariants maintained by the transition methods: `published_at` is set
/// iff status is published, `scheduled_at` is set iff status is scheduled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    /// Store-assigned opaque id.
    pub id: String,
    /// Post title.
    pub title: String,
    /// Cover image URL.
    pub cover: Option<String>,
    /// Short description.
    pub description: Option<String>,
    /// Body text.
    pub body: Option<String>,
    /// Category (review, tutorial, recommendation, …).
    pub category: Option<String>,
    /// Target platform.
    pub platform: String,
    /// Owning account (external account entity reference).
    pub account_id: String,
    /// Tag set.
    pub tags: BTreeSet<String>,
    /// Opaque engagement metrics (views, likes, …).
    pub stats: BTreeMap<String, serde_json::Value>,
    /// Lifecycle status.
    pub status: ContentStatus,
    /// Target publish time; set iff status is scheduled.
    pub scheduled_at: Option<DateTime<Utc>>,
    /// Actual publish time; set iff status is published.
    pub published_at: Option<DateTime<Utc>>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last mutation time.
    pub updated_at: DateTime<Utc>,
}

/// Writable fields accepted when creating content. Status always starts
/// at draft; the platform defaults to [`DEFAULT_PLATFORM`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentDraft {
    /// Post title (required).
    pub title: String,
    /// Owning account (required).
    pub account_id: String,
    /// Cover image URL.
    #[serde(default)]
    pub cover: Option<String>,
    /// Short description.
    #[serde(default)]
    pub description: Option<String>,
    /// Body text.
    #[serde(default)]
    pub body: Option<String>,
    /// Category.
    #[serde(default)]
    pub category: Option<String>,
    /// Target platform; defaults to [`DEFAULT_PLATFORM`].
    #[serde(default)]
    pub platform: Option<String>,
    /// Tag set.
    #[serde(default)]
    pub tags: BTreeSet<String>,
    /// Initial engagement metrics.
    #[serde(default)]
    pub stats: BTreeMap<String, serde_json::Value>,
}

impl ContentDraft {
    /// Creates a draft with the two required fields.
    pub fn new(title: impl Into<String>, account_id: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            account_id: account_id.into(),
            cover: None,
            description: None,
            body: None,
            category: None,
            platform: None,
            tags: BTreeSet::new(),
            stats: BTreeMap::new(),
        }
    }

    /// Sets the body text.
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Sets the category.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Sets the tag set.
    pub fn with_tags(mut self, tags: impl IntoIterator<Item = String>) -> Self {
        self.tags = tags.into_iter().collect();
        self
    }
}

/// Partial update of mutable content fields. Absent fields are left
/// untouched; the update never changes status.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentUpdate {
    /// New title.
    #[serde(default)]
    pub title: Option<String>,
    /// New cover URL.
    #[serde(default)]
    pub cover: Option<String>,
    /// New description.
    #[serde(default)]
    pub description: Option<String>,
    /// New body text.
    #[serde(default)]
    pub body: Option<String>,
    /// New category.
    #[serde(default)]
    pub category: Option<String>,
    /// Replacement tag set.
    #[serde(default)]
    pub tags: Option<BTreeSet<String>>,
    /// Replacement engagement metrics.
    #[serde(default)]
    pub stats: Option<BTreeMap<String, serde_json::Value>>,
}

impl Content {
    /// Materializes a draft into a stored entity.
    pub(crate) fn from_draft(id: String, draft: ContentDraft) -> Self {
        let now = Utc::now();
        Self {
            id,
            title: draft.title,
            cover: draft.cover,
            description: draft.description,
            body: draft.body,
            category: draft.category,
            platform: draft
                .platform
                .unwrap_or_else(|| DEFAULT_PLATFORM.to_string()),
            account_id: draft.account_id,
            tags: draft.tags,
            stats: draft.stats,
            status: ContentStatus::Draft,
            scheduled_at: None,
            published_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Queues the content for publishing at `at`. Requires draft.
    pub fn schedule(&mut self, at: DateTime<Utc>) -> Result<(), StateError> {
        if self.status != ContentStatus::Draft {
            return Err(self.invalid("schedule"));
        }
        self.status = ContentStatus::Scheduled;
        self.scheduled_at = Some(at);
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Publishes the content. Requires draft or scheduled; clears
    /// `scheduled_at` and stamps `published_at`.
    pub fn publish(&mut self) -> Result<(), StateError> {
        match self.status {
            ContentStatus::Draft | ContentStatus::Scheduled => {}
            ContentStatus::Published => return Err(self.invalid("publish")),
        }
        let now = Utc::now();
        self.status = ContentStatus::Published;
        self.scheduled_at = None;
        self.published_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Applies a partial update. Permitted in any non-published state;
    /// mutates only the provided fields and never changes status.
    pub fn apply(&mut self, update: ContentUpdate) -> Result<(), StateError> {
        if self.status == ContentStatus::Published {
            return Err(self.invalid("update"));
        }
        if let Some(title) = update.title {
            self.title = title;
        }
        if let Some(cover) = update.cover {
            self.cover = Some(cover);
        }
        if let Some(description) = update.description {
            self.description = Some(description);
        }
        if let Some(body) = update.body {
            self.body = Some(body);
        }
        if let Some(category) = update.category {
            self.category = Some(category);
        }
        if let Some(tags) = update.tags {
            self.tags = tags;
        }
        if let Some(stats) = update.stats {
            self.stats = stats;
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    fn invalid(&self, attempted: &str) -> StateError {
        StateError::InvalidTransition {
            entity: "content",
            id: self.id.clone(),
            from: self.status.to_string(),
            attempted: attempted.to_string(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn make_content() -> Content {
        Content::from_draft(
            "c1".into(),
            ContentDraft::new("Winter skincare roundup", "acct123"),
        )
    }

    #[test]
    fn test_draft_defaults() {
        let content = make_content();
        assert_eq!(content.status, ContentStatus::Draft);
        assert_eq!(content.platform, DEFAULT_PLATFORM);
        assert!(content.scheduled_at.is_none());
        assert!(content.published_at.is_none());
    }

    #[test]
    fn test_schedule_then_publish() {
        let mut content = make_content();
        content.schedule(Utc::now()).unwrap();
        assert_eq!(content.status, ContentStatus::Scheduled);
        assert!(content.scheduled_at.is_some());

        content.publish().unwrap();
        assert_eq!(content.status, ContentStatus::Published);
        // scheduled_at is set iff scheduled
        assert!(content.scheduled_at.is_none());
        assert!(content.published_at.is_some());
    }

    #[test]
    fn test_publish_directly_from_draft() {
        let mut content = make_content();
        content.publish().unwrap();
        assert_eq!(content.status, ContentStatus::Published);
        assert!(content.published_at.is_some());
    }

    #[test]
    fn test_schedule_requires_draft() {
        let mut content = make_content();
        content.publish().unwrap();
        let err = content.schedule(Utc::now()).unwrap_err();
        assert!(matches!(err, StateError::InvalidTransition { .. }));
    }

    #[test]
    fn test_publish_twice_rejected() {
        let mut content = make_content();
        content.publish().unwrap();
        assert!(content.publish().is_err());
    }

    #[test]
    fn test_no_way_back_to_draft_via_schedule() {
        let mut content = make_content();
        content.schedule(Utc::now()).unwrap();
        // scheduling again would need draft
        assert!(content.schedule(Utc::now()).is_err());
    }

    #[test]
    fn test_update_mutates_only_provided_fields() {
        let mut content = make_content();
        content
            .apply(ContentUpdate {
                body: Some("new body".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(content.body.as_deref(), Some("new body"));
        assert_eq!(content.title, "Winter skincare roundup");
        assert_eq!(content.status, ContentStatus::Draft);
    }

    #[test]
    fn test_update_rejected_when_published() {
        let mut content = make_content();
        content.publish().unwrap();
        let err = content.apply(ContentUpdate::default()).unwrap_err();
        assert!(matches!(err, StateError::InvalidTransition { .. }));
    }

    #[test]
    fn test_update_allowed_when_scheduled() {
        let mut content = make_content();
        content.schedule(Utc::now()).unwrap();
        content
            .apply(ContentUpdate {
                title: Some("Revised title".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(content.title, "Revised title");
        assert_eq!(content.status, ContentStatus::Scheduled);
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(
            serde_json::to_string(&ContentStatus::Scheduled).unwrap(),
            r#""scheduled""#
        );
    }
}
