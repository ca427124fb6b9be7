use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ArticleUser {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

/// A document from the documentation service, rendered as a blog post.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archived_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub template: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_document_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<ArticleUser>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<ArticleUser>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_id: Option<String>,
}

impl Article {
    /// Posts are non-template documents nested under a parent.
    pub fn is_post(&self) -> bool {
        !self.template && self.parent_document_id.is_some()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleView {
    pub document_id: String,
    pub count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_viewed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_viewed_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RenderedArticle {
    pub html: String,
    pub description: String,
    pub image_links: Vec<String>,
    /// Public addresses of the inlined images, in document order.
    pub share_links: Vec<String>,
    pub reading_time_minutes: u32,
}

/// One unit of source-control activity on a calendar day (UTC).
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActivityRecord {
    pub day: u32,
    pub month: u32,
    pub year: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
}

impl ActivityRecord {
    pub fn new(year: i32, month: u32, day: u32) -> Self {
        Self {
            day,
            month,
            year,
            id: None,
        }
    }

    pub fn from_timestamp(at: DateTime<Utc>) -> Self {
        Self::new(at.year(), at.month(), at.day())
    }

    /// Parse an RFC 3339 timestamp and normalize it to its UTC day.
    pub fn parse(timestamp: &str) -> Result<Self> {
        let at = DateTime::parse_from_rfc3339(timestamp)
            .with_context(|| format!("invalid activity timestamp {timestamp:?}"))?;
        Ok(Self::from_timestamp(at.with_timezone(&Utc)))
    }

    pub fn is_valid(&self) -> bool {
        (1..=12).contains(&self.month)
            && self.day >= 1
            && self.day <= crate::folio::activity::days_in_month(self.year, self.month)
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct IntensityRecord {
    pub id: usize,
    pub day: u32,
    pub month: u32,
    pub year: i32,
    pub intensity: u16,
}
