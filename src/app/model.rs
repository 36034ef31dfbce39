use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::interleave::Entry;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ChapterStatus {
    Draft,
    Published,
}

impl ChapterStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
        }
    }

    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        match raw {
            "draft" => Ok(Self::Draft),
            "published" => Ok(Self::Published),
            other => anyhow::bail!("unknown chapter status: {other}"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Story {
    pub id: String,
    pub writer_id: String,
    pub title: String,
    pub view_count: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chapter {
    pub id: String,
    pub story_id: String,
    pub chapter_number: i64,
    pub title: String,
    pub content: String,
    pub status: ChapterStatus,
    pub slide_count: i64,
    pub word_count: i64,
    pub view_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewChapter {
    pub story_id: String,
    pub chapter_number: i64,
    pub title: String,
    pub content: String,
    pub status: ChapterStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Slide {
    pub id: String,
    pub chapter_id: String,
    pub order_number: u32,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Ad {
    pub id: String,
    pub title: String,
    pub video_url: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub impressions: i64,
    pub clicks: i64,
    pub created_at: DateTime<Utc>,
}

impl Ad {
    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }
}

#[derive(Debug, Clone)]
pub struct NewAd {
    pub title: String,
    pub video_url: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdLog {
    pub id: String,
    pub reader_id: String,
    pub ad_id: String,
    pub slide_position: i64,
    pub watched: bool,
    pub created_at: DateTime<Utc>,
}

/// A reader's position in one chapter of one novel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReadProgress {
    pub id: String,
    pub reader_id: String,
    pub novel_id: String,
    pub chapter_id: String,
    pub slide_number: i64,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub last_read_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    pub reader_id: String,
    pub novel_id: String,
    pub chapter_id: String,
    pub slide_number: i64,
    pub completed: bool,
}

// Function payloads. Required fields are optional here so that a missing one
// is reported by name rather than as a generic body rejection.

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitChapterRequest {
    pub chapter_id: Option<String>,
    pub text: Option<String>,
    pub word_limit: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitChapterResponse {
    pub success: bool,
    pub slide_count: usize,
    pub slides: Vec<Slide>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlidesWithAdsRequest {
    pub chapter_id: Option<String>,
    pub reader_id: Option<String>,
}

pub type SlideEntry = Entry<Slide, Ad>;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlidesWithAdsResponse {
    pub slides: Vec<SlideEntry>,
    pub total_slides: usize,
    pub ads_inserted: usize,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackProgressRequest {
    pub reader_id: Option<String>,
    pub novel_id: Option<String>,
    pub chapter_id: Option<String>,
    pub slide_number: Option<i64>,
    pub completed: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrackProgressResponse {
    pub success: bool,
    pub data: ReadProgress,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackAdClickRequest {
    pub ad_id: Option<String>,
    pub reader_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}
