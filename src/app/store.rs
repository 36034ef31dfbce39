use async_trait::async_trait;
use chrono::NaiveDate;

use crate::app::model::{
    Ad, AdLog, Chapter, NewAd, NewChapter, ProgressUpdate, ReadProgress, Slide, Story,
};
use crate::segment::SlideDraft;

/// The relational store the reader functions run against.
///
/// Counter increments are atomic in the store; callers never read-modify-write.
#[async_trait]
pub trait ReaderStore: Send + Sync {
    async fn create_story(&self, writer_id: &str, title: &str) -> anyhow::Result<Story>;
    async fn get_story(&self, story_id: &str) -> anyhow::Result<Option<Story>>;
    async fn create_chapter(&self, chapter: &NewChapter) -> anyhow::Result<Chapter>;
    async fn get_chapter(&self, chapter_id: &str) -> anyhow::Result<Option<Chapter>>;

    /// Deletes every slide of the chapter and inserts `drafts` in their place,
    /// atomically.
    async fn replace_slides(
        &self,
        chapter_id: &str,
        drafts: &[SlideDraft],
    ) -> anyhow::Result<Vec<Slide>>;
    async fn list_slides(&self, chapter_id: &str) -> anyhow::Result<Vec<Slide>>;
    async fn update_chapter_counts(
        &self,
        chapter_id: &str,
        slide_count: usize,
        word_count: usize,
    ) -> anyhow::Result<()>;

    async fn get_setting(&self, key: &str) -> anyhow::Result<Option<String>>;
    async fn set_setting(&self, key: &str, value: &str) -> anyhow::Result<()>;

    async fn create_ad(&self, ad: &NewAd) -> anyhow::Result<Ad>;
    async fn get_ad(&self, ad_id: &str) -> anyhow::Result<Option<Ad>>;
    /// Ads whose validity window contains `date`, in creation order.
    async fn active_ads(&self, date: NaiveDate) -> anyhow::Result<Vec<Ad>>;
    async fn insert_ad_log(
        &self,
        reader_id: &str,
        ad_id: &str,
        slide_position: usize,
    ) -> anyhow::Result<AdLog>;
    async fn list_ad_logs(&self, reader_id: &str) -> anyhow::Result<Vec<AdLog>>;
    async fn increment_ad_impressions(&self, ad_id: &str) -> anyhow::Result<()>;
    async fn increment_ad_clicks(&self, ad_id: &str) -> anyhow::Result<()>;

    /// Inserts or overwrites the record keyed by (reader, novel, chapter).
    async fn upsert_progress(&self, update: &ProgressUpdate) -> anyhow::Result<ReadProgress>;
    async fn get_progress(
        &self,
        reader_id: &str,
        novel_id: &str,
        chapter_id: &str,
    ) -> anyhow::Result<Option<ReadProgress>>;
    async fn increment_chapter_views(&self, chapter_id: &str) -> anyhow::Result<()>;
    async fn increment_story_views(&self, story_id: &str) -> anyhow::Result<()>;
}
