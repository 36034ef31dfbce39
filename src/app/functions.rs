//! The reader-facing server functions: chapter segmentation, slide delivery
//! with ad breaks, reading progress and ad clicks.
//!
//! Primary writes and reads fail the call. Denormalised counters and impression
//! logging are secondary: their failures are logged and ignored.

use std::sync::Arc;

use chrono::NaiveDate;

use crate::app::impressions::{Impression, ImpressionLogger};
use crate::app::model::{
    ProgressUpdate, SlidesWithAdsRequest, SlidesWithAdsResponse, SplitChapterRequest,
    SplitChapterResponse, SuccessResponse, TrackAdClickRequest, TrackProgressRequest,
    TrackProgressResponse,
};
use crate::app::store::ReaderStore;
use crate::interleave::{ADS_FREQUENCY_KEY, AdFrequency, interleave};
use crate::segment::{DEFAULT_WORD_LIMIT, pack_slides, word_count};

#[derive(Debug, thiserror::Error)]
pub enum FunctionError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("{0}")]
    InvalidInput(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{context}: {message}")]
    Persistence {
        context: &'static str,
        message: String,
    },
}

impl FunctionError {
    fn persistence(context: &'static str, err: anyhow::Error) -> Self {
        Self::Persistence {
            context,
            message: format!("{err:#}"),
        }
    }
}

#[derive(Clone)]
pub struct Functions {
    store: Arc<dyn ReaderStore>,
    impressions: ImpressionLogger,
    default_word_limit: usize,
}

impl Functions {
    pub fn new(store: Arc<dyn ReaderStore>, impressions: ImpressionLogger) -> Self {
        Self {
            store,
            impressions,
            default_word_limit: DEFAULT_WORD_LIMIT,
        }
    }

    pub fn with_default_word_limit(mut self, word_limit: usize) -> Self {
        self.default_word_limit = word_limit.max(1);
        self
    }

    pub fn impressions(&self) -> &ImpressionLogger {
        &self.impressions
    }

    pub async fn split_chapter(
        &self,
        req: SplitChapterRequest,
    ) -> Result<SplitChapterResponse, FunctionError> {
        let chapter_id = required(req.chapter_id, "chapterId")?;
        let text = req.text.ok_or(FunctionError::MissingField("text"))?;
        let word_limit = match req.word_limit {
            None => self.default_word_limit,
            Some(n) if n >= 1 => usize::try_from(n).unwrap_or(usize::MAX),
            Some(n) => {
                return Err(FunctionError::InvalidInput(format!(
                    "wordLimit must be at least 1, got {n}"
                )));
            }
        };

        let drafts = pack_slides(&text, word_limit);
        let slides = self
            .store
            .replace_slides(&chapter_id, &drafts)
            .await
            .map_err(|err| FunctionError::persistence("failed to replace slides", err))?;

        let words = word_count(&text);
        if let Err(err) = self
            .store
            .update_chapter_counts(&chapter_id, slides.len(), words)
            .await
        {
            tracing::warn!(chapter_id = %chapter_id, ?err, "failed to update chapter counts");
        }

        tracing::info!(
            chapter_id = %chapter_id,
            word_limit,
            slide_count = slides.len(),
            word_count = words,
            "split chapter"
        );
        Ok(SplitChapterResponse {
            success: true,
            slide_count: slides.len(),
            slides,
        })
    }

    pub async fn slides_with_ads(
        &self,
        req: SlidesWithAdsRequest,
        today: NaiveDate,
    ) -> Result<SlidesWithAdsResponse, FunctionError> {
        let chapter_id = required(req.chapter_id, "chapterId")?;
        let reader_id = req.reader_id.filter(|id| !id.trim().is_empty());

        let slides = self
            .store
            .list_slides(&chapter_id)
            .await
            .map_err(|err| FunctionError::persistence("failed to load slides", err))?;

        let frequency = match self.store.get_setting(ADS_FREQUENCY_KEY).await {
            Ok(raw) => AdFrequency::parse(raw.as_deref()),
            Err(err) => {
                tracing::warn!(?err, "failed to load ads frequency; using default");
                AdFrequency::default()
            }
        };

        let ads = match self.store.active_ads(today).await {
            Ok(ads) => ads,
            Err(err) => {
                tracing::warn!(?err, "failed to load active ads; serving without ads");
                Vec::new()
            }
        };

        let merged = interleave(slides, &ads, frequency);

        if let Some(reader_id) = reader_id {
            let impressions = merged
                .placements
                .iter()
                .map(|p| Impression {
                    ad_id: ads[p.ad_index].id.clone(),
                    slide_position: p.position,
                })
                .collect();
            self.impressions.submit(reader_id, impressions);
        }

        tracing::debug!(
            chapter_id = %chapter_id,
            total_slides = merged.total_slides,
            ads_inserted = merged.ads_inserted(),
            ?frequency,
            "served slides"
        );
        Ok(SlidesWithAdsResponse {
            total_slides: merged.total_slides,
            ads_inserted: merged.ads_inserted(),
            slides: merged.entries,
        })
    }

    pub async fn track_progress(
        &self,
        req: TrackProgressRequest,
    ) -> Result<TrackProgressResponse, FunctionError> {
        let reader_id = required(req.reader_id, "readerId")?;
        let novel_id = required(req.novel_id, "novelId")?;
        let chapter_id = required(req.chapter_id, "chapterId")?;
        let slide_number = req
            .slide_number
            .ok_or(FunctionError::MissingField("slideNumber"))?;
        if slide_number < 1 {
            return Err(FunctionError::InvalidInput(format!(
                "slideNumber must be at least 1, got {slide_number}"
            )));
        }
        let completed = req.completed.unwrap_or(false);

        let data = self
            .store
            .upsert_progress(&ProgressUpdate {
                reader_id,
                novel_id,
                chapter_id,
                slide_number,
                completed,
            })
            .await
            .map_err(|err| FunctionError::persistence("failed to save progress", err))?;

        if completed {
            if let Err(err) = self.store.increment_chapter_views(&data.chapter_id).await {
                tracing::warn!(chapter_id = %data.chapter_id, ?err, "failed to increment chapter views");
            }
            if let Err(err) = self.store.increment_story_views(&data.novel_id).await {
                tracing::warn!(novel_id = %data.novel_id, ?err, "failed to increment story views");
            }
        }

        Ok(TrackProgressResponse {
            success: true,
            data,
        })
    }

    pub async fn track_ad_click(
        &self,
        req: TrackAdClickRequest,
    ) -> Result<SuccessResponse, FunctionError> {
        let ad_id = required(req.ad_id, "adId")?;

        let ad = self
            .store
            .get_ad(&ad_id)
            .await
            .map_err(|err| FunctionError::persistence("failed to load ad", err))?;
        if ad.is_none() {
            return Err(FunctionError::NotFound(format!("ad not found: {ad_id}")));
        }

        self.store
            .increment_ad_clicks(&ad_id)
            .await
            .map_err(|err| FunctionError::persistence("failed to record ad click", err))?;

        tracing::debug!(ad_id = %ad_id, reader_id = ?req.reader_id, "recorded ad click");
        Ok(SuccessResponse { success: true })
    }
}

fn required(value: Option<String>, field: &'static str) -> Result<String, FunctionError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(FunctionError::MissingField(field))
}
