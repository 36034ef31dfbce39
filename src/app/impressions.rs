use std::sync::Arc;

use crate::app::queue::TaskQueue;
use crate::app::store::ReaderStore;

/// One ad shown to a reader after `slide_position` slides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Impression {
    pub ad_id: String,
    pub slide_position: usize,
}

/// Records ad impressions off the response path.
///
/// Each submission becomes one background job that writes an ad log row and
/// bumps the ad's impression counter per impression. Failures are logged and
/// dropped; the submitting request never sees them.
#[derive(Clone)]
pub struct ImpressionLogger {
    store: Arc<dyn ReaderStore>,
    queue: TaskQueue,
}

impl ImpressionLogger {
    pub fn new(store: Arc<dyn ReaderStore>, queue: TaskQueue) -> Self {
        Self { store, queue }
    }

    pub fn submit(&self, reader_id: String, impressions: Vec<Impression>) {
        if impressions.is_empty() {
            return;
        }
        let store = Arc::clone(&self.store);
        self.queue.spawn("ad-impressions", async move {
            record_all(store.as_ref(), &reader_id, &impressions).await;
        });
    }

    pub async fn flush(&self) {
        self.queue.wait_idle().await;
    }
}

async fn record_all(store: &dyn ReaderStore, reader_id: &str, impressions: &[Impression]) {
    for impression in impressions {
        let ad_id = impression.ad_id.as_str();
        if let Err(err) = store
            .insert_ad_log(reader_id, ad_id, impression.slide_position)
            .await
        {
            tracing::warn!(reader_id, ad_id, ?err, "failed to record ad log");
        }
        if let Err(err) = store.increment_ad_impressions(ad_id).await {
            tracing::warn!(ad_id, ?err, "failed to increment ad impressions");
        }
    }
    tracing::debug!(reader_id, count = impressions.len(), "recorded ad impressions");
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::app::model::NewAd;
    use crate::app::sqlite_store::SqliteStore;

    #[tokio::test]
    async fn logs_each_impression_and_skips_unknown_ads() -> anyhow::Result<()> {
        let store = Arc::new(SqliteStore::open_in_memory()?);
        let ad = store
            .create_ad(&NewAd {
                title: "spot".to_string(),
                video_url: "https://cdn.test/spot.mp4".to_string(),
                start_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
                end_date: NaiveDate::from_ymd_opt(2026, 12, 31).unwrap(),
            })
            .await?;

        let logger = ImpressionLogger::new(store.clone(), TaskQueue::new(2));
        logger.submit(
            "reader-9".to_string(),
            vec![
                Impression {
                    ad_id: ad.id.clone(),
                    slide_position: 6,
                },
                Impression {
                    ad_id: "gone".to_string(),
                    slide_position: 12,
                },
                Impression {
                    ad_id: ad.id.clone(),
                    slide_position: 18,
                },
            ],
        );
        logger.flush().await;

        let logs = store.list_ad_logs("reader-9").await?;
        let positions: Vec<i64> = logs.iter().map(|l| l.slide_position).collect();
        assert_eq!(positions, vec![6, 18]);
        assert!(logs.iter().all(|l| !l.watched));

        let ad = store.get_ad(&ad.id).await?.expect("ad");
        assert_eq!(ad.impressions, 2);
        Ok(())
    }
}
