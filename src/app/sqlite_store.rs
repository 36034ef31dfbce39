use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::Context as _;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{Connection, OptionalExtension as _, Row, params};

use crate::app::model::{
    Ad, AdLog, Chapter, ChapterStatus, NewAd, NewChapter, ProgressUpdate, ReadProgress, Slide,
    Story,
};
use crate::app::store::ReaderStore;
use crate::segment::SlideDraft;

pub const SCHEMA_VERSION: u32 = 1;

const SCHEMA_V1: &str = "
CREATE TABLE IF NOT EXISTS stories (
    id         TEXT PRIMARY KEY,
    writer_id  TEXT NOT NULL,
    title      TEXT NOT NULL,
    view_count INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS chapters (
    id             TEXT PRIMARY KEY,
    story_id       TEXT NOT NULL REFERENCES stories(id) ON DELETE CASCADE,
    chapter_number INTEGER NOT NULL,
    title          TEXT NOT NULL DEFAULT '',
    content        TEXT NOT NULL DEFAULT '',
    status         TEXT NOT NULL DEFAULT 'draft',
    slide_count    INTEGER NOT NULL DEFAULT 0,
    word_count     INTEGER NOT NULL DEFAULT 0,
    view_count     INTEGER NOT NULL DEFAULT 0,
    created_at     TEXT NOT NULL,
    updated_at     TEXT NOT NULL,
    UNIQUE (story_id, chapter_number)
);

CREATE TABLE IF NOT EXISTS slides (
    id           TEXT PRIMARY KEY,
    chapter_id   TEXT NOT NULL REFERENCES chapters(id) ON DELETE CASCADE,
    order_number INTEGER NOT NULL,
    content      TEXT NOT NULL,
    created_at   TEXT NOT NULL,
    UNIQUE (chapter_id, order_number)
);

CREATE TABLE IF NOT EXISTS ads (
    id          TEXT PRIMARY KEY,
    title       TEXT NOT NULL DEFAULT '',
    video_url   TEXT NOT NULL,
    start_date  TEXT NOT NULL,
    end_date    TEXT NOT NULL,
    impressions INTEGER NOT NULL DEFAULT 0,
    clicks      INTEGER NOT NULL DEFAULT 0,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS ad_logs (
    id             TEXT PRIMARY KEY,
    reader_id      TEXT NOT NULL,
    ad_id          TEXT NOT NULL REFERENCES ads(id) ON DELETE CASCADE,
    slide_position INTEGER NOT NULL,
    watched        INTEGER NOT NULL DEFAULT 0,
    created_at     TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS reads (
    id           TEXT PRIMARY KEY,
    reader_id    TEXT NOT NULL,
    novel_id     TEXT NOT NULL REFERENCES stories(id) ON DELETE CASCADE,
    chapter_id   TEXT NOT NULL REFERENCES chapters(id) ON DELETE CASCADE,
    slide_number INTEGER NOT NULL,
    completed    INTEGER NOT NULL DEFAULT 0,
    completed_at TEXT,
    last_read_at TEXT NOT NULL,
    UNIQUE (reader_id, novel_id, chapter_id)
);

CREATE TABLE IF NOT EXISTS system_settings (
    key        TEXT PRIMARY KEY,
    value      TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_ads_window ON ads(start_date, end_date);
CREATE INDEX IF NOT EXISTS idx_ad_logs_reader ON ad_logs(reader_id);
";

const STORY_COLUMNS: &str = "id, writer_id, title, view_count, created_at";
const CHAPTER_COLUMNS: &str = "id, story_id, chapter_number, title, content, status, \
     slide_count, word_count, view_count, created_at, updated_at";
const SLIDE_COLUMNS: &str = "id, chapter_id, order_number, content, created_at";
const AD_COLUMNS: &str =
    "id, title, video_url, start_date, end_date, impressions, clicks, created_at";
const AD_LOG_COLUMNS: &str = "id, reader_id, ad_id, slide_position, watched, created_at";
const READ_COLUMNS: &str = "id, reader_id, novel_id, chapter_id, slide_number, completed, \
     completed_at, last_read_at";

/// SQLite-backed [`ReaderStore`]. One connection; statements run on the
/// blocking pool and are serialised by the mutex.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let conn =
            Connection::open(path).with_context(|| format!("open database: {}", path.display()))?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory database")?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> anyhow::Result<Self> {
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            ",
        )
        .context("apply pragmas")?;
        migrate(&conn).context("migrate schema")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn call<T, F>(&self, f: F) -> anyhow::Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> anyhow::Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|_| anyhow::anyhow!("database connection lock poisoned"))?;
            f(&mut conn)
        })
        .await
        .context("join database task")?
    }
}

fn migrate(conn: &Connection) -> anyhow::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version    INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL
        );",
    )?;
    let applied: Option<u32> = conn
        .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
            row.get(0)
        })
        .context("read schema version")?;

    if applied.unwrap_or(0) < SCHEMA_VERSION {
        conn.execute_batch(SCHEMA_V1).context("create tables")?;
        conn.execute(
            "INSERT OR IGNORE INTO schema_migrations(version, applied_at) VALUES (?1, ?2)",
            params![SCHEMA_VERSION, Utc::now()],
        )?;
        tracing::debug!(version = SCHEMA_VERSION, "applied schema migration");
    }
    Ok(())
}

impl FromSql for ChapterStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let raw = value.as_str()?;
        ChapterStatus::parse(raw).map_err(|err| FromSqlError::Other(err.into()))
    }
}

impl ToSql for ChapterStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

fn story_from_row(row: &Row<'_>) -> rusqlite::Result<Story> {
    Ok(Story {
        id: row.get(0)?,
        writer_id: row.get(1)?,
        title: row.get(2)?,
        view_count: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn chapter_from_row(row: &Row<'_>) -> rusqlite::Result<Chapter> {
    Ok(Chapter {
        id: row.get(0)?,
        story_id: row.get(1)?,
        chapter_number: row.get(2)?,
        title: row.get(3)?,
        content: row.get(4)?,
        status: row.get(5)?,
        slide_count: row.get(6)?,
        word_count: row.get(7)?,
        view_count: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

fn slide_from_row(row: &Row<'_>) -> rusqlite::Result<Slide> {
    Ok(Slide {
        id: row.get(0)?,
        chapter_id: row.get(1)?,
        order_number: row.get(2)?,
        content: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn ad_from_row(row: &Row<'_>) -> rusqlite::Result<Ad> {
    Ok(Ad {
        id: row.get(0)?,
        title: row.get(1)?,
        video_url: row.get(2)?,
        start_date: row.get(3)?,
        end_date: row.get(4)?,
        impressions: row.get(5)?,
        clicks: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn ad_log_from_row(row: &Row<'_>) -> rusqlite::Result<AdLog> {
    Ok(AdLog {
        id: row.get(0)?,
        reader_id: row.get(1)?,
        ad_id: row.get(2)?,
        slide_position: row.get(3)?,
        watched: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn read_from_row(row: &Row<'_>) -> rusqlite::Result<ReadProgress> {
    Ok(ReadProgress {
        id: row.get(0)?,
        reader_id: row.get(1)?,
        novel_id: row.get(2)?,
        chapter_id: row.get(3)?,
        slide_number: row.get(4)?,
        completed: row.get(5)?,
        completed_at: row.get(6)?,
        last_read_at: row.get(7)?,
    })
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn ensure_updated(rows: usize, what: &str, id: &str) -> anyhow::Result<()> {
    if rows == 0 {
        anyhow::bail!("{what} not found: {id}");
    }
    Ok(())
}

#[async_trait]
impl ReaderStore for SqliteStore {
    async fn create_story(&self, writer_id: &str, title: &str) -> anyhow::Result<Story> {
        let story = Story {
            id: new_id(),
            writer_id: writer_id.to_string(),
            title: title.to_string(),
            view_count: 0,
            created_at: Utc::now(),
        };
        self.call(move |conn| {
            conn.execute(
                "INSERT INTO stories (id, writer_id, title, view_count, created_at)
                 VALUES (?1, ?2, ?3, 0, ?4)",
                params![story.id, story.writer_id, story.title, story.created_at],
            )
            .context("insert story")?;
            Ok(story)
        })
        .await
    }

    async fn get_story(&self, story_id: &str) -> anyhow::Result<Option<Story>> {
        let story_id = story_id.to_string();
        self.call(move |conn| {
            conn.query_row(
                &format!("SELECT {STORY_COLUMNS} FROM stories WHERE id = ?1"),
                params![story_id],
                story_from_row,
            )
            .optional()
            .context("select story")
        })
        .await
    }

    async fn create_chapter(&self, chapter: &NewChapter) -> anyhow::Result<Chapter> {
        let now = Utc::now();
        let created = Chapter {
            id: new_id(),
            story_id: chapter.story_id.clone(),
            chapter_number: chapter.chapter_number,
            title: chapter.title.clone(),
            content: chapter.content.clone(),
            status: chapter.status,
            slide_count: 0,
            word_count: 0,
            view_count: 0,
            created_at: now,
            updated_at: now,
        };
        self.call(move |conn| {
            conn.execute(
                "INSERT INTO chapters (id, story_id, chapter_number, title, content, status,
                                       slide_count, word_count, view_count, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, 0, 0, ?7, ?7)",
                params![
                    created.id,
                    created.story_id,
                    created.chapter_number,
                    created.title,
                    created.content,
                    created.status,
                    now,
                ],
            )
            .context("insert chapter")?;
            Ok(created)
        })
        .await
    }

    async fn get_chapter(&self, chapter_id: &str) -> anyhow::Result<Option<Chapter>> {
        let chapter_id = chapter_id.to_string();
        self.call(move |conn| {
            conn.query_row(
                &format!("SELECT {CHAPTER_COLUMNS} FROM chapters WHERE id = ?1"),
                params![chapter_id],
                chapter_from_row,
            )
            .optional()
            .context("select chapter")
        })
        .await
    }

    async fn replace_slides(
        &self,
        chapter_id: &str,
        drafts: &[SlideDraft],
    ) -> anyhow::Result<Vec<Slide>> {
        let now = Utc::now();
        let slides: Vec<Slide> = drafts
            .iter()
            .map(|draft| Slide {
                id: new_id(),
                chapter_id: chapter_id.to_string(),
                order_number: draft.order_number,
                content: draft.content.clone(),
                created_at: now,
            })
            .collect();
        let chapter_id = chapter_id.to_string();

        self.call(move |conn| {
            let tx = conn.transaction().context("begin transaction")?;
            let removed = tx
                .execute("DELETE FROM slides WHERE chapter_id = ?1", params![chapter_id])
                .context("delete slides")?;
            {
                let mut stmt = tx
                    .prepare(
                        "INSERT INTO slides (id, chapter_id, order_number, content, created_at)
                         VALUES (?1, ?2, ?3, ?4, ?5)",
                    )
                    .context("prepare slide insert")?;
                for slide in &slides {
                    stmt.execute(params![
                        slide.id,
                        slide.chapter_id,
                        slide.order_number,
                        slide.content,
                        slide.created_at,
                    ])
                    .with_context(|| format!("insert slide {}", slide.order_number))?;
                }
            }
            tx.commit().context("commit slides")?;

            tracing::debug!(
                chapter_id = %chapter_id,
                removed,
                inserted = slides.len(),
                "replaced slides"
            );
            Ok(slides)
        })
        .await
    }

    async fn list_slides(&self, chapter_id: &str) -> anyhow::Result<Vec<Slide>> {
        let chapter_id = chapter_id.to_string();
        self.call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SLIDE_COLUMNS} FROM slides WHERE chapter_id = ?1 ORDER BY order_number ASC"
            ))?;
            let slides = stmt
                .query_map(params![chapter_id], slide_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .context("select slides")?;
            Ok(slides)
        })
        .await
    }

    async fn update_chapter_counts(
        &self,
        chapter_id: &str,
        slide_count: usize,
        word_count: usize,
    ) -> anyhow::Result<()> {
        let slide_count = i64::try_from(slide_count).context("slide count overflow")?;
        let word_count = i64::try_from(word_count).context("word count overflow")?;
        let chapter_id = chapter_id.to_string();
        self.call(move |conn| {
            let rows = conn
                .execute(
                    "UPDATE chapters SET slide_count = ?2, word_count = ?3, updated_at = ?4
                     WHERE id = ?1",
                    params![chapter_id, slide_count, word_count, Utc::now()],
                )
                .context("update chapter counts")?;
            ensure_updated(rows, "chapter", &chapter_id)
        })
        .await
    }

    async fn get_setting(&self, key: &str) -> anyhow::Result<Option<String>> {
        let key = key.to_string();
        self.call(move |conn| {
            conn.query_row(
                "SELECT value FROM system_settings WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .context("select setting")
        })
        .await
    }

    async fn set_setting(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let key = key.to_string();
        let value = value.to_string();
        self.call(move |conn| {
            conn.execute(
                "INSERT INTO system_settings (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                params![key, value, Utc::now()],
            )
            .context("upsert setting")?;
            Ok(())
        })
        .await
    }

    async fn create_ad(&self, ad: &NewAd) -> anyhow::Result<Ad> {
        if ad.end_date < ad.start_date {
            anyhow::bail!(
                "ad end date {} is before start date {}",
                ad.end_date,
                ad.start_date
            );
        }
        let created = Ad {
            id: new_id(),
            title: ad.title.clone(),
            video_url: ad.video_url.clone(),
            start_date: ad.start_date,
            end_date: ad.end_date,
            impressions: 0,
            clicks: 0,
            created_at: Utc::now(),
        };
        self.call(move |conn| {
            conn.execute(
                "INSERT INTO ads (id, title, video_url, start_date, end_date, impressions, clicks, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, 0, 0, ?6)",
                params![
                    created.id,
                    created.title,
                    created.video_url,
                    created.start_date,
                    created.end_date,
                    created.created_at,
                ],
            )
            .context("insert ad")?;
            Ok(created)
        })
        .await
    }

    async fn get_ad(&self, ad_id: &str) -> anyhow::Result<Option<Ad>> {
        let ad_id = ad_id.to_string();
        self.call(move |conn| {
            conn.query_row(
                &format!("SELECT {AD_COLUMNS} FROM ads WHERE id = ?1"),
                params![ad_id],
                ad_from_row,
            )
            .optional()
            .context("select ad")
        })
        .await
    }

    async fn active_ads(&self, date: NaiveDate) -> anyhow::Result<Vec<Ad>> {
        self.call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {AD_COLUMNS} FROM ads
                 WHERE start_date <= ?1 AND end_date >= ?1
                 ORDER BY created_at ASC, id ASC"
            ))?;
            let ads = stmt
                .query_map(params![date], ad_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .context("select active ads")?;
            Ok(ads)
        })
        .await
    }

    async fn insert_ad_log(
        &self,
        reader_id: &str,
        ad_id: &str,
        slide_position: usize,
    ) -> anyhow::Result<AdLog> {
        let log = AdLog {
            id: new_id(),
            reader_id: reader_id.to_string(),
            ad_id: ad_id.to_string(),
            slide_position: i64::try_from(slide_position).context("slide position overflow")?,
            watched: false,
            created_at: Utc::now(),
        };
        self.call(move |conn| {
            conn.execute(
                "INSERT INTO ad_logs (id, reader_id, ad_id, slide_position, watched, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    log.id,
                    log.reader_id,
                    log.ad_id,
                    log.slide_position,
                    log.watched,
                    log.created_at,
                ],
            )
            .context("insert ad log")?;
            Ok(log)
        })
        .await
    }

    async fn list_ad_logs(&self, reader_id: &str) -> anyhow::Result<Vec<AdLog>> {
        let reader_id = reader_id.to_string();
        self.call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {AD_LOG_COLUMNS} FROM ad_logs WHERE reader_id = ?1
                 ORDER BY created_at ASC, slide_position ASC"
            ))?;
            let logs = stmt
                .query_map(params![reader_id], ad_log_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .context("select ad logs")?;
            Ok(logs)
        })
        .await
    }

    async fn increment_ad_impressions(&self, ad_id: &str) -> anyhow::Result<()> {
        let ad_id = ad_id.to_string();
        self.call(move |conn| {
            let rows = conn
                .execute(
                    "UPDATE ads SET impressions = impressions + 1 WHERE id = ?1",
                    params![ad_id],
                )
                .context("increment ad impressions")?;
            ensure_updated(rows, "ad", &ad_id)
        })
        .await
    }

    async fn increment_ad_clicks(&self, ad_id: &str) -> anyhow::Result<()> {
        let ad_id = ad_id.to_string();
        self.call(move |conn| {
            let rows = conn
                .execute(
                    "UPDATE ads SET clicks = clicks + 1 WHERE id = ?1",
                    params![ad_id],
                )
                .context("increment ad clicks")?;
            ensure_updated(rows, "ad", &ad_id)
        })
        .await
    }

    async fn upsert_progress(&self, update: &ProgressUpdate) -> anyhow::Result<ReadProgress> {
        let now = Utc::now();
        let completed_at = update.completed.then_some(now);
        let update = update.clone();
        self.call(move |conn| {
            conn.query_row(
                &format!(
                    "INSERT INTO reads (id, reader_id, novel_id, chapter_id, slide_number, completed,
                                        completed_at, last_read_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                     ON CONFLICT(reader_id, novel_id, chapter_id) DO UPDATE SET
                         slide_number = excluded.slide_number,
                         completed = excluded.completed,
                         completed_at = excluded.completed_at,
                         last_read_at = excluded.last_read_at
                     RETURNING {READ_COLUMNS}"
                ),
                params![
                    new_id(),
                    update.reader_id,
                    update.novel_id,
                    update.chapter_id,
                    update.slide_number,
                    update.completed,
                    completed_at,
                    now,
                ],
                read_from_row,
            )
            .context("upsert read progress")
        })
        .await
    }

    async fn get_progress(
        &self,
        reader_id: &str,
        novel_id: &str,
        chapter_id: &str,
    ) -> anyhow::Result<Option<ReadProgress>> {
        let key = (
            reader_id.to_string(),
            novel_id.to_string(),
            chapter_id.to_string(),
        );
        self.call(move |conn| {
            let (reader_id, novel_id, chapter_id) = key;
            conn.query_row(
                &format!(
                    "SELECT {READ_COLUMNS} FROM reads
                     WHERE reader_id = ?1 AND novel_id = ?2 AND chapter_id = ?3"
                ),
                params![reader_id, novel_id, chapter_id],
                read_from_row,
            )
            .optional()
            .context("select read progress")
        })
        .await
    }

    async fn increment_chapter_views(&self, chapter_id: &str) -> anyhow::Result<()> {
        let chapter_id = chapter_id.to_string();
        self.call(move |conn| {
            let rows = conn
                .execute(
                    "UPDATE chapters SET view_count = view_count + 1 WHERE id = ?1",
                    params![chapter_id],
                )
                .context("increment chapter views")?;
            ensure_updated(rows, "chapter", &chapter_id)
        })
        .await
    }

    async fn increment_story_views(&self, story_id: &str) -> anyhow::Result<()> {
        let story_id = story_id.to_string();
        self.call(move |conn| {
            let rows = conn
                .execute(
                    "UPDATE stories SET view_count = view_count + 1 WHERE id = ?1",
                    params![story_id],
                )
                .context("increment story views")?;
            ensure_updated(rows, "story", &story_id)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::pack_slides;

    async fn seeded() -> anyhow::Result<(SqliteStore, Story, Chapter)> {
        let store = SqliteStore::open_in_memory()?;
        let story = store.create_story("writer-1", "The Long Road").await?;
        let chapter = store
            .create_chapter(&NewChapter {
                story_id: story.id.clone(),
                chapter_number: 1,
                title: "Departure".to_string(),
                content: String::new(),
                status: ChapterStatus::Draft,
            })
            .await?;
        Ok((store, story, chapter))
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[tokio::test]
    async fn replace_slides_discards_previous_set() -> anyhow::Result<()> {
        let (store, _, chapter) = seeded().await?;

        let first = pack_slides("A. B. C. D. E.", 1);
        store.replace_slides(&chapter.id, &first).await?;
        assert_eq!(store.list_slides(&chapter.id).await?.len(), 5);

        let second = pack_slides("Only one slide here. And more.", 100);
        let created = store.replace_slides(&chapter.id, &second).await?;
        let listed = store.list_slides(&chapter.id).await?;
        assert_eq!(listed, created);
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].order_number, 1);
        assert_eq!(listed[0].content, "Only one slide here. And more.");
        Ok(())
    }

    #[tokio::test]
    async fn failed_insert_keeps_old_slides() -> anyhow::Result<()> {
        let (store, _, chapter) = seeded().await?;
        store
            .replace_slides(&chapter.id, &pack_slides("Keep me. Me too.", 1))
            .await?;

        let duplicate = vec![
            SlideDraft {
                order_number: 1,
                content: "x.".to_string(),
            },
            SlideDraft {
                order_number: 1,
                content: "y.".to_string(),
            },
        ];
        assert!(store.replace_slides(&chapter.id, &duplicate).await.is_err());

        let contents: Vec<String> = store
            .list_slides(&chapter.id)
            .await?
            .into_iter()
            .map(|s| s.content)
            .collect();
        assert_eq!(contents, vec!["Keep me.", "Me too."]);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_replacements_leave_one_complete_set() -> anyhow::Result<()> {
        let (store, _, chapter) = seeded().await?;
        let short = pack_slides("One. Two. Three.", 1);
        let long = pack_slides("Alpha. Beta. Gamma. Delta. Epsilon.", 1);

        for _ in 0..10 {
            let (a, b) = tokio::join!(
                store.replace_slides(&chapter.id, &short),
                store.replace_slides(&chapter.id, &long),
            );
            a?;
            b?;

            let listed = store.list_slides(&chapter.id).await?;
            let contents: Vec<&str> = listed.iter().map(|s| s.content.as_str()).collect();
            let expected_short: Vec<&str> = short.iter().map(|s| s.content.as_str()).collect();
            let expected_long: Vec<&str> = long.iter().map(|s| s.content.as_str()).collect();
            assert!(
                contents == expected_short || contents == expected_long,
                "mixed slide set: {contents:?}"
            );

            let numbers: Vec<u32> = listed.iter().map(|s| s.order_number).collect();
            let want: Vec<u32> = (1..=listed.len() as u32).collect();
            assert_eq!(numbers, want);
        }
        Ok(())
    }

    #[tokio::test]
    async fn slides_for_unknown_chapter_are_rejected() -> anyhow::Result<()> {
        let store = SqliteStore::open_in_memory()?;
        let err = store
            .replace_slides("missing", &pack_slides("Hi.", 10))
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("insert slide"));
        Ok(())
    }

    #[tokio::test]
    async fn active_ads_respect_inclusive_window_and_order() -> anyhow::Result<()> {
        let store = SqliteStore::open_in_memory()?;
        let first = store
            .create_ad(&NewAd {
                title: "first".to_string(),
                video_url: "https://cdn.test/1.mp4".to_string(),
                start_date: date("2026-01-01"),
                end_date: date("2026-01-31"),
            })
            .await?;
        let second = store
            .create_ad(&NewAd {
                title: "second".to_string(),
                video_url: "https://cdn.test/2.mp4".to_string(),
                start_date: date("2026-01-31"),
                end_date: date("2026-02-28"),
            })
            .await?;

        let ids = |ads: Vec<Ad>| ads.into_iter().map(|a| a.id).collect::<Vec<_>>();
        assert_eq!(ids(store.active_ads(date("2026-01-01")).await?), vec![first.id.clone()]);
        assert_eq!(
            ids(store.active_ads(date("2026-01-31")).await?),
            vec![first.id.clone(), second.id.clone()]
        );
        assert_eq!(ids(store.active_ads(date("2026-02-28")).await?), vec![second.id.clone()]);
        assert!(store.active_ads(date("2026-03-01")).await?.is_empty());

        for day in ["2025-12-31", "2026-01-15", "2026-01-31", "2026-02-10", "2026-03-01"] {
            let day = date(day);
            let expected: Vec<String> = [&first, &second]
                .into_iter()
                .filter(|ad| ad.is_active_on(day))
                .map(|ad| ad.id.clone())
                .collect();
            assert_eq!(ids(store.active_ads(day).await?), expected, "{day}");
        }
        Ok(())
    }

    #[tokio::test]
    async fn ad_with_inverted_window_is_rejected() -> anyhow::Result<()> {
        let store = SqliteStore::open_in_memory()?;
        let result = store
            .create_ad(&NewAd {
                title: String::new(),
                video_url: "https://cdn.test/x.mp4".to_string(),
                start_date: date("2026-05-02"),
                end_date: date("2026-05-01"),
            })
            .await;
        assert!(result.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn settings_round_trip_and_overwrite() -> anyhow::Result<()> {
        let store = SqliteStore::open_in_memory()?;
        assert_eq!(store.get_setting("ads_frequency").await?, None);
        store.set_setting("ads_frequency", "4").await?;
        store.set_setting("ads_frequency", "8").await?;
        assert_eq!(store.get_setting("ads_frequency").await?.as_deref(), Some("8"));
        Ok(())
    }

    #[tokio::test]
    async fn progress_upsert_keeps_one_row_per_key() -> anyhow::Result<()> {
        let (store, story, chapter) = seeded().await?;
        let mut update = ProgressUpdate {
            reader_id: "reader-1".to_string(),
            novel_id: story.id.clone(),
            chapter_id: chapter.id.clone(),
            slide_number: 3,
            completed: false,
        };
        let first = store.upsert_progress(&update).await?;
        update.slide_number = 9;
        update.completed = true;
        let second = store.upsert_progress(&update).await?;

        assert_eq!(first.id, second.id);
        assert_eq!(second.slide_number, 9);
        assert!(second.completed);
        assert!(second.completed_at.is_some());

        let stored = store
            .get_progress("reader-1", &story.id, &chapter.id)
            .await?
            .expect("progress row");
        assert_eq!(stored, second);

        let count: i64 = store
            .call(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM reads", [], |row| row.get(0))?))
            .await?;
        assert_eq!(count, 1);
        Ok(())
    }

    #[tokio::test]
    async fn counters_increment_and_report_missing_rows() -> anyhow::Result<()> {
        let (store, story, chapter) = seeded().await?;
        store.increment_chapter_views(&chapter.id).await?;
        store.increment_chapter_views(&chapter.id).await?;
        store.increment_story_views(&story.id).await?;

        let chapter = store.get_chapter(&chapter.id).await?.expect("chapter");
        let story = store.get_story(&story.id).await?.expect("story");
        assert_eq!(chapter.view_count, 2);
        assert_eq!(story.view_count, 1);

        assert!(store.increment_chapter_views("nope").await.is_err());
        assert!(store.increment_ad_clicks("nope").await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn schema_survives_reopen() -> anyhow::Result<()> {
        let dir = tempfile::TempDir::new()?;
        let path = dir.path().join("reader.db");
        {
            let store = SqliteStore::open(&path)?;
            store.set_setting("ads_frequency", "3").await?;
        }
        let store = SqliteStore::open(&path)?;
        assert_eq!(store.get_setting("ads_frequency").await?.as_deref(), Some("3"));
        Ok(())
    }
}
