//! Operator commands: offline segmentation preview and seeding a database.

use std::io::Write as _;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context as _;
use serde::Serialize;

use crate::app::functions::Functions;
use crate::app::impressions::ImpressionLogger;
use crate::app::model::{NewAd, NewChapter, SplitChapterRequest};
use crate::app::queue::TaskQueue;
use crate::app::sqlite_store::SqliteStore;
use crate::app::store::ReaderStore;
use crate::cli::{
    AdCreateArgs, ChapterCreateArgs, ChapterSplitArgs, DatabaseArgs, SettingGetArgs,
    SettingSetArgs, SplitArgs, StoryCreateArgs,
};
use crate::segment::pack_slides;

pub fn split(args: SplitArgs) -> anyhow::Result<()> {
    if args.word_limit == 0 {
        anyhow::bail!("--word-limit must be at least 1");
    }
    let text = std::fs::read_to_string(&args.file)
        .with_context(|| format!("read chapter text: {}", args.file.display()))?;
    let slides = pack_slides(&text, args.word_limit);
    tracing::debug!(slides = slides.len(), word_limit = args.word_limit, "split text");
    print_json(&slides)
}

pub fn init_db(args: DatabaseArgs) -> anyhow::Result<()> {
    open(&args.database)?;
    tracing::info!(database = %args.database.display(), "database ready");
    Ok(())
}

pub async fn create_story(args: StoryCreateArgs) -> anyhow::Result<()> {
    let store = open(&args.db.database)?;
    let story = store.create_story(&args.writer, &args.title).await?;
    print_json(&story)
}

pub async fn create_chapter(args: ChapterCreateArgs) -> anyhow::Result<()> {
    let content = match &args.file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("read chapter text: {}", path.display()))?,
        None => String::new(),
    };
    let store = open(&args.db.database)?;
    let chapter = store
        .create_chapter(&NewChapter {
            story_id: args.story,
            chapter_number: args.number,
            title: args.title,
            content,
            status: args.status,
        })
        .await?;
    print_json(&chapter)
}

/// Segments the chapter's stored content through the same path the HTTP
/// function uses.
pub async fn split_chapter(args: ChapterSplitArgs) -> anyhow::Result<()> {
    let store: Arc<dyn ReaderStore> = Arc::new(open(&args.db.database)?);
    let chapter = store
        .get_chapter(&args.chapter)
        .await?
        .ok_or_else(|| anyhow::anyhow!("chapter not found: {}", args.chapter))?;

    let functions = Functions::new(
        Arc::clone(&store),
        ImpressionLogger::new(Arc::clone(&store), TaskQueue::new(1)),
    );
    let resp = functions
        .split_chapter(SplitChapterRequest {
            chapter_id: Some(chapter.id),
            text: Some(chapter.content),
            word_limit: args.word_limit,
        })
        .await
        .map_err(|err| anyhow::anyhow!("split chapter: {err}"))?;
    print_json(&resp)
}

pub async fn create_ad(args: AdCreateArgs) -> anyhow::Result<()> {
    let store = open(&args.db.database)?;
    let ad = store
        .create_ad(&NewAd {
            title: args.title,
            video_url: args.video_url,
            start_date: args.start,
            end_date: args.end,
        })
        .await?;
    print_json(&ad)
}

pub async fn set_setting(args: SettingSetArgs) -> anyhow::Result<()> {
    let store = open(&args.db.database)?;
    store.set_setting(&args.key, &args.value).await?;
    tracing::info!(key = %args.key, value = %args.value, "setting saved");
    Ok(())
}

pub async fn get_setting(args: SettingGetArgs) -> anyhow::Result<()> {
    let store = open(&args.db.database)?;
    match store.get_setting(&args.key).await? {
        Some(value) => println!("{value}"),
        None => anyhow::bail!("setting not found: {}", args.key),
    }
    Ok(())
}

fn open(path: &Path) -> anyhow::Result<SqliteStore> {
    SqliteStore::open(path)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value).context("serialize output")?;
    stdout.write_all(b"\n").context("write output")?;
    Ok(())
}
