use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use crate::app::model::ChapterStatus;

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Preview how a text file would be segmented, without a database.
    Split(SplitArgs),
    Db {
        #[command(subcommand)]
        command: DbCommand,
    },
    Story {
        #[command(subcommand)]
        command: StoryCommand,
    },
    Chapter {
        #[command(subcommand)]
        command: ChapterCommand,
    },
    Ad {
        #[command(subcommand)]
        command: AdCommand,
    },
    Setting {
        #[command(subcommand)]
        command: SettingCommand,
    },
}

#[derive(Debug, Args)]
pub struct SplitArgs {
    /// Chapter text file.
    #[arg(long)]
    pub file: PathBuf,

    /// Target words per slide.
    #[arg(long, default_value_t = crate::segment::DEFAULT_WORD_LIMIT)]
    pub word_limit: usize,
}

#[derive(Debug, Clone, Args)]
pub struct DatabaseArgs {
    /// SQLite database file.
    #[arg(long, default_value = "novel-slides.db")]
    pub database: PathBuf,
}

#[derive(Debug, Subcommand)]
pub enum DbCommand {
    /// Create the schema if it does not exist.
    Init(DatabaseArgs),
}

#[derive(Debug, Subcommand)]
pub enum StoryCommand {
    Create(StoryCreateArgs),
}

#[derive(Debug, Args)]
pub struct StoryCreateArgs {
    #[command(flatten)]
    pub db: DatabaseArgs,

    #[arg(long)]
    pub writer: String,

    #[arg(long)]
    pub title: String,
}

#[derive(Debug, Subcommand)]
pub enum ChapterCommand {
    Create(ChapterCreateArgs),
    /// Segment a stored chapter's content into slides.
    Split(ChapterSplitArgs),
}

#[derive(Debug, Args)]
pub struct ChapterCreateArgs {
    #[command(flatten)]
    pub db: DatabaseArgs,

    #[arg(long)]
    pub story: String,

    #[arg(long)]
    pub number: i64,

    #[arg(long, default_value = "")]
    pub title: String,

    /// Chapter text file (empty content when omitted).
    #[arg(long)]
    pub file: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = ChapterStatus::Draft)]
    pub status: ChapterStatus,
}

#[derive(Debug, Args)]
pub struct ChapterSplitArgs {
    #[command(flatten)]
    pub db: DatabaseArgs,

    #[arg(long)]
    pub chapter: String,

    /// Target words per slide (default: 400).
    #[arg(long)]
    pub word_limit: Option<i64>,
}

#[derive(Debug, Subcommand)]
pub enum AdCommand {
    Create(AdCreateArgs),
}

#[derive(Debug, Args)]
pub struct AdCreateArgs {
    #[command(flatten)]
    pub db: DatabaseArgs,

    #[arg(long, default_value = "")]
    pub title: String,

    #[arg(long)]
    pub video_url: String,

    /// First day the ad runs (YYYY-MM-DD, UTC).
    #[arg(long)]
    pub start: NaiveDate,

    /// Last day the ad runs, inclusive (YYYY-MM-DD, UTC).
    #[arg(long)]
    pub end: NaiveDate,
}

#[derive(Debug, Subcommand)]
pub enum SettingCommand {
    Set(SettingSetArgs),
    Get(SettingGetArgs),
}

#[derive(Debug, Args)]
pub struct SettingSetArgs {
    #[command(flatten)]
    pub db: DatabaseArgs,

    #[arg(long)]
    pub key: String,

    #[arg(long)]
    pub value: String,
}

#[derive(Debug, Args)]
pub struct SettingGetArgs {
    #[command(flatten)]
    pub db: DatabaseArgs,

    #[arg(long)]
    pub key: String,
}
