use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser as _;

use novel_slides::cli::{
    AdCommand, ChapterCommand, Cli, Command, DbCommand, SettingCommand, StoryCommand,
};
use novel_slides::manage;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    novel_slides::logging::init("warn").context("init logging")?;

    let cli = Cli::parse();
    tracing::debug!(?cli, "parsed cli");

    match cli.command {
        Command::Split(args) => manage::split(args).context("split")?,
        Command::Db { command } => match command {
            DbCommand::Init(args) => manage::init_db(args).context("db init")?,
        },
        Command::Story { command } => match command {
            StoryCommand::Create(args) => {
                manage::create_story(args).await.context("story create")?;
            }
        },
        Command::Chapter { command } => match command {
            ChapterCommand::Create(args) => {
                manage::create_chapter(args).await.context("chapter create")?;
            }
            ChapterCommand::Split(args) => {
                manage::split_chapter(args).await.context("chapter split")?;
            }
        },
        Command::Ad { command } => match command {
            AdCommand::Create(args) => manage::create_ad(args).await.context("ad create")?,
        },
        Command::Setting { command } => match command {
            SettingCommand::Set(args) => manage::set_setting(args).await.context("setting set")?,
            SettingCommand::Get(args) => manage::get_setting(args).await.context("setting get")?,
        },
    }

    Ok(())
}
