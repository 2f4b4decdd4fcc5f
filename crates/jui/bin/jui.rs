#[macro_use]
extern crate log;

use std::{sync::Arc, time::Duration};

use clap::{Parser, Subcommand, ValueEnum};
use futures::{StreamExt, future, stream::BoxStream};
use futures_signals::signal::SignalExt;
use jui::{
    application::worker::{self, downloads::Snapshot},
    domain::{
        entities::reader::PageStatus,
        repositories::chapter::ChapterRepository,
        services::{download::DownloadStateTracker, reader::ReaderChapterWindow},
    },
    infrastructure::{config::Config, repositories::server::ServerRepositoryImpl},
};
use jui_lib::prelude::ChapterKey;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_stream::wrappers::LinesStream;

#[derive(Parser)]
#[clap(version, about = "Reader and download client for a manga server")]
struct Opts {
    /// Path to config file
    #[clap(long)]
    config: Option<String>,
    #[clap(subcommand)]
    subcmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Open a chapter and load one of its pages
    Read {
        manga_id: i64,
        chapter_index: i64,
        /// Zero based page to load
        #[clap(long, default_value_t = 0)]
        page: usize,
    },
    /// Control the server side download of a chapter
    Download {
        #[clap(value_enum)]
        action: DownloadAction,
        /// Chapter as manga_id:chapter_index
        chapter: ChapterKey,
    },
    /// Follow the download state of chapters until interrupted
    Watch {
        /// Chapters as manga_id:chapter_index
        #[clap(required = true)]
        chapters: Vec<ChapterKey>,
        /// Read downloader status frames from stdin, one JSON object per line,
        /// instead of polling the server
        #[clap(long)]
        stdin: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum DownloadAction {
    Start,
    Stop,
    Delete,
}

fn init_logger() {
    let mut builder = env_logger::Builder::from_default_env();
    if std::env::var("RUST_LOG").is_err() {
        if let Ok(jui_log) = std::env::var("JUI_LOG") {
            builder.parse_filters(&format!("jui={jui_log},jui_lib={jui_log}"));
        }
    }
    builder.init();
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    init_logger();

    let opts: Opts = Opts::parse();
    let config = Config::open(opts.config)?;

    debug!("config: {:?}", config);

    let repo = Arc::new(ServerRepositoryImpl::from_config(&config)?);

    match opts.subcmd {
        Command::Read {
            manga_id,
            chapter_index,
            page,
        } => read(repo, manga_id, chapter_index, page).await,
        Command::Download { action, chapter } => download(repo, action, chapter).await,
        Command::Watch { chapters, stdin } => {
            let snapshots = if stdin {
                let lines = LinesStream::new(BufReader::new(tokio::io::stdin()).lines());
                worker::downloads::frames(lines.filter_map(|line| future::ready(line.ok())))
                    .boxed()
            } else {
                worker::downloads::poll(
                    repo.clone(),
                    Duration::from_millis(config.download_poll_interval),
                )
                .boxed()
            };

            watch(repo, &chapters, snapshots).await
        }
    }
}

async fn read(
    repo: Arc<ServerRepositoryImpl>,
    manga_id: i64,
    chapter_index: i64,
    page: usize,
) -> Result<(), anyhow::Error> {
    let window = ReaderChapterWindow::new(repo.clone(), repo);
    window.init(manga_id, chapter_index).await?;

    let pages = window.pages().get_cloned();
    if let Some(chapter) = window.chapter().get_cloned() {
        println!("{} ({} pages)", chapter.chapter().name, pages.len());
    }

    let Some(reader_page) = pages.get(page).cloned() else {
        anyhow::bail!("chapter has no page {page}");
    };

    window.progress(page);

    let mut statuses = reader_page.status().signal().to_stream();
    while let Some(status) = statuses.next().await {
        match status {
            PageStatus::Ready => {
                let size = reader_page
                    .image()
                    .lock_ref()
                    .as_ref()
                    .map(|image| image.len())
                    .unwrap_or_default();
                println!("page {page}: {size} bytes");
                break;
            }
            PageStatus::Error => {
                println!("page {page}: failed to load");
                break;
            }
            PageStatus::Queue | PageStatus::Loading => {}
        }
    }

    for (label, slot) in [
        ("previous", window.previous_chapter()),
        ("next", window.next_chapter()),
    ] {
        match slot.get_cloned() {
            Some(chapter) => println!("{label}: {}", chapter.chapter().name),
            None => println!("{label}: -"),
        }
    }

    window.close();

    Ok(())
}

async fn download(
    repo: Arc<ServerRepositoryImpl>,
    action: DownloadAction,
    key: ChapterKey,
) -> Result<(), anyhow::Error> {
    let chapter = repo.get_chapter(key.manga_id, key.chapter_index).await?;

    let tracker = DownloadStateTracker::new(repo.as_ref().clone());
    let item = tracker.track(chapter.clone());

    match action {
        DownloadAction::Start => tracker.start_download(&chapter).await?,
        DownloadAction::Stop => tracker.stop_download(&chapter).await?,
        DownloadAction::Delete => tracker.delete_download(&chapter).await?,
    }

    println!("{key}: {:?}", item.download_state().get());

    Ok(())
}

async fn watch(
    repo: Arc<ServerRepositoryImpl>,
    keys: &[ChapterKey],
    snapshots: BoxStream<'static, Snapshot>,
) -> Result<(), anyhow::Error> {
    let tracker = Arc::new(DownloadStateTracker::new(repo.as_ref().clone()));

    for key in keys {
        let chapter = repo.get_chapter(key.manga_id, key.chapter_index).await?;
        let item = tracker.track(chapter);

        let key = *key;
        tokio::spawn(
            item.download_state()
                .signal()
                .for_each(move |state| {
                    println!("{key}: {state:?}");
                    async {}
                }),
        );

        tokio::spawn(
            item.download_progress()
                .signal()
                .for_each(move |progress| {
                    if let Some(progress) = progress {
                        println!(
                            "{key}: {:?} {:.0}%",
                            progress.state,
                            progress.progress * 100.0
                        );
                    }
                    async {}
                }),
        );
    }

    let worker_handle = worker::downloads::start(tracker, snapshots);

    tokio::select! {
        _ = worker_handle => {
            info!("download worker quit");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("ctrl+c signal");
        }
    }

    Ok(())
}
