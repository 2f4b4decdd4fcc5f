use std::sync::Arc;

use futures_signals::{
    signal::{Mutable, ReadOnlyMutable},
    signal_vec::{MutableVec, MutableVecLockRef},
};
use jui_lib::prelude::{Chapter, ChapterKey, DownloadChapter};
use thiserror::Error;

use crate::domain::{
    entities::download::{ChapterDownloadState, DownloadProgress},
    repositories::{RepositoryError, download::DownloadRepository},
};

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("repository error: {0}")]
    RepositoryError(#[from] RepositoryError),
}

/// Download state of a single tracked chapter
pub struct ChapterDownloadItem {
    chapter: Chapter,
    download_state: Mutable<ChapterDownloadState>,
    download_progress: Mutable<Option<DownloadProgress>>,
}

impl ChapterDownloadItem {
    pub fn new(chapter: Chapter) -> Self {
        let state = ChapterDownloadState::from_downloaded(chapter.downloaded);
        Self {
            chapter,
            download_state: Mutable::new(state),
            download_progress: Mutable::new(None),
        }
    }

    pub fn chapter(&self) -> &Chapter {
        &self.chapter
    }

    pub fn key(&self) -> ChapterKey {
        self.chapter.key()
    }

    pub fn download_state(&self) -> ReadOnlyMutable<ChapterDownloadState> {
        self.download_state.read_only()
    }

    pub fn download_progress(&self) -> ReadOnlyMutable<Option<DownloadProgress>> {
        self.download_progress.read_only()
    }

    /// Reconciles this chapter with a snapshot of the server's active downloads.
    ///
    /// A chapter leaving the snapshot while `Downloading` becomes `Downloaded`,
    /// whether the server finished or dropped it.
    pub fn update_from(&self, snapshot: &[DownloadChapter]) {
        let key = self.key();
        let entry = snapshot.iter().find(|entry| entry.key() == key);

        let next = match (entry, self.download_state.get()) {
            (Some(_), state) if state != ChapterDownloadState::Downloading => {
                ChapterDownloadState::Downloading
            }
            (None, ChapterDownloadState::Downloading) => ChapterDownloadState::Downloaded,
            (_, state) => state,
        };

        if next != self.download_state.get() {
            debug!("chapter {key} {:?} -> {next:?}", self.download_state.get());
        }

        self.download_state.set_neq(next);
        self.download_progress
            .set_neq(entry.map(DownloadProgress::from));
    }

    fn mark_not_downloaded(&self) {
        self.download_state
            .set_neq(ChapterDownloadState::NotDownloaded);
        self.download_progress.set_neq(None);
    }
}

/// Keeps the download state of every tracked chapter consistent with the
/// latest snapshot received from the server.
pub struct DownloadStateTracker<R>
where
    R: DownloadRepository,
{
    repo: R,
    items: MutableVec<Arc<ChapterDownloadItem>>,
}

impl<R> DownloadStateTracker<R>
where
    R: DownloadRepository,
{
    pub fn new(repo: R) -> Self {
        Self {
            repo,
            items: MutableVec::new(),
        }
    }

    /// Starts tracking `chapter`, returns the existing item if it is already tracked
    pub fn track(&self, chapter: Chapter) -> Arc<ChapterDownloadItem> {
        let mut items = self.items.lock_mut();
        let key = chapter.key();
        if let Some(item) = items.iter().find(|item| item.key() == key) {
            return item.clone();
        }

        let item = Arc::new(ChapterDownloadItem::new(chapter));
        items.push_cloned(item.clone());
        item
    }

    pub fn untrack(&self, key: ChapterKey) {
        self.items.lock_mut().retain(|item| item.key() != key);
    }

    pub fn get(&self, key: ChapterKey) -> Option<Arc<ChapterDownloadItem>> {
        self.items
            .lock_ref()
            .iter()
            .find(|item| item.key() == key)
            .cloned()
    }

    pub fn items(&self) -> MutableVecLockRef<'_, Arc<ChapterDownloadItem>> {
        self.items.lock_ref()
    }

    pub fn len(&self) -> usize {
        self.items.lock_ref().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock_ref().is_empty()
    }

    /// Applies one snapshot to every tracked chapter
    pub fn update(&self, snapshot: &[DownloadChapter]) {
        for item in self.items.lock_ref().iter() {
            item.update_from(snapshot);
        }
    }

    /// Queues `chapter` on the server. The state only changes once a snapshot
    /// lists the chapter.
    pub async fn start_download(&self, chapter: &Chapter) -> Result<(), DownloadError> {
        self.repo.start_download(chapter).await?;
        info!("queued download of chapter {}", chapter.key());

        Ok(())
    }

    pub async fn stop_download(&self, chapter: &Chapter) -> Result<(), DownloadError> {
        self.repo.stop_download(chapter).await?;
        info!("stopped download of chapter {}", chapter.key());

        if let Some(item) = self.get(chapter.key()) {
            item.mark_not_downloaded();
        }

        Ok(())
    }

    pub async fn delete_download(&self, chapter: &Chapter) -> Result<(), DownloadError> {
        self.repo.delete_download(chapter).await?;
        info!("deleted download of chapter {}", chapter.key());

        if let Some(item) = self.get(chapter.key()) {
            item.mark_not_downloaded();
        }

        Ok(())
    }
}
