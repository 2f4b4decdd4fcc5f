use std::sync::Arc;

use futures_signals::signal::{Mutable, ReadOnlyMutable};
use jui_lib::prelude::{Chapter, ChapterKey};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::domain::{
    entities::reader::{ChapterRef, ReaderChapterState, ReaderPage},
    repositories::{RepositoryError, chapter::ChapterRepository, image::ImageRepository},
    services::page_loader::ChapterPageLoader,
};

#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("failed to fetch chapter {0}: {1}")]
    Chapter(ChapterKey, #[source] RepositoryError),
    #[error("failed to fetch pages of chapter {0}: {1}")]
    Pages(ChapterKey, #[source] RepositoryError),
}

/// A chapter held by one slot of the reader window, together with its pages
/// and the loader fetching their images.
pub struct ReaderChapter {
    key: ChapterKey,
    chapter: Chapter,
    state: Mutable<ReaderChapterState>,
    pages: Mutable<Vec<ReaderPage>>,
    page_loader: ChapterPageLoader,
}

impl ReaderChapter {
    fn new(
        key: ChapterKey,
        chapter: Chapter,
        images: Arc<dyn ImageRepository>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            key,
            chapter,
            state: Mutable::new(ReaderChapterState::Wait),
            pages: Mutable::new(vec![]),
            page_loader: ChapterPageLoader::new(key, images, cancel),
        }
    }

    /// Fetches the descriptor then the page list of `key` for session `token`.
    /// Page loads of the chapter are cancelled along with `cancel`.
    async fn load<C>(
        chapters: &C,
        images: Arc<dyn ImageRepository>,
        key: ChapterKey,
        token: u64,
        cancel: &CancellationToken,
    ) -> Result<Self, ReaderError>
    where
        C: ChapterRepository + ?Sized,
    {
        let chapter = chapters
            .get_chapter(key.manga_id, key.chapter_index)
            .await
            .map_err(|e| ReaderError::Chapter(key, e))?;

        let reader_chapter = Self::new(key, chapter, images, cancel.child_token());
        reader_chapter.state.set(ReaderChapterState::Loading);

        let pages = match chapters.get_pages(&reader_chapter.chapter).await {
            Ok(pages) => pages,
            Err(e) => {
                reader_chapter.state.set(ReaderChapterState::Error);
                reader_chapter.recycle();
                return Err(ReaderError::Pages(key, e));
            }
        };

        let chapter_ref = ChapterRef {
            session: token,
            key,
        };
        reader_chapter.pages.set(
            pages
                .into_iter()
                .map(|info| ReaderPage::new(info, chapter_ref))
                .collect(),
        );
        reader_chapter.state.set(ReaderChapterState::Loaded);

        Ok(reader_chapter)
    }

    pub fn key(&self) -> ChapterKey {
        self.key
    }

    pub fn chapter(&self) -> &Chapter {
        &self.chapter
    }

    pub fn state(&self) -> ReadOnlyMutable<ReaderChapterState> {
        self.state.read_only()
    }

    pub fn pages(&self) -> ReadOnlyMutable<Vec<ReaderPage>> {
        self.pages.read_only()
    }

    pub fn page_loader(&self) -> &ChapterPageLoader {
        &self.page_loader
    }

    /// Cancels every in-flight page load of this chapter
    pub fn recycle(&self) {
        self.page_loader.recycle();
    }
}

#[derive(Clone)]
struct Session {
    token: u64,
    cancel: CancellationToken,
    /// Child of `cancel`, also fired when the current chapter fails
    neighbors: CancellationToken,
}

impl Session {
    fn new(token: u64) -> Self {
        let cancel = CancellationToken::new();
        let neighbors = cancel.child_token();
        Self {
            token,
            cancel,
            neighbors,
        }
    }
}

type Slot = Mutable<Option<Arc<ReaderChapter>>>;

/// Runs `apply` only while `token` is still the window's session and `cancel`
/// has not fired. The session cell stays locked meanwhile so a reset cannot
/// slip in between.
fn publish<F>(session: &Mutable<Session>, token: u64, cancel: &CancellationToken, apply: F) -> bool
where
    F: FnOnce(),
{
    let session = session.lock_ref();
    if session.token != token || cancel.is_cancelled() {
        return false;
    }
    apply();
    true
}

/// Previous, current and next chapter of a reading session.
///
/// Every [`init`](Self::init) starts a new session: the previous one is
/// cancelled, its chapters recycled, and results it still produces are
/// dropped.
pub struct ReaderChapterWindow<C>
where
    C: ChapterRepository + 'static,
{
    chapters: Arc<C>,
    images: Arc<dyn ImageRepository>,
    session: Mutable<Session>,
    prev_chapter: Slot,
    chapter: Slot,
    next_chapter: Slot,
    state: Mutable<ReaderChapterState>,
    pages: Mutable<Vec<ReaderPage>>,
    current_page: Mutable<usize>,
}

impl<C> ReaderChapterWindow<C>
where
    C: ChapterRepository + 'static,
{
    pub fn new(chapters: Arc<C>, images: Arc<dyn ImageRepository>) -> Self {
        Self {
            chapters,
            images,
            session: Mutable::new(Session::new(0)),
            prev_chapter: Mutable::new(None),
            chapter: Mutable::new(None),
            next_chapter: Mutable::new(None),
            state: Mutable::new(ReaderChapterState::Wait),
            pages: Mutable::new(vec![]),
            current_page: Mutable::new(0),
        }
    }

    pub fn state(&self) -> ReadOnlyMutable<ReaderChapterState> {
        self.state.read_only()
    }

    pub fn pages(&self) -> ReadOnlyMutable<Vec<ReaderPage>> {
        self.pages.read_only()
    }

    pub fn current_page(&self) -> ReadOnlyMutable<usize> {
        self.current_page.read_only()
    }

    pub fn previous_chapter(&self) -> ReadOnlyMutable<Option<Arc<ReaderChapter>>> {
        self.prev_chapter.read_only()
    }

    pub fn chapter(&self) -> ReadOnlyMutable<Option<Arc<ReaderChapter>>> {
        self.chapter.read_only()
    }

    pub fn next_chapter(&self) -> ReadOnlyMutable<Option<Arc<ReaderChapter>>> {
        self.next_chapter.read_only()
    }

    fn slots(&self) -> [&Slot; 3] {
        [&self.prev_chapter, &self.chapter, &self.next_chapter]
    }

    /// Cancels the running session and empties the window, returns the new session
    fn reset(&self) -> Session {
        let mut session = self.session.lock_mut();
        session.cancel.cancel();
        *session = Session::new(session.token + 1);

        self.pages.set(vec![]);
        self.current_page.set(0);
        self.state.set(ReaderChapterState::Wait);

        for slot in self.slots() {
            if let Some(chapter) = slot.replace(None) {
                debug!("recycling chapter {}", chapter.key());
                chapter.recycle();
            }
        }

        (*session).clone()
    }

    /// Marks the current chapter of session `token` as failed and drops its
    /// neighbours, returns false when the session was already replaced
    fn fail(&self, token: u64) -> bool {
        let session = self.session.lock_mut();
        if session.token != token {
            return false;
        }
        session.neighbors.cancel();

        self.state.set(ReaderChapterState::Error);

        for slot in [&self.prev_chapter, &self.next_chapter] {
            if let Some(chapter) = slot.replace(None) {
                debug!("dropping chapter {} around a failed chapter", chapter.key());
                chapter.recycle();
            }
        }

        true
    }

    /// Opens `chapter_index` of `manga_id` and prefetches its neighbours.
    ///
    /// Returns once the current chapter is loaded or has failed. Neighbour
    /// failures only leave their slot empty.
    pub async fn init(&self, manga_id: i64, chapter_index: i64) -> Result<(), ReaderError> {
        let session = self.reset();
        let key = ChapterKey::new(manga_id, chapter_index);
        info!("opening chapter {key} in session {}", session.token);

        publish(&self.session, session.token, &session.cancel, || {
            self.state.set(ReaderChapterState::Loading)
        });

        self.spawn_neighbor(
            ChapterKey::new(manga_id, chapter_index + 1),
            self.next_chapter.clone(),
            &session,
        );
        if chapter_index != 0 {
            self.spawn_neighbor(
                ChapterKey::new(manga_id, chapter_index - 1),
                self.prev_chapter.clone(),
                &session,
            );
        }

        let result = tokio::select! {
            _ = session.cancel.cancelled() => {
                debug!("session {} superseded while loading chapter {key}", session.token);
                return Ok(());
            }
            result = ReaderChapter::load(
                self.chapters.as_ref(),
                self.images.clone(),
                key,
                session.token,
                &session.cancel,
            ) => result,
        };

        match result {
            Ok(chapter) => {
                let chapter = Arc::new(chapter);
                let published = publish(&self.session, session.token, &session.cancel, || {
                    self.pages.set(chapter.pages.get_cloned());
                    self.state.set(ReaderChapterState::Loaded);
                    self.chapter.set(Some(chapter.clone()));
                });
                if !published {
                    chapter.recycle();
                }
                Ok(())
            }
            Err(e) => {
                if self.fail(session.token) {
                    error!("{e}");
                    Err(e)
                } else {
                    Ok(())
                }
            }
        }
    }

    fn spawn_neighbor(&self, key: ChapterKey, slot: Slot, session: &Session) {
        let chapters = self.chapters.clone();
        let images = self.images.clone();
        let window_session = self.session.clone();
        let session = session.clone();

        tokio::spawn(async move {
            let result = tokio::select! {
                _ = session.neighbors.cancelled() => {
                    debug!("prefetch of chapter {key} abandoned in session {}", session.token);
                    return;
                }
                result = ReaderChapter::load(
                    chapters.as_ref(),
                    images,
                    key,
                    session.token,
                    &session.neighbors,
                ) => result,
            };

            match result {
                Ok(chapter) => {
                    let chapter = Arc::new(chapter);
                    if !publish(&window_session, session.token, &session.neighbors, || {
                        slot.set(Some(chapter.clone()))
                    }) {
                        chapter.recycle();
                    }
                }
                Err(e) => {
                    warn!("prefetch failed: {e}");
                }
            }
        });
    }

    /// Records the reading position and loads the page under it
    pub fn progress(&self, index: usize) {
        self.current_page.set_neq(index);

        if let Some(chapter) = self.chapter.get_cloned() {
            if let Some(page) = chapter.pages.lock_ref().get(index) {
                chapter.page_loader.load_page(page);
            }
        }
    }

    /// Reloads a failed page, ignored when its chapter has left the window
    pub fn retry(&self, page: &ReaderPage) {
        let Some(chapter) = self.resolve(page.chapter()) else {
            debug!(
                "page {} of chapter {} is no longer in the window",
                page.index(),
                page.chapter().key
            );
            return;
        };

        let pages = chapter.pages.lock_ref();
        if let Some(page) = pages.iter().find(|p| p.index() == page.index()) {
            chapter.page_loader.retry_page(page);
        }
    }

    fn resolve(&self, chapter_ref: ChapterRef) -> Option<Arc<ReaderChapter>> {
        if self.session.lock_ref().token != chapter_ref.session {
            return None;
        }

        self.slots().into_iter().find_map(|slot| {
            slot.get_cloned()
                .filter(|chapter| chapter.key() == chapter_ref.key)
        })
    }

    /// Ends the session, cancelling every fetch and recycling all slots
    pub fn close(&self) {
        self.reset();
    }
}

impl<C> Drop for ReaderChapterWindow<C>
where
    C: ChapterRepository + 'static,
{
    fn drop(&mut self) {
        self.close();
    }
}
