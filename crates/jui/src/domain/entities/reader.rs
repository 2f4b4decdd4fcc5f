use bytes::Bytes;
use futures_signals::signal::{Mutable, ReadOnlyMutable};
use jui_lib::prelude::{ChapterKey, PageInfo};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderChapterState {
    Wait,
    Loading,
    Loaded,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageStatus {
    Queue,
    Loading,
    Ready,
    Error,
}

/// Non-owning reference from a page to the chapter that produced it.
///
/// It only resolves while the window is still in `session` and one of its
/// slots holds the chapter identified by `key`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChapterRef {
    pub session: u64,
    pub key: ChapterKey,
}

/// A page as seen by the reader. Clones share the same status and image cells.
#[derive(Clone)]
pub struct ReaderPage {
    info: PageInfo,
    chapter: ChapterRef,
    status: Mutable<PageStatus>,
    image: Mutable<Option<Bytes>>,
}

impl ReaderPage {
    pub fn new(info: PageInfo, chapter: ChapterRef) -> Self {
        Self {
            info,
            chapter,
            status: Mutable::new(PageStatus::Queue),
            image: Mutable::new(None),
        }
    }

    pub fn index(&self) -> usize {
        self.info.index
    }

    pub fn info(&self) -> &PageInfo {
        &self.info
    }

    pub fn chapter(&self) -> ChapterRef {
        self.chapter
    }

    pub fn status(&self) -> ReadOnlyMutable<PageStatus> {
        self.status.read_only()
    }

    pub fn image(&self) -> ReadOnlyMutable<Option<Bytes>> {
        self.image.read_only()
    }

    /// Moves the page to `Loading` if it is queued, returns whether it did
    pub(crate) fn begin_load(&self) -> bool {
        let mut status = self.status.lock_mut();
        if *status == PageStatus::Queue {
            *status = PageStatus::Loading;
            true
        } else {
            false
        }
    }

    /// Moves an errored page back to `Queue`, returns whether it did
    pub(crate) fn requeue(&self) -> bool {
        let mut status = self.status.lock_mut();
        if *status == PageStatus::Error {
            *status = PageStatus::Queue;
            true
        } else {
            false
        }
    }

    pub(crate) fn finish(&self, image: Bytes) {
        self.image.set(Some(image));
        self.status.set(PageStatus::Ready);
    }

    pub(crate) fn fail(&self) {
        self.status.set(PageStatus::Error);
    }
}
