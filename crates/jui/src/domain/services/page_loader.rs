use std::sync::Arc;

use jui_lib::prelude::ChapterKey;
use tokio_util::sync::CancellationToken;

use crate::domain::{entities::reader::ReaderPage, repositories::image::ImageRepository};

/// Loads page images of one chapter. Every load runs on its own task and is
/// cancelled when the loader is recycled.
pub struct ChapterPageLoader {
    key: ChapterKey,
    images: Arc<dyn ImageRepository>,
    cancel: CancellationToken,
}

impl ChapterPageLoader {
    pub fn new(key: ChapterKey, images: Arc<dyn ImageRepository>, cancel: CancellationToken) -> Self {
        Self {
            key,
            images,
            cancel,
        }
    }

    /// Starts loading `page` unless it is already loading or loaded
    pub fn load_page(&self, page: &ReaderPage) {
        if self.cancel.is_cancelled() {
            debug!("chapter {} recycled, skip page {}", self.key, page.index());
            return;
        }

        if !page.begin_load() {
            return;
        }

        let page = page.clone();
        let images = self.images.clone();
        let cancel = self.cancel.clone();
        let key = self.key;

        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("cancelled loading page {} of chapter {key}", page.index());
                }
                result = images.get_page_image(page.info()) => match result {
                    Ok(image) => page.finish(image),
                    Err(e) => {
                        warn!("failed to load page {} of chapter {key}: {e}", page.index());
                        page.fail();
                    }
                }
            }
        });
    }

    /// Loads `page` again if its last load failed
    pub fn retry_page(&self, page: &ReaderPage) {
        if page.requeue() {
            self.load_page(page);
        }
    }

    pub fn recycle(&self) {
        self.cancel.cancel();
    }

    pub fn is_recycled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
