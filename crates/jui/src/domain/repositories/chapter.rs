use async_trait::async_trait;
use jui_lib::prelude::{Chapter, PageInfo};

use super::RepositoryError;

#[async_trait]
pub trait ChapterRepository: Send + Sync {
    async fn get_chapter(
        &self,
        manga_id: i64,
        chapter_index: i64,
    ) -> Result<Chapter, RepositoryError>;

    async fn get_pages(&self, chapter: &Chapter) -> Result<Vec<PageInfo>, RepositoryError>;
}
