use async_trait::async_trait;
use bytes::Bytes;
use jui_lib::prelude::PageInfo;

use super::RepositoryError;

#[async_trait]
pub trait ImageRepository: Send + Sync {
    async fn get_page_image(&self, page: &PageInfo) -> Result<Bytes, RepositoryError>;
}
