use async_trait::async_trait;
use jui_lib::prelude::{Chapter, DownloaderStatus};

use super::RepositoryError;

#[async_trait]
pub trait DownloadRepository: Send + Sync {
    async fn start_download(&self, chapter: &Chapter) -> Result<(), RepositoryError>;

    async fn stop_download(&self, chapter: &Chapter) -> Result<(), RepositoryError>;

    async fn delete_download(&self, chapter: &Chapter) -> Result<(), RepositoryError>;

    async fn get_download_status(&self) -> Result<DownloaderStatus, RepositoryError>;
}
