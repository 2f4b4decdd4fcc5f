use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use jui_lib::prelude::{Chapter, DownloaderStatus, PageInfo};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use crate::{
    domain::repositories::{
        RepositoryError, chapter::ChapterRepository, download::DownloadRepository,
        image::ImageRepository,
    },
    infrastructure::config::{AuthConfig, Config},
};

/// Talks to the manga server's REST API
#[derive(Clone)]
pub struct ServerRepositoryImpl {
    client: Client,
    server_url: String,
    auth: Option<AuthConfig>,
}

impl ServerRepositoryImpl {
    pub fn new(
        server_url: &str,
        timeout: Duration,
        auth: Option<AuthConfig>,
    ) -> Result<Self, RepositoryError> {
        let client = Client::builder()
            .user_agent(format!("jui/{}", jui_lib::LIB_VERSION))
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            server_url: server_url.trim_end_matches('/').to_string(),
            auth,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, RepositoryError> {
        Self::new(
            &config.server_url,
            Duration::from_secs(config.request_timeout),
            config.auth.clone(),
        )
    }

    fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.server_url, path)
    }

    fn chapter_path(chapter: &Chapter) -> String {
        format!("/api/v1/manga/{}/chapter/{}", chapter.manga_id, chapter.index)
    }

    fn download_path(chapter: &Chapter) -> String {
        format!("/api/v1/download/{}/chapter/{}", chapter.manga_id, chapter.index)
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let req = self.client.request(method, url);
        match &self.auth {
            Some(auth) => req.basic_auth(&auth.username, Some(&auth.password)),
            None => req,
        }
    }

    async fn send(&self, method: Method, url: &str) -> Result<Response, RepositoryError> {
        debug!("{method} {url}");
        let res = self.request(method, url).send().await?;

        let status = res.status();
        if !status.is_success() {
            let reason = res.text().await.unwrap_or_default();
            return Err(RepositoryError::Status(status.as_u16(), reason));
        }

        Ok(res)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, RepositoryError> {
        let body = self.send(Method::GET, url).await?.bytes().await?;

        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl ChapterRepository for ServerRepositoryImpl {
    async fn get_chapter(
        &self,
        manga_id: i64,
        chapter_index: i64,
    ) -> Result<Chapter, RepositoryError> {
        self.get_json(&self.build_url(&format!(
            "/api/v1/manga/{manga_id}/chapter/{chapter_index}"
        )))
        .await
    }

    async fn get_pages(&self, chapter: &Chapter) -> Result<Vec<PageInfo>, RepositoryError> {
        let page_count = chapter.page_count.unwrap_or_default().max(0) as usize;
        let chapter_url = self.build_url(&Self::chapter_path(chapter));

        Ok((0..page_count)
            .map(|index| PageInfo {
                index,
                url: format!("{chapter_url}/page/{index}"),
            })
            .collect())
    }
}

#[async_trait]
impl DownloadRepository for ServerRepositoryImpl {
    async fn start_download(&self, chapter: &Chapter) -> Result<(), RepositoryError> {
        self.send(Method::GET, &self.build_url(&Self::download_path(chapter)))
            .await?;
        Ok(())
    }

    async fn stop_download(&self, chapter: &Chapter) -> Result<(), RepositoryError> {
        self.send(Method::DELETE, &self.build_url(&Self::download_path(chapter)))
            .await?;
        Ok(())
    }

    async fn delete_download(&self, chapter: &Chapter) -> Result<(), RepositoryError> {
        self.send(Method::DELETE, &self.build_url(&Self::chapter_path(chapter)))
            .await?;
        Ok(())
    }

    async fn get_download_status(&self) -> Result<DownloaderStatus, RepositoryError> {
        self.get_json(&self.build_url("/api/v1/downloads")).await
    }
}

#[async_trait]
impl ImageRepository for ServerRepositoryImpl {
    async fn get_page_image(&self, page: &PageInfo) -> Result<Bytes, RepositoryError> {
        let image = self.send(Method::GET, &page.url).await?.bytes().await?;

        Ok(image)
    }
}
