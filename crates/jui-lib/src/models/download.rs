use serde::{Deserialize, Serialize};

use super::ChapterKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DownloadState {
    Queued,
    Downloading,
    Finished,
    Error,
}

/// An entry of the server's active downloads list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadChapter {
    pub manga_id: i64,
    pub chapter_index: i64,
    pub state: DownloadState,
    /// Fraction in `0.0..=1.0`
    pub progress: f32,
    #[serde(default)]
    pub tries: i32,
}

impl DownloadChapter {
    pub fn key(&self) -> ChapterKey {
        ChapterKey::new(self.manga_id, self.chapter_index)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DownloaderState {
    Started,
    Stopped,
}

/// Downloader status pushed by the server, `queue` is a snapshot of the active downloads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloaderStatus {
    pub status: DownloaderState,
    #[serde(default)]
    pub queue: Vec<DownloadChapter>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_deserialize_downloader_status() {
        let json = r#"{
            "status": "Started",
            "queue": [
                {"chapterIndex": 2, "mangaId": 5, "state": "Downloading", "progress": 0.3, "tries": 0},
                {"chapterIndex": 3, "mangaId": 5, "state": "Queued", "progress": 0.0}
            ]
        }"#;

        let status: DownloaderStatus = serde_json::from_str(json).unwrap();

        assert_eq!(status.status, DownloaderState::Started);
        assert_eq!(status.queue.len(), 2);
        assert_eq!(status.queue[0].key(), ChapterKey::new(5, 2));
        assert_eq!(status.queue[0].state, DownloadState::Downloading);
        assert_eq!(status.queue[1].state, DownloadState::Queued);
        assert_eq!(status.queue[1].tries, 0);
    }

    #[test]
    fn test_deserialize_stopped_without_queue() {
        let status: DownloaderStatus = serde_json::from_str(r#"{"status": "Stopped"}"#).unwrap();

        assert_eq!(status.status, DownloaderState::Stopped);
        assert!(status.queue.is_empty());
    }

    #[test]
    fn test_deserialize_unknown_state() {
        let json = r#"{"chapterIndex": 1, "mangaId": 1, "state": "Paused", "progress": 0.0}"#;

        assert!(serde_json::from_str::<DownloadChapter>(json).is_err());
    }
}
