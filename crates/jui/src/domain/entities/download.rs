use jui_lib::prelude::{DownloadChapter, DownloadState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChapterDownloadState {
    NotDownloaded,
    Downloading,
    Downloaded,
}

impl ChapterDownloadState {
    pub fn from_downloaded(downloaded: bool) -> Self {
        if downloaded {
            Self::Downloaded
        } else {
            Self::NotDownloaded
        }
    }
}

/// Progress of a chapter while it is in the server's active downloads list
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DownloadProgress {
    pub state: DownloadState,
    pub progress: f32,
}

impl From<&DownloadChapter> for DownloadProgress {
    fn from(entry: &DownloadChapter) -> Self {
        Self {
            state: entry.state,
            progress: entry.progress.clamp(0.0, 1.0),
        }
    }
}
