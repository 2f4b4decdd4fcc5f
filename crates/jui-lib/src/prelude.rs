pub use crate::error::Error;
pub use crate::models::{
    Chapter, ChapterKey, DownloadChapter, DownloadState, DownloaderState, DownloaderStatus,
    PageInfo,
};
