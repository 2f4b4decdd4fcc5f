use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("invalid chapter key {0:?}, should be manga_id:chapter_index")]
    InvalidChapterKey(String),
}
