use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Identifies a chapter across sessions, `chapter_index` is unique within a manga
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterKey {
    pub manga_id: i64,
    pub chapter_index: i64,
}

impl ChapterKey {
    pub fn new(manga_id: i64, chapter_index: i64) -> Self {
        Self {
            manga_id,
            chapter_index,
        }
    }
}

impl FromStr for ChapterKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidChapterKey(s.to_string());
        match s.split(':').collect::<Vec<&str>>().as_slice() {
            [manga_id, chapter_index] => Ok(ChapterKey {
                manga_id: manga_id.trim().parse().map_err(|_| invalid())?,
                chapter_index: chapter_index.trim().parse().map_err(|_| invalid())?,
            }),
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for ChapterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.manga_id, self.chapter_index)
    }
}

/// A chapter as described by the server
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Chapter {
    pub id: i64,
    pub url: String,
    pub name: String,
    pub upload_date: i64,
    pub chapter_number: f32,
    pub scanlator: Option<String>,
    pub manga_id: i64,
    pub read: bool,
    pub bookmarked: bool,
    pub last_page_read: i64,
    pub last_read_at: i64,
    pub index: i64,
    pub chapter_count: Option<i64>,
    pub page_count: Option<i64>,
    pub downloaded: bool,
}

impl Chapter {
    pub fn key(&self) -> ChapterKey {
        ChapterKey::new(self.manga_id, self.index)
    }
}
