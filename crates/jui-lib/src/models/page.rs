use serde::{Deserialize, Serialize};

/// A page of a chapter, `index` is zero based
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    pub index: usize,
    pub url: String,
}
