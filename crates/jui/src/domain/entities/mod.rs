pub mod download;
pub mod reader;
