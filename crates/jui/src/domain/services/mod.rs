pub mod download;
pub mod page_loader;
pub mod reader;
