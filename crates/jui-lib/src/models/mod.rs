pub mod chapter;
pub use chapter::*;

pub mod page;
pub use page::*;

pub mod download;
pub use download::*;
