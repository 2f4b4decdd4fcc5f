pub mod error;
pub mod models;
pub mod prelude;

/// Version of the wire models, reported by the client in its user agent
pub static LIB_VERSION: &str = env!("CARGO_PKG_VERSION");
