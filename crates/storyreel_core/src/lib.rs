pub mod drag;
pub mod error;
pub mod history;
pub mod importer;
pub mod limits;
pub mod session;
pub mod timeline;
pub mod types;
