pub mod config;
pub mod error;
pub mod progress;
pub mod request;
pub mod service;
pub mod upload;
