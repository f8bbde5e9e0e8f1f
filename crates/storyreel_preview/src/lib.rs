pub mod error;
pub mod mpv;
pub mod preview;
