pub mod app;
pub mod classify;
pub mod config;
pub mod edit;
pub mod error;
pub mod exiftool;
pub mod fake_tool;
pub mod format;
pub mod gps;
pub mod output;
pub mod pipeline;
pub mod store;
pub mod tag;
