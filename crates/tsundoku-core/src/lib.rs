pub mod config;
pub mod error;
pub mod fs;
pub mod models;
pub mod settings;
pub mod storage;
