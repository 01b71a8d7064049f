pub mod config;
pub mod error;
pub mod keys;
pub mod types;
pub mod upload;
