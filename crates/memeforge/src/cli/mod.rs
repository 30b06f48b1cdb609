//! CLI command implementations.

pub mod config;
mod download;
pub mod generate;
pub mod interactive;
pub mod templates;
pub mod types;
