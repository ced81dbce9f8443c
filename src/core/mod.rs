pub mod types;
pub mod config;
pub mod engine;
pub mod error;
pub mod maintenance;
pub mod stats;
