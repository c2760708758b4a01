pub mod config;
pub mod error;
pub mod formatting;
pub mod models;
pub mod patterns;
pub mod settings;
