//! Google Generative Language API provider.

pub mod client;
pub mod config;
pub mod models;

pub use client::GeminiClient;
pub use config::GeminiConfig;
pub use models::fallback_models;
