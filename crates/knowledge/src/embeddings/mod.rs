//! Embedding adapter.
//!
//! Converts passages and queries into fixed-dimension vectors. Providers are
//! interchangeable implementations of [`EmbeddingProvider`], chosen once from
//! configuration by [`create_provider`].

pub mod config;
pub mod provider;
pub mod providers;

pub use config::EmbeddingConfig;
pub use provider::{create_provider, EmbeddingProvider};
