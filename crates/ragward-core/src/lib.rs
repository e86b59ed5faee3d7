//! Configuration loading and service wiring for ragward.

pub mod bootstrap;
pub mod config;

pub use bootstrap::{Services, build_services, create_embedder, create_store};
pub use config::Config;
