//! Storage infrastructure: configuration file loading.
//!
//! The `config` sub-module handles:
//!
//! - Reading the TOML configuration file from the platform-appropriate
//!   directory, or from an explicit `--config` path.
//! - Providing defaults when the file does not exist yet.
//! - Turning the file's sections into the option structs the application
//!   services take.

pub mod config;
