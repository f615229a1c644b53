//! # Gatekeep Core
//!
//! Configuration and secret handling shared by the Gatekeep crates.
//!
//! This crate provides:
//! - Environment-sourced configuration with startup validation
//! - A redacting wrapper for secret values

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod secrets;

pub use config::{Config, ConfigError, SeedCredentials};
pub use secrets::Secret;
