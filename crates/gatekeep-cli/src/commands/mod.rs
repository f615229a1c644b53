//! CLI command implementations.

pub mod secret;
pub mod seed;
pub mod serve;

pub use secret::run_generate_secret;
pub use seed::run_seed;
pub use serve::run_serve;
