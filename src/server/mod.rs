//! Server module for Wayfarer
//!
//! - `config`: configuration structures
//! - `loader`: configuration loading from files and environment
//! - `init`: concierge assembly and the HTTP run loop

pub mod config;
mod init;
mod loader;

pub use init::{build_concierge, run};
pub use loader::load_config;
