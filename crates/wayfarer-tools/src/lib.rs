//! Wayfarer Tools - Tool registry and travel API integrations
//!
//! This crate provides the tools the concierge's agents can call:
//! - Registry: the `Tool` trait and name/category lookup
//! - ApiClient: credentialed HTTP client with cached bearer tokens
//! - Builtins: flight, hotel, rail, places, route, weather and air quality tools

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod api_client;
pub mod builtins;
pub mod error;
pub mod registry;

#[cfg(test)]
pub(crate) mod test_support;

pub use api_client::{ApiClient, ApiRequest, AuthToken, Credentials};
pub use builtins::{register_builtins, TravelSettings};
pub use error::{Error, Result};
pub use registry::{error_payload, Tool, ToolCategory, ToolDefinition, ToolRegistry, ToolResult};
