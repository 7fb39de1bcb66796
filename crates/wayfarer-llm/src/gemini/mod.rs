//! Gemini - Google Gemini API provider
//!
//! Talks to `generateContent` over reqwest. Function calling is mapped onto
//! Gemini's `functionCall`/`functionResponse` parts.

mod config;
mod convert;
mod provider;
mod types;


pub use config::{GeminiConfig, DEFAULT_BASE_URL, DEFAULT_MODEL};
pub use provider::GeminiProvider;
