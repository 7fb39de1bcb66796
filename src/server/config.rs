//! Server configuration types

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use wayfarer_core::{
    AgentEngineConfig, ConciergeConfig, RefinementConfig, DEFAULT_COMPLETION_PHRASE,
    DEFAULT_MAX_ITERATIONS, DEFAULT_WARM_UP_MESSAGE,
};

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub refinement: RefinementSettings,
    #[serde(default)]
    pub engine: EngineSettings,
    #[serde(default)]
    pub llm: LlmSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Reject values the concierge cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.server.app_name.trim().is_empty() {
            bail!("server.app_name must not be empty");
        }
        self.refinement_config().validate()?;
        Ok(())
    }

    /// Refinement loop settings, including the stage timeout
    pub fn refinement_config(&self) -> RefinementConfig {
        RefinementConfig {
            max_iterations: self.refinement.max_iterations,
            completion_phrase: self.refinement.completion_phrase.clone(),
            stage_timeout_secs: self.engine.stage_timeout_secs,
        }
    }

    /// Facade settings
    pub fn concierge_config(&self) -> ConciergeConfig {
        ConciergeConfig {
            refinement: self.refinement_config(),
            warm_up_message: self.engine.warm_up_message.clone(),
        }
    }

    /// Agent engine settings
    pub fn agent_engine_config(&self) -> AgentEngineConfig {
        AgentEngineConfig {
            model: self.llm.model.clone(),
            temperature: self.llm.temperature,
            max_tokens: self.llm.max_tokens,
            max_tool_rounds: self.engine.max_tool_rounds,
            completion_phrase: self.refinement.completion_phrase.clone(),
        }
    }
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub app_name: String,
    #[serde(default = "default_true")]
    pub cors_permissive: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5001,
            app_name: "agents".to_string(),
            cors_permissive: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Critique/revise loop settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefinementSettings {
    pub max_iterations: usize,
    pub completion_phrase: String,
}

impl Default for RefinementSettings {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            completion_phrase: DEFAULT_COMPLETION_PHRASE.to_string(),
        }
    }
}

/// Execution engine settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Per-stage limit in seconds; 0 disables it
    pub stage_timeout_secs: u64,
    pub max_tool_rounds: usize,
    pub warm_up_message: String,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            stage_timeout_secs: 120,
            max_tool_rounds: 8,
            warm_up_message: DEFAULT_WARM_UP_MESSAGE.to_string(),
        }
    }
}

/// Language model settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    /// Empty means the provider default
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub temperature: Option<f32>,
    pub max_tokens: u32,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            model: String::new(),
            temperature: None,
            max_tokens: 8192,
        }
    }
}

/// Log output settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
}

/// Log line format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}
