//! Engine configuration loaded from TOML.
//!
//! Every field has a default, so an empty file (or no file) is valid.
//!
//! ```toml
//! model_timeout_ms = 20000
//! avoid_attempts = 50
//!
//! [default_range]
//! min = 1
//! max = 12
//!
//! [prompt]
//! instruction = "Generate 10 exercises aligned to the topic and VAK style."
//! ```

use std::time::Duration;

use serde::Deserialize;
use tracing::{error, info};

use crate::exercise_engine::error::EngineError;
use crate::exercise_engine::models::NumericRange;

pub const CONFIG_PATH_ENV: &str = "EXERCISE_ENGINE_CONFIG";
pub const MODEL_TIMEOUT_ENV: &str = "MODEL_TIMEOUT_MS";

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Hard deadline for one model adapter call.
    pub model_timeout_ms: u64,
    /// Bounded retry count for draws that avoid recently used numbers.
    pub avoid_attempts: usize,
    /// Template regeneration rounds before padding with safe defaults.
    pub padding_rounds: usize,
    /// Used when the content context carries no `allowed_numbers`.
    pub default_range: NumericRange,
    /// Rewrite "Listen..." prompts for auditory sessions without audio.
    pub neutralize_audio_prompts: bool,
    pub prompt: PromptConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            model_timeout_ms: 25_000,
            avoid_attempts: 50,
            padding_rounds: 8,
            default_range: NumericRange::default(),
            neutralize_audio_prompts: true,
            prompt: PromptConfig::default(),
        }
    }
}

/// Instruction text sent alongside the content context to the model adapter.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    pub instruction: String,
    pub output_schema: String,
    pub constraints: Vec<String>,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            instruction: "Generate 10 exercises aligned to the topic and the learner's VAK style.".into(),
            output_schema: "array of items {type: 'multiple_choice'|'match_pairs'|'drag_to_bucket', ...}".into(),
            constraints: vec![
                "Use ONLY the content in context_json.".into(),
                "Return valid JSON: ONLY the array of 10 items.".into(),
                "For 'multiple_choice': include 'question', 'choices' (4), 'correct_index', 'explain'.".into(),
                "For 'match_pairs': include 'title', 'pairs': [[L, R], ...].".into(),
                "For 'drag_to_bucket': include 'title', 'items': [], 'buckets': [], 'solution': {bucket: [items]}.".into(),
                "Avoid the numbers listed in avoid_numbers.".into(),
            ],
        }
    }
}

impl EngineConfig {
    pub fn model_timeout(&self) -> Duration {
        Duration::from_millis(self.model_timeout_ms)
    }

    /// Strict parse: errors are returned to the caller.
    pub fn from_toml_str(s: &str) -> Result<Self, EngineError> {
        Ok(toml::from_str(s)?)
    }

    pub fn from_path(path: &str) -> Result<Self, EngineError> {
        let s = std::fs::read_to_string(path).map_err(|source| EngineError::ConfigIo {
            path: path.to_string(),
            source,
        })?;
        Self::from_toml_str(&s)
    }

    /// Load from `EXERCISE_ENGINE_CONFIG` if set, falling back to defaults on
    /// any IO/parse error. `MODEL_TIMEOUT_MS` overrides the timeout either way.
    pub fn load_from_env() -> Self {
        let mut cfg = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => match Self::from_path(&path) {
                Ok(cfg) => {
                    info!(target: "exercise_engine", %path, "Loaded engine config (TOML)");
                    cfg
                }
                Err(e) => {
                    error!(target: "exercise_engine", %path, error = %e, "Failed to load engine config; using defaults");
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        };
        if let Some(ms) = std::env::var(MODEL_TIMEOUT_ENV).ok().and_then(|v| v.parse::<u64>().ok()) {
            cfg.model_timeout_ms = ms;
        }
        cfg
    }
}
