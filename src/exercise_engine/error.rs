use thiserror::Error;

use crate::exercise_engine::models::ItemKind;

/// Caller contract violations. Everything else is repaired or recovered
/// inside the engine and never reaches the caller.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unknown learning style: {0:?}")]
    UnknownStyle(String),
    #[error("answer does not have the shape of a {expected} submission")]
    AnswerShape { expected: ItemKind },
    #[error("failed to read engine config {path}: {source}")]
    ConfigIo {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid engine config: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

/// Failure of a model adapter call. Always recovered by the template path.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("model adapter unavailable: {0}")]
    Unavailable(&'static str),
    #[error("model HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("empty model payload")]
    EmptyPayload,
    #[error("unexpected model payload: {0}")]
    Payload(String),
    #[error("model payload is not JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// A bounded retry loop ran out of attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no acceptable draw after {attempts} attempts")]
pub struct Exhausted {
    pub attempts: usize,
}
