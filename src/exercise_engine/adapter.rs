//! Model Adapter contract.
//!
//! The engine never talks to a network itself. An adapter receives a
//! [`ModelRequest`] and returns an untrusted array of candidate items, or an
//! [`AdapterError`]. Whatever it returns goes through the sanitizer; failures
//! and timeouts fall back to templates inside the Topic Engine.

use std::future::Future;

use serde_json::{json, Value};

use crate::exercise_engine::{
    config::PromptConfig,
    error::AdapterError,
    models::{AvoidSet, ContentContext, LearningStyle},
};

/// Everything an adapter needs to ask a model for one session.
#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub context: ContentContext,
    pub style: LearningStyle,
    pub avoid_numbers: Vec<u32>,
    /// Ready-to-send prompt payload (instruction, style, context JSON, schema).
    pub prompt: Value,
}

impl ModelRequest {
    pub fn new(context: &ContentContext, style: LearningStyle, avoid: &AvoidSet, prompt: &PromptConfig) -> Self {
        let avoid_numbers: Vec<u32> = avoid.iter().collect();
        let context_json = serde_json::to_value(context).unwrap_or(Value::Null);
        let prompt = json!({
            "instruction": prompt.instruction,
            "style": style.to_string(),
            "avoid_numbers": avoid_numbers,
            "context_json": context_json,
            "output_schema": prompt.output_schema,
            "constraints": prompt.constraints,
        });
        ModelRequest { context: context.clone(), style, avoid_numbers, prompt }
    }
}

/// A black-box generative call.
pub trait ModelAdapter: Send + Sync {
    fn generate(&self, request: &ModelRequest) -> impl Future<Output = Result<Vec<Value>, AdapterError>> + Send;
}

/// Always unavailable; sessions come from templates.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoModel;

impl ModelAdapter for NoModel {
    async fn generate(&self, _request: &ModelRequest) -> Result<Vec<Value>, AdapterError> {
        Err(AdapterError::Unavailable("no model configured"))
    }
}

/// Replays a stored model response (e.g. a cached first-run payload).
#[derive(Debug, Clone)]
pub struct CachedModel {
    pub payload: String,
}

impl ModelAdapter for CachedModel {
    async fn generate(&self, _request: &ModelRequest) -> Result<Vec<Value>, AdapterError> {
        parse_model_text(&self.payload)
    }
}

fn strip_fences(text: &str) -> &str {
    let t = text.trim();
    let Some(rest) = t.strip_prefix("```") else {
        return t;
    };
    // Drop the info string ("json") on the opening fence line.
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Extract the item array from a model's text reply.
///
/// Accepts a bare array, a fenced block, an `{"items": [...]}` (or
/// `"exercises"`) wrapper, or prose around a single array.
pub fn parse_model_text(text: &str) -> Result<Vec<Value>, AdapterError> {
    let body = strip_fences(text);
    if body.is_empty() {
        return Err(AdapterError::EmptyPayload);
    }
    let value: Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(e) => match (body.find('['), body.rfind(']')) {
            (Some(start), Some(end)) if start < end => serde_json::from_str(&body[start..=end])?,
            _ => return Err(e.into()),
        },
    };
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut obj) => match obj.remove("items").or_else(|| obj.remove("exercises")) {
            Some(Value::Array(items)) => items,
            _ => return Err(AdapterError::Payload("object without an item array".into())),
        },
        other => return Err(AdapterError::Payload(format!("expected an array, got {other}"))),
    };
    if items.is_empty() {
        return Err(AdapterError::EmptyPayload);
    }
    Ok(items)
}
