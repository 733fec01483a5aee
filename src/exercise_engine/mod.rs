//! Exercise engine: item model, repair, variation, styling, checking and
//! session orchestration.
//!
//! ## Module overview
//!
//! | Module      | Purpose |
//! |-------------|---------|
//! | `models`    | Item union, content context, avoid set, session request/response |
//! | `text`      | Normalization shared by every equality and dedup check |
//! | `fraction`  | Fraction values, token scanning, pivot bucket parsing |
//! | `helpers`   | Seeded shuffle, bounded retry draws, item builders |
//! | `sanitizer` | Total, idempotent repair of untrusted items |
//! | `variation` | Seeded numeric variation of template items |
//! | `style`     | VAK filter/converter |
//! | `checker`   | Answer checking |
//! | `adapter`   | Model adapter contract and built-in adapters |
//! | `config`    | TOML engine configuration |
//! | `error`     | Caller-facing and adapter error types |
//! | `generator` | `TopicEngine`: the single session entry point |
//! | `topics`    | Per-topic fallback strategies and bank variation |

pub mod adapter;
pub mod checker;
pub mod config;
pub mod error;
pub mod fraction;
pub mod generator;
pub mod helpers;
pub mod models;
pub mod sanitizer;
pub mod style;
pub mod text;
pub mod topics;
pub mod variation;

pub use adapter::{parse_model_text, CachedModel, ModelAdapter, ModelRequest, NoModel};
pub use checker::{check_answer, check_value, Answer};
pub use config::EngineConfig;
pub use error::{AdapterError, EngineError};
pub use generator::TopicEngine;
pub use models::{
    AvoidSet, ContentContext, DragToBucket, ExerciseItem, ExerciseSet, GenerationStrategy,
    ItemKind, ItemSource, LearningStyle, MatchPairs, MultipleChoice, NumericRange,
    SessionRequest, VariationState, SESSION_SIZE,
};
pub use sanitizer::{sanitize, sanitize_items, sanitize_values, RawItem};
pub use style::apply_style;
pub use variation::vary;
