//! # vak_drill_gen
//!
//! Adaptive-learning exercise sessions: ten structurally valid items per
//! session, shaped for a learner's VAK (visual / auditory / kinesthetic) style.
//!
//! ## How it works
//!
//! 1. Describe the topic with a [`ContentContext`] (concepts, examples,
//!    allowed number range, optional exercise bank).
//! 2. Build a [`SessionRequest`] with a [`LearningStyle`], the numbers to
//!    avoid, an optional seed and a [`GenerationStrategy`].
//! 3. Call [`TopicEngine::build_session`]. The engine asks the model adapter
//!    (under a timeout), varies the exercise bank, or uses the topic's
//!    templates; every item goes through the sanitizer and the style filter,
//!    and the session is padded or truncated to exactly [`SESSION_SIZE`].
//! 4. Check submissions with [`check_answer`] / [`check_value`].
//!
//! ## Key features
//!
//! - **Never fails**: model errors and timeouts fall back to templates; the
//!   sanitizer repairs any item into a valid one.
//! - **Deterministic**: pass `seed: Some(u64)` to reproduce a session.
//! - **Correct by value**: the right answer is tracked by value through
//!   repair, variation and shuffling, never by a stale index.
//!
//! ## Quick start
//!
//! ```rust
//! use vak_drill_gen::{
//!     ContentContext, GenerationStrategy, LearningStyle, SessionRequest, TopicEngine,
//! };
//!
//! let engine = TopicEngine::default();
//! let context = ContentContext {
//!     grade: Some(3),
//!     slug: "fracciones-basicas".into(),
//!     ..ContentContext::default()
//! };
//! let mut request = SessionRequest::new(context, "kinestesico".parse().unwrap());
//! request.seed = Some(42);
//! request.strategy = GenerationStrategy::Template;
//!
//! let set = engine.build_session_blocking(request);
//! assert_eq!(set.items().len(), 10);
//! assert_eq!(set.style, LearningStyle::Kinesthetic);
//! ```

pub mod exercise_engine;
pub mod wire;

// Convenience re-exports so callers can use `vak_drill_gen::TopicEngine`
// directly without reaching into `exercise_engine::`.
pub use exercise_engine::{
    apply_style, check_answer, check_value, parse_model_text, sanitize, sanitize_items,
    sanitize_values, vary, AdapterError, Answer, AvoidSet, CachedModel, ContentContext,
    DragToBucket, EngineConfig, EngineError, ExerciseItem, ExerciseSet, GenerationStrategy,
    ItemKind, ItemSource, LearningStyle, MatchPairs, ModelAdapter, ModelRequest,
    MultipleChoice, NoModel, NumericRange, RawItem, SessionRequest, TopicEngine,
    VariationState, SESSION_SIZE,
};
pub use wire::{raw_items_from_json, session_package, signature_of_numbers};

#[cfg(test)]
mod tests;
