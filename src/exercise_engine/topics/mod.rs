//! Per-topic fallback strategies.
//!
//! Every strategy implements [`TopicStrategy`]; the [`StrategyRegistry`]
//! picks one for a content context:
//!
//! | Order | Match                                  |
//! |-------|----------------------------------------|
//! | 1     | `(grade, slug)` exactly                |
//! | 2     | `slug` alone                           |
//! | 3     | content detection (`detect`)           |
//! | 4     | [`generic::GenericTopic`]              |
//!
//! | Strategy       | Slug                   | Grade |
//! |----------------|------------------------|-------|
//! | fractions      | `fracciones-basicas`   | 3     |
//! | percentages    | `porcentajes`          | 6     |
//! | generic        | `generic`              | any   |

use rand::rngs::StdRng;

use crate::exercise_engine::{
    helpers::mcq_by_value,
    models::{AvoidSet, ContentContext, ExerciseItem, LearningStyle, SESSION_SIZE},
    sanitizer::sanitize_items,
    style::apply_style,
    text::{normalize, short},
};

pub mod bank;
pub mod fractions;
pub mod generic;
pub mod percentages;

/// Inputs shared by every fallback generator.
#[derive(Debug, Clone, Copy)]
pub struct FallbackRequest<'a> {
    pub context: &'a ContentContext,
    pub style: LearningStyle,
    pub avoid: &'a AvoidSet,
    /// Effective `(min, max)` for drawn numbers.
    pub range: (u32, u32),
    /// Bounded retry count for avoid-set draws.
    pub attempts: usize,
}

pub trait TopicStrategy: Send + Sync {
    fn slug(&self) -> &'static str;

    fn grade(&self) -> Option<u32> {
        None
    }

    /// Whether the context looks like this topic when the slug is unknown.
    fn detect(&self, context: &ContentContext) -> bool;

    /// Ten template items for the topic. Deterministic for a given `rng` state.
    fn fallback_items(&self, request: &FallbackRequest<'_>, rng: &mut StdRng) -> Vec<ExerciseItem>;

    fn explanation(&self, context: &ContentContext) -> String {
        default_explanation(context)
    }
}

/// First two concept/example texts, condensed; title-based text otherwise.
pub fn default_explanation(context: &ContentContext) -> String {
    let mut parts = context.concept_texts();
    parts.extend(context.example_texts());
    let base = if parts.is_empty() {
        let title = if context.title.trim().is_empty() { "This topic" } else { context.title.trim() };
        format!("{title}: review the definition and the key examples.")
    } else {
        parts[..parts.len().min(2)].join(" ")
    };
    short(&base, 320)
}

pub struct StrategyRegistry {
    strategies: Vec<Box<dyn TopicStrategy>>,
    generic: generic::GenericTopic,
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        StrategyRegistry {
            strategies: vec![Box::new(percentages::PercentagesTopic), Box::new(fractions::FractionsTopic)],
            generic: generic::GenericTopic,
        }
    }
}

impl StrategyRegistry {
    /// Registry with only the generic strategy.
    pub fn empty() -> Self {
        StrategyRegistry { strategies: Vec::new(), generic: generic::GenericTopic }
    }

    pub fn register(&mut self, strategy: impl TopicStrategy + 'static) {
        self.strategies.push(Box::new(strategy));
    }

    pub fn resolve(&self, context: &ContentContext) -> &dyn TopicStrategy {
        let slug = normalize(&context.slug);
        let by_grade = self
            .strategies
            .iter()
            .find(|s| s.slug() == slug && s.grade().is_some() && s.grade() == context.grade);
        let by_slug = || self.strategies.iter().find(|s| s.slug() == slug);
        let by_content = || self.strategies.iter().find(|s| s.detect(context));
        match by_grade.or_else(by_slug).or_else(by_content) {
            Some(strategy) => strategy.as_ref(),
            None => &self.generic,
        }
    }
}

/// Distinct numeric filler for the rare case a strategy comes up short.
pub(crate) fn filler(n: u32) -> ExerciseItem {
    let sum = n + 1;
    mcq_by_value(
        format!("What is {n} + 1?"),
        sum.to_string(),
        vec![n.to_string(), (n + 2).to_string(), (n + 3).to_string()],
        "Adding one gives the next whole number.",
    )
}

/// Template/Fallback Generator: exactly [`SESSION_SIZE`] sanitized,
/// style-filtered items for the context. Never fails.
pub fn generate_fallback(
    strategy: &dyn TopicStrategy,
    request: &FallbackRequest<'_>,
    rng: &mut StdRng,
) -> Vec<ExerciseItem> {
    let mut items = sanitize_items(&strategy.fallback_items(request, rng));
    items.truncate(SESSION_SIZE);
    let mut n = 2;
    while items.len() < SESSION_SIZE {
        items.push(filler(n));
        n += 1;
    }
    apply_style(&items, request.style)
}
