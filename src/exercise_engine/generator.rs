//! Topic Engine: one call, one bounded model attempt, one deterministic
//! fallback, exactly [`SESSION_SIZE`] items out.
//!
//! ```text
//! SessionRequest ─► [model (timeout) | bank variation | templates]
//!                 ─► sanitize ─► style ─► truncate / pad ─► ExerciseSet
//! ```

use std::collections::HashSet;

use rand::{rngs::StdRng, SeedableRng};
use serde_json::Value;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

use crate::exercise_engine::{
    adapter::{ModelAdapter, ModelRequest, NoModel},
    config::EngineConfig,
    helpers::content_seed,
    models::{
        AvoidSet, ContentContext, ExerciseItem, ExerciseSet, GenerationStrategy, ItemSource,
        LearningStyle, SessionRequest, SESSION_SIZE,
    },
    sanitizer::{sanitize_items, sanitize_values},
    style::{apply_style, neutralize_audio_prompts},
    topics::{self, bank::vary_bank, FallbackRequest, StrategyRegistry, TopicStrategy},
};

fn session_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None       => StdRng::from_entropy(),
    }
}

pub struct TopicEngine<A = NoModel> {
    adapter: A,
    config: EngineConfig,
    registry: StrategyRegistry,
}

impl Default for TopicEngine<NoModel> {
    fn default() -> Self {
        TopicEngine::new(EngineConfig::default())
    }
}

impl TopicEngine<NoModel> {
    /// Template-only engine.
    pub fn new(config: EngineConfig) -> Self {
        TopicEngine::with_adapter(NoModel, config)
    }
}

impl<A: ModelAdapter> TopicEngine<A> {
    pub fn with_adapter(adapter: A, config: EngineConfig) -> Self {
        TopicEngine { adapter, config, registry: StrategyRegistry::default() }
    }

    pub fn with_registry(mut self, registry: StrategyRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &StrategyRegistry {
        &self.registry
    }

    fn fallback_request<'a>(
        &self,
        context: &'a ContentContext,
        style: LearningStyle,
        avoid: &'a AvoidSet,
    ) -> FallbackRequest<'a> {
        FallbackRequest {
            context,
            style,
            avoid,
            range: context.numeric_range(self.config.default_range).bounds(),
            attempts: self.config.avoid_attempts,
        }
    }

    /// Build a session. Never fails: adapter errors and timeouts fall back
    /// to templates, and the result always holds [`SESSION_SIZE`] items.
    #[instrument(
        skip_all,
        fields(slug = %request.context.slug, style = %request.style, strategy = ?request.strategy)
    )]
    pub async fn build_session(&self, request: SessionRequest) -> ExerciseSet {
        let strategy = self.registry.resolve(&request.context);
        let produced = match request.strategy {
            GenerationStrategy::Model => self
                .call_model(&request, strategy.slug())
                .await
                .map(|items| (items, ItemSource::Model)),
            GenerationStrategy::Template => None,
            GenerationStrategy::BankVariation { seed } => {
                self.bank_items(&request.context, seed).map(|items| (items, ItemSource::BankVariation))
            }
        };
        self.assemble(&request, strategy, produced)
    }

    /// [`build_session`](Self::build_session) on a private current-thread
    /// runtime. Must not be called from inside a Tokio runtime.
    pub fn build_session_blocking(&self, request: SessionRequest) -> ExerciseSet {
        match tokio::runtime::Builder::new_current_thread().enable_time().build() {
            Ok(runtime) => runtime.block_on(self.build_session(request)),
            Err(e) => {
                warn!(target: "exercise_engine", error = %e, "no runtime for the model call; using templates");
                let strategy = self.registry.resolve(&request.context);
                self.assemble(&request, strategy, None)
            }
        }
    }

    async fn call_model(&self, request: &SessionRequest, slug: &str) -> Option<Vec<ExerciseItem>> {
        let model_request = ModelRequest::new(&request.context, request.style, &request.avoid, &self.config.prompt);
        match timeout(self.config.model_timeout(), self.adapter.generate(&model_request)).await {
            Ok(Ok(values)) if !values.is_empty() => {
                let items = sanitize_values(&values);
                info!(target: "exercise_engine", slug, count = items.len(), "model adapter returned items");
                Some(items)
            }
            Ok(Ok(_)) => {
                warn!(target: "exercise_engine", slug, "model adapter returned no items; using templates");
                None
            }
            Ok(Err(e)) => {
                warn!(target: "exercise_engine", slug, error = %e, "model adapter failed; using templates");
                None
            }
            Err(_) => {
                warn!(
                    target: "exercise_engine",
                    slug,
                    timeout_ms = self.config.model_timeout_ms,
                    "model adapter timed out; using templates"
                );
                None
            }
        }
    }

    fn bank_items(&self, context: &ContentContext, seed: u64) -> Option<Vec<ExerciseItem>> {
        if context.exercise_bank.is_empty() {
            debug!(target: "exercise_engine", "exercise bank is empty; using templates");
            return None;
        }
        Some(vary_bank(context, seed, context.numeric_range(self.config.default_range)))
    }

    fn assemble(
        &self,
        request: &SessionRequest,
        strategy: &dyn TopicStrategy,
        produced: Option<(Vec<ExerciseItem>, ItemSource)>,
    ) -> ExerciseSet {
        let mut rng = session_rng(request.seed);
        let fallback = self.fallback_request(&request.context, request.style, &request.avoid);
        let (items, source) = match produced {
            Some(produced) => produced,
            None => (strategy.fallback_items(&fallback, &mut rng), ItemSource::Template),
        };

        let mut items = apply_style(&sanitize_items(&items), request.style);
        items.truncate(SESSION_SIZE);
        self.pad(&mut items, strategy, &fallback, &mut rng);

        if request.style == LearningStyle::Auditory
            && !request.audio_available
            && self.config.neutralize_audio_prompts
        {
            neutralize_audio_prompts(&mut items);
        }

        info!(target: "exercise_engine", slug = strategy.slug(), %source, "session built");
        ExerciseSet::new(items, strategy.explanation(&request.context), request.style, source)
    }

    /// Top up with fresh template items (structurally new ones only), then
    /// with numeric fillers once the rounds run out.
    fn pad(
        &self,
        items: &mut Vec<ExerciseItem>,
        strategy: &dyn TopicStrategy,
        fallback: &FallbackRequest<'_>,
        rng: &mut StdRng,
    ) {
        if items.len() >= SESSION_SIZE {
            return;
        }
        let before = items.len();
        let mut seen: HashSet<String> = items.iter().map(ExerciseItem::structural_key).collect();
        for _ in 0..self.config.padding_rounds {
            if items.len() >= SESSION_SIZE {
                break;
            }
            for item in topics::generate_fallback(strategy, fallback, rng) {
                if items.len() < SESSION_SIZE && seen.insert(item.structural_key()) {
                    items.push(item);
                }
            }
        }
        let mut n = 2;
        while items.len() < SESSION_SIZE {
            let filler = apply_style(&[topics::filler(n)], fallback.style);
            items.extend(filler.into_iter().filter(|item| seen.insert(item.structural_key())));
            n += 1;
        }
        debug!(target: "exercise_engine", added = items.len() - before, "padded short session");
    }

    /// Template items only, for a context and style.
    pub fn generate_fallback(
        &self,
        context: &ContentContext,
        style: LearningStyle,
        avoid: &AvoidSet,
        seed: u64,
    ) -> Vec<ExerciseItem> {
        let strategy = self.registry.resolve(context);
        let request = self.fallback_request(context, style, avoid);
        topics::generate_fallback(strategy, &request, &mut StdRng::seed_from_u64(seed))
    }

    /// Re-verify a stored (possibly edited) session: sanitize, restyle and
    /// pad back to [`SESSION_SIZE`]. Padding is seeded by the context so a
    /// resumed session repairs the same way every time.
    pub fn validate_repair(
        &self,
        values: &[Value],
        context: &ContentContext,
        style: LearningStyle,
    ) -> Vec<ExerciseItem> {
        let strategy = self.registry.resolve(context);
        let avoid = AvoidSet::new();
        let fallback = self.fallback_request(context, style, &avoid);
        let mut rng = StdRng::seed_from_u64(content_seed(&[context.slug.as_str(), context.title.as_str()]));
        let mut items = apply_style(&sanitize_values(values), style);
        items.truncate(SESSION_SIZE);
        self.pad(&mut items, strategy, &fallback, &mut rng);
        items
    }
}
