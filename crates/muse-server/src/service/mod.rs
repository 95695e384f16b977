//! Application state and dependency injection.

mod config;

use std::sync::Arc;

use muse_core::job::JobBackend;
use muse_core::registry::AdapterRegistry;
use muse_service::{
    LlmService, MultimodalPipeline, RecommendationService, ResultCache, SttService,
    TaskOrchestrator, TextPipeline, TtsService, VisionService,
};

pub use crate::service::config::ServiceConfig;

/// Application state.
///
/// Used for the [`State`] extraction (dependency injection).
///
/// [`State`]: axum::extract::State
#[must_use = "state does nothing unless you use it"]
#[derive(Clone)]
pub struct ServiceState {
    // Capability services:
    pub llm: LlmService,
    pub stt: SttService,
    pub vision: VisionService,
    pub tts: TtsService,

    // Pipelines:
    pub text_pipeline: TextPipeline,
    pub multimodal_pipeline: MultimodalPipeline,

    // Background jobs:
    pub orchestrator: TaskOrchestrator,
}

impl ServiceState {
    /// Assembles the services over a shared registry, cache, and job backend.
    ///
    /// Adapters resolve lazily, so this performs no network calls.
    pub fn new(
        config: &ServiceConfig,
        registry: AdapterRegistry,
        cache: ResultCache,
        backend: Arc<dyn JobBackend>,
    ) -> Self {
        let ttls = config.cache_ttls;

        let llm = LlmService::new(registry.clone(), None);
        let stt = SttService::new(registry.clone(), None);
        let tts = TtsService::new(registry.clone(), None);
        let vision = VisionService::new(registry.clone(), None, cache.clone(), ttls);

        let text_pipeline = TextPipeline::new(
            LlmService::new(registry, config.text_pipeline_provider),
            RecommendationService::new(),
        );
        let multimodal_pipeline =
            MultimodalPipeline::new(vision.clone(), text_pipeline.clone(), tts.clone());

        Self {
            llm,
            stt,
            vision,
            tts,
            text_pipeline,
            multimodal_pipeline,
            orchestrator: TaskOrchestrator::new(backend, cache, ttls),
        }
    }
}

macro_rules! impl_di {
    ($($f:ident: $t:ty),+) => {$(
        impl axum::extract::FromRef<ServiceState> for $t {
            fn from_ref(state: &ServiceState) -> Self {
                state.$f.clone()
            }
        }
    )+};
}

// Capability services:
impl_di!(llm: LlmService);
impl_di!(stt: SttService);
impl_di!(vision: VisionService);
impl_di!(tts: TtsService);

// Pipelines:
impl_di!(text_pipeline: TextPipeline);
impl_di!(multimodal_pipeline: MultimodalPipeline);

// Background jobs:
impl_di!(orchestrator: TaskOrchestrator);
