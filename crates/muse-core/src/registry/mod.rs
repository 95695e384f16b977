//! Adapter registry with deterministic provider fallback.
//!
//! The registry maps `(capability, provider)` pairs to factories. It performs
//! no network calls: factories only build clients from credentials. The
//! registry is assembled once at startup through [`AdapterRegistryBuilder`]
//! and shared by reference afterwards.

mod credentials;

use std::collections::HashMap;
use std::sync::Arc;

pub use credentials::{DefaultProviders, ProviderCredentials};

use crate::adapter::{AdapterHandle, LlmAdapter, SttAdapter, TtsAdapter, VisionAdapter};
use crate::{Capability, Error, Provider, Result, TRACING_TARGET_REGISTRY};

/// Constructs an adapter from the configured credentials.
pub type AdapterFactory =
    Arc<dyn Fn(&ProviderCredentials) -> Result<AdapterHandle> + Send + Sync>;

/// Builder collecting adapter registrations before the registry is frozen.
pub struct AdapterRegistryBuilder {
    factories: HashMap<(Capability, Provider), AdapterFactory>,
    credentials: ProviderCredentials,
    defaults: DefaultProviders,
}

impl AdapterRegistryBuilder {
    /// Sets the default provider per capability.
    pub fn with_defaults(mut self, defaults: DefaultProviders) -> Self {
        self.defaults = defaults;
        self
    }

    /// Registers a factory, replacing any previous one for the same pair.
    pub fn register(
        mut self,
        capability: Capability,
        provider: Provider,
        factory: AdapterFactory,
    ) -> Self {
        self.factories.insert((capability, provider), factory);
        self
    }

    /// Registers a text generation adapter factory.
    pub fn register_llm<F>(self, provider: Provider, factory: F) -> Self
    where
        F: Fn(&ProviderCredentials) -> Result<Arc<dyn LlmAdapter>> + Send + Sync + 'static,
    {
        let factory: AdapterFactory = Arc::new(move |c| factory(c).map(AdapterHandle::Llm));
        self.register(Capability::Llm, provider, factory)
    }

    /// Registers an image captioning adapter factory.
    pub fn register_vision<F>(self, provider: Provider, factory: F) -> Self
    where
        F: Fn(&ProviderCredentials) -> Result<Arc<dyn VisionAdapter>> + Send + Sync + 'static,
    {
        let factory: AdapterFactory = Arc::new(move |c| factory(c).map(AdapterHandle::Vision));
        self.register(Capability::Vision, provider, factory)
    }

    /// Registers a speech-to-text adapter factory.
    pub fn register_stt<F>(self, provider: Provider, factory: F) -> Self
    where
        F: Fn(&ProviderCredentials) -> Result<Arc<dyn SttAdapter>> + Send + Sync + 'static,
    {
        let factory: AdapterFactory = Arc::new(move |c| factory(c).map(AdapterHandle::Stt));
        self.register(Capability::Stt, provider, factory)
    }

    /// Registers a text-to-speech adapter factory.
    pub fn register_tts<F>(self, provider: Provider, factory: F) -> Self
    where
        F: Fn(&ProviderCredentials) -> Result<Arc<dyn TtsAdapter>> + Send + Sync + 'static,
    {
        let factory: AdapterFactory = Arc::new(move |c| factory(c).map(AdapterHandle::Tts));
        self.register(Capability::Tts, provider, factory)
    }

    /// Registers an already constructed adapter.
    pub fn register_instance(self, handle: AdapterHandle) -> Self {
        let capability = handle.capability();
        let provider = handle.provider();
        let factory: AdapterFactory = Arc::new(move |_| Ok(handle.clone()));
        self.register(capability, provider, factory)
    }

    /// Freezes the registrations into a shareable registry.
    pub fn build(self) -> AdapterRegistry {
        tracing::debug!(
            target: TRACING_TARGET_REGISTRY,
            registrations = self.factories.len(),
            configured = ?self.credentials.configured(),
            "Adapter registry built"
        );

        AdapterRegistry {
            inner: Arc::new(RegistryInner {
                factories: self.factories,
                credentials: self.credentials,
                defaults: self.defaults,
            }),
        }
    }
}

struct RegistryInner {
    factories: HashMap<(Capability, Provider), AdapterFactory>,
    credentials: ProviderCredentials,
    defaults: DefaultProviders,
}

/// Process-wide lookup table from capabilities to adapters.
///
/// Cheap to clone; clones share the same registrations.
#[derive(Clone)]
pub struct AdapterRegistry {
    inner: Arc<RegistryInner>,
}

impl AdapterRegistry {
    /// Starts a registry with the given credentials and default providers.
    pub fn builder(credentials: ProviderCredentials) -> AdapterRegistryBuilder {
        AdapterRegistryBuilder {
            factories: HashMap::new(),
            credentials,
            defaults: DefaultProviders::default(),
        }
    }

    /// Returns the configured default provider for a capability.
    pub fn default_provider(&self, capability: Capability) -> Provider {
        self.inner.defaults.get(capability)
    }

    /// Returns whether a provider is registered and credentialed for a capability.
    pub fn is_available(&self, capability: Capability, provider: Provider) -> bool {
        self.inner.factories.contains_key(&(capability, provider))
            && self.inner.credentials.is_configured(provider)
    }

    /// Candidate providers in resolution order, without duplicates.
    pub fn candidates(&self, capability: Capability, requested: Option<Provider>) -> Vec<Provider> {
        let start = requested.unwrap_or_else(|| self.default_provider(capability));
        let mut chain = vec![start];
        for provider in capability.fallback_chain() {
            if !chain.contains(provider) {
                chain.push(*provider);
            }
        }
        chain
    }

    /// Resolves an adapter for the capability.
    ///
    /// Starts from `requested` (or the capability default) and walks the
    /// capability's fallback chain, skipping providers that are unregistered,
    /// lack credentials, or fail to construct. A substitution is logged as a
    /// warning. Fails with a configuration error only when the whole chain
    /// is exhausted.
    pub fn resolve(
        &self,
        capability: Capability,
        requested: Option<Provider>,
    ) -> Result<AdapterHandle> {
        let candidates = self.candidates(capability, requested);
        let start = candidates[0];

        for provider in candidates {
            let Some(factory) = self.inner.factories.get(&(capability, provider)) else {
                tracing::debug!(
                    target: TRACING_TARGET_REGISTRY,
                    capability = %capability,
                    provider = %provider,
                    "Provider not registered, skipping"
                );
                continue;
            };

            if !self.inner.credentials.is_configured(provider) {
                tracing::debug!(
                    target: TRACING_TARGET_REGISTRY,
                    capability = %capability,
                    provider = %provider,
                    "Provider has no credentials, skipping"
                );
                continue;
            }

            match factory(&self.inner.credentials) {
                Ok(handle) => {
                    if provider != start {
                        tracing::warn!(
                            target: TRACING_TARGET_REGISTRY,
                            capability = %capability,
                            requested = %start,
                            resolved = %provider,
                            "Provider not available, falling back"
                        );
                    }
                    return Ok(handle);
                }
                Err(error) => {
                    tracing::error!(
                        target: TRACING_TARGET_REGISTRY,
                        capability = %capability,
                        provider = %provider,
                        error = %error,
                        "Failed to construct adapter"
                    );
                }
            }
        }

        Err(Error::configuration().with_message(format!(
            "no {capability} provider is configured"
        )))
    }

    /// Resolves a text generation adapter.
    pub fn resolve_llm(&self, requested: Option<Provider>) -> Result<Arc<dyn LlmAdapter>> {
        self.resolve(Capability::Llm, requested)?
            .into_llm()
            .ok_or_else(|| mismatched(Capability::Llm))
    }

    /// Resolves an image captioning adapter.
    pub fn resolve_vision(&self, requested: Option<Provider>) -> Result<Arc<dyn VisionAdapter>> {
        self.resolve(Capability::Vision, requested)?
            .into_vision()
            .ok_or_else(|| mismatched(Capability::Vision))
    }

    /// Resolves a speech-to-text adapter.
    pub fn resolve_stt(&self, requested: Option<Provider>) -> Result<Arc<dyn SttAdapter>> {
        self.resolve(Capability::Stt, requested)?
            .into_stt()
            .ok_or_else(|| mismatched(Capability::Stt))
    }

    /// Resolves a text-to-speech adapter.
    pub fn resolve_tts(&self, requested: Option<Provider>) -> Result<Arc<dyn TtsAdapter>> {
        self.resolve(Capability::Tts, requested)?
            .into_tts()
            .ok_or_else(|| mismatched(Capability::Tts))
    }
}

fn mismatched(capability: Capability) -> Error {
    Error::configuration().with_message(format!(
        "registered factory does not produce a {capability} adapter"
    ))
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut registrations: Vec<_> = self.inner.factories.keys().collect();
        registrations.sort();
        f.debug_struct("AdapterRegistry")
            .field("registrations", &registrations)
            .field("credentials", &self.inner.credentials)
            .field("defaults", &self.inner.defaults)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tracing::field::{Field, Visit};
    use tracing::{Event, Subscriber};
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

    use super::*;
    use crate::mock::{MockLlm, MockTts};

    fn registry(credentials: ProviderCredentials) -> AdapterRegistry {
        AdapterRegistry::builder(credentials)
            .register_instance(AdapterHandle::Llm(Arc::new(MockLlm::replying(
                Provider::OpenAi,
                "from openai",
            ))))
            .register_instance(AdapterHandle::Llm(Arc::new(MockLlm::replying(
                Provider::HuggingFace,
                "from huggingface",
            ))))
            .register_instance(AdapterHandle::Tts(Arc::new(MockTts::replying(
                Provider::OpenAi,
                b"openai-audio".to_vec(),
            ))))
            .register_instance(AdapterHandle::Tts(Arc::new(MockTts::replying(
                Provider::Gtts,
                b"gtts-audio".to_vec(),
            ))))
            .build()
    }

    #[test]
    fn resolves_requested_when_configured() {
        let registry = registry(ProviderCredentials::new().with_openai("sk"));
        let handle = registry.resolve(Capability::Llm, Some(Provider::OpenAi)).unwrap();
        assert_eq!(handle.provider(), Provider::OpenAi);
    }

    /// Collects the fields of every event logged while installed.
    #[derive(Clone, Default)]
    struct CapturedEvents(Arc<Mutex<Vec<HashMap<String, String>>>>);

    struct FieldVisitor<'a>(&'a mut HashMap<String, String>);

    impl Visit for FieldVisitor<'_> {
        fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
            self.0.insert(field.name().to_owned(), format!("{value:?}"));
        }

        fn record_str(&mut self, field: &Field, value: &str) {
            self.0.insert(field.name().to_owned(), value.to_owned());
        }
    }

    impl<S: Subscriber> Layer<S> for CapturedEvents {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            let mut fields = HashMap::new();
            fields.insert("level".to_owned(), event.metadata().level().to_string());
            fields.insert("target".to_owned(), event.metadata().target().to_owned());
            event.record(&mut FieldVisitor(&mut fields));
            if let Ok(mut events) = self.0.lock() {
                events.push(fields);
            }
        }
    }

    impl CapturedEvents {
        fn events(&self) -> Vec<HashMap<String, String>> {
            self.0.lock().map(|events| events.clone()).unwrap_or_default()
        }
    }

    #[test]
    fn falls_back_to_huggingface_without_openai_key() {
        let captured = CapturedEvents::default();
        let subscriber = tracing_subscriber::registry().with(captured.clone());
        let _guard = tracing::subscriber::set_default(subscriber);

        let registry = registry(ProviderCredentials::new().with_huggingface("hf"));
        let handle = registry.resolve(Capability::Llm, Some(Provider::OpenAi)).unwrap();
        assert_eq!(handle.provider(), Provider::HuggingFace);

        let events = captured.events();
        let substitution = events
            .iter()
            .find(|fields| {
                fields.get("message").map(String::as_str)
                    == Some("Provider not available, falling back")
            })
            .expect("substitution was not logged");
        assert_eq!(substitution["level"], "WARN");
        assert_eq!(substitution["target"], TRACING_TARGET_REGISTRY);
        assert_eq!(substitution["capability"], Capability::Llm.to_string());
        assert_eq!(substitution["requested"], Provider::OpenAi.to_string());
        assert_eq!(substitution["resolved"], Provider::HuggingFace.to_string());
    }

    #[test]
    fn requested_provider_is_not_a_substitution() {
        let captured = CapturedEvents::default();
        let subscriber = tracing_subscriber::registry().with(captured.clone());
        let _guard = tracing::subscriber::set_default(subscriber);

        let registry = registry(ProviderCredentials::new().with_openai("sk"));
        registry.resolve(Capability::Llm, Some(Provider::OpenAi)).unwrap();

        assert!(captured.events().iter().all(|fields| fields["level"] != "WARN"));
    }

    #[test]
    fn falls_back_to_openai_before_huggingface() {
        let registry = registry(
            ProviderCredentials::new()
                .with_openai("sk")
                .with_huggingface("hf"),
        );
        // gtts is not an llm provider
        let handle = registry.resolve(Capability::Llm, Some(Provider::Gtts)).unwrap();
        assert_eq!(handle.provider(), Provider::OpenAi);
    }

    #[test]
    fn omitted_provider_starts_from_default() {
        let registry = AdapterRegistry::builder(
            ProviderCredentials::new()
                .with_openai("sk")
                .with_huggingface("hf"),
        )
        .with_defaults(DefaultProviders::default().with(Capability::Llm, Provider::HuggingFace))
        .register_instance(AdapterHandle::Llm(Arc::new(MockLlm::replying(
            Provider::OpenAi,
            "a",
        ))))
        .register_instance(AdapterHandle::Llm(Arc::new(MockLlm::replying(
            Provider::HuggingFace,
            "b",
        ))))
        .build();

        let handle = registry.resolve(Capability::Llm, None).unwrap();
        assert_eq!(handle.provider(), Provider::HuggingFace);
    }

    #[test]
    fn tts_falls_back_to_gtts_without_credentials() {
        let registry = registry(ProviderCredentials::new());
        let adapter = registry.resolve_tts(Some(Provider::OpenAi)).unwrap();
        assert_eq!(adapter.provider(), Provider::Gtts);
    }

    #[test]
    fn no_provider_is_configuration_error() {
        let registry = registry(ProviderCredentials::new());
        let error = registry.resolve(Capability::Llm, None).unwrap_err();
        assert_eq!(error.kind(), crate::ErrorKind::Configuration);
        assert!(!error.is_retryable());
    }

    #[test]
    fn unregistered_capability_is_configuration_error() {
        let registry = registry(ProviderCredentials::new().with_openai("sk"));
        let error = registry.resolve_stt(None).err().unwrap();
        assert_eq!(error.kind(), crate::ErrorKind::Configuration);
    }

    #[test]
    fn construction_failure_moves_down_the_chain() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();
        let registry = AdapterRegistry::builder(
            ProviderCredentials::new()
                .with_openai("sk")
                .with_huggingface("hf"),
        )
        .register_llm(Provider::OpenAi, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(Error::configuration().with_message("bad key"))
        })
        .register_instance(AdapterHandle::Llm(Arc::new(MockLlm::replying(
            Provider::HuggingFace,
            "b",
        ))))
        .build();

        let adapter = registry.resolve_llm(None).unwrap();
        assert_eq!(adapter.provider(), Provider::HuggingFace);
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn candidates_are_deduplicated() {
        let registry = registry(ProviderCredentials::new());
        assert_eq!(
            registry.candidates(Capability::Vision, Some(Provider::HuggingFace)),
            vec![Provider::HuggingFace, Provider::OpenAi]
        );
        assert_eq!(
            registry.candidates(Capability::Tts, None),
            vec![Provider::OpenAi, Provider::Gtts]
        );
    }
}
