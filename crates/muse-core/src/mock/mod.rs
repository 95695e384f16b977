//! Mock adapters for testing.
//!
//! Every mock replies with a fixed value or fails with an adapter error, and
//! counts how many times it was called so tests can assert that a stage was
//! never reached.
//!
//! # Feature Flag
//!
//! This module is only available when the `test-utils` feature is enabled:
//!
//! ```toml
//! [dev-dependencies]
//! muse-core = { version = "...", features = ["test-utils"] }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use bytes::Bytes;

use crate::adapter::{AdapterHandle, LlmAdapter, SttAdapter, TtsAdapter, VisionAdapter};
use crate::registry::{AdapterRegistry, ProviderCredentials};
use crate::{Error, Provider, Result};

#[derive(Debug)]
struct MockState<T> {
    provider: Provider,
    reply: Option<T>,
    calls: AtomicUsize,
}

impl<T: Clone> MockState<T> {
    fn new(provider: Provider, reply: Option<T>) -> Self {
        Self {
            provider,
            reply,
            calls: AtomicUsize::new(0),
        }
    }

    fn call(&self) -> Result<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reply.clone().ok_or_else(|| {
            Error::adapter().with_message(format!("mock {} adapter failure", self.provider))
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

macro_rules! mock_adapter {
    ($name:ident, $reply:ty, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug)]
        pub struct $name(MockState<$reply>);

        impl $name {
            /// Creates a mock that always replies with `reply`.
            pub fn replying(provider: Provider, reply: impl Into<$reply>) -> Self {
                Self(MockState::new(provider, Some(reply.into())))
            }

            /// Creates a mock that always fails with an adapter error.
            pub fn failing(provider: Provider) -> Self {
                Self(MockState::new(provider, None))
            }

            /// Number of calls received so far.
            pub fn calls(&self) -> usize {
                self.0.calls()
            }
        }
    };
}

mock_adapter!(MockLlm, String, "Mock text generation adapter.");
mock_adapter!(MockVision, String, "Mock image captioning adapter.");
mock_adapter!(MockStt, String, "Mock speech-to-text adapter.");
mock_adapter!(MockTts, Bytes, "Mock text-to-speech adapter.");

#[async_trait::async_trait]
impl LlmAdapter for MockLlm {
    fn provider(&self) -> Provider {
        self.0.provider
    }

    async fn generate(&self, _prompt: &str) -> Result<String> {
        self.0.call()
    }
}

#[async_trait::async_trait]
impl VisionAdapter for MockVision {
    fn provider(&self) -> Provider {
        self.0.provider
    }

    async fn describe(&self, _image: &[u8]) -> Result<String> {
        self.0.call()
    }
}

#[async_trait::async_trait]
impl SttAdapter for MockStt {
    fn provider(&self) -> Provider {
        self.0.provider
    }

    async fn transcribe(&self, _audio: &[u8]) -> Result<String> {
        self.0.call()
    }
}

#[async_trait::async_trait]
impl TtsAdapter for MockTts {
    fn provider(&self) -> Provider {
        self.0.provider
    }

    async fn speak(&self, _text: &str) -> Result<Bytes> {
        self.0.call()
    }
}

/// A complete set of mock adapters, one per capability.
#[derive(Debug, Clone)]
pub struct MockAdapters {
    pub llm: Arc<MockLlm>,
    pub vision: Arc<MockVision>,
    pub stt: Arc<MockStt>,
    pub tts: Arc<MockTts>,
}

impl Default for MockAdapters {
    fn default() -> Self {
        Self {
            llm: Arc::new(MockLlm::replying(Provider::OpenAi, "mock response")),
            vision: Arc::new(MockVision::replying(Provider::OpenAi, "a cat on a sofa")),
            stt: Arc::new(MockStt::replying(Provider::OpenAi, "hello there")),
            tts: Arc::new(MockTts::replying(Provider::OpenAi, &b"ID3mock"[..])),
        }
    }
}

impl MockAdapters {
    /// Replaces the text generation mock.
    pub fn with_llm(mut self, llm: MockLlm) -> Self {
        self.llm = Arc::new(llm);
        self
    }

    /// Replaces the image captioning mock.
    pub fn with_vision(mut self, vision: MockVision) -> Self {
        self.vision = Arc::new(vision);
        self
    }

    /// Replaces the speech-to-text mock.
    pub fn with_stt(mut self, stt: MockStt) -> Self {
        self.stt = Arc::new(stt);
        self
    }

    /// Replaces the text-to-speech mock.
    pub fn with_tts(mut self, tts: MockTts) -> Self {
        self.tts = Arc::new(tts);
        self
    }

    /// Builds a registry serving these mocks under their own providers.
    ///
    /// Every credentialed provider is configured so resolution never falls
    /// through to an unregistered adapter.
    pub fn registry(&self) -> AdapterRegistry {
        AdapterRegistry::builder(
            ProviderCredentials::new()
                .with_openai("test-key")
                .with_huggingface("test-token"),
        )
        .register_instance(AdapterHandle::Llm(self.llm.clone()))
        .register_instance(AdapterHandle::Vision(self.vision.clone()))
        .register_instance(AdapterHandle::Stt(self.stt.clone()))
        .register_instance(AdapterHandle::Tts(self.tts.clone()))
        .build()
    }
}
