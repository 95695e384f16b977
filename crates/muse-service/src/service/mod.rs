//! Capability services.
//!
//! Each service resolves its adapter through the [`AdapterRegistry`] on
//! first use (honouring an optional provider override) and forwards calls
//! to it. Adapter failures are caught here, logged, and turned into `None`;
//! only unresolvable configuration escapes as an error.

mod llm;
mod stt;
mod tts;
mod vision;

use std::sync::Arc;

use jiff::Timestamp;
pub use llm::LlmService;
use muse_core::registry::AdapterRegistry;
use muse_core::{Capability, Provider, Result};
pub use stt::SttService;
use tokio::sync::OnceCell;
pub use tts::TtsService;
pub use vision::VisionService;

use crate::TRACING_TARGET_SERVICE;

type Resolve<A> = fn(&AdapterRegistry, Option<Provider>) -> Result<Arc<A>>;

/// Adapter resolved lazily and memoized after the first success.
struct LazyAdapter<A: ?Sized> {
    registry: AdapterRegistry,
    provider: Option<Provider>,
    resolve: Resolve<A>,
    cell: OnceCell<Arc<A>>,
}

impl<A: ?Sized> LazyAdapter<A> {
    fn new(registry: AdapterRegistry, provider: Option<Provider>, resolve: Resolve<A>) -> Self {
        Self {
            registry,
            provider,
            resolve,
            cell: OnceCell::new(),
        }
    }

    async fn get(&self) -> Result<Arc<A>> {
        self.cell
            .get_or_try_init(|| async { (self.resolve)(&self.registry, self.provider) })
            .await
            .cloned()
    }
}

/// Settles an adapter call into an optional value, logging the outcome.
fn settle<T>(
    capability: Capability,
    provider: Provider,
    started_at: Timestamp,
    result: Result<T>,
    is_empty: impl FnOnce(&T) -> bool,
) -> Option<T> {
    let elapsed = Timestamp::now().duration_since(started_at);

    match result {
        Ok(value) if !is_empty(&value) => {
            tracing::debug!(
                target: TRACING_TARGET_SERVICE,
                capability = %capability,
                provider = %provider,
                elapsed_ms = elapsed.as_millis(),
                "Capability call succeeded"
            );
            Some(value)
        }
        Ok(_) => {
            tracing::warn!(
                target: TRACING_TARGET_SERVICE,
                capability = %capability,
                provider = %provider,
                elapsed_ms = elapsed.as_millis(),
                "Capability call returned empty output"
            );
            None
        }
        Err(error) => {
            tracing::error!(
                target: TRACING_TARGET_SERVICE,
                capability = %capability,
                provider = %provider,
                error = %error,
                elapsed_ms = elapsed.as_millis(),
                "Capability call failed"
            );
            None
        }
    }
}
