//! Consumer loops and job settlement.

use std::sync::Arc;
use std::time::Duration;

use muse_core::Error;
use muse_core::job::{JobDelivery, JobKind, JobOutput, JobPayload, JobSource};
use muse_nats::{NatsClient, NatsJobBackend, RetryPolicy};
use muse_service::TaskOrchestrator;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::config::JobLimits;
use crate::{JobExecutor, Result, TRACING_TARGET_POOL, WorkerConfig, WorkerError};

/// Pause after a failed pull before asking the queue again.
const PULL_ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// Attaches a consumer for every job kind to a NATS job backend.
///
/// Consumer settings are derived from the worker configuration so the queue
/// never redelivers a job that is still within its hard limit.
pub async fn attach_consumers(
    backend: NatsJobBackend,
    client: &NatsClient,
    config: &WorkerConfig,
) -> Result<NatsJobBackend> {
    let mut backend = backend;
    for kind in JobKind::ALL {
        backend = backend
            .with_consumer(client, kind, config.consumer_settings(kind))
            .await
            .map_err(WorkerError::Subscription)?;
    }
    Ok(backend)
}

/// Background pool executing queued jobs.
///
/// Runs one consumer loop per job kind. All loops share a semaphore, so at
/// most `max_concurrent_jobs` jobs execute at once and no job is pulled
/// before a slot is free for it.
#[derive(Clone)]
pub struct WorkerPool {
    inner: Arc<PoolInner>,
}

struct PoolInner {
    source: Arc<dyn JobSource>,
    orchestrator: TaskOrchestrator,
    executor: JobExecutor,
    config: WorkerConfig,
    retry: RetryPolicy,
    semaphore: Arc<Semaphore>,
    tracker: TaskTracker,
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("config", &self.inner.config)
            .field("in_flight", &self.inner.tracker.len())
            .finish_non_exhaustive()
    }
}

impl WorkerPool {
    /// Creates a pool pulling from `source` and recording through `orchestrator`.
    pub fn new(
        source: Arc<dyn JobSource>,
        orchestrator: TaskOrchestrator,
        executor: JobExecutor,
        config: WorkerConfig,
    ) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.max_concurrent_jobs.max(1)));
        Self {
            inner: Arc::new(PoolInner {
                source,
                orchestrator,
                executor,
                retry: config.retry_policy(),
                config,
                semaphore,
                tracker: TaskTracker::new(),
            }),
        }
    }

    /// Spawns the pool as a background task.
    ///
    /// The task ends once `cancel` fires and every in-flight job settled.
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<Result<()>> {
        tokio::spawn(async move { self.run(cancel).await })
    }

    /// Runs the consumer loops until `cancel` fires.
    ///
    /// Cancellation stops pulling immediately; jobs already executing run
    /// to completion (or to their hard limit) before this returns.
    #[tracing::instrument(skip_all, target = TRACING_TARGET_POOL, name = "worker_pool")]
    pub async fn run(self, cancel: CancellationToken) -> Result<()> {
        tracing::info!(
            target: TRACING_TARGET_POOL,
            max_concurrent_jobs = self.inner.config.max_concurrent_jobs,
            max_attempts = self.inner.config.max_attempts,
            "Starting worker pool"
        );

        let loops: Vec<_> = JobKind::ALL
            .into_iter()
            .map(|kind| tokio::spawn(self.inner.clone().consume(kind, cancel.clone())))
            .collect();

        let mut outcome = Ok(());
        for handle in loops {
            if let Err(err) = handle.await {
                tracing::error!(target: TRACING_TARGET_POOL, error = %err, "Consumer loop aborted");
                if outcome.is_ok() {
                    outcome = Err(WorkerError::processing_with_source(
                        "consumer loop aborted",
                        err,
                    ));
                }
            }
        }

        self.inner.tracker.close();
        if !self.inner.tracker.is_empty() {
            tracing::info!(
                target: TRACING_TARGET_POOL,
                in_flight = self.inner.tracker.len(),
                "Waiting for in-flight jobs"
            );
        }
        self.inner.tracker.wait().await;

        tracing::info!(target: TRACING_TARGET_POOL, "Worker pool stopped");
        outcome
    }
}

impl PoolInner {
    #[tracing::instrument(skip(self, cancel), target = TRACING_TARGET_POOL, name = "consumer")]
    async fn consume(self: Arc<Self>, kind: JobKind, cancel: CancellationToken) {
        tracing::debug!(target: TRACING_TARGET_POOL, kind = %kind, "Consumer loop started");

        loop {
            let permit = tokio::select! {
                biased;

                () = cancel.cancelled() => break,

                permit = self.semaphore.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => {
                        tracing::error!(
                            target: TRACING_TARGET_POOL,
                            "Semaphore closed, stopping consumer"
                        );
                        break;
                    }
                },
            };

            let next = tokio::select! {
                biased;

                () = cancel.cancelled() => break,

                next = self.source.next(kind) => next,
            };

            let delivery = match next {
                Ok(Some(delivery)) => delivery,
                Ok(None) => {
                    tracing::trace!(target: TRACING_TARGET_POOL, "No jobs available");
                    continue;
                }
                Err(err) => {
                    tracing::error!(
                        target: TRACING_TARGET_POOL,
                        error = %err,
                        "Failed to pull job"
                    );
                    drop(permit);
                    tokio::select! {
                        biased;

                        () = cancel.cancelled() => break,

                        () = tokio::time::sleep(PULL_ERROR_BACKOFF) => continue,
                    }
                }
            };

            let pool = self.clone();
            self.tracker.spawn(async move {
                // Hold permit until the job settles
                let _permit = permit;
                pool.process(delivery).await;
            });
        }

        tracing::info!(
            target: TRACING_TARGET_POOL,
            kind = %kind,
            "Shutdown requested, consumer stopped pulling"
        );
    }

    #[tracing::instrument(
        skip_all,
        fields(job_id = %delivery.envelope.id, attempt = delivery.attempt),
        target = TRACING_TARGET_POOL
    )]
    async fn process(&self, delivery: JobDelivery) {
        let kind = delivery.envelope.kind();
        let limits = self.config.limits(kind);
        tracing::info!(
            target: TRACING_TARGET_POOL,
            kind = %kind,
            soft_limit_secs = limits.soft.as_secs(),
            hard_limit_secs = limits.hard.as_secs(),
            "Processing job"
        );

        let started_at = Instant::now();
        let outcome = self.execute(&delivery.envelope.payload, limits).await;
        let elapsed_ms = started_at.elapsed().as_millis() as u64;

        match &outcome {
            Ok(_) => tracing::info!(target: TRACING_TARGET_POOL, elapsed_ms, "Job succeeded"),
            Err(error) => tracing::warn!(
                target: TRACING_TARGET_POOL,
                elapsed_ms,
                error = %error,
                retryable = error.is_retryable(),
                "Job attempt failed"
            ),
        }

        self.settle(&delivery, outcome).await;
    }

    /// Executes a payload under its soft and hard limits.
    async fn execute(&self, payload: &JobPayload, limits: JobLimits) -> muse_core::Result<JobOutput> {
        let soft = CancellationToken::new();
        let timer = tokio::spawn({
            let soft = soft.clone();
            async move {
                tokio::time::sleep(limits.soft).await;
                soft.cancel();
            }
        });

        let outcome = tokio::time::timeout(limits.hard, self.executor.execute(payload, &soft))
            .await
            .unwrap_or_else(|_| Err(Error::timeout().with_message("hard time limit exceeded")));

        timer.abort();
        outcome
    }

    /// Hands a transient failure back to the queue, or records the final
    /// outcome and removes the job from the queue.
    async fn settle(&self, delivery: &JobDelivery, outcome: muse_core::Result<JobOutput>) {
        let id = &delivery.envelope.id;
        let attempt = delivery.attempt;

        if let Err(error) = &outcome
            && error.is_retryable()
            && self.retry.can_retry(attempt)
        {
            self.requeue(delivery).await;
            return;
        }

        match self.orchestrator.complete(id, outcome).await {
            Ok(()) => {
                if let Err(err) = delivery.ack().await {
                    tracing::error!(
                        target: TRACING_TARGET_POOL,
                        error = %err,
                        "Failed to acknowledge job"
                    );
                }
            }
            Err(err) if self.retry.can_retry(attempt) => {
                tracing::error!(
                    target: TRACING_TARGET_POOL,
                    error = %err,
                    "Failed to record job outcome, job will run again"
                );
                self.requeue(delivery).await;
            }
            Err(err) => {
                tracing::error!(
                    target: TRACING_TARGET_POOL,
                    error = %err,
                    "Failed to record job outcome after the last attempt, job stays pending"
                );
                if let Err(err) = delivery.ack().await {
                    tracing::error!(
                        target: TRACING_TARGET_POOL,
                        error = %err,
                        "Failed to acknowledge job"
                    );
                }
            }
        }
    }

    async fn requeue(&self, delivery: &JobDelivery) {
        let delay = self.retry.backoff(delivery.attempt);
        tracing::warn!(
            target: TRACING_TARGET_POOL,
            delay_secs = delay.as_secs(),
            next_attempt = delivery.attempt + 1,
            "Scheduling job retry"
        );
        if let Err(err) = delivery.retry(delay).await {
            tracing::error!(
                target: TRACING_TARGET_POOL,
                error = %err,
                "Failed to requeue job"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use muse_core::adapter::{AdapterHandle, LlmAdapter, VisionAdapter};
    use muse_core::cache::{CacheStore, MemoryCacheStore, result_key};
    use muse_core::job::{JobId, JobStatus};
    use muse_core::mock::{MockAdapters, MockLlm};
    use muse_core::registry::{AdapterRegistry, ProviderCredentials};
    use muse_core::Provider;
    use muse_service::orchestrator::{InMemoryJobBackend, JobStatusReport};
    use muse_service::{
        CacheTtls, LlmService, MultimodalPipeline, RecommendationService, ResultCache,
        TextPipeline, TtsService, VisionService,
    };

    use super::*;

    /// Adapter answering after a fixed delay.
    #[derive(Debug)]
    struct Slow {
        delay: Duration,
        reply: &'static str,
    }

    #[async_trait::async_trait]
    impl LlmAdapter for Slow {
        fn provider(&self) -> Provider {
            Provider::OpenAi
        }

        async fn generate(&self, _prompt: &str) -> muse_core::Result<String> {
            tokio::time::sleep(self.delay).await;
            Ok(self.reply.to_owned())
        }
    }

    #[async_trait::async_trait]
    impl VisionAdapter for Slow {
        fn provider(&self) -> Provider {
            Provider::OpenAi
        }

        async fn describe(&self, _image: &[u8]) -> muse_core::Result<String> {
            tokio::time::sleep(self.delay).await;
            Ok(self.reply.to_owned())
        }
    }

    struct Harness {
        backend: Arc<InMemoryJobBackend>,
        store: Arc<MemoryCacheStore>,
        orchestrator: TaskOrchestrator,
        pool: WorkerPool,
    }

    fn harness(registry: AdapterRegistry, config: WorkerConfig) -> Harness {
        let backend = Arc::new(InMemoryJobBackend::new());
        let store = Arc::new(MemoryCacheStore::new());
        let cache = ResultCache::new(store.clone());
        let orchestrator =
            TaskOrchestrator::new(backend.clone(), cache.clone(), CacheTtls::default());

        let llm = LlmService::new(registry.clone(), None);
        let pipeline = MultimodalPipeline::new(
            VisionService::new(registry.clone(), None, cache, CacheTtls::default()),
            TextPipeline::new(llm.clone(), RecommendationService::new()),
            TtsService::new(registry, None),
        );
        let pool = WorkerPool::new(
            backend.clone(),
            orchestrator.clone(),
            JobExecutor::new(llm, pipeline),
            config,
        );

        Harness {
            backend,
            store,
            orchestrator,
            pool,
        }
    }

    fn slow_registry(llm_delay: Duration, vision_delay: Duration) -> AdapterRegistry {
        let mocks = MockAdapters::default();
        AdapterRegistry::builder(ProviderCredentials::new().with_openai("test-key"))
            .register_instance(AdapterHandle::Llm(Arc::new(Slow {
                delay: llm_delay,
                reply: "slow words",
            })))
            .register_instance(AdapterHandle::Vision(Arc::new(Slow {
                delay: vision_delay,
                reply: "a slow cat",
            })))
            .register_instance(AdapterHandle::Stt(mocks.stt.clone()))
            .register_instance(AdapterHandle::Tts(mocks.tts.clone()))
            .build()
    }

    async fn wait_terminal(orchestrator: &TaskOrchestrator, id: &JobId) -> JobStatusReport {
        for _ in 0..1000 {
            let report = orchestrator.status(id).await.unwrap();
            if report.status != JobStatus::Pending {
                return report;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job {id} never finished");
    }

    fn prompt(text: &str) -> JobPayload {
        JobPayload::LlmGenerate {
            prompt: text.to_owned(),
        }
    }

    #[tokio::test]
    async fn completes_text_job_and_caches_result() {
        let mocks = MockAdapters::default();
        let h = harness(mocks.registry(), WorkerConfig::default());
        let cancel = CancellationToken::new();
        let handle = h.pool.clone().spawn(cancel.clone());

        let id = h.orchestrator.submit(prompt("hello")).await.unwrap();
        let report = wait_terminal(&h.orchestrator, &id).await;

        assert_eq!(report.status, JobStatus::Success);
        assert_eq!(report.result, Some(JobOutput::Text("mock response".into())));
        assert_eq!(
            h.store.get(&result_key(&id)).await.unwrap().as_deref(),
            Some("mock response")
        );
        assert!(h.backend.retry_delays().await.is_empty());

        cancel.cancel();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn completes_multimodal_job() {
        let mocks = MockAdapters::default();
        let h = harness(mocks.registry(), WorkerConfig::default());
        let cancel = CancellationToken::new();
        let handle = h.pool.clone().spawn(cancel.clone());

        let id = h
            .orchestrator
            .submit(JobPayload::MultimodalPipeline {
                image_base64: STANDARD.encode(b"image bytes"),
            })
            .await
            .unwrap();
        let report = wait_terminal(&h.orchestrator, &id).await;

        assert_eq!(report.status, JobStatus::Success);
        let Some(JobOutput::Structured(value)) = report.result else {
            panic!("expected a structured result");
        };
        assert_eq!(value["source_description"], "a cat on a sofa");
        assert_eq!(value["audio_base64"], STANDARD.encode(b"ID3mock"));

        cancel.cancel();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn retries_with_backoff_then_fails() {
        let mocks = MockAdapters::default().with_llm(MockLlm::failing(Provider::OpenAi));
        let h = harness(mocks.registry(), WorkerConfig::default());
        let cancel = CancellationToken::new();
        let handle = h.pool.clone().spawn(cancel.clone());

        let id = h.orchestrator.submit(prompt("hello")).await.unwrap();
        let report = wait_terminal(&h.orchestrator, &id).await;

        assert_eq!(report.status, JobStatus::Failure);
        assert_eq!(report.error.as_deref(), Some("generation produced no text"));
        assert_eq!(mocks.llm.calls(), 3);
        assert_eq!(
            h.backend.retry_delays().await,
            vec![Duration::from_secs(60), Duration::from_secs(120)]
        );
        assert!(h.store.get(&result_key(&id)).await.unwrap().is_none());

        cancel.cancel();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn invalid_input_fails_without_retry() {
        let mocks = MockAdapters::default();
        let h = harness(mocks.registry(), WorkerConfig::default());
        let cancel = CancellationToken::new();
        let handle = h.pool.clone().spawn(cancel.clone());

        let id = h
            .orchestrator
            .submit(JobPayload::MultimodalPipeline {
                image_base64: "%%% not base64 %%%".into(),
            })
            .await
            .unwrap();
        let report = wait_terminal(&h.orchestrator, &id).await;

        assert_eq!(report.status, JobStatus::Failure);
        assert_eq!(report.error.as_deref(), Some("image is not valid base64"));
        assert!(h.backend.retry_delays().await.is_empty());
        assert_eq!(mocks.vision.calls(), 0);

        cancel.cancel();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn hard_limit_abandons_job() {
        let registry = slow_registry(Duration::from_secs(3600), Duration::ZERO);
        let config = WorkerConfig {
            llm_soft_limit: 1,
            llm_hard_limit: 2,
            ..WorkerConfig::default()
        }
        .with_retries(1, 60);
        let h = harness(registry, config);
        let cancel = CancellationToken::new();
        let handle = h.pool.clone().spawn(cancel.clone());

        let id = h.orchestrator.submit(prompt("take your time")).await.unwrap();
        let report = wait_terminal(&h.orchestrator, &id).await;

        assert_eq!(report.status, JobStatus::Failure);
        assert_eq!(report.error.as_deref(), Some("hard time limit exceeded"));

        cancel.cancel();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn soft_limit_stops_pipeline_between_stages() {
        let registry = slow_registry(Duration::ZERO, Duration::from_secs(5));
        let config = WorkerConfig {
            pipeline_soft_limit: 2,
            pipeline_hard_limit: 60,
            ..WorkerConfig::default()
        }
        .with_retries(1, 60);
        let h = harness(registry, config);
        let cancel = CancellationToken::new();
        let handle = h.pool.clone().spawn(cancel.clone());

        let id = h
            .orchestrator
            .submit(JobPayload::MultimodalPipeline {
                image_base64: STANDARD.encode(b"image bytes"),
            })
            .await
            .unwrap();
        let report = wait_terminal(&h.orchestrator, &id).await;

        assert_eq!(report.status, JobStatus::Failure);
        assert_eq!(report.error.as_deref(), Some("soft time limit exceeded"));

        cancel.cancel();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_lets_in_flight_jobs_finish() {
        let registry = slow_registry(Duration::from_secs(5), Duration::ZERO);
        let h = harness(registry, WorkerConfig::default());
        let cancel = CancellationToken::new();
        let handle = h.pool.clone().spawn(cancel.clone());

        let id = h.orchestrator.submit(prompt("hello")).await.unwrap();
        while h.backend.queued().await > 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        cancel.cancel();
        handle.await.unwrap().unwrap();

        let report = h.orchestrator.status(&id).await.unwrap();
        assert_eq!(report.status, JobStatus::Success);
        assert_eq!(report.result, Some(JobOutput::Text("slow words".into())));
    }

    #[tokio::test]
    async fn stops_without_jobs() {
        let mocks = MockAdapters::default();
        let h = harness(mocks.registry(), WorkerConfig::default());
        let cancel = CancellationToken::new();
        cancel.cancel();
        h.pool.run(cancel).await.unwrap();
        assert_eq!(mocks.llm.calls(), 0);
    }
}
