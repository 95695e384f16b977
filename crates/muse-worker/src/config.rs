//! Worker configuration.

use std::time::Duration;

#[cfg(feature = "config")]
use clap::Args;
use muse_core::job::JobKind;
use muse_nats::RetryPolicy;
use muse_nats::queue::ConsumerSettings;
use serde::{Deserialize, Serialize};

use crate::{Result, WorkerError};

/// Default maximum concurrent jobs per process.
pub const DEFAULT_MAX_CONCURRENT_JOBS: usize = 10;

/// Default number of executions before a job fails for good.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default base delay of the retry backoff, in seconds.
pub const DEFAULT_RETRY_DELAY_SECS: u64 = 60;

/// Slack added to the hard limit before the queue redelivers a held job.
const ACK_WAIT_MARGIN: Duration = Duration::from_secs(30);

/// Execution time limits of one job kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobLimits {
    /// Cooperative cancellation is signalled after this long.
    pub soft: Duration,
    /// The job is abandoned after this long.
    pub hard: Duration,
}

/// Worker pool behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct WorkerConfig {
    /// Maximum jobs executed simultaneously across all kinds.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "max-concurrent-jobs",
            env = "MAX_CONCURRENT_JOBS",
            default_value_t = DEFAULT_MAX_CONCURRENT_JOBS
        )
    )]
    #[serde(default = "default_max_concurrent_jobs")]
    pub max_concurrent_jobs: usize,

    /// Soft time limit of text generation jobs, in seconds.
    #[cfg_attr(
        feature = "config",
        arg(long = "llm-soft-limit", env = "LLM_SOFT_TIME_LIMIT", default_value_t = 60)
    )]
    #[serde(default = "default_llm_soft_limit")]
    pub llm_soft_limit: u64,

    /// Hard time limit of text generation jobs, in seconds.
    #[cfg_attr(
        feature = "config",
        arg(long = "llm-hard-limit", env = "LLM_HARD_TIME_LIMIT", default_value_t = 90)
    )]
    #[serde(default = "default_llm_hard_limit")]
    pub llm_hard_limit: u64,

    /// Soft time limit of multimodal pipeline jobs, in seconds.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "pipeline-soft-limit",
            env = "PIPELINE_SOFT_TIME_LIMIT",
            default_value_t = 120
        )
    )]
    #[serde(default = "default_pipeline_soft_limit")]
    pub pipeline_soft_limit: u64,

    /// Hard time limit of multimodal pipeline jobs, in seconds.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "pipeline-hard-limit",
            env = "PIPELINE_HARD_TIME_LIMIT",
            default_value_t = 180
        )
    )]
    #[serde(default = "default_pipeline_hard_limit")]
    pub pipeline_hard_limit: u64,

    /// Executions of a job before a transient failure becomes final.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "max-attempts",
            env = "JOB_MAX_ATTEMPTS",
            default_value_t = DEFAULT_MAX_ATTEMPTS
        )
    )]
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base delay of the exponential retry backoff, in seconds.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "retry-delay",
            env = "JOB_RETRY_DELAY",
            default_value_t = DEFAULT_RETRY_DELAY_SECS
        )
    )]
    #[serde(default = "default_retry_delay")]
    pub retry_delay: u64,
}

fn default_max_concurrent_jobs() -> usize {
    DEFAULT_MAX_CONCURRENT_JOBS
}

fn default_llm_soft_limit() -> u64 {
    60
}

fn default_llm_hard_limit() -> u64 {
    90
}

fn default_pipeline_soft_limit() -> u64 {
    120
}

fn default_pipeline_hard_limit() -> u64 {
    180
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_retry_delay() -> u64 {
    DEFAULT_RETRY_DELAY_SECS
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: default_max_concurrent_jobs(),
            llm_soft_limit: default_llm_soft_limit(),
            llm_hard_limit: default_llm_hard_limit(),
            pipeline_soft_limit: default_pipeline_soft_limit(),
            pipeline_hard_limit: default_pipeline_hard_limit(),
            max_attempts: default_max_attempts(),
            retry_delay: default_retry_delay(),
        }
    }
}

impl WorkerConfig {
    /// Sets the concurrency limit.
    pub fn with_max_concurrent_jobs(mut self, max_concurrent_jobs: usize) -> Self {
        self.max_concurrent_jobs = max_concurrent_jobs;
        self
    }

    /// Sets the retry ceiling and the base backoff delay in seconds.
    pub fn with_retries(mut self, max_attempts: u32, retry_delay: u64) -> Self {
        self.max_attempts = max_attempts;
        self.retry_delay = retry_delay;
        self
    }

    /// Time limits of a job kind.
    pub fn limits(&self, kind: JobKind) -> JobLimits {
        let (soft, hard) = match kind {
            JobKind::LlmGenerate => (self.llm_soft_limit, self.llm_hard_limit),
            JobKind::MultimodalPipeline => (self.pipeline_soft_limit, self.pipeline_hard_limit),
        };
        JobLimits {
            soft: Duration::from_secs(soft),
            hard: Duration::from_secs(hard),
        }
    }

    /// Backoff applied between executions of a failing job.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::jobs(self.max_attempts, Duration::from_secs(self.retry_delay))
    }

    /// Queue delivery settings for a job kind.
    ///
    /// A held job is only redelivered once its hard limit has certainly
    /// passed, and the queue stops delivering at the retry ceiling.
    pub fn consumer_settings(&self, kind: JobKind) -> ConsumerSettings {
        ConsumerSettings {
            ack_wait: self.limits(kind).hard + ACK_WAIT_MARGIN,
            max_deliver: self.max_attempts,
            ..ConsumerSettings::default()
        }
    }

    /// Checks limits and retry settings for consistency.
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_jobs == 0 {
            return Err(WorkerError::invalid_config(
                "max concurrent jobs must be at least 1",
            ));
        }
        if self.max_attempts == 0 {
            return Err(WorkerError::invalid_config("max attempts must be at least 1"));
        }
        for kind in JobKind::ALL {
            let limits = self.limits(kind);
            if limits.soft.is_zero() || limits.hard.is_zero() {
                return Err(WorkerError::invalid_config(format!(
                    "time limits of {kind} jobs must be non-zero"
                )));
            }
            if limits.soft > limits.hard {
                return Err(WorkerError::invalid_config(format!(
                    "soft time limit of {kind} jobs exceeds its hard limit"
                )));
            }
        }
        Ok(())
    }
}
