//! Cache lifetimes per result category.

use std::time::Duration;

#[cfg(feature = "config")]
use clap::Args;
use muse_core::job::JobOutput;
use serde::{Deserialize, Serialize};

/// Default lifetime of plain text job results (10 minutes).
pub const DEFAULT_TEXT_RESULT_TTL_SECS: u64 = 600;

/// Default lifetime of structured job results (20 minutes).
pub const DEFAULT_STRUCTURED_RESULT_TTL_SECS: u64 = 1200;

/// Default lifetime of vision captions (24 hours).
pub const DEFAULT_VISION_CACHE_TTL_SECS: u64 = 86_400;

/// Cache lifetimes per result category.
///
/// Structured results outlive plain text ones because regenerating a
/// multi-stage pipeline costs more than a single generation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct CacheTtls {
    /// Lifetime of plain text job results, in seconds.
    #[cfg_attr(
        feature = "config",
        arg(long = "text-result-ttl", env = "TEXT_RESULT_TTL", default_value_t = DEFAULT_TEXT_RESULT_TTL_SECS)
    )]
    pub text_result_secs: u64,

    /// Lifetime of structured job results, in seconds.
    #[cfg_attr(
        feature = "config",
        arg(long = "structured-result-ttl", env = "STRUCTURED_RESULT_TTL", default_value_t = DEFAULT_STRUCTURED_RESULT_TTL_SECS)
    )]
    pub structured_result_secs: u64,

    /// Lifetime of content-addressed vision captions, in seconds.
    #[cfg_attr(
        feature = "config",
        arg(long = "vision-cache-ttl", env = "VISION_CACHE_TTL", default_value_t = DEFAULT_VISION_CACHE_TTL_SECS)
    )]
    pub vision_secs: u64,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            text_result_secs: DEFAULT_TEXT_RESULT_TTL_SECS,
            structured_result_secs: DEFAULT_STRUCTURED_RESULT_TTL_SECS,
            vision_secs: DEFAULT_VISION_CACHE_TTL_SECS,
        }
    }
}

impl CacheTtls {
    /// Lifetime for a job result of the given shape.
    pub fn for_result(&self, output: &JobOutput) -> Duration {
        match output {
            JobOutput::Text(_) => Duration::from_secs(self.text_result_secs),
            JobOutput::Structured(_) => Duration::from_secs(self.structured_result_secs),
        }
    }

    /// Lifetime of vision captions.
    pub fn vision(&self) -> Duration {
        Duration::from_secs(self.vision_secs)
    }

    /// Longest configured lifetime, used to bound backing stores.
    pub fn longest(&self) -> Duration {
        Duration::from_secs(
            self.text_result_secs
                .max(self.structured_result_secs)
                .max(self.vision_secs),
        )
    }
}
