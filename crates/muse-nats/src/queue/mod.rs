//! Work queues for background jobs.
//!
//! Every job kind has its own work-queue stream (`JOBS_<KIND>`, subjects
//! `jobs.<kind>.>`) and one shared durable pull consumer, so each job is
//! delivered to exactly one worker at a time.

mod consumer;
mod publisher;
mod stream;

pub use consumer::{ConsumerSettings, JobConsumer};
pub use publisher::JobPublisher;
pub use stream::{consumer_name, job_subject, stream_name};
