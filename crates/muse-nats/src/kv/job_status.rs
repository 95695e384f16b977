//! Authoritative job records on a NATS KV bucket.

use async_nats::jetstream::{self, kv};
use bytes::Bytes;
use muse_core::job::{JobId, JobRecord, JobState};

use super::bucket::{self, JobStatusBucket, KvBucket};
use crate::{Error, Result, TRACING_TARGET_KV};

/// Compare-and-swap rounds before a contended finish gives up.
const CAS_ATTEMPTS: usize = 3;

/// Job records keyed by job id.
///
/// Records are created `PENDING` and moved to a terminal state with a
/// revision-checked update, so concurrent completions of the same job
/// (for example after a redelivery) cannot overwrite each other.
#[derive(Clone)]
pub struct JobStatusStore {
    store: kv::Store,
}

impl std::fmt::Debug for JobStatusStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobStatusStore")
            .field("bucket", &JobStatusBucket::NAME)
            .finish()
    }
}

impl JobStatusStore {
    #[tracing::instrument(skip(jetstream), target = TRACING_TARGET_KV)]
    pub(crate) async fn new(jetstream: &jetstream::Context) -> Result<Self> {
        let max_age = JobStatusBucket::TTL.unwrap_or_default();
        let store = bucket::open::<JobStatusBucket>(jetstream, max_age).await?;
        Ok(Self { store })
    }

    /// Writes a fresh record.
    #[tracing::instrument(skip_all, fields(job_id = %record.id), target = TRACING_TARGET_KV)]
    pub async fn insert(&self, record: &JobRecord) -> Result<()> {
        let payload = Bytes::from(serde_json::to_vec(record)?);
        let revision = self
            .store
            .put(record.id.as_str(), payload)
            .await
            .map_err(|e| Error::operation("kv_put", e.to_string()))?;

        tracing::debug!(
            target: TRACING_TARGET_KV,
            job_id = %record.id,
            kind = %record.kind,
            revision,
            "Recorded pending job"
        );
        Ok(())
    }

    /// Reads a record with its revision.
    async fn entry(&self, id: &JobId) -> Result<Option<(JobRecord, u64)>> {
        let entry = self
            .store
            .entry(id.as_str())
            .await
            .map_err(|e| Error::operation("kv_entry", e.to_string()))?;

        match entry {
            Some(entry) if matches!(entry.operation, kv::Operation::Put) => {
                let record = serde_json::from_slice(&entry.value)?;
                Ok(Some((record, entry.revision)))
            }
            _ => Ok(None),
        }
    }

    /// Reads a record.
    pub async fn get(&self, id: &JobId) -> Result<Option<JobRecord>> {
        Ok(self.entry(id).await?.map(|(record, _)| record))
    }

    /// Moves a record to a terminal state.
    ///
    /// Returns `false` when the record was already terminal; the stored
    /// state is then left untouched.
    #[tracing::instrument(skip(self, state), target = TRACING_TARGET_KV)]
    pub async fn finish(&self, id: &JobId, state: JobState) -> Result<bool> {
        let mut last_revision = 0;
        for _ in 0..CAS_ATTEMPTS {
            let Some((mut record, revision)) = self.entry(id).await? else {
                return Err(Error::kv_key_not_found(JobStatusBucket::NAME, id.as_str()));
            };

            if !record.finish(state.clone()) {
                tracing::debug!(
                    target: TRACING_TARGET_KV,
                    job_id = %id,
                    "Job already terminal, ignoring completion"
                );
                return Ok(false);
            }

            last_revision = revision;
            let payload = Bytes::from(serde_json::to_vec(&record)?);
            match self.store.update(id.as_str(), payload, revision).await {
                Ok(revision) => {
                    tracing::debug!(
                        target: TRACING_TARGET_KV,
                        job_id = %id,
                        status = %record.state.status(),
                        revision,
                        "Recorded terminal job state"
                    );
                    return Ok(true);
                }
                Err(err) => {
                    tracing::debug!(
                        target: TRACING_TARGET_KV,
                        job_id = %id,
                        revision,
                        error = %err,
                        "Job record update lost a race, re-reading"
                    );
                }
            }
        }

        Err(Error::KvRevisionMismatch {
            key: id.to_string(),
            expected: last_revision,
        })
    }
}
