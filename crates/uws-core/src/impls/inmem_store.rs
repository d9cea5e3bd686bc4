//! InMemoryJobStore - プロセス内メモリのジョブストア
//!
//! # 実装詳細
//! - HashMap<JobId, JobRecord> を tokio の Mutex で保護（1 操作の間だけロック）
//! - 期限切れは読み取りのたびに判定して削除（バックグラウンドの sweep はしない）
//! - 変更は broadcast で job_id を流す（ロック解放後に送信）

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, broadcast};
use tracing::debug;

use crate::domain::{ExpiryPolicy, JobId, JobRecord, Parameter, UwsError};
use crate::ports::{Clock, IdGenerator, JobStore, SystemClock, UlidGenerator};

/// Capacity of the change channel. Lagging subscribers just re-check the store.
const CHANGE_CHANNEL_CAPACITY: usize = 256;

/// In-memory job store.
pub struct InMemoryJobStore {
    jobs: Arc<Mutex<HashMap<JobId, JobRecord>>>,
    changes: broadcast::Sender<JobId>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    policy: ExpiryPolicy,
}

impl InMemoryJobStore {
    pub fn new(policy: ExpiryPolicy) -> Self {
        Self::with_clock(policy, Arc::new(SystemClock))
    }

    /// Store whose timestamps (and id timestamps) come from `clock`.
    pub fn with_clock(policy: ExpiryPolicy, clock: Arc<dyn Clock>) -> Self {
        let ids = Arc::new(UlidGenerator::new(Arc::clone(&clock)));
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            jobs: Arc::new(Mutex::new(HashMap::new())),
            changes,
            clock,
            ids,
            policy,
        }
    }

    pub fn policy(&self) -> ExpiryPolicy {
        self.policy
    }

    fn publish(&self, job_id: JobId) {
        // no subscribers is fine
        let _ = self.changes.send(job_id);
    }

    fn publish_all(&self, job_ids: impl IntoIterator<Item = JobId>) {
        for job_id in job_ids {
            self.publish(job_id);
        }
    }
}

impl Default for InMemoryJobStore {
    fn default() -> Self {
        Self::new(ExpiryPolicy::default_v1())
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn get(&self, job_id: JobId) -> Result<JobRecord, UwsError> {
        let now = self.clock.now();
        {
            let mut jobs = self.jobs.lock().await;
            match jobs.get(&job_id) {
                None => return Err(UwsError::NotFound(job_id)),
                Some(record) if !record.is_expired(now) => return Ok(record.clone()),
                Some(_) => {}
            }
            jobs.remove(&job_id);
        }

        debug!(%job_id, "evicted expired job on read");
        self.publish(job_id);
        Err(UwsError::NotFound(job_id))
    }

    async fn list(&self) -> Result<Vec<JobRecord>, UwsError> {
        let now = self.clock.now();
        let (live, expired) = {
            let mut jobs = self.jobs.lock().await;
            let expired: Vec<JobId> = jobs
                .values()
                .filter(|record| record.is_expired(now))
                .map(|record| record.job_id)
                .collect();
            for job_id in &expired {
                jobs.remove(job_id);
            }
            let live: Vec<JobRecord> = jobs.values().cloned().collect();
            (live, expired)
        };

        if !expired.is_empty() {
            debug!(count = expired.len(), "evicted expired jobs during listing");
            self.publish_all(expired);
        }
        Ok(live)
    }

    async fn create(
        &self,
        parameters: Vec<Parameter>,
        owner_id: Option<String>,
        run_id: Option<String>,
    ) -> Result<JobId, UwsError> {
        let now = self.clock.now();
        let job_id = {
            let mut jobs = self.jobs.lock().await;
            // ULID の衝突はまず起きないが、ID の再利用だけは絶対に避ける
            let mut job_id = self.ids.generate_job_id();
            while jobs.contains_key(&job_id) {
                job_id = self.ids.generate_job_id();
            }
            let record = JobRecord::new(
                job_id,
                parameters,
                owner_id,
                run_id,
                now,
                self.policy.initial_destruction(now),
            );
            jobs.insert(job_id, record);
            job_id
        };

        self.publish(job_id);
        Ok(job_id)
    }

    async fn save(&self, mut record: JobRecord) -> Result<JobRecord, UwsError> {
        let now = self.clock.now();
        let job_id = record.job_id;
        {
            let mut jobs = self.jobs.lock().await;
            let stored = match jobs.get(&job_id) {
                Some(stored) if !stored.is_expired(now) => stored,
                _ => return Err(UwsError::NotFound(job_id)),
            };
            if let Some(field) = changed_identity(stored, &record) {
                return Err(UwsError::Validation(format!(
                    "{field} of job {job_id} cannot be changed"
                )));
            }
            record.destruction_time = self
                .policy
                .clamp(record.creation_time, record.destruction_time);
            jobs.insert(job_id, record.clone());
        }

        self.publish(job_id);
        Ok(record)
    }

    async fn delete(&self, job_id: JobId) -> Result<(), UwsError> {
        let removed = {
            let mut jobs = self.jobs.lock().await;
            jobs.remove(&job_id).is_some()
        };

        if removed {
            self.publish(job_id);
        }
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<JobId> {
        self.changes.subscribe()
    }
}

/// First identity field that differs between the stored record and its replacement.
fn changed_identity(stored: &JobRecord, record: &JobRecord) -> Option<&'static str> {
    if stored.creation_time != record.creation_time {
        Some("creationTime")
    } else if stored.owner_id != record.owner_id {
        Some("ownerId")
    } else if stored.run_id != record.run_id {
        Some("runId")
    } else {
        None
    }
}
