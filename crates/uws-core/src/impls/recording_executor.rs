//! RecordingExecutor - 呼び出しを記録するだけの Executor（テスト用）

use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::JobId;
use crate::domain::JobRecord;
use crate::ports::Executor;

/// Executor that records every `start` / `cancel` call.
#[derive(Debug, Default)]
pub struct RecordingExecutor {
    started: Mutex<Vec<JobId>>,
    cancelled: Mutex<Vec<JobId>>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn started(&self) -> Vec<JobId> {
        self.started.lock().map(|v| v.clone()).unwrap_or_default()
    }

    pub fn cancelled(&self) -> Vec<JobId> {
        self.cancelled.lock().map(|v| v.clone()).unwrap_or_default()
    }

    pub fn start_count(&self, job_id: JobId) -> usize {
        self.started().iter().filter(|id| **id == job_id).count()
    }

    pub fn cancel_count(&self, job_id: JobId) -> usize {
        self.cancelled().iter().filter(|id| **id == job_id).count()
    }
}

#[async_trait]
impl Executor for RecordingExecutor {
    async fn start(&self, job: &JobRecord) {
        if let Ok(mut started) = self.started.lock() {
            started.push(job.job_id);
        }
    }

    async fn cancel(&self, job: &JobRecord) {
        if let Ok(mut cancelled) = self.cancelled.lock() {
            cancelled.push(job.job_id);
        }
    }
}
