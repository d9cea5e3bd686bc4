//! NoopExecutor - 何もしない Executor（開発用）
//!
//! フェーズ遷移だけを確認したいとき、または実行を外部から
//! `complete_job` / `fail_job` で報告する構成で使います。

use async_trait::async_trait;
use tracing::debug;

use crate::domain::JobRecord;
use crate::ports::Executor;

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopExecutor;

impl NoopExecutor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Executor for NoopExecutor {
    async fn start(&self, job: &JobRecord) {
        debug!(job_id = %job.job_id, "noop executor: start");
    }

    async fn cancel(&self, job: &JobRecord) {
        debug!(job_id = %job.job_id, "noop executor: cancel");
    }
}
