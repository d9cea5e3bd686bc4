//! UwsService - ジョブのライフサイクルエンジン
//!
//! transport 層（HTTP など）から呼ばれる入口をすべてここに集めます。
//!
//! # 設計原則
//! - ストアと Executor は構築時に注入する（グローバルな singleton は持たない）
//! - 読み取り→検証→保存はエンジン内のロックで直列化する
//! - Executor の start / cancel はフェーズを保存したのと同じロック区間で呼ぶ
//!   （1 つのジョブに対する呼び出し順が保存順と一致する）
//! - Executor は start / cancel の中からサービスを呼び戻して待ってはいけない
//! - エラーはリトライせず、そのまま呼び出し元に返す

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use crate::app::listing::{JobListFilter, select_jobs};
use crate::app::wait;
use crate::domain::{
    ErrorSummary, ExecutionPhase, JobId, JobList, JobRecord, Parameter, PhaseAction,
    ResultReference, UwsError, validate_parameters,
};
use crate::ports::{Clock, Executor, JobStore, SystemClock};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

pub struct UwsService {
    store: Arc<dyn JobStore>,
    executor: Arc<dyn Executor>,
    clock: Arc<dyn Clock>,
    poll_interval: Duration,

    /// Serializes read-modify-write updates and the executor calls they trigger.
    update_lock: Mutex<()>,
}

impl UwsService {
    pub fn new(store: Arc<dyn JobStore>, executor: Arc<dyn Executor>) -> Self {
        Self {
            store,
            executor,
            clock: Arc::new(SystemClock),
            poll_interval: DEFAULT_POLL_INTERVAL,
            update_lock: Mutex::new(()),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Fallback re-check interval of `await_phase_change` (at least 1 ms).
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval.max(MIN_POLL_INTERVAL);
        self
    }

    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.store
    }

    #[instrument(skip(self, parameters), fields(parameters = parameters.len()))]
    pub async fn create_job(
        &self,
        parameters: Vec<Parameter>,
        owner_id: Option<String>,
        run_id: Option<String>,
    ) -> Result<JobId, UwsError> {
        validate_parameters(&parameters).inspect_err(|e| warn!(error = %e, "rejected job"))?;
        let job_id = self.store.create(parameters, owner_id, run_id).await?;
        info!(%job_id, "job created");
        Ok(job_id)
    }

    pub async fn get_job(&self, job_id: JobId) -> Result<JobRecord, UwsError> {
        self.store.get(job_id).await
    }

    pub async fn list_jobs(&self, filter: &JobListFilter) -> Result<JobList, UwsError> {
        let jobs = self.store.list().await?;
        Ok(JobList::new(select_jobs(jobs, filter)))
    }

    /// Remove the job and tell the executor to stop it.
    #[instrument(skip(self))]
    pub async fn delete_job(&self, job_id: JobId) -> Result<(), UwsError> {
        let _guard = self.update_lock.lock().await;
        let job = self.store.get(job_id).await?;
        self.store.delete(job_id).await?;

        self.executor.cancel(&job).await;
        info!(%job_id, "job deleted");
        Ok(())
    }

    /// Apply RUN or ABORT.
    ///
    /// - RUN: PENDING / HELD のときだけ。EXECUTING にしてから `start` を 1 回呼ぶ
    /// - ABORT: 終端フェーズ以外ならいつでも。ABORTED にしてから `cancel` を呼ぶ
    ///   （すでに ABORTED なら何もせず成功）
    /// - それ以外のアクションは `UnsupportedAction`
    #[instrument(skip(self))]
    pub async fn request_phase_action(
        &self,
        job_id: JobId,
        action: PhaseAction,
    ) -> Result<JobRecord, UwsError> {
        match action {
            PhaseAction::Run => self.run(job_id).await,
            PhaseAction::Abort => self.abort(job_id).await,
            PhaseAction::Suspend | PhaseAction::Archive => {
                warn!(%job_id, %action, "unsupported phase action");
                Err(UwsError::UnsupportedAction(action.to_string()))
            }
        }
    }

    /// Same as `request_phase_action`, parsing the raw action value first.
    pub async fn request_phase_action_str(
        &self,
        job_id: JobId,
        action: &str,
    ) -> Result<JobRecord, UwsError> {
        let action: PhaseAction = action.parse()?;
        self.request_phase_action(job_id, action).await
    }

    async fn run(&self, job_id: JobId) -> Result<JobRecord, UwsError> {
        let _guard = self.update_lock.lock().await;
        let mut job = self.store.get(job_id).await?;
        if !matches!(job.phase, ExecutionPhase::Pending | ExecutionPhase::Held) {
            warn!(%job_id, phase = %job.phase, "RUN rejected");
            return Err(invalid(&job, PhaseAction::Run));
        }
        job.transition_to(ExecutionPhase::Executing, self.clock.now())?;
        let job = self.store.save(job).await?;

        // a concurrent ABORT must not cancel before this start lands
        self.executor.start(&job).await;
        info!(%job_id, "job started");
        Ok(job)
    }

    async fn abort(&self, job_id: JobId) -> Result<JobRecord, UwsError> {
        let _guard = self.update_lock.lock().await;
        let mut job = self.store.get(job_id).await?;
        if job.phase == ExecutionPhase::Aborted {
            return Ok(job);
        }
        if job.phase.is_terminal() {
            warn!(%job_id, phase = %job.phase, "ABORT rejected");
            return Err(invalid(&job, PhaseAction::Abort));
        }
        job.transition_to(ExecutionPhase::Aborted, self.clock.now())?;
        let job = self.store.save(job).await?;

        self.executor.cancel(&job).await;
        info!(%job_id, "job aborted");
        Ok(job)
    }

    /// Move the destruction deadline; it must be strictly in the future.
    #[instrument(skip(self))]
    pub async fn update_destruction(
        &self,
        job_id: JobId,
        destruction_time: DateTime<Utc>,
    ) -> Result<JobRecord, UwsError> {
        let now = self.clock.now();
        self.modify(job_id, |job| {
            if destruction_time <= now {
                warn!(%job_id, %destruction_time, "destruction time in the past");
                return Err(UwsError::InvalidDestructionTime(destruction_time));
            }
            job.destruction_time = destruction_time;
            Ok(())
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn update_execution_duration(
        &self,
        job_id: JobId,
        seconds: i64,
    ) -> Result<JobRecord, UwsError> {
        let seconds = u64::try_from(seconds).map_err(|_| {
            UwsError::Validation(format!("execution duration must be >= 0 (got {seconds})"))
        })?;
        self.modify(job_id, |job| {
            job.execution_duration = seconds;
            Ok(())
        })
        .await
    }

    /// Replace all parameters. Allowed in every phase.
    #[instrument(skip(self, parameters), fields(parameters = parameters.len()))]
    pub async fn update_parameters(
        &self,
        job_id: JobId,
        parameters: Vec<Parameter>,
    ) -> Result<JobRecord, UwsError> {
        validate_parameters(&parameters)?;
        self.modify(job_id, |job| {
            job.parameters = parameters;
            Ok(())
        })
        .await
    }

    /// Long-poll; see [`wait::await_phase_change`].
    ///
    /// `timeout` is used as given. Clamp it at the boundary (`UwsConfig::clamp_wait`).
    pub async fn await_phase_change(
        &self,
        job_id: JobId,
        watch_phase: Option<ExecutionPhase>,
        timeout: Option<Duration>,
    ) -> Result<JobRecord, UwsError> {
        wait::await_phase_change(
            self.store.as_ref(),
            job_id,
            watch_phase,
            timeout,
            self.poll_interval,
        )
        .await
    }

    // ---------------------------------------------------------------------
    // Executor-facing updates
    // ---------------------------------------------------------------------

    /// Executor-driven move along the state machine (QUEUED, HELD, EXECUTING, ...).
    ///
    /// ARCHIVED は有効期限の経路でのみ到達できるので、ここでは拒否する。
    #[instrument(skip(self))]
    pub async fn report_phase(
        &self,
        job_id: JobId,
        phase: ExecutionPhase,
    ) -> Result<JobRecord, UwsError> {
        let now = self.clock.now();
        self.modify(job_id, |job| {
            if phase == ExecutionPhase::Archived {
                return Err(UwsError::InvalidTransition {
                    job_id,
                    from: job.phase,
                    action: format!("move to {phase}"),
                });
            }
            job.transition_to(phase, now)
        })
        .await
    }

    /// EXECUTING -> COMPLETED with the given results appended.
    #[instrument(skip(self, results), fields(results = results.len()))]
    pub async fn complete_job(
        &self,
        job_id: JobId,
        results: Vec<ResultReference>,
    ) -> Result<JobRecord, UwsError> {
        let now = self.clock.now();
        let job = self
            .modify(job_id, |job| {
                job.transition_to(ExecutionPhase::Completed, now)?;
                job.results.extend(results);
                Ok(())
            })
            .await?;
        info!(%job_id, "job completed");
        Ok(job)
    }

    /// EXECUTING -> ERROR with an error summary.
    #[instrument(skip(self))]
    pub async fn fail_job(
        &self,
        job_id: JobId,
        error_summary: ErrorSummary,
    ) -> Result<JobRecord, UwsError> {
        let now = self.clock.now();
        let job = self
            .modify(job_id, |job| {
                job.transition_to(ExecutionPhase::Error, now)?;
                job.error_summary = Some(error_summary);
                Ok(())
            })
            .await?;
        info!(%job_id, "job failed");
        Ok(job)
    }

    /// Append result references (any phase).
    pub async fn add_results(
        &self,
        job_id: JobId,
        results: Vec<ResultReference>,
    ) -> Result<JobRecord, UwsError> {
        self.modify(job_id, |job| {
            job.results.extend(results);
            Ok(())
        })
        .await
    }

    pub async fn update_quote(
        &self,
        job_id: JobId,
        quote: Option<DateTime<Utc>>,
    ) -> Result<JobRecord, UwsError> {
        self.modify(job_id, |job| {
            job.quote = quote;
            Ok(())
        })
        .await
    }

    pub async fn add_job_info(
        &self,
        job_id: JobId,
        info: impl Into<String>,
    ) -> Result<JobRecord, UwsError> {
        let info = info.into();
        self.modify(job_id, |job| {
            job.job_info.push(info);
            Ok(())
        })
        .await
    }

    /// Load, apply `f`, save. Nothing is saved when `f` fails.
    async fn modify(
        &self,
        job_id: JobId,
        f: impl FnOnce(&mut JobRecord) -> Result<(), UwsError>,
    ) -> Result<JobRecord, UwsError> {
        let _guard = self.update_lock.lock().await;
        let mut job = self.store.get(job_id).await?;
        f(&mut job)?;
        self.store.save(job).await
    }
}

fn invalid(job: &JobRecord, action: PhaseAction) -> UwsError {
    UwsError::InvalidTransition {
        job_id: job.job_id,
        from: job.phase,
        action: action.to_string(),
    }
}
