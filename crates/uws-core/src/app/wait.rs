//! Wait - フェーズ変化の long-poll
//!
//! # フロー
//! 1. ストアの変更通知を購読（初回読み取りより前に購読して取りこぼしを防ぐ）
//! 2. 現在のレコードを読み、待つ必要がなければ即座に返す
//! 3. 変更通知 / poll_interval の tick / 期限 のいずれかで起きて再確認
//!
//! ロックは一切保持したまま待たない。future を drop すれば timer と受信側も破棄される。

use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

use crate::domain::{ExecutionPhase, JobId, JobRecord, UwsError};
use crate::ports::JobStore;

/// Block until the job leaves its current phase or `timeout` elapses.
///
/// - `timeout` が `None`、または現在のフェーズが PENDING/QUEUED/EXECUTING 以外なら即座に返す
/// - `watch_phase` が現在のフェーズと異なれば即座に返す
/// - 待っている間にジョブが消えたら `NotFound`
pub async fn await_phase_change(
    store: &dyn JobStore,
    job_id: JobId,
    watch_phase: Option<ExecutionPhase>,
    timeout: Option<Duration>,
    poll_interval: Duration,
) -> Result<JobRecord, UwsError> {
    let mut changes = store.subscribe();
    let current = store.get(job_id).await?;

    let Some(timeout) = timeout else {
        return Ok(current);
    };
    if !current.phase.is_active() {
        return Ok(current);
    }
    if let Some(watch_phase) = watch_phase
        && watch_phase != current.phase
    {
        return Ok(current);
    }

    let observed = current.phase;
    let deadline = deadline_after(timeout);
    let mut ticker = tokio::time::interval_at(Instant::now() + poll_interval, poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut listening = true;

    debug!(%job_id, phase = %observed, ?timeout, "waiting for phase change");
    loop {
        tokio::select! {
            _ = tokio::time::sleep_until(deadline) => {
                debug!(%job_id, "wait timed out");
                return store.get(job_id).await;
            }
            changed = changes.recv(), if listening => match changed {
                Ok(id) if id != job_id => continue,
                Ok(_) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => {
                    // 通知が止まっても tick で確認を続ける
                    listening = false;
                    continue;
                }
            },
            _ = ticker.tick() => {}
        }

        let record = store.get(job_id).await?;
        if record.phase != observed {
            debug!(%job_id, from = %observed, to = %record.phase, "phase changed");
            return Ok(record);
        }
    }
}

/// Far enough out to mean "no deadline" for any real wait.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

fn deadline_after(timeout: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(timeout)
        .unwrap_or_else(|| now + FAR_FUTURE)
}
