//! Listing - ジョブ一覧の絞り込みと並び替え
//!
//! # 処理順（この順番は変えないこと）
//! 1. 生きているレコードを全件取得（呼び出し側）
//! 2. creation_time の降順にソート（同時刻は job_id の降順）
//! 3. `after` より前に作られたものを除外
//! 4. `owner_id` が指定されていれば一致するものだけ残す
//! 5. `phases` が空なら ARCHIVED を除外、空でなければ含まれるものだけ残す
//! 6. `last` で先頭 N 件に切り詰め（絞り込みの後）

use chrono::{DateTime, Utc};

use crate::domain::{ExecutionPhase, JobRecord, ShortJobDescription};

/// Filter for `UwsService::list_jobs`.
///
/// # 使用例
/// ```ignore
/// let filter = JobListFilter::new()
///     .with_phase(ExecutionPhase::Executing)
///     .last(2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobListFilter {
    /// Phases to keep. Empty means "everything except ARCHIVED".
    pub phases: Vec<ExecutionPhase>,

    /// Drop jobs created before this instant.
    pub after: Option<DateTime<Utc>>,

    /// Keep only the newest N matches. `None` or `Some(0)` keeps all.
    pub last: Option<usize>,

    pub owner_id: Option<String>,
}

impl JobListFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_phase(mut self, phase: ExecutionPhase) -> Self {
        self.phases.push(phase);
        self
    }

    pub fn with_phases(mut self, phases: impl IntoIterator<Item = ExecutionPhase>) -> Self {
        self.phases.extend(phases);
        self
    }

    pub fn after(mut self, after: DateTime<Utc>) -> Self {
        self.after = Some(after);
        self
    }

    pub fn last(mut self, last: usize) -> Self {
        self.last = Some(last);
        self
    }

    pub fn owner(mut self, owner_id: impl Into<String>) -> Self {
        self.owner_id = Some(owner_id.into());
        self
    }

    fn keeps(&self, job: &JobRecord) -> bool {
        if let Some(after) = self.after
            && job.creation_time < after
        {
            return false;
        }
        if let Some(owner_id) = &self.owner_id
            && job.owner_id.as_deref() != Some(owner_id.as_str())
        {
            return false;
        }
        if self.phases.is_empty() {
            // ARCHIVED は明示的に指定されたときだけ返す（後方互換）
            job.phase != ExecutionPhase::Archived
        } else {
            self.phases.contains(&job.phase)
        }
    }
}

/// Apply `filter` to a snapshot of live records, newest first.
pub fn select_jobs(mut jobs: Vec<JobRecord>, filter: &JobListFilter) -> Vec<ShortJobDescription> {
    jobs.sort_by(|a, b| {
        b.creation_time
            .cmp(&a.creation_time)
            .then_with(|| b.job_id.cmp(&a.job_id))
    });

    let matches = jobs
        .iter()
        .filter(|job| filter.keeps(job))
        .map(JobRecord::short_description);

    match filter.last {
        Some(last) if last > 0 => matches.take(last).collect(),
        _ => matches.collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::JobId;
    use chrono::{Duration, TimeZone};
    use ulid::Ulid;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    /// Job created `minutes` after t0 in `phase`.
    fn job(minutes: i64, phase: ExecutionPhase) -> JobRecord {
        let created = t0() + Duration::minutes(minutes);
        let mut record = JobRecord::new(
            JobId::from_ulid(Ulid::new()),
            vec![],
            None,
            None,
            created,
            created + Duration::days(1),
        );
        record.phase = phase;
        record
    }

    fn ids(list: &[ShortJobDescription]) -> Vec<JobId> {
        list.iter().map(|job| job.job_id).collect()
    }

    #[test]
    fn sorted_newest_first() {
        let a = job(1, ExecutionPhase::Pending);
        let b = job(3, ExecutionPhase::Pending);
        let c = job(2, ExecutionPhase::Pending);

        let list = select_jobs(vec![a.clone(), b.clone(), c.clone()], &JobListFilter::new());

        assert_eq!(ids(&list), vec![b.job_id, c.job_id, a.job_id]);
    }

    #[test]
    fn archived_hidden_unless_requested() {
        let pending = job(1, ExecutionPhase::Pending);
        let executing = job(2, ExecutionPhase::Executing);
        let archived = job(3, ExecutionPhase::Archived);
        let all = vec![pending.clone(), executing.clone(), archived.clone()];

        let default = select_jobs(all.clone(), &JobListFilter::new());
        assert_eq!(ids(&default), vec![executing.job_id, pending.job_id]);

        let only_archived = select_jobs(all, &JobListFilter::new().with_phase(ExecutionPhase::Archived));
        assert_eq!(ids(&only_archived), vec![archived.job_id]);
    }

    #[test]
    fn last_keeps_newest() {
        let jobs: Vec<JobRecord> = (0..10).map(|i| job(i, ExecutionPhase::Pending)).collect();
        let expected: Vec<JobId> = jobs.iter().rev().take(5).map(|j| j.job_id).collect();

        let list = select_jobs(jobs, &JobListFilter::new().last(5));

        assert_eq!(ids(&list), expected);
    }

    #[test]
    fn phase_filter_applies_before_last() {
        let j1 = job(1, ExecutionPhase::Executing);
        let j2 = job(2, ExecutionPhase::Executing);
        let j3 = job(3, ExecutionPhase::Pending);
        let j4 = job(4, ExecutionPhase::Executing);

        let list = select_jobs(
            vec![j1, j2.clone(), j3, j4.clone()],
            &JobListFilter::new().with_phase(ExecutionPhase::Executing).last(2),
        );

        assert_eq!(ids(&list), vec![j4.job_id, j2.job_id]);
    }

    #[test]
    fn after_drops_older_jobs() {
        let old = job(1, ExecutionPhase::Pending);
        let boundary = job(5, ExecutionPhase::Pending);
        let new = job(9, ExecutionPhase::Pending);

        let list = select_jobs(
            vec![old, boundary.clone(), new.clone()],
            &JobListFilter::new().after(t0() + Duration::minutes(5)),
        );

        assert_eq!(ids(&list), vec![new.job_id, boundary.job_id]);
    }

    #[test]
    fn owner_filter() {
        let mut mine = job(1, ExecutionPhase::Pending);
        mine.owner_id = Some("alice".into());
        let mut theirs = job(2, ExecutionPhase::Pending);
        theirs.owner_id = Some("bob".into());
        let anonymous = job(3, ExecutionPhase::Pending);

        let list = select_jobs(vec![mine.clone(), theirs, anonymous], &JobListFilter::new().owner("alice"));

        assert_eq!(ids(&list), vec![mine.job_id]);
    }

    #[test]
    fn last_zero_means_no_limit() {
        let jobs: Vec<JobRecord> = (0..3).map(|i| job(i, ExecutionPhase::Pending)).collect();
        assert_eq!(select_jobs(jobs, &JobListFilter::new().last(0)).len(), 3);
    }

    #[test]
    fn ties_are_ordered_by_job_id() {
        let a = job(1, ExecutionPhase::Pending);
        let b = job(1, ExecutionPhase::Pending);
        let (low, high) = if a.job_id < b.job_id { (a, b) } else { (b, a) };

        let first = select_jobs(vec![low.clone(), high.clone()], &JobListFilter::new());
        let second = select_jobs(vec![high.clone(), low.clone()], &JobListFilter::new());

        assert_eq!(ids(&first), vec![high.job_id, low.job_id]);
        assert_eq!(first, second);
    }
}
