//! JobStore port - ジョブレコードの正本（source of truth）
//!
//! JobStore は以下を管理します：
//! - ジョブレコードの CRUD
//! - 有効期限（destruction_time）の強制（読み取り時の lazy eviction）
//! - 変更通知（long-poll の wake-on-change 用）

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::domain::{JobId, JobRecord, Parameter, UwsError};

/// JobStore はジョブレコードを所有する唯一のコンポーネント
///
/// # 設計原則
/// - 期限切れのレコードはどの読み取り経路からも返さない（見つけたらその場で削除）
/// - `save` は `destruction_time` を `creation_time + max_expiry` に必ず丸める
/// - `delete` は冪等（存在しない ID でもエラーにしない）
/// - `save` / `delete` / 期限切れ削除のたびに `subscribe` の購読者へ job_id を流す
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Live record by id, or `NotFound` (expired records are evicted here).
    async fn get(&self, job_id: JobId) -> Result<JobRecord, UwsError>;

    /// Consistent snapshot of every live record, in no particular order.
    async fn list(&self) -> Result<Vec<JobRecord>, UwsError>;

    /// New PENDING record expiring after the store's default expiry.
    async fn create(
        &self,
        parameters: Vec<Parameter>,
        owner_id: Option<String>,
        run_id: Option<String>,
    ) -> Result<JobId, UwsError>;

    /// Replace a live record, returning it as stored (after the max-expiry clamp).
    ///
    /// `NotFound` if the job is not live; `Validation` if `creation_time`,
    /// `owner_id` or `run_id` differ from the stored record.
    async fn save(&self, record: JobRecord) -> Result<JobRecord, UwsError>;

    async fn delete(&self, job_id: JobId) -> Result<(), UwsError>;

    /// Ids of records that were saved, deleted or evicted from now on.
    fn subscribe(&self) -> broadcast::Receiver<JobId>;
}
