//! Executor port - 実際の処理を行う外部ワーカーへのゲートウェイ
//!
//! エンジンはジョブの中身を知りません。開始と中断だけを依頼します。

use async_trait::async_trait;

use crate::domain::JobRecord;

/// Executor は外部ワーカーに開始・中断を依頼する
///
/// # 契約
/// - `start`: 副作用は外部ワーカー側のみ。戻り値なし
/// - `cancel`: 冪等。実行中でなければ何もしない
/// - 完了・失敗の報告は `UwsService::complete_job` / `fail_job` 経由で戻ってくる
/// - 呼び出し中はエンジンのロックが保持されている。すぐに返し、中から
///   `UwsService` を呼び戻して待たないこと（CLI の executor はチャネルに流すだけ）
#[async_trait]
pub trait Executor: Send + Sync {
    async fn start(&self, job: &JobRecord);

    async fn cancel(&self, job: &JobRecord);
}
