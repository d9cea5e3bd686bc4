//! Impls - 実装（開発用・テスト用）
//!
//! このモジュールには ports の実装を含めます。
//!
//! # 含まれる実装
//! - **InMemoryJobStore**: プロセス内のジョブストア
//! - **NoopExecutor**: 何もしない Executor
//! - **RecordingExecutor**: 呼び出しを記録する Executor（テスト用）
//!
//! # 本番用実装
//! 永続化ストアや実際の実行バックエンドは別クレートに配置します。

pub mod inmem_store;
pub mod noop_executor;
pub mod recording_executor;

// 主要な型を再エクスポート
pub use self::inmem_store::InMemoryJobStore;
pub use self::noop_executor::NoopExecutor;
pub use self::recording_executor::RecordingExecutor;
