//! Ports - 抽象化レイヤー
//!
//! このモジュールは Hexagonal Architecture の「ポート」を定義します。
//! 各 trait は外部（ストレージ、実行バックエンド、時計）への
//! インターフェースを提供し、実装の詳細を隠蔽します。
//!
//! # 設計原則
//! - JobStore がジョブレコードの正本（source of truth）
//! - Executor は開始・中断の依頼先。結果はサービス経由で報告される
//! - 時刻と ID はテストで差し替えられるように注入する

pub mod clock;
pub mod executor;
pub mod id_generator;
pub mod job_store;

// 主要な trait を再エクスポート
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::executor::Executor;
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::job_store::JobStore;
