//! App - アプリケーション層
//!
//! このモジュールは、ports を組み合わせてジョブのライフサイクルを実装します。
//!
//! # 主要コンポーネント
//! - **UwsService**: ライフサイクルエンジン（作成・フェーズ操作・更新・削除）
//! - **ServiceBuilder**: 設定からのサービス構築とワイヤリング
//! - **JobListFilter**: 一覧の絞り込み条件
//! - **await_phase_change**: フェーズ変化の long-poll

pub mod builder;
pub mod listing;
pub mod service;
pub mod wait;

// 主要な型を再エクスポート
pub use self::builder::{BuildError, ServiceBuilder};
pub use self::listing::{JobListFilter, select_jobs};
pub use self::service::UwsService;
pub use self::wait::await_phase_change;
