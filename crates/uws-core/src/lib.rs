//! uws-core
//!
//! Job lifecycle engine for the IVOA Universal Worker Service (UWS) pattern.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, phase, job, expiry, errors）
//! - **ports**: 抽象化レイヤー（JobStore, Executor, Clock, IdGenerator）
//! - **impls**: 実装（InMemoryJobStore, NoopExecutor など）
//! - **app**: アプリケーションロジック（service, builder, listing, wait）
//! - **config**: 設定の読み込み（デフォルト < TOML < 環境変数）

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod ports;

pub use app::{JobListFilter, ServiceBuilder, UwsService};
pub use config::{ConfigError, StoreKind, UwsConfig};
pub use domain::{
    ErrorSummary, ExecutionPhase, JobId, JobList, JobRecord, Parameter, PhaseAction,
    ResultReference, UwsError,
};
