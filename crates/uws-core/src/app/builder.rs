//! ServiceBuilder - UwsService の構築とワイヤリング
//!
//! # 学習ポイント
//! - Builder パターンの実装
//! - 起動時検証（Fail-fast 設計）
//! - ストアは設定の閉じた集合（`StoreKind`）から選ぶ

use std::sync::Arc;

use tracing::info;

use crate::app::service::UwsService;
use crate::config::{StoreKind, UwsConfig};
use crate::impls::InMemoryJobStore;
use crate::ports::{Clock, Executor, JobStore, SystemClock};

/// ServiceBuilder は設定と注入された依存から UwsService を組み立てる
///
/// # 使用例
/// ```ignore
/// let service = ServiceBuilder::new(UwsConfig::load(None)?)
///     .with_executor(Arc::new(MyExecutor::new()))
///     .build()?;
/// ```
///
/// # Fail-fast 設計
/// - Executor が未設定なら build() で BuildError を返す
/// - ストアが注入されていなければ `config.store` から生成する
pub struct ServiceBuilder {
    config: UwsConfig,
    store: Option<Arc<dyn JobStore>>,
    executor: Option<Arc<dyn Executor>>,
    clock: Option<Arc<dyn Clock>>,
}

/// BuildError はサービス構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("No executor configured. Call with_executor() before build().")]
    MissingExecutor,
}

impl ServiceBuilder {
    pub fn new(config: UwsConfig) -> Self {
        Self {
            config,
            store: None,
            executor: None,
            clock: None,
        }
    }

    /// 既存のストアを使う（`config.store` は無視される）
    pub fn with_store(mut self, store: Arc<dyn JobStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_executor(mut self, executor: Arc<dyn Executor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// サービスと（生成する場合は）ストアの両方に使う時計
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn build(self) -> Result<UwsService, BuildError> {
        let executor = self.executor.ok_or(BuildError::MissingExecutor)?;
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));

        let store = match self.store {
            Some(store) => store,
            None => match self.config.store {
                StoreKind::Memory => Arc::new(InMemoryJobStore::with_clock(
                    self.config.expiry_policy(),
                    clock.clone(),
                )) as Arc<dyn JobStore>,
            },
        };

        info!(
            store = ?self.config.store,
            default_expiry_secs = self.config.default_expiry_secs,
            max_expiry_secs = self.config.max_expiry_secs,
            "uws service built"
        );
        Ok(UwsService::new(store, executor)
            .with_clock(clock)
            .with_poll_interval(self.config.poll_interval()))
    }
}

impl Default for ServiceBuilder {
    fn default() -> Self {
        Self::new(UwsConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ExecutionPhase;
    use crate::impls::{NoopExecutor, RecordingExecutor};
    use crate::ports::FixedClock;
    use chrono::{Duration, TimeZone, Utc};

    #[test]
    fn test_build_missing_executor() {
        let built = ServiceBuilder::default().build();
        assert!(matches!(built, Err(BuildError::MissingExecutor)));
    }

    #[tokio::test]
    async fn test_build_uses_config_expiry() {
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        ));
        let config = UwsConfig {
            default_expiry_secs: 60,
            max_expiry_secs: 120,
            ..Default::default()
        };
        let service = ServiceBuilder::new(config)
            .with_executor(Arc::new(NoopExecutor::new()))
            .with_clock(clock.clone())
            .build()
            .unwrap();

        let job_id = service.create_job(vec![], None, None).await.unwrap();
        let job = service.get_job(job_id).await.unwrap();
        assert_eq!(job.destruction_time, clock.now() + Duration::seconds(60));

        let job = service
            .update_destruction(job_id, clock.now() + Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(job.destruction_time, clock.now() + Duration::seconds(120));
    }

    #[tokio::test]
    async fn test_build_with_injected_store() {
        let store = Arc::new(InMemoryJobStore::default());
        let existing = store.create(vec![], None, None).await.unwrap();
        let executor = Arc::new(RecordingExecutor::new());

        let service = ServiceBuilder::default()
            .with_store(store.clone())
            .with_executor(executor.clone())
            .build()
            .unwrap();

        let job = service
            .request_phase_action(existing, crate::domain::PhaseAction::Run)
            .await
            .unwrap();
        assert_eq!(job.phase, ExecutionPhase::Executing);
        assert_eq!(executor.start_count(existing), 1);
    }
}
