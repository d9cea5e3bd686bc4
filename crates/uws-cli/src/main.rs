use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::Parser;
use tokio::sync::mpsc;
use tokio::time::{Duration, sleep};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use uws_core::{
    ErrorSummary, ExecutionPhase, JobId, JobListFilter, JobRecord, Parameter, PhaseAction,
    ResultReference, ServiceBuilder, UwsConfig, UwsService, ports::Executor,
};

/// Run a few jobs through the UWS lifecycle against a simulated backend.
#[derive(Debug, Parser)]
#[command(name = "uws", version)]
struct Args {
    /// TOML config file (UWS_* environment variables override it).
    #[arg(long, env = "UWS_CONFIG")]
    config: Option<PathBuf>,

    /// Number of jobs to submit.
    #[arg(long, default_value_t = 3)]
    jobs: usize,

    /// Long-poll wait per job, in seconds (clamped to max_wait_secs).
    #[arg(long, default_value_t = 5)]
    wait: u64,

    /// Simulated run time of each job, in milliseconds.
    #[arg(long, default_value_t = 300)]
    runtime_ms: u64,

    /// Fail every Nth job (0 disables).
    #[arg(long, default_value_t = 0)]
    fail_every: usize,

    #[arg(long)]
    json_logs: bool,
}

/// Executor：開始要求を worker に流すだけ（結果は UwsService に報告される）
struct SimulatedExecutor {
    tx: mpsc::UnboundedSender<JobId>,
}

#[async_trait]
impl Executor for SimulatedExecutor {
    async fn start(&self, job: &JobRecord) {
        if self.tx.send(job.job_id).is_err() {
            warn!(job_id = %job.job_id, "worker is gone, job will not run");
        }
    }

    async fn cancel(&self, job: &JobRecord) {
        // worker 側は complete_job が InvalidTransition で弾かれて終わる
        info!(job_id = %job.job_id, "cancel requested");
    }
}

/// worker：Executor と UwsService をつなぐ接着剤
async fn worker_loop(
    mut rx: mpsc::UnboundedReceiver<JobId>,
    service: Arc<UwsService>,
    runtime: Duration,
    fail_every: usize,
) {
    let mut seen = 0usize;
    while let Some(job_id) = rx.recv().await {
        seen += 1;
        let fail = fail_every > 0 && seen % fail_every == 0;
        let service = Arc::clone(&service);

        tokio::spawn(async move {
            // 1) 実行したことにして待つ
            sleep(runtime).await;

            // 2) 結果を報告（EXECUTING -> COMPLETED / ERROR）
            let reported = if fail {
                service
                    .fail_job(job_id, ErrorSummary::fatal("simulated failure"))
                    .await
            } else {
                let href = format!("/jobs/{job_id}/results/result");
                service
                    .complete_job(job_id, vec![ResultReference::new("result", href)])
                    .await
            };

            // 3) ABORT / 削除済みなら報告は拒否される
            if let Err(e) = reported {
                warn!(%job_id, error = %e, "result not recorded");
            }
        });
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.json_logs);

    // (A) 設定とサービスを用意
    let config = UwsConfig::load(args.config.as_deref()).context("failed to load config")?;
    let (tx, rx) = mpsc::unbounded_channel();
    let service = Arc::new(
        ServiceBuilder::new(config.clone())
            .with_executor(Arc::new(SimulatedExecutor { tx }))
            .build()
            .context("failed to build service")?,
    );

    // (B) worker を起動
    let worker = tokio::spawn(worker_loop(
        rx,
        Arc::clone(&service),
        Duration::from_millis(args.runtime_ms),
        args.fail_every,
    ));

    // (C) ジョブを作って RUN（最後の 1 件は ABORT してみる）
    let mut job_ids = Vec::with_capacity(args.jobs);
    for n in 0..args.jobs {
        let job_id = service
            .create_job(
                vec![Parameter::new("QUERY", format!("SELECT {n}"))],
                Some("demo".to_string()),
                Some(format!("run-{n}")),
            )
            .await?;
        service.request_phase_action(job_id, PhaseAction::Run).await?;
        job_ids.push(job_id);
    }
    if args.jobs > 1
        && let Some(&last) = job_ids.last()
    {
        service.request_phase_action(last, PhaseAction::Abort).await?;
    }

    // (D) long-poll で EXECUTING から抜けるのを待つ
    let wait = config.clamp_wait(Some(Duration::from_secs(args.wait)));
    for &job_id in &job_ids {
        let job = service
            .await_phase_change(job_id, Some(ExecutionPhase::Executing), wait)
            .await?;
        info!(%job_id, phase = %job.phase, results = job.results.len(), "job settled");
    }

    // (E) 一覧と詳細を JSON で出力
    let list = service.list_jobs(&JobListFilter::new().owner("demo")).await?;
    println!("{}", serde_json::to_string_pretty(&list)?);
    if let Some(&first) = job_ids.first() {
        let job = service.get_job(first).await?;
        println!("{}", serde_json::to_string_pretty(&job)?);
    }

    // (F) サンプルなので worker を止める
    worker.abort();
    Ok(())
}
