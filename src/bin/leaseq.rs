//! leaseq daemon: publish items to a queue or work them off as a leasing worker.

use clap::{Parser, ValueEnum};
use leaseq::config::Config;
use leaseq::publisher::publish_sequence;
use leaseq::queue::LeaseQueue;
use leaseq::store::RedisStore;
use leaseq::telemetry::{TelemetryConfig, init_telemetry};
use leaseq::worker::{SimulatedWork, Worker, WorkerConfig};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Parser)]
#[command(name = "leaseq", about = "Redis lease queue publisher / worker daemon")]
struct Cli {
    /// Redis server host
    host: String,
    /// Redis server port
    port: u16,
    /// Queue name
    queue: String,
    /// Daemon action
    #[arg(long, value_enum)]
    action: Action,
    /// Items to publish; items 1..count are sent (pub only)
    #[arg(long)]
    count: Option<usize>,
    /// Lease duration in seconds (sub only)
    #[arg(long)]
    lease_secs: Option<u64>,
    /// Blocking wait per lease attempt in seconds (sub only)
    #[arg(long)]
    wait_secs: Option<u64>,
    /// Simulated work per item in seconds (sub only)
    #[arg(long)]
    work_secs: Option<u64>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Action {
    /// Publish a run of labeled items
    Pub,
    /// Lease and complete items until the queue is empty
    Sub,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    // Argument errors (including an unknown --action) exit here, before any
    // connection is made.
    let cli = Cli::parse();
    let config = Config::from_env()?;

    let _guard = init_telemetry(TelemetryConfig {
        endpoint: config.otel_endpoint.clone(),
        service_name: "leaseq".to_string(),
        log_level: config.log_level.clone(),
    })?;

    let store = RedisStore::connect(
        &cli.host,
        cli.port,
        config.redis_db,
        config.redis_password.as_ref(),
    )
    .await?;
    let queue = LeaseQueue::new(&cli.queue, store);

    match cli.action {
        Action::Pub => cmd_pub(&queue, &cli, &config).await,
        Action::Sub => cmd_sub(queue, &cli, &config).await,
    }
}

async fn cmd_pub(queue: &LeaseQueue<RedisStore>, cli: &Cli, config: &Config) -> anyhow::Result<()> {
    let count = cli.count.unwrap_or(config.publish_count);
    let published = publish_sequence(queue, count, config.publish_interval).await?;
    info!(queue = %queue.name(), published, "publisher done");
    Ok(())
}

async fn cmd_sub(queue: LeaseQueue<RedisStore>, cli: &Cli, config: &Config) -> anyhow::Result<()> {
    let secs_or = |flag: Option<u64>, fallback: Duration| flag.map_or(fallback, Duration::from_secs);
    let worker_config = WorkerConfig {
        lease_duration: secs_or(cli.lease_secs, config.lease_duration),
        wait_timeout: secs_or(cli.wait_secs, config.wait_timeout),
    };
    let handler = SimulatedWork::new(secs_or(cli.work_secs, config.work_duration));

    info!(session = %queue.session_id(), "worker with session id");
    info!(empty = queue.empty().await?, "initial queue state");

    let worker = Worker::new(Arc::new(queue), worker_config);
    let stopper = worker.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        stopper.shutdown();
    });

    let report = worker.run(&handler).await?;
    info!(
        queue = %worker.queue().name(),
        completed = report.completed,
        reason = %report.stopped,
        "subscriber done"
    );
    Ok(())
}
