use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;

use coordinator::state::AppState;
use coordinator::{handlers, DEFAULT_TASK_LEASE_SECS};

#[derive(Parser)]
#[command(name = "coordinator")]
#[command(about = "Hands out map and reduce tasks to workers over HTTP")]
struct Args {
    /// Input files, one map task each. Glob patterns are expanded.
    #[arg(value_name = "INPUT", required = true)]
    inputs: Vec<String>,

    /// Number of reduce partitions.
    #[arg(long, default_value_t = 4)]
    reduce_tasks: u32,

    /// Address to serve on.
    #[arg(long, default_value = "0.0.0.0:8080")]
    listen: String,

    /// Seconds a worker may hold a task before it is reassigned.
    #[arg(long, default_value_t = DEFAULT_TASK_LEASE_SECS)]
    lease_secs: u64,
}

fn expand_inputs(patterns: &[String]) -> Result<Vec<String>> {
    let mut inputs = Vec::new();
    for pattern in patterns {
        let entries =
            glob::glob(pattern).with_context(|| format!("bad input pattern {pattern}"))?;
        for entry in entries {
            let path = entry.with_context(|| format!("reading matches of {pattern}"))?;
            if path.is_file() {
                inputs.push(path.to_string_lossy().to_string());
            }
        }
    }
    Ok(inputs)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("coordinator=debug,tower_http=info")
        .init();

    let args = Args::parse();
    let inputs = expand_inputs(&args.inputs)?;
    info!(
        "{} map tasks, {} reduce partitions, lease {}s",
        inputs.len(),
        args.reduce_tasks,
        args.lease_secs
    );

    let state = AppState::new(
        inputs,
        args.reduce_tasks,
        Duration::from_secs(args.lease_secs),
    );
    let app = handlers::build_router(state.clone());

    let listener = TcpListener::bind(&args.listen)
        .await
        .with_context(|| format!("binding {}", args.listen))?;
    info!("coordinator listening on {}", listener.local_addr()?);

    // Serve until the job-done probe turns true, then drain.
    axum::serve(listener, app)
        .with_graceful_shutdown(wait_until_done(state))
        .await?;

    info!("job complete, coordinator exiting");
    Ok(())
}

async fn wait_until_done(state: AppState) {
    loop {
        tokio::time::sleep(Duration::from_millis(500)).await;
        if state.registry.lock().unwrap().is_done() {
            return;
        }
    }
}
