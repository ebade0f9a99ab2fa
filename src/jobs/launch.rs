use super::{Job, RunHandle};
use crate::gateway::{Gateway, GatewayError};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{info, warn};

/// A single job failed to trigger
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("failed to launch job {job_id} ({job_name}): {source}")]
pub struct LaunchError {
    pub job_id: i64,
    pub job_name: String,
    #[source]
    pub source: GatewayError,
}

/// Outcome of one trigger, tied to the job it was requested for
#[derive(Debug, Clone)]
pub struct LaunchResult {
    pub job: Job,
    pub result: Result<RunHandle, LaunchError>,
}

/// Trigger one run per job with at most `parallel` triggers in flight.
///
/// Results are positionally aligned with `jobs`. A failed trigger only
/// affects its own slot.
pub async fn launch(gateway: Arc<dyn Gateway>, jobs: &[Job], parallel: usize) -> Vec<LaunchResult> {
    let semaphore = Arc::new(Semaphore::new(parallel.max(1)));
    let mut handles = Vec::with_capacity(jobs.len());

    for job in jobs.iter().cloned() {
        let semaphore = semaphore.clone();
        let gateway = gateway.clone();
        let task_job = job.clone();

        let handle = tokio::spawn(async move {
            // The semaphore is never closed
            let _permit = semaphore.acquire_owned().await.ok();
            trigger(gateway.as_ref(), &task_job).await
        });
        handles.push((job, handle));
    }

    let mut results = Vec::with_capacity(handles.len());
    for (job, handle) in handles {
        let result = match handle.await {
            Ok(result) => result,
            Err(e) => Err(LaunchError {
                job_id: job.id,
                job_name: job.name.clone(),
                source: GatewayError::Transport(format!("launch task failed: {e}")),
            }),
        };
        results.push(LaunchResult { job, result });
    }
    results
}

async fn trigger(gateway: &dyn Gateway, job: &Job) -> Result<RunHandle, LaunchError> {
    match gateway.trigger_run(job.id).await {
        Ok(handle) => {
            info!(job_id = job.id, run_id = handle.run_id, simulated = handle.simulated, "run triggered");
            Ok(handle)
        }
        Err(source) => {
            warn!(job_id = job.id, error = %source, "run trigger failed");
            Err(LaunchError {
                job_id: job.id,
                job_name: job.name.clone(),
                source,
            })
        }
    }
}
