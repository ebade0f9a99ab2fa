use super::{JobId, RunHandle, RunId, RunState};
use crate::gateway::{Gateway, GatewayError};
use futures::future::join_all;
use std::time::Duration;
use tokio::{sync::mpsc, time};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Polling cadence and per-run retry bound
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Pause between polling ticks
    pub interval: Duration,
    /// Timeout for a single status call
    pub call_timeout: Duration,
    /// Consecutive failed polls before a run is marked FAILED
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            call_timeout: Duration::from_secs(30),
            max_attempts: 3,
        }
    }
}

/// Block until every run is terminal, or take one snapshot and return
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchMode {
    Block,
    Snapshot,
}

/// A recorded state change, emitted in the order handles were supplied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunTransition {
    pub index: usize,
    pub job_id: JobId,
    pub run_id: RunId,
    pub from: RunState,
    pub to: RunState,
    pub poll_error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct WatchOutcome {
    pub handles: Vec<RunHandle>,
    /// The caller cancelled before every run was terminal
    pub interrupted: bool,
    pub ticks: u32,
}

impl WatchOutcome {
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.handles
            .iter()
            .all(|h| h.simulated || h.state == RunState::Succeeded)
    }
}

/// Poll `handles` until each is terminal, the caller cancels, or (in
/// snapshot mode) after a single tick.
///
/// Simulated handles are never polled. A run whose status cannot be read
/// `max_attempts` times in a row is marked FAILED with the last poll error;
/// authentication failures are not retried. Remote runs are never cancelled.
pub async fn watch(
    gateway: &dyn Gateway,
    mut handles: Vec<RunHandle>,
    policy: &RetryPolicy,
    mode: WatchMode,
    subscriber: Option<&mpsc::UnboundedSender<RunTransition>>,
    cancel: &CancellationToken,
) -> WatchOutcome {
    let mut failures = vec![0_u32; handles.len()];
    let mut interrupted = false;
    let mut ticks = 0;

    loop {
        let due: Vec<(usize, RunId)> = handles
            .iter()
            .enumerate()
            .filter(|(_, h)| !h.simulated && !h.is_terminal())
            .map(|(i, h)| (i, h.run_id))
            .collect();
        if due.is_empty() {
            break;
        }

        ticks += 1;
        debug!(tick = ticks, runs = due.len(), "polling run states");
        let polls = join_all(
            due.iter()
                .map(|(_, run_id)| poll(gateway, *run_id, policy.call_timeout)),
        );
        let results = tokio::select! {
            results = polls => results,
            () = cancel.cancelled() => {
                interrupted = true;
                break;
            }
        };

        let mut results = due.into_iter().zip(results).peekable();
        for (index, (handle, attempts)) in handles.iter_mut().zip(failures.iter_mut()).enumerate()
        {
            let Some((_, result)) = results.next_if(|((i, _), _)| *i == index) else {
                continue;
            };
            let from = handle.state;
            match result {
                Ok(state) => {
                    *attempts = 0;
                    if handle.observe(state) {
                        emit(subscriber, index, handle, from);
                    }
                }
                Err(err) => {
                    *attempts += 1;
                    warn!(
                        run_id = handle.run_id,
                        attempt = *attempts,
                        error = %err,
                        "run state poll failed"
                    );
                    if err.is_fatal() || *attempts >= policy.max_attempts {
                        handle.poll_error = Some(err.to_string());
                        if handle.observe(RunState::Failed) {
                            emit(subscriber, index, handle, from);
                        }
                    }
                }
            }
        }

        if mode == WatchMode::Snapshot {
            break;
        }
        if handles.iter().all(|h| h.simulated || h.is_terminal()) {
            break;
        }

        tokio::select! {
            () = time::sleep(policy.interval) => {}
            () = cancel.cancelled() => {
                interrupted = true;
                break;
            }
        }
    }

    WatchOutcome {
        handles,
        interrupted,
        ticks,
    }
}

async fn poll(
    gateway: &dyn Gateway,
    run_id: RunId,
    call_timeout: Duration,
) -> Result<RunState, GatewayError> {
    match time::timeout(call_timeout, gateway.get_run_state(run_id)).await {
        Ok(result) => result,
        Err(_) => Err(GatewayError::Timeout(call_timeout.as_secs())),
    }
}

fn emit(
    subscriber: Option<&mpsc::UnboundedSender<RunTransition>>,
    index: usize,
    handle: &RunHandle,
    from: RunState,
) {
    debug!(run_id = handle.run_id, %from, to = %handle.state, "run state changed");
    if let Some(tx) = subscriber {
        let _ = tx.send(RunTransition {
            index,
            job_id: handle.job_id,
            run_id: handle.run_id,
            from,
            to: handle.state,
            poll_error: handle.poll_error.clone(),
        });
    }
}
