use super::Context;
use crate::{
    error::{EXIT_FAILURE, EXIT_OK},
    jobs::{
        Job, JobCache, RunHandle, RunTransition, Selector, WatchMode, launch, watch,
    },
    output,
};
use anyhow::{Context as _, Result};
use tokio::sync::mpsc;
use tracing::warn;

#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    pub refresh: bool,
    pub dry_run: bool,
    pub watch: bool,
    pub all: bool,
    pub confirm: bool,
}

async fn matching(ctx: &Context, selector: &Selector, refresh: bool) -> Result<Vec<Job>> {
    let cache = JobCache::new(ctx.gateway.clone(), ctx.settings.cache_ttl);
    let entry = cache.get(refresh).await.context("Failed to list jobs")?;
    Ok(selector.select(&entry))
}

pub async fn find(ctx: &Context, selector: &Selector, refresh: bool) -> Result<u8> {
    let jobs = matching(ctx, selector, refresh).await?;
    if jobs.is_empty() {
        println!("No jobs matched.");
    } else {
        output::jobs_table(&jobs);
    }
    Ok(EXIT_OK)
}

pub async fn run(ctx: &Context, selector: &Selector, opts: RunOptions) -> Result<u8> {
    let jobs = matching(ctx, selector, opts.refresh).await?;
    if jobs.is_empty() {
        println!("No jobs matched.");
        return Ok(EXIT_OK);
    }

    let selected: Vec<Job> = if opts.all {
        jobs
    } else {
        let labels: Vec<String> = jobs.iter().map(|j| format!("{} ({})", j.name, j.id)).collect();
        let picked = ctx.console.select("Select jobs to run", &labels).await;
        jobs.into_iter()
            .enumerate()
            .filter(|(i, _)| picked.contains(i))
            .map(|(_, job)| job)
            .collect()
    };
    if selected.is_empty() {
        println!("Nothing selected.");
        return Ok(EXIT_OK);
    }

    let dry = if opts.dry_run { " (dry-run)" } else { "" };
    if opts.confirm
        && !ctx
            .console
            .confirm(&format!("Launch {} job(s){dry}?", selected.len()))
            .await
    {
        println!("Aborted.");
        return Ok(EXIT_OK);
    }

    let (gateway, recorder) = ctx.gateway_for(opts.dry_run);
    let results = launch(gateway.clone(), &selected, ctx.settings.parallel).await;
    output::launch_table(&results);

    let launch_failed = results.iter().any(|r| r.result.is_err());
    let handles: Vec<RunHandle> = results.into_iter().filter_map(|r| r.result.ok()).collect();

    let mut watch_failed = false;
    if handles.iter().any(|h| !h.simulated) {
        let mode = if opts.watch {
            WatchMode::Block
        } else {
            WatchMode::Snapshot
        };
        let (tx, rx) = mpsc::unbounded_channel();
        let printer = tokio::spawn(print_transitions(rx));
        let outcome = watch(
            gateway.as_ref(),
            handles,
            &ctx.settings.poll,
            mode,
            Some(&tx),
            &ctx.cancel,
        )
        .await;
        drop(tx);
        let _ = printer.await;

        output::runs_table(&outcome.handles);
        if outcome.interrupted {
            warn!("interrupted, runs keep going remotely");
        }
        watch_failed = opts.watch && (outcome.interrupted || !outcome.all_succeeded());
    }

    if let Some(recorder) = recorder {
        output::planned_actions(&recorder.planned());
    }

    Ok(if launch_failed || watch_failed {
        EXIT_FAILURE
    } else {
        EXIT_OK
    })
}

async fn print_transitions(mut rx: mpsc::UnboundedReceiver<RunTransition>) {
    while let Some(t) = rx.recv().await {
        match &t.poll_error {
            Some(err) => println!(
                "job {} run {}: {} -> {} ({err})",
                t.job_id, t.run_id, t.from, t.to
            ),
            None => println!("job {} run {}: {} -> {}", t.job_id, t.run_id, t.from, t.to),
        }
    }
}
