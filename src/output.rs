//! Plain-text tables on stdout. Logs go to stderr, so these stay pipeable.

use crate::{
    gateway::PlannedAction,
    jobs::{Job, LaunchResult, RunHandle},
    uc::{DeletionSummary, UcObject},
};

/// Render rows under `headers`, each column padded to its widest cell
#[must_use]
pub fn render(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();

    let mut lines = vec![
        line(headers.iter().copied(), &widths),
        line(rule.iter().map(String::as_str), &widths),
    ];
    lines.extend(rows.iter().map(|row| line(row.iter().map(String::as_str), &widths)));
    lines.join("\n")
}

fn line<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    cells
        .zip(widths)
        .map(|(cell, &width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}

fn or_dash(value: Option<&str>) -> String {
    value.unwrap_or("-").to_string()
}

pub fn jobs_table(jobs: &[Job]) {
    let rows: Vec<_> = jobs
        .iter()
        .map(|job| {
            let tags = job
                .tags
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join(",");
            vec![job.id.to_string(), job.name.clone(), tags]
        })
        .collect();
    println!("{}", render(&["JOB ID", "NAME", "TAGS"], &rows));
}

pub fn launch_table(results: &[LaunchResult]) {
    let rows: Vec<_> = results
        .iter()
        .map(|r| match &r.result {
            Ok(handle) => vec![
                r.job.id.to_string(),
                r.job.name.clone(),
                run_id(handle),
                handle.state.to_string(),
                String::new(),
            ],
            Err(err) => vec![
                r.job.id.to_string(),
                r.job.name.clone(),
                "-".to_string(),
                "NOT STARTED".to_string(),
                err.source.to_string(),
            ],
        })
        .collect();
    println!(
        "{}",
        render(&["JOB ID", "NAME", "RUN ID", "STATE", "ERROR"], &rows)
    );
}

pub fn runs_table(handles: &[RunHandle]) {
    let rows: Vec<_> = handles
        .iter()
        .map(|h| {
            let duration = h.ended_at.map_or_else(String::new, |end| {
                format!("{}s", (end - h.started_at).num_seconds())
            });
            vec![
                h.job_id.to_string(),
                run_id(h),
                h.state.to_string(),
                duration,
                or_dash(h.poll_error.as_deref()),
            ]
        })
        .collect();
    println!(
        "{}",
        render(&["JOB ID", "RUN ID", "STATE", "DURATION", "POLL ERROR"], &rows)
    );
}

fn run_id(handle: &RunHandle) -> String {
    if handle.simulated {
        "(dry-run)".to_string()
    } else {
        handle.run_id.to_string()
    }
}

pub fn objects_table(title: &str, objects: &[UcObject]) {
    let rows: Vec<_> = objects
        .iter()
        .map(|o| {
            vec![
                o.full_name(),
                o.kind.to_string(),
                or_dash(o.owner.as_deref()),
                or_dash(o.table_type.as_deref()),
            ]
        })
        .collect();
    println!("{title} ({})", objects.len());
    println!("{}", render(&["NAME", "KIND", "OWNER", "TYPE"], &rows));
}

pub fn summary_table(summary: &DeletionSummary) {
    let rows: Vec<_> = summary
        .results
        .iter()
        .map(|r| {
            vec![
                r.object.full_name(),
                r.step_reached.to_string(),
                r.outcome.to_string(),
                or_dash(r.error.as_deref()),
            ]
        })
        .collect();
    println!("{}", render(&["OBJECT", "STEP", "RESULT", "DETAIL"], &rows));
    println!(
        "{} succeeded, {} skipped, {} failed",
        summary.succeeded(),
        summary.skipped(),
        summary.failed()
    );
}

pub fn planned_actions(actions: &[PlannedAction]) {
    if actions.is_empty() {
        return;
    }
    println!("Dry run, nothing was changed:");
    for action in actions {
        println!("  {action}");
    }
}
