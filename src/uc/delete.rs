use super::{SchemaName, TableFilter, UcObject, enumerate};
use crate::{
    console::Console,
    gateway::{Gateway, GatewayError},
};
use parking_lot::Mutex;
use std::{fmt, future::Future, sync::Arc};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Steps applied to each object, strictly in this order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DeletionStep {
    Preview,
    TransferOwner,
    Confirm,
    Delete,
}

impl fmt::Display for DeletionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Preview => "PREVIEW",
            Self::TransferOwner => "TRANSFER_OWNER",
            Self::Confirm => "CONFIRM",
            Self::Delete => "DELETE",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Skipped,
    Failed,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Success => "success",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
        })
    }
}

/// Final record for one object; `error` holds the skip reason or the
/// failure message as reported by the remote service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionResult {
    pub object: UcObject,
    pub step_reached: DeletionStep,
    pub outcome: Outcome,
    pub error: Option<String>,
}

impl DeletionResult {
    fn success(object: UcObject, step: DeletionStep) -> Self {
        Self {
            object,
            step_reached: step,
            outcome: Outcome::Success,
            error: None,
        }
    }

    fn skipped(object: UcObject, step: DeletionStep, reason: impl Into<String>) -> Self {
        Self {
            object,
            step_reached: step,
            outcome: Outcome::Skipped,
            error: Some(reason.into()),
        }
    }

    fn failed(object: UcObject, step: DeletionStep, error: impl Into<String>) -> Self {
        Self {
            object,
            step_reached: step,
            outcome: Outcome::Failed,
            error: Some(error.into()),
        }
    }
}

/// Per-object results, in selection order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeletionSummary {
    pub results: Vec<DeletionResult>,
    /// Set when the run was interrupted or aborted before it could finish
    pub stopped: Option<String>,
}

impl DeletionSummary {
    #[must_use]
    pub fn count(&self, outcome: Outcome) -> usize {
        self.results.iter().filter(|r| r.outcome == outcome).count()
    }

    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.count(Outcome::Success)
    }

    #[must_use]
    pub fn skipped(&self) -> usize {
        self.count(Outcome::Skipped)
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(Outcome::Failed)
    }

    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.failed() > 0
    }

    /// Failures, or a run cut short by Ctrl-C or an authentication error
    #[must_use]
    pub fn is_incomplete(&self) -> bool {
        self.has_failures() || self.stopped.is_some()
    }

    /// Result for `full_name`, if it was part of the run
    #[must_use]
    pub fn get(&self, full_name: &str) -> Option<&DeletionResult> {
        self.results.iter().find(|r| r.object.full_name() == full_name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteOptions {
    /// Skip CONFIRM
    pub yes: bool,
    /// Passed to schema deletes
    pub force: bool,
    /// Worker pool size; only used when nothing prompts
    pub parallel: usize,
}

impl Default for DeleteOptions {
    fn default() -> Self {
        Self {
            yes: false,
            force: false,
            parallel: 5,
        }
    }
}

impl DeleteOptions {
    // Prompts run one object at a time so questions follow selection order
    const fn pool_size(&self) -> usize {
        if self.yes { self.parallel } else { 1 }
    }
}

/// Why the remaining objects must not start
struct Stop {
    cancel: CancellationToken,
    abort: Mutex<Option<String>>,
}

impl Stop {
    fn new(cancel: &CancellationToken) -> Arc<Self> {
        Arc::new(Self {
            cancel: cancel.clone(),
            abort: Mutex::new(None),
        })
    }

    fn reason(&self) -> Option<String> {
        if let Some(reason) = self.abort.lock().clone() {
            return Some(reason);
        }
        self.cancel.is_cancelled().then(|| "interrupted".to_string())
    }

    fn check(&self, err: &GatewayError) {
        if err.is_fatal() {
            let mut abort = self.abort.lock();
            if abort.is_none() {
                *abort = Some(format!("aborted: {err}"));
            }
        }
    }
}

/// Run `work` for every object on a bounded pool. Objects start and report
/// in input order; those not started before a stop are recorded as skipped.
async fn run_pool<F, Fut>(
    objects: Vec<UcObject>,
    parallel: usize,
    stop: &Arc<Stop>,
    work: F,
) -> Vec<DeletionResult>
where
    F: Fn(UcObject) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = DeletionResult> + Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(parallel.max(1)));
    let work = Arc::new(work);
    let mut handles = Vec::with_capacity(objects.len());

    for object in objects {
        // Taken before spawning so objects start in input order; the
        // semaphore is never closed
        let permit = semaphore.clone().acquire_owned().await.ok();
        let stop = stop.clone();
        let work = work.clone();
        let task_object = object.clone();

        let handle = tokio::spawn(async move {
            let _permit = permit;
            if let Some(reason) = stop.reason() {
                return DeletionResult::skipped(task_object, DeletionStep::Preview, reason);
            }
            (*work)(task_object).await
        });
        handles.push((object, handle));
    }

    let mut results = Vec::with_capacity(handles.len());
    for (object, handle) in handles {
        results.push(match handle.await {
            Ok(result) => result,
            Err(e) => DeletionResult::failed(object, DeletionStep::Preview, format!("task failed: {e}")),
        });
    }
    results
}

/// TRANSFER_OWNER, CONFIRM and DELETE for one object
async fn delete_one(
    gateway: &dyn Gateway,
    console: &dyn Console,
    object: UcObject,
    principal: &str,
    yes: bool,
    force: bool,
    stop: &Stop,
) -> DeletionResult {
    let full_name = object.full_name();

    if let Err(err) = gateway.set_owner(&object, principal).await {
        warn!(object = %full_name, error = %err, "ownership transfer failed");
        stop.check(&err);
        return DeletionResult::failed(object, DeletionStep::TransferOwner, err.to_string());
    }
    info!(object = %full_name, owner = principal, "ownership transferred");

    if !yes && !console.confirm(&format!("Delete {} {full_name}?", object.kind)).await {
        info!(object = %full_name, "deletion declined");
        return DeletionResult::skipped(object, DeletionStep::Confirm, "declined");
    }

    match gateway.delete_object(&object, force).await {
        Ok(()) => {
            info!(object = %full_name, "deleted");
            DeletionResult::success(object, DeletionStep::Delete)
        }
        Err(err) => {
            warn!(object = %full_name, error = %err, "delete failed");
            stop.check(&err);
            DeletionResult::failed(object, DeletionStep::Delete, err.to_string())
        }
    }
}

async fn run_workflow(
    gateway: &Arc<dyn Gateway>,
    console: &Arc<dyn Console>,
    objects: Vec<UcObject>,
    principal: &str,
    opts: DeleteOptions,
    force: bool,
    stop: &Arc<Stop>,
) -> Vec<DeletionResult> {
    let gateway = gateway.clone();
    let console = console.clone();
    let principal = principal.to_string();
    let task_stop = stop.clone();

    run_pool(objects, opts.pool_size(), stop, move |object| {
        let gateway = gateway.clone();
        let console = console.clone();
        let principal = principal.clone();
        let stop = task_stop.clone();
        async move {
            delete_one(
                gateway.as_ref(),
                console.as_ref(),
                object,
                &principal,
                opts.yes,
                force,
                &stop,
            )
            .await
        }
    })
    .await
}

/// Delete the selected tables, each through its own step sequence.
///
/// # Errors
///
/// Returns an error only if the operator identity cannot be resolved; every
/// per-object failure is recorded in the summary instead.
pub async fn delete_tables(
    gateway: Arc<dyn Gateway>,
    console: Arc<dyn Console>,
    tables: Vec<UcObject>,
    opts: DeleteOptions,
    cancel: &CancellationToken,
) -> Result<DeletionSummary, GatewayError> {
    if tables.is_empty() {
        return Ok(DeletionSummary::default());
    }
    let principal = gateway.current_user().await?;
    console.preview("Objects to delete", &tables);

    let stop = Stop::new(cancel);
    let results = run_workflow(&gateway, &console, tables, &principal, opts, false, &stop).await;
    Ok(DeletionSummary {
        results,
        stopped: stop.reason(),
    })
}

/// Delete a schema after deleting the tables in it that pass `filter`.
///
/// The schema itself is only confirmed and deleted when every table
/// succeeded. Results list the tables first, then the schema.
///
/// # Errors
///
/// Returns an error if the operator identity cannot be resolved or the
/// schema's tables cannot be listed.
pub async fn delete_schema(
    gateway: Arc<dyn Gateway>,
    console: Arc<dyn Console>,
    schema: &SchemaName,
    filter: &TableFilter,
    opts: DeleteOptions,
    cancel: &CancellationToken,
) -> Result<DeletionSummary, GatewayError> {
    let principal = gateway.current_user().await?;
    let schema_object = UcObject::schema(&schema.catalog, &schema.schema, None);

    if let Err(err) = gateway.set_owner(&schema_object, &principal).await {
        warn!(%schema, error = %err, "schema ownership transfer failed");
        if err.is_fatal() {
            return Err(err);
        }
        return Ok(DeletionSummary {
            results: vec![DeletionResult::failed(
                schema_object,
                DeletionStep::TransferOwner,
                err.to_string(),
            )],
            stopped: None,
        });
    }
    info!(%schema, owner = %principal, "schema ownership transferred");

    let tables = enumerate::list_tables(gateway.as_ref(), schema, filter).await?;
    let mut candidates = tables.clone();
    candidates.push(schema_object.clone());
    console.preview(&format!("Objects to delete in {schema}"), &candidates);

    let stop = Stop::new(cancel);
    let mut results =
        run_workflow(&gateway, &console, tables, &principal, opts, false, &stop).await;

    let failed = results.iter().filter(|r| r.outcome == Outcome::Failed).count();
    let skipped = results.iter().filter(|r| r.outcome == Outcome::Skipped).count();

    let schema_result = if failed > 0 {
        DeletionResult::failed(
            schema_object,
            DeletionStep::TransferOwner,
            format!("{failed} table(s) not deleted"),
        )
    } else if let Some(reason) = stop.reason() {
        DeletionResult::skipped(schema_object, DeletionStep::TransferOwner, reason)
    } else if skipped > 0 {
        DeletionResult::skipped(
            schema_object,
            DeletionStep::TransferOwner,
            format!("{skipped} table(s) skipped"),
        )
    } else if !opts.yes
        && !console
            .confirm(&format!("Delete SCHEMA {schema} (force={})?", opts.force))
            .await
    {
        DeletionResult::skipped(schema_object, DeletionStep::Confirm, "declined")
    } else {
        match gateway.delete_object(&schema_object, opts.force).await {
            Ok(()) => {
                info!(%schema, "schema deleted");
                DeletionResult::success(schema_object, DeletionStep::Delete)
            }
            Err(err) => {
                warn!(%schema, error = %err, "schema delete failed");
                DeletionResult::failed(schema_object, DeletionStep::Delete, err.to_string())
            }
        }
    };

    results.push(schema_result);
    Ok(DeletionSummary {
        results,
        stopped: stop.reason(),
    })
}

/// Run the deletion workflow over schemas that are expected to be empty
///
/// # Errors
///
/// Returns an error only if the operator identity cannot be resolved.
pub async fn drop_empty_schemas(
    gateway: Arc<dyn Gateway>,
    console: Arc<dyn Console>,
    schemas: Vec<UcObject>,
    opts: DeleteOptions,
    cancel: &CancellationToken,
) -> Result<DeletionSummary, GatewayError> {
    if schemas.is_empty() {
        return Ok(DeletionSummary::default());
    }
    let principal = gateway.current_user().await?;
    console.preview("Empty schemas to drop", &schemas);

    let stop = Stop::new(cancel);
    let results =
        run_workflow(&gateway, &console, schemas, &principal, opts, opts.force, &stop).await;
    Ok(DeletionSummary {
        results,
        stopped: stop.reason(),
    })
}

/// Set the owner of every selected table; each change is independent
pub async fn set_tables_owner(
    gateway: Arc<dyn Gateway>,
    tables: Vec<UcObject>,
    principal: &str,
    parallel: usize,
    cancel: &CancellationToken,
) -> DeletionSummary {
    let stop = Stop::new(cancel);
    let task_stop = stop.clone();
    let principal = principal.to_string();

    let results = run_pool(tables, parallel, &stop, move |object| {
        let gateway = gateway.clone();
        let principal = principal.clone();
        let stop = task_stop.clone();
        async move {
            match gateway.set_owner(&object, &principal).await {
                Ok(()) => {
                    info!(object = %object, owner = %principal, "owner set");
                    DeletionResult::success(object, DeletionStep::TransferOwner)
                }
                Err(err) => {
                    warn!(object = %object, error = %err, "owner change failed");
                    stop.check(&err);
                    DeletionResult::failed(object, DeletionStep::TransferOwner, err.to_string())
                }
            }
        }
    })
    .await;

    DeletionSummary {
        results,
        stopped: stop.reason(),
    }
}
