use super::{Gateway, GatewayError};
use crate::{
    jobs::{Job, JobId, RunHandle, RunId, RunState},
    uc::UcObject,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::{fmt, sync::Arc};
use tracing::info;

/// A mutation that was intercepted instead of sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannedAction {
    TriggerRun { job_id: JobId },
    SetOwner { object: String, principal: String },
    Delete { object: String, force: bool },
}

impl fmt::Display for PlannedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TriggerRun { job_id } => write!(f, "would trigger a run of job {job_id}"),
            Self::SetOwner { object, principal } => {
                write!(f, "would set owner of {object} to {principal}")
            }
            Self::Delete { object, force: true } => write!(f, "would force-delete {object}"),
            Self::Delete { object, .. } => write!(f, "would delete {object}"),
        }
    }
}

/// Passes reads through and records mutations without performing them
pub struct DryRunGateway {
    inner: Arc<dyn Gateway>,
    planned: Mutex<Vec<PlannedAction>>,
}

impl DryRunGateway {
    #[must_use]
    pub fn new(inner: Arc<dyn Gateway>) -> Self {
        Self {
            inner,
            planned: Mutex::new(Vec::new()),
        }
    }

    /// Every intercepted mutation, in the order it was requested
    #[must_use]
    pub fn planned(&self) -> Vec<PlannedAction> {
        self.planned.lock().clone()
    }

    fn record(&self, action: PlannedAction) {
        info!(%action, "dry-run");
        self.planned.lock().push(action);
    }
}

#[async_trait]
impl Gateway for DryRunGateway {
    async fn list_jobs(&self) -> Result<Vec<Job>, GatewayError> {
        self.inner.list_jobs().await
    }

    async fn trigger_run(&self, job_id: JobId) -> Result<RunHandle, GatewayError> {
        self.record(PlannedAction::TriggerRun { job_id });
        Ok(RunHandle::simulated(job_id))
    }

    async fn get_run_state(&self, run_id: RunId) -> Result<RunState, GatewayError> {
        self.inner.get_run_state(run_id).await
    }

    async fn current_user(&self) -> Result<String, GatewayError> {
        self.inner.current_user().await
    }

    async fn list_catalogs(&self) -> Result<Vec<UcObject>, GatewayError> {
        self.inner.list_catalogs().await
    }

    async fn list_schemas(&self, catalog: &str) -> Result<Vec<UcObject>, GatewayError> {
        self.inner.list_schemas(catalog).await
    }

    async fn list_tables(
        &self,
        catalog: &str,
        schema: &str,
    ) -> Result<Vec<UcObject>, GatewayError> {
        self.inner.list_tables(catalog, schema).await
    }

    async fn set_owner(&self, object: &UcObject, principal: &str) -> Result<(), GatewayError> {
        self.record(PlannedAction::SetOwner {
            object: object.full_name(),
            principal: principal.to_string(),
        });
        Ok(())
    }

    async fn delete_object(&self, object: &UcObject, force: bool) -> Result<(), GatewayError> {
        self.record(PlannedAction::Delete {
            object: object.full_name(),
            force,
        });
        Ok(())
    }
}
