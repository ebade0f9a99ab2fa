//! Boundary to the remote job scheduler and catalog service
//!
//! # Module Organization
//!
//! - `databricks` - REST implementation over `reqwest`
//! - `dry_run` - wrapper that turns every mutation into a recorded no-op

pub mod databricks;
pub mod dry_run;

pub use databricks::DatabricksGateway;
pub use dry_run::{DryRunGateway, PlannedAction};

use crate::{
    jobs::{Job, JobId, RunHandle, RunId, RunState},
    uc::UcObject,
};
use async_trait::async_trait;
use thiserror::Error;

/// Errors reported by the remote services
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("{message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("request timed out after {0}s")]
    Timeout(u64),

    #[error("unexpected response: {0}")]
    Decode(String),
}

impl GatewayError {
    /// Errors that abort the whole command instead of a single object
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Auth(_))
    }
}

/// Operations the core consumes from the platform
#[async_trait]
pub trait Gateway: Send + Sync {
    /// All jobs visible to the operator, in listing order
    async fn list_jobs(&self) -> Result<Vec<Job>, GatewayError>;

    /// Trigger one run of a job
    async fn trigger_run(&self, job_id: JobId) -> Result<RunHandle, GatewayError>;

    /// Current state of a run
    async fn get_run_state(&self, run_id: RunId) -> Result<RunState, GatewayError>;

    /// Identity of the invoking operator, used as the new owner before deletes
    async fn current_user(&self) -> Result<String, GatewayError>;

    async fn list_catalogs(&self) -> Result<Vec<UcObject>, GatewayError>;

    async fn list_schemas(&self, catalog: &str) -> Result<Vec<UcObject>, GatewayError>;

    async fn list_tables(&self, catalog: &str, schema: &str)
    -> Result<Vec<UcObject>, GatewayError>;

    async fn set_owner(&self, object: &UcObject, principal: &str) -> Result<(), GatewayError>;

    /// Delete an object. `force` only applies to schemas and catalogs.
    async fn delete_object(&self, object: &UcObject, force: bool) -> Result<(), GatewayError>;
}
