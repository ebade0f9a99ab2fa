use super::{Action, Context, Globals};
use crate::{
    config,
    console::TerminalConsole,
    gateway::{DatabricksGateway, Gateway},
};
use anyhow::{Context as _, Result};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Resolve the connection context and build the REST gateway
fn connect(globals: &Globals) -> Result<Arc<dyn Gateway>> {
    let connection = config::resolve(globals.profile.as_deref())?;
    debug!(host = %connection.host, profile = ?connection.profile, "resolved connection");
    let gateway = DatabricksGateway::new(&connection, globals.settings.poll.call_timeout)
        .context("Failed to build HTTP client")?;
    Ok(Arc::new(gateway))
}

/// Execute the action's business logic against the configured workspace
pub async fn execute(action: Action, globals: &Globals, cancel: CancellationToken) -> Result<u8> {
    let ctx = Context {
        gateway: connect(globals)?,
        console: Arc::new(TerminalConsole::new()),
        settings: globals.settings,
        cancel,
    };
    action.run(&ctx).await
}
