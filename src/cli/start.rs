use super::{commands, dispatch, telemetry};
use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Cancel `token` on the first Ctrl-C; a second one exits right away
fn install_interrupt(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        warn!("interrupted, finishing the current step (Ctrl-C again to quit)");
        token.cancel();
        if tokio::signal::ctrl_c().await.is_ok() {
            std::process::exit(130);
        }
    });
}

/// Main orchestrator - Pure orchestration with no business logic
///
/// Five-step data flow:
/// 1. Parse: Extract CLI arguments
/// 2. Extract Verbosity: Convert flag count to logging level
/// 3. Initialize Telemetry: Set up structured logging/tracing
/// 4. Dispatch: Convert `ArgMatches` into typed Action enum
/// 5. Execute: Run the action's business logic
///
/// Returns the process exit status.
///
/// # Errors
///
/// Returns an error if any step in the flow fails
pub async fn start() -> Result<u8> {
    // 1. Parse: Extract CLI arguments
    let matches = commands::new().get_matches();

    // 2. Extract Verbosity
    let globals = dispatch::globals(&matches);

    // 3. Initialize Telemetry
    telemetry::init(globals.verbosity)?;

    // 4. Dispatch: Convert ArgMatches into typed Action enum
    let action = dispatch::dispatch(&matches)?;

    // 5. Execute: Run the action's business logic
    let cancel = CancellationToken::new();
    install_interrupt(cancel.clone());
    action.execute(&globals, cancel).await
}
