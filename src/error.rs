use crate::{gateway::GatewayError, jobs::SelectorError};
use thiserror::Error;

/// Exit code for a command that completed successfully
pub const EXIT_OK: u8 = 0;
/// Exit code for runtime and API failures
pub const EXIT_FAILURE: u8 = 1;
/// Exit code for invalid input or missing arguments
pub const EXIT_USAGE: u8 = 2;

/// Operator input that cannot be acted on
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
    #[error("schema must be in the form `catalog.schema`, got '{0}'")]
    SchemaName(String),

    #[error("unknown object type '{0}' (expected table, view or a table type such as MANAGED or EXTERNAL)")]
    UnknownKind(String),

    #[error("{0}")]
    Missing(String),
}

/// Map an error chain onto the documented exit codes.
///
/// Selector and input errors are the operator's to fix (2); anything else,
/// authentication included, is a runtime failure (1).
#[must_use]
pub fn exit_code(err: &anyhow::Error) -> u8 {
    for cause in err.chain() {
        if cause.downcast_ref::<InputError>().is_some()
            || cause.downcast_ref::<SelectorError>().is_some()
        {
            return EXIT_USAGE;
        }
        if cause.downcast_ref::<GatewayError>().is_some() {
            return EXIT_FAILURE;
        }
    }
    EXIT_FAILURE
}
