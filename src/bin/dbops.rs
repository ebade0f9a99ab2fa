use dbops::{cli, error};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    match cli::start().await {
        Ok(status) => ExitCode::from(status),
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::from(error::exit_code(&err))
        }
    }
}
