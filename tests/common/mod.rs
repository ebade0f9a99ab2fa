#![allow(dead_code, clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use dbops::{
    cli::{
        actions::{Action, Context},
        commands, dispatch,
    },
    config::Settings,
    jobs::{Job, RetryPolicy},
    testing::{FakeGateway, ScriptedConsole},
    uc::{SchemaName, UcObject},
};
use std::{sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;

/// Settings with a fast poll loop so watch tests finish quickly
pub fn fast_settings() -> Settings {
    Settings {
        cache_ttl: Duration::from_secs(300),
        parallel: 5,
        poll: RetryPolicy {
            interval: Duration::from_millis(10),
            call_timeout: Duration::from_secs(1),
            max_attempts: 3,
        },
    }
}

pub fn context(gateway: Arc<FakeGateway>, console: Arc<ScriptedConsole>) -> Context {
    Context {
        gateway,
        console,
        settings: fast_settings(),
        cancel: CancellationToken::new(),
    }
}

/// Parse and dispatch a command line the way the binary does
pub fn action(args: &[&str]) -> anyhow::Result<Action> {
    let mut argv = vec!["dbops"];
    argv.extend_from_slice(args);
    let matches = commands::new().try_get_matches_from(argv).unwrap();
    dispatch::dispatch(&matches)
}

pub async fn run(ctx: &Context, args: &[&str]) -> anyhow::Result<u8> {
    action(args)?.run(ctx).await
}

pub fn jobs() -> Vec<Job> {
    vec![
        Job::new(1, "python-etl").with_tag("team", "data"),
        Job::new(2, "python-ml").with_tag("team", "ml"),
        Job::new(3, "java-batch").with_tag("team", "data"),
    ]
}

pub fn sales() -> SchemaName {
    "main.sales".parse().unwrap()
}

/// Catalog `main` with schema `sales` holding t1 and t2, plus the empty schema `main.old`
pub fn catalog_objects() -> Vec<UcObject> {
    let owner = Some("svc".to_string());
    vec![
        UcObject::catalog("main", owner.clone()),
        UcObject::schema("main", "sales", owner.clone()),
        UcObject::schema("main", "old", owner.clone()),
        UcObject::table(&sales(), "t1", owner.clone()),
        UcObject::table(&sales(), "t2", owner),
    ]
}
