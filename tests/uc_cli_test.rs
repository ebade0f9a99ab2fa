#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, clippy::indexing_slicing)]

mod common;

use common::*;
use dbops::{
    error::{EXIT_FAILURE, EXIT_OK, EXIT_USAGE, exit_code},
    gateway::GatewayError,
    testing::{Call, FakeGateway, ScriptedConsole},
};
use std::sync::Arc;

fn workspace() -> Arc<FakeGateway> {
    Arc::new(FakeGateway::new().with_objects(catalog_objects()))
}

#[tokio::test]
async fn test_listings_are_read_only() {
    let fake = workspace();
    let ctx = context(fake.clone(), Arc::new(ScriptedConsole::always(true)));

    assert_eq!(run(&ctx, &["uc", "catalogs-list"]).await.unwrap(), EXIT_OK);
    assert_eq!(
        run(&ctx, &["uc", "schemas-list", "--catalog", "main"]).await.unwrap(),
        EXIT_OK
    );
    assert_eq!(
        run(&ctx, &["uc", "tables-list", "--schema", "main.sales", "--owner", "svc"])
            .await
            .unwrap(),
        EXIT_OK
    );
    assert_eq!(fake.mutation_count(), 0);
}

#[tokio::test]
async fn test_missing_catalog_is_an_error() {
    let ctx = context(workspace(), Arc::new(ScriptedConsole::always(true)));
    let err = run(&ctx, &["uc", "schemas-list", "--catalog", "nope"])
        .await
        .unwrap_err();
    assert_eq!(exit_code(&err), EXIT_FAILURE);
}

#[tokio::test]
async fn test_tables_delete_both_confirmed() {
    let fake = workspace();
    let console = Arc::new(ScriptedConsole::answers(vec![true, true]));
    let ctx = context(fake.clone(), console.clone());

    let status = run(&ctx, &["uc", "tables-delete", "--schema", "main.sales", "--all"])
        .await
        .unwrap();
    assert_eq!(status, EXIT_OK);
    assert_eq!(fake.owner_changes(), vec!["main.sales.t1", "main.sales.t2"]);
    assert_eq!(fake.deleted(), vec!["main.sales.t1", "main.sales.t2"]);
    assert_eq!(
        console.questions(),
        vec!["Delete TABLE main.sales.t1?", "Delete TABLE main.sales.t2?"]
    );
}

#[tokio::test]
async fn test_tables_delete_invalid_schema() {
    let err = action(&["uc", "tables-delete", "--schema", "sales"]).unwrap_err();
    assert_eq!(exit_code(&err), EXIT_USAGE);
}

#[tokio::test]
async fn test_schema_delete_keeps_schema_when_a_table_fails() {
    let fake = Arc::new(
        FakeGateway::new()
            .with_objects(catalog_objects())
            .fail_delete(
                "main.sales.t2",
                GatewayError::Api {
                    status: 400,
                    code: Some("TABLE_LOCKED".to_string()),
                    message: "table is locked".to_string(),
                },
            ),
    );
    let ctx = context(fake.clone(), Arc::new(ScriptedConsole::always(true)));

    let status = run(&ctx, &["uc", "schema-delete", "main.sales"]).await.unwrap();
    assert_eq!(status, EXIT_FAILURE);
    assert!(fake.deleted().contains(&"main.sales.t1".to_string()));
    assert!(!fake.deleted().contains(&"main.sales".to_string()));
}

#[tokio::test]
async fn test_schema_delete_removes_schema_last() {
    let fake = workspace();
    let ctx = context(fake.clone(), Arc::new(ScriptedConsole::always(true)));

    let status = run(&ctx, &["uc", "schema-delete", "main.sales", "--force", "--yes"])
        .await
        .unwrap();
    assert_eq!(status, EXIT_OK);

    let deleted = fake.deleted();
    assert_eq!(deleted.len(), 3);
    assert_eq!(deleted[2], "main.sales");
    assert!(fake.calls().contains(&Call::Delete {
        object: "main.sales".to_string(),
        force: true,
    }));
}

#[tokio::test]
async fn test_dry_run_schema_delete_mutates_nothing() {
    let fake = workspace();
    let console = Arc::new(ScriptedConsole::always(true));
    let ctx = context(fake.clone(), console.clone());

    let status = run(&ctx, &["uc", "schema-delete", "main.sales", "--dry-run"])
        .await
        .unwrap();
    assert_eq!(status, EXIT_OK);
    assert_eq!(fake.mutation_count(), 0);
    // Confirmations still run so the plan mirrors a live run
    assert_eq!(console.questions().len(), 3);
}

#[tokio::test]
async fn test_auth_failure_aborts_remaining_tables() {
    let fake = Arc::new(
        FakeGateway::new()
            .with_objects(catalog_objects())
            .fail_set_owner("main.sales.t1", GatewayError::Auth("token expired".to_string())),
    );
    let ctx = context(fake.clone(), Arc::new(ScriptedConsole::always(true)));

    let status = run(&ctx, &["uc", "tables-delete", "--schema", "main.sales", "--all"])
        .await
        .unwrap();
    assert_eq!(status, EXIT_FAILURE);
    assert_eq!(fake.owner_changes(), vec!["main.sales.t1"]);
    assert!(fake.deleted().is_empty());
}

#[tokio::test]
async fn test_tables_owner_set() {
    let fake = workspace();
    let console = Arc::new(ScriptedConsole::always(true));
    let ctx = context(fake.clone(), console.clone());

    let status = run(
        &ctx,
        &["uc", "tables-owner-set", "--schema", "main.sales", "--owner", "data-team", "--all"],
    )
    .await
    .unwrap();
    assert_eq!(status, EXIT_OK);
    assert_eq!(console.questions(), vec!["Set owner of 2 table(s) to data-team?"]);
    assert!(fake.calls().contains(&Call::SetOwner {
        object: "main.sales.t2".to_string(),
        principal: "data-team".to_string(),
    }));
    assert!(fake.deleted().is_empty());
}

#[tokio::test]
async fn test_schemas_drop_empty_only_touches_empty_schemas() {
    let fake = workspace();
    let ctx = context(fake.clone(), Arc::new(ScriptedConsole::always(true)));

    let status = run(&ctx, &["uc", "schemas-drop-empty", "--catalog", "main", "--all", "--yes"])
        .await
        .unwrap();
    assert_eq!(status, EXIT_OK);
    assert_eq!(fake.deleted(), vec!["main.old"]);
}

#[tokio::test]
async fn test_interrupted_deletion_exits_with_failure() {
    let fake = workspace();
    let ctx = context(fake.clone(), Arc::new(ScriptedConsole::always(true)));
    ctx.cancel.cancel();

    let status = run(&ctx, &["uc", "tables-delete", "--schema", "main.sales", "--all"])
        .await
        .unwrap();
    assert_eq!(status, EXIT_FAILURE);
    assert_eq!(fake.mutation_count(), 0);
}
