use super::Context;
use crate::{
    error::{EXIT_FAILURE, EXIT_OK},
    gateway::DryRunGateway,
    output,
    uc::{
        DeleteOptions, DeletionSummary, SchemaName, TableFilter, UcObject, delete_schema,
        delete_tables, drop_empty_schemas, find_empty_schemas, list_catalogs, list_schemas,
        list_tables, set_tables_owner,
    },
};
use anyhow::{Context as _, Result};
use regex::Regex;
use std::sync::Arc;
use tracing::warn;

#[derive(Debug, Clone, Copy)]
pub struct DropOptions {
    pub all: bool,
    pub force: bool,
    pub dry_run: bool,
    pub yes: bool,
}

/// Every object with `all`, otherwise the operator's pick
async fn choose(ctx: &Context, title: &str, objects: Vec<UcObject>, all: bool) -> Vec<UcObject> {
    if all {
        return objects;
    }
    let labels: Vec<String> = objects.iter().map(UcObject::full_name).collect();
    let picked = ctx.console.select(title, &labels).await;
    objects
        .into_iter()
        .enumerate()
        .filter(|(i, _)| picked.contains(i))
        .map(|(_, object)| object)
        .collect()
}

fn finish(summary: &DeletionSummary, recorder: Option<Arc<DryRunGateway>>) -> u8 {
    output::summary_table(summary);
    if let Some(recorder) = recorder {
        output::planned_actions(&recorder.planned());
    }
    if let Some(reason) = &summary.stopped {
        warn!(reason = %reason, "stopped before every object was processed");
    }
    if summary.is_incomplete() {
        EXIT_FAILURE
    } else {
        EXIT_OK
    }
}

fn delete_options(ctx: &Context, yes: bool, force: bool) -> DeleteOptions {
    DeleteOptions {
        yes,
        force,
        parallel: ctx.settings.parallel,
    }
}

pub async fn catalogs_list(ctx: &Context) -> Result<u8> {
    let catalogs = list_catalogs(ctx.gateway.as_ref())
        .await
        .context("Failed to list catalogs")?;
    if catalogs.is_empty() {
        println!("No catalogs found.");
    } else {
        output::objects_table("Catalogs", &catalogs);
    }
    Ok(EXIT_OK)
}

pub async fn schemas_list(ctx: &Context, catalog: &str) -> Result<u8> {
    let schemas = list_schemas(ctx.gateway.as_ref(), catalog)
        .await
        .with_context(|| format!("Failed to list schemas of catalog '{catalog}'"))?;
    if schemas.is_empty() {
        println!("No schemas found.");
    } else {
        output::objects_table(&format!("Schemas in {catalog}"), &schemas);
    }
    Ok(EXIT_OK)
}

async fn tables_of(ctx: &Context, schema: &SchemaName, filter: &TableFilter) -> Result<Vec<UcObject>> {
    list_tables(ctx.gateway.as_ref(), schema, filter)
        .await
        .with_context(|| format!("Failed to list tables of schema '{schema}'"))
}

pub async fn tables_list(ctx: &Context, schema: &SchemaName, filter: &TableFilter) -> Result<u8> {
    let tables = tables_of(ctx, schema, filter).await?;
    if tables.is_empty() {
        println!("No tables found.");
    } else {
        output::objects_table(&format!("Tables in {schema}"), &tables);
    }
    Ok(EXIT_OK)
}

pub async fn tables_delete(
    ctx: &Context,
    schema: &SchemaName,
    filter: &TableFilter,
    all: bool,
    dry_run: bool,
    yes: bool,
) -> Result<u8> {
    let tables = tables_of(ctx, schema, filter).await?;
    if tables.is_empty() {
        println!("No tables found.");
        return Ok(EXIT_OK);
    }
    let selected = choose(ctx, "Select tables to delete", tables, all).await;
    if selected.is_empty() {
        println!("Nothing selected.");
        return Ok(EXIT_OK);
    }

    let (gateway, recorder) = ctx.gateway_for(dry_run);
    let summary = delete_tables(
        gateway,
        ctx.console.clone(),
        selected,
        delete_options(ctx, yes, false),
        &ctx.cancel,
    )
    .await
    .context("Failed to delete tables")?;
    Ok(finish(&summary, recorder))
}

pub async fn schema_delete(
    ctx: &Context,
    schema: &SchemaName,
    filter: &TableFilter,
    force: bool,
    dry_run: bool,
    yes: bool,
) -> Result<u8> {
    let (gateway, recorder) = ctx.gateway_for(dry_run);
    let summary = delete_schema(
        gateway,
        ctx.console.clone(),
        schema,
        filter,
        delete_options(ctx, yes, force),
        &ctx.cancel,
    )
    .await
    .with_context(|| format!("Failed to delete schema '{schema}'"))?;
    Ok(finish(&summary, recorder))
}

pub async fn tables_owner_set(
    ctx: &Context,
    schema: &SchemaName,
    owner: &str,
    filter: &TableFilter,
    all: bool,
    dry_run: bool,
    yes: bool,
) -> Result<u8> {
    let tables = tables_of(ctx, schema, filter).await?;
    if tables.is_empty() {
        println!("No tables found.");
        return Ok(EXIT_OK);
    }
    let selected = choose(ctx, "Select tables to change owner", tables, all).await;
    if selected.is_empty() {
        println!("Nothing selected.");
        return Ok(EXIT_OK);
    }
    if !yes
        && !ctx
            .console
            .confirm(&format!("Set owner of {} table(s) to {owner}?", selected.len()))
            .await
    {
        println!("Aborted.");
        return Ok(EXIT_OK);
    }

    let (gateway, recorder) = ctx.gateway_for(dry_run);
    let summary =
        set_tables_owner(gateway, selected, owner, ctx.settings.parallel, &ctx.cancel).await;
    Ok(finish(&summary, recorder))
}

pub async fn schemas_drop_empty(
    ctx: &Context,
    catalog: &str,
    name: Option<&Regex>,
    opts: DropOptions,
) -> Result<u8> {
    let schemas = find_empty_schemas(ctx.gateway.as_ref(), catalog, name)
        .await
        .with_context(|| format!("Failed to find empty schemas in catalog '{catalog}'"))?;
    if schemas.is_empty() {
        println!("No empty schemas found.");
        return Ok(EXIT_OK);
    }
    let selected = choose(ctx, "Select schemas to drop", schemas, opts.all).await;
    if selected.is_empty() {
        println!("Nothing selected.");
        return Ok(EXIT_OK);
    }

    let (gateway, recorder) = ctx.gateway_for(opts.dry_run);
    let summary = drop_empty_schemas(
        gateway,
        ctx.console.clone(),
        selected,
        delete_options(ctx, opts.yes, opts.force),
        &ctx.cancel,
    )
    .await
    .context("Failed to drop schemas")?;
    Ok(finish(&summary, recorder))
}
