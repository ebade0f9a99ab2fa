mod jobs;
mod run;
mod uc;

use crate::{
    config::Settings,
    console::Console,
    gateway::{DryRunGateway, Gateway},
    jobs::Selector,
    uc::{SchemaName, TableFilter},
};
use regex::Regex;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Options shared by every command
#[derive(Debug, Clone, Default)]
pub struct Globals {
    pub profile: Option<String>,
    pub verbosity: u8,
    pub settings: Settings,
}

/// Action enum representing each possible command
#[derive(Debug)]
pub enum Action {
    JobsFind {
        selector: Selector,
        refresh: bool,
    },
    JobsRun {
        selector: Selector,
        refresh: bool,
        dry_run: bool,
        watch: bool,
        all: bool,
        confirm: bool,
    },
    CatalogsList,
    SchemasList {
        catalog: String,
    },
    TablesList {
        schema: SchemaName,
        filter: TableFilter,
    },
    TablesDelete {
        schema: SchemaName,
        filter: TableFilter,
        all: bool,
        dry_run: bool,
        yes: bool,
    },
    SchemaDelete {
        schema: SchemaName,
        filter: TableFilter,
        force: bool,
        dry_run: bool,
        yes: bool,
    },
    TablesOwnerSet {
        schema: SchemaName,
        owner: String,
        filter: TableFilter,
        all: bool,
        dry_run: bool,
        yes: bool,
    },
    SchemasDropEmpty {
        catalog: String,
        name: Option<Regex>,
        all: bool,
        force: bool,
        dry_run: bool,
        yes: bool,
    },
}

/// Everything an action needs at run time
#[derive(Clone)]
pub struct Context {
    pub gateway: Arc<dyn Gateway>,
    pub console: Arc<dyn Console>,
    pub settings: Settings,
    pub cancel: CancellationToken,
}

impl Context {
    /// The gateway to mutate through; under dry-run, a recorder over it
    fn gateway_for(&self, dry_run: bool) -> (Arc<dyn Gateway>, Option<Arc<DryRunGateway>>) {
        if dry_run {
            let dry = Arc::new(DryRunGateway::new(self.gateway.clone()));
            let gateway: Arc<dyn Gateway> = dry.clone();
            (gateway, Some(dry))
        } else {
            (self.gateway.clone(), None)
        }
    }
}

impl Action {
    /// Execute the action against a live workspace
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be resolved or the action
    /// fails as a whole
    pub async fn execute(self, globals: &Globals, cancel: CancellationToken) -> anyhow::Result<u8> {
        run::execute(self, globals, cancel).await
    }

    /// Run the action in `ctx`, returning the process exit status
    ///
    /// # Errors
    ///
    /// Returns an error for environment-level failures; per-object failures
    /// only set the exit status
    pub async fn run(self, ctx: &Context) -> anyhow::Result<u8> {
        match self {
            Self::JobsFind { selector, refresh } => jobs::find(ctx, &selector, refresh).await,
            Self::JobsRun {
                selector,
                refresh,
                dry_run,
                watch,
                all,
                confirm,
            } => {
                let opts = jobs::RunOptions {
                    refresh,
                    dry_run,
                    watch,
                    all,
                    confirm,
                };
                jobs::run(ctx, &selector, opts).await
            }
            Self::CatalogsList => uc::catalogs_list(ctx).await,
            Self::SchemasList { catalog } => uc::schemas_list(ctx, &catalog).await,
            Self::TablesList { schema, filter } => uc::tables_list(ctx, &schema, &filter).await,
            Self::TablesDelete {
                schema,
                filter,
                all,
                dry_run,
                yes,
            } => uc::tables_delete(ctx, &schema, &filter, all, dry_run, yes).await,
            Self::SchemaDelete {
                schema,
                filter,
                force,
                dry_run,
                yes,
            } => uc::schema_delete(ctx, &schema, &filter, force, dry_run, yes).await,
            Self::TablesOwnerSet {
                schema,
                owner,
                filter,
                all,
                dry_run,
                yes,
            } => uc::tables_owner_set(ctx, &schema, &owner, &filter, all, dry_run, yes).await,
            Self::SchemasDropEmpty {
                catalog,
                name,
                all,
                force,
                dry_run,
                yes,
            } => {
                let opts = uc::DropOptions {
                    all,
                    force,
                    dry_run,
                    yes,
                };
                uc::schemas_drop_empty(ctx, &catalog, name.as_ref(), opts).await
            }
        }
    }
}
