use crate::{
    cli::actions::{Action, Globals},
    config::Settings,
    error::InputError,
    jobs::{RetryPolicy, Selector, search::compile},
    uc::{SchemaName, TableFilter, TypeFilter},
};
use anyhow::{Context, Result};
use clap::ArgMatches;
use std::time::Duration;

fn string(matches: &ArgMatches, id: &str) -> Option<String> {
    matches.get_one::<String>(id).cloned()
}

fn schema_name(matches: &ArgMatches) -> Result<SchemaName> {
    let raw = matches
        .get_one::<String>("schema")
        .ok_or_else(|| InputError::Missing("schema is required".to_string()))?;
    Ok(raw.parse::<SchemaName>()?)
}

fn selector(matches: &ArgMatches) -> Result<Selector> {
    let tags: Vec<&String> = matches.get_many::<String>("tag").unwrap_or_default().collect();
    let selector = Selector::build(
        matches.get_one::<String>("name").map(String::as_str),
        &tags,
        matches.get_flag("or"),
    )?;
    Ok(selector)
}

/// Extract the tuning knobs shared by every command
#[must_use]
pub fn globals(matches: &ArgMatches) -> Globals {
    let defaults = Settings::default();
    let secs = |id: &str, default: Duration| {
        matches
            .get_one::<u64>(id)
            .copied()
            .map_or(default, Duration::from_secs)
    };

    Globals {
        profile: string(matches, "profile"),
        verbosity: matches.get_count("verbose"),
        settings: Settings {
            cache_ttl: secs("cache-ttl", defaults.cache_ttl),
            parallel: matches
                .get_one::<u16>("parallel")
                .map_or(defaults.parallel, |n| usize::from(*n)),
            poll: RetryPolicy {
                interval: secs("poll-interval", defaults.poll.interval),
                call_timeout: secs("poll-timeout", defaults.poll.call_timeout),
                max_attempts: matches
                    .get_one::<u32>("poll-retries")
                    .copied()
                    .unwrap_or(defaults.poll.max_attempts),
            },
        },
    }
}

fn dispatch_jobs(matches: &ArgMatches) -> Result<Action> {
    match matches.subcommand() {
        Some(("find", m)) => Ok(Action::JobsFind {
            selector: selector(m)?,
            refresh: m.get_flag("refresh"),
        }),
        Some(("run", m)) => Ok(Action::JobsRun {
            selector: selector(m)?,
            refresh: m.get_flag("refresh"),
            dry_run: m.get_flag("dry-run"),
            watch: m.get_flag("watch"),
            all: m.get_flag("all"),
            confirm: !m.get_flag("no-confirm"),
        }),
        _ => Err(InputError::Missing("unknown jobs command".to_string()).into()),
    }
}

fn dispatch_uc(matches: &ArgMatches) -> Result<Action> {
    match matches.subcommand() {
        Some(("catalogs-list", _)) => Ok(Action::CatalogsList),
        Some(("schemas-list", m)) => Ok(Action::SchemasList {
            catalog: string(m, "catalog").context("catalog is required")?,
        }),
        Some(("tables-list", m)) => {
            let kind = m
                .get_one::<String>("type")
                .map(|k| k.parse::<TypeFilter>())
                .transpose()?;
            let filter = TableFilter::new(
                m.get_one::<String>("name").map(String::as_str),
                m.get_one::<String>("owner").map(String::as_str),
                kind,
            )?;
            Ok(Action::TablesList {
                schema: schema_name(m)?,
                filter,
            })
        }
        Some(("tables-delete", m)) => Ok(Action::TablesDelete {
            schema: schema_name(m)?,
            filter: TableFilter::new(m.get_one::<String>("name").map(String::as_str), None, None)?,
            all: m.get_flag("all"),
            dry_run: m.get_flag("dry-run"),
            yes: m.get_flag("yes"),
        }),
        Some(("schema-delete", m)) => Ok(Action::SchemaDelete {
            schema: schema_name(m)?,
            filter: TableFilter::new(m.get_one::<String>("name").map(String::as_str), None, None)?,
            force: m.get_flag("force"),
            dry_run: m.get_flag("dry-run"),
            yes: m.get_flag("yes"),
        }),
        Some(("tables-owner-set", m)) => Ok(Action::TablesOwnerSet {
            schema: schema_name(m)?,
            owner: string(m, "owner")
                .ok_or_else(|| InputError::Missing("owner is required".to_string()))?,
            filter: TableFilter::new(m.get_one::<String>("name").map(String::as_str), None, None)?,
            all: m.get_flag("all"),
            dry_run: m.get_flag("dry-run"),
            yes: m.get_flag("yes"),
        }),
        Some(("schemas-drop-empty", m)) => Ok(Action::SchemasDropEmpty {
            catalog: string(m, "catalog").context("catalog is required")?,
            name: m
                .get_one::<String>("name")
                .map(String::as_str)
                .map(compile)
                .transpose()?,
            all: m.get_flag("all"),
            force: m.get_flag("force"),
            dry_run: m.get_flag("dry-run"),
            yes: m.get_flag("yes"),
        }),
        _ => Err(InputError::Missing("unknown uc command".to_string()).into()),
    }
}

/// Convert `ArgMatches` into typed Action enum with validation
///
/// # Errors
///
/// Returns an input error if a pattern, tag, schema name or object kind is
/// invalid, so the command fails before any remote call
pub fn dispatch(matches: &ArgMatches) -> Result<Action> {
    match matches.subcommand() {
        Some(("jobs", m)) => dispatch_jobs(m),
        Some(("uc", m)) => dispatch_uc(m),
        _ => Err(InputError::Missing("a command is required".to_string()).into()),
    }
}
