use clap::{
    Arg, ArgAction, ColorChoice, Command,
    builder::styling::{AnsiColor, Effects, Styles},
};

fn name_arg(help: &'static str) -> Arg {
    Arg::new("name")
        .help(help)
        .long("name")
        .value_name("REGEX")
}

fn dry_run_arg() -> Arg {
    Arg::new("dry-run")
        .action(ArgAction::SetTrue)
        .help("Report what would change without changing anything")
        .long("dry-run")
}

fn yes_arg() -> Arg {
    Arg::new("yes")
        .action(ArgAction::SetTrue)
        .help("Do not ask for confirmation")
        .long("yes")
        .short('y')
}

fn all_arg() -> Arg {
    Arg::new("all")
        .action(ArgAction::SetTrue)
        .help("Select every match instead of choosing interactively")
        .long("all")
}

fn force_arg() -> Arg {
    Arg::new("force")
        .action(ArgAction::SetTrue)
        .help("Pass force to the schema delete call")
        .long("force")
}

fn schema_arg() -> Arg {
    Arg::new("schema")
        .help("Schema as catalog.schema")
        .long("schema")
        .short('s')
        .value_name("CATALOG.SCHEMA")
        .required(true)
}

fn selector_args(cmd: Command) -> Command {
    cmd.arg(name_arg("Regex matched against job names (case-sensitive)").short('m'))
        .arg(
            Arg::new("tag")
                .action(ArgAction::Append)
                .help("Tag selector, repeatable")
                .long("tag")
                .short('t')
                .value_name("KEY=VALUE"),
        )
        .arg(
            Arg::new("or")
                .action(ArgAction::SetTrue)
                .help("Match any selector instead of all")
                .long("or"),
        )
        .arg(
            Arg::new("refresh")
                .action(ArgAction::SetTrue)
                .help("Ignore the cached job listing")
                .long("refresh"),
        )
}

fn jobs() -> Command {
    Command::new("jobs")
        .about("Find, launch and watch jobs")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(selector_args(Command::new("find").about("List jobs matching the selectors")))
        .subcommand(
            selector_args(Command::new("run").about("Trigger one run per selected job"))
                .arg(dry_run_arg())
                .arg(all_arg())
                .arg(
                    Arg::new("watch")
                        .action(ArgAction::SetTrue)
                        .help("Block until every run is terminal")
                        .long("watch")
                        .short('w'),
                )
                .arg(
                    Arg::new("no-confirm")
                        .action(ArgAction::SetTrue)
                        .help("Launch without asking")
                        .long("no-confirm"),
                ),
        )
}

fn uc() -> Command {
    Command::new("uc")
        .about("Unity Catalog listing and safe deletion")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(Command::new("catalogs-list").about("List catalogs"))
        .subcommand(
            Command::new("schemas-list").about("List schemas of a catalog").arg(
                Arg::new("catalog")
                    .help("Catalog name")
                    .long("catalog")
                    .short('c')
                    .required(true),
            ),
        )
        .subcommand(
            Command::new("tables-list")
                .about("List tables of a schema")
                .arg(schema_arg())
                .arg(name_arg("Regex matched against full table names"))
                .arg(
                    Arg::new("owner")
                        .help("Exact owner principal")
                        .long("owner")
                        .value_name("PRINCIPAL"),
                )
                .arg(
                    Arg::new("type")
                        .help("Kind (table, view) or exact table type (MANAGED, EXTERNAL, ...)")
                        .long("type")
                        .value_name("KIND"),
                ),
        )
        .subcommand(
            Command::new("tables-delete")
                .about("Take ownership of and delete selected tables")
                .arg(schema_arg())
                .arg(name_arg("Regex matched against full table names"))
                .arg(all_arg())
                .arg(dry_run_arg())
                .arg(yes_arg()),
        )
        .subcommand(
            Command::new("schema-delete")
                .about("Delete every table of a schema, then the schema")
                .arg(
                    Arg::new("schema")
                        .help("Schema as catalog.schema")
                        .value_name("CATALOG.SCHEMA")
                        .required(true),
                )
                .arg(name_arg("Only consider tables whose full name matches"))
                .arg(force_arg())
                .arg(dry_run_arg())
                .arg(yes_arg()),
        )
        .subcommand(
            Command::new("tables-owner-set")
                .about("Change the owner of selected tables")
                .arg(schema_arg())
                .arg(
                    Arg::new("owner")
                        .help("New owner principal")
                        .long("owner")
                        .value_name("PRINCIPAL")
                        .required(true),
                )
                .arg(name_arg("Regex matched against full table names"))
                .arg(all_arg())
                .arg(dry_run_arg())
                .arg(yes_arg()),
        )
        .subcommand(
            Command::new("schemas-drop-empty")
                .about("Delete schemas that hold no tables")
                .arg(
                    Arg::new("catalog")
                        .help("Catalog name")
                        .long("catalog")
                        .short('c')
                        .required(true),
                )
                .arg(name_arg("Regex matched against full schema names"))
                .arg(all_arg())
                .arg(force_arg())
                .arg(dry_run_arg())
                .arg(yes_arg()),
        )
}

/// Pure clap command definitions with zero business logic
#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    Command::new(env!("CARGO_PKG_NAME"))
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("profile")
                .env("DATABRICKS_CONFIG_PROFILE")
                .global(true)
                .help("Profile from ~/.databrickscfg")
                .long("profile")
                .short('p'),
        )
        .arg(
            Arg::new("verbose")
                .action(ArgAction::Count)
                .global(true)
                .help("Increase log verbosity (-v info, -vv debug, -vvv trace)")
                .long("verbose")
                .short('v'),
        )
        .arg(
            Arg::new("cache-ttl")
                .default_value("300")
                .env("DBOPS_JOBS_CACHE_TTL")
                .global(true)
                .help("Seconds a job listing stays fresh, 0 disables reuse")
                .long("cache-ttl")
                .value_name("SECONDS")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("parallel")
                .default_value("5")
                .env("DBOPS_PARALLEL")
                .global(true)
                .help("Maximum concurrent remote calls")
                .long("parallel")
                .short('n')
                .value_parser(clap::value_parser!(u16).range(1..)),
        )
        .arg(
            Arg::new("poll-interval")
                .default_value("5")
                .env("DBOPS_POLL_INTERVAL")
                .global(true)
                .help("Seconds between run state polls")
                .long("poll-interval")
                .value_name("SECONDS")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new("poll-timeout")
                .default_value("30")
                .env("DBOPS_POLL_TIMEOUT")
                .global(true)
                .help("Timeout in seconds for a single remote call")
                .long("poll-timeout")
                .value_name("SECONDS")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new("poll-retries")
                .default_value("3")
                .env("DBOPS_POLL_RETRIES")
                .global(true)
                .help("Consecutive failed polls before a run is marked FAILED")
                .long("poll-retries")
                .value_parser(clap::value_parser!(u32).range(1..)),
        )
        .subcommand(jobs())
        .subcommand(uc())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    #[test]
    fn test_new() {
        let cmd = new();
        assert_eq!(cmd.get_name(), "dbops");
        assert_eq!(
            cmd.get_about().unwrap().to_string(),
            env!("CARGO_PKG_DESCRIPTION")
        );
        assert_eq!(
            cmd.get_version().unwrap().to_string(),
            env!("CARGO_PKG_VERSION")
        );
        new().debug_assert();
    }

    #[test]
    fn test_new_no_args() {
        assert!(new().try_get_matches_from(vec!["dbops"]).is_err());
    }

    #[test]
    fn test_jobs_run_flags() {
        let m = new()
            .try_get_matches_from(vec![
                "dbops", "jobs", "run", "--name", "python.*", "--tag", "team=data", "--tag",
                "env=prod", "--dry-run", "--watch", "-n", "2",
            ])
            .unwrap();
        let (name, sub) = m.subcommand().unwrap();
        assert_eq!(name, "jobs");
        let (name, run) = sub.subcommand().unwrap();
        assert_eq!(name, "run");
        assert_eq!(run.get_one::<String>("name").unwrap(), "python.*");
        let tags: Vec<_> = run.get_many::<String>("tag").unwrap().collect();
        assert_eq!(tags, vec!["team=data", "env=prod"]);
        assert!(run.get_flag("dry-run"));
        assert!(run.get_flag("watch"));
        assert_eq!(run.get_one::<u16>("parallel").copied(), Some(2));
    }

    #[test]
    fn test_global_defaults() {
        let m = new()
            .try_get_matches_from(vec!["dbops", "uc", "catalogs-list"])
            .unwrap();
        assert_eq!(m.get_one::<u64>("poll-interval").copied(), Some(5));
        assert_eq!(m.get_one::<u64>("poll-timeout").copied(), Some(30));
        assert_eq!(m.get_one::<u32>("poll-retries").copied(), Some(3));
        assert_eq!(m.get_count("verbose"), 0);
    }

    #[test]
    fn test_schema_delete_positional() {
        let m = new()
            .try_get_matches_from(vec!["dbops", "-vv", "uc", "schema-delete", "main.sales", "--force"])
            .unwrap();
        assert_eq!(m.get_count("verbose"), 2);
        let (_, uc) = m.subcommand().unwrap();
        let (name, delete) = uc.subcommand().unwrap();
        assert_eq!(name, "schema-delete");
        assert_eq!(delete.get_one::<String>("schema").unwrap(), "main.sales");
        assert!(delete.get_flag("force"));
        assert!(!delete.get_flag("dry-run"));
    }

    #[test]
    fn test_required_arguments() {
        for args in [
            vec!["dbops", "uc", "schemas-list"],
            vec!["dbops", "uc", "tables-list"],
            vec!["dbops", "uc", "tables-owner-set", "--schema", "main.sales"],
            vec!["dbops", "uc", "schema-delete"],
        ] {
            assert!(new().try_get_matches_from(&args).is_err(), "{args:?}");
        }
    }

    #[test]
    fn test_parallel_must_be_positive() {
        assert!(
            new()
                .try_get_matches_from(vec!["dbops", "-n", "0", "uc", "catalogs-list"])
                .is_err()
        );
    }
}
