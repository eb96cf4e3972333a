use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

/// Command-line arguments for the feedline binary.
#[derive(Debug, Parser)]
#[command(
    name = "feedline",
    version,
    about = "Timeline assembly over a fixture social graph"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "FEEDLINE_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: SettingsOverrides,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Print one page of an account's home timeline as JSON.
    Home(HomeArgs),
    /// Print one page of the public timeline as JSON.
    Public(PublicArgs),
    /// Print the filter results a viewer gets for one status.
    Filters(FiltersArgs),
    /// Fill every account's home timeline, then run one sweep pass and print the pruned count.
    Sweep(SweepArgs),
}

#[derive(Debug, Args, Clone)]
pub struct FixtureArg {
    /// TOML fixture describing accounts, statuses and relationships.
    #[arg(long, value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub fixture: PathBuf,
}

#[derive(Debug, Args, Default, Clone)]
pub struct PageArgs {
    /// Return statuses older than this id.
    #[arg(long = "max-id", value_name = "ID")]
    pub max_id: Option<String>,

    /// Return statuses immediately newer than this id.
    #[arg(long = "min-id", value_name = "ID")]
    pub min_id: Option<String>,

    /// Return the newest statuses down to this id.
    #[arg(long = "since-id", value_name = "ID")]
    pub since_id: Option<String>,

    /// Page size.
    #[arg(long, value_name = "COUNT")]
    pub limit: Option<usize>,
}

impl PageArgs {
    /// Query pairs in the shape accepted by the pagination parser.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(value) = &self.max_id {
            pairs.push(("max_id", value.clone()));
        }
        if let Some(value) = &self.min_id {
            pairs.push(("min_id", value.clone()));
        }
        if let Some(value) = &self.since_id {
            pairs.push(("since_id", value.clone()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        pairs
    }
}

#[derive(Debug, Args, Clone)]
pub struct HomeArgs {
    #[command(flatten)]
    pub fixture: FixtureArg,

    /// Timeline owner.
    #[arg(long, value_name = "ACCOUNT_ID")]
    pub account: String,

    #[command(flatten)]
    pub page: PageArgs,
}

#[derive(Debug, Args, Clone)]
pub struct PublicArgs {
    #[command(flatten)]
    pub fixture: FixtureArg,

    /// Viewer; omit for an unauthenticated request.
    #[arg(long, value_name = "ACCOUNT_ID")]
    pub account: Option<String>,

    /// Only statuses from local accounts.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub local: bool,

    #[command(flatten)]
    pub page: PageArgs,
}

#[derive(Debug, Args, Clone)]
pub struct FiltersArgs {
    #[command(flatten)]
    pub fixture: FixtureArg,

    /// Viewer whose filters apply.
    #[arg(long, value_name = "ACCOUNT_ID")]
    pub account: String,

    /// Status to evaluate.
    #[arg(long, value_name = "STATUS_ID")]
    pub status: String,

    /// Filter context (home|notifications|public|thread|account, or profile for account).
    #[arg(long, default_value = "home")]
    pub context: String,
}

#[derive(Debug, Args, Clone)]
pub struct SweepArgs {
    #[command(flatten)]
    pub fixture: FixtureArg,
}

#[derive(Debug, Args, Default, Clone)]
pub struct SettingsOverrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub log_json: Option<bool>,

    /// Override how many of the newest entries a boost is deduplicated against.
    #[arg(long = "boost-depth", value_name = "COUNT", global = true)]
    pub boost_reinsertion_depth: Option<usize>,

    /// Override the timeline sweep interval.
    #[arg(long = "sweep-interval-seconds", value_name = "SECONDS", global = true)]
    pub sweep_interval_seconds: Option<u64>,
}
