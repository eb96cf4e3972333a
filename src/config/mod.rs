//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

use std::{str::FromStr, time::Duration};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::application::timeline::{
    DEFAULT_BOOST_REINSERTION_DEPTH, DEFAULT_INDEXED_LEN, DEFAULT_LOAD_ATTEMPTS,
    DEFAULT_PREPARED_LEN, DEFAULT_SWEEP_INTERVAL,
};
use crate::application::visibility::DEFAULT_MAX_CHAIN_DEPTH;
use crate::cache::{DEFAULT_FILTER_LIMIT, DEFAULT_MUTE_LIMIT, DEFAULT_VISIBILITY_LIMIT};

pub use cli::{
    CliArgs, Command, FiltersArgs, FixtureArg, HomeArgs, PageArgs, PublicArgs, SettingsOverrides,
    SweepArgs,
};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "feedline";
const ENV_PREFIX: &str = "FEEDLINE";

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub timeline: TimelineSettings,
    pub cache: CacheSettings,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct TimelineSettings {
    pub boost_reinsertion_depth: usize,
    pub indexed_len: usize,
    pub prepared_len: usize,
    pub sweep_interval: Duration,
    pub load_attempts: usize,
    pub max_chain_depth: usize,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub visibility_limit: usize,
    pub filter_limit: usize,
    pub mute_limit: usize,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_overrides(&cli.overrides);

    Settings::from_raw(raw)
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    timeline: RawTimelineSettings,
    cache: RawCacheSettings,
}

impl RawSettings {
    fn apply_overrides(&mut self, overrides: &SettingsOverrides) {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(depth) = overrides.boost_reinsertion_depth {
            self.timeline.boost_reinsertion_depth = Some(depth);
        }
        if let Some(seconds) = overrides.sweep_interval_seconds {
            self.timeline.sweep_interval_seconds = Some(seconds);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            logging,
            timeline,
            cache,
        } = raw;

        Ok(Self {
            logging: build_logging_settings(logging)?,
            timeline: build_timeline_settings(timeline)?,
            cache: build_cache_settings(cache)?,
        })
    }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_timeline_settings(timeline: RawTimelineSettings) -> Result<TimelineSettings, LoadError> {
    let boost_reinsertion_depth = timeline
        .boost_reinsertion_depth
        .unwrap_or(DEFAULT_BOOST_REINSERTION_DEPTH);

    let indexed_len = non_zero(
        timeline.indexed_len.unwrap_or(DEFAULT_INDEXED_LEN),
        "timeline.indexed_len",
    )?;
    let prepared_len = timeline.prepared_len.unwrap_or(DEFAULT_PREPARED_LEN);
    if prepared_len > indexed_len {
        return Err(LoadError::invalid(
            "timeline.prepared_len",
            format!("must not exceed timeline.indexed_len ({indexed_len})"),
        ));
    }

    let sweep_seconds = timeline
        .sweep_interval_seconds
        .unwrap_or(DEFAULT_SWEEP_INTERVAL.as_secs());
    if sweep_seconds == 0 {
        return Err(LoadError::invalid(
            "timeline.sweep_interval_seconds",
            "must be greater than zero",
        ));
    }

    Ok(TimelineSettings {
        boost_reinsertion_depth,
        indexed_len,
        prepared_len,
        sweep_interval: Duration::from_secs(sweep_seconds),
        load_attempts: non_zero(
            timeline.load_attempts.unwrap_or(DEFAULT_LOAD_ATTEMPTS),
            "timeline.load_attempts",
        )?,
        max_chain_depth: non_zero(
            timeline.max_chain_depth.unwrap_or(DEFAULT_MAX_CHAIN_DEPTH),
            "timeline.max_chain_depth",
        )?,
    })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    Ok(CacheSettings {
        visibility_limit: non_zero(
            cache.visibility_limit.unwrap_or(DEFAULT_VISIBILITY_LIMIT),
            "cache.visibility_limit",
        )?,
        filter_limit: non_zero(
            cache.filter_limit.unwrap_or(DEFAULT_FILTER_LIMIT),
            "cache.filter_limit",
        )?,
        mute_limit: non_zero(
            cache.mute_limit.unwrap_or(DEFAULT_MUTE_LIMIT),
            "cache.mute_limit",
        )?,
    })
}

fn non_zero(value: usize, key: &'static str) -> Result<usize, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    Ok(value)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawTimelineSettings {
    boost_reinsertion_depth: Option<usize>,
    indexed_len: Option<usize>,
    prepared_len: Option<usize>,
    sweep_interval_seconds: Option<u64>,
    load_attempts: Option<usize>,
    max_chain_depth: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    visibility_limit: Option<usize>,
    filter_limit: Option<usize>,
    mute_limit: Option<usize>,
}
