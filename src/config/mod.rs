//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

use std::{
    num::{NonZeroU64, NonZeroUsize},
    path::PathBuf,
    str::FromStr,
    time::Duration,
};

use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

use crate::domain::entities::SiteProfile;

pub use cli::{
    CliArgs, Command, ContentOverride, ListArgs, PageKind, PagesArgs, ServeArgs, ServeOverrides,
};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "quire";
const ENV_PREFIX: &str = "QUIRE";
const DEFAULT_ARCHIVE_PATH: &str = "content/archive.toml";
const DEFAULT_SITE_HOST: &str = "localhost";
const DEFAULT_VISIBILITY_THRESHOLD: u64 = 1;
const DEFAULT_PAGE_SIZE: usize = 10;
const DEFAULT_ARCHIVE_COMPACT_THRESHOLD: usize = 12;
const DEFAULT_EXCERPT_MAX_CHARS: usize = 200;
const DEFAULT_EXCERPT_MARKER: &str = "<!--more-->";
const DEFAULT_CLEANUP_INTERVAL_HOURS: u64 = 1;
const DEFAULT_TRASH_RETENTION_HOURS: u64 = 48;
const DEFAULT_COMMENT_REFRESH_INTERVAL_HOURS: u64 = 1;
const DEFAULT_COMMENTS_TIMEOUT_SECS: u64 = 10;
const SECONDS_PER_HOUR: u64 = 3600;

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub cache: CacheSettings,
    pub content: ContentSettings,
    pub site: SiteSettings,
    pub jobs: JobsSettings,
    pub comments: CommentsSettings,
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
pub struct CacheSettings {
    pub visibility_threshold: u64,
    pub page_size: NonZeroUsize,
    pub archive_compact_threshold: usize,
    pub excerpt_max_chars: usize,
    pub excerpt_marker: String,
}

#[derive(Debug, Clone)]
pub struct ContentSettings {
    pub archive_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct SiteSettings {
    pub host: String,
    /// Profile written to the archive when it does not carry one yet.
    pub profile_defaults: SiteProfile,
}

#[derive(Debug, Clone)]
pub struct JobsSettings {
    pub cleanup_interval: Duration,
    pub trash_retention: time::Duration,
    pub comment_refresh_interval: Duration,
}

#[derive(Debug, Clone)]
pub struct CommentsSettings {
    /// Comment service endpoint; the refresh job is disabled without one.
    pub base_url: Option<Url>,
    pub site_id: String,
    pub timeout: Duration,
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

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Pages(args)) => raw.apply_content_override(&args.content),
        Some(Command::List(args)) => raw.apply_content_override(&args.content),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    cache: RawCacheSettings,
    content: RawContentSettings,
    site: RawSiteSettings,
    jobs: RawJobsSettings,
    comments: RawCommentsSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(threshold) = overrides.visibility_threshold {
            self.cache.visibility_threshold = Some(threshold);
        }
        if let Some(size) = overrides.page_size {
            self.cache.page_size = Some(size);
        }
        if let Some(hours) = overrides.cleanup_interval_hours {
            self.jobs.cleanup_interval_hours = Some(hours);
        }
        if let Some(hours) = overrides.comment_refresh_interval_hours {
            self.jobs.comment_refresh_interval_hours = Some(hours);
        }
        if let Some(url) = overrides.comments_base_url.as_ref() {
            self.comments.base_url = Some(url.clone());
        }

        self.apply_content_override(&overrides.content);
    }

    fn apply_content_override(&mut self, overrides: &ContentOverride) {
        if let Some(path) = overrides.archive_path.as_ref() {
            self.content.archive_path = Some(path.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            logging,
            cache,
            content,
            site,
            jobs,
            comments,
        } = raw;

        let logging = build_logging_settings(logging)?;
        let cache = build_cache_settings(cache)?;
        let content = build_content_settings(content)?;
        let site = build_site_settings(site);
        let jobs = build_jobs_settings(jobs)?;
        let comments = build_comments_settings(comments)?;

        Ok(Self {
            logging,
            cache,
            content,
            site,
            jobs,
            comments,
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

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let page_size_value = cache.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
    let page_size = NonZeroUsize::new(page_size_value)
        .ok_or_else(|| LoadError::invalid("cache.page_size", "must be greater than zero"))?;

    let excerpt_marker = cache
        .excerpt_marker
        .unwrap_or_else(|| DEFAULT_EXCERPT_MARKER.to_string());
    if excerpt_marker.trim().is_empty() {
        return Err(LoadError::invalid(
            "cache.excerpt_marker",
            "marker must not be blank",
        ));
    }

    Ok(CacheSettings {
        visibility_threshold: cache
            .visibility_threshold
            .unwrap_or(DEFAULT_VISIBILITY_THRESHOLD),
        page_size,
        archive_compact_threshold: cache
            .archive_compact_threshold
            .unwrap_or(DEFAULT_ARCHIVE_COMPACT_THRESHOLD),
        excerpt_max_chars: cache.excerpt_max_chars.unwrap_or(DEFAULT_EXCERPT_MAX_CHARS),
        excerpt_marker,
    })
}

fn build_content_settings(content: RawContentSettings) -> Result<ContentSettings, LoadError> {
    let archive_path = content
        .archive_path
        .unwrap_or_else(|| PathBuf::from(DEFAULT_ARCHIVE_PATH));
    if archive_path.as_os_str().is_empty() {
        return Err(LoadError::invalid(
            "content.archive_path",
            "path must not be empty",
        ));
    }
    Ok(ContentSettings { archive_path })
}

fn build_site_settings(site: RawSiteSettings) -> SiteSettings {
    let fallback = SiteProfile::default();
    let blog_name = site
        .blog_name
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or(fallback.blog_name);

    SiteSettings {
        host: site.host.unwrap_or_else(|| DEFAULT_SITE_HOST.to_string()),
        profile_defaults: SiteProfile {
            blog_name,
            subtitle: site.subtitle.unwrap_or_default(),
            series_intro: site.series_intro.unwrap_or_default(),
            archive_intro: site.archive_intro.unwrap_or_default(),
        },
    }
}

fn build_jobs_settings(jobs: RawJobsSettings) -> Result<JobsSettings, LoadError> {
    let cleanup_hours = non_zero_u64(
        jobs.cleanup_interval_hours
            .unwrap_or(DEFAULT_CLEANUP_INTERVAL_HOURS),
        "jobs.cleanup_interval_hours",
    )?;
    let refresh_hours = non_zero_u64(
        jobs.comment_refresh_interval_hours
            .unwrap_or(DEFAULT_COMMENT_REFRESH_INTERVAL_HOURS),
        "jobs.comment_refresh_interval_hours",
    )?;
    let retention_hours = jobs
        .trash_retention_hours
        .unwrap_or(DEFAULT_TRASH_RETENTION_HOURS);
    let retention_hours = i64::try_from(retention_hours).map_err(|_| {
        LoadError::invalid(
            "jobs.trash_retention_hours",
            "value exceeds supported range",
        )
    })?;

    Ok(JobsSettings {
        cleanup_interval: hours(cleanup_hours, "jobs.cleanup_interval_hours")?,
        trash_retention: time::Duration::hours(retention_hours),
        comment_refresh_interval: hours(refresh_hours, "jobs.comment_refresh_interval_hours")?,
    })
}

fn build_comments_settings(comments: RawCommentsSettings) -> Result<CommentsSettings, LoadError> {
    let base_url = comments
        .base_url
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .map(|value| {
            Url::parse(&value).map_err(|err| {
                LoadError::invalid("comments.base_url", format!("invalid url `{value}`: {err}"))
            })
        })
        .transpose()?;

    let timeout_secs = non_zero_u64(
        comments.timeout_seconds.unwrap_or(DEFAULT_COMMENTS_TIMEOUT_SECS),
        "comments.timeout_seconds",
    )?;

    Ok(CommentsSettings {
        base_url,
        site_id: comments.site_id.unwrap_or_else(|| "quire".to_string()),
        timeout: Duration::from_secs(timeout_secs.get()),
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    visibility_threshold: Option<u64>,
    page_size: Option<usize>,
    archive_compact_threshold: Option<usize>,
    excerpt_max_chars: Option<usize>,
    excerpt_marker: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawContentSettings {
    archive_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSiteSettings {
    host: Option<String>,
    blog_name: Option<String>,
    subtitle: Option<String>,
    series_intro: Option<String>,
    archive_intro: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawJobsSettings {
    cleanup_interval_hours: Option<u64>,
    trash_retention_hours: Option<u64>,
    comment_refresh_interval_hours: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCommentsSettings {
    base_url: Option<String>,
    site_id: Option<String>,
    timeout_seconds: Option<u64>,
}

fn non_zero_u64(value: u64, key: &'static str) -> Result<NonZeroU64, LoadError> {
    NonZeroU64::new(value).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

fn hours(value: NonZeroU64, key: &'static str) -> Result<Duration, LoadError> {
    value
        .get()
        .checked_mul(SECONDS_PER_HOUR)
        .map(Duration::from_secs)
        .ok_or_else(|| LoadError::invalid(key, "value exceeds supported range"))
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    use clap::Parser;

    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[cfg(test)]
mod tests;
