use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum, ValueHint, builder::BoolishValueParser};

/// Command-line arguments for the Quire binary.
#[derive(Debug, Parser)]
#[command(name = "quire", version, about = "Quire content cache")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "QUIRE_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Load the content archive and keep the cache running until interrupted.
    Serve(Box<ServeArgs>),
    /// Print a rendered composite page.
    Pages(PagesArgs),
    /// Print one page of the content listing.
    List(ListArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ContentOverride {
    /// Override the content archive path.
    #[arg(long = "content-archive", value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub archive_path: Option<PathBuf>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    #[command(flatten)]
    pub content: ContentOverride,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the lowest content identifier shown in listings.
    #[arg(long = "cache-visibility-threshold", value_name = "ID")]
    pub visibility_threshold: Option<u64>,

    /// Override the listing page size.
    #[arg(long = "cache-page-size", value_name = "COUNT")]
    pub page_size: Option<usize>,

    /// Override the trash cleanup interval.
    #[arg(long = "jobs-cleanup-interval-hours", value_name = "HOURS")]
    pub cleanup_interval_hours: Option<u64>,

    /// Override the comment count refresh interval.
    #[arg(long = "jobs-comment-refresh-interval-hours", value_name = "HOURS")]
    pub comment_refresh_interval_hours: Option<u64>,

    /// Override the comment service base URL.
    #[arg(long = "comments-base-url", value_name = "URL")]
    pub comments_base_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PageKind {
    Series,
    Archive,
}

#[derive(Debug, Args, Clone)]
pub struct PagesArgs {
    #[command(flatten)]
    pub content: ContentOverride,

    /// Which composite page to print.
    #[arg(long, value_enum, default_value_t = PageKind::Archive)]
    pub kind: PageKind,

    /// Print the composed markdown instead of the rendered HTML.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub markdown: bool,
}

#[derive(Debug, Args, Clone)]
pub struct ListArgs {
    #[command(flatten)]
    pub content: ContentOverride,

    /// Page number, starting at 1. Out-of-range pages show the last page.
    #[arg(long, default_value_t = 1)]
    pub page: usize,

    /// List the items carrying this tag instead of the paginated listing.
    #[arg(long, value_name = "TAG")]
    pub tag: Option<String>,
}
