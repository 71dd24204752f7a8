use std::{process, sync::Arc, time::Duration};

use quire::{
    application::{
        comments::CommentCountSource,
        error::{AppError, error_chain},
        jobs::{CleanupJob, CommentRefreshJob, JobHandles},
        render::{ComrakRenderService, RenderService},
        repos::ContentRepo,
    },
    cache::{CacheConfig, ContentCache, RegenerationSignal, archive_markdown, series_markdown},
    config,
    infra::{archive::TomlArchiveRepo, comments::Remark42Counter, telemetry},
};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

const PAGE_WAIT_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    let chain = error_chain(error);
    if dispatcher::has_been_set() {
        error!(error = %error, kind = error.kind(), chain = ?chain, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, kind = error.kind(), chain = ?chain, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Pages(args) => run_pages(settings, args).await,
        config::Command::List(args) => run_list(settings, args).await,
    }
}

/// Build the cache over the configured archive and load it.
async fn load_cache(settings: &config::Settings) -> Result<Arc<ContentCache>, AppError> {
    let repo: Arc<dyn ContentRepo> =
        Arc::new(TomlArchiveRepo::new(settings.content.archive_path.clone()));
    let renderer: Arc<dyn RenderService> = Arc::new(ComrakRenderService::new());

    let cache = Arc::new(ContentCache::new(
        CacheConfig::from(&settings.cache),
        repo,
        renderer,
        settings.site.profile_defaults.clone(),
    ));
    cache.load().await?;
    Ok(cache)
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let cache = load_cache(&settings).await?;

    let mut jobs = JobHandles::default();
    jobs.push(
        CleanupJob {
            cache: Arc::clone(&cache),
            retention: settings.jobs.trash_retention,
        }
        .spawn(settings.jobs.cleanup_interval),
    );

    match Remark42Counter::from_settings(&settings.comments, &settings.site.host)? {
        Some(counter) => {
            let source: Arc<dyn CommentCountSource> = Arc::new(counter);
            jobs.push(
                CommentRefreshJob {
                    cache: Arc::clone(&cache),
                    source,
                }
                .spawn(settings.jobs.comment_refresh_interval),
            );
        }
        None => info!(
            target = "quire::serve",
            "Comment service not configured; comment counts stay at zero"
        ),
    }

    info!(
        target = "quire::serve",
        archive = %settings.content.archive_path.display(),
        jobs = jobs.len(),
        "Quire is running; press Ctrl-C to stop"
    );

    let signal = tokio::signal::ctrl_c().await;
    if let Err(err) = signal {
        warn!(target = "quire::serve", error = %err, "Failed to listen for Ctrl-C; stopping");
    }

    jobs.shutdown().await;
    cache.shutdown().await;
    Ok(())
}

async fn run_pages(settings: config::Settings, args: config::PagesArgs) -> Result<(), AppError> {
    let cache = load_cache(&settings).await?;

    let output = if args.markdown {
        let snapshot = cache.snapshot();
        match args.kind {
            config::PageKind::Series => series_markdown(&snapshot),
            config::PageKind::Archive => {
                archive_markdown(&snapshot, cache.config().archive_compact_threshold)
            }
        }
    } else {
        let signal = match args.kind {
            config::PageKind::Series => RegenerationSignal::Series,
            config::PageKind::Archive => RegenerationSignal::Archive,
        };
        let mut pages = cache.subscribe_pages();
        let rendered = tokio::time::timeout(
            PAGE_WAIT_TIMEOUT,
            pages.wait_for(|pages| pages.version(signal) > 0),
        )
        .await
        .map_err(|_| AppError::unexpected(format!("{} page was not generated", signal.as_str())))?
        .map_err(|_| AppError::unexpected("regeneration worker stopped"))?;

        match signal {
            RegenerationSignal::Series => rendered.series.clone(),
            RegenerationSignal::Archive => rendered.archive.clone(),
        }
    };

    cache.shutdown().await;
    println!("{output}");
    Ok(())
}

async fn run_list(settings: config::Settings, args: config::ListArgs) -> Result<(), AppError> {
    let cache = load_cache(&settings).await?;

    let items = match args.tag.as_deref() {
        Some(tag) => {
            let items = cache.tag_items(tag);
            if items.is_empty() {
                cache.shutdown().await;
                return Err(AppError::validation(format!("no content tagged `{tag}`")));
            }
            items
        }
        None => {
            let page = cache.listing(args.page);
            println!(
                "page {} (prev: {}, next: {})",
                page.page,
                page.prev.map_or_else(|| "-".to_string(), |p| p.to_string()),
                page.next.map_or_else(|| "-".to_string(), |p| p.to_string()),
            );
            page.items
        }
    };

    for item in items {
        println!(
            "{}\t{}\t{}\t{} comments\t{}",
            item.id,
            item.created_at.date(),
            item.slug,
            cache.comment_count(&item.slug),
            item.title
        );
    }

    cache.shutdown().await;
    Ok(())
}
