use clap::Parser;

use super::*;

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.cache.page_size = Some(20);
    raw.logging.level = Some("info".to_string());

    let overrides = ServeOverrides {
        page_size: Some(5),
        log_level: Some("debug".to_string()),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.cache.page_size.get(), 5);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
}

#[test]
fn defaults_match_documented_values() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.cache.visibility_threshold, 1);
    assert_eq!(settings.cache.page_size.get(), 10);
    assert_eq!(settings.cache.archive_compact_threshold, 12);
    assert_eq!(settings.cache.excerpt_marker, "<!--more-->");
    assert_eq!(
        settings.content.archive_path,
        PathBuf::from("content/archive.toml")
    );
    assert_eq!(settings.jobs.cleanup_interval, Duration::from_secs(3600));
    assert_eq!(settings.jobs.trash_retention, time::Duration::hours(48));
    assert!(settings.comments.base_url.is_none());
    assert_eq!(settings.site.profile_defaults.blog_name, "Quire");
    assert!(matches!(settings.logging.format, LogFormat::Compact));
}

#[test]
fn zero_page_size_is_rejected() {
    let mut raw = RawSettings::default();
    raw.cache.page_size = Some(0);

    let err = Settings::from_raw(raw).expect_err("invalid page size");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "cache.page_size",
            ..
        }
    ));
}

#[test]
fn zero_cleanup_interval_is_rejected() {
    let mut raw = RawSettings::default();
    raw.jobs.cleanup_interval_hours = Some(0);

    let err = Settings::from_raw(raw).expect_err("invalid interval");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "jobs.cleanup_interval_hours",
            ..
        }
    ));
}

#[test]
fn invalid_comments_url_is_rejected() {
    let mut raw = RawSettings::default();
    raw.comments.base_url = Some("not a url".to_string());

    let err = Settings::from_raw(raw).expect_err("invalid url");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "comments.base_url",
            ..
        }
    ));
}

#[test]
fn blank_comments_url_disables_the_service() {
    let mut raw = RawSettings::default();
    raw.comments.base_url = Some("   ".to_string());

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(settings.comments.base_url.is_none());
}

#[test]
fn invalid_log_level_is_rejected() {
    let mut raw = RawSettings::default();
    raw.logging.level = Some("loud".to_string());

    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = ServeOverrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn site_defaults_feed_the_profile() {
    let mut raw = RawSettings::default();
    raw.site.blog_name = Some("  Field Notes ".to_string());
    raw.site.archive_intro = Some("Everything, by month.".to_string());

    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.site.profile_defaults.blog_name, "Field Notes");
    assert_eq!(
        settings.site.profile_defaults.archive_intro,
        "Everything, by month."
    );
}

#[test]
fn default_to_serve_command() {
    let args = CliArgs::parse_from(["quire"]);
    let command = args
        .command
        .unwrap_or(Command::Serve(Box::<ServeArgs>::default()));
    assert!(matches!(command, Command::Serve(_)));
}

#[test]
fn parse_serve_arguments() {
    let args = CliArgs::parse_from([
        "quire",
        "serve",
        "--content-archive",
        "/srv/archive.toml",
        "--cache-visibility-threshold",
        "40",
        "--comments-base-url",
        "https://comments.example.com",
    ]);

    match args.command.expect("serve command") {
        Command::Serve(serve) => {
            assert_eq!(
                serve.overrides.content.archive_path.as_deref(),
                Some(std::path::Path::new("/srv/archive.toml"))
            );
            assert_eq!(serve.overrides.visibility_threshold, Some(40));
            assert_eq!(
                serve.overrides.comments_base_url.as_deref(),
                Some("https://comments.example.com")
            );
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_pages_arguments() {
    let args = CliArgs::parse_from(["quire", "pages", "--kind", "series", "--markdown"]);

    match args.command.expect("pages command") {
        Command::Pages(pages) => {
            assert_eq!(pages.kind, PageKind::Series);
            assert!(pages.markdown);
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_list_arguments() {
    let args = CliArgs::parse_from(["quire", "list", "--page", "3", "--tag", "rust"]);

    match args.command.expect("list command") {
        Command::List(list) => {
            assert_eq!(list.page, 3);
            assert_eq!(list.tag.as_deref(), Some("rust"));
            assert!(list.content.archive_path.is_none());
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn content_override_applies_to_list() {
    let mut raw = RawSettings::default();
    raw.apply_content_override(&ContentOverride {
        archive_path: Some(PathBuf::from("/tmp/other.toml")),
    });

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(
        settings.content.archive_path,
        PathBuf::from("/tmp/other.toml")
    );
}
