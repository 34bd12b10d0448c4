use super::*;

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.server.port = Some(4000);
    raw.logging.level = Some("info".to_string());

    let overrides = ServeOverrides {
        server_port: Some(4321),
        log_level: Some("debug".to_string()),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.server.addr.port(), 4321);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
}

#[test]
fn defaults_match_site_conventions() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.server.addr.port(), DEFAULT_PORT);
    assert_eq!(settings.uploads.directory, PathBuf::from("media"));
    assert_eq!(
        settings.uploads.max_request_bytes.get(),
        DEFAULT_UPLOAD_REQUEST_LIMIT_BYTES
    );
    assert_eq!(settings.pagination.posts_per_page.get(), 10);
    assert!(settings.cache.enabled);
    assert_eq!(settings.cache.index_ttl, Duration::from_secs(20));
    assert_eq!(settings.cache.max_entries.get(), 256);
    assert_eq!(settings.session.cookie_name, "yatube_session");
    assert_eq!(settings.session.ttl, Duration::from_secs(336 * 3600));
    assert!(!settings.session.secure_cookie);
}

#[test]
fn uploads_limit_can_be_overridden_via_cli() {
    let mut raw = RawSettings::default();
    let overrides = ServeOverrides {
        uploads_max_request_bytes: Some(1_572_864),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.uploads.max_request_bytes.get(), 1_572_864);
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
fn zero_posts_per_page_is_rejected() {
    let mut raw = RawSettings::default();
    raw.pagination.posts_per_page = Some(0);

    let err = Settings::from_raw(raw).expect_err("zero page size");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "pagination.posts_per_page",
            ..
        }
    ));
}

#[test]
fn zero_cache_ttl_is_rejected() {
    let mut raw = RawSettings::default();
    raw.cache.index_ttl_seconds = Some(0);

    let err = Settings::from_raw(raw).expect_err("zero ttl");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "cache.index_ttl_seconds",
            ..
        }
    ));
}

#[test]
fn malformed_cookie_name_is_rejected() {
    let mut raw = RawSettings::default();
    raw.session.cookie_name = Some("bad cookie;".to_string());

    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn invalid_log_level_is_reported_with_key() {
    let mut raw = RawSettings::default();
    raw.logging.level = Some("loud".to_string());

    let err = Settings::from_raw(raw).expect_err("bad level");
    assert!(err.to_string().contains("logging.level"));
}

#[test]
fn default_to_serve_command() {
    let args = CliArgs::parse_from(["yatube"]);
    let command = args
        .command
        .unwrap_or(Command::Serve(Box::<ServeArgs>::default()));
    assert!(matches!(command, Command::Serve(_)));
}

#[test]
fn parse_users_create_arguments() {
    let args = CliArgs::parse_from([
        "yatube",
        "users",
        "--database-url",
        "postgres://example",
        "create",
        "--username",
        "leo",
        "--password",
        "war-and-peace",
    ]);

    match args.command.expect("users command") {
        Command::Users(users) => {
            assert_eq!(
                users.database.database_url.as_deref(),
                Some("postgres://example")
            );
            let UsersCommand::Create(create) = users.command;
            assert_eq!(create.username, "leo");
            assert_eq!(create.password, "war-and-peace");
            assert_eq!(create.email, "");
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_groups_commands() {
    let args = CliArgs::parse_from([
        "yatube",
        "groups",
        "create",
        "--title",
        "Classics",
        "--description",
        "Old books",
    ]);

    match args.command.expect("groups command") {
        Command::Groups(groups) => match groups.command {
            GroupsCommand::Create(create) => {
                assert_eq!(create.title, "Classics");
                assert!(create.slug.is_none());
                assert_eq!(create.description, "Old books");
            }
            other => panic!("unexpected groups command: {other:?}"),
        },
        _ => panic!("wrong command parsed"),
    }

    let args = CliArgs::parse_from(["yatube", "groups", "delete", "--slug", "classics"]);
    match args.command.expect("groups command") {
        Command::Groups(groups) => match groups.command {
            GroupsCommand::Delete(delete) => assert_eq!(delete.slug, "classics"),
            other => panic!("unexpected groups command: {other:?}"),
        },
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn database_override_applies_to_management_commands() {
    let mut raw = RawSettings::default();
    raw.apply_database_override(&DatabaseOverride {
        database_url: Some("  postgres://override  ".to_string()),
    });
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.database.url.as_deref(), Some("postgres://override"));
}
