use std::io::Cursor;
use std::path::PathBuf;

use clap::Parser;
use onekey_core::{InstallTarget, LogLevel, ReleaseSource, ServiceConfig};
use onekey_installer::{ServiceOutcome, UpdateOutcome};

use super::*;
use crate::dispatch::{
    choose_source, confirm_reinstall, describe_service_outcome, format_update_outcome,
};
use crate::prompt::Prompter;
use crate::render::{
    format_install_review, format_install_summary, render_status_line, resolve_output_style,
    OutputStyle,
};

fn prompter(input: &str) -> Prompter<Cursor<Vec<u8>>, Vec<u8>> {
    Prompter::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
}

#[test]
fn cli_parses_global_flags_after_subcommand() {
    let cli = Cli::try_parse_from([
        "frps-onekey",
        "install",
        "--root",
        "/tmp/stage",
        "--source",
        "gitee",
        "-y",
        "--plain",
        "-vv",
    ])
    .expect("must parse install");
    assert_eq!(cli.command, Commands::Install);
    assert_eq!(cli.root, Some(PathBuf::from("/tmp/stage")));
    assert_eq!(cli.source.map(ReleaseSource::from), Some(ReleaseSource::Gitee));
    assert!(cli.yes);
    assert!(cli.plain);
    assert_eq!(cli.verbose, 2);
}

#[test]
fn cli_accepts_every_lifecycle_command() {
    for (name, command) in [
        ("install", Commands::Install),
        ("uninstall", Commands::Uninstall),
        ("update", Commands::Update),
        ("config", Commands::Config),
        ("start", Commands::Start),
        ("stop", Commands::Stop),
        ("restart", Commands::Restart),
        ("status", Commands::Status),
        ("version", Commands::Version),
    ] {
        let cli = Cli::try_parse_from(["frps-onekey", name]).expect("must parse command");
        assert_eq!(cli.command, command);
        assert!(cli.source.is_none());
    }
    assert!(Cli::try_parse_from(["frps-onekey", "install", "--source", "sourceforge"]).is_err());
}

#[test]
fn output_style_is_plain_unless_interactive_and_colored() {
    assert_eq!(resolve_output_style(false, false, true), OutputStyle::Rich);
    assert_eq!(resolve_output_style(true, false, true), OutputStyle::Plain);
    assert_eq!(resolve_output_style(false, true, true), OutputStyle::Plain);
    assert_eq!(resolve_output_style(false, false, false), OutputStyle::Plain);
}

#[test]
fn render_status_line_plain_is_unadorned() {
    assert_eq!(
        render_status_line(OutputStyle::Plain, "ok", "frps started"),
        "frps started"
    );
}

#[test]
fn render_status_line_rich_includes_ascii_badge() {
    assert_eq!(
        render_status_line(OutputStyle::Rich, "ok", "frps started"),
        "[OK] frps started"
    );
    assert_eq!(
        render_status_line(OutputStyle::Rich, "warn", "port 80 is already in use"),
        "[WARN] port 80 is already in use"
    );
    assert_eq!(
        render_status_line(OutputStyle::Rich, "error", "install failed"),
        "[ERR] install failed"
    );
    assert_eq!(
        render_status_line(OutputStyle::Rich, "step", "resolving latest release"),
        "[..] resolving latest release"
    );
}

#[test]
fn prompter_uses_default_on_empty_answer() {
    let mut prompter = prompter("\nfrp.example.test\n");
    assert_eq!(prompter.ask("Dashboard user", "admin").expect("must ask"), "admin");
    assert_eq!(
        prompter.ask("Subdomain host", "1.2.3.4").expect("must ask"),
        "frp.example.test"
    );
    assert!(prompter.ask("Token", "x").is_err(), "closed input must error");
}

#[test]
fn prompter_confirm_repeats_until_yes_or_no() {
    let mut prompter = prompter("maybe\nYES\n\n");
    assert!(prompter.confirm("Reinstall?", false).expect("must confirm"));
    assert!(prompter.confirm("Restart?", true).expect("must confirm"));
}

#[test]
fn select_source_accepts_numbers_names_and_exit() {
    let mut prompter = prompter("1\n\n3\ngithub\nexit\n");
    assert_eq!(
        prompter.select_source().expect("must select"),
        Some(ReleaseSource::Gitee)
    );
    assert_eq!(
        prompter.select_source().expect("must select"),
        Some(ReleaseSource::Github)
    );
    assert_eq!(
        prompter.select_source().expect("must select"),
        Some(ReleaseSource::Github)
    );
    assert_eq!(prompter.select_source().expect("must select"), None);
}

#[test]
fn ask_port_rejects_invalid_and_busy_ports() {
    let mut prompter = prompter("0\n70000\n80\n8080\n");
    let port = prompter
        .ask_port("vhost HTTP port", 80, &|port| port != 80)
        .expect("must ask port");
    assert_eq!(port, 8080);
}

#[test]
fn ask_bounded_enforces_range() {
    let mut prompter = prompter("51\n0\n12\n");
    assert_eq!(
        prompter
            .ask_bounded("Max pool count", 5, 1..=50)
            .expect("must ask"),
        12
    );
}

#[test]
fn ask_log_level_accepts_index_or_name() {
    let mut prompter = prompter("4\nverbose\nwarn\n");
    assert_eq!(
        prompter.ask_log_level(LogLevel::Info).expect("must ask"),
        LogLevel::Debug
    );
    assert_eq!(
        prompter.ask_log_level(LogLevel::Info).expect("must ask"),
        LogLevel::Warn
    );
}

#[test]
fn configure_service_with_all_defaults_keeps_base() {
    let base = ServiceConfig::default();
    let mut prompter = prompter(&"\n".repeat(16));
    let config = prompter
        .configure_service(base.clone(), "203.0.113.7", &|_| true)
        .expect("must configure");
    let expected = ServiceConfig {
        kcp_bind_port: Some(base.bind_port),
        quic_bind_port: Some(base.vhost_https_port),
        ..base
    };
    assert_eq!(config, expected);
}

#[test]
fn configure_service_asks_transport_ports_when_enabled() {
    let base = ServiceConfig::default();
    let answers = format!("{}y\n7001\n7002\n", "\n".repeat(13));
    let mut prompter = prompter(&answers);
    let config = prompter
        .configure_service(base, "203.0.113.7", &|_| true)
        .expect("must configure");
    assert!(config.transport_protocols);
    assert_eq!(config.kcp_bind_port, Some(7001));
    assert_eq!(config.quic_bind_port, Some(7002));
}

#[test]
fn configure_service_skips_transport_ports_when_disabled() {
    let base = ServiceConfig::default();
    let answers = format!("{}n\n", "\n".repeat(13));
    let mut prompter = prompter(&answers);
    let config = prompter
        .configure_service(base, "203.0.113.7", &|_| true)
        .expect("must configure without reading transport ports");
    assert!(!config.transport_protocols);
    assert_eq!(config.kcp_bind_port, None);
    assert_eq!(config.quic_bind_port, None);
}

#[test]
fn configure_service_records_custom_subdomain() {
    let base = ServiceConfig::default();
    let answers = "7000\n\n\n\n\n\n\nfrp.example.test\n\n\n\nn\n\n\n\n\n";
    let mut prompter = prompter(answers);
    let config = prompter
        .configure_service(base.clone(), "203.0.113.7", &|_| true)
        .expect("must configure");
    assert_eq!(config.bind_port, 7000);
    assert_eq!(config.subdomain_host.as_deref(), Some("frp.example.test"));
    assert!(!config.log_to_file);
    assert_eq!(config.token, base.token);
}

#[test]
fn choose_source_prefers_flag_then_settings_then_prompt() {
    let mut silent = prompter("");
    assert_eq!(
        choose_source(
            Some(ReleaseSource::Gitee),
            Some(ReleaseSource::Github),
            false,
            &mut silent
        )
        .expect("must choose"),
        Some(ReleaseSource::Gitee)
    );
    assert_eq!(
        choose_source(None, Some(ReleaseSource::Gitee), false, &mut silent).expect("must choose"),
        Some(ReleaseSource::Gitee)
    );
    assert_eq!(
        choose_source(None, None, true, &mut silent).expect("must choose"),
        Some(ReleaseSource::Github)
    );

    let mut interactive = prompter("1\n");
    assert_eq!(
        choose_source(None, None, false, &mut interactive).expect("must choose"),
        Some(ReleaseSource::Gitee)
    );
}

#[test]
fn install_summary_lists_dashboard_and_paths() {
    let config = ServiceConfig::default();
    let target = InstallTarget::system();
    let lines = format_install_summary("1.2.3", &config, &target, "203.0.113.7");

    assert_eq!(lines[0], "frps 1.2.3 installed");
    assert!(lines
        .iter()
        .any(|line| line.ends_with(": http://203.0.113.7:6443/")));
    assert!(lines
        .iter()
        .any(|line| line.ends_with(": /usr/local/frps/frps.toml")));
    assert!(lines.iter().any(|line| line.ends_with(": 5443")));
    assert!(lines
        .iter()
        .any(|line| line.contains("KCP bind port") && line.ends_with(": 5443")));
    assert!(lines.iter().any(|line| line.ends_with(&config.token)));
}

#[test]
fn reinstall_is_asked_only_when_running_and_interactive() {
    let mut silent = prompter("");
    assert!(confirm_reinstall(false, false, &mut silent).expect("not running needs no answer"));
    assert!(confirm_reinstall(true, true, &mut silent).expect("--yes needs no answer"));

    let mut declining = prompter("\n");
    assert!(!confirm_reinstall(true, false, &mut declining).expect("must ask"));
    let mut accepting = prompter("y\n");
    assert!(confirm_reinstall(true, false, &mut accepting).expect("must ask"));
}

#[test]
fn install_review_prints_settings_before_confirming() {
    let config = ServiceConfig::default();
    let target = InstallTarget::system();
    let review = format_install_review(&config, &target, "203.0.113.7");
    assert_eq!(review[0], "frps will be installed with:");
    assert!(!review.iter().any(|line| line.starts_with("Manage with")));

    let mut output = Vec::new();
    let proceed = Prompter::new(Cursor::new(b"n\n".to_vec()), &mut output)
        .review(&review, "Proceed with installation?")
        .expect("must review");
    assert!(!proceed);
    let printed = String::from_utf8(output).expect("output must be utf-8");
    assert!(printed.contains(": http://203.0.113.7:6443/"));
    assert!(printed.contains(&config.token));
    assert!(printed.ends_with("Proceed with installation? [Y/n]: "));

    let mut accepting = prompter("\n");
    assert!(accepting
        .review(&review, "Proceed with installation?")
        .expect("must review"));
}

#[test]
fn update_outcome_lines_describe_each_case() {
    let lines = format_update_outcome(&UpdateOutcome::AheadOfLatest {
        installed: "1.23.0".to_string(),
        latest: "1.2.3".to_string(),
    });
    assert_eq!(
        lines,
        vec!["installed frps '1.23.0' is newer than the latest release 1.2.3; nothing to do"]
    );

    let lines = format_update_outcome(&UpdateOutcome::Updated {
        previous: "0.9.0".to_string(),
        latest: "1.2.3".to_string(),
        reported: Some("1.2.3".to_string()),
    });
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[1], "frps --version: 1.2.3");
}

#[test]
fn service_outcomes_map_to_status_badges() {
    assert_eq!(
        describe_service_outcome(ServiceOutcome::AlreadyRunning),
        ("warn", "frps is already running")
    );
    assert_eq!(
        describe_service_outcome(ServiceOutcome::Stopped),
        ("ok", "frps stopped")
    );
}
