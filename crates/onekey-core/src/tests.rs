use std::ffi::OsString;
use std::path::{Path, PathBuf};

use super::*;

#[test]
fn normalize_version_tag_strips_v_prefix() {
    assert_eq!(normalize_version_tag("v1.2.3"), "1.2.3");
    assert_eq!(normalize_version_tag("1.2.3"), "1.2.3");
    assert_eq!(normalize_version_tag("release-0.61.0"), "0.61.0");
    assert_eq!(normalize_version_tag(" v0.58.1\n"), "0.58.1");
}

#[test]
fn parse_release_document_ignores_extra_fields() {
    let raw = br#"{"tag_name":"v1.2.3","name":"frp 1.2.3","assets":[{"id":1}]}"#;
    let release = parse_release_document(raw).expect("must parse release document");
    assert_eq!(
        release,
        ReleaseInfo {
            version: "1.2.3".to_string()
        }
    );
}

#[test]
fn parse_release_document_rejects_malformed_json() {
    let err = parse_release_document(b"<html>rate limited</html>")
        .expect_err("html body must not decode");
    assert_eq!(error_kind(&err), Some(ErrorKind::Decode));
}

#[test]
fn parse_release_document_rejects_missing_tag() {
    let err = parse_release_document(br#"{"name":"frp"}"#).expect_err("tag_name is required");
    assert_eq!(error_kind(&err), Some(ErrorKind::Decode));

    let err = parse_release_document(br#"{"tag_name":"latest"}"#)
        .expect_err("tag without digits carries no version");
    assert_eq!(error_kind(&err), Some(ErrorKind::Decode));
}

#[test]
fn archive_download_url_follows_release_layout() {
    assert_eq!(archive_stem("1.2.3", "amd64"), "frp_1.2.3_linux_amd64");
    assert_eq!(
        archive_download_url(ReleaseSource::Github, "1.2.3", "amd64"),
        "https://github.com/fatedier/frp/releases/download/v1.2.3/frp_1.2.3_linux_amd64.tar.gz"
    );
    assert_eq!(
        archive_download_url(ReleaseSource::Gitee, "0.61.0", "arm64"),
        "https://gitee.com/mvscode/frps-onekey/releases/download/v0.61.0/frp_0.61.0_linux_arm64.tar.gz"
    );
}

#[test]
fn release_source_parse_accepts_menu_numbers_and_names() {
    assert_eq!(ReleaseSource::parse("1"), Some(ReleaseSource::Gitee));
    assert_eq!(ReleaseSource::parse(" GitHub "), Some(ReleaseSource::Github));
    assert_eq!(ReleaseSource::parse("2"), Some(ReleaseSource::Github));
    assert_eq!(ReleaseSource::parse("sourceforge"), None);
    assert_eq!(ReleaseSource::default(), ReleaseSource::Github);
}

#[test]
fn os_family_detection_from_os_release() {
    let ubuntu = "NAME=\"Ubuntu\"\nVERSION=\"22.04.4 LTS (Jammy Jellyfish)\"\nID=ubuntu\n";
    let rocky = "NAME=\"Rocky Linux\"\nVERSION=\"9.3 (Blue Onyx)\"\nID=\"rocky\"\n";
    let arch = "NAME=\"Arch Linux\"\nID=arch\n";
    assert_eq!(OsFamily::from_os_release(ubuntu), Some(OsFamily::Debian));
    assert_eq!(OsFamily::from_os_release(rocky), Some(OsFamily::RedHat));
    assert_eq!(OsFamily::from_os_release(arch), None);
}

#[test]
fn debian_dependency_commands_update_before_install() {
    let commands = OsFamily::Debian.dependency_install_commands();
    assert_eq!(
        commands,
        vec![
            vec!["apt-get", "-y", "update"],
            vec!["apt-get", "-y", "install", "wget", "psmisc", "net-tools", "curl"],
        ]
    );
}

#[test]
fn redhat_boot_registration_uses_chkconfig() {
    assert_eq!(
        OsFamily::RedHat.dependency_install_commands(),
        vec![vec!["yum", "install", "-y", "wget", "psmisc", "net-tools", "curl"]]
    );
    assert_eq!(
        OsFamily::RedHat.boot_register_command(),
        vec!["chkconfig", "--add", "frps"]
    );
    assert_eq!(
        OsFamily::Debian.boot_unregister_command(),
        vec!["update-rc.d", "-f", "frps", "remove"]
    );
}

#[test]
fn service_arch_maps_rust_targets_to_release_names() {
    assert_eq!(service_arch("x86_64", true), "amd64");
    assert_eq!(service_arch("x86", true), "386");
    assert_eq!(service_arch("aarch64", true), "arm64");
    assert_eq!(service_arch("mips", true), "mipsle");
    assert_eq!(service_arch("mips64", false), "mips64");
    assert_eq!(service_arch("riscv64", true), "riscv64");
    assert_eq!(service_arch("powerpc64", false), "amd64");
}

#[test]
fn rooted_target_reanchors_every_path() {
    let target = InstallTarget::rooted("/tmp/onekey-root");
    assert_eq!(target.install_dir(), Path::new("/tmp/onekey-root/usr/local/frps"));
    assert_eq!(
        target.binary_path(),
        PathBuf::from("/tmp/onekey-root/usr/local/frps/frps")
    );
    assert_eq!(
        target.backup_path(),
        PathBuf::from("/tmp/onekey-root/usr/local/frps/frps.backup")
    );
    assert_eq!(
        target.init_script_path(),
        Path::new("/tmp/onekey-root/etc/init.d/frps")
    );
    assert_eq!(target.symlink_path(), Path::new("/tmp/onekey-root/usr/bin/frps"));
    assert_eq!(
        target.pid_file_path(),
        Path::new("/tmp/onekey-root/var/run/frps.pid")
    );
}

#[test]
fn system_target_matches_fixed_layout() {
    let target = InstallTarget::system();
    assert_eq!(target.config_path(), PathBuf::from("/usr/local/frps/frps.toml"));
    assert_eq!(
        target.removal_paths(),
        vec![
            PathBuf::from("/etc/init.d/frps"),
            PathBuf::from("/var/run/frps.pid"),
            PathBuf::from("/usr/bin/frps"),
            PathBuf::from("/usr/local/frps"),
        ]
    );
}

#[test]
fn compare_installed_version_uses_semver_ordering() {
    assert_eq!(
        compare_installed_version("0.61.0\n", "0.61.0"),
        VersionStatus::UpToDate
    );
    assert_eq!(
        compare_installed_version("0.58.1", "0.61.0"),
        VersionStatus::UpgradeAvailable
    );
    assert_eq!(
        compare_installed_version("frps version 0.62.0", "0.61.0"),
        VersionStatus::AheadOfLatest
    );
}

#[test]
fn compare_installed_version_is_not_fooled_by_substrings() {
    assert_eq!(
        compare_installed_version("1.23.0", "1.2.3"),
        VersionStatus::AheadOfLatest
    );
    assert_eq!(
        compare_installed_version("0.1.23", "1.2.3"),
        VersionStatus::UpgradeAvailable
    );
}

#[test]
fn compare_installed_version_falls_back_to_containment() {
    assert_eq!(
        compare_installed_version("frps dev-build 2024", "dev-build"),
        VersionStatus::UpToDate
    );
    assert_eq!(
        compare_installed_version("unknown", "1.2.3"),
        VersionStatus::UpgradeAvailable
    );
}

#[test]
fn service_config_defaults_generate_secrets() {
    let first = ServiceConfig::default();
    let second = ServiceConfig::default();
    assert_eq!(first.dashboard_password.len(), 8);
    assert_eq!(first.token.len(), 16);
    assert!(first.token.chars().all(|ch| ch.is_ascii_alphanumeric()));
    assert_ne!(first.token, second.token);
    first.validate().expect("defaults must validate");
}

#[test]
fn service_config_transport_ports_follow_defaults() {
    let mut config = ServiceConfig::default();
    assert_eq!(config.effective_kcp_bind_port(), Some(5443));
    assert_eq!(config.effective_quic_bind_port(), Some(443));

    config.kcp_bind_port = Some(7000);
    assert_eq!(config.effective_kcp_bind_port(), Some(7000));

    config.transport_protocols = false;
    assert_eq!(config.effective_kcp_bind_port(), None);
    assert_eq!(config.effective_quic_bind_port(), None);
}

#[test]
fn service_config_validate_rejects_out_of_range_values() {
    let mut config = ServiceConfig {
        max_pool_count: 51,
        ..ServiceConfig::default()
    };
    assert!(config.validate().is_err());

    config.max_pool_count = 5;
    config.log_max_days = 0;
    assert!(config.validate().is_err());

    config.log_max_days = 3;
    config.bind_port = 0;
    let err = config.validate().expect_err("port zero must fail");
    assert!(err.to_string().contains("bind_port"));

    config.bind_port = 5443;
    config.token = "  ".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn tcp_listen_ports_are_deduplicated() {
    let config = ServiceConfig {
        vhost_http_port: 5443,
        ..ServiceConfig::default()
    };
    assert_eq!(config.tcp_listen_ports(), vec![5443, 443, 6443]);
}

#[test]
fn render_service_config_produces_frps_keys() {
    let target = InstallTarget::rooted("/srv/onekey");
    let config = ServiceConfig {
        dashboard_password: "s3cret00".to_string(),
        token: "tokentokentoken1".to_string(),
        ..ServiceConfig::default()
    };
    let rendered = render_service_config(&config, &target, "203.0.113.7").expect("must render");
    assert!(rendered.starts_with("# frps configuration generated by frps-onekey"));

    let parsed: toml::Table = toml::from_str(&rendered).expect("rendered config must be toml");
    assert_eq!(parsed["bindAddr"].as_str(), Some("0.0.0.0"));
    assert_eq!(parsed["bindPort"].as_integer(), Some(5443));
    assert_eq!(parsed["kcpBindPort"].as_integer(), Some(5443));
    assert_eq!(parsed["quicBindPort"].as_integer(), Some(443));
    assert_eq!(parsed["vhostHTTPPort"].as_integer(), Some(80));
    assert_eq!(parsed["vhostHTTPSPort"].as_integer(), Some(443));
    assert_eq!(parsed["subDomainHost"].as_str(), Some("203.0.113.7"));
    assert_eq!(parsed["transport"]["maxPoolCount"].as_integer(), Some(5));
    assert_eq!(parsed["transport"]["tcpMux"].as_bool(), Some(true));
    assert_eq!(parsed["transport"]["heartbeatTimeout"].as_integer(), Some(90));
    assert_eq!(parsed["webServer"]["port"].as_integer(), Some(6443));
    assert_eq!(parsed["webServer"]["password"].as_str(), Some("s3cret00"));
    assert_eq!(
        parsed["log"]["to"].as_str(),
        Some("/srv/onekey/usr/local/frps/frps.log")
    );
    assert_eq!(parsed["log"]["level"].as_str(), Some("info"));
    assert_eq!(parsed["auth"]["method"].as_str(), Some("token"));
    assert_eq!(parsed["auth"]["token"].as_str(), Some("tokentokentoken1"));
}

#[test]
fn render_service_config_console_logging_and_no_transport_ports() {
    let target = InstallTarget::system();
    let config = ServiceConfig {
        log_to_file: false,
        transport_protocols: false,
        subdomain_host: Some("frp.example.test".to_string()),
        log_level: LogLevel::Debug,
        ..ServiceConfig::default()
    };
    let rendered = render_service_config(&config, &target, "127.0.0.1").expect("must render");
    let parsed: toml::Table = toml::from_str(&rendered).expect("rendered config must be toml");
    assert_eq!(parsed["log"]["to"].as_str(), Some("console"));
    assert_eq!(parsed["log"]["level"].as_str(), Some("debug"));
    assert_eq!(parsed["subDomainHost"].as_str(), Some("frp.example.test"));
    assert!(!parsed.contains_key("kcpBindPort"));
    assert!(!parsed.contains_key("quicBindPort"));
}

#[test]
fn log_level_parse_accepts_menu_index_and_name() {
    assert_eq!(LogLevel::parse("1"), Some(LogLevel::Info));
    assert_eq!(LogLevel::parse("5"), Some(LogLevel::Trace));
    assert_eq!(LogLevel::parse("WARN"), Some(LogLevel::Warn));
    assert_eq!(LogLevel::parse("0"), None);
    assert_eq!(LogLevel::parse("verbose"), None);
}

#[test]
fn settings_parse_partial_service_table() {
    let raw = r#"
source = "gitee"
arch = "arm64"
assume_yes = true

[service]
bind_port = 7000
token = "fixed-token-value"
log_level = "warn"
"#;
    let settings = Settings::from_toml_str(raw).expect("settings must parse");
    assert_eq!(settings.source, Some(ReleaseSource::Gitee));
    assert_eq!(settings.arch.as_deref(), Some("arm64"));
    assert!(settings.assume_yes);
    assert_eq!(settings.service.bind_port, 7000);
    assert_eq!(settings.service.token, "fixed-token-value");
    assert_eq!(settings.service.log_level, LogLevel::Warn);
    assert_eq!(settings.service.dashboard_port, 6443);
    assert_eq!(settings.service.dashboard_password.len(), 8);
}

#[test]
fn settings_reject_unknown_keys_and_invalid_values() {
    assert!(Settings::from_toml_str("sources = \"github\"\n").is_err());
    assert!(Settings::from_toml_str("[service]\nmax_pool_count = 99\n").is_err());
    assert!(Settings::from_toml_str("source = \"sourceforge\"\n").is_err());
}

#[test]
fn settings_load_missing_default_path_is_empty() {
    let location = SettingsLocation {
        path: std::env::temp_dir().join("onekey-core-tests-missing-settings.toml"),
        required: false,
    };
    let settings = Settings::load(&location).expect("missing optional settings must load");
    assert!(settings.source.is_none());
    assert!(!settings.assume_yes);

    let required = SettingsLocation {
        required: true,
        ..location
    };
    assert!(Settings::load(&required).is_err());
}

#[test]
fn resolve_settings_location_prefers_explicit_then_env() {
    let explicit = resolve_settings_location(
        Some(Path::new("/opt/answers.toml")),
        Some(OsString::from("/env/settings.toml")),
    );
    assert_eq!(explicit.path, PathBuf::from("/opt/answers.toml"));
    assert!(explicit.required);

    let from_env = resolve_settings_location(None, Some(OsString::from("/env/settings.toml")));
    assert_eq!(from_env.path, PathBuf::from("/env/settings.toml"));
    assert!(from_env.required);

    let fallback = resolve_settings_location(None, Some(OsString::new()));
    assert_eq!(fallback.path, PathBuf::from(DEFAULT_SETTINGS_PATH));
    assert!(!fallback.required);
}

#[test]
fn error_kind_survives_context_wrapping() {
    let err = anyhow::Error::new(OnekeyError::ServiceVerification(
        "frps is not running after start".to_string(),
    ))
    .context("failed to start frps");
    assert_eq!(error_kind(&err), Some(ErrorKind::ServiceVerification));
    assert_eq!(error_kind(&anyhow::anyhow!("plain failure")), None);
}
