use std::error::Error;
use std::time::Duration;

use hotfolder::config::{load_and_validate, load_from_path};
use hotfolder::errors::HotFolderError;
use hotfolder::types::DetectorMode;
use hotfolder_test_utils::{ConfigFileBuilder, HotFolderFixture};

type TestResult = Result<(), Box<dyn Error>>;

const MINIMAL: &str = r#"
[folders]
watch = "watch"
stop = "stop"
processed = "processed"
failed = "failed"

[handler]
cmd = "ingest {file}"
"#;

#[test]
fn minimal_config_gets_defaults_and_resolves_folders() -> TestResult {
    let fixture = HotFolderFixture::new()?;
    let path = fixture.write_config(MINIMAL)?;

    let cfg = load_and_validate(&path)?;

    assert_eq!(cfg.folders().watch, fixture.root().join("watch"));
    assert_eq!(cfg.folders().stop, fixture.root().join("stop"));
    assert_eq!(cfg.scan().poll_interval_ms, 1000);
    assert_eq!(cfg.scan().concurrency, 1);
    assert_eq!(cfg.scan().grace_period_ms, 5000);
    assert_eq!(cfg.scan().detector, DetectorMode::Native);
    assert_eq!(cfg.scan().stop_file, "stoprunning");
    assert!(cfg.handler().process_modified);
    assert_eq!(cfg.handler().timeout_ms, None);
    Ok(())
}

#[test]
fn scan_section_maps_to_watcher_settings() -> TestResult {
    let fixture = HotFolderFixture::new()?;
    let body = format!(
        "{MINIMAL}\n[scan]\npoll_interval_ms = 250\nconcurrency = 4\ngrace_period_ms = 100\ndetector = \"polling\"\ninclude = [\"*.xml\"]\nstop_file = \"halt\"\n"
    );
    let path = fixture.write_config(&body)?;

    let settings = load_and_validate(&path)?.scan_settings()?;

    assert_eq!(settings.watch.folder, fixture.root().join("watch"));
    assert_eq!(settings.watch.poll_interval, Duration::from_millis(250));
    assert_eq!(settings.watch.concurrency, 4);
    assert_eq!(settings.watch.grace_period, Duration::from_millis(100));
    assert_eq!(settings.watch.detector, DetectorMode::Polling);
    assert!(settings.watch.filter.matches("order.xml"));
    assert!(!settings.watch.filter.matches("order.txt"));
    assert_eq!(settings.stop_folder, fixture.root().join("stop"));
    assert_eq!(settings.stop_file, "halt");
    Ok(())
}

#[test]
fn absolute_folders_are_kept() -> TestResult {
    let fixture = HotFolderFixture::new()?;
    let elsewhere = tempfile::tempdir()?;
    let body = MINIMAL.replace(
        "watch = \"watch\"",
        &format!("watch = {:?}", elsewhere.path().to_string_lossy()),
    );
    let path = fixture.write_config(&body)?;

    let cfg = load_and_validate(&path)?;
    assert_eq!(cfg.folders().watch, elsewhere.path());
    Ok(())
}

#[test]
fn handler_settings_are_carried_over() -> TestResult {
    let fixture = HotFolderFixture::new()?;
    let cfg = fixture
        .config()
        .with_cmd("convert {file}")
        .with_timeout_ms(1500)
        .build();

    let cmd = cfg.command_settings();
    assert_eq!(cmd.cmd, "convert {file}");
    assert_eq!(cmd.timeout, Some(Duration::from_millis(1500)));
    assert_eq!(cmd.processed_folder, fixture.processed);
    assert_eq!(cmd.failed_folder, fixture.failed);
    Ok(())
}

#[test]
fn missing_handler_section_is_a_toml_error() -> TestResult {
    let fixture = HotFolderFixture::new()?;
    let body = MINIMAL.replace("[handler]\ncmd = \"ingest {file}\"\n", "");
    let path = fixture.write_config(&body)?;

    let err = load_from_path(&path).unwrap_err();
    assert!(matches!(err, HotFolderError::TomlError(_)), "got {err:?}");
    Ok(())
}

#[test]
fn missing_file_is_an_io_error() {
    let err = load_and_validate("/definitely/not/here/Hotfolder.toml").unwrap_err();
    assert!(matches!(err, HotFolderError::IoError(_)), "got {err:?}");
}

#[test]
fn zero_concurrency_is_rejected() {
    let root = std::path::Path::new("/srv/hot");
    let err = ConfigFileBuilder::new(root)
        .with_concurrency(0)
        .try_build()
        .unwrap_err();
    assert!(matches!(err, HotFolderError::ConfigError(ref m) if m.contains("concurrency")));
}

#[test]
fn zero_poll_interval_is_rejected() {
    let root = std::path::Path::new("/srv/hot");
    let err = ConfigFileBuilder::new(root)
        .with_poll_interval_ms(0)
        .try_build()
        .unwrap_err();
    assert!(matches!(err, HotFolderError::ConfigError(ref m) if m.contains("poll_interval_ms")));
}

#[test]
fn shared_folders_are_rejected() {
    let root = std::path::Path::new("/srv/hot");
    let err = ConfigFileBuilder::new(root)
        .with_stop_folder(root.join("watch"))
        .try_build()
        .unwrap_err();
    assert!(matches!(err, HotFolderError::ConfigError(ref m) if m.contains("must be different")));
}

#[test]
fn empty_command_is_rejected() {
    let root = std::path::Path::new("/srv/hot");
    let err = ConfigFileBuilder::new(root)
        .with_cmd("   ")
        .try_build()
        .unwrap_err();
    assert!(matches!(err, HotFolderError::ConfigError(ref m) if m.contains("cmd")));
}

#[test]
fn stop_file_must_be_a_plain_name() {
    let root = std::path::Path::new("/srv/hot");
    let err = ConfigFileBuilder::new(root)
        .with_stop_file("sub/stoprunning")
        .try_build()
        .unwrap_err();
    assert!(matches!(err, HotFolderError::ConfigError(ref m) if m.contains("stop_file")));
}

#[test]
fn invalid_glob_is_rejected() {
    let root = std::path::Path::new("/srv/hot");
    let err = ConfigFileBuilder::new(root)
        .include("[unclosed")
        .try_build()
        .unwrap_err();
    assert!(matches!(err, HotFolderError::ConfigError(ref m) if m.contains("patterns")));
}

#[test]
fn overrides_are_validated() {
    let root = std::path::Path::new("/srv/hot");
    let cfg = ConfigFileBuilder::new(root).build();

    let cfg = cfg
        .with_overrides(Some(3), Some(50), Some(DetectorMode::Polling))
        .expect("valid overrides");
    assert_eq!(cfg.scan().concurrency, 3);
    assert_eq!(cfg.scan().poll_interval_ms, 50);
    assert_eq!(cfg.scan().detector, DetectorMode::Polling);

    let err = cfg.with_overrides(Some(0), None, None).unwrap_err();
    assert!(matches!(err, HotFolderError::ConfigError(_)));
}

#[test]
fn detector_mode_parses_from_cli_strings() {
    assert_eq!("native".parse::<DetectorMode>(), Ok(DetectorMode::Native));
    assert_eq!("Polling".parse::<DetectorMode>(), Ok(DetectorMode::Polling));
    assert_eq!("poll".parse::<DetectorMode>(), Ok(DetectorMode::Polling));
    assert!("inotify".parse::<DetectorMode>().is_err());
}
