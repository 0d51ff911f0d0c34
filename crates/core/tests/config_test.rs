use std::io::Write;
use std::sync::Mutex;

use taskpanel_core::PanelConfig;

/// 进程环境是全局的，读写环境变量的加载需串行
static ENV_LOCK: Mutex<()> = Mutex::new(());

/// 设置环境变量后加载配置，结束时清除
fn load_with_env(path: Option<&str>, vars: &[(&str, &str)]) -> PanelConfig {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    for (key, value) in vars {
        std::env::set_var(key, value);
    }
    let config = PanelConfig::load(path);
    for (key, _) in vars {
        std::env::remove_var(key);
    }
    config.unwrap()
}

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_beat_schedule_keeps_file_order() {
    let file = write_config(
        r#"
[cluster.beat_schedule.zeta]
task = "app.tasks.zeta"
schedule = 60

[cluster.beat_schedule.alpha]
task = "app.tasks.alpha"
schedule = 30

[cluster.beat_schedule.mid]
task = "app.tasks.mid"
schedule = 10
"#,
    );

    let config = load_with_env(file.path().to_str(), &[]);
    let names: Vec<&str> = config
        .cluster
        .get_object("beat_schedule")
        .unwrap()
        .keys()
        .map(String::as_str)
        .collect();

    assert_eq!(names, vec!["zeta", "alpha", "mid"]);
}

#[test]
fn test_environment_overrides_file_values() {
    let file = write_config(
        r#"
[database]
url = "postgres://file@localhost/results"
max_connections = 2
"#,
    );

    let config = load_with_env(
        file.path().to_str(),
        &[("TASKPANEL_DATABASE__MAX_CONNECTIONS", "9")],
    );

    assert_eq!(config.database.max_connections, 9);
    assert_eq!(
        config.database.url.as_deref(),
        Some("postgres://file@localhost/results")
    );
}

#[test]
fn test_single_underscore_prefix_reaches_nested_sections() {
    let file = write_config("");

    let config = load_with_env(
        file.path().to_str(),
        &[("TASKPANEL_CONTROL__TIMEOUT_SECONDS", "7")],
    );

    assert_eq!(config.control.timeout_seconds, 7);
}
