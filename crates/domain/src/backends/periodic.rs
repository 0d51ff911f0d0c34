//! 周期调度读取器：静态配置与持久化调度库，两者可互换

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{instrument, warn};

use taskpanel_core::models::{
    parse_args_lossy, parse_kwargs_lossy, IntervalSchedule, PeriodicScheduleRecord,
    ScheduleListPage, StoredSchedule,
};
use taskpanel_core::traits::ScheduleStore;
use taskpanel_core::{ClusterHandle, ClusterSettings, PanelError, PanelResult};

use crate::backend::{Backend, BackendMeta, ScheduleSource};

pub use taskpanel_core::SCHEDULE_STORE_MISSING;

const CRONTAB_FIELDS: [&str; 5] = [
    "minute",
    "hour",
    "day_of_month",
    "month_of_year",
    "day_of_week",
];

/// 静态配置中调度表达式的原生文本形式
fn render_schedule(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "N/A".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Object(fields)) if fields.contains_key("every") => {
            let interval = IntervalSchedule {
                every: fields.get("every").and_then(Value::as_i64).unwrap_or(1),
                period: fields
                    .get("period")
                    .and_then(Value::as_str)
                    .unwrap_or("seconds")
                    .to_string(),
            };
            interval.to_string()
        }
        Some(Value::Object(fields)) if CRONTAB_FIELDS.iter().any(|f| fields.contains_key(*f)) => {
            let parts: Vec<String> = CRONTAB_FIELDS
                .iter()
                .map(|f| match fields.get(*f) {
                    Some(Value::String(s)) => s.clone(),
                    Some(Value::Number(n)) => n.to_string(),
                    _ => "*".to_string(),
                })
                .collect();
            format!("<crontab: {} (m/h/dM/MY/d)>", parts.join(" "))
        }
        Some(other) => other.to_string(),
    }
}

fn config_entry(name: &str, entry: &Map<String, Value>) -> PeriodicScheduleRecord {
    PeriodicScheduleRecord {
        name: name.to_string(),
        task: entry
            .get("task")
            .and_then(Value::as_str)
            .unwrap_or("N/A")
            .to_string(),
        schedule: render_schedule(entry.get("schedule")),
        args: entry
            .get("args")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default(),
        kwargs: entry
            .get("kwargs")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default(),
        enabled: None,
        last_run_at: None,
        total_run_count: None,
    }
}

/// 读取 `beat_schedule` 设置；未配置时为空列表
pub fn read_beat_schedule(settings: &ClusterSettings) -> ScheduleListPage {
    let Some(raw) = settings.get("beat_schedule") else {
        return ScheduleListPage::default();
    };
    let Some(schedule) = raw.as_object() else {
        return ScheduleListPage::failed("Error reading beat_schedule: expected a mapping");
    };

    let mut records = Vec::with_capacity(schedule.len());
    let mut error = None;
    for (name, entry) in schedule {
        match entry.as_object() {
            Some(fields) => records.push(config_entry(name, fields)),
            None => {
                warn!("beat_schedule 条目 {} 不是映射，已跳过", name);
                error = Some(format!(
                    "Error reading beat_schedule: entry '{name}' is not a mapping"
                ));
            }
        }
    }
    ScheduleListPage::new(records, error)
}

/// 从集群配置的 beat_schedule 读取
pub struct ConfigScheduleBackend {
    settings: ClusterSettings,
}

impl ConfigScheduleBackend {
    pub const PATH: &'static str = "taskpanel::periodic::ConfigScheduleBackend";
    pub const META: BackendMeta = BackendMeta {
        description: "Periodic tasks from beat_schedule configuration",
        data_source: "Cluster Configuration (beat_schedule)",
    };

    pub fn new(handle: &ClusterHandle) -> Self {
        Self {
            settings: handle.settings().clone(),
        }
    }
}

impl Backend for ConfigScheduleBackend {
    fn meta(&self) -> BackendMeta {
        Self::META
    }
}

#[async_trait]
impl ScheduleSource for ConfigScheduleBackend {
    async fn list_periodic_tasks(&self) -> PanelResult<ScheduleListPage> {
        Ok(read_beat_schedule(&self.settings))
    }
}

/// 持久化条目 → 展示记录；参数解析失败时退化为空
fn stored_entry(entry: StoredSchedule) -> PeriodicScheduleRecord {
    PeriodicScheduleRecord {
        schedule: entry.schedule_text(),
        args: parse_args_lossy(entry.args.as_deref()),
        kwargs: parse_kwargs_lossy(entry.kwargs.as_deref()),
        enabled: Some(entry.enabled),
        last_run_at: entry.last_run_at,
        total_run_count: Some(entry.total_run_count),
        name: entry.name,
        task: entry.task,
    }
}

/// 从持久化调度库读取启用的条目
pub struct StoreScheduleBackend {
    store: Option<Arc<dyn ScheduleStore>>,
}

impl StoreScheduleBackend {
    pub const PATH: &'static str = "taskpanel::periodic::StoreScheduleBackend";
    pub const META: BackendMeta = BackendMeta {
        description: "Periodic tasks from the beat schedule database",
        data_source: "Database (beat schedule store)",
    };

    pub fn new(handle: &ClusterHandle) -> Self {
        Self {
            store: handle.schedules(),
        }
    }
}

impl Backend for StoreScheduleBackend {
    fn meta(&self) -> BackendMeta {
        Self::META
    }
}

#[async_trait]
impl ScheduleSource for StoreScheduleBackend {
    #[instrument(skip(self))]
    async fn list_periodic_tasks(&self) -> PanelResult<ScheduleListPage> {
        let Some(store) = &self.store else {
            return Ok(ScheduleListPage::failed(SCHEDULE_STORE_MISSING));
        };

        match store.enabled_entries().await {
            Ok(entries) => Ok(ScheduleListPage::new(
                entries.into_iter().map(stored_entry).collect(),
                None,
            )),
            Err(PanelError::MissingDependency(message)) => {
                warn!("调度库未安装: {}", message);
                Ok(ScheduleListPage::failed(message))
            }
            Err(e) => {
                warn!("读取周期任务失败: {}", e);
                Ok(ScheduleListPage::failed(format!(
                    "Error reading periodic tasks from database: {e}"
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_schedule_forms() {
        assert_eq!(render_schedule(None), "N/A");
        assert_eq!(render_schedule(Some(&json!(30.0))), "30.0");
        assert_eq!(render_schedule(Some(&json!(300))), "300");
        assert_eq!(render_schedule(Some(&json!("every monday"))), "every monday");
        assert_eq!(
            render_schedule(Some(&json!({"minute": "*/5"}))),
            "<crontab: */5 * * * * (m/h/dM/MY/d)>"
        );
        assert_eq!(
            render_schedule(Some(&json!({"minute": 0, "hour": 0}))),
            "<crontab: 0 0 * * * (m/h/dM/MY/d)>"
        );
        assert_eq!(
            render_schedule(Some(&json!({"every": 10, "period": "minutes"}))),
            "every 10 minutes"
        );
    }

    #[test]
    fn test_beat_schedule_keeps_configured_order() {
        let settings = ClusterSettings::new().with(
            "beat_schedule",
            json!({
                "test-task": {
                    "task": "app.tasks.test_task",
                    "schedule": {"minute": "*/5"},
                    "args": [1, 2],
                    "kwargs": {"key": "value"}
                },
                "another-task": {
                    "task": "app.tasks.another_task",
                    "schedule": {"hour": "0", "minute": "0"}
                }
            }),
        );

        let page = read_beat_schedule(&settings);

        assert_eq!(page.error, None);
        assert_eq!(page.periodic_tasks_count, 2);
        let first = &page.periodic_tasks[0];
        assert_eq!(first.name, "test-task");
        assert_eq!(first.args, vec![json!(1), json!(2)]);
        assert_eq!(first.kwargs.get("key"), Some(&json!("value")));
        assert_eq!(first.enabled, None);
        assert_eq!(first.total_run_count, None);
        let second = &page.periodic_tasks[1];
        assert_eq!(second.name, "another-task");
        assert!(second.args.is_empty());
        assert!(second.kwargs.is_empty());
    }

    #[test]
    fn test_missing_beat_schedule_is_empty_not_error() {
        let page = read_beat_schedule(&ClusterSettings::new());
        assert_eq!(page.periodic_tasks_count, 0);
        assert_eq!(page.error, None);
    }

    #[test]
    fn test_malformed_beat_schedule_entry_is_skipped() {
        let settings = ClusterSettings::new().with(
            "beat_schedule",
            json!({"broken": "not-a-mapping", "ok": {"task": "app.tasks.ok", "schedule": 60}}),
        );
        let page = read_beat_schedule(&settings);
        assert_eq!(page.periodic_tasks_count, 1);
        assert_eq!(page.periodic_tasks[0].schedule, "60");
        assert!(page.error.unwrap().contains("'broken'"));
    }
}
