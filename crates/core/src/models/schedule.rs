use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

/// 周期调度记录
///
/// 运行统计只在来源为持久化调度存储时存在；来自静态配置时为空。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodicScheduleRecord {
    pub name: String,
    pub task: String,
    pub schedule: String,
    pub args: Vec<Value>,
    pub kwargs: Map<String, Value>,
    pub enabled: Option<bool>,
    pub last_run_at: Option<DateTime<Utc>>,
    pub total_run_count: Option<u64>,
}

/// 固定间隔调度
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntervalSchedule {
    pub every: i64,
    /// 复数形式的周期单位：days/hours/minutes/seconds/microseconds
    pub period: String,
}

impl fmt::Display for IntervalSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.every == 1 {
            let singular = self.period.strip_suffix('s').unwrap_or(&self.period);
            write!(f, "every {singular}")
        } else {
            write!(f, "every {} {}", self.every, self.period)
        }
    }
}

/// crontab 调度
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrontabSchedule {
    pub minute: String,
    pub hour: String,
    pub day_of_week: String,
    pub day_of_month: String,
    pub month_of_year: String,
    pub timezone: String,
}

impl fmt::Display for CrontabSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {} (m/h/dM/MY/d) {}",
            self.minute,
            self.hour,
            self.day_of_month,
            self.month_of_year,
            self.day_of_week,
            self.timezone
        )
    }
}

/// 太阳事件调度
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolarSchedule {
    pub event: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl fmt::Display for SolarSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, {})", self.event, self.latitude, self.longitude)
    }
}

/// 一次性定点调度
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClockedSchedule {
    pub clocked_time: DateTime<Utc>,
}

impl fmt::Display for ClockedSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.clocked_time)
    }
}

/// 持久化调度存储中的一条记录
///
/// args/kwargs 以序列化文本保存，由读取方负责解析。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredSchedule {
    pub name: String,
    pub task: String,
    pub interval: Option<IntervalSchedule>,
    pub crontab: Option<CrontabSchedule>,
    pub solar: Option<SolarSchedule>,
    pub clocked: Option<ClockedSchedule>,
    pub enabled: bool,
    pub args: Option<String>,
    pub kwargs: Option<String>,
    pub last_run_at: Option<DateTime<Utc>>,
    pub total_run_count: u64,
}

impl StoredSchedule {
    /// 按 interval → crontab → solar → clocked 的优先顺序选出调度表达式
    pub fn schedule_text(&self) -> String {
        if let Some(interval) = &self.interval {
            interval.to_string()
        } else if let Some(crontab) = &self.crontab {
            crontab.to_string()
        } else if let Some(solar) = &self.solar {
            solar.to_string()
        } else if let Some(clocked) = &self.clocked {
            clocked.to_string()
        } else {
            "N/A".to_string()
        }
    }
}

/// 解析序列化的位置参数；空值或格式错误时退化为空列表
pub fn parse_args_lossy(raw: Option<&str>) -> Vec<Value> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Vec::new(),
        Some(text) => serde_json::from_str(text).unwrap_or_else(|e| {
            debug!("无法解析调度参数 args={text:?}: {e}");
            Vec::new()
        }),
    }
}

/// 解析序列化的关键字参数；空值或格式错误时退化为空映射
pub fn parse_kwargs_lossy(raw: Option<&str>) -> Map<String, Value> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Map::new(),
        Some(text) => serde_json::from_str(text).unwrap_or_else(|e| {
            debug!("无法解析调度参数 kwargs={text:?}: {e}");
            Map::new()
        }),
    }
}

/// 周期任务列表页
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleListPage {
    pub periodic_tasks: Vec<PeriodicScheduleRecord>,
    pub periodic_tasks_count: usize,
    pub error: Option<String>,
}

impl ScheduleListPage {
    pub fn new(periodic_tasks: Vec<PeriodicScheduleRecord>, error: Option<String>) -> Self {
        Self {
            periodic_tasks_count: periodic_tasks.len(),
            periodic_tasks,
            error,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self::new(Vec::new(), Some(error.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn stored(name: &str) -> StoredSchedule {
        StoredSchedule {
            name: name.to_string(),
            task: "app.tasks.cleanup".to_string(),
            interval: None,
            crontab: None,
            solar: None,
            clocked: None,
            enabled: true,
            args: None,
            kwargs: None,
            last_run_at: None,
            total_run_count: 0,
        }
    }

    #[test]
    fn test_interval_rendering() {
        let five = IntervalSchedule { every: 5, period: "minutes".into() };
        let one = IntervalSchedule { every: 1, period: "hours".into() };
        assert_eq!(five.to_string(), "every 5 minutes");
        assert_eq!(one.to_string(), "every hour");
    }

    #[test]
    fn test_crontab_rendering_order() {
        let cron = CrontabSchedule {
            minute: "0".into(),
            hour: "4".into(),
            day_of_week: "1".into(),
            day_of_month: "*".into(),
            month_of_year: "*".into(),
            timezone: "UTC".into(),
        };
        assert_eq!(cron.to_string(), "0 4 * * 1 (m/h/dM/MY/d) UTC");
    }

    #[test]
    fn test_schedule_precedence() {
        let mut entry = stored("nightly");
        assert_eq!(entry.schedule_text(), "N/A");

        entry.clocked = Some(ClockedSchedule {
            clocked_time: Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap(),
        });
        assert!(entry.schedule_text().starts_with("2025-03-01 08:00:00"));

        entry.solar = Some(SolarSchedule { event: "sunrise".into(), latitude: 51.5, longitude: -0.12 });
        assert_eq!(entry.schedule_text(), "sunrise (51.5, -0.12)");

        entry.interval = Some(IntervalSchedule { every: 30, period: "seconds".into() });
        assert_eq!(entry.schedule_text(), "every 30 seconds");
    }

    #[test]
    fn test_lossy_argument_parsing() {
        assert_eq!(parse_args_lossy(Some("[1, \"a\"]")), vec![json!(1), json!("a")]);
        assert_eq!(parse_args_lossy(Some("[1, ")), Vec::<Value>::new());
        assert_eq!(parse_args_lossy(Some("{\"a\": 1}")), Vec::<Value>::new());
        assert_eq!(parse_args_lossy(None), Vec::<Value>::new());

        let kwargs = parse_kwargs_lossy(Some("{\"retries\": 3}"));
        assert_eq!(kwargs.get("retries"), Some(&json!(3)));
        assert!(parse_kwargs_lossy(Some("not json")).is_empty());
        assert!(parse_kwargs_lossy(Some("")).is_empty());
    }
}
