//! Test data builders with sensible defaults

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::{json, Value};
use taskpanel_core::models::{
    CrontabSchedule, ExchangeInfo, IntervalSchedule, PoolStats, QueueBinding, StoredSchedule,
    TaskInfo, TaskRecord, TaskStatus, WorkerStats,
};

/// Fixed reference instant so ordering assertions are deterministic
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 15, 8, 0, 0).unwrap()
}

/// Builder for persisted task records
pub struct TaskRecordBuilder {
    record: TaskRecord,
}

impl TaskRecordBuilder {
    pub fn new(id: &str) -> Self {
        let mut record = TaskRecord::new(id, "app.tasks.test_task", TaskStatus::Success);
        record.date_created = Some(base_time());
        Self { record }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.record.name = Some(name.to_string());
        self
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.record.status = status;
        self
    }

    /// Creation time as an offset in minutes from [`base_time`]
    pub fn created_at_minute(mut self, minutes: i64) -> Self {
        self.record.date_created = Some(base_time() + Duration::minutes(minutes));
        self
    }

    /// Completion `seconds` after creation
    pub fn done_after_seconds(mut self, seconds: i64) -> Self {
        let created = self.record.date_created.unwrap_or_else(base_time);
        self.record.date_done = Some(created + Duration::seconds(seconds));
        self
    }

    pub fn with_worker(mut self, worker: &str) -> Self {
        self.record.worker = Some(worker.to_string());
        self
    }

    pub fn with_result(mut self, result: &str) -> Self {
        self.record.result = Some(result.to_string());
        self
    }

    pub fn with_traceback(mut self, traceback: &str) -> Self {
        self.record.traceback = Some(traceback.to_string());
        self
    }

    pub fn build(self) -> TaskRecord {
        self.record
    }
}

/// Builder for `stats` replies
pub struct WorkerStatsBuilder {
    stats: WorkerStats,
}

impl WorkerStatsBuilder {
    pub fn new(hostname: &str) -> Self {
        Self {
            stats: WorkerStats {
                hostname: Some(hostname.to_string()),
                pid: Some(4242),
                pool: Some(PoolStats {
                    implementation: Some("celery.concurrency.prefork:TaskPool".to_string()),
                    max_concurrency: Some(4),
                    processes: vec![101, 102, 103, 104],
                }),
                prefetch_count: Some(16),
                total: BTreeMap::new(),
                clock: Some(json!(812)),
                rusage: json!({"utime": 1.5, "stime": 0.25, "maxrss": 52000}),
                broker: json!({"hostname": "localhost", "port": 6379, "transport": "redis"}),
            },
        }
    }

    pub fn with_total(mut self, task: &str, count: u64) -> Self {
        self.stats.total.insert(task.to_string(), count);
        self
    }

    pub fn with_pid(mut self, pid: u64) -> Self {
        self.stats.pid = Some(pid);
        self
    }

    pub fn build(self) -> WorkerStats {
        self.stats
    }
}

/// An active task entry as reported by a worker
pub fn task_info(id: &str, name: &str, hostname: &str) -> TaskInfo {
    TaskInfo {
        id: id.to_string(),
        name: Some(name.to_string()),
        args: json!([]),
        kwargs: json!({}),
        task_type: Some(name.to_string()),
        hostname: Some(hostname.to_string()),
        time_start: Some(base_time().timestamp() as f64),
        acknowledged: Some(true),
        worker_pid: Some(101),
        delivery_info: json!({"routing_key": "celery"}),
    }
}

/// A queue binding on a direct exchange of the same name
pub fn queue_binding(name: &str) -> QueueBinding {
    QueueBinding {
        name: Some(name.to_string()),
        exchange: ExchangeInfo {
            name: Some(name.to_string()),
            exchange_type: Some("direct".to_string()),
            durable: Some(true),
            auto_delete: Some(false),
            arguments: Value::Null,
        },
        routing_key: Some(name.to_string()),
        exclusive: Some(false),
        ..Default::default()
    }
}

/// Builder for persisted schedule entries
pub struct StoredScheduleBuilder {
    entry: StoredSchedule,
}

impl StoredScheduleBuilder {
    pub fn new(name: &str, task: &str) -> Self {
        Self {
            entry: StoredSchedule {
                name: name.to_string(),
                task: task.to_string(),
                interval: None,
                crontab: None,
                solar: None,
                clocked: None,
                enabled: true,
                args: Some("[]".to_string()),
                kwargs: Some("{}".to_string()),
                last_run_at: None,
                total_run_count: 0,
            },
        }
    }

    pub fn every(mut self, every: i64, period: &str) -> Self {
        self.entry.interval = Some(IntervalSchedule {
            every,
            period: period.to_string(),
        });
        self
    }

    pub fn crontab(mut self, minute: &str, hour: &str) -> Self {
        self.entry.crontab = Some(CrontabSchedule {
            minute: minute.to_string(),
            hour: hour.to_string(),
            day_of_week: "*".to_string(),
            day_of_month: "*".to_string(),
            month_of_year: "*".to_string(),
            timezone: "UTC".to_string(),
        });
        self
    }

    pub fn with_args(mut self, args: &str) -> Self {
        self.entry.args = Some(args.to_string());
        self
    }

    pub fn with_kwargs(mut self, kwargs: &str) -> Self {
        self.entry.kwargs = Some(kwargs.to_string());
        self
    }

    pub fn disabled(mut self) -> Self {
        self.entry.enabled = false;
        self
    }

    pub fn ran(mut self, count: u64) -> Self {
        self.entry.total_run_count = count;
        self.entry.last_run_at = Some(base_time());
        self
    }

    pub fn build(self) -> StoredSchedule {
        self.entry
    }
}
