use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::queue::QueueBinding;

/// 工作进程池信息（stats 响应中的 `pool` 段）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolStats {
    pub implementation: Option<String>,
    #[serde(rename = "max-concurrency")]
    pub max_concurrency: Option<u64>,
    pub processes: Vec<u64>,
}

/// 单个 worker 对 stats 广播的响应
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerStats {
    pub hostname: Option<String>,
    pub pid: Option<u64>,
    pub pool: Option<PoolStats>,
    pub prefetch_count: Option<u64>,
    /// 按任务类型累计的执行次数
    pub total: BTreeMap<String, u64>,
    pub clock: Option<Value>,
    pub rusage: Value,
    pub broker: Value,
}

impl WorkerStats {
    pub fn total_tasks_executed(&self) -> u64 {
        self.total.values().sum()
    }

    pub fn pool_implementation(&self) -> Option<String> {
        self.pool.as_ref().and_then(|p| p.implementation.clone())
    }

    pub fn concurrency(&self) -> Option<u64> {
        self.pool.as_ref().and_then(|p| p.max_concurrency)
    }

    /// 时钟值统一渲染为文本
    pub fn clock_text(&self) -> Option<String> {
        self.clock.as_ref().map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }
}

/// active/reserved 列表中的任务条目
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskInfo {
    pub id: String,
    pub name: Option<String>,
    pub args: Value,
    pub kwargs: Value,
    #[serde(rename = "type")]
    pub task_type: Option<String>,
    pub hostname: Option<String>,
    /// 开始执行时间（Unix时间戳，秒）
    pub time_start: Option<f64>,
    pub acknowledged: Option<bool>,
    pub worker_pid: Option<u64>,
    pub delivery_info: Value,
}

/// scheduled 列表中的条目：ETA + 请求体
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduledTaskInfo {
    pub eta: Option<String>,
    pub priority: Option<u64>,
    pub request: TaskInfo,
}

/// 工作节点记录（仅来自实时广播响应）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerRecord {
    pub name: String,
    pub status: String,
    pub hostname: String,
    pub pid: Option<u64>,
    pub pool: Option<String>,
    pub concurrency: Option<u64>,
    pub prefetch_count: Option<u64>,
    pub total_tasks: BTreeMap<String, u64>,
    pub total_tasks_executed: u64,
    pub clock: Option<String>,
    pub rusage: Value,
}

impl WorkerRecord {
    pub fn from_stats(name: &str, stats: &WorkerStats) -> Self {
        Self {
            name: name.to_string(),
            status: "online".to_string(),
            hostname: stats.hostname.clone().unwrap_or_else(|| name.to_string()),
            pid: stats.pid,
            pool: stats.pool_implementation(),
            concurrency: stats.concurrency(),
            prefetch_count: stats.prefetch_count,
            total_tasks: stats.total.clone(),
            total_tasks_executed: stats.total_tasks_executed(),
            clock: stats.clock_text(),
            rusage: stats.rusage.clone(),
        }
    }
}

/// 单个 worker 的详细视图（定向查询）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerDetail {
    #[serde(flatten)]
    pub summary: WorkerRecord,
    pub processes: Vec<u64>,
    pub broker: Value,
    pub active_tasks: Vec<TaskInfo>,
    pub reserved_tasks: Vec<TaskInfo>,
    pub scheduled_tasks: Vec<ScheduledTaskInfo>,
    pub registered_tasks: Vec<String>,
    pub active_queues: Vec<QueueBinding>,
}

impl WorkerDetail {
    pub fn active_tasks_count(&self) -> usize {
        self.active_tasks.len()
    }

    pub fn reserved_tasks_count(&self) -> usize {
        self.reserved_tasks.len()
    }

    pub fn scheduled_tasks_count(&self) -> usize {
        self.scheduled_tasks.len()
    }
}

/// worker 列表页
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkerListPage {
    pub workers: Vec<WorkerRecord>,
    pub active_workers_count: usize,
    pub registered_tasks_count: usize,
    pub cluster_available: bool,
    pub config: super::cluster::ClusterConfigSnapshot,
    pub error: Option<String>,
}

impl WorkerListPage {
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Default::default()
        }
    }
}
