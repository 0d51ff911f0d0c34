use serde::{Deserialize, Serialize};

use super::worker::WorkerRecord;

/// 集群配置的时点快照
///
/// 每次请求重新计算，不缓存。派生字段（broker 类别、可读的过期时间）
/// 在读取时由原始设置计算得到。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterConfigSnapshot {
    pub broker_url: String,
    pub broker_type: Option<String>,
    pub result_backend: String,
    pub result_backend_type: Option<String>,
    pub timezone: String,
    pub task_serializer: String,
    pub result_serializer: String,
    pub accept_content: Vec<String>,
    // 任务执行设置
    pub task_acks_late: bool,
    pub task_track_started: bool,
    pub task_time_limit: Option<u64>,
    pub task_soft_time_limit: Option<u64>,
    pub task_ignore_result: bool,
    pub task_always_eager: bool,
    // 队列设置
    pub create_missing_queues: bool,
    pub default_queue: String,
    pub default_exchange: String,
    pub default_routing_key: String,
    // Worker设置
    pub worker_prefetch_multiplier: u64,
    pub worker_max_tasks_per_child: Option<u64>,
    // 结果设置
    pub result_expires: Option<String>,
}

/// 集群总览：一次 stats 广播得到的 worker 集合加配置快照
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterStatus {
    pub cluster_available: bool,
    pub workers: Vec<String>,
    pub workers_detail: Vec<WorkerRecord>,
    pub active_workers_count: usize,
    pub registered_tasks_count: usize,
    pub error: Option<String>,
    pub config: ClusterConfigSnapshot,
}
