//! 集群检查器
//!
//! 总览页只发一次 stats 广播，所有可展示的信息（进程池、并发、预取、累计任务数、
//! pid、资源占用）都从这一次响应中推导。实时的 active/reserved/scheduled 计数需要
//! 额外广播，不在这条路径上获取。

use std::collections::HashMap;

use metrics::counter;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use taskpanel_core::models::{
    ClusterConfigSnapshot, ClusterStatus, QueueBinding, QueueListPage, QueueRecord, WorkerRecord,
};
use taskpanel_core::traits::{Destination, Replies};
use taskpanel_core::{ClusterHandle, ClusterSettings};

/// 没有任何 worker 响应时的提示
pub const NO_WORKERS_MESSAGE: &str = "No workers are currently running";

/// broker URL 前缀 → 类别，按顺序匹配
const BROKER_KINDS: &[(&[&str], &str)] = &[
    (&["redis://", "rediss://", "redis+socket://"], "Redis"),
    (
        &["amqp://", "amqps://", "pyamqp://", "librabbitmq://"],
        "RabbitMQ (AMQP)",
    ),
    (&["sqs://", "sqss://"], "Amazon SQS"),
    (&["mongodb://"], "MongoDB"),
    (&["kafka://"], "Apache Kafka"),
    (&["azureservicebus://"], "Azure Service Bus"),
    (&["memory://"], "In-Memory"),
];

/// broker URL 分类，首个匹配的前缀胜出；空 URL 无类别
pub fn classify_broker(url: &str) -> Option<&'static str> {
    if url.is_empty() {
        return None;
    }
    let label = BROKER_KINDS
        .iter()
        .find(|(prefixes, _)| prefixes.iter().any(|p| url.starts_with(p)))
        .map(|(_, label)| *label)
        .unwrap_or("Other");
    Some(label)
}

/// 结果后端分类
pub fn classify_result_backend(url: &str) -> Option<&'static str> {
    if url.is_empty() {
        return None;
    }
    let label = if ["redis://", "rediss://", "redis+socket://"]
        .iter()
        .any(|p| url.starts_with(p))
    {
        "Redis"
    } else if url.starts_with("db+") || url == "django-db" || url == "django-cache" {
        "Database"
    } else if url.starts_with("mongodb://") {
        "MongoDB"
    } else if url.starts_with("cache+") {
        "Cache"
    } else if url.starts_with("rpc://") {
        "RPC"
    } else if url.starts_with("s3://") {
        "Amazon S3"
    } else if url.starts_with("file://") {
        "Filesystem"
    } else if url == "disabled" || url == "rpc" {
        "Disabled"
    } else {
        "Other"
    };
    Some(label)
}

/// 结果过期时间的可读形式；整数秒按天/小时/分钟/秒取整，其他值原样转文本
pub fn humanize_expires(value: &Value) -> String {
    match value.as_u64() {
        Some(secs) if secs >= 86_400 => format!("{} days", secs / 86_400),
        Some(secs) if secs >= 3_600 => format!("{} hours", secs / 3_600),
        Some(secs) if secs >= 60 => format!("{} minutes", secs / 60),
        Some(secs) => format!("{secs} seconds"),
        None => match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        },
    }
}

/// 从设置读取配置快照，每个键都有默认值，从不失败
pub fn configuration_snapshot(settings: &ClusterSettings) -> ClusterConfigSnapshot {
    let broker_url = settings.get_str("broker_url", "");
    let result_backend = settings.get_str("result_backend", "");

    ClusterConfigSnapshot {
        broker_type: classify_broker(&broker_url).map(str::to_string),
        result_backend_type: classify_result_backend(&result_backend).map(str::to_string),
        broker_url,
        result_backend,
        timezone: settings.get_str("timezone", "UTC"),
        task_serializer: settings.get_str("task_serializer", "json"),
        result_serializer: settings.get_str("result_serializer", "json"),
        accept_content: settings.get_str_list("accept_content", &["json"]),
        task_acks_late: settings.get_bool("task_acks_late", false),
        task_track_started: settings.get_bool("task_track_started", false),
        task_time_limit: settings.get_u64("task_time_limit"),
        task_soft_time_limit: settings.get_u64("task_soft_time_limit"),
        task_ignore_result: settings.get_bool("task_ignore_result", false),
        task_always_eager: settings.get_bool("task_always_eager", false),
        create_missing_queues: settings.get_bool("task_create_missing_queues", true),
        default_queue: settings.get_str("task_default_queue", "celery"),
        default_exchange: settings.get_str("task_default_exchange", ""),
        default_routing_key: settings.get_str("task_default_routing_key", ""),
        worker_prefetch_multiplier: settings.get_u64_or("worker_prefetch_multiplier", 4),
        worker_max_tasks_per_child: settings.get_u64("worker_max_tasks_per_child"),
        result_expires: settings.get("result_expires").map(humanize_expires),
    }
}

/// 按队列名合并各 worker 的绑定：首次出现的元数据胜出，worker 按出现顺序去重合并
pub fn merge_queue_bindings(replies: &Replies<Vec<QueueBinding>>) -> Vec<QueueRecord> {
    let mut queues: Vec<QueueRecord> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for (worker, bindings) in replies.iter() {
        for binding in bindings {
            let slot = *index
                .entry(binding.queue_name().to_string())
                .or_insert_with(|| {
                    queues.push(QueueRecord::from_binding(binding));
                    queues.len() - 1
                });
            let record = &mut queues[slot];
            if !record.workers.iter().any(|w| w == worker) {
                record.workers.push(worker.to_string());
            }
        }
    }

    queues
}

/// 记录一次控制平面往返
pub(crate) fn record_broadcast(operation: &'static str, destination: &Destination) {
    debug!("控制平面请求 {} -> {}", operation, destination);
    counter!(
        "taskpanel_broadcasts_total",
        "operation" => operation,
        "scope" => destination.scope()
    )
    .increment(1);
}

pub struct ClusterInspector<'a> {
    handle: &'a ClusterHandle,
}

impl<'a> ClusterInspector<'a> {
    pub fn new(handle: &'a ClusterHandle) -> Self {
        Self { handle }
    }

    pub fn get_configuration_info(&self) -> ClusterConfigSnapshot {
        configuration_snapshot(self.handle.settings())
    }

    /// 集群总览：一次 stats 广播
    ///
    /// 无响应是空闲集群的正常状态，报告为"没有 worker"；传输异常转成消息。
    /// 两种情况下配置快照都照常填充。
    #[instrument(skip(self))]
    pub async fn get_status(&self) -> ClusterStatus {
        let mut status = ClusterStatus {
            config: self.get_configuration_info(),
            ..Default::default()
        };

        let destination = Destination::Broadcast;
        record_broadcast("stats", &destination);
        let replies = match self.handle.control().stats(&destination).await {
            Ok(Some(replies)) => replies,
            Ok(None) => {
                debug!("stats 广播无响应");
                status.error = Some(NO_WORKERS_MESSAGE.to_string());
                return status;
            }
            Err(e) => {
                warn!("stats 广播失败: {}", e);
                status.error = Some(format!("Error connecting to cluster: {e}"));
                return status;
            }
        };

        status.cluster_available = true;
        status.workers = replies.workers().map(str::to_string).collect();
        status.active_workers_count = replies.len();
        status.workers_detail = replies
            .iter()
            .map(|(name, stats)| WorkerRecord::from_stats(name, stats))
            .collect();
        // 本地注册表，无需网络往返
        status.registered_tasks_count = self.handle.registered_tasks().len();
        status
    }

    /// 宿主应用注册的任务名，可排除内部任务
    pub fn get_registered_tasks(&self, exclude_internal: bool) -> Vec<String> {
        self.handle
            .registered_tasks()
            .iter()
            .filter(|name| !(exclude_internal && name.starts_with("celery.")))
            .cloned()
            .collect()
    }

    /// 所有 worker 的队列绑定，一次 active_queues 广播
    #[instrument(skip(self))]
    pub async fn get_queues(&self) -> QueueListPage {
        let destination = Destination::Broadcast;
        record_broadcast("active_queues", &destination);
        match self.handle.control().active_queues(&destination).await {
            Ok(Some(replies)) => QueueListPage {
                queues: merge_queue_bindings(&replies),
                error: None,
            },
            Ok(None) => QueueListPage::default(),
            Err(e) => {
                warn!("active_queues 广播失败: {}", e);
                QueueListPage::failed(e.to_string())
            }
        }
    }
}
