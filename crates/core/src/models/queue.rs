use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 交换机元数据
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangeInfo {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub exchange_type: Option<String>,
    pub durable: Option<bool>,
    pub auto_delete: Option<bool>,
    pub arguments: Value,
}

/// 单个 worker 上报的队列绑定（active_queues 广播的元素）
///
/// 未建模的字段保存在 `extra` 中，原样带回详情页。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueBinding {
    pub name: Option<String>,
    pub exchange: ExchangeInfo,
    pub routing_key: Option<String>,
    pub exclusive: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl QueueBinding {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn queue_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Unknown")
    }
}

/// 队列深度探测结果
///
/// 探测失败只影响 `length`，错误说明挂在 `error` 上。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueDepth {
    pub length: Option<u64>,
    pub consumer_count: Option<u64>,
    pub error: Option<String>,
}

impl QueueDepth {
    pub fn measured(length: u64) -> Self {
        Self {
            length: Some(length),
            ..Default::default()
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Default::default()
        }
    }
}

/// 队列记录：按名称合并多个 worker 的绑定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueRecord {
    pub name: String,
    pub exchange: String,
    pub routing_key: String,
    pub workers: Vec<String>,
    pub message_count: Option<u64>,
    pub broker_query_error: Option<String>,
}

impl QueueRecord {
    /// 以首次出现的绑定元数据建立记录
    pub fn from_binding(binding: &QueueBinding) -> Self {
        Self {
            name: binding.queue_name().to_string(),
            exchange: binding
                .exchange
                .name
                .clone()
                .unwrap_or_else(|| "N/A".to_string()),
            routing_key: binding
                .routing_key
                .clone()
                .unwrap_or_else(|| "N/A".to_string()),
            workers: Vec::new(),
            message_count: None,
            broker_query_error: None,
        }
    }

    pub fn apply_depth(&mut self, depth: QueueDepth) {
        self.message_count = depth.length;
        self.broker_query_error = depth.error;
    }
}

/// 绑定某队列的 worker 及其原始绑定配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueWorkerBinding {
    pub name: String,
    pub queue_config: QueueBinding,
}

/// 队列详情
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueDetail {
    pub name: String,
    pub exchange: String,
    pub exchange_type: String,
    pub routing_key: String,
    pub durable: bool,
    pub auto_delete: bool,
    pub exclusive: bool,
    pub arguments: Value,
    pub workers: Vec<String>,
    pub worker_details: Vec<QueueWorkerBinding>,
    pub message_count: Option<u64>,
    pub consumer_count: Option<u64>,
    pub broker_query_error: Option<String>,
}

impl QueueDetail {
    /// 以首次出现的绑定填充交换机与绑定元数据
    pub fn from_first_binding(name: &str, binding: &QueueBinding) -> Self {
        let exchange = &binding.exchange;
        Self {
            name: name.to_string(),
            exchange: exchange.name.clone().unwrap_or_else(|| "N/A".to_string()),
            exchange_type: exchange
                .exchange_type
                .clone()
                .unwrap_or_else(|| "N/A".to_string()),
            routing_key: binding
                .routing_key
                .clone()
                .unwrap_or_else(|| "N/A".to_string()),
            durable: exchange.durable.unwrap_or(false),
            auto_delete: exchange.auto_delete.unwrap_or(false),
            exclusive: binding.exclusive.unwrap_or(false),
            arguments: if exchange.arguments.is_null() {
                Value::Object(Map::new())
            } else {
                exchange.arguments.clone()
            },
            workers: Vec::new(),
            worker_details: Vec::new(),
            message_count: None,
            consumer_count: None,
            broker_query_error: None,
        }
    }

    pub fn add_worker(&mut self, worker: &str, binding: &QueueBinding) {
        self.workers.push(worker.to_string());
        self.worker_details.push(QueueWorkerBinding {
            name: worker.to_string(),
            queue_config: binding.clone(),
        });
    }

    pub fn apply_depth(&mut self, depth: QueueDepth) {
        self.message_count = depth.length;
        self.consumer_count = depth.consumer_count;
        self.broker_query_error = depth.error;
    }
}

/// 队列列表页
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueListPage {
    pub queues: Vec<QueueRecord>,
    pub error: Option<String>,
}

impl QueueListPage {
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            queues: Vec::new(),
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_binding_keeps_unmodelled_fields() {
        let binding: QueueBinding = serde_json::from_value(json!({
            "name": "orders",
            "exchange": {"name": "orders", "type": "direct", "durable": true},
            "routing_key": "orders",
            "queue_arguments": {"x-max-priority": 10},
            "no_ack": false
        }))
        .unwrap();

        assert_eq!(binding.queue_name(), "orders");
        assert_eq!(binding.exchange.exchange_type.as_deref(), Some("direct"));
        assert!(binding.extra.contains_key("queue_arguments"));
        assert!(binding.extra.contains_key("no_ack"));
    }

    #[test]
    fn test_record_defaults_for_missing_metadata() {
        let record = QueueRecord::from_binding(&QueueBinding::default());
        assert_eq!(record.name, "Unknown");
        assert_eq!(record.exchange, "N/A");
        assert_eq!(record.routing_key, "N/A");
    }

    #[test]
    fn test_detail_defaults_for_missing_exchange_flags() {
        let detail = QueueDetail::from_first_binding("celery", &QueueBinding::named("celery"));
        assert!(!detail.durable);
        assert!(!detail.auto_delete);
        assert_eq!(detail.arguments, json!({}));
    }
}
