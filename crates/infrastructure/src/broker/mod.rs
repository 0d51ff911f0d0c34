//! broker 传输适配器
//!
//! 按 `broker_url` 的 scheme 选择传输：Redis 为列表型，AMQP 为声明型，
//! 其他传输只报告自己的名字，深度探测时成为能力缺口。

pub mod amqp;
pub mod redis;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use taskpanel_core::traits::{
    BrokerConnection, BrokerTransport, ChannelOptions, TransportKind, DEFAULT_PRIORITY_SEP,
    DEFAULT_PRIORITY_STEPS,
};
use taskpanel_core::{ClusterSettings, PanelResult};

pub use self::amqp::AmqpTransport;
pub use self::redis::RedisTransport;

const REDIS_SCHEMES: [&str; 3] = ["redis://", "rediss://", "redis+socket://"];
const AMQP_SCHEMES: [&str; 4] = ["amqp://", "amqps://", "pyamqp://", "librabbitmq://"];

/// 从 `broker_transport_options` 读取列表型传输的队列排序配置
pub fn channel_options(settings: &ClusterSettings) -> ChannelOptions {
    let defaults = ChannelOptions::default();
    let Some(options) = settings.get_object("broker_transport_options") else {
        return defaults;
    };

    let priority_steps = options
        .get("priority_steps")
        .and_then(Value::as_array)
        .map(|steps| {
            steps
                .iter()
                .filter_map(Value::as_u64)
                .filter_map(|step| u32::try_from(step).ok())
                .collect::<Vec<_>>()
        })
        .filter(|steps| !steps.is_empty())
        .unwrap_or_else(|| DEFAULT_PRIORITY_STEPS.to_vec());

    ChannelOptions {
        queue_order_strategy: options
            .get("queue_order_strategy")
            .and_then(Value::as_str)
            .unwrap_or(defaults.queue_order_strategy.as_str())
            .to_string(),
        sep: options
            .get("sep")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_PRIORITY_SEP)
            .to_string(),
        priority_steps,
    }
}

/// 按 broker URL 选择传输，从不失败；连接错误推迟到每次探测时报告
pub fn broker_transport_for(settings: &ClusterSettings) -> Arc<dyn BrokerTransport> {
    let url = settings.get_str("broker_url", "");

    if REDIS_SCHEMES.iter().any(|s| url.starts_with(s)) {
        debug!("使用Redis传输探测队列深度");
        Arc::new(RedisTransport::new(&url, channel_options(settings)))
    } else if AMQP_SCHEMES.iter().any(|s| url.starts_with(s)) {
        debug!("使用AMQP传输探测队列深度");
        Arc::new(AmqpTransport::new(&url))
    } else {
        let name = url
            .split_once("://")
            .map(|(scheme, _)| scheme)
            .filter(|scheme| !scheme.is_empty())
            .unwrap_or("unknown");
        debug!("传输 {} 不支持队列深度探测", name);
        Arc::new(UnsupportedTransport::new(name))
    }
}

/// 不支持深度探测的传输
#[derive(Debug, Clone)]
pub struct UnsupportedTransport {
    name: String,
}

impl UnsupportedTransport {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

#[async_trait]
impl BrokerTransport for UnsupportedTransport {
    fn transport_name(&self) -> &str {
        &self.name
    }

    async fn acquire(&self) -> PanelResult<Box<dyn BrokerConnection>> {
        Ok(Box::new(UnsupportedConnection {
            name: self.name.clone(),
        }))
    }
}

struct UnsupportedConnection {
    name: String,
}

#[async_trait]
impl BrokerConnection for UnsupportedConnection {
    fn kind(&self) -> TransportKind {
        TransportKind::Other
    }

    fn transport_name(&self) -> &str {
        &self.name
    }

    async fn release(self: Box<Self>) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_channel_options_defaults() {
        let options = channel_options(&ClusterSettings::new());
        assert_eq!(options, ChannelOptions::default());
        assert!(!options.uses_priority_queues());
    }

    #[test]
    fn test_channel_options_from_transport_options() {
        let settings = ClusterSettings::new().with(
            "broker_transport_options",
            json!({"queue_order_strategy": "priority", "sep": ":", "priority_steps": [0, 5, 9]}),
        );
        let options = channel_options(&settings);
        assert!(options.uses_priority_queues());
        assert_eq!(options.sep, ":");
        assert_eq!(options.priority_steps, vec![0, 5, 9]);
    }

    #[test]
    fn test_transport_selection_by_scheme() {
        let pick = |url: &str| {
            broker_transport_for(&ClusterSettings::new().with("broker_url", url))
                .transport_name()
                .to_string()
        };
        assert_eq!(pick("redis://localhost:6379/0"), "redis");
        assert_eq!(pick("rediss://localhost:6380/0"), "redis");
        assert_eq!(pick("pyamqp://guest@localhost//"), "amqp");
        assert_eq!(pick("sqs://key:secret@"), "sqs");
        assert_eq!(pick(""), "unknown");
    }

    #[tokio::test]
    async fn test_unsupported_connection_kind() {
        let transport = UnsupportedTransport::new("memory");
        let conn = transport.acquire().await.unwrap();
        assert_eq!(conn.kind(), TransportKind::Other);
        assert_eq!(conn.transport_name(), "memory");
        conn.release().await;
    }
}
