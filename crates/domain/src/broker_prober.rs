//! 队列深度探测
//!
//! 控制平面只知道队列绑定，不知道积压消息数，所以这里绕过它直接询问底层传输。
//! 每次探测独立获取连接并在所有退出路径上归还；一个队列探测失败不影响其他队列。

use metrics::counter;
use tracing::{debug, instrument, warn};

use taskpanel_core::models::QueueDepth;
use taskpanel_core::traits::{BrokerConnection, BrokerTransport, TransportKind};
use taskpanel_core::{PanelError, PanelResult};

pub struct BrokerProber<'a> {
    transport: &'a dyn BrokerTransport,
}

impl<'a> BrokerProber<'a> {
    pub fn new(transport: &'a dyn BrokerTransport) -> Self {
        Self { transport }
    }

    /// 探测单个队列的深度，失败时把说明挂在结果上而不是返回错误
    #[instrument(skip(self), fields(transport = %self.transport.transport_name()))]
    pub async fn probe(&self, queue: &str) -> QueueDepth {
        let mut conn = match self.transport.acquire().await {
            Ok(conn) => conn,
            Err(e) => {
                self.record_failure();
                warn!("获取broker连接失败: {}", e);
                return QueueDepth::failed(format!("Error querying broker: {}", reason(&e)));
            }
        };

        let depth = match conn.kind() {
            TransportKind::ListBacked => match list_depth(conn.as_mut(), queue).await {
                Ok(length) => QueueDepth::measured(length),
                Err(e) => {
                    self.record_failure();
                    warn!("读取列表型队列 {} 深度失败: {}", queue, e);
                    QueueDepth::failed(format!("Redis error: {}", reason(&e)))
                }
            },
            TransportKind::Declarative => match conn.passive_declare(queue).await {
                Ok(declared) => QueueDepth {
                    length: Some(declared.message_count),
                    consumer_count: Some(declared.consumer_count),
                    error: None,
                },
                Err(e) => {
                    self.record_failure();
                    warn!("被动声明队列 {} 失败: {}", queue, e);
                    QueueDepth::failed(format!("AMQP error: {}", reason(&e)))
                }
            },
            TransportKind::Other => {
                debug!("传输 {} 不支持深度探测", conn.transport_name());
                QueueDepth::failed(format!(
                    "Unsupported broker type for queue length inspection: {}",
                    conn.transport_name()
                ))
            }
        };

        conn.release().await;
        depth
    }

    fn record_failure(&self) {
        counter!(
            "taskpanel_depth_probe_failures_total",
            "transport" => self.transport.transport_name().to_string()
        )
        .increment(1);
    }
}

/// 列表型传输的真实深度
///
/// 启用优先级排序时，一个逻辑队列对应基础键加上每个优先级档位的子队列
/// `{queue}{sep}{priority}`，深度是它们的长度之和。未启用时只查询基础键。
async fn list_depth(conn: &mut dyn BrokerConnection, queue: &str) -> PanelResult<u64> {
    let mut length = conn.list_length(queue).await?;

    let options = conn.channel_options().await?;
    if options.uses_priority_queues() {
        for key in options.priority_keys(queue) {
            length += conn.list_length(&key).await?;
        }
        debug!(
            "队列 {} 含 {} 个优先级子队列，总深度 {}",
            queue,
            options.priority_steps.len(),
            length
        );
    }

    Ok(length)
}

/// 去掉变体前缀后的底层原因
fn reason(err: &PanelError) -> String {
    match err {
        PanelError::Broker(msg)
        | PanelError::Unavailable(msg)
        | PanelError::Unsupported(msg)
        | PanelError::Internal(msg) => msg.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskpanel_core::traits::ChannelOptions;
    use taskpanel_testing_utils::FakeBroker;

    #[tokio::test]
    async fn test_priority_depth_sums_all_sub_queues() {
        let broker = FakeBroker::list_backed()
            .with_options(ChannelOptions::priority())
            .with_list("celery", 0)
            .with_list("celery\x06\x160", 3)
            .with_list("celery\x06\x163", 2)
            .with_list("celery\x06\x166", 4)
            .with_list("celery\x06\x169", 1);

        let depth = BrokerProber::new(&broker).probe("celery").await;

        assert_eq!(depth.length, Some(10));
        assert_eq!(depth.error, None);
        assert_eq!(broker.queried_keys().len(), 5);
        assert_eq!(broker.released(), 1);
    }

    #[tokio::test]
    async fn test_plain_depth_queries_only_base_key() {
        let broker = FakeBroker::list_backed()
            .with_list("default", 7)
            .with_list("default\x06\x163", 100);

        let depth = BrokerProber::new(&broker).probe("default").await;

        assert_eq!(depth.length, Some(7));
        assert_eq!(broker.queried_keys(), vec!["default".to_string()]);
    }

    #[tokio::test]
    async fn test_custom_separator_and_levels() {
        let options = ChannelOptions {
            queue_order_strategy: "priority".into(),
            sep: ":".into(),
            priority_steps: vec![1, 2],
        };
        let broker = FakeBroker::list_backed()
            .with_options(options)
            .with_list("jobs", 1)
            .with_list("jobs:1", 5)
            .with_list("jobs:2", 6);

        let depth = BrokerProber::new(&broker).probe("jobs").await;

        assert_eq!(depth.length, Some(12));
        assert_eq!(broker.queried_keys(), vec!["jobs", "jobs:1", "jobs:2"]);
    }

    #[tokio::test]
    async fn test_sub_queue_failure_reports_error_and_releases() {
        let broker = FakeBroker::list_backed()
            .with_options(ChannelOptions::priority())
            .with_list("celery", 2)
            .failing_on("celery\x06\x166");

        let depth = BrokerProber::new(&broker).probe("celery").await;

        assert_eq!(depth.length, None);
        assert!(depth.error.unwrap().starts_with("Redis error: "));
        assert_eq!(broker.acquired(), broker.released());
    }

    #[tokio::test]
    async fn test_declarative_depth_carries_consumers() {
        let broker = FakeBroker::declarative().with_declared("orders", 12, 3);

        let depth = BrokerProber::new(&broker).probe("orders").await;

        assert_eq!(depth.length, Some(12));
        assert_eq!(depth.consumer_count, Some(3));
        assert_eq!(broker.declared_queries(), vec!["orders".to_string()]);
    }

    #[tokio::test]
    async fn test_missing_declarative_queue_is_amqp_error() {
        let broker = FakeBroker::declarative();

        let depth = BrokerProber::new(&broker).probe("ghost").await;

        assert_eq!(depth.length, None);
        assert_eq!(
            depth.error.as_deref(),
            Some("AMQP error: NOT_FOUND - no queue 'ghost'")
        );
    }

    #[tokio::test]
    async fn test_unsupported_transport_names_itself() {
        let broker = FakeBroker::unsupported("SQS");

        let depth = BrokerProber::new(&broker).probe("celery").await;

        assert_eq!(
            depth.error.as_deref(),
            Some("Unsupported broker type for queue length inspection: SQS")
        );
        assert_eq!(broker.released(), 1);
    }

    #[tokio::test]
    async fn test_acquire_failure() {
        let broker = FakeBroker::list_backed().refusing("connection refused");

        let depth = BrokerProber::new(&broker).probe("celery").await;

        assert_eq!(
            depth.error.as_deref(),
            Some("Error querying broker: connection refused")
        );
        assert_eq!(broker.released(), 0);
    }
}
