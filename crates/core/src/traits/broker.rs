use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{PanelError, PanelResult};

/// 默认的优先级子队列分隔符
pub const DEFAULT_PRIORITY_SEP: &str = "\x06\x16";

/// 默认的优先级档位
pub const DEFAULT_PRIORITY_STEPS: [u32; 4] = [0, 3, 6, 9];

/// 传输的具体类别，决定深度探测方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportKind {
    /// 以列表承载队列（Redis 类）
    ListBacked,
    /// 通过被动声明查询队列（AMQP 类）
    Declarative,
    /// 不支持深度探测
    Other,
}

/// 列表型传输在通道上实际生效的队列排序配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelOptions {
    pub queue_order_strategy: String,
    pub sep: String,
    pub priority_steps: Vec<u32>,
}

impl Default for ChannelOptions {
    fn default() -> Self {
        Self {
            queue_order_strategy: "round_robin".to_string(),
            sep: DEFAULT_PRIORITY_SEP.to_string(),
            priority_steps: DEFAULT_PRIORITY_STEPS.to_vec(),
        }
    }
}

impl ChannelOptions {
    pub fn priority() -> Self {
        Self {
            queue_order_strategy: "priority".to_string(),
            ..Default::default()
        }
    }

    pub fn uses_priority_queues(&self) -> bool {
        self.queue_order_strategy == "priority"
    }

    /// 某队列所有优先级子队列的键：`{queue}{sep}{priority}`
    pub fn priority_keys(&self, queue: &str) -> Vec<String> {
        self.priority_steps
            .iter()
            .map(|priority| format!("{queue}{}{priority}", self.sep))
            .collect()
    }
}

/// 被动声明返回的队列信息
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclaredQueue {
    pub message_count: u64,
    pub consumer_count: u64,
}

/// 从连接池取得的一条 broker 连接
///
/// 作用域限定在单次探测内；调用方在所有退出路径上调用 `release`。
#[async_trait]
pub trait BrokerConnection: Send {
    fn kind(&self) -> TransportKind;

    /// 具体传输的实现名，用于能力缺口提示
    fn transport_name(&self) -> &str;

    /// 读取通道当前生效的排序配置（仅列表型传输有意义）
    async fn channel_options(&mut self) -> PanelResult<ChannelOptions> {
        Ok(ChannelOptions::default())
    }

    /// 列表长度
    async fn list_length(&mut self, key: &str) -> PanelResult<u64> {
        let _ = key;
        Err(PanelError::Unsupported(format!(
            "{} does not support list length queries",
            self.transport_name()
        )))
    }

    /// 被动声明：只查询，不创建队列
    async fn passive_declare(&mut self, queue: &str) -> PanelResult<DeclaredQueue> {
        let _ = queue;
        Err(PanelError::Unsupported(format!(
            "{} does not support passive queue declaration",
            self.transport_name()
        )))
    }

    /// 归还连接
    async fn release(self: Box<Self>);
}

/// broker 传输句柄
#[async_trait]
pub trait BrokerTransport: Send + Sync {
    fn transport_name(&self) -> &str;

    async fn acquire(&self) -> PanelResult<Box<dyn BrokerConnection>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_priority_keys() {
        let keys = ChannelOptions::priority().priority_keys("celery");
        assert_eq!(
            keys,
            vec![
                "celery\x06\x160".to_string(),
                "celery\x06\x163".to_string(),
                "celery\x06\x166".to_string(),
                "celery\x06\x169".to_string(),
            ]
        );
    }

    #[test]
    fn test_custom_separator_and_steps() {
        let options = ChannelOptions {
            queue_order_strategy: "priority".into(),
            sep: ":".into(),
            priority_steps: vec![0, 5],
        };
        assert!(options.uses_priority_queues());
        assert_eq!(options.priority_keys("orders"), vec!["orders:0", "orders:5"]);
        assert!(!ChannelOptions::default().uses_priority_queues());
    }
}
