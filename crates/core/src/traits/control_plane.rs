use std::fmt;

use async_trait::async_trait;

use crate::models::{QueueBinding, ScheduledTaskInfo, TaskInfo, WorkerStats};
use crate::PanelResult;

/// 控制平面请求的投递范围
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Destination {
    /// 广播到所有可达的 worker
    Broadcast,
    /// 只发给一个指定的 worker
    Worker(String),
}

impl Destination {
    pub fn worker(name: impl Into<String>) -> Self {
        Destination::Worker(name.into())
    }

    pub fn is_broadcast(&self) -> bool {
        matches!(self, Destination::Broadcast)
    }

    pub fn scope(&self) -> &'static str {
        match self {
            Destination::Broadcast => "broadcast",
            Destination::Worker(_) => "targeted",
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::Broadcast => f.write_str("*"),
            Destination::Worker(name) => f.write_str(name),
        }
    }
}

/// 按 worker 名保序的响应集合
#[derive(Debug, Clone, PartialEq)]
pub struct Replies<T>(Vec<(String, T)>);

impl<T> Replies<T> {
    pub fn new(replies: Vec<(String, T)>) -> Self {
        Self(replies)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, worker: &str) -> Option<&T> {
        self.0.iter().find(|(name, _)| name == worker).map(|(_, v)| v)
    }

    pub fn workers(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.0.iter().map(|(name, v)| (name.as_str(), v))
    }

    pub fn into_inner(self) -> Vec<(String, T)> {
        self.0
    }
}

impl<T> FromIterator<(String, T)> for Replies<T> {
    fn from_iter<I: IntoIterator<Item = (String, T)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// 广播结果：`None` 表示没有任何 worker 响应
pub type BroadcastResult<T> = PanelResult<Option<Replies<T>>>;

/// 单个 worker 的全部检查结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkerSnapshot {
    pub stats: WorkerStats,
    pub active_queues: Vec<QueueBinding>,
    pub active: Vec<TaskInfo>,
    pub reserved: Vec<TaskInfo>,
    pub scheduled: Vec<ScheduledTaskInfo>,
    pub registered: Vec<String>,
}

/// 定向响应中取出目标 worker 的那一份；无响应视为空
fn reply_for<T: Default>(replies: Option<Replies<T>>, worker: &str) -> T {
    replies
        .and_then(|replies| {
            replies
                .into_inner()
                .into_iter()
                .find(|(name, _)| name == worker)
                .map(|(_, value)| value)
        })
        .unwrap_or_default()
}

/// 集群控制平面句柄
///
/// 每个方法对应一次网络往返；超时由传输客户端负责。传输或连接失败返回
/// `Err`，没有 worker 响应返回 `Ok(None)`。
#[async_trait]
pub trait ControlPlane: Send + Sync {
    async fn stats(&self, destination: &Destination) -> BroadcastResult<WorkerStats>;

    async fn active_queues(&self, destination: &Destination) -> BroadcastResult<Vec<QueueBinding>>;

    async fn active(&self, destination: &Destination) -> BroadcastResult<Vec<TaskInfo>>;

    async fn reserved(&self, destination: &Destination) -> BroadcastResult<Vec<TaskInfo>>;

    async fn scheduled(&self, destination: &Destination)
        -> BroadcastResult<Vec<ScheduledTaskInfo>>;

    async fn registered(&self, destination: &Destination) -> BroadcastResult<Vec<String>>;

    /// 一个 worker 的完整快照，worker 未应答 stats 时返回 `Ok(None)`
    ///
    /// 默认实现先问 stats，再逐项定向询问其余五类结果。一次响应即可带回
    /// 全部字段的控制平面应覆盖此方法。
    async fn snapshot(&self, worker: &str) -> PanelResult<Option<WorkerSnapshot>> {
        let target = Destination::worker(worker);
        let Some(stats) = self
            .stats(&target)
            .await?
            .and_then(|replies| replies.get(worker).cloned())
        else {
            return Ok(None);
        };

        Ok(Some(WorkerSnapshot {
            stats,
            active: reply_for(self.active(&target).await?, worker),
            reserved: reply_for(self.reserved(&target).await?, worker),
            scheduled: reply_for(self.scheduled(&target).await?, worker),
            registered: reply_for(self.registered(&target).await?, worker),
            active_queues: reply_for(self.active_queues(&target).await?, worker),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replies_preserve_order() {
        let replies: Replies<u32> = vec![
            ("worker_b".to_string(), 2),
            ("worker_a".to_string(), 1),
        ]
        .into_iter()
        .collect();

        assert_eq!(replies.workers().collect::<Vec<_>>(), vec!["worker_b", "worker_a"]);
        assert_eq!(replies.get("worker_a"), Some(&1));
        assert_eq!(replies.get("worker_c"), None);
    }

    #[test]
    fn test_destination_scope() {
        assert!(Destination::Broadcast.is_broadcast());
        assert_eq!(Destination::worker("celery@a").scope(), "targeted");
        assert_eq!(Destination::worker("celery@a").to_string(), "celery@a");
    }
}
