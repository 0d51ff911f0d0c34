//! 控制平面网关客户端
//!
//! 网关对外暴露 `GET {base}/api/workers?refresh=1[&workername=W]`，
//! 返回以 worker 名为键的快照映射；空映射表示没有 worker 应答。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, instrument};
use url::Url;

use taskpanel_core::models::{QueueBinding, ScheduledTaskInfo, TaskInfo, WorkerStats};
use taskpanel_core::traits::{BroadcastResult, ControlPlane, Destination, Replies, WorkerSnapshot};
use taskpanel_core::{ControlPlaneConfig, PanelError, PanelResult};

const WORKERS_ENDPOINT: &str = "api/workers";

/// 通过 HTTP 网关访问控制平面
#[derive(Debug, Clone)]
pub struct HttpControlPlane {
    client: Client,
    endpoint: Url,
}

impl HttpControlPlane {
    pub fn new(base_url: &str, timeout: Duration) -> PanelResult<Self> {
        let mut base = base_url.to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let endpoint = Url::parse(&base)
            .and_then(|url| url.join(WORKERS_ENDPOINT))
            .map_err(|e| {
                PanelError::Configuration(format!("invalid control plane URL '{base_url}': {e}"))
            })?;

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PanelError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, endpoint })
    }

    pub fn from_config(config: &ControlPlaneConfig, base_url: &str) -> PanelResult<Self> {
        Self::new(base_url, Duration::from_secs(config.timeout_seconds))
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    #[instrument(skip(self), fields(destination = %destination))]
    async fn snapshots(&self, destination: &Destination) -> PanelResult<Map<String, Value>> {
        let mut request = self.client.get(self.endpoint.clone()).query(&[("refresh", "1")]);
        if let Destination::Worker(worker) = destination {
            request = request.query(&[("workername", worker.as_str())]);
        }

        let response = request
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| PanelError::Unavailable(e.to_string()))?;

        let snapshots: Map<String, Value> = response
            .json()
            .await
            .map_err(|e| PanelError::Serialization(e.to_string()))?;
        debug!("网关返回 {} 个worker快照", snapshots.len());
        Ok(snapshots)
    }

    async fn collect<T: DeserializeOwned>(
        &self,
        destination: &Destination,
        field: &str,
    ) -> BroadcastResult<T> {
        let snapshots = self.snapshots(destination).await?;
        replies_from_snapshots(snapshots, field)
    }
}

/// 从快照映射中取出某一命令的应答，保持网关给出的 worker 顺序
pub fn replies_from_snapshots<T: DeserializeOwned>(
    snapshots: Map<String, Value>,
    field: &str,
) -> BroadcastResult<T> {
    let mut replies = Vec::new();
    for (worker, snapshot) in snapshots {
        let Value::Object(mut snapshot) = snapshot else {
            continue;
        };
        if let Some(reply) = snapshot_field(&worker, &mut snapshot, field)? {
            replies.push((worker, reply));
        }
    }

    if replies.is_empty() {
        Ok(None)
    } else {
        Ok(Some(Replies::new(replies)))
    }
}

/// 取出单个字段；缺失或为 null 时返回 `None`
fn snapshot_field<T: DeserializeOwned>(
    worker: &str,
    snapshot: &mut Map<String, Value>,
    field: &str,
) -> PanelResult<Option<T>> {
    match snapshot.get_mut(field).map(Value::take) {
        None | Some(Value::Null) => Ok(None),
        Some(reply) => serde_json::from_value(reply).map(Some).map_err(|e| {
            PanelError::Serialization(format!("malformed '{field}' reply from {worker}: {e}"))
        }),
    }
}

/// 从网关快照映射中组装目标 worker 的完整快照；未应答 stats 视为无响应
pub fn worker_snapshot(
    snapshots: Map<String, Value>,
    worker: &str,
) -> PanelResult<Option<WorkerSnapshot>> {
    let Some(mut snapshot) = snapshots
        .into_iter()
        .find(|(name, _)| name == worker)
        .and_then(|(_, value)| match value {
            Value::Object(map) => Some(map),
            _ => None,
        })
    else {
        return Ok(None);
    };

    let Some(stats) = snapshot_field(worker, &mut snapshot, "stats")? else {
        return Ok(None);
    };

    Ok(Some(WorkerSnapshot {
        stats,
        active_queues: snapshot_field(worker, &mut snapshot, "active_queues")?.unwrap_or_default(),
        active: snapshot_field(worker, &mut snapshot, "active")?.unwrap_or_default(),
        reserved: snapshot_field(worker, &mut snapshot, "reserved")?.unwrap_or_default(),
        scheduled: snapshot_field(worker, &mut snapshot, "scheduled")?.unwrap_or_default(),
        registered: snapshot_field(worker, &mut snapshot, "registered")?.unwrap_or_default(),
    }))
}

#[async_trait]
impl ControlPlane for HttpControlPlane {
    async fn stats(&self, destination: &Destination) -> BroadcastResult<WorkerStats> {
        self.collect(destination, "stats").await
    }

    async fn active_queues(&self, destination: &Destination) -> BroadcastResult<Vec<QueueBinding>> {
        self.collect(destination, "active_queues").await
    }

    async fn active(&self, destination: &Destination) -> BroadcastResult<Vec<TaskInfo>> {
        self.collect(destination, "active").await
    }

    async fn reserved(&self, destination: &Destination) -> BroadcastResult<Vec<TaskInfo>> {
        self.collect(destination, "reserved").await
    }

    async fn scheduled(&self, destination: &Destination) -> BroadcastResult<Vec<ScheduledTaskInfo>> {
        self.collect(destination, "scheduled").await
    }

    async fn registered(&self, destination: &Destination) -> BroadcastResult<Vec<String>> {
        self.collect(destination, "registered").await
    }

    /// 网关一次响应带回全部字段，整份快照只需一次请求
    async fn snapshot(&self, worker: &str) -> PanelResult<Option<WorkerSnapshot>> {
        let snapshots = self.snapshots(&Destination::worker(worker)).await?;
        worker_snapshot(snapshots, worker)
    }
}

/// 未配置网关时使用，所有调用都报告集群不可达
#[derive(Debug, Clone, Default)]
pub struct DisconnectedControlPlane;

impl DisconnectedControlPlane {
    fn unavailable<T>() -> BroadcastResult<T> {
        Err(PanelError::Unavailable(
            "control plane gateway is not configured (set control.url)".to_string(),
        ))
    }
}

#[async_trait]
impl ControlPlane for DisconnectedControlPlane {
    async fn stats(&self, _destination: &Destination) -> BroadcastResult<WorkerStats> {
        Self::unavailable()
    }

    async fn active_queues(&self, _destination: &Destination) -> BroadcastResult<Vec<QueueBinding>> {
        Self::unavailable()
    }

    async fn active(&self, _destination: &Destination) -> BroadcastResult<Vec<TaskInfo>> {
        Self::unavailable()
    }

    async fn reserved(&self, _destination: &Destination) -> BroadcastResult<Vec<TaskInfo>> {
        Self::unavailable()
    }

    async fn scheduled(
        &self,
        _destination: &Destination,
    ) -> BroadcastResult<Vec<ScheduledTaskInfo>> {
        Self::unavailable()
    }

    async fn registered(&self, _destination: &Destination) -> BroadcastResult<Vec<String>> {
        Self::unavailable()
    }
}
