use async_trait::async_trait;
use tracing::{debug, instrument};

use taskpanel_core::models::{WorkerDetail, WorkerListPage, WorkerRecord};
use taskpanel_core::traits::Destination;
use taskpanel_core::{ClusterHandle, PanelError, PanelResult};

use crate::backend::{Backend, BackendMeta, WorkerSource};
use crate::inspector::{record_broadcast, ClusterInspector};

/// 基于控制平面检查接口的 worker 后端
pub struct InspectWorkerBackend {
    handle: ClusterHandle,
}

impl InspectWorkerBackend {
    pub const PATH: &'static str = "taskpanel::workers::InspectWorkerBackend";
    pub const META: BackendMeta = BackendMeta {
        description: "Real-time worker status and statistics",
        data_source: "Cluster Inspect API",
    };

    pub fn new(handle: &ClusterHandle) -> Self {
        Self {
            handle: handle.clone(),
        }
    }
}

fn not_found(worker_id: &str) -> PanelError {
    PanelError::NotFound(format!("Worker '{worker_id}' not found or not responding"))
}

impl Backend for InspectWorkerBackend {
    fn meta(&self) -> BackendMeta {
        Self::META
    }
}

#[async_trait]
impl WorkerSource for InspectWorkerBackend {
    /// 一次 stats 广播
    async fn list_workers(&self) -> PanelResult<WorkerListPage> {
        let status = ClusterInspector::new(&self.handle).get_status().await;
        Ok(WorkerListPage {
            workers: status.workers_detail,
            active_workers_count: status.active_workers_count,
            registered_tasks_count: status.registered_tasks_count,
            cluster_available: status.cluster_available,
            config: status.config,
            error: status.error,
        })
    }

    /// 所有请求都只发给目标 worker，不做全体广播
    #[instrument(skip(self))]
    async fn worker_detail(&self, worker_id: &str) -> PanelResult<WorkerDetail> {
        record_broadcast("snapshot", &Destination::worker(worker_id));
        let snapshot = self
            .handle
            .control()
            .snapshot(worker_id)
            .await?
            .ok_or_else(|| not_found(worker_id))?;

        debug!(
            "worker {}: active={} reserved={} scheduled={}",
            worker_id,
            snapshot.active.len(),
            snapshot.reserved.len(),
            snapshot.scheduled.len()
        );

        let stats = snapshot.stats;
        Ok(WorkerDetail {
            summary: WorkerRecord::from_stats(worker_id, &stats),
            processes: stats
                .pool
                .as_ref()
                .map(|pool| pool.processes.clone())
                .unwrap_or_default(),
            broker: stats.broker.clone(),
            active_tasks: snapshot.active,
            reserved_tasks: snapshot.reserved,
            scheduled_tasks: snapshot.scheduled,
            registered_tasks: snapshot.registered,
            active_queues: snapshot.active_queues,
        })
    }
}
