use async_trait::async_trait;
use tracing::{debug, instrument};

use taskpanel_core::models::{QueueDetail, QueueListPage};
use taskpanel_core::traits::Destination;
use taskpanel_core::{ClusterHandle, PanelError, PanelResult};

use crate::backend::{Backend, BackendMeta, QueueSource};
use crate::broker_prober::BrokerProber;
use crate::inspector::{record_broadcast, ClusterInspector, NO_WORKERS_MESSAGE};

/// 队列绑定来自控制平面，深度直接询问 broker
pub struct InspectQueueBackend {
    handle: ClusterHandle,
}

impl InspectQueueBackend {
    pub const PATH: &'static str = "taskpanel::queues::InspectQueueBackend";
    pub const META: BackendMeta = BackendMeta {
        description: "Queue bindings and routing configuration",
        data_source: "Cluster Inspect API",
    };

    pub fn new(handle: &ClusterHandle) -> Self {
        Self {
            handle: handle.clone(),
        }
    }
}

impl Backend for InspectQueueBackend {
    fn meta(&self) -> BackendMeta {
        Self::META
    }
}

#[async_trait]
impl QueueSource for InspectQueueBackend {
    #[instrument(skip(self))]
    async fn list_queues(&self) -> PanelResult<QueueListPage> {
        let mut page = ClusterInspector::new(&self.handle).get_queues().await;

        let prober = BrokerProber::new(self.handle.broker());
        for queue in &mut page.queues {
            let depth = prober.probe(&queue.name).await;
            queue.apply_depth(depth);
        }

        debug!("共 {} 个队列", page.queues.len());
        Ok(page)
    }

    #[instrument(skip(self))]
    async fn queue_detail(&self, queue_name: &str) -> PanelResult<QueueDetail> {
        let destination = Destination::Broadcast;
        record_broadcast("active_queues", &destination);
        let replies = self
            .handle
            .control()
            .active_queues(&destination)
            .await?
            .filter(|replies| !replies.is_empty())
            .ok_or_else(|| PanelError::Unavailable(NO_WORKERS_MESSAGE.to_string()))?;

        let mut detail: Option<QueueDetail> = None;
        for (worker, bindings) in replies.iter() {
            for binding in bindings.iter().filter(|b| b.queue_name() == queue_name) {
                detail
                    .get_or_insert_with(|| QueueDetail::from_first_binding(queue_name, binding))
                    .add_worker(worker, binding);
            }
        }

        let mut detail = detail.ok_or_else(|| {
            PanelError::NotFound(format!("Queue '{queue_name}' not found in any active workers"))
        })?;

        let depth = BrokerProber::new(self.handle.broker()).probe(queue_name).await;
        detail.apply_depth(depth);
        Ok(detail)
    }
}
