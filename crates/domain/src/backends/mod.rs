//! 内置后端与内置注册表

pub mod periodic;
pub mod queues;
pub mod tasks;
pub mod workers;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::backend::{BackendInfo, QueueSource, ScheduleSource, TaskSource, WorkerSource};
use crate::registry::BackendRegistry;

pub use periodic::{ConfigScheduleBackend, StoreScheduleBackend};
pub use queues::InspectQueueBackend;
pub use tasks::{InspectTaskBackend, ResultStoreTaskBackend};
pub use workers::InspectWorkerBackend;

pub fn builtin_task_backends() -> BackendRegistry<dyn TaskSource> {
    let mut registry: BackendRegistry<dyn TaskSource> = BackendRegistry::new("tasks");
    registry
        .register(
            ResultStoreTaskBackend::PATH,
            ResultStoreTaskBackend::META,
            |handle| Arc::new(ResultStoreTaskBackend::new(handle)),
        )
        .register(
            InspectTaskBackend::PATH,
            InspectTaskBackend::META,
            |handle| Arc::new(InspectTaskBackend::new(handle)),
        );
    registry
}

pub fn builtin_worker_backends() -> BackendRegistry<dyn WorkerSource> {
    let mut registry: BackendRegistry<dyn WorkerSource> = BackendRegistry::new("workers");
    registry.register(
        InspectWorkerBackend::PATH,
        InspectWorkerBackend::META,
        |handle| Arc::new(InspectWorkerBackend::new(handle)),
    );
    registry
}

pub fn builtin_queue_backends() -> BackendRegistry<dyn QueueSource> {
    let mut registry: BackendRegistry<dyn QueueSource> = BackendRegistry::new("queues");
    registry.register(
        InspectQueueBackend::PATH,
        InspectQueueBackend::META,
        |handle| Arc::new(InspectQueueBackend::new(handle)),
    );
    registry
}

pub fn builtin_schedule_backends() -> BackendRegistry<dyn ScheduleSource> {
    let mut registry: BackendRegistry<dyn ScheduleSource> = BackendRegistry::new("periodic tasks");
    registry
        .register(
            ConfigScheduleBackend::PATH,
            ConfigScheduleBackend::META,
            |handle| Arc::new(ConfigScheduleBackend::new(handle)),
        )
        .register(
            StoreScheduleBackend::PATH,
            StoreScheduleBackend::META,
            |handle| Arc::new(StoreScheduleBackend::new(handle)),
        );
    registry
}

/// 每个门面可选的内置后端
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendCatalogue {
    pub tasks: Vec<BackendInfo>,
    pub workers: Vec<BackendInfo>,
    pub queues: Vec<BackendInfo>,
    pub periodic_tasks: Vec<BackendInfo>,
}

pub fn describe_backends() -> BackendCatalogue {
    BackendCatalogue {
        tasks: builtin_task_backends().describe(),
        workers: builtin_worker_backends().describe(),
        queues: builtin_queue_backends().describe(),
        periodic_tasks: builtin_schedule_backends().describe(),
    }
}
