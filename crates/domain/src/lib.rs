//! 查询扇出与归一化
//!
//! - **backend / registry**: 数据源契约与标识符 → 工厂的注册表
//! - **facades**: 按部署配置绑定后端的稳定入口，从不向调用方抛出运行期错误
//! - **inspector**: 单次往返的集群总览、配置快照、队列绑定合并
//! - **broker_prober**: 直接询问 broker 的队列深度探测
//! - **backends**: 内置后端

pub mod backend;
pub mod backends;
pub mod broker_prober;
pub mod facades;
pub mod inspector;
pub mod registry;

pub use backend::{
    Backend, BackendInfo, BackendMeta, QueueSource, ScheduleSource, TaskSource, WorkerSource,
};
pub use backends::{describe_backends, BackendCatalogue};
pub use broker_prober::BrokerProber;
pub use facades::{
    Facade, FacadeDomain, PeriodicTasks, PeriodicTasksFacade, Queues, QueuesFacade, Tasks,
    TasksFacade, Workers, WorkersFacade,
};
pub use inspector::{
    classify_broker, classify_result_backend, configuration_snapshot, humanize_expires,
    ClusterInspector, NO_WORKERS_MESSAGE,
};
pub use registry::BackendRegistry;
