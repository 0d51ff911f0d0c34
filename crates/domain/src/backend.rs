//! 后端契约
//!
//! 每个查询领域（任务、worker、队列、周期调度）各有一个数据源 trait。门面只依赖
//! 这些 trait，具体由哪个后端回答由部署配置决定。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use taskpanel_core::models::{
    QueueDetail, QueueListPage, ScheduleListPage, TaskDetail, TaskFilter, TaskListRequest,
    TaskPage, WorkerDetail, WorkerListPage,
};
use taskpanel_core::PanelResult;

/// 后端的静态自描述元数据
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendMeta {
    pub description: &'static str,
    pub data_source: &'static str,
}

/// 供运维界面展示的后端信息，不参与任何控制流
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendInfo {
    pub name: String,
    pub path: String,
    pub description: String,
    pub data_source: String,
}

impl BackendInfo {
    pub fn new(path: &str, meta: BackendMeta) -> Self {
        Self {
            name: short_name(path).to_string(),
            path: path.to_string(),
            description: meta.description.to_string(),
            data_source: meta.data_source.to_string(),
        }
    }
}

/// 标识符最后一段即实现名：`taskpanel::tasks::InspectTaskBackend` → `InspectTaskBackend`
pub fn short_name(path: &str) -> &str {
    path.rsplit("::").next().unwrap_or(path)
}

/// 所有后端共有的能力
pub trait Backend: Send + Sync {
    fn meta(&self) -> BackendMeta;
}

/// 任务数据源
#[async_trait]
pub trait TaskSource: Backend {
    /// 支持的过滤值，声明式元数据
    fn supported_filters(&self) -> Vec<TaskFilter>;

    fn default_filter(&self) -> TaskFilter;

    /// 只有一个有意义的过滤值时，调用方可以隐藏过滤控件
    fn has_single_filter(&self) -> bool {
        self.supported_filters().len() <= 1
    }

    async fn list_tasks(&self, request: &TaskListRequest) -> PanelResult<TaskPage>;

    /// 找不到时返回 `PanelError::NotFound`，消息即展示给用户的说明
    async fn task_detail(&self, task_id: &str) -> PanelResult<TaskDetail>;
}

/// worker 数据源
#[async_trait]
pub trait WorkerSource: Backend {
    async fn list_workers(&self) -> PanelResult<WorkerListPage>;

    async fn worker_detail(&self, worker_id: &str) -> PanelResult<WorkerDetail>;
}

/// 队列数据源
#[async_trait]
pub trait QueueSource: Backend {
    async fn list_queues(&self) -> PanelResult<QueueListPage>;

    async fn queue_detail(&self, queue_name: &str) -> PanelResult<QueueDetail>;
}

/// 周期调度数据源
#[async_trait]
pub trait ScheduleSource: Backend {
    async fn list_periodic_tasks(&self) -> PanelResult<ScheduleListPage>;
}
