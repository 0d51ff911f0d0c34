//! 门面：调用方的稳定入口
//!
//! 每个门面在构造时绑定且仅绑定一个后端。后端选择顺序：显式覆盖 → 面板设置中的
//! 领域键 → 内置默认。后端返回的任何错误都在这里转换成带错误字段的结果，
//! 只有构造阶段的配置错误会返回给调用方。

use std::marker::PhantomData;
use std::sync::Arc;

use tracing::{debug, warn};

use taskpanel_core::models::{
    Detail, Page, QueueDetail, QueueListPage, ScheduleListPage, TaskDetail, TaskFilter,
    TaskListRequest, TaskPage, WorkerDetail, WorkerListPage,
};
use taskpanel_core::{ClusterHandle, PanelError, PanelResult};

use crate::backend::{
    Backend, BackendInfo, QueueSource, ScheduleSource, TaskSource, WorkerSource,
};
use crate::backends::{
    builtin_queue_backends, builtin_schedule_backends, builtin_task_backends,
    builtin_worker_backends, ConfigScheduleBackend, InspectQueueBackend, InspectWorkerBackend,
    ResultStoreTaskBackend,
};
use crate::registry::BackendRegistry;

/// 一个查询领域的门面参数
pub trait FacadeDomain {
    type Source: ?Sized + Backend;

    /// 面板设置中的后端选择键
    const BACKEND_KEY: &'static str;
    const DEFAULT_BACKEND: &'static str;

    fn builtin() -> BackendRegistry<Self::Source>;
}

pub struct Tasks;
pub struct Workers;
pub struct Queues;
pub struct PeriodicTasks;

impl FacadeDomain for Tasks {
    type Source = dyn TaskSource;
    const BACKEND_KEY: &'static str = "tasks_backend";
    const DEFAULT_BACKEND: &'static str = ResultStoreTaskBackend::PATH;

    fn builtin() -> BackendRegistry<Self::Source> {
        builtin_task_backends()
    }
}

impl FacadeDomain for Workers {
    type Source = dyn WorkerSource;
    const BACKEND_KEY: &'static str = "workers_backend";
    const DEFAULT_BACKEND: &'static str = InspectWorkerBackend::PATH;

    fn builtin() -> BackendRegistry<Self::Source> {
        builtin_worker_backends()
    }
}

impl FacadeDomain for Queues {
    type Source = dyn QueueSource;
    const BACKEND_KEY: &'static str = "queues_backend";
    const DEFAULT_BACKEND: &'static str = InspectQueueBackend::PATH;

    fn builtin() -> BackendRegistry<Self::Source> {
        builtin_queue_backends()
    }
}

impl FacadeDomain for PeriodicTasks {
    type Source = dyn ScheduleSource;
    const BACKEND_KEY: &'static str = "periodic_tasks_backend";
    const DEFAULT_BACKEND: &'static str = ConfigScheduleBackend::PATH;

    fn builtin() -> BackendRegistry<Self::Source> {
        builtin_schedule_backends()
    }
}

pub struct Facade<D: FacadeDomain> {
    backend: Arc<D::Source>,
    path: String,
    _domain: PhantomData<D>,
}

pub type TasksFacade = Facade<Tasks>;
pub type WorkersFacade = Facade<Workers>;
pub type QueuesFacade = Facade<Queues>;
pub type PeriodicTasksFacade = Facade<PeriodicTasks>;

impl<D: FacadeDomain> Facade<D> {
    /// 用内置注册表构造；`backend_path` 为显式覆盖
    pub fn new(handle: &ClusterHandle, backend_path: Option<&str>) -> PanelResult<Self> {
        Self::with_registry(handle, &D::builtin(), backend_path)
    }

    /// 用调用方提供的注册表构造，部署方可以注册自己的后端
    pub fn with_registry(
        handle: &ClusterHandle,
        registry: &BackendRegistry<D::Source>,
        backend_path: Option<&str>,
    ) -> PanelResult<Self> {
        let path = backend_path
            .or_else(|| handle.panel_settings().backend_for(D::BACKEND_KEY))
            .unwrap_or(D::DEFAULT_BACKEND);
        let backend = registry.instantiate(path, handle)?;
        debug!("{} 使用后端 {}", D::BACKEND_KEY, path);
        Ok(Self {
            backend,
            path: path.to_string(),
            _domain: PhantomData,
        })
    }

    pub fn get_backend_info(&self) -> BackendInfo {
        BackendInfo::new(&self.path, self.backend.meta())
    }

    pub fn backend(&self) -> &D::Source {
        &self.backend
    }
}

/// 后端错误 → 详情页的否定结果
fn missing<T>(err: PanelError) -> Detail<T> {
    match &err {
        PanelError::NotFound(_) => debug!("{}", err),
        _ => warn!("详情查询失败: {}", err),
    }
    Detail::missing(err.to_string())
}

impl Facade<Tasks> {
    pub fn supported_filters(&self) -> Vec<TaskFilter> {
        self.backend.supported_filters()
    }

    pub fn default_filter(&self) -> TaskFilter {
        self.backend.default_filter()
    }

    pub fn has_single_filter(&self) -> bool {
        self.backend.has_single_filter()
    }

    pub async fn get_tasks(
        &self,
        search: Option<&str>,
        page: u64,
        per_page: u64,
        filter_type: Option<TaskFilter>,
    ) -> TaskPage {
        let request = TaskListRequest {
            search: search.map(str::to_string),
            page,
            per_page,
            filter: filter_type,
        };
        match self.backend.list_tasks(&request).await {
            Ok(tasks) => tasks,
            Err(e) => {
                warn!("任务列表查询失败: {}", e);
                Page::failed(page, per_page, e.to_string())
            }
        }
    }

    pub async fn get_task_detail(&self, task_id: &str) -> Detail<TaskDetail> {
        self.backend
            .task_detail(task_id)
            .await
            .map_or_else(missing, Detail::found)
    }
}

impl Facade<Workers> {
    pub async fn get_workers(&self) -> WorkerListPage {
        match self.backend.list_workers().await {
            Ok(page) => page,
            Err(e) => {
                warn!("worker 列表查询失败: {}", e);
                WorkerListPage::failed(e.to_string())
            }
        }
    }

    pub async fn get_worker_detail(&self, worker_id: &str) -> Detail<WorkerDetail> {
        self.backend
            .worker_detail(worker_id)
            .await
            .map_or_else(missing, Detail::found)
    }
}

impl Facade<Queues> {
    pub async fn get_queues(&self) -> QueueListPage {
        match self.backend.list_queues().await {
            Ok(page) => page,
            Err(e) => {
                warn!("队列列表查询失败: {}", e);
                QueueListPage::failed(e.to_string())
            }
        }
    }

    pub async fn get_queue_detail(&self, queue_name: &str) -> Detail<QueueDetail> {
        self.backend
            .queue_detail(queue_name)
            .await
            .map_or_else(missing, Detail::found)
    }
}

impl Facade<PeriodicTasks> {
    pub async fn get_periodic_tasks(&self) -> ScheduleListPage {
        match self.backend.list_periodic_tasks().await {
            Ok(page) => page,
            Err(e) => {
                warn!("周期任务查询失败: {}", e);
                ScheduleListPage::failed(e.to_string())
            }
        }
    }
}
