//! 任务后端：持久化结果库（默认）与实时 active 广播

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use taskpanel_core::models::{
    Page, Paginator, TaskDetail, TaskFilter, TaskInfo, TaskListRequest, TaskPage, TaskQuery,
    TaskRecord, TaskStatus,
};
use taskpanel_core::traits::{Destination, TaskResultStore};
use taskpanel_core::{ClusterHandle, PanelError, PanelResult};

use crate::backend::{Backend, BackendMeta, TaskSource};
use crate::inspector::{record_broadcast, NO_WORKERS_MESSAGE};

pub use taskpanel_core::RESULT_STORE_MISSING;

pub const TASK_NOT_FOUND: &str = "Task not found";

/// 实时后端只能看到正在执行的任务
pub const ACTIVE_TASK_NOT_FOUND: &str = "Task not found among currently active tasks. \
     The live cluster only reports tasks that are executing right now; \
     tasks that already finished or are still waiting in a queue are not visible here";

fn ensure_supported(source: &dyn TaskSource, filter: TaskFilter) -> PanelResult<()> {
    if source.supported_filters().contains(&filter) {
        Ok(())
    } else {
        Err(PanelError::Unsupported(format!(
            "Filter '{filter}' is not supported by this task backend"
        )))
    }
}

/// 从持久化任务结果库读取历史任务
pub struct ResultStoreTaskBackend {
    store: Option<Arc<dyn TaskResultStore>>,
}

impl ResultStoreTaskBackend {
    pub const PATH: &'static str = "taskpanel::tasks::ResultStoreTaskBackend";
    pub const META: BackendMeta = BackendMeta {
        description: "Task history from the persisted result store",
        data_source: "Database (task result store)",
    };

    pub fn new(handle: &ClusterHandle) -> Self {
        Self {
            store: handle.task_results(),
        }
    }

    fn store(&self) -> PanelResult<&dyn TaskResultStore> {
        self.store
            .as_deref()
            .ok_or_else(|| PanelError::MissingDependency(RESULT_STORE_MISSING.to_string()))
    }
}

impl Backend for ResultStoreTaskBackend {
    fn meta(&self) -> BackendMeta {
        Self::META
    }
}

#[async_trait]
impl TaskSource for ResultStoreTaskBackend {
    fn supported_filters(&self) -> Vec<TaskFilter> {
        vec![
            TaskFilter::All,
            TaskFilter::Success,
            TaskFilter::Failure,
            TaskFilter::Pending,
            TaskFilter::Started,
            TaskFilter::Retry,
            TaskFilter::Revoked,
        ]
    }

    fn default_filter(&self) -> TaskFilter {
        TaskFilter::All
    }

    #[instrument(skip(self), fields(page = request.page, per_page = request.per_page))]
    async fn list_tasks(&self, request: &TaskListRequest) -> PanelResult<TaskPage> {
        let store = self.store()?;
        let filter = request.filter.unwrap_or_else(|| self.default_filter());
        ensure_supported(self, filter)?;

        let query = TaskQuery::new(request.search.as_deref(), filter.status());
        let count = store.count(&query).await?;
        let window = Paginator::new(count, request.per_page).window(request.page);

        let items = if count == 0 {
            Vec::new()
        } else {
            store
                .fetch_page(&query, window.offset, window.per_page)
                .await?
        };
        debug!("结果库返回 {} 条任务（共 {} 条）", items.len(), count);

        Ok(Page::from_window(items, window))
    }

    #[instrument(skip(self))]
    async fn task_detail(&self, task_id: &str) -> PanelResult<TaskDetail> {
        let store = self.store()?;
        store
            .find_by_id(task_id)
            .await?
            .map(TaskDetail::from)
            .ok_or_else(|| PanelError::NotFound(TASK_NOT_FOUND.to_string()))
    }
}

/// 从 active 广播读取正在执行的任务
pub struct InspectTaskBackend {
    handle: ClusterHandle,
}

impl InspectTaskBackend {
    pub const PATH: &'static str = "taskpanel::tasks::InspectTaskBackend";
    pub const META: BackendMeta = BackendMeta {
        description: "Currently executing tasks reported by live workers",
        data_source: "Cluster Inspect API",
    };

    pub fn new(handle: &ClusterHandle) -> Self {
        Self {
            handle: handle.clone(),
        }
    }

    /// 一次 active 广播，按 worker 响应顺序展开
    async fn active_tasks(&self) -> PanelResult<Option<Vec<TaskRecord>>> {
        let destination = Destination::Broadcast;
        record_broadcast("active", &destination);
        let replies = match self.handle.control().active(&destination).await? {
            Some(replies) => replies,
            None => return Ok(None),
        };

        let tasks = replies
            .iter()
            .flat_map(|(worker, tasks)| tasks.iter().map(move |info| active_record(worker, info)))
            .collect();
        Ok(Some(tasks))
    }
}

/// active 列表条目 → 任务记录
fn active_record(worker: &str, info: &TaskInfo) -> TaskRecord {
    let started = info
        .time_start
        .and_then(|ts| DateTime::<Utc>::from_timestamp_millis((ts * 1000.0) as i64));
    TaskRecord {
        id: info.id.clone(),
        name: info.name.clone(),
        status: TaskStatus::Started,
        args: json_text(&info.args),
        kwargs: json_text(&info.kwargs),
        result: None,
        date_created: None,
        date_started: started,
        date_done: None,
        worker: Some(worker.to_string()),
        traceback: None,
        meta: None,
    }
}

fn json_text(value: &Value) -> Option<String> {
    (!value.is_null()).then(|| value.to_string())
}

impl Backend for InspectTaskBackend {
    fn meta(&self) -> BackendMeta {
        Self::META
    }
}

#[async_trait]
impl TaskSource for InspectTaskBackend {
    fn supported_filters(&self) -> Vec<TaskFilter> {
        vec![TaskFilter::Active]
    }

    fn default_filter(&self) -> TaskFilter {
        TaskFilter::Active
    }

    #[instrument(skip(self), fields(page = request.page, per_page = request.per_page))]
    async fn list_tasks(&self, request: &TaskListRequest) -> PanelResult<TaskPage> {
        let filter = request.filter.unwrap_or_else(|| self.default_filter());
        ensure_supported(self, filter)?;

        let Some(tasks) = self.active_tasks().await? else {
            return Ok(Page::paginate(&[], request.page, request.per_page)
                .with_error(NO_WORKERS_MESSAGE));
        };

        let query = TaskQuery::new(request.search.as_deref(), None);
        let matching: Vec<TaskRecord> = tasks.into_iter().filter(|t| query.matches(t)).collect();
        Ok(Page::paginate(&matching, request.page, request.per_page))
    }

    #[instrument(skip(self))]
    async fn task_detail(&self, task_id: &str) -> PanelResult<TaskDetail> {
        let tasks = self.active_tasks().await?.unwrap_or_default();
        match tasks.into_iter().find(|t| t.id == task_id) {
            Some(task) => Ok(TaskDetail::from(task)),
            None => {
                warn!("任务 {} 不在当前执行的任务中", task_id);
                Err(PanelError::NotFound(ACTIVE_TASK_NOT_FOUND.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskpanel_testing_utils::{
        handle_with, task_info, FakeBroker, FakeControlPlane, FakeWorker,
    };

    fn live_handle() -> ClusterHandle {
        let control = FakeControlPlane::with_workers(vec![FakeWorker::new("celery@a")
            .with_active(task_info("t-1", "app.process_data", "celery@a"))
            .with_active(task_info("t-2", "app.send_email", "celery@a"))
            .with_active(task_info("t-3", "app.process_images", "celery@a"))]);
        handle_with(control, FakeBroker::list_backed())
    }

    #[test]
    fn test_inspect_backend_declares_single_filter() {
        let backend = InspectTaskBackend::new(&live_handle());
        assert_eq!(backend.supported_filters(), vec![TaskFilter::Active]);
        assert!(backend.has_single_filter());
    }

    #[tokio::test]
    async fn test_inspect_backend_rejects_status_filter() {
        let backend = InspectTaskBackend::new(&live_handle());
        let request = TaskListRequest {
            filter: Some(TaskFilter::Failure),
            ..Default::default()
        };
        let err = backend.list_tasks(&request).await.unwrap_err();
        assert!(matches!(err, PanelError::Unsupported(_)));
    }

    #[tokio::test]
    async fn test_active_records_carry_worker_and_start_time() {
        let backend = InspectTaskBackend::new(&live_handle());
        let detail = backend.task_detail("t-2").await.unwrap();
        assert_eq!(detail.task.worker.as_deref(), Some("celery@a"));
        assert_eq!(detail.task.status, TaskStatus::Started);
        assert!(detail.task.date_started.is_some());
        assert_eq!(detail.task.args.as_deref(), Some("[]"));
        assert_eq!(detail.duration, None);
    }

    #[tokio::test]
    async fn test_result_store_backend_without_store() {
        let handle = handle_with(FakeControlPlane::new(), FakeBroker::list_backed());
        let backend = ResultStoreTaskBackend::new(&handle);
        let err = backend
            .list_tasks(&TaskListRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, PanelError::MissingDependency(_)));
        assert_eq!(err.to_string(), RESULT_STORE_MISSING);
    }
}
