use async_trait::async_trait;

use crate::models::{StoredSchedule, TaskQuery, TaskRecord};
use crate::PanelResult;

/// 持久化的任务结果存储（外部结果库拥有其表结构，只读）
#[async_trait]
pub trait TaskResultStore: Send + Sync {
    async fn count(&self, query: &TaskQuery) -> PanelResult<u64>;

    /// 按创建时间倒序取一页
    async fn fetch_page(
        &self,
        query: &TaskQuery,
        offset: u64,
        limit: u64,
    ) -> PanelResult<Vec<TaskRecord>>;

    async fn find_by_id(&self, task_id: &str) -> PanelResult<Option<TaskRecord>>;
}

/// 持久化的周期调度存储（外部 beat 调度库拥有其表结构，只读）
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    /// 仅启用的条目
    async fn enabled_entries(&self) -> PanelResult<Vec<StoredSchedule>>;
}
