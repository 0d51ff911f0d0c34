//! 只读投影模型
//!
//! 面板从不创建、修改或删除上游对象，这里的类型都是查询结果的重塑。

pub mod cluster;
pub mod page;
pub mod queue;
pub mod schedule;
pub mod task;
pub mod worker;

pub use cluster::{ClusterConfigSnapshot, ClusterStatus};
pub use page::{Detail, Page, PageWindow, Paginator, DEFAULT_PER_PAGE};
pub use queue::{
    ExchangeInfo, QueueBinding, QueueDepth, QueueDetail, QueueListPage, QueueRecord,
    QueueWorkerBinding,
};
pub use schedule::{
    parse_args_lossy, parse_kwargs_lossy, ClockedSchedule, CrontabSchedule, IntervalSchedule,
    PeriodicScheduleRecord, ScheduleListPage, SolarSchedule, StoredSchedule,
};
pub use task::{
    TaskDetail, TaskFilter, TaskListRequest, TaskPage, TaskQuery, TaskRecord, TaskStatus,
};
pub use worker::{
    PoolStats, ScheduledTaskInfo, TaskInfo, WorkerDetail, WorkerListPage, WorkerRecord,
    WorkerStats,
};
