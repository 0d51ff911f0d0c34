use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 任务生命周期状态
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskStatus {
    Pending,
    Received,
    Started,
    Success,
    Failure,
    Retry,
    Revoked,
    Ignored,
    /// 上游存储中出现的未知状态，原样保留
    #[serde(untagged)]
    Other(String),
}

impl TaskStatus {
    pub fn as_str(&self) -> &str {
        match self {
            TaskStatus::Pending => "PENDING",
            TaskStatus::Received => "RECEIVED",
            TaskStatus::Started => "STARTED",
            TaskStatus::Success => "SUCCESS",
            TaskStatus::Failure => "FAILURE",
            TaskStatus::Retry => "RETRY",
            TaskStatus::Revoked => "REVOKED",
            TaskStatus::Ignored => "IGNORED",
            TaskStatus::Other(s) => s,
        }
    }

    /// 宽松解析，从不失败
    pub fn parse_lossy(s: &str) -> Self {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => TaskStatus::Pending,
            "RECEIVED" => TaskStatus::Received,
            "STARTED" => TaskStatus::Started,
            "SUCCESS" => TaskStatus::Success,
            "FAILURE" => TaskStatus::Failure,
            "RETRY" => TaskStatus::Retry,
            "REVOKED" => TaskStatus::Revoked,
            "IGNORED" => TaskStatus::Ignored,
            _ => TaskStatus::Other(s.to_string()),
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 任务列表过滤值
///
/// 每个后端声明自己支持的过滤值与默认值；门面不硬编码过滤列表。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskFilter {
    All,
    Active,
    Pending,
    Started,
    Success,
    Failure,
    Retry,
    Revoked,
}

impl TaskFilter {
    /// 对应的生命周期状态；`All`/`Active` 不按状态过滤
    pub fn status(&self) -> Option<TaskStatus> {
        match self {
            TaskFilter::All | TaskFilter::Active => None,
            TaskFilter::Pending => Some(TaskStatus::Pending),
            TaskFilter::Started => Some(TaskStatus::Started),
            TaskFilter::Success => Some(TaskStatus::Success),
            TaskFilter::Failure => Some(TaskStatus::Failure),
            TaskFilter::Retry => Some(TaskStatus::Retry),
            TaskFilter::Revoked => Some(TaskStatus::Revoked),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskFilter::All => "all",
            TaskFilter::Active => "active",
            TaskFilter::Pending => "pending",
            TaskFilter::Started => "started",
            TaskFilter::Success => "success",
            TaskFilter::Failure => "failure",
            TaskFilter::Retry => "retry",
            TaskFilter::Revoked => "revoked",
        }
    }
}

impl FromStr for TaskFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(TaskFilter::All),
            "active" => Ok(TaskFilter::Active),
            "pending" => Ok(TaskFilter::Pending),
            "started" => Ok(TaskFilter::Started),
            "success" => Ok(TaskFilter::Success),
            "failure" => Ok(TaskFilter::Failure),
            "retry" => Ok(TaskFilter::Retry),
            "revoked" => Ok(TaskFilter::Revoked),
            other => Err(format!("unknown task filter: {other}")),
        }
    }
}

impl fmt::Display for TaskFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 任务记录（只读投影）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: String,
    pub name: Option<String>,
    pub status: TaskStatus,
    pub args: Option<String>,
    pub kwargs: Option<String>,
    pub result: Option<String>,
    pub date_created: Option<DateTime<Utc>>,
    pub date_started: Option<DateTime<Utc>>,
    pub date_done: Option<DateTime<Utc>>,
    pub worker: Option<String>,
    pub traceback: Option<String>,
    pub meta: Option<String>,
}

impl TaskRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>, status: TaskStatus) -> Self {
        Self {
            id: id.into(),
            name: Some(name.into()),
            status,
            args: None,
            kwargs: None,
            result: None,
            date_created: None,
            date_started: None,
            date_done: None,
            worker: None,
            traceback: None,
            meta: None,
        }
    }

    /// 耗时（秒）：done − created，两者都存在时才有值
    pub fn duration_seconds(&self) -> Option<f64> {
        let created = self.date_created?;
        let done = self.date_done?;
        Some((done - created).num_milliseconds() as f64 / 1000.0)
    }

    /// 名称或ID的大小写不敏感子串匹配
    pub fn matches_search(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.id.to_lowercase().contains(&needle)
            || self
                .name
                .as_deref()
                .is_some_and(|name| name.to_lowercase().contains(&needle))
    }
}

/// 任务详情：记录加派生耗时
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDetail {
    #[serde(flatten)]
    pub task: TaskRecord,
    pub duration: Option<f64>,
}

impl From<TaskRecord> for TaskDetail {
    fn from(task: TaskRecord) -> Self {
        let duration = task.duration_seconds();
        Self { task, duration }
    }
}

/// 任务列表查询条件
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskQuery {
    pub search: Option<String>,
    pub status: Option<TaskStatus>,
}

impl TaskQuery {
    pub fn new(search: Option<&str>, status: Option<TaskStatus>) -> Self {
        Self {
            search: search
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            status,
        }
    }

    pub fn matches(&self, task: &TaskRecord) -> bool {
        let search_ok = self
            .search
            .as_deref()
            .is_none_or(|needle| task.matches_search(needle));
        let status_ok = self.status.as_ref().is_none_or(|s| &task.status == s);
        search_ok && status_ok
    }
}

/// 任务列表请求参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskListRequest {
    pub search: Option<String>,
    pub page: u64,
    pub per_page: u64,
    pub filter: Option<TaskFilter>,
}

impl Default for TaskListRequest {
    fn default() -> Self {
        Self {
            search: None,
            page: 1,
            per_page: super::page::DEFAULT_PER_PAGE,
            filter: None,
        }
    }
}

/// 任务列表页
pub type TaskPage = super::page::Page<TaskRecord>;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_duration_requires_both_timestamps() {
        let mut task = TaskRecord::new("abc", "app.tasks.add", TaskStatus::Success);
        assert_eq!(task.duration_seconds(), None);

        task.date_created = Some(Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap());
        assert_eq!(task.duration_seconds(), None);

        task.date_done = Some(Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 30).unwrap());
        assert_eq!(task.duration_seconds(), Some(30.0));
        assert_eq!(TaskDetail::from(task).duration, Some(30.0));
    }

    #[test]
    fn test_search_matches_name_or_id_case_insensitively() {
        let task = TaskRecord::new("7f3a-XYZ", "app.tasks.Process_Data", TaskStatus::Started);
        assert!(task.matches_search("process"));
        assert!(task.matches_search("xyz"));
        assert!(!task.matches_search("email"));
    }

    #[test]
    fn test_status_parsing_is_lossy() {
        assert_eq!(TaskStatus::parse_lossy("success"), TaskStatus::Success);
        assert_eq!(
            TaskStatus::parse_lossy("PROGRESS"),
            TaskStatus::Other("PROGRESS".to_string())
        );
        assert_eq!(TaskStatus::Other("PROGRESS".into()).to_string(), "PROGRESS");
    }

    #[test]
    fn test_filter_parsing_and_status_mapping() {
        assert_eq!("Failure".parse::<TaskFilter>().unwrap(), TaskFilter::Failure);
        assert!("bogus".parse::<TaskFilter>().is_err());
        assert_eq!(TaskFilter::All.status(), None);
        assert_eq!(TaskFilter::Active.status(), None);
        assert_eq!(TaskFilter::Retry.status(), Some(TaskStatus::Retry));
    }

    #[test]
    fn test_blank_search_is_ignored() {
        let query = TaskQuery::new(Some("   "), None);
        assert_eq!(query.search, None);
        assert!(query.matches(&TaskRecord::new("1", "x", TaskStatus::Pending)));
    }
}
