//! 结果表查询构造
//!
//! 只负责根据 `TaskQuery` 拼接带 `$n` 占位符的 SQL 与参数列表。

use taskpanel_core::models::TaskQuery;

pub const RESULT_TABLE: &str = "django_celery_results_taskresult";

const RESULT_COLUMNS: &str = "task_id, task_name, status, result, date_created, date_started, \
     date_done, worker, task_args, task_kwargs, traceback, meta";

pub struct TaskResultQueryBuilder;

impl TaskResultQueryBuilder {
    pub fn build_count_query(query: &TaskQuery) -> (String, Vec<TaskResultQueryParam>) {
        let mut sql = format!("SELECT COUNT(*) FROM {RESULT_TABLE} WHERE 1=1");
        let mut params = Vec::new();
        Self::push_filters(&mut sql, &mut params, query);
        (sql, params)
    }

    /// 按创建时间倒序取一页
    pub fn build_select_query(
        query: &TaskQuery,
        offset: u64,
        limit: u64,
    ) -> (String, Vec<TaskResultQueryParam>) {
        let mut sql = format!("SELECT {RESULT_COLUMNS} FROM {RESULT_TABLE} WHERE 1=1");
        let mut params = Vec::new();
        Self::push_filters(&mut sql, &mut params, query);

        sql.push_str(" ORDER BY date_created DESC NULLS LAST");

        sql.push_str(" LIMIT $");
        sql.push_str(&(params.len() + 1).to_string());
        params.push(TaskResultQueryParam::Int64(to_i64(limit)));

        sql.push_str(" OFFSET $");
        sql.push_str(&(params.len() + 1).to_string());
        params.push(TaskResultQueryParam::Int64(to_i64(offset)));

        (sql, params)
    }

    pub fn build_find_by_id_query() -> String {
        format!("SELECT {RESULT_COLUMNS} FROM {RESULT_TABLE} WHERE task_id = $1 LIMIT 1")
    }

    fn push_filters(sql: &mut String, params: &mut Vec<TaskResultQueryParam>, query: &TaskQuery) {
        if let Some(search) = query.search.as_deref() {
            let n = params.len() + 1;
            sql.push_str(&format!(" AND (task_name ILIKE ${n} OR task_id ILIKE ${n})"));
            params.push(TaskResultQueryParam::Text(format!(
                "%{}%",
                escape_like(search)
            )));
        }

        if let Some(status) = &query.status {
            sql.push_str(" AND status = $");
            sql.push_str(&(params.len() + 1).to_string());
            params.push(TaskResultQueryParam::Text(status.as_str().to_string()));
        }
    }
}

/// 转义 LIKE 通配符，搜索按字面子串匹配
fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// 查询参数
#[derive(Debug, Clone, PartialEq)]
pub enum TaskResultQueryParam {
    Text(String),
    Int64(i64),
}
