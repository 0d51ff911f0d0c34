use thiserror::Error;

/// 面板错误类型定义
///
/// 每个变体对应一种失败语义。除 `Configuration` 外，所有错误都会在门面边界
/// 被转换为结果记录中的错误字符串，不会传播给调用方。
#[derive(Debug, Error)]
pub enum PanelError {
    /// 部署配置错误（未知的后端标识等），在构造时致命
    #[error("configuration error: {0}")]
    Configuration(String),

    /// 集群不可达：无响应、连接被拒绝、超时
    #[error("{0}")]
    Unavailable(String),

    #[error("{0}")]
    NotFound(String),

    /// 可选依赖（持久化存储）未安装
    #[error("{0}")]
    MissingDependency(String),

    /// 能力缺口，例如不支持深度探测的传输
    #[error("{0}")]
    Unsupported(String),

    #[error("broker error: {0}")]
    Broker(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl PanelError {
    /// 是否属于构造期的致命配置错误
    pub fn is_fatal(&self) -> bool {
        matches!(self, PanelError::Configuration(_))
    }
}

impl From<serde_json::Error> for PanelError {
    fn from(err: serde_json::Error) -> Self {
        PanelError::Serialization(err.to_string())
    }
}

/// 结果库未安装时的提示：未配置数据库，或数据库中没有结果表
pub const RESULT_STORE_MISSING: &str = "Task result store is not installed. \
     Configure database.url and create the results tables to enable task history";

/// 调度库未安装时的提示，与查询失败区分开
pub const SCHEDULE_STORE_MISSING: &str = "Schedule store is not installed. \
     Configure database.url and create the beat tables to read persisted periodic tasks";

/// 统一的Result类型
pub type PanelResult<T> = std::result::Result<T, PanelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_configuration_is_fatal() {
        assert!(PanelError::Configuration("bad".into()).is_fatal());
        assert!(!PanelError::Unavailable("down".into()).is_fatal());
        assert!(!PanelError::NotFound("gone".into()).is_fatal());
    }

    #[test]
    fn test_messages_are_passed_through() {
        let err = PanelError::MissingDependency("result store is not installed".into());
        assert_eq!(err.to_string(), "result store is not installed");

        let err = PanelError::Configuration("unknown backend".into());
        assert_eq!(err.to_string(), "configuration error: unknown backend");
    }
}
