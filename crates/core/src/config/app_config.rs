use std::path::Path;

use anyhow::{Context, Result};
use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use super::settings::{ClusterSettings, PanelSettings};
use crate::logging::LoggingConfig;

/// 默认配置文件搜索路径
const DEFAULT_CONFIG_PATHS: [&str; 3] = [
    "config/taskpanel.toml",
    "taskpanel.toml",
    "/etc/taskpanel/config.toml",
];

/// 环境变量覆盖前缀
pub const ENV_PREFIX: &str = "TASKPANEL";

/// 控制平面网关配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlPlaneConfig {
    /// 网关基础URL，为空表示未配置
    pub url: Option<String>,
    pub timeout_seconds: u64,
}

impl Default for ControlPlaneConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout_seconds: 5,
        }
    }
}

/// 结果存储与调度存储所用的数据库配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// 为空表示持久化存储未安装
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout_seconds: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 5,
            connection_timeout_seconds: 10,
        }
    }
}

/// 系统配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelConfig {
    /// 后端选择覆盖
    pub panel: PanelSettings,
    /// 集群调优设置（broker_url、序列化、beat_schedule……）
    pub cluster: ClusterSettings,
    pub control: ControlPlaneConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    /// 宿主应用本地注册的任务名
    pub registered_tasks: Vec<String>,
}

impl PanelConfig {
    /// 从配置文件和环境变量加载配置
    ///
    /// 加载顺序：
    /// 1. 默认配置
    /// 2. 配置文件（TOML格式）
    /// 3. 环境变量覆盖（前缀：TASKPANEL_，层级分隔符 `__`）
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder = ConfigBuilder::builder();

        if let Some(path) = config_path {
            if !Path::new(path).exists() {
                return Err(anyhow::anyhow!("配置文件不存在: {}", path));
            }
            builder = builder.add_source(File::new(path, FileFormat::Toml));
        } else if let Some(path) = DEFAULT_CONFIG_PATHS
            .iter()
            .find(|path| Path::new(path).exists())
        {
            builder = builder.add_source(File::new(path, FileFormat::Toml));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("构建配置失败")?;
        let panel_config: PanelConfig = config.try_deserialize().context("解析配置失败")?;
        panel_config.validate()?;
        Ok(panel_config)
    }

    /// 验证配置
    pub fn validate(&self) -> Result<()> {
        if self.control.timeout_seconds == 0 {
            return Err(anyhow::anyhow!("控制平面超时时间必须大于0"));
        }
        if self.database.max_connections == 0 {
            return Err(anyhow::anyhow!("数据库最大连接数必须大于0"));
        }
        if let Some(url) = &self.control.url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(anyhow::anyhow!("控制平面URL必须以http://或https://开头: {}", url));
            }
        }
        Ok(())
    }
}
