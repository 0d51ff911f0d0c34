//! 配置管理
//!
//! - **settings**: 集群调优设置与后端选择覆盖，均为带默认值的宽松键值读取
//! - **app_config**: 进程级配置，文件 + 环境变量分层加载

pub mod app_config;
pub mod settings;

pub use app_config::{ControlPlaneConfig, DatabaseConfig, PanelConfig, ENV_PREFIX};
pub use settings::{ClusterSettings, PanelSettings};
