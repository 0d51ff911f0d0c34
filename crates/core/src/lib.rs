pub mod config;
pub mod errors;
pub mod handle;
pub mod logging;
pub mod models;
pub mod traits;

pub use crate::config::{
    ClusterSettings, ControlPlaneConfig, DatabaseConfig, PanelConfig, PanelSettings, ENV_PREFIX,
};
pub use errors::{PanelError, PanelResult, RESULT_STORE_MISSING, SCHEDULE_STORE_MISSING};
pub use handle::{ClusterHandle, ClusterHandleBuilder};
pub use logging::{init_logging, LogFormat, LoggingConfig};
pub use traits::*;
