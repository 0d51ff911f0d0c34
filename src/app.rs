use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};

use taskpanel_core::traits::ControlPlane;
use taskpanel_core::{ClusterHandle, PanelConfig};
use taskpanel_infrastructure::{
    broker_transport_for, connect_pool, DisconnectedControlPlane, HttpControlPlane,
    PostgresScheduleStore, PostgresTaskResultStore,
};

/// 按进程配置装配集群句柄
///
/// 控制平面网关未配置时使用断开的控制平面；数据库未配置时不安装持久化存储。
pub fn build_handle(config: &PanelConfig) -> Result<ClusterHandle> {
    let control: Arc<dyn ControlPlane> = match config.control.url.as_deref() {
        Some(url) => {
            info!("控制平面网关: {}", url);
            Arc::new(
                HttpControlPlane::new(url, Duration::from_secs(config.control.timeout_seconds))
                    .context("创建控制平面客户端失败")?,
            )
        }
        None => {
            warn!("未配置控制平面网关，集群将显示为不可达");
            Arc::new(DisconnectedControlPlane)
        }
    };

    let broker = broker_transport_for(&config.cluster);
    info!("队列深度探测传输: {}", broker.transport_name());

    let mut builder = ClusterHandle::builder(control, broker)
        .settings(config.cluster.clone())
        .panel_settings(config.panel.clone())
        .registered_tasks(config.registered_tasks.iter().cloned());

    if let Some(pool) = connect_pool(&config.database).context("创建数据库连接池失败")? {
        builder = builder
            .task_results(Arc::new(PostgresTaskResultStore::new(pool.clone())))
            .schedules(Arc::new(PostgresScheduleStore::new(pool)));
    }

    Ok(builder.build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskpanel_domain::{TasksFacade, WorkersFacade};

    #[tokio::test]
    async fn test_default_config_reports_cluster_unavailable() {
        let handle = build_handle(&PanelConfig::default()).unwrap();
        assert!(handle.task_results().is_none());

        let workers = WorkersFacade::new(&handle, None).unwrap().get_workers().await;
        assert!(!workers.cluster_available);
        assert!(workers.error.is_some());
    }

    #[tokio::test]
    async fn test_missing_result_store_is_reported_on_the_page() {
        let handle = build_handle(&PanelConfig::default()).unwrap();
        let page = TasksFacade::new(&handle, None)
            .unwrap()
            .get_tasks(None, 1, 50, None)
            .await;
        assert!(page.items.is_empty());
        assert!(page.error.is_some());
    }

    #[test]
    fn test_registered_tasks_come_from_config() {
        let config = PanelConfig {
            registered_tasks: vec!["app.tasks.send_email".to_string()],
            ..Default::default()
        };
        let handle = build_handle(&config).unwrap();
        assert_eq!(handle.registered_tasks(), ["app.tasks.send_email".to_string()]);
    }
}
