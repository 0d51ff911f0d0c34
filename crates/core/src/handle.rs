use std::fmt;
use std::sync::Arc;

use crate::config::{ClusterSettings, PanelSettings};
use crate::traits::{BrokerTransport, ControlPlane, ScheduleStore, TaskResultStore};

/// 集群句柄
///
/// 显式注入到每个门面和后端中，不存在全局的"当前集群"。克隆成本只是几个
/// `Arc` 计数，每个请求可以各自持有一份。
#[derive(Clone)]
pub struct ClusterHandle {
    control: Arc<dyn ControlPlane>,
    broker: Arc<dyn BrokerTransport>,
    task_results: Option<Arc<dyn TaskResultStore>>,
    schedules: Option<Arc<dyn ScheduleStore>>,
    settings: Arc<ClusterSettings>,
    panel_settings: Arc<PanelSettings>,
    registered_tasks: Arc<Vec<String>>,
}

impl ClusterHandle {
    pub fn builder(
        control: Arc<dyn ControlPlane>,
        broker: Arc<dyn BrokerTransport>,
    ) -> ClusterHandleBuilder {
        ClusterHandleBuilder {
            control,
            broker,
            task_results: None,
            schedules: None,
            settings: ClusterSettings::default(),
            panel_settings: PanelSettings::default(),
            registered_tasks: Vec::new(),
        }
    }

    pub fn control(&self) -> &dyn ControlPlane {
        self.control.as_ref()
    }

    pub fn broker(&self) -> &dyn BrokerTransport {
        self.broker.as_ref()
    }

    /// 持久化结果库，未安装时为 `None`
    pub fn task_results(&self) -> Option<Arc<dyn TaskResultStore>> {
        self.task_results.clone()
    }

    /// 持久化调度库，未安装时为 `None`
    pub fn schedules(&self) -> Option<Arc<dyn ScheduleStore>> {
        self.schedules.clone()
    }

    pub fn settings(&self) -> &ClusterSettings {
        &self.settings
    }

    pub fn panel_settings(&self) -> &PanelSettings {
        &self.panel_settings
    }

    /// 宿主应用本地注册的任务名
    pub fn registered_tasks(&self) -> &[String] {
        &self.registered_tasks
    }
}

impl fmt::Debug for ClusterHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClusterHandle")
            .field("broker", &self.broker.transport_name())
            .field("task_results", &self.task_results.is_some())
            .field("schedules", &self.schedules.is_some())
            .field("settings", &self.settings)
            .field("panel_settings", &self.panel_settings)
            .finish()
    }
}

pub struct ClusterHandleBuilder {
    control: Arc<dyn ControlPlane>,
    broker: Arc<dyn BrokerTransport>,
    task_results: Option<Arc<dyn TaskResultStore>>,
    schedules: Option<Arc<dyn ScheduleStore>>,
    settings: ClusterSettings,
    panel_settings: PanelSettings,
    registered_tasks: Vec<String>,
}

impl ClusterHandleBuilder {
    pub fn task_results(mut self, store: Arc<dyn TaskResultStore>) -> Self {
        self.task_results = Some(store);
        self
    }

    pub fn schedules(mut self, store: Arc<dyn ScheduleStore>) -> Self {
        self.schedules = Some(store);
        self
    }

    pub fn settings(mut self, settings: ClusterSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn panel_settings(mut self, settings: PanelSettings) -> Self {
        self.panel_settings = settings;
        self
    }

    pub fn registered_tasks<I, S>(mut self, tasks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.registered_tasks = tasks.into_iter().map(Into::into).collect();
        self
    }

    pub fn build(self) -> ClusterHandle {
        ClusterHandle {
            control: self.control,
            broker: self.broker,
            task_results: self.task_results,
            schedules: self.schedules,
            settings: Arc::new(self.settings),
            panel_settings: Arc::new(self.panel_settings),
            registered_tasks: Arc::new(self.registered_tasks),
        }
    }
}
