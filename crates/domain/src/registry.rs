use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use taskpanel_core::{ClusterHandle, PanelError, PanelResult};

use crate::backend::{BackendInfo, BackendMeta};

type Factory<S> = Box<dyn Fn(&ClusterHandle) -> Arc<S> + Send + Sync>;

struct RegistryEntry<S: ?Sized> {
    meta: BackendMeta,
    factory: Factory<S>,
}

/// 后端注册表：标识符 → 工厂函数
///
/// 取代按字符串动态加载的做法。未知标识符在构造门面时即报配置错误。
pub struct BackendRegistry<S: ?Sized> {
    domain: &'static str,
    entries: HashMap<String, RegistryEntry<S>>,
    order: Vec<String>,
}

impl<S: ?Sized> BackendRegistry<S> {
    pub fn new(domain: &'static str) -> Self {
        Self {
            domain,
            entries: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// 注册一个后端，同名标识符后注册的覆盖先注册的
    pub fn register<F>(&mut self, path: &str, meta: BackendMeta, factory: F) -> &mut Self
    where
        F: Fn(&ClusterHandle) -> Arc<S> + Send + Sync + 'static,
    {
        if !self.entries.contains_key(path) {
            self.order.push(path.to_string());
        }
        self.entries.insert(
            path.to_string(),
            RegistryEntry {
                meta,
                factory: Box::new(factory),
            },
        );
        self
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    /// 已注册的标识符，按注册顺序
    pub fn paths(&self) -> &[String] {
        &self.order
    }

    pub fn describe(&self) -> Vec<BackendInfo> {
        self.order
            .iter()
            .filter_map(|path| {
                self.entries
                    .get(path)
                    .map(|entry| BackendInfo::new(path, entry.meta))
            })
            .collect()
    }

    /// 解析标识符并用集群句柄实例化
    pub fn instantiate(&self, path: &str, handle: &ClusterHandle) -> PanelResult<Arc<S>> {
        let entry = self.entries.get(path).ok_or_else(|| {
            PanelError::Configuration(format!(
                "unknown {} backend '{}' (registered: {})",
                self.domain,
                path,
                self.order.join(", ")
            ))
        })?;
        debug!("实例化{}后端: {}", self.domain, path);
        Ok((entry.factory)(handle))
    }
}
