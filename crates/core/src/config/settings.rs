use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 集群调优设置
///
/// 键值映射，键名与任务队列自身的配置项一致（`broker_url`、`task_serializer`……）。
/// 所有读取都带调用方给出的默认值，键缺失或类型不符时回退到默认值，从不报错。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClusterSettings {
    values: Map<String, Value>,
}

impl ClusterSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(values: Map<String, Value>) -> Self {
        Self { values }
    }

    /// 链式设置，便于测试和嵌入式构造
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// 原始值；显式的 null 视为缺失
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key).filter(|v| !v.is_null())
    }

    pub fn get_str(&self, key: &str, default: &str) -> String {
        self.get(key)
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| default.to_string())
    }

    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.get(key) {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => match s.to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => true,
                "false" | "0" | "no" | "off" => false,
                _ => default,
            },
            _ => default,
        }
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        match self.get(key)? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn get_u64_or(&self, key: &str, default: u64) -> u64 {
        self.get_u64(key).unwrap_or(default)
    }

    /// 字符串列表；单个字符串会被当作只有一个元素的列表
    pub fn get_str_list(&self, key: &str, default: &[&str]) -> Vec<String> {
        match self.get(key) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            Some(Value::String(s)) => vec![s.clone()],
            _ => default.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn get_object(&self, key: &str) -> Option<&Map<String, Value>> {
        self.get(key).and_then(Value::as_object)
    }
}

/// 面板自身的后端选择覆盖
///
/// 以门面特定的键（`tasks_backend`、`workers_backend`……）映射到后端标识。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PanelSettings {
    backends: HashMap<String, String>,
}

impl PanelSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_backend(mut self, key: impl Into<String>, path: impl Into<String>) -> Self {
        self.backends.insert(key.into(), path.into());
        self
    }

    pub fn backend_for(&self, key: &str) -> Option<&str> {
        self.backends
            .get(key)
            .map(String::as_str)
            .filter(|path| !path.trim().is_empty())
    }
}
