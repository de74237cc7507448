//! 配置源与配置值解析
//!
//! 类似 Spring Boot 的 Environment：配置以扁平的字符串键值对暴露，
//! 精确匹配键名，不做层级展开。声明式的配置值槽位按四种基础类型之一
//! 进行转换后注入。

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;
use parking_lot::RwLock;

use crate::descriptor::ComponentDescriptor;
use crate::error::{ContainerError, ContainerResult};
use crate::BeanInstance;

/// 配置值声明的基础类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    String,
    Int,
    Bool,
    Double,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::String => write!(f, "string"),
            ValueKind::Int => write!(f, "integer"),
            ValueKind::Bool => write!(f, "boolean"),
            ValueKind::Double => write!(f, "double"),
        }
    }
}

/// 转换后的配置值
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    String(String),
    Int(i64),
    Bool(bool),
    Double(f64),
}

impl ValueKind {
    /// 将原始字符串按声明类型转换
    ///
    /// 布尔值沿用 `Boolean.parseBoolean` 的语义：忽略大小写等于 "true"
    /// 时为 true，其余一律为 false。
    pub fn coerce(self, raw: &str) -> ContainerResult<PropertyValue> {
        match self {
            ValueKind::String => Ok(PropertyValue::String(raw.to_string())),
            ValueKind::Int => raw
                .parse::<i64>()
                .map(PropertyValue::Int)
                .map_err(|_| ContainerError::UnsupportedType {
                    kind: self,
                    value: raw.to_string(),
                }),
            ValueKind::Double => raw
                .parse::<f64>()
                .map(PropertyValue::Double)
                .map_err(|_| ContainerError::UnsupportedType {
                    kind: self,
                    value: raw.to_string(),
                }),
            ValueKind::Bool => Ok(PropertyValue::Bool(raw.eq_ignore_ascii_case("true"))),
        }
    }
}

/// 配置源 trait
pub trait PropertySource: Send + Sync {
    /// 获取配置源名称
    fn name(&self) -> &str;

    /// 获取配置值
    fn get(&self, key: &str) -> Option<String>;

    /// 获取所有配置键
    fn keys(&self) -> Vec<String>;

    /// 配置源优先级（数字越大优先级越高）
    fn priority(&self) -> i32 {
        0
    }
}

/// Environment - 配置管理器
///
/// 聚合多个配置源，按优先级查找，键名精确匹配。
pub struct Environment {
    /// 配置源列表（按优先级排序）
    sources: RwLock<Vec<Box<dyn PropertySource>>>,
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("sources_count", &self.sources.read().len())
            .finish()
    }
}

impl Environment {
    /// 创建空的环境
    pub fn new() -> Self {
        Self {
            sources: RwLock::new(Vec::new()),
        }
    }

    /// 添加配置源
    pub fn add_property_source(&self, source: Box<dyn PropertySource>) {
        let mut sources = self.sources.write();
        sources.push(source);
        // 按优先级降序排序
        sources.sort_by(|a, b| b.priority().cmp(&a.priority()));
    }

    /// 获取配置值
    pub fn get(&self, key: &str) -> Option<String> {
        let sources = self.sources.read();
        for source in sources.iter() {
            if let Some(value) = source.get(key) {
                tracing::debug!("Property '{}' found in source '{}'", key, source.name());
                return Some(value);
            }
        }
        tracing::debug!("Property '{}' not found in any source", key);
        None
    }

    /// 是否包含指定键
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// 配置源数量
    pub fn source_count(&self) -> usize {
        self.sources.read().len()
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

// ========== Property Sources ==========

/// 内存配置源（用于测试或运行时配置）
pub struct MapPropertySource {
    name: String,
    properties: HashMap<String, String>,
    priority: i32,
}

impl MapPropertySource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: HashMap::new(),
            priority: 50,
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

impl PropertySource for MapPropertySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self, key: &str) -> Option<String> {
        self.properties.get(key).cloned()
    }

    fn keys(&self) -> Vec<String> {
        self.properties.keys().cloned().collect()
    }

    fn priority(&self) -> i32 {
        self.priority
    }
}

/// `.properties` 文本配置源
///
/// 解析扁平的 `key=value` 文本：`#` 和 `!` 开头的行是注释，
/// 分隔符支持 `=` 和 `:`，键值两端的空白会被去掉。
pub struct PropertiesPropertySource {
    name: String,
    properties: HashMap<String, String>,
    priority: i32,
}

impl PropertiesPropertySource {
    /// 从文件加载配置
    pub fn from_file(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        Ok(Self::from_str(&content, path.to_string_lossy().to_string()))
    }

    /// 从字符串解析配置
    pub fn from_str(content: &str, name: String) -> Self {
        Self {
            name,
            properties: parse_properties(content),
            priority: 0,
        }
    }

    /// 设置优先级
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

impl PropertySource for PropertiesPropertySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self, key: &str) -> Option<String> {
        self.properties.get(key).cloned()
    }

    fn keys(&self) -> Vec<String> {
        self.properties.keys().cloned().collect()
    }

    fn priority(&self) -> i32 {
        self.priority
    }
}

/// 解析 `.properties` 格式文本为键值对
pub(crate) fn parse_properties(content: &str) -> HashMap<String, String> {
    let mut properties = HashMap::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
            continue;
        }
        let Some(sep) = line.find(|c| c == '=' || c == ':') else {
            // 没有分隔符的行按空值键处理
            properties.insert(line.to_string(), String::new());
            continue;
        };
        let key = line[..sep].trim();
        let value = line[sep + 1..].trim();
        if !key.is_empty() {
            properties.insert(key.to_string(), value.to_string());
        }
    }
    properties
}

// ========== Property Resolver ==========

/// 为单个 Bean 实例注入全部配置值槽位
///
/// 键不存在直接失败，不回退默认值。
pub fn inject_values(
    environment: &Environment,
    descriptor: &ComponentDescriptor,
    instance: &BeanInstance,
) -> ContainerResult<()> {
    for slot in descriptor.values() {
        let raw = environment
            .get(slot.key())
            .ok_or_else(|| ContainerError::MissingProperty {
                key: slot.key().to_string(),
            })?;
        let value = slot.kind().coerce(&raw)?;
        slot.assign(instance.as_ref(), value)?;
        tracing::debug!(
            "Injected property '{}' into {}.{}",
            slot.key(),
            descriptor.short_name(),
            slot.field()
        );
    }
    Ok(())
}
