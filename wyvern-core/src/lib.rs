// wyvern-core: 类似 Spring 的轻量级控制反转容器
//
// 提供类型安全的依赖注入功能，支持：
// - 单例和原型作用域
// - 基于描述符元数据的 setter 注入（带限定名消歧）
// - 声明式配置值绑定
// - 生命周期管理（post-construct / pre-destroy 回调）
// - 自动订阅的事件总线

use std::any::Any;
use std::sync::Arc;

pub mod catalog;
pub mod config;
pub mod constants;
pub mod context;
pub mod descriptor;
pub mod error;
pub mod event;
pub mod lifecycle;
pub mod logging;
pub mod registry;
pub mod resolver;
pub mod scope;
pub mod utils;

/// 类型擦除后的 Bean 实例
pub type BeanInstance = Arc<dyn Any + Send + Sync>;

// 重新导出常用类型
pub use catalog::{DescriptorCatalog, DescriptorFactory, MetadataProvider, StaticMetadataProvider};
pub use config::{
    Environment, MapPropertySource, PropertiesPropertySource, PropertySource, PropertyValue,
    ValueKind,
};
pub use context::{ApplicationContext, ApplicationContextBuilder, ContainerState};
pub use descriptor::{
    Capability, ComponentDescriptor, DependencySlot, Injected, LifecycleHook, ListenerBinding,
    ValueSlot,
};
pub use error::{ContainerError, ContainerResult};
pub use event::{Event, EventBus, EventSubscription};
pub use lifecycle::{HookFailure, ShutdownReport};
pub use logging::{LogFormat, LogLevel, LoggingConfig};
pub use registry::{BeanEntry, BeanRegistry};
pub use scope::Scope;

/// Prelude 模块，包含常用的 traits 和类型
pub mod prelude {
    pub use crate::catalog::{MetadataProvider, StaticMetadataProvider};
    pub use crate::config::{Environment, MapPropertySource, PropertiesPropertySource, PropertySource};
    pub use crate::context::{ApplicationContext, ContainerState};
    pub use crate::descriptor::{ComponentDescriptor, DependencySlot, Injected, ValueSlot};
    pub use crate::error::{ContainerError, ContainerResult};
    pub use crate::event::{Event, EventBus, EventSubscription};
    pub use crate::logging::{LogFormat, LogLevel, LoggingConfig};
    pub use crate::scope::Scope;
    pub use crate::BeanInstance;
}
