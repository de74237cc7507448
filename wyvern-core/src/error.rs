//! 统一的错误处理类型
//!
//! 容器的所有可预期失败都归入 [`ContainerError`]。初始化阶段的任何失败都会被
//! 包装为 [`ContainerError::Initialization`] 向外传播，调用方拿不到
//! 半初始化的容器。

use crate::config::ValueKind;

/// 容器统一 Result 别名
pub type ContainerResult<T> = std::result::Result<T, ContainerError>;

/// 容器错误分类
#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    /// 元数据提供者无法定位命名空间
    #[error("namespace not found: `{namespace}`")]
    NamespaceNotFound { namespace: String },

    /// Bean 默认构造失败
    #[error("failed to instantiate bean `{type_name}`: {reason}")]
    Instantiation {
        type_name: &'static str,
        reason: String,
    },

    /// 依赖槽位没有匹配到任何候选 Bean
    #[error("no bean satisfies dependency on `{capability}`")]
    UnresolvedDependency { capability: String },

    /// 按类型查找不到已注册的 Bean
    #[error("no bean registered for type `{type_name}`")]
    UnresolvedBean { type_name: &'static str },

    /// 配置源中缺少必需的配置键
    #[error("missing required property `{key}`")]
    MissingProperty { key: String },

    /// 配置值无法按声明的类型转换
    #[error("cannot coerce `{value}` to {kind}")]
    UnsupportedType { kind: ValueKind, value: String },

    /// 必需的核心单例不存在
    #[error("required singleton `{type_name}` is not registered")]
    MissingRequiredSingleton { type_name: &'static str },

    /// 生命周期回调执行失败
    #[error("lifecycle hook `{hook}` failed: {reason}")]
    LifecycleInvocation { hook: String, reason: String },

    /// 重复注册同一标识的 Bean
    #[error("bean `{name}` is already registered")]
    BeanAlreadyExists { name: String },

    /// 类型擦除后的实例与期望类型不一致
    #[error("bean type mismatch, expected `{expected}`")]
    TypeMismatch { expected: &'static str },

    /// 容器已关闭（或正在关闭），不再接受任何操作
    #[error("container is closed")]
    ContainerClosed,

    /// 初始化阶段的失败，包装根因
    #[error("container initialization failed: {0}")]
    Initialization(#[source] Box<ContainerError>),
}

impl ContainerError {
    /// 将初始化阶段产生的错误包装为 [`ContainerError::Initialization`]
    pub(crate) fn during_initialization(self) -> Self {
        match self {
            // 已经包装过的不再嵌套
            ContainerError::Initialization(_) => self,
            other => ContainerError::Initialization(Box::new(other)),
        }
    }

    /// 初始化错误的根因（非初始化错误返回自身）
    pub fn root_cause(&self) -> &ContainerError {
        match self {
            ContainerError::Initialization(inner) => inner.root_cause(),
            other => other,
        }
    }
}
