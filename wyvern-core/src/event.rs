//! 事件总线
//!
//! 类似 Spring 的 ApplicationEventPublisher / ApplicationEventMulticaster。
//! 订阅在创建时显式声明事件类型（具体类型的 `TypeId`，或事件根类型），
//! 发布时按运行期类型精确匹配，按订阅顺序同步派发。

use std::any::{Any, TypeId};
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use parking_lot::RwLock;

/// 事件 trait - 所有事件都必须实现此 trait
pub trait Event: Any + Send + Sync {
    /// 获取事件名称（用于日志）
    fn event_name(&self) -> &str;

    /// 转换为 Any 引用，用于类型匹配
    fn as_any(&self) -> &dyn Any;
}

type DeliverFn = Box<dyn Fn(&dyn Event) + Send + Sync>;

/// 一条订阅：监听器实例与其声明的事件类型
///
/// 单例初始化时为每个暴露监听能力的 Bean 创建一次。
pub struct EventSubscription {
    listener_name: String,
    /// 声明的事件类型；`None` 表示订阅事件根类型，接收全部事件
    event_type: Option<TypeId>,
    deliver: DeliverFn,
}

impl EventSubscription {
    /// 订阅具体类型的事件
    pub fn typed<E, F>(listener_name: impl Into<String>, handler: F) -> Self
    where
        E: Event,
        F: Fn(&E) + Send + Sync + 'static,
    {
        Self {
            listener_name: listener_name.into(),
            event_type: Some(TypeId::of::<E>()),
            deliver: Box::new(move |event: &dyn Event| {
                if let Some(typed) = event.as_any().downcast_ref::<E>() {
                    handler(typed);
                }
            }),
        }
    }

    /// 订阅事件根类型（接收全部事件）
    pub fn broadcast<F>(listener_name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&dyn Event) + Send + Sync + 'static,
    {
        Self {
            listener_name: listener_name.into(),
            event_type: None,
            deliver: Box::new(handler),
        }
    }

    pub fn listener_name(&self) -> &str {
        &self.listener_name
    }

    pub fn event_type(&self) -> Option<TypeId> {
        self.event_type
    }

    /// 声明类型是否覆盖该事件的运行期类型
    fn matches(&self, event: &dyn Event) -> bool {
        match self.event_type {
            Some(declared) => declared == event.as_any().type_id(),
            None => true,
        }
    }
}

impl fmt::Debug for EventSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSubscription")
            .field("listener", &self.listener_name)
            .field("broadcast", &self.event_type.is_none())
            .finish()
    }
}

/// 事件总线
///
/// 容器的必需单例，以普通 Bean 的身份注册，发布入口只通过持有它的
/// Bean 到达。派发是同步的，单个监听器的失败不会中断后续派发。
pub struct EventBus {
    subscriptions: RwLock<Vec<Arc<EventSubscription>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            subscriptions: RwLock::new(Vec::new()),
        }
    }

    /// 记录一条订阅（派发顺序即订阅顺序）
    pub fn subscribe(&self, subscription: EventSubscription) {
        let mut subscriptions = self.subscriptions.write();
        tracing::debug!(
            "Registered event listener '{}' ({})",
            subscription.listener_name,
            if subscription.event_type.is_some() {
                "typed"
            } else {
                "broadcast"
            }
        );
        subscriptions.push(Arc::new(subscription));
    }

    /// 发布事件
    ///
    /// 对声明类型与事件运行期类型一致的订阅（以及根类型订阅）逐个派发。
    pub fn publish(&self, event: &dyn Event) {
        // 克隆订阅列表，避免派发期间持锁
        let subscriptions: Vec<_> = self
            .subscriptions
            .read()
            .iter()
            .filter(|s| s.matches(event))
            .map(Arc::clone)
            .collect();

        tracing::debug!(
            "Publishing event '{}' to {} listener(s)",
            event.event_name(),
            subscriptions.len()
        );

        for subscription in subscriptions {
            if let Err(panic) = catch_unwind(AssertUnwindSafe(|| {
                (subscription.deliver)(event);
            })) {
                tracing::error!(
                    "Listener '{}' panicked while handling event '{}': {:?}",
                    subscription.listener_name,
                    event.event_name(),
                    panic
                );
            }
        }
    }

    /// 订阅数量
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.read().len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriptions", &self.subscription_count())
            .finish()
    }
}
