//! 组件描述符
//!
//! [`ComponentDescriptor`] 是注册期静态构建的元数据：作用域、限定名、
//! 依赖槽位、配置值槽位、生命周期回调以及事件监听声明。容器的全部注入
//! 行为都由描述符驱动，运行期不枚举实例字段，也不推断泛型参数。

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::config::{PropertyValue, ValueKind};
use crate::error::{ContainerError, ContainerResult};
use crate::event::{Event, EventSubscription};
use crate::utils::naming;
use crate::{BeanInstance, Scope};

type ConstructorFn = Box<dyn Fn() -> ContainerResult<BeanInstance> + Send + Sync>;
type CapabilityCastFn =
    Box<dyn Fn(&BeanInstance) -> Option<Box<dyn Any + Send + Sync>> + Send + Sync>;
type AssignFn = Box<
    dyn Fn(&(dyn Any + Send + Sync), Box<dyn Any + Send + Sync>) -> ContainerResult<()>
        + Send
        + Sync,
>;
type ValueAssignFn =
    Box<dyn Fn(&(dyn Any + Send + Sync), PropertyValue) -> ContainerResult<()> + Send + Sync>;
type HookFn = Box<dyn Fn(&(dyn Any + Send + Sync)) -> ContainerResult<()> + Send + Sync>;
type SubscribeFn = Box<dyn Fn(&BeanInstance) -> ContainerResult<EventSubscription> + Send + Sync>;

/// 注入槽位的持有端
///
/// Bean 把待注入的依赖声明为 `Injected<T>` 字段。容器在装配阶段通过
/// 共享引用写入，因此单例之间的装配顺序无关紧要；构造函数内不可使用
/// 依赖，这是两阶段初始化的约束。
pub struct Injected<T: ?Sized> {
    slot: OnceLock<Arc<T>>,
}

impl<T: ?Sized> Injected<T> {
    /// 创建空槽位
    pub const fn new() -> Self {
        Self {
            slot: OnceLock::new(),
        }
    }

    /// 写入依赖（重复写入被忽略，装配只发生一次）
    pub fn inject(&self, value: Arc<T>) {
        let _ = self.slot.set(value);
    }

    /// 读取依赖
    pub fn get(&self) -> Option<&Arc<T>> {
        self.slot.get()
    }
}

impl<T: ?Sized + 'static> Injected<T> {
    /// 读取依赖，未装配时返回错误
    pub fn resolved(&self) -> ContainerResult<&Arc<T>> {
        self.slot
            .get()
            .ok_or_else(|| ContainerError::UnresolvedDependency {
                capability: naming::short_type_name(std::any::type_name::<T>()).to_string(),
            })
    }
}

impl<T: ?Sized> Default for Injected<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> fmt::Debug for Injected<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Injected")
            .field("wired", &self.slot.get().is_some())
            .finish()
    }
}

/// Bean 对外暴露的能力（自身类型或某个 trait）
///
/// `cast` 在注册期针对具体类型生成，把类型擦除后的实例安全地上转为
/// 能力对应的句柄，替代运行期的可赋值性检查。
pub struct Capability {
    id: TypeId,
    name: &'static str,
    cast: CapabilityCastFn,
}

impl Capability {
    /// 每个描述符都隐含的自身类型能力
    fn of_self<T: Any + Send + Sync>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: naming::short_type_name(std::any::type_name::<T>()),
            cast: Box::new(|instance: &BeanInstance| {
                let concrete = Arc::clone(instance).downcast::<T>().ok()?;
                Some(Box::new(concrete) as Box<dyn Any + Send + Sync>)
            }),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// 把实例上转为该能力的句柄（`Box` 内为 `Arc<C>`）
    pub fn cast(&self, instance: &BeanInstance) -> Option<Box<dyn Any + Send + Sync>> {
        (self.cast)(instance)
    }
}

impl fmt::Debug for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capability").field("name", &self.name).finish()
    }
}

/// 依赖槽位
///
/// 声明所需能力、可选的限定名约束以及写入目标字段的赋值闭包。
/// 装配时必须恰好解析到一个候选 Bean，否则容器初始化失败。
pub struct DependencySlot {
    capability: TypeId,
    capability_name: &'static str,
    qualifier: Option<String>,
    field: &'static str,
    assign: AssignFn,
}

impl DependencySlot {
    /// 创建依赖槽位
    ///
    /// `C` 是所需能力（具体类型或 `dyn Trait`），`T` 是持有槽位的 Bean，
    /// `assign` 把解析到的句柄写入目标字段。
    pub fn require<C, T, F>(field: &'static str, assign: F) -> Self
    where
        C: ?Sized + Send + Sync + 'static,
        T: Any + Send + Sync,
        F: Fn(&T, Arc<C>) + Send + Sync + 'static,
    {
        let target_name = naming::short_type_name(std::any::type_name::<T>());
        Self {
            capability: TypeId::of::<C>(),
            capability_name: naming::short_type_name(std::any::type_name::<C>()),
            qualifier: None,
            field,
            assign: Box::new(move |target, dependency| {
                let target = target
                    .downcast_ref::<T>()
                    .ok_or(ContainerError::TypeMismatch {
                        expected: target_name,
                    })?;
                let dependency = dependency.downcast::<Arc<C>>().map_err(|_| {
                    ContainerError::TypeMismatch {
                        expected: naming::short_type_name(std::any::type_name::<C>()),
                    }
                })?;
                assign(target, *dependency);
                Ok(())
            }),
        }
    }

    /// 附加限定名约束
    pub fn qualified(mut self, qualifier: impl Into<String>) -> Self {
        self.qualifier = Some(qualifier.into());
        self
    }

    pub fn capability(&self) -> TypeId {
        self.capability
    }

    pub fn capability_name(&self) -> &'static str {
        self.capability_name
    }

    pub fn qualifier(&self) -> Option<&str> {
        self.qualifier.as_deref()
    }

    pub fn field(&self) -> &'static str {
        self.field
    }

    /// 把已上转的依赖句柄写入目标实例
    pub fn assign(
        &self,
        target: &(dyn Any + Send + Sync),
        dependency: Box<dyn Any + Send + Sync>,
    ) -> ContainerResult<()> {
        (self.assign)(target, dependency)
    }
}

impl fmt::Debug for DependencySlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DependencySlot")
            .field("capability", &self.capability_name)
            .field("qualifier", &self.qualifier)
            .field("field", &self.field)
            .finish()
    }
}

/// 配置值槽位
pub struct ValueSlot {
    key: String,
    kind: ValueKind,
    field: &'static str,
    assign: ValueAssignFn,
}

impl ValueSlot {
    fn new<T, F>(key: impl Into<String>, kind: ValueKind, field: &'static str, assign: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&T, PropertyValue) + Send + Sync + 'static,
    {
        let target_name = naming::short_type_name(std::any::type_name::<T>());
        Self {
            key: key.into(),
            kind,
            field,
            assign: Box::new(move |target, value| {
                let target = target
                    .downcast_ref::<T>()
                    .ok_or(ContainerError::TypeMismatch {
                        expected: target_name,
                    })?;
                assign(target, value);
                Ok(())
            }),
        }
    }

    /// 字符串类型的配置值
    pub fn string<T, F>(key: impl Into<String>, field: &'static str, assign: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&T, String) + Send + Sync + 'static,
    {
        Self::new::<T, _>(key, ValueKind::String, field, move |target, value| {
            if let PropertyValue::String(v) = value {
                assign(target, v);
            }
        })
    }

    /// 整数类型的配置值
    pub fn int<T, F>(key: impl Into<String>, field: &'static str, assign: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&T, i64) + Send + Sync + 'static,
    {
        Self::new::<T, _>(key, ValueKind::Int, field, move |target, value| {
            if let PropertyValue::Int(v) = value {
                assign(target, v);
            }
        })
    }

    /// 布尔类型的配置值
    pub fn boolean<T, F>(key: impl Into<String>, field: &'static str, assign: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&T, bool) + Send + Sync + 'static,
    {
        Self::new::<T, _>(key, ValueKind::Bool, field, move |target, value| {
            if let PropertyValue::Bool(v) = value {
                assign(target, v);
            }
        })
    }

    /// 浮点类型的配置值
    pub fn double<T, F>(key: impl Into<String>, field: &'static str, assign: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&T, f64) + Send + Sync + 'static,
    {
        Self::new::<T, _>(key, ValueKind::Double, field, move |target, value| {
            if let PropertyValue::Double(v) = value {
                assign(target, v);
            }
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    pub fn field(&self) -> &'static str {
        self.field
    }

    /// 把转换后的配置值写入目标实例
    pub fn assign(
        &self,
        target: &(dyn Any + Send + Sync),
        value: PropertyValue,
    ) -> ContainerResult<()> {
        (self.assign)(target, value)
    }
}

impl fmt::Debug for ValueSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueSlot")
            .field("key", &self.key)
            .field("kind", &self.kind)
            .field("field", &self.field)
            .finish()
    }
}

/// 生命周期回调（类似 Spring 的 @PostConstruct / @PreDestroy）
pub struct LifecycleHook {
    name: String,
    invoke: HookFn,
}

impl LifecycleHook {
    pub fn new<T, F>(name: impl Into<String>, hook: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&T) -> ContainerResult<()> + Send + Sync + 'static,
    {
        let target_name = naming::short_type_name(std::any::type_name::<T>());
        Self {
            name: name.into(),
            invoke: Box::new(move |target| {
                let target = target
                    .downcast_ref::<T>()
                    .ok_or(ContainerError::TypeMismatch {
                        expected: target_name,
                    })?;
                hook(target)
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn invoke(&self, instance: &(dyn Any + Send + Sync)) -> ContainerResult<()> {
        (self.invoke)(instance)
    }
}

impl fmt::Debug for LifecycleHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleHook").field("name", &self.name).finish()
    }
}

/// 事件监听声明
///
/// 监听的事件类型在注册期显式声明为类型标签，发布时不做任何推断。
pub struct ListenerBinding {
    event_name: &'static str,
    subscribe: SubscribeFn,
}

impl ListenerBinding {
    pub fn event_name(&self) -> &'static str {
        self.event_name
    }

    /// 为具体的单例实例生成订阅
    pub fn subscribe(&self, instance: &BeanInstance) -> ContainerResult<EventSubscription> {
        (self.subscribe)(instance)
    }
}

impl fmt::Debug for ListenerBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerBinding")
            .field("event", &self.event_name)
            .finish()
    }
}

/// 组件描述符
///
/// 发现阶段构建一次，之后不可变。标识在目录内唯一，作用域在描述符
/// 生命周期内固定。
pub struct ComponentDescriptor {
    type_id: TypeId,
    type_name: &'static str,
    qualifier: String,
    scope: Scope,
    constructor: ConstructorFn,
    capabilities: Vec<Capability>,
    dependencies: Vec<DependencySlot>,
    values: Vec<ValueSlot>,
    post_construct: Vec<LifecycleHook>,
    pre_destroy: Vec<LifecycleHook>,
    listener: Option<ListenerBinding>,
}

impl ComponentDescriptor {
    /// 创建描述符
    ///
    /// 构造闭包只做默认构造，依赖此时尚未装配。
    pub fn new<T, F>(constructor: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn() -> ContainerResult<T> + Send + Sync + 'static,
    {
        let type_name = std::any::type_name::<T>();
        let short = naming::short_type_name(type_name);
        Self {
            type_id: TypeId::of::<T>(),
            type_name,
            qualifier: naming::to_camel_case(short),
            scope: Scope::default(),
            constructor: Box::new(move || {
                constructor()
                    .map(|bean| Arc::new(bean) as BeanInstance)
                    .map_err(|e| ContainerError::Instantiation {
                        type_name: short,
                        reason: e.to_string(),
                    })
            }),
            capabilities: vec![Capability::of_self::<T>()],
            dependencies: Vec::new(),
            values: Vec::new(),
            post_construct: Vec::new(),
            pre_destroy: Vec::new(),
            listener: None,
        }
    }

    /// 手工注册的 Bean 的描述符（实例由调用方提供，没有构造闭包）
    pub(crate) fn manual<T: Any + Send + Sync>() -> Self {
        let type_name = std::any::type_name::<T>();
        let short = naming::short_type_name(type_name);
        Self {
            type_id: TypeId::of::<T>(),
            type_name,
            qualifier: naming::to_camel_case(short),
            scope: Scope::default(),
            constructor: Box::new(move || {
                Err(ContainerError::Instantiation {
                    type_name: short,
                    reason: "manually registered bean has no constructor".to_string(),
                })
            }),
            capabilities: vec![Capability::of_self::<T>()],
            dependencies: Vec::new(),
            values: Vec::new(),
            post_construct: Vec::new(),
            pre_destroy: Vec::new(),
            listener: None,
        }
    }

    /// 设置作用域
    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    /// 设置限定名（默认是类型短名的 camelCase 形式）
    pub fn with_qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.qualifier = qualifier.into();
        self
    }

    /// 声明对外暴露的 trait 能力
    ///
    /// `cast` 在此处针对具体类型写出上转逻辑，例如
    /// `|svc: Arc<SmsMessageService>| -> Arc<dyn MessageSender> { svc }`。
    pub fn exposes<C, T, F>(mut self, cast: F) -> Self
    where
        C: ?Sized + Send + Sync + 'static,
        T: Any + Send + Sync,
        F: Fn(Arc<T>) -> Arc<C> + Send + Sync + 'static,
    {
        debug_assert_eq!(
            TypeId::of::<T>(),
            self.type_id,
            "capability cast must start from the descriptor's own type"
        );
        self.capabilities.push(Capability {
            id: TypeId::of::<C>(),
            name: naming::short_type_name(std::any::type_name::<C>()),
            cast: Box::new(move |instance: &BeanInstance| {
                let concrete = Arc::clone(instance).downcast::<T>().ok()?;
                Some(Box::new(cast(concrete)) as Box<dyn Any + Send + Sync>)
            }),
        });
        self
    }

    /// 追加依赖槽位（槽位顺序即声明顺序）
    pub fn with_dependency(mut self, slot: DependencySlot) -> Self {
        self.dependencies.push(slot);
        self
    }

    /// 追加配置值槽位
    pub fn with_value(mut self, slot: ValueSlot) -> Self {
        self.values.push(slot);
        self
    }

    /// 追加初始化回调
    pub fn on_post_construct<T, F>(mut self, name: impl Into<String>, hook: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&T) -> ContainerResult<()> + Send + Sync + 'static,
    {
        self.post_construct.push(LifecycleHook::new(name, hook));
        self
    }

    /// 追加销毁回调
    pub fn on_pre_destroy<T, F>(mut self, name: impl Into<String>, hook: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&T) -> ContainerResult<()> + Send + Sync + 'static,
    {
        self.pre_destroy.push(LifecycleHook::new(name, hook));
        self
    }

    /// 声明监听具体类型的事件
    pub fn listens<E, T, F>(mut self, handler: F) -> Self
    where
        E: Event,
        T: Any + Send + Sync,
        F: Fn(&T, &E) + Send + Sync + 'static,
    {
        let listener_name = naming::short_type_name(std::any::type_name::<T>());
        let event_name = naming::short_type_name(std::any::type_name::<E>());
        let handler = Arc::new(handler);
        self.listener = Some(ListenerBinding {
            event_name,
            subscribe: Box::new(move |instance: &BeanInstance| {
                let bean = Arc::clone(instance).downcast::<T>().map_err(|_| {
                    ContainerError::TypeMismatch {
                        expected: listener_name,
                    }
                })?;
                let handler = Arc::clone(&handler);
                Ok(EventSubscription::typed::<E, _>(
                    listener_name,
                    move |event| handler(&bean, event),
                ))
            }),
        });
        self
    }

    /// 声明监听全部事件（订阅事件根类型）
    pub fn listens_to_all<T, F>(mut self, handler: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&T, &dyn Event) + Send + Sync + 'static,
    {
        let listener_name = naming::short_type_name(std::any::type_name::<T>());
        let handler = Arc::new(handler);
        self.listener = Some(ListenerBinding {
            event_name: "Event",
            subscribe: Box::new(move |instance: &BeanInstance| {
                let bean = Arc::clone(instance).downcast::<T>().map_err(|_| {
                    ContainerError::TypeMismatch {
                        expected: listener_name,
                    }
                })?;
                let handler = Arc::clone(&handler);
                Ok(EventSubscription::broadcast(listener_name, move |event| {
                    handler(&bean, event)
                }))
            }),
        });
        self
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// 类型短名（去掉模块路径）
    pub fn short_name(&self) -> &'static str {
        naming::short_type_name(self.type_name)
    }

    pub fn qualifier(&self) -> &str {
        &self.qualifier
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn dependencies(&self) -> &[DependencySlot] {
        &self.dependencies
    }

    pub fn values(&self) -> &[ValueSlot] {
        &self.values
    }

    pub fn post_construct_hooks(&self) -> &[LifecycleHook] {
        &self.post_construct
    }

    pub fn pre_destroy_hooks(&self) -> &[LifecycleHook] {
        &self.pre_destroy
    }

    pub fn listener(&self) -> Option<&ListenerBinding> {
        self.listener.as_ref()
    }

    /// 查找对外暴露的能力
    pub fn capability(&self, id: TypeId) -> Option<&Capability> {
        self.capabilities.iter().find(|c| c.id == id)
    }

    /// 执行默认构造
    pub fn construct(&self) -> ContainerResult<BeanInstance> {
        (self.constructor)()
    }
}

impl fmt::Debug for ComponentDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentDescriptor")
            .field("type_name", &self.type_name)
            .field("qualifier", &self.qualifier)
            .field("scope", &self.scope)
            .field("dependencies", &self.dependencies)
            .field("values", &self.values)
            .finish()
    }
}
