//! 应用上下文
//!
//! [`ApplicationContext`] 把目录、注册表、解析器、配置解析、生命周期
//! 和事件总线串成一个初始化协议，并暴露查找与注册接口。
//!
//! 状态机：Uninitialized → Initializing → Ready → ShuttingDown → Closed。
//! 初始化阶段的任何失败都会整体中止，调用方永远拿不到半初始化的容器。

use std::any::{Any, TypeId};
use std::path::PathBuf;
use std::sync::Arc;
use parking_lot::RwLock;

use crate::catalog::{DescriptorCatalog, MetadataProvider};
use crate::config::{self, Environment, PropertiesPropertySource, PropertySource};
use crate::constants;
use crate::error::{ContainerError, ContainerResult};
use crate::event::EventBus;
use crate::lifecycle::{self, ShutdownReport};
use crate::registry::BeanRegistry;
use crate::resolver;
use crate::utils::naming;

/// 容器状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerState {
    Uninitialized,
    Initializing,
    Ready,
    ShuttingDown,
    Closed,
}

/// 应用上下文
pub struct ApplicationContext {
    registry: RwLock<BeanRegistry>,
    environment: Arc<Environment>,
    state: RwLock<ContainerState>,
}

impl ApplicationContext {
    /// 创建上下文构建器
    pub fn builder(
        provider: Arc<dyn MetadataProvider>,
        namespace: impl Into<String>,
    ) -> ApplicationContextBuilder {
        ApplicationContextBuilder::new(provider, namespace)
    }

    /// 当前状态
    pub fn state(&self) -> ContainerState {
        *self.state.read()
    }

    /// 获取 Environment
    pub fn environment(&self) -> &Arc<Environment> {
        &self.environment
    }

    fn ensure_ready(&self) -> ContainerResult<()> {
        match *self.state.read() {
            ContainerState::Ready => Ok(()),
            _ => Err(ContainerError::ContainerClosed),
        }
    }

    /// 通过类型获取 Bean
    ///
    /// 单例是一次直接查找，查不到即报错，绝不静默返回空值。原型每次
    /// 调用都构造新实例：只对当前已注册的单例装配，随后执行该实例
    /// 自己的初始化回调，所有权交给调用方。
    pub fn get_bean<T: Any + Send + Sync>(&self) -> ContainerResult<Arc<T>> {
        self.ensure_ready()?;
        let type_name = naming::short_type_name(std::any::type_name::<T>());

        let registry = self.registry.read();
        let entry = registry
            .entry(TypeId::of::<T>())
            .ok_or(ContainerError::UnresolvedBean { type_name })?;

        if let Some(instance) = entry.instance() {
            return Arc::clone(instance)
                .downcast::<T>()
                .map_err(|_| ContainerError::TypeMismatch {
                    expected: type_name,
                });
        }

        // 原型路径
        let descriptor = entry.descriptor();
        tracing::debug!("Creating new instance of prototype bean '{}'", type_name);
        let instance = descriptor.construct()?;
        resolver::inject_dependencies(registry.entries(), descriptor, &instance)?;
        config::inject_values(&self.environment, descriptor, &instance)?;
        lifecycle::run_post_construct_for(descriptor, &instance)?;

        instance
            .downcast::<T>()
            .map_err(|_| ContainerError::TypeMismatch {
                expected: type_name,
            })
    }

    /// 注册（或覆盖）一个 Bean 实例
    ///
    /// 绕过发现流程的无条件覆盖，对后续查找立即生效。
    pub fn register_bean<T: Any + Send + Sync>(&self, instance: T) -> ContainerResult<()> {
        self.ensure_ready()?;
        self.registry.write().override_instance(Arc::new(instance));
        Ok(())
    }

    /// 是否包含指定类型的 Bean
    pub fn contains_bean<T: Any + Send + Sync>(&self) -> bool {
        self.ensure_ready().is_ok() && self.registry.read().entry(TypeId::of::<T>()).is_some()
    }

    /// 已注册的 Bean 数量
    pub fn bean_count(&self) -> usize {
        self.registry.read().len()
    }

    /// 关闭容器
    ///
    /// 按注册逆序执行销毁回调（失败收集进报告，不中断），然后丢弃
    /// 全部状态。关闭后的容器不再接受任何操作。
    pub fn shutdown(&self) -> ContainerResult<ShutdownReport> {
        {
            let mut state = self.state.write();
            match *state {
                ContainerState::Ready => *state = ContainerState::ShuttingDown,
                _ => return Err(ContainerError::ContainerClosed),
            }
        }

        tracing::info!("Shutting down application context");
        let report = {
            let registry = self.registry.read();
            lifecycle::run_pre_destroy(registry.entries())
        };

        self.registry.write().clear();
        *self.state.write() = ContainerState::Closed;
        tracing::info!(
            "Application context closed ({} pre-destroy failure(s))",
            report.failures().len()
        );
        Ok(report)
    }
}

impl std::fmt::Debug for ApplicationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApplicationContext")
            .field("state", &self.state())
            .field("beans", &self.bean_count())
            .finish()
    }
}

/// 应用上下文构建器
pub struct ApplicationContextBuilder {
    provider: Arc<dyn MetadataProvider>,
    namespace: String,
    property_sources: Vec<Box<dyn PropertySource>>,
    properties_file: Option<PathBuf>,
}

impl ApplicationContextBuilder {
    pub fn new(provider: Arc<dyn MetadataProvider>, namespace: impl Into<String>) -> Self {
        Self {
            provider,
            namespace: namespace.into(),
            property_sources: Vec::new(),
            properties_file: Some(PathBuf::from(constants::DEFAULT_PROPERTIES_RESOURCE)),
        }
    }

    /// 添加配置源
    pub fn add_property_source(mut self, source: Box<dyn PropertySource>) -> Self {
        self.property_sources.push(source);
        self
    }

    /// 设置配置资源文件路径（默认 `application.properties`）
    pub fn properties_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.properties_file = Some(path.into());
        self
    }

    /// 不加载配置资源文件
    pub fn without_properties_file(mut self) -> Self {
        self.properties_file = None;
        self
    }

    /// 构建上下文
    ///
    /// 执行完整的初始化协议；任何失败都包装为初始化错误返回，
    /// 不会产生可用的容器。
    pub fn build(self) -> ContainerResult<ApplicationContext> {
        self.try_build()
            .map_err(ContainerError::during_initialization)
    }

    fn try_build(self) -> ContainerResult<ApplicationContext> {
        tracing::info!(
            "Initializing application context for namespace '{}'",
            self.namespace
        );

        // 发现组件并合并自动配置清单
        let mut catalog = DescriptorCatalog::discover(self.provider.as_ref(), &self.namespace)?;
        catalog.merge_auto_configuration(self.provider.as_ref());

        // 第一阶段：裸构造全部单例，原型只登记
        let mut registry = BeanRegistry::new();
        for descriptor in catalog.into_descriptors() {
            registry.register(descriptor)?;
        }

        // 加载配置源（资源文件缺失是空配置，不是错误）
        let environment = Environment::new();
        if let Some(path) = &self.properties_file {
            match PropertiesPropertySource::from_file(path) {
                Ok(source) => {
                    tracing::info!("Loaded properties from {:?}", path);
                    environment.add_property_source(Box::new(source));
                }
                Err(e) => {
                    tracing::debug!("Could not load properties from {:?}: {}", path, e);
                }
            }
        }
        for source in self.property_sources {
            environment.add_property_source(source);
        }

        // 第二阶段：对每个单例装配依赖与配置值
        for entry in registry.entries() {
            if let Some(instance) = entry.instance() {
                resolver::inject_dependencies(registry.entries(), entry.descriptor(), instance)?;
                config::inject_values(&environment, entry.descriptor(), instance)?;
            }
        }

        // 初始化回调（升序）
        lifecycle::run_post_construct(registry.entries())?;

        // 事件总线是必需单例
        let bus = registry
            .get_instance(TypeId::of::<EventBus>())
            .ok_or(ContainerError::MissingRequiredSingleton {
                type_name: "EventBus",
            })?
            .downcast::<EventBus>()
            .map_err(|_| ContainerError::TypeMismatch {
                expected: "EventBus",
            })?;

        // 自动订阅所有暴露监听能力的单例
        for entry in registry.entries() {
            if let (Some(instance), Some(binding)) =
                (entry.instance(), entry.descriptor().listener())
            {
                bus.subscribe(binding.subscribe(instance)?);
                tracing::info!("Registered listener: {}", entry.descriptor().short_name());
            }
        }

        tracing::info!("Application context ready, {} bean(s)", registry.len());
        Ok(ApplicationContext {
            registry: RwLock::new(registry),
            environment: Arc::new(environment),
            state: RwLock::new(ContainerState::Ready),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::StaticMetadataProvider;
    use crate::config::MapPropertySource;
    use crate::descriptor::{ComponentDescriptor, DependencySlot, Injected, ValueSlot};
    use crate::event::Event;
    use crate::Scope;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::{Mutex, OnceLock};

    // ==================== 测试组件 ====================

    struct MessageService;

    trait MessageSender: Send + Sync {
        fn label(&self) -> &'static str;
    }

    struct EmailMessageService;

    impl MessageSender for EmailMessageService {
        fn label(&self) -> &'static str {
            "email"
        }
    }

    struct SmsMessageService;

    impl MessageSender for SmsMessageService {
        fn label(&self) -> &'static str {
            "sms"
        }
    }

    #[derive(Default)]
    struct NotificationService {
        sender: Injected<dyn MessageSender>,
    }

    #[derive(Default)]
    struct RequestScopedBean {
        counter: AtomicU64,
    }

    impl RequestScopedBean {
        fn touch(&self) -> u64 {
            self.counter.fetch_add(1, Ordering::SeqCst) + 1
        }
    }

    #[derive(Default, Debug)]
    struct ConfigPrinterService {
        app_name: OnceLock<String>,
        author: OnceLock<String>,
    }

    struct UserRegistered {
        username: String,
    }

    impl Event for UserRegistered {
        fn event_name(&self) -> &str {
            "UserRegistered"
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    struct OrderShipped;

    impl Event for OrderShipped {
        fn event_name(&self) -> &str {
            "OrderShipped"
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[derive(Default)]
    struct RegistrationService {
        events: Injected<EventBus>,
    }

    impl RegistrationService {
        fn register(&self, username: &str) -> ContainerResult<()> {
            self.events.resolved()?.publish(&UserRegistered {
                username: username.to_string(),
            });
            Ok(())
        }
    }

    #[derive(Default)]
    struct WelcomeEmailListener {
        received: Mutex<Vec<String>>,
    }

    #[derive(Default)]
    struct ShipmentListener {
        received: Mutex<Vec<&'static str>>,
    }

    // ==================== 描述符工厂 ====================

    fn event_bus() -> ComponentDescriptor {
        ComponentDescriptor::new(|| Ok(EventBus::new()))
    }

    fn message_service() -> ComponentDescriptor {
        ComponentDescriptor::new(|| Ok(MessageService))
    }

    fn email_sender() -> ComponentDescriptor {
        ComponentDescriptor::new(|| Ok(EmailMessageService))
            .with_qualifier("email")
            .exposes(|svc: Arc<EmailMessageService>| -> Arc<dyn MessageSender> { svc })
    }

    fn sms_sender() -> ComponentDescriptor {
        ComponentDescriptor::new(|| Ok(SmsMessageService))
            .with_qualifier("sms")
            .exposes(|svc: Arc<SmsMessageService>| -> Arc<dyn MessageSender> { svc })
    }

    fn notification_service() -> ComponentDescriptor {
        ComponentDescriptor::new(|| Ok(NotificationService::default())).with_dependency(
            DependencySlot::require(
                "sender",
                |svc: &NotificationService, dep: Arc<dyn MessageSender>| svc.sender.inject(dep),
            )
            .qualified("sms"),
        )
    }

    fn request_scoped_bean() -> ComponentDescriptor {
        ComponentDescriptor::new(|| Ok(RequestScopedBean::default()))
            .with_scope(Scope::Prototype)
    }

    fn config_printer() -> ComponentDescriptor {
        ComponentDescriptor::new(|| Ok(ConfigPrinterService::default()))
            .with_value(ValueSlot::string(
                "app.name",
                "app_name",
                |svc: &ConfigPrinterService, value| {
                    let _ = svc.app_name.set(value);
                },
            ))
            .with_value(ValueSlot::string(
                "app.author",
                "author",
                |svc: &ConfigPrinterService, value| {
                    let _ = svc.author.set(value);
                },
            ))
    }

    fn registration_service() -> ComponentDescriptor {
        ComponentDescriptor::new(|| Ok(RegistrationService::default())).with_dependency(
            DependencySlot::require("events", |svc: &RegistrationService, dep: Arc<EventBus>| {
                svc.events.inject(dep)
            }),
        )
    }

    fn welcome_listener() -> ComponentDescriptor {
        ComponentDescriptor::new(|| Ok(WelcomeEmailListener::default())).listens(
            |listener: &WelcomeEmailListener, event: &UserRegistered| {
                listener.received.lock().unwrap().push(event.username.clone());
            },
        )
    }

    fn shipment_listener() -> ComponentDescriptor {
        ComponentDescriptor::new(|| Ok(ShipmentListener::default())).listens(
            |listener: &ShipmentListener, _event: &OrderShipped| {
                listener.received.lock().unwrap().push("shipped");
            },
        )
    }

    const NAMESPACE: &str = "wyvern.testapp";

    fn demo_provider() -> Arc<StaticMetadataProvider> {
        Arc::new(StaticMetadataProvider::new().with_namespace(
            NAMESPACE,
            vec![
                event_bus,
                message_service,
                email_sender,
                sms_sender,
                notification_service,
                request_scoped_bean,
                registration_service,
                welcome_listener,
                shipment_listener,
            ],
        ))
    }

    fn demo_context() -> ApplicationContext {
        ApplicationContext::builder(demo_provider(), NAMESPACE)
            .without_properties_file()
            .build()
            .unwrap()
    }

    // ==================== 场景测试 ====================

    #[test]
    fn test_singleton_lookups_return_the_same_instance() {
        let context = demo_context();
        let first = context.get_bean::<MessageService>().unwrap();
        let second = context.get_bean::<MessageService>().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_prototype_lookups_return_distinct_independent_instances() {
        let context = demo_context();
        let first = context.get_bean::<RequestScopedBean>().unwrap();
        let second = context.get_bean::<RequestScopedBean>().unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(first.touch(), 1);
        assert_eq!(first.touch(), 2);
        // 另一实例的状态不受影响
        assert_eq!(second.touch(), 1);
    }

    #[test]
    fn test_qualified_dependency_binds_the_matching_sender_only() {
        let context = demo_context();
        let service = context.get_bean::<NotificationService>().unwrap();
        assert_eq!(service.sender.resolved().unwrap().label(), "sms");
    }

    #[test]
    fn test_missing_property_aborts_initialization_entirely() {
        let provider = Arc::new(StaticMetadataProvider::new().with_namespace(
            NAMESPACE,
            vec![event_bus, config_printer],
        ));
        let result = ApplicationContext::builder(provider, NAMESPACE)
            .without_properties_file()
            .add_property_source(Box::new(
                MapPropertySource::new("test").with_property("app.name", "Wyvern Demo"),
            ))
            .build();

        let err = result.unwrap_err();
        match err.root_cause() {
            ContainerError::MissingProperty { key } => assert_eq!(key, "app.author"),
            other => panic!("expected MissingProperty, got {other:?}"),
        }
        assert!(matches!(err, ContainerError::Initialization(_)));
    }

    #[test]
    fn test_properties_are_coerced_and_injected() {
        let provider = Arc::new(StaticMetadataProvider::new().with_namespace(
            NAMESPACE,
            vec![event_bus, config_printer],
        ));
        let context = ApplicationContext::builder(provider, NAMESPACE)
            .without_properties_file()
            .add_property_source(Box::new(
                MapPropertySource::new("test")
                    .with_property("app.name", "Wyvern Demo")
                    .with_property("app.author", "icaro"),
            ))
            .build()
            .unwrap();

        let printer = context.get_bean::<ConfigPrinterService>().unwrap();
        assert_eq!(printer.app_name.get().map(String::as_str), Some("Wyvern Demo"));
        assert_eq!(printer.author.get().map(String::as_str), Some("icaro"));
    }

    #[test]
    fn test_published_event_reaches_declared_listener_exactly_once() {
        let context = demo_context();
        let registration = context.get_bean::<RegistrationService>().unwrap();
        registration.register("icaro.dev").unwrap();

        let welcome = context.get_bean::<WelcomeEmailListener>().unwrap();
        assert_eq!(*welcome.received.lock().unwrap(), vec!["icaro.dev".to_string()]);

        // 订阅了无关事件类型的监听器收不到任何东西
        let shipment = context.get_bean::<ShipmentListener>().unwrap();
        assert!(shipment.received.lock().unwrap().is_empty());
    }

    #[test]
    fn test_missing_event_bus_fails_initialization() {
        let provider = Arc::new(
            StaticMetadataProvider::new().with_namespace(NAMESPACE, vec![message_service]),
        );
        let err = ApplicationContext::builder(provider, NAMESPACE)
            .without_properties_file()
            .build()
            .unwrap_err();
        assert!(matches!(
            err.root_cause(),
            ContainerError::MissingRequiredSingleton {
                type_name: "EventBus"
            }
        ));
    }

    #[test]
    fn test_unknown_namespace_fails_initialization() {
        let err = ApplicationContext::builder(demo_provider(), "wyvern.missing")
            .without_properties_file()
            .build()
            .unwrap_err();
        assert!(matches!(
            err.root_cause(),
            ContainerError::NamespaceNotFound { .. }
        ));
    }

    #[test]
    fn test_unresolved_singleton_lookup_is_fail_fast() {
        let context = demo_context();
        let err = context.get_bean::<ConfigPrinterService>().unwrap_err();
        assert!(matches!(err, ContainerError::UnresolvedBean { .. }));
    }

    #[test]
    fn test_register_bean_overrides_subsequent_lookups() {
        let context = demo_context();
        let original = context.get_bean::<MessageService>().unwrap();

        context.register_bean(MessageService).unwrap();
        let replaced = context.get_bean::<MessageService>().unwrap();
        assert!(!Arc::ptr_eq(&original, &replaced));

        // 未经过发现流程的类型也可以直接注册
        struct SimpleFormatter;
        context.register_bean(SimpleFormatter).unwrap();
        assert!(context.contains_bean::<SimpleFormatter>());
    }

    #[test]
    fn test_unqualified_dependency_on_prototype_wires_against_singletons() {
        #[derive(Default)]
        struct AuditBean {
            sender: Injected<dyn MessageSender>,
        }

        fn audit_bean() -> ComponentDescriptor {
            ComponentDescriptor::new(|| Ok(AuditBean::default()))
                .with_scope(Scope::Prototype)
                .with_dependency(DependencySlot::require(
                    "sender",
                    |bean: &AuditBean, dep: Arc<dyn MessageSender>| bean.sender.inject(dep),
                ))
        }

        let provider = Arc::new(StaticMetadataProvider::new().with_namespace(
            NAMESPACE,
            vec![event_bus, email_sender, sms_sender, audit_bean],
        ));
        let context = ApplicationContext::builder(provider, NAMESPACE)
            .without_properties_file()
            .build()
            .unwrap();

        // 无限定名时取注册顺序靠前的候选
        let bean = context.get_bean::<AuditBean>().unwrap();
        assert_eq!(bean.sender.resolved().unwrap().label(), "email");
    }

    #[test]
    fn test_prototype_post_construct_runs_per_instance() {
        #[derive(Default)]
        struct CountingBean {
            initialized: AtomicU64,
        }

        fn counting_bean() -> ComponentDescriptor {
            ComponentDescriptor::new(|| Ok(CountingBean::default()))
                .with_scope(Scope::Prototype)
                .on_post_construct("init", |bean: &CountingBean| {
                    bean.initialized.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
        }

        let provider = Arc::new(StaticMetadataProvider::new().with_namespace(
            NAMESPACE,
            vec![event_bus, counting_bean],
        ));
        let context = ApplicationContext::builder(provider, NAMESPACE)
            .without_properties_file()
            .build()
            .unwrap();

        let first = context.get_bean::<CountingBean>().unwrap();
        let second = context.get_bean::<CountingBean>().unwrap();
        assert_eq!(first.initialized.load(Ordering::SeqCst), 1);
        assert_eq!(second.initialized.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_shutdown_rejects_further_operations() {
        let context = demo_context();
        let report = context.shutdown().unwrap();
        assert!(report.is_clean());
        assert_eq!(context.state(), ContainerState::Closed);

        assert!(matches!(
            context.get_bean::<MessageService>(),
            Err(ContainerError::ContainerClosed)
        ));
        assert!(matches!(
            context.register_bean(MessageService),
            Err(ContainerError::ContainerClosed)
        ));
        assert!(matches!(
            context.shutdown(),
            Err(ContainerError::ContainerClosed)
        ));
        assert!(!context.contains_bean::<MessageService>());
    }

    #[test]
    fn test_shutdown_collects_pre_destroy_failures() {
        struct Fragile;

        fn fragile() -> ComponentDescriptor {
            ComponentDescriptor::new(|| Ok(Fragile)).on_pre_destroy("shutdown", |_: &Fragile| {
                Err(ContainerError::ContainerClosed)
            })
        }

        let provider = Arc::new(
            StaticMetadataProvider::new().with_namespace(NAMESPACE, vec![event_bus, fragile]),
        );
        let context = ApplicationContext::builder(provider, NAMESPACE)
            .without_properties_file()
            .build()
            .unwrap();

        let report = context.shutdown().unwrap();
        assert_eq!(report.failures().len(), 1);
        assert_eq!(report.failures()[0].bean, "Fragile");
        assert_eq!(context.state(), ContainerState::Closed);
    }

    #[test]
    fn test_auto_configuration_beans_are_full_citizens() {
        struct SimpleFormatter;

        impl SimpleFormatter {
            fn format(&self, message: &str) -> String {
                format!("[Formatted] {message}")
            }
        }

        #[derive(Default)]
        struct AppLoggerService {
            formatter: Injected<SimpleFormatter>,
        }

        fn simple_formatter() -> ComponentDescriptor {
            ComponentDescriptor::new(|| Ok(SimpleFormatter))
        }

        fn app_logger() -> ComponentDescriptor {
            ComponentDescriptor::new(|| Ok(AppLoggerService::default())).with_dependency(
                DependencySlot::require(
                    "formatter",
                    |svc: &AppLoggerService, dep: Arc<SimpleFormatter>| svc.formatter.inject(dep),
                ),
            )
        }

        let provider = Arc::new(
            StaticMetadataProvider::new()
                .with_namespace(NAMESPACE, vec![event_bus, app_logger])
                .with_factories_text(
                    "org.wyvern.autoconfigure.EnableAutoConfiguration=wyvern.testapp.SimpleFormatter",
                )
                .with_factory("wyvern.testapp.SimpleFormatter", simple_formatter),
        );
        let context = ApplicationContext::builder(provider, NAMESPACE)
            .without_properties_file()
            .build()
            .unwrap();

        // 自动配置提供的 Bean 既可被注入，也可被直接查找
        let logger = context.get_bean::<AppLoggerService>().unwrap();
        let formatter = logger.formatter.resolved().unwrap();
        assert_eq!(formatter.format("hello"), "[Formatted] hello");
        assert!(context.contains_bean::<SimpleFormatter>());
    }
}
