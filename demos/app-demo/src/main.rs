use std::any::Any;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use wyvern_core::prelude::*;

// ==================== 业务组件 ====================

/// 最简单的服务 Bean
struct MessageService;

impl MessageService {
    fn hello(&self) {
        println!("Hello from MessageService!");
    }
}

/// 依赖注入演示：持有 MessageService
#[derive(Default)]
struct GreetingService {
    message_service: Injected<MessageService>,
}

impl GreetingService {
    fn greet(&self) -> ContainerResult<()> {
        self.message_service.resolved()?.hello();
        Ok(())
    }
}

/// 消息发送能力
trait MessageSender: Send + Sync {
    fn send(&self, message: &str);
}

struct EmailMessageService;

impl MessageSender for EmailMessageService {
    fn send(&self, message: &str) {
        println!("Sending EMAIL: {message}");
    }
}

struct SmsMessageService;

impl MessageSender for SmsMessageService {
    fn send(&self, message: &str) {
        println!("Sending SMS: {message}");
    }
}

/// 限定名演示：两个 MessageSender 候选中绑定 "sms"
#[derive(Default)]
struct NotificationService {
    sender: Injected<dyn MessageSender>,
}

impl NotificationService {
    fn notify_user(&self, text: &str) -> ContainerResult<()> {
        self.sender.resolved()?.send(text);
        Ok(())
    }
}

/// 配置值绑定演示
#[derive(Default)]
struct ConfigPrinterService {
    app_name: OnceLock<String>,
    author: OnceLock<String>,
}

impl ConfigPrinterService {
    fn print(&self) {
        println!(
            "App Name: {}",
            self.app_name.get().map(String::as_str).unwrap_or("<unset>")
        );
        println!(
            "Author: {}",
            self.author.get().map(String::as_str).unwrap_or("<unset>")
        );
    }
}

/// 用户注册事件
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

/// 事件发布演示：注册用户并广播事件
#[derive(Default)]
struct RegistrationService {
    events: Injected<EventBus>,
}

impl RegistrationService {
    fn register(&self, username: &str) -> ContainerResult<()> {
        println!("User created: {username}");
        self.events.resolved()?.publish(&UserRegistered {
            username: username.to_string(),
        });
        Ok(())
    }
}

/// 订阅 UserRegistered 的监听器
#[derive(Default)]
struct WelcomeEmailListener;

impl WelcomeEmailListener {
    fn on_user_registered(&self, event: &UserRegistered) {
        println!("Sending welcome email to: {}", event.username);
    }
}

/// 原型作用域演示：每次查找得到独立实例
#[derive(Default)]
struct RequestScopedBean {
    counter: AtomicU64,
}

impl RequestScopedBean {
    fn touch(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::SeqCst) + 1
    }
}

/// 生命周期回调演示
struct InitializationService;

/// 自动配置提供的格式化器
struct SimpleFormatter;

impl SimpleFormatter {
    fn format(&self, message: &str) -> String {
        format!("[Formatted] {message}")
    }
}

/// 自动配置提供的日志服务，依赖 SimpleFormatter
#[derive(Default)]
struct AppLoggerService {
    formatter: Injected<SimpleFormatter>,
}

impl AppLoggerService {
    fn log(&self, message: &str) -> ContainerResult<()> {
        println!("LOG: {}", self.formatter.resolved()?.format(message));
        Ok(())
    }
}

// ==================== 描述符工厂 ====================

fn event_bus() -> ComponentDescriptor {
    ComponentDescriptor::new(|| Ok(EventBus::new()))
}

fn message_service() -> ComponentDescriptor {
    ComponentDescriptor::new(|| Ok(MessageService))
}

fn greeting_service() -> ComponentDescriptor {
    ComponentDescriptor::new(|| Ok(GreetingService::default())).with_dependency(
        DependencySlot::require(
            "message_service",
            |svc: &GreetingService, dep: Arc<MessageService>| svc.message_service.inject(dep),
        ),
    )
}

fn email_message_service() -> ComponentDescriptor {
    ComponentDescriptor::new(|| Ok(EmailMessageService))
        .with_qualifier("email")
        .exposes(|svc: Arc<EmailMessageService>| -> Arc<dyn MessageSender> { svc })
}

fn sms_message_service() -> ComponentDescriptor {
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

fn config_printer_service() -> ComponentDescriptor {
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
        .on_post_construct("print", |svc: &ConfigPrinterService| {
            svc.print();
            Ok(())
        })
}

fn registration_service() -> ComponentDescriptor {
    ComponentDescriptor::new(|| Ok(RegistrationService::default())).with_dependency(
        DependencySlot::require("events", |svc: &RegistrationService, dep: Arc<EventBus>| {
            svc.events.inject(dep)
        }),
    )
}

fn welcome_email_listener() -> ComponentDescriptor {
    ComponentDescriptor::new(|| Ok(WelcomeEmailListener)).listens(
        |listener: &WelcomeEmailListener, event: &UserRegistered| {
            listener.on_user_registered(event);
        },
    )
}

fn request_scoped_bean() -> ComponentDescriptor {
    ComponentDescriptor::new(|| Ok(RequestScopedBean::default())).with_scope(Scope::Prototype)
}

fn initialization_service() -> ComponentDescriptor {
    ComponentDescriptor::new(|| Ok(InitializationService))
        .on_post_construct("init", |_: &InitializationService| {
            println!("InitializationService is ready!");
            Ok(())
        })
        .on_pre_destroy("shutdown", |_: &InitializationService| {
            println!("InitializationService is shutting down!");
            Ok(())
        })
}

fn simple_formatter() -> ComponentDescriptor {
    ComponentDescriptor::new(|| Ok(SimpleFormatter))
}

fn app_logger_service() -> ComponentDescriptor {
    ComponentDescriptor::new(|| Ok(AppLoggerService::default())).with_dependency(
        DependencySlot::require(
            "formatter",
            |svc: &AppLoggerService, dep: Arc<SimpleFormatter>| svc.formatter.inject(dep),
        ),
    )
}

const NAMESPACE: &str = "org.wyvern.demo";

/// 启动时组装的静态注册表
fn metadata_provider() -> Arc<StaticMetadataProvider> {
    Arc::new(
        StaticMetadataProvider::new()
            .with_namespace(
                NAMESPACE,
                vec![
                    event_bus,
                    message_service,
                    greeting_service,
                    email_message_service,
                    sms_message_service,
                    notification_service,
                    config_printer_service,
                    registration_service,
                    welcome_email_listener,
                    request_scoped_bean,
                    initialization_service,
                ],
            )
            .with_factories_text(
                "org.wyvern.autoconfigure.EnableAutoConfiguration=\
                 org.wyvern.demo.SimpleFormatter, org.wyvern.demo.AppLoggerService",
            )
            .with_factory("org.wyvern.demo.SimpleFormatter", simple_formatter)
            .with_factory("org.wyvern.demo.AppLoggerService", app_logger_service),
    )
}

fn properties_path() -> &'static str {
    // cargo run 的工作目录可能是工作区根目录，也可能是 crate 目录
    if Path::new("application.properties").exists() {
        "application.properties"
    } else {
        "demos/app-demo/application.properties"
    }
}

fn main() -> anyhow::Result<()> {
    LoggingConfig::from_env()
        .init()
        .map_err(|e| anyhow::anyhow!(e))?;

    let context = ApplicationContext::builder(metadata_provider(), NAMESPACE)
        .properties_file(properties_path())
        .build()?;

    let service = context.get_bean::<MessageService>()?;
    service.hello();

    let greeting = context.get_bean::<GreetingService>()?;
    greeting.greet()?;

    let registration = context.get_bean::<RegistrationService>()?;
    registration.register("icaro.dev")?;

    let notification = context.get_bean::<NotificationService>()?;
    notification.notify_user("icaro.dev")?;

    let logger = context.get_bean::<AppLoggerService>()?;
    logger.log("auto-configured beans are wired like any other")?;

    let r1 = context.get_bean::<RequestScopedBean>()?;
    let r2 = context.get_bean::<RequestScopedBean>()?;
    println!("Same instance? {}", Arc::ptr_eq(&r1, &r2));
    println!("r1 touched {} time(s), r2 touched {} time(s)", r1.touch(), r2.touch());

    // 绕过发现流程，直接覆盖注册
    context.register_bean(SimpleFormatter)?;
    let formatter = context.get_bean::<SimpleFormatter>()?;
    println!("{}", formatter.format("manually registered"));

    let report = context.shutdown()?;
    if !report.is_clean() {
        for failure in report.failures() {
            eprintln!("pre-destroy failure in {}: {}", failure.bean, failure.error);
        }
    }

    Ok(())
}
