//! 容器使用的公共常量
//!
//! 集中定义资源名和约定键，避免宏展开代码与容器内部使用的字符串不一致。

/// 自动配置清单中的约定键，值为逗号分隔的完全限定类型名列表
pub const AUTO_CONFIGURE_KEY: &str = "org.wyvern.autoconfigure.EnableAutoConfiguration";

/// 默认的配置资源文件名
pub const DEFAULT_PROPERTIES_RESOURCE: &str = "application.properties";

/// 自动配置清单的约定资源文件名
pub const AUTO_CONFIGURE_RESOURCE: &str = "autoconfiguration.factories";
