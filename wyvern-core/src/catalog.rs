//! 组件目录与元数据提供者
//!
//! 运行期没有包扫描，可被发现的组件来自启动时显式组装的静态注册表。
//! [`MetadataProvider`] 是容器与注册表之间的边界；[`DescriptorCatalog`]
//! 负责按命名空间收集描述符并合并自动配置清单。

use std::any::TypeId;
use std::collections::{HashMap, HashSet};

use crate::constants;
use crate::descriptor::ComponentDescriptor;
use crate::error::{ContainerError, ContainerResult};

/// 描述符工厂（静态注册表的表项）
pub type DescriptorFactory = fn() -> ComponentDescriptor;

/// 元数据提供者
///
/// 对容器而言这是外部协作方：它知道哪些组件存在，容器只消费描述符。
pub trait MetadataProvider: Send + Sync {
    /// 列出命名空间下的组件描述符（顺序即注册顺序）
    fn list_components(&self, namespace: &str) -> ContainerResult<Vec<ComponentDescriptor>>;

    /// 自动配置清单中登记的完全限定类型名（清单缺失时为空）
    fn auto_configured(&self) -> Vec<String>;

    /// 按完全限定类型名解析描述符
    fn descriptor_for(&self, type_name: &str) -> Option<ComponentDescriptor>;
}

/// 静态注册表实现的元数据提供者
///
/// 命名空间到描述符工厂列表的映射在启动时组装完成，自动配置清单
/// 使用 `.factories` 格式的键值文本，约定键见
/// [`constants::AUTO_CONFIGURE_KEY`]。
pub struct StaticMetadataProvider {
    namespaces: Vec<(String, Vec<DescriptorFactory>)>,
    factories: HashMap<String, String>,
    index: HashMap<String, DescriptorFactory>,
}

impl StaticMetadataProvider {
    pub fn new() -> Self {
        Self {
            namespaces: Vec::new(),
            factories: HashMap::new(),
            index: HashMap::new(),
        }
    }

    /// 登记一个命名空间及其组件的描述符工厂
    pub fn with_namespace(
        mut self,
        namespace: impl Into<String>,
        factories: Vec<DescriptorFactory>,
    ) -> Self {
        self.namespaces.push((namespace.into(), factories));
        self
    }

    /// 加载 `.factories` 格式的自动配置清单文本
    pub fn with_factories_text(mut self, content: &str) -> Self {
        self.factories.extend(crate::config::parse_properties(content));
        self
    }

    /// 为自动配置清单中的类型名登记描述符工厂
    pub fn with_factory(
        mut self,
        type_name: impl Into<String>,
        factory: DescriptorFactory,
    ) -> Self {
        self.index.insert(type_name.into(), factory);
        self
    }
}

impl Default for StaticMetadataProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataProvider for StaticMetadataProvider {
    fn list_components(&self, namespace: &str) -> ContainerResult<Vec<ComponentDescriptor>> {
        let factories = self
            .namespaces
            .iter()
            .find(|(name, _)| name == namespace)
            .map(|(_, factories)| factories)
            .ok_or_else(|| ContainerError::NamespaceNotFound {
                namespace: namespace.to_string(),
            })?;
        Ok(factories.iter().map(|factory| factory()).collect())
    }

    fn auto_configured(&self) -> Vec<String> {
        let Some(entries) = self.factories.get(constants::AUTO_CONFIGURE_KEY) else {
            tracing::debug!("No auto-configuration entries found");
            return Vec::new();
        };
        entries
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect()
    }

    fn descriptor_for(&self, type_name: &str) -> Option<ComponentDescriptor> {
        self.index.get(type_name).map(|factory| factory())
    }
}

/// 组件目录
///
/// 发现阶段构建一次，容器随后按目录顺序注册。标识在目录内唯一。
#[derive(Debug)]
pub struct DescriptorCatalog {
    descriptors: Vec<ComponentDescriptor>,
    identities: HashSet<TypeId>,
}

impl DescriptorCatalog {
    /// 通过元数据提供者发现命名空间下的组件
    pub fn discover(
        provider: &dyn MetadataProvider,
        namespace: &str,
    ) -> ContainerResult<Self> {
        let descriptors = provider.list_components(namespace)?;
        let identities = descriptors.iter().map(|d| d.type_id()).collect();
        tracing::info!(
            "Discovered {} component(s) in namespace '{}'",
            descriptors.len(),
            namespace
        );
        Ok(Self {
            descriptors,
            identities,
        })
    }

    /// 合并自动配置清单提供的描述符
    ///
    /// 清单缺失是空结果而不是错误。已发现的标识和未登记工厂的类型名
    /// 都被跳过（仅记录日志）。
    pub fn merge_auto_configuration(&mut self, provider: &dyn MetadataProvider) {
        for type_name in provider.auto_configured() {
            match provider.descriptor_for(&type_name) {
                Some(descriptor) => {
                    if self.identities.contains(&descriptor.type_id()) {
                        tracing::debug!(
                            "Auto-configuration entry '{}' already discovered, skipping",
                            type_name
                        );
                        continue;
                    }
                    tracing::info!("Auto-configuration registered: {}", descriptor.short_name());
                    self.identities.insert(descriptor.type_id());
                    self.descriptors.push(descriptor);
                }
                None => {
                    tracing::warn!(
                        "Auto-configuration entry '{}' has no registered descriptor factory",
                        type_name
                    );
                }
            }
        }
    }

    pub fn descriptors(&self) -> &[ComponentDescriptor] {
        &self.descriptors
    }

    pub fn into_descriptors(self) -> Vec<ComponentDescriptor> {
        self.descriptors
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MessageService;
    struct SimpleFormatter;

    fn message_service() -> ComponentDescriptor {
        ComponentDescriptor::new(|| Ok(MessageService))
    }

    fn simple_formatter() -> ComponentDescriptor {
        ComponentDescriptor::new(|| Ok(SimpleFormatter))
    }

    #[test]
    fn test_unknown_namespace_is_an_error() {
        let provider = StaticMetadataProvider::new();
        let err = DescriptorCatalog::discover(&provider, "app.missing").unwrap_err();
        match err {
            ContainerError::NamespaceNotFound { namespace } => {
                assert_eq!(namespace, "app.missing");
            }
            other => panic!("expected NamespaceNotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_discovery_preserves_registration_order() {
        let provider = StaticMetadataProvider::new()
            .with_namespace("app", vec![message_service, simple_formatter]);
        let catalog = DescriptorCatalog::discover(&provider, "app").unwrap();
        let names: Vec<_> = catalog.descriptors().iter().map(|d| d.short_name()).collect();
        assert_eq!(names, vec!["MessageService", "SimpleFormatter"]);
    }

    #[test]
    fn test_absent_auto_configuration_is_silent() {
        let provider = StaticMetadataProvider::new().with_namespace("app", vec![message_service]);
        assert!(provider.auto_configured().is_empty());

        let mut catalog = DescriptorCatalog::discover(&provider, "app").unwrap();
        catalog.merge_auto_configuration(&provider);
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn test_auto_configuration_merges_new_descriptors() {
        let provider = StaticMetadataProvider::new()
            .with_namespace("app", vec![message_service])
            .with_factories_text(
                "org.wyvern.autoconfigure.EnableAutoConfiguration=app.SimpleFormatter, app.Missing",
            )
            .with_factory("app.SimpleFormatter", simple_formatter);

        let mut catalog = DescriptorCatalog::discover(&provider, "app").unwrap();
        catalog.merge_auto_configuration(&provider);

        // SimpleFormatter 合并进来，app.Missing 没有工厂，静默跳过
        let names: Vec<_> = catalog.descriptors().iter().map(|d| d.short_name()).collect();
        assert_eq!(names, vec!["MessageService", "SimpleFormatter"]);
    }

    #[test]
    fn test_auto_configuration_skips_already_discovered_identity() {
        let provider = StaticMetadataProvider::new()
            .with_namespace("app", vec![message_service])
            .with_factories_text(
                "org.wyvern.autoconfigure.EnableAutoConfiguration=app.MessageService",
            )
            .with_factory("app.MessageService", message_service);

        let mut catalog = DescriptorCatalog::discover(&provider, "app").unwrap();
        catalog.merge_auto_configuration(&provider);
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn test_auto_configured_splits_and_trims_entries() {
        let provider = StaticMetadataProvider::new().with_factories_text(
            "org.wyvern.autoconfigure.EnableAutoConfiguration= a.B , c.D ,, e.F",
        );
        assert_eq!(provider.auto_configured(), vec!["a.B", "c.D", "e.F"]);
    }
}
