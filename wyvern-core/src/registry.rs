//! Bean 注册表
//!
//! 持有单例实例并登记原型描述符。条目按注册顺序存放，这个顺序是
//! 对外可见的语义：无限定名的歧义解析取先注册者，生命周期回调按
//! 注册顺序（销毁时逆序）执行。
//!
//! 构造分两个阶段：第一阶段对每个单例做裸构造（不触碰依赖），全部
//! 实例存在之后才进入装配阶段。单例之间因此没有构造顺序问题，代价
//! 是构造函数内不能使用依赖。

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use crate::descriptor::ComponentDescriptor;
use crate::error::{ContainerError, ContainerResult};
use crate::{BeanInstance, Scope};

/// 注册表中的一个条目
pub struct BeanEntry {
    descriptor: ComponentDescriptor,
    /// 单例（或手工注册）的实例；原型条目为 `None`
    instance: Option<BeanInstance>,
}

impl BeanEntry {
    pub fn descriptor(&self) -> &ComponentDescriptor {
        &self.descriptor
    }

    pub fn instance(&self) -> Option<&BeanInstance> {
        self.instance.as_ref()
    }
}

/// Bean 注册表
pub struct BeanRegistry {
    entries: Vec<BeanEntry>,
    by_type: HashMap<TypeId, usize>,
}

impl BeanRegistry {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            by_type: HashMap::new(),
        }
    }

    /// 注册一个描述符
    ///
    /// 单例立即执行裸构造并持有实例，原型只登记描述符。标识重复
    /// 直接报错，目录内的标识必须唯一。
    pub fn register(&mut self, descriptor: ComponentDescriptor) -> ContainerResult<()> {
        if self.by_type.contains_key(&descriptor.type_id()) {
            return Err(ContainerError::BeanAlreadyExists {
                name: descriptor.qualifier().to_string(),
            });
        }

        let instance = match descriptor.scope() {
            Scope::Singleton => {
                tracing::debug!("Registered singleton: {}", descriptor.short_name());
                Some(descriptor.construct()?)
            }
            Scope::Prototype => {
                tracing::debug!("Registered prototype: {}", descriptor.short_name());
                None
            }
        };

        self.by_type.insert(descriptor.type_id(), self.entries.len());
        self.entries.push(BeanEntry {
            descriptor,
            instance,
        });
        Ok(())
    }

    /// 全部条目（注册顺序）
    pub fn entries(&self) -> &[BeanEntry] {
        &self.entries
    }

    /// 按类型查找条目
    pub fn entry(&self, type_id: TypeId) -> Option<&BeanEntry> {
        self.by_type.get(&type_id).map(|&idx| &self.entries[idx])
    }

    /// 按类型直接查找实例
    pub fn get_instance(&self, type_id: TypeId) -> Option<BeanInstance> {
        self.entry(type_id)
            .and_then(|entry| entry.instance.as_ref())
            .map(Arc::clone)
    }

    /// 无条件覆盖注册
    ///
    /// 已存在的条目替换实例，未知类型追加一个手工条目。后续查找
    /// 一律返回覆盖后的实例。
    pub fn override_instance<T: Any + Send + Sync>(&mut self, instance: Arc<T>) {
        let erased: BeanInstance = instance;
        match self.by_type.get(&TypeId::of::<T>()) {
            Some(&idx) => {
                tracing::debug!(
                    "Overriding bean: {}",
                    self.entries[idx].descriptor.short_name()
                );
                self.entries[idx].instance = Some(erased);
            }
            None => {
                let descriptor = ComponentDescriptor::manual::<T>();
                tracing::debug!("Registered manual bean: {}", descriptor.short_name());
                self.by_type.insert(descriptor.type_id(), self.entries.len());
                self.entries.push(BeanEntry {
                    descriptor,
                    instance: Some(erased),
                });
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 丢弃全部状态（容器关闭时调用）
    pub fn clear(&mut self) {
        self.entries.clear();
        self.by_type.clear();
    }
}

impl Default for BeanRegistry {
    fn default() -> Self {
        Self::new()
    }
}
