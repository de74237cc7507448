//! 依赖解析
//!
//! 对每个依赖槽位：先按能力过滤候选，再按限定名过滤，最后在剩余
//! 候选中取注册顺序最靠前的一个。选择必须是确定性的，绝不依赖任何
//! 容器内部 map 的迭代顺序。

use crate::descriptor::{ComponentDescriptor, DependencySlot};
use crate::error::{ContainerError, ContainerResult};
use crate::registry::BeanEntry;
use crate::BeanInstance;

/// 在注册顺序中挑选第一个满足槽位的候选
///
/// 候选必须是已持有实例的条目（单例或手工注册），原型登记项不参与
/// 解析，原型之间的注入不受支持。
fn select_candidate<'a>(
    entries: &'a [BeanEntry],
    slot: &DependencySlot,
) -> ContainerResult<(&'a BeanEntry, Box<dyn std::any::Any + Send + Sync>)> {
    for entry in entries {
        let Some(instance) = entry.instance() else {
            continue;
        };
        let Some(capability) = entry.descriptor().capability(slot.capability()) else {
            continue;
        };
        if let Some(required) = slot.qualifier() {
            if entry.descriptor().qualifier() != required {
                continue;
            }
        }
        if let Some(handle) = capability.cast(instance) {
            return Ok((entry, handle));
        }
    }

    Err(ContainerError::UnresolvedDependency {
        capability: describe_slot(slot),
    })
}

fn describe_slot(slot: &DependencySlot) -> String {
    match slot.qualifier() {
        Some(qualifier) => format!("{} (qualifier = \"{}\")", slot.capability_name(), qualifier),
        None => slot.capability_name().to_string(),
    }
}

/// 为一个 Bean 实例装配全部依赖槽位
pub fn inject_dependencies(
    entries: &[BeanEntry],
    descriptor: &ComponentDescriptor,
    instance: &BeanInstance,
) -> ContainerResult<()> {
    for slot in descriptor.dependencies() {
        let (source, handle) = select_candidate(entries, slot)?;
        slot.assign(instance.as_ref(), handle)?;
        tracing::debug!(
            "Injected {} into {}.{}",
            source.descriptor().short_name(),
            descriptor.short_name(),
            slot.field()
        );
    }
    Ok(())
}
