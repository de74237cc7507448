//! 生命周期管理
//!
//! 初始化回调在全部单例装配完成之后按注册顺序执行，初始化阶段的
//! 回调失败是致命的。销毁回调只在显式关闭时按注册逆序执行，单个
//! 回调的失败被记录后继续执行剩余回调。

use crate::descriptor::ComponentDescriptor;
use crate::error::{ContainerError, ContainerResult};
use crate::registry::BeanEntry;
use crate::BeanInstance;

/// 一次失败的销毁回调
#[derive(Debug)]
pub struct HookFailure {
    pub bean: &'static str,
    pub hook: String,
    pub error: ContainerError,
}

/// 关闭阶段的执行报告
///
/// 销毁回调互相隔离，失败不会中断关闭流程，全部失败收集在此。
#[derive(Debug, Default)]
pub struct ShutdownReport {
    failures: Vec<HookFailure>,
}

impl ShutdownReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failures(&self) -> &[HookFailure] {
        &self.failures
    }
}

fn hook_error(descriptor: &ComponentDescriptor, hook: &str, cause: ContainerError) -> ContainerError {
    ContainerError::LifecycleInvocation {
        hook: format!("{}::{}", descriptor.short_name(), hook),
        reason: cause.to_string(),
    }
}

/// 对单个实例执行全部初始化回调
///
/// 原型实例在自身装配完成后立即走这条路径，作用范围只有该实例。
pub fn run_post_construct_for(
    descriptor: &ComponentDescriptor,
    instance: &BeanInstance,
) -> ContainerResult<()> {
    for hook in descriptor.post_construct_hooks() {
        hook.invoke(instance.as_ref())
            .map_err(|e| hook_error(descriptor, hook.name(), e))?;
        tracing::debug!(
            "Invoked post-construct {}::{}",
            descriptor.short_name(),
            hook.name()
        );
    }
    Ok(())
}

/// 按注册顺序执行全部单例的初始化回调
pub fn run_post_construct(entries: &[BeanEntry]) -> ContainerResult<()> {
    for entry in entries {
        if let Some(instance) = entry.instance() {
            run_post_construct_for(entry.descriptor(), instance)?;
        }
    }
    Ok(())
}

/// 按注册逆序执行全部单例的销毁回调
pub fn run_pre_destroy(entries: &[BeanEntry]) -> ShutdownReport {
    let mut report = ShutdownReport::default();
    for entry in entries.iter().rev() {
        let Some(instance) = entry.instance() else {
            continue;
        };
        let descriptor = entry.descriptor();
        for hook in descriptor.pre_destroy_hooks() {
            match hook.invoke(instance.as_ref()) {
                Ok(()) => tracing::debug!(
                    "Invoked pre-destroy {}::{}",
                    descriptor.short_name(),
                    hook.name()
                ),
                Err(e) => {
                    let error = hook_error(descriptor, hook.name(), e);
                    tracing::warn!("{}", error);
                    report.failures.push(HookFailure {
                        bean: descriptor.short_name(),
                        hook: hook.name().to_string(),
                        error,
                    });
                }
            }
        }
    }
    report
}
