// ============================================================================
// spark-rx - Forced Refresh
// Make the host re-render an instance after a binding wrote to it
// ============================================================================
//
// Two steps. If the instance can be refreshed (it is mounted and the host
// gave us an updater) the updater runs. Otherwise, or if the updater fails or
// panics, a fresh RenderKey is written to the first reachable render node:
//
//   1. the node of the instance whose hook is currently running
//   2. this instance's rendered subtree
//   3. the subtree of the instance whose hook is currently running
//
// Nothing here panics or returns an error.
// ============================================================================

use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::component::instance::{ComponentInstance, RenderKey, RenderNode};
use crate::core::context::current_instance;

/// Which node received the new render key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTarget {
    ActiveVNode,
    InstanceSubTree,
    ActiveSubTree,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The host updater ran
    Updated,
    /// Fell back to re-keying a render node
    Rekeyed(RefreshTarget),
    /// Nothing reachable to refresh
    Skipped,
}

/// Refresh `instance` after one of its properties changed.
pub fn force_refresh(instance: &ComponentInstance) -> RefreshOutcome {
    if instance.is_render_ready() {
        if let Some(updater) = instance.updater() {
            match catch_unwind(AssertUnwindSafe(|| updater())) {
                Ok(Ok(())) => {
                    instance.bump_update_count();
                    return RefreshOutcome::Updated;
                }
                Ok(Err(err)) => {
                    tracing::trace!(instance = %instance.id(), error = %err, "host update failed, re-keying");
                }
                Err(_) => {
                    tracing::warn!(instance = %instance.id(), "host updater panicked, re-keying");
                }
            }
        }
    }
    rekey(instance)
}

fn rekey(instance: &ComponentInstance) -> RefreshOutcome {
    let active = current_instance();
    let (node, target) = match pick_target(instance, active.as_ref()) {
        Some(found) => found,
        None => {
            tracing::trace!(instance = %instance.id(), "no render node to re-key");
            return RefreshOutcome::Skipped;
        }
    };

    let key = RenderKey::new();
    node.set_key(key);
    tracing::trace!(instance = %instance.id(), ?target, %key, "re-keyed render node");
    RefreshOutcome::Rekeyed(target)
}

fn pick_target(instance: &ComponentInstance, active: Option<&ComponentInstance>) -> Option<(RenderNode, RefreshTarget)> {
    if let Some(vnode) = active.and_then(|a| a.vnode()) {
        return Some((vnode, RefreshTarget::ActiveVNode));
    }
    if let Some(sub_tree) = instance.sub_tree() {
        return Some((sub_tree, RefreshTarget::InstanceSubTree));
    }
    active
        .and_then(|a| a.sub_tree())
        .map(|sub_tree| (sub_tree, RefreshTarget::ActiveSubTree))
}

// =============================================================================
// TESTS
// =============================================================================
