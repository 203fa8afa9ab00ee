//! Resource activity analysis.
//!
//! Decides whether a resource node is referenced by the stage being
//! processed. On merged-stage generations the resource-mapping nodes of the
//! two halves of a merged pair are shared, so a node is active when *either*
//! half references it.

use crate::resources::{ResourceNode, ResourceNodeKind, ResourceUsage};

/// Activity query over one stage's usage plus an optional merge companion.
///
/// Pure and side-effect free; the packer and the reservation scan each run
/// their own queries over the immutable node tree.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ActivityQuery<'a> {
    usage: &'a ResourceUsage,
    companion: Option<&'a ResourceUsage>,
}

impl<'a> ActivityQuery<'a> {
    pub(crate) fn new(usage: &'a ResourceUsage, companion: Option<&'a ResourceUsage>) -> Self {
        Self { usage, companion }
    }

    pub(crate) fn is_active(&self, node: &ResourceNode, is_root: bool) -> bool {
        match node.kind {
            ResourceNodeKind::PushConstant if is_root => {
                self.usage.push_const_size_in_bytes > 0
                    || self
                        .companion
                        .is_some_and(|c| c.push_const_size_in_bytes > 0)
            }
            ResourceNodeKind::DescriptorTablePtr => node
                .children
                .iter()
                .any(|child| self.is_active(child, false)),
            // System-managed tables are assumed used whenever present.
            ResourceNodeKind::IndirectUserDataPtr | ResourceNodeKind::StreamOutTablePtr => true,
            _ => {
                self.usage.references(node.set, node.binding)
                    || self
                        .companion
                        .is_some_and(|c| c.references(node.set, node.binding))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::{DescriptorPair, ResourceNode, ResourceNodeKind};

    fn usage_with(pairs: &[(u32, u32)]) -> ResourceUsage {
        ResourceUsage {
            desc_pairs: pairs
                .iter()
                .map(|&(set, binding)| DescriptorPair::new(set, binding))
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn push_constant_activity_unions_companion() {
        let node = ResourceNode::push_constant(0, 4);
        let empty = ResourceUsage::default();
        let with_pc = ResourceUsage {
            push_const_size_in_bytes: 16,
            ..Default::default()
        };

        assert!(!ActivityQuery::new(&empty, None).is_active(&node, true));
        assert!(ActivityQuery::new(&with_pc, None).is_active(&node, true));
        assert!(ActivityQuery::new(&empty, Some(&with_pc)).is_active(&node, true));

        // Nested push constants fall through to the (set, binding) check.
        assert!(!ActivityQuery::new(&with_pc, None).is_active(&node, false));
    }

    #[test]
    fn table_is_active_when_any_child_is() {
        let table = ResourceNode::table(
            0,
            vec![
                ResourceNode::descriptor(ResourceNodeKind::Buffer, 1, 0, 0, 4),
                ResourceNode::descriptor(ResourceNodeKind::Sampler, 1, 1, 4, 4),
            ],
        );

        assert!(!ActivityQuery::new(&usage_with(&[]), None).is_active(&table, true));
        assert!(ActivityQuery::new(&usage_with(&[(1, 1)]), None).is_active(&table, true));
    }

    #[test]
    fn nested_tables_recurse() {
        let table = ResourceNode::table(
            0,
            vec![ResourceNode::table(
                0,
                vec![ResourceNode::descriptor(ResourceNodeKind::Resource, 2, 7, 0, 8)],
            )],
        );
        assert!(ActivityQuery::new(&usage_with(&[(2, 7)]), None).is_active(&table, true));
        assert!(!ActivityQuery::new(&usage_with(&[(2, 8)]), None).is_active(&table, true));
    }

    #[test]
    fn system_tables_always_active() {
        let empty = ResourceUsage::default();
        let query = ActivityQuery::new(&empty, None);
        assert!(query.is_active(&ResourceNode::indirect_user_data(0), true));
        assert!(query.is_active(&ResourceNode::stream_out_table(1), true));
    }

    #[test]
    fn descriptor_activity_unions_companion() {
        let node = ResourceNode::descriptor(ResourceNodeKind::Buffer, 0, 0, 0, 4);
        let own = usage_with(&[]);
        let companion = usage_with(&[(0, 0)]);

        assert!(!ActivityQuery::new(&own, None).is_active(&node, true));
        assert!(ActivityQuery::new(&own, Some(&companion)).is_active(&node, true));
    }
}
