//! The resource-mapping node tree and per-stage resource usage records.
//!
//! A pipeline layout is described as an ordered list of root
//! [`ResourceNode`]s living in a logical user-data dword space. Root nodes
//! are either immediate descriptors (their dwords are loaded straight into
//! user-data registers), pointers to nested descriptor tables, or pointers to
//! system-managed tables (vertex-buffer bindings, stream-out buffers).

use std::collections::BTreeSet;

use bitflags::bitflags;

use crate::error::AbiError;

/// Upper bound on root resource nodes; per-node argument bookkeeping is sized
/// to this.
pub const MAX_ROOT_NODES: usize = 64;

/// Number of transform-feedback buffer slots.
pub const MAX_TRANSFORM_FEEDBACK_BUFFERS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceNodeKind {
    /// Inline push-constant dwords.
    PushConstant,
    /// Pointer to a nested descriptor table; the only kind that nests.
    DescriptorTablePtr,
    /// Pointer to the system-managed vertex-buffer binding table. Always
    /// considered in use, never spilled.
    IndirectUserDataPtr,
    /// Pointer to the system-managed stream-out buffer table. Always
    /// considered in use, never spilled.
    StreamOutTablePtr,
    /// Image/sampled resource descriptor.
    Resource,
    Sampler,
    TexelBuffer,
    Buffer,
    /// Two-dword buffer descriptor (compact addressing).
    BufferCompact,
    /// Combined resource + sampler table entry.
    CombinedResourceSampler,
}

impl ResourceNodeKind {
    /// Concrete descriptor kinds identified by a (set, binding) pair.
    pub fn is_concrete_descriptor(self) -> bool {
        matches!(
            self,
            ResourceNodeKind::Resource
                | ResourceNodeKind::Sampler
                | ResourceNodeKind::TexelBuffer
                | ResourceNodeKind::Buffer
                | ResourceNodeKind::BufferCompact
                | ResourceNodeKind::CombinedResourceSampler
        )
    }

    /// Table-pointer kinds that must span exactly one dword.
    fn is_single_dword_pointer(self) -> bool {
        matches!(
            self,
            ResourceNodeKind::DescriptorTablePtr
                | ResourceNodeKind::IndirectUserDataPtr
                | ResourceNodeKind::StreamOutTablePtr
        )
    }
}

/// One node of the pipeline resource-mapping tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceNode {
    pub kind: ResourceNodeKind,
    pub set: u32,
    pub binding: u32,
    /// Position in the logical user-data dword space.
    pub offset_in_dwords: u32,
    pub size_in_dwords: u32,
    /// Nested nodes; non-empty only when `kind` is `DescriptorTablePtr`.
    pub children: Vec<ResourceNode>,
}

impl ResourceNode {
    pub fn descriptor(
        kind: ResourceNodeKind,
        set: u32,
        binding: u32,
        offset_in_dwords: u32,
        size_in_dwords: u32,
    ) -> Self {
        Self {
            kind,
            set,
            binding,
            offset_in_dwords,
            size_in_dwords,
            children: Vec::new(),
        }
    }

    pub fn push_constant(offset_in_dwords: u32, size_in_dwords: u32) -> Self {
        Self::descriptor(
            ResourceNodeKind::PushConstant,
            0,
            0,
            offset_in_dwords,
            size_in_dwords,
        )
    }

    pub fn table(offset_in_dwords: u32, children: Vec<ResourceNode>) -> Self {
        Self {
            kind: ResourceNodeKind::DescriptorTablePtr,
            set: 0,
            binding: 0,
            offset_in_dwords,
            size_in_dwords: 1,
            children,
        }
    }

    pub fn indirect_user_data(offset_in_dwords: u32) -> Self {
        Self::descriptor(ResourceNodeKind::IndirectUserDataPtr, 0, 0, offset_in_dwords, 1)
    }

    pub fn stream_out_table(offset_in_dwords: u32) -> Self {
        Self::descriptor(ResourceNodeKind::StreamOutTablePtr, 0, 0, offset_in_dwords, 1)
    }
}

/// Validates structural invariants of the root node list: nesting is only
/// allowed under descriptor tables, table pointers span one dword, and the
/// root count fits the per-node bookkeeping.
pub fn validate_root_nodes(nodes: &[ResourceNode]) -> Result<(), AbiError> {
    if nodes.len() > MAX_ROOT_NODES {
        return Err(AbiError::TooManyRootNodes {
            count: nodes.len(),
            max: MAX_ROOT_NODES,
        });
    }
    for (index, node) in nodes.iter().enumerate() {
        validate_node(index, node)?;
    }
    Ok(())
}

fn validate_node(root_index: usize, node: &ResourceNode) -> Result<(), AbiError> {
    if node.kind.is_single_dword_pointer() && node.size_in_dwords != 1 {
        return Err(AbiError::BadTablePointerSize {
            kind: node.kind,
            size_in_dwords: node.size_in_dwords,
        });
    }
    if !node.children.is_empty() && node.kind != ResourceNodeKind::DescriptorTablePtr {
        return Err(AbiError::UnexpectedChildren {
            index: root_index,
            kind: node.kind,
        });
    }
    for child in &node.children {
        // Indirect and stream-out table pointers never nest.
        if matches!(
            child.kind,
            ResourceNodeKind::IndirectUserDataPtr | ResourceNodeKind::StreamOutTablePtr
        ) {
            return Err(AbiError::UnexpectedChildren {
                index: root_index,
                kind: child.kind,
            });
        }
        validate_node(root_index, child)?;
    }
    Ok(())
}

/// (descriptor set, binding) identifier of one logical resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DescriptorPair {
    pub set: u32,
    pub binding: u32,
}

impl DescriptorPair {
    pub const fn new(set: u32, binding: u32) -> Self {
        Self { set, binding }
    }
}

bitflags! {
    /// Built-in (system value) usage flags collected by upstream analysis.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct BuiltInUsage: u32 {
        // Vertex-processing built-ins.
        const VERTEX_INDEX = 1 << 0;
        const INSTANCE_INDEX = 1 << 1;
        const PRIMITIVE_ID = 1 << 2;
        const BASE_VERTEX = 1 << 3;
        const BASE_INSTANCE = 1 << 4;
        const DRAW_INDEX = 1 << 5;

        // Compute built-ins.
        const NUM_WORKGROUPS = 1 << 6;

        // Fragment built-ins and interpolation modes.
        const FRAG_COORD = 1 << 7;
        const FRONT_FACING = 1 << 8;
        const SAMPLE_ID = 1 << 9;
        const SAMPLE_MASK_IN = 1 << 10;
        const SMOOTH = 1 << 11;
        const NOPERSPECTIVE = 1 << 12;
        const SAMPLE = 1 << 13;
        const CENTER = 1 << 14;
        const CENTROID = 1 << 15;
        const PULL_MODE = 1 << 16;
    }
}

/// Per-stage resource usage, produced by upstream analysis.
///
/// Read-only for the planner except for the two available-register counts,
/// which are clamped downward (never raised) while the stage is processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceUsage {
    /// (set, binding) pairs statically referenced by the stage.
    pub desc_pairs: BTreeSet<DescriptorPair>,
    pub push_const_size_in_bytes: u32,
    pub builtins: BuiltInUsage,
    /// Transform-feedback stride per buffer; zero means the buffer is unused.
    pub xfb_strides: [u32; MAX_TRANSFORM_FEEDBACK_BUFFERS],
    pub enable_xfb: bool,
    pub vgprs_available: u32,
    pub sgprs_available: u32,
}

impl Default for ResourceUsage {
    fn default() -> Self {
        Self {
            desc_pairs: BTreeSet::new(),
            push_const_size_in_bytes: 0,
            builtins: BuiltInUsage::empty(),
            xfb_strides: [0; MAX_TRANSFORM_FEEDBACK_BUFFERS],
            enable_xfb: false,
            vgprs_available: u32::MAX,
            sgprs_available: u32::MAX,
        }
    }
}

impl ResourceUsage {
    pub fn references(&self, set: u32, binding: u32) -> bool {
        self.desc_pairs.contains(&DescriptorPair::new(set, binding))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_children_only_under_tables() {
        let bad = vec![ResourceNode {
            children: vec![ResourceNode::descriptor(ResourceNodeKind::Sampler, 0, 0, 0, 4)],
            ..ResourceNode::descriptor(ResourceNodeKind::Buffer, 0, 0, 0, 4)
        }];
        assert_eq!(
            validate_root_nodes(&bad),
            Err(AbiError::UnexpectedChildren {
                index: 0,
                kind: ResourceNodeKind::Buffer,
            })
        );

        let good = vec![ResourceNode::table(
            0,
            vec![ResourceNode::descriptor(ResourceNodeKind::Sampler, 0, 0, 0, 4)],
        )];
        assert_eq!(validate_root_nodes(&good), Ok(()));
    }

    #[test]
    fn table_pointers_span_one_dword() {
        let bad = vec![ResourceNode {
            size_in_dwords: 2,
            ..ResourceNode::stream_out_table(3)
        }];
        assert_eq!(
            validate_root_nodes(&bad),
            Err(AbiError::BadTablePointerSize {
                kind: ResourceNodeKind::StreamOutTablePtr,
                size_in_dwords: 2,
            })
        );
    }

    #[test]
    fn system_tables_never_nest() {
        let bad = vec![ResourceNode::table(0, vec![ResourceNode::indirect_user_data(1)])];
        assert_eq!(
            validate_root_nodes(&bad),
            Err(AbiError::UnexpectedChildren {
                index: 0,
                kind: ResourceNodeKind::IndirectUserDataPtr,
            })
        );
    }

    #[test]
    fn root_node_count_is_bounded() {
        let nodes: Vec<_> = (0..MAX_ROOT_NODES as u32 + 1)
            .map(|i| ResourceNode::descriptor(ResourceNodeKind::Buffer, 0, i, i * 4, 4))
            .collect();
        assert_eq!(
            validate_root_nodes(&nodes),
            Err(AbiError::TooManyRootNodes {
                count: MAX_ROOT_NODES + 1,
                max: MAX_ROOT_NODES,
            })
        );
    }
}
