//! Register budget planning: the reservation scan over the root node list
//! and the per-stage slot budget.
//!
//! The scan runs once per stage, before packing, and its results are reused
//! by both the budget planner and the packer; stream-out / vertex-buffer
//! table reservations must be locked in before general packing computes its
//! budget.

use crate::activity::ActivityQuery;
use crate::context::StageContext;
use crate::resources::ResourceNodeKind;
use crate::stage::ShaderStage;

/// Results of the reservation scan over the root resource nodes.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct NodeScan {
    /// A vertex-buffer table pointer must get a register in this stage.
    pub reserve_vb_table: bool,
    /// A stream-out table pointer must get a register in this stage.
    pub reserve_stream_out: bool,
    /// `max(offset + size)` over active nodes: the logical user-data extent,
    /// and the spill table's size if spilling happens.
    pub required_user_data: u32,
    /// Sum of active spillable nodes' sizes: the demand greedy packing must
    /// satisfy.
    pub required_remapped_user_data: u32,
    /// Root index of the active push-constant node.
    pub push_const_node: Option<usize>,
}

pub(crate) fn scan_root_nodes(cx: &StageContext<'_>, activity: &ActivityQuery<'_>) -> NodeScan {
    let mut scan = NodeScan::default();
    let merged = cx.state.gfx_ip.has_merged_stages();

    for (index, node) in cx.state.user_data_nodes.iter().enumerate() {
        match node.kind {
            ResourceNodeKind::IndirectUserDataPtr => {
                // Only the vertex shader needs a vertex-buffer table; on
                // merged generations, the stage the vertex shader merges
                // into needs it so the merged invocation gets one.
                if cx.stage == ShaderStage::Vertex {
                    scan.reserve_vb_table = true;
                } else if merged
                    && (cx.stage == ShaderStage::TessControl
                        || (cx.stage == ShaderStage::Geometry && !cx.has_tessellation()))
                {
                    scan.reserve_vb_table = true;
                }
            }
            ResourceNodeKind::StreamOutTablePtr => {
                // Only the last vertex-processing stage writes stream-out;
                // on merged generations, the stage it merges into needs the
                // table as well.
                if cx.stage_mask.is_last_vertex_processing_stage(cx.stage) {
                    scan.reserve_stream_out = true;
                } else if merged
                    && (cx.stage == ShaderStage::TessEval
                        || (cx.stage == ShaderStage::Vertex && !cx.has_tessellation()))
                {
                    scan.reserve_stream_out = true;
                }
            }
            _ => {
                if !activity.is_active(node, true) {
                    continue;
                }
                if node.kind == ResourceNodeKind::PushConstant {
                    scan.push_const_node = Some(index);
                }
                scan.required_user_data = scan
                    .required_user_data
                    .max(node.offset_in_dwords + node.size_in_dwords);
                scan.required_remapped_user_data += node.size_in_dwords;
            }
        }
    }
    scan
}

/// The slot budget available to greedy packing, plus the reservation flags
/// the per-stage rules derived from it.
#[derive(Debug, Clone, Copy)]
pub(crate) struct BudgetPlan {
    /// User-data slots left for descriptor packing after all reservations.
    pub avail_user_data: u32,
    /// A dummy in-register ES-GS LDS-size slot is reserved for this stage.
    pub reserve_es_gs_lds_size: bool,
    /// Spilling to the memory-resident table is required.
    pub need_spill: bool,
    /// Compute's deterministic offset-indexed layout replaces greedy packing.
    pub use_fixed_layout: bool,
}

impl BudgetPlan {
    pub(crate) fn new(stage: ShaderStage, avail_user_data: u32) -> Self {
        Self {
            avail_user_data,
            reserve_es_gs_lds_size: false,
            need_spill: false,
            use_fixed_layout: stage == ShaderStage::Compute,
        }
    }

    pub(crate) fn reserve(&mut self, slots: u32) {
        self.avail_user_data = self.avail_user_data.saturating_sub(slots);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::ActivityQuery;
    use crate::config::{GfxIpVersion, GpuProperties, PipelineOptions, PipelineState};
    use crate::resources::{DescriptorPair, ResourceNode, ResourceNodeKind, ResourceUsage};
    use crate::stage::StageMask;

    fn state(nodes: &[ResourceNode], gfx_major: u32) -> PipelineState<'_> {
        PipelineState {
            gfx_ip: GfxIpVersion::new(gfx_major, 0),
            props: GpuProperties {
                max_user_data_count: 32,
                max_vgprs_available: 256,
                max_sgprs_available: 104,
            },
            options: PipelineOptions::default(),
            user_data_nodes: nodes,
            enable_multi_view: false,
            gs_on_chip: false,
            tess_off_chip: false,
            enable_ngg: false,
        }
    }

    fn context<'a>(
        state: &'a PipelineState<'a>,
        stage: ShaderStage,
        stage_mask: StageMask,
        usage: &'a ResourceUsage,
    ) -> StageContext<'a> {
        StageContext {
            state,
            stage,
            stage_mask,
            usage,
            companion_usage: None,
            merged_vertex_usage: None,
        }
    }

    #[test]
    fn vb_table_reservation_follows_the_merged_vertex_stage() {
        let nodes = vec![ResourceNode::indirect_user_data(0)];
        let usage = ResourceUsage::default();
        let mask = StageMask::VERTEX | StageMask::TESS_CONTROL | StageMask::FRAGMENT;

        let gfx9 = state(&nodes, 9);
        let cx = context(&gfx9, ShaderStage::TessControl, mask, &usage);
        let scan = scan_root_nodes(&cx, &ActivityQuery::new(&usage, None));
        assert!(scan.reserve_vb_table);

        // Pre-merge generations only reserve it for the vertex stage itself.
        let gfx6 = state(&nodes, 6);
        let cx = context(&gfx6, ShaderStage::TessControl, mask, &usage);
        let scan = scan_root_nodes(&cx, &ActivityQuery::new(&usage, None));
        assert!(!scan.reserve_vb_table);

        let cx = context(&gfx6, ShaderStage::Vertex, mask, &usage);
        let scan = scan_root_nodes(&cx, &ActivityQuery::new(&usage, None));
        assert!(scan.reserve_vb_table);
    }

    #[test]
    fn stream_out_goes_to_last_vertex_processing_stage() {
        let nodes = vec![ResourceNode::stream_out_table(0)];
        let usage = ResourceUsage::default();
        let mask = StageMask::VERTEX | StageMask::GEOMETRY | StageMask::FRAGMENT;
        let gfx6 = state(&nodes, 6);

        let cx = context(&gfx6, ShaderStage::Geometry, mask, &usage);
        assert!(scan_root_nodes(&cx, &ActivityQuery::new(&usage, None)).reserve_stream_out);

        let cx = context(&gfx6, ShaderStage::Vertex, mask, &usage);
        assert!(!scan_root_nodes(&cx, &ActivityQuery::new(&usage, None)).reserve_stream_out);

        // On merged generations the vertex stage (merged into GS... no tess)
        // also carries the table.
        let gfx9 = state(&nodes, 9);
        let cx = context(&gfx9, ShaderStage::Vertex, mask, &usage);
        assert!(scan_root_nodes(&cx, &ActivityQuery::new(&usage, None)).reserve_stream_out);
    }

    #[test]
    fn scan_totals_cover_only_active_nodes() {
        let nodes = vec![
            ResourceNode::descriptor(ResourceNodeKind::Buffer, 0, 0, 0, 4),
            ResourceNode::descriptor(ResourceNodeKind::Buffer, 0, 1, 4, 4),
            ResourceNode::push_constant(8, 2),
            // Not counted toward spillable demand.
            ResourceNode::indirect_user_data(10),
        ];
        let usage = ResourceUsage {
            desc_pairs: [DescriptorPair::new(0, 1)].into_iter().collect(),
            push_const_size_in_bytes: 8,
            ..Default::default()
        };
        let st = state(&nodes, 9);
        let cx = context(
            &st,
            ShaderStage::Vertex,
            StageMask::VERTEX | StageMask::FRAGMENT,
            &usage,
        );
        let scan = scan_root_nodes(&cx, &ActivityQuery::new(&usage, None));

        assert_eq!(scan.required_user_data, 10); // push const at 8 + 2
        assert_eq!(scan.required_remapped_user_data, 6); // 4 + 2
        assert_eq!(scan.push_const_node, Some(2));
    }
}
