//! User-data packing, spill decision, and entry-signature assembly.
//!
//! The argument order is load-bearing: leading internal tables, the
//! stream-out reservation, packed descriptor arguments, stage-specific
//! special user data, the spill-table pointer, then system values. Later
//! lowering indexes arguments positionally through [`InterfaceData`].

use tracing::debug;

use crate::activity::ActivityQuery;
use crate::budget::{scan_root_nodes, BudgetPlan};
use crate::context::StageContext;
use crate::error::AbiError;
use crate::interface::{
    AbiArgType, EntryPointSignature, InterfaceData, RootNodePlacement, SignatureBuilder,
    SpillTable,
};
use crate::resources::ResourceNodeKind;
use crate::stages::stage_rules;

/// Builds the entry-point signature and interface data for one stage.
pub(crate) fn generate_entry_point(
    cx: &StageContext<'_>,
) -> Result<(EntryPointSignature, InterfaceData), AbiError> {
    let rules = stage_rules(cx.stage);
    let nodes = cx.state.user_data_nodes;

    let mut sig = SignatureBuilder::new();
    let mut intf = InterfaceData::new(cx.stage, nodes.len());

    // Global internal table, then the per-shader internal table.
    sig.push_user_data(AbiArgType::Int32)?;
    sig.push_user_data(AbiArgType::Int32)?;

    let activity = ActivityQuery::new(cx.usage, cx.companion_usage);
    let scan = scan_root_nodes(cx, &activity);
    intf.push_const_node = scan.push_const_node;

    let mut plan = BudgetPlan::new(
        cx.stage,
        cx.state
            .props
            .max_user_data_count
            .saturating_sub(sig.user_data_idx),
    );
    rules.reserve_user_data(cx, &scan, &mut plan);

    if plan.use_fixed_layout {
        plan.need_spill = scan.required_user_data > InterfaceData::MAX_CS_USER_DATA;
        plan.avail_user_data = InterfaceData::MAX_CS_USER_DATA;
    } else {
        plan.need_spill = scan.required_remapped_user_data > plan.avail_user_data;
        if plan.need_spill {
            // The spill-table pointer itself needs a slot; the reservation
            // must be in place before packing starts.
            plan.reserve(1);
        }
    }

    debug!(
        stage = cx.stage.name(),
        avail = plan.avail_user_data,
        required = scan.required_remapped_user_data,
        spill = plan.need_spill,
        "planning user data"
    );

    // Stream-out table pointer, ahead of general packing.
    if scan.reserve_stream_out
        && nodes
            .iter()
            .any(|node| node.kind == ResourceNodeKind::StreamOutTablePtr)
    {
        let (arg, slot) = sig.push_user_data(AbiArgType::Int32)?;
        rules.record_stream_out_slot(&mut intf, arg, slot)?;
    }

    // Greedy in-order packing; compute instead walks the declared offsets,
    // padding with dummy arguments so slot index equals declared offset.
    let mut spill_base: Option<u32> = None;
    let mut packed_dwords = 0u32;

    for (index, node) in nodes.iter().enumerate() {
        // System-managed tables are placed separately and never count
        // against the spillable budget.
        if matches!(
            node.kind,
            ResourceNodeKind::IndirectUserDataPtr | ResourceNodeKind::StreamOutTablePtr
        ) {
            continue;
        }
        if !activity.is_active(node, true) {
            continue;
        }

        if plan.use_fixed_layout {
            let target = node.offset_in_dwords + InterfaceData::CS_START_USER_DATA;
            let bound = plan.avail_user_data + InterfaceData::CS_START_USER_DATA;
            while sig.user_data_idx < target && sig.user_data_idx < bound {
                sig.push_user_data(AbiArgType::Int32)?;
                packed_dwords += 1;
            }
        }

        if packed_dwords + node.size_in_dwords <= plan.avail_user_data {
            let arg = match node.kind {
                ResourceNodeKind::DescriptorTablePtr => {
                    let (arg, slot) = sig.push_user_data(AbiArgType::Int32)?;
                    intf.user_data_map.insert(slot, node.offset_in_dwords);
                    arg
                }
                ResourceNodeKind::PushConstant
                | ResourceNodeKind::Resource
                | ResourceNodeKind::Sampler
                | ResourceNodeKind::TexelBuffer
                | ResourceNodeKind::Buffer
                | ResourceNodeKind::BufferCompact
                | ResourceNodeKind::CombinedResourceSampler => {
                    let (arg, slot) =
                        sig.push_user_data(AbiArgType::Int32Vec(node.size_in_dwords))?;
                    for word in 0..node.size_in_dwords {
                        intf.user_data_map
                            .insert(slot + word, node.offset_in_dwords + word);
                    }
                    arg
                }
                ResourceNodeKind::IndirectUserDataPtr | ResourceNodeKind::StreamOutTablePtr => {
                    return Err(AbiError::UnexpectedNodeKind {
                        stage: cx.stage,
                        kind: node.kind,
                    });
                }
            };
            intf.root_node_placements[index] =
                Some(RootNodePlacement::InRegister { arg_index: arg });
            packed_dwords += node.size_in_dwords;
        } else {
            // A node larger than the remaining budget spills in its
            // entirety; it is never split. The earliest overflowing node's
            // declared offset fixes the spill base.
            intf.root_node_placements[index] = Some(RootNodePlacement::Spilled);
            if plan.need_spill && spill_base.is_none() {
                spill_base = Some(node.offset_in_dwords);
                debug!(
                    stage = cx.stage.name(),
                    node = index,
                    offset = node.offset_in_dwords,
                    "spilling user data from this node on"
                );
            }
        }
    }

    // Fixed layout appends the spill-table pointer at the end of the fixed
    // range, padding any gap before it.
    if plan.need_spill && plan.use_fixed_layout {
        let base = spill_base.ok_or(AbiError::MissingSpillBase)?;
        let end = InterfaceData::MAX_CS_USER_DATA + InterfaceData::CS_START_USER_DATA;
        while sig.user_data_idx <= end {
            sig.push_user_data(AbiArgType::Int32)?;
        }
        intf.user_data_slots.spill_table = Some(sig.user_data_idx - 1);
        intf.spill_table_arg = Some(sig.arg_count() - 1);
        intf.spill_table = Some(SpillTable {
            offset_in_dwords: base,
            size_in_dwords: scan.required_user_data,
        });
    }

    rules.emit_special_user_data(cx, &plan, &mut sig, &mut intf)?;

    if plan.need_spill && !plan.use_fixed_layout {
        let base = spill_base.ok_or(AbiError::MissingSpillBase)?;
        let (arg, slot) = sig.push_user_data(AbiArgType::Int32)?;
        intf.user_data_slots.spill_table = Some(slot);
        intf.spill_table_arg = Some(arg);
        intf.spill_table = Some(SpillTable {
            offset_in_dwords: base,
            size_in_dwords: scan.required_user_data,
        });
    }

    intf.user_data_count = sig.user_data_idx;

    rules.emit_system_values(cx, &mut sig, &mut intf)?;

    Ok((sig.finish(), intf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GfxIpVersion, GpuProperties, PipelineOptions, PipelineState};
    use crate::resources::{DescriptorPair, ResourceNode, ResourceNodeKind, ResourceUsage};
    use crate::stage::{ShaderStage, StageMask};

    fn props(max_user_data: u32) -> GpuProperties {
        GpuProperties {
            max_user_data_count: max_user_data,
            max_vgprs_available: 256,
            max_sgprs_available: 104,
        }
    }

    fn state<'a>(nodes: &'a [ResourceNode], max_user_data: u32) -> PipelineState<'a> {
        PipelineState {
            gfx_ip: GfxIpVersion::new(9, 0),
            props: props(max_user_data),
            options: PipelineOptions::default(),
            user_data_nodes: nodes,
            enable_multi_view: false,
            gs_on_chip: false,
            tess_off_chip: false,
            enable_ngg: false,
        }
    }

    fn vertex_cx<'a>(
        state: &'a PipelineState<'a>,
        usage: &'a ResourceUsage,
    ) -> StageContext<'a> {
        StageContext {
            state,
            stage: ShaderStage::Vertex,
            stage_mask: StageMask::VERTEX | StageMask::FRAGMENT,
            usage,
            companion_usage: None,
            merged_vertex_usage: None,
        }
    }

    fn usage_referencing(pairs: &[(u32, u32)]) -> ResourceUsage {
        ResourceUsage {
            desc_pairs: pairs
                .iter()
                .map(|&(set, binding)| DescriptorPair::new(set, binding))
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn packing_preserves_declaration_order() {
        let nodes = vec![
            ResourceNode::descriptor(ResourceNodeKind::Buffer, 0, 0, 0, 2),
            ResourceNode::table(2, vec![ResourceNode::descriptor(ResourceNodeKind::Sampler, 1, 0, 0, 4)]),
            ResourceNode::descriptor(ResourceNodeKind::Buffer, 0, 1, 3, 2),
        ];
        let st = state(&nodes, 32);
        let usage = usage_referencing(&[(0, 0), (1, 0), (0, 1)]);
        let cx = vertex_cx(&st, &usage);

        let (_, intf) = generate_entry_point(&cx).unwrap();
        let args: Vec<u32> = intf
            .root_node_placements
            .iter()
            .map(|p| match p {
                Some(RootNodePlacement::InRegister { arg_index }) => *arg_index,
                other => panic!("expected in-register placement, got {other:?}"),
            })
            .collect();
        assert!(args.windows(2).all(|w| w[0] < w[1]));
        assert!(intf.spill_table.is_none());
    }

    #[test]
    fn oversized_node_spills_entirely() {
        // Budget after the two leading slots: 4, minus one for the spill
        // pointer once overflow is detected.
        let nodes = vec![
            ResourceNode::descriptor(ResourceNodeKind::Buffer, 0, 0, 0, 2),
            ResourceNode::descriptor(ResourceNodeKind::Resource, 0, 1, 2, 8),
        ];
        let st = state(&nodes, 6);
        let usage = usage_referencing(&[(0, 0), (0, 1)]);
        let cx = vertex_cx(&st, &usage);

        let (_, intf) = generate_entry_point(&cx).unwrap();
        assert!(matches!(
            intf.root_node_placements[0],
            Some(RootNodePlacement::InRegister { .. })
        ));
        // Not partially packed: the whole node lives in the spill table.
        assert_eq!(intf.root_node_placements[1], Some(RootNodePlacement::Spilled));
        assert_eq!(
            intf.spill_table,
            Some(SpillTable {
                offset_in_dwords: 2,
                size_in_dwords: 10,
            })
        );
    }

    #[test]
    fn table_pointer_maps_its_slot_to_the_declared_offset() {
        let nodes = vec![ResourceNode::table(
            7,
            vec![ResourceNode::descriptor(ResourceNodeKind::Sampler, 0, 0, 0, 4)],
        )];
        let st = state(&nodes, 32);
        let usage = usage_referencing(&[(0, 0)]);
        let cx = vertex_cx(&st, &usage);

        let (sig, intf) = generate_entry_point(&cx).unwrap();
        // Slot 2 (after the leading internal tables) carries logical dword 7.
        assert_eq!(intf.user_data_map.get(&2), Some(&7));
        assert_eq!(sig.args[2], AbiArgType::Int32);
    }

    #[test]
    fn reserved_flags_never_increase_packed_nodes() {
        let nodes = vec![
            ResourceNode::descriptor(ResourceNodeKind::Buffer, 0, 0, 0, 3),
            ResourceNode::descriptor(ResourceNodeKind::Buffer, 0, 1, 3, 3),
        ];
        let usage = usage_referencing(&[(0, 0), (0, 1)]);

        let packed_count = |st: &PipelineState<'_>| {
            let cx = vertex_cx(st, &usage);
            let (_, intf) = generate_entry_point(&cx).unwrap();
            intf.root_node_placements
                .iter()
                .filter(|p| matches!(p, Some(RootNodePlacement::InRegister { .. })))
                .count()
        };

        let plain = state(&nodes, 9);
        let mut with_view = state(&nodes, 9);
        with_view.enable_multi_view = true;

        assert!(packed_count(&with_view) <= packed_count(&plain));
    }
}
