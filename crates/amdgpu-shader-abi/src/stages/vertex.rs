//! Vertex and tess-control ABI rules.
//!
//! On merged-stage generations the vertex shader runs inside the LS-HS (or
//! ES-GS) invocation, so tess-control shares the vertex stage's reserved-slot
//! and special user-data rules, keyed off the vertex shader's built-in flags.

use super::StageAbiRules;
use crate::budget::{BudgetPlan, NodeScan};
use crate::context::StageContext;
use crate::error::AbiError;
use crate::interface::{
    AbiArgType, InterfaceData, SignatureBuilder, StageArgs, VertexSpecialArgs,
};
use crate::resources::{BuiltInUsage, ResourceNodeKind, MAX_TRANSFORM_FEEDBACK_BUFFERS};
use crate::stage::ShaderStage;

pub(super) struct VertexRules;
pub(super) struct TessControlRules;

fn reserve_vs_tcs(cx: &StageContext<'_>, scan: &NodeScan, plan: &mut BudgetPlan) {
    if cx.state.enable_multi_view {
        plan.reserve(1);
    }
    if scan.reserve_vb_table {
        plan.reserve(1);
    }
    if scan.reserve_stream_out {
        plan.reserve(1);
    }

    // The merged LS-HS pair must agree on user-data layout, so tess-control
    // keys these off the vertex shader's flags.
    let vertex_usage = cx.vertex_flags_usage();
    if vertex_usage
        .builtins
        .intersects(BuiltInUsage::BASE_VERTEX | BuiltInUsage::BASE_INSTANCE)
    {
        plan.reserve(2);
    }
    if vertex_usage.builtins.contains(BuiltInUsage::DRAW_INDEX) {
        plan.reserve(1);
    }

    // Dummy ES-GS LDS-size slot: GS on-chip on merged generations, or the
    // primitive-shader path when the vertex shader is its front end.
    let merged_gs_on_chip = cx.state.gfx_ip.has_merged_stages()
        && cx.state.gs_on_chip
        && cx.state.options.inreg_es_gs_lds_size;
    let prim_shader_front_end = cx.state.enable_ngg && !cx.has_tessellation();
    if merged_gs_on_chip || prim_shader_front_end {
        plan.reserve(1);
        plan.reserve_es_gs_lds_size = true;
    }
}

/// Special user data shared by the vertex / tess-control pair: view index,
/// ES-GS LDS size, vertex-buffer table pointer, base vertex + base instance,
/// draw index. The order is fixed; the view index comes first so merged
/// shaders agree on its position.
fn emit_special_vs_tcs(
    cx: &StageContext<'_>,
    plan: &BudgetPlan,
    sig: &mut SignatureBuilder,
    intf: &mut InterfaceData,
    special: &mut VertexSpecialArgs,
) -> Result<(), AbiError> {
    if cx.state.enable_multi_view {
        let (arg, slot) = sig.push_user_data(AbiArgType::Int32)?;
        special.view_index = Some(arg);
        intf.user_data_slots.view_index = Some(slot);
    }

    if plan.reserve_es_gs_lds_size {
        let (_, slot) = sig.push_user_data(AbiArgType::Int32)?;
        intf.user_data_slots.es_gs_lds_size = Some(slot);
    }

    if cx
        .state
        .user_data_nodes
        .iter()
        .any(|node| node.kind == ResourceNodeKind::IndirectUserDataPtr)
    {
        let (arg, slot) = sig.push_user_data(AbiArgType::Int32)?;
        special.vb_table_ptr = Some(arg);
        intf.user_data_slots.vb_table_ptr = Some(slot);
    }

    let vertex_usage = cx.vertex_flags_usage();
    if vertex_usage
        .builtins
        .intersects(BuiltInUsage::BASE_VERTEX | BuiltInUsage::BASE_INSTANCE)
    {
        let (arg, slot) = sig.push_user_data(AbiArgType::Int32)?;
        special.base_vertex = Some(arg);
        intf.user_data_slots.base_vertex = Some(slot);

        let (arg, slot) = sig.push_user_data(AbiArgType::Int32)?;
        special.base_instance = Some(arg);
        intf.user_data_slots.base_instance = Some(slot);
    }

    if vertex_usage.builtins.contains(BuiltInUsage::DRAW_INDEX) {
        let (arg, slot) = sig.push_user_data(AbiArgType::Int32)?;
        special.draw_index = Some(arg);
        intf.user_data_slots.draw_index = Some(slot);
    }
    Ok(())
}

impl StageAbiRules for VertexRules {
    fn stage(&self) -> ShaderStage {
        ShaderStage::Vertex
    }

    fn reserve_user_data(&self, cx: &StageContext<'_>, scan: &NodeScan, plan: &mut BudgetPlan) {
        reserve_vs_tcs(cx, scan, plan);
    }

    fn record_stream_out_slot(
        &self,
        intf: &mut InterfaceData,
        arg: u32,
        slot: u32,
    ) -> Result<(), AbiError> {
        let StageArgs::Vertex(vs) = &mut intf.args else {
            return Err(AbiError::StageArgsMismatch { stage: self.stage() });
        };
        vs.stream_out.table_ptr = Some(arg);
        intf.user_data_slots.stream_out_table_ptr = Some(slot);
        Ok(())
    }

    fn emit_special_user_data(
        &self,
        cx: &StageContext<'_>,
        plan: &BudgetPlan,
        sig: &mut SignatureBuilder,
        intf: &mut InterfaceData,
    ) -> Result<(), AbiError> {
        let StageArgs::Vertex(mut vs) = intf.args else {
            return Err(AbiError::StageArgsMismatch { stage: self.stage() });
        };
        emit_special_vs_tcs(cx, plan, sig, intf, &mut vs.special)?;
        intf.args = StageArgs::Vertex(vs);
        Ok(())
    }

    fn emit_system_values(
        &self,
        cx: &StageContext<'_>,
        sig: &mut SignatureBuilder,
        intf: &mut InterfaceData,
    ) -> Result<(), AbiError> {
        let StageArgs::Vertex(mut vs) = intf.args else {
            return Err(AbiError::StageArgsMismatch { stage: self.stage() });
        };

        if cx.has_geometry() && !cx.has_tessellation() {
            // Acting as hardware ES.
            vs.es_gs_offset = Some(sig.push_sgpr(AbiArgType::Int32)?);
        } else if !cx.has_geometry() && !cx.has_tessellation() && cx.usage.enable_xfb {
            // Acting as hardware VS with stream-out.
            vs.stream_out.stream_info = Some(sig.push_sgpr(AbiArgType::Int32)?);
            vs.stream_out.write_index = Some(sig.push_sgpr(AbiArgType::Int32)?);
            for i in 0..MAX_TRANSFORM_FEEDBACK_BUFFERS {
                if cx.usage.xfb_strides[i] > 0 {
                    vs.stream_out.stream_offsets[i] = Some(sig.push_sgpr(AbiArgType::Int32)?);
                }
            }
        }

        // Argument order mirrors default-parameter rules:
        // vertex ID [, relative vertex ID, primitive ID [, instance ID]].
        // Tess-control always consumes the relative vertex ID, so feed it
        // whenever it is the next stage.
        let feeds_tess_control = cx.stage_mask.contains_stage(ShaderStage::TessControl);
        let builtins = cx.usage.builtins;

        if builtins.intersects(
            BuiltInUsage::VERTEX_INDEX | BuiltInUsage::PRIMITIVE_ID | BuiltInUsage::INSTANCE_INDEX,
        ) || feeds_tess_control
        {
            vs.vertex_id = Some(sig.push_vgpr(AbiArgType::Int32));
        }
        if builtins.intersects(BuiltInUsage::PRIMITIVE_ID | BuiltInUsage::INSTANCE_INDEX)
            || feeds_tess_control
        {
            vs.rel_vertex_id = Some(sig.push_vgpr(AbiArgType::Int32));
            vs.primitive_id = Some(sig.push_vgpr(AbiArgType::Int32));
        }
        if builtins.contains(BuiltInUsage::INSTANCE_INDEX) {
            vs.instance_id = Some(sig.push_vgpr(AbiArgType::Int32));
        }

        intf.args = StageArgs::Vertex(vs);
        Ok(())
    }
}

impl StageAbiRules for TessControlRules {
    fn stage(&self) -> ShaderStage {
        ShaderStage::TessControl
    }

    fn reserve_user_data(&self, cx: &StageContext<'_>, scan: &NodeScan, plan: &mut BudgetPlan) {
        reserve_vs_tcs(cx, scan, plan);
    }

    fn emit_special_user_data(
        &self,
        cx: &StageContext<'_>,
        plan: &BudgetPlan,
        sig: &mut SignatureBuilder,
        intf: &mut InterfaceData,
    ) -> Result<(), AbiError> {
        let StageArgs::TessControl(mut tcs) = intf.args else {
            return Err(AbiError::StageArgsMismatch { stage: self.stage() });
        };
        emit_special_vs_tcs(cx, plan, sig, intf, &mut tcs.special)?;
        intf.args = StageArgs::TessControl(tcs);
        Ok(())
    }

    fn emit_system_values(
        &self,
        cx: &StageContext<'_>,
        sig: &mut SignatureBuilder,
        intf: &mut InterfaceData,
    ) -> Result<(), AbiError> {
        let StageArgs::TessControl(mut tcs) = intf.args else {
            return Err(AbiError::StageArgsMismatch { stage: self.stage() });
        };

        if cx.state.tess_off_chip {
            tcs.off_chip_lds_base = Some(sig.push_sgpr(AbiArgType::Int32)?);
        }
        tcs.tf_buffer_base = Some(sig.push_sgpr(AbiArgType::Int32)?);
        tcs.patch_id = Some(sig.push_vgpr(AbiArgType::Int32));
        tcs.rel_patch_id = Some(sig.push_vgpr(AbiArgType::Int32));

        intf.args = StageArgs::TessControl(tcs);
        Ok(())
    }
}
