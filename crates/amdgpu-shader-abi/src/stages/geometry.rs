//! Geometry ABI rules.

use super::StageAbiRules;
use crate::budget::{BudgetPlan, NodeScan};
use crate::context::StageContext;
use crate::error::AbiError;
use crate::interface::{AbiArgType, InterfaceData, SignatureBuilder, StageArgs};
use crate::stage::ShaderStage;

pub(super) struct GeometryRules;

impl StageAbiRules for GeometryRules {
    fn stage(&self) -> ShaderStage {
        ShaderStage::Geometry
    }

    fn reserve_user_data(&self, cx: &StageContext<'_>, _scan: &NodeScan, plan: &mut BudgetPlan) {
        if cx.state.enable_multi_view {
            plan.reserve(1);
        }
        let gs_on_chip = cx.state.gs_on_chip && cx.state.options.inreg_es_gs_lds_size;
        if gs_on_chip || cx.state.enable_ngg {
            plan.reserve(1);
            plan.reserve_es_gs_lds_size = true;
        }
    }

    // Geometry gets a dummy stream-out slot so the merged pair's layouts
    // agree; nothing downstream indexes it.
    fn record_stream_out_slot(
        &self,
        _intf: &mut InterfaceData,
        _arg: u32,
        _slot: u32,
    ) -> Result<(), AbiError> {
        Ok(())
    }

    fn emit_special_user_data(
        &self,
        cx: &StageContext<'_>,
        plan: &BudgetPlan,
        sig: &mut SignatureBuilder,
        intf: &mut InterfaceData,
    ) -> Result<(), AbiError> {
        let StageArgs::Geometry(mut gs) = intf.args else {
            return Err(AbiError::StageArgsMismatch { stage: self.stage() });
        };

        if cx.state.enable_multi_view {
            let (arg, slot) = sig.push_user_data(AbiArgType::Int32)?;
            gs.view_index = Some(arg);
            intf.user_data_slots.view_index = Some(slot);
        }
        if plan.reserve_es_gs_lds_size {
            let (_, slot) = sig.push_user_data(AbiArgType::Int32)?;
            intf.user_data_slots.es_gs_lds_size = Some(slot);
        }

        intf.args = StageArgs::Geometry(gs);
        Ok(())
    }

    fn emit_system_values(
        &self,
        _cx: &StageContext<'_>,
        sig: &mut SignatureBuilder,
        intf: &mut InterfaceData,
    ) -> Result<(), AbiError> {
        let StageArgs::Geometry(mut gs) = intf.args else {
            return Err(AbiError::StageArgsMismatch { stage: self.stage() });
        };

        gs.gs_vs_offset = Some(sig.push_sgpr(AbiArgType::Int32)?);
        gs.wave_id = Some(sig.push_sgpr(AbiArgType::Int32)?);

        // Fixed hardware order: offsets for vertices 0-1, primitive ID,
        // offsets for vertices 2-5, invocation ID.
        gs.es_gs_offsets[0] = Some(sig.push_vgpr(AbiArgType::Int32));
        gs.es_gs_offsets[1] = Some(sig.push_vgpr(AbiArgType::Int32));
        gs.primitive_id = Some(sig.push_vgpr(AbiArgType::Int32));
        gs.es_gs_offsets[2] = Some(sig.push_vgpr(AbiArgType::Int32));
        gs.es_gs_offsets[3] = Some(sig.push_vgpr(AbiArgType::Int32));
        gs.es_gs_offsets[4] = Some(sig.push_vgpr(AbiArgType::Int32));
        gs.es_gs_offsets[5] = Some(sig.push_vgpr(AbiArgType::Int32));
        gs.invocation_id = Some(sig.push_vgpr(AbiArgType::Int32));

        intf.args = StageArgs::Geometry(gs);
        Ok(())
    }
}
