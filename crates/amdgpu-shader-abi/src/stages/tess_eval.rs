//! Tess-eval ABI rules.

use super::StageAbiRules;
use crate::budget::{BudgetPlan, NodeScan};
use crate::context::StageContext;
use crate::error::AbiError;
use crate::interface::{AbiArgType, InterfaceData, SignatureBuilder, StageArgs};
use crate::resources::MAX_TRANSFORM_FEEDBACK_BUFFERS;
use crate::stage::ShaderStage;

pub(super) struct TessEvalRules;

impl StageAbiRules for TessEvalRules {
    fn stage(&self) -> ShaderStage {
        ShaderStage::TessEval
    }

    fn reserve_user_data(&self, cx: &StageContext<'_>, scan: &NodeScan, plan: &mut BudgetPlan) {
        if cx.state.enable_multi_view {
            plan.reserve(1);
        }
        if scan.reserve_stream_out {
            plan.reserve(1);
        }
        // Tess-eval fronts the primitive shader, which carries the dummy
        // ES-GS LDS-size slot.
        if cx.state.enable_ngg {
            plan.reserve(1);
            plan.reserve_es_gs_lds_size = true;
        }
    }

    fn record_stream_out_slot(
        &self,
        intf: &mut InterfaceData,
        arg: u32,
        slot: u32,
    ) -> Result<(), AbiError> {
        let StageArgs::TessEval(tes) = &mut intf.args else {
            return Err(AbiError::StageArgsMismatch { stage: self.stage() });
        };
        tes.stream_out.table_ptr = Some(arg);
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
        let StageArgs::TessEval(mut tes) = intf.args else {
            return Err(AbiError::StageArgsMismatch { stage: self.stage() });
        };

        // View index first, so merged shaders agree on its position.
        if cx.state.enable_multi_view {
            let (arg, slot) = sig.push_user_data(AbiArgType::Int32)?;
            tes.view_index = Some(arg);
            intf.user_data_slots.view_index = Some(slot);
        }
        if plan.reserve_es_gs_lds_size {
            let (_, slot) = sig.push_user_data(AbiArgType::Int32)?;
            intf.user_data_slots.es_gs_lds_size = Some(slot);
        }

        intf.args = StageArgs::TessEval(tes);
        Ok(())
    }

    fn emit_system_values(
        &self,
        cx: &StageContext<'_>,
        sig: &mut SignatureBuilder,
        intf: &mut InterfaceData,
    ) -> Result<(), AbiError> {
        let StageArgs::TessEval(mut tes) = intf.args else {
            return Err(AbiError::StageArgsMismatch { stage: self.stage() });
        };

        if cx.has_geometry() {
            // Acting as hardware ES.
            if cx.state.tess_off_chip {
                tes.off_chip_lds_base = Some(sig.push_sgpr(AbiArgType::Int32)?);
                // Off-chip enablement flag; no consumer indexes it.
                sig.push_sgpr(AbiArgType::Int32)?;
            }
            tes.es_gs_offset = Some(sig.push_sgpr(AbiArgType::Int32)?);
        } else {
            // Acting as hardware VS. The hardware provides a leading
            // stream-info dword whenever off-chip tessellation or stream-out
            // is on; with stream-out on, the stream-out block carries its own
            // copy and that later one is the consumed index.
            if cx.state.tess_off_chip || cx.usage.enable_xfb {
                tes.stream_out.stream_info = Some(sig.push_sgpr(AbiArgType::Int32)?);
            }
            if cx.usage.enable_xfb {
                tes.stream_out.stream_info = Some(sig.push_sgpr(AbiArgType::Int32)?);
                tes.stream_out.write_index = Some(sig.push_sgpr(AbiArgType::Int32)?);
                for i in 0..MAX_TRANSFORM_FEEDBACK_BUFFERS {
                    if cx.usage.xfb_strides[i] > 0 {
                        tes.stream_out.stream_offsets[i] =
                            Some(sig.push_sgpr(AbiArgType::Int32)?);
                    }
                }
            }
            if cx.state.tess_off_chip {
                tes.off_chip_lds_base = Some(sig.push_sgpr(AbiArgType::Int32)?);
            }
        }

        tes.tess_coord_x = Some(sig.push_vgpr(AbiArgType::Float));
        tes.tess_coord_y = Some(sig.push_vgpr(AbiArgType::Float));
        tes.rel_patch_id = Some(sig.push_vgpr(AbiArgType::Int32));
        tes.patch_id = Some(sig.push_vgpr(AbiArgType::Int32));

        intf.args = StageArgs::TessEval(tes);
        Ok(())
    }
}
