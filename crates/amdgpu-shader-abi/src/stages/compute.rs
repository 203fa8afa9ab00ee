//! Compute ABI rules.

use super::StageAbiRules;
use crate::budget::{BudgetPlan, NodeScan};
use crate::context::StageContext;
use crate::error::AbiError;
use crate::interface::{AbiArgType, InterfaceData, SignatureBuilder, StageArgs};
use crate::resources::BuiltInUsage;
use crate::stage::ShaderStage;

pub(super) struct ComputeRules;

impl StageAbiRules for ComputeRules {
    fn stage(&self) -> ShaderStage {
        ShaderStage::Compute
    }

    fn reserve_user_data(&self, cx: &StageContext<'_>, _scan: &NodeScan, plan: &mut BudgetPlan) {
        // Implicit workgroup count is emulated through a two-dword pointer.
        if cx.usage.builtins.contains(BuiltInUsage::NUM_WORKGROUPS) {
            plan.reserve(2);
        }
    }

    fn emit_special_user_data(
        &self,
        cx: &StageContext<'_>,
        _plan: &BudgetPlan,
        sig: &mut SignatureBuilder,
        intf: &mut InterfaceData,
    ) -> Result<(), AbiError> {
        let StageArgs::Compute(mut cs) = intf.args else {
            return Err(AbiError::StageArgsMismatch { stage: self.stage() });
        };

        if cx.usage.builtins.contains(BuiltInUsage::NUM_WORKGROUPS) {
            // The pointer must start on an even slot; pad with one dummy
            // user-data argument when the running index is odd.
            if sig.user_data_idx % 2 != 0 {
                sig.push_user_data(AbiArgType::Int32)?;
            }
            let (arg, slot) = sig.push_user_data(AbiArgType::ConstPtrInt32Vec3)?;
            cs.num_workgroups_ptr = Some(arg);
            intf.user_data_slots.num_workgroups_ptr = Some(slot);
        }

        intf.args = StageArgs::Compute(cs);
        Ok(())
    }

    fn emit_system_values(
        &self,
        _cx: &StageContext<'_>,
        sig: &mut SignatureBuilder,
        intf: &mut InterfaceData,
    ) -> Result<(), AbiError> {
        let StageArgs::Compute(mut cs) = intf.args else {
            return Err(AbiError::StageArgsMismatch { stage: self.stage() });
        };

        cs.workgroup_id = Some(sig.push_sgpr(AbiArgType::Int32Vec(3))?);
        // Multi-dispatch info (thread-group size and friends); no consumer
        // indexes it.
        sig.push_sgpr(AbiArgType::Int32)?;
        cs.local_invocation_id = Some(sig.push_vgpr(AbiArgType::Int32Vec(3)));

        intf.args = StageArgs::Compute(cs);
        Ok(())
    }
}
