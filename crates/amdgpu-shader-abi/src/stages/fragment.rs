//! Fragment ABI rules.
//!
//! The fragment stage reserves nothing and has no special user data; its
//! system-value tail is a fixed list the hardware always provides, with the
//! enable word derived separately from actual built-in usage.

use super::StageAbiRules;
use crate::budget::{BudgetPlan, NodeScan};
use crate::context::StageContext;
use crate::error::AbiError;
use crate::interface::{AbiArgType, InterfaceData, PsInputAddr, SignatureBuilder, StageArgs};
use crate::stage::ShaderStage;

pub(super) struct FragmentRules;

impl StageAbiRules for FragmentRules {
    fn stage(&self) -> ShaderStage {
        ShaderStage::Fragment
    }

    fn reserve_user_data(&self, _cx: &StageContext<'_>, _scan: &NodeScan, _plan: &mut BudgetPlan) {}

    fn emit_special_user_data(
        &self,
        _cx: &StageContext<'_>,
        _plan: &BudgetPlan,
        _sig: &mut SignatureBuilder,
        _intf: &mut InterfaceData,
    ) -> Result<(), AbiError> {
        Ok(())
    }

    fn emit_system_values(
        &self,
        cx: &StageContext<'_>,
        sig: &mut SignatureBuilder,
        intf: &mut InterfaceData,
    ) -> Result<(), AbiError> {
        let StageArgs::Fragment(mut fs) = intf.args else {
            return Err(AbiError::StageArgsMismatch { stage: self.stage() });
        };

        fs.input_addr = PsInputAddr::from_builtins(cx.usage.builtins);

        fs.prim_mask = Some(sig.push_sgpr(AbiArgType::Int32)?);

        fs.persp_sample = Some(sig.push_vgpr(AbiArgType::FloatVec(2)));
        fs.persp_center = Some(sig.push_vgpr(AbiArgType::FloatVec(2)));
        fs.persp_centroid = Some(sig.push_vgpr(AbiArgType::FloatVec(2)));
        fs.persp_pull_mode = Some(sig.push_vgpr(AbiArgType::FloatVec(3)));
        fs.linear_sample = Some(sig.push_vgpr(AbiArgType::FloatVec(2)));
        fs.linear_center = Some(sig.push_vgpr(AbiArgType::FloatVec(2)));
        fs.linear_centroid = Some(sig.push_vgpr(AbiArgType::FloatVec(2)));

        // Line stipple; no consumer indexes it.
        sig.push_vgpr(AbiArgType::Float);

        for coord in fs.frag_coord.iter_mut() {
            *coord = Some(sig.push_vgpr(AbiArgType::Float));
        }

        fs.front_facing = Some(sig.push_vgpr(AbiArgType::Int32));
        fs.ancillary = Some(sig.push_vgpr(AbiArgType::Int32));
        fs.sample_coverage = Some(sig.push_vgpr(AbiArgType::Int32));

        // Fixed-point position; no consumer indexes it.
        sig.push_vgpr(AbiArgType::Int32);

        intf.args = StageArgs::Fragment(fs);
        Ok(())
    }
}
