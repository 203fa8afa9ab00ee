//! Per-stage ABI rules.
//!
//! Each shader stage has exactly one handler implementing its reserved-slot
//! accounting, its special user-data arguments, and its system-value tail.
//! The emission order inside each handler is fixed; downstream lowering
//! indexes entry arguments positionally.

mod compute;
mod fragment;
mod geometry;
mod tess_eval;
mod vertex;

use crate::budget::{BudgetPlan, NodeScan};
use crate::context::StageContext;
use crate::error::AbiError;
use crate::interface::{InterfaceData, SignatureBuilder};
use crate::stage::ShaderStage;

pub(crate) trait StageAbiRules {
    fn stage(&self) -> ShaderStage;

    /// Subtracts this stage's reserved slots from the packing budget and
    /// decides the ES-GS LDS-size dummy reservation.
    fn reserve_user_data(&self, cx: &StageContext<'_>, scan: &NodeScan, plan: &mut BudgetPlan);

    /// Records the stream-out table pointer slot just allocated by the
    /// packer. Stages without a stream-out slot reject this.
    fn record_stream_out_slot(
        &self,
        intf: &mut InterfaceData,
        arg: u32,
        slot: u32,
    ) -> Result<(), AbiError> {
        let _ = (intf, arg, slot);
        Err(AbiError::UnexpectedStreamOutStage { stage: self.stage() })
    }

    /// Emits the stage's special user-data arguments, in fixed order.
    fn emit_special_user_data(
        &self,
        cx: &StageContext<'_>,
        plan: &BudgetPlan,
        sig: &mut SignatureBuilder,
        intf: &mut InterfaceData,
    ) -> Result<(), AbiError>;

    /// Emits the stage's system-value arguments, after all user data.
    fn emit_system_values(
        &self,
        cx: &StageContext<'_>,
        sig: &mut SignatureBuilder,
        intf: &mut InterfaceData,
    ) -> Result<(), AbiError>;
}

pub(crate) fn stage_rules(stage: ShaderStage) -> &'static dyn StageAbiRules {
    match stage {
        ShaderStage::Vertex => &vertex::VertexRules,
        ShaderStage::TessControl => &vertex::TessControlRules,
        ShaderStage::TessEval => &tess_eval::TessEvalRules,
        ShaderStage::Geometry => &geometry::GeometryRules,
        ShaderStage::Fragment => &fragment::FragmentRules,
        ShaderStage::Compute => &compute::ComputeRules,
    }
}
