//! Per-pipeline driver: processes each present stage in the fixed order and
//! produces the stage ABIs.

use tracing::debug;

use crate::config::{clamp_available_registers, resolve_tuning, PipelineState};
use crate::context::StageContext;
use crate::error::AbiError;
use crate::interface::{EntryPointSignature, InterfaceData, ShaderTuning};
use crate::layout::generate_entry_point;
use crate::resources::{validate_root_nodes, ResourceUsage};
use crate::stage::{merge_companion, PerStage, ShaderStage, StageMask};

/// One stage's input: its resource-usage record and tuning options.
#[derive(Debug, Clone, Default)]
pub struct ShaderStageInfo {
    pub usage: ResourceUsage,
    pub options: crate::config::ShaderOptions,
}

/// One stage's finalized ABI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageAbi {
    pub interface: InterfaceData,
    pub signature: EntryPointSignature,
    /// The stage's usage record with available register counts clamped to
    /// the resolved limits and device maxima.
    pub usage: ResourceUsage,
}

/// Finalized ABIs for every stage present in the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineAbi {
    stages: PerStage<Option<StageAbi>>,
}

impl PipelineAbi {
    pub fn stage(&self, stage: ShaderStage) -> Option<&StageAbi> {
        self.stages[stage].as_ref()
    }

    /// Stages in processing order.
    pub fn iter(&self) -> impl Iterator<Item = (ShaderStage, &StageAbi)> {
        ShaderStage::PIPELINE_ORDER
            .into_iter()
            .filter_map(move |stage| self.stages[stage].as_ref().map(|abi| (stage, abi)))
    }
}

/// Assigns the hardware calling convention for every stage of a pipeline.
///
/// Stages are finalized in the fixed order vertex, tess-control, tess-eval,
/// geometry, fragment, compute; a stage only ever reads companion state that
/// was finalized before it. The whole computation is deterministic: identical
/// inputs produce identical ABIs.
pub fn build_pipeline_abi(
    state: &PipelineState<'_>,
    mut shaders: PerStage<Option<ShaderStageInfo>>,
) -> Result<PipelineAbi, AbiError> {
    validate_root_nodes(state.user_data_nodes)?;

    let mut stage_mask = StageMask::empty();
    for stage in ShaderStage::PIPELINE_ORDER {
        if shaders[stage].is_some() {
            stage_mask |= stage.mask();
        }
    }
    let has_tessellation = stage_mask.has_tessellation();
    let has_geometry = stage_mask.has_geometry();

    // Resolve tuning and clamp register availability up front; the clamp
    // only ever lowers a stage's own counts.
    let mut tunings: PerStage<Option<ShaderTuning>> = PerStage::default();
    for stage in ShaderStage::PIPELINE_ORDER {
        let Some(info) = shaders[stage].as_mut() else {
            continue;
        };
        let tuning = resolve_tuning(&info.options, &state.options);
        clamp_available_registers(&mut info.usage, &tuning, &state.props);
        tunings.set(stage, tuning);
    }

    let merged = state.gfx_ip.has_merged_stages() && (has_tessellation || has_geometry);

    let mut out: PerStage<Option<StageAbi>> = PerStage::default();
    for stage in ShaderStage::PIPELINE_ORDER {
        let Some(info) = shaders[stage].as_ref() else {
            continue;
        };

        let companion_usage = merged
            .then(|| merge_companion(stage, has_tessellation, has_geometry))
            .flatten()
            .and_then(|companion| shaders[companion].as_ref().map(|c| &c.usage));
        // The merged LS-HS invocation must agree on the vertex shader's
        // user-data layout decisions.
        let merged_vertex_usage = (state.gfx_ip.has_merged_stages()
            && stage == ShaderStage::TessControl)
            .then(|| shaders[ShaderStage::Vertex].as_ref().map(|v| &v.usage))
            .flatten();

        let cx = StageContext {
            state,
            stage,
            stage_mask,
            usage: &info.usage,
            companion_usage,
            merged_vertex_usage,
        };

        debug!(stage = stage.name(), "building entry-point ABI");
        let (signature, mut interface) = generate_entry_point(&cx)?;
        interface.tuning = tunings.take(stage).unwrap_or_default();

        out.set(
            stage,
            StageAbi {
                interface,
                signature,
                usage: info.usage.clone(),
            },
        );
    }

    Ok(PipelineAbi { stages: out })
}
