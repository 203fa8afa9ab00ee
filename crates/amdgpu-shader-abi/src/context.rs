//! Per-stage compile context threaded through the planner.

use crate::config::PipelineState;
use crate::resources::ResourceUsage;
use crate::stage::{ShaderStage, StageMask};

/// Everything one stage's planning pass needs to see: the pipeline-wide
/// state, this stage's usage, and the usage of the merge companion on
/// merged-stage generations. All references are immutable; a stage never
/// mutates its companion's records.
#[derive(Debug, Clone, Copy)]
pub(crate) struct StageContext<'a> {
    pub state: &'a PipelineState<'a>,
    pub stage: ShaderStage,
    /// Stages present in this pipeline.
    pub stage_mask: StageMask,
    pub usage: &'a ResourceUsage,
    /// Merge companion's usage (merged generations with tessellation or
    /// geometry present only).
    pub companion_usage: Option<&'a ResourceUsage>,
    /// For tess-control on merged generations: the vertex stage's usage.
    /// The merged LS-HS invocation keys base-vertex/draw-index decisions off
    /// the vertex shader's flags.
    pub merged_vertex_usage: Option<&'a ResourceUsage>,
}

impl<'a> StageContext<'a> {
    pub fn has_tessellation(&self) -> bool {
        self.stage_mask.has_tessellation()
    }

    pub fn has_geometry(&self) -> bool {
        self.stage_mask.has_geometry()
    }

    /// Usage record that decides vertex-fetch built-ins (base vertex/instance,
    /// draw index) for the vertex / tess-control pair.
    pub fn vertex_flags_usage(&self) -> &'a ResourceUsage {
        self.merged_vertex_usage.unwrap_or(self.usage)
    }
}
