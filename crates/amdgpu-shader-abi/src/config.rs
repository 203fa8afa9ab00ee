//! Device capabilities and compile-scoped configuration.
//!
//! All of this is immutable input threaded by reference into the planner; no
//! ambient global state.

use crate::interface::ShaderTuning;
use crate::resources::{ResourceNode, ResourceUsage};

/// Graphics IP version of the target GPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct GfxIpVersion {
    pub major: u32,
    pub minor: u32,
}

impl GfxIpVersion {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Whether adjacent vertex-processing stages execute as merged hardware
    /// stages (LS-HS, ES-GS) on this generation.
    pub fn has_merged_stages(self) -> bool {
        self.major >= 9
    }

    /// Whether the primitive-shader (NGG) path exists on this generation.
    pub fn has_primitive_shaders(self) -> bool {
        self.major >= 10
    }
}

/// Hardware limits of the target device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpuProperties {
    /// Number of physical user-data SGPR slots.
    pub max_user_data_count: u32,
    pub max_vgprs_available: u32,
    pub max_sgprs_available: u32,
}

/// Compile-scoped options shared by every stage of the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Global VGPR limit override; a per-shader limit wins over this.
    pub vgpr_limit: Option<u32>,
    /// Global SGPR limit override; a per-shader limit wins over this.
    pub sgpr_limit: Option<u32>,
    /// Opaque "min,max" waves-per-EU range. Validated downstream, passed
    /// through untouched here.
    pub waves_per_eu: Option<String>,
    /// Keep a dummy in-register ES-GS LDS-size slot for the GS on-chip path.
    pub inreg_es_gs_lds_size: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            vgpr_limit: None,
            sgpr_limit: None,
            waves_per_eu: None,
            inreg_es_gs_lds_size: true,
        }
    }
}

/// Per-shader tuning options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShaderOptions {
    pub vgpr_limit: Option<u32>,
    pub sgpr_limit: Option<u32>,
    /// Rendered as a "0,N" waves-per-EU range when set.
    pub max_thread_groups_per_cu: Option<u32>,
}

/// Everything the planner needs to know about the pipeline being compiled,
/// besides the per-stage resource usage records.
#[derive(Debug, Clone)]
pub struct PipelineState<'a> {
    pub gfx_ip: GfxIpVersion,
    pub props: GpuProperties,
    pub options: PipelineOptions,
    /// Root resource-mapping nodes of the pipeline layout, in declaration
    /// order. Shared by all stages, immutable for the compile.
    pub user_data_nodes: &'a [ResourceNode],
    /// Multi-view (view index) emulation via a user-data register.
    pub enable_multi_view: bool,
    /// GS runs on-chip (ES-GS ring in LDS).
    pub gs_on_chip: bool,
    /// Tessellation factors live in off-chip memory.
    pub tess_off_chip: bool,
    /// Primitive-shader (NGG) path enabled. Graphics pipelines only.
    pub enable_ngg: bool,
}

/// Resolves the effective register/wave tuning for one stage: a per-shader
/// option wins over the compile-scoped override.
pub(crate) fn resolve_tuning(options: &ShaderOptions, global: &PipelineOptions) -> ShaderTuning {
    let waves_per_eu = match options.max_thread_groups_per_cu {
        Some(n) => Some(format!("0,{n}")),
        None => global.waves_per_eu.clone(),
    };
    ShaderTuning {
        vgpr_limit: options.vgpr_limit.or(global.vgpr_limit),
        sgpr_limit: options.sgpr_limit.or(global.sgpr_limit),
        waves_per_eu,
    }
}

/// Clamps the usage record's available register counts to the resolved limits
/// and to the device maxima. Counts only ever go down.
pub(crate) fn clamp_available_registers(
    usage: &mut ResourceUsage,
    tuning: &ShaderTuning,
    props: &GpuProperties,
) {
    if let Some(limit) = tuning.vgpr_limit {
        usage.vgprs_available = usage.vgprs_available.min(limit);
    }
    usage.vgprs_available = usage.vgprs_available.min(props.max_vgprs_available);

    if let Some(limit) = tuning.sgpr_limit {
        usage.sgprs_available = usage.sgprs_available.min(limit);
    }
    usage.sgprs_available = usage.sgprs_available.min(props.max_sgprs_available);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props() -> GpuProperties {
        GpuProperties {
            max_user_data_count: 32,
            max_vgprs_available: 256,
            max_sgprs_available: 104,
        }
    }

    #[test]
    fn shader_option_wins_over_global() {
        let global = PipelineOptions {
            vgpr_limit: Some(64),
            sgpr_limit: Some(80),
            waves_per_eu: Some("2,8".to_owned()),
            ..Default::default()
        };
        let options = ShaderOptions {
            vgpr_limit: Some(48),
            sgpr_limit: None,
            max_thread_groups_per_cu: Some(4),
        };

        let tuning = resolve_tuning(&options, &global);
        assert_eq!(tuning.vgpr_limit, Some(48));
        assert_eq!(tuning.sgpr_limit, Some(80));
        assert_eq!(tuning.waves_per_eu.as_deref(), Some("0,4"));
    }

    #[test]
    fn clamping_never_raises_counts() {
        let mut usage = ResourceUsage {
            vgprs_available: 512,
            sgprs_available: 40,
            ..Default::default()
        };
        let tuning = ShaderTuning {
            vgpr_limit: Some(128),
            sgpr_limit: Some(96),
            waves_per_eu: None,
        };

        clamp_available_registers(&mut usage, &tuning, &props());
        // 512 -> 128 by the limit (device max 256 no longer binds).
        assert_eq!(usage.vgprs_available, 128);
        // 40 was already below both bounds.
        assert_eq!(usage.sgprs_available, 40);
    }

    #[test]
    fn device_maxima_apply_without_limits() {
        let mut usage = ResourceUsage {
            vgprs_available: 512,
            sgprs_available: 512,
            ..Default::default()
        };
        clamp_available_registers(&mut usage, &ShaderTuning::default(), &props());
        assert_eq!(usage.vgprs_available, 256);
        assert_eq!(usage.sgprs_available, 104);
    }
}
