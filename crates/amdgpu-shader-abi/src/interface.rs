//! Stage interface data and the entry-point signature.
//!
//! These are the planner's outputs: downstream lowering indexes entry
//! arguments positionally through [`InterfaceData`], so everything here is
//! plain data with stable meaning.

use std::collections::BTreeMap;

use bitflags::bitflags;

use crate::error::AbiError;
use crate::resources::{BuiltInUsage, MAX_TRANSFORM_FEEDBACK_BUFFERS};
use crate::stage::ShaderStage;

/// Abstract type of one entry-point argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbiArgType {
    Int32,
    /// `<N x i32>` vector carrying N user-data dwords.
    Int32Vec(u32),
    Float,
    /// `<N x float>` interpolation vector.
    FloatVec(u32),
    /// Constant pointer to a `<3 x i32>` (workgroup count); two dwords wide.
    ConstPtrInt32Vec3,
}

impl AbiArgType {
    /// User-data dwords the argument occupies when register-resident.
    pub fn user_data_dwords(self) -> u32 {
        match self {
            AbiArgType::Int32 => 1,
            AbiArgType::Int32Vec(n) => n,
            AbiArgType::ConstPtrInt32Vec3 => 2,
            // Never placed in user data.
            AbiArgType::Float | AbiArgType::FloatVec(_) => 0,
        }
    }
}

/// Final ordered argument list for one stage entry point.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EntryPointSignature {
    pub args: Vec<AbiArgType>,
    /// Bit i set: argument i must be register-resident (SGPR-loaded).
    pub in_reg_mask: u64,
}

impl EntryPointSignature {
    pub fn arg_count(&self) -> usize {
        self.args.len()
    }

    pub fn is_in_reg(&self, arg_index: usize) -> bool {
        arg_index < 64 && (self.in_reg_mask >> arg_index) & 1 != 0
    }
}

/// Incremental signature construction: every push returns the argument index
/// just assigned, and user-data pushes advance the running slot index.
#[derive(Debug, Default)]
pub(crate) struct SignatureBuilder {
    args: Vec<AbiArgType>,
    in_reg_mask: u64,
    /// Next free user-data slot.
    pub(crate) user_data_idx: u32,
}

impl SignatureBuilder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Pushes a register-resident user-data argument; returns
    /// `(argument index, user-data slot)` of its first dword.
    pub(crate) fn push_user_data(&mut self, ty: AbiArgType) -> Result<(u32, u32), AbiError> {
        let slot = self.user_data_idx;
        let arg = self.push_in_reg(ty)?;
        self.user_data_idx += ty.user_data_dwords();
        Ok((arg, slot))
    }

    /// Pushes a register-resident system value (not user data).
    pub(crate) fn push_sgpr(&mut self, ty: AbiArgType) -> Result<u32, AbiError> {
        self.push_in_reg(ty)
    }

    /// Pushes a VGPR-resident system value.
    pub(crate) fn push_vgpr(&mut self, ty: AbiArgType) -> u32 {
        let arg = self.args.len() as u32;
        self.args.push(ty);
        arg
    }

    fn push_in_reg(&mut self, ty: AbiArgType) -> Result<u32, AbiError> {
        let arg = self.args.len() as u32;
        // The residency mask is one machine word; a 65th register-resident
        // argument has no bit to land in.
        if arg >= 64 {
            return Err(AbiError::TooManyEntryArgs { max: 64 });
        }
        self.in_reg_mask |= 1u64 << arg;
        self.args.push(ty);
        Ok(arg)
    }

    pub(crate) fn arg_count(&self) -> u32 {
        self.args.len() as u32
    }

    pub(crate) fn finish(self) -> EntryPointSignature {
        EntryPointSignature {
            args: self.args,
            in_reg_mask: self.in_reg_mask,
        }
    }
}

/// Spill-table placement in the logical user-data space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpillTable {
    /// Logical dword offset of the first spilled node (declaration order
    /// decides; the earliest overflowing node wins).
    pub offset_in_dwords: u32,
    /// Total logical user-data size, `max(offset + size)` over active nodes.
    pub size_in_dwords: u32,
}

/// Where one active root resource node ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootNodePlacement {
    /// Loaded into user-data registers; `arg_index` is its entry argument.
    InRegister { arg_index: u32 },
    /// Lives in the memory-resident spill table.
    Spilled,
}

/// Resolved per-shader register tuning, recorded for downstream lowering.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ShaderTuning {
    pub vgpr_limit: Option<u32>,
    pub sgpr_limit: Option<u32>,
    /// Opaque "min,max" range, passed through unvalidated.
    pub waves_per_eu: Option<String>,
}

/// User-data slot indices of the stage-specific reserved slots. Recorded
/// only when the slot was actually reserved for this stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UserDataSlots {
    pub view_index: Option<u32>,
    pub es_gs_lds_size: Option<u32>,
    pub vb_table_ptr: Option<u32>,
    pub stream_out_table_ptr: Option<u32>,
    pub base_vertex: Option<u32>,
    pub base_instance: Option<u32>,
    pub draw_index: Option<u32>,
    pub num_workgroups_ptr: Option<u32>,
    pub spill_table: Option<u32>,
}

/// Entry-argument indices of stream-out state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StreamOutArgs {
    pub table_ptr: Option<u32>,
    pub stream_info: Option<u32>,
    pub write_index: Option<u32>,
    pub stream_offsets: [Option<u32>; MAX_TRANSFORM_FEEDBACK_BUFFERS],
}

/// Special user-data arguments shared by the vertex / tess-control pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VertexSpecialArgs {
    pub view_index: Option<u32>,
    pub vb_table_ptr: Option<u32>,
    pub base_vertex: Option<u32>,
    pub base_instance: Option<u32>,
    pub draw_index: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VsArgs {
    pub special: VertexSpecialArgs,
    pub stream_out: StreamOutArgs,
    pub es_gs_offset: Option<u32>,
    pub vertex_id: Option<u32>,
    pub rel_vertex_id: Option<u32>,
    pub primitive_id: Option<u32>,
    pub instance_id: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TcsArgs {
    pub special: VertexSpecialArgs,
    pub off_chip_lds_base: Option<u32>,
    pub tf_buffer_base: Option<u32>,
    pub patch_id: Option<u32>,
    pub rel_patch_id: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TesArgs {
    pub view_index: Option<u32>,
    pub stream_out: StreamOutArgs,
    pub es_gs_offset: Option<u32>,
    pub off_chip_lds_base: Option<u32>,
    pub tess_coord_x: Option<u32>,
    pub tess_coord_y: Option<u32>,
    pub rel_patch_id: Option<u32>,
    pub patch_id: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GsArgs {
    pub view_index: Option<u32>,
    pub gs_vs_offset: Option<u32>,
    pub wave_id: Option<u32>,
    /// Per-vertex ES-GS ring offsets.
    pub es_gs_offsets: [Option<u32>; 6],
    pub primitive_id: Option<u32>,
    pub invocation_id: Option<u32>,
}

bitflags! {
    /// Packed hardware enable word for fragment interpolants and
    /// fragment-coordinate channels.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct PsInputAddr: u32 {
        const PERSP_SAMPLE = 1 << 0;
        const PERSP_CENTER = 1 << 1;
        const PERSP_CENTROID = 1 << 2;
        const PERSP_PULL_MODEL = 1 << 3;
        const LINEAR_SAMPLE = 1 << 4;
        const LINEAR_CENTER = 1 << 5;
        const LINEAR_CENTROID = 1 << 6;
        const LINE_STIPPLE_TEX = 1 << 7;
        const POS_X_FLOAT = 1 << 8;
        const POS_Y_FLOAT = 1 << 9;
        const POS_Z_FLOAT = 1 << 10;
        const POS_W_FLOAT = 1 << 11;
        const FRONT_FACE = 1 << 12;
        const ANCILLARY = 1 << 13;
        const SAMPLE_COVERAGE = 1 << 14;
        const POS_FIXED_PT = 1 << 15;
    }
}

impl PsInputAddr {
    pub fn from_builtins(builtins: BuiltInUsage) -> Self {
        let mut addr = PsInputAddr::empty();
        let smooth = builtins.contains(BuiltInUsage::SMOOTH);
        let linear = builtins.contains(BuiltInUsage::NOPERSPECTIVE);

        addr.set(
            PsInputAddr::PERSP_SAMPLE,
            smooth && builtins.contains(BuiltInUsage::SAMPLE),
        );
        addr.set(
            PsInputAddr::PERSP_CENTER,
            smooth && builtins.contains(BuiltInUsage::CENTER),
        );
        addr.set(
            PsInputAddr::PERSP_CENTROID,
            smooth && builtins.contains(BuiltInUsage::CENTROID),
        );
        addr.set(
            PsInputAddr::PERSP_PULL_MODEL,
            smooth && builtins.contains(BuiltInUsage::PULL_MODE),
        );
        addr.set(
            PsInputAddr::LINEAR_SAMPLE,
            linear && builtins.contains(BuiltInUsage::SAMPLE),
        );
        addr.set(
            PsInputAddr::LINEAR_CENTER,
            linear && builtins.contains(BuiltInUsage::CENTER),
        );
        addr.set(
            PsInputAddr::LINEAR_CENTROID,
            linear && builtins.contains(BuiltInUsage::CENTROID),
        );

        let frag_coord = builtins.contains(BuiltInUsage::FRAG_COORD);
        addr.set(PsInputAddr::POS_X_FLOAT, frag_coord);
        addr.set(PsInputAddr::POS_Y_FLOAT, frag_coord);
        addr.set(PsInputAddr::POS_Z_FLOAT, frag_coord);
        addr.set(PsInputAddr::POS_W_FLOAT, frag_coord);

        addr.set(
            PsInputAddr::FRONT_FACE,
            builtins.contains(BuiltInUsage::FRONT_FACING),
        );
        addr.set(
            PsInputAddr::ANCILLARY,
            builtins.contains(BuiltInUsage::SAMPLE_ID),
        );
        addr.set(
            PsInputAddr::SAMPLE_COVERAGE,
            builtins.contains(BuiltInUsage::SAMPLE_MASK_IN),
        );
        addr
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FsArgs {
    pub prim_mask: Option<u32>,
    pub persp_sample: Option<u32>,
    pub persp_center: Option<u32>,
    pub persp_centroid: Option<u32>,
    pub persp_pull_mode: Option<u32>,
    pub linear_sample: Option<u32>,
    pub linear_center: Option<u32>,
    pub linear_centroid: Option<u32>,
    /// X/Y/Z/W fragment-coordinate arguments.
    pub frag_coord: [Option<u32>; 4],
    pub front_facing: Option<u32>,
    pub ancillary: Option<u32>,
    pub sample_coverage: Option<u32>,
    pub input_addr: PsInputAddr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CsArgs {
    pub num_workgroups_ptr: Option<u32>,
    pub workgroup_id: Option<u32>,
    pub local_invocation_id: Option<u32>,
}

/// Entry-argument indices, one variant per stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageArgs {
    Vertex(VsArgs),
    TessControl(TcsArgs),
    TessEval(TesArgs),
    Geometry(GsArgs),
    Fragment(FsArgs),
    Compute(CsArgs),
}

impl StageArgs {
    pub(crate) fn new(stage: ShaderStage) -> Self {
        match stage {
            ShaderStage::Vertex => StageArgs::Vertex(VsArgs::default()),
            ShaderStage::TessControl => StageArgs::TessControl(TcsArgs::default()),
            ShaderStage::TessEval => StageArgs::TessEval(TesArgs::default()),
            ShaderStage::Geometry => StageArgs::Geometry(GsArgs::default()),
            ShaderStage::Fragment => StageArgs::Fragment(FsArgs::default()),
            ShaderStage::Compute => StageArgs::Compute(CsArgs::default()),
        }
    }
}

/// Per-stage output of the planner: where every piece of user data lives and
/// which entry argument carries it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceData {
    pub stage: ShaderStage,
    /// Total user-data slots consumed (leading internal tables included).
    pub user_data_count: u32,
    /// Register slot -> logical user-data dword it carries.
    pub user_data_map: BTreeMap<u32, u32>,
    /// Placement per root resource node; `None` for inactive nodes.
    pub root_node_placements: Vec<Option<RootNodePlacement>>,
    /// Root index of the active push-constant node, if any.
    pub push_const_node: Option<usize>,
    pub spill_table: Option<SpillTable>,
    /// Entry argument carrying the spill-table pointer.
    pub spill_table_arg: Option<u32>,
    pub user_data_slots: UserDataSlots,
    pub args: StageArgs,
    pub tuning: ShaderTuning,
}

impl InterfaceData {
    /// Fixed user-data slots available to the compute stage's offset-indexed
    /// layout, after the leading internal tables.
    pub const MAX_CS_USER_DATA: u32 = 16;
    /// First compute user-data slot (the two leading internal tables come
    /// before it).
    pub const CS_START_USER_DATA: u32 = 2;

    pub(crate) fn new(stage: ShaderStage, root_node_count: usize) -> Self {
        Self {
            stage,
            user_data_count: 0,
            user_data_map: BTreeMap::new(),
            root_node_placements: vec![None; root_node_count],
            push_const_node: None,
            spill_table: None,
            spill_table_arg: None,
            user_data_slots: UserDataSlots::default(),
            args: StageArgs::new(stage),
            tuning: ShaderTuning::default(),
        }
    }
}
