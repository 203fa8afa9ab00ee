//! Entry-point ABI assignment for AMD-style GPU shader pipelines.
//!
//! Given the pipeline's resource-mapping tree, each stage's resource-usage
//! record, and the device's user-data register budget, this crate decides
//! which resources ride in dedicated user-data registers, which fall back to
//! a memory-resident spill table, and the exact order of every entry-point
//! argument (user data first, then stage system values).
//!
//! The output — [`InterfaceData`] plus [`EntryPointSignature`] per stage —
//! is a positional contract: downstream lowering indexes arguments by the
//! recorded indices, so argument order and the register-residency mask are
//! bit-for-bit stable for identical inputs.
//!
//! What this crate does *not* do: discover which resources a shader uses
//! (that analysis happens upstream and arrives as [`ResourceUsage`]), or
//! generate any code.

mod activity;
mod budget;
mod context;
mod layout;
mod stages;

pub mod config;
pub mod error;
pub mod interface;
pub mod pipeline;
pub mod resources;
pub mod stage;

pub use config::{GfxIpVersion, GpuProperties, PipelineOptions, PipelineState, ShaderOptions};
pub use error::AbiError;
pub use interface::{
    AbiArgType, EntryPointSignature, InterfaceData, PsInputAddr, RootNodePlacement, ShaderTuning,
    SpillTable, StageArgs, UserDataSlots,
};
pub use pipeline::{build_pipeline_abi, PipelineAbi, ShaderStageInfo, StageAbi};
pub use resources::{
    validate_root_nodes, BuiltInUsage, DescriptorPair, ResourceNode, ResourceNodeKind,
    ResourceUsage, MAX_ROOT_NODES, MAX_TRANSFORM_FEEDBACK_BUFFERS,
};
pub use stage::{merge_companion, PerStage, ShaderStage, StageMask};
