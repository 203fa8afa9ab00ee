use thiserror::Error;

use crate::resources::ResourceNodeKind;
use crate::stage::ShaderStage;

/// Fatal preconditions and invariant violations.
///
/// Running out of user-data registers is *not* an error; that is the designed
/// trigger for the spill-table path. Everything in this enum means the
/// pipeline description handed to us is malformed or an internal invariant
/// broke, and compilation of the current shader must abort.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AbiError {
    #[error("root resource node {index} of kind {kind:?} has nested children; only descriptor-table nodes may nest")]
    UnexpectedChildren { index: usize, kind: ResourceNodeKind },

    #[error("{kind:?} node must span exactly one dword, got {size_in_dwords}")]
    BadTablePointerSize {
        kind: ResourceNodeKind,
        size_in_dwords: u32,
    },

    #[error("pipeline declares {count} root resource nodes; at most {max} are supported")]
    TooManyRootNodes { count: usize, max: usize },

    #[error("stage {stage:?} cannot place a {kind:?} node in user data registers")]
    UnexpectedNodeKind {
        stage: ShaderStage,
        kind: ResourceNodeKind,
    },

    #[error("stage {stage:?} has no stream-out table pointer slot")]
    UnexpectedStreamOutStage { stage: ShaderStage },

    #[error("stage {stage:?} was handed interface data for a different stage")]
    StageArgsMismatch { stage: ShaderStage },

    #[error("spilling was required but no overflowing node fixed the spill base offset")]
    MissingSpillBase,

    #[error("entry point needs more than {max} register-resident arguments")]
    TooManyEntryArgs { max: u32 },
}
