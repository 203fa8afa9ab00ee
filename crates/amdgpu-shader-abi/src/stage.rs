//! Shader stages, stage masks, and the merged-stage companion lookup.
//!
//! Stage processing order is load-bearing: `PIPELINE_ORDER` is the order in
//! which the per-pipeline driver finalizes stages, and a stage may only read
//! companion state that was finalized earlier in that order.

use core::ops::{Index, IndexMut};

use bitflags::bitflags;

/// Logical (API-level) shader stage.
///
/// Discriminants follow pipeline order; `StageMask` bit positions and
/// `PerStage` indexing rely on that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShaderStage {
    Vertex = 0,
    TessControl = 1,
    TessEval = 2,
    Geometry = 3,
    Fragment = 4,
    Compute = 5,
}

impl ShaderStage {
    /// All stages, in the fixed processing order.
    pub const PIPELINE_ORDER: [ShaderStage; 6] = [
        ShaderStage::Vertex,
        ShaderStage::TessControl,
        ShaderStage::TessEval,
        ShaderStage::Geometry,
        ShaderStage::Fragment,
        ShaderStage::Compute,
    ];

    pub const fn mask(self) -> StageMask {
        StageMask::from_bits_truncate(1 << self as u32)
    }

    pub const fn name(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::TessControl => "tess-control",
            ShaderStage::TessEval => "tess-eval",
            ShaderStage::Geometry => "geometry",
            ShaderStage::Fragment => "fragment",
            ShaderStage::Compute => "compute",
        }
    }
}

bitflags! {
    /// Set of stages present in a pipeline.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct StageMask: u32 {
        const VERTEX = 1 << 0;
        const TESS_CONTROL = 1 << 1;
        const TESS_EVAL = 1 << 2;
        const GEOMETRY = 1 << 3;
        const FRAGMENT = 1 << 4;
        const COMPUTE = 1 << 5;
    }
}

impl StageMask {
    pub fn has_tessellation(self) -> bool {
        self.intersects(StageMask::TESS_CONTROL | StageMask::TESS_EVAL)
    }

    pub fn has_geometry(self) -> bool {
        self.contains(StageMask::GEOMETRY)
    }

    pub fn contains_stage(self, stage: ShaderStage) -> bool {
        self.contains(stage.mask())
    }

    /// True if `stage` is the last enabled vertex-processing stage, i.e. no
    /// other enabled stage sits between it and the fragment stage. This is
    /// the stage that owns the stream-out table.
    pub fn is_last_vertex_processing_stage(self, stage: ShaderStage) -> bool {
        if stage >= ShaderStage::Fragment {
            return false;
        }
        // Bit positions follow pipeline order, so the difference of the two
        // single-bit masks covers exactly the stages in [stage, Fragment).
        let below_fragment = ShaderStage::Fragment.mask().bits() - stage.mask().bits();
        self.bits() & below_fragment == stage.mask().bits()
    }
}

/// The other half of a merged hardware stage pair.
///
/// On merged-stage GPU generations two adjacent logical stages execute as one
/// physical invocation, so activity and register-count decisions must account
/// for both halves. Callers are expected to gate on the GPU generation and on
/// tessellation/geometry being present at all.
pub fn merge_companion(
    stage: ShaderStage,
    has_tessellation: bool,
    has_geometry: bool,
) -> Option<ShaderStage> {
    match stage {
        ShaderStage::Vertex => {
            if has_tessellation {
                Some(ShaderStage::TessControl)
            } else if has_geometry {
                Some(ShaderStage::Geometry)
            } else {
                None
            }
        }
        ShaderStage::TessControl => Some(ShaderStage::Vertex),
        ShaderStage::TessEval => has_geometry.then_some(ShaderStage::Geometry),
        ShaderStage::Geometry => {
            if has_tessellation {
                Some(ShaderStage::TessEval)
            } else {
                Some(ShaderStage::Vertex)
            }
        }
        ShaderStage::Fragment | ShaderStage::Compute => None,
    }
}

/// Fixed-size per-stage storage, indexed by `ShaderStage`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PerStage<T> {
    slots: [T; 6],
}

impl<T> PerStage<T> {
    pub fn get(&self, stage: ShaderStage) -> &T {
        &self.slots[stage as usize]
    }

    pub fn get_mut(&mut self, stage: ShaderStage) -> &mut T {
        &mut self.slots[stage as usize]
    }
}

impl<T> PerStage<Option<T>> {
    pub fn set(&mut self, stage: ShaderStage, value: T) -> Option<T> {
        self.slots[stage as usize].replace(value)
    }

    pub fn take(&mut self, stage: ShaderStage) -> Option<T> {
        self.slots[stage as usize].take()
    }
}

impl<T> Index<ShaderStage> for PerStage<T> {
    type Output = T;

    fn index(&self, stage: ShaderStage) -> &T {
        self.get(stage)
    }
}

impl<T> IndexMut<ShaderStage> for PerStage<T> {
    fn index_mut(&mut self, stage: ShaderStage) -> &mut T {
        self.get_mut(stage)
    }
}
