//! Modelos neutrales del overlay (StageAddress, StageOverride, OverrideSet).

pub mod address;
pub mod override_set;

pub use address::StageAddress;
pub use override_set::{InitParams, OverrideSet, ParamMap, RunMode, StageOverride};
