pub mod constants;
pub mod error;
pub mod math_utils;
pub mod phase_registry;
pub mod config;
pub mod clinker;
pub mod specific_gravity;
pub mod fractions;
pub mod grading;
pub mod domain_geometry;
pub mod material_catalog;
pub mod mix_state;

pub use error::{MixError, Result};
pub use mix_state::{recompute, stage_grading, AggregateSlot, MixChange, MixState, ScmSample};
