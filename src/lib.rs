//! DECOMP soil organic matter model
//!
//! Re-exports the kinetics engine of `decomp-core` and adds a single-layer driver
//! ([`driver::simulate`]) that runs a litter bag through a seasonal climate.
//! The Python extension module (`decomp._lib`) is built with the `python` feature.

pub mod driver;
#[cfg(feature = "python")]
mod python;

pub use decomp_core::litter::{leaf_litter, pure_doc, root_litter, wood_litter};
pub use decomp_core::registry::{CELL, CO2, DOC, EDC, LIGN, RECALC};
pub use decomp_core::{
    Component, ComponentId, ComponentParameters, ComponentRegistry, DecompError, DecompResult,
    FloatValue, LitterComposition, Som,
};
