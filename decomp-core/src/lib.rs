//! Kinetics engine of the DECOMP soil organic matter model
//!
//! Decomposition of a small set of coupled carbon pools with distinct decay rates,
//! product flows between the pools and a coupled nitrogen
//! mineralisation/immobilisation balance, after Wallman et al. 2006.
//!
//! A [`registry::ComponentRegistry`] describes the pool types and is shared read-only
//! by any number of [`som::Som`] states. A driver supplies temperature, wetness and pH
//! once per time step and calls [`som::Som::integrate`].

pub mod component;
pub mod errors;
pub mod litter;
#[cfg(feature = "python")]
pub mod python;
pub mod registry;
pub mod som;

/// Floating point type used for masses, rates and environmental forcing
pub type FloatValue = f64;

pub use component::{Component, ComponentId, ComponentParameters};
pub use errors::{DecompError, DecompResult};
pub use litter::LitterComposition;
pub use registry::ComponentRegistry;
pub use som::Som;
