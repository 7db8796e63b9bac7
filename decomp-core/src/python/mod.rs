//! Python bindings for the kinetics engine
//!
//! Exposes an `SOM` class, the litter presets and the ids of the default components.
//! All states created from Python share one seed registry (see [`pool_types`]).

mod state;

use crate::errors::DecompError;
use crate::registry::{ComponentRegistry, CELL, CO2, DOC, EDC, LIGN, RECALC};
use pyo3::exceptions::{PyIndexError, PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use std::sync::{Arc, OnceLock};

pub use state::PySom;

static POOL_TYPES: OnceLock<Arc<ComponentRegistry>> = OnceLock::new();

/// The registry shared by every state created from Python
pub fn pool_types() -> Arc<ComponentRegistry> {
    Arc::clone(POOL_TYPES.get_or_init(|| Arc::new(ComponentRegistry::wallman2006())))
}

impl From<DecompError> for PyErr {
    fn from(err: DecompError) -> PyErr {
        match err {
            DecompError::InvalidComponentId { .. } => PyIndexError::new_err(err.to_string()),
            DecompError::PoolsOutOfSync { .. } | DecompError::IdentityMismatch { .. } => {
                PyRuntimeError::new_err(err.to_string())
            }
            DecompError::InvalidFraction(_)
            | DecompError::InvalidTimeStep(_)
            | DecompError::UnknownComponent(_)
            | DecompError::Config(_) => PyValueError::new_err(err.to_string()),
        }
    }
}

/// Names of the registered components in id order
#[pyfunction]
fn get_pool_types() -> Vec<String> {
    pool_types().components().map(|c| c.name.clone()).collect()
}

#[pyfunction]
fn wood_litter() -> PyResult<PySom> {
    Ok(PySom(crate::litter::wood_litter(&pool_types())?))
}

#[pyfunction]
fn leave_litter() -> PyResult<PySom> {
    Ok(PySom(crate::litter::leaf_litter(&pool_types())?))
}

#[pyfunction]
fn root_litter() -> PyResult<PySom> {
    Ok(PySom(crate::litter::root_litter(&pool_types())?))
}

#[pyfunction]
#[pyo3(name = "pure_DOC")]
fn pure_doc() -> PyResult<PySom> {
    Ok(PySom(crate::litter::pure_doc(&pool_types())?))
}

#[pymodule]
pub fn kinetics(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PySom>()?;
    m.add_function(wrap_pyfunction!(get_pool_types, m)?)?;
    m.add_function(wrap_pyfunction!(wood_litter, m)?)?;
    m.add_function(wrap_pyfunction!(leave_litter, m)?)?;
    m.add_function(wrap_pyfunction!(root_litter, m)?)?;
    m.add_function(wrap_pyfunction!(pure_doc, m)?)?;

    m.add("EDC", EDC)?;
    m.add("CELL", CELL)?;
    m.add("LIGN", LIGN)?;
    m.add("RC", RECALC)?;
    m.add("DOC", DOC)?;
    m.add("CO2", CO2)?;
    Ok(())
}
