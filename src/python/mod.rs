use crate::driver::{simulate as run_simulation, LitterInput, SeasonalClimate, SimulationConfig};
use decomp_core::python::{kinetics, PySom};
use numpy::ToPyArray;
use pyo3::prelude::*;
use pyo3::types::PyDict;
use pyo3::wrap_pymodule;

/// Run a single soil layer through a seasonal climate
///
/// Returns a dict with the per-step `time`, `states`, `fluxes`, `CN` and `N_flux` arrays
/// and the component names.
#[pyfunction]
#[pyo3(signature = (initial, yearly=vec![], daily=vec![], doc_retention_time=0.0, days=19*365, dt=1.0, t_max=15.0, t_min=-3.0, ph=8.0))]
#[allow(clippy::too_many_arguments)]
fn simulate<'py>(
    py: Python<'py>,
    initial: PySom,
    yearly: Vec<PySom>,
    daily: Vec<PySom>,
    doc_retention_time: f64,
    days: usize,
    dt: f64,
    t_max: f64,
    t_min: f64,
    ph: f64,
) -> PyResult<Bound<'py, PyDict>> {
    let inputs: Vec<LitterInput> = yearly
        .into_iter()
        .map(|litter| LitterInput::yearly(litter.0))
        .chain(daily.into_iter().map(|litter| LitterInput::daily(litter.0)))
        .collect();
    let climate = SeasonalClimate { t_max, t_min, ph };
    let config = SimulationConfig {
        days,
        doc_retention_time,
        dt,
    };

    let trajectory = run_simulation(&initial.0, &inputs, &climate, &config)?;

    let result = PyDict::new_bound(py);
    result.set_item("components", trajectory.components.clone())?;
    result.set_item("time", trajectory.time.to_pyarray_bound(py))?;
    result.set_item("states", trajectory.states.to_pyarray_bound(py))?;
    result.set_item("fluxes", trajectory.fluxes.to_pyarray_bound(py))?;
    result.set_item("CN", trajectory.cn.to_pyarray_bound(py))?;
    result.set_item("N_flux", trajectory.n_flux.to_pyarray_bound(py))?;
    Ok(result)
}

#[pymodule]
#[pyo3(name = "_lib")]
fn decomp(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;
    m.add_wrapped(wrap_pymodule!(kinetics))?;
    m.add_function(wrap_pyfunction!(simulate, m)?)?;

    set_path(m, "decomp._lib.kinetics", "kinetics")?;

    Ok(())
}

fn set_path(m: &Bound<'_, PyModule>, path: &str, module: &str) -> PyResult<()> {
    let code = format!(
        "\
import sys
sys.modules['{path}'] = {module}
    "
    );
    m.py().run_bound(&code, None, Some(&m.dict()))
}
