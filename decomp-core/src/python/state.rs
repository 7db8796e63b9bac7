//! Python wrapper of [`Som`]

use super::pool_types;
use crate::litter::LitterComposition;
use crate::som::Som;
use crate::FloatValue;
use numpy::{PyArray1, ToPyArray};
use pyo3::prelude::*;
use pyo3::types::{PyIterator, PyList};

/// Soil organic matter: carbon pools and nitrogen of one soil or litter unit
///
/// Example:
///     som = SOM(N=0.02, EDC=0.1, CELL=0.5, LIGN=0.32, RECALC=0.08)
///     flux = som.integrate(1.0, 10.0, 0.3, 6.0)
#[pyclass(name = "SOM", module = "decomp._lib.kinetics")]
#[derive(Debug, Clone)]
pub struct PySom(pub Som);

#[pymethods]
impl PySom {
    #[new]
    #[pyo3(signature = (n=0.0, edc=0.0, cell=0.0, lign=0.0, recalc=0.0, doc=0.0))]
    fn new(
        n: FloatValue,
        edc: FloatValue,
        cell: FloatValue,
        lign: FloatValue,
        recalc: FloatValue,
        doc: FloatValue,
    ) -> PyResult<Self> {
        let composition = LitterComposition {
            n,
            edc,
            cell,
            lign,
            recalc,
            doc,
        };
        Ok(Self(composition.into_som(&pool_types())?))
    }

    /// Nitrogen mass
    #[getter(N)]
    fn n(&self) -> FloatValue {
        self.0.n
    }

    #[setter(N)]
    fn set_n(&mut self, value: FloatValue) {
        self.0.n = value;
    }

    /// Stored carbon
    #[getter(C)]
    fn c(&self) -> PyResult<FloatValue> {
        Ok(self.0.total_stored_carbon()?)
    }

    /// C/N ratio
    #[getter(CN)]
    fn cn(&self) -> PyResult<FloatValue> {
        Ok(self.0.carbon_nitrogen_ratio()?)
    }

    #[getter]
    fn pools<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray1<FloatValue>> {
        self.0.pools().to_pyarray_bound(py)
    }

    /// Change rate of the pools per day
    #[pyo3(name = "dCdt")]
    fn dcdt(&self, temperature: FloatValue, wetness: FloatValue, ph: FloatValue) -> PyResult<Self> {
        Ok(Self(self.0.dcdt(temperature, wetness, ph)?))
    }

    /// Advance by `dt` days and return the outflow of the flux-only components
    fn integrate(
        &mut self,
        dt: FloatValue,
        temperature: FloatValue,
        wetness: FloatValue,
        ph: FloatValue,
    ) -> PyResult<Self> {
        Ok(Self(self.0.integrate(dt, temperature, wetness, ph)?))
    }

    fn __getitem__(&self, index: usize) -> PyResult<FloatValue> {
        Ok(self.0.get_pool(index)?)
    }

    fn __setitem__(&mut self, index: usize, value: FloatValue) -> PyResult<()> {
        Ok(self.0.set_pool(index, value)?)
    }

    fn __len__(&self) -> usize {
        self.0.pools().len()
    }

    /// Iterate over (name, mass) pairs
    fn __iter__<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyIterator>> {
        let items: Vec<(String, FloatValue)> = self
            .0
            .iter()
            .map(|(name, mass)| (name.to_string(), mass))
            .collect();
        PyList::new_bound(py, items).as_any().iter()
    }

    fn __add__(&self, other: PyRef<'_, PySom>) -> Self {
        Self(&self.0 + &other.0)
    }

    fn __sub__(&self, other: PyRef<'_, PySom>) -> Self {
        Self(&self.0 - &other.0)
    }

    fn __mul__(&self, other: FloatValue) -> Self {
        Self(&self.0 * other)
    }

    fn __rmul__(&self, other: FloatValue) -> Self {
        Self(other * &self.0)
    }

    fn __truediv__(&self, other: FloatValue) -> Self {
        Self(&self.0 / other)
    }

    fn __str__(&self) -> String {
        self.0.to_string()
    }

    fn __repr__(&self) -> String {
        self.0.to_string()
    }
}
