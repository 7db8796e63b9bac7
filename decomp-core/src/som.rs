//! Soil organic matter state and decomposition kinetics
//!
//! A [`Som`] holds one carbon mass per registered component plus a single nitrogen pool
//! for one unit of soil or litter. The carbon balance of each component $i$ is
//!
//! $$ \frac{dC_i}{dt} = \sum_{j} f_{j \to i} r_j C_j - r_i C_i $$
//!
//! where $r_i$ is the decomposition rate of component $i$ and $f_{j \to i}$ the product
//! fraction from $j$ to $i$. The nitrogen balance follows the net mineralisation of the
//! stored carbon and the C/N ratio of the soil, which shifts the system from releasing
//! nitrogen (narrow C/N) to immobilising it (wide C/N):
//!
//! $$ \frac{dN}{dt} = \frac{M}{CN} \left( \min\left(1, \frac{CN - CN_{min}}{CN_{max} - CN_{min}}\right) - 1 \right) $$
//!
//! with $M$ the net loss of stored carbon.
//!
//! States form a vector space: they can be added, subtracted and scaled, which is how
//! litter inputs are mixed into a soil and how fluxes are applied over a time step.

use crate::component::ComponentId;
use crate::errors::{DecompError, DecompResult};
use crate::registry::ComponentRegistry;
use crate::FloatValue;
use log::{debug, trace, warn};
use ndarray::{s, Array1};
use std::fmt;
use std::ops::{
    Add, AddAssign, Div, DivAssign, Index, IndexMut, Mul, MulAssign, Sub, SubAssign,
};
use std::sync::Arc;

/// Lower C/N bound of the mineralisation-immobilisation transition
pub const DEFAULT_CN_MIN: FloatValue = 15.0;
/// Upper C/N bound of the mineralisation-immobilisation transition
pub const DEFAULT_CN_MAX: FloatValue = 40.0;

/// Carbon pools and nitrogen of one soil organic matter unit
///
/// Masses are in any consistent unit (e.g. kg or g/m2). Flux records returned by
/// [`Som::dcdt`] and [`Som::integrate`] use the same type and may hold negative values.
#[derive(Debug, Clone)]
pub struct Som {
    registry: Arc<ComponentRegistry>,
    pools: Array1<FloatValue>,
    /// Nitrogen mass
    pub n: FloatValue,
    cn_min: FloatValue,
    cn_max: FloatValue,
}

impl Som {
    /// An empty state with one zero pool per registered component
    pub fn zero(registry: Arc<ComponentRegistry>) -> Self {
        let pools = Array1::zeros(registry.len());
        Self::from_parts(registry, pools, 0.0)
    }

    /// Build a state from a raw pool array.
    ///
    /// The length of `pools` is not checked here. A mismatch with the registry is
    /// reported by [`Som::total_stored_carbon`] and every operation built on it.
    pub fn from_parts(
        registry: Arc<ComponentRegistry>,
        pools: Array1<FloatValue>,
        n: FloatValue,
    ) -> Self {
        Self {
            registry,
            pools,
            n,
            cn_min: DEFAULT_CN_MIN,
            cn_max: DEFAULT_CN_MAX,
        }
    }

    /// A state sharing this state's registry and C/N bounds
    fn with_pools(&self, pools: Array1<FloatValue>, n: FloatValue) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            pools,
            n,
            cn_min: self.cn_min,
            cn_max: self.cn_max,
        }
    }

    pub fn registry(&self) -> &Arc<ComponentRegistry> {
        &self.registry
    }

    pub fn pools(&self) -> &Array1<FloatValue> {
        &self.pools
    }

    pub fn cn_min(&self) -> FloatValue {
        self.cn_min
    }

    pub fn cn_max(&self) -> FloatValue {
        self.cn_max
    }

    /// Carbon mass of a component
    pub fn get_pool(&self, index: ComponentId) -> DecompResult<FloatValue> {
        self.pools
            .get(index)
            .copied()
            .ok_or(DecompError::InvalidComponentId {
                id: index,
                size: self.pools.len(),
            })
    }

    pub fn set_pool(&mut self, index: ComponentId, value: FloatValue) -> DecompResult<()> {
        let size = self.pools.len();
        let pool = self
            .pools
            .get_mut(index)
            .ok_or(DecompError::InvalidComponentId { id: index, size })?;
        *pool = value;
        Ok(())
    }

    /// Sum of the carbon in all stored components.
    ///
    /// Flux-only components (DOC, CO2) are excluded. Fails if the pool array does not
    /// match the registry, e.g. after the state was built for a different registry.
    pub fn total_stored_carbon(&self) -> DecompResult<FloatValue> {
        if self.pools.len() != self.registry.len() {
            return Err(DecompError::PoolsOutOfSync {
                pools: self.pools.len(),
                components: self.registry.len(),
            });
        }
        Ok(self
            .registry
            .components()
            .filter(|c| c.is_stored)
            .map(|c| self.pools[c.id()])
            .sum())
    }

    /// C/N ratio of the stored carbon.
    ///
    /// Not guarded against `n == 0`, which yields an infinite or NaN ratio.
    pub fn carbon_nitrogen_ratio(&self) -> DecompResult<FloatValue> {
        Ok(self.total_stored_carbon()? / self.n)
    }

    /// Instantaneous change rate of all pools and of nitrogen.
    ///
    /// # Arguments
    ///
    /// * `temperature` - Soil temperature (°C)
    /// * `wetness` - Relative soil wetness (m3/m3)
    /// * `ph` - pH of the soil solution
    ///
    /// # Returns
    ///
    /// The change rate per day as a flux record sharing this state's registry
    ///
    /// There is no solution nitrogen argument: it never affected the rates.
    pub fn dcdt(
        &self,
        temperature: FloatValue,
        wetness: FloatValue,
        ph: FloatValue,
    ) -> DecompResult<Som> {
        let c_pool = self.total_stored_carbon()?;

        let size = self.pools.len();
        let mut dispatch = Array1::<FloatValue>::zeros(size);
        let mut decomp = Array1::<FloatValue>::zeros(size);
        for component in self.registry.components() {
            let id = component.id();
            let mass = self.pools[id];
            // Empty or negative pools cannot decompose
            let decomposed = if mass > 0.0 {
                mass * component.decomposition_rate(temperature, wetness, ph)
            } else {
                0.0
            };
            for (target, fraction) in self.registry.products(id) {
                dispatch[target] += decomposed * fraction;
            }
            decomp[id] = decomposed;
        }
        let mut result = self.with_pools(dispatch - decomp, 0.0);

        if c_pool > 0.0 && self.n > 0.0 {
            let net_min = -result.total_stored_carbon()?;
            let cn = c_pool / self.n;
            let gross_n_min = net_min / cn;
            let f_immob = ((cn - self.cn_min) / (self.cn_max - self.cn_min)).min(1.0);
            let n_immob = gross_n_min * f_immob;
            result.n = n_immob - gross_n_min;
        }
        Ok(result)
    }

    /// Advance the state by one explicit Euler step.
    ///
    /// Stored pools and nitrogen are updated in place, flux-only pools are emptied
    /// afterwards. The returned record carries the change rate of the flux-only
    /// components (e.g. leached DOC and respired CO2) with every stored pool set to
    /// zero, and the nitrogen rate with its sign flipped, i.e. the nitrogen exchanged
    /// with the environment. It can be routed into another state.
    ///
    /// # Arguments
    ///
    /// * `dt` - Time step (days)
    /// * `temperature` - Soil temperature (°C)
    /// * `wetness` - Relative soil wetness (m3/m3)
    /// * `ph` - pH of the soil solution
    pub fn integrate(
        &mut self,
        dt: FloatValue,
        temperature: FloatValue,
        wetness: FloatValue,
        ph: FloatValue,
    ) -> DecompResult<Som> {
        let mut rate = self.dcdt(temperature, wetness, ph)?;

        *self += &rate * dt;

        let registry = Arc::clone(&self.registry);
        for component in registry.components() {
            if component.is_stored {
                rate.pools[component.id()] = 0.0;
            } else {
                self.pools[component.id()] = 0.0;
            }
        }
        rate.n = -rate.n;

        trace!(
            "Integrated {} days at T={}, wetness={}, pH={}: N={}, N flux={}",
            dt,
            temperature,
            wetness,
            ph,
            self.n,
            rate.n
        );
        Ok(rate)
    }

    /// Move the state onto another registry.
    ///
    /// Pools are matched by id. Components new to `registry` start empty, pools beyond
    /// the size of `registry` are dropped.
    pub fn rebind(&self, registry: Arc<ComponentRegistry>) -> Som {
        let mut pools = Array1::zeros(registry.len());
        let shared = self.pools.len().min(registry.len());
        pools
            .slice_mut(s![..shared])
            .assign(&self.pools.slice(s![..shared]));

        if registry.len() != self.pools.len() {
            debug!(
                "Rebinding SOM from {} to {} pools",
                self.pools.len(),
                registry.len()
            );
            if self.pools.slice(s![shared..]).iter().any(|v| *v != 0.0) {
                warn!(
                    "Rebinding SOM drops {} non-empty pools",
                    self.pools.len() - shared
                );
            }
        }

        Self {
            registry,
            pools,
            n: self.n,
            cn_min: self.cn_min,
            cn_max: self.cn_max,
        }
    }

    /// Iterate over `(component name, carbon mass)` in id order
    pub fn iter(&self) -> impl Iterator<Item = (&str, FloatValue)> {
        self.registry
            .components()
            .zip(self.pools.iter())
            .map(|(component, mass)| (component.name.as_str(), *mass))
    }

    fn assert_same_shape(&self, other: &Som) {
        assert_eq!(
            self.pools.len(),
            other.pools.len(),
            "Cannot combine SOM states with {} and {} pools",
            self.pools.len(),
            other.pools.len()
        );
    }
}

impl PartialEq for Som {
    fn eq(&self, other: &Self) -> bool {
        self.pools == other.pools
            && self.n == other.n
            && self.cn_min == other.cn_min
            && self.cn_max == other.cn_max
    }
}

impl Index<ComponentId> for Som {
    type Output = FloatValue;

    fn index(&self, index: ComponentId) -> &FloatValue {
        &self.pools[index]
    }
}

impl IndexMut<ComponentId> for Som {
    fn index_mut(&mut self, index: ComponentId) -> &mut FloatValue {
        &mut self.pools[index]
    }
}

/// Format with `digits` significant digits in the manner of `%g`, dropping trailing
/// zeros. Scientific notation is used below 1e-4 and from 10^digits on, judged after
/// rounding so that e.g. 9999.6 becomes `1e4`.
fn format_significant(value: FloatValue, digits: usize) -> String {
    if value == 0.0 || !value.is_finite() {
        return value.to_string();
    }
    let digits = digits.max(1);
    let scientific = format!("{:.*e}", digits - 1, value);
    let (mantissa, exponent) = match scientific.split_once('e') {
        Some((mantissa, exponent)) => match exponent.parse::<i32>() {
            Ok(exponent) => (mantissa, exponent),
            Err(_) => return scientific,
        },
        None => return scientific,
    };
    if exponent < -4 || exponent >= digits as i32 {
        let mantissa = if mantissa.contains('.') {
            mantissa.trim_end_matches('0').trim_end_matches('.')
        } else {
            mantissa
        };
        format!("{}e{}", mantissa, exponent)
    } else {
        let decimals = (digits as i32 - 1 - exponent).max(0) as usize;
        let formatted = format!("{:.*}", decimals, value);
        if formatted.contains('.') {
            formatted
                .trim_end_matches('0')
                .trim_end_matches('.')
                .to_string()
        } else {
            formatted
        }
    }
}

impl fmt::Display for Som {
    /// `SOM(N=...,NAME=...)` listing every pool with a positive mass
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SOM(N={}", format_significant(self.n, 4))?;
        for (name, mass) in self.iter() {
            if mass > 0.0 {
                write!(f, ",{}={}", name, format_significant(mass, 4))?;
            }
        }
        write!(f, ")")
    }
}

// ---------------------------------------------------------------------------
// Vector-space arithmetic
//
// Combining two states panics if their pool arrays differ in length.
// ---------------------------------------------------------------------------

impl AddAssign<&Som> for Som {
    fn add_assign(&mut self, rhs: &Som) {
        self.assert_same_shape(rhs);
        self.pools += &rhs.pools;
        self.n += rhs.n;
    }
}

impl SubAssign<&Som> for Som {
    fn sub_assign(&mut self, rhs: &Som) {
        self.assert_same_shape(rhs);
        self.pools -= &rhs.pools;
        self.n -= rhs.n;
    }
}

impl MulAssign<FloatValue> for Som {
    fn mul_assign(&mut self, rhs: FloatValue) {
        self.pools *= rhs;
        self.n *= rhs;
    }
}

impl DivAssign<FloatValue> for Som {
    fn div_assign(&mut self, rhs: FloatValue) {
        self.pools /= rhs;
        self.n /= rhs;
    }
}

/// Derive the owned and borrowed forms of a binary operator from its assigning form
macro_rules! impl_som_op {
    ($trait:ident, $method:ident, $assign_method:ident, Som) => {
        impl $trait<Som> for Som {
            type Output = Som;

            fn $method(mut self, rhs: Som) -> Som {
                self.$assign_method(&rhs);
                self
            }
        }

        impl $trait<&Som> for Som {
            type Output = Som;

            fn $method(mut self, rhs: &Som) -> Som {
                self.$assign_method(rhs);
                self
            }
        }

        impl $trait<&Som> for &Som {
            type Output = Som;

            fn $method(self, rhs: &Som) -> Som {
                let mut result = self.clone();
                result.$assign_method(rhs);
                result
            }
        }
    };
    ($trait:ident, $method:ident, $assign_method:ident, FloatValue) => {
        impl $trait<FloatValue> for Som {
            type Output = Som;

            fn $method(mut self, rhs: FloatValue) -> Som {
                self.$assign_method(rhs);
                self
            }
        }

        impl $trait<FloatValue> for &Som {
            type Output = Som;

            fn $method(self, rhs: FloatValue) -> Som {
                let mut result = self.clone();
                result.$assign_method(rhs);
                result
            }
        }
    };
}

impl_som_op!(Add, add, add_assign, Som);
impl_som_op!(Sub, sub, sub_assign, Som);
impl_som_op!(Mul, mul, mul_assign, FloatValue);
impl_som_op!(Div, div, div_assign, FloatValue);

impl AddAssign<Som> for Som {
    fn add_assign(&mut self, rhs: Som) {
        *self += &rhs;
    }
}

impl SubAssign<Som> for Som {
    fn sub_assign(&mut self, rhs: Som) {
        *self -= &rhs;
    }
}

impl Mul<Som> for FloatValue {
    type Output = Som;

    fn mul(self, rhs: Som) -> Som {
        rhs * self
    }
}

impl Mul<&Som> for FloatValue {
    type Output = Som;

    fn mul(self, rhs: &Som) -> Som {
        rhs * self
    }
}
