//! Organic matter components and their decomposition kinetics
//!
//! Each component is one carbon pool type of the soil organic matter, e.g. cellulose or
//! lignin. Its decomposition rate follows Wallman et al. 2006 (eq. 10-13):
//!
//! $$ r(T, \theta, pH) = \frac{k_{pot}}{365.25} f_T(T) f_w(\theta) f_{pH}(pH) $$
//!
//! The three response functions are independent of each other and of any pool mass.

use crate::errors::{DecompError, DecompResult};
use crate::FloatValue;
use serde::{Deserialize, Serialize};

/// Dense index of a component in the registry and in every pool array
pub type ComponentId = usize;

/// Gas constant in kJ / (mol K)
const GAS_CONSTANT: FloatValue = 8.314e-3;
/// Reference temperature of the Arrhenius response in °C
const REFERENCE_TEMPERATURE: FloatValue = 5.0;
const ZERO_CELSIUS: FloatValue = 273.16;
const DAYS_PER_YEAR: FloatValue = 365.25;

fn default_m_ph() -> FloatValue {
    1.0
}

/// Kinetic parameters of a single component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentParameters {
    /// Potential decomposition rate
    /// unit: 1 / yr
    pub k_pot: FloatValue,
    /// Activation energy of the decomposition
    /// unit: kJ / mol
    #[serde(rename = "E_a")]
    pub e_a: FloatValue,
    /// Water function coefficient
    #[serde(rename = "K_w")]
    pub k_w: FloatValue,
    /// Water function exponent
    pub n_w: FloatValue,
    /// Response coefficient of the pH function
    /// unit: kmol / m^3
    #[serde(rename = "K_pH")]
    pub k_ph: FloatValue,
    /// Response exponent of the pH function
    #[serde(rename = "m_pH", default = "default_m_ph")]
    pub m_ph: FloatValue,
}

impl ComponentParameters {
    pub fn new(
        k_pot: FloatValue,
        e_a: FloatValue,
        k_w: FloatValue,
        n_w: FloatValue,
        k_ph: FloatValue,
    ) -> Self {
        Self {
            k_pot,
            e_a,
            k_w,
            n_w,
            k_ph,
            m_ph: default_m_ph(),
        }
    }

    pub fn with_m_ph(self, m_ph: FloatValue) -> Self {
        Self { m_ph, ..self }
    }

    /// Parameters of a component that never decomposes, e.g. CO2
    pub fn inert() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0, 0.0)
    }
}

/// A registered pool type of the soil organic matter
///
/// The id is issued by [`crate::registry::ComponentRegistry::register`] and is the
/// permanent identity of the component: it indexes the pool array of every
/// [`crate::som::Som`] built against the same registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    id: ComponentId,
    /// Display label
    pub name: String,
    /// True if the pool is part of the stored carbon stock,
    /// false for flux-only components (e.g. DOC, CO2)
    pub is_stored: bool,
    pub parameters: ComponentParameters,
}

impl Component {
    pub(crate) fn new(
        id: ComponentId,
        name: String,
        is_stored: bool,
        parameters: ComponentParameters,
    ) -> Self {
        Self {
            id,
            name,
            is_stored,
            parameters,
        }
    }

    pub fn id(&self) -> ComponentId {
        self.id
    }

    /// Arrhenius temperature response relative to 5 °C.
    ///
    /// $$f_T(T) = \exp\left(\frac{E_a}{R (T_R + 273.16)} - \frac{E_a}{R (T + 273.16)}\right)$$
    ///
    /// # Arguments
    ///
    /// * `temperature` - Soil temperature (°C)
    pub fn temperature_response(&self, temperature: FloatValue) -> FloatValue {
        let e_a = self.parameters.e_a;
        let gamma = e_a / (GAS_CONSTANT * (REFERENCE_TEMPERATURE + ZERO_CELSIUS))
            - e_a / (GAS_CONSTANT * (temperature + ZERO_CELSIUS));
        gamma.exp()
    }

    /// Saturating moisture response in [0, 1).
    ///
    /// $$f_w(\theta) = \frac{K_w \theta^{n_w}}{1 + K_w \theta^{n_w}}$$
    ///
    /// # Arguments
    ///
    /// * `wetness` - Relative soil wetness (m3/m3)
    pub fn moisture_response(&self, wetness: FloatValue) -> FloatValue {
        let scaled = self.parameters.k_w * wetness.powf(self.parameters.n_w);
        scaled / (1.0 + scaled)
    }

    /// Saturating pH response in (0, 1].
    ///
    /// $$f_{pH}(pH) = \frac{1}{1 + K_{pH} [H^+]^{m_{pH}}}$$
    pub fn ph_response(&self, ph: FloatValue) -> FloatValue {
        let h_conc = 10.0_f64.powf(-ph);
        1.0 / (1.0 + self.parameters.k_ph * h_conc.powf(self.parameters.m_ph))
    }

    /// Decomposition rate of the component.
    ///
    /// # Arguments
    ///
    /// * `temperature` - Soil temperature (°C)
    /// * `wetness` - Relative soil wetness (m3/m3)
    /// * `ph` - pH of the soil solution
    ///
    /// # Returns
    ///
    /// Decomposition rate in 1/day
    pub fn decomposition_rate(
        &self,
        temperature: FloatValue,
        wetness: FloatValue,
        ph: FloatValue,
    ) -> FloatValue {
        self.parameters.k_pot / DAYS_PER_YEAR
            * self.temperature_response(temperature)
            * self.moisture_response(wetness)
            * self.ph_response(ph)
    }

    /// Copy name, storage flag and parameters from `other` into this component.
    ///
    /// Fails if `other` carries a different id.
    pub fn assign_from(&mut self, other: &Component) -> DecompResult<()> {
        if self.id != other.id {
            return Err(DecompError::IdentityMismatch {
                expected: self.id,
                found: other.id,
            });
        }
        self.name.clone_from(&other.name);
        self.is_stored = other.is_stored;
        self.parameters = other.parameters.clone();
        Ok(())
    }
}
