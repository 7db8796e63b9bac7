//! Single-layer driver
//!
//! Steps one soil layer forward under a sinusoidal seasonal climate, with litter added
//! once a year or spread over every day. Dissolved carbon either leaves the layer at
//! the end of each step or is retained with a first order washout.

use decomp_core::{DecompError, DecompResult, FloatValue, Som};
use log::debug;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::sync::Arc;

/// Length of a driver year
pub const DAYS_PER_YEAR: usize = 365;

/// Environmental forcing at one point in time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    /// Soil temperature (°C)
    pub temperature: FloatValue,
    /// Relative soil wetness
    pub wetness: FloatValue,
    pub ph: FloatValue,
}

/// Cosine shaped annual temperature cycle peaking on day 0
///
/// Wetness falls linearly with temperature and reaches zero at `t_max`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeasonalClimate {
    /// Maximum temperature (°C)
    pub t_max: FloatValue,
    /// Minimum temperature (°C)
    pub t_min: FloatValue,
    pub ph: FloatValue,
}

impl Default for SeasonalClimate {
    fn default() -> Self {
        Self {
            t_max: 15.0,
            t_min: -3.0,
            ph: 8.0,
        }
    }
}

impl SeasonalClimate {
    /// Forcing at `day` days since the start of a year. Fractional days are allowed
    /// and the cycle repeats every 365 days.
    pub fn environment(&self, day: FloatValue) -> Environment {
        let mean = (self.t_max + self.t_min) / 2.0;
        let amplitude = (self.t_max - self.t_min) / 2.0;
        let phase = 2.0 * PI * day / DAYS_PER_YEAR as FloatValue;
        let temperature = mean + amplitude * phase.cos();
        Environment {
            temperature,
            wetness: 1.0 - temperature / self.t_max,
            ph: self.ph,
        }
    }
}

/// Litter entering the layer
#[derive(Debug, Clone)]
pub enum LitterInput {
    /// The whole annual amount on a single day of each year
    Yearly { litter: Som, day_of_year: usize },
    /// The annual amount spread evenly over the year
    Daily { litter: Som },
}

impl LitterInput {
    /// Annual litterfall on day 270
    pub fn yearly(litter: Som) -> Self {
        Self::Yearly {
            litter,
            day_of_year: 270,
        }
    }

    pub fn daily(litter: Som) -> Self {
        Self::Daily { litter }
    }

    /// Litter added during the step `[start, start + dt)`, if any
    ///
    /// # Arguments
    ///
    /// * `start` - Time since the start of the simulation (days)
    /// * `dt` - Step length (days)
    pub fn on_step(&self, start: FloatValue, dt: FloatValue) -> Option<Som> {
        let year = DAYS_PER_YEAR as FloatValue;
        match self {
            Self::Yearly {
                litter,
                day_of_year,
            } => {
                let day = *day_of_year as FloatValue;
                let next_litterfall = ((start - day) / year).ceil() * year + day;
                (next_litterfall < start + dt).then(|| litter.clone())
            }
            Self::Daily { litter } => Some(litter * (dt / year)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Number of simulated days
    pub days: usize,
    /// Mean residence time of dissolved carbon in the layer (days).
    /// Zero or less removes all DOC at the end of every step.
    pub doc_retention_time: FloatValue,
    /// Step length (days)
    pub dt: FloatValue,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            days: 19 * DAYS_PER_YEAR,
            doc_retention_time: 0.0,
            dt: 1.0,
        }
    }
}

impl SimulationConfig {
    /// Fraction of the DOC pool kept per day
    pub fn doc_retention_rate(&self) -> FloatValue {
        if self.doc_retention_time > 0.0 {
            1.0 - 1.0 / self.doc_retention_time
        } else {
            0.0
        }
    }

    /// Number of steps of length `dt` covering `days`
    pub fn steps(&self) -> DecompResult<usize> {
        if !(self.dt.is_finite() && self.dt > 0.0) {
            return Err(DecompError::InvalidTimeStep(self.dt));
        }
        Ok((self.days as FloatValue / self.dt).round() as usize)
    }
}

/// Record of a simulation, one row per step
///
/// Row `i` of `states` is the state at the start of step `i` (after the litter input),
/// row `i` of `fluxes` the flux rate returned by that step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    /// Component names in column order
    pub components: Vec<String>,
    /// Start of each step (days)
    pub time: Array1<FloatValue>,
    pub states: Array2<FloatValue>,
    pub fluxes: Array2<FloatValue>,
    /// C/N ratio at the start of each step
    pub cn: Array1<FloatValue>,
    /// Nitrogen released to the soil solution per day
    pub n_flux: Array1<FloatValue>,
}

impl Trajectory {
    fn new(components: Vec<String>, steps: usize) -> Self {
        let size = components.len();
        Self {
            components,
            time: Array1::zeros(steps),
            states: Array2::zeros((steps, size)),
            fluxes: Array2::zeros((steps, size)),
            cn: Array1::zeros(steps),
            n_flux: Array1::zeros(steps),
        }
    }

    pub fn steps(&self) -> usize {
        self.time.len()
    }
}

/// Run a single soil layer through `config.days` days in steps of `config.dt`.
///
/// Fails with `InvalidTimeStep` unless `dt` is positive and finite.
///
/// # Panics
///
/// If a litter input was built on a registry with a different number of components
/// than `initial`.
pub fn simulate(
    initial: &Som,
    inputs: &[LitterInput],
    climate: &SeasonalClimate,
    config: &SimulationConfig,
) -> DecompResult<Trajectory> {
    let steps = config.steps()?;
    let registry = Arc::clone(initial.registry());
    let doc = registry.find("DOC").map(|component| component.id());
    let retention = config.doc_retention_rate().powf(config.dt);

    debug!(
        "Simulating {} days in {} steps with {} litter inputs, DOC retention {} per step",
        config.days,
        steps,
        inputs.len(),
        retention
    );

    let mut trajectory = Trajectory::new(
        registry.components().map(|c| c.name.clone()).collect(),
        steps,
    );
    let mut som = initial.clone();

    for step in 0..steps {
        let time = step as FloatValue * config.dt;
        for litter in inputs
            .iter()
            .filter_map(|input| input.on_step(time, config.dt))
        {
            som += litter;
        }

        trajectory.time[step] = time;
        trajectory.states.row_mut(step).assign(som.pools());
        trajectory.cn[step] = som.carbon_nitrogen_ratio()?;

        let environment = climate.environment(time % DAYS_PER_YEAR as FloatValue);
        let retained_doc = doc.map(|id| som[id]);
        let flux = som.integrate(
            config.dt,
            environment.temperature,
            environment.wetness,
            environment.ph,
        )?;
        if let (Some(id), Some(old)) = (doc, retained_doc) {
            som[id] = (old + flux[id] * config.dt) * retention;
        }

        trajectory.fluxes.row_mut(step).assign(flux.pools());
        trajectory.n_flux[step] = flux.n;
    }

    debug!("Simulation finished: {}", som);
    Ok(trajectory)
}

#[cfg(test)]
mod tests {
    use super::*;
    use decomp_core::litter::{leaf_litter, pure_doc};
    use decomp_core::registry::{CELL, DOC, EDC, LIGN, RECALC};
    use decomp_core::{ComponentParameters, ComponentRegistry};
    use is_close::is_close;

    fn registry() -> Arc<ComponentRegistry> {
        Arc::new(ComponentRegistry::wallman2006())
    }

    /// The default component names with kinetics that never decompose
    fn inert_registry() -> Arc<ComponentRegistry> {
        let mut registry = ComponentRegistry::new();
        for name in ["EDC", "CELL", "LIGN", "RECALC", "DOC"] {
            registry.register(name, name != "DOC", ComponentParameters::inert());
        }
        Arc::new(registry)
    }

    fn stored_carbon(trajectory: &Trajectory, step: usize) -> FloatValue {
        [EDC, CELL, LIGN, RECALC]
            .iter()
            .map(|&id| trajectory.states[[step, id]])
            .sum()
    }

    fn run(initial: &Som, inputs: &[LitterInput], days: usize, dt: FloatValue) -> Trajectory {
        let config = SimulationConfig {
            days,
            dt,
            ..Default::default()
        };
        simulate(initial, inputs, &SeasonalClimate::default(), &config).unwrap()
    }

    #[test]
    fn test_seasonal_climate() {
        let climate = SeasonalClimate::default();

        let summer = climate.environment(0.0);
        assert!(is_close!(summer.temperature, 15.0));
        assert_eq!(summer.wetness, 0.0);
        assert_eq!(summer.ph, 8.0);

        let spring = climate.environment(91.25);
        assert!(is_close!(spring.temperature, 6.0));

        let winter = climate.environment(182.5);
        assert!(is_close!(winter.temperature, -3.0));
        assert!(winter.wetness > 1.0);

        let next_year = climate.environment(365.0 + 182.5);
        assert!(is_close!(next_year.temperature, winter.temperature));
    }

    #[test]
    fn test_doc_retention_rate() {
        let mut config = SimulationConfig::default();
        assert_eq!(config.doc_retention_rate(), 0.0);
        config.doc_retention_time = 10.0;
        assert!(is_close!(config.doc_retention_rate(), 0.9));
        config.doc_retention_time = -1.0;
        assert_eq!(config.doc_retention_rate(), 0.0);
    }

    #[test]
    fn test_steps_follow_time_step() {
        let mut config = SimulationConfig {
            days: 10,
            ..Default::default()
        };
        assert_eq!(config.steps().unwrap(), 10);
        config.dt = 0.5;
        assert_eq!(config.steps().unwrap(), 20);
        config.dt = 0.1;
        assert_eq!(config.steps().unwrap(), 100);

        for dt in [0.0, -1.0, FloatValue::NAN, FloatValue::INFINITY] {
            config.dt = dt;
            assert!(matches!(
                config.steps(),
                Err(DecompError::InvalidTimeStep(_))
            ));
        }
    }

    #[test]
    fn test_invalid_time_step_is_rejected() {
        let initial = leaf_litter(&registry()).unwrap();
        let config = SimulationConfig {
            dt: 0.0,
            ..Default::default()
        };
        let result = simulate(&initial, &[], &SeasonalClimate::default(), &config);
        assert!(matches!(result, Err(DecompError::InvalidTimeStep(_))));
    }

    #[test]
    fn test_yearly_input_on_its_day() {
        let litter = leaf_litter(&registry()).unwrap();
        let yearly = LitterInput::yearly(litter.clone());

        assert!(yearly.on_step(269.0, 1.0).is_none());
        assert_eq!(yearly.on_step(270.0, 1.0), Some(litter.clone()));
        assert!(yearly.on_step(271.0, 1.0).is_none());
        assert!(yearly.on_step(270.0 + 365.0, 1.0).is_some());

        assert!(yearly.on_step(269.5, 0.5).is_none());
        assert!(yearly.on_step(270.0, 0.5).is_some());
        assert!(yearly.on_step(270.5, 0.5).is_none());
        assert!(yearly.on_step(0.0, 365.0).is_some());
    }

    #[test]
    fn test_daily_input_scales_with_step() {
        let litter = leaf_litter(&registry()).unwrap();
        let daily = LitterInput::daily(litter);

        let day = daily.on_step(100.0, 1.0).unwrap();
        assert!(is_close!(day[EDC], 0.1 / 365.0));
        assert!(is_close!(day.n, 0.02 / 365.0));

        let half_day = daily.on_step(100.0, 0.5).unwrap();
        assert!(is_close!(half_day[EDC], 0.05 / 365.0));
    }

    #[test]
    fn test_trajectory_shape() {
        let initial = leaf_litter(&registry()).unwrap();
        let trajectory = run(&initial, &[], 10, 1.0);

        assert_eq!(trajectory.steps(), 10);
        assert_eq!(trajectory.states.dim(), (10, 6));
        assert_eq!(trajectory.fluxes.dim(), (10, 6));
        assert_eq!(
            trajectory.components,
            vec!["EDC", "CELL", "LIGN", "RECALC", "DOC", "CO2"]
        );
        assert_eq!(trajectory.time[9], 9.0);
        assert_eq!(trajectory.states.row(0), initial.pools().view());
        assert!(is_close!(trajectory.cn[0], 50.0));
    }

    #[test]
    fn test_sub_daily_steps_cover_the_same_days() {
        let initial = leaf_litter(&registry()).unwrap();
        let trajectory = run(&initial, &[], 10, 0.25);

        assert_eq!(trajectory.steps(), 40);
        assert_eq!(trajectory.time[1], 0.25);
        assert_eq!(trajectory.time[39], 9.75);
    }

    #[test]
    fn test_daily_input_per_day_independent_of_step() {
        let registry = inert_registry();
        let initial = Som::zero(Arc::clone(&registry));
        let inputs = [LitterInput::daily(leaf_litter(&registry).unwrap())];

        let daily = run(&initial, &inputs, DAYS_PER_YEAR, 1.0);
        let half_daily = run(&initial, &inputs, DAYS_PER_YEAR, 0.5);

        assert_eq!(daily.steps(), 365);
        assert_eq!(half_daily.steps(), 730);
        assert!(is_close!(stored_carbon(&daily, 364), 1.0));
        assert!(is_close!(stored_carbon(&half_daily, 729), 1.0));
    }

    #[test]
    fn test_yearly_input_once_per_year_with_sub_daily_steps() {
        let registry = inert_registry();
        let initial = Som::zero(Arc::clone(&registry));
        let inputs = [LitterInput::yearly(leaf_litter(&registry).unwrap())];

        let trajectory = run(&initial, &inputs, 2 * DAYS_PER_YEAR, 0.25);

        assert_eq!(stored_carbon(&trajectory, 1079), 0.0);
        assert!(is_close!(stored_carbon(&trajectory, 1080), 1.0));
        assert!(is_close!(stored_carbon(&trajectory, 1083), 1.0));
        assert!(is_close!(stored_carbon(&trajectory, 2919), 2.0));
    }

    #[test]
    fn test_half_steps_agree_with_daily_steps() {
        let registry = registry();
        let initial = Som::zero(Arc::clone(&registry));
        let inputs = [LitterInput::daily(leaf_litter(&registry).unwrap())];

        let daily = run(&initial, &inputs, DAYS_PER_YEAR, 1.0);
        let half_daily = run(&initial, &inputs, DAYS_PER_YEAR, 0.5);

        // Same point in time: day 364
        let coarse = stored_carbon(&daily, 364);
        let fine = stored_carbon(&half_daily, 728);
        assert!(coarse > 0.4 && coarse < 0.7);
        assert!(((coarse - fine) / coarse).abs() < 1e-2);
    }

    #[test]
    fn test_stored_carbon_decreases_without_input() {
        let initial = leaf_litter(&registry()).unwrap();
        let trajectory = run(&initial, &[], 2 * DAYS_PER_YEAR, 1.0);

        for step in 1..trajectory.steps() {
            assert!(stored_carbon(&trajectory, step) <= stored_carbon(&trajectory, step - 1) + 1e-12);
        }
        let remaining = stored_carbon(&trajectory, trajectory.steps() - 1);
        assert!(remaining > 0.0 && remaining < 1.0);
    }

    #[test]
    fn test_doc_is_removed_without_retention() {
        let initial = pure_doc(&registry()).unwrap();
        let trajectory = run(&initial, &[], 3, 1.0);

        assert_eq!(trajectory.states[[0, DOC]], 1.0);
        assert_eq!(trajectory.states[[1, DOC]], 0.0);
        assert_eq!(trajectory.states[[2, DOC]], 0.0);
    }

    #[test]
    fn test_doc_retention_keeps_dissolved_carbon() {
        let initial = leaf_litter(&registry()).unwrap();
        let climate = SeasonalClimate::default();
        let flushed = SimulationConfig {
            days: 90,
            ..Default::default()
        };
        let retained = SimulationConfig {
            doc_retention_time: 10.0,
            ..flushed.clone()
        };

        let flushed = simulate(&initial, &[], &climate, &flushed).unwrap();
        let retained = simulate(&initial, &[], &climate, &retained).unwrap();

        assert_eq!(flushed.states[[89, DOC]], 0.0);
        assert!(retained.states[[89, DOC]] > 0.0);
    }

    #[test]
    fn test_doc_retention_per_day_with_sub_daily_steps() {
        let registry = inert_registry();
        let initial = pure_doc(&registry).unwrap();
        let config = SimulationConfig {
            days: 2,
            doc_retention_time: 10.0,
            dt: 0.5,
        };
        let trajectory = simulate(&initial, &[], &SeasonalClimate::default(), &config).unwrap();

        // Two half steps keep the same share as one daily step
        assert!(is_close!(trajectory.states[[2, DOC]], 0.9));
    }

    #[test]
    fn test_yearly_litterfall() {
        let registry = registry();
        let initial = Som::zero(Arc::clone(&registry));
        let litter = leaf_litter(&registry).unwrap();
        let trajectory = run(&initial, &[LitterInput::yearly(litter)], 300, 1.0);

        assert_eq!(stored_carbon(&trajectory, 269), 0.0);
        assert!(is_close!(stored_carbon(&trajectory, 270), 1.0));
        assert!(stored_carbon(&trajectory, 299) < 1.0);
    }

    #[test]
    fn test_daily_litterfall_accumulates() {
        let registry = registry();
        let initial = Som::zero(Arc::clone(&registry));
        let litter = leaf_litter(&registry).unwrap();
        let trajectory = run(&initial, &[LitterInput::daily(litter)], 30, 1.0);

        assert!(is_close!(stored_carbon(&trajectory, 0), 1.0 / 365.0));
        assert!(stored_carbon(&trajectory, 29) > stored_carbon(&trajectory, 0));
    }

    #[test]
    fn test_trajectory_serialises() {
        let initial = leaf_litter(&registry()).unwrap();
        let trajectory = run(&initial, &[], 5, 1.0);

        let json = serde_json::to_string(&trajectory).unwrap();
        let restored: Trajectory = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.components, trajectory.components);
        assert_eq!(restored.time, trajectory.time);
        assert_eq!(restored.states, trajectory.states);
    }

    #[test]
    fn test_config_from_partial_json() {
        let config: SimulationConfig = serde_json::from_str(r#"{"days": 10}"#).unwrap();
        assert_eq!(config.days, 10);
        assert_eq!(config.dt, 1.0);
        let climate: SeasonalClimate = serde_json::from_str(r#"{"ph": 5.5}"#).unwrap();
        assert_eq!(climate.t_max, 15.0);
        assert_eq!(climate.ph, 5.5);
    }
}
