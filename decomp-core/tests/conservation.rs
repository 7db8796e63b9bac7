//! Conservation tests for the kinetics engine.
//!
//! These tests verify that the default component set:
//! - conserves carbon: every decomposed unit ends up in another pool
//! - releases or immobilises nitrogen according to the C/N ratio of the litter

use approx::assert_relative_eq;
use decomp_core::litter::{leaf_litter, root_litter, wood_litter};
use decomp_core::registry::{CELL, CO2, DOC, EDC, LIGN, RECALC};
use decomp_core::{ComponentRegistry, Som};
use std::sync::Arc;

const TEMPERATURE: f64 = 10.0;
const WETNESS: f64 = 0.3;
const PH: f64 = 6.0;

fn registry() -> Arc<ComponentRegistry> {
    Arc::new(ComponentRegistry::wallman2006())
}

mod carbon_conservation {
    use super::*;

    /// Leaf litter on a mild, moist day.
    ///
    /// The labile pools lose mass, humification feeds RECALC faster than it
    /// decomposes, and the products of the flux-only components balance the losses.
    #[test]
    fn test_leaf_litter_rates() {
        let som = leaf_litter(&registry()).unwrap();
        let rate = som.dcdt(TEMPERATURE, WETNESS, PH).unwrap();

        assert_relative_eq!(rate[EDC], -0.009589542509407656, max_relative = 1e-9);
        assert_relative_eq!(rate[CELL], -0.0025731843705481742, max_relative = 1e-9);
        assert_relative_eq!(rate[LIGN], -0.00026587608666914735, max_relative = 1e-9);
        assert_relative_eq!(rate[RECALC], 0.0012448143408149753, max_relative = 1e-9);
        assert_relative_eq!(rate[DOC], 0.005591949875937684, max_relative = 1e-9);
        assert_relative_eq!(rate[CO2], 0.005591838749872319, max_relative = 1e-9);

        let total: f64 = rate.pools().sum();
        assert_relative_eq!(total, 0.0, epsilon = 1e-14);
        assert!(rate.total_stored_carbon().unwrap() < 0.0);
    }

    /// Stored carbon lost over many steps equals the exported DOC and CO2.
    #[test]
    fn test_multi_step_mass_balance() {
        let mut som = wood_litter(&registry()).unwrap();
        let initial = som.total_stored_carbon().unwrap();
        let dt = 0.5;

        let mut exported = 0.0;
        for step in 0..400 {
            let temperature = 5.0 + 10.0 * (step as f64 / 50.0).sin();
            let flux = som.integrate(dt, temperature, WETNESS, PH).unwrap();
            exported += (flux[DOC] + flux[CO2]) * dt;
        }

        let remaining = som.total_stored_carbon().unwrap();
        assert!(remaining < initial);
        assert_relative_eq!(initial - remaining, exported, max_relative = 1e-9);
    }

    /// Pools stay positive over a long run with daily steps.
    #[test]
    fn test_long_run_stays_positive() {
        let mut som = leaf_litter(&registry()).unwrap();
        for _ in 0..(5 * 365) {
            som.integrate(1.0, TEMPERATURE, WETNESS, PH).unwrap();
        }
        for id in [EDC, CELL, LIGN, RECALC] {
            assert!(som[id] > 0.0, "pool {} became {}", id, som[id]);
        }
        assert!(som.total_stored_carbon().unwrap() < 1.0);
        assert_eq!(som[DOC], 0.0);
        assert_eq!(som[CO2], 0.0);
    }

    /// Fluxes of separate litter bags add up to the flux of the combined bag.
    #[test]
    fn test_rates_are_additive() {
        let registry = registry();
        let leaf = leaf_litter(&registry).unwrap();
        let root = root_litter(&registry).unwrap();
        let combined = &leaf + &root;

        let separate = leaf.dcdt(TEMPERATURE, WETNESS, PH).unwrap()
            + root.dcdt(TEMPERATURE, WETNESS, PH).unwrap();
        let joint = combined.dcdt(TEMPERATURE, WETNESS, PH).unwrap();
        for id in 0..registry.len() {
            assert_relative_eq!(joint[id], separate[id], max_relative = 1e-12);
        }
    }
}

mod nitrogen_coupling {
    use super::*;

    /// Root litter (C/N 19.8) releases part of the mineralised nitrogen.
    #[test]
    fn test_narrow_cn_releases_nitrogen() {
        let mut som = root_litter(&registry()).unwrap();
        let rate = som.dcdt(TEMPERATURE, WETNESS, PH).unwrap();
        assert_relative_eq!(rate.n, -0.0008251913393537086, max_relative = 1e-9);

        let n_before = som.n;
        let flux = som.integrate(1.0, TEMPERATURE, WETNESS, PH).unwrap();
        assert_relative_eq!(flux.n, 0.0008251913393537086, max_relative = 1e-9);
        assert_relative_eq!(n_before - som.n, flux.n, max_relative = 1e-12);
    }

    /// Leaf and wood litter (C/N 50) immobilise all mineralised nitrogen.
    #[test]
    fn test_wide_cn_keeps_nitrogen() {
        let registry = registry();
        for mut som in [
            leaf_litter(&registry).unwrap(),
            wood_litter(&registry).unwrap(),
        ] {
            let n_before = som.n;
            let flux = som.integrate(1.0, TEMPERATURE, WETNESS, PH).unwrap();
            assert_eq!(flux.n, 0.0);
            assert_eq!(som.n, n_before);
        }
    }

    /// Below the lower C/N bound more nitrogen is released than mineralised.
    #[test]
    fn test_very_narrow_cn() {
        let mut som: Som = root_litter(&registry()).unwrap();
        som.n = 0.099;
        let c = som.total_stored_carbon().unwrap();
        let rate = som.dcdt(TEMPERATURE, WETNESS, PH).unwrap();

        let gross = -rate.total_stored_carbon().unwrap() / (c / som.n);
        assert!(rate.n < -gross);
    }
}
