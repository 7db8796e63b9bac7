//! Preset litter compositions
//!
//! Carbon fractions per unit of litter mass and the matching nitrogen content, for
//! the four stored pool types and dissolved carbon.

use crate::errors::{DecompError, DecompResult};
use crate::registry::ComponentRegistry;
use crate::som::Som;
use crate::FloatValue;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Masses of the named pools of a new [`Som`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LitterComposition {
    /// Nitrogen content
    #[serde(rename = "N")]
    pub n: FloatValue,
    /// Easily decomposable components
    #[serde(rename = "EDC")]
    pub edc: FloatValue,
    /// Cellulose and similar components
    #[serde(rename = "CELL")]
    pub cell: FloatValue,
    /// Lignin and similar components
    #[serde(rename = "LIGN")]
    pub lign: FloatValue,
    /// Recalcitrant components
    #[serde(rename = "RECALC")]
    pub recalc: FloatValue,
    /// Dissolved components
    #[serde(rename = "DOC", default)]
    pub doc: FloatValue,
}

impl LitterComposition {
    pub const WOOD: Self = Self {
        n: 1.0 / 50.0,
        edc: 0.04,
        cell: 0.6,
        lign: 0.27,
        recalc: 0.09,
        doc: 0.0,
    };

    pub const LEAF: Self = Self {
        n: 1.0 / 50.0,
        edc: 0.1,
        cell: 0.5,
        lign: 0.32,
        recalc: 0.08,
        doc: 0.0,
    };

    pub const ROOT: Self = Self {
        n: 1.0 / 20.0,
        edc: 0.21,
        cell: 0.4,
        lign: 0.33,
        recalc: 0.05,
        doc: 0.0,
    };

    /// A unit of dissolved organic carbon without nitrogen
    pub const PURE_DOC: Self = Self {
        n: 0.0,
        edc: 0.0,
        cell: 0.0,
        lign: 0.0,
        recalc: 0.0,
        doc: 1.0,
    };

    /// Build a state on `registry` with these masses.
    ///
    /// Each mass goes to the component of the same name, so the registry must contain
    /// EDC, CELL, LIGN, RECALC and DOC. Other components start empty.
    pub fn into_som(&self, registry: &Arc<ComponentRegistry>) -> DecompResult<Som> {
        let mut som = Som::zero(Arc::clone(registry));
        som.n = self.n;
        for (name, mass) in [
            ("EDC", self.edc),
            ("CELL", self.cell),
            ("LIGN", self.lign),
            ("RECALC", self.recalc),
            ("DOC", self.doc),
        ] {
            let component = registry
                .find(name)
                .ok_or_else(|| DecompError::UnknownComponent(name.to_string()))?;
            som.set_pool(component.id(), mass)?;
        }
        Ok(som)
    }
}

pub fn wood_litter(registry: &Arc<ComponentRegistry>) -> DecompResult<Som> {
    LitterComposition::WOOD.into_som(registry)
}

pub fn leaf_litter(registry: &Arc<ComponentRegistry>) -> DecompResult<Som> {
    LitterComposition::LEAF.into_som(registry)
}

pub fn root_litter(registry: &Arc<ComponentRegistry>) -> DecompResult<Som> {
    LitterComposition::ROOT.into_som(registry)
}

pub fn pure_doc(registry: &Arc<ComponentRegistry>) -> DecompResult<Som> {
    LitterComposition::PURE_DOC.into_som(registry)
}
