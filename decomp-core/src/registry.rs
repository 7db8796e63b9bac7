//! Registry of the organic matter components
//!
//! The registry is an append-only lookup table. Components are the nodes of a directed
//! graph and the node index of a component is its id, so ids are dense, issued in
//! registration order and never reused. The edges carry the product fractions: an edge
//! `source -> target` with weight `f` means that a share `f` of the decomposed mass of
//! `source` becomes mass of `target`. Self-loops are allowed (humification of lignin
//! into lignin-like material).
//!
//! A registry is built once, then shared read-only (usually behind an `Arc`) by every
//! [`crate::som::Som`] that indexes its pools with the registry's ids.
//!
//! ```text
//!   [EDC]    --+
//!   [CELL]   --+--> [DOC] -----> [CO2]
//!   [LIGN]   --+      |
//!   [RECALC] --+------+--------> [RECALC]
//! ```

use crate::component::{Component, ComponentId, ComponentParameters};
use crate::errors::{DecompError, DecompResult};
use crate::FloatValue;
use log::debug;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::{de, Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Easily decomposable components
pub const EDC: ComponentId = 0;
/// Cellulose and similar components
pub const CELL: ComponentId = 1;
/// Lignin and similar components
pub const LIGN: ComponentId = 2;
/// Recalcitrant components
pub const RECALC: ComponentId = 3;
/// Dissolved organic carbon (flux only)
pub const DOC: ComponentId = 4;
/// Respired carbon (flux only)
pub const CO2: ComponentId = 5;

/// Product fractions of the default component set (source, target, fraction)
const WALLMAN2006_PRODUCTS: [(ComponentId, ComponentId, FloatValue); 15] = [
    (EDC, CO2, 0.45),
    (CELL, CO2, 0.45),
    (LIGN, CO2, 0.4),
    (RECALC, CO2, 0.4),
    (DOC, CO2, 0.75),
    (EDC, DOC, 0.45),
    (CELL, DOC, 0.45),
    (LIGN, DOC, 0.4),
    (RECALC, DOC, 0.5),
    (LIGN, LIGN, 0.1),
    (EDC, RECALC, 0.1),
    (CELL, RECALC, 0.1),
    (LIGN, RECALC, 0.1),
    (RECALC, RECALC, 0.1),
    (DOC, RECALC, 0.25),
];

/// One `[[component]]` table of a registry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ComponentConfig {
    name: String,
    is_stored: bool,
    #[serde(flatten)]
    parameters: ComponentParameters,
    /// Product fractions keyed by target component name
    #[serde(default)]
    products: BTreeMap<String, FloatValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RegistryConfig {
    #[serde(rename = "component", default)]
    components: Vec<ComponentConfig>,
}

/// Serialised form of a registry, checked before it becomes a [`ComponentRegistry`]
#[derive(Deserialize)]
struct RegistryGraph {
    graph: DiGraph<Component, FloatValue>,
}

/// Append-only table of components and their decomposition products
#[derive(Debug, Clone, Serialize)]
pub struct ComponentRegistry {
    graph: DiGraph<Component, FloatValue>,
}

impl<'de> Deserialize<'de> for ComponentRegistry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let RegistryGraph { graph } = RegistryGraph::deserialize(deserializer)?;
        Self::from_graph(graph).map_err(de::Error::custom)
    }
}

impl ComponentRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
        }
    }

    /// Rejects graphs whose component ids differ from their node index or whose
    /// product fractions leave [0, 1]
    fn from_graph(graph: DiGraph<Component, FloatValue>) -> DecompResult<Self> {
        let size = graph.node_count();
        for index in graph.node_indices() {
            let id = graph[index].id();
            if id != index.index() {
                return Err(DecompError::InvalidComponentId { id, size });
            }
        }
        if let Some(fraction) = graph
            .edge_weights()
            .find(|fraction| !(0.0..=1.0).contains(*fraction))
        {
            return Err(DecompError::InvalidFraction(*fraction));
        }
        Ok(Self { graph })
    }

    /// The component set of the DECOMP model (Wallman et al. 2006).
    ///
    /// Four stored pools (EDC, CELL, LIGN, RECALC) and two flux-only components
    /// (DOC, CO2) with ids matching the constants of this module.
    pub fn wallman2006() -> Self {
        let mut registry = Self::new();
        let k_w = 9.4;
        let n_w = 3.4;
        registry.register(
            "EDC",
            true,
            ComponentParameters::new(240.0, 18.0, k_w, n_w, 65600.0),
        );
        registry.register(
            "CELL",
            true,
            ComponentParameters::new(11.0, 33.0, k_w, n_w, 20500.0),
        );
        registry.register(
            "LIGN",
            true,
            ComponentParameters::new(1.7, 50.0, k_w, n_w, 1050.0),
        );
        registry.register(
            "RECALC",
            true,
            ComponentParameters::new(0.025, 53.0, k_w, n_w, 1050.0),
        );
        registry.register(
            "DOC",
            false,
            ComponentParameters::new(0.025, 50.0, 110.0, 2.454, 20500.0),
        );
        registry.register("CO2", false, ComponentParameters::inert());

        for (source, target, fraction) in WALLMAN2006_PRODUCTS {
            registry.connect(source, target, fraction);
        }
        registry
    }

    /// Build a registry from a TOML document.
    ///
    /// ```toml
    /// [[component]]
    /// name = "LIGN"
    /// is_stored = true
    /// k_pot = 1.7
    /// E_a = 50
    /// K_w = 9.4
    /// n_w = 3.4
    /// K_pH = 1050
    ///
    /// [component.products]
    /// LIGN = 0.1
    /// ```
    ///
    /// Components are registered in document order. Products are resolved by name once
    /// all components exist.
    pub fn from_toml(document: &str) -> DecompResult<Self> {
        let config: RegistryConfig = toml::from_str(document)?;

        let mut registry = Self::new();
        for component in &config.components {
            registry.register(
                component.name.clone(),
                component.is_stored,
                component.parameters.clone(),
            );
        }
        for component in &config.components {
            let source = registry.id_of(&component.name)?;
            for (target_name, fraction) in &component.products {
                let target = registry.id_of(target_name)?;
                registry.set_product(source, target, *fraction)?;
            }
        }
        debug!(
            "Loaded {} components with {} product links",
            registry.len(),
            registry.graph.edge_count()
        );
        Ok(registry)
    }

    /// Append a new component with the next free id
    pub fn register(
        &mut self,
        name: impl Into<String>,
        is_stored: bool,
        parameters: ComponentParameters,
    ) -> Component {
        let id = self.graph.node_count();
        let component = Component::new(id, name.into(), is_stored, parameters);
        let index = self.graph.add_node(component.clone());
        debug_assert_eq!(index.index(), id);
        debug!("Registered component {} with id {}", component.name, id);
        component
    }

    /// Set the share of the decomposed mass of `source` that becomes `target`.
    ///
    /// Overwrites an existing fraction for the same pair.
    pub fn set_product(
        &mut self,
        source: ComponentId,
        target: ComponentId,
        fraction: FloatValue,
    ) -> DecompResult<()> {
        if !(0.0..=1.0).contains(&fraction) {
            return Err(DecompError::InvalidFraction(fraction));
        }
        self.component(source)?;
        self.component(target)?;
        self.connect(source, target, fraction);
        debug!(
            "Product fraction {} -> {} set to {}",
            self.graph[NodeIndex::new(source)].name,
            self.graph[NodeIndex::new(target)].name,
            fraction
        );
        Ok(())
    }

    fn connect(&mut self, source: ComponentId, target: ComponentId, fraction: FloatValue) {
        let (a, b) = (NodeIndex::new(source), NodeIndex::new(target));
        match self.graph.find_edge(a, b) {
            Some(edge) => self.graph[edge] = fraction,
            None => {
                self.graph.add_edge(a, b, fraction);
            }
        }
    }

    /// Replace the parameters of an already registered component.
    ///
    /// The component is matched by its id, which is never changed.
    pub fn update(&mut self, component: &Component) -> DecompResult<()> {
        let size = self.len();
        let existing = self
            .graph
            .node_weight_mut(NodeIndex::new(component.id()))
            .ok_or(DecompError::InvalidComponentId {
                id: component.id(),
                size,
            })?;
        existing.assign_from(component)
    }

    /// Number of registered components
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Iterate over the components in id order
    pub fn components(&self) -> impl Iterator<Item = &Component> {
        self.graph.node_weights()
    }

    pub fn component(&self, id: ComponentId) -> DecompResult<&Component> {
        self.graph
            .node_weight(NodeIndex::new(id))
            .ok_or(DecompError::InvalidComponentId {
                id,
                size: self.len(),
            })
    }

    /// Look up a component by name
    pub fn find(&self, name: &str) -> Option<&Component> {
        self.components().find(|c| c.name == name)
    }

    fn id_of(&self, name: &str) -> DecompResult<ComponentId> {
        self.find(name)
            .map(Component::id)
            .ok_or_else(|| DecompError::UnknownComponent(name.to_string()))
    }

    /// Decomposition rate of a component in 1/day
    pub fn decomposition_rate(
        &self,
        id: ComponentId,
        temperature: FloatValue,
        wetness: FloatValue,
        ph: FloatValue,
    ) -> DecompResult<FloatValue> {
        Ok(self
            .component(id)?
            .decomposition_rate(temperature, wetness, ph))
    }

    /// Declared products of a component as `(target, fraction)` pairs.
    ///
    /// Empty for unknown ids.
    pub fn products(
        &self,
        id: ComponentId,
    ) -> impl Iterator<Item = (ComponentId, FloatValue)> + '_ {
        self.graph
            .edges(NodeIndex::new(id))
            .map(|edge| (edge.target().index(), *edge.weight()))
    }

    /// Ids of the declared products of a component, in ascending order
    pub fn get_products(&self, id: ComponentId) -> DecompResult<Vec<ComponentId>> {
        self.component(id)?;
        let mut targets: Vec<ComponentId> = self.products(id).map(|(target, _)| target).collect();
        targets.sort_unstable();
        Ok(targets)
    }

    /// Fraction of the decomposed mass of `source` that becomes `target`, 0 if undeclared
    pub fn get_product_fraction(&self, source: ComponentId, target: ComponentId) -> FloatValue {
        if source >= self.len() || target >= self.len() {
            return 0.0;
        }
        self.graph
            .find_edge(NodeIndex::new(source), NodeIndex::new(target))
            .map(|edge| self.graph[edge])
            .unwrap_or(0.0)
    }
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        Self::wallman2006()
    }
}
