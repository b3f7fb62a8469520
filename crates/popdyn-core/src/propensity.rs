use crate::catalog::{Reaction, ReactionCatalog, ReactionId};
use crate::registry::SpeciesRegistry;

/// Per-reaction propensities for one population state, indexed like the catalog.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Propensities {
    values: Vec<f64>,
    total: f64,
}

impl Propensities {
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn get(&self, id: ReactionId) -> Option<f64> {
        self.values.get(id).copied()
    }

    pub fn total(&self) -> f64 {
        self.total
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// True when no reaction can fire under the current populations.
    pub fn is_exhausted(&self) -> bool {
        self.total <= 0.0
    }
}

/// `rate * prod(population(s)^count)` over the coefficient multiset.
///
/// Coefficient species are validated at registration, so a species missing
/// from the registry can only mean population zero.
pub fn propensity(reaction: &Reaction, registry: &SpeciesRegistry) -> f64 {
    reaction
        .coefficients
        .terms()
        .iter()
        .fold(reaction.rate, |acc, &(species, count)| {
            let population = registry.population(species).unwrap_or(0) as f64;
            acc * population.powi(i32::try_from(count).unwrap_or(i32::MAX))
        })
}

pub fn propensities(catalog: &ReactionCatalog, registry: &SpeciesRegistry) -> Propensities {
    let values: Vec<f64> = catalog
        .iter()
        .map(|reaction| propensity(reaction, registry))
        .collect();
    let total = values.iter().sum();
    Propensities { values, total }
}

pub fn total_propensity(catalog: &ReactionCatalog, registry: &SpeciesRegistry) -> f64 {
    propensities(catalog, registry).total()
}
