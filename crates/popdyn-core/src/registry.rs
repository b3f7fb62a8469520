use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::species::{Species, Stoichiometry};

/// Whether unknown species may be created on the fly.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Registration {
    /// Unknown species are left out (populations) or cause a rejection (reactions).
    #[default]
    Strict,
    /// Unknown species are registered before use.
    Permissive,
}

/// A code split by registry membership. Both halves are de-duplicated and keep
/// encounter order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Classification {
    pub known: Vec<Species>,
    pub unknown: Vec<Species>,
}

/// What a `set_population` call actually did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PopulationUpdate {
    /// Species that were already registered and got the new value.
    pub updated: Vec<Species>,
    /// Species registered by this call (permissive mode only).
    pub registered: Vec<Species>,
    /// Unknown species dropped in strict mode.
    pub ignored: Vec<Species>,
}

impl PopulationUpdate {
    pub fn is_complete(&self) -> bool {
        self.ignored.is_empty()
    }
}

/// Known species and their current populations, in registration order.
#[derive(Clone, Debug, Default)]
pub struct SpeciesRegistry {
    order: Vec<Species>,
    populations: Vec<u64>,
    index_by_species: HashMap<Species, usize>,
}

impl SpeciesRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry seeded with every species of `code` at population 0.
    pub fn with_species(code: &Stoichiometry) -> Self {
        let mut registry = Self::new();
        for species in code.species() {
            registry.register(species, 0);
        }
        registry
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, species: Species) -> bool {
        self.index_by_species.contains_key(&species)
    }

    pub fn population(&self, species: Species) -> Option<u64> {
        self.index_by_species
            .get(&species)
            .map(|&idx| self.populations[idx])
    }

    /// Species in registration order.
    pub fn species(&self) -> &[Species] {
        &self.order
    }

    /// Populations in registration order.
    pub fn populations(&self) -> &[u64] {
        &self.populations
    }

    pub fn iter(&self) -> impl Iterator<Item = (Species, u64)> + '_ {
        self.order.iter().copied().zip(self.populations.iter().copied())
    }

    pub fn classify(&self, code: &Stoichiometry) -> Classification {
        let mut classification = Classification::default();
        // Stoichiometry terms are already distinct species.
        for species in code.species() {
            if self.contains(species) {
                classification.known.push(species);
            } else {
                classification.unknown.push(species);
            }
        }
        classification
    }

    pub fn set_population(
        &mut self,
        code: &Stoichiometry,
        value: u64,
        mode: Registration,
    ) -> PopulationUpdate {
        let Classification { known, unknown } = self.classify(code);
        for &species in &known {
            let idx = self.index_by_species[&species];
            self.populations[idx] = value;
        }
        let mut update = PopulationUpdate {
            updated: known,
            ..PopulationUpdate::default()
        };
        match mode {
            Registration::Permissive => {
                for &species in &unknown {
                    self.register(species, value);
                }
                update.registered = unknown;
            }
            Registration::Strict => {
                if !unknown.is_empty() {
                    log::debug!(
                        "ignoring population {value} for unregistered species {}",
                        render(&unknown)
                    );
                }
                update.ignored = unknown;
            }
        }
        update
    }

    /// Register `species` at `value` if it is not known yet. Returns whether
    /// the registry grew.
    pub(crate) fn register(&mut self, species: Species, value: u64) -> bool {
        if self.contains(species) {
            return false;
        }
        self.index_by_species.insert(species, self.order.len());
        self.order.push(species);
        self.populations.push(value);
        true
    }

    /// Add `delta` units to a registered species, saturating at zero when the
    /// delta is negative. Returns the shortfall that could not be removed.
    pub(crate) fn apply_delta(&mut self, species: Species, delta: i64) -> u64 {
        let Some(&idx) = self.index_by_species.get(&species) else {
            return 0;
        };
        let current = self.populations[idx];
        if delta >= 0 {
            self.populations[idx] = current.saturating_add(delta.unsigned_abs());
            0
        } else {
            let remove = delta.unsigned_abs();
            self.populations[idx] = current.saturating_sub(remove);
            remove.saturating_sub(current)
        }
    }
}

pub(crate) fn render(species: &[Species]) -> String {
    species.iter().map(|s| s.symbol()).collect()
}
