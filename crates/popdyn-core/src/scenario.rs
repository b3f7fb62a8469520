use serde::{Deserialize, Serialize};

use crate::catalog::{Reaction, Rejection};
use crate::config::{ConfigError, SystemConfig};
use crate::constants::MAX_DEMES;
use crate::registry::Registration;
use crate::species::{Species, Stoichiometry};
use crate::system::ReactionSystem;
use crate::trace::RunOptions;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScenarioError {
    #[error("demes must be within [2, 26], got {0}")]
    InvalidDemes(usize),
    #[error("{name} must be positive and finite, got {value}")]
    InvalidRate { name: &'static str, value: f64 },
    #[error("repetitions must be greater than 0")]
    InvalidRepetitions,
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("scenario reaction rejected: {0}")]
    Rejected(#[from] Rejection),
}

/// A linear chain of demes, each growing on its own substrate and exchanging
/// individuals with its neighbours.
///
/// Deme `i` is labelled by the `i`-th capital letter and its substrate by the
/// matching lowercase letter. Growth consumes one substrate unit
/// (`Xx -> XX`, rate `alpha * X`); migration moves one individual between
/// adjacent demes (`X -> W`, rate `mu * X`).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MigrationScenario {
    pub demes: usize,
    /// Initial population of the first deme.
    pub initial_first: u64,
    /// Initial population of every other deme.
    pub initial_other: u64,
    /// Initial substrate per deme.
    pub substrate: u64,
    /// Growth rate per individual.
    pub alpha: f64,
    /// Migration rate per individual and direction.
    pub mu: f64,
    pub repetitions: usize,
}

impl Default for MigrationScenario {
    fn default() -> Self {
        Self {
            demes: 4,
            initial_first: 25,
            initial_other: 0,
            substrate: 10_000,
            alpha: 1.0,
            mu: 1e-2,
            repetitions: 10,
        }
    }
}

fn deme_symbol(idx: usize) -> char {
    (b'A' + idx as u8) as char
}

fn substrate_symbol(idx: usize) -> char {
    (b'a' + idx as u8) as char
}

fn species_of(symbols: impl Iterator<Item = char>) -> Vec<Species> {
    // Letters are never the null symbol or whitespace.
    symbols.filter_map(|c| Species::new(c).ok()).collect()
}

impl MigrationScenario {
    pub fn validate(&self) -> Result<(), ScenarioError> {
        if !(2..=MAX_DEMES).contains(&self.demes) {
            return Err(ScenarioError::InvalidDemes(self.demes));
        }
        for (name, value) in [("alpha", self.alpha), ("mu", self.mu)] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ScenarioError::InvalidRate { name, value });
            }
        }
        if self.repetitions == 0 {
            return Err(ScenarioError::InvalidRepetitions);
        }
        Ok(())
    }

    /// Deme species in chain order.
    pub fn deme_species(&self) -> Vec<Species> {
        species_of((0..self.demes).map(deme_symbol))
    }

    pub fn substrate_species(&self) -> Vec<Species> {
        species_of((0..self.demes).map(substrate_symbol))
    }

    /// Runs stop once the first deme's substrate is used up.
    pub fn watch(&self) -> Stoichiometry {
        let substrates = self.substrate_species();
        Stoichiometry::from_terms(substrates.first().map(|&s| (s, 1)))
    }

    pub fn build(&self, config: SystemConfig) -> Result<ReactionSystem, ScenarioError> {
        self.validate()?;
        let mut system = ReactionSystem::new(config)?;
        let demes = self.deme_species();
        let substrates = self.substrate_species();
        let single = |s: Species| Stoichiometry::from_terms([(s, 1)]);

        for (idx, (&deme, &food)) in demes.iter().zip(&substrates).enumerate() {
            system.add_reaction(
                Reaction::new(
                    Stoichiometry::from_terms([(deme, 1), (food, 1)]),
                    Stoichiometry::from_terms([(deme, 2)]),
                    self.alpha,
                )
                .with_coefficients(single(deme)),
                Registration::Permissive,
            )?;
            if idx == 0 {
                continue;
            }
            let prev = demes[idx - 1];
            system.add_reaction(
                Reaction::new(single(deme), single(prev), self.mu).with_coefficients(single(deme)),
                Registration::Permissive,
            )?;
            system.add_reaction(
                Reaction::new(single(prev), single(deme), self.mu).with_coefficients(single(prev)),
                Registration::Permissive,
            )?;
        }
        Ok(system)
    }

    /// Reset populations and clock for a fresh repetition.
    pub fn seed_populations(&self, system: &mut ReactionSystem) {
        let demes = self.deme_species();
        let substrates = self.substrate_species();
        for (idx, (&deme, &food)) in demes.iter().zip(&substrates).enumerate() {
            let initial = if idx == 0 {
                self.initial_first
            } else {
                self.initial_other
            };
            system.set_population(
                &Stoichiometry::from_terms([(deme, 1)]),
                initial,
                Registration::Permissive,
            );
            system.set_population(
                &Stoichiometry::from_terms([(food, 1)]),
                self.substrate,
                Registration::Permissive,
            );
        }
        system.restart();
    }
}

/// The small producer/non-producer network used to smoke-test the engine.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DemoScenario {
    pub initial: u64,
    /// Steps between printed rows.
    pub sample_every: u64,
}

impl Default for DemoScenario {
    fn default() -> Self {
        Self {
            initial: 100,
            sample_every: 10,
        }
    }
}

impl DemoScenario {
    const SPECIES: &'static str = "PNRAG";
    const SEEDED: &'static str = "PNRA";
    const REACTIONS: [(&'static str, &'static str); 6] = [
        ("PR", "PP"),
        ("NR", "NN"),
        ("P", "PG"),
        ("GA", "0"),
        ("PRA", "R"),
        ("NRA", "R"),
    ];

    pub fn build(&self, config: SystemConfig) -> Result<ReactionSystem, ScenarioError> {
        let species = Self::code(Self::SPECIES);
        let mut system = ReactionSystem::with_species(config, &species)?;
        for (reactants, products) in Self::REACTIONS {
            system.add_reaction(
                Reaction::new(Self::code(reactants), Self::code(products), 1.0),
                Registration::Strict,
            )?;
        }
        system.set_population(&Self::code(Self::SEEDED), self.initial, Registration::Strict);
        Ok(system)
    }

    /// Run options for this network: the demo's own cadence with the
    /// config's step limit.
    pub fn run_options(&self, config: &SystemConfig) -> RunOptions {
        RunOptions {
            sample_every: self.sample_every.max(1),
            ..RunOptions::from(config)
        }
    }

    pub fn tracked(&self) -> Vec<Species> {
        Self::code(Self::SPECIES).species().collect()
    }

    /// Runs stop when the shared resource `R` is gone.
    pub fn watch(&self) -> Stoichiometry {
        Self::code("R")
    }

    fn code(text: &str) -> Stoichiometry {
        // Constant codes contain only letters and the null symbol.
        text.parse().unwrap_or_default()
    }
}
