use rand::distr::weighted::WeightedIndex;
use rand_chacha::ChaCha12Rng;
use rand_distr::{Distribution, Exp};

use crate::catalog::{Reaction, ReactionCatalog, ReactionId, Rejection};
use crate::config::{ConfigError, SystemConfig};
use crate::propensity::{propensities, Propensities};
use crate::registry::{PopulationUpdate, Registration, SpeciesRegistry};
use crate::rng::create_rng;
use crate::species::{Species, Stoichiometry};

#[cfg(test)]
mod tests;

/// Scheduler phase. `Exhausted` is latched until populations or reactions change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Exhausted,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FiredReaction {
    /// Step counter after this reaction.
    pub step: u64,
    pub reaction: ReactionId,
    pub waiting_time: f64,
    /// Categorical draws needed to hit an available reaction.
    pub attempts: usize,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum StepOutcome {
    Fired(FiredReaction),
    /// Total propensity is zero; nothing can fire under the current populations.
    Exhausted,
}

impl StepOutcome {
    /// New step counter, or `None` on exhaustion.
    pub fn step(&self) -> Option<u64> {
        match self {
            StepOutcome::Fired(fired) => Some(fired.step),
            StepOutcome::Exhausted => None,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, StepOutcome::Exhausted)
    }
}

/// Fatal step conditions. State is left untouched when any of these is returned.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StepError {
    #[error(
        "total propensity {total_propensity} is carried only by reactions whose reactants are absent"
    )]
    NoAvailableReaction { total_propensity: f64 },
    #[error("no available reaction drawn after {attempts} attempts")]
    ResampleLimitExceeded { attempts: usize },
    #[error("total propensity {total_propensity} is not finite")]
    NonFinitePropensity { total_propensity: f64 },
    #[error("sampling failed: {0}")]
    Sampling(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("species '{0}' is not registered")]
    UnknownSpecies(Species),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StateError {
    #[error("clock must be finite and non-negative, got {0}")]
    InvalidClock(f64),
}

/// A reaction network together with its populations, clock and RNG.
pub struct ReactionSystem {
    registry: SpeciesRegistry,
    catalog: ReactionCatalog,
    config: SystemConfig,
    rng: ChaCha12Rng,
    clock: f64,
    steps: u64,
    phase: Phase,
}

impl Default for ReactionSystem {
    fn default() -> Self {
        Self::from_parts(SpeciesRegistry::new(), SystemConfig::default())
    }
}

impl ReactionSystem {
    pub fn new(config: SystemConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::from_parts(SpeciesRegistry::new(), config))
    }

    /// System whose registry starts with every species of `species` at population 0.
    pub fn with_species(
        config: SystemConfig,
        species: &Stoichiometry,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::from_parts(SpeciesRegistry::with_species(species), config))
    }

    fn from_parts(registry: SpeciesRegistry, config: SystemConfig) -> Self {
        let rng = create_rng(config.seed);
        Self {
            registry,
            catalog: ReactionCatalog::new(),
            config,
            rng,
            clock: 0.0,
            steps: 0,
            phase: Phase::Idle,
        }
    }

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    pub fn registry(&self) -> &SpeciesRegistry {
        &self.registry
    }

    pub fn catalog(&self) -> &ReactionCatalog {
        &self.catalog
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Replace the RNG stream; clock, counters and populations are kept.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = create_rng(seed);
    }

    pub fn set_population(
        &mut self,
        code: &Stoichiometry,
        value: u64,
        mode: Registration,
    ) -> PopulationUpdate {
        self.phase = Phase::Idle;
        self.registry.set_population(code, value, mode)
    }

    pub fn add_reaction(
        &mut self,
        reaction: Reaction,
        mode: Registration,
    ) -> Result<ReactionId, Rejection> {
        let id = self
            .catalog
            .add_reaction(&mut self.registry, reaction, mode)?;
        self.phase = Phase::Idle;
        Ok(id)
    }

    pub fn propensities(&self) -> Propensities {
        propensities(&self.catalog, &self.registry)
    }

    pub fn total_propensity(&self) -> f64 {
        self.propensities().total()
    }

    /// Every distinct reactant has population > 0. An empty reactant side
    /// is always available.
    fn reactants_available(&self, id: ReactionId) -> bool {
        self.catalog.get(id).is_some_and(|reaction| {
            reaction
                .reactants
                .species()
                .all(|s| self.registry.population(s).unwrap_or(0) > 0)
        })
    }

    /// Fire one reaction drawn with probability proportional to its propensity.
    ///
    /// Draws reuse the propensity vector computed at the start of the step;
    /// a draw whose reactants are absent is discarded and redrawn, up to
    /// `max_resample_attempts` times.
    pub fn step(&mut self) -> Result<StepOutcome, StepError> {
        if self.phase == Phase::Exhausted {
            return Ok(StepOutcome::Exhausted);
        }

        let props = self.propensities();
        let total_propensity = props.total();
        if props.is_exhausted() {
            log::debug!(
                "reaction system exhausted at step {} (t = {})",
                self.steps,
                self.clock
            );
            self.phase = Phase::Exhausted;
            return Ok(StepOutcome::Exhausted);
        }
        if !total_propensity.is_finite() {
            return Err(StepError::NonFinitePropensity { total_propensity });
        }

        let any_available = props
            .values()
            .iter()
            .enumerate()
            .any(|(id, &p)| p > 0.0 && self.reactants_available(id));
        if !any_available {
            log::warn!(
                "step {}: positive propensity {total_propensity} but no reaction has its reactants",
                self.steps
            );
            return Err(StepError::NoAvailableReaction { total_propensity });
        }

        let chooser = WeightedIndex::<f64>::new(props.values())
            .map_err(|e| StepError::Sampling(e.to_string()))?;
        let waiting =
            Exp::new(total_propensity).map_err(|e| StepError::Sampling(e.to_string()))?;

        let mut attempts = 0;
        let reaction = loop {
            if attempts >= self.config.max_resample_attempts {
                log::warn!(
                    "step {}: gave up after {attempts} draws without an available reaction",
                    self.steps
                );
                return Err(StepError::ResampleLimitExceeded { attempts });
            }
            attempts += 1;
            let id = chooser.sample(&mut self.rng);
            if self.reactants_available(id) {
                break id;
            }
        };

        self.fire(reaction);
        let waiting_time = waiting.sample(&mut self.rng);
        self.clock += waiting_time;
        self.steps += 1;
        log::trace!(
            "step {}: reaction {reaction} after {attempts} draw(s), dt = {waiting_time}",
            self.steps
        );

        Ok(StepOutcome::Fired(FiredReaction {
            step: self.steps,
            reaction,
            waiting_time,
            attempts,
        }))
    }

    fn fire(&mut self, id: ReactionId) {
        let Some(reaction) = self.catalog.get(id) else {
            return;
        };
        for &(species, count) in reaction.reactants.terms() {
            let shortfall = self.registry.apply_delta(species, -i64::from(count));
            if shortfall > 0 {
                log::debug!(
                    "reaction {id} consumed {count} {species} with {shortfall} missing; clamped at 0"
                );
            }
        }
        for &(species, count) in reaction.products.terms() {
            self.registry.apply_delta(species, i64::from(count));
        }
    }

    /// True iff `code` names at least one species and every one of them is
    /// registered with population > 0.
    pub fn is_present(&self, code: &Stoichiometry) -> bool {
        !code.is_empty()
            && code
                .species()
                .all(|s| self.registry.population(s).is_some_and(|n| n > 0))
    }

    /// Populations of `species`, in the requested order.
    pub fn populations_of(&self, species: &[Species]) -> Result<Vec<u64>, QueryError> {
        species
            .iter()
            .map(|&s| {
                self.registry
                    .population(s)
                    .ok_or(QueryError::UnknownSpecies(s))
            })
            .collect()
    }

    /// All populations in registry order.
    pub fn populations(&self) -> Vec<u64> {
        self.registry.populations().to_vec()
    }

    pub fn population(&self, species: Species) -> Option<u64> {
        self.registry.population(species)
    }

    pub fn clock(&self) -> f64 {
        self.clock
    }

    pub fn set_clock(&mut self, value: f64) -> Result<(), StateError> {
        if !(value.is_finite() && value >= 0.0) {
            return Err(StateError::InvalidClock(value));
        }
        self.clock = value;
        Ok(())
    }

    pub fn step_count(&self) -> u64 {
        self.steps
    }

    /// Zero the clock and step counter for a new trial. Populations are kept.
    pub fn restart(&mut self) {
        self.clock = 0.0;
        self.steps = 0;
        self.phase = Phase::Idle;
    }

    pub fn reactions(&self) -> impl Iterator<Item = (ReactionId, &Reaction)> {
        self.catalog.user_reactions()
    }

    pub fn describe_reactions(&self) -> String {
        self.catalog.describe()
    }
}
