pub mod catalog;
pub mod config;
pub mod constants;
pub mod loader;
pub mod propensity;
pub mod registry;
pub mod rng;
pub mod scenario;
pub mod species;
pub mod system;
pub mod trace;

pub use catalog::{Reaction, ReactionCatalog, ReactionId, Rejection};
pub use config::{ConfigError, SystemConfig};
pub use registry::{Classification, PopulationUpdate, Registration, SpeciesRegistry};
pub use species::{Species, Stoichiometry};
pub use system::{FiredReaction, ReactionSystem, StepError, StepOutcome};
pub use trace::{RunOptions, RunSummary, StopReason, TraceSample, Trajectory};
