/// Symbol reserved for "no species" in textual codes.
pub const NULL_SYMBOL: char = '0';

/// Index of the synthetic no-op reaction seeded into every catalog.
pub const NOOP_REACTION: usize = 0;

/// Default cap on categorical redraws per step before the scheduler gives up.
/// Only reached when available reactions carry a vanishing share of the total
/// propensity.
pub const DEFAULT_MAX_RESAMPLE_ATTEMPTS: usize = 1_000_000;

/// Number of letters available for per-deme symbols in the migration scenario.
pub const MAX_DEMES: usize = 26;

/// Prime multiplier used to derive per-trial seeds from a base seed.
pub const TRIAL_SEED_PRIME: u64 = 7919;
