use serde::{Deserialize, Serialize};

use crate::config::SystemConfig;
use crate::species::{Species, Stoichiometry};
use crate::system::{QueryError, ReactionSystem, StepError, StepOutcome};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TraceSample {
    pub step: u64,
    pub time: f64,
    pub populations: Vec<u64>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The watched species dropped out.
    WatchAbsent,
    /// Total propensity reached zero.
    Exhausted,
    MaxStepsReached,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Trajectory {
    pub stop_reason: StopReason,
    pub samples: Vec<TraceSample>,
}

impl Trajectory {
    pub fn last(&self) -> Option<&TraceSample> {
        self.samples.last()
    }
}

fn default_schema_version() -> u32 {
    1
}

/// Everything a multi-repetition driver run produced.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunSummary {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub seed: u64,
    pub sample_every: u64,
    /// Column order of `TraceSample::populations`.
    pub species: Vec<Species>,
    pub trajectories: Vec<Trajectory>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunOptions {
    pub sample_every: u64,
    pub max_steps: Option<u64>,
}

impl From<&SystemConfig> for RunOptions {
    fn from(config: &SystemConfig) -> Self {
        Self {
            sample_every: config.sample_every.max(1),
            max_steps: config.step_limit(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Step(#[from] StepError),
    #[error(transparent)]
    Query(#[from] QueryError),
}

fn sample(system: &ReactionSystem, tracked: &[Species]) -> Result<TraceSample, QueryError> {
    Ok(TraceSample {
        step: system.step_count(),
        time: system.clock(),
        populations: system.populations_of(tracked)?,
    })
}

/// Step `system` while `watch` is present (or forever when `watch` is `None`),
/// recording `tracked` populations every `sample_every` steps and once more at
/// the end. `on_sample` sees each sample as it is recorded.
pub fn run_while_present(
    system: &mut ReactionSystem,
    watch: Option<&Stoichiometry>,
    tracked: &[Species],
    options: RunOptions,
    mut on_sample: impl FnMut(&TraceSample),
) -> Result<Trajectory, RunError> {
    let sample_every = options.sample_every.max(1);
    let start_step = system.step_count();
    let mut samples: Vec<TraceSample> = Vec::new();
    let mut record = |system: &ReactionSystem, samples: &mut Vec<TraceSample>| {
        let s = sample(system, tracked)?;
        on_sample(&s);
        samples.push(s);
        Ok::<(), QueryError>(())
    };

    let stop_reason = loop {
        if watch.is_some_and(|w| !system.is_present(w)) {
            break StopReason::WatchAbsent;
        }
        if options
            .max_steps
            .is_some_and(|max| system.step_count() - start_step >= max)
        {
            break StopReason::MaxStepsReached;
        }
        if system.step_count() % sample_every == 0 {
            record(&*system, &mut samples)?;
        }
        if let StepOutcome::Exhausted = system.step()? {
            break StopReason::Exhausted;
        }
    };

    if samples.last().map(|s| s.step) != Some(system.step_count()) {
        record(&*system, &mut samples)?;
    }
    log::debug!(
        "run stopped after {} steps at t = {}: {stop_reason:?}",
        system.step_count() - start_step,
        system.clock()
    );
    Ok(Trajectory {
        stop_reason,
        samples,
    })
}
