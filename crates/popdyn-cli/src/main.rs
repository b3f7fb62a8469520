use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use popdyn_core::config::SystemConfig;
use popdyn_core::loader::{load_populations, load_reactions};
use popdyn_core::registry::Registration;
use popdyn_core::rng::derive_trial_seed;
use popdyn_core::scenario::{DemoScenario, MigrationScenario};
use popdyn_core::species::{Species, Stoichiometry};
use popdyn_core::system::ReactionSystem;
use popdyn_core::trace::{run_while_present, RunOptions, RunSummary, TraceSample};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "popdyn")]
#[command(about = "Stochastic population dynamics on reaction networks")]
struct Cli {
    /// Path to a system config file (JSON); defaults are used when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the config seed
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Output directory for summary.json (optional)
    #[arg(long, global = true)]
    out: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a network loaded from population and reaction tables
    Run {
        /// Population table: `<code> <count>` per line
        #[arg(long)]
        populations: PathBuf,

        /// Reaction table: `reactants products [rate [coefficients]]` per line
        #[arg(long)]
        reactions: PathBuf,

        /// Stop once any species of this code is absent
        #[arg(long)]
        watch: Option<String>,

        /// Register unknown species found in the reaction table
        #[arg(long)]
        permissive: bool,

        /// Number of independent repetitions
        #[arg(long, default_value_t = 1)]
        repetitions: usize,
    },
    /// Growth on private substrates with migration along a chain of demes
    Migration {
        /// Number of demes (2..=26)
        #[arg(short = 'P', long = "populations")]
        demes: Option<usize>,

        /// Initial population of the first deme
        #[arg(short = 'N', long = "initialcond-firstpop")]
        initial_first: Option<u64>,

        /// Initial population of every other deme
        #[arg(short = 'n', long = "initialcond-otherpop")]
        initial_other: Option<u64>,

        /// Initial substrate per deme
        #[arg(short = 'S', long)]
        substrate: Option<u64>,

        /// Number of independent repetitions
        #[arg(short = 'r', long)]
        repetitions: Option<usize>,

        /// Migration rate per individual and direction
        #[arg(short = 'm', long)]
        mu: Option<f64>,

        /// Growth rate per individual
        #[arg(short = 'a', long)]
        alpha: Option<f64>,

        /// Steps between printed rows; overrides the config's sample_every
        #[arg(short = 'o', long = "output-steps")]
        output_steps: Option<u64>,
    },
    /// Producer/non-producer demo network
    Demo {
        /// Initial population of P, N, R and A
        #[arg(long)]
        initial: Option<u64>,
    },
    /// Dump the default configuration to stdout
    DumpDefaultConfig,
}

fn load_config(path: Option<&Path>, seed: Option<u64>) -> Result<SystemConfig> {
    let mut config = match path {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("failed to open config file {}", path.display()))?;
            serde_json::from_reader(BufReader::new(file)).context("failed to parse config")?
        }
        None => SystemConfig::default(),
    };
    if let Some(seed) = seed {
        config.seed = seed;
    }
    config.validate().context("Config validation error")?;
    Ok(config)
}

fn print_header(species: &[Species]) {
    let mut line = format!("{:>8}", "time");
    for s in species {
        line.push_str(&format!(" {:>5}", s.to_string()));
    }
    println!("{line}");
}

fn print_sample(sample: &TraceSample) {
    let mut line = format!("{:8.3}", sample.time);
    for n in &sample.populations {
        line.push_str(&format!(" {n:5}"));
    }
    println!("{line}");
}

/// Run `repetitions` trials of `system`, calling `prepare` before each one.
fn run_repetitions(
    system: &mut ReactionSystem,
    watch: Option<&Stoichiometry>,
    tracked: &[Species],
    repetitions: usize,
    options: RunOptions,
    mut prepare: impl FnMut(&mut ReactionSystem),
) -> Result<RunSummary> {
    let config = system.config().clone();
    let mut trajectories = Vec::with_capacity(repetitions);

    println!("{}", system.describe_reactions());
    for trial in 0..repetitions {
        prepare(system);
        system.reseed(derive_trial_seed(config.seed, trial));
        println!("# repetition {}", trial + 1);
        print_header(tracked);
        let trajectory = run_while_present(system, watch, tracked, options, print_sample)
            .with_context(|| format!("repetition {} failed", trial + 1))?;
        log::info!(
            "repetition {}: {:?} after {} steps at t = {:.3}",
            trial + 1,
            trajectory.stop_reason,
            system.step_count(),
            system.clock()
        );
        trajectories.push(trajectory);
    }

    Ok(RunSummary {
        schema_version: 1,
        seed: config.seed,
        sample_every: options.sample_every,
        species: tracked.to_vec(),
        trajectories,
    })
}

fn run_tables(
    config: SystemConfig,
    populations: &Path,
    reactions: &Path,
    watch: Option<&str>,
    permissive: bool,
    repetitions: usize,
) -> Result<RunSummary> {
    if repetitions == 0 {
        bail!("repetitions must be greater than 0");
    }
    let reaction_mode = if permissive {
        Registration::Permissive
    } else {
        Registration::Strict
    };
    let mut system = ReactionSystem::new(config).context("Config validation error")?;
    load_populations(&mut system, populations, Registration::Permissive)
        .context("failed to load population table")?;
    let report = load_reactions(&mut system, reactions, reaction_mode)
        .context("failed to load reaction table")?;
    if !report.rejected.is_empty() {
        log::warn!(
            "{} of {} reactions rejected",
            report.rejected.len(),
            report.rejected.len() + report.accepted.len()
        );
    }

    let watch = watch
        .map(Stoichiometry::parse)
        .transpose()
        .context("invalid watch code")?;
    let tracked = system.registry().species().to_vec();
    let initial = system.populations();
    let options = RunOptions::from(system.config());

    run_repetitions(&mut system, watch.as_ref(), &tracked, repetitions, options, |system| {
        for (&species, &value) in tracked.iter().zip(&initial) {
            system.set_population(
                &Stoichiometry::from_terms([(species, 1)]),
                value,
                Registration::Strict,
            );
        }
        system.restart();
    })
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let summary = match cli.command {
        Commands::DumpDefaultConfig => {
            let config = SystemConfig::default();
            println!("{}", serde_json::to_string_pretty(&config)?);
            return Ok(());
        }
        Commands::Run {
            populations,
            reactions,
            watch,
            permissive,
            repetitions,
        } => {
            let config = load_config(cli.config.as_deref(), cli.seed)?;
            run_tables(
                config,
                &populations,
                &reactions,
                watch.as_deref(),
                permissive,
                repetitions,
            )?
        }
        Commands::Migration {
            demes,
            initial_first,
            initial_other,
            substrate,
            repetitions,
            mu,
            alpha,
            output_steps,
        } => {
            let config = load_config(cli.config.as_deref(), cli.seed)?;
            let mut options = RunOptions::from(&config);
            if let Some(every) = output_steps {
                options.sample_every = every.max(1);
            }
            let defaults = MigrationScenario::default();
            let scenario = MigrationScenario {
                demes: demes.unwrap_or(defaults.demes),
                initial_first: initial_first.unwrap_or(defaults.initial_first),
                initial_other: initial_other.unwrap_or(defaults.initial_other),
                substrate: substrate.unwrap_or(defaults.substrate),
                alpha: alpha.unwrap_or(defaults.alpha),
                mu: mu.unwrap_or(defaults.mu),
                repetitions: repetitions.unwrap_or(defaults.repetitions),
            };
            let mut system = scenario
                .build(config)
                .context("failed to build migration scenario")?;
            let watch = scenario.watch();
            let tracked = scenario.deme_species();
            run_repetitions(
                &mut system,
                Some(&watch),
                &tracked,
                scenario.repetitions,
                options,
                |system| scenario.seed_populations(system),
            )?
        }
        Commands::Demo { initial } => {
            let config = load_config(cli.config.as_deref(), cli.seed)?;
            let defaults = DemoScenario::default();
            let demo = DemoScenario {
                initial: initial.unwrap_or(defaults.initial),
                ..defaults
            };
            let options = demo.run_options(&config);
            let mut system = demo
                .build(config)
                .context("failed to build demo network")?;
            let watch = demo.watch();
            run_repetitions(
                &mut system,
                Some(&watch),
                &demo.tracked(),
                1,
                options,
                |_| {},
            )?
        }
    };

    if let Some(out_dir) = cli.out {
        std::fs::create_dir_all(&out_dir).context("failed to create output directory")?;
        let summary_path = out_dir.join("summary.json");
        let file = File::create(summary_path).context("failed to create summary file")?;
        serde_json::to_writer_pretty(file, &summary).context("failed to write summary")?;
        println!("Run complete. Results saved to {:?}", out_dir);
    }
    Ok(())
}
