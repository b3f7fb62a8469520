use super::*;

fn code(s: &str) -> Stoichiometry {
    Stoichiometry::parse(s).unwrap()
}

fn sp(c: char) -> Species {
    Species::new(c).unwrap()
}

fn make_system(
    seed: u64,
    species: &str,
    reactions: &[(&str, &str, f64, &str)],
) -> ReactionSystem {
    let config = SystemConfig {
        seed,
        ..SystemConfig::default()
    };
    let mut system = ReactionSystem::with_species(config, &code(species)).unwrap();
    for &(r, p, rate, c) in reactions {
        system
            .add_reaction(Reaction::parse(r, p, rate, c).unwrap(), Registration::Strict)
            .unwrap();
    }
    system
}

fn set(system: &mut ReactionSystem, species: &str, value: u64) {
    let update = system.set_population(&code(species), value, Registration::Strict);
    assert!(update.is_complete(), "unexpected unknown species in {species}");
}

#[test]
fn single_conversion_fires_first_step() {
    let mut system = make_system(1, "AB", &[("A", "B", 1.0, "A")]);
    set(&mut system, "A", 10);
    assert_eq!(system.propensities().values(), &[0.0, 10.0]);

    let outcome = system.step().unwrap();
    let StepOutcome::Fired(fired) = outcome else {
        panic!("expected a fired reaction, got {outcome:?}");
    };
    assert_eq!(fired.reaction, 1);
    assert_eq!(fired.step, 1);
    assert_eq!(fired.attempts, 1);
    assert_eq!(system.populations_of(&[sp('A'), sp('B')]).unwrap(), vec![9, 1]);
    assert_eq!(system.step_count(), 1);
    assert!(system.clock() > 0.0);
    assert_eq!(system.clock(), fired.waiting_time);
}

#[test]
fn empty_catalog_is_exhausted_immediately() {
    let mut system = make_system(2, "AB", &[]);
    set(&mut system, "A", 5);
    assert_eq!(system.step(), Ok(StepOutcome::Exhausted));
    assert_eq!(system.phase(), Phase::Exhausted);
    assert_eq!(system.step_count(), 0);
    assert_eq!(system.clock(), 0.0);
    assert_eq!(system.populations(), vec![5, 0]);
}

#[test]
fn exhaustion_is_latched_until_state_changes() {
    let mut system = make_system(3, "AB", &[("A", "B", 1.0, "A")]);
    set(&mut system, "A", 1);
    assert!(system.step().unwrap().step().is_some());
    assert!(system.step().unwrap().is_exhausted());
    assert!(system.step().unwrap().is_exhausted());
    assert_eq!(system.step_count(), 1);

    set(&mut system, "A", 2);
    assert_eq!(system.phase(), Phase::Idle);
    assert_eq!(system.step().unwrap().step(), Some(2));
}

#[test]
fn clock_and_counter_advance_together() {
    let mut system = make_system(
        4,
        "PNRAG",
        &[
            ("PR", "PP", 1.0, "0"),
            ("NR", "NN", 1.0, "0"),
            ("P", "PG", 1.0, "0"),
            ("GA", "0", 1.0, "0"),
            ("PRA", "R", 1.0, "0"),
            ("NRA", "R", 1.0, "0"),
        ],
    );
    set(&mut system, "PNRA", 100);
    let mut last_clock = system.clock();
    for expected_step in 1..=200 {
        match system.step().unwrap() {
            StepOutcome::Fired(fired) => {
                assert_eq!(fired.step, expected_step);
                assert_eq!(system.step_count(), expected_step);
                assert!(system.clock() > last_clock, "clock must strictly increase");
                last_clock = system.clock();
            }
            StepOutcome::Exhausted => panic!("constant-rate network cannot exhaust"),
        }
    }
}

#[test]
fn over_consumption_clamps_at_zero() {
    let mut system = make_system(5, "AB", &[("AA", "B", 1.0, "A")]);
    set(&mut system, "A", 1);
    assert!(system.step().unwrap().step().is_some());
    assert_eq!(system.population(sp('A')), Some(0));
    assert_eq!(system.population(sp('B')), Some(1));
}

#[test]
fn populations_never_go_negative() {
    let mut system = make_system(
        6,
        "XYZ",
        &[
            ("XXX", "Y", 2.0, "X"),
            ("YY", "ZX", 1.0, "Y"),
            ("Z", "XX", 0.5, "Z"),
        ],
    );
    set(&mut system, "X", 4);
    for steps in 1..=500u64 {
        if system.step().unwrap().is_exhausted() {
            break;
        }
        // Each step adds at most two units, so anything larger is an underflow wrap.
        assert!(system.populations().iter().all(|&n| n <= 4 + 2 * steps));
    }
}

/// An empty reactant side counts as available, so `0 -> A` keeps firing.
/// The earlier scripts treated the null code as absent and never fired it.
#[test]
fn source_reaction_with_empty_reactants_fires() {
    let mut system = make_system(7, "A", &[("0", "A", 1.0, "0")]);
    for _ in 0..5 {
        assert!(system.step().unwrap().step().is_some());
    }
    assert_eq!(system.population(sp('A')), Some(5));
}

#[test]
fn unavailable_reactants_are_redrawn_from_the_same_distribution() {
    // Both reactions carry propensity through A, but only the second has its reactant.
    let mut system = make_system(8, "ABC", &[("B", "C", 1.0, "A"), ("A", "C", 1.0, "A")]);
    set(&mut system, "A", 3);
    for _ in 0..3 {
        match system.step().unwrap() {
            StepOutcome::Fired(fired) => {
                assert_eq!(fired.reaction, 2);
                assert!(fired.attempts >= 1);
            }
            StepOutcome::Exhausted => panic!("A still present"),
        }
    }
    assert_eq!(system.populations(), vec![0, 0, 3]);
    assert!(system.step().unwrap().is_exhausted());
}

#[test]
fn no_available_reaction_is_reported_without_mutation() {
    let mut system = make_system(9, "ABC", &[("B", "C", 1.0, "A")]);
    set(&mut system, "A", 5);
    assert!(matches!(
        system.step(),
        Err(StepError::NoAvailableReaction { total_propensity }) if total_propensity == 5.0
    ));
    assert_eq!(system.populations(), vec![5, 0, 0]);
    assert_eq!(system.step_count(), 0);
    assert_eq!(system.clock(), 0.0);
    assert_eq!(system.phase(), Phase::Idle);
}

#[test]
fn resample_limit_is_reported_without_mutation() {
    let config = SystemConfig {
        seed: 10,
        max_resample_attempts: 1,
        ..SystemConfig::default()
    };
    let mut system = ReactionSystem::with_species(config, &code("ABC")).unwrap();
    system
        .add_reaction(
            Reaction::parse("B", "C", 1e12, "A").unwrap(),
            Registration::Strict,
        )
        .unwrap();
    system
        .add_reaction(
            Reaction::parse("A", "C", 1e-12, "A").unwrap(),
            Registration::Strict,
        )
        .unwrap();
    set(&mut system, "A", 1);
    assert_eq!(
        system.step(),
        Err(StepError::ResampleLimitExceeded { attempts: 1 })
    );
    assert_eq!(system.populations(), vec![1, 0, 0]);
    assert_eq!(system.step_count(), 0);
}

#[test]
fn same_seed_reproduces_trajectory() {
    let reactions = [("A", "B", 1.0, "A"), ("B", "A", 0.5, "B")];
    let mut a = make_system(11, "AB", &reactions);
    let mut b = make_system(11, "AB", &reactions);
    set(&mut a, "A", 50);
    set(&mut b, "A", 50);
    for _ in 0..100 {
        assert_eq!(a.step(), b.step());
        assert_eq!(a.populations(), b.populations());
        assert_eq!(a.clock(), b.clock());
    }
}

#[test]
fn rejected_registrations_leave_sizes_unchanged() {
    let mut system = make_system(12, "A", &[]);
    let rejected = system.add_reaction(
        Reaction::parse("A", "Q", 1.0, "A").unwrap(),
        Registration::Strict,
    );
    assert!(matches!(rejected, Err(Rejection::UnknownSpecies { .. })));
    let rejected = system.add_reaction(
        Reaction::parse("A", "A", -2.0, "A").unwrap(),
        Registration::Permissive,
    );
    assert!(matches!(rejected, Err(Rejection::InvalidRate { .. })));
    assert_eq!(system.catalog().len(), 1);
    assert_eq!(system.registry().len(), 1);
}

#[test]
fn is_present_requires_registered_positive_species() {
    let mut system = make_system(13, "AB", &[]);
    set(&mut system, "A", 3);
    assert!(system.is_present(&code("A")));
    assert!(!system.is_present(&code("AB")));
    assert!(!system.is_present(&code("0")));
    assert!(!system.is_present(&code("")));
    assert!(!system.is_present(&code("Z")));
    set(&mut system, "B", 1);
    assert!(system.is_present(&code("AB0")));
}

#[test]
fn populations_of_follows_request_order() {
    let mut system = make_system(14, "ABC", &[]);
    set(&mut system, "A", 1);
    set(&mut system, "B", 2);
    set(&mut system, "C", 3);
    assert_eq!(
        system.populations_of(&[sp('C'), sp('A'), sp('C')]).unwrap(),
        vec![3, 1, 3]
    );
    assert_eq!(
        system.populations_of(&[sp('A'), sp('W')]),
        Err(QueryError::UnknownSpecies(sp('W')))
    );
}

#[test]
fn set_clock_validates_and_restart_resets() {
    let mut system = make_system(15, "A", &[("A", "0", 1.0, "A")]);
    set(&mut system, "A", 2);
    assert!(matches!(
        system.set_clock(-1.0),
        Err(StateError::InvalidClock(_))
    ));
    assert!(system.set_clock(f64::NAN).is_err());
    system.set_clock(3.5).unwrap();
    system.step().unwrap();
    assert!(system.clock() > 3.5);
    system.restart();
    assert_eq!(system.clock(), 0.0);
    assert_eq!(system.step_count(), 0);
    assert_eq!(system.population(sp('A')), Some(1));
}

#[test]
fn permissive_population_update_extends_registry_mid_run() {
    let mut system = make_system(16, "A", &[("A", "0", 1.0, "A")]);
    set(&mut system, "A", 2);
    system.step().unwrap();
    let update = system.set_population(&code("K"), 4, Registration::Permissive);
    assert_eq!(update.registered, vec![sp('K')]);
    assert_eq!(system.registry().species(), &[sp('A'), sp('K')]);
    assert_eq!(system.populations(), vec![1, 4]);
}

#[test]
fn symmetric_two_deme_migration_conserves_and_balances() {
    const TRIALS: u64 = 10;
    const BURN_IN: usize = 1_000;
    const STEPS: usize = 5_000;
    const TOTAL: u64 = 100;

    let mu = 0.01;
    let mut fraction_sum = 0.0;
    let mut samples = 0usize;
    for trial in 0..TRIALS {
        let mut system = make_system(
            100 + trial,
            "AB",
            &[("A", "B", mu, "A"), ("B", "A", mu, "B")],
        );
        set(&mut system, "A", TOTAL);
        for i in 0..STEPS {
            assert!(system.step().unwrap().step().is_some());
            let pops = system.populations_of(&[sp('A'), sp('B')]).unwrap();
            assert_eq!(pops[0] + pops[1], TOTAL, "migration must conserve individuals");
            if i >= BURN_IN {
                fraction_sum += pops[1] as f64 / TOTAL as f64;
                samples += 1;
            }
        }
    }
    let mean_fraction = fraction_sum / samples as f64;
    assert!(
        (0.4..=0.6).contains(&mean_fraction),
        "long-run deme B share should approach 1/2, got {mean_fraction}"
    );
}

#[test]
fn describe_reactions_lists_catalog() {
    let system = make_system(17, "GA", &[("GA", "0", 1.0, "0")]);
    assert!(system.describe_reactions().contains("# GA\t->\t0\t1e0\t0"));
    assert_eq!(system.reactions().count(), 1);
}
