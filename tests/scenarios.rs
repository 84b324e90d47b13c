use greenwork::{Behavior, CycleOutcome, Simulation, SimulationConfig};

fn baseline(seed: u64) -> SimulationConfig {
    SimulationConfig {
        num_agents: 20,
        num_items: 1000,
        byzantine_count: 3,
        byzantine_error_rate: 0.3,
        verifier_count: 3,
        fault_tolerance: true,
        seed: Some(seed),
        ..SimulationConfig::default()
    }
}

fn trace(config: SimulationConfig) -> Vec<CycleOutcome> {
    let mut simulation = Simulation::new(config).unwrap();
    let mut cycles = Vec::new();
    while let Some(outcome) = simulation.step().unwrap() {
        cycles.push(outcome);
    }
    cycles
}

#[test]
fn identical_seeds_reproduce_every_cycle() {
    let first = trace(baseline(1234));
    let second = trace(baseline(1234));
    assert_eq!(first.len(), 1000);
    assert_eq!(first, second);

    let other = trace(baseline(4321));
    assert_ne!(first, other);
}

#[test]
fn every_cycle_has_one_executor_and_disjoint_verifiers() {
    for outcome in trace(baseline(5)) {
        assert!(outcome.verifiers.len() <= 3);
        assert!(!outcome.verifiers.contains(&outcome.executor));
        assert!(outcome.approvals <= outcome.verifiers.len());
    }
}

#[test]
fn fault_tolerant_run_succeeds_and_starves_byzantine_agents() {
    let summary = Simulation::new(baseline(42)).unwrap().run().unwrap();

    assert_eq!(summary.completed, 1000);
    assert!(
        (0.95..=0.99).contains(&summary.success_rate),
        "success rate {}",
        summary.success_rate
    );
    assert_eq!(summary.agents.iter().filter(|a| a.is_byzantine).count(), 3);

    let byzantine = summary.mean_tokens(Behavior::Byzantine);
    let honest = summary.mean_tokens(Behavior::Honest);
    assert!(byzantine < honest, "byzantine {byzantine} vs honest {honest}");
}

#[test]
fn disabling_fault_tolerance_lowers_success_rate() {
    let enabled = Simulation::new(baseline(42)).unwrap().run().unwrap();
    let disabled = Simulation::new(SimulationConfig {
        fault_tolerance: false,
        ..baseline(42)
    })
    .unwrap()
    .run()
    .unwrap();

    assert!(
        disabled.success_rate < enabled.success_rate,
        "disabled {} vs enabled {}",
        disabled.success_rate,
        enabled.success_rate
    );
}

#[test]
fn efficiency_falls_as_verifiers_grow() {
    let efficiencies: Vec<f64> = [1, 3, 5, 7, 9]
        .into_iter()
        .map(|verifier_count| {
            Simulation::new(SimulationConfig {
                verifier_count,
                ..baseline(42)
            })
            .unwrap()
            .run()
            .unwrap()
            .useful_work_efficiency
        })
        .collect();

    for pair in efficiencies.windows(2) {
        assert!(pair[1] < pair[0], "{efficiencies:?}");
    }
}

#[test]
fn report_flags_follow_threshold() {
    let summary = Simulation::new(baseline(7)).unwrap().run().unwrap();
    for agent in &summary.agents {
        assert_eq!(agent.detected_byzantine, agent.error_rate > 0.2);
        assert!(agent.score >= 0.0);
        assert!(agent.tasks_completed <= agent.selection_count);
    }
    let detected = summary.agents.iter().filter(|a| a.detected_byzantine).count();
    assert_eq!(summary.detected_byzantine, detected);
}

#[test]
fn config_loads_from_json_with_defaults() {
    let config: SimulationConfig =
        serde_json::from_str(r#"{ "num_agents": 12, "seed": 9, "renewable": { "fixed": 0.1 } }"#)
            .unwrap();
    assert_eq!(config.num_agents, 12);
    assert_eq!(config.seed, Some(9));
    assert_eq!(config.verifier_count, 3);
    assert!(config.validate().is_ok());

    let summary = Simulation::new(config).unwrap().run().unwrap();
    assert!(summary.agents.iter().all(|a| a.renewable_share == 0.1));
}
