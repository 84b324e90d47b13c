//! Greenwork: a Rust library simulating reputation-weighted work distribution with
//! Byzantine-tolerant quorum validation. A population of agents executes work items, some of
//! them Byzantine and prone to returning wrong answers, while a verifier quorum decides
//! whether each executor is rewarded (with a renewable-energy bonus) or penalized.
//!
//! # Features
//! - Closed set of work kinds with linear cost and recomputable ground truth.
//! - Agents with fixed honest/Byzantine profiles and measured error rates.
//! - Reputation-weighted executor selection with an error-rate penalty ladder.
//! - Majority quorum validation and pluggable reward policies.
//! - Fully reproducible runs from a single seeded random stream.
//!
//! # Example
//! ```
//! use greenwork::{GreenworkError, Simulation, SimulationConfig};
//!
//! # fn example() -> Result<(), GreenworkError> {
//! let config = SimulationConfig {
//!     num_agents: 10,
//!     num_items: 100,
//!     byzantine_count: 2,
//!     seed: Some(42),
//!     ..SimulationConfig::default()
//! };
//! let mut simulation = Simulation::new(config)?;
//! let summary = simulation.run()?;
//! assert_eq!(summary.completed, 100);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

mod agent;
mod distributor;
mod error;
mod incentive;
mod quorum;
mod simulation;
mod types;
mod validation;
mod work;

pub use agent::{
    create_population, Agent, RenewableMode, DEFAULT_BYZANTINE_ERROR_RATE,
    HONEST_ERROR_PROBABILITY, MAX_RENEWABLE_SHARE, SEVERE_ERROR_RATE, SUSPECT_ERROR_RATE,
};
pub use distributor::{normalize, Assignment, Distributor};
pub use error::GreenworkError;
pub use incentive::{GreenIncentive, RenewableBonus, RewardPolicy};
pub use quorum::{MajorityQuorum, QuorumRule};
pub use simulation::{Simulation, SimulationConfig, VERIFICATION_OVERHEAD};
pub use types::{
    AgentId, AgentReport, Behavior, CycleOutcome, Outcome, Progress, RunSummary, SimRng,
};
pub use validation::{Settlement, Validator};
pub use work::{
    AdditiveAggregate, Computation, MembershipSearch, MultiplicativeAggregate, Sort,
    WorkGenerator, WorkItem, WorkKind, INPUT_RANGE,
};

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_full_cycle() {
        let mut rng = SimRng::seed_from_u64(21);
        let mut agents =
            create_population(5, 1, 0.3, RenewableMode::Fixed(0.5), &mut rng).unwrap();
        let mut distributor = Distributor::new(true);
        distributor.enqueue(WorkItem::with_inputs(0, WorkKind::Sort, vec![3, 1, 2]));

        let assignment = distributor.distribute(&agents, 3, &mut rng).unwrap().unwrap();
        let mut item = assignment.item;
        let correct = Outcome::Sorted(vec![1, 2, 3]);

        let rewards = GreenIncentive::new(1.0, 0.5, RenewableBonus::AlphaScaled).unwrap();
        let validator = Validator::new(rewards, MajorityQuorum);
        let valid = validator
            .process(&mut item, &correct, &mut agents, &mut rng)
            .unwrap();
        assert!(valid, "Correct answer rejected");

        let executor = &agents[assignment.executor.0];
        assert!((executor.tokens() - 4.5).abs() < 0.01, "Executor reward failed");
        for id in &assignment.verifiers {
            assert!((agents[id.0].tokens() - 1.5).abs() < 0.01, "Verifier reward failed");
        }
    }

    #[tokio::test]
    async fn test_progress_channel() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let config = SimulationConfig {
            num_agents: 6,
            num_items: 25,
            byzantine_count: 1,
            seed: Some(8),
            ..SimulationConfig::default()
        };
        let mut simulation = Simulation::new(config).unwrap().with_progress(tx);
        let summary = simulation.run().unwrap();
        drop(simulation);

        let mut updates = Vec::new();
        while let Some(progress) = rx.recv().await {
            updates.push(progress);
        }
        assert_eq!(updates.len(), 25);
        for (i, progress) in updates.iter().enumerate() {
            assert_eq!(progress.completed, i + 1);
        }
        let last = updates.last().unwrap();
        assert_eq!(last.successful, summary.successful);
        assert!((last.success_rate - summary.success_rate).abs() < 1e-12);
    }
}
