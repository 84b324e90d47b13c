use crate::{
    agent::{create_population, Agent, RenewableMode, DEFAULT_BYZANTINE_ERROR_RATE},
    distributor::Distributor,
    error::GreenworkError,
    incentive::{GreenIncentive, RenewableBonus},
    quorum::MajorityQuorum,
    types::{mean, AgentReport, CycleOutcome, Progress, RunSummary, SimRng},
    validation::Validator,
    work::WorkGenerator,
};
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

/// Share of one work unit charged per verifier when computing useful-work efficiency.
pub const VERIFICATION_OVERHEAD: f64 = 0.1;

/// Parameters of a single simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Population size \( N \).
    pub num_agents: usize,

    /// Work items generated and processed in the run.
    pub num_items: usize,

    /// Agents drawn uniformly at creation to behave Byzantine.
    pub byzantine_count: usize,

    /// Error probability of each Byzantine agent.
    pub byzantine_error_rate: f64,

    /// Reward multiplier \( k \).
    pub reward_multiplier: f64,

    /// Verifier reward coefficient \( z \).
    pub verifier_reward: f64,

    /// Verifiers per item \( V \).
    pub verifier_count: usize,

    /// How each agent's renewable share \( \alpha \) is assigned.
    pub renewable: RenewableMode,

    /// How the renewable bonus enters the executor reward.
    pub renewable_bonus: RenewableBonus,

    /// Error rate above which an agent is reported as Byzantine. Selection ignores it.
    pub byzantine_threshold: f64,

    /// Reputation-weighted selection with the error-rate ladder. `false` selects uniformly.
    pub fault_tolerance: bool,

    /// Seed for the random stream. `None` seeds from the OS.
    pub seed: Option<u64>,

    /// Smallest generated input size, inclusive.
    pub min_item_size: usize,

    /// Largest generated input size, inclusive.
    pub max_item_size: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            num_agents: 20,
            num_items: 1000,
            byzantine_count: 3,
            byzantine_error_rate: DEFAULT_BYZANTINE_ERROR_RATE,
            reward_multiplier: 1.0,
            verifier_reward: 0.5,
            verifier_count: 3,
            renewable: RenewableMode::Independent,
            renewable_bonus: RenewableBonus::AlphaScaled,
            byzantine_threshold: 0.2,
            fault_tolerance: true,
            seed: None,
            min_item_size: 10,
            max_item_size: 100,
        }
    }
}

impl SimulationConfig {
    /// Checks every parameter before a run starts.
    ///
    /// # Errors
    /// Returns [`GreenworkError::InvalidConfig`] naming the first invalid parameter.
    pub fn validate(&self) -> Result<(), GreenworkError> {
        let invalid = |msg: &str| -> Result<(), GreenworkError> {
            Err(GreenworkError::InvalidConfig(msg.into()))
        };
        if self.num_agents == 0 {
            return invalid("num_agents must be at least 1");
        }
        if self.num_items == 0 {
            return invalid("num_items must be at least 1");
        }
        if self.byzantine_count > self.num_agents {
            return invalid("byzantine_count exceeds num_agents");
        }
        if !(0.0..=1.0).contains(&self.byzantine_error_rate) {
            return invalid("byzantine_error_rate must be in [0, 1]");
        }
        if !(0.0..=1.0).contains(&self.byzantine_threshold) {
            return invalid("byzantine_threshold must be in [0, 1]");
        }
        if self.min_item_size > self.max_item_size {
            return invalid("min_item_size exceeds max_item_size");
        }
        // Remaining parameters are checked by the types that own them.
        GreenIncentive::new(self.reward_multiplier, self.verifier_reward, self.renewable_bonus)?;
        if let RenewableMode::Fixed(alpha) = self.renewable {
            if !(0.0..=0.5).contains(&alpha) {
                return invalid("renewable share must be in [0, 0.5]");
            }
        }
        Ok(())
    }
}

/// Drives work items through distribution, execution, validation and settlement.
pub struct Simulation {
    config: SimulationConfig,
    agents: Vec<Agent>,
    selections: Vec<u64>,
    distributor: Distributor,
    validator: Validator<GreenIncentive, MajorityQuorum>,
    rng: SimRng,
    completed: usize,
    successful: usize,
    progress: Option<UnboundedSender<Progress>>,
}

impl Simulation {
    /// Validates the configuration, creates the population and queues every work item.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid.
    pub fn new(config: SimulationConfig) -> Result<Self, GreenworkError> {
        config.validate()?;
        let mut rng = match config.seed {
            Some(seed) => SimRng::seed_from_u64(seed),
            None => SimRng::from_entropy(),
        };

        let agents = create_population(
            config.num_agents,
            config.byzantine_count,
            config.byzantine_error_rate,
            config.renewable,
            &mut rng,
        )?;

        let mut distributor = Distributor::new(config.fault_tolerance);
        let mut generator = WorkGenerator::new(config.min_item_size..=config.max_item_size)?;
        for _ in 0..config.num_items {
            distributor.enqueue(generator.next_item(&mut rng)?);
        }

        let rewards = GreenIncentive::new(
            config.reward_multiplier,
            config.verifier_reward,
            config.renewable_bonus,
        )?;

        Ok(Self {
            selections: vec![0; agents.len()],
            agents,
            distributor,
            validator: Validator::new(rewards, MajorityQuorum),
            rng,
            completed: 0,
            successful: 0,
            progress: None,
            config,
        })
    }

    /// Sends a [`Progress`] update on `sender` after every cycle.
    pub fn with_progress(mut self, sender: UnboundedSender<Progress>) -> Self {
        self.progress = Some(sender);
        self
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn completed(&self) -> usize {
        self.completed
    }

    pub fn successful(&self) -> usize {
        self.successful
    }

    pub fn success_rate(&self) -> f64 {
        if self.completed == 0 {
            0.0
        } else {
            self.successful as f64 / self.completed as f64
        }
    }

    /// Processes the next queued item to completion.
    ///
    /// Returns `Ok(None)` once the queue is exhausted.
    pub fn step(&mut self) -> Result<Option<CycleOutcome>, GreenworkError> {
        let Some(assignment) =
            self.distributor
                .distribute(&self.agents, self.config.verifier_count, &mut self.rng)?
        else {
            return Ok(None);
        };
        let mut item = assignment.item;
        let executor = assignment.executor;
        self.selections[executor.0] += 1;

        let candidate = self.agents[executor.0].execute(&item, &mut self.rng);
        let valid = self
            .validator
            .process(&mut item, &candidate, &mut self.agents, &mut self.rng)?;

        self.completed += 1;
        if valid {
            self.successful += 1;
        } else {
            let error_rate = self.agents[executor.0].error_rate();
            if error_rate > self.config.byzantine_threshold {
                warn!(%executor, error_rate, "executor exceeds byzantine threshold");
            }
        }

        let progress = Progress {
            completed: self.completed,
            successful: self.successful,
            success_rate: self.success_rate(),
        };
        if let Some(sender) = &self.progress {
            let _ = sender.send(progress);
        }
        debug!(
            item = item.id(),
            valid,
            success_rate = progress.success_rate,
            "cycle complete"
        );

        Ok(Some(CycleOutcome {
            item_id: item.id(),
            executor,
            verifiers: assignment.verifiers,
            approvals: item.approvals(),
            valid,
        }))
    }

    /// Runs until the queue is empty and returns the final report.
    pub fn run(&mut self) -> Result<RunSummary, GreenworkError> {
        info!(
            agents = self.agents.len(),
            items = self.distributor.len(),
            byzantine = self.config.byzantine_count,
            verifiers = self.config.verifier_count,
            fault_tolerance = self.config.fault_tolerance,
            "starting simulation"
        );
        while self.step()?.is_some() {}
        let summary = self.summary();
        info!(
            completed = summary.completed,
            success_rate = summary.success_rate,
            efficiency = summary.useful_work_efficiency,
            detected_byzantine = summary.detected_byzantine,
            "simulation finished"
        );
        Ok(summary)
    }

    /// Useful-work efficiency \( \eta = U / (U + W) \).
    pub fn useful_work_efficiency(&self) -> f64 {
        let useful = self.successful as f64;
        let wasted = (self.completed - self.successful) as f64
            + self.completed as f64 * self.config.verifier_count as f64 * VERIFICATION_OVERHEAD;
        if useful + wasted > 0.0 {
            useful / (useful + wasted)
        } else {
            0.0
        }
    }

    /// Builds the report for the current state.
    pub fn summary(&self) -> RunSummary {
        let agents: Vec<AgentReport> = self
            .agents
            .iter()
            .zip(&self.selections)
            .map(|(agent, &selection_count)| AgentReport {
                id: agent.id(),
                score: agent.score(),
                tokens: agent.tokens(),
                renewable_share: agent.renewable_share(),
                tasks_completed: agent.tasks_completed(),
                selection_count,
                penalties: agent.penalties(),
                error_rate: agent.error_rate(),
                is_byzantine: agent.is_byzantine(),
                detected_byzantine: agent.error_rate() > self.config.byzantine_threshold,
            })
            .collect();

        let group = |detected: bool| {
            agents
                .iter()
                .filter(move |a| a.detected_byzantine == detected)
        };
        RunSummary {
            completed: self.completed,
            successful: self.successful,
            success_rate: self.success_rate(),
            useful_work_efficiency: self.useful_work_efficiency(),
            detected_byzantine: group(true).count(),
            avg_tokens_detected_honest: mean(group(false).map(|a| a.tokens)),
            avg_tokens_detected_byzantine: mean(group(true).map(|a| a.tokens)),
            avg_tasks_detected_honest: mean(group(false).map(|a| a.tasks_completed as f64)),
            avg_tasks_detected_byzantine: mean(group(true).map(|a| a.tasks_completed as f64)),
            agents,
        }
    }
}
