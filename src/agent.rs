use crate::{
    error::GreenworkError,
    types::{AgentId, Behavior, Outcome, SimRng},
    work::WorkItem,
};
use rand::{seq::index, Rng};
use serde::{Deserialize, Serialize};

/// Error probability of an honest agent.
pub const HONEST_ERROR_PROBABILITY: f64 = 0.02;

/// Default error probability of a Byzantine agent.
pub const DEFAULT_BYZANTINE_ERROR_RATE: f64 = 0.3;

/// Upper bound of the renewable-energy share.
pub const MAX_RENEWABLE_SHARE: f64 = 0.5;

/// Measured error rate above which selection weight is cut to 10%.
pub const SEVERE_ERROR_RATE: f64 = 0.20;

/// Measured error rate above which selection weight is halved.
pub const SUSPECT_ERROR_RATE: f64 = 0.15;

/// How renewable-energy shares are assigned to a new population.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenewableMode {
    /// Each agent draws its own share uniformly from `[0, 0.5]`.
    #[default]
    Independent,

    /// Every agent uses the same share.
    Fixed(f64),
}

/// A simulated worker.
#[derive(Debug, Clone)]
pub struct Agent {
    id: AgentId,
    behavior: Behavior,
    error_probability: f64,
    renewable_share: f64,
    score: f64,
    tokens: f64,
    tasks_completed: u64,
    penalties: u64,
    attempts: u64,
    failures: u64,
    error_rate: f64,
}

impl Agent {
    /// Creates an agent with zero score, tokens and statistics.
    ///
    /// # Errors
    /// Returns an error if `error_probability` is outside `[0, 1]` or `renewable_share` is
    /// outside `[0, 0.5]`.
    pub fn new(
        id: AgentId,
        behavior: Behavior,
        error_probability: f64,
        renewable_share: f64,
    ) -> Result<Self, GreenworkError> {
        if !(0.0..=1.0).contains(&error_probability) {
            return Err(GreenworkError::InvalidConfig(format!(
                "error probability of {id} must be in [0, 1]"
            )));
        }
        if !(0.0..=MAX_RENEWABLE_SHARE).contains(&renewable_share) {
            return Err(GreenworkError::InvalidConfig(format!(
                "renewable share of {id} must be in [0, 0.5]"
            )));
        }
        Ok(Self {
            id,
            behavior,
            error_probability,
            renewable_share,
            score: 0.0,
            tokens: 0.0,
            tasks_completed: 0,
            penalties: 0,
            attempts: 0,
            failures: 0,
            error_rate: 0.0,
        })
    }

    pub fn id(&self) -> AgentId {
        self.id
    }

    pub fn behavior(&self) -> Behavior {
        self.behavior
    }

    pub fn is_byzantine(&self) -> bool {
        self.behavior == Behavior::Byzantine
    }

    pub fn error_probability(&self) -> f64 {
        self.error_probability
    }

    /// Declared renewable-energy share α.
    pub fn renewable_share(&self) -> f64 {
        self.renewable_share
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn tokens(&self) -> f64 {
        self.tokens
    }

    pub fn tasks_completed(&self) -> u64 {
        self.tasks_completed
    }

    pub fn penalties(&self) -> u64 {
        self.penalties
    }

    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    pub fn failures(&self) -> u64 {
        self.failures
    }

    /// Observed `failures / attempts`, 0 before the first attempt.
    pub fn error_rate(&self) -> f64 {
        self.error_rate
    }

    /// Executes `item`, corrupting the result with this agent's error probability.
    ///
    /// The correct result is always computed first, then the error roll is drawn, then any
    /// perturbation draws.
    pub fn execute(&mut self, item: &WorkItem, rng: &mut SimRng) -> Outcome {
        self.attempts += 1;
        let correct = item.execute(rng);
        let result = if rng.gen::<f64>() < self.error_probability {
            self.failures += 1;
            item.perturb(correct, rng)
        } else {
            correct
        };
        self.error_rate = self.failures as f64 / self.attempts as f64;
        result
    }

    /// Independently recomputes the ground truth and votes on `candidate`.
    pub fn verify(&self, item: &WorkItem, candidate: &Outcome, rng: &mut SimRng) -> bool {
        item.verify(candidate, rng)
    }

    /// Unnormalized weight for executor selection.
    ///
    /// Without fault tolerance every agent weighs 1.0. With it, the reputation share
    /// `score / total_score` (or `1 / population` while nobody has scored) is scaled by the
    /// error-rate ladder.
    pub fn selection_weight(
        &self,
        total_score: f64,
        population: usize,
        fault_tolerance: bool,
    ) -> f64 {
        if !fault_tolerance {
            return 1.0;
        }
        let base = if total_score > 0.0 {
            self.score / total_score
        } else {
            1.0 / population.max(1) as f64
        };
        let ladder = if self.error_rate > SEVERE_ERROR_RATE {
            0.1
        } else if self.error_rate > SUSPECT_ERROR_RATE {
            0.5
        } else {
            1.0
        };
        base * ladder
    }

    pub fn apply_reward(&mut self, amount: f64) {
        self.score += amount;
        self.tokens += amount;
    }

    /// Lowers the score, never below zero. Tokens are untouched.
    pub fn apply_penalty(&mut self, amount: f64) {
        self.score = (self.score - amount).max(0.0);
        self.penalties += 1;
    }

    pub(crate) fn record_completion(&mut self) {
        self.tasks_completed += 1;
    }
}

/// Creates a population of `size` agents, exactly `byzantine_count` of them Byzantine.
///
/// Byzantine members are drawn uniformly without replacement before any renewable share is
/// drawn. Nothing persists between calls.
///
/// # Errors
/// Returns an error if `byzantine_count > size`, if `byzantine_error_rate` is outside
/// `[0, 1]`, or if a fixed renewable share is outside `[0, 0.5]`.
pub fn create_population(
    size: usize,
    byzantine_count: usize,
    byzantine_error_rate: f64,
    renewable: RenewableMode,
    rng: &mut SimRng,
) -> Result<Vec<Agent>, GreenworkError> {
    if byzantine_count > size {
        return Err(GreenworkError::InvalidConfig(format!(
            "byzantine_count {byzantine_count} exceeds population {size}"
        )));
    }
    if !(0.0..=1.0).contains(&byzantine_error_rate) {
        return Err(GreenworkError::InvalidConfig(
            "byzantine_error_rate must be in [0, 1]".into(),
        ));
    }
    if let RenewableMode::Fixed(alpha) = renewable {
        if !(0.0..=MAX_RENEWABLE_SHARE).contains(&alpha) {
            return Err(GreenworkError::InvalidConfig(
                "renewable share must be in [0, 0.5]".into(),
            ));
        }
    }

    let mut byzantine = vec![false; size];
    for i in index::sample(rng, size, byzantine_count) {
        byzantine[i] = true;
    }

    byzantine
        .into_iter()
        .enumerate()
        .map(|(i, is_byzantine)| {
            let share = match renewable {
                RenewableMode::Independent => rng.gen_range(0.0..=MAX_RENEWABLE_SHARE),
                RenewableMode::Fixed(alpha) => alpha,
            };
            if is_byzantine {
                Agent::new(AgentId(i), Behavior::Byzantine, byzantine_error_rate, share)
            } else {
                Agent::new(AgentId(i), Behavior::Honest, HONEST_ERROR_PROBABILITY, share)
            }
        })
        .collect()
}
