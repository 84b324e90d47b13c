use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The single random stream every stochastic step draws from.
pub type SimRng = ChaCha8Rng;

/// Index of an agent in the population arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(pub usize);

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "agent-{}", self.0)
    }
}

/// Behavior profile fixed when the population is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Behavior {
    /// Low, fixed error probability.
    Honest,

    /// Elevated, fixed error probability.
    Byzantine,
}

/// Result of executing a work item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Sum of the inputs.
    Sum(i64),

    /// Product of the inputs.
    Product(f64),

    /// Inputs in ascending order.
    Sorted(Vec<i64>),

    /// Whether the search target was found.
    Found(bool),
}

/// Per-cycle progress signal for the driving layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    /// Items processed so far.
    pub completed: usize,

    /// Items that passed validation so far.
    pub successful: usize,

    /// `successful / completed`.
    pub success_rate: f64,
}

/// What happened to a single work item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleOutcome {
    /// Sequence id of the work item.
    pub item_id: u64,

    /// Executing agent.
    pub executor: AgentId,

    /// Verifiers in assignment order.
    pub verifiers: Vec<AgentId>,

    /// Verifier approvals received.
    pub approvals: usize,

    /// Quorum decision.
    pub valid: bool,
}

/// End-of-run view of one agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentReport {
    pub id: AgentId,

    /// Reputation after rewards and penalties, never negative.
    pub score: f64,

    /// Cumulative rewards. Penalties do not reduce it.
    pub tokens: f64,

    /// Renewable share \( \alpha \).
    pub renewable_share: f64,

    /// Executions accepted by the quorum.
    pub tasks_completed: u64,

    /// Times chosen as executor.
    pub selection_count: u64,

    /// Executions rejected by the quorum.
    pub penalties: u64,

    /// Wrong results over executions.
    pub error_rate: f64,

    /// Behavior assigned at creation.
    pub is_byzantine: bool,

    /// Measured error rate exceeded the reporting threshold.
    pub detected_byzantine: bool,
}

/// Aggregate metrics for a finished run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Items processed.
    pub completed: usize,

    /// Items accepted by the quorum.
    pub successful: usize,

    /// `successful / completed`, 0 before any item.
    pub success_rate: f64,

    /// η = U / (U + W), W = failed + completed · V · 0.1.
    pub useful_work_efficiency: f64,

    /// Agents whose error rate exceeds the reporting threshold.
    pub detected_byzantine: usize,

    /// Mean tokens of agents at or below the threshold.
    pub avg_tokens_detected_honest: f64,

    /// Mean tokens of agents above the threshold.
    pub avg_tokens_detected_byzantine: f64,

    /// Mean accepted tasks of agents at or below the threshold.
    pub avg_tasks_detected_honest: f64,

    /// Mean accepted tasks of agents above the threshold.
    pub avg_tasks_detected_byzantine: f64,

    /// One report per agent, ordered by id.
    pub agents: Vec<AgentReport>,
}

impl RunSummary {
    /// Mean token balance of agents by their assigned behavior.
    ///
    /// Returns 0.0 when no agent has the requested behavior.
    pub fn mean_tokens(&self, behavior: Behavior) -> f64 {
        let byzantine = behavior == Behavior::Byzantine;
        mean(
            self.agents
                .iter()
                .filter(|a| a.is_byzantine == byzantine)
                .map(|a| a.tokens),
        )
    }
}

pub(crate) fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}
