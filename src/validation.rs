use crate::{
    agent::Agent,
    error::GreenworkError,
    incentive::RewardPolicy,
    quorum::QuorumRule,
    types::{AgentId, Outcome, SimRng},
    work::WorkItem,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Amounts moved by a single settlement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settlement {
    /// Whether the quorum accepted the executor's result.
    pub valid: bool,

    /// Reward credited to the executor, 0 when rejected.
    pub executor_reward: f64,

    /// Reward credited to each verifier, 0 when rejected.
    pub verifier_reward: f64,

    /// Score removed from the executor, 0 when accepted.
    pub penalty: f64,
}

/// Tallies verifier votes and settles rewards and penalties.
#[derive(Debug, Clone)]
pub struct Validator<R: RewardPolicy, Q: QuorumRule> {
    rewards: R,
    quorum: Q,
}

impl<R: RewardPolicy, Q: QuorumRule> Validator<R, Q> {
    pub fn new(rewards: R, quorum: Q) -> Self {
        Self { rewards, quorum }
    }

    pub fn rewards(&self) -> &R {
        &self.rewards
    }

    pub fn quorum(&self) -> &Q {
        &self.quorum
    }

    /// Asks every assigned verifier to recompute the item and vote on `candidate`.
    ///
    /// Records the approval count and decision on the item and returns the decision.
    ///
    /// # Errors
    /// Returns an error if the item was never distributed or a verifier id is unknown.
    pub fn validate(
        &self,
        item: &mut WorkItem,
        candidate: &Outcome,
        agents: &[Agent],
        rng: &mut SimRng,
    ) -> Result<bool, GreenworkError> {
        if item.executor.is_none() {
            return Err(GreenworkError::Unassigned(item.id()));
        }
        let mut approvals = 0;
        for &id in &item.verifiers {
            if lookup(agents, id)?.verify(item, candidate, rng) {
                approvals += 1;
            }
        }
        item.approvals = approvals;
        item.validated = self.quorum.is_accepted(approvals, item.verifiers.len());
        Ok(item.validated)
    }

    /// Applies the reward or penalty for an already validated item.
    ///
    /// Every assigned verifier is paid on acceptance, whatever its vote was.
    ///
    /// # Errors
    /// Returns an error if the item was never distributed or an agent id is unknown.
    pub fn settle(
        &self,
        item: &WorkItem,
        agents: &mut [Agent],
    ) -> Result<Settlement, GreenworkError> {
        let executor_id = item.executor.ok_or(GreenworkError::Unassigned(item.id()))?;
        lookup(agents, executor_id)?;
        for &id in &item.verifiers {
            lookup(agents, id)?;
        }

        let cost = item.cost();
        let settlement = if item.validated {
            let executor = &mut agents[executor_id.0];
            let executor_reward = self
                .rewards
                .executor_reward(cost, executor.renewable_share());
            executor.apply_reward(executor_reward);
            executor.record_completion();

            let verifier_reward = self.rewards.verifier_reward(cost);
            for &id in &item.verifiers {
                agents[id.0].apply_reward(verifier_reward);
            }
            Settlement {
                valid: true,
                executor_reward,
                verifier_reward,
                penalty: 0.0,
            }
        } else {
            let penalty = self.rewards.penalty(cost);
            agents[executor_id.0].apply_penalty(penalty);
            Settlement {
                valid: false,
                executor_reward: 0.0,
                verifier_reward: 0.0,
                penalty,
            }
        };
        debug!(
            item = item.id(),
            executor = %executor_id,
            valid = settlement.valid,
            reward = settlement.executor_reward,
            penalty = settlement.penalty,
            "settled work item"
        );
        Ok(settlement)
    }

    /// Validates `candidate` and settles the item in one step.
    pub fn process(
        &self,
        item: &mut WorkItem,
        candidate: &Outcome,
        agents: &mut [Agent],
        rng: &mut SimRng,
    ) -> Result<bool, GreenworkError> {
        let valid = self.validate(item, candidate, agents, rng)?;
        self.settle(item, agents)?;
        Ok(valid)
    }
}

fn lookup(agents: &[Agent], id: AgentId) -> Result<&Agent, GreenworkError> {
    agents
        .get(id.0)
        .filter(|a| a.id() == id)
        .ok_or(GreenworkError::UnknownAgent(id))
}
