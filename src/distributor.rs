use crate::{
    agent::Agent,
    error::GreenworkError,
    types::{AgentId, SimRng},
    work::WorkItem,
};
use rand::{
    distributions::{Distribution, WeightedIndex},
    seq::index,
    Rng,
};
use std::collections::VecDeque;
use tracing::debug;

/// A distributed work item with its executor and verifiers.
#[derive(Debug, Clone)]
pub struct Assignment {
    /// The dequeued item, already carrying its executor and verifiers.
    pub item: WorkItem,

    /// Agent drawn by weighted sampling.
    pub executor: AgentId,

    /// Agents drawn uniformly from the rest of the population.
    pub verifiers: Vec<AgentId>,
}

/// FIFO queue of pending work and the executor/verifier selection over a population.
#[derive(Debug, Clone, Default)]
pub struct Distributor {
    queue: VecDeque<WorkItem>,
    fault_tolerance: bool,
}

impl Distributor {
    /// Creates an empty distributor.
    ///
    /// # Arguments
    /// * `fault_tolerance` - Whether executor selection uses reputation and the error-rate
    ///   ladder, or is uniform.
    pub fn new(fault_tolerance: bool) -> Self {
        Self {
            queue: VecDeque::new(),
            fault_tolerance,
        }
    }

    pub fn fault_tolerance(&self) -> bool {
        self.fault_tolerance
    }

    pub fn enqueue(&mut self, item: WorkItem) {
        self.queue.push_back(item);
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Pops the oldest item and assigns an executor plus up to `verifier_count` verifiers.
    ///
    /// Returns `Ok(None)` when the queue is empty.
    ///
    /// # Errors
    /// Returns [`GreenworkError::NoAgents`] if `agents` is empty. The queue is left untouched.
    pub fn distribute(
        &mut self,
        agents: &[Agent],
        verifier_count: usize,
        rng: &mut SimRng,
    ) -> Result<Option<Assignment>, GreenworkError> {
        if agents.is_empty() {
            return Err(GreenworkError::NoAgents);
        }
        let Some(mut item) = self.queue.pop_front() else {
            return Ok(None);
        };

        let executor = self.select_executor(agents, rng);
        let verifiers = select_verifiers(agents, executor, verifier_count, rng);

        item.executor = Some(executor);
        item.verifiers = verifiers.clone();
        debug!(item = item.id(), %executor, verifiers = verifiers.len(), "distributed work item");

        Ok(Some(Assignment {
            item,
            executor,
            verifiers,
        }))
    }

    fn select_executor(&self, agents: &[Agent], rng: &mut SimRng) -> AgentId {
        let total_score: f64 = agents.iter().map(Agent::score).sum();
        let weights: Vec<f64> = agents
            .iter()
            .map(|a| a.selection_weight(total_score, agents.len(), self.fault_tolerance))
            .collect();
        let probabilities = normalize(&weights);
        let pick = match WeightedIndex::new(&probabilities) {
            Ok(dist) => dist.sample(rng),
            Err(_) => rng.gen_range(0..agents.len()),
        };
        agents[pick].id()
    }
}

/// Normalizes weights into a probability distribution.
///
/// Falls back to uniform when the weights sum to zero or are not finite.
pub fn normalize(weights: &[f64]) -> Vec<f64> {
    let total: f64 = weights.iter().sum();
    if weights.is_empty() {
        return Vec::new();
    }
    if total > 0.0 && total.is_finite() {
        weights.iter().map(|w| w / total).collect()
    } else {
        vec![1.0 / weights.len() as f64; weights.len()]
    }
}

/// Draws `min(count, N - 1)` distinct verifiers uniformly, excluding the executor.
fn select_verifiers(
    agents: &[Agent],
    executor: AgentId,
    count: usize,
    rng: &mut SimRng,
) -> Vec<AgentId> {
    let candidates: Vec<AgentId> = agents
        .iter()
        .map(Agent::id)
        .filter(|&id| id != executor)
        .collect();
    let amount = count.min(candidates.len());
    index::sample(rng, candidates.len(), amount)
        .into_iter()
        .map(|i| candidates[i])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        agent::{create_population, RenewableMode},
        types::Behavior,
        work::WorkKind,
    };
    use rand::SeedableRng;

    fn item(id: u64) -> WorkItem {
        WorkItem::with_inputs(id, WorkKind::Additive, vec![1, 2, 3])
    }

    #[test]
    fn test_empty_queue_yields_none() {
        let mut rng = SimRng::seed_from_u64(0);
        let agents = create_population(4, 0, 0.3, RenewableMode::Independent, &mut rng).unwrap();
        let mut distributor = Distributor::new(true);
        assert!(distributor.is_empty());
        assert!(distributor.distribute(&agents, 3, &mut rng).unwrap().is_none());
    }

    #[test]
    fn test_fifo_order_and_disjoint_verifiers() {
        let mut rng = SimRng::seed_from_u64(11);
        let agents = create_population(6, 1, 0.3, RenewableMode::Independent, &mut rng).unwrap();
        let mut distributor = Distributor::new(true);
        for id in 0..10 {
            distributor.enqueue(item(id));
        }
        assert_eq!(distributor.len(), 10);

        for expected in 0..10 {
            let assignment = distributor.distribute(&agents, 3, &mut rng).unwrap().unwrap();
            assert_eq!(assignment.item.id(), expected);
            assert_eq!(assignment.item.executor(), Some(assignment.executor));
            assert_eq!(assignment.item.verifiers(), assignment.verifiers.as_slice());
            assert_eq!(assignment.verifiers.len(), 3);
            assert!(!assignment.verifiers.contains(&assignment.executor));

            let mut unique = assignment.verifiers.clone();
            unique.sort();
            unique.dedup();
            assert_eq!(unique.len(), 3);
        }
        assert!(distributor.distribute(&agents, 3, &mut rng).unwrap().is_none());
    }

    #[test]
    fn test_empty_population_is_an_error() {
        let mut rng = SimRng::seed_from_u64(2);
        let mut distributor = Distributor::new(true);
        distributor.enqueue(item(0));
        assert_eq!(
            distributor.distribute(&[], 3, &mut rng).unwrap_err(),
            GreenworkError::NoAgents
        );
        assert_eq!(distributor.len(), 1);
    }

    #[test]
    fn test_verifier_count_capped_by_population() {
        let mut rng = SimRng::seed_from_u64(5);
        let agents = create_population(3, 0, 0.3, RenewableMode::Independent, &mut rng).unwrap();
        let mut distributor = Distributor::new(false);
        assert!(!distributor.fault_tolerance());
        distributor.enqueue(item(0));
        let assignment = distributor.distribute(&agents, 9, &mut rng).unwrap().unwrap();
        assert_eq!(assignment.verifiers.len(), 2);

        let single = vec![Agent::new(AgentId(0), Behavior::Honest, 0.0, 0.0).unwrap()];
        distributor.enqueue(item(1));
        let assignment = distributor.distribute(&single, 3, &mut rng).unwrap().unwrap();
        assert_eq!(assignment.executor, AgentId(0));
        assert!(assignment.verifiers.is_empty());
    }

    #[test]
    fn test_reputation_drives_executor_choice() {
        let mut rng = SimRng::seed_from_u64(9);
        let mut agents: Vec<Agent> = (0..4)
            .map(|i| Agent::new(AgentId(i), Behavior::Honest, 0.0, 0.0).unwrap())
            .collect();
        agents[2].apply_reward(100.0);

        let mut distributor = Distributor::new(true);
        assert!(distributor.fault_tolerance());
        for id in 0..50 {
            distributor.enqueue(item(id));
        }
        while let Some(assignment) = distributor.distribute(&agents, 1, &mut rng).unwrap() {
            assert_eq!(assignment.executor, AgentId(2));
        }
    }

    #[test]
    fn test_normalize_falls_back_to_uniform() {
        assert_eq!(normalize(&[0.0, 0.0, 0.0, 0.0]), vec![0.25; 4]);
        assert_eq!(normalize(&[1.0, 3.0]), vec![0.25, 0.75]);
        assert_eq!(normalize(&[f64::NAN, 1.0]), vec![0.5, 0.5]);
        assert!(normalize(&[]).is_empty());
    }
}
