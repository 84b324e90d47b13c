use crate::{
    error::GreenworkError,
    types::{AgentId, Outcome, SimRng},
};
use rand::{
    seq::{index, SliceRandom},
    Rng,
};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// Inclusive range of generated input values.
pub const INPUT_RANGE: RangeInclusive<i64> = 1..=100;

/// Behavior shared by every kind of work.
///
/// Each kind knows how to price itself, how to compute its ground truth and how a faulty
/// worker corrupts that truth.
pub trait Computation: Send + Sync {
    /// Declared cost for an input of `size` elements.
    fn cost(&self, size: usize) -> f64;

    /// Computes the exact result.
    fn execute(&self, inputs: &[i64], rng: &mut SimRng) -> Outcome;

    /// Returns a corrupted copy of a correct result.
    fn perturb(&self, correct: Outcome, rng: &mut SimRng) -> Outcome;
}

/// Sum of the inputs.
#[derive(Debug, Clone, Copy)]
pub struct AdditiveAggregate;

/// Product of the inputs.
#[derive(Debug, Clone, Copy)]
pub struct MultiplicativeAggregate;

/// Ascending sort of the inputs.
#[derive(Debug, Clone, Copy)]
pub struct Sort;

/// Membership test of a target drawn from the inputs.
#[derive(Debug, Clone, Copy)]
pub struct MembershipSearch;

impl Computation for AdditiveAggregate {
    fn cost(&self, size: usize) -> f64 {
        size as f64
    }

    fn execute(&self, inputs: &[i64], _rng: &mut SimRng) -> Outcome {
        Outcome::Sum(inputs.iter().fold(0i64, |acc, &x| acc.saturating_add(x)))
    }

    fn perturb(&self, correct: Outcome, rng: &mut SimRng) -> Outcome {
        match correct {
            Outcome::Sum(value) => Outcome::Sum(value.saturating_add(rng.gen_range(-10..=10))),
            other => other,
        }
    }
}

impl Computation for MultiplicativeAggregate {
    fn cost(&self, size: usize) -> f64 {
        size as f64
    }

    fn execute(&self, inputs: &[i64], _rng: &mut SimRng) -> Outcome {
        Outcome::Product(inputs.iter().fold(1.0, |acc, &x| acc * x as f64))
    }

    fn perturb(&self, correct: Outcome, rng: &mut SimRng) -> Outcome {
        match correct {
            Outcome::Product(value) => Outcome::Product(value * rng.gen_range(0.9..=1.1)),
            other => other,
        }
    }
}

impl Computation for Sort {
    // Linear on purpose, not n log n.
    fn cost(&self, size: usize) -> f64 {
        size as f64
    }

    fn execute(&self, inputs: &[i64], _rng: &mut SimRng) -> Outcome {
        let mut sorted = inputs.to_vec();
        sorted.sort_unstable();
        Outcome::Sorted(sorted)
    }

    fn perturb(&self, correct: Outcome, rng: &mut SimRng) -> Outcome {
        match correct {
            Outcome::Sorted(mut values) => {
                if values.len() > 1 {
                    let picks = index::sample(rng, values.len(), 2);
                    values.swap(picks.index(0), picks.index(1));
                }
                Outcome::Sorted(values)
            }
            other => other,
        }
    }
}

impl Computation for MembershipSearch {
    fn cost(&self, size: usize) -> f64 {
        size as f64
    }

    /// The target is re-drawn on every call, so each execution consumes one extra draw,
    /// unlike the other kinds.
    fn execute(&self, inputs: &[i64], rng: &mut SimRng) -> Outcome {
        match inputs.choose(rng) {
            Some(target) => Outcome::Found(inputs.contains(target)),
            None => Outcome::Found(false),
        }
    }

    fn perturb(&self, correct: Outcome, _rng: &mut SimRng) -> Outcome {
        match correct {
            Outcome::Found(found) => Outcome::Found(!found),
            other => other,
        }
    }
}

/// The closed set of work kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkKind {
    /// Additive aggregate, see [`AdditiveAggregate`].
    Additive,

    /// Multiplicative aggregate, see [`MultiplicativeAggregate`].
    Multiplicative,

    /// Ascending sort, see [`Sort`].
    Sort,

    /// Membership search, see [`MembershipSearch`].
    Search,
}

impl WorkKind {
    /// Every kind, in generation order.
    pub const ALL: [WorkKind; 4] = [
        WorkKind::Additive,
        WorkKind::Multiplicative,
        WorkKind::Sort,
        WorkKind::Search,
    ];

    /// Draws a kind uniformly.
    pub fn random(rng: &mut SimRng) -> Self {
        Self::ALL[rng.gen_range(0..Self::ALL.len())]
    }

    /// Behavior implementation for this kind.
    pub fn computation(self) -> &'static dyn Computation {
        match self {
            WorkKind::Additive => &AdditiveAggregate,
            WorkKind::Multiplicative => &MultiplicativeAggregate,
            WorkKind::Sort => &Sort,
            WorkKind::Search => &MembershipSearch,
        }
    }
}

/// A unit of work with a recomputable ground truth.
#[derive(Debug, Clone)]
pub struct WorkItem {
    id: u64,
    kind: WorkKind,
    inputs: Vec<i64>,
    pub(crate) executor: Option<AgentId>,
    pub(crate) verifiers: Vec<AgentId>,
    pub(crate) approvals: usize,
    pub(crate) validated: bool,
}

impl WorkItem {
    /// Generates `size` random inputs for a new item.
    ///
    /// # Errors
    /// Returns [`GreenworkError::InvalidSize`] if `size` is negative.
    pub fn generate(
        id: u64,
        kind: WorkKind,
        size: i64,
        rng: &mut SimRng,
    ) -> Result<Self, GreenworkError> {
        let size = usize::try_from(size).map_err(|_| GreenworkError::InvalidSize(size))?;
        let inputs = (0..size).map(|_| rng.gen_range(INPUT_RANGE)).collect();
        Ok(Self::with_inputs(id, kind, inputs))
    }

    /// Builds an item over fixed inputs.
    pub fn with_inputs(id: u64, kind: WorkKind, inputs: Vec<i64>) -> Self {
        Self {
            id,
            kind,
            inputs,
            executor: None,
            verifiers: Vec::new(),
            approvals: 0,
            validated: false,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn kind(&self) -> WorkKind {
        self.kind
    }

    pub fn inputs(&self) -> &[i64] {
        &self.inputs
    }

    pub fn size(&self) -> usize {
        self.inputs.len()
    }

    pub fn cost(&self) -> f64 {
        self.kind.computation().cost(self.size())
    }

    /// Computes the correct result.
    pub fn execute(&self, rng: &mut SimRng) -> Outcome {
        self.kind.computation().execute(&self.inputs, rng)
    }

    /// Recomputes the correct result and compares it with `candidate`.
    pub fn verify(&self, candidate: &Outcome, rng: &mut SimRng) -> bool {
        self.execute(rng) == *candidate
    }

    pub(crate) fn perturb(&self, correct: Outcome, rng: &mut SimRng) -> Outcome {
        self.kind.computation().perturb(correct, rng)
    }

    /// Agent chosen to execute this item, once distributed.
    pub fn executor(&self) -> Option<AgentId> {
        self.executor
    }

    pub fn verifiers(&self) -> &[AgentId] {
        &self.verifiers
    }

    /// Approvals recorded by the last validation.
    pub fn approvals(&self) -> usize {
        self.approvals
    }

    pub fn is_validated(&self) -> bool {
        self.validated
    }
}

/// Produces randomly sized items of random kinds with sequential ids.
#[derive(Debug, Clone)]
pub struct WorkGenerator {
    next_id: u64,
    sizes: RangeInclusive<usize>,
}

impl WorkGenerator {
    /// Creates a generator drawing sizes from `sizes`.
    ///
    /// # Errors
    /// Returns an error if the range is empty.
    pub fn new(sizes: RangeInclusive<usize>) -> Result<Self, GreenworkError> {
        if sizes.is_empty() {
            return Err(GreenworkError::InvalidConfig(format!(
                "item size range {}..={} is empty",
                sizes.start(),
                sizes.end()
            )));
        }
        Ok(Self { next_id: 0, sizes })
    }

    /// Draws kind, size, then inputs, in that order.
    pub fn next_item(&mut self, rng: &mut SimRng) -> Result<WorkItem, GreenworkError> {
        let kind = WorkKind::random(rng);
        let size = rng.gen_range(self.sizes.clone());
        let id = self.next_id;
        self.next_id += 1;
        WorkItem::generate(id, kind, size as i64, rng)
    }
}
