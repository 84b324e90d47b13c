use crate::types::AgentId;
use thiserror::Error;

/// Errors that can occur in the Greenwork library.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GreenworkError {
    /// Configuration rejected before any simulation step ran.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A work item was requested with a negative input size.
    #[error("invalid work size: {0}")]
    InvalidSize(i64),

    /// An assignment referenced an agent outside the population.
    #[error("unknown agent: {0}")]
    UnknownAgent(AgentId),

    /// Work was distributed over an empty population.
    #[error("cannot distribute work without agents")]
    NoAgents,

    /// Validation or settlement was attempted on an item that was never distributed.
    #[error("work item {0} has no assigned executor")]
    Unassigned(u64),
}
