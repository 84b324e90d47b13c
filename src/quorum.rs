/// Trait for quorum rules used during validation.
///
/// Implementors decide how many verifier approvals accept a submitted result.
pub trait QuorumRule: Send + Sync + Clone + 'static {
    /// Approvals required out of `verifiers` votes.
    fn required_approvals(&self, verifiers: usize) -> usize;

    /// Checks whether `approvals` out of `verifiers` accept the result.
    fn is_accepted(&self, approvals: usize, verifiers: usize) -> bool;
}

/// Simple majority quorum, \( \lceil V / 2 \rceil \).
///
/// With no verifiers nothing can be approved, so the result is always rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct MajorityQuorum;

impl QuorumRule for MajorityQuorum {
    fn required_approvals(&self, verifiers: usize) -> usize {
        verifiers.div_ceil(2)
    }

    fn is_accepted(&self, approvals: usize, verifiers: usize) -> bool {
        verifiers > 0 && approvals >= self.required_approvals(verifiers)
    }
}
