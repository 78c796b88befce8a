use thiserror::Error;

/// Failure classes for the bit-vector codec and link bookkeeping.
///
/// All of these indicate a caller bug or corrupt data rather than a
/// transient condition; none of them should be retried. The intended
/// failure domain is one gene's unit of work, except
/// [`CoexError::InconsistentState`] which aborts the pair being merged.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoexError {
    /// A dataset id was looked up in an ordering that does not contain it.
    #[error("dataset {0} is not part of this ordering")]
    NotInOrdering(u64),

    /// A membership set could not be encoded because an id lies outside
    /// the ordering. Ids are never silently dropped.
    #[error("dataset {0} cannot be encoded: not a member of the ordering")]
    InvalidMembership(u64),

    /// A bit-vector is too short for the ordering it is being decoded
    /// against, or two vectors from different orderings were combined.
    #[error("bit vector holds {got} bytes but the ordering needs {need}")]
    LengthMismatch { got: usize, need: usize },

    /// A link aggregation invariant was violated, e.g. the same gene pair
    /// was seen with the same sign twice while merging.
    #[error("inconsistent link state: {0}")]
    InconsistentState(String),
}
