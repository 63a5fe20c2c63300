use crate::{internal::id::ClauseId, SolvableId};

/// Represents an assignment to a solvable
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub(crate) struct Decision {
    pub(crate) solvable_id: SolvableId,
    pub(crate) value: bool,
    /// The clause that forced this assignment, `None` for a branching decision
    pub(crate) derived_from: Option<ClauseId>,
}

impl Decision {
    pub(crate) fn new(solvable_id: SolvableId, value: bool, derived_from: Option<ClauseId>) -> Self {
        Self {
            solvable_id,
            value,
            derived_from,
        }
    }
}
