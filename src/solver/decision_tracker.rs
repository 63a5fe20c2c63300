use crate::{
    solver::{decision::Decision, decision_map::DecisionMap},
    SolvableId,
};

/// Tracks the assignments to solvables, keeping a log that can be used to
/// backtrack, and a map that can be used to query the current value assigned
#[derive(Default)]
pub(crate) struct DecisionTracker {
    map: DecisionMap,
    stack: Vec<Decision>,
    propagate_index: usize,
}

impl DecisionTracker {
    #[inline(always)]
    pub(crate) fn assigned_value(&self, solvable_id: SolvableId) -> Option<bool> {
        self.map.value(solvable_id)
    }

    pub(crate) fn map(&self) -> &DecisionMap {
        &self.map
    }

    pub(crate) fn stack(&self) -> impl DoubleEndedIterator<Item = Decision> + '_ {
        self.stack.iter().copied()
    }

    pub(crate) fn level(&self, solvable_id: SolvableId) -> u32 {
        self.map.level(solvable_id)
    }

    /// Attempts to add a decision
    ///
    /// Returns true if the solvable was undecided, false if it was already
    /// decided to the same value
    ///
    /// Returns an error if the solvable was decided to a different value
    /// (which means there is a conflict)
    pub(crate) fn try_add_decision(&mut self, decision: Decision, level: u32) -> Result<bool, ()> {
        match self.map.value(decision.solvable_id) {
            None => {
                self.map.set(decision.solvable_id, decision.value, level);
                self.stack.push(decision);
                Ok(true)
            }
            Some(value) if value == decision.value => Ok(false),
            _ => Err(()),
        }
    }

    /// Undoes every decision made above `level`.
    pub(crate) fn undo_until(&mut self, level: u32) {
        while let Some(decision) = self.stack.last() {
            if self.level(decision.solvable_id) <= level {
                break;
            }

            self.undo_last();
        }
    }

    /// Undoes the most recent decision and returns it together with the level
    /// it was made at.
    pub(crate) fn undo_last(&mut self) -> Option<(Decision, u32)> {
        let decision = self.stack.pop()?;
        let level = self.map.level(decision.solvable_id);
        self.map.reset(decision.solvable_id);
        self.propagate_index = self.stack.len();
        Some((decision, level))
    }

    /// Returns the next decision in the log for which unit propagation still
    /// needs to run
    ///
    /// Side-effect: the decision will be marked as propagated
    pub(crate) fn next_unpropagated(&mut self) -> Option<Decision> {
        let &decision = self.stack.get(self.propagate_index)?;
        self.propagate_index += 1;
        Some(decision)
    }
}
