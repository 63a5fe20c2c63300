use std::cmp::Ordering;

use crate::{internal::arena::ArenaId, SolvableId};

/// Represents a decision (i.e. an assignment to a solvable) and the level at
/// which it was made
///
/// = 0: undecided
/// > 0: level of decision when the solvable is set to true
/// < 0: level of decision when the solvable is set to false
#[repr(transparent)]
#[derive(Copy, Clone)]
struct DecisionAndLevel(i32);

impl DecisionAndLevel {
    fn undecided() -> DecisionAndLevel {
        DecisionAndLevel(0)
    }

    fn value(self) -> Option<bool> {
        match self.0.cmp(&0) {
            Ordering::Less => Some(false),
            Ordering::Equal => None,
            Ordering::Greater => Some(true),
        }
    }

    fn level(self) -> u32 {
        self.0.unsigned_abs()
    }

    fn with_value_and_level(value: bool, level: u32) -> Self {
        debug_assert!(level > 0, "level zero means undecided");
        debug_assert!(level <= (i32::MAX as u32), "level is too large");
        Self(if value { level as i32 } else { -(level as i32) })
    }
}

/// A map of the assignments to solvables.
#[derive(Default)]
pub(crate) struct DecisionMap {
    map: Vec<DecisionAndLevel>,
}

impl DecisionMap {
    pub(crate) fn reset(&mut self, solvable_id: SolvableId) {
        if let Some(entry) = self.map.get_mut(solvable_id.to_usize()) {
            *entry = DecisionAndLevel::undecided();
        }
    }

    pub(crate) fn set(&mut self, solvable_id: SolvableId, value: bool, level: u32) {
        let index = solvable_id.to_usize();
        if index >= self.map.len() {
            self.map.resize_with(index + 1, DecisionAndLevel::undecided);
        }
        self.map[index] = DecisionAndLevel::with_value_and_level(value, level);
    }

    pub(crate) fn level(&self, solvable_id: SolvableId) -> u32 {
        self.map
            .get(solvable_id.to_usize())
            .map_or(0, |d| d.level())
    }

    pub(crate) fn value(&self, solvable_id: SolvableId) -> Option<bool> {
        self.map
            .get(solvable_id.to_usize())
            .and_then(|d| d.value())
    }
}
