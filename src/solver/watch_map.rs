use crate::{
    internal::id::ClauseId,
    solver::clause::{ClauseState, Literal},
};

/// A map from literals to the clauses that are watching them. A clause
/// watches two of its literals and only needs to be revisited when one of
/// them becomes false.
#[derive(Default)]
pub(crate) struct WatchMap {
    map: Vec<Vec<ClauseId>>,
}

impl WatchMap {
    pub(crate) fn start_watching(&mut self, clause: &ClauseState, clause_id: ClauseId) {
        for literal in clause.watched_literals() {
            self.watch_literal(literal, clause_id);
        }
    }

    pub(crate) fn watch_literal(&mut self, literal: Literal, clause_id: ClauseId) {
        let index = literal.index();
        if index >= self.map.len() {
            self.map.resize_with(index + 1, Vec::new);
        }
        self.map[index].push(clause_id);
    }

    /// Removes and returns the clauses watching `literal`. Clauses that keep
    /// watching it must be handed back with [`WatchMap::restore`].
    pub(crate) fn take(&mut self, literal: Literal) -> Vec<ClauseId> {
        self.map
            .get_mut(literal.index())
            .map(std::mem::take)
            .unwrap_or_default()
    }

    pub(crate) fn restore(&mut self, literal: Literal, clauses: Vec<ClauseId>) {
        if clauses.is_empty() {
            return;
        }
        let index = literal.index();
        if index >= self.map.len() {
            self.map.resize_with(index + 1, Vec::new);
        }
        let watchers = &mut self.map[index];
        if watchers.is_empty() {
            *watchers = clauses;
        } else {
            watchers.extend(clauses);
        }
    }

    /// The total number of watches
    pub(crate) fn len(&self) -> usize {
        self.map.iter().map(Vec::len).sum()
    }
}
