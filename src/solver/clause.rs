use std::fmt::{Debug, Formatter};

use crate::{
    internal::id::LearntClauseId, solver::decision_map::DecisionMap, Job, Pool, RelationId,
    SolvableId,
};

/// Represents a single clause in the SAT problem
///
/// # SAT terminology
///
/// Clauses consist of disjunctions of literals (i.e. a list of variables,
/// potentially negated, joined by the logical "or" operator). Here are some
/// examples:
///
/// - (¬A ∨ ¬B)
/// - (¬A ∨ B ∨ C)
/// - (A)
///
/// If `(¬A ∨ ¬B)` is a clause, `¬A` and `¬B` are its literals, and `A` and `B`
/// are variables. Variables are represented by [`SolvableId`], and assignments
/// are tracked in the [`DecisionMap`].
///
/// The kind of a clause records why it exists, which is what problems are
/// reported in terms of. The job variants carry the index of the job in the
/// list passed to the solver.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Clause {
    /// One of the candidates of an install job must be installed
    ///
    /// In SAT terms: (C1 ∨ C2 ∨ ... ∨ Cn), empty if nothing matched
    Job(usize),
    /// An installed solvable targeted by an update job must be kept or
    /// replaced by one of its update candidates
    ///
    /// In SAT terms: (A ∨ U1 ∨ ... ∨ Un)
    UpdateJob(usize, SolvableId),
    /// An erase job removes an installed solvable
    ///
    /// In SAT terms: (¬A)
    Erase(usize, SolvableId),
    /// A lock job keeps the state of a solvable
    ///
    /// In SAT terms: (A) for installed solvables, (¬A) otherwise
    Lock(usize, SolvableId),
    /// The solvable requires one of the providers of the relation
    ///
    /// In SAT terms: (¬A ∨ B1 ∨ B2 ∨ ... ∨ B99), just (¬A) when nothing
    /// provides the relation
    Requires(SolvableId, RelationId),
    /// The first solvable conflicts with a provider of the relation
    ///
    /// In SAT terms: (¬A ∨ ¬B)
    Conflicts(SolvableId, SolvableId, RelationId),
    /// The first solvable obsoletes the second through the relation
    ///
    /// In SAT terms: (¬A ∨ ¬B)
    Obsoletes(SolvableId, SolvableId, RelationId),
    /// Two solvables with the same name may not be installed together
    ///
    /// In SAT terms: (¬A ∨ ¬B)
    SameName(SolvableId, SolvableId),
    /// An installed solvable may not be removed, only kept or updated. Only
    /// created when uninstalling is not allowed.
    ///
    /// In SAT terms: (A ∨ U1 ∨ ... ∨ Un)
    Update(SolvableId),
    /// A clause learnt during solving
    Learnt(LearntClauseId),
}

/// A clause together with its literals and the two literals it watches.
///
/// The order of the literals is the order in which the candidates are
/// preferred and never changes, watching is tracked by index.
#[derive(Clone, Debug)]
pub(crate) struct ClauseState {
    pub(crate) kind: Clause,
    pub(crate) literals: Vec<Literal>,
    pub(crate) watched: [usize; 2],
}

impl ClauseState {
    fn new(kind: Clause, literals: Vec<Literal>) -> Self {
        Self {
            kind,
            literals,
            watched: [0, 1],
        }
    }

    pub(crate) fn job(job: usize, candidates: &[SolvableId]) -> Self {
        Self::new(
            Clause::Job(job),
            candidates.iter().copied().map(Literal::positive).collect(),
        )
    }

    pub(crate) fn update_job(job: usize, installed: SolvableId, ranked: &[SolvableId]) -> Self {
        Self::new(
            Clause::UpdateJob(job, installed),
            ranked.iter().copied().map(Literal::positive).collect(),
        )
    }

    pub(crate) fn erase(job: usize, solvable: SolvableId) -> Self {
        Self::new(Clause::Erase(job, solvable), vec![Literal::negative(solvable)])
    }

    pub(crate) fn lock(job: usize, solvable: SolvableId, installed: bool) -> Self {
        let literal = if installed {
            Literal::positive(solvable)
        } else {
            Literal::negative(solvable)
        };
        Self::new(Clause::Lock(job, solvable), vec![literal])
    }

    pub(crate) fn requires(
        parent: SolvableId,
        requirement: RelationId,
        candidates: &[SolvableId],
    ) -> Self {
        Self::new(
            Clause::Requires(parent, requirement),
            std::iter::once(Literal::negative(parent))
                .chain(candidates.iter().copied().map(Literal::positive))
                .collect(),
        )
    }

    pub(crate) fn conflicts(solvable: SolvableId, other: SolvableId, relation: RelationId) -> Self {
        Self::new(
            Clause::Conflicts(solvable, other, relation),
            vec![Literal::negative(solvable), Literal::negative(other)],
        )
    }

    pub(crate) fn obsoletes(solvable: SolvableId, other: SolvableId, relation: RelationId) -> Self {
        Self::new(
            Clause::Obsoletes(solvable, other, relation),
            vec![Literal::negative(solvable), Literal::negative(other)],
        )
    }

    pub(crate) fn same_name(a: SolvableId, b: SolvableId) -> Self {
        Self::new(
            Clause::SameName(a, b),
            vec![Literal::negative(a), Literal::negative(b)],
        )
    }

    pub(crate) fn update(installed: SolvableId, candidates: &[SolvableId]) -> Self {
        Self::new(
            Clause::Update(installed),
            std::iter::once(Literal::positive(installed))
                .chain(candidates.iter().copied().map(Literal::positive))
                .collect(),
        )
    }

    /// Creates a learnt clause. The first literal must be the one that is
    /// asserted after backjumping, the second one the literal assigned at the
    /// highest level among the others.
    pub(crate) fn learnt(learnt_clause_id: LearntClauseId, literals: Vec<Literal>) -> Self {
        debug_assert!(!literals.is_empty());
        Self::new(Clause::Learnt(learnt_clause_id), literals)
    }

    /// Clauses with fewer than two literals cannot be watched, they are
    /// asserted up front instead.
    pub(crate) fn has_watches(&self) -> bool {
        self.literals.len() >= 2
    }

    pub(crate) fn watched_literals(&self) -> [Literal; 2] {
        [self.literals[self.watched[0]], self.literals[self.watched[1]]]
    }

    /// Returns true if at least one literal evaluates to true
    pub(crate) fn is_satisfied(&self, map: &DecisionMap) -> bool {
        self.literals.iter().any(|l| l.eval(map) == Some(true))
    }

    /// Called when the watched literal `literal` became false. Tries to move
    /// the watch to another literal that is not false.
    ///
    /// Returns `Ok(Some(new_watch))` when the watch moved, `Ok(None)` when the
    /// clause is satisfied by its other watch and `Err(other)` when the other
    /// watch is the only literal left that can satisfy the clause.
    pub(crate) fn next_watch(
        &mut self,
        literal: Literal,
        map: &DecisionMap,
    ) -> Result<Option<Literal>, Literal> {
        let watch_index = if self.literals[self.watched[0]] == literal {
            0
        } else {
            debug_assert_eq!(self.literals[self.watched[1]], literal);
            1
        };
        let other = self.literals[self.watched[1 - watch_index]];
        if other.eval(map) == Some(true) {
            return Ok(None);
        }

        let other_index = self.watched[1 - watch_index];
        let replacement = self
            .literals
            .iter()
            .enumerate()
            .find(|&(index, l)| {
                index != other_index
                    && index != self.watched[watch_index]
                    && l.eval(map) != Some(false)
            })
            .map(|(index, _)| index);

        match replacement {
            Some(index) => {
                self.watched[watch_index] = index;
                Ok(Some(self.literals[index]))
            }
            None => Err(other),
        }
    }

    pub(crate) fn debug<'a>(&'a self, pool: &'a Pool, jobs: &'a [Job]) -> ClauseDebug<'a> {
        ClauseDebug {
            clause: self,
            pool,
            jobs,
        }
    }
}

/// A literal is a solvable, possibly negated
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub(crate) struct Literal {
    pub(crate) solvable_id: SolvableId,
    pub(crate) negate: bool,
}

impl Literal {
    pub(crate) fn positive(solvable_id: SolvableId) -> Self {
        Self {
            solvable_id,
            negate: false,
        }
    }

    pub(crate) fn negative(solvable_id: SolvableId) -> Self {
        Self {
            solvable_id,
            negate: true,
        }
    }

    /// Returns the value that would make the literal evaluate to true if
    /// assigned to the literal's solvable
    pub(crate) fn satisfying_value(self) -> bool {
        !self.negate
    }

    /// Evaluates the literal, or returns `None` if no value has been assigned
    /// to the solvable
    pub(crate) fn eval(self, decision_map: &DecisionMap) -> Option<bool> {
        decision_map
            .value(self.solvable_id)
            .map(|value| self.eval_with(value))
    }

    fn eval_with(self, solvable_value: bool) -> bool {
        if self.negate {
            !solvable_value
        } else {
            solvable_value
        }
    }

    /// A dense index, two per solvable
    pub(crate) fn index(self) -> usize {
        self.solvable_id.0 as usize * 2 + self.negate as usize
    }
}

pub(crate) struct ClauseDebug<'a> {
    clause: &'a ClauseState,
    pool: &'a Pool,
    jobs: &'a [Job],
}

impl Debug for ClauseDebug<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let pool = self.pool;
        let job = |index: usize| self.jobs[index].display(pool);
        match self.clause.kind {
            Clause::Job(index) => write!(f, "job {}", job(index)),
            Clause::UpdateJob(index, installed) => write!(
                f,
                "job {} for {}",
                job(index),
                pool.display_solvable(installed)
            ),
            Clause::Erase(index, solvable) => write!(
                f,
                "job {} removes {}",
                job(index),
                pool.display_solvable(solvable)
            ),
            Clause::Lock(index, solvable) => write!(
                f,
                "job {} fixes {}",
                job(index),
                pool.display_solvable(solvable)
            ),
            Clause::Requires(solvable, relation) => write!(
                f,
                "{} requires {}",
                pool.display_solvable(solvable),
                pool.display_relation(relation)
            ),
            Clause::Conflicts(solvable, other, relation) => write!(
                f,
                "{} conflicts with {} ({})",
                pool.display_solvable(solvable),
                pool.display_solvable(other),
                pool.display_relation(relation)
            ),
            Clause::Obsoletes(solvable, other, relation) => write!(
                f,
                "{} obsoletes {} ({})",
                pool.display_solvable(solvable),
                pool.display_solvable(other),
                pool.display_relation(relation)
            ),
            Clause::SameName(a, b) => write!(
                f,
                "only one of {} and {}",
                pool.display_solvable(a),
                pool.display_solvable(b)
            ),
            Clause::Update(installed) => {
                write!(f, "keep or update {}", pool.display_solvable(installed))
            }
            Clause::Learnt(_) => {
                write!(f, "learnt clause (")?;
                for (index, literal) in self.clause.literals.iter().enumerate() {
                    if index > 0 {
                        write!(f, " ∨ ")?;
                    }
                    if literal.negate {
                        write!(f, "¬")?;
                    }
                    write!(f, "{}", pool.display_solvable(literal.solvable_id))?;
                }
                write!(f, ")")
            }
        }
    }
}
