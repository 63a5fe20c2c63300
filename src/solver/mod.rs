use std::cmp::Reverse;

use ahash::HashSet;
use itertools::Itertools;

use crate::{
    internal::{
        arena::Arena,
        id::{ClauseId, LearntClauseId},
    },
    policy::Ranking,
    problem::{Problem, ProblemRule, Solution, Unsolvable},
    transaction::Transaction,
    DependencyKind, Job, Policy, Pool, SolvableId,
};

use clause::{Clause, ClauseState, Literal};
use decision::Decision;
use decision_tracker::DecisionTracker;
use encoding::{Encoder, Encoding};
use watch_map::WatchMap;

mod clause;
mod decision;
mod decision_map;
mod decision_tracker;
mod diagnostics;
mod encoding;
mod minimize;
mod watch_map;

/// Decisions made before the first free choice live at this level.
const ROOT_LEVEL: u32 = 1;

#[derive(Default)]
struct SolverState {
    encoding: Encoding,
    watches: WatchMap,

    /// The clauses each learnt clause was derived from
    learnt_why: Arena<LearntClauseId, Vec<ClauseId>>,

    decision_tracker: DecisionTracker,
}

/// Computes the solvables to install and remove to satisfy a set of
/// [`Job`]s against the repositories of a [`Pool`].
pub struct Solver<'pool> {
    pool: &'pool Pool,
    policy: Policy,

    /// Whether to search for [`Solution`]s when the jobs cannot be satisfied
    find_solutions: bool,

    jobs: Vec<Job>,
    state: SolverState,
}

impl<'pool> Solver<'pool> {
    /// Creates a solver for the given pool with the default [`Policy`]
    pub fn new(pool: &'pool Pool) -> Self {
        Self {
            pool,
            policy: Policy::default(),
            find_solutions: true,
            jobs: Vec::new(),
            state: SolverState::default(),
        }
    }

    /// Replaces the policy the solver works with
    pub fn with_policy(mut self, policy: Policy) -> Self {
        self.policy = policy;
        self
    }

    /// The policy the solver works with
    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// The pool the solver works on
    pub fn pool(&self) -> &'pool Pool {
        self.pool
    }

    /// Solves the provided `jobs` and returns the resulting [`Transaction`].
    ///
    /// When the jobs cannot be satisfied together every independent problem
    /// is reported: after a problem is found the jobs involved in it are set
    /// aside and the remaining jobs are solved again, until they succeed or
    /// a problem involves no job at all. Each problem comes with the
    /// [`Solution`]s that were verified to make it go away.
    pub fn solve(&mut self, jobs: &[Job]) -> Result<Transaction<'pool>, Unsolvable> {
        self.jobs = jobs.to_vec();
        let mut active = vec![true; jobs.len()];
        let mut problems: Vec<Problem> = Vec::new();

        loop {
            let conflict = match self.run(&active) {
                Ok(()) if problems.is_empty() => return Ok(self.transaction()),
                Ok(()) => break,
                Err(conflict) => conflict,
            };

            let (problem, involved_jobs) = self.problem(&conflict);
            tracing::info!("Problem found:\n{}", problem.display(self.pool));
            if !problems.iter().any(|p| p.same_rules(&problem)) {
                problems.push(problem);
            }

            if involved_jobs.is_empty() {
                break;
            }
            for index in involved_jobs {
                active[index] = false;
            }
        }

        if self.find_solutions {
            for problem in &mut problems {
                problem.solutions = self.solutions(problem, jobs);
            }
        }

        Err(Unsolvable { problems })
    }

    /// Encodes the active jobs and runs the SAT search on them. Returns the
    /// clauses that explain the conflict when they are unsatisfiable.
    fn run(&mut self, active: &[bool]) -> Result<(), Vec<ClauseId>> {
        self.state = SolverState::default();

        let ranking = Ranking::new(self.pool, &self.policy);
        self.state.encoding = Encoder::new(self.pool, &self.policy, &ranking).encode(&self.jobs, active);

        for (clause_id, clause) in self.state.encoding.clauses.iter() {
            if clause.has_watches() {
                self.state.watches.start_watching(clause, clause_id);
            }
        }

        self.report_diagnostics();

        self.run_sat()
    }

    /// Runs the CDCL algorithm on the encoded clauses.
    ///
    /// Clauses with fewer than two literals are asserted at the root level
    /// and propagated first. After that the solver repeatedly picks a free
    /// variable (see [`Solver::decide`]), assigns it at a new level and
    /// propagates the consequences. A conflict teaches the solver a new
    /// clause and makes it backjump, a conflict at the root level means the
    /// clauses cannot be satisfied.
    fn run_sat(&mut self) -> Result<(), Vec<ClauseId>> {
        let assertions = self.state.encoding.assertions.clone();
        for clause_id in assertions {
            let clause = &self.state.encoding.clauses[clause_id];
            let Some(&literal) = clause.literals.first() else {
                tracing::info!(
                    "╘══ UNSOLVABLE: {:?} can never be satisfied",
                    clause.debug(self.pool, &self.jobs)
                );
                return Err(self.analyze_unsolvable(clause_id));
            };

            let decision = Decision::new(
                literal.solvable_id,
                literal.satisfying_value(),
                Some(clause_id),
            );
            if self
                .state
                .decision_tracker
                .try_add_decision(decision, ROOT_LEVEL)
                .is_err()
            {
                tracing::info!(
                    "╘══ UNSOLVABLE: {:?} contradicts an earlier assertion",
                    clause.debug(self.pool, &self.jobs)
                );
                return Err(self.analyze_unsolvable(clause_id));
            }
            tracing::trace!(
                "├─ Assert {} = {}",
                self.pool.display_solvable(literal.solvable_id),
                literal.satisfying_value()
            );
        }

        if let Err(clause_id) = self.propagate(ROOT_LEVEL) {
            tracing::info!(
                "╘══ UNSOLVABLE: the assertions conflict on {:?}",
                self.state.encoding.clauses[clause_id].debug(self.pool, &self.jobs)
            );
            return Err(self.analyze_unsolvable(clause_id));
        }

        let mut level = ROOT_LEVEL;
        while let Some(literal) = self.decide() {
            level += 1;
            tracing::info!(
                "╤══ {} {} at level {level}",
                if literal.negate { "Forbid" } else { "Install" },
                self.pool.display_solvable(literal.solvable_id),
            );

            self.state
                .decision_tracker
                .try_add_decision(
                    Decision::new(literal.solvable_id, literal.satisfying_value(), None),
                    level,
                )
                .expect("bug: solvable was already decided!");

            level = self.propagate_and_learn(level)?;
        }

        Ok(())
    }

    /// Picks the next literal to make true, or `None` when every variable is
    /// assigned.
    ///
    /// Candidates of unsatisfied install and update jobs come first, then
    /// installed solvables are kept (or updated), then the requirements of
    /// installed solvables are fulfilled starting with the most constrained
    /// one. Whatever is left is not installed.
    fn decide(&self) -> Option<Literal> {
        let map = self.state.decision_tracker.map();
        let clauses = &self.state.encoding.clauses;

        for &clause_id in &self.state.encoding.job_clauses {
            let clause = &clauses[clause_id];
            if clause.is_satisfied(map) {
                continue;
            }
            if let Some(&literal) = clause.literals.iter().find(|l| l.eval(map).is_none()) {
                tracing::debug!(
                    "deciding {} for {:?}",
                    self.pool.display_solvable(literal.solvable_id),
                    clause.debug(self.pool, &self.jobs)
                );
                return Some(literal);
            }
        }

        for rule in &self.state.encoding.update_rules {
            if rule.ranked.iter().any(|&s| map.value(s) == Some(true)) {
                continue;
            }
            let pick = match map.value(rule.installed) {
                None if !rule.update => Some(rule.installed),
                _ => rule.ranked.iter().copied().find(|&s| map.value(s).is_none()),
            };
            if let Some(solvable) = pick {
                tracing::debug!(
                    "deciding {} to keep or update installed {}",
                    self.pool.display_solvable(solvable),
                    self.pool.display_solvable(rule.installed)
                );
                return Some(Literal::positive(solvable));
            }
        }

        let mut recommended: Option<HashSet<SolvableId>> = None;
        let mut best: Option<(usize, SolvableId, ClauseId)> = None;
        for &clause_id in &self.state.encoding.requires_clauses {
            let clause = &clauses[clause_id];
            let Clause::Requires(parent, _) = clause.kind else {
                continue;
            };
            if map.value(parent) != Some(true) {
                continue;
            }

            let candidates = &clause.literals[1..];
            if candidates.iter().any(|l| l.eval(map) == Some(true)) {
                continue;
            }
            let undecided: Vec<SolvableId> = candidates
                .iter()
                .filter(|l| l.eval(map).is_none())
                .map(|l| l.solvable_id)
                .collect();
            let Some(&first) = undecided.first() else {
                continue;
            };
            if best.is_some_and(|(count, ..)| count <= undecided.len()) {
                continue;
            }

            let candidate = if undecided.len() > 1 && !self.policy.ignore_recommended {
                let recommended = recommended.get_or_insert_with(|| self.recommended());
                undecided
                    .iter()
                    .copied()
                    .find(|s| recommended.contains(s))
                    .unwrap_or(first)
            } else {
                first
            };
            best = Some((undecided.len(), candidate, clause_id));
        }
        if let Some((count, candidate, clause_id)) = best {
            tracing::debug!(
                "deciding {} out of {count} candidates for {:?}",
                self.pool.display_solvable(candidate),
                clauses[clause_id].debug(self.pool, &self.jobs)
            );
            return Some(Literal::positive(candidate));
        }

        self.state
            .encoding
            .variables
            .iter()
            .find(|&&s| map.value(s).is_none())
            .map(|&s| Literal::negative(s))
    }

    /// Everything provided for the recommends of the solvables that are
    /// currently installed.
    fn recommended(&self) -> HashSet<SolvableId> {
        let map = self.state.decision_tracker.map();
        self.state
            .encoding
            .variables
            .iter()
            .filter(|&&s| map.value(s) == Some(true))
            .flat_map(|&s| {
                self.pool
                    .resolve_solvable(s)
                    .dependencies
                    .get(DependencyKind::Recommends)
                    .iter()
                    .copied()
            })
            .flat_map(|relation| self.pool.what_provides(relation))
            .collect()
    }

    fn propagate_and_learn(&mut self, mut level: u32) -> Result<u32, Vec<ClauseId>> {
        loop {
            let conflicting_clause = match self.propagate(level) {
                Ok(()) => {
                    tracing::debug!("╘══ Propagation completed");
                    return Ok(level);
                }
                Err(clause_id) => clause_id,
            };

            tracing::info!(
                "├─ Propagation conflicted on {:?}",
                self.state.encoding.clauses[conflicting_clause].debug(self.pool, &self.jobs)
            );

            if level == ROOT_LEVEL {
                tracing::info!("╘══ UNSOLVABLE");
                return Err(self.analyze_unsolvable(conflicting_clause));
            }

            let (new_level, learnt_clause_id, literal) = self.analyze(level, conflicting_clause);
            level = new_level;
            tracing::debug!("├─ Backtracked to level {level}");

            // The learnt clause is unit, assign its remaining literal right away
            self.state
                .decision_tracker
                .try_add_decision(
                    Decision::new(
                        literal.solvable_id,
                        literal.satisfying_value(),
                        Some(learnt_clause_id),
                    ),
                    level,
                )
                .expect("bug: solvable was already decided!");
            tracing::debug!(
                "├─ Propagate after learn: {} = {}",
                self.pool.display_solvable(literal.solvable_id),
                literal.satisfying_value()
            );
        }
    }

    /// Unit propagation over the watched literals.
    ///
    /// Each clause with at least two literals watches two of them. When a
    /// watched literal becomes false the clause moves the watch to another
    /// literal that is not false. If there is none, the other watched
    /// literal must become true. Returns the clause that could not be
    /// satisfied on a conflict.
    fn propagate(&mut self, level: u32) -> Result<(), ClauseId> {
        while let Some(decision) = self.state.decision_tracker.next_unpropagated() {
            let false_literal = Literal {
                solvable_id: decision.solvable_id,
                negate: decision.value,
            };

            let watchers = self.state.watches.take(false_literal);
            let mut keep = Vec::with_capacity(watchers.len());
            let mut conflict = None;
            for clause_id in watchers {
                if conflict.is_some() {
                    keep.push(clause_id);
                    continue;
                }

                let clause = &mut self.state.encoding.clauses[clause_id];
                match clause.next_watch(false_literal, self.state.decision_tracker.map()) {
                    Ok(Some(new_watch)) => self.state.watches.watch_literal(new_watch, clause_id),
                    Ok(None) => keep.push(clause_id),
                    Err(unit) => {
                        keep.push(clause_id);
                        let decision = Decision::new(
                            unit.solvable_id,
                            unit.satisfying_value(),
                            Some(clause_id),
                        );
                        match self.state.decision_tracker.try_add_decision(decision, level) {
                            Ok(true) => tracing::trace!(
                                "├─ Propagate {} = {}. {:?}",
                                self.pool.display_solvable(unit.solvable_id),
                                unit.satisfying_value(),
                                self.state.encoding.clauses[clause_id].debug(self.pool, &self.jobs)
                            ),
                            Ok(false) => {}
                            Err(()) => conflict = Some(clause_id),
                        }
                    }
                }
            }
            self.state.watches.restore(false_literal, keep);

            if let Some(clause_id) = conflict {
                return Err(clause_id);
            }
        }

        Ok(())
    }

    /// Learns a clause from a conflict with the first unique implication
    /// point scheme.
    ///
    /// Returns the level to backjump to, the id of the learnt clause and the
    /// literal of the clause that must become true at that level.
    fn analyze(&mut self, current_level: u32, mut clause_id: ClauseId) -> (u32, ClauseId, Literal) {
        let mut seen = HashSet::default();
        let mut causes_at_current_level = 0u32;
        let mut learnt: Vec<(Literal, u32)> = Vec::new();
        let mut back_track_to = 0;
        let mut learnt_why = Vec::new();
        let mut propagated = None;

        let uip = loop {
            learnt_why.push(clause_id);

            for &literal in &self.state.encoding.clauses[clause_id].literals {
                // Only the causes matter, not the solvable that was propagated
                if Some(literal.solvable_id) == propagated || !seen.insert(literal.solvable_id) {
                    continue;
                }

                let decision_level = self.state.decision_tracker.level(literal.solvable_id);
                if decision_level == current_level {
                    causes_at_current_level += 1;
                } else {
                    debug_assert!(decision_level >= ROOT_LEVEL);
                    learnt.push((literal, decision_level));
                    back_track_to = back_track_to.max(decision_level);
                }
            }

            let decision = loop {
                let (decision, level) = self
                    .state
                    .decision_tracker
                    .undo_last()
                    .expect("bug: the conflict has no cause at the current level");
                debug_assert_eq!(level, current_level);
                if seen.contains(&decision.solvable_id) {
                    break decision;
                }
            };

            causes_at_current_level = causes_at_current_level.saturating_sub(1);
            if causes_at_current_level == 0 {
                break decision;
            }

            propagated = Some(decision.solvable_id);
            clause_id = decision
                .derived_from
                .expect("bug: only the first decision of a level is free");
        };

        let uip_literal = Literal {
            solvable_id: uip.solvable_id,
            negate: uip.value,
        };

        // The asserting literal is watched first, the literal that is
        // assigned last after backjumping second
        learnt.sort_by_key(|&(_, level)| Reverse(level));
        let literals = std::iter::once(uip_literal)
            .chain(learnt.into_iter().map(|(literal, _)| literal))
            .collect_vec();

        tracing::debug!("├─ Learnt disjunction:");
        for literal in &literals {
            tracing::debug!(
                "│  - {}{}",
                if literal.negate { "NOT " } else { "" },
                self.pool.display_solvable(literal.solvable_id)
            );
        }

        let learnt_id = self.state.learnt_why.alloc(learnt_why);
        let clause_id = self
            .state
            .encoding
            .clauses
            .alloc(ClauseState::learnt(learnt_id, literals));
        let clause = &self.state.encoding.clauses[clause_id];
        if clause.has_watches() {
            self.state.watches.start_watching(clause, clause_id);
        }

        // Should revert at most to the root level
        let target_level = back_track_to.max(ROOT_LEVEL);
        self.state.decision_tracker.undo_until(target_level);

        (target_level, clause_id, uip_literal)
    }

    /// Collects the clauses that led to a conflict at the root level.
    ///
    /// Walks the decisions from the most recent one and follows the clauses
    /// that implied every solvable involved in the conflict. Learnt clauses
    /// are replaced by the clauses they were derived from.
    fn analyze_unsolvable(&self, clause_id: ClauseId) -> Vec<ClauseId> {
        tracing::info!("=== ANALYZE UNSOLVABLE");

        let clauses = &self.state.encoding.clauses;
        let mut involved: HashSet<SolvableId> = clauses[clause_id]
            .literals
            .iter()
            .map(|l| l.solvable_id)
            .collect();
        let mut seen = HashSet::default();
        let mut problem = Vec::new();
        self.collect_causes(clause_id, &mut problem, &mut seen);

        for decision in self.state.decision_tracker.stack().rev() {
            if !involved.contains(&decision.solvable_id) {
                continue;
            }
            let Some(why) = decision.derived_from else {
                continue;
            };

            self.collect_causes(why, &mut problem, &mut seen);
            for literal in &clauses[why].literals {
                if literal.solvable_id != decision.solvable_id {
                    involved.insert(literal.solvable_id);
                }
            }
        }

        problem
    }

    fn collect_causes(
        &self,
        clause_id: ClauseId,
        problem: &mut Vec<ClauseId>,
        seen: &mut HashSet<ClauseId>,
    ) {
        if !seen.insert(clause_id) {
            return;
        }

        match self.state.encoding.clauses[clause_id].kind {
            Clause::Learnt(learnt_id) => {
                for &cause in &self.state.learnt_why[learnt_id] {
                    self.collect_causes(cause, problem, seen);
                }
            }
            _ => problem.push(clause_id),
        }
    }

    /// Turns the clauses of a conflict into a [`Problem`], together with the
    /// indices of the jobs it involves.
    fn problem(&self, conflict: &[ClauseId]) -> (Problem, Vec<usize>) {
        let clauses = &self.state.encoding.clauses;
        let conflict = self.problem_clauses(conflict);

        let involved_jobs = conflict
            .iter()
            .filter_map(|&id| match clauses[id].kind {
                Clause::Job(index)
                | Clause::UpdateJob(index, _)
                | Clause::Erase(index, _)
                | Clause::Lock(index, _) => Some(index),
                _ => None,
            })
            .unique()
            .collect();

        let rules = conflict.iter().map(|&id| self.problem_rule(id)).collect();
        (Problem::new(rules), involved_jobs)
    }

    /// The clauses of a conflict, shrunk to a minimal unsatisfiable set when
    /// the policy asks for it.
    fn problem_clauses(&self, conflict: &[ClauseId]) -> Vec<ClauseId> {
        if !self.policy.minimize_problems {
            return conflict.to_vec();
        }
        let clauses = &self.state.encoding.clauses;
        minimize::minimal_unsatisfiable_subset(
            conflict
                .iter()
                .map(|&id| (id, clauses[id].literals.as_slice()))
                .collect(),
        )
    }

    fn problem_rule(&self, clause_id: ClauseId) -> ProblemRule {
        let clause = &self.state.encoding.clauses[clause_id];
        match clause.kind {
            Clause::Job(index) if clause.literals.is_empty() => {
                ProblemRule::JobNothingMatches(self.jobs[index])
            }
            Clause::Job(index) => ProblemRule::Job(self.jobs[index]),
            Clause::UpdateJob(index, installed) => ProblemRule::UpdateJob {
                job: self.jobs[index],
                installed,
            },
            Clause::Erase(index, solvable) => ProblemRule::Erase {
                job: self.jobs[index],
                solvable,
            },
            Clause::Lock(index, solvable) => ProblemRule::Lock {
                job: self.jobs[index],
                solvable,
            },
            Clause::Requires(solvable, relation) if clause.literals.len() == 1 => {
                ProblemRule::NothingProvides { solvable, relation }
            }
            Clause::Requires(solvable, relation) => ProblemRule::Requires { solvable, relation },
            Clause::Conflicts(solvable, other, relation) => ProblemRule::Conflicts {
                solvable,
                other,
                relation,
            },
            Clause::Obsoletes(solvable, other, relation) => ProblemRule::Obsoletes {
                solvable,
                other,
                relation,
            },
            Clause::SameName(solvable, other) => ProblemRule::SameName { solvable, other },
            Clause::Update(installed) => ProblemRule::Update { installed },
            Clause::Learnt(_) => unreachable!("learnt clauses are replaced by their causes"),
        }
    }

    /// Proposes a change for every rule of the problem that can be relaxed
    /// and keeps the ones that make the problem disappear when tried.
    /// Dropping jobs is proposed first, then unlocking and allowing removals,
    /// then downgrades and ignored obsoletes.
    fn solutions(&self, problem: &Problem, jobs: &[Job]) -> Vec<Solution> {
        let allow_downgrade = self.policy.allow_downgrade;
        let candidates = problem
            .rules()
            .iter()
            .flat_map(|rule| match *rule {
                ProblemRule::JobNothingMatches(job)
                | ProblemRule::Job(job)
                | ProblemRule::Erase { job, .. } => vec![Solution::DropJob(job)],
                ProblemRule::UpdateJob { job, installed } if !allow_downgrade => {
                    vec![Solution::DropJob(job), Solution::AllowDowngrade(installed)]
                }
                ProblemRule::UpdateJob { job, .. } => vec![Solution::DropJob(job)],
                ProblemRule::Lock { job, .. } => vec![Solution::Unlock(job)],
                ProblemRule::Obsoletes { solvable, .. } => vec![Solution::IgnoreObsoletes(solvable)],
                ProblemRule::Update { installed } if !allow_downgrade => vec![
                    Solution::AllowUninstall(installed),
                    Solution::AllowDowngrade(installed),
                ],
                ProblemRule::Update { installed } => vec![Solution::AllowUninstall(installed)],
                ProblemRule::NothingProvides { .. }
                | ProblemRule::Requires { .. }
                | ProblemRule::Conflicts { .. }
                | ProblemRule::SameName { .. } => Vec::new(),
            })
            .unique()
            .sorted_by_key(Solution::relaxation_order)
            .collect_vec();

        candidates
            .into_iter()
            .filter(|solution| self.resolves(problem, jobs, solution))
            .collect()
    }

    /// Solves again with the solution applied and checks that the problem
    /// does not come back.
    fn resolves(&self, problem: &Problem, jobs: &[Job], solution: &Solution) -> bool {
        let mut policy = self.policy.clone();
        let mut jobs = jobs.to_vec();
        match *solution {
            Solution::DropJob(job) | Solution::Unlock(job) => jobs.retain(|j| *j != job),
            Solution::AllowDowngrade(_) => policy.allow_downgrade = true,
            Solution::IgnoreObsoletes(solvable) => policy.ignore_obsoletes_of.push(solvable),
            Solution::AllowUninstall(solvable) => policy.allow_uninstall_of.push(solvable),
        }

        let mut trial = Solver::new(self.pool).with_policy(policy);
        trial.find_solutions = false;
        let resolved = match trial.solve(&jobs) {
            Ok(_) => true,
            Err(unsolvable) => !unsolvable.problems.iter().any(|p| p.same_rules(problem)),
        };
        tracing::debug!(
            "solution '{}' {}",
            solution.display(self.pool),
            if resolved { "resolves the problem" } else { "does not help" }
        );
        resolved
    }

    /// Builds the transaction from the current assignment.
    fn transaction(&self) -> Transaction<'pool> {
        let tracker = &self.state.decision_tracker;
        let selected = self
            .state
            .encoding
            .variables
            .iter()
            .copied()
            .filter(|&s| tracker.assigned_value(s) == Some(true))
            .collect();
        let ranking = Ranking::new(self.pool, &self.policy);
        Transaction::new(self.pool, &ranking, selected, &self.state.encoding.excluded)
    }
}
