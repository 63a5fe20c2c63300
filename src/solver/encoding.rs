use std::collections::VecDeque;

use ahash::{HashMap, HashSet};
use bitvec::vec::BitVec;
use indexmap::IndexMap;

use crate::{
    internal::{
        arena::{Arena, ArenaId},
        id::ClauseId,
    },
    policy::Ranking,
    solver::clause::ClauseState,
    DependencyKind, Job, JobAction, Policy, Pool, RelationId, SolvableId, StringId,
};

/// The soft rule created for every installed solvable no job talks about.
/// The solver tries to keep the solvable (or update it when asked to) but
/// may remove it when that is the only way to satisfy the hard rules.
#[derive(Clone, Debug)]
pub(crate) struct UpdateRule {
    pub(crate) installed: SolvableId,
    /// The installed solvable and its update candidates, best first
    pub(crate) ranked: Vec<SolvableId>,
    /// Prefer the best candidate over keeping the installed solvable
    pub(crate) update: bool,
}

/// Everything the rule generator produces for a single solver run.
#[derive(Default)]
pub(crate) struct Encoding {
    pub(crate) clauses: Arena<ClauseId, ClauseState>,

    /// Job clauses with more than one literal, in job order
    pub(crate) job_clauses: Vec<ClauseId>,

    /// Clauses with fewer than two literals, asserted at the root level
    pub(crate) assertions: Vec<ClauseId>,

    /// Requires clauses that can be watched
    pub(crate) requires_clauses: Vec<ClauseId>,

    pub(crate) update_rules: Vec<UpdateRule>,

    /// The solvables that can become part of the solution, in package-table
    /// order. Everything else is never installed.
    pub(crate) variables: Vec<SolvableId>,

    /// Solvables an erase or lock job forbids
    pub(crate) excluded: BitVec,
}

impl Encoding {
    fn add_clause(&mut self, clause: ClauseState) -> ClauseId {
        let has_watches = clause.has_watches();
        let id = self.clauses.alloc(clause);
        if !has_watches {
            self.assertions.push(id);
        }
        id
    }
}

/// Turns the pool, the jobs and the policy into clauses.
///
/// Only solvables reachable from the installed system and the job candidates
/// through requires are encoded. Solvables that are never encoded can never
/// be installed, which keeps the problem small for large repositories.
pub(crate) struct Encoder<'a, 'pool> {
    pool: &'pool Pool,
    policy: &'a Policy,
    ranking: &'a Ranking<'pool>,

    /// Sorted providers per relation
    providers: HashMap<RelationId, Vec<SolvableId>>,

    /// Installed solvables and the solvables that obsolete them
    obsoleted_by: HashMap<SolvableId, Vec<SolvableId>>,

    encoding: Encoding,
}

impl<'a, 'pool> Encoder<'a, 'pool> {
    pub(crate) fn new(pool: &'pool Pool, policy: &'a Policy, ranking: &'a Ranking<'pool>) -> Self {
        Self {
            pool,
            policy,
            ranking,
            providers: HashMap::default(),
            obsoleted_by: HashMap::default(),
            encoding: Encoding::default(),
        }
    }

    /// Returns the providers of a relation, installed first and then in the
    /// order of preference.
    fn providers(&mut self, relation: RelationId) -> &[SolvableId] {
        let (pool, ranking) = (self.pool, self.ranking);
        self.providers.entry(relation).or_insert_with(|| {
            let mut providers = pool.what_provides(relation);
            ranking.sort(&mut providers, true);
            providers
        })
    }

    fn index_obsoletes(&mut self) {
        let pool = self.pool;
        if pool.installed_repo().is_none() {
            return;
        }
        for (id, solvable) in pool.solvables.iter() {
            if !pool.is_alive(id)
                || pool.is_installed(id)
                || self.policy.ignore_obsoletes_of.contains(&id)
            {
                continue;
            }
            for &relation in solvable.dependencies.get(DependencyKind::Obsoletes) {
                for target in pool.what_matches_name(relation) {
                    if pool.is_installed(target) && pool.resolve_solvable(target).name != solvable.name {
                        let obsoleters = self.obsoleted_by.entry(target).or_default();
                        if !obsoleters.contains(&id) {
                            obsoleters.push(id);
                        }
                    }
                }
            }
        }
    }

    /// The solvables that may replace an installed solvable: newer versions
    /// with the same name (any version when downgrades are allowed) and
    /// solvables obsoleting it. Sorted best first.
    fn update_candidates(&self, installed: SolvableId) -> Vec<SolvableId> {
        let pool = self.pool;
        let name = pool.resolve_solvable(installed).name;
        let installed_evr = pool.parsed_evr(installed);

        let mut candidates: Vec<SolvableId> = pool
            .solvables_named(name)
            .into_iter()
            .filter(|&candidate| candidate != installed && !pool.is_installed(candidate))
            .filter(|&candidate| {
                self.policy.allow_downgrade
                    || pool.parsed_evr(candidate).match_cmp(&installed_evr)
                        == std::cmp::Ordering::Greater
            })
            .collect();
        if let Some(obsoleters) = self.obsoleted_by.get(&installed) {
            candidates.extend(obsoleters.iter().copied());
        }
        self.ranking.sort_for_update(&mut candidates, installed);
        candidates
    }

    pub(crate) fn encode(mut self, jobs: &[Job], active: &[bool]) -> Encoding {
        let pool = self.pool;
        self.index_obsoletes();
        self.encoding.excluded = BitVec::repeat(false, pool.solvables.len());

        let installed: Vec<SolvableId> = pool.installed_solvables().collect();
        let job_matches: Vec<Vec<SolvableId>> = jobs
            .iter()
            .zip(active)
            .map(|(job, &active)| if active { job.select(pool) } else { Vec::new() })
            .collect();
        let targeted: HashSet<SolvableId> = job_matches.iter().flatten().copied().collect();
        let update_candidates: HashMap<SolvableId, Vec<SolvableId>> = installed
            .iter()
            .map(|&solvable| (solvable, self.update_candidates(solvable)))
            .collect();

        // Collect everything reachable through requires
        let mut reachable = BitVec::<usize>::repeat(false, pool.solvables.len());
        let mut queue: VecDeque<SolvableId> = installed
            .iter()
            .copied()
            .chain(job_matches.iter().flatten().copied())
            .chain(installed.iter().flat_map(|s| update_candidates[s].iter().copied()))
            .collect();
        while let Some(solvable) = queue.pop_front() {
            if reachable.replace(solvable.to_usize(), true) {
                continue;
            }
            let requires = pool
                .resolve_solvable(solvable)
                .dependencies
                .get(DependencyKind::Requires);
            for &requirement in requires {
                queue.extend(
                    self.providers(requirement)
                        .iter()
                        .copied()
                        .filter(|p| !reachable[p.to_usize()]),
                );
            }
        }
        self.encoding.variables = reachable.iter_ones().map(SolvableId::from_usize).collect();
        tracing::debug!(
            "{} of {} solvables are reachable",
            self.encoding.variables.len(),
            pool.solvables.len()
        );

        // Jobs
        for (index, (job, matches)) in jobs.iter().zip(&job_matches).enumerate() {
            if !active[index] {
                continue;
            }
            match job.action {
                JobAction::Install => self.install_job(index, matches),
                JobAction::Update if !matches.iter().any(|&s| pool.is_installed(s)) => {
                    // Nothing to update, so the best match gets installed
                    self.install_job(index, matches)
                }
                JobAction::Update => {
                    for &solvable in matches.iter().filter(|&&s| pool.is_installed(s)) {
                        let ranked = self.ranked_for_update(solvable, &update_candidates[&solvable]);
                        let clause_id = self
                            .encoding
                            .add_clause(ClauseState::update_job(index, solvable, &ranked));
                        if ranked.len() > 1 {
                            self.encoding.job_clauses.push(clause_id);
                        }
                    }
                }
                JobAction::Erase => {
                    for &solvable in matches.iter().filter(|&&s| pool.is_installed(s)) {
                        self.encoding.excluded.set(solvable.to_usize(), true);
                        self.encoding.add_clause(ClauseState::erase(index, solvable));
                    }
                }
                JobAction::Lock => {
                    for &solvable in matches {
                        let is_installed = pool.is_installed(solvable);
                        if !is_installed {
                            self.encoding.excluded.set(solvable.to_usize(), true);
                        }
                        self.encoding
                            .add_clause(ClauseState::lock(index, solvable, is_installed));
                    }
                }
            }
        }

        // Installed solvables no job talks about
        for &solvable in installed.iter().filter(|s| !targeted.contains(s)) {
            let candidates = &update_candidates[&solvable];
            if !self.policy.may_uninstall(solvable) {
                self.encoding
                    .add_clause(ClauseState::update(solvable, candidates));
            }
            let ranked = self.ranked_for_update(solvable, candidates);
            self.encoding.update_rules.push(UpdateRule {
                installed: solvable,
                ranked,
                update: self.policy.update_all,
            });
        }

        // Package rules
        let mut by_name: IndexMap<StringId, Vec<SolvableId>> = IndexMap::new();
        for solvable_id in self.encoding.variables.clone() {
            let solvable = pool.resolve_solvable(solvable_id);
            by_name.entry(solvable.name).or_default().push(solvable_id);

            for &requirement in solvable.dependencies.get(DependencyKind::Requires) {
                let candidates = self.providers(requirement).to_vec();
                if candidates.contains(&solvable_id) {
                    continue;
                }
                let clause_id = self.encoding.add_clause(ClauseState::requires(
                    solvable_id,
                    requirement,
                    &candidates,
                ));
                if !candidates.is_empty() {
                    self.encoding.requires_clauses.push(clause_id);
                }
            }

            for &relation in solvable.dependencies.get(DependencyKind::Conflicts) {
                for other in pool.what_provides(relation) {
                    if other != solvable_id && reachable[other.to_usize()] {
                        self.encoding
                            .add_clause(ClauseState::conflicts(solvable_id, other, relation));
                    }
                }
            }

            if self.policy.ignore_obsoletes_of.contains(&solvable_id) {
                continue;
            }
            for &relation in solvable.dependencies.get(DependencyKind::Obsoletes) {
                for other in pool.what_matches_name(relation) {
                    if reachable[other.to_usize()]
                        && pool.resolve_solvable(other).name != solvable.name
                    {
                        self.encoding
                            .add_clause(ClauseState::obsoletes(solvable_id, other, relation));
                    }
                }
            }
        }

        for solvables in by_name.values() {
            for (index, &a) in solvables.iter().enumerate() {
                for &b in &solvables[index + 1..] {
                    self.encoding.add_clause(ClauseState::same_name(a, b));
                }
            }
        }

        self.encoding
    }

    /// At least one of the matches must be installed. Without matches the
    /// clause is empty and the job can never be satisfied.
    fn install_job(&mut self, index: usize, matches: &[SolvableId]) {
        let mut candidates = matches.to_vec();
        self.ranking.sort(&mut candidates, true);
        let clause_id = self.encoding.add_clause(ClauseState::job(index, &candidates));
        if candidates.len() > 1 {
            self.encoding.job_clauses.push(clause_id);
        }
    }

    fn ranked_for_update(&self, installed: SolvableId, candidates: &[SolvableId]) -> Vec<SolvableId> {
        let mut ranked = Vec::with_capacity(candidates.len() + 1);
        ranked.push(installed);
        ranked.extend_from_slice(candidates);
        self.ranking.sort_for_update(&mut ranked, installed);
        ranked
    }
}
