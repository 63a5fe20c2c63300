//! The outcome of a successful solve and the queries over it.

use std::fmt::{Display, Formatter};

use bitvec::vec::BitVec;

use crate::{
    internal::arena::ArenaId, policy::Ranking, solvable::SolvableHandle, DependencyKind, Pool,
    SolvableId,
};

/// The changes to the installed system that satisfy a set of jobs.
///
/// Every query returns solvables in package-table order and can be repeated
/// any number of times.
#[derive(Clone)]
pub struct Transaction<'pool> {
    pool: &'pool Pool,
    /// Every solvable that is part of the solution
    selected: Vec<SolvableId>,
    /// Newly installed solvables that do not replace anything
    new_installs: Vec<SolvableId>,
    /// Installed solvables that are removed without replacement
    dropped: Vec<SolvableId>,
    /// Pairs of replaced installed solvables and their replacements, ordered
    /// by replacement
    updates: Vec<(SolvableId, SolvableId)>,
    suggestions: Vec<SolvableId>,
}

impl<'pool> Transaction<'pool> {
    /// Classifies the difference between the installed system and the
    /// selected solvables.
    pub(crate) fn new(
        pool: &'pool Pool,
        ranking: &Ranking<'pool>,
        selected: Vec<SolvableId>,
        excluded: &BitVec,
    ) -> Self {
        let mut is_selected = BitVec::<usize>::repeat(false, pool.solvables.len());
        for &solvable in &selected {
            is_selected.set(solvable.to_usize(), true);
        }

        let removed: Vec<SolvableId> = pool
            .installed_solvables()
            .filter(|s| !is_selected[s.to_usize()])
            .collect();
        let mut paired = vec![false; removed.len()];

        let mut new_installs = Vec::new();
        let mut updates = Vec::new();
        for &solvable in selected.iter().filter(|&&s| !pool.is_installed(s)) {
            let name = pool.resolve_solvable(solvable).name;
            let same_name = removed
                .iter()
                .enumerate()
                .position(|(index, &old)| !paired[index] && pool.resolve_solvable(old).name == name);
            let replaced = same_name.or_else(|| {
                removed.iter().enumerate().position(|(index, &old)| {
                    !paired[index] && obsoletes(pool, solvable, old)
                })
            });

            match replaced {
                Some(index) => {
                    paired[index] = true;
                    updates.push((removed[index], solvable));
                }
                None => new_installs.push(solvable),
            }
        }

        let dropped = removed
            .iter()
            .zip(&paired)
            .filter(|(_, paired)| !**paired)
            .map(|(&solvable, _)| solvable)
            .collect();

        let suggestions = suggestions(pool, ranking, &selected, &is_selected, excluded);

        Self {
            pool,
            selected,
            new_installs,
            dropped,
            updates,
            suggestions,
        }
    }

    fn handles<'a>(
        &'a self,
        ids: impl Iterator<Item = SolvableId> + 'a,
    ) -> impl Iterator<Item = SolvableHandle<'pool>> + 'a {
        let pool = self.pool;
        ids.map(move |id| pool.handle(id))
    }

    /// Every solvable that is installed after applying the transaction
    pub fn selected(&self) -> impl Iterator<Item = SolvableHandle<'pool>> + '_ {
        self.handles(self.selected.iter().copied())
    }

    /// Returns true if the solvable is installed after applying the transaction
    pub fn is_selected(&self, solvable: SolvableId) -> bool {
        self.selected.binary_search(&solvable).is_ok()
    }

    /// Solvables that become installed. With `all` set this includes the
    /// replacements of updated solvables, otherwise only new solvables are
    /// returned.
    pub fn installs(&self, all: bool) -> impl Iterator<Item = SolvableHandle<'pool>> + '_ {
        let mut ids = self.new_installs.clone();
        if all {
            ids.extend(self.updates.iter().map(|&(_, new)| new));
            ids.sort_unstable();
        }
        self.handles(ids.into_iter())
    }

    /// Installed solvables that are removed. With `all` set this includes
    /// the solvables replaced by updates, otherwise only solvables that are
    /// dropped without replacement are returned.
    pub fn removals(&self, all: bool) -> impl Iterator<Item = SolvableHandle<'pool>> + '_ {
        let mut ids = self.dropped.clone();
        if all {
            ids.extend(self.updates.iter().map(|&(old, _)| old));
            ids.sort_unstable();
        }
        self.handles(ids.into_iter())
    }

    /// Pairs of installed solvables and the solvables replacing them
    pub fn updates(
        &self,
    ) -> impl Iterator<Item = (SolvableHandle<'pool>, SolvableHandle<'pool>)> + '_ {
        let pool = self.pool;
        self.updates
            .iter()
            .map(move |&(old, new)| (pool.handle(old), pool.handle(new)))
    }

    /// Solvables that are not part of the solution but are recommended or
    /// suggested by it, or that supplement or enhance it.
    pub fn suggestions(&self) -> impl Iterator<Item = SolvableHandle<'pool>> + '_ {
        self.handles(self.suggestions.iter().copied())
    }

    /// Returns true if applying the transaction changes nothing
    pub fn is_empty(&self) -> bool {
        self.new_installs.is_empty() && self.dropped.is_empty() && self.updates.is_empty()
    }
}

fn obsoletes(pool: &Pool, solvable: SolvableId, old: SolvableId) -> bool {
    pool.resolve_solvable(solvable)
        .dependencies
        .get(DependencyKind::Obsoletes)
        .iter()
        .any(|&relation| pool.what_matches_name(relation).contains(&old))
}

fn suggestions(
    pool: &Pool,
    ranking: &Ranking<'_>,
    selected: &[SolvableId],
    is_selected: &BitVec,
    excluded: &BitVec,
) -> Vec<SolvableId> {
    let available = |id: SolvableId| !is_selected[id.to_usize()] && !excluded[id.to_usize()];
    let mut suggestions = Vec::new();

    for &solvable in selected {
        let dependencies = &pool.resolve_solvable(solvable).dependencies;
        for kind in [DependencyKind::Recommends, DependencyKind::Suggests] {
            for &relation in dependencies.get(kind) {
                let mut providers = pool.what_provides(relation);
                if providers.iter().any(|p| is_selected[p.to_usize()]) {
                    continue;
                }
                providers.retain(|&p| available(p));
                ranking.sort(&mut providers, false);
                if let Some(&best) = providers.first() {
                    suggestions.push(best);
                }
            }
        }
    }

    for (id, solvable) in pool.solvables.iter() {
        if !pool.is_alive(id) || !available(id) {
            continue;
        }
        let supplements = solvable
            .dependencies
            .get(DependencyKind::Supplements)
            .iter()
            .chain(solvable.dependencies.get(DependencyKind::Enhances));
        for &relation in supplements {
            if pool
                .what_provides(relation)
                .iter()
                .any(|p| is_selected[p.to_usize()])
            {
                suggestions.push(id);
                break;
            }
        }
    }

    suggestions.sort_unstable();
    suggestions.dedup();
    suggestions
}

impl PartialEq for Transaction<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.pool, other.pool)
            && self.selected == other.selected
            && self.new_installs == other.new_installs
            && self.dropped == other.dropped
            && self.updates == other.updates
            && self.suggestions == other.suggestions
    }
}

impl Eq for Transaction<'_> {}

impl std::fmt::Debug for Transaction<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let pool = self.pool;
        let names = |ids: &[SolvableId]| -> Vec<String> {
            ids.iter()
                .map(|&id| pool.display_solvable(id).to_string())
                .collect()
        };
        f.debug_struct("Transaction")
            .field("installs", &names(&self.new_installs))
            .field("removals", &names(&self.dropped))
            .field(
                "updates",
                &self
                    .updates
                    .iter()
                    .map(|&(old, new)| {
                        format!(
                            "{} -> {}",
                            pool.display_solvable(old),
                            pool.display_solvable(new)
                        )
                    })
                    .collect::<Vec<_>>(),
            )
            .field("suggestions", &names(&self.suggestions))
            .finish()
    }
}

impl Display for Transaction<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let pool = self.pool;
        for &id in &self.new_installs {
            writeln!(f, "install {}", pool.display_solvable(id))?;
        }
        for &(old, new) in &self.updates {
            writeln!(
                f,
                "update {} -> {}",
                pool.display_solvable(old),
                pool.display_solvable(new)
            )?;
        }
        for &id in &self.dropped {
            writeln!(f, "erase {}", pool.display_solvable(id))?;
        }
        Ok(())
    }
}
