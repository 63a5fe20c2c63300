use std::cmp::Ordering;

use ahash::HashMap;

use crate::{evr::Evr, internal::arena::ArenaId, Pool, SolvableId, StringId};

/// Tunes the choices the solver makes and which changes it is allowed to
/// make to the installed system.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Policy {
    /// Allow replacing an installed solvable by an older version
    pub allow_downgrade: bool,
    /// Allow the solver to remove installed solvables that are in the way.
    /// When false every installed solvable must be kept or updated.
    pub allow_uninstall: bool,
    /// Installed solvables that may be removed even if `allow_uninstall` is
    /// false
    pub allow_uninstall_of: Vec<SolvableId>,
    /// Treat every installed solvable as if an update job targeted it
    pub update_all: bool,
    /// Do not let recommends influence which candidate is picked
    pub ignore_recommended: bool,
    /// Solvables whose obsoletes are not turned into rules
    pub ignore_obsoletes_of: Vec<SolvableId>,
    /// Architectures in order of preference, unlisted ones rank last
    pub arch_preference: Vec<String>,
    /// Reduce every problem to a minimal set of rules
    pub minimize_problems: bool,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            allow_downgrade: false,
            allow_uninstall: true,
            allow_uninstall_of: Vec::new(),
            update_all: false,
            ignore_recommended: false,
            ignore_obsoletes_of: Vec::new(),
            arch_preference: Vec::new(),
            minimize_problems: true,
        }
    }
}

impl Policy {
    /// Creates a policy with the default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether installed solvables may be downgraded
    pub fn allow_downgrade(mut self, allow: bool) -> Self {
        self.allow_downgrade = allow;
        self
    }

    /// Set whether installed solvables may be removed
    pub fn allow_uninstall(mut self, allow: bool) -> Self {
        self.allow_uninstall = allow;
        self
    }

    /// Allow removing one installed solvable regardless of `allow_uninstall`
    pub fn with_uninstallable(mut self, solvable: SolvableId) -> Self {
        self.allow_uninstall_of.push(solvable);
        self
    }

    /// Set whether all installed solvables are updated
    pub fn update_all(mut self, update: bool) -> Self {
        self.update_all = update;
        self
    }

    /// Set whether recommends influence candidate selection
    pub fn ignore_recommended(mut self, ignore: bool) -> Self {
        self.ignore_recommended = ignore;
        self
    }

    /// Ignore the obsoletes of one solvable
    pub fn with_ignored_obsoletes(mut self, solvable: SolvableId) -> Self {
        self.ignore_obsoletes_of.push(solvable);
        self
    }

    /// Set the architectures in order of preference
    pub fn arch_preference<I, S>(mut self, archs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.arch_preference = archs.into_iter().map(Into::into).collect();
        self
    }

    /// Set whether problems are minimized
    pub fn minimize_problems(mut self, minimize: bool) -> Self {
        self.minimize_problems = minimize;
        self
    }

    pub(crate) fn may_uninstall(&self, solvable: SolvableId) -> bool {
        self.allow_uninstall || self.allow_uninstall_of.contains(&solvable)
    }
}

/// Orders candidates from most to least preferred.
///
/// Candidates are compared by, in order: being installed (only when asked
/// for), repository priority, version rank, repository subpriority,
/// architecture preference, vendor (only when comparing against an installed
/// solvable) and finally their id.
///
/// The version rank of a solvable is the position of its version among all
/// solvables with the same name, newest first. Comparing ranks instead of
/// versions keeps the order total when candidates have different names.
pub(crate) struct Ranking<'pool> {
    pool: &'pool Pool,
    arch_ranks: HashMap<StringId, usize>,
    version_ranks: Vec<u32>,
}

impl<'pool> Ranking<'pool> {
    pub(crate) fn new(pool: &'pool Pool, policy: &Policy) -> Self {
        let arch_ranks = policy
            .arch_preference
            .iter()
            .enumerate()
            .filter_map(|(rank, arch)| pool.lookup_string(arch).map(|arch| (arch, rank)))
            .collect();
        Self {
            pool,
            arch_ranks,
            version_ranks: version_ranks(pool),
        }
    }

    fn version_rank(&self, solvable: SolvableId) -> u32 {
        self.version_ranks[solvable.to_usize()]
    }

    fn arch_rank(&self, solvable: SolvableId) -> usize {
        let arch = self.pool.resolve_solvable(solvable).arch;
        self.arch_ranks
            .get(&arch)
            .copied()
            .unwrap_or(self.arch_ranks.len())
    }

    /// Returns `Less` if `a` is preferred over `b`.
    pub(crate) fn compare(
        &self,
        a: SolvableId,
        b: SolvableId,
        prefer_installed: bool,
        vendor: Option<StringId>,
    ) -> Ordering {
        let pool = self.pool;
        let (solvable_a, solvable_b) = (pool.resolve_solvable(a), pool.resolve_solvable(b));
        let (repo_a, repo_b) = (
            pool.resolve_repo(solvable_a.repo),
            pool.resolve_repo(solvable_b.repo),
        );

        let installed = if prefer_installed {
            pool.is_installed(b).cmp(&pool.is_installed(a))
        } else {
            Ordering::Equal
        };

        installed
            .then_with(|| repo_b.priority.cmp(&repo_a.priority))
            .then_with(|| self.version_rank(a).cmp(&self.version_rank(b)))
            .then_with(|| repo_b.subpriority.cmp(&repo_a.subpriority))
            .then_with(|| self.arch_rank(a).cmp(&self.arch_rank(b)))
            .then_with(|| match vendor {
                Some(vendor) => {
                    let same_a = solvable_a.vendor == Some(vendor);
                    let same_b = solvable_b.vendor == Some(vendor);
                    same_b.cmp(&same_a)
                }
                None => Ordering::Equal,
            })
            .then_with(|| a.cmp(&b))
    }

    /// Sorts candidates from most to least preferred.
    pub(crate) fn sort(&self, candidates: &mut [SolvableId], prefer_installed: bool) {
        candidates.sort_by(|&a, &b| self.compare(a, b, prefer_installed, None));
    }

    /// Sorts replacement candidates of an installed solvable, preferring ones
    /// from the same vendor.
    pub(crate) fn sort_for_update(&self, candidates: &mut [SolvableId], installed: SolvableId) {
        let vendor = self.pool.resolve_solvable(installed).vendor;
        candidates.sort_by(|&a, &b| self.compare(a, b, false, vendor));
    }
}

/// Numbers the distinct versions of every name, newest first.
fn version_ranks(pool: &Pool) -> Vec<u32> {
    let mut by_name: HashMap<StringId, Vec<(SolvableId, Evr<'_>)>> = HashMap::default();
    for (id, solvable) in pool.solvables.iter() {
        by_name
            .entry(solvable.name)
            .or_default()
            .push((id, pool.parsed_evr(id)));
    }

    let mut ranks = vec![0; pool.solvables.len()];
    for mut group in by_name.into_values() {
        group.sort_by(|(_, a), (_, b)| b.cmp(a));
        let mut rank = 0;
        for (index, (id, evr)) in group.iter().enumerate() {
            if index > 0 && group[index - 1].1 != *evr {
                rank += 1;
            }
            ranks[id.to_usize()] = rank;
        }
    }
    ranks
}
