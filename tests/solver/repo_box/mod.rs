// A tiny repository format for tests.
//
// A package is written as `name evr [arch]`, for instance `a 1.0-1 x86_64`.
// When the architecture is left out the package is `noarch`. Dependencies are
// written as `kind relation`, like `requires b >= 2` or `obsoletes old`, using
// the names of the dependency lists. Jobs are written as `action selector`,
// for instance `install a >= 2` or `erase b`.
//
// Lets call the collection of repositories a `RepoBox`.

use indexmap::IndexMap;
use satsolv::{
    DependencyKind, Job, JobAction, Policy, Pool, RepoId, Selector, SolvableId, Solver,
};

/// The name of the repository that holds the installed packages
pub const SYSTEM: &str = "@System";

#[derive(Default)]
pub struct RepoBox {
    pub pool: Pool,
    repos: IndexMap<String, RepoId>,
}

impl RepoBox {
    pub fn new() -> Self {
        Default::default()
    }

    /// Builds a box from `(repo, package, dependencies)` triples. Packages in
    /// the [`SYSTEM`] repository are installed.
    pub fn from_packages(packages: &[(&str, &str, Vec<&str>)]) -> Self {
        let mut result = Self::new();
        for (repo, package, dependencies) in packages {
            result.add_package(repo, package, dependencies);
        }
        result
    }

    /// Returns the repository with the given name, creating it with priority
    /// 0 if needed.
    pub fn repo(&mut self, name: &str) -> RepoId {
        if let Some(&id) = self.repos.get(name) {
            return id;
        }
        let id = self.pool.add_repository(name, 0);
        if name == SYSTEM {
            self.pool.set_installed(Some(id));
        }
        self.repos.insert(name.to_owned(), id);
        id
    }

    pub fn set_priority(&mut self, name: &str, priority: i32) {
        let repo = self.repo(name);
        self.pool.repo_mut(repo).set_priority(priority);
    }

    pub fn add_package(&mut self, repo: &str, package: &str, dependencies: &[&str]) -> SolvableId {
        let repo = self.repo(repo);
        let mut parts = package.split_whitespace();
        let name = parts.next().expect("package without a name");
        let evr = parts.next().expect("package without a version");
        let arch = parts.next().unwrap_or("noarch");
        let id = self.pool.add_solvable(repo, name, evr, arch).unwrap();

        for dependency in dependencies {
            let (kind, relation) = dependency
                .split_once(' ')
                .expect("dependency without a relation");
            self.pool
                .add_dependency_str(id, parse_kind(kind), relation)
                .unwrap();
        }
        id
    }

    /// Finds the solvable written as `name evr` in any repository
    pub fn solvable(&self, package: &str) -> SolvableId {
        let (name, evr) = package.split_once(' ').expect("expected 'name evr'");
        self.pool
            .find_by_name(name, None)
            .into_iter()
            .find(|s| s.evr() == evr)
            .unwrap_or_else(|| panic!("no package '{package}'"))
            .id()
    }

    pub fn jobs(&mut self, jobs: &[&str]) -> Vec<Job> {
        jobs.iter()
            .map(|job| {
                let (action, selector) = job.split_once(' ').expect("expected 'action selector'");
                let action = match action {
                    "install" => JobAction::Install,
                    "erase" => JobAction::Erase,
                    "update" => JobAction::Update,
                    "lock" => JobAction::Lock,
                    _ => panic!("unknown job action '{action}'"),
                };
                Job::new(action, Selector::parse(&mut self.pool, selector).unwrap())
            })
            .collect()
    }

    /// Solves the jobs and returns either the transaction or the problems as
    /// a string.
    pub fn solve(&mut self, jobs: &[&str]) -> String {
        self.solve_with_policy(jobs, Policy::default())
    }

    pub fn solve_with_policy(&mut self, jobs: &[&str], policy: Policy) -> String {
        let jobs = self.jobs(jobs);
        let mut solver = Solver::new(&self.pool).with_policy(policy);
        match solver.solve(&jobs) {
            Ok(transaction) => transaction.to_string(),
            Err(unsolvable) => unsolvable.display_user_friendly(&self.pool).to_string(),
        }
    }
}

fn parse_kind(kind: &str) -> DependencyKind {
    DependencyKind::ALL
        .into_iter()
        .find(|k| k.as_str() == kind)
        .unwrap_or_else(|| panic!("unknown dependency kind '{kind}'"))
}
