use std::fmt::{Display, Formatter};

use ahash::HashMap;
use indexmap::IndexMap;

use crate::{
    error::{LookupError, ParseError, PoolError},
    evr::Evr,
    internal::arena::Arena,
    relation::{self, parse_relation},
    solvable::{DroppedDependency, SolvableHandle},
    DependencyKind, Relation, RelationId, RelationOp, Repo, RepoId, Solvable, SolvableId,
    SolvableKind, StringId,
};

/// A pool stores and interns everything the solver reasons about: strings,
/// relations, repositories and the solvables in them.
///
/// Ids handed out by the pool are never reused. Freeing a repository only
/// hides its solvables from every query and from the solver.
#[derive(Default)]
pub struct Pool {
    /// Interned strings
    strings: Arena<StringId, String>,

    /// Map from strings to the id of their interned counterpart
    string_to_ids: HashMap<String, StringId>,

    /// Interned relations
    relations: Arena<RelationId, Relation>,

    /// Map from relations to the id of their interned counterpart
    relation_to_ids: HashMap<Relation, RelationId>,

    pub(crate) repos: Arena<RepoId, Repo>,

    /// All the solvables that have been registered, in package-table order
    pub(crate) solvables: Arena<SolvableId, Solvable>,

    installed: Option<RepoId>,

    /// For every name, the solvables with a provide on that name
    providers: IndexMap<StringId, Vec<SolvableId>>,

    /// For every name, the solvables carrying that name
    by_name: IndexMap<StringId, Vec<SolvableId>>,
}

impl Pool {
    /// Creates a new, empty [`Pool`]
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns a string and returns its `StringId`. Strings are deduplicated.
    pub fn intern_string(&mut self, s: &str) -> StringId {
        if let Some(&id) = self.string_to_ids.get(s) {
            return id;
        }

        let id = self.strings.alloc(s.to_owned());
        self.string_to_ids.insert(s.to_owned(), id);
        id
    }

    /// Returns the id of a string if it was interned before.
    pub fn lookup_string(&self, s: &str) -> Option<StringId> {
        self.string_to_ids.get(s).copied()
    }

    /// Returns the string associated with the provided [`StringId`].
    ///
    /// Panics if the string is not found in the pool.
    pub fn resolve_string(&self, id: StringId) -> &str {
        &self.strings[id]
    }

    /// Interns a relation from its parts, validating the name and version.
    pub fn intern_relation(
        &mut self,
        name: &str,
        constraint: Option<(RelationOp, &str)>,
    ) -> Result<RelationId, ParseError> {
        if name.is_empty() || name.contains(char::is_whitespace) {
            return Err(ParseError::InvalidName(name.to_owned()));
        }
        if let Some((_, evr)) = constraint {
            Evr::parse(evr)?;
        }

        let relation = Relation {
            name: self.intern_string(name),
            constraint: constraint.map(|(op, evr)| (op, self.intern_string(evr))),
        };
        Ok(self.intern_relation_unchecked(relation))
    }

    fn intern_relation_unchecked(&mut self, relation: Relation) -> RelationId {
        if let Some(&id) = self.relation_to_ids.get(&relation) {
            return id;
        }

        let id = self.relations.alloc(relation);
        self.relation_to_ids.insert(relation, id);
        id
    }

    /// Parses and interns a relation expression such as `libfoo >= 1.2-3`.
    pub fn parse_relation(&mut self, text: &str) -> Result<RelationId, ParseError> {
        let parsed = parse_relation(text)?;
        self.intern_relation(parsed.name, parsed.constraint)
    }

    /// Returns the relation associated with the provided [`RelationId`].
    pub fn resolve_relation(&self, id: RelationId) -> &Relation {
        &self.relations[id]
    }

    /// Returns an object that renders the relation as `name op evr`.
    pub fn display_relation(&self, id: RelationId) -> RelationDisplay<'_> {
        RelationDisplay { pool: self, id }
    }

    /// Adds a new repository.
    pub fn add_repository(&mut self, name: &str, priority: i32) -> RepoId {
        self.repos.alloc(Repo::new(name, priority))
    }

    /// Returns the repository with the given id.
    pub fn resolve_repo(&self, id: RepoId) -> &Repo {
        &self.repos[id]
    }

    /// Returns the repository with the given id for modification.
    pub fn repo_mut(&mut self, id: RepoId) -> &mut Repo {
        &mut self.repos[id]
    }

    /// Iterates over all repositories that have not been freed.
    pub fn repositories(&self) -> impl Iterator<Item = (RepoId, &Repo)> + '_ {
        self.repos.iter().filter(|(_, repo)| !repo.freed)
    }

    /// Marks a repository as the installed set of the system.
    pub fn set_installed(&mut self, repo: Option<RepoId>) {
        self.installed = repo;
    }

    /// Returns the repository representing the installed system, if any.
    pub fn installed_repo(&self) -> Option<RepoId> {
        self.installed
    }

    /// Removes a repository and all of its solvables from the pool.
    pub fn free_repository(&mut self, id: RepoId) -> Result<(), LookupError> {
        let repo = self
            .repos
            .get(id)
            .filter(|repo| !repo.freed)
            .ok_or(LookupError::NoSuchRepo)?;
        tracing::debug!(
            "freeing repository '{}' with {} solvables",
            repo.name,
            repo.solvables.len()
        );

        self.repos[id].freed = true;
        if self.installed == Some(id) {
            self.installed = None;
        }
        Ok(())
    }

    /// Adds a solvable to a repository. The solvable implicitly provides
    /// `name = evr`.
    pub fn add_solvable(
        &mut self,
        repo: RepoId,
        name: &str,
        evr: &str,
        arch: &str,
    ) -> Result<SolvableId, PoolError> {
        if self.repos.get(repo).map_or(true, |repo| repo.freed) {
            return Err(LookupError::NoSuchRepo.into());
        }
        let self_provide = self.intern_relation(name, Some((RelationOp::EQ, evr)))?;
        let name_id = self.intern_string(name);
        let solvable = Solvable {
            name: name_id,
            evr: self.intern_string(evr),
            arch: self.intern_string(arch),
            vendor: None,
            kind: SolvableKind::from_name(name),
            repo,
            dependencies: Default::default(),
            dropped: Vec::new(),
        };

        let id = self.solvables.alloc(solvable);
        self.repos[repo].solvables.push(id);
        self.by_name.entry(name_id).or_default().push(id);
        self.add_dependency(id, DependencyKind::Provides, self_provide);
        Ok(id)
    }

    /// Adds an interned relation to one of the dependency lists of a solvable.
    pub fn add_dependency(&mut self, solvable: SolvableId, kind: DependencyKind, relation: RelationId) {
        self.solvables[solvable].dependencies.push(kind, relation);
        if kind == DependencyKind::Provides {
            let name = self.relations[relation].name;
            let providers = self.providers.entry(name).or_default();
            if !providers.contains(&solvable) {
                providers.push(solvable);
            }
        }
    }

    /// Parses a relation expression and adds it to one of the dependency lists
    /// of a solvable. Expressions that fail to parse are recorded as dropped
    /// on the solvable and the error is returned.
    pub fn add_dependency_str(
        &mut self,
        solvable: SolvableId,
        kind: DependencyKind,
        text: &str,
    ) -> Result<RelationId, ParseError> {
        match self.parse_relation(text) {
            Ok(relation) => {
                self.add_dependency(solvable, kind, relation);
                Ok(relation)
            }
            Err(error) => {
                tracing::warn!(
                    "dropping {} '{}' of {}: {error}",
                    kind.as_str(),
                    text,
                    self.display_solvable(solvable)
                );
                self.solvables[solvable].dropped.push(DroppedDependency {
                    kind,
                    text: text.to_owned(),
                    error: error.clone(),
                });
                Err(error)
            }
        }
    }

    /// Sets the vendor of a solvable.
    pub fn set_vendor(&mut self, solvable: SolvableId, vendor: &str) {
        let vendor = self.intern_string(vendor);
        self.solvables[solvable].vendor = Some(vendor);
    }

    /// Returns the solvable associated with the provided [`SolvableId`].
    ///
    /// Panics if the solvable is not found in the pool.
    pub fn resolve_solvable(&self, id: SolvableId) -> &Solvable {
        &self.solvables[id]
    }

    /// Returns a handle to the solvable that borrows the pool.
    pub fn handle(&self, id: SolvableId) -> SolvableHandle<'_> {
        SolvableHandle::new(self, id)
    }

    /// Returns false if the repository of the solvable was freed.
    pub fn is_alive(&self, id: SolvableId) -> bool {
        !self.repos[self.solvables[id].repo].freed
    }

    /// Returns true if the solvable belongs to the installed repository.
    pub fn is_installed(&self, id: SolvableId) -> bool {
        self.installed == Some(self.solvables[id].repo) && self.is_alive(id)
    }

    /// Iterates over the solvables that are currently installed.
    pub fn installed_solvables(&self) -> impl Iterator<Item = SolvableId> + '_ {
        self.installed
            .into_iter()
            .flat_map(|repo| self.repos[repo].solvables.iter().copied())
            .filter(|&id| self.is_alive(id))
    }

    fn scope(&self, repo: Option<RepoId>) -> Result<Vec<SolvableId>, LookupError> {
        match repo {
            Some(repo) => {
                let repo = self
                    .repos
                    .get(repo)
                    .filter(|repo| !repo.freed)
                    .ok_or(LookupError::NoSuchRepo)?;
                Ok(repo.solvables.clone())
            }
            None => Ok(self
                .solvables
                .iter()
                .map(|(id, _)| id)
                .filter(|&id| self.is_alive(id))
                .collect()),
        }
    }

    /// Iterates over the live solvables of one repository, or of the whole
    /// pool, in package-table order. A freed repository yields nothing.
    pub fn solvables(&self, repo: Option<RepoId>) -> impl Iterator<Item = SolvableHandle<'_>> + '_ {
        self.scope(repo)
            .unwrap_or_default()
            .into_iter()
            .map(move |id| self.handle(id))
    }

    /// Finds all solvables with the given name, optionally restricted to one
    /// repository.
    pub fn find_by_name(&self, name: &str, repo: Option<RepoId>) -> Vec<SolvableHandle<'_>> {
        let Some(name) = self.lookup_string(name) else {
            return Vec::new();
        };
        self.by_name
            .get(&name)
            .into_iter()
            .flatten()
            .copied()
            .filter(|&id| self.is_alive(id))
            .filter(|&id| repo.map_or(true, |repo| self.solvables[id].repo == repo))
            .map(|id| self.handle(id))
            .collect()
    }

    /// Returns the first solvable with the given name in package-table order.
    pub fn lookup_by_name(
        &self,
        name: &str,
        repo: Option<RepoId>,
    ) -> Result<SolvableHandle<'_>, LookupError> {
        if let Some(repo) = repo {
            if self.repos.get(repo).map_or(true, |repo| repo.freed) {
                return Err(LookupError::NoSuchRepo);
            }
        }
        self.find_by_name(name, repo)
            .into_iter()
            .next()
            .ok_or_else(|| LookupError::NotFound(name.to_owned()))
    }

    /// Returns the solvable at position `index` among the live solvables of a
    /// repository or of the whole pool.
    pub fn get_by_index(
        &self,
        index: usize,
        repo: Option<RepoId>,
    ) -> Result<SolvableHandle<'_>, LookupError> {
        let scope = self.scope(repo)?;
        scope
            .get(index)
            .map(|&id| self.handle(id))
            .ok_or(LookupError::NoSuchIndex {
                index,
                len: scope.len(),
            })
    }

    /// Returns the parsed version of a solvable.
    pub(crate) fn parsed_evr(&self, id: SolvableId) -> Evr<'_> {
        let evr = self.resolve_string(self.solvables[id].evr);
        Evr::parse(evr).expect("versions are validated when solvables are added")
    }

    fn relation_range(&self, relation: &Relation) -> Option<(RelationOp, Evr<'_>)> {
        relation.constraint.map(|(op, evr)| {
            let evr = Evr::parse(self.resolve_string(evr))
                .expect("versions are validated when relations are interned");
            (op, evr)
        })
    }

    /// Returns true if a provide satisfies a requirement: the names are equal
    /// and the version ranges overlap. An unversioned provide or requirement
    /// matches any version.
    pub fn relation_matches(&self, provide: RelationId, requirement: RelationId) -> bool {
        let (provide, requirement) = (&self.relations[provide], &self.relations[requirement]);
        if provide.name != requirement.name {
            return false;
        }
        match (self.relation_range(provide), self.relation_range(requirement)) {
            (Some((op_a, evr_a)), Some((op_b, evr_b))) => {
                relation::ranges_intersect((op_a, &evr_a), (op_b, &evr_b))
            }
            _ => true,
        }
    }

    /// Returns all live solvables that provide something matching the
    /// relation, in package-table order.
    pub fn what_provides(&self, relation: RelationId) -> Vec<SolvableId> {
        let name = self.relations[relation].name;
        let mut providers: Vec<SolvableId> = self
            .providers
            .get(&name)
            .into_iter()
            .flatten()
            .copied()
            .filter(|&id| self.is_alive(id))
            .filter(|&id| {
                self.solvables[id]
                    .dependencies
                    .get(DependencyKind::Provides)
                    .iter()
                    .any(|&provide| self.relation_matches(provide, relation))
            })
            .collect();
        providers.sort_unstable();
        providers
    }

    /// Returns all live solvables named `name`, in package-table order.
    pub(crate) fn solvables_named(&self, name: StringId) -> Vec<SolvableId> {
        self.by_name
            .get(&name)
            .into_iter()
            .flatten()
            .copied()
            .filter(|&id| self.is_alive(id))
            .collect()
    }

    /// Returns all live solvables with any provide on `name`, in
    /// package-table order.
    pub(crate) fn providers_of_name(&self, name: StringId) -> Vec<SolvableId> {
        let mut providers: Vec<SolvableId> = self
            .providers
            .get(&name)
            .into_iter()
            .flatten()
            .copied()
            .filter(|&id| self.is_alive(id))
            .collect();
        providers.sort_unstable();
        providers
    }

    /// Returns all live solvables whose own name and version match the
    /// relation. This is how obsoletes are matched.
    pub fn what_matches_name(&self, relation: RelationId) -> Vec<SolvableId> {
        let target = self.relations[relation];
        let range = self.relation_range(&target);
        self.by_name
            .get(&target.name)
            .into_iter()
            .flatten()
            .copied()
            .filter(|&id| self.is_alive(id))
            .filter(|&id| match &range {
                Some((op, constraint)) => {
                    relation::version_matches(&self.parsed_evr(id), *op, constraint)
                }
                None => true,
            })
            .collect()
    }

    /// Returns an object that renders the solvable as `name-evr.arch`.
    pub fn display_solvable(&self, id: SolvableId) -> SolvableDisplay<'_> {
        SolvableDisplay { pool: self, id }
    }
}

/// Displays a solvable as `name-evr.arch`
pub struct SolvableDisplay<'pool> {
    pool: &'pool Pool,
    id: SolvableId,
}

impl Display for SolvableDisplay<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let solvable = self.pool.resolve_solvable(self.id);
        write!(
            f,
            "{}-{}.{}",
            self.pool.resolve_string(solvable.name),
            self.pool.resolve_string(solvable.evr),
            self.pool.resolve_string(solvable.arch)
        )
    }
}

/// Displays a relation as `name op evr`
pub struct RelationDisplay<'pool> {
    pool: &'pool Pool,
    id: RelationId,
}

impl Display for RelationDisplay<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let relation = self.pool.resolve_relation(self.id);
        write!(f, "{}", self.pool.resolve_string(relation.name))?;
        if let Some((op, evr)) = relation.constraint {
            write!(f, " {} {}", op, self.pool.resolve_string(evr))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool_with_repo() -> (Pool, RepoId) {
        let mut pool = Pool::new();
        let repo = pool.add_repository("repo", 0);
        (pool, repo)
    }

    #[test]
    fn test_interning_is_idempotent() {
        let mut pool = Pool::new();
        let a = pool.intern_string("a");
        assert_eq!(pool.intern_string("a"), a);
        assert_eq!(pool.resolve_string(a), "a");

        let r1 = pool.parse_relation("a >= 1.0").unwrap();
        let r2 = pool.parse_relation("a>=1.0").unwrap();
        assert_eq!(r1, r2);
        assert_eq!(pool.display_relation(r1).to_string(), "a >= 1.0");
    }

    #[test]
    fn test_implicit_self_provide() {
        let (mut pool, repo) = pool_with_repo();
        let a1 = pool.add_solvable(repo, "a", "1.0", "noarch").unwrap();
        let a2 = pool.add_solvable(repo, "a", "2.0", "noarch").unwrap();

        let any = pool.parse_relation("a").unwrap();
        let ge2 = pool.parse_relation("a >= 2").unwrap();
        assert_eq!(pool.what_provides(any), vec![a1, a2]);
        assert_eq!(pool.what_provides(ge2), vec![a2]);
    }

    #[test]
    fn test_unversioned_provide_matches_versioned_requirement() {
        let (mut pool, repo) = pool_with_repo();
        let b = pool.add_solvable(repo, "b", "1.0", "noarch").unwrap();
        pool.add_dependency_str(b, DependencyKind::Provides, "virtual")
            .unwrap();

        let requirement = pool.parse_relation("virtual >= 5").unwrap();
        assert_eq!(pool.what_provides(requirement), vec![b]);
        assert!(pool.what_matches_name(requirement).is_empty());
    }

    #[test]
    fn test_dropped_dependencies() {
        let (mut pool, repo) = pool_with_repo();
        let a = pool.add_solvable(repo, "a", "1.0", "noarch").unwrap();
        let err = pool
            .add_dependency_str(a, DependencyKind::Requires, "b >= ")
            .unwrap_err();
        assert_eq!(err, ParseError::MissingVersion(">=".to_owned()));

        let solvable = pool.resolve_solvable(a);
        assert!(solvable.dependencies().get(DependencyKind::Requires).is_empty());
        assert_eq!(solvable.dropped_dependencies().len(), 1);
        assert_eq!(solvable.dropped_dependencies()[0].text, "b >= ");
    }

    #[test]
    fn test_invalid_solvable_version() {
        let (mut pool, repo) = pool_with_repo();
        assert_eq!(
            pool.add_solvable(repo, "a", "x:1", "noarch"),
            Err(PoolError::Parse(ParseError::InvalidVersion("x:1".to_owned())))
        );
        assert_eq!(pool.solvables(None).count(), 0);
    }

    #[test]
    fn test_free_repository() {
        let (mut pool, repo) = pool_with_repo();
        let other = pool.add_repository("other", 0);
        pool.add_solvable(repo, "a", "1.0", "noarch").unwrap();
        let b = pool.add_solvable(other, "b", "1.0", "noarch").unwrap();
        pool.set_installed(Some(repo));

        pool.free_repository(repo).unwrap();
        assert_eq!(pool.free_repository(repo), Err(LookupError::NoSuchRepo));
        assert_eq!(pool.installed_repo(), None);
        assert!(pool.find_by_name("a", None).is_empty());
        assert_eq!(pool.get_by_index(0, None).unwrap().id(), b);
        assert_eq!(
            pool.lookup_by_name("a", Some(repo)).unwrap_err(),
            LookupError::NoSuchRepo
        );
        assert_eq!(
            pool.add_solvable(repo, "c", "1.0", "noarch"),
            Err(PoolError::Lookup(LookupError::NoSuchRepo))
        );
        assert!(pool.find_by_name("c", None).is_empty());
    }

    #[test]
    fn test_lookup() {
        let (mut pool, repo) = pool_with_repo();
        let a = pool.add_solvable(repo, "a", "1.0", "x86_64").unwrap();
        pool.add_solvable(repo, "a", "2.0", "x86_64").unwrap();

        let handle = pool.lookup_by_name("a", None).unwrap();
        assert_eq!(handle.id(), a);
        assert_eq!(handle.to_string(), "a-1.0.x86_64");
        assert_eq!(pool.find_by_name("a", Some(repo)).len(), 2);
        assert_eq!(
            pool.lookup_by_name("b", None).unwrap_err(),
            LookupError::NotFound("b".to_owned())
        );
        assert_eq!(
            pool.get_by_index(2, Some(repo)).unwrap_err(),
            LookupError::NoSuchIndex { index: 2, len: 2 }
        );
    }
}
