use std::fmt::{Debug, Display, Formatter};

use crate::{
    error::ParseError, evr::Evr, Pool, RelationId, Repo, RepoId, SolvableId, StringId,
};

/// The kind of a solvable, derived from the prefix of its name. Packages have
/// no prefix, the other kinds are named `pattern:base`, `product:sles` and so
/// on.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Ord, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SolvableKind {
    /// A regular package
    Package,
    /// A collection of packages (`pattern:`)
    Pattern,
    /// An installable product (`product:`)
    Product,
    /// A patch (`patch:`)
    Patch,
    /// A source package (`srcpackage:`)
    Source,
}

impl SolvableKind {
    /// Determines the kind of a solvable from its name.
    pub fn from_name(name: &str) -> Self {
        match name.split_once(':') {
            Some(("pattern", _)) => SolvableKind::Pattern,
            Some(("product", _)) => SolvableKind::Product,
            Some(("patch", _)) => SolvableKind::Patch,
            Some(("srcpackage", _)) => SolvableKind::Source,
            _ => SolvableKind::Package,
        }
    }
}

/// The different dependency lists a solvable carries.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Ord, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DependencyKind {
    /// Capabilities the solvable offers
    Provides,
    /// Capabilities that must be installed alongside the solvable
    Requires,
    /// Capabilities that may not be installed alongside the solvable
    Conflicts,
    /// Packages replaced by the solvable, matched by name
    Obsoletes,
    /// Weak requirement, reported as a suggestion when unsatisfied
    Recommends,
    /// Weaker requirement, reported as a suggestion when unsatisfied
    Suggests,
    /// Reverse recommends: suggest this solvable when the capability is installed
    Supplements,
    /// Reverse suggests: suggest this solvable when the capability is installed
    Enhances,
}

impl DependencyKind {
    /// All kinds in the order they are stored in.
    pub const ALL: [DependencyKind; 8] = [
        DependencyKind::Provides,
        DependencyKind::Requires,
        DependencyKind::Conflicts,
        DependencyKind::Obsoletes,
        DependencyKind::Recommends,
        DependencyKind::Suggests,
        DependencyKind::Supplements,
        DependencyKind::Enhances,
    ];

    fn index(self) -> usize {
        self as usize
    }

    /// The lowercase name of the dependency list
    pub fn as_str(self) -> &'static str {
        match self {
            DependencyKind::Provides => "provides",
            DependencyKind::Requires => "requires",
            DependencyKind::Conflicts => "conflicts",
            DependencyKind::Obsoletes => "obsoletes",
            DependencyKind::Recommends => "recommends",
            DependencyKind::Suggests => "suggests",
            DependencyKind::Supplements => "supplements",
            DependencyKind::Enhances => "enhances",
        }
    }
}

/// The dependency lists of a solvable, indexed by [`DependencyKind`].
#[derive(Clone, Debug, Default)]
pub struct Dependencies {
    lists: [Vec<RelationId>; 8],
}

impl Dependencies {
    /// Returns the relations of the given kind in insertion order.
    pub fn get(&self, kind: DependencyKind) -> &[RelationId] {
        &self.lists[kind.index()]
    }

    pub(crate) fn push(&mut self, kind: DependencyKind, relation: RelationId) {
        let list = &mut self.lists[kind.index()];
        if !list.contains(&relation) {
            list.push(relation);
        }
    }
}

/// A dependency string that failed to parse and was dropped when it was added
/// to a solvable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DroppedDependency {
    /// The list the dependency was meant for
    pub kind: DependencyKind,
    /// The text as it was supplied
    pub text: String,
    /// Why it was rejected
    pub error: ParseError,
}

/// A single candidate of a package together with everything the solver needs
/// to know about it.
#[derive(Clone, Debug)]
pub struct Solvable {
    pub(crate) name: StringId,
    pub(crate) evr: StringId,
    pub(crate) arch: StringId,
    pub(crate) vendor: Option<StringId>,
    pub(crate) kind: SolvableKind,
    pub(crate) repo: RepoId,
    pub(crate) dependencies: Dependencies,
    pub(crate) dropped: Vec<DroppedDependency>,
}

impl Solvable {
    /// The interned name
    pub fn name(&self) -> StringId {
        self.name
    }

    /// The interned `[epoch:]version[-release]` string
    pub fn evr(&self) -> StringId {
        self.evr
    }

    /// The interned architecture
    pub fn arch(&self) -> StringId {
        self.arch
    }

    /// The interned vendor, if one was set
    pub fn vendor(&self) -> Option<StringId> {
        self.vendor
    }

    /// The kind derived from the name prefix
    pub fn kind(&self) -> SolvableKind {
        self.kind
    }

    /// The repository this solvable belongs to
    pub fn repo(&self) -> RepoId {
        self.repo
    }

    /// The dependency lists
    pub fn dependencies(&self) -> &Dependencies {
        &self.dependencies
    }

    /// Dependency strings that were rejected while loading this solvable.
    pub fn dropped_dependencies(&self) -> &[DroppedDependency] {
        &self.dropped
    }
}

/// A reference to a solvable that carries the pool it belongs to. The
/// lifetime ties the handle to the pool, so a handle can never outlive the
/// data it points into.
#[derive(Copy, Clone)]
pub struct SolvableHandle<'pool> {
    pool: &'pool Pool,
    id: SolvableId,
}

impl<'pool> SolvableHandle<'pool> {
    pub(crate) fn new(pool: &'pool Pool, id: SolvableId) -> Self {
        Self { pool, id }
    }

    /// The id of the solvable in its pool
    pub fn id(&self) -> SolvableId {
        self.id
    }

    /// The pool this handle points into
    pub fn pool(&self) -> &'pool Pool {
        self.pool
    }

    /// The solvable record
    pub fn solvable(&self) -> &'pool Solvable {
        self.pool.resolve_solvable(self.id)
    }

    /// The name, including the kind prefix
    pub fn name(&self) -> &'pool str {
        self.pool.resolve_string(self.solvable().name)
    }

    /// The version string
    pub fn evr(&self) -> &'pool str {
        self.pool.resolve_string(self.solvable().evr)
    }

    /// The parsed version
    pub fn parsed_evr(&self) -> Evr<'pool> {
        self.pool.parsed_evr(self.id)
    }

    /// The architecture
    pub fn arch(&self) -> &'pool str {
        self.pool.resolve_string(self.solvable().arch)
    }

    /// The vendor, if any
    pub fn vendor(&self) -> Option<&'pool str> {
        self.solvable()
            .vendor
            .map(|vendor| self.pool.resolve_string(vendor))
    }

    /// The kind of the solvable
    pub fn kind(&self) -> SolvableKind {
        self.solvable().kind
    }

    /// The repository the solvable belongs to
    pub fn repo(&self) -> &'pool Repo {
        self.pool.resolve_repo(self.solvable().repo)
    }

    /// Returns true if the solvable is part of the installed repository.
    pub fn is_installed(&self) -> bool {
        self.pool.is_installed(self.id)
    }

    /// Renders the relations of the given kind.
    pub fn dependencies(&self, kind: DependencyKind) -> impl Iterator<Item = String> + 'pool {
        let pool = self.pool;
        self.solvable()
            .dependencies
            .get(kind)
            .iter()
            .map(move |&relation| pool.display_relation(relation).to_string())
    }
}

impl PartialEq for SolvableHandle<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.pool, other.pool) && self.id == other.id
    }
}

impl Eq for SolvableHandle<'_> {}

impl Display for SolvableHandle<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.pool.display_solvable(self.id))
    }
}

impl Debug for SolvableHandle<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.pool.display_solvable(self.id), self.id)
    }
}
