use std::fmt::{Display, Formatter};

use crate::{
    relation::parse_relation, ParseError, Pool, RelationId, SolvableId, StringId,
};

/// What a [`Job`] asks the solver to do with the solvables it selects.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Ord, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum JobAction {
    /// At least one of the selected solvables must be installed.
    Install,
    /// None of the selected installed solvables may remain installed.
    Erase,
    /// The selected installed solvables must be kept or replaced by a newer
    /// candidate, and the solver prefers the newest.
    Update,
    /// The selected solvables keep their current state: installed ones stay,
    /// others are never installed.
    Lock,
}

impl JobAction {
    fn as_str(self) -> &'static str {
        match self {
            JobAction::Install => "install",
            JobAction::Erase => "erase",
            JobAction::Update => "update",
            JobAction::Lock => "lock",
        }
    }
}

/// Whether a selector by name only matches solvables carrying that name, or
/// every solvable providing it.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Ord, PartialOrd, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MatchScope {
    /// Match the names of solvables
    #[default]
    Names,
    /// Match everything the solvables provide
    Provides,
}

/// Selects the solvables a [`Job`] applies to.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Ord, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Selector {
    /// Every version of a name
    Name(StringId),
    /// The versions matching a relation
    Relation(RelationId),
    /// Exactly one solvable
    Solvable(SolvableId),
}

impl Selector {
    /// Parses `name` or `name op evr` into a selector.
    pub fn parse(pool: &mut Pool, text: &str) -> Result<Self, ParseError> {
        let parsed = parse_relation(text)?;
        match parsed.constraint {
            None => Ok(Selector::Name(pool.intern_string(parsed.name))),
            Some(constraint) => Ok(Selector::Relation(
                pool.intern_relation(parsed.name, Some(constraint))?,
            )),
        }
    }
}

impl From<StringId> for Selector {
    fn from(value: StringId) -> Self {
        Selector::Name(value)
    }
}

impl From<RelationId> for Selector {
    fn from(value: RelationId) -> Self {
        Selector::Relation(value)
    }
}

impl From<SolvableId> for Selector {
    fn from(value: SolvableId) -> Self {
        Selector::Solvable(value)
    }
}

/// A single request to the solver. Jobs are solved together, see
/// [`crate::Solver::solve`].
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Ord, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Job {
    /// What to do
    pub action: JobAction,
    /// What to do it with
    pub selector: Selector,
    /// How names in the selector are matched
    pub scope: MatchScope,
}

impl Job {
    /// Creates a job matching by name.
    pub fn new(action: JobAction, selector: impl Into<Selector>) -> Self {
        Self {
            action,
            selector: selector.into(),
            scope: MatchScope::Names,
        }
    }

    /// Install one of the selected solvables
    pub fn install(selector: impl Into<Selector>) -> Self {
        Self::new(JobAction::Install, selector)
    }

    /// Remove the selected solvables
    pub fn erase(selector: impl Into<Selector>) -> Self {
        Self::new(JobAction::Erase, selector)
    }

    /// Update the selected installed solvables
    pub fn update(selector: impl Into<Selector>) -> Self {
        Self::new(JobAction::Update, selector)
    }

    /// Keep the selected solvables as they are
    pub fn lock(selector: impl Into<Selector>) -> Self {
        Self::new(JobAction::Lock, selector)
    }

    /// Changes how names in the selector are matched.
    pub fn with_scope(mut self, scope: MatchScope) -> Self {
        self.scope = scope;
        self
    }

    /// Returns every live solvable the selector matches, in package-table
    /// order.
    pub fn select(&self, pool: &Pool) -> Vec<SolvableId> {
        match (self.selector, self.scope) {
            (Selector::Name(name), MatchScope::Names) => pool.solvables_named(name),
            (Selector::Name(name), MatchScope::Provides) => pool.providers_of_name(name),
            (Selector::Relation(relation), MatchScope::Names) => pool.what_matches_name(relation),
            (Selector::Relation(relation), MatchScope::Provides) => pool.what_provides(relation),
            (Selector::Solvable(solvable), _) => {
                if pool.is_alive(solvable) {
                    vec![solvable]
                } else {
                    Vec::new()
                }
            }
        }
    }

    /// Returns an object that renders the job in a human readable form.
    pub fn display<'a>(&'a self, pool: &'a Pool) -> JobDisplay<'a> {
        JobDisplay { job: self, pool }
    }
}

/// Displays a job as `action selector`
pub struct JobDisplay<'a> {
    job: &'a Job,
    pool: &'a Pool,
}

impl Display for JobDisplay<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ", self.job.action.as_str())?;
        match self.job.selector {
            Selector::Name(name) => write!(f, "{}", self.pool.resolve_string(name)),
            Selector::Relation(relation) => write!(f, "{}", self.pool.display_relation(relation)),
            Selector::Solvable(solvable) => write!(f, "{}", self.pool.display_solvable(solvable)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DependencyKind;

    #[test]
    fn test_select() {
        let mut pool = Pool::new();
        let repo = pool.add_repository("repo", 0);
        let a1 = pool.add_solvable(repo, "a", "1.0", "noarch").unwrap();
        let a2 = pool.add_solvable(repo, "a", "2.0", "noarch").unwrap();
        let b = pool.add_solvable(repo, "b", "1.0", "noarch").unwrap();
        pool.add_dependency_str(b, DependencyKind::Provides, "a = 3.0")
            .unwrap();

        let by_name = Job::install(Selector::parse(&mut pool, "a").unwrap());
        assert_eq!(by_name.select(&pool), vec![a1, a2]);
        assert_eq!(
            by_name.with_scope(MatchScope::Provides).select(&pool),
            vec![a1, a2, b]
        );

        let versioned = Job::install(Selector::parse(&mut pool, "a >= 2").unwrap());
        assert_eq!(versioned.select(&pool), vec![a2]);
        assert_eq!(
            versioned.with_scope(MatchScope::Provides).select(&pool),
            vec![a2, b]
        );

        assert_eq!(Job::lock(a1).select(&pool), vec![a1]);
        assert_eq!(versioned.display(&pool).to_string(), "install a >= 2");
        assert_eq!(Job::erase(b).display(&pool).to_string(), "erase b-1.0.noarch");
    }
}
