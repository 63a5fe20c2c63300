use crate::SolvableId;

/// A named group of solvables sharing a priority. One repository may be
/// marked as the installed set of the system, see
/// [`crate::Pool::set_installed`].
#[derive(Clone, Debug)]
pub struct Repo {
    pub(crate) name: String,
    pub(crate) priority: i32,
    pub(crate) subpriority: i32,
    pub(crate) solvables: Vec<SolvableId>,
    pub(crate) freed: bool,
}

impl Repo {
    pub(crate) fn new(name: &str, priority: i32) -> Self {
        Self {
            name: name.to_owned(),
            priority,
            subpriority: 0,
            solvables: Vec::new(),
            freed: false,
        }
    }

    /// The name of the repository
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Candidates from repositories with a higher priority are preferred.
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Breaks ties between candidates that are otherwise ranked equal.
    pub fn subpriority(&self) -> i32 {
        self.subpriority
    }

    /// Sets the priority of the repository.
    pub fn set_priority(&mut self, priority: i32) {
        self.priority = priority;
    }

    /// Sets the subpriority of the repository.
    pub fn set_subpriority(&mut self, subpriority: i32) {
        self.subpriority = subpriority;
    }

    /// The solvables in this repository, in the order they were added
    pub fn solvables(&self) -> &[SolvableId] {
        &self.solvables
    }

    /// Returns true once the repository was removed from its pool
    pub fn is_freed(&self) -> bool {
        self.freed
    }
}
