//! Resolves package dependencies for repositories of rpm-style packages with
//! a SAT solver based on the CDCL algorithm (conflict-driven clause learning)
//!
//! The CDCL algorithm is masterly explained in [An Extensible
//! SAT-solver](http://minisat.se/downloads/MiniSat.pdf). Regarding the data structures used, we
//! mostly follow the approach taken by [libsolv](https://github.com/openSUSE/libsolv). The code of
//! libsolv is, however, very low level C, so if you are looking for an
//! introduction to CDCL, you are encouraged to look at the paper instead or to
//! keep reading through this codebase and its comments.
//!
//! A [`Pool`] holds the repositories and their solvables. A list of [`Job`]s
//! is handed to a [`Solver`] which either returns a [`Transaction`] with the
//! changes to the installed system, or an [`problem::Unsolvable`] that
//! explains why the jobs cannot be satisfied together.

#![deny(missing_docs)]

mod error;
pub mod evr;
pub(crate) mod internal;
mod job;
mod policy;
mod pool;
pub mod problem;
mod relation;
mod repo;
pub mod snapshot;
mod solvable;
mod solver;
pub mod transaction;

pub use error::{LookupError, ParseError, PoolError};
pub use internal::id::{RelationId, RepoId, SolvableId, StringId};
pub use job::{Job, JobAction, JobDisplay, MatchScope, Selector};
pub use policy::Policy;
pub use pool::{Pool, RelationDisplay, SolvableDisplay};
pub use relation::{Relation, RelationOp};
pub use repo::Repo;
pub use solvable::{
    Dependencies, DependencyKind, DroppedDependency, Solvable, SolvableHandle, SolvableKind,
};
pub use solver::Solver;
pub use transaction::Transaction;
