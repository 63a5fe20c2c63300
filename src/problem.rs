//! Types to examine why a set of jobs could not be solved.

use std::fmt::{Display, Formatter};

use ahash::HashMap;
use itertools::Itertools;
use petgraph::{
    graph::{DiGraph, NodeIndex},
    visit::EdgeRef,
    Direction,
};
use thiserror::Error;

use crate::{Job, Pool, RelationId, SolvableId};

/// One of the rules that together make a [`Problem`]. Rules refer to pool
/// values and jobs, never to solver internals, so problems from different
/// solver runs can be compared.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProblemRule {
    /// The selector of an install or update job matches nothing
    JobNothingMatches(Job),
    /// One of the candidates of an install job must be installed
    Job(Job),
    /// An update job requires an installed solvable to be kept or updated
    UpdateJob {
        /// The update job
        job: Job,
        /// The installed solvable it targets
        installed: SolvableId,
    },
    /// An erase job removes an installed solvable
    Erase {
        /// The erase job
        job: Job,
        /// The solvable that must be removed
        solvable: SolvableId,
    },
    /// A lock job keeps a solvable in its current state
    Lock {
        /// The lock job
        job: Job,
        /// The solvable that may not change
        solvable: SolvableId,
    },
    /// Nothing provides a requirement of a solvable
    NothingProvides {
        /// The solvable with the requirement
        solvable: SolvableId,
        /// The requirement
        relation: RelationId,
    },
    /// A solvable requires one of the providers of a relation
    Requires {
        /// The solvable with the requirement
        solvable: SolvableId,
        /// The requirement
        relation: RelationId,
    },
    /// A solvable conflicts with another one
    Conflicts {
        /// The solvable carrying the conflict
        solvable: SolvableId,
        /// The solvable providing the conflicting capability
        other: SolvableId,
        /// The conflict relation
        relation: RelationId,
    },
    /// A solvable obsoletes another one
    Obsoletes {
        /// The solvable carrying the obsoletes
        solvable: SolvableId,
        /// The solvable that is obsoleted
        other: SolvableId,
        /// The obsoletes relation
        relation: RelationId,
    },
    /// Two solvables with the same name cannot be installed together
    SameName {
        /// One of the solvables
        solvable: SolvableId,
        /// The other one
        other: SolvableId,
    },
    /// An installed solvable may only be kept or updated
    Update {
        /// The installed solvable
        installed: SolvableId,
    },
}

impl ProblemRule {
    /// The job this rule was created for, if any
    pub fn job(&self) -> Option<&Job> {
        match self {
            ProblemRule::JobNothingMatches(job)
            | ProblemRule::Job(job)
            | ProblemRule::UpdateJob { job, .. }
            | ProblemRule::Erase { job, .. }
            | ProblemRule::Lock { job, .. } => Some(job),
            _ => None,
        }
    }

    /// Returns an object that describes the rule in a human readable form.
    pub fn display<'a>(&'a self, pool: &'a Pool) -> DisplayProblemRule<'a> {
        DisplayProblemRule { rule: self, pool }
    }
}

/// Describes a [`ProblemRule`]
pub struct DisplayProblemRule<'a> {
    rule: &'a ProblemRule,
    pool: &'a Pool,
}

impl Display for DisplayProblemRule<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let pool = self.pool;
        let solvable = |id: SolvableId| pool.display_solvable(id);
        let relation = |id: RelationId| pool.display_relation(id);

        match *self.rule {
            ProblemRule::JobNothingMatches(ref job) => {
                write!(f, "nothing matches job {}", job.display(pool))
            }
            ProblemRule::Job(ref job) => write!(f, "job {}", job.display(pool)),
            ProblemRule::UpdateJob { ref job, installed } => write!(
                f,
                "job {} keeps or updates {}",
                job.display(pool),
                solvable(installed)
            ),
            ProblemRule::Erase { ref job, solvable: id } => {
                write!(f, "job {} removes {}", job.display(pool), solvable(id))
            }
            ProblemRule::Lock { ref job, solvable: id } => {
                if pool.is_installed(id) {
                    write!(f, "{} is locked by job {}", solvable(id), job.display(pool))
                } else {
                    write!(
                        f,
                        "{} cannot be installed because of job {}",
                        solvable(id),
                        job.display(pool)
                    )
                }
            }
            ProblemRule::NothingProvides {
                solvable: id,
                relation: rel,
            } => write!(f, "nothing provides {} needed by {}", relation(rel), solvable(id)),
            ProblemRule::Requires {
                solvable: id,
                relation: rel,
            } => write!(
                f,
                "{} requires {}, provided by {}",
                solvable(id),
                relation(rel),
                pool.what_provides(rel)
                    .into_iter()
                    .map(|p| solvable(p).to_string())
                    .join(", ")
            ),
            ProblemRule::Conflicts {
                solvable: id,
                other,
                relation: rel,
            } => write!(
                f,
                "{} conflicts with {} provided by {}",
                solvable(id),
                relation(rel),
                solvable(other)
            ),
            ProblemRule::Obsoletes {
                solvable: id,
                other,
                relation: rel,
            } => write!(
                f,
                "{} obsoletes {} provided by {}",
                solvable(id),
                relation(rel),
                solvable(other)
            ),
            ProblemRule::SameName { solvable: a, other } => {
                write!(f, "cannot install both {} and {}", solvable(a), solvable(other))
            }
            ProblemRule::Update { installed } => write!(
                f,
                "installed {} may only be kept or updated",
                solvable(installed)
            ),
        }
    }
}

/// A change to the jobs or the policy that makes a [`Problem`] go away.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Solution {
    /// Remove an install, erase or update job
    DropJob(Job),
    /// Remove a lock job
    Unlock(Job),
    /// Allow an installed solvable to be replaced by an older version, see
    /// [`crate::Policy::allow_downgrade`]
    AllowDowngrade(SolvableId),
    /// Ignore the obsoletes of a solvable, see
    /// [`crate::Policy::with_ignored_obsoletes`]
    IgnoreObsoletes(SolvableId),
    /// Allow an installed solvable to be removed, see
    /// [`crate::Policy::with_uninstallable`]
    AllowUninstall(SolvableId),
}

impl Solution {
    /// Lower values change less about what the user asked for.
    pub(crate) fn relaxation_order(&self) -> u8 {
        match self {
            Solution::DropJob(_) => 0,
            Solution::Unlock(_) | Solution::AllowUninstall(_) => 1,
            Solution::AllowDowngrade(_) | Solution::IgnoreObsoletes(_) => 2,
        }
    }

    /// Returns an object that describes the solution in a human readable form.
    pub fn display<'a>(&'a self, pool: &'a Pool) -> DisplaySolution<'a> {
        DisplaySolution {
            solution: self,
            pool,
        }
    }
}

/// Describes a [`Solution`]
pub struct DisplaySolution<'a> {
    solution: &'a Solution,
    pool: &'a Pool,
}

impl Display for DisplaySolution<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let pool = self.pool;
        match self.solution {
            Solution::DropJob(job) => write!(f, "do not ask to {}", job.display(pool)),
            Solution::Unlock(job) => write!(f, "remove {}", job.display(pool)),
            Solution::AllowDowngrade(id) => {
                write!(f, "allow downgrading {}", pool.display_solvable(*id))
            }
            Solution::IgnoreObsoletes(id) => write!(
                f,
                "ignore the obsoletes of {}",
                pool.display_solvable(*id)
            ),
            Solution::AllowUninstall(id) => {
                write!(f, "allow removing {}", pool.display_solvable(*id))
            }
        }
    }
}

/// A minimal set of rules that cannot all be satisfied together, and the
/// changes that would resolve it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Problem {
    pub(crate) rules: Vec<ProblemRule>,
    pub(crate) solutions: Vec<Solution>,
}

impl Problem {
    pub(crate) fn new(mut rules: Vec<ProblemRule>) -> Self {
        rules.sort();
        rules.dedup();
        Self {
            rules,
            solutions: Vec::new(),
        }
    }

    /// The rules that cannot be satisfied together
    pub fn rules(&self) -> &[ProblemRule] {
        &self.rules
    }

    /// Changes that each make this problem disappear
    pub fn solutions(&self) -> &[Solution] {
        &self.solutions
    }

    /// The jobs involved in this problem
    pub fn jobs(&self) -> impl Iterator<Item = &Job> + '_ {
        self.rules.iter().filter_map(ProblemRule::job).dedup()
    }

    /// Returns true if both problems consist of the same rules
    pub(crate) fn same_rules(&self, other: &Problem) -> bool {
        self.rules == other.rules
    }

    /// Returns an object that describes the problem in a human readable form.
    pub fn display<'a>(&'a self, pool: &'a Pool) -> DisplayProblem<'a> {
        DisplayProblem {
            problem: self,
            pool,
            indent: "",
        }
    }

    /// Generates a graph representation of the problem
    pub fn graph(&self, pool: &Pool) -> ProblemGraph {
        let mut graph = DiGraph::<ProblemNode, ProblemEdge>::default();
        let mut nodes: HashMap<ProblemNode, NodeIndex> = HashMap::default();
        let mut node = |graph: &mut DiGraph<ProblemNode, ProblemEdge>, weight: ProblemNode| {
            *nodes.entry(weight).or_insert_with(|| graph.add_node(weight))
        };

        for rule in &self.rules {
            match *rule {
                ProblemRule::JobNothingMatches(job) => {
                    node(&mut graph, ProblemNode::Job(job));
                }
                ProblemRule::Job(job) => {
                    let job_node = node(&mut graph, ProblemNode::Job(job));
                    for candidate in job.select(pool) {
                        let target = node(&mut graph, ProblemNode::Solvable(candidate));
                        graph.add_edge(job_node, target, ProblemEdge::Job);
                    }
                }
                ProblemRule::UpdateJob { job, installed } => {
                    let job_node = node(&mut graph, ProblemNode::Job(job));
                    let target = node(&mut graph, ProblemNode::Solvable(installed));
                    graph.add_edge(job_node, target, ProblemEdge::Job);
                }
                ProblemRule::Erase { job, solvable } => {
                    let job_node = node(&mut graph, ProblemNode::Job(job));
                    let target = node(&mut graph, ProblemNode::Solvable(solvable));
                    graph.add_edge(job_node, target, ProblemEdge::Conflict(ConflictCause::Erased));
                }
                ProblemRule::Lock { job, solvable } => {
                    let job_node = node(&mut graph, ProblemNode::Job(job));
                    let target = node(&mut graph, ProblemNode::Solvable(solvable));
                    graph.add_edge(job_node, target, ProblemEdge::Conflict(ConflictCause::Locked));
                }
                ProblemRule::NothingProvides { solvable, relation } => {
                    let source = node(&mut graph, ProblemNode::Solvable(solvable));
                    let target = node(&mut graph, ProblemNode::Missing(relation));
                    graph.add_edge(source, target, ProblemEdge::Requires(relation));
                }
                ProblemRule::Requires { solvable, relation } => {
                    let source = node(&mut graph, ProblemNode::Solvable(solvable));
                    for provider in pool.what_provides(relation) {
                        let target = node(&mut graph, ProblemNode::Solvable(provider));
                        graph.add_edge(source, target, ProblemEdge::Requires(relation));
                    }
                }
                ProblemRule::Conflicts {
                    solvable,
                    other,
                    relation,
                } => {
                    let source = node(&mut graph, ProblemNode::Solvable(solvable));
                    let target = node(&mut graph, ProblemNode::Solvable(other));
                    graph.add_edge(
                        source,
                        target,
                        ProblemEdge::Conflict(ConflictCause::Conflicts(relation)),
                    );
                }
                ProblemRule::Obsoletes {
                    solvable,
                    other,
                    relation,
                } => {
                    let source = node(&mut graph, ProblemNode::Solvable(solvable));
                    let target = node(&mut graph, ProblemNode::Solvable(other));
                    graph.add_edge(
                        source,
                        target,
                        ProblemEdge::Conflict(ConflictCause::Obsoletes(relation)),
                    );
                }
                ProblemRule::SameName { solvable, other } => {
                    let source = node(&mut graph, ProblemNode::Solvable(solvable));
                    let target = node(&mut graph, ProblemNode::Solvable(other));
                    graph.add_edge(source, target, ProblemEdge::Conflict(ConflictCause::SameName));
                }
                ProblemRule::Update { installed } => {
                    node(&mut graph, ProblemNode::Solvable(installed));
                }
            }
        }

        ProblemGraph { graph }
    }
}

/// A node in the graph representation of a [`Problem`]
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ProblemNode {
    /// Node corresponding to a job
    Job(Job),
    /// Node corresponding to a solvable
    Solvable(SolvableId),
    /// Node representing a requirement nothing provides
    Missing(RelationId),
}

/// An edge in the graph representation of a [`Problem`]
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ProblemEdge {
    /// The target is a candidate of the source job
    Job,
    /// The target provides a requirement of the source
    Requires(RelationId),
    /// The source and the target cannot both be installed, or the source job
    /// forbids the target
    Conflict(ConflictCause),
}

/// Conflict causes
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ConflictCause {
    /// The source conflicts with a capability of the target
    Conflicts(RelationId),
    /// The source obsoletes the target
    Obsoletes(RelationId),
    /// Both have the same name
    SameName,
    /// An erase job removes the target
    Erased,
    /// A lock job fixes the target
    Locked,
}

/// Graph representation of a [`Problem`]
pub struct ProblemGraph {
    graph: DiGraph<ProblemNode, ProblemEdge>,
}

impl ProblemGraph {
    /// The underlying graph
    pub fn graph(&self) -> &DiGraph<ProblemNode, ProblemEdge> {
        &self.graph
    }

    /// Writes a graphviz graph that represents this instance to the specified
    /// output.
    pub fn graphviz(&self, f: &mut impl std::io::Write, pool: &Pool) -> std::io::Result<()> {
        let graph = &self.graph;
        let label = |node: &ProblemNode| match *node {
            ProblemNode::Job(job) => job.display(pool).to_string(),
            ProblemNode::Solvable(id) => pool.display_solvable(id).to_string(),
            ProblemNode::Missing(relation) => format!("unresolved {}", pool.display_relation(relation)),
        };

        writeln!(f, "digraph {{")?;
        for nx in graph.node_indices() {
            let node = &graph[nx];
            let shape = match node {
                ProblemNode::Job(_) => "box",
                ProblemNode::Solvable(_) => "ellipse",
                ProblemNode::Missing(_) => "octagon",
            };
            writeln!(f, "  \"{}\"[shape={shape}];", label(node))?;

            for edge in graph.edges_directed(nx, Direction::Outgoing) {
                let target = label(&graph[edge.target()]);
                let (color, text) = match edge.weight() {
                    ProblemEdge::Job => ("black", String::new()),
                    ProblemEdge::Requires(relation) => {
                        ("black", pool.display_relation(*relation).to_string())
                    }
                    ProblemEdge::Conflict(ConflictCause::Conflicts(relation)) => {
                        ("red", format!("conflicts {}", pool.display_relation(*relation)))
                    }
                    ProblemEdge::Conflict(ConflictCause::Obsoletes(relation)) => {
                        ("red", format!("obsoletes {}", pool.display_relation(*relation)))
                    }
                    ProblemEdge::Conflict(ConflictCause::SameName) => ("red", "same name".to_owned()),
                    ProblemEdge::Conflict(ConflictCause::Erased) => ("red", "erase".to_owned()),
                    ProblemEdge::Conflict(ConflictCause::Locked) => ("red", "lock".to_owned()),
                };
                writeln!(
                    f,
                    "  \"{}\" -> \"{}\"[color={color}, label=\"{text}\"];",
                    label(node),
                    target
                )?;
            }
        }
        writeln!(f, "}}")
    }
}

/// Describes a [`Problem`] with one rule per line
pub struct DisplayProblem<'a> {
    problem: &'a Problem,
    pool: &'a Pool,
    indent: &'a str,
}

impl Display for DisplayProblem<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let indent = self.indent;
        for rule in &self.problem.rules {
            writeln!(f, "{indent}- {}", rule.display(self.pool))?;
        }
        if !self.problem.solutions.is_empty() {
            writeln!(f, "{indent}Solutions:")?;
            for (index, solution) in self.problem.solutions.iter().enumerate() {
                writeln!(f, "{indent}  {}. {}", index + 1, solution.display(self.pool))?;
            }
        }
        Ok(())
    }
}

/// Returned by [`crate::Solver::solve`] when the jobs cannot be satisfied.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("the jobs cannot be satisfied, {} problem(s) found", .problems.len())]
pub struct Unsolvable {
    pub(crate) problems: Vec<Problem>,
}

impl Unsolvable {
    /// Every independent problem that was found
    pub fn problems(&self) -> &[Problem] {
        &self.problems
    }

    /// Returns an object that explains every problem and its solutions.
    pub fn display_user_friendly<'a>(&'a self, pool: &'a Pool) -> DisplayUnsolvable<'a> {
        DisplayUnsolvable {
            unsolvable: self,
            pool,
        }
    }
}

/// Explains an [`Unsolvable`]
pub struct DisplayUnsolvable<'a> {
    unsolvable: &'a Unsolvable,
    pool: &'a Pool,
}

impl Display for DisplayUnsolvable<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (index, problem) in self.unsolvable.problems.iter().enumerate() {
            writeln!(f, "Problem {}:", index + 1)?;
            write!(
                f,
                "{}",
                DisplayProblem {
                    problem,
                    pool: self.pool,
                    indent: "  ",
                }
            )?;
        }
        Ok(())
    }
}
