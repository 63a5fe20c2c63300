//! Provides [`PoolSnapshot`], an owned copy of the repositories and solvables
//! of a [`Pool`]. Snapshots are useful to capture a problem that needs to be
//! reproduced later, for instance in a test or a bug report.
//!
//! The [`PoolSnapshot`] can be serialized to disk if the `serde` feature is
//! enabled.
//!
//! Freed repositories are not part of a snapshot, so solvable ids in a pool
//! restored from a snapshot can differ from the ones in the original pool.

use crate::{DependencyKind, Pool, PoolError, RelationOp, RepoId};

/// A relation in a [`PoolSnapshot`].
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RelationSnapshot {
    /// The name of the capability
    pub name: String,

    /// The comparison operator and version, if any
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub constraint: Option<(RelationOp, String)>,
}

/// A single solvable in a [`PoolSnapshot`].
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SolvableSnapshot {
    /// The name of the solvable
    pub name: String,

    /// The epoch-version-release string
    pub evr: String,

    /// The architecture
    pub arch: String,

    /// The vendor, if known
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub vendor: Option<String>,

    /// The dependency lists that are not empty. Provides include the implicit
    /// `name = evr` provide.
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Vec::is_empty")
    )]
    pub dependencies: Vec<(DependencyKind, Vec<RelationSnapshot>)>,
}

/// A single repository in a [`PoolSnapshot`].
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RepoSnapshot {
    /// The name of the repository
    pub name: String,

    /// The priority of the repository, higher wins
    pub priority: i32,

    /// Breaks ties between repositories with the same priority
    #[cfg_attr(feature = "serde", serde(default))]
    pub subpriority: i32,

    /// The solvables of the repository in package-table order
    pub solvables: Vec<SolvableSnapshot>,
}

/// An owned copy of everything a [`Pool`] knows about its repositories.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PoolSnapshot {
    /// All the live repositories
    pub repos: Vec<RepoSnapshot>,

    /// The index in `repos` of the repository that holds the installed
    /// solvables
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub installed: Option<usize>,
}

impl PoolSnapshot {
    /// Captures the live repositories of `pool`.
    pub fn from_pool(pool: &Pool) -> Self {
        let mut snapshot = PoolSnapshot::default();

        for (repo_id, repo) in pool.repositories() {
            if pool.installed_repo() == Some(repo_id) {
                snapshot.installed = Some(snapshot.repos.len());
            }

            let solvables = repo
                .solvables()
                .iter()
                .map(|&id| {
                    let solvable = pool.resolve_solvable(id);
                    let dependencies = DependencyKind::ALL
                        .iter()
                        .map(|&kind| {
                            let relations = solvable
                                .dependencies()
                                .get(kind)
                                .iter()
                                .map(|&relation| {
                                    let relation = pool.resolve_relation(relation);
                                    RelationSnapshot {
                                        name: pool.resolve_string(relation.name).to_owned(),
                                        constraint: relation.constraint.map(|(op, evr)| {
                                            (op, pool.resolve_string(evr).to_owned())
                                        }),
                                    }
                                })
                                .collect::<Vec<_>>();
                            (kind, relations)
                        })
                        .filter(|(_, relations)| !relations.is_empty())
                        .collect();

                    SolvableSnapshot {
                        name: pool.resolve_string(solvable.name()).to_owned(),
                        evr: pool.resolve_string(solvable.evr()).to_owned(),
                        arch: pool.resolve_string(solvable.arch()).to_owned(),
                        vendor: solvable
                            .vendor()
                            .map(|vendor| pool.resolve_string(vendor).to_owned()),
                        dependencies,
                    }
                })
                .collect();

            snapshot.repos.push(RepoSnapshot {
                name: repo.name().to_owned(),
                priority: repo.priority(),
                subpriority: repo.subpriority(),
                solvables,
            });
        }

        snapshot
    }

    /// Builds a new pool with the contents of the snapshot.
    pub fn to_pool(&self) -> Result<Pool, PoolError> {
        let mut pool = Pool::new();
        let mut repo_ids: Vec<RepoId> = Vec::with_capacity(self.repos.len());

        for repo in &self.repos {
            let repo_id = pool.add_repository(&repo.name, repo.priority);
            pool.repo_mut(repo_id).set_subpriority(repo.subpriority);
            repo_ids.push(repo_id);

            for solvable in &repo.solvables {
                let id = pool.add_solvable(repo_id, &solvable.name, &solvable.evr, &solvable.arch)?;
                if let Some(vendor) = &solvable.vendor {
                    pool.set_vendor(id, vendor);
                }
                for (kind, relations) in &solvable.dependencies {
                    for relation in relations {
                        let relation = pool.intern_relation(
                            &relation.name,
                            relation
                                .constraint
                                .as_ref()
                                .map(|(op, evr)| (*op, evr.as_str())),
                        )?;
                        pool.add_dependency(id, *kind, relation);
                    }
                }
            }
        }

        pool.set_installed(self.installed.and_then(|index| repo_ids.get(index).copied()));
        Ok(pool)
    }
}
