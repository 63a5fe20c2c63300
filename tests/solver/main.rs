mod repo_box;

use std::io::{stderr, Write};

use insta::assert_snapshot;
use itertools::Itertools;
use proptest::prelude::*;
use repo_box::{RepoBox, SYSTEM};
use satsolv::{
    problem::Unsolvable, snapshot::PoolSnapshot, DependencyKind, Job, LookupError, ParseError,
    Policy, Pool, Selector, SolvableKind, Solver,
};
use tracing_test::traced_test;

/// Unsat so that we can view the problems
fn solve_unsat(repo_box: &mut RepoBox, jobs: &[&str], policy: Policy) -> Unsolvable {
    let jobs = repo_box.jobs(jobs);
    let mut solver = Solver::new(&repo_box.pool).with_policy(policy);
    match solver.solve(&jobs) {
        Ok(transaction) => panic!("expected unsat, but a solution was found:\n{transaction}"),
        Err(unsolvable) => {
            // Write the problem graphs to stderr
            let mut output = stderr();
            writeln!(output, "UNSOLVABLE:").unwrap();
            for problem in unsolvable.problems() {
                problem
                    .graph(&repo_box.pool)
                    .graphviz(&mut output, &repo_box.pool)
                    .unwrap();
            }
            writeln!(output, "\n").unwrap();
            unsolvable
        }
    }
}

/// Test whether we can select the highest version of a package
#[test]
fn test_install_highest_version() {
    let mut repo_box = RepoBox::from_packages(&[
        ("repo", "a 1.0", vec![]),
        ("repo", "a 2.0", vec![]),
    ]);
    assert_snapshot!(repo_box.solve(&["install a"]), @"install a-2.0.noarch");
}

/// The epoch outweighs the version
#[test]
fn test_install_highest_epoch() {
    let mut repo_box = RepoBox::from_packages(&[
        ("repo", "a 1:1.0", vec![]),
        ("repo", "a 2.0", vec![]),
    ]);
    assert_snapshot!(repo_box.solve(&["install a"]), @"install a-1:1.0.noarch");
}

#[test]
fn test_install_with_versioned_requirement() {
    let mut repo_box = RepoBox::from_packages(&[
        ("repo", "a 1.0", vec!["requires b >= 2"]),
        ("repo", "b 1.0", vec![]),
        ("repo", "b 2.0", vec![]),
        ("repo", "b 3.0", vec![]),
    ]);
    assert_snapshot!(repo_box.solve(&["install a"]), @r###"
    install a-1.0.noarch
    install b-3.0.noarch
    "###);
}

/// Repository priority wins over the version
#[test]
fn test_repository_priority() {
    let mut repo_box = RepoBox::new();
    repo_box.set_priority("high", 10);
    repo_box.add_package("high", "a 1.0", &[]);
    repo_box.add_package("low", "a 2.0", &[]);
    assert_snapshot!(repo_box.solve(&["install a"]), @"install a-1.0.noarch");
}

#[test]
fn test_architecture_preference() {
    let mut repo_box = RepoBox::from_packages(&[
        ("repo", "a 1.0 x86_64", vec![]),
        ("repo", "a 1.0 i686", vec![]),
    ]);
    assert_snapshot!(repo_box.solve(&["install a"]), @"install a-1.0.x86_64");

    let policy = Policy::new().arch_preference(["i686", "x86_64"]);
    assert_snapshot!(repo_box.solve_with_policy(&["install a"], policy), @"install a-1.0.i686");
}

/// A provider recommended by the solvable that requires the capability is
/// preferred
#[test]
fn test_recommended_provider_is_preferred() {
    let mut repo_box = RepoBox::from_packages(&[
        ("repo", "x 1.0", vec!["requires feature", "recommends p2"]),
        ("repo", "p1 1.0", vec!["provides feature"]),
        ("repo", "p2 1.0", vec!["provides feature"]),
    ]);
    assert_snapshot!(repo_box.solve(&["install x"]), @r###"
    install x-1.0.noarch
    install p2-1.0.noarch
    "###);

    let policy = Policy::new().ignore_recommended(true);
    assert_snapshot!(repo_box.solve_with_policy(&["install x"], policy), @r###"
    install x-1.0.noarch
    install p1-1.0.noarch
    "###);
}

#[test]
fn test_suggestions() {
    let mut repo_box = RepoBox::from_packages(&[
        ("repo", "a 1.0", vec!["recommends b"]),
        ("repo", "b 1.0", vec![]),
        ("repo", "c 1.0", vec!["supplements a"]),
        ("repo", "d 1.0", vec![]),
    ]);
    let jobs = repo_box.jobs(&["install a"]);
    let mut solver = Solver::new(&repo_box.pool);
    let transaction = solver.solve(&jobs).unwrap();

    assert_eq!(
        transaction.installs(true).map(|s| s.to_string()).collect_vec(),
        vec!["a-1.0.noarch"]
    );
    assert_eq!(
        transaction
            .suggestions()
            .map(|s| s.name().to_owned())
            .collect_vec(),
        vec!["b", "c"]
    );
}

#[test]
fn test_update_job() {
    let mut repo_box = RepoBox::from_packages(&[
        (SYSTEM, "a 1.0", vec![]),
        ("repo", "a 2.0", vec![]),
    ]);
    assert_snapshot!(repo_box.solve(&["update a"]), @"update a-1.0.noarch -> a-2.0.noarch");
}

/// The newer version from the higher priority repository replaces the
/// installed one, even when a lower priority repository has an even newer one
#[test]
fn test_update_from_higher_priority_repository() {
    let mut repo_box = RepoBox::new();
    repo_box.set_priority("updates", 10);
    repo_box.add_package(SYSTEM, "a 1.0", &[]);
    repo_box.add_package("updates", "a 2.0", &[]);
    repo_box.add_package("other", "a 3.0", &[]);

    let policy = Policy::new().update_all(true);
    assert_snapshot!(repo_box.solve_with_policy(&[], policy), @"update a-1.0.noarch -> a-2.0.noarch");
    assert_snapshot!(repo_box.solve(&["update a"]), @"update a-1.0.noarch -> a-2.0.noarch");
}

/// An update job on a name that is not installed installs the best match
#[test]
fn test_update_job_without_installed() {
    let mut repo_box = RepoBox::from_packages(&[
        ("repo", "a 1.0", vec![]),
        ("repo", "a 2.0", vec![]),
    ]);
    assert_snapshot!(repo_box.solve(&["update a"]), @"install a-2.0.noarch");
}

/// An update job that matches nothing is reported instead of ignored
#[test]
#[traced_test]
fn test_update_job_nothing_matches() {
    let mut repo_box = RepoBox::from_packages(&[("repo", "a 1.0", vec![])]);
    let unsolvable = solve_unsat(&mut repo_box, &["update zzz"], Policy::default());
    assert_snapshot!(unsolvable.display_user_friendly(&repo_box.pool), @r###"
    Problem 1:
      - nothing matches job update zzz
      Solutions:
        1. do not ask to update zzz
    "###);
}

/// Solving nothing against the installed system changes nothing
#[test]
fn test_installed_system_is_kept() {
    let mut repo_box = RepoBox::from_packages(&[
        (SYSTEM, "a 1.0", vec![]),
        (SYSTEM, "b 1.0", vec!["requires a"]),
        ("repo", "a 2.0", vec![]),
        ("repo", "b 2.0", vec!["requires a >= 2"]),
    ]);

    let mut solver = Solver::new(&repo_box.pool);
    let transaction = solver.solve(&[]).unwrap();
    assert!(transaction.is_empty());
    assert_eq!(
        transaction.selected().map(|s| s.to_string()).collect_vec(),
        vec!["a-1.0.noarch", "b-1.0.noarch"]
    );

    // Installing what is installed is a no-op too
    assert_eq!(repo_box.solve(&["install b"]), "");
}

#[test]
fn test_update_all() {
    let mut repo_box = RepoBox::from_packages(&[
        (SYSTEM, "a 1.0", vec![]),
        (SYSTEM, "b 1.0", vec![]),
        ("repo", "a 2.0", vec![]),
        ("repo", "b 2.0", vec![]),
    ]);
    let policy = Policy::new().update_all(true);
    assert_snapshot!(repo_box.solve_with_policy(&[], policy), @r###"
    update a-1.0.noarch -> a-2.0.noarch
    update b-1.0.noarch -> b-2.0.noarch
    "###);
}

/// A locked package keeps its state even when everything else is updated
#[test]
fn test_lock_keeps_installed() {
    let mut repo_box = RepoBox::from_packages(&[
        (SYSTEM, "a 1.0", vec![]),
        (SYSTEM, "b 1.0", vec![]),
        ("repo", "a 2.0", vec![]),
        ("repo", "b 2.0", vec![]),
    ]);
    let policy = Policy::new().update_all(true);
    assert_snapshot!(
        repo_box.solve_with_policy(&["lock a"], policy),
        @"update b-1.0.noarch -> b-2.0.noarch"
    );
}

#[test]
fn test_erase_removes_dependents() {
    let mut repo_box = RepoBox::from_packages(&[
        (SYSTEM, "a 1.0", vec![]),
        (SYSTEM, "b 1.0", vec!["requires a"]),
    ]);
    assert_snapshot!(repo_box.solve(&["erase a"]), @r###"
    erase a-1.0.noarch
    erase b-1.0.noarch
    "###);
}

#[test]
fn test_obsoletes_replace_installed() {
    let mut repo_box = RepoBox::from_packages(&[
        (SYSTEM, "old 1.0", vec![]),
        ("repo", "new 1.0", vec!["obsoletes old"]),
    ]);
    assert_snapshot!(repo_box.solve(&["install new"]), @"update old-1.0.noarch -> new-1.0.noarch");

    let jobs = repo_box.jobs(&["install new"]);
    let mut solver = Solver::new(&repo_box.pool);
    let transaction = solver.solve(&jobs).unwrap();
    assert_eq!(transaction.installs(false).count(), 0);
    assert_eq!(
        transaction.removals(true).map(|s| s.to_string()).collect_vec(),
        vec!["old-1.0.noarch"]
    );
}

/// Packages in a freed repository cannot be installed
#[test]
fn test_freed_repository() {
    let mut repo_box = RepoBox::from_packages(&[
        ("gone", "a 2.0", vec![]),
        ("repo", "a 1.0", vec![]),
    ]);
    let gone = repo_box.repo("gone");
    repo_box.pool.free_repository(gone).unwrap();

    assert_snapshot!(repo_box.solve(&["install a"]), @"install a-1.0.noarch");
    assert!(matches!(
        repo_box.pool.free_repository(gone),
        Err(LookupError::NoSuchRepo)
    ));
}

#[test]
#[traced_test]
fn test_resolve_with_conflict() {
    let mut repo_box = RepoBox::from_packages(&[
        ("repo", "a 1.0", vec!["requires b"]),
        ("repo", "b 1.0", vec!["conflicts a"]),
    ]);
    let unsolvable = solve_unsat(&mut repo_box, &["install a"], Policy::default());
    assert_eq!(
        unsolvable.to_string(),
        "the jobs cannot be satisfied, 1 problem(s) found"
    );
    assert_snapshot!(unsolvable.display_user_friendly(&repo_box.pool), @r###"
    Problem 1:
      - job install a
      - a-1.0.noarch requires b, provided by b-1.0.noarch
      - b-1.0.noarch conflicts with a provided by a-1.0.noarch
      Solutions:
        1. do not ask to install a
    "###);
}

#[test]
#[traced_test]
fn test_resolve_with_nothing_provides() {
    let mut repo_box = RepoBox::from_packages(&[("repo", "a 1.0", vec!["requires missing"])]);
    let unsolvable = solve_unsat(&mut repo_box, &["install a"], Policy::default());
    assert_snapshot!(unsolvable.display_user_friendly(&repo_box.pool), @r###"
    Problem 1:
      - job install a
      - nothing provides missing needed by a-1.0.noarch
      Solutions:
        1. do not ask to install a
    "###);
}

/// Rules that play no part in the conflict are left out of the problem
#[test]
#[traced_test]
fn test_problem_leaves_out_unrelated_rules() {
    let mut repo_box = RepoBox::from_packages(&[
        ("repo", "a 1.0", vec!["requires d", "requires b"]),
        ("repo", "b 1.0", vec!["conflicts a"]),
        ("repo", "d 1.0", vec!["requires e"]),
        ("repo", "e 1.0", vec![]),
    ]);
    let unsolvable = solve_unsat(&mut repo_box, &["install a"], Policy::default());
    assert_eq!(unsolvable.problems().len(), 1);
    assert_eq!(unsolvable.problems()[0].rules().len(), 3);
    assert_snapshot!(unsolvable.display_user_friendly(&repo_box.pool), @r###"
    Problem 1:
      - job install a
      - a-1.0.noarch requires b, provided by b-1.0.noarch
      - b-1.0.noarch conflicts with a provided by a-1.0.noarch
      Solutions:
        1. do not ask to install a
    "###);
}

/// Every independent problem is reported
#[test]
#[traced_test]
fn test_multiple_problems() {
    let mut repo_box = RepoBox::from_packages(&[("repo", "a 1.0", vec!["requires missing"])]);
    let unsolvable = solve_unsat(&mut repo_box, &["install zzz", "install a"], Policy::default());
    assert_eq!(unsolvable.problems().len(), 2);
    assert_snapshot!(unsolvable.display_user_friendly(&repo_box.pool), @r###"
    Problem 1:
      - nothing matches job install zzz
      Solutions:
        1. do not ask to install zzz
    Problem 2:
      - job install a
      - nothing provides missing needed by a-1.0.noarch
      Solutions:
        1. do not ask to install a
    "###);
    assert_eq!(
        unsolvable.problems()[1]
            .jobs()
            .map(|job| job.display(&repo_box.pool).to_string())
            .collect_vec(),
        vec!["install a"]
    );
}

#[test]
#[traced_test]
fn test_lock_conflicts_with_install() {
    let mut repo_box = RepoBox::from_packages(&[
        (SYSTEM, "a 1.0", vec![]),
        ("repo", "a 2.0", vec![]),
    ]);
    let unsolvable = solve_unsat(&mut repo_box, &["lock a", "install a >= 2"], Policy::default());
    assert_snapshot!(unsolvable.display_user_friendly(&repo_box.pool), @r###"
    Problem 1:
      - job install a >= 2
      - a-2.0.noarch cannot be installed because of job lock a
      Solutions:
        1. do not ask to install a >= 2
        2. remove lock a
    "###);
}

/// Dropping a job is proposed before unlocking, and unlocking before
/// allowing a downgrade
#[test]
#[traced_test]
fn test_solution_order() {
    let mut repo_box = RepoBox::from_packages(&[
        (SYSTEM, "a 2.0", vec![]),
        ("repo", "a 1.0", vec![]),
        ("repo", "a 3.0", vec![]),
        ("repo", "c 1.0", vec!["conflicts a = 2.0"]),
    ]);
    let unsolvable = solve_unsat(
        &mut repo_box,
        &["install c", "update a", "lock a = 3.0"],
        Policy::default(),
    );
    assert_eq!(unsolvable.problems().len(), 1);
    assert_eq!(
        unsolvable.problems()[0]
            .solutions()
            .iter()
            .map(|solution| solution.display(&repo_box.pool).to_string())
            .collect_vec(),
        vec![
            "do not ask to install c",
            "do not ask to update a",
            "remove lock a = 3.0",
            "allow downgrading a-2.0.noarch",
        ]
    );
}

#[test]
#[traced_test]
fn test_erase_without_uninstall() {
    let mut repo_box = RepoBox::from_packages(&[
        (SYSTEM, "a 1.0", vec![]),
        (SYSTEM, "b 1.0", vec!["requires a"]),
    ]);
    let policy = Policy::new().allow_uninstall(false);
    let unsolvable = solve_unsat(&mut repo_box, &["erase a"], policy);
    assert_snapshot!(unsolvable.display_user_friendly(&repo_box.pool), @r###"
    Problem 1:
      - job erase a removes a-1.0.noarch
      - b-1.0.noarch requires a, provided by a-1.0.noarch
      - installed b-1.0.noarch may only be kept or updated
      Solutions:
        1. do not ask to erase a
        2. allow removing b-1.0.noarch
    "###);

    // Applying the suggested solution works
    let b = repo_box.solvable("b 1.0");
    let policy = Policy::new().allow_uninstall(false).with_uninstallable(b);
    assert_snapshot!(repo_box.solve_with_policy(&["erase a"], policy), @r###"
    erase a-1.0.noarch
    erase b-1.0.noarch
    "###);
}

#[test]
#[traced_test]
fn test_downgrade() {
    let mut repo_box = RepoBox::from_packages(&[
        (SYSTEM, "a 2.0", vec![]),
        ("repo", "a 1.0", vec![]),
    ]);
    assert_snapshot!(repo_box.solve(&["install a = 1.0"]), @"update a-2.0.noarch -> a-1.0.noarch");

    let policy = Policy::new().allow_uninstall(false);
    let unsolvable = solve_unsat(&mut repo_box, &["install a = 1.0"], policy);
    assert_snapshot!(unsolvable.display_user_friendly(&repo_box.pool), @r###"
    Problem 1:
      - job install a = 1.0
      - cannot install both a-2.0.noarch and a-1.0.noarch
      - installed a-2.0.noarch may only be kept or updated
      Solutions:
        1. do not ask to install a = 1.0
        2. allow removing a-2.0.noarch
        3. allow downgrading a-2.0.noarch
    "###);

    let policy = Policy::new().allow_uninstall(false).allow_downgrade(true);
    assert_snapshot!(
        repo_box.solve_with_policy(&["install a = 1.0"], policy),
        @"update a-2.0.noarch -> a-1.0.noarch"
    );
}

/// The graph of a problem connects the job to the solvables involved
#[test]
fn test_problem_graph() {
    let mut repo_box = RepoBox::from_packages(&[
        ("repo", "a 1.0", vec!["requires b"]),
        ("repo", "b 1.0", vec!["conflicts a"]),
    ]);
    let unsolvable = solve_unsat(&mut repo_box, &["install a"], Policy::default());
    let graph = unsolvable.problems()[0].graph(&repo_box.pool);
    assert_eq!(graph.graph().node_count(), 3);
    assert_eq!(graph.graph().edge_count(), 3);

    let mut dot = Vec::new();
    graph.graphviz(&mut dot, &repo_box.pool).unwrap();
    let dot = String::from_utf8(dot).unwrap();
    assert!(dot.starts_with("digraph {"));
    assert!(dot.contains("\"install a\" -> \"a-1.0.noarch\""));
    assert!(dot.contains("conflicts a"));
}

#[test]
#[traced_test]
fn test_unparsable_dependency_is_dropped() {
    let mut pool = Pool::new();
    let repo = pool.add_repository("repo", 0);
    let a = pool.add_solvable(repo, "a", "1.0", "noarch").unwrap();
    let error = pool
        .add_dependency_str(a, DependencyKind::Requires, "b >=")
        .unwrap_err();
    assert_eq!(error, ParseError::MissingVersion(">=".to_owned()));
    assert!(logs_contain("dropping requires 'b >='"));

    let dropped = pool.resolve_solvable(a).dropped_dependencies();
    assert_eq!(dropped.len(), 1);
    assert_eq!(dropped[0].kind, DependencyKind::Requires);
    assert_eq!(dropped[0].text, "b >=");

    // The solvable is still installable without the dropped requirement
    let name = pool.intern_string("a");
    let mut solver = Solver::new(&pool);
    let transaction = solver.solve(&[Job::install(name)]).unwrap();
    assert!(transaction.is_selected(a));

    assert!(pool.add_solvable(repo, "b", "1.0 2", "noarch").is_err());
}

#[test]
fn test_lookup_errors() {
    let mut repo_box = RepoBox::from_packages(&[
        ("repo", "a 1.0", vec![]),
        ("repo", "b 1.0", vec![]),
    ]);
    let repo = repo_box.repo("repo");
    let pool = &repo_box.pool;

    assert_eq!(pool.get_by_index(1, Some(repo)).unwrap().name(), "b");
    assert_eq!(
        pool.get_by_index(5, None).unwrap_err(),
        LookupError::NoSuchIndex { index: 5, len: 2 }
    );
    assert_eq!(
        pool.lookup_by_name("c", None).unwrap_err(),
        LookupError::NotFound("c".to_owned())
    );
    assert_eq!(pool.lookup_by_name("a", Some(repo)).unwrap().evr(), "1.0");
}

#[test]
fn test_solvable_kinds() {
    let mut repo_box = RepoBox::from_packages(&[
        ("repo", "pattern:base 1.0", vec!["requires a"]),
        ("repo", "a 1.0", vec![]),
        ("repo", "srcpackage:a 1.0", vec![]),
    ]);
    let kinds = repo_box
        .pool
        .solvables(None)
        .map(|s| s.kind())
        .collect_vec();
    assert_eq!(
        kinds,
        vec![SolvableKind::Pattern, SolvableKind::Package, SolvableKind::Source]
    );

    assert_snapshot!(repo_box.solve(&["install pattern:base"]), @r###"
    install pattern:base-1.0.noarch
    install a-1.0.noarch
    "###);
}

#[test]
fn test_snapshot_roundtrip() {
    let mut repo_box = RepoBox::from_packages(&[
        (SYSTEM, "a 1.0", vec![]),
        ("repo", "a 2.0", vec!["requires b >= 1.1", "conflicts c"]),
        ("repo", "b 1.1-3 x86_64", vec!["provides libb = 1.1"]),
        ("repo", "c 1.0", vec!["obsoletes a < 1"]),
    ]);
    let expected = repo_box.solve(&["update a"]);

    let snapshot = PoolSnapshot::from_pool(&repo_box.pool);
    let json = serde_json::to_string(&snapshot).unwrap();
    let snapshot: PoolSnapshot = serde_json::from_str(&json).unwrap();
    let mut pool = snapshot.to_pool().unwrap();
    assert_eq!(PoolSnapshot::from_pool(&pool), snapshot);

    let a = Selector::parse(&mut pool, "a").unwrap();
    let mut solver = Solver::new(&pool);
    let transaction = solver.solve(&[Job::update(a)]).unwrap();
    assert_eq!(transaction.to_string(), expected);
    assert_snapshot!(expected, @r###"
    install b-1.1-3.x86_64
    update a-1.0.noarch -> a-2.0.noarch
    "###);
}

const NAMES: [&str; 4] = ["a", "b", "c", "d"];

/// A randomly generated package: a name, a version and its dependencies
#[derive(Clone, Debug)]
struct Package {
    name: usize,
    version: u32,
    installed: bool,
    requires: Vec<(usize, Option<u32>)>,
    conflicts: Vec<usize>,
    obsoletes: Vec<usize>,
}

fn package() -> impl Strategy<Value = Package> {
    (
        0..NAMES.len(),
        1u32..4,
        any::<bool>(),
        prop::collection::vec((0..NAMES.len(), prop::option::of(1u32..4)), 0..3),
        prop::collection::vec(0..NAMES.len(), 0..2),
        prop::collection::vec(0..NAMES.len(), 0..2),
    )
        .prop_map(
            |(name, version, installed, requires, conflicts, obsoletes)| Package {
                name,
                version,
                installed,
                requires,
                conflicts,
                obsoletes,
            },
        )
}

fn build(packages: &[Package]) -> RepoBox {
    let mut repo_box = RepoBox::new();
    for package in packages {
        let repo = if package.installed { SYSTEM } else { "repo" };
        let mut dependencies = Vec::new();
        for &(name, version) in &package.requires {
            match version {
                Some(version) => dependencies.push(format!("requires {} >= {version}", NAMES[name])),
                None => dependencies.push(format!("requires {}", NAMES[name])),
            }
        }
        for &name in &package.conflicts {
            dependencies.push(format!("conflicts {}", NAMES[name]));
        }
        for &name in &package.obsoletes {
            dependencies.push(format!("obsoletes {}", NAMES[name]));
        }
        let dependencies = dependencies.iter().map(String::as_str).collect_vec();
        repo_box.add_package(
            repo,
            &format!("{} {}", NAMES[package.name], package.version),
            &dependencies,
        );
    }
    repo_box
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Solving the same input twice gives the same answer
    #[test]
    fn prop_solving_is_deterministic(
        packages in prop::collection::vec(package(), 1..8),
        job in 0..NAMES.len(),
    ) {
        let mut repo_box = build(&packages);
        let job = format!("install {}", NAMES[job]);
        let first = repo_box.solve(&[job.as_str()]);
        let second = repo_box.solve(&[job.as_str()]);
        prop_assert_eq!(first, second);
    }

    /// Every solution satisfies the requires, conflicts, obsoletes and
    /// single-version rules of the solvables it selects
    #[test]
    fn prop_solution_is_consistent(
        packages in prop::collection::vec(package(), 1..8),
        job in 0..NAMES.len(),
    ) {
        let mut repo_box = build(&packages);
        let jobs = repo_box.jobs(&[format!("install {}", NAMES[job]).as_str()]);
        let pool = &repo_box.pool;
        let mut solver = Solver::new(pool);
        if let Ok(transaction) = solver.solve(&jobs) {
            let selected = transaction.selected().collect_vec();
            prop_assert!(selected.iter().any(|s| s.name() == NAMES[job]));
            prop_assert!(selected.iter().map(|s| s.name()).all_unique());

            for solvable in &selected {
                let dependencies = solvable.solvable().dependencies();
                for &requirement in dependencies.get(DependencyKind::Requires) {
                    let providers = pool.what_provides(requirement);
                    prop_assert!(providers.iter().any(|&p| transaction.is_selected(p)));
                }
                for &conflict in dependencies.get(DependencyKind::Conflicts) {
                    let providers = pool.what_provides(conflict);
                    prop_assert!(providers
                        .iter()
                        .all(|&p| p == solvable.id() || !transaction.is_selected(p)));
                }
                for &obsoletes in dependencies.get(DependencyKind::Obsoletes) {
                    let obsoleted = pool.what_matches_name(obsoletes);
                    let obsoleted_ok = obsoleted.iter().all(|&o| {
                        pool.handle(o).name() == solvable.name() || !transaction.is_selected(o)
                    });
                    prop_assert!(obsoleted_ok);
                }
            }
        }
    }

    /// A locked name keeps its installed state, or the jobs are reported as
    /// unsolvable
    #[test]
    fn prop_lock_keeps_installed_state(
        packages in prop::collection::vec(package(), 1..8),
        lock in 0..NAMES.len(),
        job in 0..NAMES.len(),
    ) {
        let mut repo_box = build(&packages);
        let jobs = repo_box.jobs(&[
            format!("lock {}", NAMES[lock]).as_str(),
            format!("install {}", NAMES[job]).as_str(),
        ]);
        let pool = &repo_box.pool;
        let mut solver = Solver::new(pool).with_policy(Policy::new().update_all(true));
        if let Ok(transaction) = solver.solve(&jobs) {
            for solvable in pool.solvables(None).filter(|s| s.name() == NAMES[lock]) {
                prop_assert_eq!(transaction.is_selected(solvable.id()), solvable.is_installed());
            }
        }
    }
}
