use ahash::HashMap;

use crate::{internal::id::ClauseId, solver::clause::Literal, SolvableId};

/// Shrinks an unsatisfiable set of clauses until removing any single clause
/// would make it satisfiable.
///
/// Clauses are dropped one at a time and kept out whenever the rest stays
/// unsatisfiable. The sets this runs on are the handful of rules that caused
/// a conflict, so a plain DPLL search is enough to check them.
pub(crate) fn minimal_unsatisfiable_subset(clauses: Vec<(ClauseId, &[Literal])>) -> Vec<ClauseId> {
    let literals: Vec<&[Literal]> = clauses.iter().map(|&(_, literals)| literals).collect();
    if is_satisfiable(&literals) {
        tracing::warn!("attempted to minimize a satisfiable set of {} clauses", clauses.len());
        return clauses.into_iter().map(|(id, _)| id).collect();
    }

    let mut core = clauses;
    let mut index = 0;
    while index < core.len() {
        let without: Vec<&[Literal]> = core
            .iter()
            .enumerate()
            .filter(|&(other, _)| other != index)
            .map(|(_, &(_, literals))| literals)
            .collect();
        if is_satisfiable(&without) {
            index += 1;
        } else {
            core.remove(index);
        }
    }

    core.into_iter().map(|(id, _)| id).collect()
}

enum Status {
    Satisfied,
    Falsified,
    Unit(Literal),
    Open(Literal),
}

fn status(clause: &[Literal], assignment: &HashMap<SolvableId, bool>) -> Status {
    let mut unassigned = None;
    let mut count = 0;
    for &literal in clause {
        match assignment.get(&literal.solvable_id) {
            Some(&value) if value == literal.satisfying_value() => return Status::Satisfied,
            Some(_) => {}
            None => {
                count += 1;
                unassigned.get_or_insert(literal);
            }
        }
    }
    match (count, unassigned) {
        (1, Some(literal)) => Status::Unit(literal),
        (_, Some(literal)) => Status::Open(literal),
        (_, None) => Status::Falsified,
    }
}

pub(crate) fn is_satisfiable(clauses: &[&[Literal]]) -> bool {
    let mut assignment = HashMap::default();
    search(clauses, &mut assignment)
}

fn search(clauses: &[&[Literal]], assignment: &mut HashMap<SolvableId, bool>) -> bool {
    let mut trail = Vec::new();
    let result = propagate_and_branch(clauses, assignment, &mut trail);
    for solvable in trail {
        assignment.remove(&solvable);
    }
    result
}

fn propagate_and_branch(
    clauses: &[&[Literal]],
    assignment: &mut HashMap<SolvableId, bool>,
    trail: &mut Vec<SolvableId>,
) -> bool {
    loop {
        let mut changed = false;
        for clause in clauses {
            match status(clause, assignment) {
                Status::Falsified => return false,
                Status::Unit(literal) => {
                    assignment.insert(literal.solvable_id, literal.satisfying_value());
                    trail.push(literal.solvable_id);
                    changed = true;
                }
                Status::Satisfied | Status::Open(_) => {}
            }
        }
        if !changed {
            break;
        }
    }

    let branch = clauses.iter().find_map(|clause| match status(clause, assignment) {
        Status::Open(literal) => Some(literal),
        _ => None,
    });
    let Some(literal) = branch else {
        return true;
    };

    for value in [literal.satisfying_value(), !literal.satisfying_value()] {
        assignment.insert(literal.solvable_id, value);
        if search(clauses, assignment) {
            return true;
        }
        assignment.remove(&literal.solvable_id);
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::internal::arena::ArenaId;

    fn pos(id: u32) -> Literal {
        Literal::positive(SolvableId(id))
    }

    fn neg(id: u32) -> Literal {
        Literal::negative(SolvableId(id))
    }

    #[test]
    fn test_is_satisfiable() {
        assert!(is_satisfiable(&[]));
        assert!(is_satisfiable(&[&[pos(0), pos(1)], &[neg(0)]]));
        assert!(!is_satisfiable(&[&[pos(0)], &[neg(0)]]));
        assert!(!is_satisfiable(&[&[]]));
        assert!(!is_satisfiable(&[
            &[pos(0), pos(1)],
            &[neg(0), pos(1)],
            &[pos(0), neg(1)],
            &[neg(0), neg(1)],
        ]));
    }

    #[test]
    fn test_minimal_subset_drops_irrelevant_clauses() {
        // (A) (¬A ∨ B) (¬B) is the core, (C ∨ A) and (¬C) are noise
        let clauses: Vec<Vec<Literal>> = vec![
            vec![pos(0)],
            vec![pos(2), pos(0)],
            vec![neg(0), pos(1)],
            vec![neg(2)],
            vec![neg(1)],
        ];
        let input = clauses
            .iter()
            .enumerate()
            .map(|(index, literals)| (ClauseId::from_usize(index), literals.as_slice()))
            .collect();

        let core = minimal_unsatisfiable_subset(input);
        assert_eq!(
            core,
            vec![
                ClauseId::from_usize(0),
                ClauseId::from_usize(2),
                ClauseId::from_usize(4)
            ]
        );
    }
}
