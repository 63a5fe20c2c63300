use std::fmt::Write;

use ahash::HashMap;
use itertools::Itertools;

use crate::{
    solver::{clause::Clause, Solver},
    StringId,
};

impl Solver<'_> {
    /// Reports the size of the encoded problem.
    pub(crate) fn report_diagnostics(&self) {
        let mut same_name_by_name: HashMap<StringId, usize> = HashMap::default();
        let mut counts = [0usize; 8];
        let clauses = &self.state.encoding.clauses;
        for (_, clause) in clauses.iter() {
            let slot = match clause.kind {
                Clause::Job(..) | Clause::UpdateJob(..) => 0,
                Clause::Erase(..) | Clause::Lock(..) => 1,
                Clause::Requires(..) => 2,
                Clause::Conflicts(..) => 3,
                Clause::Obsoletes(..) => 4,
                Clause::SameName(a, _) => {
                    let name = self.pool.resolve_solvable(a).name();
                    *same_name_by_name.entry(name).or_insert(0) += 1;
                    5
                }
                Clause::Update(..) => 6,
                Clause::Learnt(..) => 7,
            };
            counts[slot] += 1;
        }

        let mut report = String::new();
        writeln!(
            report,
            "Total number of variables: {}",
            self.state.encoding.variables.len()
        ).unwrap();
        writeln!(report, "Total number of watches:   {}", self.state.watches.len()).unwrap();
        writeln!(report, "Total number of clauses:   {}", clauses.len()).unwrap();
        for (label, count) in [
            "Jobs", "Erase/Lock", "Requires", "Conflicts", "Obsoletes", "SameName", "Update", "Learnt",
        ]
        .iter()
        .zip(counts)
        {
            writeln!(report, "- {label}: {count}").unwrap();
        }
        for (name, count) in same_name_by_name
            .iter()
            .sorted_by_key(|(name, count)| (std::cmp::Reverse(**count), **name))
            .take(5)
        {
            writeln!(report, "  - {}: {}", self.pool.resolve_string(*name), count).unwrap();
        }
        if same_name_by_name.len() > 5 {
            writeln!(report, "  ...").unwrap();
        }
        writeln!(
            report,
            "Update rules: {}",
            self.state.encoding.update_rules.len()
        ).unwrap();

        tracing::info!("Solver diagnostics:\n{}", report);
    }
}
