//! Elaboration ordering.
//!
//! Library units must be elaborated before anything that `with`s them. This
//! module builds a dependency graph from `with` clauses and topologically
//! sorts it, erroring out if the graph has a cycle (Ada forbids circular
//! elaboration dependencies between library units without `pragma
//! Elaborate_Body`/`limited with`, neither of which this compiler supports).

use crate::ast::{CompilationUnit, Program};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, PartialEq)]
pub struct ElaborationError {
    pub message: String,
}

/// Returns the indices of `program.units` in elaboration order: a unit's
/// dependencies (its `with`ed units, and a body's own spec) always precede
/// it.
pub fn order(program: &Program) -> Result<Vec<usize>, ElaborationError> {
    let mut index_by_name: HashMap<&str, Vec<usize>> = HashMap::new();
    for (i, unit) in program.units.iter().enumerate() {
        index_by_name
            .entry(Program::unit_name(unit))
            .or_default()
            .push(i);
    }

    let mut edges: HashMap<usize, HashSet<usize>> = HashMap::new();
    for (i, unit) in program.units.iter().enumerate() {
        let deps = edges.entry(i).or_default();
        for with in Program::with_clauses(unit) {
            if let Some(targets) = index_by_name.get(with.unit_name.as_str()) {
                for &t in targets {
                    deps.insert(t);
                }
            }
        }
        // A body depends on its own spec, if a separate spec unit exists.
        if Program::is_body(unit) {
            if let Some(targets) = index_by_name.get(Program::unit_name(unit)) {
                for &t in targets {
                    if t != i && !Program::is_body(&program.units[t]) {
                        deps.insert(t);
                    }
                }
            }
        }
    }

    let n = program.units.len();
    let mut state = vec![0u8; n]; // 0 = unvisited, 1 = in progress, 2 = done
    let mut order = Vec::with_capacity(n);

    fn visit(
        i: usize,
        edges: &HashMap<usize, HashSet<usize>>,
        state: &mut [u8],
        order: &mut Vec<usize>,
        names: &[String],
    ) -> Result<(), ElaborationError> {
        match state[i] {
            2 => return Ok(()),
            1 => {
                return Err(ElaborationError {
                    message: format!(
                        "circular elaboration dependency involving unit '{}'",
                        names[i]
                    ),
                });
            }
            _ => {}
        }
        state[i] = 1;
        if let Some(deps) = edges.get(&i) {
            let mut deps: Vec<usize> = deps.iter().copied().collect();
            deps.sort_unstable();
            for d in deps {
                visit(d, edges, state, order, names)?;
            }
        }
        state[i] = 2;
        order.push(i);
        Ok(())
    }

    let names: Vec<String> = program
        .units
        .iter()
        .map(|u| Program::unit_name(u).to_string())
        .collect();

    for i in 0..n {
        visit(i, &edges, &mut state, &mut order, &names)?;
    }

    Ok(order)
}

/// Returns the elaborated units in order, consuming `program`.
pub fn ordered_units(program: Program) -> Result<Vec<CompilationUnit>, ElaborationError> {
    let idx = order(&program)?;
    let mut units: Vec<Option<CompilationUnit>> = program.units.into_iter().map(Some).collect();
    Ok(idx.into_iter().map(|i| units[i].take().unwrap()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{PackageBody, PackageSpec, UnitKind, WithClause};
    use crate::lexer::{FileId, Span};

    fn dummy_span() -> Span {
        Span::new(FileId(0), 0, 0, 0, 0)
    }

    fn spec(name: &str, withs: &[&str]) -> CompilationUnit {
        CompilationUnit {
            kind: UnitKind::PackageSpec(PackageSpec {
                name: name.to_string(),
                with_clauses: withs
                    .iter()
                    .map(|w| WithClause {
                        unit_name: w.to_string(),
                        span: dummy_span(),
                    })
                    .collect(),
                decls: vec![],
                private_decls: vec![],
            }),
            span: dummy_span(),
        }
    }

    fn body(name: &str) -> CompilationUnit {
        CompilationUnit {
            kind: UnitKind::PackageBody(PackageBody {
                name: name.to_string(),
                with_clauses: vec![],
                decls: vec![],
                statements: vec![],
            }),
            span: dummy_span(),
        }
    }

    #[test]
    fn dependency_precedes_dependent() {
        let program = Program {
            units: vec![spec("B", &["A"]), spec("A", &[])],
        };
        let order = order(&program).unwrap();
        let pos_a = order.iter().position(|&i| i == 1).unwrap();
        let pos_b = order.iter().position(|&i| i == 0).unwrap();
        assert!(pos_a < pos_b);
    }

    #[test]
    fn body_follows_its_own_spec() {
        let program = Program {
            units: vec![body("P"), spec("P", &[])],
        };
        let order = order(&program).unwrap();
        assert_eq!(order, vec![1, 0]);
    }

    #[test]
    fn detects_circular_dependency() {
        let program = Program {
            units: vec![spec("A", &["B"]), spec("B", &["A"])],
        };
        assert!(order(&program).is_err());
    }
}
