//! Elastic constraint wrapper (component D, §4.4): turns any hard
//! constraint set into a soft one so demand/FCAS/generic infeasibility never
//! aborts a solve.
use crate::constraint::{ConstraintRow, ConstraintType, LhsTerm};
use crate::ids::{ConId, IdAllocator, VarId};
use crate::variables::{Variable, VariableKind};
use std::collections::HashMap;

/// One deficit variable and the sign it enters its constraint's lhs with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeficitVariable {
    pub constraint_id: ConId,
    pub variable_id: VarId,
    pub lhs_coefficient: f64,
}

/// Everything [`elasticize`] adds to the model for one constraint set.
pub struct ElasticOutput {
    pub variables: Vec<Variable>,
    pub terms: Vec<LhsTerm>,
    pub objective_terms: Vec<(VarId, f64)>,
    pub deficits: Vec<DeficitVariable>,
}

/// Add non-negative deficit variables to every row in `rows`: one for a `≤`
/// or `≥` row, two for an `=` row (§4.4). `cost_by_constraint` looks up a
/// per-set violation cost by constraint id; `default_cost` is used for any
/// constraint absent from that table.
pub fn elasticize(
    rows: &[ConstraintRow],
    cost_by_constraint: &HashMap<ConId, f64>,
    default_cost: f64,
    alloc: &mut IdAllocator,
) -> ElasticOutput {
    let equalities = rows.iter().filter(|r| r.constraint_type == ConstraintType::Equal).count();
    let var_count = (rows.len() - equalities) + equalities * 2;
    let mut ids = alloc.alloc_vars(var_count).into_iter();

    let mut variables = Vec::with_capacity(var_count);
    let mut terms = Vec::with_capacity(var_count);
    let mut objective_terms = Vec::with_capacity(var_count);
    let mut deficits = Vec::with_capacity(var_count);

    for row in rows {
        let cost = cost_by_constraint.get(&row.id).copied().unwrap_or(default_cost);

        match row.constraint_type {
            ConstraintType::LessEqual => {
                let id = ids.next().expect("allocated enough deficit variable ids");
                push_deficit(&mut variables, &mut terms, &mut objective_terms, &mut deficits, row.id, id, -1.0, cost);
            }
            ConstraintType::GreaterEqual => {
                let id = ids.next().expect("allocated enough deficit variable ids");
                push_deficit(&mut variables, &mut terms, &mut objective_terms, &mut deficits, row.id, id, 1.0, cost);
            }
            ConstraintType::Equal => {
                let up = ids.next().expect("allocated enough deficit variable ids");
                push_deficit(&mut variables, &mut terms, &mut objective_terms, &mut deficits, row.id, up, -1.0, cost);
                let down = ids.next().expect("allocated enough deficit variable ids");
                push_deficit(&mut variables, &mut terms, &mut objective_terms, &mut deficits, row.id, down, 1.0, cost);
            }
        }
    }

    ElasticOutput { variables, terms, objective_terms, deficits }
}

fn push_deficit(
    variables: &mut Vec<Variable>,
    terms: &mut Vec<LhsTerm>,
    objective_terms: &mut Vec<(VarId, f64)>,
    deficits: &mut Vec<DeficitVariable>,
    constraint_id: ConId,
    variable_id: VarId,
    lhs_coefficient: f64,
    cost: f64,
) {
    variables.push(Variable { id: variable_id, lower: 0.0, upper: f64::INFINITY, kind: VariableKind::Continuous, owner: "elastic" });
    terms.push(LhsTerm { constraint_id, variable_id, coefficient: lhs_coefficient });
    objective_terms.push((variable_id, cost));
    deficits.push(DeficitVariable { constraint_id, variable_id, lhs_coefficient });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inequality_rows_get_one_deficit_each() {
        let rows = vec![
            ConstraintRow { id: 0, constraint_type: ConstraintType::LessEqual, rhs: 10.0, owner: "x" },
            ConstraintRow { id: 1, constraint_type: ConstraintType::GreaterEqual, rhs: 5.0, owner: "x" },
        ];
        let mut alloc = IdAllocator::new();
        let out = elasticize(&rows, &HashMap::new(), 1000.0, &mut alloc);
        assert_eq!(out.variables.len(), 2);
        assert_eq!(out.terms[0].coefficient, -1.0);
        assert_eq!(out.terms[1].coefficient, 1.0);
    }

    #[test]
    fn test_equality_row_gets_two_deficits() {
        let rows = vec![ConstraintRow { id: 0, constraint_type: ConstraintType::Equal, rhs: 100.0, owner: "demand_balance" }];
        let mut alloc = IdAllocator::new();
        let out = elasticize(&rows, &HashMap::new(), 5000.0, &mut alloc);
        assert_eq!(out.variables.len(), 2);
        assert_eq!(out.deficits[0].lhs_coefficient, -1.0);
        assert_eq!(out.deficits[1].lhs_coefficient, 1.0);
    }

    #[test]
    fn test_cost_lookup_falls_back_to_default() {
        let rows = vec![ConstraintRow { id: 7, constraint_type: ConstraintType::LessEqual, rhs: 10.0, owner: "x" }];
        let costs = HashMap::from([(7u32, 250.0)]);
        let mut alloc = IdAllocator::new();
        let out = elasticize(&rows, &costs, 1000.0, &mut alloc);
        assert_eq!(out.objective_terms[0].1, 250.0);
    }
}
