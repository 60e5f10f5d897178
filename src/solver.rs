//! Solver interface (component H, §4.8): a minimal wrapper around the
//! underlying LP/MIP solver exposing add-variable/add-row/objective/solve,
//! first-class SOS1/SOS2 declarations, and the `disable_variable` /
//! `update_rhs` operations the re-linearization step needs (§4.9).
//!
//! `highs`'s safe Rust bindings carry no native SOS1/SOS2 declaration, only
//! plain and integer columns. Per §9's design note, this wrapper emulates
//! both SOS sets with [`Solver::add_integer_column`] adjacency selectors and
//! one-hot constraints added only for the MIP phase; the LP re-solve phase
//! skips emulation entirely and instead relies on variables already pruned
//! to zero via [`Solver::disable_variable`] (§4.9 step 5).
use crate::constraint::{ConstraintRow, ConstraintType, LhsTerm};
use crate::error::DispatchError;
use crate::ids::{ConId, VarId};
use crate::variables::Variable;
use highs::{HighsModelStatus, RowProblem, Sense};
use std::collections::HashMap;
use std::ops::RangeInclusive;

/// The assembled, solver-agnostic model state. Rebuilt into a fresh
/// [`RowProblem`] on every [`Solver::solve`] call so that `disable_variable`
/// and `update_rhs` only ever touch plain bookkeeping, never a live solve.
#[derive(Default)]
pub struct Solver {
    variables: HashMap<VarId, Variable>,
    objective: HashMap<VarId, f64>,
    rows: HashMap<ConId, ConstraintRow>,
    terms: Vec<LhsTerm>,
    sos2_groups: Vec<Vec<VarId>>,
    sos1_groups: Vec<Vec<VarId>>,
}

/// The outcome of one [`Solver::solve`] call.
pub struct SolveResult {
    pub primal: HashMap<VarId, f64>,
    pub duals: HashMap<ConId, f64>,
    pub objective_value: f64,
}

impl Solver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register variables (bounds, kind, owner). Re-registering an id
    /// overwrites the previous entry, which is how `disable_variable` takes
    /// effect before the next solve.
    pub fn add_variables(&mut self, variables: impl IntoIterator<Item = Variable>) {
        for var in variables {
            self.variables.insert(var.id, var);
        }
    }

    /// Add per-variable objective (minimization) coefficients, e.g. bid
    /// price or elastic violation cost. Coefficients for the same variable
    /// accumulate.
    pub fn add_objective_terms(&mut self, terms: impl IntoIterator<Item = (VarId, f64)>) {
        for (var, coeff) in terms {
            *self.objective.entry(var).or_insert(0.0) += coeff;
        }
    }

    /// Add constraint rows and their lhs terms.
    pub fn add_rows(&mut self, rows: impl IntoIterator<Item = ConstraintRow>, terms: impl IntoIterator<Item = LhsTerm>) {
        for row in rows {
            self.rows.insert(row.id, row);
        }
        self.terms.extend(terms);
    }

    /// Declare a group of weight variables, in break-point order, as a SOS2
    /// set (§4.6 step 4).
    pub fn add_sos2(&mut self, group: Vec<VarId>) {
        self.sos2_groups.push(group);
    }

    /// Declare a group of flow variables as a SOS1 set (§4.6 step 5).
    pub fn add_sos1(&mut self, group: Vec<VarId>) {
        self.sos1_groups.push(group);
    }

    /// Force a variable's bounds to `[0, 0]` for the next solve, leaving its
    /// objective and lhs terms in place (§4.8, used by the re-linearization
    /// step and the SOS2 pruning it performs).
    pub fn disable_variable(&mut self, var_id: VarId) {
        if let Some(var) = self.variables.get_mut(&var_id) {
            var.lower = 0.0;
            var.upper = 0.0;
        }
    }

    /// Replace a constraint's rhs (used by the over-constrained dispatch
    /// re-run, §4.9 step 7).
    pub fn update_rhs(&mut self, constraint_id: ConId, rhs: f64) {
        if let Some(row) = self.rows.get_mut(&constraint_id) {
            row.rhs = rhs;
        }
    }

    /// Add an integer decision variable directly to the live `highs` problem
    /// and return its column handle. The SOS1/SOS2 emulation's adjacency
    /// selectors (§9 design note) are built from these rather than plain
    /// continuous columns: bounding a continuous column to `0..=1` does not
    /// by itself stop two non-adjacent breakpoint weights from both going
    /// non-zero, only true integrality does.
    pub fn add_integer_column(problem: &mut RowProblem, cost: f64, bounds: RangeInclusive<f64>) -> highs::Col {
        problem.add_integer_column(cost, bounds)
    }

    /// Solve the currently assembled model. `emulate_integrality` switches
    /// on the SOS1/SOS2 binary-adjacency emulation (the "MIP solve" of
    /// §4.9 step 3); the LP re-solve of step 6 passes `false`.
    pub fn solve(&self, emulate_integrality: bool) -> Result<SolveResult, DispatchError> {
        let mut problem = RowProblem::default();
        let mut cols = HashMap::with_capacity(self.variables.len());

        let mut var_ids: Vec<VarId> = self.variables.keys().copied().collect();
        var_ids.sort_unstable();
        for var_id in &var_ids {
            let var = &self.variables[var_id];
            let obj = self.objective.get(var_id).copied().unwrap_or(0.0);
            let col = problem.add_column(obj, var.lower..=var.upper);
            cols.insert(*var_id, col);
        }

        let mut lhs: HashMap<ConId, Vec<(VarId, f64)>> = HashMap::new();
        for term in &self.terms {
            lhs.entry(term.constraint_id).or_default().push((term.variable_id, term.coefficient));
        }

        let mut row_ids: Vec<ConId> = self.rows.keys().copied().collect();
        row_ids.sort_unstable();
        for row_id in &row_ids {
            let row = &self.rows[row_id];
            let mut by_var: HashMap<VarId, f64> = HashMap::new();
            for (var, coeff) in lhs.get(row_id).into_iter().flatten() {
                *by_var.entry(*var).or_insert(0.0) += coeff;
            }
            let row_terms: Vec<(highs::Col, f64)> =
                by_var.into_iter().filter_map(|(var, coeff)| cols.get(&var).map(|c| (*c, coeff))).collect();
            match row.constraint_type {
                ConstraintType::Equal => problem.add_row(row.rhs..=row.rhs, row_terms),
                ConstraintType::LessEqual => problem.add_row(..=row.rhs, row_terms),
                ConstraintType::GreaterEqual => problem.add_row(row.rhs.., row_terms),
            }
        }

        if emulate_integrality {
            for group in &self.sos2_groups {
                emulate_sos2(&mut problem, &cols, group);
            }
            for group in &self.sos1_groups {
                emulate_sos1(&mut problem, &cols, group);
            }
        }

        let solved = problem.optimise(Sense::Minimise).solve();
        match solved.status() {
            HighsModelStatus::Optimal => {
                let solution = solved.get_solution();
                let primal: HashMap<VarId, f64> =
                    var_ids.iter().copied().zip(solution.columns().iter().copied()).collect();
                let duals: HashMap<ConId, f64> =
                    row_ids.iter().copied().zip(solution.dual_rows().iter().copied()).collect();
                let objective_value =
                    primal.iter().map(|(v, val)| self.objective.get(v).copied().unwrap_or(0.0) * val).sum();
                Ok(SolveResult { primal, duals, objective_value })
            }
            status => Err(DispatchError::solver(format!("{status:?}"))),
        }
    }
}

/// Emulate one SOS2 group with the standard incremental formulation: one
/// binary per adjacent pair, `w_k ≤ b_{k-1} + b_k` (sentinel zero at the
/// ends), `Σ b_i = 1`.
fn emulate_sos2(problem: &mut RowProblem, cols: &HashMap<VarId, highs::Col>, group: &[VarId]) {
    if group.len() < 2 {
        return;
    }
    let pair_count = group.len() - 1;
    let mut binaries = Vec::with_capacity(pair_count);
    for _ in 0..pair_count {
        binaries.push(Solver::add_integer_column(problem, 0.0, 0.0..=1.0));
    }

    for (k, &var_id) in group.iter().enumerate() {
        let Some(&weight_col) = cols.get(&var_id) else { continue };
        let mut terms = vec![(weight_col, 1.0)];
        if k > 0 {
            terms.push((binaries[k - 1], -1.0));
        }
        if k < pair_count {
            terms.push((binaries[k], -1.0));
        }
        problem.add_row(..=0.0, terms);
    }

    let sum_terms: Vec<(highs::Col, f64)> = binaries.iter().map(|&b| (b, 1.0)).collect();
    problem.add_row(1.0..=1.0, sum_terms);
}

/// Emulate a SOS1 group over flow variables: one binary per variable,
/// `|flow_i| ≤ max_i · z_i`, `Σ z_i ≤ 1`.
fn emulate_sos1(problem: &mut RowProblem, cols: &HashMap<VarId, highs::Col>, group: &[VarId]) {
    let mut binaries = Vec::with_capacity(group.len());
    for &var_id in group {
        let Some(&flow_col) = cols.get(&var_id) else { continue };
        let binary = Solver::add_integer_column(problem, 0.0, 0.0..=1.0);
        binaries.push(binary);
        // flow - M*z <= 0 ties the flow's activity to its direction binary;
        // M is large enough that any in-range flow satisfies it when z = 1.
        problem.add_row(..=0.0, [(flow_col, 1.0), (binary, -1.0e6)]);
    }
    if binaries.is_empty() {
        return;
    }
    let sum_terms: Vec<(highs::Col, f64)> = binaries.iter().map(|&b| (b, 1.0)).collect();
    problem.add_row(..=1.0, sum_terms);
}
