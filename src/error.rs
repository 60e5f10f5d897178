//! Typed error conditions for model assembly and solving.
//!
//! Schema and consistency problems are fatal and carry enough context (table
//! name, row identifier) for a caller to locate the offending input row.
//! Ordering and solver problems indicate the core was misused or that the
//! underlying LP/MIP solver itself failed (as opposed to a constraint
//! merely being violated, which is handled by the elastic wrapper instead of
//! being an error at all).
use derive_more::Display;

/// A typed error produced while assembling or solving a dispatch interval.
#[derive(Debug, Display)]
pub enum DispatchError {
    /// A required column was missing, a primary key was duplicated, a
    /// numeric field was non-numeric/infinite, a value fell outside its
    /// permitted enum, or bid bands were not row-wise monotonic.
    #[display("schema error in table \"{table}\" (row {row}): {reason}")]
    Schema {
        /// The offending input table.
        table: &'static str,
        /// A human-readable identifier for the offending row (e.g. a unit ID).
        row: String,
        /// What was wrong with it.
        reason: String,
    },
    /// The core was called out of the order it requires (e.g. price bids
    /// before volume bids, losses before interconnectors, dispatch with no
    /// variables, elasticizing a constraint set that doesn't exist).
    #[display("ordering error: {0}")]
    Ordering(String),
    /// The solver reported an infeasible, unbounded or numerically troubled
    /// problem.
    #[display("solver error: {0}")]
    Solver(String),
    /// A bidirectional unit was missing its generator or load row in a
    /// table that has a `dispatch_type` column.
    #[display("consistency error: unit \"{unit}\" is missing its {missing_side} row in table \"{table}\"")]
    Consistency {
        /// The bidirectional unit affected.
        unit: String,
        /// The table missing a row for one side of the pair.
        table: &'static str,
        /// Which side ("generator" or "load") was missing.
        missing_side: &'static str,
    },
}

impl std::error::Error for DispatchError {}

impl DispatchError {
    /// Build a [`DispatchError::Schema`] for a row that fails validation.
    pub fn schema(table: &'static str, row: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Schema {
            table,
            row: row.into(),
            reason: reason.into(),
        }
    }

    /// Build a [`DispatchError::Ordering`] error.
    pub fn ordering(reason: impl Into<String>) -> Self {
        Self::Ordering(reason.into())
    }

    /// Build a [`DispatchError::Solver`] error.
    pub fn solver(reason: impl Into<String>) -> Self {
        Self::Solver(reason.into())
    }

    /// Build a [`DispatchError::Consistency`] error for a bidirectional unit
    /// missing one half of a paired row.
    pub fn consistency(unit: impl Into<String>, table: &'static str, missing_side: &'static str) -> Self {
        Self::Consistency {
            unit: unit.into(),
            table,
            missing_side,
        }
    }
}
