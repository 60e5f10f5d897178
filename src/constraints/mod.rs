//! Constraint builders (component C, §4.3): pure functions of
//! `(inputs, id_allocator)` that each emit a set of [`ConstraintRow`]s and
//! the [`LhsTerm`]s that reference bid, interconnector, loss or weight
//! variables. [`crate::market`] folds every builder's output in declared
//! order before handing the assembled model to the solver.
//!
//! [`ConstraintRow`]: crate::constraint::ConstraintRow
//! [`LhsTerm`]: crate::constraint::LhsTerm

pub mod capacity;
pub mod demand_balance;
pub mod fast_start_profile;
pub mod generic;
pub mod joint_ramping;
pub mod ramp;
pub mod requirement;
pub mod tie_break;
pub mod trapezium;
