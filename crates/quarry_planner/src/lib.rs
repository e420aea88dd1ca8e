//! Planning layer of the quarry distributed SQL engine.
//!
//! The entry point is [`fragment::planner::FragmentPlanner`], which rewrites
//! a logical plan tree into a [`fragment::SubPlan`]: a DAG of plan fragments
//! connected by Sink/Exchange pairs, each fragment carrying the distribution
//! its operators require.

pub mod config;
pub mod datatype;
pub mod explain;
pub mod expr;
pub mod fragment;
pub mod functions;
pub mod logical;
pub mod symbol;

#[cfg(test)]
pub(crate) mod testutil;
