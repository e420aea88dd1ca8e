use std::fmt;

use crate::explain::explainable::{ExplainConfig, ExplainEntry, Explainable};
use crate::expr::FunctionCall;
use crate::functions::Signature;
use crate::symbol::Symbol;

use super::operator::{LogicalOperator, PlanNodeId};

/// Stage of a split aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregationStep {
    /// Complete aggregation on one instance.
    Single,
    /// Per-partition aggregation emitting intermediate states.
    Partial,
    /// Combines intermediate states into final values.
    Final,
}

impl fmt::Display for AggregationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single => write!(f, "SINGLE"),
            Self::Partial => write!(f, "PARTIAL"),
            Self::Final => write!(f, "FINAL"),
        }
    }
}

/// One aggregate assignment: the output symbol, the call producing it, the
/// resolved signature, and an optional boolean mask column gating input rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    pub output: Symbol,
    pub call: FunctionCall,
    pub signature: Signature,
    pub mask: Option<Symbol>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregationNode {
    pub id: PlanNodeId,
    pub source: Box<LogicalOperator>,
    pub group_by: Vec<Symbol>,
    pub aggregates: Vec<Aggregate>,
    pub step: AggregationStep,
    /// Weight column produced by a rescaled sample. Consumed by the partial
    /// (or single) stage.
    pub sample_weight: Option<Symbol>,
    /// Confidence of approximate results, 1.0 for exact queries.
    pub confidence: f64,
    pub hash_symbol: Option<Symbol>,
}

impl AggregationNode {
    pub fn output_symbols(&self) -> Vec<Symbol> {
        let mut outputs = self.group_by.clone();
        if let Some(hash) = &self.hash_symbol {
            outputs.push(hash.clone());
        }
        outputs.extend(self.aggregates.iter().map(|agg| agg.output.clone()));
        outputs
    }
}

impl Explainable for AggregationNode {
    fn explain_entry(&self, conf: ExplainConfig) -> ExplainEntry {
        let mut ent = ExplainEntry::new("Aggregation")
            .with_value("step", self.step)
            .with_values("group_by", &self.group_by)
            .with_values(
                "aggregates",
                self.aggregates
                    .iter()
                    .map(|agg| format!("{} = {}", agg.output, agg.call)),
            );
        if conf.verbose {
            if let Some(mask) = self.aggregates.iter().find_map(|agg| agg.mask.as_ref()) {
                ent = ent.with_value("mask", mask);
            }
        }
        ent
    }
}

/// Appends a boolean marker that is true for the first occurrence of each
/// distinct combination of the given symbols.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkDistinctNode {
    pub id: PlanNodeId,
    pub source: Box<LogicalOperator>,
    pub marker_symbol: Symbol,
    pub distinct_symbols: Vec<Symbol>,
    pub hash_symbol: Option<Symbol>,
}

impl MarkDistinctNode {
    pub fn output_symbols(&self) -> Vec<Symbol> {
        let mut outputs = self.source.output_symbols();
        outputs.push(self.marker_symbol.clone());
        outputs
    }
}

impl Explainable for MarkDistinctNode {
    fn explain_entry(&self, _conf: ExplainConfig) -> ExplainEntry {
        ExplainEntry::new("MarkDistinct")
            .with_value("marker", &self.marker_symbol)
            .with_values("distinct", &self.distinct_symbols)
    }
}
