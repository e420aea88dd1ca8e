use std::fmt;

use crate::explain::explainable::{ExplainConfig, ExplainEntry, Explainable};
use crate::expr::Expression;
use crate::symbol::Symbol;

use super::operator::{LogicalOperator, PlanNodeId};

#[derive(Debug, Clone, PartialEq)]
pub struct FilterNode {
    pub id: PlanNodeId,
    pub source: Box<LogicalOperator>,
    pub predicate: Expression,
}

impl FilterNode {
    pub fn output_symbols(&self) -> Vec<Symbol> {
        self.source.output_symbols()
    }
}

impl Explainable for FilterNode {
    fn explain_entry(&self, _conf: ExplainConfig) -> ExplainEntry {
        ExplainEntry::new("Filter").with_value("predicate", &self.predicate)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectNode {
    pub id: PlanNodeId,
    pub source: Box<LogicalOperator>,
    /// Output symbol and the expression producing it, in output order.
    pub assignments: Vec<(Symbol, Expression)>,
}

impl ProjectNode {
    pub fn output_symbols(&self) -> Vec<Symbol> {
        self.assignments.iter().map(|(symbol, _)| symbol.clone()).collect()
    }
}

impl Explainable for ProjectNode {
    fn explain_entry(&self, _conf: ExplainConfig) -> ExplainEntry {
        ExplainEntry::new("Project").with_values(
            "assignments",
            self.assignments
                .iter()
                .map(|(symbol, expr)| format!("{symbol} = {expr}")),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleType {
    Bernoulli,
    Poisson,
    System,
}

impl fmt::Display for SampleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bernoulli => write!(f, "BERNOULLI"),
            Self::Poisson => write!(f, "POISSON"),
            Self::System => write!(f, "SYSTEM"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SampleNode {
    pub id: PlanNodeId,
    pub source: Box<LogicalOperator>,
    pub ratio: f64,
    pub sample_type: SampleType,
    /// Rescaled samples emit a per-row weight instead of dropping rows.
    pub rescaled: bool,
    pub sample_weight_symbol: Option<Symbol>,
}

impl SampleNode {
    pub fn output_symbols(&self) -> Vec<Symbol> {
        let mut outputs = self.source.output_symbols();
        if let Some(weight) = &self.sample_weight_symbol {
            outputs.push(weight.clone());
        }
        outputs
    }
}

impl Explainable for SampleNode {
    fn explain_entry(&self, _conf: ExplainConfig) -> ExplainEntry {
        ExplainEntry::new("Sample")
            .with_value("type", self.sample_type)
            .with_value("ratio", self.ratio)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnnestNode {
    pub id: PlanNodeId,
    pub source: Box<LogicalOperator>,
    /// Input symbols replicated onto every unnested row.
    pub replicate_symbols: Vec<Symbol>,
    /// Collection-typed input symbol and the element symbols it unnests to.
    pub unnest_symbols: Vec<(Symbol, Vec<Symbol>)>,
}

impl UnnestNode {
    pub fn output_symbols(&self) -> Vec<Symbol> {
        let mut outputs = self.replicate_symbols.clone();
        for (_, unnested) in &self.unnest_symbols {
            outputs.extend(unnested.iter().cloned());
        }
        outputs
    }
}

impl Explainable for UnnestNode {
    fn explain_entry(&self, _conf: ExplainConfig) -> ExplainEntry {
        ExplainEntry::new("Unnest")
            .with_values("replicate", &self.replicate_symbols)
            .with_values("unnest", self.unnest_symbols.iter().map(|(s, _)| s))
    }
}
