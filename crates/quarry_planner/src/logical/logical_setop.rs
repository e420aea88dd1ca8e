use crate::explain::explainable::{ExplainConfig, ExplainEntry, Explainable};
use crate::symbol::Symbol;

use super::operator::{LogicalOperator, PlanNodeId};

/// One union output and the input symbol each source contributes to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnionMapping {
    pub output: Symbol,
    /// Input symbols in source order; `inputs[i]` comes from `sources[i]`.
    pub inputs: Vec<Symbol>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnionNode {
    pub id: PlanNodeId,
    pub sources: Vec<LogicalOperator>,
    pub mappings: Vec<UnionMapping>,
}

impl UnionNode {
    pub fn output_symbols(&self) -> Vec<Symbol> {
        self.mappings.iter().map(|m| m.output.clone()).collect()
    }

    /// Symbols of source `idx`, ordered to line up with the union's outputs.
    pub fn source_output_layout(&self, idx: usize) -> Vec<Symbol> {
        self.mappings.iter().map(|m| m.inputs[idx].clone()).collect()
    }
}

impl Explainable for UnionNode {
    fn explain_entry(&self, _conf: ExplainConfig) -> ExplainEntry {
        ExplainEntry::new("Union")
            .with_value("sources", self.sources.len())
            .with_values("outputs", self.output_symbols())
    }
}
