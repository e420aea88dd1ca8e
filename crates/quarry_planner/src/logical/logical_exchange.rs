use crate::explain::explainable::{ExplainConfig, ExplainEntry, Explainable};
use crate::fragment::PlanFragmentId;
use crate::symbol::Symbol;

use super::operator::{LogicalOperator, PlanNodeId};

/// Terminal operator of a fragment; hands rows to the cross-fragment
/// transport. Inserted by the fragmenter, never present in input plans.
#[derive(Debug, Clone, PartialEq)]
pub struct SinkNode {
    pub id: PlanNodeId,
    pub source: Box<LogicalOperator>,
    pub outputs: Vec<Symbol>,
}

impl SinkNode {
    pub fn output_symbols(&self) -> Vec<Symbol> {
        self.outputs.clone()
    }
}

impl Explainable for SinkNode {
    fn explain_entry(&self, _conf: ExplainConfig) -> ExplainEntry {
        ExplainEntry::new("Sink").with_values("outputs", &self.outputs)
    }
}

/// Source operator of a fragment; consumes the rows of one or more child
/// fragments. Inserted by the fragmenter, never present in input plans.
#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeNode {
    pub id: PlanNodeId,
    pub source_fragments: Vec<PlanFragmentId>,
    pub outputs: Vec<Symbol>,
}

impl ExchangeNode {
    pub fn output_symbols(&self) -> Vec<Symbol> {
        self.outputs.clone()
    }
}

impl Explainable for ExchangeNode {
    fn explain_entry(&self, _conf: ExplainConfig) -> ExplainEntry {
        ExplainEntry::new("Exchange")
            .with_values("fragments", &self.source_fragments)
            .with_values("outputs", &self.outputs)
    }
}
