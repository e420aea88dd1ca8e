use crate::explain::explainable::{ExplainConfig, ExplainEntry, Explainable};
use crate::symbol::Symbol;

use super::operator::{LogicalOperator, PlanNodeId};

/// Root of a query plan; hands rows to the client under their column names.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputNode {
    pub id: PlanNodeId,
    pub source: Box<LogicalOperator>,
    pub column_names: Vec<String>,
    pub outputs: Vec<Symbol>,
}

impl OutputNode {
    pub fn output_symbols(&self) -> Vec<Symbol> {
        self.outputs.clone()
    }
}

impl Explainable for OutputNode {
    fn explain_entry(&self, _conf: ExplainConfig) -> ExplainEntry {
        ExplainEntry::new("Output")
            .with_values("columns", &self.column_names)
            .with_values("outputs", &self.outputs)
    }
}
