use crate::explain::explainable::{ExplainConfig, ExplainEntry, Explainable};
use crate::symbol::Symbol;

use super::operator::{LogicalOperator, PlanNodeId};

/// Writes source rows to a table; emits per-writer row counts.
#[derive(Debug, Clone, PartialEq)]
pub struct TableWriterNode {
    pub id: PlanNodeId,
    pub source: Box<LogicalOperator>,
    pub target: String,
    /// Source symbols written, aligned with `column_names`.
    pub columns: Vec<Symbol>,
    pub column_names: Vec<String>,
    pub outputs: Vec<Symbol>,
    pub sample_weight_symbol: Option<Symbol>,
}

impl TableWriterNode {
    pub fn output_symbols(&self) -> Vec<Symbol> {
        self.outputs.clone()
    }
}

impl Explainable for TableWriterNode {
    fn explain_entry(&self, _conf: ExplainConfig) -> ExplainEntry {
        ExplainEntry::new("TableWriter")
            .with_value("target", &self.target)
            .with_values("columns", &self.columns)
    }
}

/// Commits a write on the coordinator once all writers finish.
#[derive(Debug, Clone, PartialEq)]
pub struct TableCommitNode {
    pub id: PlanNodeId,
    pub source: Box<LogicalOperator>,
    pub target: String,
    pub outputs: Vec<Symbol>,
}

impl TableCommitNode {
    pub fn output_symbols(&self) -> Vec<Symbol> {
        self.outputs.clone()
    }
}

impl Explainable for TableCommitNode {
    fn explain_entry(&self, _conf: ExplainConfig) -> ExplainEntry {
        ExplainEntry::new("TableCommit").with_value("target", &self.target)
    }
}
