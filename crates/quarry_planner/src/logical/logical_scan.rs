use crate::explain::explainable::{ExplainConfig, ExplainEntry, Explainable};
use crate::expr::Expression;
use crate::symbol::Symbol;

use super::operator::PlanNodeId;

/// Scan over a partitioned base table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableScanNode {
    pub id: PlanNodeId,
    pub table: String,
    /// Output symbol and the table column it reads, in output order.
    pub columns: Vec<(Symbol, String)>,
}

impl TableScanNode {
    pub fn output_symbols(&self) -> Vec<Symbol> {
        self.columns.iter().map(|(symbol, _)| symbol.clone()).collect()
    }
}

impl Explainable for TableScanNode {
    fn explain_entry(&self, conf: ExplainConfig) -> ExplainEntry {
        let mut ent = ExplainEntry::new("TableScan")
            .with_value("table", &self.table)
            .with_values("outputs", self.output_symbols());
        if conf.verbose {
            ent = ent.with_value("id", self.id);
        }
        ent
    }
}

/// Inline rows, evaluated on a single node.
#[derive(Debug, Clone, PartialEq)]
pub struct ValuesNode {
    pub id: PlanNodeId,
    pub outputs: Vec<Symbol>,
    pub rows: Vec<Vec<Expression>>,
}

impl ValuesNode {
    pub fn output_symbols(&self) -> Vec<Symbol> {
        self.outputs.clone()
    }
}

impl Explainable for ValuesNode {
    fn explain_entry(&self, _conf: ExplainConfig) -> ExplainEntry {
        ExplainEntry::new("Values")
            .with_values("outputs", &self.outputs)
            .with_value("rows", self.rows.len())
    }
}
