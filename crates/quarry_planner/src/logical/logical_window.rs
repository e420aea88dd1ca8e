use crate::explain::explainable::{ExplainConfig, ExplainEntry, Explainable};
use crate::expr::FunctionCall;
use crate::functions::Signature;
use crate::symbol::Symbol;

use super::logical_limit::Ordering;
use super::operator::{LogicalOperator, PlanNodeId};

/// One window function invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowFunction {
    pub output: Symbol,
    pub call: FunctionCall,
    pub signature: Signature,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WindowNode {
    pub id: PlanNodeId,
    pub source: Box<LogicalOperator>,
    pub partition_by: Vec<Symbol>,
    pub order_by: Vec<Ordering>,
    pub functions: Vec<WindowFunction>,
    pub hash_symbol: Option<Symbol>,
}

impl WindowNode {
    pub fn output_symbols(&self) -> Vec<Symbol> {
        let mut outputs = self.source.output_symbols();
        outputs.extend(self.functions.iter().map(|f| f.output.clone()));
        outputs
    }
}

impl Explainable for WindowNode {
    fn explain_entry(&self, _conf: ExplainConfig) -> ExplainEntry {
        ExplainEntry::new("Window")
            .with_values("partition_by", &self.partition_by)
            .with_values("functions", self.functions.iter().map(|f| &f.call))
    }
}

/// Numbers rows within each partition.
#[derive(Debug, Clone, PartialEq)]
pub struct RowNumberNode {
    pub id: PlanNodeId,
    pub source: Box<LogicalOperator>,
    pub partition_by: Vec<Symbol>,
    pub row_number_symbol: Symbol,
    pub max_rows_per_partition: Option<u64>,
    pub hash_symbol: Option<Symbol>,
}

impl RowNumberNode {
    pub fn output_symbols(&self) -> Vec<Symbol> {
        let mut outputs = self.source.output_symbols();
        outputs.push(self.row_number_symbol.clone());
        outputs
    }
}

impl Explainable for RowNumberNode {
    fn explain_entry(&self, _conf: ExplainConfig) -> ExplainEntry {
        let mut ent = ExplainEntry::new("RowNumber")
            .with_values("partition_by", &self.partition_by)
            .with_value("row_number", &self.row_number_symbol);
        if let Some(max) = self.max_rows_per_partition {
            ent = ent.with_value("max_rows_per_partition", max);
        }
        ent
    }
}

/// RowNumber restricted to the top rows of each partition by a sort order.
///
/// The partial stage keeps each partition's local top rows without emitting
/// the row number; the final stage re-ranks and emits it.
#[derive(Debug, Clone, PartialEq)]
pub struct TopNRowNumberNode {
    pub id: PlanNodeId,
    pub source: Box<LogicalOperator>,
    pub partition_by: Vec<Symbol>,
    pub order_by: Vec<Ordering>,
    pub row_number_symbol: Symbol,
    pub max_rows_per_partition: u64,
    pub partial: bool,
    pub hash_symbol: Option<Symbol>,
}

impl TopNRowNumberNode {
    pub fn output_symbols(&self) -> Vec<Symbol> {
        let mut outputs = self.source.output_symbols();
        if !self.partial {
            outputs.push(self.row_number_symbol.clone());
        }
        outputs
    }
}

impl Explainable for TopNRowNumberNode {
    fn explain_entry(&self, _conf: ExplainConfig) -> ExplainEntry {
        ExplainEntry::new("TopNRowNumber")
            .with_values("partition_by", &self.partition_by)
            .with_values("order_by", &self.order_by)
            .with_value("max_rows_per_partition", self.max_rows_per_partition)
            .with_value("partial", self.partial)
    }
}
