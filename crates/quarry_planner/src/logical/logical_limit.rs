use std::fmt;

use crate::explain::explainable::{ExplainConfig, ExplainEntry, Explainable};
use crate::symbol::Symbol;

use super::operator::{LogicalOperator, PlanNodeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ascending => write!(f, "ASC"),
            Self::Descending => write!(f, "DESC"),
        }
    }
}

/// One sort key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ordering {
    pub symbol: Symbol,
    pub order: SortOrder,
}

impl Ordering {
    pub fn asc(symbol: Symbol) -> Self {
        Ordering {
            symbol,
            order: SortOrder::Ascending,
        }
    }

    pub fn desc(symbol: Symbol) -> Self {
        Ordering {
            symbol,
            order: SortOrder::Descending,
        }
    }
}

impl fmt::Display for Ordering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.symbol, self.order)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LimitNode {
    pub id: PlanNodeId,
    pub source: Box<LogicalOperator>,
    pub count: u64,
}

impl LimitNode {
    pub fn output_symbols(&self) -> Vec<Symbol> {
        self.source.output_symbols()
    }
}

impl Explainable for LimitNode {
    fn explain_entry(&self, _conf: ExplainConfig) -> ExplainEntry {
        ExplainEntry::new("Limit").with_value("count", self.count)
    }
}

/// Limit over distinct rows.
#[derive(Debug, Clone, PartialEq)]
pub struct DistinctLimitNode {
    pub id: PlanNodeId,
    pub source: Box<LogicalOperator>,
    pub limit: u64,
    pub hash_symbol: Option<Symbol>,
}

impl DistinctLimitNode {
    pub fn output_symbols(&self) -> Vec<Symbol> {
        self.source.output_symbols()
    }
}

impl Explainable for DistinctLimitNode {
    fn explain_entry(&self, _conf: ExplainConfig) -> ExplainEntry {
        ExplainEntry::new("DistinctLimit").with_value("limit", self.limit)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TopNNode {
    pub id: PlanNodeId,
    pub source: Box<LogicalOperator>,
    pub count: u64,
    pub order_by: Vec<Ordering>,
    /// Partial TopN keeps the local best rows; a non-partial TopN over the
    /// partials re-sorts and enforces the global count.
    pub partial: bool,
}

impl TopNNode {
    pub fn output_symbols(&self) -> Vec<Symbol> {
        self.source.output_symbols()
    }
}

impl Explainable for TopNNode {
    fn explain_entry(&self, _conf: ExplainConfig) -> ExplainEntry {
        ExplainEntry::new("TopN")
            .with_value("count", self.count)
            .with_values("order_by", &self.order_by)
            .with_value("partial", self.partial)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SortNode {
    pub id: PlanNodeId,
    pub source: Box<LogicalOperator>,
    pub order_by: Vec<Ordering>,
}

impl SortNode {
    pub fn output_symbols(&self) -> Vec<Symbol> {
        self.source.output_symbols()
    }
}

impl Explainable for SortNode {
    fn explain_entry(&self, _conf: ExplainConfig) -> ExplainEntry {
        ExplainEntry::new("Sort").with_values("order_by", &self.order_by)
    }
}
