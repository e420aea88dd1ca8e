use std::fmt;

use crate::explain::explainable::{ExplainConfig, ExplainEntry, Explainable};
use crate::symbol::Symbol;

use super::operator::{LogicalOperator, PlanNodeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    /// Carried by the logical plan but not fragmentable; the fragmenter
    /// rejects it.
    Full,
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inner => write!(f, "INNER"),
            Self::Left => write!(f, "LEFT"),
            Self::Right => write!(f, "RIGHT"),
            Self::Full => write!(f, "FULL"),
        }
    }
}

/// Equality condition between one symbol from each side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EquiJoinClause {
    pub left: Symbol,
    pub right: Symbol,
}

impl fmt::Display for EquiJoinClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.left, self.right)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct JoinNode {
    pub id: PlanNodeId,
    pub join_type: JoinType,
    pub left: Box<LogicalOperator>,
    pub right: Box<LogicalOperator>,
    pub criteria: Vec<EquiJoinClause>,
    pub left_hash_symbol: Option<Symbol>,
    pub right_hash_symbol: Option<Symbol>,
}

impl JoinNode {
    pub fn output_symbols(&self) -> Vec<Symbol> {
        let mut outputs = self.left.output_symbols();
        outputs.extend(self.right.output_symbols());
        outputs
    }
}

impl Explainable for JoinNode {
    fn explain_entry(&self, _conf: ExplainConfig) -> ExplainEntry {
        ExplainEntry::new("Join")
            .with_value("type", self.join_type)
            .with_values("criteria", &self.criteria)
    }
}

/// Marks source rows by whether their join symbol appears in the filtering
/// source.
#[derive(Debug, Clone, PartialEq)]
pub struct SemiJoinNode {
    pub id: PlanNodeId,
    pub source: Box<LogicalOperator>,
    pub filtering_source: Box<LogicalOperator>,
    pub source_join_symbol: Symbol,
    pub filtering_source_join_symbol: Symbol,
    pub semi_join_output: Symbol,
    pub source_hash_symbol: Option<Symbol>,
    pub filtering_source_hash_symbol: Option<Symbol>,
}

impl SemiJoinNode {
    pub fn output_symbols(&self) -> Vec<Symbol> {
        let mut outputs = self.source.output_symbols();
        outputs.push(self.semi_join_output.clone());
        outputs
    }
}

impl Explainable for SemiJoinNode {
    fn explain_entry(&self, _conf: ExplainConfig) -> ExplainEntry {
        ExplainEntry::new("SemiJoin")
            .with_value(
                "criteria",
                format!(
                    "{} = {}",
                    self.source_join_symbol, self.filtering_source_join_symbol
                ),
            )
            .with_value("output", &self.semi_join_output)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexJoinType {
    Inner,
    SourceOuter,
}

impl fmt::Display for IndexJoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inner => write!(f, "INNER"),
            Self::SourceOuter => write!(f, "SOURCE_OUTER"),
        }
    }
}

/// Equality condition between a probe symbol and an index symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexJoinClause {
    pub probe: Symbol,
    pub index: Symbol,
}

impl fmt::Display for IndexJoinClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.probe, self.index)
    }
}

/// Join where the right side is an index lookup driven by probe-side rows.
///
/// The index side is a per-row lookup plan, never fragmented.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexJoinNode {
    pub id: PlanNodeId,
    pub join_type: IndexJoinType,
    pub probe_source: Box<LogicalOperator>,
    pub index_source: Box<LogicalOperator>,
    pub criteria: Vec<IndexJoinClause>,
    pub probe_hash_symbol: Option<Symbol>,
    pub index_hash_symbol: Option<Symbol>,
}

impl IndexJoinNode {
    pub fn output_symbols(&self) -> Vec<Symbol> {
        let mut outputs = self.probe_source.output_symbols();
        outputs.extend(self.index_source.output_symbols());
        outputs
    }
}

impl Explainable for IndexJoinNode {
    fn explain_entry(&self, _conf: ExplainConfig) -> ExplainEntry {
        ExplainEntry::new("IndexJoin")
            .with_value("type", self.join_type)
            .with_values("criteria", &self.criteria)
    }
}
