use std::fmt;

use crate::explain::explainable::{ExplainConfig, ExplainEntry, Explainable};
use crate::symbol::Symbol;

use super::logical_aggregate::{AggregationNode, MarkDistinctNode};
use super::logical_exchange::{ExchangeNode, SinkNode};
use super::logical_join::{IndexJoinNode, JoinNode, SemiJoinNode};
use super::logical_limit::{DistinctLimitNode, LimitNode, SortNode, TopNNode};
use super::logical_output::OutputNode;
use super::logical_project::{FilterNode, ProjectNode, SampleNode, UnnestNode};
use super::logical_scan::{TableScanNode, ValuesNode};
use super::logical_setop::UnionNode;
use super::logical_window::{RowNumberNode, TopNRowNumberNode, WindowNode};
use super::logical_write::{TableCommitNode, TableWriterNode};

/// ID of a single plan node.
///
/// Unique within a query. Stable across the fragmentation pass: operators
/// carried over keep their id, operators the fragmenter introduces get fresh
/// ids from the allocator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PlanNodeId(pub usize);

impl fmt::Display for PlanNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Default)]
pub struct PlanNodeIdAllocator {
    next: usize,
}

impl PlanNodeIdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> PlanNodeId {
        let id = PlanNodeId(self.next);
        self.next += 1;
        id
    }
}

/// A node in the logical plan.
///
/// Operators own their inputs. The fragmenter never mutates an input tree in
/// place; rewrites build new operators around previously built subtrees.
#[derive(Debug, Clone, PartialEq)]
pub enum LogicalOperator {
    Invalid,
    TableScan(TableScanNode),
    Values(ValuesNode),
    Filter(FilterNode),
    Project(ProjectNode),
    Sample(SampleNode),
    Unnest(UnnestNode),
    Sort(SortNode),
    TopN(TopNNode),
    Limit(LimitNode),
    DistinctLimit(DistinctLimitNode),
    RowNumber(RowNumberNode),
    TopNRowNumber(TopNRowNumberNode),
    Window(WindowNode),
    Aggregation(AggregationNode),
    MarkDistinct(MarkDistinctNode),
    Join(JoinNode),
    SemiJoin(SemiJoinNode),
    IndexJoin(IndexJoinNode),
    Union(UnionNode),
    TableWriter(TableWriterNode),
    TableCommit(TableCommitNode),
    Output(OutputNode),
    Sink(SinkNode),
    Exchange(ExchangeNode),
}

impl LogicalOperator {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Invalid => "Invalid",
            Self::TableScan(_) => "TableScan",
            Self::Values(_) => "Values",
            Self::Filter(_) => "Filter",
            Self::Project(_) => "Project",
            Self::Sample(_) => "Sample",
            Self::Unnest(_) => "Unnest",
            Self::Sort(_) => "Sort",
            Self::TopN(_) => "TopN",
            Self::Limit(_) => "Limit",
            Self::DistinctLimit(_) => "DistinctLimit",
            Self::RowNumber(_) => "RowNumber",
            Self::TopNRowNumber(_) => "TopNRowNumber",
            Self::Window(_) => "Window",
            Self::Aggregation(_) => "Aggregation",
            Self::MarkDistinct(_) => "MarkDistinct",
            Self::Join(_) => "Join",
            Self::SemiJoin(_) => "SemiJoin",
            Self::IndexJoin(_) => "IndexJoin",
            Self::Union(_) => "Union",
            Self::TableWriter(_) => "TableWriter",
            Self::TableCommit(_) => "TableCommit",
            Self::Output(_) => "Output",
            Self::Sink(_) => "Sink",
            Self::Exchange(_) => "Exchange",
        }
    }

    /// Ordered output symbols of this operator.
    pub fn output_symbols(&self) -> Vec<Symbol> {
        match self {
            Self::Invalid => Vec::new(),
            Self::TableScan(n) => n.output_symbols(),
            Self::Values(n) => n.output_symbols(),
            Self::Filter(n) => n.output_symbols(),
            Self::Project(n) => n.output_symbols(),
            Self::Sample(n) => n.output_symbols(),
            Self::Unnest(n) => n.output_symbols(),
            Self::Sort(n) => n.output_symbols(),
            Self::TopN(n) => n.output_symbols(),
            Self::Limit(n) => n.output_symbols(),
            Self::DistinctLimit(n) => n.output_symbols(),
            Self::RowNumber(n) => n.output_symbols(),
            Self::TopNRowNumber(n) => n.output_symbols(),
            Self::Window(n) => n.output_symbols(),
            Self::Aggregation(n) => n.output_symbols(),
            Self::MarkDistinct(n) => n.output_symbols(),
            Self::Join(n) => n.output_symbols(),
            Self::SemiJoin(n) => n.output_symbols(),
            Self::IndexJoin(n) => n.output_symbols(),
            Self::Union(n) => n.output_symbols(),
            Self::TableWriter(n) => n.output_symbols(),
            Self::TableCommit(n) => n.output_symbols(),
            Self::Output(n) => n.output_symbols(),
            Self::Sink(n) => n.output_symbols(),
            Self::Exchange(n) => n.output_symbols(),
        }
    }

    /// Inputs of this operator, in argument order.
    pub fn children(&self) -> Vec<&LogicalOperator> {
        match self {
            Self::Invalid => Vec::new(),
            Self::TableScan(_) | Self::Values(_) | Self::Exchange(_) => Vec::new(),
            Self::Filter(n) => vec![&n.source],
            Self::Project(n) => vec![&n.source],
            Self::Sample(n) => vec![&n.source],
            Self::Unnest(n) => vec![&n.source],
            Self::Sort(n) => vec![&n.source],
            Self::TopN(n) => vec![&n.source],
            Self::Limit(n) => vec![&n.source],
            Self::DistinctLimit(n) => vec![&n.source],
            Self::RowNumber(n) => vec![&n.source],
            Self::TopNRowNumber(n) => vec![&n.source],
            Self::Window(n) => vec![&n.source],
            Self::Aggregation(n) => vec![&n.source],
            Self::MarkDistinct(n) => vec![&n.source],
            Self::Join(n) => vec![&n.left, &n.right],
            Self::SemiJoin(n) => vec![&n.source, &n.filtering_source],
            Self::IndexJoin(n) => vec![&n.probe_source, &n.index_source],
            Self::Union(n) => n.sources.iter().collect(),
            Self::TableWriter(n) => vec![&n.source],
            Self::TableCommit(n) => vec![&n.source],
            Self::Output(n) => vec![&n.source],
            Self::Sink(n) => vec![&n.source],
        }
    }

    /// Symbols each input must provide, aligned with [`Self::children`].
    ///
    /// This is the contract the sanity check enforces: an operator may only
    /// reference symbols its inputs actually produce.
    pub(crate) fn required_input_symbols(&self) -> Vec<Vec<Symbol>> {
        fn opt(symbol: &Option<Symbol>, out: &mut Vec<Symbol>) {
            if let Some(symbol) = symbol {
                out.push(symbol.clone());
            }
        }

        match self {
            Self::Invalid
            | Self::TableScan(_)
            | Self::Values(_)
            | Self::Exchange(_) => Vec::new(),
            Self::Filter(n) => {
                let mut req = Vec::new();
                n.predicate.collect_symbols(&mut req);
                vec![req]
            }
            Self::Project(n) => {
                let mut req = Vec::new();
                for (_, expr) in &n.assignments {
                    expr.collect_symbols(&mut req);
                }
                vec![req]
            }
            Self::Sample(_) => vec![Vec::new()],
            Self::Unnest(n) => {
                let mut req = n.replicate_symbols.clone();
                req.extend(n.unnest_symbols.iter().map(|(s, _)| s.clone()));
                vec![req]
            }
            Self::Sort(n) => vec![n.order_by.iter().map(|o| o.symbol.clone()).collect()],
            Self::TopN(n) => vec![n.order_by.iter().map(|o| o.symbol.clone()).collect()],
            Self::Limit(_) => vec![Vec::new()],
            Self::DistinctLimit(n) => {
                let mut req = Vec::new();
                opt(&n.hash_symbol, &mut req);
                vec![req]
            }
            Self::RowNumber(n) => {
                let mut req = n.partition_by.clone();
                opt(&n.hash_symbol, &mut req);
                vec![req]
            }
            Self::TopNRowNumber(n) => {
                let mut req = n.partition_by.clone();
                req.extend(n.order_by.iter().map(|o| o.symbol.clone()));
                opt(&n.hash_symbol, &mut req);
                vec![req]
            }
            Self::Window(n) => {
                let mut req = n.partition_by.clone();
                req.extend(n.order_by.iter().map(|o| o.symbol.clone()));
                for function in &n.functions {
                    function.call.collect_symbols(&mut req);
                }
                opt(&n.hash_symbol, &mut req);
                vec![req]
            }
            Self::Aggregation(n) => {
                let mut req = n.group_by.clone();
                for aggregate in &n.aggregates {
                    aggregate.call.collect_symbols(&mut req);
                    opt(&aggregate.mask, &mut req);
                }
                opt(&n.sample_weight, &mut req);
                opt(&n.hash_symbol, &mut req);
                vec![req]
            }
            Self::MarkDistinct(n) => {
                let mut req = n.distinct_symbols.clone();
                opt(&n.hash_symbol, &mut req);
                vec![req]
            }
            Self::Join(n) => {
                let mut left = Vec::new();
                let mut right = Vec::new();
                for clause in &n.criteria {
                    left.push(clause.left.clone());
                    right.push(clause.right.clone());
                }
                opt(&n.left_hash_symbol, &mut left);
                opt(&n.right_hash_symbol, &mut right);
                vec![left, right]
            }
            Self::SemiJoin(n) => {
                let mut source = vec![n.source_join_symbol.clone()];
                let mut filtering = vec![n.filtering_source_join_symbol.clone()];
                opt(&n.source_hash_symbol, &mut source);
                opt(&n.filtering_source_hash_symbol, &mut filtering);
                vec![source, filtering]
            }
            Self::IndexJoin(n) => {
                let mut probe = Vec::new();
                let mut index = Vec::new();
                for clause in &n.criteria {
                    probe.push(clause.probe.clone());
                    index.push(clause.index.clone());
                }
                opt(&n.probe_hash_symbol, &mut probe);
                opt(&n.index_hash_symbol, &mut index);
                vec![probe, index]
            }
            Self::Union(n) => (0..n.sources.len())
                .map(|idx| n.source_output_layout(idx))
                .collect(),
            Self::TableWriter(n) => {
                let mut req = n.columns.clone();
                opt(&n.sample_weight_symbol, &mut req);
                vec![req]
            }
            Self::TableCommit(_) => vec![Vec::new()],
            Self::Output(n) => vec![n.outputs.clone()],
            Self::Sink(n) => vec![n.outputs.clone()],
        }
    }
}

impl Explainable for LogicalOperator {
    fn explain_entry(&self, conf: ExplainConfig) -> ExplainEntry {
        match self {
            Self::Invalid => ExplainEntry::new("INVALID"),
            Self::TableScan(n) => n.explain_entry(conf),
            Self::Values(n) => n.explain_entry(conf),
            Self::Filter(n) => n.explain_entry(conf),
            Self::Project(n) => n.explain_entry(conf),
            Self::Sample(n) => n.explain_entry(conf),
            Self::Unnest(n) => n.explain_entry(conf),
            Self::Sort(n) => n.explain_entry(conf),
            Self::TopN(n) => n.explain_entry(conf),
            Self::Limit(n) => n.explain_entry(conf),
            Self::DistinctLimit(n) => n.explain_entry(conf),
            Self::RowNumber(n) => n.explain_entry(conf),
            Self::TopNRowNumber(n) => n.explain_entry(conf),
            Self::Window(n) => n.explain_entry(conf),
            Self::Aggregation(n) => n.explain_entry(conf),
            Self::MarkDistinct(n) => n.explain_entry(conf),
            Self::Join(n) => n.explain_entry(conf),
            Self::SemiJoin(n) => n.explain_entry(conf),
            Self::IndexJoin(n) => n.explain_entry(conf),
            Self::Union(n) => n.explain_entry(conf),
            Self::TableWriter(n) => n.explain_entry(conf),
            Self::TableCommit(n) => n.explain_entry(conf),
            Self::Output(n) => n.explain_entry(conf),
            Self::Sink(n) => n.explain_entry(conf),
            Self::Exchange(n) => n.explain_entry(conf),
        }
    }
}
