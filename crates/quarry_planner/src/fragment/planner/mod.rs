mod plan_aggregate;
mod plan_join;
mod plan_limit;
mod plan_output;
mod plan_project;
mod plan_scan;
mod plan_sort;
mod plan_union;
mod plan_window;
mod plan_write;

use quarry_error::{QuarryError, Result};
use tracing::trace;

use crate::config::{FragmentPlanConfig, SessionVars};
use crate::functions::FunctionCatalog;
use crate::logical::logical_exchange::{ExchangeNode, SinkNode};
use crate::logical::operator::{LogicalOperator, PlanNodeId, PlanNodeIdAllocator};
use crate::symbol::{Symbol, SymbolAllocator};

use super::builder::FragmentBuilder;
use super::{PlanFragmentId, SubPlan};

/// Splits a logical plan into fragments that can be shipped to and executed
/// on distributed workers.
#[derive(Debug)]
pub struct FragmentPlanner<'a> {
    session: &'a SessionVars,
    catalog: &'a dyn FunctionCatalog,
}

impl<'a> FragmentPlanner<'a> {
    pub fn new(session: &'a SessionVars, catalog: &'a dyn FunctionCatalog) -> Self {
        FragmentPlanner { session, catalog }
    }

    /// Rewrite `root` into a subplan. The allocators must be the ones the
    /// logical planner used, so freshly introduced symbols and node ids stay
    /// unique within the query.
    pub fn plan(
        &self,
        root: &LogicalOperator,
        config: &FragmentPlanConfig,
        symbols: &mut SymbolAllocator,
        node_ids: &mut PlanNodeIdAllocator,
    ) -> Result<SubPlan> {
        trace!("fragmenting logical plan");

        let mut state = FragmentBuildState {
            session: self.session,
            catalog: self.catalog,
            config,
            symbols,
            node_ids,
            fragment_ids: FragmentIdGen::default(),
        };

        let builder = state.walk(root)?;
        let subplan = builder.build()?;
        subplan.sanity_check()?;

        Ok(subplan)
    }
}

#[derive(Debug, Default)]
struct FragmentIdGen {
    next: usize,
}

impl FragmentIdGen {
    fn next_id(&mut self) -> PlanFragmentId {
        let id = PlanFragmentId(self.next);
        self.next += 1;
        id
    }
}

/// State for a single fragmentation pass.
///
/// Children are always rewritten before their parent, and the first input of
/// a binary operator before the second. Fragment ids follow fragment
/// creation order.
#[derive(Debug)]
pub(crate) struct FragmentBuildState<'a> {
    pub(crate) session: &'a SessionVars,
    pub(crate) catalog: &'a dyn FunctionCatalog,
    pub(crate) config: &'a FragmentPlanConfig,
    pub(crate) symbols: &'a mut SymbolAllocator,
    pub(crate) node_ids: &'a mut PlanNodeIdAllocator,
    fragment_ids: FragmentIdGen,
}

impl FragmentBuildState<'_> {
    pub(crate) fn walk(&mut self, node: &LogicalOperator) -> Result<FragmentBuilder> {
        match node {
            LogicalOperator::TableScan(n) => self.plan_table_scan(n),
            LogicalOperator::Values(n) => self.plan_values(n),
            LogicalOperator::Filter(n) => self.plan_filter(n),
            LogicalOperator::Project(n) => self.plan_project(n),
            LogicalOperator::Sample(n) => self.plan_sample(n),
            LogicalOperator::Unnest(n) => self.plan_unnest(n),
            LogicalOperator::Sort(n) => self.plan_sort(n),
            LogicalOperator::TopN(n) => self.plan_top_n(n),
            LogicalOperator::Limit(n) => self.plan_limit(n),
            LogicalOperator::DistinctLimit(n) => self.plan_distinct_limit(n),
            LogicalOperator::RowNumber(n) => self.plan_row_number(n),
            LogicalOperator::TopNRowNumber(n) => self.plan_top_n_row_number(n),
            LogicalOperator::Window(n) => self.plan_window(n),
            LogicalOperator::Aggregation(n) => self.plan_aggregation(n),
            LogicalOperator::MarkDistinct(n) => self.plan_mark_distinct(n),
            LogicalOperator::Join(n) => self.plan_join(n),
            LogicalOperator::SemiJoin(n) => self.plan_semi_join(n),
            LogicalOperator::IndexJoin(n) => self.plan_index_join(n),
            LogicalOperator::Union(n) => self.plan_union(n),
            LogicalOperator::TableWriter(n) => self.plan_table_writer(n),
            LogicalOperator::TableCommit(n) => self.plan_table_commit(n),
            LogicalOperator::Output(n) => self.plan_output(n),
            LogicalOperator::Sink(_) | LogicalOperator::Exchange(_) => Err(QuarryError::new(
                format!("{} is inserted by the fragmenter and may not appear in an input plan", node.name()),
            )),
            LogicalOperator::Invalid => {
                Err(QuarryError::new("Invalid operator in input plan"))
            }
        }
    }

    // Builder factories. Fragment ids are handed out here, in creation order.

    pub(crate) fn single_node_fragment(&mut self, root: LogicalOperator) -> FragmentBuilder {
        FragmentBuilder::single_node(self.fragment_ids.next_id(), root)
    }

    pub(crate) fn fixed_fragment(&mut self, root: LogicalOperator) -> FragmentBuilder {
        FragmentBuilder::fixed(self.fragment_ids.next_id(), root)
    }

    pub(crate) fn coordinator_fragment(&mut self, root: LogicalOperator) -> FragmentBuilder {
        FragmentBuilder::coordinator_only(self.fragment_ids.next_id(), root)
    }

    pub(crate) fn source_fragment(
        &mut self,
        root: LogicalOperator,
        source_id: PlanNodeId,
    ) -> FragmentBuilder {
        let id = self.fragment_ids.next_id();
        if self.config.single_node {
            // The table is treated as unpartitioned, but the scheduler still
            // needs to know which scan feeds the fragment.
            FragmentBuilder::single_node_source(id, root, source_id)
        } else {
            FragmentBuilder::source(id, root, source_id)
        }
    }

    // Boundary primitives. Every rule composes from these three gestures:
    // cap the open fragment with a sink, open a new fragment over an
    // exchange, seal and attach.

    /// Wrap the builder's root in a sink carrying the root's outputs.
    pub(crate) fn cap_with_sink(&mut self, builder: &mut FragmentBuilder) {
        trace!(fragment = %builder.id(), "inserting fragment boundary");
        let root = builder.take_root();
        let outputs = root.output_symbols();
        builder.set_root(LogicalOperator::Sink(SinkNode {
            id: self.node_ids.next_id(),
            source: Box::new(root),
            outputs,
        }));
    }

    /// Exchange consuming a capped fragment. Carries the capped fragment's
    /// output columns.
    pub(crate) fn exchange_for(&mut self, builder: &FragmentBuilder) -> LogicalOperator {
        LogicalOperator::Exchange(ExchangeNode {
            id: self.node_ids.next_id(),
            source_fragments: vec![builder.id()],
            outputs: builder.root().output_symbols(),
        })
    }

    /// Merge a distributed fragment's partitions into a fresh single-node
    /// fragment rooted at an exchange.
    pub(crate) fn merge_to_single_node(
        &mut self,
        mut builder: FragmentBuilder,
    ) -> Result<FragmentBuilder> {
        self.cap_with_sink(&mut builder);
        let exchange = self.exchange_for(&builder);
        let mut parent = self.single_node_fragment(exchange);
        parent.add_child(builder.build()?)?;
        Ok(parent)
    }

    /// Re-hash a fragment's rows by `partition_by` into a fresh fixed
    /// fragment rooted at an exchange.
    pub(crate) fn hash_distribute(
        &mut self,
        mut builder: FragmentBuilder,
        partition_by: Vec<Symbol>,
        hash_symbol: Option<Symbol>,
    ) -> Result<FragmentBuilder> {
        self.cap_with_sink(&mut builder);
        builder.set_hash_output_partitioning(partition_by, hash_symbol)?;
        let exchange = self.exchange_for(&builder);
        let mut parent = self.fixed_fragment(exchange);
        parent.add_child(builder.build()?)?;
        Ok(parent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SessionVars, BIG_QUERY_ENABLED};
    use crate::datatype::DataType;
    use crate::expr::{Expression, FunctionCall, ScalarValue};
    use crate::explain::explainable::ExplainConfig;
    use crate::explain::formatter::ExplainFormatter;
    use crate::fragment::{OutputPartitioning, PlanDistribution};
    use crate::functions::Signature;
    use crate::logical::logical_aggregate::{AggregationStep, MarkDistinctNode};
    use crate::logical::logical_join::{
        EquiJoinClause,
        IndexJoinClause,
        IndexJoinNode,
        IndexJoinType,
        JoinNode,
        JoinType,
        SemiJoinNode,
    };
    use crate::logical::logical_limit::{LimitNode, Ordering, SortNode, TopNNode};
    use crate::logical::logical_setop::{UnionMapping, UnionNode};
    use crate::logical::logical_window::{
        RowNumberNode,
        TopNRowNumberNode,
        WindowFunction,
        WindowNode,
    };
    use crate::logical::logical_write::{TableCommitNode, TableWriterNode};
    use crate::testutil::{self, PlanBuilder};

    macro_rules! expect_node {
        ($op:expr, $variant:ident) => {
            match $op {
                LogicalOperator::$variant(n) => n,
                other => panic!("expected {}, got {}", stringify!($variant), other.name()),
            }
        };
    }

    fn distributed() -> FragmentPlanConfig {
        FragmentPlanConfig::default()
    }

    #[test]
    fn global_count_splits_into_partial_and_final() {
        let mut b = PlanBuilder::new();
        let scan = b.scan("t", &[("v", DataType::Int64)]);
        let count = b.count_star();
        let agg = b.aggregation(scan, Vec::new(), vec![count]);
        let plan = b.output(agg);

        let subplan = testutil::fragment(&plan, &mut b, &distributed()).unwrap();
        assert_eq!(2, subplan.fragment_count());

        let root = subplan.fragment();
        assert_eq!(PlanDistribution::Single, root.distribution());
        let output = expect_node!(root.root(), Output);
        let final_agg = expect_node!(output.source.as_ref(), Aggregation);
        assert_eq!(AggregationStep::Final, final_agg.step);
        assert!(final_agg.sample_weight.is_none());
        let exchange = expect_node!(final_agg.source.as_ref(), Exchange);

        let child = &subplan.children()[0];
        assert_eq!(vec![child.fragment().id()], exchange.source_fragments);
        assert_eq!(PlanDistribution::Source, child.fragment().distribution());
        assert_eq!(&OutputPartitioning::None, child.fragment().output_partitioning());
        assert!(child.fragment().partitioned_source().is_some());

        let sink = expect_node!(child.fragment().root(), Sink);
        let partial = expect_node!(sink.source.as_ref(), Aggregation);
        assert_eq!(AggregationStep::Partial, partial.step);
        assert_eq!("count_1", partial.aggregates[0].output.name());

        // Final stage reads the partial stage's intermediate symbol.
        assert_eq!(
            vec![Expression::Column(partial.aggregates[0].output.clone())],
            final_agg.aggregates[0].call.args
        );
    }

    #[test]
    fn grouped_sum_rehashes_on_group_keys() {
        let mut b = PlanBuilder::new();
        let scan = b.scan("t", &[("k", DataType::Int64), ("v", DataType::Int64)]);
        let k = scan.output_symbols()[0].clone();
        let v = scan.output_symbols()[1].clone();
        let sum = b.sum(&v);
        let plan = b.aggregation(scan, vec![k.clone()], vec![sum]);

        let subplan = testutil::fragment(&plan, &mut b, &distributed()).unwrap();
        assert_eq!(2, subplan.fragment_count());

        let root = subplan.fragment();
        assert_eq!(PlanDistribution::Fixed, root.distribution());
        let final_agg = expect_node!(root.root(), Aggregation);
        assert_eq!(AggregationStep::Final, final_agg.step);
        assert_eq!(vec![k.clone()], final_agg.group_by);

        let child = &subplan.children()[0];
        assert_eq!(PlanDistribution::Source, child.fragment().distribution());
        assert_eq!(
            &OutputPartitioning::Hash {
                partition_by: vec![k],
                hash_symbol: None,
            },
            child.fragment().output_partitioning()
        );
    }

    #[test]
    fn non_decomposable_aggregate_runs_single() {
        let mut b = PlanBuilder::new();
        let scan = b.scan("t", &[("x", DataType::Float64)]);
        let x = scan.output_symbols()[0].clone();
        let approx = b.approx_percentile(&x);
        let plan = b.aggregation(scan, Vec::new(), vec![approx]);

        let subplan = testutil::fragment(&plan, &mut b, &distributed()).unwrap();
        assert_eq!(2, subplan.fragment_count());

        let root = subplan.fragment();
        assert_eq!(PlanDistribution::Single, root.distribution());
        let agg = expect_node!(root.root(), Aggregation);
        assert_eq!(AggregationStep::Single, agg.step);
        expect_node!(agg.source.as_ref(), Exchange);

        // No partial stage: the source fragment ships raw rows.
        let sink = expect_node!(subplan.children()[0].fragment().root(), Sink);
        expect_node!(sink.source.as_ref(), TableScan);
    }

    #[test]
    fn global_top_n_splits_partial_and_merge() {
        let mut b = PlanBuilder::new();
        let scan = b.scan("t", &[("x", DataType::Int64)]);
        let x = scan.output_symbols()[0].clone();
        let top_n = LogicalOperator::TopN(TopNNode {
            id: b.node_ids.next_id(),
            source: Box::new(scan),
            count: 10,
            order_by: vec![Ordering::asc(x)],
            partial: false,
        });
        let plan = b.output(top_n);

        let subplan = testutil::fragment(&plan, &mut b, &distributed()).unwrap();
        assert_eq!(2, subplan.fragment_count());

        let output = expect_node!(subplan.fragment().root(), Output);
        let merge = expect_node!(output.source.as_ref(), TopN);
        assert!(!merge.partial);
        assert_eq!(10, merge.count);
        expect_node!(merge.source.as_ref(), Exchange);

        let sink = expect_node!(subplan.children()[0].fragment().root(), Sink);
        let partial = expect_node!(sink.source.as_ref(), TopN);
        assert!(partial.partial);
        assert_eq!(10, partial.count);
    }

    #[test]
    fn hash_distributed_inner_join() {
        let mut b = PlanBuilder::new();
        let left = b.scan("t1", &[("a", DataType::Int64)]);
        let a = left.output_symbols()[0].clone();
        let right = b.scan("t2", &[("c", DataType::Int64)]);
        let c = right.output_symbols()[0].clone();
        let join = LogicalOperator::Join(JoinNode {
            id: b.node_ids.next_id(),
            join_type: JoinType::Inner,
            left: Box::new(left),
            right: Box::new(right),
            criteria: vec![EquiJoinClause {
                left: a.clone(),
                right: c.clone(),
            }],
            left_hash_symbol: None,
            right_hash_symbol: None,
        });
        let plan = b.output(join);

        let config = FragmentPlanConfig {
            distributed_joins: true,
            ..Default::default()
        };
        let subplan = testutil::fragment(&plan, &mut b, &config).unwrap();
        assert_eq!(4, subplan.fragment_count());
        assert_eq!(PlanFragmentId(3), subplan.fragment().id());

        let join_subplan = &subplan.children()[0];
        assert_eq!(PlanFragmentId(2), join_subplan.fragment().id());
        assert_eq!(PlanDistribution::Fixed, join_subplan.fragment().distribution());

        let sink = expect_node!(join_subplan.fragment().root(), Sink);
        let join = expect_node!(sink.source.as_ref(), Join);
        expect_node!(join.left.as_ref(), Exchange);
        expect_node!(join.right.as_ref(), Exchange);

        // Both sides hash-partitioned by their join keys.
        assert_eq!(2, join_subplan.children().len());
        assert_eq!(
            &OutputPartitioning::Hash {
                partition_by: vec![a],
                hash_symbol: None,
            },
            join_subplan.children()[0].fragment().output_partitioning()
        );
        assert_eq!(
            &OutputPartitioning::Hash {
                partition_by: vec![c],
                hash_symbol: None,
            },
            join_subplan.children()[1].fragment().output_partitioning()
        );
        for side in join_subplan.children() {
            assert_eq!(PlanDistribution::Source, side.fragment().distribution());
        }
    }

    #[test]
    fn broadcast_join_ships_build_side() {
        let mut b = PlanBuilder::new();
        let left = b.scan("t1", &[("a", DataType::Int64)]);
        let a = left.output_symbols()[0].clone();
        let right = b.scan("t2", &[("c", DataType::Int64)]);
        let c = right.output_symbols()[0].clone();
        let join = LogicalOperator::Join(JoinNode {
            id: b.node_ids.next_id(),
            join_type: JoinType::Inner,
            left: Box::new(left),
            right: Box::new(right),
            criteria: vec![EquiJoinClause { left: a, right: c }],
            left_hash_symbol: None,
            right_hash_symbol: None,
        });
        let plan = b.output(join);

        let subplan = testutil::fragment(&plan, &mut b, &distributed()).unwrap();
        assert_eq!(3, subplan.fragment_count());

        // Join stays in the probe-side source fragment.
        let probe = &subplan.children()[0];
        assert_eq!(PlanDistribution::Source, probe.fragment().distribution());
        let sink = expect_node!(probe.fragment().root(), Sink);
        let join = expect_node!(sink.source.as_ref(), Join);
        expect_node!(join.left.as_ref(), TableScan);
        let exchange = expect_node!(join.right.as_ref(), Exchange);

        let build = &probe.children()[0];
        assert_eq!(vec![build.fragment().id()], exchange.source_fragments);
        assert_eq!(&OutputPartitioning::None, build.fragment().output_partitioning());
    }

    #[test]
    fn union_of_scans_meets_at_multi_input_exchange() {
        let mut b = PlanBuilder::new();
        let s1 = b.scan("t1", &[("a1", DataType::Int64), ("b1", DataType::Int64)]);
        let o1 = s1.output_symbols();
        let s2 = b.scan("t2", &[("b2", DataType::Int64), ("a2", DataType::Int64)]);
        let o2 = s2.output_symbols();
        let a = b.symbols.new_symbol("a", DataType::Int64);
        let b_sym = b.symbols.new_symbol("b", DataType::Int64);
        let union = LogicalOperator::Union(UnionNode {
            id: b.node_ids.next_id(),
            sources: vec![s1, s2],
            mappings: vec![
                UnionMapping {
                    output: a.clone(),
                    inputs: vec![o1[0].clone(), o2[1].clone()],
                },
                UnionMapping {
                    output: b_sym.clone(),
                    inputs: vec![o1[1].clone(), o2[0].clone()],
                },
            ],
        });
        let plan = b.output(union);

        let subplan = testutil::fragment(&plan, &mut b, &distributed()).unwrap();
        assert_eq!(3, subplan.fragment_count());
        assert_eq!(PlanDistribution::Single, subplan.fragment().distribution());

        let output = expect_node!(subplan.fragment().root(), Output);
        let exchange = expect_node!(output.source.as_ref(), Exchange);
        assert_eq!(
            vec![PlanFragmentId(0), PlanFragmentId(1)],
            exchange.source_fragments
        );
        assert_eq!(vec![a, b_sym], exchange.outputs);

        // Branch sinks realign each source's columns to the union layout.
        let first = expect_node!(subplan.children()[0].fragment().root(), Sink);
        assert_eq!(vec![o1[0].clone(), o1[1].clone()], first.outputs);
        let second = expect_node!(subplan.children()[1].fragment().root(), Sink);
        assert_eq!(vec![o2[1].clone(), o2[0].clone()], second.outputs);
        for child in subplan.children() {
            assert_eq!(PlanDistribution::Source, child.fragment().distribution());
        }
    }

    #[test]
    fn union_single_node_mode_places_union_operator() {
        let mut b = PlanBuilder::new();
        let s1 = b.scan("t1", &[("a1", DataType::Int64)]);
        let o1 = s1.output_symbols();
        let s2 = b.scan("t2", &[("a2", DataType::Int64)]);
        let o2 = s2.output_symbols();
        let a = b.symbols.new_symbol("a", DataType::Int64);
        let union = LogicalOperator::Union(UnionNode {
            id: b.node_ids.next_id(),
            sources: vec![s1, s2],
            mappings: vec![UnionMapping {
                output: a,
                inputs: vec![o1[0].clone(), o2[0].clone()],
            }],
        });
        let plan = b.output(union);

        let config = FragmentPlanConfig {
            single_node: true,
            ..Default::default()
        };
        let subplan = testutil::fragment(&plan, &mut b, &config).unwrap();
        assert_eq!(1, subplan.fragment_count());

        let output = expect_node!(subplan.fragment().root(), Output);
        let union = expect_node!(output.source.as_ref(), Union);
        assert_eq!(2, union.sources.len());
        expect_node!(&union.sources[0], TableScan);
    }

    #[test]
    fn single_node_mode_never_distributes() {
        let mut b = PlanBuilder::new();
        let scan = b.scan("t", &[("k", DataType::Int64), ("v", DataType::Int64)]);
        let k = scan.output_symbols()[0].clone();
        let v = scan.output_symbols()[1].clone();
        let sum = b.sum(&v);
        let agg = b.aggregation(scan, vec![k], vec![sum]);
        let plan = b.output(agg);

        let config = FragmentPlanConfig {
            single_node: true,
            ..Default::default()
        };
        let subplan = testutil::fragment(&plan, &mut b, &config).unwrap();

        assert_eq!(1, subplan.fragment_count());
        for fragment in subplan.flatten() {
            assert!(!fragment.distribution().is_distributed());
        }

        // Single-stage aggregation, no split.
        let output = expect_node!(subplan.fragment().root(), Output);
        let agg = expect_node!(output.source.as_ref(), Aggregation);
        assert_eq!(AggregationStep::Single, agg.step);
    }

    #[test]
    fn single_node_scan_keeps_partitioned_source() {
        let mut b = PlanBuilder::new();
        let scan = b.scan("t", &[("v", DataType::Int64)]);
        let scan_id = expect_node!(&scan, TableScan).id;
        let plan = b.output(scan);

        let config = FragmentPlanConfig {
            single_node: true,
            ..Default::default()
        };
        let subplan = testutil::fragment(&plan, &mut b, &config).unwrap();

        assert_eq!(1, subplan.fragment_count());
        assert_eq!(PlanDistribution::Single, subplan.fragment().distribution());
        assert_eq!(Some(scan_id), subplan.fragment().partitioned_source());
    }

    #[test]
    fn limit_inserts_single_node_merge() {
        let mut b = PlanBuilder::new();
        let scan = b.scan("t", &[("v", DataType::Int64)]);
        let limit = LogicalOperator::Limit(LimitNode {
            id: b.node_ids.next_id(),
            source: Box::new(scan),
            count: 5,
        });
        let plan = b.output(limit);

        let subplan = testutil::fragment(&plan, &mut b, &distributed()).unwrap();
        assert_eq!(2, subplan.fragment_count());

        let output = expect_node!(subplan.fragment().root(), Output);
        let merge = expect_node!(output.source.as_ref(), Limit);
        assert_eq!(5, merge.count);
        expect_node!(merge.source.as_ref(), Exchange);

        // The local limit runs before the shuffle.
        let sink = expect_node!(subplan.children()[0].fragment().root(), Sink);
        let local = expect_node!(sink.source.as_ref(), Limit);
        assert_eq!(5, local.count);
    }

    #[test]
    fn sort_merges_to_single_node() {
        let mut b = PlanBuilder::new();
        let scan = b.scan("t", &[("v", DataType::Int64)]);
        let v = scan.output_symbols()[0].clone();
        let sort = LogicalOperator::Sort(SortNode {
            id: b.node_ids.next_id(),
            source: Box::new(scan),
            order_by: vec![Ordering::desc(v)],
        });
        let plan = b.output(sort);

        let subplan = testutil::fragment(&plan, &mut b, &distributed()).unwrap();
        assert_eq!(2, subplan.fragment_count());

        // No partial sort below the exchange.
        let output = expect_node!(subplan.fragment().root(), Output);
        let sort = expect_node!(output.source.as_ref(), Sort);
        expect_node!(sort.source.as_ref(), Exchange);
        let sink = expect_node!(subplan.children()[0].fragment().root(), Sink);
        expect_node!(sink.source.as_ref(), TableScan);
    }

    #[test]
    fn filter_is_straight_through() {
        let mut b = PlanBuilder::new();
        let scan = b.scan("t", &[("v", DataType::Int64)]);
        let v = scan.output_symbols()[0].clone();
        let filter = LogicalOperator::Filter(crate::logical::logical_project::FilterNode {
            id: b.node_ids.next_id(),
            source: Box::new(scan),
            predicate: Expression::Function(FunctionCall::new(
                "gt",
                vec![
                    Expression::Column(v),
                    Expression::Literal(ScalarValue::Int64(10)),
                ],
            )),
        });

        let subplan = testutil::fragment(&filter, &mut b, &distributed()).unwrap();
        assert_eq!(1, subplan.fragment_count());
        assert_eq!(PlanDistribution::Source, subplan.fragment().distribution());
        expect_node!(subplan.fragment().root(), Filter);
    }

    #[test]
    fn row_number_without_partition_merges() {
        let mut b = PlanBuilder::new();
        let scan = b.scan("t", &[("v", DataType::Int64)]);
        let row_number = b.symbols.new_symbol("row_number", DataType::Int64);
        let plan = LogicalOperator::RowNumber(RowNumberNode {
            id: b.node_ids.next_id(),
            source: Box::new(scan),
            partition_by: Vec::new(),
            row_number_symbol: row_number,
            max_rows_per_partition: None,
            hash_symbol: None,
        });

        let subplan = testutil::fragment(&plan, &mut b, &distributed()).unwrap();
        assert_eq!(2, subplan.fragment_count());
        assert_eq!(PlanDistribution::Single, subplan.fragment().distribution());
        let row_number = expect_node!(subplan.fragment().root(), RowNumber);
        expect_node!(row_number.source.as_ref(), Exchange);
    }

    #[test]
    fn window_with_partition_rehashes() {
        let mut b = PlanBuilder::new();
        let scan = b.scan("t", &[("k", DataType::Int64), ("v", DataType::Int64)]);
        let k = scan.output_symbols()[0].clone();
        let rank = WindowFunction {
            output: b.symbols.new_symbol("rank", DataType::Int64),
            call: FunctionCall::new("rank", Vec::new()),
            signature: Signature::new("rank", Vec::new(), DataType::Int64),
        };
        let plan = LogicalOperator::Window(WindowNode {
            id: b.node_ids.next_id(),
            source: Box::new(scan),
            partition_by: vec![k.clone()],
            order_by: Vec::new(),
            functions: vec![rank],
            hash_symbol: None,
        });

        let subplan = testutil::fragment(&plan, &mut b, &distributed()).unwrap();
        assert_eq!(2, subplan.fragment_count());
        assert_eq!(PlanDistribution::Fixed, subplan.fragment().distribution());
        let window = expect_node!(subplan.fragment().root(), Window);
        expect_node!(window.source.as_ref(), Exchange);
        assert_eq!(
            &OutputPartitioning::Hash {
                partition_by: vec![k],
                hash_symbol: None,
            },
            subplan.children()[0].fragment().output_partitioning()
        );
    }

    #[test]
    fn top_n_row_number_splits_partial_and_final() {
        let mut b = PlanBuilder::new();
        let scan = b.scan("t", &[("k", DataType::Int64), ("v", DataType::Int64)]);
        let k = scan.output_symbols()[0].clone();
        let v = scan.output_symbols()[1].clone();
        let row_number = b.symbols.new_symbol("row_number", DataType::Int64);
        let plan = LogicalOperator::TopNRowNumber(TopNRowNumberNode {
            id: b.node_ids.next_id(),
            source: Box::new(scan),
            partition_by: vec![k.clone()],
            order_by: vec![Ordering::desc(v)],
            row_number_symbol: row_number,
            max_rows_per_partition: 3,
            partial: false,
            hash_symbol: None,
        });

        let subplan = testutil::fragment(&plan, &mut b, &distributed()).unwrap();
        assert_eq!(2, subplan.fragment_count());
        assert_eq!(PlanDistribution::Fixed, subplan.fragment().distribution());

        let merge = expect_node!(subplan.fragment().root(), TopNRowNumber);
        assert!(!merge.partial);
        expect_node!(merge.source.as_ref(), Exchange);

        let sink = expect_node!(subplan.children()[0].fragment().root(), Sink);
        let partial = expect_node!(sink.source.as_ref(), TopNRowNumber);
        assert!(partial.partial);
        assert_eq!(
            &OutputPartitioning::Hash {
                partition_by: vec![k],
                hash_symbol: None,
            },
            subplan.children()[0].fragment().output_partitioning()
        );
    }

    #[test]
    fn mark_distinct_on_prepartitioned_child_stays() {
        let mut b = PlanBuilder::new();
        let scan = b.scan("t", &[("k", DataType::Int64), ("v", DataType::Int64)]);
        let k = scan.output_symbols()[0].clone();
        let v = scan.output_symbols()[1].clone();
        let sum = b.sum(&v);
        let agg = b.aggregation(scan, vec![k.clone()], vec![sum]);
        let marker = b.symbols.new_symbol("is_distinct", DataType::Boolean);
        let plan = LogicalOperator::MarkDistinct(MarkDistinctNode {
            id: b.node_ids.next_id(),
            source: Box::new(agg),
            marker_symbol: marker,
            distinct_symbols: vec![k],
            hash_symbol: None,
        });

        let subplan = testutil::fragment(&plan, &mut b, &distributed()).unwrap();
        // Already hash-partitioned by the distinct set: no extra boundary.
        assert_eq!(2, subplan.fragment_count());
        assert_eq!(PlanDistribution::Fixed, subplan.fragment().distribution());
        let mark = expect_node!(subplan.fragment().root(), MarkDistinct);
        expect_node!(mark.source.as_ref(), Aggregation);
    }

    #[test]
    fn mark_distinct_rehashes_distributed_child() {
        let mut b = PlanBuilder::new();
        let scan = b.scan("t", &[("k", DataType::Int64)]);
        let k = scan.output_symbols()[0].clone();
        let marker = b.symbols.new_symbol("is_distinct", DataType::Boolean);
        let plan = LogicalOperator::MarkDistinct(MarkDistinctNode {
            id: b.node_ids.next_id(),
            source: Box::new(scan),
            marker_symbol: marker,
            distinct_symbols: vec![k.clone()],
            hash_symbol: None,
        });

        let subplan = testutil::fragment(&plan, &mut b, &distributed()).unwrap();
        assert_eq!(2, subplan.fragment_count());
        assert_eq!(PlanDistribution::Fixed, subplan.fragment().distribution());
        let mark = expect_node!(subplan.fragment().root(), MarkDistinct);
        expect_node!(mark.source.as_ref(), Exchange);
        assert_eq!(
            &OutputPartitioning::Hash {
                partition_by: vec![k],
                hash_symbol: None,
            },
            subplan.children()[0].fragment().output_partitioning()
        );
    }

    #[test]
    fn mark_distinct_small_input_stays_local() {
        let mut b = PlanBuilder::new();
        let values = b.values(&[("k", DataType::Int64)]);
        let k = values.output_symbols()[0].clone();
        let marker = b.symbols.new_symbol("is_distinct", DataType::Boolean);
        let plan = LogicalOperator::MarkDistinct(MarkDistinctNode {
            id: b.node_ids.next_id(),
            source: Box::new(values),
            marker_symbol: marker,
            distinct_symbols: vec![k],
            hash_symbol: None,
        });

        let subplan = testutil::fragment(&plan, &mut b, &distributed()).unwrap();
        assert_eq!(1, subplan.fragment_count());
        assert_eq!(PlanDistribution::Single, subplan.fragment().distribution());
    }

    #[test]
    fn mark_distinct_big_query_rehashes_local_input() {
        let mut b = PlanBuilder::new();
        let values = b.values(&[("k", DataType::Int64)]);
        let k = values.output_symbols()[0].clone();
        let marker = b.symbols.new_symbol("is_distinct", DataType::Boolean);
        let plan = LogicalOperator::MarkDistinct(MarkDistinctNode {
            id: b.node_ids.next_id(),
            source: Box::new(values),
            marker_symbol: marker,
            distinct_symbols: vec![k.clone()],
            hash_symbol: None,
        });

        let mut session = SessionVars::new();
        session
            .set(BIG_QUERY_ENABLED, ScalarValue::Boolean(true))
            .unwrap();
        let subplan =
            testutil::fragment_with_session(&session, &plan, &mut b, &distributed()).unwrap();

        assert_eq!(2, subplan.fragment_count());
        assert_eq!(PlanDistribution::Fixed, subplan.fragment().distribution());
        let child = &subplan.children()[0];
        assert_eq!(PlanDistribution::Single, child.fragment().distribution());
        assert!(child.fragment().output_partitioning().is_hash());
    }

    #[test]
    fn table_commit_moves_to_coordinator() {
        let mut b = PlanBuilder::new();
        let scan = b.scan("t", &[("v", DataType::Int64)]);
        let columns = scan.output_symbols();
        let rows = b.symbols.new_symbol("rows", DataType::Int64);
        let writer = LogicalOperator::TableWriter(TableWriterNode {
            id: b.node_ids.next_id(),
            source: Box::new(scan),
            target: "t_out".to_string(),
            columns: columns.clone(),
            column_names: columns.iter().map(|s| s.name().to_string()).collect(),
            outputs: vec![rows],
            sample_weight_symbol: None,
        });
        let committed = b.symbols.new_symbol("rows", DataType::Int64);
        let plan = LogicalOperator::TableCommit(TableCommitNode {
            id: b.node_ids.next_id(),
            source: Box::new(writer),
            target: "t_out".to_string(),
            outputs: vec![committed],
        });

        let subplan = testutil::fragment(&plan, &mut b, &distributed()).unwrap();
        assert_eq!(2, subplan.fragment_count());
        assert_eq!(
            PlanDistribution::CoordinatorOnly,
            subplan.fragment().distribution()
        );
        let commit = expect_node!(subplan.fragment().root(), TableCommit);
        expect_node!(commit.source.as_ref(), Exchange);

        // Writers stay with their rows.
        let sink = expect_node!(subplan.children()[0].fragment().root(), Sink);
        expect_node!(sink.source.as_ref(), TableWriter);
    }

    #[test]
    fn semi_join_seals_filtering_side() {
        let mut b = PlanBuilder::new();
        let source = b.scan("t1", &[("a", DataType::Int64)]);
        let a = source.output_symbols()[0].clone();
        let filtering = b.scan("t2", &[("c", DataType::Int64)]);
        let c = filtering.output_symbols()[0].clone();
        let matched = b.symbols.new_symbol("matched", DataType::Boolean);
        let plan = LogicalOperator::SemiJoin(SemiJoinNode {
            id: b.node_ids.next_id(),
            source: Box::new(source),
            filtering_source: Box::new(filtering),
            source_join_symbol: a,
            filtering_source_join_symbol: c,
            semi_join_output: matched,
            source_hash_symbol: None,
            filtering_source_hash_symbol: None,
        });

        let subplan = testutil::fragment(&plan, &mut b, &distributed()).unwrap();
        assert_eq!(2, subplan.fragment_count());
        assert_eq!(PlanDistribution::Source, subplan.fragment().distribution());

        let semi_join = expect_node!(subplan.fragment().root(), SemiJoin);
        expect_node!(semi_join.source.as_ref(), TableScan);
        let exchange = expect_node!(semi_join.filtering_source.as_ref(), Exchange);
        assert_eq!(
            vec![subplan.children()[0].fragment().id()],
            exchange.source_fragments
        );
    }

    #[test]
    fn index_join_rehashes_probe_side() {
        let mut b = PlanBuilder::new();
        let probe = b.scan("t", &[("a", DataType::Int64)]);
        let a = probe.output_symbols()[0].clone();
        let index = b.scan("idx", &[("i", DataType::Int64)]);
        let i = index.output_symbols()[0].clone();
        let plan = LogicalOperator::IndexJoin(IndexJoinNode {
            id: b.node_ids.next_id(),
            join_type: IndexJoinType::Inner,
            probe_source: Box::new(probe),
            index_source: Box::new(index),
            criteria: vec![IndexJoinClause {
                probe: a.clone(),
                index: i,
            }],
            probe_hash_symbol: None,
            index_hash_symbol: None,
        });

        let config = FragmentPlanConfig {
            distributed_index_joins: true,
            ..Default::default()
        };
        let subplan = testutil::fragment(&plan, &mut b, &config).unwrap();
        assert_eq!(2, subplan.fragment_count());
        assert_eq!(PlanDistribution::Fixed, subplan.fragment().distribution());

        let index_join = expect_node!(subplan.fragment().root(), IndexJoin);
        expect_node!(index_join.probe_source.as_ref(), Exchange);
        expect_node!(index_join.index_source.as_ref(), TableScan);
        assert_eq!(
            &OutputPartitioning::Hash {
                partition_by: vec![a],
                hash_symbol: None,
            },
            subplan.children()[0].fragment().output_partitioning()
        );
    }

    #[test]
    fn index_join_stays_local_when_disabled() {
        let mut b = PlanBuilder::new();
        let probe = b.scan("t", &[("a", DataType::Int64)]);
        let a = probe.output_symbols()[0].clone();
        let index = b.scan("idx", &[("i", DataType::Int64)]);
        let i = index.output_symbols()[0].clone();
        let plan = LogicalOperator::IndexJoin(IndexJoinNode {
            id: b.node_ids.next_id(),
            join_type: IndexJoinType::Inner,
            probe_source: Box::new(probe),
            index_source: Box::new(index),
            criteria: vec![IndexJoinClause { probe: a, index: i }],
            probe_hash_symbol: None,
            index_hash_symbol: None,
        });

        let subplan = testutil::fragment(&plan, &mut b, &distributed()).unwrap();
        assert_eq!(1, subplan.fragment_count());
        assert_eq!(PlanDistribution::Source, subplan.fragment().distribution());
        let index_join = expect_node!(subplan.fragment().root(), IndexJoin);
        expect_node!(index_join.probe_source.as_ref(), TableScan);
    }

    #[test]
    fn full_join_is_unsupported() {
        let mut b = PlanBuilder::new();
        let left = b.scan("t1", &[("a", DataType::Int64)]);
        let a = left.output_symbols()[0].clone();
        let right = b.scan("t2", &[("c", DataType::Int64)]);
        let c = right.output_symbols()[0].clone();
        let plan = LogicalOperator::Join(JoinNode {
            id: b.node_ids.next_id(),
            join_type: JoinType::Full,
            left: Box::new(left),
            right: Box::new(right),
            criteria: vec![EquiJoinClause { left: a, right: c }],
            left_hash_symbol: None,
            right_hash_symbol: None,
        });

        let err = testutil::fragment(&plan, &mut b, &distributed()).unwrap_err();
        assert_eq!("Unsupported join type: FULL", err.to_string());
    }

    #[test]
    fn sink_in_input_is_rejected() {
        let mut b = PlanBuilder::new();
        let values = b.values(&[("v", DataType::Int64)]);
        let outputs = values.output_symbols();
        let plan = LogicalOperator::Sink(crate::logical::logical_exchange::SinkNode {
            id: b.node_ids.next_id(),
            source: Box::new(values),
            outputs,
        });

        let err = testutil::fragment(&plan, &mut b, &distributed()).unwrap_err();
        assert_eq!(
            "Sink is inserted by the fragmenter and may not appear in an input plan",
            err.to_string()
        );
    }

    #[test]
    fn unknown_aggregate_function_errors() {
        let mut b = PlanBuilder::new();
        let scan = b.scan("t", &[("v", DataType::Int64)]);
        let v = scan.output_symbols()[0].clone();
        let median = crate::logical::logical_aggregate::Aggregate {
            output: b.symbols.new_symbol("median", DataType::Int64),
            call: FunctionCall::over_column("median", v),
            signature: Signature::new("median", vec![DataType::Int64], DataType::Int64),
            mask: None,
        };
        let plan = b.aggregation(scan, Vec::new(), vec![median]);

        let err = testutil::fragment(&plan, &mut b, &distributed()).unwrap_err();
        assert_eq!("Unknown function: median(int64):int64", err.to_string());
    }

    #[test]
    fn fragment_ids_are_stable_across_runs() {
        let build = || {
            let mut b = PlanBuilder::new();
            let scan = b.scan("t", &[("k", DataType::Int64), ("v", DataType::Int64)]);
            let k = scan.output_symbols()[0].clone();
            let v = scan.output_symbols()[1].clone();
            let sum = b.sum(&v);
            let agg = b.aggregation(scan, vec![k], vec![sum]);
            let plan = b.output(agg);
            testutil::fragment(&plan, &mut b, &distributed()).unwrap()
        };

        let formatter = ExplainFormatter::new(ExplainConfig::VERBOSE);
        let first = formatter.format_subplan(&build()).unwrap();
        let second = formatter.format_subplan(&build()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn explain_renders_each_fragment() {
        let mut b = PlanBuilder::new();
        let scan = b.scan("t", &[("v", DataType::Int64)]);
        let count = b.count_star();
        let agg = b.aggregation(scan, Vec::new(), vec![count]);
        let plan = b.output(agg);

        let subplan = testutil::fragment(&plan, &mut b, &distributed()).unwrap();
        let out = ExplainFormatter::new(ExplainConfig::default())
            .format_subplan(&subplan)
            .unwrap();

        assert!(out.contains("Fragment (distribution = SINGLE"));
        assert!(out.contains("Fragment (distribution = SOURCE"));
        assert!(out.contains("table = t"));
        assert!(out.contains("step = PARTIAL"));
        assert!(out.contains("step = FINAL"));
    }

    #[test]
    fn values_plans_single_node() {
        let mut b = PlanBuilder::new();
        let values = b.values(&[("v", DataType::Int64)]);
        let plan = b.output(values);

        let subplan = testutil::fragment(&plan, &mut b, &distributed()).unwrap();
        assert_eq!(1, subplan.fragment_count());
        assert_eq!(PlanDistribution::Single, subplan.fragment().distribution());
        assert_eq!(None, subplan.fragment().partitioned_source());
    }
}
