use std::collections::BTreeSet;

use quarry_error::Result;

use crate::expr::FunctionCall;
use crate::fragment::builder::FragmentBuilder;
use crate::fragment::{OutputPartitioning, PlanDistribution};
use crate::logical::logical_aggregate::{
    Aggregate,
    AggregationNode,
    AggregationStep,
    MarkDistinctNode,
};
use crate::logical::operator::LogicalOperator;
use crate::symbol::Symbol;

use super::FragmentBuildState;

impl FragmentBuildState<'_> {
    pub(crate) fn plan_aggregation(&mut self, node: &AggregationNode) -> Result<FragmentBuilder> {
        let mut current = self.walk(&node.source)?;

        if !current.is_distributed() {
            let source = current.take_root();
            current.set_root(LogicalOperator::Aggregation(AggregationNode {
                id: node.id,
                source: Box::new(source),
                group_by: node.group_by.clone(),
                aggregates: node.aggregates.clone(),
                step: AggregationStep::Single,
                sample_weight: node.sample_weight.clone(),
                confidence: node.confidence,
                hash_symbol: node.hash_symbol.clone(),
            }));
            return Ok(current);
        }

        let mut decomposable = true;
        for aggregate in &node.aggregates {
            let info = self.catalog.resolve_aggregate(&aggregate.signature)?;
            if !info.is_decomposable() {
                decomposable = false;
                break;
            }
        }

        if decomposable {
            self.add_distributed_aggregation(current, node)
        } else {
            self.add_single_node_aggregation(current, node)
        }
    }

    /// Close the open fragment and run the whole aggregation on one
    /// instance. Used when any aggregate cannot be split.
    fn add_single_node_aggregation(
        &mut self,
        mut plan: FragmentBuilder,
        node: &AggregationNode,
    ) -> Result<FragmentBuilder> {
        self.cap_with_sink(&mut plan);

        let exchange = self.exchange_for(&plan);
        let aggregation = LogicalOperator::Aggregation(AggregationNode {
            id: self.node_ids.next_id(),
            source: Box::new(exchange),
            group_by: node.group_by.clone(),
            aggregates: node.aggregates.clone(),
            step: AggregationStep::Single,
            sample_weight: node.sample_weight.clone(),
            confidence: node.confidence,
            hash_symbol: node.hash_symbol.clone(),
        });

        let mut parent = self.single_node_fragment(aggregation);
        parent.add_child(plan.build()?)?;
        Ok(parent)
    }

    /// Split into a partial stage in the open fragment and a final stage in
    /// a new downstream fragment.
    ///
    /// Each aggregate gets a fresh symbol typed by the catalog's
    /// intermediate type. The partial stage emits those symbols; the final
    /// stage re-applies the function to its own intermediate symbol. Masks
    /// gate raw input rows, so they ride on the partial stage only; the
    /// sample weight is likewise consumed by the partial stage.
    fn add_distributed_aggregation(
        &mut self,
        mut plan: FragmentBuilder,
        node: &AggregationNode,
    ) -> Result<FragmentBuilder> {
        let mut partial_aggregates = Vec::with_capacity(node.aggregates.len());
        let mut final_aggregates = Vec::with_capacity(node.aggregates.len());
        for aggregate in &node.aggregates {
            let info = self.catalog.resolve_aggregate(&aggregate.signature)?;
            let intermediate = self
                .symbols
                .new_symbol(info.name(), info.intermediate_type()?);

            partial_aggregates.push(Aggregate {
                output: intermediate.clone(),
                call: aggregate.call.clone(),
                signature: aggregate.signature.clone(),
                mask: aggregate.mask.clone(),
            });
            final_aggregates.push(Aggregate {
                output: aggregate.output.clone(),
                call: FunctionCall::over_column(info.name(), intermediate),
                signature: aggregate.signature.clone(),
                mask: None,
            });
        }

        let source = plan.take_root();
        plan.set_root(LogicalOperator::Aggregation(AggregationNode {
            id: self.node_ids.next_id(),
            source: Box::new(source),
            group_by: node.group_by.clone(),
            aggregates: partial_aggregates,
            step: AggregationStep::Partial,
            sample_weight: node.sample_weight.clone(),
            confidence: node.confidence,
            hash_symbol: node.hash_symbol.clone(),
        }));
        self.cap_with_sink(&mut plan);

        let exchange = self.exchange_for(&plan);
        let final_aggregation = LogicalOperator::Aggregation(AggregationNode {
            id: self.node_ids.next_id(),
            source: Box::new(exchange),
            group_by: node.group_by.clone(),
            aggregates: final_aggregates,
            step: AggregationStep::Final,
            sample_weight: None,
            confidence: node.confidence,
            hash_symbol: node.hash_symbol.clone(),
        });

        let mut parent = if node.group_by.is_empty() {
            self.single_node_fragment(final_aggregation)
        } else {
            plan.set_hash_output_partitioning(node.group_by.clone(), node.hash_symbol.clone())?;
            self.fixed_fragment(final_aggregation)
        };
        parent.add_child(plan.build()?)?;
        Ok(parent)
    }

    pub(crate) fn plan_mark_distinct(&mut self, node: &MarkDistinctNode) -> Result<FragmentBuilder> {
        let mut current = self.walk(&node.source)?;

        // Only a FIXED fragment already re-hashed by exactly the distinct
        // set (order-insensitive) counts as pre-partitioned; a SOURCE
        // fragment never does.
        let distinct: BTreeSet<&Symbol> = node.distinct_symbols.iter().collect();
        let mut already_partitioned = false;
        if current.distribution() == PlanDistribution::Fixed {
            for child in current.children() {
                if let OutputPartitioning::Hash { partition_by, .. } =
                    child.fragment().output_partitioning()
                {
                    if partition_by.iter().collect::<BTreeSet<_>>() == distinct {
                        already_partitioned = true;
                        break;
                    }
                }
            }
        }

        if self.config.single_node
            || already_partitioned
            || (!current.is_distributed() && !self.session.big_query_enabled())
        {
            let source = current.take_root();
            current.set_root(LogicalOperator::MarkDistinct(MarkDistinctNode {
                id: self.node_ids.next_id(),
                source: Box::new(source),
                marker_symbol: node.marker_symbol.clone(),
                distinct_symbols: node.distinct_symbols.clone(),
                hash_symbol: node.hash_symbol.clone(),
            }));
            Ok(current)
        } else {
            self.cap_with_sink(&mut current);
            current.set_hash_output_partitioning(
                node.distinct_symbols.clone(),
                node.hash_symbol.clone(),
            )?;

            let exchange = self.exchange_for(&current);
            let mark = LogicalOperator::MarkDistinct(MarkDistinctNode {
                id: self.node_ids.next_id(),
                source: Box::new(exchange),
                marker_symbol: node.marker_symbol.clone(),
                distinct_symbols: node.distinct_symbols.clone(),
                hash_symbol: node.hash_symbol.clone(),
            });

            let mut parent = self.fixed_fragment(mark);
            parent.add_child(current.build()?)?;
            Ok(parent)
        }
    }
}
