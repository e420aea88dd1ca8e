use quarry_error::Result;

use crate::fragment::builder::FragmentBuilder;
use crate::logical::logical_limit::{DistinctLimitNode, LimitNode, TopNNode};
use crate::logical::operator::LogicalOperator;

use super::FragmentBuildState;

impl FragmentBuildState<'_> {
    /// A local limit drops rows before the shuffle; a single-node merge
    /// limit enforces the global count.
    pub(crate) fn plan_limit(&mut self, node: &LimitNode) -> Result<FragmentBuilder> {
        let mut current = self.walk(&node.source)?;

        let source = current.take_root();
        current.set_root(LogicalOperator::Limit(LimitNode {
            id: node.id,
            source: Box::new(source),
            count: node.count,
        }));

        if current.is_distributed() {
            current = self.merge_to_single_node(current)?;
            let exchange = current.take_root();
            current.set_root(LogicalOperator::Limit(LimitNode {
                id: self.node_ids.next_id(),
                source: Box::new(exchange),
                count: node.count,
            }));
        }

        Ok(current)
    }

    pub(crate) fn plan_distinct_limit(&mut self, node: &DistinctLimitNode) -> Result<FragmentBuilder> {
        let mut current = self.walk(&node.source)?;

        let source = current.take_root();
        current.set_root(LogicalOperator::DistinctLimit(DistinctLimitNode {
            id: node.id,
            source: Box::new(source),
            limit: node.limit,
            hash_symbol: node.hash_symbol.clone(),
        }));

        if current.is_distributed() {
            current = self.merge_to_single_node(current)?;
            let exchange = current.take_root();
            current.set_root(LogicalOperator::DistinctLimit(DistinctLimitNode {
                id: self.node_ids.next_id(),
                source: Box::new(exchange),
                limit: node.limit,
                hash_symbol: node.hash_symbol.clone(),
            }));
        }

        Ok(current)
    }

    /// Distributed TopN keeps each partition's local best rows; the merge
    /// stage re-sorts, so the split preserves the result.
    pub(crate) fn plan_top_n(&mut self, node: &TopNNode) -> Result<FragmentBuilder> {
        let mut current = self.walk(&node.source)?;

        let partial = current.is_distributed();
        let source = current.take_root();
        current.set_root(LogicalOperator::TopN(TopNNode {
            id: node.id,
            source: Box::new(source),
            count: node.count,
            order_by: node.order_by.clone(),
            partial,
        }));

        if current.is_distributed() {
            current = self.merge_to_single_node(current)?;
            let exchange = current.take_root();
            current.set_root(LogicalOperator::TopN(TopNNode {
                id: self.node_ids.next_id(),
                source: Box::new(exchange),
                count: node.count,
                order_by: node.order_by.clone(),
                partial: false,
            }));
        }

        Ok(current)
    }
}
