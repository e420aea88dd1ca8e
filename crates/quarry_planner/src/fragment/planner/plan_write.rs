use quarry_error::Result;

use crate::fragment::builder::FragmentBuilder;
use crate::fragment::PlanDistribution;
use crate::logical::logical_write::{TableCommitNode, TableWriterNode};
use crate::logical::operator::LogicalOperator;

use super::FragmentBuildState;

impl FragmentBuildState<'_> {
    /// Writers run wherever their input rows already are.
    pub(crate) fn plan_table_writer(&mut self, node: &TableWriterNode) -> Result<FragmentBuilder> {
        let mut current = self.walk(&node.source)?;
        let source = current.take_root();
        current.set_root(LogicalOperator::TableWriter(TableWriterNode {
            id: node.id,
            source: Box::new(source),
            target: node.target.clone(),
            columns: node.columns.clone(),
            column_names: node.column_names.clone(),
            outputs: node.outputs.clone(),
            sample_weight_symbol: node.sample_weight_symbol.clone(),
        }));
        Ok(current)
    }

    /// The commit must run on the coordinator, exactly once.
    pub(crate) fn plan_table_commit(&mut self, node: &TableCommitNode) -> Result<FragmentBuilder> {
        let mut current = self.walk(&node.source)?;

        if current.distribution() != PlanDistribution::CoordinatorOnly && !self.config.single_node {
            self.cap_with_sink(&mut current);
            let exchange = self.exchange_for(&current);
            let mut parent = self.coordinator_fragment(exchange);
            parent.add_child(current.build()?)?;
            current = parent;
        }

        let source = current.take_root();
        current.set_root(LogicalOperator::TableCommit(TableCommitNode {
            id: node.id,
            source: Box::new(source),
            target: node.target.clone(),
            outputs: node.outputs.clone(),
        }));

        Ok(current)
    }
}
