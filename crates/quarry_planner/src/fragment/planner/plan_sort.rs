use quarry_error::Result;

use crate::fragment::builder::FragmentBuilder;
use crate::logical::logical_limit::SortNode;
use crate::logical::operator::LogicalOperator;

use super::FragmentBuildState;

impl FragmentBuildState<'_> {
    /// Global sort runs on a single node over all partitions.
    pub(crate) fn plan_sort(&mut self, node: &SortNode) -> Result<FragmentBuilder> {
        let mut current = self.walk(&node.source)?;

        if current.is_distributed() {
            current = self.merge_to_single_node(current)?;
        }

        let source = current.take_root();
        current.set_root(LogicalOperator::Sort(SortNode {
            id: node.id,
            source: Box::new(source),
            order_by: node.order_by.clone(),
        }));

        Ok(current)
    }
}
