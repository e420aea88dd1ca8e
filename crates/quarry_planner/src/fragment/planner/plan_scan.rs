use quarry_error::Result;

use crate::fragment::builder::FragmentBuilder;
use crate::logical::logical_scan::{TableScanNode, ValuesNode};
use crate::logical::operator::LogicalOperator;

use super::FragmentBuildState;

impl FragmentBuildState<'_> {
    /// A scan opens a new source-distributed fragment, remembering which
    /// node drives the fragment's parallelism.
    pub(crate) fn plan_table_scan(&mut self, node: &TableScanNode) -> Result<FragmentBuilder> {
        Ok(self.source_fragment(LogicalOperator::TableScan(node.clone()), node.id))
    }

    pub(crate) fn plan_values(&mut self, node: &ValuesNode) -> Result<FragmentBuilder> {
        Ok(self.single_node_fragment(LogicalOperator::Values(node.clone())))
    }
}
