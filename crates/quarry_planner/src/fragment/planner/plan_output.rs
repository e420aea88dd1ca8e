use quarry_error::Result;

use crate::fragment::builder::FragmentBuilder;
use crate::logical::logical_output::OutputNode;
use crate::logical::operator::LogicalOperator;

use super::FragmentBuildState;

impl FragmentBuildState<'_> {
    /// Output hands rows to the client, so it always consumes a single
    /// stream.
    pub(crate) fn plan_output(&mut self, node: &OutputNode) -> Result<FragmentBuilder> {
        let mut current = self.walk(&node.source)?;

        if current.is_distributed() {
            current = self.merge_to_single_node(current)?;
        }

        let source = current.take_root();
        current.set_root(LogicalOperator::Output(OutputNode {
            id: node.id,
            source: Box::new(source),
            column_names: node.column_names.clone(),
            outputs: node.outputs.clone(),
        }));

        Ok(current)
    }
}
