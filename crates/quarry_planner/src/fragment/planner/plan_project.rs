use quarry_error::Result;

use crate::fragment::builder::FragmentBuilder;
use crate::logical::logical_project::{FilterNode, ProjectNode, SampleNode, UnnestNode};
use crate::logical::operator::LogicalOperator;

use super::FragmentBuildState;

// Straight-through operators: the new node wraps the builder's current root
// and the fragment's distribution is preserved.
impl FragmentBuildState<'_> {
    pub(crate) fn plan_filter(&mut self, node: &FilterNode) -> Result<FragmentBuilder> {
        let mut current = self.walk(&node.source)?;
        let source = current.take_root();
        current.set_root(LogicalOperator::Filter(FilterNode {
            id: node.id,
            source: Box::new(source),
            predicate: node.predicate.clone(),
        }));
        Ok(current)
    }

    pub(crate) fn plan_project(&mut self, node: &ProjectNode) -> Result<FragmentBuilder> {
        let mut current = self.walk(&node.source)?;
        let source = current.take_root();
        current.set_root(LogicalOperator::Project(ProjectNode {
            id: node.id,
            source: Box::new(source),
            assignments: node.assignments.clone(),
        }));
        Ok(current)
    }

    pub(crate) fn plan_sample(&mut self, node: &SampleNode) -> Result<FragmentBuilder> {
        let mut current = self.walk(&node.source)?;
        let source = current.take_root();
        current.set_root(LogicalOperator::Sample(SampleNode {
            id: node.id,
            source: Box::new(source),
            ratio: node.ratio,
            sample_type: node.sample_type,
            rescaled: node.rescaled,
            sample_weight_symbol: node.sample_weight_symbol.clone(),
        }));
        Ok(current)
    }

    pub(crate) fn plan_unnest(&mut self, node: &UnnestNode) -> Result<FragmentBuilder> {
        let mut current = self.walk(&node.source)?;
        let source = current.take_root();
        current.set_root(LogicalOperator::Unnest(UnnestNode {
            id: node.id,
            source: Box::new(source),
            replicate_symbols: node.replicate_symbols.clone(),
            unnest_symbols: node.unnest_symbols.clone(),
        }));
        Ok(current)
    }
}
