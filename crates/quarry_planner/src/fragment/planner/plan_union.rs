use quarry_error::Result;

use crate::fragment::builder::FragmentBuilder;
use crate::logical::logical_exchange::{ExchangeNode, SinkNode};
use crate::logical::logical_setop::UnionNode;
use crate::logical::operator::LogicalOperator;

use super::FragmentBuildState;

impl FragmentBuildState<'_> {
    /// Distributed union seals every branch and meets them at a single
    /// multi-input exchange. Branch sinks emit the branch's symbols ordered
    /// to line up with the union's outputs.
    pub(crate) fn plan_union(&mut self, node: &UnionNode) -> Result<FragmentBuilder> {
        if self.config.single_node {
            let mut sources = Vec::with_capacity(node.sources.len());
            for source in &node.sources {
                let mut built = self.walk(source)?;
                sources.push(built.take_root());
            }
            let union = LogicalOperator::Union(UnionNode {
                id: node.id,
                sources,
                mappings: node.mappings.clone(),
            });
            Ok(self.single_node_fragment(union))
        } else {
            let mut fragment_ids = Vec::with_capacity(node.sources.len());
            let mut children = Vec::with_capacity(node.sources.len());
            for (idx, source) in node.sources.iter().enumerate() {
                let mut built = self.walk(source)?;
                let root = built.take_root();
                built.set_root(LogicalOperator::Sink(SinkNode {
                    id: self.node_ids.next_id(),
                    source: Box::new(root),
                    outputs: node.source_output_layout(idx),
                }));
                fragment_ids.push(built.id());
                children.push(built.build()?);
            }

            let exchange = LogicalOperator::Exchange(ExchangeNode {
                id: self.node_ids.next_id(),
                source_fragments: fragment_ids,
                outputs: node.output_symbols(),
            });
            let mut builder = self.single_node_fragment(exchange);
            builder.set_children(children)?;
            Ok(builder)
        }
    }
}
