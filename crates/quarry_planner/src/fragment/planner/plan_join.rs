use quarry_error::{QuarryError, Result};

use crate::fragment::builder::FragmentBuilder;
use crate::logical::logical_exchange::ExchangeNode;
use crate::logical::logical_join::{IndexJoinNode, JoinNode, JoinType, SemiJoinNode};
use crate::logical::operator::LogicalOperator;
use crate::symbol::Symbol;

use super::FragmentBuildState;

impl FragmentBuildState<'_> {
    /// The build side is sealed and shipped to the probe side. With
    /// `distributed_joins` both sides are re-hashed by their join keys so
    /// matching rows co-locate.
    pub(crate) fn plan_join(&mut self, node: &JoinNode) -> Result<FragmentBuilder> {
        let mut left = self.walk(&node.left)?;
        let mut right = self.walk(&node.right)?;

        if left.is_distributed() || right.is_distributed() {
            let left_symbols: Vec<Symbol> =
                node.criteria.iter().map(|c| c.left.clone()).collect();
            let right_symbols: Vec<Symbol> =
                node.criteria.iter().map(|c| c.right.clone()).collect();

            match node.join_type {
                JoinType::Inner | JoinType::Left => {
                    self.cap_with_sink(&mut right);
                    if self.config.distributed_joins {
                        right.set_hash_output_partitioning(
                            right_symbols,
                            node.right_hash_symbol.clone(),
                        )?;
                        left = self.hash_distribute(
                            left,
                            left_symbols,
                            node.left_hash_symbol.clone(),
                        )?;
                    }

                    let exchange = LogicalOperator::Exchange(ExchangeNode {
                        id: self.node_ids.next_id(),
                        source_fragments: vec![right.id()],
                        outputs: right.root().output_symbols(),
                    });
                    let left_root = left.take_root();
                    left.set_root(LogicalOperator::Join(JoinNode {
                        id: node.id,
                        join_type: node.join_type,
                        left: Box::new(left_root),
                        right: Box::new(exchange),
                        criteria: node.criteria.clone(),
                        left_hash_symbol: node.left_hash_symbol.clone(),
                        right_hash_symbol: node.right_hash_symbol.clone(),
                    }));
                    left.add_child(right.build()?)?;

                    Ok(left)
                }
                JoinType::Right => {
                    self.cap_with_sink(&mut left);
                    if self.config.distributed_joins {
                        left.set_hash_output_partitioning(
                            left_symbols,
                            node.left_hash_symbol.clone(),
                        )?;
                        right = self.hash_distribute(
                            right,
                            right_symbols,
                            node.right_hash_symbol.clone(),
                        )?;
                    }

                    let exchange = LogicalOperator::Exchange(ExchangeNode {
                        id: self.node_ids.next_id(),
                        source_fragments: vec![left.id()],
                        outputs: left.root().output_symbols(),
                    });
                    let right_root = right.take_root();
                    right.set_root(LogicalOperator::Join(JoinNode {
                        id: node.id,
                        join_type: node.join_type,
                        left: Box::new(exchange),
                        right: Box::new(right_root),
                        criteria: node.criteria.clone(),
                        left_hash_symbol: node.left_hash_symbol.clone(),
                        right_hash_symbol: node.right_hash_symbol.clone(),
                    }));
                    right.add_child(left.build()?)?;

                    Ok(right)
                }
                other => Err(QuarryError::new(format!("Unsupported join type: {other}"))),
            }
        } else {
            let left_root = left.take_root();
            let right_root = right.take_root();
            let join = LogicalOperator::Join(JoinNode {
                id: node.id,
                join_type: node.join_type,
                left: Box::new(left_root),
                right: Box::new(right_root),
                criteria: node.criteria.clone(),
                left_hash_symbol: node.left_hash_symbol.clone(),
                right_hash_symbol: node.right_hash_symbol.clone(),
            });

            let mut builder = self.single_node_fragment(join);
            builder.set_children(
                left.into_children()
                    .into_iter()
                    .chain(right.into_children()),
            )?;
            Ok(builder)
        }
    }

    /// The filtering side is sealed and broadcast to wherever source rows
    /// live.
    pub(crate) fn plan_semi_join(&mut self, node: &SemiJoinNode) -> Result<FragmentBuilder> {
        let mut source = self.walk(&node.source)?;
        let mut filtering = self.walk(&node.filtering_source)?;

        if source.is_distributed() || filtering.is_distributed() {
            self.cap_with_sink(&mut filtering);

            let exchange = LogicalOperator::Exchange(ExchangeNode {
                id: self.node_ids.next_id(),
                source_fragments: vec![filtering.id()],
                outputs: filtering.root().output_symbols(),
            });
            let source_root = source.take_root();
            source.set_root(LogicalOperator::SemiJoin(SemiJoinNode {
                id: node.id,
                source: Box::new(source_root),
                filtering_source: Box::new(exchange),
                source_join_symbol: node.source_join_symbol.clone(),
                filtering_source_join_symbol: node.filtering_source_join_symbol.clone(),
                semi_join_output: node.semi_join_output.clone(),
                source_hash_symbol: node.source_hash_symbol.clone(),
                filtering_source_hash_symbol: node.filtering_source_hash_symbol.clone(),
            }));
            source.add_child(filtering.build()?)?;

            Ok(source)
        } else {
            let source_root = source.take_root();
            let filtering_root = filtering.take_root();
            let semi_join = LogicalOperator::SemiJoin(SemiJoinNode {
                id: node.id,
                source: Box::new(source_root),
                filtering_source: Box::new(filtering_root),
                source_join_symbol: node.source_join_symbol.clone(),
                filtering_source_join_symbol: node.filtering_source_join_symbol.clone(),
                semi_join_output: node.semi_join_output.clone(),
                source_hash_symbol: node.source_hash_symbol.clone(),
                filtering_source_hash_symbol: node.filtering_source_hash_symbol.clone(),
            });

            let mut builder = self.single_node_fragment(semi_join);
            builder.set_children(
                source
                    .into_children()
                    .into_iter()
                    .chain(filtering.into_children()),
            )?;
            Ok(builder)
        }
    }

    /// Only the probe side is fragmented; the index side is a per-row
    /// lookup plan carried along unchanged.
    pub(crate) fn plan_index_join(&mut self, node: &IndexJoinNode) -> Result<FragmentBuilder> {
        let mut current = self.walk(&node.probe_source)?;

        if self.config.distributed_index_joins && current.is_distributed() {
            self.cap_with_sink(&mut current);
            current.set_hash_output_partitioning(
                node.criteria.iter().map(|c| c.probe.clone()).collect(),
                node.probe_hash_symbol.clone(),
            )?;

            let exchange = self.exchange_for(&current);
            let index_join = LogicalOperator::IndexJoin(IndexJoinNode {
                id: node.id,
                join_type: node.join_type,
                probe_source: Box::new(exchange),
                index_source: node.index_source.clone(),
                criteria: node.criteria.clone(),
                probe_hash_symbol: node.probe_hash_symbol.clone(),
                index_hash_symbol: node.index_hash_symbol.clone(),
            });

            let mut parent = self.fixed_fragment(index_join);
            parent.add_child(current.build()?)?;
            Ok(parent)
        } else {
            let probe_root = current.take_root();
            current.set_root(LogicalOperator::IndexJoin(IndexJoinNode {
                id: node.id,
                join_type: node.join_type,
                probe_source: Box::new(probe_root),
                index_source: node.index_source.clone(),
                criteria: node.criteria.clone(),
                probe_hash_symbol: node.probe_hash_symbol.clone(),
                index_hash_symbol: node.index_hash_symbol.clone(),
            }));
            Ok(current)
        }
    }
}
