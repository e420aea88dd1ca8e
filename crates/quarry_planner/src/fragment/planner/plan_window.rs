use quarry_error::Result;

use crate::fragment::builder::FragmentBuilder;
use crate::logical::logical_window::{RowNumberNode, TopNRowNumberNode, WindowNode};
use crate::logical::operator::LogicalOperator;

use super::FragmentBuildState;

impl FragmentBuildState<'_> {
    /// Window functions need all rows of a partition on one instance: no
    /// partition key means a global merge, otherwise a re-hash on the key.
    pub(crate) fn plan_window(&mut self, node: &WindowNode) -> Result<FragmentBuilder> {
        let mut current = self.walk(&node.source)?;

        if current.is_distributed() {
            current = if node.partition_by.is_empty() {
                self.merge_to_single_node(current)?
            } else {
                self.hash_distribute(
                    current,
                    node.partition_by.clone(),
                    node.hash_symbol.clone(),
                )?
            };
        }

        let source = current.take_root();
        current.set_root(LogicalOperator::Window(WindowNode {
            id: node.id,
            source: Box::new(source),
            partition_by: node.partition_by.clone(),
            order_by: node.order_by.clone(),
            functions: node.functions.clone(),
            hash_symbol: node.hash_symbol.clone(),
        }));

        Ok(current)
    }

    pub(crate) fn plan_row_number(&mut self, node: &RowNumberNode) -> Result<FragmentBuilder> {
        let mut current = self.walk(&node.source)?;

        if current.is_distributed() {
            current = if node.partition_by.is_empty() {
                self.merge_to_single_node(current)?
            } else {
                self.hash_distribute(
                    current,
                    node.partition_by.clone(),
                    node.hash_symbol.clone(),
                )?
            };
        }

        let source = current.take_root();
        current.set_root(LogicalOperator::RowNumber(RowNumberNode {
            id: node.id,
            source: Box::new(source),
            partition_by: node.partition_by.clone(),
            row_number_symbol: node.row_number_symbol.clone(),
            max_rows_per_partition: node.max_rows_per_partition,
            hash_symbol: node.hash_symbol.clone(),
        }));

        Ok(current)
    }

    /// Distributed TopNRowNumber first restricts each partition's rows
    /// locally, then re-ranks after the shuffle.
    pub(crate) fn plan_top_n_row_number(
        &mut self,
        node: &TopNRowNumberNode,
    ) -> Result<FragmentBuilder> {
        let mut current = self.walk(&node.source)?;

        if current.is_distributed() {
            let source = current.take_root();
            current.set_root(LogicalOperator::TopNRowNumber(TopNRowNumberNode {
                id: node.id,
                source: Box::new(source),
                partition_by: node.partition_by.clone(),
                order_by: node.order_by.clone(),
                row_number_symbol: node.row_number_symbol.clone(),
                max_rows_per_partition: node.max_rows_per_partition,
                partial: true,
                hash_symbol: node.hash_symbol.clone(),
            }));

            current = if node.partition_by.is_empty() {
                self.merge_to_single_node(current)?
            } else {
                self.hash_distribute(
                    current,
                    node.partition_by.clone(),
                    node.hash_symbol.clone(),
                )?
            };
        }

        let source = current.take_root();
        current.set_root(LogicalOperator::TopNRowNumber(TopNRowNumberNode {
            id: node.id,
            source: Box::new(source),
            partition_by: node.partition_by.clone(),
            order_by: node.order_by.clone(),
            row_number_symbol: node.row_number_symbol.clone(),
            max_rows_per_partition: node.max_rows_per_partition,
            partial: false,
            hash_symbol: node.hash_symbol.clone(),
        }));

        Ok(current)
    }
}
