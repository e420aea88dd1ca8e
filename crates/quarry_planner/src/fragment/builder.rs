use quarry_error::{QuarryError, Result};

use crate::logical::operator::{LogicalOperator, PlanNodeId};
use crate::symbol::Symbol;

use super::{OutputPartitioning, PlanDistribution, PlanFragment, PlanFragmentId, SubPlan};

/// Mutable accumulator for one open fragment.
///
/// The root is replaced monotonically as rules wrap it in new operators.
/// Sealed child subplans only accumulate. `build` consumes the builder;
/// sealed fragments are immutable.
#[derive(Debug)]
pub struct FragmentBuilder {
    id: PlanFragmentId,
    distribution: PlanDistribution,
    root: LogicalOperator,
    partitioned_source: Option<PlanNodeId>,
    children: Vec<SubPlan>,
    output_partitioning: OutputPartitioning,
}

impl FragmentBuilder {
    fn new(
        id: PlanFragmentId,
        distribution: PlanDistribution,
        root: LogicalOperator,
        partitioned_source: Option<PlanNodeId>,
    ) -> Self {
        FragmentBuilder {
            id,
            distribution,
            root,
            partitioned_source,
            children: Vec::new(),
            output_partitioning: OutputPartitioning::None,
        }
    }

    pub fn single_node(id: PlanFragmentId, root: LogicalOperator) -> Self {
        Self::new(id, PlanDistribution::Single, root, None)
    }

    pub fn fixed(id: PlanFragmentId, root: LogicalOperator) -> Self {
        Self::new(id, PlanDistribution::Fixed, root, None)
    }

    pub fn coordinator_only(id: PlanFragmentId, root: LogicalOperator) -> Self {
        Self::new(id, PlanDistribution::CoordinatorOnly, root, None)
    }

    pub fn source(id: PlanFragmentId, root: LogicalOperator, source_id: PlanNodeId) -> Self {
        Self::new(id, PlanDistribution::Source, root, Some(source_id))
    }

    /// Single-instance fragment that still records which scan drives it.
    /// Used when single-node mode plans over a partitioned table.
    pub fn single_node_source(
        id: PlanFragmentId,
        root: LogicalOperator,
        source_id: PlanNodeId,
    ) -> Self {
        Self::new(id, PlanDistribution::Single, root, Some(source_id))
    }

    pub fn id(&self) -> PlanFragmentId {
        self.id
    }

    pub fn distribution(&self) -> PlanDistribution {
        self.distribution
    }

    pub fn is_distributed(&self) -> bool {
        self.distribution.is_distributed()
    }

    pub fn root(&self) -> &LogicalOperator {
        &self.root
    }

    /// Detach the current root, leaving the builder rootless until the next
    /// `set_root`. `build` rejects a builder left in this state.
    pub fn take_root(&mut self) -> LogicalOperator {
        std::mem::replace(&mut self.root, LogicalOperator::Invalid)
    }

    /// Replace the root. The new root's input subtree is expected to hang off
    /// the previous root or an inserted exchange; the subplan sanity check
    /// verifies the result.
    pub fn set_root(&mut self, root: LogicalOperator) -> &mut Self {
        self.root = root;
        self
    }

    /// Record that this fragment's sink hash-partitions its rows.
    ///
    /// Every partition symbol must be produced by the current root. May be
    /// called again before sealing; the last call wins.
    pub fn set_hash_output_partitioning(
        &mut self,
        partition_by: Vec<Symbol>,
        hash_symbol: Option<Symbol>,
    ) -> Result<&mut Self> {
        if partition_by.is_empty() {
            return Err(QuarryError::new(
                "Hash output partitioning requires at least one partition symbol",
            ));
        }
        let outputs = self.root.output_symbols();
        for symbol in partition_by.iter().chain(hash_symbol.iter()) {
            if !outputs.contains(symbol) {
                return Err(QuarryError::new(format!(
                    "Partition symbol {symbol} is not an output of the fragment root"
                )));
            }
        }
        self.output_partitioning = OutputPartitioning::Hash {
            partition_by,
            hash_symbol,
        };
        Ok(self)
    }

    pub fn output_partitioning(&self) -> &OutputPartitioning {
        &self.output_partitioning
    }

    /// Attach a sealed child fragment.
    pub fn add_child(&mut self, child: SubPlan) -> Result<&mut Self> {
        if self
            .children
            .iter()
            .any(|existing| existing.fragment().id() == child.fragment().id())
        {
            return Err(QuarryError::new(format!(
                "Duplicate child fragment: {}",
                child.fragment().id()
            )));
        }
        self.children.push(child);
        Ok(self)
    }

    /// Replace the child list.
    pub fn set_children(&mut self, children: impl IntoIterator<Item = SubPlan>) -> Result<&mut Self> {
        self.children.clear();
        for child in children {
            self.add_child(child)?;
        }
        Ok(self)
    }

    pub fn children(&self) -> &[SubPlan] {
        &self.children
    }

    /// Detach the sealed children, consuming the builder.
    pub fn into_children(self) -> Vec<SubPlan> {
        self.children
    }

    /// Seal the fragment.
    pub fn build(self) -> Result<SubPlan> {
        if matches!(self.root, LogicalOperator::Invalid) {
            return Err(QuarryError::new(format!(
                "Fragment {} sealed without a root",
                self.id
            )));
        }
        let fragment = PlanFragment::new(
            self.id,
            self.root,
            self.distribution,
            self.output_partitioning,
            self.partitioned_source,
        );
        Ok(SubPlan::new(fragment, self.children))
    }
}
