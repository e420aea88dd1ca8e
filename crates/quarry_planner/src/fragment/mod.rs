pub mod builder;
pub mod planner;

mod sanity;

use std::fmt;

use quarry_error::Result;

use crate::explain::explainable::{ExplainConfig, ExplainEntry, Explainable};
use crate::logical::operator::{LogicalOperator, PlanNodeId};
use crate::symbol::Symbol;

/// ID of a single plan fragment.
///
/// Unique within a query. Assigned in fragment creation order, which is
/// stable for a given input plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PlanFragmentId(pub usize);

impl fmt::Display for PlanFragmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How many and which kinds of workers run a fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanDistribution {
    /// Reads a partitioned base table; parallelism follows the source splits.
    Source,
    /// Hash-partitioned across a configurable number of workers.
    Fixed,
    /// Exactly one instance, on the coordinator.
    CoordinatorOnly,
    /// Exactly one instance, on any worker.
    Single,
}

impl PlanDistribution {
    pub const fn is_distributed(&self) -> bool {
        matches!(self, Self::Source | Self::Fixed)
    }
}

impl fmt::Display for PlanDistribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Source => write!(f, "SOURCE"),
            Self::Fixed => write!(f, "FIXED"),
            Self::CoordinatorOnly => write!(f, "COORDINATOR_ONLY"),
            Self::Single => write!(f, "SINGLE"),
        }
    }
}

/// How a fragment's sink distributes rows to the consuming exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputPartitioning {
    None,
    Hash {
        partition_by: Vec<Symbol>,
        hash_symbol: Option<Symbol>,
    },
}

impl OutputPartitioning {
    pub const fn is_hash(&self) -> bool {
        matches!(self, Self::Hash { .. })
    }
}

impl fmt::Display for OutputPartitioning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "NONE"),
            Self::Hash { partition_by, .. } => {
                write!(f, "HASH(")?;
                for (idx, symbol) in partition_by.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{symbol}")?;
                }
                write!(f, ")")
            }
        }
    }
}

/// A sealed fragment: a maximal operator subtree executed together.
#[derive(Debug, Clone)]
pub struct PlanFragment {
    id: PlanFragmentId,
    root: LogicalOperator,
    distribution: PlanDistribution,
    output_partitioning: OutputPartitioning,
    partitioned_source: Option<PlanNodeId>,
}

impl PlanFragment {
    pub(crate) fn new(
        id: PlanFragmentId,
        root: LogicalOperator,
        distribution: PlanDistribution,
        output_partitioning: OutputPartitioning,
        partitioned_source: Option<PlanNodeId>,
    ) -> Self {
        PlanFragment {
            id,
            root,
            distribution,
            output_partitioning,
            partitioned_source,
        }
    }

    pub fn id(&self) -> PlanFragmentId {
        self.id
    }

    pub fn root(&self) -> &LogicalOperator {
        &self.root
    }

    pub fn distribution(&self) -> PlanDistribution {
        self.distribution
    }

    pub fn output_partitioning(&self) -> &OutputPartitioning {
        &self.output_partitioning
    }

    /// Scan node driving this fragment's parallelism, if any.
    pub fn partitioned_source(&self) -> Option<PlanNodeId> {
        self.partitioned_source
    }

    pub fn output_symbols(&self) -> Vec<Symbol> {
        self.root.output_symbols()
    }
}

impl Explainable for PlanFragment {
    fn explain_entry(&self, conf: ExplainConfig) -> ExplainEntry {
        let mut ent = ExplainEntry::new("Fragment")
            .with_value("id", self.id)
            .with_value("distribution", self.distribution)
            .with_value("output_partitioning", &self.output_partitioning);
        if conf.verbose {
            if let Some(source) = self.partitioned_source {
                ent = ent.with_value("partitioned_source", source);
            }
        }
        ent
    }
}

/// A fragment plus its transitive children: the output of the fragmenter.
#[derive(Debug, Clone)]
pub struct SubPlan {
    fragment: PlanFragment,
    children: Vec<SubPlan>,
}

impl SubPlan {
    pub(crate) fn new(fragment: PlanFragment, children: Vec<SubPlan>) -> Self {
        SubPlan { fragment, children }
    }

    pub fn fragment(&self) -> &PlanFragment {
        &self.fragment
    }

    pub fn children(&self) -> &[SubPlan] {
        &self.children
    }

    /// All fragments reachable from this subplan, root first.
    pub fn flatten(&self) -> Vec<&PlanFragment> {
        let mut fragments = vec![&self.fragment];
        for child in &self.children {
            fragments.extend(child.flatten());
        }
        fragments
    }

    pub fn fragment_count(&self) -> usize {
        1 + self.children.iter().map(SubPlan::fragment_count).sum::<usize>()
    }

    /// Validate the fragment graph: exchange wiring, partitioning
    /// compatibility, id uniqueness, and symbol flow. Failure indicates a bug
    /// in a rewrite rule.
    pub fn sanity_check(&self) -> Result<()> {
        sanity::check_subplan(self)
    }
}
