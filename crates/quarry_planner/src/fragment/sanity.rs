use std::collections::{BTreeSet, HashMap};

use quarry_error::{QuarryError, Result};

use crate::logical::operator::LogicalOperator;

use super::{OutputPartitioning, PlanDistribution, PlanFragmentId, SubPlan};

/// Validate a finished subplan.
///
/// Subplans own their children, so unique fragment ids are enough to rule
/// out cycles; the remaining checks cover exchange wiring, partitioning
/// compatibility, and symbol flow.
pub(crate) fn check_subplan(root: &SubPlan) -> Result<()> {
    let mut seen = BTreeSet::new();
    check_unique_ids(root, &mut seen)?;
    check_fragment(root)
}

fn check_unique_ids(subplan: &SubPlan, seen: &mut BTreeSet<PlanFragmentId>) -> Result<()> {
    if !seen.insert(subplan.fragment().id()) {
        return Err(QuarryError::new(format!(
            "Duplicate fragment id in subplan: {}",
            subplan.fragment().id()
        )));
    }
    for child in subplan.children() {
        check_unique_ids(child, seen)?;
    }
    Ok(())
}

fn check_fragment(subplan: &SubPlan) -> Result<()> {
    let fragment = subplan.fragment();

    let children_by_id: HashMap<PlanFragmentId, &SubPlan> = subplan
        .children()
        .iter()
        .map(|child| (child.fragment().id(), child))
        .collect();

    let mut referenced = BTreeSet::new();
    check_operator(fragment.root(), &children_by_id, &mut referenced)?;

    for child in subplan.children() {
        let child_fragment = child.fragment();
        if !referenced.contains(&child_fragment.id()) {
            return Err(QuarryError::new(format!(
                "Fragment {} has child {} that no exchange references",
                fragment.id(),
                child_fragment.id()
            )));
        }

        if !matches!(child_fragment.root(), LogicalOperator::Sink(_)) {
            return Err(QuarryError::new(format!(
                "Fragment {} is consumed by an exchange but is not terminated by a sink",
                child_fragment.id()
            )));
        }

        let expects_hash = fragment.distribution() == PlanDistribution::Fixed;
        match (expects_hash, child_fragment.output_partitioning()) {
            (true, OutputPartitioning::Hash { .. }) | (false, OutputPartitioning::None) => (),
            (true, OutputPartitioning::None) => {
                return Err(QuarryError::new(format!(
                    "Fragment {} feeds a FIXED fragment but has no hash partitioning",
                    child_fragment.id()
                )));
            }
            (false, OutputPartitioning::Hash { .. }) => {
                return Err(QuarryError::new(format!(
                    "Fragment {} is hash-partitioned but its consumer is not FIXED",
                    child_fragment.id()
                )));
            }
        }
    }

    for child in subplan.children() {
        check_fragment(child)?;
    }
    Ok(())
}

fn check_operator(
    op: &LogicalOperator,
    children_by_id: &HashMap<PlanFragmentId, &SubPlan>,
    referenced: &mut BTreeSet<PlanFragmentId>,
) -> Result<()> {
    if matches!(op, LogicalOperator::Invalid) {
        return Err(QuarryError::new("Invalid operator in sealed fragment"));
    }

    if let LogicalOperator::Exchange(exchange) = op {
        if exchange.source_fragments.is_empty() {
            return Err(QuarryError::new(
                "Exchange must reference at least one source fragment",
            ));
        }
        for id in &exchange.source_fragments {
            let child = children_by_id.get(id).ok_or_else(|| {
                QuarryError::new(format!(
                    "Exchange references fragment {id} that is not an attached child"
                ))
            })?;
            // Union sinks carry per-branch symbol names; only arity is
            // comparable across the boundary.
            let child_outputs = child.fragment().output_symbols();
            if child_outputs.len() != exchange.outputs.len() {
                return Err(QuarryError::new(format!(
                    "Exchange expects {} columns but fragment {id} produces {}",
                    exchange.outputs.len(),
                    child_outputs.len()
                )));
            }
            referenced.insert(*id);
        }
    }

    let children = op.children();
    let required = op.required_input_symbols();
    for (child, required) in children.iter().zip(required) {
        let outputs = child.output_symbols();
        for symbol in required {
            if !outputs.contains(&symbol) {
                return Err(QuarryError::new(format!(
                    "{} references symbol {symbol} which its input {} does not produce",
                    op.name(),
                    child.name()
                )));
            }
        }
    }
    for child in children {
        check_operator(child, children_by_id, referenced)?;
    }
    Ok(())
}
