use std::fmt::Write as _;

use quarry_error::{QuarryError, Result};
use serde::{Deserialize, Serialize};

use super::explainable::{ExplainConfig, ExplainEntry, Explainable};
use crate::fragment::SubPlan;
use crate::logical::operator::LogicalOperator;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplainNode {
    pub entry: ExplainEntry,
    pub children: Vec<ExplainNode>,
}

impl ExplainNode {
    pub fn walk_plan(config: ExplainConfig, plan: &LogicalOperator) -> Self {
        let entry = plan.explain_entry(config);
        let children = plan
            .children()
            .into_iter()
            .map(|child| Self::walk_plan(config, child))
            .collect();

        ExplainNode { entry, children }
    }
}

/// Formats explain output for plan trees and fragmented subplans.
#[derive(Debug, Clone, Copy)]
pub struct ExplainFormatter {
    config: ExplainConfig,
}

impl ExplainFormatter {
    pub fn new(config: ExplainConfig) -> Self {
        ExplainFormatter { config }
    }

    pub fn format_plan(&self, root: &LogicalOperator) -> Result<String> {
        let node = ExplainNode::walk_plan(self.config, root);
        let mut buf = String::new();
        Self::fmt_node(&node, 0, &mut buf)?;
        Ok(buf)
    }

    /// Render a subplan as one block per fragment, root fragment first,
    /// followed by its children in attach order.
    pub fn format_subplan(&self, subplan: &SubPlan) -> Result<String> {
        let mut buf = String::new();
        self.fmt_subplan(subplan, &mut buf)?;
        Ok(buf)
    }

    fn fmt_subplan(&self, subplan: &SubPlan, buf: &mut String) -> Result<()> {
        writeln!(buf, "{}", subplan.fragment().explain_entry(self.config))
            .map_err(|e| QuarryError::new(format!("Failed to write explain output: {e}")))?;
        let node = ExplainNode::walk_plan(self.config, subplan.fragment().root());
        Self::fmt_node(&node, 1, buf)?;
        for child in subplan.children() {
            self.fmt_subplan(child, buf)?;
        }
        Ok(())
    }

    fn fmt_node(node: &ExplainNode, indent: usize, buf: &mut String) -> Result<()> {
        writeln!(buf, "{}{}", "  ".repeat(indent), node.entry)
            .map_err(|e| QuarryError::new(format!("Failed to write explain output: {e}")))?;
        for child in &node.children {
            Self::fmt_node(child, indent + 1, buf)?;
        }
        Ok(())
    }
}
