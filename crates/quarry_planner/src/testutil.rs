//! Plan-construction helpers for fragmenter tests.

use quarry_error::Result;

use crate::config::{FragmentPlanConfig, SessionVars};
use crate::datatype::DataType;
use crate::expr::{Expression, FunctionCall, ScalarValue};
use crate::fragment::planner::FragmentPlanner;
use crate::fragment::SubPlan;
use crate::functions::{Signature, SystemCatalog};
use crate::logical::logical_aggregate::{Aggregate, AggregationNode, AggregationStep};
use crate::logical::logical_output::OutputNode;
use crate::logical::logical_scan::{TableScanNode, ValuesNode};
use crate::logical::operator::{LogicalOperator, PlanNodeIdAllocator};
use crate::symbol::{Symbol, SymbolAllocator};

/// Builds input plans through the same allocators the fragmenter continues
/// from, the way the logical planner would.
pub(crate) struct PlanBuilder {
    pub symbols: SymbolAllocator,
    pub node_ids: PlanNodeIdAllocator,
}

impl PlanBuilder {
    pub fn new() -> Self {
        PlanBuilder {
            symbols: SymbolAllocator::new(),
            node_ids: PlanNodeIdAllocator::new(),
        }
    }

    pub fn scan(&mut self, table: &str, columns: &[(&str, DataType)]) -> LogicalOperator {
        let columns = columns
            .iter()
            .map(|(name, datatype)| {
                (self.symbols.new_symbol(name, *datatype), (*name).to_string())
            })
            .collect();
        LogicalOperator::TableScan(TableScanNode {
            id: self.node_ids.next_id(),
            table: table.to_string(),
            columns,
        })
    }

    pub fn values(&mut self, columns: &[(&str, DataType)]) -> LogicalOperator {
        let outputs = columns
            .iter()
            .map(|(name, datatype)| self.symbols.new_symbol(name, *datatype))
            .collect();
        LogicalOperator::Values(ValuesNode {
            id: self.node_ids.next_id(),
            outputs,
            rows: Vec::new(),
        })
    }

    pub fn output(&mut self, source: LogicalOperator) -> LogicalOperator {
        let outputs = source.output_symbols();
        let column_names = outputs.iter().map(|s| s.name().to_string()).collect();
        LogicalOperator::Output(OutputNode {
            id: self.node_ids.next_id(),
            source: Box::new(source),
            column_names,
            outputs,
        })
    }

    pub fn aggregation(
        &mut self,
        source: LogicalOperator,
        group_by: Vec<Symbol>,
        aggregates: Vec<Aggregate>,
    ) -> LogicalOperator {
        LogicalOperator::Aggregation(AggregationNode {
            id: self.node_ids.next_id(),
            source: Box::new(source),
            group_by,
            aggregates,
            step: AggregationStep::Single,
            sample_weight: None,
            confidence: 1.0,
            hash_symbol: None,
        })
    }

    pub fn count_star(&mut self) -> Aggregate {
        Aggregate {
            output: self.symbols.new_symbol("count", DataType::Int64),
            call: FunctionCall::new("count", Vec::new()),
            signature: Signature::new("count", Vec::new(), DataType::Int64),
            mask: None,
        }
    }

    pub fn sum(&mut self, input: &Symbol) -> Aggregate {
        Aggregate {
            output: self.symbols.new_symbol("sum", DataType::Int64),
            call: FunctionCall::over_column("sum", input.clone()),
            signature: Signature::new("sum", vec![DataType::Int64], DataType::Int64),
            mask: None,
        }
    }

    pub fn approx_percentile(&mut self, input: &Symbol) -> Aggregate {
        Aggregate {
            output: self.symbols.new_symbol("approx_percentile", DataType::Float64),
            call: FunctionCall::new(
                "approx_percentile",
                vec![
                    Expression::Column(input.clone()),
                    Expression::Literal(ScalarValue::Float64(0.5)),
                ],
            ),
            signature: Signature::new(
                "approx_percentile",
                vec![DataType::Float64, DataType::Float64],
                DataType::Float64,
            ),
            mask: None,
        }
    }
}

pub(crate) fn fragment(
    plan: &LogicalOperator,
    builder: &mut PlanBuilder,
    config: &FragmentPlanConfig,
) -> Result<SubPlan> {
    fragment_with_session(&SessionVars::new(), plan, builder, config)
}

pub(crate) fn fragment_with_session(
    session: &SessionVars,
    plan: &LogicalOperator,
    builder: &mut PlanBuilder,
    config: &FragmentPlanConfig,
) -> Result<SubPlan> {
    let catalog = SystemCatalog::with_builtins();
    FragmentPlanner::new(session, &catalog).plan(
        plan,
        config,
        &mut builder.symbols,
        &mut builder.node_ids,
    )
}
