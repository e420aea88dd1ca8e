use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;
use quarry_error::{QuarryError, Result};

use crate::datatype::DataType;

/// Resolved signature of an aggregate call: name plus exact argument types.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature {
    pub name: String,
    pub arg_types: Vec<DataType>,
    pub return_type: DataType,
}

impl Signature {
    pub fn new(name: impl Into<String>, arg_types: Vec<DataType>, return_type: DataType) -> Self {
        Signature {
            name: name.into(),
            arg_types,
            return_type,
        }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (idx, arg) in self.arg_types.iter().enumerate() {
            if idx > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{arg}")?;
        }
        write!(f, "):{}", self.return_type)
    }
}

/// Catalog entry for an aggregate function.
#[derive(Debug, Clone)]
pub struct AggregateFunctionInfo {
    name: &'static str,
    signature: Signature,
    /// Type of the per-partition state shipped to the final stage, if the
    /// function has one.
    intermediate_type: Option<DataType>,
    /// Whether the combiner over intermediate states is associative.
    associative: bool,
}

impl AggregateFunctionInfo {
    pub fn new(
        name: &'static str,
        arg_types: Vec<DataType>,
        return_type: DataType,
        intermediate_type: Option<DataType>,
        associative: bool,
    ) -> Self {
        AggregateFunctionInfo {
            name,
            signature: Signature::new(name, arg_types, return_type),
            intermediate_type,
            associative,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// An aggregate decomposes into partial + final stages iff it has an
    /// intermediate type and an associative combiner over it.
    pub fn is_decomposable(&self) -> bool {
        self.intermediate_type.is_some() && self.associative
    }

    pub fn intermediate_type(&self) -> Result<DataType> {
        self.intermediate_type.ok_or_else(|| {
            QuarryError::new(format!("No intermediate type for function: {}", self.name))
        })
    }
}

/// Read-only function metadata consulted during planning.
pub trait FunctionCatalog: fmt::Debug {
    fn resolve_aggregate(&self, signature: &Signature) -> Result<&AggregateFunctionInfo>;
}

static BUILTIN_AGGREGATES: Lazy<Vec<AggregateFunctionInfo>> = Lazy::new(|| {
    use crate::datatype::DataType::*;
    vec![
        AggregateFunctionInfo::new("count", vec![], Int64, Some(Int64), true),
        AggregateFunctionInfo::new("count", vec![Int64], Int64, Some(Int64), true),
        AggregateFunctionInfo::new("count", vec![Utf8], Int64, Some(Int64), true),
        AggregateFunctionInfo::new("sum", vec![Int64], Int64, Some(Int64), true),
        AggregateFunctionInfo::new("sum", vec![Float64], Float64, Some(Float64), true),
        AggregateFunctionInfo::new("avg", vec![Int64], Float64, Some(Binary), true),
        AggregateFunctionInfo::new("avg", vec![Float64], Float64, Some(Binary), true),
        AggregateFunctionInfo::new("min", vec![Int64], Int64, Some(Int64), true),
        AggregateFunctionInfo::new("max", vec![Int64], Int64, Some(Int64), true),
        AggregateFunctionInfo::new("min", vec![Float64], Float64, Some(Float64), true),
        AggregateFunctionInfo::new("max", vec![Float64], Float64, Some(Float64), true),
        AggregateFunctionInfo::new("min", vec![Utf8], Utf8, Some(Utf8), true),
        AggregateFunctionInfo::new("max", vec![Utf8], Utf8, Some(Utf8), true),
        // Quantile sketch merge is order-sensitive, no partial stage.
        AggregateFunctionInfo::new("approx_percentile", vec![Float64, Float64], Float64, None, false),
    ]
});

/// In-memory function catalog seeded with the builtin aggregates.
#[derive(Debug, Clone)]
pub struct SystemCatalog {
    aggregates: HashMap<Signature, AggregateFunctionInfo>,
}

impl SystemCatalog {
    pub fn with_builtins() -> Self {
        let mut catalog = SystemCatalog {
            aggregates: HashMap::new(),
        };
        for info in BUILTIN_AGGREGATES.iter() {
            catalog.register_aggregate(info.clone());
        }
        catalog
    }

    pub fn register_aggregate(&mut self, info: AggregateFunctionInfo) {
        self.aggregates.insert(info.signature().clone(), info);
    }
}

impl FunctionCatalog for SystemCatalog {
    fn resolve_aggregate(&self, signature: &Signature) -> Result<&AggregateFunctionInfo> {
        self.aggregates
            .get(signature)
            .ok_or_else(|| QuarryError::new(format!("Unknown function: {signature}")))
    }
}
