use std::collections::BTreeMap;

use quarry_error::{QuarryError, Result};

use crate::expr::ScalarValue;

pub const BIG_QUERY_ENABLED: &str = "big_query_enabled";

/// Session variable bag.
///
/// Variables are declared with a default; setting an undeclared variable or
/// changing a variable's type is an error.
#[derive(Debug, Clone)]
pub struct SessionVars {
    vars: BTreeMap<String, ScalarValue>,
}

impl SessionVars {
    pub fn new() -> Self {
        let mut vars = BTreeMap::new();
        vars.insert(BIG_QUERY_ENABLED.to_string(), ScalarValue::Boolean(false));
        SessionVars { vars }
    }

    pub fn set(&mut self, name: &str, value: ScalarValue) -> Result<()> {
        let existing = self
            .vars
            .get_mut(name)
            .ok_or_else(|| QuarryError::new(format!("Unknown session variable: {name}")))?;
        if std::mem::discriminant(existing) != std::mem::discriminant(&value) {
            return Err(QuarryError::new(format!(
                "Invalid value for session variable {name}: {value}"
            )));
        }
        *existing = value;
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&ScalarValue> {
        self.vars
            .get(name)
            .ok_or_else(|| QuarryError::new(format!("Unknown session variable: {name}")))
    }

    pub fn get_bool(&self, name: &str) -> Result<bool> {
        match self.get(name)? {
            ScalarValue::Boolean(v) => Ok(*v),
            other => Err(QuarryError::new(format!(
                "Session variable {name} is not a boolean: {other}"
            ))),
        }
    }

    pub fn big_query_enabled(&self) -> bool {
        // Declared with a boolean default, so the lookup cannot fail.
        self.get_bool(BIG_QUERY_ENABLED).unwrap_or(false)
    }
}

impl Default for SessionVars {
    fn default() -> Self {
        Self::new()
    }
}

/// Planner options for a single fragmentation pass.
#[derive(Debug, Clone, Default)]
pub struct FragmentPlanConfig {
    /// Plan everything into non-distributed fragments.
    pub single_node: bool,
    /// Redistribute the probe side of index joins by the probe keys.
    pub distributed_index_joins: bool,
    /// Hash-redistribute both sides of equi joins instead of broadcasting
    /// the build side.
    pub distributed_joins: bool,
}
