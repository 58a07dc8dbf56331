//! Explain plan output
//!
//! Produces deterministic, human-readable and serializable plan descriptions.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use super::errors::PlanningError;
use super::planner::{QueryPlan, ScanType};
use super::selector::SelectedIndex;

/// Index use for one OR branch
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExplainBranch {
    pub index: String,
    /// Concrete indexes behind the handle, base first
    pub index_names: Vec<String>,
    pub chained: bool,
    pub operator: String,
    pub fields: Vec<String>,
    pub key_params: Vec<Value>,
}

impl ExplainBranch {
    fn from_selected(selected: &SelectedIndex) -> Self {
        let candidate = &selected.candidate;
        let mut fields: Vec<String> = candidate.field_value_pairs.keys().cloned().collect();
        fields.push(candidate.last_field.to_string());

        Self {
            index: selected.index.name().to_string(),
            index_names: selected.index.index_names(),
            chained: selected.index.is_chained(),
            operator: candidate.last_operator.symbol().to_string(),
            fields,
            key_params: selected.key_params.clone(),
        }
    }
}

/// Explain plan output
#[derive(Debug, Clone, Serialize)]
pub struct ExplainPlan {
    /// Whether planning succeeded
    pub accepted: bool,
    pub class: Option<String>,
    /// Condition after range rewriting
    pub condition: Option<String>,
    pub scan_type: Option<String>,
    pub branches: Vec<ExplainBranch>,
    /// Why no index is used (full scans only)
    pub full_scan_reason: Option<String>,
    pub rejection_reason: Option<String>,
    pub rejection_code: Option<String>,
}

impl ExplainPlan {
    /// Creates an explain plan from a query plan
    pub fn from_plan(plan: &QueryPlan) -> Self {
        let full_scan_reason = match &plan.scan {
            ScanType::FullScan { reason } => Some(reason.clone()),
            ScanType::Index(_) => None,
        };

        Self {
            accepted: true,
            class: Some(plan.class.clone()),
            condition: plan.condition.as_ref().map(ToString::to_string),
            scan_type: Some(plan.scan.as_str().to_string()),
            branches: plan.branches().iter().map(ExplainBranch::from_selected).collect(),
            full_scan_reason,
            rejection_reason: None,
            rejection_code: None,
        }
    }

    /// Creates an explain plan from a planning error
    pub fn from_error(err: &PlanningError) -> Self {
        Self {
            accepted: false,
            class: None,
            condition: None,
            scan_type: None,
            branches: Vec::new(),
            full_scan_reason: None,
            rejection_reason: Some(err.to_string()),
            rejection_code: Some(err.code().to_string()),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}

impl fmt::Display for ExplainPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== EXPLAIN PLAN ===")?;

        if !self.accepted {
            writeln!(f, "Status: REJECTED")?;
            if let Some(code) = &self.rejection_code {
                writeln!(f, "Error Code: {}", code)?;
            }
            if let Some(reason) = &self.rejection_reason {
                writeln!(f, "Reason: {}", reason)?;
            }
            return Ok(());
        }

        writeln!(f, "Status: ACCEPTED")?;
        if let Some(class) = &self.class {
            writeln!(f, "Class: {}", class)?;
        }
        if let Some(condition) = &self.condition {
            writeln!(f, "Condition: {}", condition)?;
        }
        if let Some(scan) = &self.scan_type {
            writeln!(f, "Scan Type: {}", scan)?;
        }
        if let Some(reason) = &self.full_scan_reason {
            writeln!(f, "Reason: {}", reason)?;
        }
        for (i, branch) in self.branches.iter().enumerate() {
            writeln!(f, "Branch {}:", i)?;
            writeln!(f, "  Index: {}", branch.index)?;
            if branch.chained {
                writeln!(f, "  Chain: {}", branch.index_names.join(" <- "))?;
            }
            writeln!(f, "  Operator: {}", branch.operator)?;
            writeln!(f, "  Fields: {}", branch.fields.join(", "))?;
            let params: Vec<String> = branch.key_params.iter().map(Value::to_string).collect();
            writeln!(f, "  Key: [{}]", params.join(", "))?;
        }

        Ok(())
    }
}
