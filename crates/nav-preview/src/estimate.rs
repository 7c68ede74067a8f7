//! Computed tax estimate
//!
//! Produced only from a successful calculator response and never mutated
//! afterwards. Responses are validated at the boundary so that a payload
//! with missing or non-finite figures is rejected instead of displayed.

use crate::error::CalculatorError;
use serde::{Deserialize, Serialize};

/// Federal figures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FederalEstimate {
    /// Adjusted gross income
    pub adjusted_gross_income: f64,
    /// Taxable income after deductions
    pub taxable_income: f64,
    /// Income tax before credits
    pub income_tax: f64,
    /// Earned income tax credit
    pub earned_income_credit: f64,
    /// Child tax credit
    pub child_tax_credit: f64,
    /// Refund (positive) or balance due (negative)
    pub net_refund: f64,
}

/// State and local figures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateEstimate {
    /// Two-letter state code
    pub state: String,
    /// County used for the local rate
    #[serde(default)]
    pub county: Option<String>,
    /// State income tax
    pub state_tax: f64,
    /// County / local income tax
    pub local_tax: f64,
    /// State earned income credit
    pub state_earned_income_credit: f64,
    /// Refund (positive) or balance due (negative)
    pub net_refund: f64,
}

/// Policy reference supporting part of the estimate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyCitation {
    /// Short title
    pub title: String,
    /// Statute or regulation reference
    pub reference: String,
    /// Link to the source text
    #[serde(default)]
    pub url: Option<String>,
}

/// Snapshot produced by the calculation service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimateResult {
    /// Federal figures
    pub federal: FederalEstimate,
    /// State figures
    pub state: StateEstimate,
    /// Human-readable calculation steps, in order
    #[serde(default)]
    pub breakdown: Vec<String>,
    /// Supporting policy references, in order
    #[serde(default)]
    pub citations: Vec<PolicyCitation>,
}

impl EstimateResult {
    /// Parse and validate a response body
    ///
    /// # Errors
    /// - `CalculatorError::Malformed` if the body is not an estimate or
    ///   fails validation
    pub fn from_json_slice(body: &[u8]) -> Result<Self, CalculatorError> {
        let estimate: Self = serde_json::from_slice(body)
            .map_err(|e| CalculatorError::malformed(e.to_string()))?;
        estimate.validate()?;
        Ok(estimate)
    }

    /// Check figures and text fields
    ///
    /// # Errors
    /// - `CalculatorError::Malformed` naming the first offending field
    pub fn validate(&self) -> Result<(), CalculatorError> {
        let figures = [
            ("federal.adjustedGrossIncome", self.federal.adjusted_gross_income),
            ("federal.taxableIncome", self.federal.taxable_income),
            ("federal.incomeTax", self.federal.income_tax),
            ("federal.earnedIncomeCredit", self.federal.earned_income_credit),
            ("federal.childTaxCredit", self.federal.child_tax_credit),
            ("federal.netRefund", self.federal.net_refund),
            ("state.stateTax", self.state.state_tax),
            ("state.localTax", self.state.local_tax),
            ("state.stateEarnedIncomeCredit", self.state.state_earned_income_credit),
            ("state.netRefund", self.state.net_refund),
        ];
        if let Some((name, _)) = figures.iter().find(|(_, v)| !v.is_finite()) {
            return Err(CalculatorError::malformed(format!("{name} is not a finite number")));
        }

        let credits = [
            ("federal.earnedIncomeCredit", self.federal.earned_income_credit),
            ("federal.childTaxCredit", self.federal.child_tax_credit),
            ("state.stateEarnedIncomeCredit", self.state.state_earned_income_credit),
        ];
        if let Some((name, _)) = credits.iter().find(|(_, v)| *v < 0.0) {
            return Err(CalculatorError::malformed(format!("{name} is negative")));
        }

        if self.state.state.trim().is_empty() {
            return Err(CalculatorError::malformed("state code is empty"));
        }
        if let Some(idx) = self.breakdown.iter().position(|s| s.trim().is_empty()) {
            return Err(CalculatorError::malformed(format!("breakdown[{idx}] is empty")));
        }
        if let Some(idx) = self.citations.iter().position(|c| c.title.trim().is_empty()) {
            return Err(CalculatorError::malformed(format!("citations[{idx}] has no title")));
        }
        Ok(())
    }

    /// Combined federal and state refund (negative when owing)
    #[inline]
    #[must_use]
    pub fn total_refund(&self) -> f64 {
        self.federal.net_refund + self.state.net_refund
    }
}
