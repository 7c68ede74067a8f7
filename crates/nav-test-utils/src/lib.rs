//! Testing utilities for the Navigator workspace
//!
//! Shared fixtures and a scripted calculator double.

#![allow(missing_docs)]

use async_trait::async_trait;
use chrono::NaiveDate;
use nav_preview::{
    CalculatorError, Dependent, EstimateCalculator, EstimateRequest, EstimateResult,
    FederalEstimate, MaritalStatus, PolicyCitation, StateEstimate, TrackedInputSet,
};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Duration;

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

pub fn married_inputs() -> TrackedInputSet {
    TrackedInputSet::new().with_marital_status(MaritalStatus::Married)
}

pub fn family_inputs(wages: f64) -> TrackedInputSet {
    married_inputs()
        .with_employment_income(wages)
        .with_county("Prince George's")
        .with_dependent(Dependent::born(date(2016, 3, 14)))
        .with_dependent(Dependent::born(date(2019, 9, 2)))
}

/// Deterministic estimate derived from the request, so tests can tell
/// which request produced a result
pub fn estimate_for(request: &EstimateRequest) -> EstimateResult {
    let eitc = 500.0 * f64::from(request.eitc_qualifying_children);
    let ctc = 2_000.0 * f64::from(request.ctc_qualifying_children);
    EstimateResult {
        federal: FederalEstimate {
            adjusted_gross_income: request.income.total,
            taxable_income: (request.income.total - 29_200.0).max(0.0),
            income_tax: 0.0,
            earned_income_credit: eitc,
            child_tax_credit: ctc,
            net_refund: eitc + ctc,
        },
        state: StateEstimate {
            state: "MD".to_string(),
            county: request.county.clone(),
            state_tax: 0.0,
            local_tax: 0.0,
            state_earned_income_credit: eitc * 0.45,
            net_refund: eitc * 0.45,
        },
        breakdown: vec![format!("total income {:.2}", request.income.total)],
        citations: vec![PolicyCitation {
            title: "Earned income credit".to_string(),
            reference: "26 U.S.C. 32".to_string(),
            url: None,
        }],
    }
}

#[derive(Debug, Clone)]
enum Step {
    Succeed { delay: Duration },
    Fail { error: CalculatorError, delay: Duration },
}

/// Calculator answering from a queue of scripted steps.
///
/// Steps are consumed in call-start order; once the queue is empty every
/// call succeeds immediately with `estimate_for(request)`.
#[derive(Debug, Default)]
pub struct ScriptedCalculator {
    script: Mutex<VecDeque<Step>>,
    requests: Mutex<Vec<EstimateRequest>>,
}

impl ScriptedCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_success(&self, delay: Duration) -> &Self {
        self.script.lock().push_back(Step::Succeed { delay });
        self
    }

    pub fn push_failure(&self, error: CalculatorError, delay: Duration) -> &Self {
        self.script.lock().push_back(Step::Fail { error, delay });
        self
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn requests(&self) -> Vec<EstimateRequest> {
        self.requests.lock().clone()
    }

    pub fn last_request(&self) -> Option<EstimateRequest> {
        self.requests.lock().last().cloned()
    }
}

#[async_trait]
impl EstimateCalculator for ScriptedCalculator {
    async fn calculate(&self, request: &EstimateRequest) -> Result<EstimateResult, CalculatorError> {
        self.requests.lock().push(request.clone());
        let step = self
            .script
            .lock()
            .pop_front()
            .unwrap_or(Step::Succeed { delay: Duration::ZERO });

        match step {
            Step::Succeed { delay } => {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                Ok(estimate_for(request))
            }
            Step::Fail { error, delay } => {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                Err(error)
            }
        }
    }
}
