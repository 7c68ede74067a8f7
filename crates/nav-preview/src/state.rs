//! Preview state snapshots handed to callers

use crate::error::PreviewError;
use crate::estimate::EstimateResult;
use crate::inputs::InputField;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use ulid::Ulid;

/// Identifier of one controller, recorded in logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PreviewId(pub Ulid);

impl PreviewId {
    /// Generate new preview ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for PreviewId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PreviewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Controller lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreviewPhase {
    /// Nothing has been attempted yet
    Idle,
    /// Inputs changed; waiting for the quiet period to end
    Debouncing,
    /// At least one calculator call is outstanding
    InFlight,
    /// Last attempt finished (successfully or not)
    Settled,
}

/// Immutable snapshot of a controller's state
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewState {
    /// Best known estimate; never cleared by a failure
    pub current: Option<Arc<EstimateResult>>,
    /// Most recent failure, cleared by the next success
    pub error: Option<PreviewError>,
    /// When `current` was produced
    pub computed_at: Option<DateTime<Utc>>,
    /// Whether any calculator call is outstanding
    pub in_flight: bool,
    /// Lifecycle phase
    pub phase: PreviewPhase,
    /// `current` was computed from inputs that have since changed
    pub stale: bool,
    /// Required fields still missing from the tracked inputs
    pub missing_fields: Vec<InputField>,
}

impl PreviewState {
    /// Classify what a caller should render
    #[must_use]
    pub fn view(&self) -> PreviewView<'_> {
        match &self.current {
            Some(estimate) => PreviewView::Estimate {
                estimate,
                error: self.error.as_ref(),
                stale: self.stale,
            },
            None if !self.missing_fields.is_empty() && !self.in_flight => {
                PreviewView::AwaitingInput {
                    missing: &self.missing_fields,
                }
            }
            None => PreviewView::NotComputed {
                computing: self.in_flight,
                error: self.error.as_ref(),
            },
        }
    }
}

/// Rendering classification of a `PreviewState`
///
/// There is no error-only view: without a prior estimate a failure is
/// shown as a notice on the neutral placeholder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PreviewView<'a> {
    /// Minimum data not entered yet; prompt for these fields
    AwaitingInput {
        /// Missing required fields
        missing: &'a [InputField],
    },
    /// No estimate yet
    NotComputed {
        /// A calculator call is running; a pending debounce shows in
        /// `PreviewState::phase` instead
        computing: bool,
        /// Failure of the latest attempt, as a non-blocking notice
        error: Option<&'a PreviewError>,
    },
    /// Last good estimate, possibly with a non-blocking error banner
    Estimate {
        /// Estimate to display
        estimate: &'a EstimateResult,
        /// Failure of a later attempt
        error: Option<&'a PreviewError>,
        /// Inputs changed since this estimate was computed
        stale: bool,
    },
}

/// Result of one `recompute` call
#[derive(Debug, Clone, PartialEq)]
pub enum RecomputeOutcome {
    /// Minimum-data predicate failed; no call made, state untouched
    InsufficientInput {
        /// Missing required fields
        missing: Vec<InputField>,
    },
    /// New estimate applied
    Applied,
    /// Failure recorded; previous estimate kept
    Failed(PreviewError),
    /// A later-started computation already settled; result discarded
    Superseded,
}

impl RecomputeOutcome {
    /// Whether the calculator was called
    #[inline]
    #[must_use]
    pub fn called_calculator(&self) -> bool {
        !matches!(
            self,
            Self::InsufficientInput { .. } | Self::Failed(PreviewError::InvalidInput(_))
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CalculatorError;
    use crate::estimate::{FederalEstimate, StateEstimate};

    fn empty_state() -> PreviewState {
        PreviewState {
            current: None,
            error: None,
            computed_at: None,
            in_flight: false,
            phase: PreviewPhase::Idle,
            stale: false,
            missing_fields: vec![InputField::MaritalStatus],
        }
    }

    fn estimate() -> Arc<EstimateResult> {
        Arc::new(EstimateResult {
            federal: FederalEstimate {
                adjusted_gross_income: 0.0,
                taxable_income: 0.0,
                income_tax: 0.0,
                earned_income_credit: 0.0,
                child_tax_credit: 0.0,
                net_refund: 0.0,
            },
            state: StateEstimate {
                state: "MD".to_string(),
                county: None,
                state_tax: 0.0,
                local_tax: 0.0,
                state_earned_income_credit: 0.0,
                net_refund: 0.0,
            },
            breakdown: Vec::new(),
            citations: Vec::new(),
        })
    }

    #[test]
    fn awaiting_input_when_fields_missing() {
        let state = empty_state();
        assert!(matches!(state.view(), PreviewView::AwaitingInput { missing } if missing.len() == 1));
    }

    #[test]
    fn failure_without_estimate_is_not_error_only() {
        let mut state = empty_state();
        state.missing_fields.clear();
        state.phase = PreviewPhase::Settled;
        state.error = Some(CalculatorError::transport("down").into());

        match state.view() {
            PreviewView::NotComputed { computing, error } => {
                assert!(!computing);
                assert!(error.is_some());
            }
            other => panic!("unexpected view {other:?}"),
        }
    }

    #[test]
    fn pending_debounce_is_not_computing() {
        let mut state = empty_state();
        state.missing_fields.clear();
        state.phase = PreviewPhase::Debouncing;
        state.error = Some(CalculatorError::transport("down").into());

        assert!(matches!(
            state.view(),
            PreviewView::NotComputed {
                computing: false,
                error: Some(_)
            }
        ));

        state.in_flight = true;
        assert!(matches!(
            state.view(),
            PreviewView::NotComputed { computing: true, .. }
        ));
    }

    #[test]
    fn estimate_with_error_banner() {
        let mut state = empty_state();
        state.current = Some(estimate());
        state.error = Some(CalculatorError::Timeout { after_ms: 10 }.into());
        state.stale = true;

        match state.view() {
            PreviewView::Estimate { error, stale, .. } => {
                assert!(error.is_some());
                assert!(stale);
            }
            other => panic!("unexpected view {other:?}"),
        }
    }

    #[test]
    fn outcome_call_classification() {
        assert!(!RecomputeOutcome::InsufficientInput { missing: vec![] }.called_calculator());
        assert!(RecomputeOutcome::Applied.called_calculator());
        assert!(RecomputeOutcome::Superseded.called_calculator());
    }
}
