//! Debounced estimate preview controller
//!
//! Turns a high-frequency stream of input edits into a low-frequency
//! stream of calculator calls:
//!
//! ```text
//! update_inputs ──▶ Debouncing ──(quiet period)──▶ InFlight ──▶ Settled
//!       ▲               │ new edit: abort timer, restart     │
//!       └───────────────┴────────────────────────────────────┘
//! ```
//!
//! Every computation takes a sequence number when it starts. Its result
//! is applied only if no later-started computation has already settled,
//! so a slow early call can never overwrite a fast later one. A failure
//! records `error` but never clears the last good estimate.

use crate::calculator::EstimateCalculator;
use crate::config::PreviewConfig;
use crate::error::{CalculatorError, PreviewError, PreviewResult};
use crate::estimate::EstimateResult;
use crate::inputs::TrackedInputSet;
use crate::request::EstimateRequest;
use crate::state::{PreviewId, PreviewPhase, PreviewState, RecomputeOutcome};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

#[derive(Debug)]
struct ControllerState {
    inputs: TrackedInputSet,
    current: Option<Arc<EstimateResult>>,
    computed_inputs: Option<TrackedInputSet>,
    error: Option<PreviewError>,
    computed_at: Option<DateTime<Utc>>,
    phase: PreviewPhase,
    next_seq: u64,
    applied_seq: u64,
    outstanding: usize,
    debounce_generation: u64,
    timer: Option<JoinHandle<()>>,
}

impl ControllerState {
    fn new() -> Self {
        Self {
            inputs: TrackedInputSet::default(),
            current: None,
            computed_inputs: None,
            error: None,
            computed_at: None,
            phase: PreviewPhase::Idle,
            next_seq: 0,
            applied_seq: 0,
            outstanding: 0,
            debounce_generation: 0,
            timer: None,
        }
    }

    fn refresh_phase(&mut self) {
        self.phase = if self.timer.is_some() {
            PreviewPhase::Debouncing
        } else if self.outstanding > 0 {
            PreviewPhase::InFlight
        } else if self.applied_seq > 0 {
            PreviewPhase::Settled
        } else {
            PreviewPhase::Idle
        };
    }

    /// Tracked inputs are computed, or about to be, and the last attempt
    /// did not fail
    fn nothing_to_retry(&self) -> bool {
        self.error.is_none()
            && (self.timer.is_some()
                || self.outstanding > 0
                || self.computed_inputs.as_ref() == Some(&self.inputs))
    }

    fn next_sequence(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    /// Apply the result of computation `seq` unless a later one settled first
    fn settle(
        &mut self,
        seq: u64,
        inputs: TrackedInputSet,
        result: PreviewResult<EstimateResult>,
    ) -> RecomputeOutcome {
        if seq <= self.applied_seq {
            return RecomputeOutcome::Superseded;
        }
        self.applied_seq = seq;

        match result {
            Ok(estimate) => {
                self.current = Some(Arc::new(estimate));
                self.computed_inputs = Some(inputs);
                self.computed_at = Some(Utc::now());
                self.error = None;
                RecomputeOutcome::Applied
            }
            Err(err) => {
                self.error = Some(err.clone());
                RecomputeOutcome::Failed(err)
            }
        }
    }
}

/// Marks one outstanding calculator call; released even if the
/// computing future is dropped mid-call.
struct InFlight<'a> {
    state: &'a Mutex<ControllerState>,
    active: bool,
}

impl<'a> InFlight<'a> {
    fn new(state: &'a Mutex<ControllerState>) -> Self {
        Self {
            state,
            active: true,
        }
    }

    fn finish<R>(mut self, f: impl FnOnce(&mut ControllerState) -> R) -> R {
        self.active = false;
        let mut state = self.state.lock();
        state.outstanding = state.outstanding.saturating_sub(1);
        let out = f(&mut state);
        state.refresh_phase();
        out
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.active {
            let mut state = self.state.lock();
            state.outstanding = state.outstanding.saturating_sub(1);
            state.refresh_phase();
        }
    }
}

struct Shared {
    id: PreviewId,
    config: PreviewConfig,
    calculator: Arc<dyn EstimateCalculator>,
    state: Mutex<ControllerState>,
}

impl Shared {
    async fn recompute(&self) -> RecomputeOutcome {
        let (seq, inputs, request) = {
            let mut state = self.state.lock();
            let missing = self.config.missing_fields(&state.inputs);
            if !missing.is_empty() {
                state.refresh_phase();
                tracing::debug!(preview = %self.id, ?missing, "minimum data missing, not computing");
                return RecomputeOutcome::InsufficientInput { missing };
            }

            let seq = state.next_sequence();
            let inputs = state.inputs.clone();
            match EstimateRequest::from_inputs(&inputs) {
                Ok(request) => {
                    state.outstanding += 1;
                    state.refresh_phase();
                    (seq, inputs, request)
                }
                Err(err) => {
                    tracing::warn!(preview = %self.id, seq, error = %err, "inputs rejected");
                    let outcome = state.settle(seq, inputs, Err(err));
                    state.refresh_phase();
                    return outcome;
                }
            }
        };

        let guard = InFlight::new(&self.state);
        tracing::debug!(preview = %self.id, seq, "estimate computation started");

        let result = match tokio::time::timeout(
            self.config.call_timeout(),
            self.calculator.calculate(&request),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(CalculatorError::Timeout {
                after_ms: self.config.call_timeout_ms,
            }),
        };

        let outcome =
            guard.finish(|state| state.settle(seq, inputs, result.map_err(PreviewError::from)));

        match &outcome {
            RecomputeOutcome::Applied => {
                tracing::info!(preview = %self.id, seq, "estimate updated");
            }
            RecomputeOutcome::Failed(err) => {
                tracing::warn!(preview = %self.id, seq, error = %err, "estimate failed, keeping last good result");
            }
            RecomputeOutcome::Superseded => {
                tracing::debug!(preview = %self.id, seq, "discarded response of superseded computation");
            }
            RecomputeOutcome::InsufficientInput { .. } => {}
        }
        outcome
    }

    async fn fire_debounce(&self, generation: u64) {
        {
            let mut state = self.state.lock();
            if state.debounce_generation != generation {
                return;
            }
            state.timer = None;
        }
        self.recompute().await;
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        if let Some(timer) = self.state.get_mut().timer.take() {
            timer.abort();
        }
    }
}

/// Maintains the best available estimate for one stream of input edits
///
/// One controller per input context; its state is never shared with
/// another controller.
pub struct PreviewController {
    shared: Arc<Shared>,
}

impl fmt::Debug for PreviewController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreviewController")
            .field("id", &self.shared.id)
            .field("phase", &self.shared.state.lock().phase)
            .finish_non_exhaustive()
    }
}

impl PreviewController {
    /// Create a controller with empty inputs
    ///
    /// # Errors
    /// - `PreviewError::InvalidConfig` if the configuration is out of range
    pub fn new(
        config: PreviewConfig,
        calculator: Arc<dyn EstimateCalculator>,
    ) -> PreviewResult<Self> {
        config.validate()?;
        let id = PreviewId::new();
        tracing::debug!(preview = %id, debounce_ms = config.debounce_ms, "preview controller created");

        Ok(Self {
            shared: Arc::new(Shared {
                id,
                config,
                calculator,
                state: Mutex::new(ControllerState::new()),
            }),
        })
    }

    /// Controller identifier
    #[inline]
    #[must_use]
    pub fn id(&self) -> PreviewId {
        self.shared.id
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &PreviewConfig {
        &self.shared.config
    }

    /// Currently tracked inputs
    #[must_use]
    pub fn inputs(&self) -> TrackedInputSet {
        self.shared.state.lock().inputs.clone()
    }

    /// Replace the tracked inputs and restart the debounce timer.
    ///
    /// Edits arriving within the debounce interval collapse into a single
    /// computation using the last inputs. Returns `false` (nothing
    /// scheduled) when `inputs` equal the current ones and those are
    /// already computed or pending without a failure; re-issuing the same
    /// inputs after a failure schedules a retry. Outside a Tokio runtime
    /// the inputs are stored but no timer runs.
    pub fn update_inputs(&self, inputs: TrackedInputSet) -> bool {
        let shared = &self.shared;
        let mut state = shared.state.lock();
        if state.inputs == inputs && state.nothing_to_retry() {
            return false;
        }

        let changed = state.inputs.changed_fields(&inputs);
        state.inputs = inputs;
        state.debounce_generation += 1;
        let generation = state.debounce_generation;
        if let Some(previous) = state.timer.take() {
            previous.abort();
        }

        match Handle::try_current() {
            Ok(runtime) => {
                let weak = Arc::downgrade(shared);
                let delay = shared.config.debounce();
                state.timer = Some(runtime.spawn(async move {
                    tokio::time::sleep(delay).await;
                    if let Some(shared) = weak.upgrade() {
                        shared.fire_debounce(generation).await;
                    }
                }));
            }
            Err(_) => {
                tracing::warn!(preview = %shared.id, "no Tokio runtime, debounce not scheduled");
            }
        }
        state.refresh_phase();
        tracing::debug!(preview = %shared.id, generation, ?changed, "inputs updated");
        true
    }

    /// Compute now with the current inputs, bypassing the debounce timer.
    ///
    /// Makes no calculator call when required fields are missing. Failures
    /// are not retried.
    pub async fn recompute(&self) -> RecomputeOutcome {
        self.shared.recompute().await
    }

    /// Snapshot for rendering
    #[must_use]
    pub fn state(&self) -> PreviewState {
        let state = self.shared.state.lock();
        PreviewState {
            current: state.current.clone(),
            error: state.error.clone(),
            computed_at: state.computed_at,
            in_flight: state.outstanding > 0,
            phase: state.phase,
            stale: state.current.is_some() && state.computed_inputs.as_ref() != Some(&state.inputs),
            missing_fields: self.shared.config.missing_fields(&state.inputs),
        }
    }
}
