//! Preview simulation against an in-process calculation service
//!
//! `SimulatedTransport` plays the external service: it decodes the JSON
//! request, answers after a configurable latency, and fails a configurable
//! share of calls. The controller reaches it through the same
//! `CachedCalculator` / `JsonCalculator` stack a deployment would use.

use crate::config::NavigatorConfig;
use anyhow::{ensure, Context};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use nav_cache::{CacheRegistry, GlobalCacheView, EXTERNAL_PRICING_CACHE};
use nav_preview::{
    CachedCalculator, CalculatorError, EstimateRequest, EstimateResult, EstimateTransport,
    FederalEstimate, JsonCalculator, MaritalStatus, PolicyCitation, PreviewController,
    PreviewPhase, StateEstimate, TrackedInputSet, TransportResponse,
};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const STATE_RATE: f64 = 0.0475;
const LOCAL_RATE: f64 = 0.032;
const STATE_EITC_SHARE: f64 = 0.45;

fn standard_deduction(status: MaritalStatus) -> f64 {
    match status {
        MaritalStatus::Single | MaritalStatus::MarriedSeparately => 14_600.0,
        MaritalStatus::HeadOfHousehold => 21_900.0,
        MaritalStatus::Married | MaritalStatus::Widowed => 29_200.0,
    }
}

/// Rough federal and Maryland estimate for simulation output
#[must_use]
pub fn simulate_estimate(request: &EstimateRequest) -> EstimateResult {
    let agi = request.income.total;
    let taxable = (agi - standard_deduction(request.filing_status)).max(0.0);
    let income_tax = taxable * 0.12;

    let children = f64::from(request.eitc_qualifying_children.min(3));
    let eitc_base = if request.eitc_qualifying_children == 0 {
        600.0
    } else {
        1_000.0 * children + 3_000.0
    };
    let eitc = (eitc_base - 0.16 * (agi - 20_000.0).max(0.0)).max(0.0);
    let ctc = 2_000.0 * f64::from(request.ctc_qualifying_children);

    let state_tax = taxable * STATE_RATE;
    let local_tax = taxable * LOCAL_RATE;
    let state_eitc = eitc * STATE_EITC_SHARE;

    EstimateResult {
        federal: FederalEstimate {
            adjusted_gross_income: agi,
            taxable_income: taxable,
            income_tax,
            earned_income_credit: eitc,
            child_tax_credit: ctc,
            net_refund: eitc + ctc - income_tax,
        },
        state: StateEstimate {
            state: "MD".to_string(),
            county: request.county.clone(),
            state_tax,
            local_tax,
            state_earned_income_credit: state_eitc,
            net_refund: state_eitc - state_tax - local_tax,
        },
        breakdown: vec![
            format!("adjusted gross income {agi:.2}"),
            format!("taxable income {taxable:.2}"),
            format!("earned income credit {eitc:.2}"),
            format!("child tax credit {ctc:.2}"),
        ],
        citations: vec![
            PolicyCitation {
                title: "Earned income credit".to_string(),
                reference: "26 U.S.C. 32".to_string(),
                url: None,
            },
            PolicyCitation {
                title: "Child tax credit".to_string(),
                reference: "26 U.S.C. 24".to_string(),
                url: None,
            },
        ],
    }
}

#[derive(Debug)]
struct TransportState {
    latency: Duration,
    failure_rate: f64,
    rng: Mutex<StdRng>,
    calls: AtomicUsize,
}

/// In-process stand-in for the calculation service
#[derive(Debug, Clone)]
pub struct SimulatedTransport {
    state: Arc<TransportState>,
}

impl SimulatedTransport {
    /// Service answering after `latency` and failing with probability
    /// `failure_rate`, seeded for reproducible runs
    #[must_use]
    pub fn new(latency: Duration, failure_rate: f64, seed: u64) -> Self {
        Self {
            state: Arc::new(TransportState {
                latency,
                failure_rate: failure_rate.clamp(0.0, 1.0),
                rng: Mutex::new(StdRng::seed_from_u64(seed)),
                calls: AtomicUsize::new(0),
            }),
        }
    }

    /// Requests received so far
    #[must_use]
    pub fn calls(&self) -> usize {
        self.state.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl EstimateTransport for SimulatedTransport {
    async fn post_json(&self, body: Vec<u8>) -> Result<TransportResponse, CalculatorError> {
        let call = self.state.calls.fetch_add(1, Ordering::Relaxed) + 1;
        let (fail, as_status) = {
            let mut rng = self.state.rng.lock();
            (rng.random_bool(self.state.failure_rate), rng.random_bool(0.5))
        };

        if !self.state.latency.is_zero() {
            tokio::time::sleep(self.state.latency).await;
        }

        if fail {
            tracing::debug!(call, "simulated outage");
            if as_status {
                return Ok(TransportResponse {
                    status: 503,
                    body: b"service unavailable".to_vec(),
                });
            }
            return Err(CalculatorError::transport("simulated connection reset"));
        }

        let request: EstimateRequest = match serde_json::from_slice(&body) {
            Ok(request) => request,
            Err(e) => {
                return Ok(TransportResponse {
                    status: 400,
                    body: e.to_string().into_bytes(),
                })
            }
        };
        let body = serde_json::to_vec(&simulate_estimate(&request))
            .map_err(|e| CalculatorError::Encoding(e.to_string()))?;
        Ok(TransportResponse { status: 200, body })
    }
}

/// Parameters of one simulation run
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationOptions {
    /// Number of input edits
    pub edits: u32,
    /// Pause between edits
    pub interval: Duration,
    /// Share of calculator calls that fail, in `[0, 1]`
    pub failure_rate: f64,
    /// Simulated service latency
    pub latency: Duration,
    /// RNG seed
    pub seed: u64,
}

impl Default for SimulationOptions {
    fn default() -> Self {
        Self {
            edits: 10,
            interval: Duration::from_millis(100),
            failure_rate: 0.0,
            latency: Duration::from_millis(150),
            seed: 42,
        }
    }
}

/// Final state of a simulation run
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    /// Controller identifier
    pub preview_id: String,
    /// Edits applied
    pub edits: u32,
    /// Requests that reached the simulated service
    pub calculator_calls: usize,
    /// Final phase
    pub phase: PreviewPhase,
    /// A call was still running when the run ended
    pub in_flight: bool,
    /// Estimate predates the last edit
    pub stale: bool,
    /// Last good estimate
    pub estimate: Option<EstimateResult>,
    /// Latest failure, if any
    pub error: Option<String>,
    /// When the estimate was computed
    pub computed_at: Option<DateTime<Utc>>,
    /// Cache metrics after the run
    pub cache: GlobalCacheView,
}

/// Wages entered by the `edit`-th keystroke of the simulated form
fn wages_for(edit: u32) -> f64 {
    f64::from(edit + 1) * 2_500.0
}

/// Drive a controller with `options.edits` edits and wait for it to settle
///
/// # Errors
/// Invalid options or configuration
pub async fn run_simulation(
    config: &NavigatorConfig,
    options: &SimulationOptions,
) -> anyhow::Result<SimulationReport> {
    ensure!(
        (0.0..=1.0).contains(&options.failure_rate),
        "failure rate {} is outside [0, 1]",
        options.failure_rate
    );

    let registry = CacheRegistry::create(config.cache.clone()).context("creating cache registry")?;
    registry.start_sweeper();
    let pricing = registry.cache(EXTERNAL_PRICING_CACHE)?;

    let transport = SimulatedTransport::new(options.latency, options.failure_rate, options.seed);
    let calculator = CachedCalculator::new(
        JsonCalculator::new(transport.clone()),
        pricing,
        config.cache.default_ttl(),
    );
    let controller = PreviewController::new(config.preview.clone(), Arc::new(calculator))
        .context("creating preview controller")?;
    tracing::info!(preview = %controller.id(), edits = options.edits, "simulation started");

    let mut inputs = TrackedInputSet::new()
        .with_marital_status(MaritalStatus::Married)
        .with_county("Baltimore City");
    for edit in 0..options.edits {
        inputs = inputs.with_employment_income(wages_for(edit));
        controller.update_inputs(inputs.clone());
        tokio::time::sleep(options.interval).await;
    }

    let deadline = tokio::time::Instant::now()
        + config.preview.debounce()
        + config.preview.call_timeout()
        + Duration::from_secs(1);
    loop {
        let state = controller.state();
        let settled = !state.in_flight && state.phase != PreviewPhase::Debouncing;
        if settled || tokio::time::Instant::now() >= deadline {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let state = controller.state();
    let report = SimulationReport {
        preview_id: controller.id().to_string(),
        edits: options.edits,
        calculator_calls: transport.calls(),
        phase: state.phase,
        in_flight: state.in_flight,
        stale: state.stale,
        estimate: state.current.as_deref().cloned(),
        error: state.error.as_ref().map(ToString::to_string),
        computed_at: state.computed_at,
        cache: registry.global_view(),
    };
    registry.shutdown();

    tracing::info!(
        calls = report.calculator_calls,
        phase = ?report.phase,
        "simulation finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nav_preview::EstimateCalculator;

    fn request(wages: f64) -> EstimateRequest {
        let inputs = TrackedInputSet::new()
            .with_marital_status(MaritalStatus::Single)
            .with_employment_income(wages);
        EstimateRequest::from_inputs(&inputs).unwrap()
    }

    #[test]
    fn simulated_estimate_is_valid() {
        for wages in [0.0, 12_000.0, 45_000.0, 250_000.0] {
            let estimate = simulate_estimate(&request(wages));
            assert!(estimate.validate().is_ok());
            assert_eq!(estimate.federal.adjusted_gross_income, wages);
        }
    }

    #[test]
    fn low_income_below_deduction_owes_nothing() {
        let estimate = simulate_estimate(&request(10_000.0));
        assert_eq!(estimate.federal.taxable_income, 0.0);
        assert_eq!(estimate.federal.income_tax, 0.0);
    }

    #[tokio::test]
    async fn transport_answers_through_json_calculator() {
        let transport = SimulatedTransport::new(Duration::ZERO, 0.0, 7);
        let calculator = JsonCalculator::new(transport.clone());

        let estimate = calculator.calculate(&request(30_000.0)).await.unwrap();
        assert_eq!(estimate.federal.adjusted_gross_income, 30_000.0);
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn certain_failure_always_fails() {
        let calculator = JsonCalculator::new(SimulatedTransport::new(Duration::ZERO, 1.0, 7));
        for _ in 0..5 {
            let err = calculator.calculate(&request(30_000.0)).await.unwrap_err();
            assert!(matches!(
                err,
                CalculatorError::Transport(_) | CalculatorError::Status { status: 503, .. }
            ));
        }
    }

    #[tokio::test]
    async fn garbage_body_is_rejected() {
        let transport = SimulatedTransport::new(Duration::ZERO, 0.0, 7);
        let response = transport.post_json(b"not json".to_vec()).await.unwrap();
        assert_eq!(response.status, 400);
    }
}
