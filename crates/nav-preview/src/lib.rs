//! Navigator estimate preview
//!
//! Keeps a live tax-estimate preview next to a household form without
//! hammering the external calculation service:
//! - Edits are debounced; a burst of edits produces one computation
//!   using the last inputs
//! - A failed computation keeps the last good estimate and surfaces the
//!   error alongside it
//! - Out-of-order responses are resolved by start sequence, so a slow
//!   early call never overwrites a newer result
//!
//! # Architecture
//!
//! ```text
//! TrackedInputSet ──update_inputs──▶ PreviewController ──EstimateRequest──▶ EstimateCalculator
//!                                           │                                 (JsonCalculator,
//!                                           ▼                                  CachedCalculator)
//!                                     PreviewState ──view()──▶ PreviewView
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use nav_preview::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn example(calculator: Arc<dyn EstimateCalculator>) -> Result<(), PreviewError> {
//! let controller = PreviewController::new(PreviewConfig::default(), calculator)?;
//!
//! controller.update_inputs(
//!     TrackedInputSet::new()
//!         .with_marital_status(MaritalStatus::Married)
//!         .with_employment_income(48_000.0),
//! );
//!
//! // ...500ms later the estimate is computed
//! if let PreviewView::Estimate { estimate, error, .. } = controller.state().view() {
//!     println!("refund {:.0}, warning: {:?}", estimate.total_refund(), error);
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod calculator;
pub mod config;
pub mod controller;
pub mod error;
pub mod estimate;
pub mod inputs;
pub mod request;
pub mod state;

pub use calculator::{
    CachedCalculator, EstimateCalculator, EstimateTransport, JsonCalculator, TransportResponse,
};
pub use config::PreviewConfig;
pub use controller::PreviewController;
pub use error::{CalculatorError, PreviewError, PreviewResult};
pub use estimate::{EstimateResult, FederalEstimate, PolicyCitation, StateEstimate};
pub use inputs::{Dependent, FieldValue, InputField, MaritalStatus, TrackedInputSet};
pub use request::{DependentFacts, EstimateRequest, IncomeSummary};
pub use state::{PreviewId, PreviewPhase, PreviewState, PreviewView, RecomputeOutcome};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the preview controller
    pub use crate::calculator::{CachedCalculator, EstimateCalculator, JsonCalculator};
    pub use crate::config::PreviewConfig;
    pub use crate::controller::PreviewController;
    pub use crate::error::{CalculatorError, PreviewError};
    pub use crate::estimate::EstimateResult;
    pub use crate::inputs::{Dependent, InputField, MaritalStatus, TrackedInputSet};
    pub use crate::state::{PreviewPhase, PreviewState, PreviewView, RecomputeOutcome};
}
