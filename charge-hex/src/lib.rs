//! # Charge Hex
//!
//! Application service layer and HTTP adapter for the payment charge adapter.
//!
//! ## Architecture
//!
//! - `service/` - Charge orchestrator (validation, mapping, ledger hand-off)
//! - `rate_limit/` - Per-payer fixed-window limiter
//! - `metrics/` - Prometheus metrics sink
//! - `inbound/` - HTTP adapter (Axum server)
//!
//! The service is generic over `L: Ledger`, allowing different ledger
//! implementations to be injected.

pub mod inbound;
pub mod metrics;
pub mod openapi;
pub mod rate_limit;
pub mod service;


pub use metrics::PaymentMetrics;
pub use rate_limit::{RateLimitConfig, RateLimiter};
pub use service::{ChargeMode, ChargeService, LedgerStatus, SimulatedLedger};
