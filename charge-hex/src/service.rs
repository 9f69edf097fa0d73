//! Charge Application Service
//!
//! Orchestrates a single charge: validate, convert, map accounts, rate-limit,
//! then hand the transfer to the ledger (or the simulated fallback).
//! Contains NO infrastructure logic - the ledger is reached through its port.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use charge_types::{
    AccountMapper, ChargeError, ChargeRequest, ChargeResponse, DerivedAccounts, Ledger,
    LedgerTransaction, MinorUnits, mask_card_number, to_minor_units, validate_card_number,
};

use crate::metrics::PaymentMetrics;
use crate::rate_limit::RateLimiter;

/// Stand-in used when no ledger credentials are available.
///
/// Produces locally generated ids of the form `SIM-<unix seconds>-<n>`; no
/// money moves.
#[derive(Debug, Default)]
pub struct SimulatedLedger {
    counter: AtomicU64,
}

impl SimulatedLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_transaction_id(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        format!("SIM-{now}-{n}")
    }
}

/// How charges are fulfilled.
pub enum ChargeMode<L: Ledger> {
    LedgerBacked(L),
    /// Degraded mode: ledger credentials could not be loaded at startup.
    Simulated(SimulatedLedger),
}

impl<L: Ledger> ChargeMode<L> {
    /// Metric and log label.
    pub fn label(&self) -> &'static str {
        match self {
            ChargeMode::LedgerBacked(_) => "ledger",
            ChargeMode::Simulated(_) => "simulated",
        }
    }

    /// Id the charge is logged and answered under: a UUID v4 that doubles as
    /// the ledger idempotency key, or a `SIM-` id when simulated.
    pub fn next_transaction_id(&self) -> String {
        match self {
            ChargeMode::LedgerBacked(_) => Uuid::new_v4().to_string(),
            ChargeMode::Simulated(simulated) => simulated.next_transaction_id(),
        }
    }
}

/// Ledger reachability as seen by the readiness probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerStatus {
    Available,
    Unavailable(String),
    Simulated,
}

impl LedgerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerStatus::Available => "available",
            LedgerStatus::Unavailable(_) => "unavailable",
            LedgerStatus::Simulated => "simulated",
        }
    }

    pub fn is_ready(&self) -> bool {
        !matches!(self, LedgerStatus::Unavailable(_))
    }
}

/// Application service for card charges.
///
/// Generic over `L: Ledger` - the adapter is injected at compile time.
pub struct ChargeService<L: Ledger> {
    mode: ChargeMode<L>,
    mapper: AccountMapper,
    limiter: Arc<RateLimiter>,
    metrics: Arc<PaymentMetrics>,
}

impl<L: Ledger> ChargeService<L> {
    /// Creates a ledger-backed service with a default limiter and metrics.
    pub fn new(ledger: L, mapper: AccountMapper) -> Self {
        Self::with_mode(ChargeMode::LedgerBacked(ledger), mapper)
    }

    /// Creates a service that never contacts a ledger.
    pub fn simulated(mapper: AccountMapper) -> Self {
        Self::with_mode(ChargeMode::Simulated(SimulatedLedger::new()), mapper)
    }

    pub fn with_mode(mode: ChargeMode<L>, mapper: AccountMapper) -> Self {
        Self {
            mode,
            mapper,
            limiter: Arc::new(RateLimiter::default()),
            metrics: Arc::new(PaymentMetrics::new()),
        }
    }

    pub fn with_rate_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.limiter = limiter;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<PaymentMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn mode(&self) -> &ChargeMode<L> {
        &self.mode
    }

    pub fn is_simulated(&self) -> bool {
        matches!(self.mode, ChargeMode::Simulated(_))
    }

    pub fn metrics(&self) -> &Arc<PaymentMetrics> {
        &self.metrics
    }

    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Charges a card by moving funds from the card's account to the merchant.
    ///
    /// Returns the ledger idempotency key on success. Nothing is retried: on
    /// an `AlreadyExists` or timeout outcome the caller decides whether to
    /// resubmit.
    #[instrument(skip_all, fields(mode = self.mode.label()))]
    pub async fn charge(&self, req: ChargeRequest) -> Result<ChargeResponse, ChargeError> {
        let start = Instant::now();
        let mode = self.mode.label();

        let PreparedCharge {
            amount,
            accounts,
            currency,
            masked_card,
        } = match self.prepare(&req) {
            Ok(prepared) => prepared,
            Err(e) => {
                warn!(error = %e, "Rejected charge request");
                self.metrics.record_request(false, mode, start.elapsed(), 0);
                self.metrics.record_error("invalid_input");
                return Err(e);
            }
        };

        if !self.limiter.allow(&accounts.payer_account) {
            warn!(
                account = %accounts.payer_account,
                remaining = self.limiter.remaining(&accounts.payer_account),
                "Rate limit exceeded"
            );
            self.metrics.record_rejection();
            return Err(ChargeError::ResourceExhausted(
                "too many payment requests, please try again later".into(),
            ));
        }

        let transaction_id = self.mode.next_transaction_id();
        info!(
            transaction_id = %transaction_id,
            amount_cents = amount,
            currency = %currency,
            card = %masked_card,
            "Payment request received"
        );
        debug!(
            transaction_id = %transaction_id,
            from_account = %accounts.payer_account,
            from_routing = %accounts.payer_routing,
            to_account = %accounts.payee_account,
            to_routing = %accounts.payee_routing,
            "Payment details"
        );

        match &self.mode {
            ChargeMode::LedgerBacked(ledger) => {
                let tx = LedgerTransaction::new(&accounts, amount, transaction_id.clone());

                let ledger_start = Instant::now();
                let result = ledger.create_transaction(&tx).await;
                let ledger_ms = ledger_start.elapsed().as_millis() as u64;

                match result {
                    Ok(receipt) => {
                        info!(
                            transaction_id = %transaction_id,
                            ledger_transaction_id = ?receipt.transaction_id,
                            duration_ms = ledger_ms,
                            "Ledger transaction succeeded"
                        );
                        let elapsed = start.elapsed();
                        self.metrics.record_request(true, mode, elapsed, amount);
                        info!(
                            transaction_id = %transaction_id,
                            duration_ms = elapsed.as_millis() as u64,
                            "Payment succeeded"
                        );
                        Ok(ChargeResponse { transaction_id })
                    }
                    Err(e) => {
                        let kind = e.kind();
                        warn!(
                            transaction_id = %transaction_id,
                            error = %e,
                            kind = kind.as_str(),
                            duration_ms = ledger_ms,
                            "Ledger transaction failed"
                        );
                        let elapsed = start.elapsed();
                        self.metrics.record_request(false, mode, elapsed, 0);
                        self.metrics.record_error(kind.as_str());

                        let err = ChargeError::from(e);
                        info!(
                            transaction_id = %transaction_id,
                            code = err.code(),
                            duration_ms = elapsed.as_millis() as u64,
                            "Payment failed"
                        );
                        Err(err)
                    }
                }
            }
            ChargeMode::Simulated(_) => {
                let elapsed = start.elapsed();
                self.metrics.record_request(true, mode, elapsed, amount);
                warn!(
                    transaction_id = %transaction_id,
                    mode = "simulated",
                    amount_cents = amount,
                    duration_ms = elapsed.as_millis() as u64,
                    "Ledger not configured; payment simulated, no funds moved"
                );
                Ok(ChargeResponse { transaction_id })
            }
        }
    }

    /// Probes the ledger for the readiness endpoint.
    pub async fn readiness(&self) -> LedgerStatus {
        match &self.mode {
            ChargeMode::LedgerBacked(ledger) => match ledger.health_check().await {
                Ok(()) => LedgerStatus::Available,
                Err(e) => LedgerStatus::Unavailable(e.to_string()),
            },
            ChargeMode::Simulated(_) => LedgerStatus::Simulated,
        }
    }

    /// Validation, conversion and account mapping. Pure; no shared state touched.
    fn prepare(&self, req: &ChargeRequest) -> Result<PreparedCharge, ChargeError> {
        let money = req
            .amount
            .as_ref()
            .ok_or_else(|| ChargeError::InvalidInput("amount is required".into()))?;
        let card = req
            .credit_card
            .as_ref()
            .ok_or_else(|| ChargeError::InvalidInput("credit card info is required".into()))?;

        validate_card_number(&card.credit_card_number)?;
        let amount = to_minor_units(Some(money))?;
        let accounts = self.mapper.derive_accounts(&card.credit_card_number);

        Ok(PreparedCharge {
            amount,
            accounts,
            currency: money.currency_code.clone(),
            masked_card: mask_card_number(&card.credit_card_number),
        })
    }
}

struct PreparedCharge {
    amount: MinorUnits,
    accounts: DerivedAccounts,
    currency: String,
    masked_card: String,
}
