//! # Charge Application
//!
//! Binary that wires together all the components:
//! - Load configuration from environment
//! - Load the ledger signing keys (or fall back to simulated mode)
//! - Create the charge service with its rate limiter and metrics
//! - Start the HTTP server

mod config;

use std::sync::Arc;

use opentelemetry::global;
use opentelemetry_sdk::{propagation::TraceContextPropagator, trace as sdktrace};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use charge_hex::{
    ChargeMode, ChargeService, PaymentMetrics, RateLimitConfig, RateLimiter, SimulatedLedger,
    inbound::HttpServer,
};
use charge_ledger::{LedgerClient, ServiceAuthenticator};
use charge_types::{AccountMapper, Ledger};

use config::{Config, LogFormat};

fn init_tracer(
    endpoint: &str,
) -> anyhow::Result<(sdktrace::Tracer, sdktrace::SdkTracerProvider)> {
    global::set_text_map_propagator(TraceContextPropagator::new());

    use opentelemetry_otlp::WithExportConfig as _;
    // gRPC exporter with batch processing (non-blocking)
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()?;

    let provider = sdktrace::SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .build();

    global::set_tracer_provider(provider.clone());

    use opentelemetry::trace::TracerProvider as _;
    Ok((provider.tracer("charge-service"), provider))
}

/// Installs the subscriber. Returns the OTLP provider when span export is on.
fn init_tracing(config: &Config) -> anyhow::Result<Option<sdktrace::SdkTracerProvider>> {
    let (telemetry, provider) = match config.otlp_endpoint.as_deref() {
        Some(endpoint) => {
            let (tracer, provider) = init_tracer(endpoint)?;
            (
                Some(tracing_opentelemetry::layer().with_tracer(tracer)),
                Some(provider),
            )
        }
        None => (None, None),
    };

    let (pretty, json) = match config.log_format {
        LogFormat::Pretty => (Some(tracing_subscriber::fmt::layer()), None),
        LogFormat::Json => (None, Some(tracing_subscriber::fmt::layer().json())),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,charge_app=debug,charge_hex=debug".into()),
        )
        .with(pretty)
        .with(json)
        .with(telemetry)
        .init();

    Ok(provider)
}

/// Picks the charge mode. Missing or bad keys degrade to simulated charges
/// instead of refusing to start.
async fn build_mode(config: &Config) -> anyhow::Result<ChargeMode<LedgerClient>> {
    let authenticator = match ServiceAuthenticator::from_files(
        &config.private_key_path,
        &config.public_key_path,
        config.token_expiry,
    ) {
        Ok(authenticator) => authenticator,
        Err(e) => {
            tracing::error!(
                error = %e,
                private_key = %config.private_key_path.display(),
                public_key = %config.public_key_path.display(),
                "Failed to load ledger signing keys; running in SIMULATED mode, charges will NOT move funds"
            );
            return Ok(ChargeMode::Simulated(SimulatedLedger::new()));
        }
    };
    tracing::info!(key_id = authenticator.key_id(), "Ledger signing keys loaded");

    let client = LedgerClient::with_timeout(
        config.ledger_api_url.clone(),
        Arc::new(authenticator),
        config.ledger_timeout,
    )?;
    tracing::info!(ledger_api_url = %client.base_url(), "Ledger client initialized");

    // Advisory only; the client logs the failure itself.
    if client.health_check().await.is_ok() {
        tracing::info!("Ledger health check successful");
    }

    Ok(ChargeMode::LedgerBacked(client))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env()?;

    let otel_provider = init_tracing(&config)?;

    tracing::info!("Starting charge server on port {}", config.port);

    let limiter = Arc::new(RateLimiter::new(RateLimitConfig::per_minute(
        config.rate_limit_per_minute,
    )));
    let sweeper = limiter.spawn_sweeper();
    tracing::info!(quota = limiter.quota(), "Rate limiter initialized");

    let mapper = AccountMapper::new(
        config.merchant_account.clone(),
        config.routing_number.clone(),
    );

    let service = ChargeService::with_mode(build_mode(&config).await?, mapper)
        .with_rate_limiter(limiter)
        .with_metrics(Arc::new(PaymentMetrics::new()));

    // Create and run the HTTP server
    let server = HttpServer::new(service);
    let addr = format!("0.0.0.0:{}", config.port);

    server.run(&addr).await?;

    sweeper.abort();

    // Ensure traces are flushed before exit
    if let Some(provider) = otel_provider {
        let _ = provider.shutdown();
    }
    Ok(())
}
