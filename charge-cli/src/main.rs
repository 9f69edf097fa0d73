//! Charge CLI
//!
//! Command-line interface for the payment charge API, plus signing-key
//! provisioning for the ledger credential.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use charge_client::ChargeClient;
use charge_ledger::ServiceAuthenticator;
use charge_types::{CardInfo, Money};

#[derive(Parser)]
#[command(name = "charge")]
#[command(author, version, about = "Payment charge API CLI client", long_about = None)]
struct Cli {
    /// Base URL of the charge API
    #[arg(long, env = "CHARGE_API_URL", default_value = "http://localhost:8080")]
    api_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Charge a card
    Pay {
        /// Whole currency units
        #[arg(long)]
        units: i64,
        /// Fractional part in billionths of a unit
        #[arg(long, default_value_t = 0)]
        nanos: i32,
        #[arg(long, default_value = "USD")]
        currency: String,
        /// Card number; spaces and dashes allowed
        #[arg(long)]
        card: String,
    },
    /// Check API liveness
    Health,
    /// Show API readiness and ledger status
    Ready,
    /// Generate an RSA key pair for ledger service tokens
    Keygen {
        /// Where to write the PKCS#8 private key
        #[arg(long, default_value = "privatekey")]
        private: PathBuf,
        /// Where to write the public key
        #[arg(long, default_value = "publickey")]
        public: PathBuf,
    },
}

fn write_key_pair(private: &Path, public: &Path) -> Result<()> {
    let pair = ServiceAuthenticator::generate_key_pair()?;

    std::fs::write(private, &pair.private_pem)
        .with_context(|| format!("failed to write {}", private.display()))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(private, std::fs::Permissions::from_mode(0o600))?;
    }
    std::fs::write(public, &pair.public_pem)
        .with_context(|| format!("failed to write {}", public.display()))?;

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let client = ChargeClient::new(&cli.api_url);

    match cli.command {
        Commands::Pay {
            units,
            nanos,
            currency,
            card,
        } => {
            let resp = client
                .charge(Money::new(units, nanos, currency), CardInfo::new(card))
                .await?;
            println!("{}", serde_json::to_string_pretty(&resp)?);
        }

        Commands::Health => {
            let healthy = client.health().await?;
            if healthy {
                println!("✓ API is healthy");
            } else {
                println!("✗ API is not healthy");
                std::process::exit(1);
            }
        }

        Commands::Ready => {
            let ready = client.ready().await?;
            println!("{}", serde_json::to_string_pretty(&ready)?);
            if ready.status != "ready" {
                std::process::exit(1);
            }
        }

        Commands::Keygen { private, public } => {
            write_key_pair(&private, &public)?;
            println!("✓ Private key written to {}", private.display());
            println!("✓ Public key written to {}", public.display());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_keygen_writes_loadable_pair() {
        let dir = tempfile::tempdir().unwrap();
        let private = dir.path().join("privatekey");
        let public = dir.path().join("publickey");

        write_key_pair(&private, &public).unwrap();

        let auth =
            ServiceAuthenticator::from_files(&private, &public, Duration::from_secs(60)).unwrap();
        let token = auth.mint("5112830366").unwrap();
        assert!(auth.verify(&token).is_ok());
    }

    #[test]
    fn test_pay_arguments() {
        let cli = Cli::try_parse_from([
            "charge",
            "pay",
            "--units",
            "10",
            "--nanos",
            "500000000",
            "--card",
            "4111 1111 1111 1111",
        ])
        .unwrap();

        match cli.command {
            Commands::Pay {
                units,
                nanos,
                currency,
                card,
            } => {
                assert_eq!(units, 10);
                assert_eq!(nanos, 500_000_000);
                assert_eq!(currency, "USD");
                assert_eq!(card, "4111 1111 1111 1111");
            }
            _ => panic!("expected pay"),
        }
    }
}
