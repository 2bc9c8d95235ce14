mod common;
mod scenarios;

use anyhow::Result;
use clap::Parser;
use common::TestContext;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Runs SafeLiza session scenarios against a live session backend.
#[derive(Parser, Debug)]
#[command(name = "safeliza-tests-e2e")]
pub struct Args {
    /// Session backend base URL
    #[arg(long, env = "SAFELIZA_BACKEND_URL", default_value = "http://127.0.0.1:3000")]
    pub backend_url: String,

    /// Per-request timeout in milliseconds
    #[arg(long, env = "SAFELIZA_REQUEST_TIMEOUT_MS", default_value = "30000")]
    pub request_timeout_ms: u64,

    /// Connect timeout in milliseconds
    #[arg(long, env = "SAFELIZA_CONNECT_TIMEOUT_MS", default_value = "10000")]
    pub connect_timeout_ms: u64,

    /// Relying party the software passkeys are bound to
    #[arg(long, env = "SAFELIZA_RP_ID", default_value = "localhost")]
    pub rp_id: String,

    /// Origin reported in client data, defaults to https://<rp-id>
    #[arg(long, env = "SAFELIZA_ORIGIN")]
    pub origin: Option<String>,

    /// Username to register; a random one is used when omitted
    #[arg(long)]
    pub username: Option<String>,

    /// Safe to configure sessions on; the first Safe of the user otherwise
    #[arg(long)]
    pub safe_address: Option<String>,

    #[arg(long)]
    pub chain_id: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "safeliza_sdk=info,safeliza_tests_e2e=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    println!("🚀 Starting SafeLiza session scenarios...");

    let mut ctx = TestContext::new(&args)?;
    println!("Backend: {}", ctx.backend.config().backend_url);
    println!("Username: {}", ctx.username);

    scenarios::happy_path::run(&mut ctx, &args).await?;
    scenarios::failures::run(&ctx).await?;
    scenarios::access_gate::run(&ctx).await?;

    println!("\n🎉 All scenarios completed successfully!");
    Ok(())
}
