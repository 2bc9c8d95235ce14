use anyhow::{bail, Context, Result};
use safeliza_sdk::SessionAccessGate;

use crate::common::TestContext;

pub async fn run(ctx: &TestContext) -> Result<()> {
    println!("\n🔌 Running Endpoint Access Scenario...");

    let account = ctx.account()?;
    let cache = ctx.cache();
    let records = cache.fetch(account).await.context("Listing sessions failed")?;
    let Some(record) = records.iter().find(|r| !r.endpoint.url.is_empty()) else {
        println!("No session exposes an endpoint, skipping");
        return Ok(());
    };

    let gate = SessionAccessGate::for_record(ctx.backend.clone(), account, record)
        .with_refresh(cache.clone());
    let initial = gate.is_active();
    println!("Endpoint {} active={}", gate.url(), initial);

    println!("\n[1/2] Flipping endpoint...");
    let flipped = gate.toggle(!initial).await.context("Toggle failed")?;
    let listed = cache
        .record(&record.permission_id)
        .map(|r| r.endpoint.active);
    if flipped == initial || listed != Some(flipped) {
        bail!(
            "Endpoint did not flip (gate={}, listed={:?})",
            flipped,
            listed
        );
    }

    println!("\n[2/2] Restoring endpoint...");
    gate.toggle(initial).await.context("Restore failed")?;

    println!("✅ Endpoint access completed");
    Ok(())
}
