use anyhow::{anyhow, bail, Context, Result};
use safeliza_sdk::{SessionBackend, SigningState};
use safeliza_state::{AccountRef, Receipt, ValueLimitForm};

use crate::common::TestContext;
use crate::Args;

pub async fn run(ctx: &mut TestContext, args: &Args) -> Result<()> {
    println!("\n🚀 Running Happy Path Scenario...");

    // 1. Passkey signup and login
    println!("\n[1/6] Registering passkey...");
    let registration = ctx
        .passkeys()
        .register(&ctx.username)
        .await
        .context("Passkey registration failed")?;
    println!("Credential: {}", registration.credential_id);
    println!("Public key: {}", registration.public_key_hex);

    println!("\n[2/6] Logging in with discoverable credential...");
    let credential_id = ctx.passkeys().login().await.context("Passkey login failed")?;
    if credential_id != registration.credential_id {
        bail!("Login picked {} instead of the new credential", credential_id);
    }

    // 2. Resolve the Safe to act on
    println!("\n[3/6] Resolving Safe...");
    let user = ctx.backend.current_user().await.context("Fetching user failed")?;
    let account = match (&args.safe_address, args.chain_id) {
        (Some(safe), Some(chain_id)) => AccountRef::new(safe.parse()?, chain_id),
        _ => user
            .accounts()
            .next()
            .ok_or_else(|| anyhow!("User {} has no Safe", user.username))?,
    };
    ctx.account = Some(account);
    println!("Account: {}", account);

    let modules = ctx
        .backend
        .installed_modules(&account)
        .await
        .context("Fetching installed modules failed")?;
    println!("Installed modules: {:?}", modules);

    // 3. Configure and approve a value-limited session
    println!("\n[4/6] Submitting session configuration...");
    let cache = ctx.cache();
    let before = cache.fetch(account).await.context("Listing sessions failed")?;
    let mut orchestrator = ctx.orchestrator()?.with_session_cache(cache.clone());
    orchestrator.config_mut()?.value_limit = ValueLimitForm::new(true, "0.01".parse()?)?;

    let pending = orchestrator.submit().await.context("Configure session failed")?;
    println!("Pending hash: {}", pending.hash);

    println!("\n[5/6] Approving with passkey...");
    let receipt = orchestrator.approve().await.context("Approval failed")?;
    match (&receipt, orchestrator.state()) {
        (Receipt::SessionCreation(r), SigningState::Signed(_)) => {
            println!("Transaction: {:?}", r.transaction_hash)
        },
        (other, state) => bail!("Unexpected outcome {:?} in state {}", other, state.name()),
    }

    // 4. The new session shows up in the refreshed list
    println!("\n[6/6] Checking session list...");
    let after = cache.records();
    if after.len() <= before.len() {
        bail!(
            "Session list did not grow ({} before, {} after)",
            before.len(),
            after.len()
        );
    }
    for record in &after {
        println!(
            "  {} endpoint={} active={}",
            record.permission_id, record.endpoint.url, record.endpoint.active
        );
    }

    println!("✅ Happy path completed");
    Ok(())
}
