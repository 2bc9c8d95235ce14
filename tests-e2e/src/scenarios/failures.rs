use anyhow::{bail, Result};
use safeliza_sdk::{AuthenticatorError, SafelizaSdkError, SigningState};
use safeliza_state::PolicyConfig;

use crate::common::TestContext;

pub async fn run(ctx: &TestContext) -> Result<()> {
    println!("\n🛡️  Running Failure Scenarios...");

    // 1. Approve with nothing pending
    println!("\n[1/3] Approve without pending session...");
    let mut orchestrator = ctx.orchestrator()?;
    match orchestrator.approve().await {
        Err(SafelizaSdkError::InvalidState { .. }) => println!("Rejected as expected"),
        other => bail!("Expected InvalidState, got {:?}", other),
    }

    // 2. Declined passkey keeps the pending hash
    println!("\n[2/3] Declined passkey prompt...");
    let mut config = PolicyConfig::default();
    config.sudo.active = true;
    orchestrator.set_config(config)?;
    let pending = orchestrator.submit().await?;

    ctx.authenticator
        .fail_next(AuthenticatorError::Declined("NotAllowedError".into()));
    match orchestrator.approve().await {
        Err(SafelizaSdkError::Authenticator(AuthenticatorError::Declined(_))) => {},
        other => bail!("Expected a declined prompt, got {:?}", other),
    }
    match orchestrator.state() {
        SigningState::AwaitingApproval(p) if p.hash == pending.hash => {
            println!("Still awaiting approval of {}", p.hash)
        },
        state => bail!("Pending session lost, state is {}", state.name()),
    }

    // 3. A second editor for the same Safe is refused while one is pending
    println!("\n[3/3] Concurrent submission for the same Safe...");
    let mut second = ctx.orchestrator()?;
    second.set_config(orchestrator.config().clone())?;
    match second.submit().await {
        Err(SafelizaSdkError::PendingSessionBusy(account)) => {
            println!("Refused for {}", account)
        },
        other => bail!("Expected PendingSessionBusy, got {:?}", other),
    }
    orchestrator.discard_pending()?;

    println!("✅ Failure scenarios completed");
    Ok(())
}
