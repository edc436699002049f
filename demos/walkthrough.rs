//! Walkthrough of the linking subsystem
//!
//! This example demonstrates:
//! - Issuing an access code and redeeming it as a student
//! - The request/approval workflow, including a rejection
//! - Unlinking and relinking
//! - Observing lifecycle events on the event bus
//!
//! Run with `RUST_LOG=company_links=debug cargo run --example walkthrough`
//! to see the service spans.

use chrono::Duration;
use company_links::prelude::*;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    println!("🔗 Company Links Walkthrough");
    println!("============================\n");

    // Actors live in an external identity store; an in-memory directory stands in
    let actors = InMemoryActorDirectory::new();
    let alice = actors.add_student(3)?;
    let bob = actors.add_student(4)?;
    let acme = actors.add_company(7, Some("Acme Logistics"))?;

    let service = LinkingService::new(
        Arc::new(InMemoryLinkingStore::new()),
        Arc::new(actors),
        LinkingConfig::default(),
    )?
    .with_events();

    let mut events = service
        .event_bus()
        .map(EventBus::subscribe)
        .ok_or_else(|| anyhow::anyhow!("event bus not enabled"))?;
    let listener = tokio::spawn(async move {
        while let Ok(envelope) = events.recv().await {
            println!("   📣 event: {}", envelope.event.name());
        }
    });

    let now = Utc::now();

    // 1. Token flow
    println!("1️⃣  Issuing a single-use code for company {}", acme);
    let issued = service.issue_token(IssueToken::new(acme), now).await?;
    println!(
        "   code {} for {} (expires {})",
        issued.code,
        issued.company_name.as_deref().unwrap_or("unnamed company"),
        issued.expires_at
    );

    let link = service
        .redeem_token(
            RedeemToken::new(issued.code.to_lowercase(), alice),
            now + Duration::minutes(2),
        )
        .await?;
    println!("   ✅ student {} linked via {}", link.student_id, link.origin);

    match service
        .redeem_token(RedeemToken::new(issued.code.clone(), bob), now + Duration::minutes(3))
        .await
    {
        Err(e) => println!("   ❌ second redemption refused: {} ({})", e, e.error_code()),
        Ok(_) => println!("   ⚠️  second redemption unexpectedly succeeded"),
    }

    // 2. Request flow
    println!("\n2️⃣  Student {} asks to join company {}", bob, acme);
    let request = service
        .create_request(CreateRequest::new(bob, acme), now)
        .await?;
    let inbox = service
        .list_company_requests(acme, Some(RequestStatus::Pending))
        .await?;
    println!("   pending requests for {}: {}", acme, inbox.len());

    let link = service
        .approve_request(&request.id, now + Duration::hours(1))
        .await?;
    println!("   ✅ approved, link {} (origin {})", link.id, link.origin);

    // 3. Unlink and relink
    println!("\n3️⃣  Unlinking and relinking student {}", bob);
    let unlinked = service
        .deactivate_link(&link.id, now + Duration::days(1))
        .await?;
    println!("   unlinked at {:?}", unlinked.unlinked_at);

    let retry = service
        .create_request(CreateRequest::new(bob, acme), now + Duration::days(2))
        .await?;
    let rejected = service
        .reject_request(
            &retry.id,
            RejectRequest::with_reason("no openings this term"),
            now + Duration::days(2),
        )
        .await?;
    println!(
        "   request rejected: {}",
        rejected.rejection_reason().unwrap_or("no reason given")
    );

    let relinked = service
        .reactivate_link(&link.id, now + Duration::days(3))
        .await?;
    println!("   ✅ relinked, active = {}", relinked.active);

    // 4. Summary
    println!("\n📋 Active links of company {}:", acme);
    for link in service.list_company_links(acme, Some(true)).await? {
        println!("   - student {} since {} ({})", link.student_id, link.linked_at, link.origin);
    }

    drop(service);
    listener.await?;
    Ok(())
}
