//! Group fan-out walkthrough
//!
//! Run with: cargo run --example group_fanout
//!
//! Demonstrates the group lifecycle: auto-create on first join, member
//! change notifications, kick authorization, and delete-on-empty.

use sse_hub::{ConnectMeta, HubConfig, NotificationMessage, SseHub};

#[tokio::main]
async fn main() -> sse_hub::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let hub = SseHub::with_config(HubConfig::default());
    hub.start_monitor();

    // First join creates the group; alice becomes creator and admin.
    let mut alice = hub
        .connect_to_group("alice-1", "alice", "ops", ConnectMeta::new())
        .await?;
    let _bob = hub
        .connect_to_group("bob-1", "bob", "ops", ConnectMeta::new())
        .await?;

    let info = hub.group_info("ops").await.expect("group exists");
    println!("group created by {}, admins: {:?}", info.creator, info.administrators);

    hub.send_to_group("ops", &NotificationMessage::chat("bob", "ops", "Hi", "morning"))
        .await?;
    hub.send_system_to_group("ops", "deploy starts in 5 minutes").await?;

    // bob is not an admin, so this is denied.
    let denied = hub.kick("alice-1", "ops", "bob").await?;
    println!("bob kicking alice: {}", denied);

    // alice can kick bob.
    let kicked = hub.kick("bob-1", "ops", "alice").await?;
    println!("alice kicking bob: {}", kicked);

    let stats = hub.group_statistics().await;
    println!("groups: {}, members: {}", stats.total_groups, stats.total_members);

    // Last member leaving deletes the group entirely.
    hub.leave_group("alice-1", "ops").await?;
    println!("group still exists: {}", hub.group_exists("ops").await);

    hub.shutdown().await;

    while let Some(frame) = alice.next_event().await {
        print!("{}", String::from_utf8_lossy(&frame));
    }
    Ok(())
}
