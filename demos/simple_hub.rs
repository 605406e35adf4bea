//! Minimal hub embedding
//!
//! Run with: cargo run --example simple_hub
//!
//! Creates a hub, connects two devices for the same user, sends a direct
//! message and drains one stream to stdout. In a real deployment the drain
//! loop lives in the HTTP handler that owns the `text/event-stream`
//! response.

use sse_hub::{ConnectMeta, NotificationMessage, SseHub};

#[tokio::main]
async fn main() -> sse_hub::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let hub = SseHub::new();
    hub.start_monitor();

    let meta = ConnectMeta::new()
        .user_agent("demo/0.1")
        .remote_addr("127.0.0.1:0");
    let mut phone = hub.connect("alice-phone", "alice", meta.clone(), None).await?;
    let _laptop = hub.connect("alice-laptop", "alice", meta, None).await?;

    let message = NotificationMessage::new("chat", "bob", "Hi", "Hello from bob")
        .with_receiver("alice");
    let outcome = hub.send_to_user("alice", &message).await?;
    println!(
        "sent to {} device(s), {} offline",
        outcome.delivered, outcome.offline
    );

    hub.disconnect("alice-phone").await;

    // Drain the phone's stream: connect event, the chat message, then the
    // completion signal ends the loop.
    while let Some(frame) = phone.next_event().await {
        print!("{}", String::from_utf8_lossy(&frame));
    }

    hub.shutdown().await;
    Ok(())
}
