//! Line-based chat client
//!
//! Every stdin line becomes the pending input and is sent on its own task,
//! so a slow reply never blocks typing. The transcript is printed by a store
//! subscriber as messages are appended.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};

use crate::conversation::StoreEvent;
use crate::core::ExchangeController;

const QUIT: &str = "/quit";

pub async fn run(controller: ExchangeController) -> anyhow::Result<()> {
    let store = Arc::clone(controller.store());
    let subscription = store.subscribe(|event| {
        if let StoreEvent::Appended(message) = event {
            println!("{}: {}", message.role, message.text);
        }
    });

    println!("Type a message and press Enter ({} to exit).", QUIT);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut in_flight = Vec::new();

    while let Some(line) = lines.next_line().await? {
        if line.trim() == QUIT {
            break;
        }

        controller.set_pending_input(line);
        if let Some(handle) = controller.dispatch() {
            in_flight.push(handle);
        }
        in_flight.retain(|handle| !handle.is_finished());
    }

    // Replies still on their way are waited for so none are lost on exit.
    for result in futures::future::join_all(in_flight).await {
        if let Err(e) = result {
            tracing::warn!("Exchange task ended abnormally: {}", e);
        }
    }

    store.unsubscribe(subscription);
    tracing::info!("Chat closed with {} message(s)", store.len());

    Ok(())
}
