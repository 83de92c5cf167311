//! Exchange controller
//!
//! Drives one send cycle: validate the pending input, record the user
//! message, ask the remote assistant, and record exactly one assistant
//! message when the call resolves. Remote failures never escape; they turn
//! into a fixed transcript entry.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::conversation::{Message, TranscriptStore};
use crate::providers::{AssistantReply, ProviderError, RemoteAssistant};

pub const NO_RESPONSE: &str = "No response.";
pub const REMOTE_FAILURE: &str = "Error contacting the server.";

#[derive(Clone)]
pub struct ExchangeController {
    store: Arc<TranscriptStore>,
    remote: Arc<dyn RemoteAssistant>,
}

impl ExchangeController {
    pub fn new(store: Arc<TranscriptStore>, remote: Arc<dyn RemoteAssistant>) -> Self {
        Self { store, remote }
    }

    pub fn store(&self) -> &Arc<TranscriptStore> {
        &self.store
    }

    pub fn set_pending_input(&self, text: impl Into<String>) {
        self.store.set_pending_input(text);
    }

    /// Consume the pending input into a user message
    ///
    /// Returns `None` without touching the transcript when the input is
    /// blank. Otherwise the verbatim input is appended and the pending input
    /// cleared before this returns.
    pub fn begin(&self) -> Option<PendingExchange> {
        let text = self
            .store
            .take_pending_input(|text| !text.trim().is_empty())?;

        Some(PendingExchange {
            store: Arc::clone(&self.store),
            remote: Arc::clone(&self.remote),
            text,
        })
    }

    /// Run a full cycle in place
    pub async fn send(&self) {
        if let Some(exchange) = self.begin() {
            exchange.resolve().await;
        }
    }

    /// Run a full cycle on its own task
    ///
    /// The user message is already in the transcript when this returns.
    /// Cycles started this way are independent of each other and may finish
    /// in any order.
    pub fn dispatch(&self) -> Option<JoinHandle<()>> {
        let exchange = self.begin()?;
        Some(tokio::spawn(async move {
            exchange.resolve().await;
        }))
    }
}

/// A cycle whose user message is recorded but whose reply is outstanding
pub struct PendingExchange {
    store: Arc<TranscriptStore>,
    remote: Arc<dyn RemoteAssistant>,
    text: String,
}

impl PendingExchange {
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Wait for the remote call and append the assistant message
    pub async fn resolve(self) -> Message {
        let outcome = self.remote.ask(&self.text).await;
        if let Err(ref e) = outcome {
            tracing::warn!("Assistant request failed: {}", e);
        }

        let message = Message::assistant(reply_text(outcome));
        self.store.append(message.clone());
        message
    }
}

/// Map a resolved remote call to the text shown to the user
///
/// A successful payload prefers `response`, then `error`, then a fixed
/// fallback. Empty strings count as missing. Any failure maps to one fixed
/// message.
pub fn reply_text(outcome: Result<AssistantReply, ProviderError>) -> String {
    match outcome {
        Ok(reply) => reply
            .response
            .filter(|text| !text.is_empty())
            .or(reply.error.filter(|text| !text.is_empty()))
            .unwrap_or_else(|| NO_RESPONSE.to_string()),
        Err(_) => REMOTE_FAILURE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::Role;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio::sync::oneshot;
    use tokio_test::{assert_pending, assert_ready, task};

    /// Replies from a queue and records every request
    struct ScriptedAssistant {
        replies: Mutex<VecDeque<Result<AssistantReply, ProviderError>>>,
        requests: Mutex<Vec<String>>,
    }

    impl ScriptedAssistant {
        fn new() -> Self {
            Self {
                replies: Mutex::new(VecDeque::new()),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn reply(self, reply: AssistantReply) -> Self {
            self.replies.lock().unwrap().push_back(Ok(reply));
            self
        }

        fn fail(self, message: &str) -> Self {
            self.replies
                .lock()
                .unwrap()
                .push_back(Err(ProviderError::InvalidResponse(message.to_string())));
            self
        }

        fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RemoteAssistant for ScriptedAssistant {
        async fn ask(&self, text: &str) -> Result<AssistantReply, ProviderError> {
            self.requests.lock().unwrap().push(text.to_string());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ProviderError::InvalidResponse("no reply queued".into())))
        }
    }

    /// Replies only when the test releases the matching gate
    struct GatedAssistant {
        gates: Mutex<VecDeque<oneshot::Receiver<AssistantReply>>>,
    }

    #[async_trait]
    impl RemoteAssistant for GatedAssistant {
        async fn ask(&self, _text: &str) -> Result<AssistantReply, ProviderError> {
            let gate = self.gates.lock().unwrap().pop_front();
            match gate {
                Some(rx) => rx
                    .await
                    .map_err(|_| ProviderError::InvalidResponse("gate dropped".into())),
                None => Err(ProviderError::InvalidResponse("no gate".into())),
            }
        }
    }

    fn controller(remote: Arc<dyn RemoteAssistant>) -> ExchangeController {
        ExchangeController::new(Arc::new(TranscriptStore::new()), remote)
    }

    #[tokio::test]
    async fn test_blank_input_is_a_noop() {
        let remote = Arc::new(ScriptedAssistant::new());
        let ctl = controller(remote.clone());

        for blank in ["", "   ", "\t\n "] {
            ctl.set_pending_input(blank);
            ctl.send().await;
            assert!(ctl.begin().is_none());
        }

        assert!(ctl.store().is_empty());
        assert!(remote.requests().is_empty());
    }

    #[tokio::test]
    async fn test_repeated_blank_sends_never_grow_transcript() {
        let remote = Arc::new(ScriptedAssistant::new().reply(AssistantReply::response("ok")));
        let ctl = controller(remote.clone());

        ctl.set_pending_input("real");
        ctl.send().await;
        let len = ctl.store().len();

        ctl.set_pending_input("  ");
        for _ in 0..5 {
            ctl.send().await;
            assert!(ctl.dispatch().is_none());
        }

        assert_eq!(ctl.store().len(), len);
        assert_eq!(remote.requests(), vec!["real"]);
    }

    #[test]
    fn test_user_message_recorded_before_resolution() {
        let (tx, rx) = oneshot::channel();
        let remote = Arc::new(GatedAssistant {
            gates: Mutex::new(VecDeque::from([rx])),
        });
        let ctl = controller(remote);

        ctl.set_pending_input("X");
        let exchange = ctl.begin().expect("non-blank input starts a cycle");

        assert_eq!(ctl.store().messages(), vec![Message::user("X")]);
        assert_eq!(ctl.store().pending_input(), "");

        let mut resolving = task::spawn(exchange.resolve());
        assert_pending!(resolving.poll());
        assert_eq!(ctl.store().len(), 1);

        tx.send(AssistantReply::response("done")).unwrap();
        let message = assert_ready!(resolving.poll());
        assert_eq!(message, Message::assistant("done"));
        assert_eq!(ctl.store().last(), Some(Message::assistant("done")));
    }

    #[tokio::test]
    async fn test_input_is_stored_and_sent_verbatim() {
        let remote = Arc::new(ScriptedAssistant::new().reply(AssistantReply::response("ok")));
        let ctl = controller(remote.clone());

        ctl.set_pending_input("  padded  ");
        ctl.send().await;

        assert_eq!(ctl.store().messages()[0], Message::user("  padded  "));
        assert_eq!(remote.requests(), vec!["  padded  "]);
    }

    #[tokio::test]
    async fn test_response_field_becomes_reply() {
        let remote = Arc::new(ScriptedAssistant::new().reply(AssistantReply::response("hello")));
        let ctl = controller(remote);

        ctl.set_pending_input("hi");
        ctl.send().await;

        assert_eq!(ctl.store().last(), Some(Message::assistant("hello")));
    }

    #[tokio::test]
    async fn test_empty_payload_falls_back() {
        let remote = Arc::new(ScriptedAssistant::new().reply(AssistantReply::default()));
        let ctl = controller(remote);

        ctl.set_pending_input("hi");
        ctl.send().await;

        assert_eq!(ctl.store().last(), Some(Message::assistant(NO_RESPONSE)));
    }

    #[tokio::test]
    async fn test_error_field_is_displayed() {
        let remote = Arc::new(ScriptedAssistant::new().reply(AssistantReply::error("bad input")));
        let ctl = controller(remote);

        ctl.set_pending_input("hi");
        ctl.send().await;

        assert_eq!(ctl.store().last(), Some(Message::assistant("bad input")));
    }

    #[tokio::test]
    async fn test_remote_failure_is_absorbed() {
        let remote = Arc::new(ScriptedAssistant::new().fail("connection refused"));
        let ctl = controller(remote);

        ctl.set_pending_input("hi");
        ctl.send().await;

        let messages = ctl.store().messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1], Message::assistant(REMOTE_FAILURE));
    }

    #[tokio::test]
    async fn test_full_exchange() {
        let remote = Arc::new(ScriptedAssistant::new().reply(AssistantReply::response("Hello!")));
        let ctl = controller(remote);

        ctl.set_pending_input("Hi");
        ctl.send().await;

        assert_eq!(
            ctl.store().messages(),
            vec![Message::user("Hi"), Message::assistant("Hello!")]
        );
        assert_eq!(ctl.store().pending_input(), "");
    }

    #[test]
    fn test_overlapping_cycles_each_get_a_reply() {
        let (tx_first, rx_first) = oneshot::channel();
        let (tx_second, rx_second) = oneshot::channel();
        let remote = Arc::new(GatedAssistant {
            gates: Mutex::new(VecDeque::from([rx_first, rx_second])),
        });
        let ctl = controller(remote);

        ctl.set_pending_input("first");
        let first = ctl.begin().unwrap();
        ctl.set_pending_input("second");
        let second = ctl.begin().unwrap();

        let mut first = task::spawn(first.resolve());
        let mut second = task::spawn(second.resolve());
        assert_pending!(first.poll());
        assert_pending!(second.poll());

        tx_second.send(AssistantReply::response("reply two")).unwrap();
        assert_ready!(second.poll());
        tx_first.send(AssistantReply::response("reply one")).unwrap();
        assert_ready!(first.poll());

        let roles_and_texts: Vec<_> = ctl
            .store()
            .messages()
            .into_iter()
            .map(|m| (m.role, m.text))
            .collect();
        assert_eq!(
            roles_and_texts,
            vec![
                (Role::User, "first".to_string()),
                (Role::User, "second".to_string()),
                (Role::Assistant, "reply two".to_string()),
                (Role::Assistant, "reply one".to_string()),
            ]
        );
    }

    #[test]
    fn test_concurrent_begins_take_the_input_once() {
        let ctl = controller(Arc::new(ScriptedAssistant::new()));
        ctl.set_pending_input("once");

        let started = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8).map(|_| scope.spawn(|| ctl.begin())).collect();
            handles
                .into_iter()
                .filter_map(|h| h.join().unwrap())
                .count()
        });

        assert_eq!(started, 1);
        assert_eq!(ctl.store().messages(), vec![Message::user("once")]);
        assert_eq!(ctl.store().pending_input(), "");
    }

    #[tokio::test]
    async fn test_dispatch_runs_cycle_on_a_task() {
        let remote = Arc::new(ScriptedAssistant::new().reply(AssistantReply::response("later")));
        let ctl = controller(remote);

        ctl.set_pending_input("go");
        let handle = ctl.dispatch().expect("cycle started");
        assert_eq!(ctl.store().messages(), vec![Message::user("go")]);

        handle.await.unwrap();
        assert_eq!(ctl.store().last(), Some(Message::assistant("later")));
    }

    #[test]
    fn test_reply_text_precedence() {
        assert_eq!(
            reply_text(Ok(AssistantReply {
                response: Some("r".into()),
                error: Some("e".into()),
            })),
            "r"
        );
        assert_eq!(
            reply_text(Ok(AssistantReply {
                response: Some(String::new()),
                error: Some("e".into()),
            })),
            "e"
        );
        assert_eq!(
            reply_text(Ok(AssistantReply {
                response: None,
                error: Some(String::new()),
            })),
            NO_RESPONSE
        );
        assert_eq!(
            reply_text(Err(ProviderError::InvalidResponse("x".into()))),
            REMOTE_FAILURE
        );
    }
}
