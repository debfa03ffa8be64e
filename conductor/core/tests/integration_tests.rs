//! Integration tests for the conversation state machine
//!
//! These tests drive a Conductor against a scripted backend and verify:
//! - optimistic append, reply append and session promotion
//! - exactly one save per exchange, issued after the reply
//! - failure handling (generation, save, fetch)
//! - session switching while an exchange is in flight
//! - typing reveals of fresh replies

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use tokio::sync::{mpsc, Notify};

use smartchat_core::backend::{
    ApiError, Generator, RemoteMessage, SaveRequest, SaveResponse, SessionStore, SessionSummary,
};
use smartchat_core::{
    ChatMode, Conductor, ConductorConfig, ConductorMessage, ConductorState, Message, MessageKind,
    NotifyLevel, SessionId, SurfaceEvent,
};

// =============================================================================
// Scripted backend
// =============================================================================

#[derive(Default)]
struct MockBackend {
    answer: String,
    image_url: String,
    chat_id: String,
    fail_generate: AtomicBool,
    fail_save: AtomicBool,
    fail_fetch: AtomicBool,
    /// When set, generation waits for a permit
    gate: Option<Arc<Notify>>,
    /// When set, fetching a session waits for a permit
    fetch_gate: Option<Arc<Notify>>,
    prompts: Mutex<Vec<(String, ChatMode)>>,
    saved: Mutex<Vec<SaveRequest>>,
    stored: Mutex<HashMap<SessionId, Vec<RemoteMessage>>>,
}

impl MockBackend {
    fn replying(answer: &str, chat_id: &str) -> Self {
        Self {
            answer: answer.to_string(),
            image_url: "http://x/y.png".to_string(),
            chat_id: chat_id.to_string(),
            ..Self::default()
        }
    }

    fn gated(mut self, gate: &Arc<Notify>) -> Self {
        self.gate = Some(Arc::clone(gate));
        self
    }

    fn store(&self, id: &str, records: Vec<RemoteMessage>) {
        self.stored
            .lock()
            .unwrap()
            .insert(SessionId::from(id), records);
    }

    fn saved(&self) -> Vec<SaveRequest> {
        self.saved.lock().unwrap().clone()
    }

    fn prompt_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    async fn reply(&self, prompt: &str, mode: ChatMode, payload: &str) -> Result<String, ApiError> {
        self.prompts
            .lock()
            .unwrap()
            .push((prompt.to_string(), mode));

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        if self.fail_generate.load(Ordering::SeqCst) {
            return Err(ApiError::Status {
                endpoint: "/text-to-text".to_string(),
                status: 500,
                body: "{\"error\":\"model offline\"}".to_string(),
            });
        }
        Ok(payload.to_string())
    }
}

#[async_trait]
impl Generator for MockBackend {
    fn name(&self) -> &str {
        "Mock"
    }

    async fn health_check(&self) -> bool {
        true
    }

    async fn generate_text(&self, prompt: &str) -> Result<String, ApiError> {
        self.reply(prompt, ChatMode::Text, &self.answer).await
    }

    async fn generate_image(&self, prompt: &str) -> Result<String, ApiError> {
        self.reply(prompt, ChatMode::Image, &self.image_url).await
    }
}

#[async_trait]
impl SessionStore for MockBackend {
    async fn list_sessions(&self) -> Result<Vec<SessionSummary>, ApiError> {
        Ok(self
            .stored
            .lock()
            .unwrap()
            .keys()
            .map(|id| SessionSummary {
                id: id.clone(),
                title: None,
            })
            .collect())
    }

    async fn fetch_messages(&self, id: &SessionId) -> Result<Vec<RemoteMessage>, ApiError> {
        if let Some(gate) = &self.fetch_gate {
            gate.notified().await;
        }
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(ApiError::Other("connection reset".to_string()));
        }
        Ok(self
            .stored
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .unwrap_or_default())
    }

    async fn save_exchange(&self, record: &SaveRequest) -> Result<SaveResponse, ApiError> {
        self.saved.lock().unwrap().push(record.clone());
        if self.fail_save.load(Ordering::SeqCst) {
            return Err(ApiError::Status {
                endpoint: "/save-chat".to_string(),
                status: 400,
                body: "{\"error\":\"Missing prompt or response\"}".to_string(),
            });
        }
        Ok(SaveResponse {
            chat_id: SessionId::new(self.chat_id.clone()),
        })
    }

    async fn delete_session(&self, id: &SessionId) -> Result<(), ApiError> {
        self.stored.lock().unwrap().remove(id);
        Ok(())
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn setup(
    backend: MockBackend,
) -> (
    Conductor<MockBackend>,
    Arc<MockBackend>,
    mpsc::Receiver<ConductorMessage>,
) {
    let backend = Arc::new(backend);
    let (tx, rx) = mpsc::channel(256);
    let config = ConductorConfig {
        typing_tick: Duration::from_millis(12),
        ..ConductorConfig::default()
    };
    let conductor = Conductor::with_shared_backend(Arc::clone(&backend), config, tx);
    (conductor, backend, rx)
}

fn drain(rx: &mut mpsc::Receiver<ConductorMessage>) -> Vec<ConductorMessage> {
    let mut messages = Vec::new();
    while let Ok(msg) = rx.try_recv() {
        messages.push(msg);
    }
    messages
}

fn messages(conductor: &Conductor<MockBackend>) -> Vec<Message> {
    conductor.conversation().message_values().cloned().collect()
}

fn record(role: &str, content: &str, kind: Option<&str>) -> RemoteMessage {
    RemoteMessage {
        role: role.to_string(),
        content: content.to_string(),
        kind: kind.map(str::to_string),
    }
}

// =============================================================================
// Exchanges
// =============================================================================

#[tokio::test]
async fn test_text_exchange() {
    let (mut conductor, backend, mut rx) = setup(MockBackend::replying("4", "abc"));

    assert!(conductor.send("2+2?", ChatMode::Text).await);
    assert!(conductor.is_generating());
    assert_eq!(conductor.state(), ConductorState::Sending);
    // Optimistic append
    assert_eq!(messages(&conductor), vec![Message::user("2+2?")]);

    conductor.await_exchange().await;

    assert_eq!(
        messages(&conductor),
        vec![Message::user("2+2?"), Message::bot("4", true)]
    );
    assert_eq!(conductor.session_id(), Some(&SessionId::from("abc")));
    assert!(!conductor.is_generating());
    assert_eq!(conductor.state(), ConductorState::Idle);

    assert_eq!(
        backend.saved(),
        vec![SaveRequest {
            chat_id: None,
            prompt: "2+2?".to_string(),
            response: "4".to_string(),
            mode: ChatMode::Text,
        }]
    );

    assert_eq!(
        drain(&mut rx),
        vec![
            ConductorMessage::State {
                state: ConductorState::Sending
            },
            ConductorMessage::SessionChanged {
                session_id: Some(SessionId::from("abc"))
            },
            ConductorMessage::State {
                state: ConductorState::Idle
            },
            ConductorMessage::ClearInput,
        ]
    );
}

#[tokio::test]
async fn test_image_exchange() {
    let (mut conductor, backend, _rx) = setup(MockBackend::replying("unused", "z1"));

    assert!(conductor.send("a red cat", ChatMode::Image).await);
    conductor.await_exchange().await;

    assert_eq!(
        messages(&conductor),
        vec![
            Message::user("a red cat"),
            Message::image("http://x/y.png", true)
        ]
    );
    assert_eq!(conductor.session_id(), Some(&SessionId::from("z1")));

    let saved = backend.saved();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].response, "http://x/y.png");
    assert_eq!(saved[0].mode, ChatMode::Image);
}

#[tokio::test]
async fn test_follow_up_saves_into_session() {
    let (mut conductor, backend, _rx) = setup(MockBackend::replying("4", "abc"));

    conductor.send("2+2?", ChatMode::Text).await;
    conductor.await_exchange().await;
    conductor.send("and 3+3?", ChatMode::Text).await;
    conductor.await_exchange().await;

    let saved = backend.saved();
    assert_eq!(saved.len(), 2);
    assert_eq!(saved[0].chat_id, None);
    assert_eq!(saved[1].chat_id, Some(SessionId::from("abc")));
    assert_eq!(conductor.conversation().len(), 4);
}

#[tokio::test]
async fn test_blank_input_is_ignored() {
    let (mut conductor, backend, mut rx) = setup(MockBackend::replying("4", "abc"));

    assert!(!conductor.send("", ChatMode::Text).await);
    assert!(!conductor.send("   ", ChatMode::Text).await);
    assert!(!conductor.send("\n\t", ChatMode::Image).await);

    assert!(conductor.conversation().is_empty());
    assert!(!conductor.is_generating());
    assert_eq!(backend.prompt_count(), 0);
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn test_send_while_generating_is_ignored() {
    let gate = Arc::new(Notify::new());
    let (mut conductor, backend, _rx) = setup(MockBackend::replying("4", "abc").gated(&gate));

    assert!(conductor.send("first", ChatMode::Text).await);
    assert!(!conductor.send("second", ChatMode::Text).await);
    assert_eq!(conductor.conversation().len(), 1);

    gate.notify_one();
    conductor.await_exchange().await;

    assert_eq!(conductor.conversation().len(), 2);
    assert_eq!(backend.prompt_count(), 1);
    assert_eq!(backend.saved().len(), 1);
}

#[tokio::test]
async fn test_input_is_sent_verbatim() {
    let (mut conductor, backend, _rx) = setup(MockBackend::replying("ok", "abc"));

    conductor.send("  padded prompt ", ChatMode::Text).await;
    conductor.await_exchange().await;

    assert_eq!(
        *backend.prompts.lock().unwrap(),
        vec![("  padded prompt ".to_string(), ChatMode::Text)]
    );
    assert_eq!(backend.saved()[0].prompt, "  padded prompt ");
}

// =============================================================================
// Failures
// =============================================================================

#[tokio::test]
async fn test_generation_failure() {
    let backend = MockBackend::replying("4", "abc");
    backend.fail_generate.store(true, Ordering::SeqCst);
    let (mut conductor, backend, mut rx) = setup(backend);

    conductor.send("2+2?", ChatMode::Text).await;
    conductor.await_exchange().await;

    assert_eq!(
        messages(&conductor),
        vec![Message::user("2+2?"), Message::bot("❌ Server error", true)]
    );
    assert_eq!(conductor.session_id(), None);
    assert!(!conductor.is_generating());
    // Nothing to persist
    assert!(backend.saved().is_empty());
    assert!(drain(&mut rx).contains(&ConductorMessage::ClearInput));
}

#[tokio::test]
async fn test_generation_failure_keeps_session() {
    let (mut conductor, backend, _rx) = setup(MockBackend::replying("4", "abc"));
    conductor.send("2+2?", ChatMode::Text).await;
    conductor.await_exchange().await;

    backend.fail_generate.store(true, Ordering::SeqCst);
    conductor.send("again", ChatMode::Text).await;
    conductor.await_exchange().await;

    assert_eq!(conductor.conversation().len(), 4);
    assert_eq!(conductor.session_id(), Some(&SessionId::from("abc")));
}

#[tokio::test]
async fn test_save_failure() {
    let backend = MockBackend::replying("4", "abc");
    backend.fail_save.store(true, Ordering::SeqCst);
    let (mut conductor, backend, _rx) = setup(backend);

    conductor.send("2+2?", ChatMode::Text).await;
    conductor.await_exchange().await;

    // The reply was already shown when the save failed
    assert_eq!(
        messages(&conductor),
        vec![
            Message::user("2+2?"),
            Message::bot("4", true),
            Message::server_error(),
        ]
    );
    assert_eq!(conductor.session_id(), None);
    assert_eq!(backend.saved().len(), 1);
    assert!(!conductor.is_generating());
}

// =============================================================================
// Sessions
// =============================================================================

#[tokio::test]
async fn test_open_session() {
    let (mut conductor, backend, mut rx) = setup(MockBackend::replying("4", "abc"));
    backend.store(
        "s9",
        vec![
            record("user", "a red cat", Some("image")),
            record("bot", "http://x/cat.png", Some("image")),
            record("user", "2+2?", None),
            record("bot", "4", Some("text")),
        ],
    );
    conductor.send("old", ChatMode::Text).await;
    conductor.await_exchange().await;
    drain(&mut rx);

    conductor
        .open_session(&SessionSummary::new("s9", "a red cat"))
        .await
        .unwrap();

    assert_eq!(
        messages(&conductor),
        vec![
            Message::user("a red cat"),
            Message::image("http://x/cat.png", false),
            Message::user("2+2?"),
            Message::bot("4", false),
        ]
    );
    assert!(messages(&conductor).iter().all(|m| !m.animate()));
    assert_eq!(conductor.session_id(), Some(&SessionId::from("s9")));
    assert!(conductor.reveals().is_empty());
    assert_eq!(
        drain(&mut rx),
        vec![ConductorMessage::SessionChanged {
            session_id: Some(SessionId::from("s9"))
        }]
    );
}

#[tokio::test]
async fn test_open_session_failure_keeps_state() {
    let (mut conductor, backend, mut rx) = setup(MockBackend::replying("4", "abc"));
    conductor.send("2+2?", ChatMode::Text).await;
    conductor.await_exchange().await;
    drain(&mut rx);

    backend.fail_fetch.store(true, Ordering::SeqCst);
    let result = conductor
        .open_session(&SessionSummary::new("s9", "elsewhere"))
        .await;

    assert!(result.is_err());
    assert_eq!(conductor.conversation().len(), 2);
    assert_eq!(conductor.session_id(), Some(&SessionId::from("abc")));
    let notes = drain(&mut rx);
    assert!(matches!(
        notes.as_slice(),
        [ConductorMessage::Notify {
            level: NotifyLevel::Warning,
            ..
        }]
    ));
}

#[tokio::test]
async fn test_requested_session_applies_on_poll() {
    let gate = Arc::new(Notify::new());
    let mut backend = MockBackend::replying("4", "abc");
    backend.fetch_gate = Some(Arc::clone(&gate));
    let (mut conductor, backend, mut rx) = setup(backend);
    backend.store("s9", vec![record("user", "hi", None), record("bot", "hello", None)]);

    conductor.request_session(SessionSummary::new("s9", "hi"));

    // Nothing changes while the fetch is blocked
    assert!(conductor.is_loading());
    assert!(!conductor.poll_load().await);
    assert!(conductor.conversation().is_empty());

    gate.notify_one();
    let mut polls = 0;
    while conductor.is_loading() {
        conductor.poll_load().await;
        tokio::task::yield_now().await;
        polls += 1;
        assert!(polls < 1000, "load never settled");
    }

    assert_eq!(
        messages(&conductor),
        vec![Message::user("hi"), Message::bot("hello", false)]
    );
    assert_eq!(conductor.session_id(), Some(&SessionId::from("s9")));
    assert_eq!(
        drain(&mut rx),
        vec![ConductorMessage::SessionChanged {
            session_id: Some(SessionId::from("s9"))
        }]
    );
}

#[tokio::test]
async fn test_requested_session_failure_keeps_state() {
    let (mut conductor, backend, mut rx) = setup(MockBackend::replying("4", "abc"));
    conductor.send("2+2?", ChatMode::Text).await;
    conductor.await_exchange().await;
    drain(&mut rx);

    backend.fail_fetch.store(true, Ordering::SeqCst);
    conductor
        .handle_event(SurfaceEvent::OpenSession {
            summary: SessionSummary::new("s9", "elsewhere"),
        })
        .await
        .unwrap();
    conductor.await_load().await;

    assert!(!conductor.is_loading());
    assert_eq!(conductor.conversation().len(), 2);
    assert_eq!(conductor.session_id(), Some(&SessionId::from("abc")));
    assert!(matches!(
        drain(&mut rx).as_slice(),
        [ConductorMessage::Notify {
            level: NotifyLevel::Warning,
            ..
        }]
    ));
}

#[tokio::test]
async fn test_new_chat_supersedes_requested_session() {
    let (mut conductor, backend, mut rx) = setup(MockBackend::replying("4", "abc"));
    backend.store("s9", vec![record("user", "hi", None)]);

    conductor.request_session(SessionSummary::new("s9", "hi"));
    conductor.handle_event(SurfaceEvent::NewChat).await.unwrap();
    conductor.await_load().await;

    assert!(!conductor.is_loading());
    assert!(conductor.conversation().is_empty());
    assert_eq!(conductor.session_id(), None);
    assert_eq!(
        drain(&mut rx),
        vec![ConductorMessage::SessionChanged { session_id: None }]
    );
}

#[tokio::test]
async fn test_new_chat() {
    let (mut conductor, _backend, mut rx) = setup(MockBackend::replying("4", "abc"));
    conductor.send("2+2?", ChatMode::Text).await;
    conductor.await_exchange().await;
    drain(&mut rx);

    conductor.handle_event(SurfaceEvent::NewChat).await.unwrap();

    assert!(conductor.conversation().is_empty());
    assert_eq!(conductor.session_id(), None);
    assert!(conductor.reveals().is_empty());
    assert_eq!(
        drain(&mut rx),
        vec![ConductorMessage::SessionChanged { session_id: None }]
    );
}

#[tokio::test]
async fn test_delete_active_session() {
    let (mut conductor, _backend, _rx) = setup(MockBackend::replying("4", "abc"));
    conductor.send("2+2?", ChatMode::Text).await;
    conductor.await_exchange().await;

    assert!(conductor.delete_session(&SessionId::from("abc")).await);

    assert!(conductor.conversation().is_empty());
    assert_eq!(conductor.session_id(), None);
}

#[tokio::test]
async fn test_delete_other_session() {
    let (mut conductor, _backend, mut rx) = setup(MockBackend::replying("4", "abc"));
    conductor.send("2+2?", ChatMode::Text).await;
    conductor.await_exchange().await;
    drain(&mut rx);
    let epoch = conductor.conversation().epoch();

    conductor
        .handle_event(SurfaceEvent::SessionDeleted {
            session_id: SessionId::from("zzz"),
        })
        .await
        .unwrap();

    assert_eq!(conductor.conversation().len(), 2);
    assert_eq!(conductor.session_id(), Some(&SessionId::from("abc")));
    assert_eq!(conductor.conversation().epoch(), epoch);
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn test_delete_in_unsaved_conversation() {
    let (mut conductor, _backend, _rx) = setup(MockBackend::replying("4", "abc"));
    assert!(!conductor.delete_session(&SessionId::from("abc")).await);
    assert_eq!(conductor.conversation().epoch(), 0);
}

// =============================================================================
// Switching while an exchange is in flight
// =============================================================================

#[tokio::test]
async fn test_result_after_new_chat_is_discarded() {
    let gate = Arc::new(Notify::new());
    let (mut conductor, backend, _rx) = setup(MockBackend::replying("4", "abc").gated(&gate));

    conductor.send("2+2?", ChatMode::Text).await;
    conductor.start_new_session().await;

    gate.notify_one();
    conductor.await_exchange().await;

    assert!(conductor.conversation().is_empty());
    assert_eq!(conductor.session_id(), None);
    assert!(!conductor.is_generating());
    // The exchange was still persisted
    assert_eq!(backend.saved().len(), 1);
    assert_eq!(backend.saved()[0].response, "4");
}

#[tokio::test]
async fn test_result_after_open_session_is_discarded() {
    let gate = Arc::new(Notify::new());
    let (mut conductor, backend, _rx) = setup(MockBackend::replying("4", "abc").gated(&gate));
    backend.store("s9", vec![record("user", "hi", None), record("bot", "hello", None)]);

    conductor.send("2+2?", ChatMode::Text).await;
    conductor
        .open_session(&SessionSummary::new("s9", "hi"))
        .await
        .unwrap();
    // Still generating: the old exchange has not settled
    assert!(!conductor.send("blocked", ChatMode::Text).await);

    gate.notify_one();
    conductor.await_exchange().await;

    assert_eq!(
        messages(&conductor),
        vec![Message::user("hi"), Message::bot("hello", false)]
    );
    assert_eq!(conductor.session_id(), Some(&SessionId::from("s9")));
    assert_eq!(backend.saved().len(), 1);
    assert_eq!(backend.saved()[0].chat_id, None);
}

#[tokio::test]
async fn test_failure_after_switch_is_discarded() {
    let gate = Arc::new(Notify::new());
    let backend = MockBackend::replying("4", "abc").gated(&gate);
    backend.fail_generate.store(true, Ordering::SeqCst);
    let (mut conductor, _backend, _rx) = setup(backend);

    conductor.send("2+2?", ChatMode::Text).await;
    conductor.start_new_session().await;
    gate.notify_one();
    conductor.await_exchange().await;

    assert!(conductor.conversation().is_empty());
    assert!(!conductor.is_generating());
}

// =============================================================================
// Surface events and polling
// =============================================================================

#[tokio::test]
async fn test_user_message_uses_current_mode() {
    let (mut conductor, backend, _rx) = setup(MockBackend::replying("4", "z1"));

    conductor.handle_event(SurfaceEvent::ToggleMode).await.unwrap();
    conductor
        .handle_event(SurfaceEvent::user_message("a red cat"))
        .await
        .unwrap();
    conductor.await_exchange().await;

    assert_eq!(backend.saved()[0].mode, ChatMode::Image);
    assert_eq!(conductor.view().messages[1].kind, MessageKind::Image);
}

#[tokio::test]
async fn test_poll_exchange_until_settled() {
    let (mut conductor, _backend, _rx) = setup(MockBackend::replying("4", "abc"));
    conductor.send("2+2?", ChatMode::Text).await;

    let mut polls = 0;
    while conductor.is_generating() {
        conductor.poll_exchange().await;
        tokio::task::yield_now().await;
        polls += 1;
        assert!(polls < 1000, "exchange never settled");
    }

    assert_eq!(conductor.conversation().len(), 2);
    assert_eq!(conductor.session_id(), Some(&SessionId::from("abc")));
    assert!(!conductor.poll_exchange().await);
}

// =============================================================================
// Reveals
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_reply_is_revealed() {
    let (mut conductor, _backend, _rx) = setup(MockBackend::replying("abc", "abc"));

    conductor.send("spell it", ChatMode::Text).await;
    conductor.await_exchange().await;

    let view = conductor.view();
    assert_eq!(view.messages[0].text, "spell it");
    assert!(!view.messages[0].revealing);
    assert!(view.messages[1].revealing);
    assert!(view.messages[1].text.len() < 3);

    conductor.await_reveals().await;

    let view = conductor.view();
    assert_eq!(view.messages[1].text, "abc");
    assert!(!view.is_revealing());
}

#[tokio::test(start_paused = true)]
async fn test_error_reply_is_revealed() {
    let backend = MockBackend::replying("4", "abc");
    backend.fail_generate.store(true, Ordering::SeqCst);
    let (mut conductor, _backend, _rx) = setup(backend);

    conductor.send("2+2?", ChatMode::Text).await;
    conductor.await_exchange().await;
    assert!(conductor.view().messages[1].revealing);

    conductor.await_reveals().await;
    assert_eq!(conductor.view().messages[1].text, "❌ Server error");
}

#[tokio::test(start_paused = true)]
async fn test_switching_cancels_reveals() {
    let (mut conductor, _backend, _rx) =
        setup(MockBackend::replying("a rather long answer", "abc"));

    conductor.send("question", ChatMode::Text).await;
    conductor.await_exchange().await;
    let id = conductor.view().messages[1].id.clone();
    let frames = conductor.reveals().get(&id).unwrap().subscribe();

    tokio::time::sleep(Duration::from_millis(30)).await;
    conductor.start_new_session().await;
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert!(!frames.borrow().done);
    assert!(frames.has_changed().is_err());
}
