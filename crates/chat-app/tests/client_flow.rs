use std::sync::Arc;

use chatbot::chat::{
    CharCounter, ChatClient, ChatSurface, Notification, NotificationKind, RenderedMessage,
    Role, SendOutcome, UiEvent,
};
use chatbot::export::HistoryExport;
use chatbot::settings::{ClientSettings, ThemeMode};
use chatbot_backend::{BackendFlavor, create_backend};
use chatbot_storage::{KeyValueStore, MemoryStore};
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SESSION_ID: &str = "4b1f2a8e-2a0e-4c55-9d2f-6f3c2b7d9e10";
const CSRF_TOKEN: &str = "csrf-123";

#[derive(Default)]
struct RecordingSurface {
    messages: Vec<RenderedMessage>,
    notifications: Vec<Notification>,
    theme: Option<ThemeMode>,
}

impl ChatSurface for RecordingSurface {
    fn has_element(&self, _: &str) -> bool {
        true
    }
    fn append_message(&mut self, message: &RenderedMessage) {
        self.messages.push(message.clone());
    }
    fn retain_messages(&mut self, keep: usize) {
        self.messages.truncate(keep);
    }
    fn set_input_enabled(&mut self, _: bool) {}
    fn set_send_enabled(&mut self, _: bool) {}
    fn set_input_text(&mut self, _: &str) {}
    fn set_char_counter(&mut self, _: CharCounter) {}
    fn set_typing_indicator(&mut self, _: bool) {}
    fn apply_theme(&mut self, theme: ThemeMode) {
        self.theme = Some(theme);
    }
    fn notify(&mut self, notification: &Notification) {
        self.notifications.push(notification.clone());
    }
    fn confirm(&mut self, _: &str, _: &str) -> bool {
        true
    }
}

async fn django_server() -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/history/"))
        .and(query_param("session_id", SESSION_ID))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "messages": [{
                "user_message": "earlier question",
                "bot_response": "earlier <strong>answer</strong>",
                "timestamp": "2024-03-09T10:00:00+00:00"
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/chat/"))
        .and(header("X-CSRFToken", CSRF_TOKEN))
        .and(body_partial_json(serde_json::json!({
            "message": "Where are the docs?",
            "session_id": SESSION_ID
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "response": "See <strong>https://docs.example.com</strong>",
            "session_id": SESSION_ID,
            "timestamp": 1_700_000_000.5
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/clear/"))
        .and(body_partial_json(serde_json::json!({ "session_id": SESSION_ID })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "success"
        })))
        .expect(1)
        .mount(&server)
        .await;

    server
}

#[tokio::test]
async fn django_conversation_round_trip() {
    let server = django_server().await;
    let export_dir = tempfile::tempdir().unwrap();
    let settings = ClientSettings {
        flavor: BackendFlavor::Django,
        base_url: server.uri(),
        csrf_token: CSRF_TOKEN.to_string(),
        export_dir: export_dir.path().to_path_buf(),
        ..ClientSettings::default()
    }
    .normalized();

    let store = Arc::new(MemoryStore::new());
    store.set_item("django-chat-session-id", SESSION_ID).unwrap();
    store.set_item("django-chatbot-theme", "dark").unwrap();

    let backend = create_backend(settings.backend_config()).unwrap();
    let mut client =
        ChatClient::new(&settings, backend, store.clone(), RecordingSurface::default()).unwrap();
    client.start().await.unwrap();

    assert_eq!(client.surface().theme, Some(ThemeMode::Dark));
    assert_eq!(client.visible_messages().len(), 3);
    assert_eq!(
        client.visible_messages()[2].html,
        "earlier <strong>answer</strong>"
    );
    assert_eq!(client.history().len(), 1);

    client
        .handle_event(UiEvent::InputChanged("Where are the docs?".to_string()))
        .await
        .unwrap();
    let outcome = client.send_message().await;
    assert!(matches!(outcome, SendOutcome::Replied(_)));

    let reply = client.visible_messages().last().unwrap();
    assert_eq!(reply.role, Role::Bot);
    assert_eq!(
        reply.html,
        r#"See <strong><a href="https://docs.example.com" target="_blank" rel="noopener">https://docs.example.com</a></strong>"#
    );

    let export_path = client.export_history().unwrap().unwrap();
    let export: HistoryExport =
        serde_json::from_str(&std::fs::read_to_string(&export_path).unwrap()).unwrap();
    assert_eq!(export.platform, "Django ChatBot");
    assert_eq!(
        export.session_id.map(|id| id.to_string()).as_deref(),
        Some(SESSION_ID)
    );
    assert_eq!(export.message_count, 2);
    assert_eq!(export.messages[1].user_message, "Where are the docs?");

    client.clear_conversation().await.unwrap();
    assert!(client.history().is_empty());
    assert_eq!(client.surface().messages.len(), 1);
    assert_eq!(store.get_item("django-chat-session-id").unwrap(), None);

    let kinds: Vec<NotificationKind> = client
        .surface()
        .notifications
        .iter()
        .map(|notification| notification.kind)
        .collect();
    assert_eq!(
        kinds,
        vec![NotificationKind::Success, NotificationKind::Success]
    );
}

#[tokio::test]
async fn server_error_message_reaches_the_outcome() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat/"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": "Message cannot be empty"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/history/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let settings = ClientSettings {
        base_url: server.uri(),
        ..ClientSettings::default()
    }
    .normalized();
    let backend = create_backend(settings.backend_config()).unwrap();
    let mut client = ChatClient::new(
        &settings,
        backend,
        Arc::new(MemoryStore::new()),
        RecordingSurface::default(),
    )
    .unwrap();
    client.start().await.unwrap();
    assert_eq!(client.visible_messages().len(), 1);

    client.update_input("hello");
    let SendOutcome::Failed(error) = client.send_message().await else {
        panic!("expected the send to fail");
    };

    assert_eq!(error.status(), Some(400));
    assert!(error.to_string().contains("Message cannot be empty"));
    assert!(client.visible_messages().last().unwrap().is_error);
    assert_eq!(
        client.surface().notifications[0].kind,
        NotificationKind::Error
    );
}
