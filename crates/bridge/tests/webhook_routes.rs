//! Route-level tests against in-process fakes.

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use shared_types::{Availability, PersonId};
use std::sync::Arc;
use tower::ServiceExt;

use bridge::repository::{IdentityStore, MemoryIdentityStore};
use bridge::testing::{event, person, FakeEventsPlatform, RecordingMessenger};
use bridge::{routes, AppState};

const VERIFY_TOKEN: &str = "s3cret";

struct TestApp {
    router: Router,
    events: Arc<FakeEventsPlatform>,
    messenger: Arc<RecordingMessenger>,
    identities: Arc<MemoryIdentityStore>,
}

fn test_app(events: FakeEventsPlatform, identities: MemoryIdentityStore) -> TestApp {
    let events = Arc::new(events);
    let messenger = Arc::new(RecordingMessenger::new());
    let identities = Arc::new(identities);
    let state = AppState::new(
        events.clone(),
        messenger.clone(),
        identities.clone(),
        VERIFY_TOKEN,
        14,
    );
    TestApp {
        router: routes::router(state),
        events,
        messenger,
        identities,
    }
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    String::from_utf8(bytes.to_vec()).expect("utf8 body")
}

async fn body_json(response: axum::response::Response) -> Value {
    serde_json::from_str(&body_text(response).await).expect("json body")
}

fn button_reply(from: &str, id: &str) -> Value {
    json!({
        "object": "whatsapp_business_account",
        "entry": [{
            "id": "WABA",
            "changes": [{
                "field": "messages",
                "value": {
                    "messaging_product": "whatsapp",
                    "messages": [{
                        "from": from,
                        "id": "wamid.1",
                        "type": "interactive",
                        "interactive": {
                            "type": "button_reply",
                            "button_reply": {"id": id, "title": "Yes"}
                        }
                    }]
                }
            }]
        }]
    })
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

#[tokio::test]
async fn health_check_responds_ok() {
    let app = test_app(FakeEventsPlatform::new(), MemoryIdentityStore::new());

    let response = app
        .router
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn verification_echoes_challenge() {
    let app = test_app(FakeEventsPlatform::new(), MemoryIdentityStore::new());

    let uri = format!(
        "/whatsapp/webhook?hub.mode=subscribe&hub.verify_token={}&hub.challenge=12345",
        VERIFY_TOKEN
    );
    let response = app
        .router
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "12345");
}

#[tokio::test]
async fn verification_without_challenge_answers_ok() {
    let app = test_app(FakeEventsPlatform::new(), MemoryIdentityStore::new());

    let uri = format!("/whatsapp/webhook?token={}", VERIFY_TOKEN);
    let response = app
        .router
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "OK");
}

#[tokio::test]
async fn verification_with_wrong_token_is_forbidden() {
    let app = test_app(FakeEventsPlatform::new(), MemoryIdentityStore::new());

    let response = app
        .router
        .oneshot(
            Request::get("/whatsapp/webhook?hub.verify_token=nope&hub.challenge=1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn button_reply_updates_response() {
    let app = test_app(
        FakeEventsPlatform::new(),
        MemoryIdentityStore::new().with_mapping("+447700900000", "P1"),
    );

    let response = app
        .router
        .oneshot(post_json(
            "/whatsapp/webhook",
            &button_reply("447700900000", "EVT:E9:YES"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["results"][0]["contact"], "+447700900000");

    assert_eq!(
        app.events.updates(),
        vec![("E9".to_string(), PersonId::new("P1"), Availability::Yes)]
    );
    assert_eq!(app.messenger.texts().len(), 1);
}

#[tokio::test]
async fn unmapped_sender_gets_unmapped_status() {
    let app = test_app(FakeEventsPlatform::new(), MemoryIdentityStore::new());

    let response = app
        .router
        .oneshot(post_json(
            "/whatsapp/webhook",
            &button_reply("15550001111", "EVT:E9:NO"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "unmapped_number");
    assert!(app.events.updates().is_empty());
}

#[tokio::test]
async fn non_button_payloads_are_ignored() {
    let app = test_app(FakeEventsPlatform::new(), MemoryIdentityStore::new());

    let text_message = json!({
        "object": "whatsapp_business_account",
        "entry": [{"changes": [{"value": {"messages": [
            {"from": "447700900000", "type": "text", "text": {"body": "hi"}}
        ]}}]}]
    });
    let status_update = json!({
        "entry": [{"changes": [{"value": {"statuses": [{"status": "read"}]}}]}]
    });

    for payload in [text_message, status_update, json!({"unexpected": true})] {
        let response = app
            .router
            .clone()
            .oneshot(post_json("/whatsapp/webhook", &payload))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ignored");
    }
    assert!(app.messenger.texts().is_empty());
}

#[tokio::test]
async fn malformed_message_does_not_drop_valid_replies() {
    let app = test_app(
        FakeEventsPlatform::new(),
        MemoryIdentityStore::new().with_mapping("+447700900000", "P1"),
    );

    let mut payload = button_reply("447700900000", "EVT:E9:MAYBE");
    let messages = payload["entry"][0]["changes"][0]["value"]["messages"]
        .as_array_mut()
        .unwrap();
    messages.insert(
        0,
        json!({
            "from": "447700900001",
            "type": "interactive",
            "interactive": {"button_reply": {"id": "EVT:E9:YES"}}
        }),
    );

    let response = app
        .router
        .oneshot(post_json("/whatsapp/webhook", &payload))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["results"].as_array().unwrap().len(), 1);
    assert_eq!(
        app.events.updates(),
        vec![("E9".to_string(), PersonId::new("P1"), Availability::Maybe)]
    );
}

#[tokio::test]
async fn sync_and_invite_reports_counts() {
    let app = test_app(
        FakeEventsPlatform::new()
            .with_event(event("E1", "Training", &["P1"], &[]))
            .with_event(event("E2", "Match", &["P1"], &["P2"]))
            .with_person(person("P1", Some("447700900001")))
            .with_person(person("P2", None)),
        MemoryIdentityStore::new(),
    );

    let response = app
        .router
        .oneshot(
            Request::post("/sync-and-invite")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["events_seen"], 2);
    assert_eq!(body["invites_sent"], 2);
    assert_eq!(body["skipped"][0]["person_id"], "P2");

    assert_eq!(app.events.requested_windows(), vec![14]);
    assert_eq!(app.messenger.prompts().len(), 2);
    assert_eq!(app.identities.list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn sync_and_invite_fails_when_listing_fails() {
    let app = test_app(
        FakeEventsPlatform::new().failing_listing(),
        MemoryIdentityStore::new(),
    );

    let response = app
        .router
        .oneshot(
            Request::post("/sync-and-invite")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Sync failed");
    assert!(body["details"].as_str().unwrap().contains("listing unavailable"));
    assert!(app.messenger.prompts().is_empty());
}
