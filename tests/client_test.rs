//! HTTP transport tests against a wiremock backend.

use std::sync::Arc;
use std::time::Duration;

use eventide::transport::{ApiClient, EventLookup, EventSearch, MessageSender};
use eventide::types::NewMessage;
use eventide::{
    CancellationToken, ErrorCode, Event, EventId, EventideError, MutationCoordinator,
    QueryCoordinator, QueryState, QueryStatus, QueryTransport, SearchMetadata, SearchParams,
    SyncConfig,
};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> ApiClient {
    ApiClient::with_base_url(&server.uri(), Duration::from_secs(5)).unwrap()
}

fn config(server: &MockServer) -> SyncConfig {
    SyncConfig::new()
        .base_url(server.uri())
        .page_size(2)
        .known_sources(["eventbrite", "meetup"])
}

fn event(id: &str, title: &str) -> serde_json::Value {
    json!({ "id": id, "title": title, "startDate": "2026-11-01T20:00:00Z", "venue": "Blue Note" })
}

// ============================================================================
// Search
// ============================================================================

#[tokio::test]
async fn search_sends_filters_as_query_string() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/events/search"))
        .and(query_param("lat", "40.5"))
        .and(query_param("lon", "-73.25"))
        .and(query_param("radius", "10"))
        .and(query_param("categories", "music,art"))
        .and(query_param("q", "jazz"))
        .and(query_param("page", "2"))
        .and(query_param("page_size", "20"))
        .and(query_param_is_missing("platforms"))
        .and(query_param_is_missing("start_date"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "events": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let params = SearchParams::new(40.5, -73.25)
        .radius(10.0)
        .query("  jazz ")
        .categories(["music", "art"]);
    let response = client(&server).search_events(&params, 2, 20).await.unwrap();
    assert!(response.events.is_empty());
}

#[tokio::test]
async fn blank_query_is_left_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/events/search"))
        .and(query_param_is_missing("q"))
        .and(query_param_is_missing("categories"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "events": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let params = SearchParams::new(1.0, 2.0).query("   ");
    client(&server).search_events(&params, 1, 20).await.unwrap();
}

#[tokio::test]
async fn missing_pagination_and_sources_are_defaulted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/events/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "events": [event("e1", "Late Set")],
            "sources": { "meetup": { "searched": true, "count": 1 } }
        })))
        .mount(&server)
        .await;

    let cfg = config(&server);
    let search = EventSearch::new(client(&server), &cfg);
    let page = search
        .fetch(&SearchParams::new(1.0, 2.0), 1, &CancellationToken::detached())
        .await
        .unwrap();

    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].title, "Late Set");
    assert_eq!(page.items[0].extra.get("venue"), Some(&json!("Blue Note")));
    assert_eq!(page.pagination.page, 1);
    assert_eq!(page.pagination.page_size, 2);
    assert!(!page.pagination.has_next_page);

    let sources = &page.metadata.sources;
    assert_eq!(sources.len(), 2);
    assert!(sources["meetup"].searched);
    assert_eq!(sources["meetup"].count, 1);
    assert!(!sources["eventbrite"].searched);
}

#[tokio::test]
async fn revoked_token_short_circuits_fetch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/events/search"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "events": [] }))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let cfg = config(&server);
    let search = EventSearch::new(client(&server), &cfg);
    let token = CancellationToken::detached();
    let revoker = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        revoker.revoke();
    });

    let err = search
        .fetch(&SearchParams::new(1.0, 2.0), 1, &token)
        .await
        .unwrap_err();
    assert!(err.is_cancelled());
}

// ============================================================================
// Error classification
// ============================================================================

async fn search_error(body: ResponseTemplate) -> EventideError {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/events/search"))
        .respond_with(body)
        .mount(&server)
        .await;

    client(&server)
        .search_events(&SearchParams::new(1.0, 2.0), 1, 20)
        .await
        .unwrap_err()
}

#[tokio::test]
async fn bad_request_maps_to_invalid_params() {
    let err = search_error(ResponseTemplate::new(400).set_body_json(
        json!({ "error": "lat out of range", "details": "must be within [-90, 90]" }),
    ))
    .await;
    assert_eq!(err.code(), ErrorCode::InvalidParams);
    assert_eq!(
        err,
        EventideError::InvalidParams("lat out of range: must be within [-90, 90]".to_string())
    );
}

#[tokio::test]
async fn rate_limit_carries_retry_after() {
    let err = search_error(ResponseTemplate::new(429).insert_header("retry-after", "7")).await;
    assert_eq!(err.code(), ErrorCode::RateLimited);
    assert_eq!(err.retry_after(), Some(Duration::from_secs(7)));
}

#[tokio::test]
async fn unparsable_server_error_body_still_classifies() {
    let err =
        search_error(ResponseTemplate::new(500).set_body_string("<html>upstream exploded</html>"))
            .await;
    assert_eq!(err.code(), ErrorCode::ServerError);
    assert_eq!(err.code().as_str(), "SERVER_ERROR");
}

#[tokio::test]
async fn auth_and_not_found_statuses() {
    let unauthorized = search_error(ResponseTemplate::new(401)).await;
    assert_eq!(unauthorized.code(), ErrorCode::Unauthorized);

    let forbidden = search_error(ResponseTemplate::new(403)).await;
    assert_eq!(forbidden.code(), ErrorCode::Unauthorized);

    let missing = search_error(ResponseTemplate::new(404)).await;
    assert_eq!(missing.code(), ErrorCode::NotFound);
}

#[tokio::test]
async fn other_status_keeps_status_code() {
    let err = search_error(ResponseTemplate::new(418)).await;
    assert_eq!(err.code(), ErrorCode::Http(418));
    assert_eq!(err.code().as_str(), "HTTP_418");
}

#[tokio::test]
async fn connection_failure_is_network_error() {
    // Nothing listens on port 1.
    let client = ApiClient::with_base_url("http://127.0.0.1:1", Duration::from_secs(2)).unwrap();
    let err = client
        .search_events(&SearchParams::new(1.0, 2.0), 1, 20)
        .await
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::NetworkError);
    assert!(!err.to_string().is_empty());
    assert!(err.is_transient());
}

#[tokio::test]
async fn api_key_is_sent_as_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/events/search"))
        .and(header("authorization", "Bearer secret-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "events": [] })))
        .expect(1)
        .mount(&server)
        .await;

    client(&server)
        .api_key("secret-key")
        .search_events(&SearchParams::new(1.0, 2.0), 1, 20)
        .await
        .unwrap();
}

// ============================================================================
// Lookup
// ============================================================================

#[tokio::test]
async fn composite_id_is_one_path_segment() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/events/12345:meetup"))
        .respond_with(ResponseTemplate::new(200).set_body_json(event("evt-9", "Meetup Night")))
        .expect(1)
        .mount(&server)
        .await;

    let lookup = EventLookup::new(client(&server));
    let page = lookup
        .fetch(
            &EventId::composite("12345", "meetup"),
            1,
            &CancellationToken::detached(),
        )
        .await
        .unwrap();

    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].id, "evt-9");
    assert_eq!(page.pagination.total_count, 1);
}

#[tokio::test]
async fn id_with_reserved_characters_is_encoded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/events/a%2Fb%20c"))
        .respond_with(ResponseTemplate::new(200).set_body_json(event("a/b c", "Odd Id")))
        .expect(1)
        .mount(&server)
        .await;

    let found = client(&server)
        .get_event(&EventId::raw("a/b c"))
        .await
        .unwrap();
    assert_eq!(found.title, "Odd Id");
}

#[tokio::test]
async fn unknown_event_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/events/nope"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "error": "Event not found" })))
        .mount(&server)
        .await;

    let err = client(&server)
        .get_event(&EventId::raw("nope"))
        .await
        .unwrap_err();
    assert_eq!(err, EventideError::NotFound("Event not found".to_string()));
}

// ============================================================================
// Messages
// ============================================================================

#[tokio::test]
async fn send_message_posts_trimmed_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/messages"))
        .and(body_json(json!({
            "content": "hello",
            "conversationId": "conv-1",
            "senderId": "user-1"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "msg-1",
            "conversationId": "conv-1",
            "senderId": "user-1",
            "content": "hello",
            "createdAt": "2026-10-19T12:00:00Z"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let stored = client(&server)
        .send_message(&NewMessage {
            content: "hello",
            conversation_id: "conv-1",
            sender_id: "user-1",
        })
        .await
        .unwrap();
    assert_eq!(stored.id, "msg-1");
    assert_eq!(stored.created_at.as_deref(), Some("2026-10-19T12:00:00Z"));
}

#[tokio::test]
async fn failed_send_without_body_uses_fallback_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/messages"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = client(&server)
        .send_message(&NewMessage {
            content: "hello",
            conversation_id: "conv-1",
            sender_id: "user-1",
        })
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EventideError::Server {
            status: 500,
            message: "Failed to send message".to_string()
        }
    );
}

#[tokio::test]
async fn failed_send_reports_error_field() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/messages"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({ "error": "Not a participant" })))
        .mount(&server)
        .await;

    let err = client(&server)
        .send_message(&NewMessage {
            content: "hello",
            conversation_id: "conv-1",
            sender_id: "user-1",
        })
        .await
        .unwrap_err();
    assert_eq!(err, EventideError::Unauthorized("Not a participant".to_string()));
}

// ============================================================================
// End to end through the coordinators
// ============================================================================

#[tokio::test]
async fn search_coordinator_loads_more_pages() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/events/search"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "events": [event("e1", "First"), event("e2", "Second")],
            "pagination": { "page": 1, "pageSize": 2, "totalCount": 3, "hasNextPage": true }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/events/search"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "events": [event("e3", "Third")],
            "pagination": { "page": 2, "pageSize": 2, "totalCount": 3, "hasNextPage": false }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let cfg = config(&server).debounce(Duration::from_millis(10));
    let search = QueryCoordinator::uncached(
        Arc::new(EventSearch::new(client(&server), &cfg)),
        cfg.query_options(),
    );
    let mut rx = search.subscribe();
    let done = |s: &QueryState<Event, SearchMetadata>| {
        matches!(s.status, QueryStatus::Succeeded | QueryStatus::Failed) && !s.is_busy()
    };

    search.set_params(SearchParams::new(40.7, -74.0).query("jazz"));
    let _ = rx.wait_for(done).await;
    assert!(search.fetch_next_page());
    let _ = rx.wait_for(done).await;

    let state = search.state();
    let titles: Vec<_> = state.items.iter().map(|e| e.title.as_str()).collect();
    assert_eq!(titles, vec!["First", "Second", "Third"]);
    assert!(!state.has_next_page());
    assert!(!search.fetch_next_page());
}

#[tokio::test]
async fn chat_coordinator_confirms_against_backend() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/messages"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "msg-7",
            "conversationId": "conv-1",
            "senderId": "user-1",
            "content": "on my way"
        })))
        .mount(&server)
        .await;

    let confirmed = Arc::new(std::sync::Mutex::new(None));
    let sink = confirmed.clone();
    let chat = MutationCoordinator::builder(Arc::new(MessageSender::new(
        client(&server),
        "conv-1",
        "user-1",
    )))
    .on_success(move |message| *sink.lock().unwrap() = Some(message.id.clone()))
    .build();

    chat.submit(" on my way ").unwrap().settled().await;

    assert!(chat.items().is_empty());
    assert_eq!(confirmed.lock().unwrap().as_deref(), Some("msg-7"));
}
