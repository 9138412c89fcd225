mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::{build_request, call_text, sse_payloads, token, TestApp, ALICE, BOB};

#[tokio::test]
async fn test_chat_relays_backend_events() -> anyhow::Result<()> {
    let app = TestApp::new();

    let request = build_request(
        "POST",
        "/chat",
        Some(&token(ALICE)),
        Some(json!({"query": "Hello", "inputs": {"lang": "en"}}).to_string()),
    )?;
    let (status, content_type, body) = call_text(&app.router, request).await?;

    assert_eq!(status, StatusCode::OK);
    assert!(content_type.starts_with("text/event-stream"), "{content_type}");

    let payloads = sse_payloads(&body);
    let events: Vec<_> = payloads.iter().map(|p| p["event"].clone()).collect();
    assert_eq!(events, vec!["message", "message", "message_end"]);
    assert_eq!(payloads[0]["answer"], "Hel");
    assert_eq!(payloads[2]["conversation_id"], "conv-new");

    let sent = app.chat.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].query, "Hello");
    assert_eq!(sent[0].user, ALICE);
    assert_eq!(sent[0].conversation_id, None);
    assert_eq!(sent[0].inputs["lang"], "en");

    Ok(())
}

#[tokio::test]
async fn test_chat_forwards_owned_conversation() -> anyhow::Result<()> {
    let app = TestApp::new();
    app.create_thread(ALICE, "conv-alice", None).await;

    let request = build_request(
        "POST",
        "/chat",
        Some(&token(ALICE)),
        Some(json!({"query": "and then?", "conversationId": "conv-alice"}).to_string()),
    )?;
    let (status, _, _) = call_text(&app.router, request).await?;
    assert_eq!(status, StatusCode::OK);

    let sent = app.chat.sent.lock().unwrap();
    assert_eq!(sent[0].conversation_id.as_deref(), Some("conv-alice"));

    Ok(())
}

#[tokio::test]
async fn test_chat_rejects_foreign_conversation() -> anyhow::Result<()> {
    let app = TestApp::new();
    app.create_thread(ALICE, "conv-alice", None).await;

    let (status, json) = app
        .call(
            "POST",
            "/chat",
            Some(&token(BOB)),
            Some(json!({"query": "peek", "conversationId": "conv-alice"})),
        )
        .await?;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "NOT_FOUND");
    assert!(app.chat.sent.lock().unwrap().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_chat_requires_query() -> anyhow::Result<()> {
    let app = TestApp::new();

    for body in [json!({"query": ""}), json!({}), json!({"query": "hi", "inputs": "x"})] {
        let (status, json) = app
            .call("POST", "/chat", Some(&token(ALICE)), Some(body.clone()))
            .await?;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
        assert_eq!(json["code"], "VALIDATION_ERROR");
    }
    assert!(app.chat.sent.lock().unwrap().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_chat_stream_failure_ends_with_error_frame() -> anyhow::Result<()> {
    let app = TestApp::new();
    app.chat.set_frames(vec![
        Ok(r#"{"event":"message","conversation_id":"c","answer":"par"}"#),
        Err("connection reset"),
        Ok(r#"{"event":"message","conversation_id":"c","answer":"never"}"#),
    ]);

    let request = build_request(
        "POST",
        "/chat",
        Some(&token(ALICE)),
        Some(json!({"query": "Hello"}).to_string()),
    )?;
    let (status, _, body) = call_text(&app.router, request).await?;
    assert_eq!(status, StatusCode::OK);

    let payloads = sse_payloads(&body);
    assert_eq!(payloads.len(), 2);
    assert_eq!(payloads[0]["answer"], "par");
    assert_eq!(payloads[1]["event"], "error");
    assert_eq!(payloads[1]["code"], "INTERNAL_ERROR");
    assert_eq!(payloads[1]["message"], "Internal server error");

    Ok(())
}

#[tokio::test]
async fn test_chat_upstream_reject_is_a_500() -> anyhow::Result<()> {
    let app = TestApp::new();
    app.chat.reject_with(400);

    let (status, json) = app
        .call("POST", "/chat", Some(&token(ALICE)), Some(json!({"query": "Hello"})))
        .await?;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["code"], "INTERNAL_ERROR");
    assert_eq!(json["error"], "Internal server error");

    Ok(())
}

#[tokio::test]
async fn test_history_requires_conversation_id() -> anyhow::Result<()> {
    let app = TestApp::new();

    let (status, json) = app
        .call("GET", "/chat/messages", Some(&token(ALICE)), None)
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["details"][0]["path"], "conversation_id");

    let (status, json) = app
        .call(
            "GET",
            "/chat/messages?conversation_id=c1&limit=500",
            Some(&token(ALICE)),
            None,
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["details"][0]["path"], "limit");

    Ok(())
}

#[tokio::test]
async fn test_history_of_foreign_conversation_is_not_found() -> anyhow::Result<()> {
    let app = TestApp::new();
    app.create_thread(ALICE, "conv-alice", None).await;

    for uri in [
        "/chat/messages?conversation_id=conv-alice",
        "/chat/messages?conversation_id=conv-nobody",
    ] {
        let (status, json) = app.call("GET", uri, Some(&token(BOB)), None).await?;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
        assert_eq!(json["code"], "NOT_FOUND");
    }
    assert!(app.chat.history_queries.lock().unwrap().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_history_of_owned_conversation() -> anyhow::Result<()> {
    let app = TestApp::new();
    app.create_thread(ALICE, "conv-alice", None).await;

    let (status, json) = app
        .call(
            "GET",
            "/chat/messages?conversation_id=conv-alice&limit=5&first_id=m9",
            Some(&token(ALICE)),
            None,
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["limit"], 5);
    assert_eq!(json["has_more"], false);
    assert_eq!(json["data"][0]["conversation_id"], "conv-alice");
    // Fields the backend adds pass through untouched
    assert!(json["data"][0].as_object().unwrap().contains_key("feedback"));

    let queries = app.chat.history_queries.lock().unwrap();
    assert_eq!(queries[0].user, ALICE);
    assert_eq!(queries[0].first_id.as_deref(), Some("m9"));

    Ok(())
}

#[tokio::test]
async fn test_chat_relay_survives_carriage_returns() -> anyhow::Result<()> {
    let app = TestApp::new();
    app.chat.set_frames(vec![
        Ok("{\"event\":\"message\",\r \"conversation_id\":\"c\",\"answer\":\"line\\r\\nbreak\"}"),
        Ok(r#"{"event":"message_end","conversation_id":"c"}"#),
    ]);

    let request = build_request(
        "POST",
        "/chat",
        Some(&token(ALICE)),
        Some(json!({"query": "Hello"}).to_string()),
    )?;
    let (status, _, body) = call_text(&app.router, request).await?;
    assert_eq!(status, StatusCode::OK);
    assert!(!body.contains('\r'));

    let payloads = sse_payloads(&body);
    assert_eq!(payloads.len(), 2);
    assert_eq!(payloads[0]["answer"], "line\r\nbreak");
    assert_eq!(payloads[1]["event"], "message_end");

    Ok(())
}
