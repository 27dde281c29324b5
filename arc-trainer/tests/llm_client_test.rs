//! HTTP client tests against mock LLM, intent and captioning services

use std::time::Duration;

use arc_trainer::config::LlmSettings;
use arc_trainer::llm::{Consensus, IntentClient, LanguageModel, LlmClient, LlmError};
use arc_trainer::vision::{CaptionError, Captioner, HuggingFaceCaptioner};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn settings(server: &MockServer, api_key: &str) -> LlmSettings {
    LlmSettings {
        api_url: format!("{}/", server.uri()),
        api_key: api_key.to_string(),
        timeout: Duration::from_secs(5),
        query_endpoint: "/query".to_string(),
        validate_endpoint: "/validate".to_string(),
        consensus_models: vec!["model_a".into(), "model_b".into(), "model_c".into()],
    }
}

fn reply(text: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "response": text }))
}

// ============================================================================
// Plain queries
// ============================================================================

#[tokio::test]
async fn test_ask_posts_prompt_and_reads_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .and(body_json(json!({ "prompt": "Solve [[0,1]]" })))
        .respond_with(reply("[[1,0]]"))
        .expect(1)
        .mount(&server)
        .await;

    let client = LlmClient::new(&settings(&server, "")).unwrap();
    assert_eq!(client.ask("Solve [[0,1]]").await.unwrap(), "[[1,0]]");
}

#[tokio::test]
async fn test_api_key_is_sent_as_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .and(header("authorization", "Bearer secret-key"))
        .respond_with(reply("ok"))
        .expect(1)
        .mount(&server)
        .await;

    let client = LlmClient::new(&settings(&server, "secret-key")).unwrap();
    assert_eq!(client.ask("hello").await.unwrap(), "ok");
}

#[tokio::test]
async fn test_error_status_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let client = LlmClient::new(&settings(&server, "")).unwrap();
    match client.ask("hello").await {
        Err(LlmError::Status { status, body }) => {
            assert_eq!(status, 503);
            assert_eq!(body, "overloaded");
        }
        other => panic!("expected status error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_reply_without_response_field() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "text": "hi" })))
        .mount(&server)
        .await;

    let client = LlmClient::new(&settings(&server, "")).unwrap();
    assert!(matches!(client.ask("hello").await, Err(LlmError::Parsing(_))));
}

// ============================================================================
// Causal and Socratic queries
// ============================================================================

#[tokio::test]
async fn test_causal_query_is_validated() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .and(body_json(json!({
            "prompt": "Why do minors need guardians?\n\nPlease explain why this is true using clear cause-effect relationships."
        })))
        .respond_with(reply("Because they cannot consent."))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/validate"))
        .and(body_json(json!({
            "query": "Does the response 'Because they cannot consent.' provide a causal explanation for 'Why do minors need guardians?'?"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "valid": true })))
        .expect(1)
        .mount(&server)
        .await;

    let client = LlmClient::new(&settings(&server, "")).unwrap();
    let answer = client.query_causal("Why do minors need guardians?").await.unwrap();
    assert_eq!(answer.response, "Because they cannot consent.");
    assert!(answer.causal);
}

#[tokio::test]
async fn test_socratic_query_asks_about_the_opposite() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .and(body_json(json!({
            "prompt": "Rules bind everyone\n\nWhy is this the case? What would happen if the opposite were true?\n\nPlease explain why this is true using clear cause-effect relationships."
        })))
        .respond_with(reply("Otherwise chaos."))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/validate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "valid": false })))
        .mount(&server)
        .await;

    let client = LlmClient::new(&settings(&server, "")).unwrap();
    let answer = client.socratic("Rules bind everyone").await.unwrap();
    assert_eq!(answer.response, "Otherwise chaos.");
    assert!(!answer.causal);
}

// ============================================================================
// Consensus
// ============================================================================

#[tokio::test]
async fn test_consensus_skips_failing_models() {
    let server = MockServer::start().await;
    for model in ["model_a", "model_b"] {
        Mock::given(method("POST"))
            .and(path(format!("/{}/query", model)))
            .respond_with(reply("4"))
            .mount(&server)
            .await;
    }
    Mock::given(method("POST"))
        .and(path("/model_c/query"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = LlmClient::new(&settings(&server, "")).unwrap();
    let consensus = client.consensus("2 + 2?").await.unwrap();
    assert_eq!(
        consensus,
        Consensus::Agreement {
            response: "4".to_string(),
            score: 1.0
        }
    );
}

#[tokio::test]
async fn test_consensus_disagreement_keeps_every_answer() {
    let server = MockServer::start().await;
    for (model, answer) in [("model_a", "4"), ("model_b", "5"), ("model_c", "4")] {
        Mock::given(method("POST"))
            .and(path(format!("/{}/query", model)))
            .respond_with(reply(answer))
            .mount(&server)
            .await;
    }

    let client = LlmClient::new(&settings(&server, "")).unwrap();
    match client.consensus("2 + 2?").await.unwrap() {
        Consensus::Disagreement { responses, score } => {
            assert_eq!(responses.len(), 3);
            assert_eq!(responses["model_b"], "5");
            assert!((score - 2.0 / 3.0).abs() < 1e-9);
        }
        other => panic!("expected disagreement, got {:?}", other),
    }
}

#[tokio::test]
async fn test_consensus_without_answers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = LlmClient::new(&settings(&server, "")).unwrap();
    assert!(matches!(
        client.consensus("anything").await,
        Err(LlmError::NoAnswers)
    ));
}

// ============================================================================
// Intent detection and captioning
// ============================================================================

#[tokio::test]
async fn test_intent_returns_service_json() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/intent"))
        .and(body_json(json!({ "text": "book a flight" })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "intent": "travel", "confidence": 0.9 })),
        )
        .mount(&server)
        .await;

    let client = IntentClient::new(
        format!("{}/api/intent", server.uri()),
        None,
        Duration::from_secs(5),
    )
    .unwrap();
    let intent = client.analyze("book a flight").await.unwrap();
    assert_eq!(intent["intent"], "travel");
}

#[tokio::test]
async fn test_captioner_reads_generated_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/blip"))
        .and(header("authorization", "Bearer hf-token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{ "generated_text": " a blue square " }])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let captioner = HuggingFaceCaptioner::new(
        reqwest::Client::new(),
        format!("{}/blip", server.uri()),
        "hf-token",
    );
    let caption = captioner.caption(b"not really a png", "grid.png").await.unwrap();
    assert_eq!(caption, "a blue square");
}

#[tokio::test]
async fn test_captioner_without_generated_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/blip"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "error": "loading" })))
        .mount(&server)
        .await;

    let captioner = HuggingFaceCaptioner::new(
        reqwest::Client::new(),
        format!("{}/blip", server.uri()),
        "hf-token",
    );
    assert!(matches!(
        captioner.caption(b"png", "grid.png").await,
        Err(CaptionError::MissingCaption)
    ));
}
