//! Integration tests for the HTTP-backed providers against a mock server.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_json, body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use ideascore_core::{AnalysisRequest, DomainContext, Recommendation};
use ideascore_runtime::providers::{
    AnalysisProvider, GenericHttpConfig, GenericHttpProvider, NetworkGenerateConfig,
    NetworkGenerateProvider, ProviderError,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn context() -> DomainContext {
    DomainContext::new()
        .with_goal("Reduce operational toil")
        .with_strategy("Developer tooling")
        .with_anti_pattern("Vendor lock-in")
}

fn request(idea: &str) -> AnalysisRequest {
    AnalysisRequest::new(idea).with_context(context())
}

fn scorer_at(server: &MockServer) -> GenericHttpConfig {
    GenericHttpConfig::new("scorer", format!("{}/score", server.uri()))
}

// ---------------------------------------------------------------------------
// Generic HTTP
// ---------------------------------------------------------------------------

#[tokio::test]
async fn generic_http_sums_categories_and_derives_recommendation() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/score"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "mission_alignment": 3.5,
            "anti_challenge": 2.8,
            "strategic_fit": 2.0
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = GenericHttpProvider::new(&scorer_at(&server)).unwrap();
    let result = provider.analyze(&request("build automation tool")).await.unwrap();

    assert!((result.final_score - 8.3).abs() < 1e-9);
    assert_eq!(result.recommendation, Recommendation::StronglyPursue);
    assert_eq!(result.provider, "scorer");
    assert!(!result.from_cache);
}

#[tokio::test]
async fn generic_http_default_body_and_content_type() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/score"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({
            "idea": "build automation tool",
            "goals": ["Reduce operational toil"],
            "strategies": ["Developer tooling"],
            "anti_patterns": ["Vendor lock-in"]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"score": 6.5})))
        .expect(1)
        .mount(&server)
        .await;

    let provider = GenericHttpProvider::new(&scorer_at(&server)).unwrap();
    let result = provider.analyze(&request("build automation tool")).await.unwrap();

    assert_eq!(result.final_score, 6.5);
    assert_eq!(result.recommendation, Recommendation::Pursue);
}

#[tokio::test]
async fn generic_http_renders_template_and_sends_headers() {
    std::env::set_var("IDEASCORE_IT_TOKEN", "tok-123");

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/score"))
        .and(header("authorization", "Bearer tok-123"))
        .and(header("content-type", "application/vnd.scorer+json"))
        .and(body_json(json!({
            "text": "BUILD AUTOMATION TOOL",
            "ctx": {
                "goals": ["Reduce operational toil"],
                "strategies": ["Developer tooling"],
                "anti_patterns": ["Vendor lock-in"]
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": {"mission": 2, "challenge": 2, "fit": 1, "verdict": "review"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = scorer_at(&server)
        .with_header("Authorization", "Bearer ${IDEASCORE_IT_TOKEN}")
        .with_header("Content-Type", "application/vnd.scorer+json")
        .with_template(r#"{"text": {{ idea | upper | json }}, "ctx": {{ context_json }}}"#);

    let provider = GenericHttpProvider::new(&config).unwrap();
    let result = provider.analyze(&request("build automation tool")).await.unwrap();

    assert_eq!(result.final_score, 5.0);
    assert_eq!(result.recommendation, Recommendation::Review);
}

#[tokio::test]
async fn generic_http_text_body_falls_back_to_midpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Promising, but needs a pilot."))
        .mount(&server)
        .await;

    let provider = GenericHttpProvider::new(&scorer_at(&server)).unwrap();
    let result = provider.analyze(&request("pilot program")).await.unwrap();

    assert_eq!(result.final_score, 5.0);
    assert_eq!(result.recommendation, Recommendation::Review);
    assert_eq!(
        result.explanation("overall"),
        Some("Promising, but needs a pilot.")
    );
}

#[tokio::test]
async fn generic_http_non_success_status_is_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let provider = GenericHttpProvider::new(&scorer_at(&server)).unwrap();
    let err = provider.analyze(&request("anything")).await.unwrap_err();

    match err {
        ProviderError::Status { status, body } => {
            assert_eq!(status, 503);
            assert_eq!(body, "overloaded");
        }
        other => panic!("Expected Status error, got {other:?}"),
    }
}

#[tokio::test]
async fn generic_http_out_of_range_score_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "mission_alignment": 3.0,
            "anti_challenge": 5.0,
            "strategic_fit": 1.0
        })))
        .mount(&server)
        .await;

    let provider = GenericHttpProvider::new(&scorer_at(&server)).unwrap();
    let err = provider.analyze(&request("anything")).await.unwrap_err();
    assert!(matches!(err, ProviderError::Validation { ref field, .. } if field == "anti_challenge"));
}

#[tokio::test]
async fn generic_http_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"score": 5}))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let provider = GenericHttpProvider::new(&scorer_at(&server).with_timeout_secs(1)).unwrap();
    let err = provider.analyze(&request("slow")).await.unwrap_err();
    assert!(matches!(err, ProviderError::Timeout(d) if d == Duration::from_secs(1)));
    assert!(err.is_transient());
}

// ---------------------------------------------------------------------------
// Network generate
// ---------------------------------------------------------------------------

#[tokio::test]
async fn network_generate_probe_and_analyze() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"models": []})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(json!({
            "model": "llama3",
            "stream": false,
            "options": {"temperature": 0.0}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "llama3",
            "response": "Mission alignment: 3.0\nAnti-challenge: 2.5\nStrategic fit: 1.5\n",
            "done": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = NetworkGenerateProvider::new(
        &NetworkGenerateConfig::default().with_base_url(server.uri()),
    )
    .unwrap();

    assert!(provider.is_available().await);

    let result = provider.analyze(&request("automate runbooks")).await.unwrap();
    assert_eq!(result.final_score, 7.0);
    assert_eq!(result.recommendation, Recommendation::Pursue);
    assert_eq!(result.provider, "network_generate");
}

#[tokio::test]
async fn network_generate_unparseable_reply_is_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": "I think it's a great idea!"
        })))
        .mount(&server)
        .await;

    let provider = NetworkGenerateProvider::new(
        &NetworkGenerateConfig::default().with_base_url(server.uri()),
    )
    .unwrap();

    let err = provider.analyze(&request("anything")).await.unwrap_err();
    assert!(matches!(err, ProviderError::Parse(_)));
}

#[tokio::test]
async fn network_generate_error_status_keeps_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(404).set_body_string("model 'llama3' not found"))
        .mount(&server)
        .await;

    let provider = NetworkGenerateProvider::new(
        &NetworkGenerateConfig::default().with_base_url(server.uri()),
    )
    .unwrap();

    let err = provider.analyze(&request("anything")).await.unwrap_err();
    match err {
        ProviderError::Status { status, body } => {
            assert_eq!(status, 404);
            assert_eq!(body, "model 'llama3' not found");
        }
        other => panic!("Expected Status error, got {other:?}"),
    }
}

#[tokio::test]
async fn network_generate_unhealthy_probe() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let provider = NetworkGenerateProvider::new(
        &NetworkGenerateConfig::default().with_base_url(server.uri()),
    )
    .unwrap();
    assert!(!provider.is_available().await);
}
