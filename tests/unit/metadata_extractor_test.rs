//! Tests for the HTTP metadata extractor against a mock endpoint.

use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use mangamarks::services::metadata_extractor::{
    extract_or_manual, ExtractedMetadata, ExtractionOutcome, HttpMetadataExtractor,
    MetadataExtractor,
};
use mangamarks::types::errors::MetadataError;
use mangamarks::types::settings::MetadataSettings;

const SERIES_URL: &str = "https://example.com/solo-leveling/chapter-110/";

async fn extractor_for(server: &MockServer) -> HttpMetadataExtractor {
    HttpMetadataExtractor::new(&MetadataSettings {
        endpoint: Some(format!("{}/extract", server.uri())),
        timeout_secs: 5,
    })
    .unwrap()
}

#[tokio::test]
async fn test_successful_extraction_fills_the_form() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/extract"))
        .and(body_json(json!({ "url": SERIES_URL })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "title": "Solo Leveling", "chapter": 110 })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let extractor = extractor_for(&server).await;
    let outcome = extract_or_manual(&extractor, SERIES_URL).await;
    assert_eq!(
        outcome,
        ExtractionOutcome::Filled(ExtractedMetadata {
            title: "Solo Leveling".to_string(),
            chapter: 110.0,
        })
    );
}

#[tokio::test]
async fn test_service_error_message_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({ "error": "unsupported site" })))
        .mount(&server)
        .await;

    let extractor = extractor_for(&server).await;
    match extractor.extract(SERIES_URL).await {
        Err(MetadataError::Request(message)) => assert_eq!(message, "unsupported site"),
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test]
async fn test_failure_falls_back_to_url_guess() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let extractor = extractor_for(&server).await;
    match extract_or_manual(&extractor, SERIES_URL).await {
        ExtractionOutcome::Manual {
            reason,
            chapter_guess,
        } => {
            assert!(reason.contains("HTTP 503"));
            assert_eq!(chapter_guess, Some(110.0));
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[tokio::test]
async fn test_unusable_payloads_are_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "title": "", "chapter": 3 })))
        .mount(&server)
        .await;

    let extractor = extractor_for(&server).await;
    assert!(matches!(
        extractor.extract(SERIES_URL).await,
        Err(MetadataError::InvalidResponse(_))
    ));
}

#[test]
fn test_manual_outcome_serializes_for_the_ui() {
    let outcome = ExtractionOutcome::Manual {
        reason: "offline".to_string(),
        chapter_guess: None,
    };
    assert_eq!(
        serde_json::to_value(&outcome).unwrap(),
        json!({ "outcome": "manual", "reason": "offline", "chapterGuess": null })
    );
}
