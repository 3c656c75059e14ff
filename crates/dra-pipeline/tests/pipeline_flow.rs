//! End-to-end pipeline tests with stub collaborators and mock HTTP servers.

use std::sync::Arc;

use async_trait::async_trait;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use dra_channel::{ChannelSession, TelegramClient};
use dra_classifier::KeywordClassifier;
use dra_core::{
    ClassifierConfig, Coordinates, DraError, EntityType, GeocodeOutcome, Geocoder, Result,
};
use dra_extractor::{Extractor, PhraseMatcher, RuleBasedNer};
use dra_pipeline::{NominatimGeocoder, Pipeline, Stage};

/// Resolves only addresses mentioning Springfield
struct SpringfieldGeocoder;

#[async_trait]
impl Geocoder for SpringfieldGeocoder {
    async fn geocode(&self, address: &str) -> Result<Option<Coordinates>> {
        if address.contains("Springfield") {
            Ok(Some(Coordinates::new(39.7817, -89.6501)))
        } else {
            Ok(None)
        }
    }

    fn name(&self) -> &str {
        "springfield"
    }
}

struct DownGeocoder;

#[async_trait]
impl Geocoder for DownGeocoder {
    async fn geocode(&self, _address: &str) -> Result<Option<Coordinates>> {
        Err(DraError::Transport("geocoder unreachable".to_string()))
    }

    fn name(&self) -> &str {
        "down"
    }
}

fn pipeline_with(geocoder: Box<dyn Geocoder>) -> Pipeline {
    let classifier = KeywordClassifier::new(&ClassifierConfig::default().keywords).unwrap();
    let extractor = Extractor::new(Box::new(RuleBasedNer::new()), PhraseMatcher::new(["மதனா பாலா"]));
    Pipeline::new(Box::new(classifier), extractor, geocoder)
}

fn texts(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn one_disaster_post_becomes_one_row() {
    let pipeline = pipeline_with(Box::new(SpringfieldGeocoder));

    let report = pipeline
        .process_texts(texts(&["123 Main St Springfield fire", "Lovely sunset at the beach"]))
        .await;

    assert_eq!(report.table.len(), 1);
    let row = &report.table.rows[0];
    assert_eq!(row.text, "123 Main St Springfield fire");
    assert_eq!(row.entities.get(EntityType::Street), "123 Main St");
    assert_eq!(row.entities.get(EntityType::City), "Springfield");
    assert!(row.address.contains("123 Main St"));
    assert!(row.address.contains("Springfield"));
    assert_eq!(row.coordinates(), Some(Coordinates::new(39.7817, -89.6501)));

    assert_eq!(report.counts.fetched, 2);
    assert_eq!(report.counts.classified, 1);
    assert_eq!(report.counts.geocoded, 1);
    assert!(report.diagnostics.is_empty());
}

#[tokio::test]
async fn unresolved_address_has_no_coordinates() {
    let pipeline = pipeline_with(Box::new(SpringfieldGeocoder));

    let report = pipeline
        .process_texts(texts(&["flood at 4 River Rd, call 555-1234"]))
        .await;

    let row = &report.table.rows[0];
    assert_eq!(row.entities.get(EntityType::PhoneNumber), "555-1234");
    assert_eq!(row.geocode, GeocodeOutcome::NotFound);
    assert!(report.diagnostics.is_empty());
}

#[tokio::test]
async fn geocoder_failure_is_a_diagnostic() {
    let pipeline = pipeline_with(Box::new(DownGeocoder));

    let report = pipeline.process_texts(texts(&["123 Main St Springfield fire"])).await;

    assert_eq!(report.table.len(), 1);
    assert!(report.table.rows[0].coordinates().is_none());
    assert_eq!(report.diagnostics.len(), 1);
    assert_eq!(report.diagnostics[0].stage, Stage::Geocode);
    assert!(report.diagnostic_messages()[0].starts_with("geocoding failed"));
}

#[tokio::test]
async fn full_run_against_mock_services() {
    let telegram = MockServer::start().await;
    let nominatim = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/botTOKEN/getUpdates"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "ok": true,
            "result": [
                {"update_id": 41, "channel_post": {"text": "123 Main St Springfield fire"}},
                {"update_id": 42, "channel_post": {"text": "Bake sale on Sunday"}},
                {"update_id": 43, "channel_post": {"message_id": 9}}
            ]
        })))
        .expect(1)
        .mount(&telegram)
        .await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "123 Main St, , Springfield"))
        .and(query_param("format", "json"))
        .and(query_param("limit", "1"))
        .and(header("User-Agent", "disaster-ner-app"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"lat": "39.7817", "lon": "-89.6501", "display_name": "Springfield, Illinois"}
        ])))
        .expect(1)
        .mount(&nominatim)
        .await;

    let geocoder = NominatimGeocoder::new(nominatim.uri(), "disaster-ner-app").unwrap();
    let pipeline = pipeline_with(Box::new(geocoder));
    let source = TelegramClient::new("TOKEN").with_base_url(telegram.uri());
    let mut session = ChannelSession::new(Arc::new(source));

    let report = pipeline.run(&mut session).await;

    assert_eq!(report.cursor, Some(43));
    assert_eq!(session.cursor(), Some(43));
    assert_eq!(report.counts.fetched, 2);
    assert_eq!(report.counts.skipped, 1);
    assert_eq!(report.table.len(), 1);
    assert_eq!(
        report.table.rows[0].coordinates(),
        Some(Coordinates::new(39.7817, -89.6501))
    );
}

#[tokio::test]
async fn unauthorized_fetch_reports_diagnostic() {
    let telegram = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "ok": false,
            "error_code": 401,
            "description": "Unauthorized"
        })))
        .mount(&telegram)
        .await;

    let pipeline = pipeline_with(Box::new(SpringfieldGeocoder));
    let source = TelegramClient::new("BAD").with_base_url(telegram.uri());
    let mut session = ChannelSession::new(Arc::new(source));

    let report = pipeline.run(&mut session).await;

    assert!(report.table.is_empty());
    assert_eq!(report.cursor, None);
    assert_eq!(report.diagnostics.len(), 1);
    assert_eq!(report.diagnostics[0].stage, Stage::Fetch);
    assert!(report.diagnostic_messages()[0].starts_with("channel fetch failed"));
}

#[tokio::test]
async fn nominatim_empty_result_is_not_found() {
    let nominatim = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&nominatim)
        .await;

    let geocoder = NominatimGeocoder::new(nominatim.uri(), "disaster-ner-app").unwrap();
    assert_eq!(geocoder.geocode("Nowhere, , ").await.unwrap(), None);
}
