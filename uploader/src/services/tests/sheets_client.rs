//! Tests for the Google Sheets client

use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::config::SheetsConfig;
use crate::error::UploaderError;
use crate::services::sheets_client::GoogleSheetsClient;
use crate::traits::SheetStore;
use crate::types::CellUpdate;

fn client(server: &MockServer) -> GoogleSheetsClient {
    let config = SheetsConfig {
        spreadsheet_id: "sheet-1".to_string(),
        access_token: "sheets-token".to_string(),
        base_url: server.uri(),
    };
    GoogleSheetsClient::new(&config, Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_read_tab_splits_header_and_rows() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/v4/spreadsheets/sheet-1/values/.*Oct.*$"))
        .and(header("authorization", "Bearer sheets-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "range": "'Oct'!A1:K3",
            "values": [
                ["Upload", "Topic", "Hash ID"],
                ["yes", "Summer Sale"],
                ["no", "Winter", "abc"]
            ]
        })))
        .mount(&server)
        .await;

    let tab = client(&server).read_tab("Oct").await.unwrap();

    assert_eq!(tab.header, vec!["Upload", "Topic", "Hash ID"]);
    assert_eq!(tab.rows.len(), 2);
    let rows = tab.raw_rows();
    assert_eq!(rows[0].get("hash id"), "");
    assert_eq!(rows[1].get("hash id"), "abc");
    assert_eq!(rows[1].number(), 3);
}

#[tokio::test]
async fn test_read_empty_tab() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "range": "'Empty'!A1:Z1000" })))
        .mount(&server)
        .await;

    let tab = client(&server).read_tab("Empty").await.unwrap();
    assert!(tab.header.is_empty());
    assert!(tab.rows.is_empty());
}

#[tokio::test]
async fn test_write_cells_uses_batch_update() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v4/spreadsheets/sheet-1/values:batchUpdate"))
        .and(body_partial_json(json!({
            "valueInputOption": "RAW",
            "data": [
                { "range": "'Oct'!L2", "values": [["SUCCESS"]] },
                { "range": "'Oct'!M2", "values": [["campaign c-1"]] }
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "totalUpdatedCells": 2 })))
        .expect(1)
        .mount(&server)
        .await;

    let updates = vec![
        CellUpdate {
            row: 2,
            column: 12,
            value: "SUCCESS".to_string(),
        },
        CellUpdate {
            row: 2,
            column: 13,
            value: "campaign c-1".to_string(),
        },
    ];
    client(&server).write_cells("Oct", updates).await.unwrap();
}

#[tokio::test]
async fn test_errors_surface_as_sheet_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": { "code": 400, "message": "Unable to parse range: 'Nope'" }
        })))
        .mount(&server)
        .await;

    match client(&server).read_tab("Nope").await {
        Err(UploaderError::Sheet { message }) => assert!(message.contains("Unable to parse range")),
        other => panic!("expected sheet error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_empty_write_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    client(&server).write_cells("Oct", Vec::new()).await.unwrap();
}
