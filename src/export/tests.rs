//! Tests for export module

use super::*;
use crate::error::Error;
use crate::provider::{DirectoryProvider, MemoryDirectory};
use crate::session::{SearchQuery, SessionId};
use crate::types::{JsonValue, Partition};
use chrono::TimeZone;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

const BASE_DN: &str = "DC=example,DC=com";

fn person(ou: &str, name: &str) -> Record {
    Record::new()
        .with("distinguishedName", format!("CN={name},OU={ou},{BASE_DN}"))
        .with("objectClass", "user")
        .with("cn", name)
}

fn engine(entries: Vec<Record>) -> PaginationEngine {
    let dir: Arc<dyn DirectoryProvider> = Arc::new(MemoryDirectory::new(BASE_DN, entries).unwrap());
    PaginationEngine::new(dir, Duration::from_secs(5), 1000)
}

fn team(count: usize) -> Vec<Record> {
    (0..count).map(|i| person("Staff", &format!("user{i:02}"))).collect()
}

async fn session(engine: &PaginationEngine, page_size: u32) -> Session {
    let query = SearchQuery {
        partitions: vec![Partition::Default],
        filter: "(objectClass=user)".to_string(),
        attributes: vec!["cn".to_string()],
        page_size,
    };
    let estimate = engine.estimate_total(&query).await;
    let mut session = Session::new(SessionId::generate(), query);
    session.set_estimate(estimate);
    session
}

fn dn(record: &Record) -> String {
    record.identity("distinguishedName").unwrap().to_string()
}

// ============================================================================
// Formatter Tests
// ============================================================================

#[test]
fn test_csv_header_from_first_record() {
    let records = vec![
        Record::new().with("cn", "alice").with("mail", "alice@example.com"),
        Record::new().with("cn", "bob").with("title", "ignored"),
    ];
    let csv = String::from_utf8(CsvFormatter.format(&records).unwrap()).unwrap();
    assert_eq!(csv, "cn,mail\nalice,alice@example.com\nbob,\n");
}

#[test]
fn test_csv_quotes_separator_and_quote() {
    let records = vec![Record::new()
        .with("distinguishedName", "CN=Smith\\, John,OU=Staff")
        .with("description", "says \"hi\"")
        .with("plain", "ok")];
    let csv = String::from_utf8(CsvFormatter.format(&records).unwrap()).unwrap();
    assert_eq!(
        csv,
        "distinguishedName,description,plain\n\"CN=Smith\\, John,OU=Staff\",\"says \"\"hi\"\"\",ok\n"
    );
}

#[test]
fn test_csv_value_rendering() {
    let records = vec![Record::new()
        .with("enabled", true)
        .with("logonCount", 42)
        .with("manager", JsonValue::Null)
        .with("memberOf", json!(["Admins", "Staff"]))];
    let csv = String::from_utf8(CsvFormatter.format(&records).unwrap()).unwrap();
    assert_eq!(csv, "enabled,logonCount,manager,memberOf\ntrue,42,,Admins; Staff\n");
}

#[test]
fn test_empty_exports() {
    assert!(CsvFormatter.format(&[]).unwrap().is_empty());
    assert_eq!(JsonFormatter.format(&[]).unwrap(), b"[]");
}

#[test]
fn test_json_is_pretty_array() {
    let records = vec![Record::new().with("cn", "alice")];
    let json = String::from_utf8(JsonFormatter.format(&records).unwrap()).unwrap();
    assert_eq!(json, "[\n  {\n    \"cn\": \"alice\"\n  }\n]");
}

#[test]
fn test_formatter_metadata() {
    assert_eq!(formatter_for(ExportFormat::Csv).content_type(), "text/csv");
    assert_eq!(formatter_for(ExportFormat::Json).extension(), "json");
}

#[test]
fn test_export_filename() {
    let at = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
    assert_eq!(
        export_filename(at, "csv"),
        "directory_export_20240309_140507.csv"
    );
}

// ============================================================================
// Replay Tests
// ============================================================================

#[tokio::test]
async fn test_replay_concatenates_cached_and_fresh_pages() {
    let engine = engine(team(25));
    let mut session = session(&engine, 10).await;

    // Page 1 served earlier, the rest produced during export
    let page1 = engine.get_page(&mut session, 1).await.unwrap();

    let replayer = ExportReplayer::new(engine, None, "distinguishedName");
    let records = replayer.replay(&mut session, None).await.unwrap();

    assert_eq!(records.len(), 25);
    assert_eq!(&records[..10], page1.results.as_slice());
    let ids: HashSet<String> = records.iter().map(dn).collect();
    assert_eq!(ids.len(), 25);
    assert!(session.is_complete);
}

#[tokio::test]
async fn test_replay_selection() {
    let engine = engine(team(12));
    let mut session = session(&engine, 5).await;
    let replayer = ExportReplayer::new(engine, None, "distinguishedName");

    let all = replayer.replay(&mut session, None).await.unwrap();

    let none = replayer.replay(&mut session, Some(&[])).await.unwrap();
    assert!(none.is_empty());

    let every_id: Vec<String> = all.iter().map(dn).collect();
    let same = replayer.replay(&mut session, Some(&every_id)).await.unwrap();
    assert_eq!(same, all);

    // Selection keeps page order, not selection order
    let picked = vec![every_id[7].clone(), every_id[2].clone(), "CN=nobody".to_string()];
    let some = replayer.replay(&mut session, Some(&picked)).await.unwrap();
    assert_eq!(
        some.iter().map(dn).collect::<Vec<_>>(),
        vec![every_id[2].clone(), every_id[7].clone()]
    );
}

#[tokio::test]
async fn test_replay_respects_ceiling() {
    let engine = engine(team(40));
    let mut session = session(&engine, 10).await;
    let replayer = ExportReplayer::new(engine, Some(15), "distinguishedName");

    let records = replayer.replay(&mut session, None).await.unwrap();
    assert_eq!(records.len(), 15);
    assert_eq!(session.pages.len(), 2);
    assert!(!session.is_complete);
}

#[tokio::test]
async fn test_replay_surfaces_provider_error_and_keeps_pages() {
    let engine = engine(team(25));
    let query = SearchQuery {
        partitions: vec![
            Partition::Default,
            Partition::named("OU=Elsewhere,DC=other,DC=org"),
        ],
        filter: "(objectClass=user)".to_string(),
        attributes: vec![],
        page_size: 10,
    };
    let mut session = Session::new(SessionId::generate(), query);
    session.set_estimate(engine.estimate_total(&session.query).await);

    let replayer = ExportReplayer::new(engine.clone(), None, "distinguishedName");
    let err = replayer.replay(&mut session, None).await.unwrap_err();
    assert!(matches!(err, Error::Provider { .. }));

    // Pages drained before the failure stay cached
    assert_eq!(session.pages.len(), 2);
    // The rest of the default partition waits for the next page
    assert_eq!(session.carry_over.len(), 5);
    assert!(!session.is_complete);

    let page1 = engine.get_page(&mut session, 1).await.unwrap();
    let page2 = engine.get_page(&mut session, 2).await.unwrap();
    let served: HashSet<String> = page1
        .results
        .iter()
        .chain(page2.results.iter())
        .map(dn)
        .collect();
    assert_eq!(served.len(), 20);
    assert_eq!(page1.results, session.pages.get(1).unwrap().to_vec());
}

#[tokio::test]
async fn test_export_renders_csv() {
    let engine = engine(vec![person("Staff", "alice"), person("Staff", "bob")]);
    let mut session = session(&engine, 10).await;
    let replayer = ExportReplayer::new(engine, None, "distinguishedName");

    let output = replayer
        .export(&mut session, ExportFormat::Csv, None)
        .await
        .unwrap();
    assert_eq!(output.content_type, "text/csv");
    assert_eq!(output.record_count, 2);
    assert!(output.filename.starts_with("directory_export_"));
    assert!(output.filename.ends_with(".csv"));

    let body = String::from_utf8(output.bytes.to_vec()).unwrap();
    let lines: Vec<&str> = body.lines().collect();
    assert_eq!(lines[0], "distinguishedName,cn");
    assert_eq!(lines.len(), 3);
}
